//! Ordered conjunctions of literals.

use std::collections::BTreeSet;
use std::fmt;

use crate::{Literal, Predicate, Symbol, Term};

/// An ordered sequence of literals, kept free of duplicates
/// (the first occurrence wins).
#[derive(Clone, Debug, Eq, Hash, Ord, PartialEq, PartialOrd)]
pub struct Conjunction<L>(Vec<L>);

impl<L> Default for Conjunction<L> {
    fn default() -> Self {
        Self(Vec::new())
    }
}

impl<L: AsRef<Literal> + Clone> Conjunction<L> {
    pub fn new(literals: impl IntoIterator<Item = L>) -> Self {
        let mut unique: Vec<L> = Vec::new();
        for l in literals {
            if !unique.iter().any(|u| u.as_ref() == l.as_ref()) {
                unique.push(l);
            }
        }
        Self(unique)
    }

    pub fn literals(&self) -> &[L] {
        &self.0
    }

    pub fn iter(&self) -> impl Iterator<Item = &L> {
        self.0.iter()
    }

    pub fn len(&self) -> usize {
        self.0.len()
    }

    pub fn is_empty(&self) -> bool {
        self.0.is_empty()
    }

    /// Drop every literal over one of `predicates`, except positive
    /// ones when `keep_positive` is set.
    pub fn simplified(&self, predicates: &BTreeSet<Predicate>, keep_positive: bool) -> Self {
        Self(
            self.0
                .iter()
                .filter(|l| {
                    let l = l.as_ref();
                    !predicates.contains(&l.predicate) || (keep_positive && l.is_positive())
                })
                .cloned()
                .collect(),
        )
    }

    /// The literals over approximated predicates, in order.
    pub fn relevant_literals<'a>(
        &'a self,
        approximated: &'a BTreeSet<Predicate>,
    ) -> impl Iterator<Item = &'a L> + 'a {
        self.0
            .iter()
            .filter(move |l| approximated.contains(&l.as_ref().predicate))
    }

    pub fn relevant_literal_count(&self, approximated: &BTreeSet<Predicate>) -> usize {
        self.relevant_literals(approximated).count()
    }

    /// Distinct universal variables in order of first occurrence.
    pub fn universal_variables(&self) -> Vec<Symbol> {
        let mut variables = Vec::new();
        for l in &self.0 {
            for t in &l.as_ref().arguments {
                if let Term::Universal(v) = t {
                    if !variables.contains(v) {
                        variables.push(v.clone());
                    }
                }
            }
        }
        variables
    }

    /// Distinct universal variables of the positive literals.
    pub fn bound_variables(&self) -> BTreeSet<Symbol> {
        self.0
            .iter()
            .map(AsRef::as_ref)
            .filter(|l| l.is_positive())
            .flat_map(|l| l.arguments.iter())
            .filter_map(|t| match t {
                Term::Universal(v) => Some(v.clone()),
                _ => None,
            })
            .collect()
    }
}

impl<L: AsRef<Literal> + Clone> FromIterator<L> for Conjunction<L> {
    fn from_iter<I: IntoIterator<Item = L>>(iter: I) -> Self {
        Self::new(iter)
    }
}

impl<'a, L> IntoIterator for &'a Conjunction<L> {
    type Item = &'a L;
    type IntoIter = std::slice::Iter<'a, L>;

    fn into_iter(self) -> Self::IntoIter {
        self.0.iter()
    }
}

impl<L: fmt::Display> fmt::Display for Conjunction<L> {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(
            &self
                .0
                .iter()
                .map(ToString::to_string)
                .collect::<Vec<_>>()
                .join(", "),
        )
    }
}
