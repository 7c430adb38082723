//! Collectors of constants, variables, and predicates,
//! implemented as [visitors](Visit).

use std::collections::BTreeSet;

use crate::{Predicate, Symbol, Visit, Walk};

/// Collect all of the constants occuring in an element.
pub trait Constants {
    fn constants(&self) -> BTreeSet<Symbol>;
}

impl<T: Walk> Constants for T {
    fn constants(&self) -> BTreeSet<Symbol> {
        let mut collector = ConstantCollector::default();
        self.walk(&mut collector);
        collector.0
    }
}

#[derive(Default)]
struct ConstantCollector(BTreeSet<Symbol>);

impl<'a> Visit<'a> for ConstantCollector {
    fn visit_constant(&mut self, c: &'a Symbol) {
        self.0.insert(c.clone());
    }
}

/// Collect all of the variables occuring in an element.
pub trait Variables {
    fn variables(&self) -> BTreeSet<Symbol>;
    fn existential_variables(&self) -> BTreeSet<Symbol>;
}

impl<T: Walk> Variables for T {
    fn variables(&self) -> BTreeSet<Symbol> {
        let mut collector = VariableCollector::default();
        self.walk(&mut collector);
        collector.universal.union(&collector.existential).cloned().collect()
    }

    fn existential_variables(&self) -> BTreeSet<Symbol> {
        let mut collector = VariableCollector::default();
        self.walk(&mut collector);
        collector.existential
    }
}

#[derive(Default)]
struct VariableCollector {
    universal: BTreeSet<Symbol>,
    existential: BTreeSet<Symbol>,
}

impl<'a> Visit<'a> for VariableCollector {
    fn visit_universal(&mut self, v: &'a Symbol) {
        self.universal.insert(v.clone());
    }

    fn visit_existential(&mut self, v: &'a Symbol) {
        self.existential.insert(v.clone());
    }
}

/// Collect all of the predicates occuring in an element.
pub trait Predicates {
    fn predicates(&self) -> BTreeSet<Predicate>;
}

impl<T: Walk> Predicates for T {
    fn predicates(&self) -> BTreeSet<Predicate> {
        let mut collector = PredicateCollector::default();
        self.walk(&mut collector);
        collector.0
    }
}

#[derive(Default)]
struct PredicateCollector(BTreeSet<Predicate>);

impl<'a> Visit<'a> for PredicateCollector {
    fn visit_predicate(&mut self, p: &'a Predicate) {
        self.0.insert(p.clone());
    }
}

#[cfg(test)]
mod test {
    use super::*;
    use crate::{Conjunction, Literal, PositiveLiteral, Rule, Term};

    #[test]
    fn collect() {
        let rule = Rule::new(
            Conjunction::new([PositiveLiteral::new(
                "h",
                [Term::universal("X"), Term::existential("Y")],
            )]),
            Conjunction::new([
                Literal::positive("b", [Term::universal("X"), Term::constant("a")]),
                Literal::negative("c", [Term::constant("b")]),
            ]),
        );
        assert_eq!(
            rule.constants(),
            [Symbol::from("a"), Symbol::from("b")].into_iter().collect()
        );
        assert_eq!(
            rule.variables(),
            [Symbol::from("X"), Symbol::from("Y")].into_iter().collect()
        );
        assert_eq!(
            rule.existential_variables(),
            [Symbol::from("Y")].into_iter().collect()
        );
        assert_eq!(
            rule.predicates(),
            [
                Predicate::new("b", 2),
                Predicate::new("c", 1),
                Predicate::new("h", 2)
            ]
            .into_iter()
            .collect()
        );
    }
}
