//! Check that all variables in an ASP rule are _safe_,
//! i.e., occur in at least one positive body literal
//! (or, for choice elements, a positive context literal).
//!
//! This is totally unrelated to Rust's `unsafe` keyword.

use std::collections::BTreeSet;
use std::fmt;

use crate::{
    ChoiceRule, Constraint, DisjunctiveRule, Literal, ModelError, PositiveLiteral, Symbol, Term,
};

pub(crate) trait Safety {
    fn check_safety(&self) -> Result<(), ModelError>;
}

fn check_universal<'a>(
    literals: impl IntoIterator<Item = &'a Literal>,
    rule: &dyn fmt::Display,
) -> Result<(), ModelError> {
    if literals
        .into_iter()
        .any(|l| l.arguments.iter().any(|t| matches!(t, Term::Existential(_))))
    {
        Err(ModelError::ExistentialInBody(rule.to_string()))
    } else {
        Ok(())
    }
}

fn check_bound<'a>(
    literals: impl IntoIterator<Item = &'a Literal>,
    bound: &BTreeSet<Symbol>,
    rule: &dyn fmt::Display,
) -> Result<(), ModelError> {
    for l in literals {
        for t in &l.arguments {
            match t {
                Term::Universal(v) if !bound.contains(v) => {
                    return Err(ModelError::UnsafeVariable {
                        variable: v.clone(),
                        rule: rule.to_string(),
                    })
                }
                Term::Existential(_) => {
                    return Err(ModelError::ExistentialInHead(rule.to_string()))
                }
                _ => (),
            }
        }
    }
    Ok(())
}

impl Safety for Constraint {
    fn check_safety(&self) -> Result<(), ModelError> {
        check_universal(self.body(), self)?;
        check_bound(self.body(), &self.body().bound_variables(), self)
    }
}

impl Safety for DisjunctiveRule {
    fn check_safety(&self) -> Result<(), ModelError> {
        check_universal(self.body(), self)?;
        let bound = self.body().bound_variables();
        check_bound(self.body(), &bound, self)?;
        check_bound(self.head().iter().map(PositiveLiteral::literal), &bound, self)
    }
}

impl Safety for ChoiceRule {
    fn check_safety(&self) -> Result<(), ModelError> {
        check_universal(self.body(), self)?;
        let bound = self.body().bound_variables();
        check_bound(self.body(), &bound, self)?;
        for element in self.head() {
            check_universal(&element.context, self)?;
            let local = bound
                .union(&element.context.bound_variables())
                .cloned()
                .collect::<BTreeSet<_>>();
            check_bound(&element.context, &local, self)?;
            check_bound([element.literal.literal()], &local, self)?;
        }
        Ok(())
    }
}
