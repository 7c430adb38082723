//! Plain rules, facts, and the other statements of a program.

use std::fmt;
use std::path::PathBuf;

use crate::{AspRule, Conjunction, Literal, ModelError, PositiveLiteral, Predicate, Symbol, Term};

/// An ordinary rule for the materializing reasoner. Head variables
/// that do not occur in the body are existentially quantified.
#[derive(Clone, Debug, Eq, Hash, Ord, PartialEq, PartialOrd)]
pub struct Rule {
    pub head: Conjunction<PositiveLiteral>,
    pub body: Conjunction<Literal>,
}

impl Rule {
    pub fn new(head: Conjunction<PositiveLiteral>, body: Conjunction<Literal>) -> Self {
        Self { head, body }
    }
}

impl fmt::Display for Rule {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        if self.body.is_empty() {
            f.write_fmt(format_args!("{} .", self.head))
        } else {
            f.write_fmt(format_args!("{} :- {} .", self.head, self.body))
        }
    }
}

/// A ground positive literal.
#[derive(Clone, Debug, Eq, Hash, Ord, PartialEq, PartialOrd)]
pub struct Fact(PositiveLiteral);

impl Fact {
    pub fn new(literal: PositiveLiteral) -> Result<Self, ModelError> {
        if literal.literal().is_ground() {
            Ok(Self(literal))
        } else {
            Err(ModelError::NonGroundFact(literal.to_string()))
        }
    }

    pub fn predicate(&self) -> &Predicate {
        self.0.predicate()
    }

    pub fn arguments(&self) -> &[Term] {
        self.0.arguments()
    }

    pub fn literal(&self) -> &PositiveLiteral {
        &self.0
    }
}

impl fmt::Display for Fact {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_fmt(format_args!("{} .", self.0))
    }
}

/// Request that the atoms of a predicate appear in the solver's answers.
#[derive(Clone, Debug, Eq, Hash, Ord, PartialEq, PartialOrd)]
pub struct ShowStatement {
    pub predicate: Predicate,
}

impl ShowStatement {
    pub fn new(predicate: Predicate) -> Self {
        Self { predicate }
    }

    /// A literal with a fresh variable in every position.
    pub fn query_literal(&self) -> Literal {
        Literal {
            predicate: self.predicate.clone(),
            arguments: (0..self.predicate.arity)
                .map(|i| Term::Universal(Symbol::new(format!("Var{i}"))))
                .collect(),
            negated: false,
        }
    }
}

impl fmt::Display for ShowStatement {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_fmt(format_args!("#show {} .", self.predicate))
    }
}

/// Where external facts come from.
#[derive(Clone, Debug, Eq, Hash, Ord, PartialEq, PartialOrd)]
pub enum DataSource {
    /// One fact per line, comma-separated fields.
    Csv(PathBuf),
}

impl fmt::Display for DataSource {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            Self::Csv(path) => f.write_fmt(format_args!("load-csv({:?})", path.display().to_string())),
        }
    }
}

#[derive(Clone, Debug, Eq, Hash, Ord, PartialEq, PartialOrd)]
pub struct DataSourceDeclaration {
    pub predicate: Predicate,
    pub source: DataSource,
}

impl DataSourceDeclaration {
    pub fn new(predicate: Predicate, source: DataSource) -> Self {
        Self { predicate, source }
    }
}

impl fmt::Display for DataSourceDeclaration {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_fmt(format_args!(
            "@source {}[{}] : {} .",
            self.predicate.name, self.predicate.arity, self.source
        ))
    }
}

/// Anything a knowledge base can hold.
#[derive(Clone, Debug, Eq, Hash, Ord, PartialEq, PartialOrd)]
pub enum Statement {
    Fact(Fact),
    Rule(Rule),
    Asp(AspRule),
    Show(ShowStatement),
    DataSource(DataSourceDeclaration),
}

impl From<Fact> for Statement {
    fn from(f: Fact) -> Self {
        Self::Fact(f)
    }
}

impl From<Rule> for Statement {
    fn from(r: Rule) -> Self {
        Self::Rule(r)
    }
}

impl From<AspRule> for Statement {
    fn from(r: AspRule) -> Self {
        Self::Asp(r)
    }
}

impl From<ShowStatement> for Statement {
    fn from(s: ShowStatement) -> Self {
        Self::Show(s)
    }
}

impl From<DataSourceDeclaration> for Statement {
    fn from(d: DataSourceDeclaration) -> Self {
        Self::DataSource(d)
    }
}

impl fmt::Display for Statement {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            Self::Fact(x) => x.fmt(f),
            Self::Rule(x) => x.fmt(f),
            Self::Asp(x) => x.fmt(f),
            Self::Show(x) => x.fmt(f),
            Self::DataSource(x) => x.fmt(f),
        }
    }
}

#[cfg(test)]
mod test {
    use super::*;

    #[test]
    fn facts_are_ground() {
        assert!(Fact::new(PositiveLiteral::new("p", [Term::constant("a")])).is_ok());
        assert_eq!(
            Fact::new(PositiveLiteral::new("p", [Term::universal("X")])),
            Err(ModelError::NonGroundFact(String::from("p(?X)")))
        );
    }

    #[test]
    fn show_query() {
        let show = ShowStatement::new(Predicate::new("p", 2));
        assert_eq!(show.query_literal().to_string(), "p(?Var0, ?Var1)");
        assert_eq!(show.to_string(), "#show p/2 .");
    }

    #[test]
    fn display_rule() {
        let rule = Rule::new(
            Conjunction::new([PositiveLiteral::new(
                "h",
                [Term::universal("X"), Term::existential("Y")],
            )]),
            Conjunction::new([Literal::positive("b", [Term::universal("X")])]),
        );
        assert_eq!(rule.to_string(), "h(?X, !Y) :- b(?X) .");
    }
}
