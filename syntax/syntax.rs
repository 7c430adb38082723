//! Syntactic elements of a rule language with answer set programming
//! extensions: plain (possibly existential) rules that a materializing
//! reasoner evaluates, and ASP rules (constraints, disjunctive rules,
//! and choice rules) that must be grounded for an external solver.

mod asp;
mod collectors;
mod conjunction;
mod knowledge;
mod lexer;
mod parser;
mod rule;
mod safety;
mod visit;

use std::fmt;

use thiserror::Error;

pub use asp::{AspRule, ChoiceElement, ChoiceRule, Constraint, DisjunctiveRule};
pub use collectors::{Constants, Predicates, Variables};
pub use conjunction::Conjunction;
pub use knowledge::{KnowledgeBase, KnowledgeBaseListener};
pub use parser::{parse_into, parse_program, ParseError};
pub use rule::{DataSource, DataSourceDeclaration, Fact, Rule, ShowStatement, Statement};
pub use visit::*;

/// Uninterpreted element that names a constant, a predicate, or a variable.
#[derive(Clone, Debug, Eq, Hash, Ord, PartialEq, PartialOrd)]
pub struct Symbol(String);

impl Symbol {
    pub fn new(name: String) -> Self {
        Symbol(name)
    }

    pub fn name(&self) -> &str {
        &self.0
    }
}

impl From<&str> for Symbol {
    fn from(s: &str) -> Self {
        Symbol::new(String::from(s))
    }
}

impl From<String> for Symbol {
    fn from(s: String) -> Self {
        Symbol::new(s)
    }
}

impl fmt::Display for Symbol {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.name())
    }
}

/// A constant represents itself; a universal variable ranges over
/// the constants of the knowledge base; an existential variable
/// stands for a value a rule head may invent.
#[derive(Clone, Debug, Eq, Hash, Ord, PartialEq, PartialOrd)]
pub enum Term {
    Constant(Symbol),
    Universal(Symbol),
    Existential(Symbol),
}

impl Term {
    pub fn constant(name: impl Into<Symbol>) -> Self {
        Self::Constant(name.into())
    }

    pub fn universal(name: impl Into<Symbol>) -> Self {
        Self::Universal(name.into())
    }

    pub fn existential(name: impl Into<Symbol>) -> Self {
        Self::Existential(name.into())
    }

    pub fn name(&self) -> &Symbol {
        match self {
            Self::Constant(s) | Self::Universal(s) | Self::Existential(s) => s,
        }
    }

    pub fn is_constant(&self) -> bool {
        matches!(self, Self::Constant(_))
    }

    pub fn is_variable(&self) -> bool {
        !self.is_constant()
    }
}

impl fmt::Display for Term {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            Self::Constant(c) => c.fmt(f),
            Self::Universal(v) => f.write_fmt(format_args!("?{v}")),
            Self::Existential(v) => f.write_fmt(format_args!("!{v}")),
        }
    }
}

/// The role a synthetic predicate plays for the rule that owns it.
#[derive(Clone, Copy, Debug, Eq, Hash, Ord, PartialEq, PartialOrd)]
pub enum HelperKind {
    /// All body variables of a constraint or disjunctive rule.
    Instance,
    /// All body variables of a choice rule, head-shared ones first.
    Body,
    /// The body variables of a choice rule that also occur in its head.
    Global,
    /// One choice element: global variables plus its local ones.
    Element,
}

/// Structured name of a synthetic predicate that summarizes
/// the substitutions of (part of) an ASP rule.
#[derive(Clone, Copy, Debug, Eq, Hash, Ord, PartialEq, PartialOrd)]
pub struct HelperKey {
    pub kind: HelperKind,
    pub rule_idx: u32,
    pub element: Option<usize>,
}

impl fmt::Display for HelperKey {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        let HelperKey {
            kind,
            rule_idx,
            element,
        } = self;
        match (kind, element) {
            (HelperKind::Instance, _) => f.write_fmt(format_args!("rule_{rule_idx}")),
            (HelperKind::Body, _) => f.write_fmt(format_args!("rule_{rule_idx}_body")),
            (HelperKind::Global, _) => f.write_fmt(format_args!("rule_{rule_idx}_global")),
            (HelperKind::Element, Some(i)) => f.write_fmt(format_args!("rule_{rule_idx}_{i}")),
            (HelperKind::Element, None) => f.write_fmt(format_args!("rule_{rule_idx}_element")),
        }
    }
}

/// User predicates come from the program text; helper predicates are
/// introduced by approximation and can never collide with them.
#[derive(Clone, Debug, Eq, Hash, Ord, PartialEq, PartialOrd)]
pub enum PredicateName {
    User(Symbol),
    Helper(HelperKey),
}

impl fmt::Display for PredicateName {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            Self::User(s) => s.fmt(f),
            Self::Helper(key) => key.fmt(f),
        }
    }
}

/// A predicate is identified by its name and arity.
#[derive(Clone, Debug, Eq, Hash, Ord, PartialEq, PartialOrd)]
pub struct Predicate {
    pub name: PredicateName,
    pub arity: usize,
}

impl Predicate {
    pub fn new(name: impl Into<Symbol>, arity: usize) -> Self {
        Self {
            name: PredicateName::User(name.into()),
            arity,
        }
    }

    pub fn helper(key: HelperKey, arity: usize) -> Self {
        Self {
            name: PredicateName::Helper(key),
            arity,
        }
    }

    pub fn is_helper(&self) -> bool {
        matches!(self.name, PredicateName::Helper(_))
    }
}

impl fmt::Display for Predicate {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_fmt(format_args!("{}/{}", self.name, self.arity))
    }
}

/// A predicate applied to a tuple of terms, possibly negated
/// (negation as failure).
#[derive(Clone, Debug, Eq, Hash, Ord, PartialEq, PartialOrd)]
pub struct Literal {
    pub predicate: Predicate,
    pub arguments: Vec<Term>,
    pub negated: bool,
}

impl Literal {
    pub fn new(
        predicate: impl Into<Symbol>,
        arguments: impl IntoIterator<Item = Term>,
        negated: bool,
    ) -> Self {
        let arguments = arguments.into_iter().collect::<Vec<_>>();
        Self {
            predicate: Predicate::new(predicate, arguments.len()),
            arguments,
            negated,
        }
    }

    pub fn positive(predicate: impl Into<Symbol>, arguments: impl IntoIterator<Item = Term>) -> Self {
        Self::new(predicate, arguments, false)
    }

    pub fn negative(predicate: impl Into<Symbol>, arguments: impl IntoIterator<Item = Term>) -> Self {
        Self::new(predicate, arguments, true)
    }

    pub fn negate(self) -> Self {
        Self {
            negated: !self.negated,
            ..self
        }
    }

    pub fn is_positive(&self) -> bool {
        !self.negated
    }

    pub fn is_ground(&self) -> bool {
        self.arguments.iter().all(Term::is_constant)
    }
}

impl AsRef<Literal> for Literal {
    fn as_ref(&self) -> &Literal {
        self
    }
}

impl fmt::Display for Literal {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        if self.negated {
            f.write_str("~")?;
        }
        self.predicate.name.fmt(f)?;
        if !self.arguments.is_empty() {
            f.write_fmt(format_args!(
                "({})",
                self.arguments
                    .iter()
                    .map(|arg| arg.to_string())
                    .collect::<Vec<_>>()
                    .join(", ")
            ))?;
        }
        Ok(())
    }
}

/// A literal that is never negated; heads, facts, and queries.
#[derive(Clone, Debug, Eq, Hash, Ord, PartialEq, PartialOrd)]
pub struct PositiveLiteral(Literal);

impl PositiveLiteral {
    pub fn new(predicate: impl Into<Symbol>, arguments: impl IntoIterator<Item = Term>) -> Self {
        Self(Literal::positive(predicate, arguments))
    }

    /// A positive literal over a synthetic helper predicate.
    pub fn helper(key: HelperKey, variables: &[Symbol]) -> Self {
        Self(Literal {
            predicate: Predicate::helper(key, variables.len()),
            arguments: variables.iter().cloned().map(Term::Universal).collect(),
            negated: false,
        })
    }

    /// Positive literals are literals; negated ones are refused.
    pub fn from_literal(literal: Literal) -> Option<Self> {
        literal.is_positive().then_some(Self(literal))
    }

    pub fn predicate(&self) -> &Predicate {
        &self.0.predicate
    }

    pub fn arguments(&self) -> &[Term] {
        &self.0.arguments
    }

    pub fn literal(&self) -> &Literal {
        &self.0
    }
}

impl AsRef<Literal> for PositiveLiteral {
    fn as_ref(&self) -> &Literal {
        &self.0
    }
}

impl From<PositiveLiteral> for Literal {
    fn from(p: PositiveLiteral) -> Self {
        p.0
    }
}

impl fmt::Display for PositiveLiteral {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        self.0.fmt(f)
    }
}

/// Things that may go wrong while building rules and facts.
#[derive(Clone, Debug, Eq, Error, PartialEq)]
pub enum ModelError {
    #[error("rule body cannot contain existential variables: `{0}`")]
    ExistentialInBody(String),

    #[error("ASP rule heads cannot contain existential variables: `{0}`")]
    ExistentialInHead(String),

    #[error("empty rule head not supported: `{0}`")]
    EmptyHead(String),

    #[error("empty constraint body not supported")]
    EmptyBody,

    #[error("unsafe variable: `?{variable}` is not bound by a positive literal in `{rule}`")]
    UnsafeVariable { variable: Symbol, rule: String },

    #[error("facts must be ground: `{0}`")]
    NonGroundFact(String),

    #[error("rule index {0} is already in use")]
    DuplicateRuleIndex(u32),

    #[error("no rule index left after {}", u32::MAX)]
    RuleIndexOverflow,

    #[error("existential rule mentions a predicate defined by ASP rules: `{0}`")]
    ApproximatedExistentialRule(String),
}

/// These constructor macros can make tests involving syntactic elements
/// much more readable. They are *not* intended as a public interface,
/// and *should* be behind `#[cfg(test)]`, but [cargo can't currently
/// export test code across crates](https://github.com/rust-lang/cargo/issues/8379).
#[cfg(feature = "macros")]
mod macros {
    #[macro_export]
    macro_rules! sym {
        ($name: ident) => {
            $crate::Symbol::from(stringify!($name))
        };
    }

    #[macro_export]
    macro_rules! cst {
        ($name: ident) => {
            $crate::Term::Constant($crate::sym!($name))
        };
        ($value: literal) => {
            $crate::Term::Constant($crate::Symbol::from($value.to_string()))
        };
    }

    #[macro_export]
    macro_rules! uvar {
        ($name: ident) => {
            $crate::Term::Universal($crate::sym!($name))
        };
    }

    #[macro_export]
    macro_rules! evar {
        ($name: ident) => {
            $crate::Term::Existential($crate::sym!($name))
        };
    }

    #[macro_export]
    macro_rules! pos {
        ($pred: ident) => {
            $crate::PositiveLiteral::new(stringify!($pred), [])
        };
        ($pred: ident($($arg: expr),* $(,)?)) => {
            $crate::PositiveLiteral::new(stringify!($pred), [$($arg),*])
        };
    }

    #[macro_export]
    macro_rules! lit {
        ($pred: ident $(($($arg: expr),* $(,)?))?) => {
            $crate::Literal::positive(stringify!($pred), [$($($arg),*)?])
        };
    }

    #[macro_export]
    macro_rules! neg {
        ($pred: ident $(($($arg: expr),* $(,)?))?) => {
            $crate::Literal::negative(stringify!($pred), [$($($arg),*)?])
        };
    }
}

#[cfg(test)]
mod test {
    use super::*;

    #[test]
    fn display() {
        let l = Literal::negative("p", [Term::universal("X"), Term::constant("a")]);
        assert_eq!(l.to_string(), "~p(?X, a)");
        assert_eq!(Literal::positive("q", []).to_string(), "q");
        assert_eq!(Term::existential("Y").to_string(), "!Y");
        assert_eq!(Predicate::new("p", 2).to_string(), "p/2");
    }

    #[test]
    fn helpers_never_collide_with_user_predicates() {
        let key = HelperKey {
            kind: HelperKind::Instance,
            rule_idx: 3,
            element: None,
        };
        let helper = Predicate::helper(key, 1);
        let user = Predicate::new("rule_3", 1);
        assert_eq!(helper.name.to_string(), user.name.to_string());
        assert_ne!(helper, user);
        assert!(helper.is_helper() && !user.is_helper());
    }

    #[test]
    fn positive_literals() {
        assert!(PositiveLiteral::from_literal(Literal::negative("p", [])).is_none());
        let p = PositiveLiteral::helper(
            HelperKey {
                kind: HelperKind::Element,
                rule_idx: 0,
                element: Some(2),
            },
            &[Symbol::from("X"), Symbol::from("Y")],
        );
        assert_eq!(p.to_string(), "rule_0_2(?X, ?Y)");
        assert_eq!(p.predicate().arity, 2);
    }
}
