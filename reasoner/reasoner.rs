//! Query answering over materialized knowledge bases.
//!
//! The grounder only needs two things from a reasoner: cursors over the
//! answers to a (partially bound) query, and a dictionary that maps
//! constants to stable term identifiers and back.
//! [`MemoryReasoner`] is a small in-memory implementation.

mod dictionary;
mod memory;
mod source;
mod strata;

use std::fmt;
use std::io;
use std::path::PathBuf;

use thiserror::Error;

use gavotte_syntax::{Literal, Predicate, Symbol, Term};

pub use memory::MemoryReasoner;

/// Stable identifier of a constant or labelled null.
pub type TermId = u64;

/// One answer: a term identifier per argument position.
pub type Tuple = Vec<TermId>;

/// What a term identifier stands for.
#[derive(Clone, Debug, Eq, Hash, Ord, PartialEq, PartialOrd)]
pub enum Value {
    Constant(Symbol),
    /// A labelled null invented for an existential variable.
    Null(usize),
}

impl Value {
    pub fn is_null(&self) -> bool {
        matches!(self, Self::Null(_))
    }
}

impl fmt::Display for Value {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            Self::Constant(c) => c.fmt(f),
            Self::Null(n) => f.write_fmt(format_args!("_:{n}")),
        }
    }
}

/// A query argument: either a fixed term or a variable.
/// Repeated variables must take equal values.
#[derive(Clone, Debug, Eq, Hash, Ord, PartialEq, PartialOrd)]
pub enum Pattern {
    Bound(TermId),
    Free(Symbol),
}

#[derive(Clone, Debug, Eq, Hash, Ord, PartialEq, PartialOrd)]
pub struct Query {
    pub predicate: Predicate,
    pub pattern: Vec<Pattern>,
}

impl Query {
    pub fn new(predicate: Predicate, pattern: Vec<Pattern>) -> Self {
        Self { predicate, pattern }
    }

    /// Does a stored tuple answer this query?
    pub fn matches(&self, tuple: &[TermId]) -> bool {
        if tuple.len() != self.pattern.len() {
            return false;
        }
        let mut seen: Vec<(&Symbol, TermId)> = Vec::new();
        for (p, &id) in self.pattern.iter().zip(tuple) {
            match p {
                Pattern::Bound(b) if *b != id => return false,
                Pattern::Bound(_) => (),
                Pattern::Free(v) => match seen.iter().find(|(s, _)| *s == v) {
                    Some((_, other)) if *other != id => return false,
                    Some(_) => (),
                    None => seen.push((v, id)),
                },
            }
        }
        true
    }
}

impl fmt::Display for Query {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_fmt(format_args!(
            "{}({})",
            self.predicate.name,
            self.pattern
                .iter()
                .map(|p| match p {
                    Pattern::Bound(id) => format!("#{id}"),
                    Pattern::Free(v) => format!("?{v}"),
                })
                .collect::<Vec<_>>()
                .join(", ")
        ))
    }
}

/// Things that may go wrong while materializing or answering queries.
#[derive(Debug, Error)]
pub enum ReasonerError {
    #[error("queries can't be answered before materialization")]
    NotMaterialized,

    #[error("can't stratify negation through `{0}`")]
    Unstratifiable(Predicate),

    #[error("unsafe rule: `?{variable}` is not bound by a positive body literal in `{rule}`")]
    UnsafeRule { variable: Symbol, rule: String },

    #[error("unknown term identifier {0}")]
    UnknownTerm(TermId),

    #[error("can't load data source `{}`: {source}", .path.display())]
    DataSource {
        path: PathBuf,
        #[source]
        source: io::Error,
    },

    #[error("`{predicate}` expects {expected} arguments, found {found}")]
    ArityMismatch {
        predicate: Predicate,
        expected: usize,
        found: usize,
    },
}

/// A pull-based stream of answers. Dropping it closes the query.
pub type Cursor<'a> = Box<dyn Iterator<Item = Result<Tuple, ReasonerError>> + 'a>;

pub trait Reasoner {
    /// Every answer to `query`, without duplicates, in no particular order.
    /// Answers containing labelled nulls are skipped unless `include_blanks`.
    fn answer_query(
        &self,
        query: &Query,
        include_blanks: bool,
    ) -> Result<Cursor<'_>, ReasonerError>;

    /// The rows loaded from data sources for `predicate`, before any rule fired.
    fn source_tuples(&self, predicate: &Predicate) -> Result<Cursor<'_>, ReasonerError>;

    fn get_or_add_constant_id(&self, constant: &Symbol) -> Result<TermId, ReasonerError>;

    fn get_constant(&self, id: TermId) -> Result<Value, ReasonerError>;

    /// Constants become bound patterns, variables free ones.
    fn query_literal(&self, literal: &Literal) -> Result<Query, ReasonerError> {
        let pattern = literal
            .arguments
            .iter()
            .map(|t| match t {
                Term::Constant(c) => self.get_or_add_constant_id(c).map(Pattern::Bound),
                Term::Universal(v) | Term::Existential(v) => Ok(Pattern::Free(v.clone())),
            })
            .collect::<Result<Vec<_>, _>>()?;
        Ok(Query::new(literal.predicate.clone(), pattern))
    }
}

#[cfg(test)]
mod test {
    use super::*;

    #[test]
    fn query_matches() {
        let q = Query::new(
            Predicate::new("p", 3),
            vec![
                Pattern::Free(Symbol::from("X")),
                Pattern::Bound(7),
                Pattern::Free(Symbol::from("X")),
            ],
        );
        assert!(q.matches(&[1, 7, 1]));
        assert!(!q.matches(&[1, 7, 2]));
        assert!(!q.matches(&[1, 8, 1]));
        assert!(!q.matches(&[1, 7]));
        assert_eq!(q.to_string(), "p(?X, #7, ?X)");
    }

    #[test]
    fn values() {
        assert_eq!(Value::Null(3).to_string(), "_:3");
        assert_eq!(Value::Constant(Symbol::from("a")).to_string(), "a");
        assert!(Value::Null(0).is_null());
    }
}
