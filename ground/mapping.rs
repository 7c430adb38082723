//! Instantiate literals from answer tuples.

use gavotte_reasoner::{Reasoner, TermId};
use gavotte_syntax::{Literal, Predicate, Symbol, Term};

use crate::{AspifIndex, Fingerprint, GroundingError};

/// Where a literal's argument comes from.
#[derive(Clone, Debug, Eq, PartialEq)]
pub enum ArgumentSource {
    /// A position in the answer tuple of a helper query.
    Position(usize),
    Constant(TermId),
}

/// A literal compiled against the variable order of a helper literal.
#[derive(Clone, Debug, Eq, PartialEq)]
pub struct LiteralMapping {
    predicate: Predicate,
    negated: bool,
    arguments: Vec<ArgumentSource>,
}

impl LiteralMapping {
    pub fn new<R: Reasoner + ?Sized>(
        literal: &Literal,
        variables: &[Symbol],
        reasoner: &R,
    ) -> Result<Self, GroundingError> {
        let arguments = literal
            .arguments
            .iter()
            .map(|t| -> Result<ArgumentSource, GroundingError> {
                match t {
                    Term::Constant(c) => {
                        Ok(ArgumentSource::Constant(reasoner.get_or_add_constant_id(c)?))
                    }
                    Term::Universal(v) | Term::Existential(v) => variables
                        .iter()
                        .position(|u| u == v)
                        .map(ArgumentSource::Position)
                        .ok_or_else(|| GroundingError::UnmappedVariable {
                            variable: v.clone(),
                            literal: literal.to_string(),
                        }),
                }
            })
            .collect::<Result<Vec<_>, _>>()?;
        Ok(Self {
            predicate: literal.predicate.clone(),
            negated: literal.negated,
            arguments,
        })
    }

    pub fn predicate(&self) -> &Predicate {
        &self.predicate
    }

    pub fn is_negated(&self) -> bool {
        self.negated
    }

    pub fn fingerprint(&self, tuple: &[TermId]) -> Result<Fingerprint, GroundingError> {
        let terms = self
            .arguments
            .iter()
            .map(|a| match a {
                ArgumentSource::Constant(id) => Ok(*id),
                ArgumentSource::Position(i) => tuple
                    .get(*i)
                    .copied()
                    .ok_or(GroundingError::ShortTuple {
                        position: *i,
                        length: tuple.len(),
                    }),
            })
            .collect::<Result<Vec<_>, _>>()?;
        Ok(Fingerprint::new(self.predicate.clone(), terms))
    }

    /// The signed aspif literal for one instance.
    pub fn intern(&self, tuple: &[TermId], index: &mut AspifIndex) -> Result<i32, GroundingError> {
        index.get_or_create(self.fingerprint(tuple)?, self.negated)
    }
}
