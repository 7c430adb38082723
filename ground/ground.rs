//! Ground ASP rules into a propositional program for a solver.
//!
//! Grounding is a two-phase affair. First, [`prepare`] finds the
//! predicates that a materializing reasoner can't determine exactly
//! and adds the approximations of every ASP rule to the knowledge base.
//! After the reasoner has materialized that, a [`Grounder`] reads back
//! the instances of each rule's helper literals and writes the ground
//! statements to an [`Output`].

mod analysis;
mod grounder;
mod index;
mod mapping;
mod output;

use std::collections::BTreeSet;
use std::io;

use thiserror::Error;

use gavotte_reasoner::ReasonerError;
use gavotte_syntax::{KnowledgeBase, ModelError, Predicate, Predicates as _, Symbol};
use gavotte_tracer::{trace, Trace};

// Re-exports.
pub use analysis::DependencyAnalyzer;
pub use grounder::{Grounder, GroundingSummary};
pub use index::{AspifIndex, Fingerprint, TOP};
pub use mapping::{ArgumentSource, LiteralMapping};
pub use output::{AspifWriter, Body, GroundStatement, Head, Labels, Output, TextWriter};

/// Things that may go wrong during grounding.
#[derive(Debug, Error)]
pub enum GroundingError {
    #[error(transparent)]
    Reasoner(#[from] ReasonerError),

    #[error("can't write ground program: {0}")]
    Io(#[from] io::Error),

    #[error("variable `?{variable}` of `{literal}` is not among the helper variables")]
    UnmappedVariable { variable: Symbol, literal: String },

    #[error("too many atoms: aspif numbers them up to {}", i32::MAX)]
    TooManyAtoms,

    #[error("answer has {length} terms, but position {position} was needed")]
    ShortTuple { position: usize, length: usize },

    #[error("while grounding rule {rule_idx}: {source}")]
    Rule {
        rule_idx: u32,
        #[source]
        source: Box<GroundingError>,
    },
}

/// Analyze the ASP rules of `kb` and add their approximations to it.
/// Returns the approximated predicates, which the grounder needs too.
///
/// Existential rules are left to the reasoner, so they may not mention
/// an approximated predicate.
pub fn prepare(kb: &mut KnowledgeBase, trace: Trace) -> Result<BTreeSet<Predicate>, ModelError> {
    let approximated = DependencyAnalyzer::new(kb.asp_rules()).approximated_predicates(trace);
    if let Some(rule) = kb
        .rules()
        .find(|r| r.predicates().iter().any(|p| approximated.contains(p)))
    {
        return Err(ModelError::ApproximatedExistentialRule(rule.to_string()));
    }
    let rules = kb
        .asp_rules()
        .flat_map(|r| r.approximation(&approximated))
        .collect::<Vec<_>>();
    for rule in rules {
        trace!(trace, Approximate, "{rule}");
        kb.add_statement(rule)?;
    }
    Ok(approximated)
}

#[cfg(test)]
mod test {
    use super::*;
    use gavotte_syntax::parse_program;

    #[test]
    fn approximations() {
        let mut kb = parse_program(
            "cand(a) .
             { sel(?X) } 1 :- cand(?X) .
             :- sel(?X), ~cand(?X) .",
        )
        .unwrap();
        let before = kb.rules().count();
        let approximated = prepare(&mut kb, Trace::none()).unwrap();
        assert_eq!(
            approximated.iter().map(ToString::to_string).collect::<Vec<_>>(),
            ["sel/1"]
        );
        assert_eq!(
            kb.rules()
                .skip(before)
                .map(ToString::to_string)
                .collect::<Vec<_>>(),
            [
                "rule_0_body(?X) :- cand(?X) .",
                "rule_0_global(?X) :- rule_0_body(?X) .",
                "rule_0_0(?X) :- rule_0_body(?X) .",
                "sel(?X) :- rule_0_0(?X) .",
                "rule_1(?X) :- sel(?X), ~cand(?X) .",
            ]
        );
    }

    #[test]
    fn existential_rules() {
        let mut kb = parse_program(
            "n(1) .
             { sel(?X) } :- n(?X) .
             link(?X, !Y) :- n(?X) .",
        )
        .unwrap();
        assert!(prepare(&mut kb, Trace::none()).is_ok());

        let mut kb = parse_program(
            "n(1) .
             { sel(?X) } :- n(?X) .
             link(?X, !Y) :- sel(?X) .",
        )
        .unwrap();
        assert_eq!(
            prepare(&mut kb, Trace::none()),
            Err(ModelError::ApproximatedExistentialRule(String::from(
                "link(?X, !Y) :- sel(?X) ."
            )))
        );
    }

    #[test]
    fn rule_errors() {
        let e = GroundingError::Rule {
            rule_idx: 3,
            source: Box::new(GroundingError::ShortTuple {
                position: 2,
                length: 1,
            }),
        };
        assert_eq!(
            e.to_string(),
            "while grounding rule 3: answer has 1 terms, but position 2 was needed"
        );
    }
}
