//! Order rules so that negated predicates are complete before use.

use std::collections::BTreeMap;

use gavotte_syntax::{Predicate, Rule};

use crate::ReasonerError;

/// Partition rule indices into strata, lowest first. A predicate's
/// stratum is at least that of every positive dependency and strictly
/// above that of every negative one; all heads of a rule share a stratum.
pub(crate) fn stratify(rules: &[Rule]) -> Result<Vec<Vec<usize>>, ReasonerError> {
    let mut stratum = BTreeMap::<&Predicate, usize>::new();
    for rule in rules {
        for h in &rule.head {
            stratum.insert(h.predicate(), 0);
        }
    }
    let limit = stratum.len();

    let mut changed = true;
    while changed {
        changed = false;
        for rule in rules {
            let required = rule
                .body
                .iter()
                .map(|l| stratum.get(&l.predicate).copied().unwrap_or(0) + usize::from(l.negated))
                .chain(rule.head.iter().map(|h| stratum.get(h.predicate()).copied().unwrap_or(0)))
                .max()
                .unwrap_or(0);
            for h in &rule.head {
                let s = stratum.entry(h.predicate()).or_default();
                if *s < required {
                    if required > limit {
                        return Err(ReasonerError::Unstratifiable(h.predicate().clone()));
                    }
                    *s = required;
                    changed = true;
                }
            }
        }
    }

    let mut strata = Vec::<Vec<usize>>::new();
    for (i, rule) in rules.iter().enumerate() {
        let s = rule
            .head
            .iter()
            .map(|h| stratum.get(h.predicate()).copied().unwrap_or(0))
            .max()
            .unwrap_or(0);
        if strata.len() <= s {
            strata.resize_with(s + 1, Vec::new);
        }
        strata[s].push(i);
    }
    strata.retain(|s| !s.is_empty());
    Ok(strata)
}

#[cfg(test)]
mod test {
    use super::*;
    use gavotte_syntax::parse_program;

    fn rules(program: &str) -> Vec<Rule> {
        parse_program(program).unwrap().rules().cloned().collect()
    }

    #[test]
    fn negation_raises_strata() {
        let r = rules(
            "a(?X, !Y), x(!Y) :- e(?X) .
             b(?X, !Y), y(!Y) :- e(?X), ~a(?X, ?X) .
             c(?X, !Y), z(!Y) :- a(?X, ?X) .",
        );
        assert_eq!(stratify(&r).unwrap(), vec![vec![0, 2], vec![1]]);
    }

    #[test]
    fn negative_cycle() {
        let r = rules(
            "a(?X, !Y), x(!Y) :- e(?X), ~b(?X, ?X) .
             b(?X, !Y), y(!Y) :- e(?X), ~a(?X, ?X) .",
        );
        assert!(matches!(
            stratify(&r),
            Err(ReasonerError::Unstratifiable(_))
        ));
    }
}
