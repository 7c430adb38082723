//! Find the predicates whose extensions materialization alone
//! can't determine exactly.
//!
//! A predicate needs approximation if some rule defining it does
//! (a proper disjunction or a choice), if it depends negatively on
//! something that depends on it, or if it depends, however indirectly,
//! on another approximated predicate.

use std::collections::{BTreeMap, BTreeSet};

use gavotte_syntax::{AspRule, Predicate};
use gavotte_tracer::{trace, Trace};

type Dependencies = BTreeMap<Predicate, BTreeSet<Predicate>>;

#[derive(Clone, Debug, Default)]
pub struct DependencyAnalyzer {
    direct: Dependencies,
    negative: Dependencies,
    intrinsic: BTreeSet<Predicate>,
}

impl DependencyAnalyzer {
    pub fn new<'a>(rules: impl IntoIterator<Item = &'a AspRule>) -> Self {
        let mut analyzer = Self::default();
        for rule in rules {
            let body = rule.dependencies();
            for head in rule.head_literals() {
                let p = head.predicate();
                let direct = analyzer.direct.entry(p.clone()).or_default();
                direct.extend(body.iter().map(|l| l.predicate.clone()));
                let negative = body.iter().filter(|l| l.negated).map(|l| l.predicate.clone());
                analyzer.negative.entry(p.clone()).or_default().extend(negative);
                if rule.requires_approximation() {
                    analyzer.intrinsic.insert(p.clone());
                }
            }
        }
        analyzer
    }

    /// Transitive closure of the direct dependencies.
    pub fn closure(&self) -> Dependencies {
        let mut closure = self.direct.clone();
        let mut changed = true;
        while changed {
            changed = false;
            let snapshot = closure.clone();
            for deps in closure.values_mut() {
                let indirect = deps
                    .iter()
                    .filter_map(|q| snapshot.get(q))
                    .flatten()
                    .cloned()
                    .collect::<Vec<_>>();
                for q in indirect {
                    changed |= deps.insert(q);
                }
            }
        }
        closure
    }

    pub fn approximated_predicates(&self, trace: Trace) -> BTreeSet<Predicate> {
        let closure = self.closure();
        let mut approximated = self.intrinsic.clone();

        for (p, negative) in &self.negative {
            if negative
                .iter()
                .any(|q| closure.get(q).is_some_and(|deps| deps.contains(p)))
            {
                trace!(trace, Analyze, "Negation through recursion at {p}");
                approximated.insert(p.clone());
            }
        }

        let mut changed = true;
        while changed {
            changed = false;
            for (p, deps) in &closure {
                if !approximated.contains(p) && deps.iter().any(|q| approximated.contains(q)) {
                    approximated.insert(p.clone());
                    changed = true;
                }
            }
        }

        trace!(
            trace,
            Analyze,
            "Approximated predicates: {{{}}}",
            approximated
                .iter()
                .map(ToString::to_string)
                .collect::<Vec<_>>()
                .join(", ")
        );
        approximated
    }
}

#[cfg(test)]
mod test {
    use super::*;
    use gavotte_syntax::parse_program;

    fn approximated(program: &str) -> BTreeSet<String> {
        let kb = parse_program(program).unwrap();
        DependencyAnalyzer::new(kb.asp_rules())
            .approximated_predicates(Trace::none())
            .iter()
            .map(ToString::to_string)
            .collect()
    }

    fn set(predicates: &[&str]) -> BTreeSet<String> {
        predicates.iter().map(|p| String::from(*p)).collect()
    }

    #[test]
    fn negation_cycle() {
        assert_eq!(
            approximated("p(?X) :- q(?X), ~r(?X) . r(?X) :- p(?X) ."),
            set(&["p/1", "r/1"])
        );
        assert_eq!(
            approximated("p(?X) :- q(?X), r(?X) . r(?X) :- p(?X) ."),
            set(&[])
        );
        assert_eq!(approximated("p :- ~p ."), set(&["p/0"]));
        assert_eq!(approximated("p :- ~q . q :- s ."), set(&[]));
    }

    #[test]
    fn propagation() {
        assert_eq!(
            approximated(
                "{ sel(?X) } :- cand(?X) .
                 chosen(?X) :- sel(?X) .
                 twice(?X) :- chosen(?X), cand(?X) .
                 other(?X) :- cand(?X) .
                 a(?X) | b(?X) :- other(?X) ."
            ),
            set(&["a/1", "b/1", "chosen/1", "sel/1", "twice/1"])
        );
    }

    #[test]
    fn context_dependencies() {
        assert_eq!(
            approximated(
                "{ a } .
                 { b : a } :- c .
                 d :- b ."
            ),
            set(&["a/0", "b/0", "d/0"])
        );
    }

    #[test]
    fn order_independent() {
        let rules = [
            "p(?X) :- q(?X), ~r(?X) .",
            "r(?X) :- p(?X) .",
            "s(?X) :- r(?X) .",
            "{ t(?X) } :- u(?X) .",
            "v(?X) :- t(?X), ~w(?X) .",
        ];
        let forward = approximated(&rules.join("\n"));
        let backward = approximated(&rules.iter().rev().cloned().collect::<Vec<_>>().join("\n"));
        assert_eq!(forward, backward);
        assert_eq!(forward, set(&["p/1", "r/1", "s/1", "t/1", "v/1"]));

        let kb = parse_program(&rules.join("\n")).unwrap();
        let analyzer = DependencyAnalyzer::new(kb.asp_rules());
        assert_eq!(
            analyzer.approximated_predicates(Trace::none()),
            analyzer.approximated_predicates(Trace::none())
        );
    }
}
