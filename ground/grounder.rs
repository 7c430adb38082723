//! Recover the exact semantics of ASP rules from the materialized
//! instances of their helper literals, one rule at a time.

use std::collections::{BTreeSet, HashMap};
use std::time::Instant;

use gavotte_reasoner::{Pattern, Query, Reasoner, TermId, Value};
use gavotte_syntax::{
    AspRule, ChoiceRule, Fact, KnowledgeBase, Literal, Predicate, PositiveLiteral, ShowStatement,
    Symbol,
};
use gavotte_tracer::{trace, Trace};

use crate::output::{Body, GroundStatement, Head, Labels, Output};
use crate::{AspifIndex, Fingerprint, GroundingError, LiteralMapping, TOP};

/// What one grounding pass produced.
#[derive(Clone, Copy, Debug, Default, Eq, PartialEq)]
pub struct GroundingSummary {
    /// ASP rules that needed grounding.
    pub rules: usize,
    /// Ground statements written.
    pub instances: usize,
    /// Atoms allocated, anonymous ones included.
    pub atoms: usize,
}

/// Names atoms after their fingerprints; anonymous atoms get `_auxN`.
struct AtomLabels<'a, R: Reasoner + ?Sized> {
    index: &'a AspifIndex,
    reasoner: &'a R,
}

impl<R: Reasoner + ?Sized> Labels for AtomLabels<'_, R> {
    fn label(&self, atom: i32) -> Result<String, GroundingError> {
        match self.index.fingerprint(atom) {
            None => Ok(format!("_aux{}", atom.unsigned_abs())),
            Some(fp) => atom_name(self.reasoner, &fp.predicate, &fp.terms),
        }
    }
}

fn atom_name<R: Reasoner + ?Sized>(
    reasoner: &R,
    predicate: &Predicate,
    terms: &[TermId],
) -> Result<String, GroundingError> {
    if terms.is_empty() {
        return Ok(predicate.name.to_string());
    }
    let values = terms
        .iter()
        .map(|&id| reasoner.get_constant(id))
        .collect::<Result<Vec<Value>, _>>()?;
    Ok(format!(
        "{}({})",
        predicate.name,
        values
            .iter()
            .map(ToString::to_string)
            .collect::<Vec<_>>()
            .join(",")
    ))
}

/// A query on a helper literal whose first `bound.len()` arguments are fixed.
fn helper_query(helper: &PositiveLiteral, bound: &[TermId]) -> Query {
    let pattern = helper
        .arguments()
        .iter()
        .enumerate()
        .map(|(i, t)| match bound.get(i) {
            Some(&id) => Pattern::Bound(id),
            None => Pattern::Free(t.name().clone()),
        })
        .collect();
    Query::new(helper.predicate().clone(), pattern)
}

/// Grounds every ASP rule of a prepared and materialized knowledge base.
pub struct Grounder<'a, R: Reasoner + ?Sized, O: Output + ?Sized> {
    kb: &'a KnowledgeBase,
    approximated: &'a BTreeSet<Predicate>,
    reasoner: &'a R,
    output: &'a mut O,
    index: AspifIndex,
    trace: Trace,
    instances: usize,
}

impl<'a, R: Reasoner + ?Sized, O: Output + ?Sized> Grounder<'a, R, O> {
    pub fn new(
        kb: &'a KnowledgeBase,
        approximated: &'a BTreeSet<Predicate>,
        reasoner: &'a R,
        output: &'a mut O,
        trace: Trace,
    ) -> Self {
        Self {
            kb,
            approximated,
            reasoner,
            output,
            index: AspifIndex::new(),
            trace,
            instances: 0,
        }
    }

    pub fn index(&self) -> &AspifIndex {
        &self.index
    }

    pub fn ground_knowledge_base(&mut self) -> Result<GroundingSummary, GroundingError> {
        let start = Instant::now();
        let kb = self.kb;
        self.output.begin()?;
        for fact in kb.facts() {
            self.ground_fact(fact)?;
        }
        let sources = kb
            .data_sources()
            .map(|d| &d.predicate)
            .collect::<BTreeSet<_>>();
        for predicate in sources {
            self.ground_source(predicate)?;
        }
        let mut rules = 0;
        for rule in kb.asp_rules() {
            let instances = self.instances;
            let rule_start = Instant::now();
            let grounded = self
                .ground_asp_rule(rule)
                .map_err(|e| GroundingError::Rule {
                    rule_idx: rule.rule_idx(),
                    source: Box::new(e),
                })?;
            if grounded {
                rules += 1;
                trace!(
                    self.trace,
                    Ground,
                    "Grounded `{rule}` into {} statements in {:?}",
                    self.instances - instances,
                    rule_start.elapsed()
                );
            }
        }
        for show in kb.show_statements() {
            self.ground_show_statement(show)?;
        }
        self.output.end()?;

        let summary = GroundingSummary {
            rules,
            instances: self.instances,
            atoms: self.index.len(),
        };
        trace!(
            self.trace,
            Ground,
            "Grounding: {} rules, {} statements, {} atoms in {:?}",
            summary.rules,
            summary.instances,
            summary.atoms,
            start.elapsed()
        );
        Ok(summary)
    }

    fn emit(&mut self, statement: GroundStatement) -> Result<(), GroundingError> {
        let labels = AtomLabels {
            index: &self.index,
            reasoner: self.reasoner,
        };
        self.output.statement(&statement, &labels)?;
        self.instances += 1;
        Ok(())
    }

    fn is_approximated(&self, predicate: &Predicate) -> bool {
        self.approximated.contains(predicate)
    }

    /// Only facts over approximated predicates need restating.
    pub fn ground_fact(&mut self, fact: &Fact) -> Result<(), GroundingError> {
        if !self.is_approximated(fact.predicate()) {
            return Ok(());
        }
        let terms = fact
            .arguments()
            .iter()
            .map(|t| self.reasoner.get_or_add_constant_id(t.name()))
            .collect::<Result<Vec<_>, _>>()?;
        let atom = self
            .index
            .get_or_create(Fingerprint::new(fact.predicate().clone(), terms), false)?;
        self.emit(GroundStatement::fact(atom))
    }

    /// Rows loaded from data sources are restated like facts,
    /// skipping those already stated.
    pub fn ground_source(&mut self, predicate: &Predicate) -> Result<(), GroundingError> {
        if !self.is_approximated(predicate) {
            return Ok(());
        }
        let reasoner = self.reasoner;
        for tuple in reasoner.source_tuples(predicate)? {
            let fp = Fingerprint::new(predicate.clone(), tuple?);
            if self.index.lookup(&fp).is_none() {
                let atom = self.index.get_or_create(fp, false)?;
                self.emit(GroundStatement::fact(atom))?;
            }
        }
        Ok(())
    }

    /// Returns `false` if the rule was already exact and needed no grounding.
    pub fn ground_asp_rule(&mut self, rule: &AspRule) -> Result<bool, GroundingError> {
        match rule {
            AspRule::Constraint(_) => self.ground_rule(rule, false),
            AspRule::Disjunctive(_) => self.ground_rule(rule, true),
            AspRule::Choice(r) => self.ground_choice_rule(r).map(|()| true),
        }
    }

    fn mappings<'l>(
        &self,
        literals: impl IntoIterator<Item = &'l Literal>,
        variables: &[Symbol],
    ) -> Result<Vec<LiteralMapping>, GroundingError> {
        literals
            .into_iter()
            .map(|l| LiteralMapping::new(l, variables, self.reasoner))
            .collect()
    }

    fn intern_all(
        &mut self,
        mappings: &[LiteralMapping],
        tuple: &[TermId],
    ) -> Result<Vec<i32>, GroundingError> {
        let mut lits = Vec::with_capacity(mappings.len());
        for m in mappings {
            let l = m.intern(tuple, &mut self.index)?;
            if l != TOP {
                lits.push(l);
            }
        }
        Ok(lits)
    }

    /// Constraints and disjunctive rules: one ground rule per instance
    /// of the helper literal.
    pub fn ground_rule(
        &mut self,
        rule: &AspRule,
        is_disjunctive: bool,
    ) -> Result<bool, GroundingError> {
        let heads = rule.head_literals();
        if let [head] = heads.as_slice() {
            if !self.is_approximated(head.predicate()) {
                return Ok(false);
            }
        }

        let variables = rule.body().universal_variables();
        let head = if is_disjunctive {
            self.mappings(heads.iter().map(|h| h.literal()), &variables)?
        } else {
            vec![]
        };
        let body = self.mappings(rule.body().relevant_literals(self.approximated), &variables)?;

        let reasoner = self.reasoner;
        let query = reasoner.query_literal(rule.helper_literal().literal())?;
        for tuple in reasoner.answer_query(&query, true)? {
            let tuple = tuple?;
            let head = self.intern_all(&head, &tuple)?;
            let body = self.intern_all(&body, &tuple)?;
            self.emit(GroundStatement::Rule {
                head: Head::Disjunction(head),
                body: Body::Normal(body),
            })?;
        }
        Ok(true)
    }

    pub fn ground_choice_rule(&mut self, rule: &ChoiceRule) -> Result<(), GroundingError> {
        let relevant = rule.relevant_global_variables();
        let global = rule.global_variables();
        let body_literals = rule
            .body()
            .relevant_literals(self.approximated)
            .collect::<Vec<_>>();
        let body = self.mappings(body_literals.iter().copied(), &global)?;

        let elements = rule
            .head()
            .iter()
            .enumerate()
            .map(|(j, e)| -> Result<_, GroundingError> {
                let variables = rule.element_variables(j);
                let literal = LiteralMapping::new(e.literal.literal(), &variables, self.reasoner)?;
                let condition =
                    self.mappings(e.context.relevant_literals(self.approximated), &variables)?;
                Ok((rule.element_helper_literal(j), literal, condition))
            })
            .collect::<Result<Vec<_>, _>>()?;

        let reasoner = self.reasoner;
        let query = reasoner.query_literal(rule.helper_literal().literal())?;
        for substitution in reasoner.answer_query(&query, true)? {
            let substitution = substitution?;
            let body_help = match body.as_slice() {
                [] => TOP,
                [only] if relevant.len() == global.len() => {
                    only.intern(&substitution, &mut self.index)?
                }
                _ => {
                    let b = self.index.fresh()?;
                    let completions = helper_query(&rule.body_helper_literal(), &substitution);
                    for completion in reasoner.answer_query(&completions, true)? {
                        let completion = completion?;
                        let lits = self.intern_all(&body, &completion)?;
                        self.emit(GroundStatement::Rule {
                            head: Head::Disjunction(vec![b]),
                            body: Body::Normal(lits),
                        })?;
                    }
                    b
                }
            };

            let mut conditions = HashMap::<Vec<i32>, i32>::new();
            let mut chosen = Vec::<(i32, Vec<i32>)>::new();
            for (helper, literal, condition) in &elements {
                let mut groups = Vec::<(i32, Vec<i32>)>::new();
                let query = helper_query(helper, &substitution);
                for local in reasoner.answer_query(&query, true)? {
                    let local = local?;
                    let lit = literal.intern(&local, &mut self.index)?;
                    let lits = self.intern_all(condition, &local)?;
                    let cond = match lits.as_slice() {
                        [] => TOP,
                        [only] => *only,
                        _ => match conditions.get(&lits) {
                            Some(&c) => c,
                            None => {
                                let c = self.index.fresh()?;
                                self.emit(GroundStatement::Rule {
                                    head: Head::Disjunction(vec![c]),
                                    body: Body::Normal(lits.clone()),
                                })?;
                                conditions.insert(lits, c);
                                c
                            }
                        },
                    };
                    match groups.iter_mut().find(|(c, _)| *c == cond) {
                        Some((_, atoms)) => {
                            if !atoms.contains(&lit) {
                                atoms.push(lit);
                            }
                        }
                        None => groups.push((cond, vec![lit])),
                    }
                    match chosen.iter_mut().find(|(l, _)| *l == lit) {
                        Some((_, conds)) => {
                            if !conds.contains(&cond) {
                                conds.push(cond);
                            }
                        }
                        None => chosen.push((lit, vec![cond])),
                    }
                }
                for (cond, atoms) in groups {
                    let guard = [body_help, cond].into_iter().filter(|&l| l != TOP).collect();
                    self.emit(GroundStatement::Rule {
                        head: Head::Choice(atoms),
                        body: Body::Normal(guard),
                    })?;
                }
            }

            self.enforce_bounds(rule, body_help, &chosen)?;
        }
        Ok(())
    }

    /// Weighted gates for the cardinality bounds of one choice instance,
    /// and the constraint that rejects it when they aren't met.
    fn enforce_bounds(
        &mut self,
        rule: &ChoiceRule,
        body_help: i32,
        chosen: &[(i32, Vec<i32>)],
    ) -> Result<(), GroundingError> {
        if rule.lower_bound().is_none() && rule.upper_bound().is_none() {
            return Ok(());
        }

        let mut counted = Vec::with_capacity(chosen.len());
        for (lit, conds) in chosen {
            if conds.contains(&TOP) {
                counted.push(*lit);
            } else {
                let k = self.index.fresh()?;
                for &cond in conds {
                    self.emit(GroundStatement::Rule {
                        head: Head::Disjunction(vec![k]),
                        body: Body::Normal(vec![*lit, cond]),
                    })?;
                }
                counted.push(k);
            }
        }

        let gate = |grounder: &mut Self, bound: i64| -> Result<i32, GroundingError> {
            let g = grounder.index.fresh()?;
            grounder.emit(GroundStatement::Rule {
                head: Head::Disjunction(vec![g]),
                body: Body::Weighted {
                    bound: u64::try_from(bound.max(0)).unwrap_or_default(),
                    elements: counted.iter().map(|&l| (l, 1)).collect(),
                },
            })?;
            Ok(g)
        };
        let lower = rule.lower_bound().map(|l| gate(self, l)).transpose()?;
        let upper = rule
            .upper_bound()
            .map(|u| gate(self, u.saturating_add(1)))
            .transpose()?;

        let satisfied = match (lower, upper) {
            (Some(l), None) => l,
            (None, Some(u)) => -u,
            (Some(l), Some(u)) => {
                let b = self.index.fresh()?;
                self.emit(GroundStatement::Rule {
                    head: Head::Disjunction(vec![b]),
                    body: Body::Normal(vec![l, -u]),
                })?;
                b
            }
            (None, None) => return Ok(()),
        };
        let body = [body_help, -satisfied]
            .into_iter()
            .filter(|&l| l != TOP)
            .collect();
        self.emit(GroundStatement::Rule {
            head: Head::Disjunction(vec![]),
            body: Body::Normal(body),
        })
    }

    /// One show directive per (blank-free) answer, conditional on the
    /// atom if its predicate is approximated.
    pub fn ground_show_statement(&mut self, show: &ShowStatement) -> Result<(), GroundingError> {
        let reasoner = self.reasoner;
        let query = reasoner.query_literal(&show.query_literal())?;
        for tuple in reasoner.answer_query(&query, false)? {
            let tuple = tuple?;
            let name = atom_name(reasoner, &show.predicate, &tuple)?;
            let condition = if self.is_approximated(&show.predicate) {
                let fp = Fingerprint::new(show.predicate.clone(), tuple);
                Some(self.index.get_or_create(fp, false)?)
            } else {
                None
            };
            self.emit(GroundStatement::Show { name, condition })?;
        }
        Ok(())
    }
}
