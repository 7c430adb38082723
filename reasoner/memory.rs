//! A naïve in-memory materializer: stratified bottom-up evaluation by
//! nested-loop joins, with a restricted chase for existential heads.

use std::cell::{Cell, RefCell};
use std::collections::{BTreeMap, BTreeSet, HashSet};
use std::time::Instant;

use gavotte_syntax::{
    DataSourceDeclaration, Fact, KnowledgeBase, Literal, Predicate, Rule, Symbol, Term,
};
use gavotte_tracer::{trace, Trace};

use crate::dictionary::Dictionary;
use crate::strata::stratify;
use crate::{source, Cursor, Pattern, Query, Reasoner, ReasonerError, TermId, Tuple, Value};

/// Map variable names to term identifiers.
type Bindings = BTreeMap<Symbol, TermId>;

#[derive(Debug, Default)]
struct Relation {
    tuples: Vec<Tuple>,
    members: HashSet<Tuple>,
}

impl Relation {
    fn insert(&mut self, tuple: Tuple) -> bool {
        if self.members.insert(tuple.clone()) {
            self.tuples.push(tuple);
            true
        } else {
            false
        }
    }

    fn contains(&self, tuple: &Tuple) -> bool {
        self.members.contains(tuple)
    }
}

type Relations = BTreeMap<Predicate, Relation>;

/// A rule with its constants resolved and its literals sorted by role.
#[derive(Debug)]
struct CompiledRule {
    head: Vec<Query>,
    positive: Vec<Query>,
    negative: Vec<Query>,
    existentials: Vec<Symbol>,
}

fn compile_literal(literal: &Literal, dictionary: &mut Dictionary) -> Query {
    Query::new(
        literal.predicate.clone(),
        literal
            .arguments
            .iter()
            .map(|t| match t {
                Term::Constant(c) => Pattern::Bound(dictionary.get_or_add(c)),
                Term::Universal(v) | Term::Existential(v) => Pattern::Free(v.clone()),
            })
            .collect(),
    )
}

fn compile(rule: &Rule, dictionary: &mut Dictionary) -> Result<CompiledRule, ReasonerError> {
    let bound = rule.body.bound_variables();
    let unsafe_variable = |variable: &Symbol| ReasonerError::UnsafeRule {
        variable: variable.clone(),
        rule: rule.to_string(),
    };
    for l in rule.body.iter().filter(|l| l.negated) {
        for t in &l.arguments {
            if let Term::Universal(v) = t {
                if !bound.contains(v) {
                    return Err(unsafe_variable(v));
                }
            }
        }
    }
    let mut existentials = BTreeSet::new();
    for h in &rule.head {
        for t in h.arguments() {
            match t {
                Term::Universal(v) if !bound.contains(v) => return Err(unsafe_variable(v)),
                Term::Existential(v) => {
                    existentials.insert(v.clone());
                }
                _ => (),
            }
        }
    }
    Ok(CompiledRule {
        head: rule
            .head
            .iter()
            .map(|h| compile_literal(h.literal(), dictionary))
            .collect(),
        positive: rule
            .body
            .iter()
            .filter(|l| l.is_positive())
            .map(|l| compile_literal(l, dictionary))
            .collect(),
        negative: rule
            .body
            .iter()
            .filter(|l| l.negated)
            .map(|l| compile_literal(l, dictionary))
            .collect(),
        existentials: existentials.into_iter().collect(),
    })
}

fn unify(atom: &Query, tuple: &[TermId], bindings: &Bindings) -> Option<Bindings> {
    let mut bindings = bindings.clone();
    for (p, &id) in atom.pattern.iter().zip(tuple) {
        match p {
            Pattern::Bound(b) if *b != id => return None,
            Pattern::Bound(_) => (),
            Pattern::Free(v) => match bindings.get(v) {
                Some(&other) if other != id => return None,
                Some(_) => (),
                None => {
                    bindings.insert(v.clone(), id);
                }
            },
        }
    }
    Some(bindings)
}

fn instantiate(atom: &Query, bindings: &Bindings) -> Option<Tuple> {
    atom.pattern
        .iter()
        .map(|p| match p {
            Pattern::Bound(id) => Some(*id),
            Pattern::Free(v) => bindings.get(v).copied(),
        })
        .collect()
}

/// Extend `bindings` to every match of all `atoms`.
fn join(relations: &Relations, atoms: &[Query], bindings: Bindings, out: &mut Vec<Bindings>) {
    match atoms.split_first() {
        None => out.push(bindings),
        Some((atom, rest)) => {
            if let Some(relation) = relations.get(&atom.predicate) {
                for tuple in &relation.tuples {
                    if let Some(b) = unify(atom, tuple, &bindings) {
                        join(relations, rest, b, out);
                    }
                }
            }
        }
    }
}

/// Counts the cursors it guards, uncounting on drop.
struct CursorGuard<'a>(&'a Cell<usize>);

impl<'a> CursorGuard<'a> {
    fn open(count: &'a Cell<usize>) -> Self {
        count.set(count.get() + 1);
        Self(count)
    }
}

impl Drop for CursorGuard<'_> {
    fn drop(&mut self) {
        self.0.set(self.0.get() - 1);
    }
}

/// Materializes the facts, data sources, and plain rules of a knowledge
/// base. ASP rules are ignored; their approximations are plain rules.
#[derive(Debug)]
pub struct MemoryReasoner {
    facts: Vec<Fact>,
    sources: Vec<DataSourceDeclaration>,
    rules: Vec<Rule>,
    dictionary: RefCell<Dictionary>,
    relations: Relations,
    loaded: Relations,
    materialized: bool,
    open_cursors: Cell<usize>,
    trace: Trace,
}

impl MemoryReasoner {
    pub fn new(kb: &KnowledgeBase, trace: Trace) -> Self {
        Self {
            facts: kb.facts().cloned().collect(),
            sources: kb.data_sources().cloned().collect(),
            rules: kb.rules().cloned().collect(),
            dictionary: RefCell::new(Dictionary::default()),
            relations: Relations::new(),
            loaded: Relations::new(),
            materialized: false,
            open_cursors: Cell::new(0),
            trace,
        }
    }

    /// Compute all consequences of the loaded statements.
    pub fn reason(&mut self) -> Result<(), ReasonerError> {
        let start = Instant::now();
        self.materialized = false;
        self.relations.clear();
        self.loaded.clear();

        let dictionary = self.dictionary.get_mut();
        for fact in &self.facts {
            let tuple = fact
                .arguments()
                .iter()
                .map(|t| dictionary.get_or_add(t.name()))
                .collect();
            self.relations
                .entry(fact.predicate().clone())
                .or_default()
                .insert(tuple);
        }
        for declaration in &self.sources {
            let rows = source::load(declaration)?;
            trace!(
                self.trace,
                Materialize,
                "Loaded {} rows for {} from {}",
                rows.len(),
                declaration.predicate,
                declaration.source
            );
            let relation = self
                .relations
                .entry(declaration.predicate.clone())
                .or_default();
            let loaded = self.loaded.entry(declaration.predicate.clone()).or_default();
            for row in rows {
                let tuple = row.iter().map(|c| dictionary.get_or_add(c)).collect::<Tuple>();
                loaded.insert(tuple.clone());
                relation.insert(tuple);
            }
        }

        let rules = self
            .rules
            .iter()
            .map(|r| compile(r, dictionary))
            .collect::<Result<Vec<_>, _>>()?;
        let strata = stratify(&self.rules)?;
        for (i, stratum) in strata.iter().enumerate() {
            let mut rounds = 0;
            loop {
                rounds += 1;
                let mut added = 0;
                for &r in stratum {
                    added += self.apply(&rules[r]);
                }
                if added == 0 {
                    break;
                }
            }
            trace!(
                self.trace,
                Materialize,
                "Stratum {i}: {} rules, fixpoint after {rounds} rounds",
                stratum.len()
            );
        }

        self.materialized = true;
        trace!(
            self.trace,
            Materialize,
            "Materialized {} facts over {} predicates and {} terms in {:?}",
            self.fact_count(),
            self.relations.len(),
            self.dictionary.borrow().len(),
            start.elapsed()
        );
        Ok(())
    }

    /// Fire a rule on every match; returns the number of new facts.
    fn apply(&mut self, rule: &CompiledRule) -> usize {
        let mut matches = Vec::new();
        join(&self.relations, &rule.positive, Bindings::new(), &mut matches);
        let mut added = 0;
        for mut bindings in matches {
            let blocked = rule.negative.iter().any(|n| {
                instantiate(n, &bindings)
                    .zip(self.relations.get(&n.predicate))
                    .map(|(t, r)| r.contains(&t))
                    .unwrap_or(false)
            });
            if blocked {
                continue;
            }
            if !rule.existentials.is_empty() {
                let mut witnesses = Vec::new();
                join(&self.relations, &rule.head, bindings.clone(), &mut witnesses);
                if !witnesses.is_empty() {
                    continue;
                }
                let dictionary = self.dictionary.get_mut();
                for v in &rule.existentials {
                    bindings.insert(v.clone(), dictionary.fresh_null());
                }
            }
            for h in &rule.head {
                if let Some(tuple) = instantiate(h, &bindings) {
                    if self
                        .relations
                        .entry(h.predicate.clone())
                        .or_default()
                        .insert(tuple)
                    {
                        added += 1;
                    }
                }
            }
        }
        added
    }

    pub fn fact_count(&self) -> usize {
        self.relations.values().map(|r| r.tuples.len()).sum()
    }

    /// How many cursors are currently open.
    pub fn open_cursors(&self) -> usize {
        self.open_cursors.get()
    }
}

impl Reasoner for MemoryReasoner {
    fn answer_query(
        &self,
        query: &Query,
        include_blanks: bool,
    ) -> Result<Cursor<'_>, ReasonerError> {
        if !self.materialized {
            return Err(ReasonerError::NotMaterialized);
        }
        if query.pattern.len() != query.predicate.arity {
            return Err(ReasonerError::ArityMismatch {
                predicate: query.predicate.clone(),
                expected: query.predicate.arity,
                found: query.pattern.len(),
            });
        }
        let tuples = self
            .relations
            .get(&query.predicate)
            .map(|r| r.tuples.as_slice())
            .unwrap_or_default();
        let guard = CursorGuard::open(&self.open_cursors);
        let query = query.clone();
        let dictionary = &self.dictionary;
        Ok(Box::new(
            tuples
                .iter()
                .filter(move |t| {
                    let _guard = &guard;
                    query.matches(t)
                        && (include_blanks || !t.iter().any(|&id| dictionary.borrow().is_null(id)))
                })
                .map(|t| Ok::<_, ReasonerError>(t.clone())),
        ))
    }

    fn source_tuples(&self, predicate: &Predicate) -> Result<Cursor<'_>, ReasonerError> {
        if !self.materialized {
            return Err(ReasonerError::NotMaterialized);
        }
        let tuples = self
            .loaded
            .get(predicate)
            .map(|r| r.tuples.as_slice())
            .unwrap_or_default();
        let guard = CursorGuard::open(&self.open_cursors);
        Ok(Box::new(tuples.iter().map(move |t| {
            let _guard = &guard;
            Ok::<_, ReasonerError>(t.clone())
        })))
    }

    fn get_or_add_constant_id(&self, constant: &Symbol) -> Result<TermId, ReasonerError> {
        Ok(self.dictionary.borrow_mut().get_or_add(constant))
    }

    fn get_constant(&self, id: TermId) -> Result<Value, ReasonerError> {
        self.dictionary
            .borrow()
            .value(id)
            .cloned()
            .ok_or(ReasonerError::UnknownTerm(id))
    }
}

#[cfg(test)]
mod test {
    use super::*;
    use gavotte_syntax::{
        cst, evar, lit, neg, pos, uvar, Conjunction, DataSource, PositiveLiteral,
    };

    fn rule(
        head: impl IntoIterator<Item = PositiveLiteral>,
        body: impl IntoIterator<Item = Literal>,
    ) -> Rule {
        Rule::new(Conjunction::new(head), Conjunction::new(body))
    }

    fn fact(literal: PositiveLiteral) -> Fact {
        Fact::new(literal).unwrap()
    }

    fn answers(
        reasoner: &MemoryReasoner,
        literal: &Literal,
        include_blanks: bool,
    ) -> BTreeSet<String> {
        let query = reasoner.query_literal(literal).unwrap();
        reasoner
            .answer_query(&query, include_blanks)
            .unwrap()
            .map(|t| {
                t.unwrap()
                    .into_iter()
                    .map(|id| reasoner.get_constant(id).unwrap().to_string())
                    .collect::<Vec<_>>()
                    .join(",")
            })
            .collect()
    }

    fn graph() -> KnowledgeBase {
        let mut kb = KnowledgeBase::new();
        kb.add_statements([
            fact(pos!(e(cst!(a), cst!(b)))),
            fact(pos!(e(cst!(b), cst!(c)))),
            fact(pos!(e(cst!(c), cst!(d)))),
        ])
        .unwrap();
        kb.add_statements([
            rule([pos!(path(uvar!(X), uvar!(Y)))], [lit!(e(uvar!(X), uvar!(Y)))]),
            rule(
                [pos!(path(uvar!(X), uvar!(Z)))],
                [lit!(path(uvar!(X), uvar!(Y))), lit!(e(uvar!(Y), uvar!(Z)))],
            ),
            rule([pos!(node(uvar!(X)))], [lit!(e(uvar!(X), uvar!(Y)))]),
            rule([pos!(node(uvar!(Y)))], [lit!(e(uvar!(X), uvar!(Y)))]),
            rule(
                [pos!(unreachable(uvar!(X)))],
                [lit!(node(uvar!(X))), neg!(path(cst!(a), uvar!(X)))],
            ),
        ])
        .unwrap();
        kb
    }

    #[test]
    fn transitive_closure() {
        let mut r = MemoryReasoner::new(&graph(), Trace::none());
        r.reason().unwrap();
        assert_eq!(
            answers(&r, &lit!(path(cst!(a), uvar!(Y))), false),
            ["a,b", "a,c", "a,d"].into_iter().map(String::from).collect()
        );
        assert_eq!(
            answers(&r, &lit!(unreachable(uvar!(X))), false),
            ["a"].into_iter().map(String::from).collect()
        );
        assert_eq!(
            answers(&r, &lit!(path(uvar!(X), uvar!(X))), false),
            BTreeSet::new()
        );
    }

    #[test]
    fn restricted_chase() {
        let mut kb = KnowledgeBase::new();
        kb.add_statements([
            fact(pos!(person(cst!(alice)))),
            fact(pos!(person(cst!(bob)))),
            fact(pos!(parent(cst!(bob), cst!(carol)))),
        ])
        .unwrap();
        kb.add_statement(rule(
            [pos!(parent(uvar!(X), evar!(Y)))],
            [lit!(person(uvar!(X)))],
        ))
        .unwrap();
        let mut r = MemoryReasoner::new(&kb, Trace::none());
        r.reason().unwrap();
        let all = lit!(parent(uvar!(X), uvar!(Y)));
        assert_eq!(
            answers(&r, &all, true),
            ["alice,_:0", "bob,carol"].into_iter().map(String::from).collect()
        );
        assert_eq!(
            answers(&r, &all, false),
            ["bob,carol"].into_iter().map(String::from).collect()
        );
    }

    #[test]
    fn unsafe_rules() {
        let mut kb = KnowledgeBase::new();
        kb.add_statement(rule([pos!(p(uvar!(X)))], [neg!(q(uvar!(X)))]))
            .unwrap();
        let mut r = MemoryReasoner::new(&kb, Trace::none());
        assert!(matches!(r.reason(), Err(ReasonerError::UnsafeRule { .. })));
    }

    #[test]
    fn cursors() {
        let mut r = MemoryReasoner::new(&graph(), Trace::none());
        let query = r.query_literal(&lit!(e(uvar!(X), uvar!(Y)))).unwrap();
        assert!(matches!(
            r.answer_query(&query, true),
            Err(ReasonerError::NotMaterialized)
        ));
        r.reason().unwrap();
        {
            let mut outer = r.answer_query(&query, true).unwrap();
            let inner = r.answer_query(&query, true).unwrap();
            assert_eq!(r.open_cursors(), 2);
            assert!(outer.next().is_some());
            drop(inner);
            assert_eq!(r.open_cursors(), 1);
        }
        assert_eq!(r.open_cursors(), 0);
        assert_eq!(r.answer_query(&query, true).unwrap().count(), 3);
        assert_eq!(r.open_cursors(), 0);
    }

    #[test]
    fn source_rows() {
        let dir = tempfile::tempdir().unwrap();
        let path = dir.path().join("edges.csv");
        std::fs::write(&path, "a,b\nb,c\na,b\n").unwrap();
        let e = Predicate::new("e", 2);
        let mut kb = KnowledgeBase::new();
        kb.add_statement(DataSourceDeclaration::new(e.clone(), DataSource::Csv(path)))
            .unwrap();
        kb.add_statement(rule(
            [pos!(e(uvar!(Y), uvar!(X)))],
            [lit!(e(uvar!(X), uvar!(Y)))],
        ))
        .unwrap();

        let mut r = MemoryReasoner::new(&kb, Trace::none());
        assert!(matches!(
            r.source_tuples(&e),
            Err(ReasonerError::NotMaterialized)
        ));
        r.reason().unwrap();
        let loaded = r
            .source_tuples(&e)
            .unwrap()
            .map(|t| {
                t.unwrap()
                    .into_iter()
                    .map(|id| r.get_constant(id).unwrap().to_string())
                    .collect::<Vec<_>>()
                    .join(",")
            })
            .collect::<Vec<_>>();
        assert_eq!(loaded, ["a,b", "b,c"]);
        assert_eq!(answers(&r, &lit!(e(uvar!(X), uvar!(Y))), false).len(), 4);
        assert_eq!(r.source_tuples(&Predicate::new("f", 1)).unwrap().count(), 0);
        assert_eq!(r.open_cursors(), 0);
    }

    #[test]
    fn dictionary() {
        let r = MemoryReasoner::new(&KnowledgeBase::new(), Trace::none());
        let a = r.get_or_add_constant_id(&Symbol::from("a")).unwrap();
        assert_eq!(r.get_or_add_constant_id(&Symbol::from("a")).unwrap(), a);
        assert_eq!(r.get_constant(a).unwrap(), Value::Constant(Symbol::from("a")));
        assert!(matches!(
            r.get_constant(a + 100),
            Err(ReasonerError::UnknownTerm(_))
        ));
    }
}
