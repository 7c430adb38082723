//! A knowledge base: an insertion-ordered set of statements.

use std::collections::{BTreeMap, BTreeSet};
use std::fmt;

use crate::{
    AspRule, Constants as _, DataSourceDeclaration, Fact, ModelError, Predicate,
    Predicates as _, Rule, ShowStatement, Statement, Symbol,
};

/// Observe changes to a knowledge base.
pub trait KnowledgeBaseListener {
    fn statement_added(&mut self, _statement: &Statement) {}
    fn statement_removed(&mut self, _statement: &Statement) {}
}

#[derive(Default)]
pub struct KnowledgeBase {
    statements: Vec<Statement>,
    members: BTreeSet<Statement>,
    facts_by_predicate: BTreeMap<Predicate, BTreeSet<Fact>>,
    rule_indices: BTreeSet<u32>,
    listeners: Vec<Box<dyn KnowledgeBaseListener>>,
}

impl KnowledgeBase {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn add_listener(&mut self, listener: Box<dyn KnowledgeBaseListener>) {
        self.listeners.push(listener);
    }

    /// Add a statement; returns `false` if it was already present.
    /// ASP rules must carry a rule index not used by any other rule.
    pub fn add_statement(&mut self, statement: impl Into<Statement>) -> Result<bool, ModelError> {
        let statement = statement.into();
        if self.members.contains(&statement) {
            return Ok(false);
        }
        match &statement {
            Statement::Asp(rule) => {
                if !self.rule_indices.insert(rule.rule_idx()) {
                    return Err(ModelError::DuplicateRuleIndex(rule.rule_idx()));
                }
            }
            Statement::Fact(fact) => {
                self.facts_by_predicate
                    .entry(fact.predicate().clone())
                    .or_default()
                    .insert(fact.clone());
            }
            _ => (),
        }
        self.members.insert(statement.clone());
        for listener in self.listeners.iter_mut() {
            listener.statement_added(&statement);
        }
        self.statements.push(statement);
        Ok(true)
    }

    /// Add several statements; returns how many were new.
    pub fn add_statements(
        &mut self,
        statements: impl IntoIterator<Item = impl Into<Statement>>,
    ) -> Result<usize, ModelError> {
        let mut added = 0;
        for s in statements {
            if self.add_statement(s)? {
                added += 1;
            }
        }
        Ok(added)
    }

    /// Remove a statement; returns `false` if it was not present.
    pub fn remove_statement(&mut self, statement: &Statement) -> bool {
        if !self.members.remove(statement) {
            return false;
        }
        self.statements.retain(|s| s != statement);
        match statement {
            Statement::Asp(rule) => {
                self.rule_indices.remove(&rule.rule_idx());
            }
            Statement::Fact(fact) => {
                if let Some(facts) = self.facts_by_predicate.get_mut(fact.predicate()) {
                    facts.remove(fact);
                    if facts.is_empty() {
                        self.facts_by_predicate.remove(fact.predicate());
                    }
                }
            }
            _ => (),
        }
        for listener in self.listeners.iter_mut() {
            listener.statement_removed(statement);
        }
        true
    }

    pub fn remove_statements<'s>(
        &mut self,
        statements: impl IntoIterator<Item = &'s Statement>,
    ) -> usize {
        statements
            .into_iter()
            .filter(|s| self.remove_statement(s))
            .count()
    }

    pub fn statements(&self) -> &[Statement] {
        &self.statements
    }

    pub fn len(&self) -> usize {
        self.statements.len()
    }

    pub fn is_empty(&self) -> bool {
        self.statements.is_empty()
    }

    pub fn facts(&self) -> impl Iterator<Item = &Fact> {
        self.statements.iter().filter_map(|s| match s {
            Statement::Fact(f) => Some(f),
            _ => None,
        })
    }

    pub fn facts_of(&self, predicate: &Predicate) -> impl Iterator<Item = &Fact> {
        self.facts_by_predicate
            .get(predicate)
            .into_iter()
            .flat_map(|facts| facts.iter())
    }

    pub fn rules(&self) -> impl Iterator<Item = &Rule> {
        self.statements.iter().filter_map(|s| match s {
            Statement::Rule(r) => Some(r),
            _ => None,
        })
    }

    pub fn asp_rules(&self) -> impl Iterator<Item = &AspRule> {
        self.statements.iter().filter_map(|s| match s {
            Statement::Asp(r) => Some(r),
            _ => None,
        })
    }

    pub fn show_statements(&self) -> impl Iterator<Item = &ShowStatement> {
        self.statements.iter().filter_map(|s| match s {
            Statement::Show(s) => Some(s),
            _ => None,
        })
    }

    pub fn data_sources(&self) -> impl Iterator<Item = &DataSourceDeclaration> {
        self.statements.iter().filter_map(|s| match s {
            Statement::DataSource(d) => Some(d),
            _ => None,
        })
    }

    /// Every predicate mentioned by any statement.
    pub fn predicates(&self) -> BTreeSet<Predicate> {
        self.statements.iter().flat_map(|s| s.predicates()).collect()
    }

    /// Every constant mentioned by any statement.
    pub fn constants(&self) -> BTreeSet<Symbol> {
        self.statements.iter().flat_map(|s| s.constants()).collect()
    }

    /// The least rule index not below any index in use.
    pub fn next_rule_idx(&self) -> Result<u32, ModelError> {
        match self.rule_indices.last() {
            None => Ok(0),
            Some(i) => i.checked_add(1).ok_or(ModelError::RuleIndexOverflow),
        }
    }

    /// Show every user predicate.
    pub fn show_all_predicates(&mut self) -> Result<usize, ModelError> {
        let shows = self
            .predicates()
            .into_iter()
            .filter(|p| !p.is_helper())
            .map(ShowStatement::new)
            .collect::<Vec<_>>();
        self.add_statements(shows)
    }
}

impl fmt::Debug for KnowledgeBase {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("KnowledgeBase")
            .field("statements", &self.statements)
            .field("listeners", &self.listeners.len())
            .finish()
    }
}

impl fmt::Display for KnowledgeBase {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        for s in &self.statements {
            writeln!(f, "{s}")?;
        }
        Ok(())
    }
}

#[cfg(test)]
mod test {
    use std::cell::RefCell;
    use std::rc::Rc;

    use super::*;
    use crate::{Conjunction, Constraint, Literal, PositiveLiteral, Term};

    fn fact(p: &str, c: &str) -> Fact {
        Fact::new(PositiveLiteral::new(p, [Term::constant(c)])).unwrap()
    }

    fn constraint(idx: u32) -> AspRule {
        Constraint::new(
            Conjunction::new([Literal::positive("p", [Term::universal("X")])]),
            idx,
        )
        .unwrap()
        .into()
    }

    #[test]
    fn insertion_order_and_dedup() {
        let mut kb = KnowledgeBase::new();
        assert_eq!(kb.add_statement(fact("p", "b")), Ok(true));
        assert_eq!(kb.add_statement(fact("p", "a")), Ok(true));
        assert_eq!(kb.add_statement(fact("p", "b")), Ok(false));
        assert_eq!(
            kb.facts().map(ToString::to_string).collect::<Vec<_>>(),
            ["p(b) .", "p(a) ."]
        );
        assert_eq!(kb.facts_of(&Predicate::new("p", 1)).count(), 2);
        assert_eq!(kb.facts_of(&Predicate::new("q", 1)).count(), 0);
        assert!(kb.remove_statement(&fact("p", "b").into()));
        assert!(!kb.remove_statement(&fact("p", "b").into()));
        assert_eq!(kb.facts_of(&Predicate::new("p", 1)).count(), 1);
    }

    #[test]
    fn unique_rule_indices() {
        let mut kb = KnowledgeBase::new();
        assert_eq!(kb.next_rule_idx(), Ok(0));
        assert_eq!(kb.add_statement(constraint(0)), Ok(true));
        assert_eq!(kb.add_statement(constraint(0)), Ok(false));
        let other = Constraint::new(
            Conjunction::new([Literal::positive("q", [Term::universal("X")])]),
            0,
        )
        .unwrap();
        assert_eq!(
            kb.add_statement(AspRule::from(other)),
            Err(ModelError::DuplicateRuleIndex(0))
        );
        assert_eq!(kb.next_rule_idx(), Ok(1));
        assert_eq!(kb.add_statement(constraint(u32::MAX)), Ok(true));
        assert_eq!(kb.next_rule_idx(), Err(ModelError::RuleIndexOverflow));
    }

    #[test]
    fn removal() {
        struct Removed(Rc<RefCell<Vec<String>>>);
        impl KnowledgeBaseListener for Removed {
            fn statement_removed(&mut self, s: &Statement) {
                self.0.borrow_mut().push(s.to_string());
            }
        }

        let removed = Rc::new(RefCell::new(Vec::new()));
        let mut kb = KnowledgeBase::new();
        kb.add_listener(Box::new(Removed(Rc::clone(&removed))));
        kb.add_statements([fact("p", "a"), fact("p", "b"), fact("q", "a")])
            .unwrap();
        kb.add_statement(constraint(0)).unwrap();

        let gone = [
            Statement::from(fact("p", "a")),
            Statement::from(constraint(0)),
            Statement::from(fact("r", "a")),
        ];
        assert_eq!(kb.remove_statements(&gone), 2);
        assert_eq!(*removed.borrow(), ["p(a) .", ":- p(?X) ."]);
        assert_eq!(
            kb.facts_of(&Predicate::new("p", 1))
                .map(ToString::to_string)
                .collect::<Vec<_>>(),
            ["p(b) ."]
        );
        assert_eq!(kb.next_rule_idx(), Ok(0));
        assert_eq!(kb.add_statement(constraint(0)), Ok(true));

        kb.remove_statements(&[Statement::from(fact("p", "b"))]);
        assert_eq!(kb.facts_of(&Predicate::new("p", 1)).count(), 0);
        assert_eq!(kb.len(), 2);
        assert_eq!(removed.borrow().len(), 3);
    }

    #[test]
    fn listeners() {
        struct Counter(Rc<RefCell<(usize, usize)>>);
        impl KnowledgeBaseListener for Counter {
            fn statement_added(&mut self, _: &Statement) {
                self.0.borrow_mut().0 += 1;
            }
            fn statement_removed(&mut self, _: &Statement) {
                self.0.borrow_mut().1 += 1;
            }
        }

        let counts = Rc::new(RefCell::new((0, 0)));
        let mut kb = KnowledgeBase::new();
        kb.add_listener(Box::new(Counter(Rc::clone(&counts))));
        kb.add_statements([fact("p", "a"), fact("p", "a"), fact("q", "a")])
            .unwrap();
        kb.remove_statement(&fact("q", "a").into());
        assert_eq!(*counts.borrow(), (2, 1));
    }

    #[test]
    fn show_all() {
        let mut kb = KnowledgeBase::new();
        kb.add_statements([fact("p", "a"), fact("q", "a")]).unwrap();
        kb.add_statement(constraint(0)).unwrap();
        assert_eq!(kb.show_all_predicates(), Ok(2));
        assert_eq!(kb.show_statements().count(), 2);
        assert_eq!(
            kb.constants(),
            [Symbol::from("a")].into_iter().collect()
        );
    }
}
