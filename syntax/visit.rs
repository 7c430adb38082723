//! Walk a syntax tree, i.e., visit every sub-element.

use super::*;

/// Walk a shared borrow of a syntactic element.
///
/// We follow [the standard Rust visitor
/// pattern](https://rust-unofficial.github.io/patterns/patterns/behavioural/visitor.html).
/// The methods in this trait are hooks to be overridden.
/// By default, they all call out to walker functions that
/// in turn call back into the visitor to continue the walk.
pub trait Visit<'a> {
    fn visit_constant(&mut self, _c: &'a Symbol) {}
    fn visit_universal(&mut self, _v: &'a Symbol) {}
    fn visit_existential(&mut self, _v: &'a Symbol) {}
    fn visit_predicate(&mut self, _p: &'a Predicate) {}
    fn visit_term(&mut self, t: &'a Term) {
        visit_term(self, t)
    }
    fn visit_literal(&mut self, l: &'a Literal) {
        visit_literal(self, l)
    }
    fn visit_choice_element(&mut self, e: &'a ChoiceElement) {
        visit_choice_element(self, e)
    }
    fn visit_rule(&mut self, r: &'a Rule) {
        visit_rule(self, r)
    }
    fn visit_asp_rule(&mut self, r: &'a AspRule) {
        visit_asp_rule(self, r)
    }
    fn visit_constraint(&mut self, c: &'a Constraint) {
        visit_constraint(self, c)
    }
    fn visit_disjunctive_rule(&mut self, r: &'a DisjunctiveRule) {
        visit_disjunctive_rule(self, r)
    }
    fn visit_choice_rule(&mut self, r: &'a ChoiceRule) {
        visit_choice_rule(self, r)
    }
    fn visit_statement(&mut self, s: &'a Statement) {
        visit_statement(self, s)
    }
}

pub fn visit_term<'a, V: Visit<'a> + ?Sized>(v: &mut V, t: &'a Term) {
    match t {
        Term::Constant(c) => v.visit_constant(c),
        Term::Universal(s) => v.visit_universal(s),
        Term::Existential(s) => v.visit_existential(s),
    }
}

pub fn visit_literal<'a, V: Visit<'a> + ?Sized>(v: &mut V, literal: &'a Literal) {
    v.visit_predicate(&literal.predicate);
    for arg in &literal.arguments {
        v.visit_term(arg);
    }
}

fn visit_conjunction<'a, V, L>(v: &mut V, conjunction: &'a Conjunction<L>)
where
    V: Visit<'a> + ?Sized,
    L: AsRef<Literal> + Clone,
{
    for l in conjunction {
        v.visit_literal(l.as_ref());
    }
}

pub fn visit_choice_element<'a, V: Visit<'a> + ?Sized>(v: &mut V, element: &'a ChoiceElement) {
    v.visit_literal(element.literal.literal());
    visit_conjunction(v, &element.context);
}

pub fn visit_rule<'a, V: Visit<'a> + ?Sized>(v: &mut V, rule: &'a Rule) {
    visit_conjunction(v, &rule.head);
    visit_conjunction(v, &rule.body);
}

pub fn visit_asp_rule<'a, V: Visit<'a> + ?Sized>(v: &mut V, rule: &'a AspRule) {
    match rule {
        AspRule::Constraint(c) => v.visit_constraint(c),
        AspRule::Disjunctive(r) => v.visit_disjunctive_rule(r),
        AspRule::Choice(r) => v.visit_choice_rule(r),
    }
}

pub fn visit_constraint<'a, V: Visit<'a> + ?Sized>(v: &mut V, constraint: &'a Constraint) {
    visit_conjunction(v, constraint.body());
}

pub fn visit_disjunctive_rule<'a, V: Visit<'a> + ?Sized>(v: &mut V, rule: &'a DisjunctiveRule) {
    visit_conjunction(v, rule.head());
    visit_conjunction(v, rule.body());
}

pub fn visit_choice_rule<'a, V: Visit<'a> + ?Sized>(v: &mut V, rule: &'a ChoiceRule) {
    for e in rule.head() {
        v.visit_choice_element(e);
    }
    visit_conjunction(v, rule.body());
}

pub fn visit_statement<'a, V: Visit<'a> + ?Sized>(v: &mut V, statement: &'a Statement) {
    match statement {
        Statement::Fact(f) => v.visit_literal(f.literal().literal()),
        Statement::Rule(r) => v.visit_rule(r),
        Statement::Asp(r) => v.visit_asp_rule(r),
        Statement::Show(s) => v.visit_predicate(&s.predicate),
        Statement::DataSource(d) => v.visit_predicate(&d.predicate),
    }
}

/// Elements that can start a walk.
pub trait Walk {
    fn walk<'a, V: Visit<'a> + ?Sized>(&'a self, v: &mut V);
}

impl Walk for Literal {
    fn walk<'a, V: Visit<'a> + ?Sized>(&'a self, v: &mut V) {
        v.visit_literal(self)
    }
}

impl<L: AsRef<Literal> + Clone> Walk for Conjunction<L> {
    fn walk<'a, V: Visit<'a> + ?Sized>(&'a self, v: &mut V) {
        visit_conjunction(v, self)
    }
}

impl Walk for Rule {
    fn walk<'a, V: Visit<'a> + ?Sized>(&'a self, v: &mut V) {
        v.visit_rule(self)
    }
}

impl Walk for AspRule {
    fn walk<'a, V: Visit<'a> + ?Sized>(&'a self, v: &mut V) {
        v.visit_asp_rule(self)
    }
}

impl Walk for Statement {
    fn walk<'a, V: Visit<'a> + ?Sized>(&'a self, v: &mut V) {
        v.visit_statement(self)
    }
}
