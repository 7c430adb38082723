//! ASP rules: constraints, disjunctive rules, and choice rules.
//!
//! None of these can be evaluated directly by a materializing reasoner.
//! Instead, each rule rewrites itself into plain rules that derive a
//! superset of its true consequences (its _approximation_), and the
//! grounder recovers the exact semantics from the ground instances
//! of the rule's helper literals.

use std::collections::BTreeSet;
use std::fmt;

use crate::safety::Safety;
use crate::{
    Conjunction, HelperKey, HelperKind, Literal, ModelError, PositiveLiteral, Predicate, Rule,
    Symbol, Term,
};

fn helper_rule(head: PositiveLiteral, body: impl IntoIterator<Item = Literal>) -> Rule {
    Rule::new(Conjunction::new([head]), Conjunction::new(body))
}

/// Universal variables of a literal, in order, without repetition.
fn push_variables(variables: &mut Vec<Symbol>, literal: &Literal) {
    for t in &literal.arguments {
        if let Term::Universal(v) = t {
            if !variables.contains(v) {
                variables.push(v.clone());
            }
        }
    }
}

/// `:- body .`
#[derive(Clone, Debug, Eq, Hash, Ord, PartialEq, PartialOrd)]
pub struct Constraint {
    body: Conjunction<Literal>,
    rule_idx: u32,
}

impl Constraint {
    pub fn new(body: Conjunction<Literal>, rule_idx: u32) -> Result<Self, ModelError> {
        if body.is_empty() {
            return Err(ModelError::EmptyBody);
        }
        let rule = Self { body, rule_idx };
        rule.check_safety()?;
        Ok(rule)
    }

    pub fn body(&self) -> &Conjunction<Literal> {
        &self.body
    }

    pub fn rule_idx(&self) -> u32 {
        self.rule_idx
    }

    /// All body variables.
    pub fn helper_literal(&self) -> PositiveLiteral {
        PositiveLiteral::helper(
            HelperKey {
                kind: HelperKind::Instance,
                rule_idx: self.rule_idx,
                element: None,
            },
            &self.body.universal_variables(),
        )
    }

    pub fn approximation(&self, approximated: &BTreeSet<Predicate>) -> Vec<Rule> {
        vec![helper_rule(
            self.helper_literal(),
            self.body.simplified(approximated, true).literals().to_vec(),
        )]
    }
}

impl fmt::Display for Constraint {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_fmt(format_args!(":- {} .", self.body))
    }
}

/// `h1 | ... | hn :- body .`
#[derive(Clone, Debug, Eq, Hash, Ord, PartialEq, PartialOrd)]
pub struct DisjunctiveRule {
    head: Conjunction<PositiveLiteral>,
    body: Conjunction<Literal>,
    rule_idx: u32,
}

impl DisjunctiveRule {
    pub fn new(
        head: Conjunction<PositiveLiteral>,
        body: Conjunction<Literal>,
        rule_idx: u32,
    ) -> Result<Self, ModelError> {
        let rule = Self {
            head,
            body,
            rule_idx,
        };
        if rule.head.is_empty() {
            return Err(ModelError::EmptyHead(rule.to_string()));
        }
        rule.check_safety()?;
        Ok(rule)
    }

    pub fn head(&self) -> &Conjunction<PositiveLiteral> {
        &self.head
    }

    pub fn body(&self) -> &Conjunction<Literal> {
        &self.body
    }

    pub fn rule_idx(&self) -> u32 {
        self.rule_idx
    }

    /// A proper disjunction can't be materialized.
    pub fn requires_approximation(&self) -> bool {
        self.head.len() > 1
    }

    /// All body variables.
    pub fn helper_literal(&self) -> PositiveLiteral {
        PositiveLiteral::helper(
            HelperKey {
                kind: HelperKind::Instance,
                rule_idx: self.rule_idx,
                element: None,
            },
            &self.body.universal_variables(),
        )
    }

    pub fn approximation(&self, approximated: &BTreeSet<Predicate>) -> Vec<Rule> {
        let helper = self.helper_literal();
        vec![
            helper_rule(
                helper.clone(),
                self.body.simplified(approximated, true).literals().to_vec(),
            ),
            Rule::new(self.head.clone(), Conjunction::new([Literal::from(helper)])),
        ]
    }
}

impl fmt::Display for DisjunctiveRule {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        let head = self
            .head
            .iter()
            .map(ToString::to_string)
            .collect::<Vec<_>>()
            .join(" | ");
        if self.body.is_empty() {
            f.write_fmt(format_args!("{head} ."))
        } else {
            f.write_fmt(format_args!("{head} :- {} .", self.body))
        }
    }
}

/// One selectable literal of a choice rule, guarded by a local context.
#[derive(Clone, Debug, Eq, Hash, Ord, PartialEq, PartialOrd)]
pub struct ChoiceElement {
    pub literal: PositiveLiteral,
    pub context: Conjunction<Literal>,
}

impl ChoiceElement {
    pub fn new(literal: PositiveLiteral, context: Conjunction<Literal>) -> Self {
        Self { literal, context }
    }

    /// Variables of the literal, then of the context.
    pub fn variables(&self) -> Vec<Symbol> {
        let mut variables = Vec::new();
        push_variables(&mut variables, self.literal.literal());
        for l in &self.context {
            push_variables(&mut variables, l);
        }
        variables
    }
}

impl fmt::Display for ChoiceElement {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        if self.context.is_empty() {
            self.literal.fmt(f)
        } else {
            f.write_fmt(format_args!("{} : {}", self.literal, self.context))
        }
    }
}

/// `l { e1 ; ... ; en } u :- body .`
#[derive(Clone, Debug, Eq, Hash, Ord, PartialEq, PartialOrd)]
pub struct ChoiceRule {
    head: Vec<ChoiceElement>,
    lower_bound: Option<i64>,
    upper_bound: Option<i64>,
    body: Conjunction<Literal>,
    rule_idx: u32,
}

impl ChoiceRule {
    pub fn new(
        head: Vec<ChoiceElement>,
        lower_bound: Option<i64>,
        upper_bound: Option<i64>,
        body: Conjunction<Literal>,
        rule_idx: u32,
    ) -> Result<Self, ModelError> {
        let rule = Self {
            head,
            lower_bound,
            upper_bound,
            body,
            rule_idx,
        };
        if rule.head.is_empty() {
            return Err(ModelError::EmptyHead(rule.to_string()));
        }
        rule.check_safety()?;
        Ok(rule)
    }

    pub fn head(&self) -> &[ChoiceElement] {
        &self.head
    }

    pub fn body(&self) -> &Conjunction<Literal> {
        &self.body
    }

    pub fn lower_bound(&self) -> Option<i64> {
        self.lower_bound
    }

    pub fn upper_bound(&self) -> Option<i64> {
        self.upper_bound
    }

    pub fn rule_idx(&self) -> u32 {
        self.rule_idx
    }

    fn head_variables(&self) -> BTreeSet<Symbol> {
        self.head.iter().flat_map(ChoiceElement::variables).collect()
    }

    /// Body variables that also occur in some element.
    pub fn relevant_global_variables(&self) -> Vec<Symbol> {
        let head = self.head_variables();
        self.body
            .universal_variables()
            .into_iter()
            .filter(|v| head.contains(v))
            .collect()
    }

    /// Body variables that occur in no element.
    pub fn body_only_variables(&self) -> Vec<Symbol> {
        let head = self.head_variables();
        self.body
            .universal_variables()
            .into_iter()
            .filter(|v| !head.contains(v))
            .collect()
    }

    /// All body variables, relevant ones first.
    pub fn global_variables(&self) -> Vec<Symbol> {
        let mut variables = self.relevant_global_variables();
        variables.extend(self.body_only_variables());
        variables
    }

    /// The relevant global variables followed by the element's local ones.
    pub fn element_variables(&self, element: usize) -> Vec<Symbol> {
        let mut variables = self.relevant_global_variables();
        let body = self.body.universal_variables();
        if let Some(e) = self.head.get(element) {
            for v in e.variables() {
                if !body.contains(&v) && !variables.contains(&v) {
                    variables.push(v);
                }
            }
        }
        variables
    }

    fn key(&self, kind: HelperKind, element: Option<usize>) -> HelperKey {
        HelperKey {
            kind,
            rule_idx: self.rule_idx,
            element,
        }
    }

    /// Drives enumeration: one instance per relevant global substitution.
    pub fn helper_literal(&self) -> PositiveLiteral {
        PositiveLiteral::helper(
            self.key(HelperKind::Global, None),
            &self.relevant_global_variables(),
        )
    }

    pub fn body_helper_literal(&self) -> PositiveLiteral {
        PositiveLiteral::helper(self.key(HelperKind::Body, None), &self.global_variables())
    }

    pub fn element_helper_literal(&self, element: usize) -> PositiveLiteral {
        PositiveLiteral::helper(
            self.key(HelperKind::Element, Some(element)),
            &self.element_variables(element),
        )
    }

    pub fn approximation(&self, approximated: &BTreeSet<Predicate>) -> Vec<Rule> {
        let body_helper = self.body_helper_literal();
        let mut rules = vec![
            helper_rule(
                body_helper.clone(),
                self.body.simplified(approximated, true).literals().to_vec(),
            ),
            helper_rule(self.helper_literal(), [Literal::from(body_helper.clone())]),
        ];
        for (j, element) in self.head.iter().enumerate() {
            let element_helper = self.element_helper_literal(j);
            rules.push(helper_rule(
                element_helper.clone(),
                std::iter::once(Literal::from(body_helper.clone())).chain(
                    element
                        .context
                        .simplified(approximated, true)
                        .literals()
                        .iter()
                        .cloned(),
                ),
            ));
            rules.push(helper_rule(
                element.literal.clone(),
                [Literal::from(element_helper)],
            ));
        }
        rules
    }
}

impl fmt::Display for ChoiceRule {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        if let Some(l) = self.lower_bound {
            f.write_fmt(format_args!("{l} "))?;
        }
        f.write_fmt(format_args!(
            "{{ {} }}",
            self.head
                .iter()
                .map(ToString::to_string)
                .collect::<Vec<_>>()
                .join(" ; ")
        ))?;
        if let Some(u) = self.upper_bound {
            f.write_fmt(format_args!(" {u}"))?;
        }
        if !self.body.is_empty() {
            f.write_fmt(format_args!(" :- {}", self.body))?;
        }
        f.write_str(" .")
    }
}

/// Rules that need grounding for an answer set solver.
#[derive(Clone, Debug, Eq, Hash, Ord, PartialEq, PartialOrd)]
pub enum AspRule {
    Constraint(Constraint),
    Disjunctive(DisjunctiveRule),
    Choice(ChoiceRule),
}

impl AspRule {
    pub fn body(&self) -> &Conjunction<Literal> {
        match self {
            Self::Constraint(r) => r.body(),
            Self::Disjunctive(r) => r.body(),
            Self::Choice(r) => r.body(),
        }
    }

    pub fn rule_idx(&self) -> u32 {
        match self {
            Self::Constraint(r) => r.rule_idx(),
            Self::Disjunctive(r) => r.rule_idx(),
            Self::Choice(r) => r.rule_idx(),
        }
    }

    pub fn head_literals(&self) -> Vec<&PositiveLiteral> {
        match self {
            Self::Constraint(_) => vec![],
            Self::Disjunctive(r) => r.head().iter().collect(),
            Self::Choice(r) => r.head().iter().map(|e| &e.literal).collect(),
        }
    }

    /// Body literals plus, for choice rules, every element context.
    pub fn dependencies(&self) -> Vec<&Literal> {
        let mut literals = self.body().iter().collect::<Vec<_>>();
        if let Self::Choice(r) = self {
            literals.extend(r.head().iter().flat_map(|e| e.context.iter()));
        }
        literals
    }

    pub fn requires_approximation(&self) -> bool {
        match self {
            Self::Constraint(_) => false,
            Self::Disjunctive(r) => r.requires_approximation(),
            Self::Choice(_) => true,
        }
    }

    pub fn helper_literal(&self) -> PositiveLiteral {
        match self {
            Self::Constraint(r) => r.helper_literal(),
            Self::Disjunctive(r) => r.helper_literal(),
            Self::Choice(r) => r.helper_literal(),
        }
    }

    pub fn approximation(&self, approximated: &BTreeSet<Predicate>) -> Vec<Rule> {
        match self {
            Self::Constraint(r) => r.approximation(approximated),
            Self::Disjunctive(r) => r.approximation(approximated),
            Self::Choice(r) => r.approximation(approximated),
        }
    }
}

impl From<Constraint> for AspRule {
    fn from(r: Constraint) -> Self {
        Self::Constraint(r)
    }
}

impl From<DisjunctiveRule> for AspRule {
    fn from(r: DisjunctiveRule) -> Self {
        Self::Disjunctive(r)
    }
}

impl From<ChoiceRule> for AspRule {
    fn from(r: ChoiceRule) -> Self {
        Self::Choice(r)
    }
}

impl fmt::Display for AspRule {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            Self::Constraint(r) => r.fmt(f),
            Self::Disjunctive(r) => r.fmt(f),
            Self::Choice(r) => r.fmt(f),
        }
    }
}

#[cfg(test)]
mod test {
    use super::*;

    fn x() -> Term {
        Term::universal("X")
    }

    fn y() -> Term {
        Term::universal("Y")
    }

    fn body(literals: impl IntoIterator<Item = Literal>) -> Conjunction<Literal> {
        Conjunction::new(literals)
    }

    fn approximated(predicates: &[(&str, usize)]) -> BTreeSet<Predicate> {
        predicates
            .iter()
            .map(|(name, arity)| Predicate::new(*name, *arity))
            .collect()
    }

    #[test]
    fn construction_errors() {
        assert_eq!(Constraint::new(body([]), 0), Err(ModelError::EmptyBody));
        assert!(matches!(
            Constraint::new(body([Literal::positive("p", [Term::existential("Y")])]), 0),
            Err(ModelError::ExistentialInBody(_))
        ));
        assert!(matches!(
            DisjunctiveRule::new(Conjunction::new([]), body([Literal::positive("p", [x()])]), 0),
            Err(ModelError::EmptyHead(_))
        ));
        assert!(matches!(
            ChoiceRule::new(vec![], None, None, body([]), 0),
            Err(ModelError::EmptyHead(_))
        ));
        assert!(matches!(
            Constraint::new(body([Literal::negative("p", [x()])]), 0),
            Err(ModelError::UnsafeVariable { .. })
        ));
        assert!(matches!(
            DisjunctiveRule::new(
                Conjunction::new([PositiveLiteral::new("h", [y()])]),
                body([Literal::positive("p", [x()])]),
                0
            ),
            Err(ModelError::UnsafeVariable { .. })
        ));
    }

    #[test]
    fn constraint_approximation() {
        let c = Constraint::new(
            body([
                Literal::positive("p", [x()]),
                Literal::negative("q", [x()]),
                Literal::positive("r", [x(), y()]),
            ]),
            7,
        )
        .unwrap();
        assert_eq!(c.helper_literal().to_string(), "rule_7(?X, ?Y)");
        let rules = c.approximation(&approximated(&[("q", 1), ("r", 2)]));
        assert_eq!(rules.len(), 1);
        assert_eq!(rules[0].to_string(), "rule_7(?X, ?Y) :- p(?X), r(?X, ?Y) .");
    }

    #[test]
    fn disjunctive_approximation() {
        let r = DisjunctiveRule::new(
            Conjunction::new([
                PositiveLiteral::new("a", [x()]),
                PositiveLiteral::new("b", [x()]),
            ]),
            body([Literal::positive("c", [x()])]),
            2,
        )
        .unwrap();
        assert!(r.requires_approximation());
        assert_eq!(r.to_string(), "a(?X) | b(?X) :- c(?X) .");
        let rules = r
            .approximation(&BTreeSet::new())
            .iter()
            .map(ToString::to_string)
            .collect::<Vec<_>>();
        assert_eq!(
            rules,
            ["rule_2(?X) :- c(?X) .", "a(?X), b(?X) :- rule_2(?X) ."]
        );
    }

    #[test]
    fn choice_variables() {
        // { sel(?X, ?Z) : cand(?X, ?Z) } 1 :- base(?X), other(?W) .
        let r = ChoiceRule::new(
            vec![ChoiceElement::new(
                PositiveLiteral::new("sel", [x(), Term::universal("Z")]),
                body([Literal::positive("cand", [x(), Term::universal("Z")])]),
            )],
            None,
            Some(1),
            body([
                Literal::positive("base", [x()]),
                Literal::positive("other", [Term::universal("W")]),
            ]),
            4,
        )
        .unwrap();
        assert_eq!(r.relevant_global_variables(), [Symbol::from("X")]);
        assert_eq!(r.body_only_variables(), [Symbol::from("W")]);
        assert_eq!(
            r.element_variables(0),
            [Symbol::from("X"), Symbol::from("Z")]
        );
        assert_eq!(r.helper_literal().to_string(), "rule_4_global(?X)");
        assert_eq!(
            r.body_helper_literal().to_string(),
            "rule_4_body(?X, ?W)"
        );
        let rules = r
            .approximation(&approximated(&[("sel", 2)]))
            .iter()
            .map(ToString::to_string)
            .collect::<Vec<_>>();
        assert_eq!(
            rules,
            [
                "rule_4_body(?X, ?W) :- base(?X), other(?W) .",
                "rule_4_global(?X) :- rule_4_body(?X, ?W) .",
                "rule_4_0(?X, ?Z) :- rule_4_body(?X, ?W), cand(?X, ?Z) .",
                "sel(?X, ?Z) :- rule_4_0(?X, ?Z) .",
            ]
        );
        assert_eq!(
            r.to_string(),
            "{ sel(?X, ?Z) : cand(?X, ?Z) } 1 :- base(?X), other(?W) ."
        );
    }
}
