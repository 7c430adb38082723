//! Parse a program text into a knowledge base.
//!
//! ```text
//! % comments run to the end of the line
//! base(1) .                                 % fact
//! cand(?X) :- base(?X) .                    % rule
//! a(?X) | b(?X) :- c(?X), ~d(?X) .          % disjunctive rule
//! a(?X), b(?X) :- c(?X) .                   % two rules, one per head literal
//! h(?X, !Y), g(!Y) :- b(?X) .               % existential rule
//! :- a(?X), b(?X) .                         % constraint
//! 1 { sel(?X) : cand(?X) } 1 :- base(?Y) .  % choice rule
//! #show sel/1 .
//! @source edge[2] : load-csv("edges.csv") .
//! ```

use std::path::PathBuf;

use nom::{
    branch::alt,
    bytes::complete::tag,
    character::complete::char,
    combinator::{map, map_res, opt},
    multi::{many1, separated_list0, separated_list1},
    sequence::{delimited, pair, preceded, terminated, tuple},
    IResult,
};
use thiserror::Error;

use crate::lexer::{integer, space, string, symbol, ws};
use crate::{
    ChoiceElement, ChoiceRule, Conjunction, Constraint, DataSource, DataSourceDeclaration,
    DisjunctiveRule, Fact, KnowledgeBase, Literal, ModelError, PositiveLiteral, Predicate, Rule,
    ShowStatement, Statement, Term, Variables as _,
};

#[derive(Clone, Debug, Eq, Error, PartialEq)]
pub enum ParseError {
    #[error("syntax error at line {line}, column {column}: unexpected {found}")]
    Syntax {
        line: usize,
        column: usize,
        found: String,
    },
    #[error("invalid statement at line {line}, column {column}: {source}")]
    Model {
        line: usize,
        column: usize,
        source: ModelError,
    },
}

/// One statement as written, before rule indices are assigned.
#[derive(Clone, Debug, Eq, PartialEq)]
enum Parsed {
    Constraint(Vec<Literal>),
    Disjunctive(Vec<PositiveLiteral>, Vec<Literal>),
    Conjunctive(Vec<PositiveLiteral>, Vec<Literal>),
    Choice {
        lower: Option<i64>,
        elements: Vec<ChoiceElement>,
        upper: Option<i64>,
        body: Vec<Literal>,
    },
    Show(Predicate),
    Source(Predicate, PathBuf),
}

impl Parsed {
    /// Statements with a conjunctive head split into one rule per head
    /// literal, each with its own index, unless the head is existential.
    fn build(self, rule_idx: u32) -> Result<Vec<Statement>, ModelError> {
        match self {
            Self::Constraint(body) => Ok(vec![Statement::Asp(
                Constraint::new(Conjunction::new(body), rule_idx)?.into(),
            )]),
            Self::Disjunctive(head, body) => Ok(vec![Statement::Asp(
                DisjunctiveRule::new(Conjunction::new(head), Conjunction::new(body), rule_idx)?
                    .into(),
            )]),
            Self::Conjunctive(head, body) => {
                let rule = Rule::new(Conjunction::new(head), Conjunction::new(body));
                if !rule.head.existential_variables().is_empty() {
                    return Ok(vec![Statement::Rule(rule)]);
                }
                let mut next_idx = Some(rule_idx);
                rule.head
                    .iter()
                    .map(|literal| -> Result<Statement, ModelError> {
                        let head = Conjunction::new([literal.clone()]);
                        if rule.body.is_empty() && head.variables().is_empty() {
                            return Ok(Statement::Fact(Fact::new(literal.clone())?));
                        }
                        let idx = next_idx.ok_or(ModelError::RuleIndexOverflow)?;
                        next_idx = idx.checked_add(1);
                        Ok(Statement::Asp(
                            DisjunctiveRule::new(head, rule.body.clone(), idx)?.into(),
                        ))
                    })
                    .collect()
            }
            Self::Choice {
                lower,
                elements,
                upper,
                body,
            } => Ok(vec![Statement::Asp(
                ChoiceRule::new(elements, lower, upper, Conjunction::new(body), rule_idx)?.into(),
            )]),
            Self::Show(predicate) => Ok(vec![ShowStatement::new(predicate).into()]),
            Self::Source(predicate, path) => Ok(vec![DataSourceDeclaration::new(
                predicate,
                DataSource::Csv(path),
            )
            .into()]),
        }
    }
}

fn term(input: &str) -> IResult<&str, Term> {
    alt((
        map(preceded(char('?'), symbol), Term::Universal),
        map(preceded(char('!'), symbol), Term::Existential),
        map(integer, |i| Term::constant(i.to_string())),
        map(string, Term::constant),
        map(symbol, Term::Constant),
    ))(input)
}

fn arguments(input: &str) -> IResult<&str, Vec<Term>> {
    map(
        opt(delimited(
            ws(char('(')),
            separated_list0(ws(char(',')), ws(term)),
            ws(char(')')),
        )),
        Option::unwrap_or_default,
    )(input)
}

fn positive_literal(input: &str) -> IResult<&str, PositiveLiteral> {
    map(pair(ws(symbol), arguments), |(p, args)| {
        PositiveLiteral::new(p, args)
    })(input)
}

fn literal(input: &str) -> IResult<&str, Literal> {
    map(
        pair(opt(ws(char('~'))), positive_literal),
        |(negated, l)| {
            let l = Literal::from(l);
            if negated.is_some() {
                l.negate()
            } else {
                l
            }
        },
    )(input)
}

fn literals(input: &str) -> IResult<&str, Vec<Literal>> {
    separated_list1(ws(char(',')), literal)(input)
}

fn body(input: &str) -> IResult<&str, Vec<Literal>> {
    map(opt(preceded(ws(tag(":-")), literals)), Option::unwrap_or_default)(input)
}

fn end(input: &str) -> IResult<&str, char> {
    ws(char('.'))(input)
}

fn constraint(input: &str) -> IResult<&str, Parsed> {
    map(
        delimited(ws(tag(":-")), literals, end),
        Parsed::Constraint,
    )(input)
}

fn disjunctive_rule(input: &str) -> IResult<&str, Parsed> {
    map(
        terminated(
            pair(
                pair(positive_literal, many1(preceded(ws(char('|')), positive_literal))),
                body,
            ),
            end,
        ),
        |((first, rest), body)| {
            Parsed::Disjunctive(std::iter::once(first).chain(rest).collect(), body)
        },
    )(input)
}

fn conjunctive_rule(input: &str) -> IResult<&str, Parsed> {
    map(
        terminated(
            pair(separated_list1(ws(char(',')), positive_literal), body),
            end,
        ),
        |(head, body)| Parsed::Conjunctive(head, body),
    )(input)
}

fn choice_element(input: &str) -> IResult<&str, ChoiceElement> {
    map(
        pair(positive_literal, opt(preceded(ws(char(':')), literals))),
        |(literal, context)| {
            ChoiceElement::new(literal, Conjunction::new(context.unwrap_or_default()))
        },
    )(input)
}

fn choice_rule(input: &str) -> IResult<&str, Parsed> {
    map(
        terminated(
            tuple((
                opt(ws(integer)),
                delimited(
                    ws(char('{')),
                    separated_list1(ws(char(';')), choice_element),
                    ws(char('}')),
                ),
                opt(ws(integer)),
                body,
            )),
            end,
        ),
        |(lower, elements, upper, body)| Parsed::Choice {
            lower,
            elements,
            upper,
            body,
        },
    )(input)
}

fn arity(input: &str) -> IResult<&str, usize> {
    map_res(integer, usize::try_from)(input)
}

fn show(input: &str) -> IResult<&str, Parsed> {
    map(
        delimited(
            ws(tag("#show")),
            pair(ws(symbol), preceded(ws(char('/')), ws(arity))),
            end,
        ),
        |(name, arity)| Parsed::Show(Predicate::new(name, arity)),
    )(input)
}

fn source(input: &str) -> IResult<&str, Parsed> {
    map(
        delimited(
            ws(tag("@source")),
            tuple((
                ws(symbol),
                delimited(ws(char('[')), ws(arity), ws(char(']'))),
                preceded(
                    pair(ws(char(':')), ws(tag("load-csv"))),
                    delimited(ws(char('(')), ws(string), ws(char(')'))),
                ),
            )),
            end,
        ),
        |(name, arity, path)| Parsed::Source(Predicate::new(name, arity), PathBuf::from(path)),
    )(input)
}

fn statement(input: &str) -> IResult<&str, Parsed> {
    alt((
        source,
        show,
        constraint,
        choice_rule,
        disjunctive_rule,
        conjunctive_rule,
    ))(input)
}

fn position(input: &str, rest: &str) -> (usize, usize) {
    let consumed = &input[..input.len() - rest.len()];
    let line = consumed.matches('\n').count() + 1;
    let column = consumed
        .rsplit('\n')
        .next()
        .map(|l| l.chars().count())
        .unwrap_or(0)
        + 1;
    (line, column)
}

fn syntax_error(input: &str, rest: &str) -> ParseError {
    let (rest, _) = space(rest).unwrap_or((rest, 0));
    let (line, column) = position(input, rest);
    let found = if rest.is_empty() {
        String::from("end of input")
    } else {
        format!("`{}`", rest.chars().take(16).collect::<String>())
    };
    ParseError::Syntax {
        line,
        column,
        found,
    }
}

/// Parse a whole program. ASP rules are numbered in order of appearance,
/// continuing from the knowledge base's next free rule index.
pub fn parse_into(input: &str, kb: &mut KnowledgeBase) -> Result<(), ParseError> {
    let mut rest = input;
    loop {
        let (r, _) = space(rest).map_err(|_| syntax_error(input, rest))?;
        if r.is_empty() {
            return Ok(());
        }
        let (r, parsed) = statement(r).map_err(|e| match e {
            nom::Err::Error(e) | nom::Err::Failure(e) => syntax_error(input, e.input),
            nom::Err::Incomplete(_) => syntax_error(input, r),
        })?;
        let model_error = |source| {
            let (line, column) = position(input, space(rest).map(|(s, _)| s).unwrap_or(rest));
            ParseError::Model {
                line,
                column,
                source,
            }
        };
        let rule_idx = kb.next_rule_idx().map_err(model_error)?;
        for statement in parsed.build(rule_idx).map_err(model_error)? {
            kb.add_statement(statement).map_err(model_error)?;
        }
        rest = r;
    }
}

/// Parse a program into a fresh knowledge base.
pub fn parse_program(input: &str) -> Result<KnowledgeBase, ParseError> {
    let mut kb = KnowledgeBase::new();
    parse_into(input, &mut kb)?;
    Ok(kb)
}

#[cfg(test)]
mod test {
    use super::*;
    use crate::AspRule;

    #[test]
    fn terms() {
        assert_eq!(term("?X"), Ok(("", Term::universal("X"))));
        assert_eq!(term("!Y"), Ok(("", Term::existential("Y"))));
        assert_eq!(term("0x10"), Ok(("", Term::constant("16"))));
        assert_eq!(term(r#""a b""#), Ok(("", Term::constant("a b"))));
        assert_eq!(term("alice"), Ok(("", Term::constant("alice"))));
    }

    #[test]
    fn literals() {
        assert_eq!(
            literal(" ~ p( ?X , a )"),
            Ok(("", Literal::negative("p", [Term::universal("X"), Term::constant("a")])))
        );
        assert_eq!(literal("q"), Ok(("", Literal::positive("q", []))));
    }

    #[test]
    fn statements() {
        let kb = parse_program(
            r#"
            % facts and rules
            base(1) . base(2) .
            cand(?X) :- base(?X) .
            a(?X) | b(?X) :- cand(?X), ~base(?X) .
            h(?X, !Y), g(!Y) :- base(?X) .
            :- a(?X), b(?X) .
            1 { sel(?X) : cand(?X) ; none } 1 :- base(?Y) .
            #show sel/1 .
            @source edge[2] : load-csv("edges.csv") .
            "#,
        )
        .unwrap();
        assert_eq!(kb.facts().count(), 2);
        assert_eq!(kb.rules().count(), 1);
        assert_eq!(kb.show_statements().count(), 1);
        assert_eq!(kb.data_sources().count(), 1);
        let rules = kb.asp_rules().collect::<Vec<_>>();
        assert_eq!(rules.len(), 4);
        assert_eq!(
            rules.iter().map(|r| r.rule_idx()).collect::<Vec<_>>(),
            [0, 1, 2, 3]
        );
        assert!(matches!(rules[0], AspRule::Disjunctive(r) if !r.requires_approximation()));
        assert!(matches!(rules[1], AspRule::Disjunctive(r) if r.requires_approximation()));
        assert!(matches!(rules[2], AspRule::Constraint(_)));
        match rules[3] {
            AspRule::Choice(c) => {
                assert_eq!(c.lower_bound(), Some(1));
                assert_eq!(c.upper_bound(), Some(1));
                assert_eq!(c.head().len(), 2);
                assert_eq!(c.head()[0].context.len(), 1);
            }
            r => panic!("expected a choice rule, got {r}"),
        }
        assert_eq!(
            kb.data_sources().next().map(ToString::to_string),
            Some(String::from(r#"@source edge[2] : load-csv("edges.csv") ."#))
        );
    }

    #[test]
    fn conjunctive_heads() {
        let mut kb = parse_program(
            "a(?X), b(?X) :- n(?X), ~m(?X) .
             p, q(c) .
             h(?X, !Y), g(!Y) :- n(?X) .",
        )
        .unwrap();
        assert_eq!(
            kb.asp_rules()
                .map(|r| format!("{} {r}", r.rule_idx()))
                .collect::<Vec<_>>(),
            ["0 a(?X) :- n(?X), ~m(?X) .", "1 b(?X) :- n(?X), ~m(?X) ."]
        );
        assert_eq!(
            kb.facts().map(ToString::to_string).collect::<Vec<_>>(),
            ["p .", "q(c) ."]
        );
        assert_eq!(kb.rules().count(), 1);

        let last = Constraint::new(Conjunction::new([Literal::positive("p", [])]), u32::MAX);
        kb.add_statement(AspRule::from(last.unwrap())).unwrap();
        assert!(matches!(
            parse_into("c(?X) :- n(?X) .", &mut kb),
            Err(ParseError::Model {
                source: ModelError::RuleIndexOverflow,
                ..
            })
        ));
    }

    #[test]
    fn errors() {
        assert!(matches!(
            parse_program("p(a) .\nq(a) :- .\n"),
            Err(ParseError::Syntax { line: 2, .. })
        ));
        assert_eq!(
            parse_program("p(a) .\n  q(a)"),
            Err(ParseError::Syntax {
                line: 2,
                column: 7,
                found: String::from("end of input"),
            })
        );
        assert!(matches!(
            parse_program("p(?X) ."),
            Err(ParseError::Model {
                line: 1,
                column: 1,
                source: ModelError::UnsafeVariable { .. }
            })
        ));
        assert!(matches!(
            parse_program("q(a) .\n  :- q(!Y) ."),
            Err(ParseError::Model {
                line: 2,
                column: 3,
                source: ModelError::ExistentialInBody(_)
            })
        ));
    }
}
