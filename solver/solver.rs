//! A brute-force answer set solver for small ground programs in the
//! aspif subset that the grounder writes.
//!
//! Every interpretation over the program's atoms is tried in Gray-code
//! order; an interpretation is an answer set if it is a minimal model of
//! the program's reduct with respect to itself. This is hopeless beyond
//! a couple dozen atoms, but it's easy to trust, which is the point.

use std::collections::BTreeSet;
use std::fmt;

use gray_codes::{InclusionExclusion, SetMutation};
use thiserror::Error;

/// The most atoms we're willing to enumerate interpretations over.
pub const MAX_ATOMS: usize = 24;

pub type Interpretation = BTreeSet<u32>;

#[derive(Clone, Debug, Eq, PartialEq)]
pub enum AspifBody {
    Normal(Vec<i32>),
    Weighted { bound: u64, elements: Vec<(i32, u64)> },
}

#[derive(Clone, Debug, Eq, PartialEq)]
pub struct AspifRule {
    pub choice: bool,
    pub head: Vec<u32>,
    pub body: AspifBody,
}

#[derive(Clone, Debug, Eq, PartialEq)]
pub struct Show {
    pub name: String,
    pub condition: Option<i32>,
}

#[derive(Clone, Debug, Default, Eq, PartialEq)]
pub struct AspifProgram {
    pub rules: Vec<AspifRule>,
    pub shows: Vec<Show>,
    atoms: BTreeSet<u32>,
}

#[derive(Clone, Debug, Eq, Error, PartialEq)]
pub enum SolveError {
    #[error("line {line}: {message}")]
    Parse { line: usize, message: String },

    #[error("{0} atoms is too many to enumerate (at most {MAX_ATOMS})")]
    TooManyAtoms(usize),
}

fn holds(lit: i32, x: &Interpretation, m: &Interpretation) -> bool {
    if lit > 0 {
        x.contains(&lit.unsigned_abs())
    } else {
        !m.contains(&lit.unsigned_abs())
    }
}

impl AspifBody {
    /// Positive literals are evaluated in `x`, negative ones in `m`.
    fn holds(&self, x: &Interpretation, m: &Interpretation) -> bool {
        match self {
            Self::Normal(lits) => lits.iter().all(|&l| holds(l, x, m)),
            Self::Weighted { bound, elements } => {
                elements
                    .iter()
                    .filter(|(l, _)| holds(*l, x, m))
                    .map(|(_, w)| w)
                    .sum::<u64>()
                    >= *bound
            }
        }
    }
}

impl AspifProgram {
    pub fn atoms(&self) -> &BTreeSet<u32> {
        &self.atoms
    }

    /// Is `x` a model of the reduct of the program with respect to `m`?
    fn satisfies(&self, x: &Interpretation, m: &Interpretation) -> bool {
        self.rules.iter().all(|rule| {
            !rule.body.holds(x, m)
                || if rule.choice {
                    rule.head
                        .iter()
                        .filter(|a| m.contains(a))
                        .all(|a| x.contains(a))
                } else {
                    rule.head.iter().any(|a| x.contains(a))
                }
        })
    }

    fn is_disjunctive(&self) -> bool {
        self.rules.iter().any(|r| !r.choice && r.head.len() > 1)
    }

    /// The least model of the reduct; only meaningful without disjunctions.
    fn least_model(&self, m: &Interpretation) -> Interpretation {
        let mut x = Interpretation::new();
        let mut changed = true;
        while changed {
            changed = false;
            for rule in &self.rules {
                if !rule.body.holds(&x, m) {
                    continue;
                }
                if rule.choice {
                    for a in rule.head.iter().filter(|a| m.contains(a)) {
                        changed |= x.insert(*a);
                    }
                } else if let [a] = rule.head.as_slice() {
                    changed |= x.insert(*a);
                }
            }
        }
        x
    }

    /// No proper subset of `m` is a model of the reduct.
    fn is_minimal(&self, m: &Interpretation) -> bool {
        let atoms = m.iter().copied().collect::<Vec<_>>();
        let mut x = Interpretation::new();
        if self.satisfies(&x, m) && !m.is_empty() {
            return false;
        }
        for mutation in InclusionExclusion::of_len(atoms.len()) {
            match mutation {
                SetMutation::Insert(i) => x.insert(atoms[i]),
                SetMutation::Remove(i) => x.remove(&atoms[i]),
            };
            if x.len() < m.len() && self.satisfies(&x, m) {
                return false;
            }
        }
        true
    }

    fn is_answer_set(&self, m: &Interpretation) -> bool {
        self.satisfies(m, m)
            && if self.is_disjunctive() {
                self.is_minimal(m)
            } else {
                self.least_model(m) == *m
            }
    }

    /// All answer sets, in no particular order.
    pub fn answer_sets(&self) -> Result<Vec<Interpretation>, SolveError> {
        if self.atoms.len() > MAX_ATOMS {
            return Err(SolveError::TooManyAtoms(self.atoms.len()));
        }
        let atoms = self.atoms.iter().copied().collect::<Vec<_>>();
        let mut m = Interpretation::new();
        let mut answers = Vec::new();
        if self.is_answer_set(&m) {
            answers.push(m.clone());
        }
        for mutation in InclusionExclusion::of_len(atoms.len()) {
            match mutation {
                SetMutation::Insert(i) => m.insert(atoms[i]),
                SetMutation::Remove(i) => m.remove(&atoms[i]),
            };
            if self.is_answer_set(&m) {
                answers.push(m.clone());
            }
        }
        Ok(answers)
    }

    /// The names shown in an answer set.
    pub fn shown(&self, m: &Interpretation) -> BTreeSet<String> {
        self.shows
            .iter()
            .filter(|s| s.condition.map_or(true, |l| holds(l, m, m)))
            .map(|s| s.name.clone())
            .collect()
    }

    /// The shown names of every answer set, sorted.
    pub fn solve(&self) -> Result<Vec<BTreeSet<String>>, SolveError> {
        let mut answers = self
            .answer_sets()?
            .iter()
            .map(|m| self.shown(m))
            .collect::<Vec<_>>();
        answers.sort();
        Ok(answers)
    }
}

/// Format a set of shown names like an answer set: `{a, b}`.
pub fn format_answer(answer: &BTreeSet<String>) -> String {
    format!(
        "{{{}}}",
        answer.iter().cloned().collect::<Vec<_>>().join(", ")
    )
}

/// Numbers on one statement line.
struct Fields<'a> {
    line: usize,
    words: std::str::SplitWhitespace<'a>,
}

impl<'a> Fields<'a> {
    fn new(line: usize, text: &'a str) -> Self {
        Self {
            line,
            words: text.split_whitespace(),
        }
    }

    fn error(&self, message: impl fmt::Display) -> SolveError {
        SolveError::Parse {
            line: self.line,
            message: message.to_string(),
        }
    }

    fn next<T: std::str::FromStr>(&mut self) -> Result<T, SolveError> {
        let word = self
            .words
            .next()
            .ok_or_else(|| self.error("unexpected end of line"))?;
        word.parse()
            .map_err(|_| self.error(format!("expected a number, found `{word}`")))
    }

    fn list<T: std::str::FromStr>(&mut self) -> Result<Vec<T>, SolveError> {
        let n = self.next::<usize>()?;
        (0..n).map(|_| self.next()).collect()
    }

    fn finish(&mut self) -> Result<(), SolveError> {
        match self.words.next() {
            None => Ok(()),
            Some(word) => Err(self.error(format!("unexpected `{word}`"))),
        }
    }
}

/// Read a program in the aspif subset with rules (`1`) and shows (`4`).
pub fn parse_aspif(input: &str) -> Result<AspifProgram, SolveError> {
    let mut lines = input.lines().enumerate().map(|(i, l)| (i + 1, l));
    match lines.next() {
        Some((_, header)) if header.starts_with("asp ") => (),
        _ => {
            return Err(SolveError::Parse {
                line: 1,
                message: String::from("missing `asp` header"),
            })
        }
    }

    let mut program = AspifProgram::default();
    let mut terminated = false;
    for (line, text) in lines {
        if text.trim().is_empty() {
            continue;
        }
        if terminated {
            return Err(SolveError::Parse {
                line,
                message: String::from("statement after end of program"),
            });
        }
        let mut fields = Fields::new(line, text);
        match fields.next::<u32>()? {
            0 => {
                fields.finish()?;
                terminated = true;
            }
            1 => {
                let choice = match fields.next::<u32>()? {
                    0 => false,
                    1 => true,
                    k => return Err(fields.error(format!("unknown head type {k}"))),
                };
                let head = fields.list::<u32>()?;
                let body = match fields.next::<u32>()? {
                    0 => AspifBody::Normal(fields.list()?),
                    1 => {
                        let bound = fields.next()?;
                        let n = fields.next::<usize>()?;
                        let elements = (0..n)
                            .map(|_| -> Result<(i32, u64), SolveError> {
                                Ok((fields.next()?, fields.next()?))
                            })
                            .collect::<Result<Vec<_>, _>>()?;
                        AspifBody::Weighted { bound, elements }
                    }
                    k => return Err(fields.error(format!("unknown body type {k}"))),
                };
                fields.finish()?;
                program.atoms.extend(head.iter().copied());
                match &body {
                    AspifBody::Normal(lits) => {
                        program.atoms.extend(lits.iter().map(|l| l.unsigned_abs()))
                    }
                    AspifBody::Weighted { elements, .. } => program
                        .atoms
                        .extend(elements.iter().map(|(l, _)| l.unsigned_abs())),
                }
                program.rules.push(AspifRule { choice, head, body });
            }
            4 => {
                let rest = text.trim_start().get(1..).unwrap_or_default().trim_start();
                let (len, rest) = rest
                    .split_once(' ')
                    .ok_or_else(|| fields.error("truncated show statement"))?;
                let len = len
                    .parse::<usize>()
                    .map_err(|_| fields.error(format!("bad name length `{len}`")))?;
                let name = rest
                    .get(..len)
                    .ok_or_else(|| fields.error("show name is shorter than its length"))?;
                let mut tail = Fields::new(line, rest.get(len..).unwrap_or_default());
                let condition = tail.list::<i32>()?;
                tail.finish()?;
                let condition = match condition.as_slice() {
                    [] => None,
                    [l] => Some(*l),
                    _ => return Err(tail.error("conditional shows take one literal")),
                };
                program.atoms.extend(condition.map(i32::unsigned_abs));
                program.shows.push(Show {
                    name: String::from(name),
                    condition,
                });
            }
            k => return Err(fields.error(format!("unsupported statement type {k}"))),
        }
    }
    if !terminated {
        return Err(SolveError::Parse {
            line: line_of(input),
            message: String::from("missing terminating `0`"),
        });
    }
    program.atoms.remove(&0);
    Ok(program)
}

fn line_of(input: &str) -> usize {
    input.lines().count()
}
