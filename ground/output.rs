//! Serialize ground statements: numerically (aspif) for a solver,
//! or as clingo-style text for people.

use std::io::{self, Write};

use crate::GroundingError;

#[derive(Clone, Debug, Eq, PartialEq)]
pub enum Head {
    /// At least one of the atoms holds; empty for an integrity constraint.
    Disjunction(Vec<i32>),
    /// Any subset of the atoms may hold.
    Choice(Vec<i32>),
}

#[derive(Clone, Debug, Eq, PartialEq)]
pub enum Body {
    Normal(Vec<i32>),
    /// True iff the weights of the true literals sum to at least `bound`.
    Weighted { bound: u64, elements: Vec<(i32, u64)> },
}

/// One line of output.
#[derive(Clone, Debug, Eq, PartialEq)]
pub enum GroundStatement {
    Rule { head: Head, body: Body },
    /// Show `name` whenever `condition` holds; always if there is none.
    Show { name: String, condition: Option<i32> },
}

impl GroundStatement {
    pub fn fact(atom: i32) -> Self {
        Self::Rule {
            head: Head::Disjunction(vec![atom]),
            body: Body::Normal(vec![]),
        }
    }
}

/// Human-readable names for atoms.
pub trait Labels {
    fn label(&self, atom: i32) -> Result<String, GroundingError>;
}

/// Where ground statements go.
pub trait Output {
    fn begin(&mut self) -> io::Result<()>;
    fn statement(
        &mut self,
        statement: &GroundStatement,
        labels: &dyn Labels,
    ) -> Result<(), GroundingError>;
    fn end(&mut self) -> io::Result<()>;
}

fn join<T: ToString>(items: impl IntoIterator<Item = T>, sep: &str) -> String {
    items
        .into_iter()
        .map(|i| i.to_string())
        .collect::<Vec<_>>()
        .join(sep)
}

/// The intermediate format read by clasp and friends.
pub struct AspifWriter<W: Write> {
    out: W,
}

impl<W: Write> AspifWriter<W> {
    pub fn new(out: W) -> Self {
        Self { out }
    }

    pub fn into_inner(self) -> W {
        self.out
    }
}

impl<W: Write> Output for AspifWriter<W> {
    fn begin(&mut self) -> io::Result<()> {
        writeln!(self.out, "asp 1 0 0")
    }

    fn statement(
        &mut self,
        statement: &GroundStatement,
        _labels: &dyn Labels,
    ) -> Result<(), GroundingError> {
        match statement {
            GroundStatement::Rule { head, body } => {
                let (kind, atoms) = match head {
                    Head::Disjunction(atoms) => (0, atoms),
                    Head::Choice(atoms) => (1, atoms),
                };
                write!(self.out, "1 {kind} {}", atoms.len())?;
                for a in atoms {
                    write!(self.out, " {a}")?;
                }
                match body {
                    Body::Normal(lits) => {
                        write!(self.out, " 0 {}", lits.len())?;
                        for l in lits {
                            write!(self.out, " {l}")?;
                        }
                    }
                    Body::Weighted { bound, elements } => {
                        write!(self.out, " 1 {bound} {}", elements.len())?;
                        for (l, w) in elements {
                            write!(self.out, " {l} {w}")?;
                        }
                    }
                }
                writeln!(self.out)?;
            }
            GroundStatement::Show { name, condition } => match condition {
                None => writeln!(self.out, "4 {} {name} 0", name.len())?,
                Some(l) => writeln!(self.out, "4 {} {name} 1 {l}", name.len())?,
            },
        }
        Ok(())
    }

    fn end(&mut self) -> io::Result<()> {
        writeln!(self.out, "0")?;
        self.out.flush()
    }
}

/// Clingo-style text (`.lp`).
pub struct TextWriter<W: Write> {
    out: W,
}

impl<W: Write> TextWriter<W> {
    pub fn new(out: W) -> Self {
        Self { out }
    }

    pub fn into_inner(self) -> W {
        self.out
    }
}

fn literal(labels: &dyn Labels, lit: i32) -> Result<String, GroundingError> {
    let atom = labels.label(lit.abs())?;
    Ok(if lit < 0 { format!("not {atom}") } else { atom })
}

fn literals(labels: &dyn Labels, lits: &[i32]) -> Result<Vec<String>, GroundingError> {
    lits.iter().map(|&l| literal(labels, l)).collect()
}

impl<W: Write> Output for TextWriter<W> {
    fn begin(&mut self) -> io::Result<()> {
        Ok(())
    }

    fn statement(
        &mut self,
        statement: &GroundStatement,
        labels: &dyn Labels,
    ) -> Result<(), GroundingError> {
        match statement {
            GroundStatement::Rule { head, body } => {
                let head = match head {
                    Head::Disjunction(atoms) => join(literals(labels, atoms)?, " | "),
                    Head::Choice(atoms) => format!("{{ {} }}", join(literals(labels, atoms)?, "; ")),
                };
                let body = match body {
                    Body::Normal(lits) => join(literals(labels, lits)?, ", "),
                    Body::Weighted { bound, elements } => format!(
                        "{bound} <= #sum {{ {} }}",
                        join(
                            elements
                                .iter()
                                .enumerate()
                                .map(|(i, &(l, w))| {
                                    literal(labels, l).map(|l| format!("{w},{} : {l}", i + 1))
                                })
                                .collect::<Result<Vec<_>, _>>()?,
                            "; "
                        )
                    ),
                };
                match (head.is_empty(), body.is_empty()) {
                    (true, true) => writeln!(self.out, ":- #true.")?,
                    (false, true) => writeln!(self.out, "{head}.")?,
                    (true, false) => writeln!(self.out, ":- {body}.")?,
                    (false, false) => writeln!(self.out, "{head} :- {body}.")?,
                }
            }
            GroundStatement::Show { name, condition } => match condition {
                None => writeln!(self.out, "#show {name}.")?,
                Some(l) => writeln!(self.out, "#show {name} : {}.", literal(labels, *l)?)?,
            },
        }
        Ok(())
    }

    fn end(&mut self) -> io::Result<()> {
        self.out.flush()
    }
}

#[cfg(test)]
mod test {
    use super::*;

    struct Names;

    impl Labels for Names {
        fn label(&self, atom: i32) -> Result<String, GroundingError> {
            Ok(format!("a{atom}"))
        }
    }

    fn statements() -> Vec<GroundStatement> {
        vec![
            GroundStatement::fact(1),
            GroundStatement::Rule {
                head: Head::Disjunction(vec![2, 3]),
                body: Body::Normal(vec![1, -4]),
            },
            GroundStatement::Rule {
                head: Head::Choice(vec![2, 3]),
                body: Body::Normal(vec![1]),
            },
            GroundStatement::Rule {
                head: Head::Disjunction(vec![5]),
                body: Body::Weighted {
                    bound: 2,
                    elements: vec![(2, 1), (-3, 1)],
                },
            },
            GroundStatement::Rule {
                head: Head::Disjunction(vec![]),
                body: Body::Normal(vec![-5]),
            },
            GroundStatement::Show {
                name: String::from("p(a)"),
                condition: Some(1),
            },
            GroundStatement::Show {
                name: String::from("q"),
                condition: None,
            },
        ]
    }

    #[test]
    fn aspif() {
        let mut output = AspifWriter::new(Vec::new());
        output.begin().unwrap();
        for s in statements() {
            output.statement(&s, &Names).unwrap();
        }
        output.end().unwrap();
        assert_eq!(
            String::from_utf8(output.into_inner()).unwrap(),
            "asp 1 0 0
1 0 1 1 0 0
1 0 2 2 3 0 2 1 -4
1 1 2 2 3 0 1 1
1 0 1 5 1 2 2 2 1 -3 1
1 0 0 0 1 -5
4 4 p(a) 1 1
4 1 q 0
0
"
        );
    }

    #[test]
    fn text() {
        let mut output = TextWriter::new(Vec::new());
        output.begin().unwrap();
        for s in statements() {
            output.statement(&s, &Names).unwrap();
        }
        output
            .statement(
                &GroundStatement::Rule {
                    head: Head::Disjunction(vec![]),
                    body: Body::Normal(vec![]),
                },
                &Names,
            )
            .unwrap();
        output.end().unwrap();
        assert_eq!(
            String::from_utf8(output.into_inner()).unwrap(),
            "a1.
a2 | a3 :- a1, not a4.
{ a2; a3 } :- a1.
a5 :- 2 <= #sum { 1,1 : a2; 1,2 : not a3 }.
:- not a5.
#show p(a) : a1.
#show q.
:- #true.
"
        );
    }
}
