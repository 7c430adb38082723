//! Read a program with ASP rules; approximate, materialize, and ground
//! it; write the ground program, and optionally print its answer sets.

use std::collections::BTreeSet;
use std::fs::{read_to_string, write};
use std::io::{stdin, stdout, Read, Write as _};
use std::path::PathBuf;

use anyhow::{Context as _, Result};
use atty::Stream;
use clap::Parser;

use gavotte_ground::{prepare, AspifWriter, Grounder, GroundingSummary, Output, TextWriter};
use gavotte_reasoner::MemoryReasoner;
use gavotte_solver::{format_answer, parse_aspif};
use gavotte_syntax::{parse_into, KnowledgeBase, Predicate};
use gavotte_tracer::Trace;

#[derive(Parser)]
#[command(about, long_about = None, disable_version_flag = true)]
struct Cli {
    /// Program files; standard input if none or `-`.
    files: Vec<String>,
    /// Write the ground program here instead of standard output.
    #[arg(short, long)]
    output: Option<PathBuf>,
    /// Write clingo-style text instead of aspif.
    #[arg(long)]
    text: bool,
    /// Print the answer sets of the ground program.
    #[arg(long)]
    solve: bool,
    /// Trace levels: analyze, approximate, materialize, ground, all.
    #[arg(long, value_parser = parse_trace, action = clap::ArgAction::Append)]
    trace: Vec<Trace>,
}

fn parse_trace(name: &str) -> Result<Trace, String> {
    Trace::from_name(name).ok_or_else(|| format!("unknown trace level `{name}`"))
}

fn main() -> Result<()> {
    let cli = Cli::parse();
    let trace = cli.trace.iter().fold(Trace::none(), |t, &l| t | l);

    let files = if cli.files.is_empty() {
        vec![None]
    } else {
        cli.files.iter().map(|f| Some(f.as_str())).collect()
    };
    if files.iter().any(|f| matches!(f, None | Some("-"))) && atty::is(Stream::Stdin) {
        eprintln!("Welcome to Gavotte! Please enter your rules, terminated with Ctrl-D.");
    }
    let mut kb = KnowledgeBase::new();
    for file in files {
        let input = read_file(file)?;
        parse_into(&input, &mut kb)
            .with_context(|| format!("Parsing {}", file.unwrap_or("standard input")))?;
    }
    if kb.show_statements().next().is_none() {
        kb.show_all_predicates()?;
    }

    let approximated = prepare(&mut kb, trace)?;
    let mut reasoner = MemoryReasoner::new(&kb, trace);
    reasoner.reason().context("Materializing")?;

    let aspif = if cli.solve || !cli.text {
        let mut out = AspifWriter::new(Vec::new());
        ground(&kb, &approximated, &reasoner, &mut out, trace)?;
        Some(out.into_inner())
    } else {
        None
    };
    let program = if cli.text {
        let mut out = TextWriter::new(Vec::new());
        ground(&kb, &approximated, &reasoner, &mut out, trace)?;
        Some(out.into_inner())
    } else {
        aspif.clone()
    };

    // Only copy the ground program out once it's complete.
    match (&cli.output, program) {
        (Some(path), Some(program)) => {
            write(path, program).with_context(|| format!("Writing {}", path.display()))?
        }
        (None, Some(program)) if !cli.solve => stdout()
            .write_all(&program)
            .context("Writing to stdout")?,
        _ => (),
    }

    if let Some(aspif) = aspif.filter(|_| cli.solve) {
        let aspif = String::from_utf8(aspif).context("Reading ground program")?;
        let answers = parse_aspif(&aspif)?.solve()?;
        if answers.is_empty() {
            println!("UNSATISFIABLE");
        }
        for (i, answer) in answers.iter().enumerate() {
            println!("Answer {}: {}", i + 1, format_answer(answer));
        }
    }
    Ok(())
}

fn ground<O: Output>(
    kb: &KnowledgeBase,
    approximated: &BTreeSet<Predicate>,
    reasoner: &MemoryReasoner,
    out: &mut O,
    trace: Trace,
) -> Result<GroundingSummary> {
    let summary = Grounder::new(kb, approximated, reasoner, out, trace)
        .ground_knowledge_base()
        .context("Grounding")?;
    Ok(summary)
}

/// Read a file or standard input and return the content as a string.
fn read_file(filename: Option<&str>) -> Result<String> {
    match filename {
        None | Some("-") => {
            let mut buffer = String::new();
            stdin()
                .read_to_string(&mut buffer)
                .context("Reading from stdin")?;
            Ok(buffer)
        }
        Some(filename) => read_to_string(filename).with_context(|| format!("Reading {filename}")),
    }
}
