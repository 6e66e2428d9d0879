use anyhow::Context as _;
use clap::{Parser, ValueEnum};
use lrtab::{
    first_follow::{FirstSets, FollowSets},
    grammar::Grammar,
    lr0::Automaton,
    table::ParseTable,
};
use std::{
    io::{self, Write as _},
    path::PathBuf,
    process::ExitCode,
    time::Instant,
};
use tracing_subscriber::EnvFilter;

#[derive(Debug, Parser)]
#[command(author, version, about, long_about = None)]
struct Args {
    /// The policy used to place reduce actions.
    #[arg(long, value_enum, default_value_t = TableMethod::Slr)]
    method: TableMethod,

    /// The reports to print.
    #[arg(long, value_enum, value_delimiter = ',', default_values_t = [Report::Table])]
    show: Vec<Report>,

    /// Fail if the parse table has conflicts.
    #[arg(long)]
    deny_conflicts: bool,

    /// Whitespace-separated terminal names to be parsed.
    #[arg(short, long)]
    input: Vec<String>,

    /// The path of grammar definition file.
    grammar: PathBuf,
}

#[derive(Debug, Copy, Clone, PartialEq, ValueEnum)]
enum TableMethod {
    Lr0,
    Slr,
}

#[derive(Debug, Copy, Clone, PartialEq, ValueEnum)]
enum Report {
    Grammar,
    States,
    Sets,
    Table,
}

fn main() -> anyhow::Result<ExitCode> {
    tracing_subscriber::fmt()
        .with_env_filter(EnvFilter::from_default_env())
        .init();

    let args = Args::parse();
    tracing::debug!("parsed CLI args = {:?}", args);

    process_file(&args)
        .with_context(|| anyhow::anyhow!("errored during processing {}", args.grammar.display()))
}

fn process_file(args: &Args) -> anyhow::Result<ExitCode> {
    let stdout = io::stdout();
    let mut out = stdout.lock();

    let s = Instant::now();
    let grammar = Grammar::from_file(&args.grammar).context("failed to read the grammar")?;
    tracing::info!("read grammar: {:?} elapsed", s.elapsed());

    let empty_nonterminals: Vec<&str> = grammar
        .nonterminals_without_productions()
        .map(|n| grammar.nonterminal_name(n))
        .collect();
    if !empty_nonterminals.is_empty() {
        writeln!(
            out,
            "[warning] The following nonterminals have no associated production rule: {:?}",
            empty_nonterminals
        )?;
    }

    let s = Instant::now();
    let automaton = Automaton::build(&grammar);
    tracing::info!("build automaton: {:?} elapsed", s.elapsed());

    let s = Instant::now();
    let first = FirstSets::new(&grammar);
    let follow = FollowSets::new(&grammar, &first);
    tracing::info!("compute FIRST/FOLLOW: {:?} elapsed", s.elapsed());

    let s = Instant::now();
    let table = match args.method {
        TableMethod::Lr0 => ParseTable::lr0(&grammar, &automaton),
        TableMethod::Slr => ParseTable::slr(&grammar, &automaton, &follow),
    };
    tracing::info!("compute table: {:?} elapsed", s.elapsed());

    for report in &args.show {
        match report {
            Report::Grammar => write!(out, "{}", grammar)?,
            Report::States => write!(out, "{}", automaton.display(&grammar))?,
            Report::Sets => write!(
                out,
                "{}",
                lrtab::report::first_follow(&grammar, &first, &follow)
            )?,
            Report::Table => write!(out, "{}", table.display(&grammar))?,
        }
    }

    if !table.is_deterministic() {
        writeln!(
            out,
            "[warning] The {} parse table has {} conflict(s)",
            table.method,
            table.conflicts().len()
        )?;
        if !args.show.contains(&Report::Table) {
            for conflict in table.conflicts() {
                writeln!(out, "- {}", conflict.display(&grammar))?;
            }
        }
    }
    let table = if args.deny_conflicts {
        table.deny_conflicts()?
    } else {
        table
    };

    let mut status = ExitCode::SUCCESS;
    for input in &args.input {
        writeln!(out, "#### input: {}", input)?;
        let s = Instant::now();
        let outcome = lrtab::parser::parse(&grammar, &table, input.split_whitespace())
            .with_context(|| anyhow::anyhow!("failed to parse the input `{}'", input))?;
        tracing::info!("parse: {:?} elapsed", s.elapsed());
        write!(out, "{}", outcome.display(&grammar))?;
        if !outcome.is_accepted() {
            status = ExitCode::FAILURE;
        }
    }

    out.flush()?;

    Ok(status)
}
