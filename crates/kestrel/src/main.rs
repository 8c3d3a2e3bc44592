use anyhow::Context as _;
use clap::{Parser, ValueEnum};
use kestrel::{
    first_follow::{FirstSets, FollowSets},
    grammar::Grammar,
    runtime::parser::Parser as Driver,
    table::{Method, ParseTable},
};
use std::{path::PathBuf, time::Instant};
use tracing_subscriber::EnvFilter;

#[derive(Debug, Parser)]
#[command(author, version, about, long_about = None)]
struct Args {
    /// The method used to build the parse table.
    #[arg(long, value_enum, default_value_t = MethodArg::LR1)]
    method: MethodArg,

    /// Print an intermediate result. May be given more than once.
    #[arg(long, value_enum)]
    dump: Vec<Dump>,

    /// Run the parser over a whitespace-separated list of terminal names
    /// and print the reductions.
    #[arg(long)]
    input: Option<String>,

    /// The path of grammar definition file.
    grammar: PathBuf,
}

#[derive(Debug, Copy, Clone, PartialEq, ValueEnum)]
enum MethodArg {
    #[value(name = "slr1")]
    SLR1,
    #[value(name = "lr1")]
    LR1,
}

#[derive(Debug, Copy, Clone, PartialEq, ValueEnum)]
enum Dump {
    Grammar,
    FirstFollow,
    Automaton,
    Table,
}

fn main() -> anyhow::Result<()> {
    tracing_subscriber::fmt()
        .with_env_filter(EnvFilter::from_default_env())
        .init();

    let args = Args::parse();
    tracing::debug!("parsed CLI args = {:?}", args);

    process_file(&args)
        .with_context(|| anyhow::anyhow!("errored during processing {}", args.grammar.display()))?;

    Ok(())
}

fn process_file(args: &Args) -> anyhow::Result<()> {
    let s = Instant::now();
    let grammar = Grammar::from_file(&args.grammar).context("failed to read the grammar")?;
    tracing::info!("from_file: {:?} elapsed", s.elapsed());

    let mut empty_nonterminals = vec![];
    for nonterminal in grammar.nonterminals.values() {
        if grammar.productions_of(nonterminal.id()).next().is_none() {
            empty_nonterminals.push(nonterminal.name());
        }
    }
    if !empty_nonterminals.is_empty() {
        println!(
            "[warning] The following nonterminals have no associated production rule: {:?}",
            empty_nonterminals
        );
    }

    if args.dump.contains(&Dump::Grammar) {
        println!("{}", grammar);
    }

    let method = match args.method {
        MethodArg::SLR1 => Method::SLR1,
        MethodArg::LR1 => Method::LR1,
    };

    let s = Instant::now();
    let first = FirstSets::new(&grammar);
    let follow = FollowSets::new(&grammar, &first);
    tracing::info!("first/follow: {:?} elapsed", s.elapsed());
    if args.dump.contains(&Dump::FirstFollow) {
        println!("{}", first.display(&grammar));
        println!("{}", follow.display(&grammar));
    }

    let s = Instant::now();
    let collection = method.collection(&grammar, &first);
    tracing::info!(
        "{} collection: {} states, {:?} elapsed",
        method,
        collection.len(),
        s.elapsed()
    );
    if args.dump.contains(&Dump::Automaton) {
        println!("{}", collection.display(&grammar));
    }

    let s = Instant::now();
    let follow = (method == Method::SLR1).then_some(&follow);
    let table = ParseTable::from_collection(&grammar, &collection, follow)?;
    tracing::info!("table: {:?} elapsed", s.elapsed());
    if args.dump.contains(&Dump::Table) {
        println!("{}", table.display(&grammar));
    }

    if let Some(input) = &args.input {
        let mut terminals = vec![];
        for name in input.split_whitespace() {
            let t = grammar
                .terminal_by_name(name)
                .filter(|t| !t.is_eoi() && !t.is_epsilon())
                .ok_or_else(|| anyhow::anyhow!("unknown terminal `{}'", name))?;
            terminals.push(t);
        }

        let derivation = Driver::new(&table).parse(terminals).map_err(|err| {
            let expected: Vec<&str> = match &err {
                kestrel::runtime::ParseError::Syntax { state, .. } => table
                    .expected_terminals(*state)
                    .map(|t| grammar.terminals[&t].name())
                    .collect(),
                _ => vec![],
            };
            anyhow::anyhow!("{} (expected one of: {})", err, expected.join(" "))
        })?;

        println!("## reductions");
        for production in &derivation.reductions {
            println!("- {}", grammar.production(*production).display(&grammar));
        }
        println!("## steps");
        let steps: Vec<String> = derivation.steps.iter().map(|s| s.to_string()).collect();
        println!("{}", steps.join(" "));
    }

    Ok(())
}
