//! The `brioc` command-line front end.
//!
//! Takes a JSON-serialized syntax tree (the parser is a separate tool),
//! runs the analysis pipeline and prints the requested dumps to stdout.
//! Exit codes: 0 clean, 1 diagnostics reported, 2 usage/input failure.

use anyhow::{Context, Result};
use brioc_ast::Program;
use brioc_drv::{compile, symbol_table_dump};
use clap::{Parser, ValueEnum};
use std::path::PathBuf;
use std::process;
use tracing_subscriber::EnvFilter;

#[derive(Parser)]
#[command(name = "brioc", version, about = "Brio semantic analyzer and TAC generator")]
struct Cli {
    /// Path to a JSON-serialized syntax tree
    input: PathBuf,

    /// Which outputs to print
    #[arg(long, value_enum, default_value = "all")]
    emit: Emit,

    /// Verbose pipeline logging
    #[arg(short, long)]
    verbose: bool,
}

#[derive(Clone, Copy, PartialEq, Eq, ValueEnum)]
enum Emit {
    /// Quadruple stream only
    Tac,
    /// Symbol table dump only
    Symbols,
    /// Diagnostics only
    Diagnostics,
    /// Everything, as one JSON object
    All,
}

fn main() {
    let cli = Cli::parse();

    let filter = if cli.verbose {
        EnvFilter::new("debug")
    } else {
        EnvFilter::from_default_env()
    };
    tracing_subscriber::fmt()
        .with_env_filter(filter)
        .with_writer(std::io::stderr)
        .init();

    match run(&cli) {
        Ok(clean) => process::exit(if clean { 0 } else { 1 }),
        Err(e) => {
            eprintln!("error: {:#}", e);
            process::exit(2);
        }
    }
}

fn run(cli: &Cli) -> Result<bool> {
    let source = std::fs::read_to_string(&cli.input)
        .with_context(|| format!("cannot read {}", cli.input.display()))?;
    let program: Program = serde_json::from_str(&source)
        .with_context(|| format!("{} is not a valid syntax tree", cli.input.display()))?;

    let analysis = compile(&program);

    let output = match cli.emit {
        Emit::Tac => serde_json::to_value(&analysis.quads)?,
        Emit::Symbols => serde_json::to_value(symbol_table_dump(&analysis.table))?,
        Emit::Diagnostics => serde_json::to_value(&analysis.diagnostics)?,
        Emit::All => serde_json::json!({
            "diagnostics": analysis.diagnostics,
            "symbols": symbol_table_dump(&analysis.table),
            "tac": analysis.quads,
        }),
    };
    println!("{}", serde_json::to_string_pretty(&output)?);

    for diagnostic in &analysis.diagnostics {
        eprintln!("{}", diagnostic);
    }

    Ok(analysis.is_clean())
}
