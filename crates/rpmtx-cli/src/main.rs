//! `rpmtx`: a demo binary that loads a JSON transaction description,
//! runs `check` then `order` against it, and prints the result
//! (SPEC_FULL.md §10.3). Not part of the dependency engine itself --
//! a harness for exercising it end to end.

mod model;
mod output;

use std::path::PathBuf;
use std::process::ExitCode;

use clap::Parser;
use tracing::Level;
use tracing_subscriber::EnvFilter;

/// Run the dependency checker and topological orderer against a JSON
/// transaction description.
#[derive(Debug, Parser)]
#[command(name = "rpmtx", version, about)]
struct Cli {
    /// Path to the transaction JSON file.
    input: PathBuf,

    /// Override the document's `flags.chainsaw` setting to true.
    #[arg(long)]
    chainsaw: bool,

    /// Override the document's `flags.no_suggests` setting to true.
    #[arg(long)]
    no_suggests: bool,

    /// Increase log verbosity (-v, -vv, -vvv).
    #[arg(short, long, action = clap::ArgAction::Count)]
    verbose: u8,
}

fn main() -> ExitCode {
    let cli = Cli::parse();

    let log_level = match cli.verbose {
        0 => Level::WARN,
        1 => Level::INFO,
        2 => Level::DEBUG,
        _ => Level::TRACE,
    };
    let filter = EnvFilter::builder().with_default_directive(log_level.into()).from_env_lossy();
    tracing_subscriber::fmt().with_env_filter(filter).with_target(false).without_time().init();

    match run(&cli) {
        Ok(code) => code,
        Err(err) => {
            eprintln!("error: {err:#}");
            ExitCode::FAILURE
        }
    }
}

fn run(cli: &Cli) -> anyhow::Result<ExitCode> {
    let text = std::fs::read_to_string(&cli.input)?;
    let doc: model::TransactionDoc = serde_json::from_str(&text)?;
    let (mut ts, names_by_key) = model::build_transaction(doc)?;

    if cli.chainsaw {
        ts.flags.chainsaw = true;
    }
    if cli.no_suggests {
        ts.flags.no_suggests = true;
    }

    ts.check()?;
    let probs: Vec<_> = ts.probs.iter().cloned().collect();
    output::print_problems(&probs, &names_by_key);

    match ts.order() {
        Ok(()) => {
            output::print_order(&ts);
            Ok(ExitCode::SUCCESS)
        }
        Err(remaining) => {
            output::print_order_failure(remaining);
            Ok(ExitCode::FAILURE)
        }
    }
}
