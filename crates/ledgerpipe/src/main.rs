use std::path::PathBuf;

use clap::Parser;
use tracing_subscriber::EnvFilter;

use ledgerpipe::{ConfigLoader, ImportPipeline, RunOptions, SystemLedger, YamlConfigLoader};

/// Import pending bank and broker CSV statements into a git-backed
/// plain-text ledger.
#[derive(Debug, Parser)]
#[command(name = "ledgerpipe", version, about)]
struct Cli {
    /// Ledger repository root (must contain import.yaml).
    #[arg(short = 'C', long = "directory", default_value = ".")]
    directory: PathBuf,

    /// Caller identity, checked against the configured allowed caller.
    #[arg(long, default_value = "bookkeeper")]
    caller: String,

    /// Only process statements of this provider.
    #[arg(long)]
    provider: Option<String>,

    /// Only process statements of this currency.
    #[arg(long)]
    currency: Option<String>,

    /// Reported closing balance to reconcile against, e.g. "CHF 1234.50".
    #[arg(long)]
    statement_balance: Option<String>,

    /// Skip classification and renaming of staged statements.
    #[arg(long)]
    skip_classify: bool,

    /// Remove the isolation workspace even when a step fails.
    #[arg(long)]
    discard_on_error: bool,
}

fn main() {
    tracing_subscriber::fmt()
        .with_env_filter(
            EnvFilter::try_from_default_env().unwrap_or_else(|_| EnvFilter::new("info")),
        )
        .with_writer(std::io::stderr)
        .init();

    let cli = Cli::parse();

    let loader = YamlConfigLoader;
    // The ledger binary name lives in the config; fall back to the default
    // and let the pipeline report the configuration error properly.
    let binary = loader
        .load(&cli.directory)
        .map(|config| config.ledger.binary)
        .unwrap_or_else(|_| "hledger".to_string());
    let ledger = SystemLedger::new(binary);

    let options = RunOptions {
        provider: cli.provider,
        currency: cli.currency,
        statement_balance: cli.statement_balance,
        skip_classify: cli.skip_classify,
        keep_on_error: !cli.discard_on_error,
    };

    let pipeline = ImportPipeline::new(&loader, &ledger);
    let result = pipeline.run(&cli.directory, &cli.caller, options);

    match serde_json::to_string_pretty(&result) {
        Ok(json) => println!("{json}"),
        Err(e) => eprintln!("Failed to serialize pipeline result: {e}"),
    }

    std::process::exit(if result.success { 0 } else { 1 });
}
