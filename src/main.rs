use anyhow::{Context, Result};
use bank_reconciliation::{
    load_csv, logging, MatchConfig, ReconciliationEngine, UnparsableAmountPolicy,
};
use clap::Parser;
use std::path::PathBuf;
use tracing::info;

/// Reconcile a bank statement against a financial register
#[derive(Parser, Debug)]
#[command(name = "bank-reconcile", version, about, long_about = None)]
struct Cli {
    /// Bank statement CSV (date, amount, reconciliation code)
    #[arg(long)]
    bank: PathBuf,

    /// Financial register CSV (date, amount)
    #[arg(long)]
    financial: PathBuf,

    /// Output JSON report (default: stdout)
    #[arg(short, long)]
    output: Option<PathBuf>,

    /// JSON config file; flags below override it
    #[arg(short, long)]
    config: Option<PathBuf>,

    #[arg(long)]
    tolerance: Option<f64>,

    #[arg(long)]
    max_combination_size: Option<usize>,

    /// Combinations examined per bank entry before giving up
    #[arg(long)]
    iter_limit: Option<u64>,

    /// Keep financial rows with unparsable amounts out of matching instead of using 0.00
    #[arg(long)]
    exclude_unparsable_amounts: bool,

    /// Match date partitions in parallel
    #[arg(long)]
    parallel: bool,

    /// Wall-clock budget for matching; later entries are reported not attempted
    #[arg(long)]
    time_budget_ms: Option<u64>,

    /// CSV field delimiter
    #[arg(short, long, default_value_t = ',')]
    delimiter: char,

    #[arg(short, long)]
    verbose: bool,
}

fn main() -> Result<()> {
    let cli = Cli::parse();
    logging::init(cli.verbose);

    let config = build_config(&cli)?;
    run_reconcile(&cli, config)
}

fn build_config(cli: &Cli) -> Result<MatchConfig> {
    let mut config = match &cli.config {
        Some(path) => MatchConfig::load(path)
            .with_context(|| format!("Failed to load config: {}", path.display()))?,
        None => MatchConfig::default(),
    };

    if let Some(tolerance) = cli.tolerance {
        config.tolerance = tolerance;
    }
    if let Some(size) = cli.max_combination_size {
        config.max_combination_size = size;
    }
    if let Some(limit) = cli.iter_limit {
        config.iter_limit = limit;
    }
    if cli.exclude_unparsable_amounts {
        config.unparsable_amount = UnparsableAmountPolicy::Exclude;
    }
    if cli.parallel {
        config.parallel = true;
    }
    if cli.time_budget_ms.is_some() {
        config.time_budget_ms = cli.time_budget_ms;
    }

    Ok(config)
}

fn run_reconcile(cli: &Cli, config: MatchConfig) -> Result<()> {
    if !cli.delimiter.is_ascii() {
        anyhow::bail!("Delimiter must be a single ASCII character, got {:?}", cli.delimiter);
    }
    let delimiter = cli.delimiter as u8;

    let bank = load_csv(&cli.bank, delimiter)
        .with_context(|| format!("Failed to read bank file: {}", cli.bank.display()))?;
    let financial = load_csv(&cli.financial, delimiter)
        .with_context(|| format!("Failed to read financial file: {}", cli.financial.display()))?;
    info!(bank_rows = bank.len(), financial_rows = financial.len(), "loaded input files");

    let engine = ReconciliationEngine::with_config(config)?;
    let report = engine.reconcile(&bank, &financial)?;

    match &cli.output {
        Some(path) => {
            report
                .write_json(path)
                .with_context(|| format!("Failed to write report: {}", path.display()))?;
            info!(path = %path.display(), "report written");
        }
        None => println!("{}", report.to_json_pretty()?),
    }

    eprintln!("{}", report.summary_line());
    Ok(())
}
