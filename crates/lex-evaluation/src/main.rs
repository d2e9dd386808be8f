//! CLI entry point for the missing-value remediation evaluation.

use anyhow::{Result, anyhow};
use clap::Parser;
use lex_evaluation::{
    AccuracyRecords, EvaluationConfig, EvaluationHarness, EvaluationReport, FailurePolicy,
    StrategyId,
};
use polars::io::csv::read::CsvReadOptions;
use polars::prelude::*;
use std::path::{Path, PathBuf};
use tracing::{error, info};

#[derive(Parser, Debug)]
#[command(
    author = "Lex Machina Team",
    version,
    about = "Evaluate missing-value remediation strategies",
    long_about = "Trains one classifier on complete rows and compares six ways of handling \
                  rows with missing feature values: abstention (A), majority class (B), \
                  feature omission (C), mean (D), median (E) and KNN (F) imputation.\n\n\
                  The first CSV column is the target score; every other column is a \
                  numeric feature.\n\n\
                  EXAMPLES:\n  \
                  # Default settings (threshold 0.5, seed 0, 3000 train rows)\n  \
                  lex-evaluation -i data.csv\n\n  \
                  # Smaller forest, keep going when a strategy fails\n  \
                  lex-evaluation -i data.csv --n-estimators 20 --isolate-failures\n\n  \
                  # Machine-readable output\n  \
                  lex-evaluation -i data.csv --json | jq .missing_values"
)]
struct Args {
    /// Path to the CSV file to evaluate
    #[arg(short, long)]
    input: String,

    /// Target scores at or above this value are labelled 1
    #[arg(long, default_value = "0.5")]
    threshold: f64,

    /// Seed for the train sample and the classifier
    #[arg(long, default_value = "0")]
    seed: u64,

    /// Number of complete rows sampled for training
    #[arg(long, default_value = "3000")]
    train_size: usize,

    /// Number of neighbors for KNN imputation
    #[arg(long, default_value = "30")]
    knn_neighbors: usize,

    /// Number of trees in the random forest
    #[arg(long, default_value = "100")]
    n_estimators: usize,

    /// Maximum depth of each tree (unlimited if not set)
    #[arg(long)]
    max_depth: Option<usize>,

    /// Record failing strategies and continue instead of stopping
    #[arg(long)]
    isolate_failures: bool,

    /// Output JSON to stdout instead of a table
    ///
    /// Disables all logs; only the report (or the error) is written.
    #[arg(long)]
    json: bool,

    /// Log level (trace, debug, info, warn, error)
    #[arg(short, long, default_value = "info")]
    log_level: String,

    /// Suppress progress output (only show warnings, errors and the result)
    #[arg(short, long)]
    quiet: bool,
}

/// Initialize the tracing subscriber for logging.
///
/// When `json_output` is true, logging is completely disabled to ensure
/// only JSON is written to stdout.
fn init_logging(level: &str, quiet: bool, json_output: bool) {
    if json_output {
        return;
    }

    use tracing_subscriber::EnvFilter;

    let effective_level = if quiet { "warn" } else { level };

    let filter =
        EnvFilter::try_from_default_env().unwrap_or_else(|_| EnvFilter::new(effective_level));

    tracing_subscriber::fmt()
        .with_env_filter(filter)
        .with_target(false)
        .init();
}

fn main() -> Result<()> {
    let args = Args::parse();

    init_logging(&args.log_level, args.quiet, args.json);

    if !Path::new(&args.input).exists() {
        return Err(anyhow!("Input file not found: {}", args.input));
    }

    info!("Loading dataset from: {}", args.input);
    let data = CsvReadOptions::default()
        .with_has_header(true)
        .try_into_reader_with_file_path(Some(PathBuf::from(&args.input)))?
        .finish()
        .map_err(|e| anyhow!("Failed to read {}: {}", args.input, e))?;
    info!("Dataset loaded successfully: {:?}", data.shape());

    let config = build_config(&args)?;
    let mut builder = EvaluationHarness::builder().config(config);

    if !args.quiet && !args.json {
        builder = builder.on_progress(|update| {
            info!(
                "[{:.0}%] {}: {}",
                update.progress * 100.0,
                update.stage.display_name(),
                update.message
            );
        });
    }

    let mut harness = builder.build()?;

    match harness.run(&data) {
        Ok(report) => {
            if args.json {
                println!("{}", serde_json::to_string_pretty(&report)?);
            } else {
                print_report(&report);
            }
            Ok(())
        }
        Err(e) => {
            if args.json {
                println!("{}", serde_json::to_string_pretty(&e)?);
            } else if let Some(partial) = e.partial_results().filter(|p| !p.is_empty()) {
                println!("Strategies completed before the failure:");
                print_accuracy_table(partial);
            }
            error!("Evaluation failed: {}", e);
            Err(anyhow!("Evaluation failed: {}", e))
        }
    }
}

fn build_config(args: &Args) -> Result<EvaluationConfig> {
    let mut builder = EvaluationConfig::builder()
        .threshold(args.threshold)
        .random_seed(args.seed)
        .train_size(args.train_size)
        .knn_neighbors(args.knn_neighbors)
        .n_estimators(args.n_estimators);

    if let Some(depth) = args.max_depth {
        builder = builder.max_depth(depth);
    }

    if args.isolate_failures {
        builder = builder.failure_policy(FailurePolicy::Isolate);
    }

    Ok(builder.build()?)
}

/// Print the report as a human-readable table.
///
/// Uses `println!` on purpose: this is the command's output, not a log.
fn print_report(report: &EvaluationReport) {
    let sizes = report.partition_sizes;

    println!();
    println!("{}", "=".repeat(72));
    println!("EVALUATION COMPLETE");
    println!("{}", "=".repeat(72));
    println!();
    println!(
        "Partitions: {} train, {} test, {} missing",
        sizes.train, sizes.test, sizes.missing
    );
    if report.missing_columns.is_empty() {
        println!("Columns with missing values: none");
    } else {
        println!(
            "Columns with missing values: {}",
            report.missing_columns.join(", ")
        );
    }
    println!("Duration: {}ms", report.duration_ms);
    println!();

    print_accuracy_table(&report.accuracies);

    if !report.failures.is_empty() {
        println!();
        println!("Failed strategies:");
        for failure in &report.failures {
            println!(
                "  {} [{}] {}",
                failure.strategy, failure.code, failure.message
            );
        }
    }
    println!();
}

fn print_accuracy_table(records: &AccuracyRecords) {
    println!(
        "{:<4} {:<20} {:>18} {:>18}",
        "ID", "Strategy", "Entire test set", "Missing values"
    );
    println!("{}", "-".repeat(63));

    for strategy in StrategyId::ALL {
        let (Some(entire), Some(missing)) = (
            records.entire_test_set.get(&strategy),
            records.missing_values.get(&strategy),
        ) else {
            continue;
        };
        println!(
            "{:<4} {:<20} {:>18.4} {:>18.4}",
            strategy.code(),
            strategy.display_name(),
            entire,
            missing
        );
    }
}
