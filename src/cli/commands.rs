//! Command implementations for the four-point-probe processor CLI
//!
//! Sets up logging and configuration, expands the inputs, runs the batch
//! and reports results in the requested format.

use crate::cli::args::{Args, BatchArgs, OutputFormat};
use crate::cli::input::expand_inputs;
use crate::config::AnalysisConfig;
use crate::constants::LOG_FILE_TIMESTAMP_FORMAT;
use crate::error::{ProcessorError, Result};
use crate::pipeline::Analyzer;
use crate::processor::{
    BatchProcessor, BatchStats, FileOutcome, Operation, Product, print_summary, write_csv_outputs,
    write_json_outputs,
};
use std::fs::{self, File};
use std::path::{Path, PathBuf};
use std::sync::Mutex;
use tracing::{debug, info};

/// Main command runner
///
/// 1. Set up logging and configuration
/// 2. Expand the inputs into measurement files
/// 3. Run the operation over every file
/// 4. Write or print the results
pub async fn run(args: Args) -> Result<BatchStats> {
    let (operation, batch) = args.operation();

    setup_logging(batch)?;
    info!("Starting fourpp {}", operation.name());
    debug!("Command line arguments: {:?}", args);

    batch.validate(operation)?;
    let config = load_configuration(batch)?;
    debug!("Loaded configuration: {:?}", config);

    let files = expand_inputs(&batch.inputs)?;
    info!("Analysing {} files", files.len());

    let workers = config.effective_workers();
    let processor = BatchProcessor::new(Analyzer::new(config))
        .with_workers(workers)
        .with_progress(batch.show_progress());
    let (outcomes, stats) = processor.run(operation, &files).await;

    report(batch, operation, &outcomes, &stats)?;
    Ok(stats)
}

/// Set up structured logging based on CLI arguments
fn setup_logging(args: &BatchArgs) -> Result<()> {
    use tracing_subscriber::{EnvFilter, fmt, layer::SubscriberExt, util::SubscriberInitExt};

    let log_level = args.get_log_level();

    let filter = EnvFilter::try_from_default_env()
        .unwrap_or_else(|_| EnvFilter::new(format!("fourpp_processor={}", log_level)));

    let file_layer = match &args.log_dir {
        Some(dir) => {
            let log_file = File::create(log_file_path(dir)?)?;
            Some(
                fmt::layer()
                    .with_target(false)
                    .with_ansi(false)
                    .with_writer(Mutex::new(log_file)),
            )
        }
        None => None,
    };

    let initialized = if args.quiet {
        // Minimal logging for quiet mode
        tracing_subscriber::registry()
            .with(filter)
            .with(file_layer)
            .with(
                fmt::layer()
                    .with_target(false)
                    .with_level(true)
                    .with_writer(std::io::stderr)
                    .compact(),
            )
            .try_init()
    } else {
        tracing_subscriber::registry()
            .with(filter)
            .with(file_layer)
            .with(
                fmt::layer()
                    .with_target(false)
                    .with_level(true)
                    .with_timer(fmt::time::uptime())
                    .with_writer(std::io::stderr),
            )
            .try_init()
    };
    initialized.map_err(|e| ProcessorError::Configuration {
        message: format!("Failed to initialize logging: {}", e),
    })?;

    debug!("Logging initialized at level: {}", log_level);
    Ok(())
}

/// `<dir>/fourpp_<timestamp>.log`, creating the directory
fn log_file_path(dir: &Path) -> Result<PathBuf> {
    fs::create_dir_all(dir)?;
    let timestamp = chrono::Local::now().format(LOG_FILE_TIMESTAMP_FORMAT);
    Ok(dir.join(format!("fourpp_{}.log", timestamp)))
}

/// Load configuration (file, then command-line overrides)
fn load_configuration(args: &BatchArgs) -> Result<AnalysisConfig> {
    let mut config = AnalysisConfig::discover(args.config_file.as_deref())?;
    args.apply_overrides(&mut config);
    config.validate()?;
    Ok(config)
}

fn report(
    args: &BatchArgs,
    operation: Operation,
    outcomes: &[FileOutcome],
    stats: &BatchStats,
) -> Result<()> {
    if let Some(output_dir) = &args.output_path {
        let written = match args.output_format {
            OutputFormat::Csv => write_csv_outputs(outcomes, operation, output_dir)?,
            OutputFormat::Human | OutputFormat::Json => {
                write_json_outputs(outcomes, operation, output_dir)?
            }
        };
        info!("Wrote {} files to {}", written.len(), output_dir.display());
        if args.output_format == OutputFormat::Human {
            print_summary(outcomes, stats);
        }
        return Ok(());
    }

    match args.output_format {
        OutputFormat::Human => {
            print_summary(outcomes, stats);
            Ok(())
        }
        OutputFormat::Json => {
            println!("{}", serde_json::to_string_pretty(&json_report(outcomes))?);
            Ok(())
        }
        OutputFormat::Csv => {
            print!("{}", verdict_csv(outcomes));
            Ok(())
        }
    }
}

/// One entry per file holding either the result document or the error
fn json_report(outcomes: &[FileOutcome]) -> serde_json::Value {
    let entries = outcomes
        .iter()
        .map(|outcome| {
            let path = outcome.path.display().to_string();
            match &outcome.result {
                Ok(product) => serde_json::json!({ "path": path, "result": product }),
                Err(e) => serde_json::json!({ "path": path, "error": e }),
            }
        })
        .collect();
    serde_json::Value::Array(entries)
}

fn csv_field(value: &str) -> String {
    if value.contains([',', '"', '\n']) {
        format!("\"{}\"", value.replace('"', "\"\""))
    } else {
        value.to_string()
    }
}

/// `path,code,message,warning`; failed files carry their error as message
fn verdict_csv(outcomes: &[FileOutcome]) -> String {
    let mut csv = String::from("path,code,message,warning\n");
    for outcome in outcomes {
        let path = csv_field(&outcome.path.display().to_string());
        let line = match &outcome.result {
            Ok(Product::Verdict(verdict)) => format!(
                "{},{},{},{}",
                path,
                verdict.code,
                csv_field(verdict.message.as_deref().unwrap_or("")),
                csv_field(verdict.warning.as_deref().unwrap_or(""))
            ),
            Ok(_) => format!("{},,,", path),
            Err(e) => format!("{},,{},", path, csv_field(e)),
        };
        csv.push_str(&line);
        csv.push('\n');
    }
    csv
}
