//! Batch processing engine.
//!
//! Runs one analysis operation over many files with bounded concurrency.
//! Each file is analysed on the blocking pool; a failure is recorded
//! against its file and never stops the batch.

use crate::error::Result;
use crate::formatter::{AreaPayload, DataTableResponse, OverallPayload};
use crate::models::ValidationVerdict;
use crate::pipeline::{Analyzer, Inspection};

use colored::*;
use futures::stream::{self, StreamExt};
use indicatif::{HumanDuration, ProgressBar, ProgressStyle};
use polars::prelude::{CsvWriter, SerWriter};
use serde::Serialize;
use std::fs::{self, File};
use std::path::{Path, PathBuf};
use std::sync::Arc;
use std::time::{Duration, Instant};
use tokio::task;
use tracing::{debug, error, info};

/// Operation applied to every file of a batch
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum Operation {
    Validate,
    Table,
    Areas,
    Overall,
    Inspect,
}

impl Operation {
    pub fn name(&self) -> &'static str {
        match self {
            Operation::Validate => "validate",
            Operation::Table => "table",
            Operation::Areas => "areas",
            Operation::Overall => "overall",
            Operation::Inspect => "inspect",
        }
    }

    fn run(&self, analyzer: &Analyzer, path: &Path) -> Result<Product> {
        Ok(match self {
            Operation::Validate => Product::Verdict(analyzer.validate(path)?),
            Operation::Table => Product::Table(analyzer.data_table(path)?),
            Operation::Areas => Product::Areas(analyzer.area_payload(path)?),
            Operation::Overall => Product::Overall(analyzer.overall_payload(path)?),
            Operation::Inspect => Product::Inspection(Box::new(analyzer.inspect(path)?)),
        })
    }
}

/// Result document of one operation
#[derive(Debug, Clone, Serialize)]
#[serde(untagged)]
pub enum Product {
    Verdict(ValidationVerdict),
    Table(DataTableResponse),
    Areas(AreaPayload),
    Overall(OverallPayload),
    Inspection(Box<Inspection>),
}

impl Product {
    pub fn verdict(&self) -> Option<&ValidationVerdict> {
        match self {
            Product::Verdict(verdict) => Some(verdict),
            _ => None,
        }
    }
}

/// Outcome for a single input file
#[derive(Debug, Clone)]
pub struct FileOutcome {
    pub path: PathBuf,
    pub result: std::result::Result<Product, String>,
}

impl FileOutcome {
    pub fn is_error(&self) -> bool {
        self.result.is_err()
    }

    /// True when the file was validated with a non-zero verdict
    pub fn is_invalid(&self) -> bool {
        matches!(&self.result, Ok(product) if product.verdict().is_some_and(|v| !v.is_valid()))
    }
}

/// Batch statistics for reporting
#[derive(Debug, Clone, Default, PartialEq)]
pub struct BatchStats {
    pub files_processed: usize,
    pub files_failed: usize,
    pub files_invalid: usize,
    pub processing_time: Duration,
}

impl BatchStats {
    pub fn from_outcomes(outcomes: &[FileOutcome], processing_time: Duration) -> Self {
        let files_failed = outcomes.iter().filter(|o| o.is_error()).count();
        Self {
            files_processed: outcomes.len() - files_failed,
            files_failed,
            files_invalid: outcomes.iter().filter(|o| o.is_invalid()).count(),
            processing_time,
        }
    }
}

/// Concurrent runner sharing one analyzer between workers
pub struct BatchProcessor {
    analyzer: Arc<Analyzer>,
    workers: usize,
    show_progress: bool,
}

impl BatchProcessor {
    pub fn new(analyzer: Analyzer) -> Self {
        let workers = analyzer.config().effective_workers();
        Self {
            analyzer: Arc::new(analyzer),
            workers,
            show_progress: false,
        }
    }

    pub fn with_workers(mut self, workers: usize) -> Self {
        self.workers = workers.max(1);
        self
    }

    pub fn with_progress(mut self, show_progress: bool) -> Self {
        self.show_progress = show_progress;
        self
    }

    /// Run `operation` over `files`; outcomes keep the input order
    pub async fn run(&self, operation: Operation, files: &[PathBuf]) -> (Vec<FileOutcome>, BatchStats) {
        let start_time = Instant::now();
        let concurrent_limit = self.workers.min(files.len()).max(1);
        debug!(
            "Running {} over {} files with {} workers",
            operation.name(),
            files.len(),
            concurrent_limit
        );

        let pb = if self.show_progress {
            let pb = ProgressBar::new(files.len() as u64);
            pb.set_style(
                ProgressStyle::default_bar()
                    .template("{spinner:.green} [{elapsed_precise}] [{bar:40.cyan/blue}] {pos}/{len} ({eta}) {msg}")
                    .unwrap_or_else(|_| ProgressStyle::default_bar())
                    .progress_chars("#>-"),
            );
            pb
        } else {
            ProgressBar::hidden()
        };

        let mut outcomes: Vec<(usize, FileOutcome)> = stream::iter(files.iter().enumerate())
            .map(|(index, path)| {
                let analyzer = Arc::clone(&self.analyzer);
                let path = path.clone();
                let pb = pb.clone();
                async move {
                    if let Some(file_name) = path.file_name() {
                        pb.set_message(format!("Analysing: {}", file_name.to_string_lossy()));
                    }

                    let task_path = path.clone();
                    let result = task::spawn_blocking(move || operation.run(&analyzer, &task_path))
                        .await
                        .map_err(|e| format!("worker task failed: {}", e))
                        .and_then(|result| result.map_err(|e| e.to_string()));
                    pb.inc(1);

                    if let Err(e) = &result {
                        error!("Failed to {} {}: {}", operation.name(), path.display(), e);
                    }
                    (index, FileOutcome { path, result })
                }
            })
            .buffer_unordered(concurrent_limit)
            .collect()
            .await;

        pb.finish_with_message("All files analysed");
        outcomes.sort_by_key(|(index, _)| *index);
        let outcomes: Vec<FileOutcome> = outcomes.into_iter().map(|(_, outcome)| outcome).collect();

        let stats = BatchStats::from_outcomes(&outcomes, start_time.elapsed());
        info!(
            "{} complete: {} processed, {} failed",
            operation.name(),
            stats.files_processed,
            stats.files_failed
        );
        (outcomes, stats)
    }
}

/// `<stem>.<operation>.<extension>`
pub fn output_file_name(path: &Path, operation: Operation, extension: &str) -> String {
    let stem = path
        .file_stem()
        .map(|s| s.to_string_lossy().into_owned())
        .unwrap_or_else(|| "output".to_string());
    format!("{}.{}.{}", stem, operation.name(), extension)
}

/// Write one JSON document per successful outcome into `output_dir`
pub fn write_json_outputs(
    outcomes: &[FileOutcome],
    operation: Operation,
    output_dir: &Path,
) -> Result<Vec<PathBuf>> {
    fs::create_dir_all(output_dir)?;
    let mut written = Vec::new();
    for outcome in outcomes {
        let Ok(product) = &outcome.result else {
            continue;
        };
        let target = output_dir.join(output_file_name(&outcome.path, operation, "json"));
        let file = File::create(&target)?;
        serde_json::to_writer_pretty(file, product)?;
        debug!("Wrote {}", target.display());
        written.push(target);
    }
    Ok(written)
}

/// Write data tables as CSV; other products fall back to JSON
pub fn write_csv_outputs(
    outcomes: &[FileOutcome],
    operation: Operation,
    output_dir: &Path,
) -> Result<Vec<PathBuf>> {
    fs::create_dir_all(output_dir)?;
    let mut written = Vec::new();
    for outcome in outcomes {
        match &outcome.result {
            Ok(Product::Table(response)) => {
                let target = output_dir.join(output_file_name(&outcome.path, operation, "csv"));
                let mut frame = response.to_frame()?;
                let mut file = File::create(&target)?;
                CsvWriter::new(&mut file).include_header(true).finish(&mut frame)?;
                debug!("Wrote {}", target.display());
                written.push(target);
            }
            Ok(_) => {
                written.extend(write_json_outputs(std::slice::from_ref(outcome), operation, output_dir)?);
            }
            Err(_) => {}
        }
    }
    Ok(written)
}

/// Coloured per-file lines plus the batch summary, for terminals
pub fn print_summary(outcomes: &[FileOutcome], stats: &BatchStats) {
    for outcome in outcomes {
        let name = outcome.path.display().to_string();
        match &outcome.result {
            Ok(Product::Verdict(verdict)) if verdict.is_valid() => {
                let note = verdict.warning.as_deref().unwrap_or("");
                println!("  {} {} {}", "valid".bright_green(), name, note.yellow());
            }
            Ok(Product::Verdict(verdict)) => {
                println!(
                    "  {} {} {}",
                    verdict.code.to_string().bright_red().bold(),
                    name,
                    verdict.message.as_deref().unwrap_or("")
                );
            }
            Ok(_) => println!("  {} {}", "ok".bright_green(), name),
            Err(e) => println!("  {} {}: {}", "error".bright_red().bold(), name, e),
        }
    }

    println!("\n{}", "Processing Summary".bright_green().bold());
    println!(
        "  {} {}",
        "Files processed:".bright_cyan(),
        stats.files_processed.to_string().bright_white().bold()
    );
    if stats.files_invalid > 0 {
        println!(
            "  {} {}",
            "Files invalid:".bright_cyan(),
            stats.files_invalid.to_string().bright_yellow().bold()
        );
    }
    if stats.files_failed > 0 {
        println!(
            "  {} {}",
            "Files failed:".bright_cyan(),
            stats.files_failed.to_string().bright_red().bold()
        );
    }
    println!(
        "  {} {}",
        "Processing time:".bright_cyan(),
        HumanDuration(stats.processing_time)
    );
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::config::AnalysisConfig;
    use tempfile::TempDir;

    fn write_file(dir: &Path, name: &str, content: &str) -> PathBuf {
        let path = dir.join(name);
        fs::write(&path, content).unwrap();
        path
    }

    fn single_ma_file(rows: usize) -> String {
        let mut content = String::from("MA,R\n");
        for i in 1..=rows {
            content.push_str(&format!("{},{}.25\n", i, i));
        }
        content
    }

    #[test]
    fn test_output_file_name() {
        let name = output_file_name(Path::new("/data/lib_01.csv"), Operation::Areas, "json");
        assert_eq!(name, "lib_01.areas.json");
    }

    #[tokio::test]
    async fn test_batch_keeps_order_and_isolates_failures() {
        let temp_dir = TempDir::new().unwrap();
        let good = write_file(temp_dir.path(), "good.csv", &single_ma_file(10));
        let sparse = write_file(temp_dir.path(), "sparse.txt", "only prose here\n");
        let missing = temp_dir.path().join("missing.csv");

        let processor = BatchProcessor::new(Analyzer::new(AnalysisConfig::default())).with_workers(2);
        let files = vec![good.clone(), sparse.clone(), missing.clone()];
        let (outcomes, stats) = processor.run(Operation::Validate, &files).await;

        let paths: Vec<&PathBuf> = outcomes.iter().map(|o| &o.path).collect();
        assert_eq!(paths, vec![&good, &sparse, &missing]);

        assert!(outcomes[0].result.as_ref().unwrap().verdict().unwrap().is_valid());
        assert!(outcomes[1].is_invalid());
        assert!(outcomes[2].is_error());

        assert_eq!(stats.files_processed, 2);
        assert_eq!(stats.files_failed, 1);
        assert_eq!(stats.files_invalid, 1);
    }

    #[tokio::test]
    async fn test_outputs_written_per_file() {
        let temp_dir = TempDir::new().unwrap();
        let input = write_file(temp_dir.path(), "lib.csv", &single_ma_file(8));
        let output_dir = temp_dir.path().join("out");

        let processor = BatchProcessor::new(Analyzer::default()).with_workers(1);
        let (outcomes, _) = processor.run(Operation::Table, &[input]).await;

        let written = write_csv_outputs(&outcomes, Operation::Table, &output_dir).unwrap();
        assert_eq!(written, vec![output_dir.join("lib.table.csv")]);
        let csv = fs::read_to_string(&written[0]).unwrap();
        assert!(csv.starts_with("MA,R"));
        assert_eq!(csv.lines().count(), 9);

        let written = write_json_outputs(&outcomes, Operation::Table, &output_dir).unwrap();
        let json: serde_json::Value =
            serde_json::from_str(&fs::read_to_string(&written[0]).unwrap()).unwrap();
        assert_eq!(json["DataTable"].as_array().unwrap().len(), 8);
    }
}
