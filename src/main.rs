use anyhow::Context;
use clap::Parser;
use fourpp_processor::cli::{args::Args, commands};
use std::process;

fn main() {
    let args = Args::parse();

    let runtime = tokio::runtime::Runtime::new()
        .context("Failed to create async runtime")
        .unwrap_or_else(|e| {
            eprintln!("Error: {:#}", e);
            process::exit(1);
        });

    let result: anyhow::Result<_> = runtime.block_on(async {
        tokio::select! {
            result = commands::run(args) => result.context("Processing failed"),
            _ = tokio::signal::ctrl_c() => {
                eprintln!("\nReceived CTRL+C, shutting down...");
                Err(anyhow::anyhow!("Processing interrupted by user"))
            }
        }
    });

    match result {
        // Per-file failures were already reported by the command
        Ok(stats) if stats.files_failed > 0 => process::exit(1),
        Ok(_) => process::exit(0),
        Err(error) => {
            eprintln!("Error: {:#}", error);
            process::exit(1);
        }
    }
}
