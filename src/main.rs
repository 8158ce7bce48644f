//! Main application entry point (CLI binary).
//!
//! This is a thin wrapper around the `link_audit` library that handles:
//! - Command-line argument parsing
//! - Logger initialization
//! - User-facing output formatting
//!
//! All core functionality is implemented in the library crate.

use anyhow::{Context, Result};
use clap::Parser;
use std::process;

use link_audit::initialization::init_logger_with;
use link_audit::{run_audit, Config};

#[tokio::main]
async fn main() -> Result<()> {
    // Parse command-line arguments into Config
    let config = Config::parse();

    // Initialize logger based on config
    let log_level = config.log_level.clone();
    let log_format = config.log_format.clone();
    init_logger_with(log_level.into(), log_format).context("Failed to initialize logger")?;

    // Run the audit using the library
    match run_audit(config).await {
        Ok(report) => {
            println!(
                "Audit {} found {} broken link{} ({} from crawl, {} from RUM) in {:.1}s",
                report.run_id,
                report.total_links,
                if report.total_links == 1 { "" } else { "s" },
                report.crawl_links,
                report.rum_links,
                report.elapsed_seconds
            );
            if report.resolved_opportunity {
                println!("All previously reported broken links are fixed; opportunity resolved.");
            } else if report.batches_sent > 0 {
                println!("Sent {} batch(es) to Mystique.", report.batches_sent);
            }
            if !report.success {
                eprintln!(
                    "Audit completed with a detection failure: {}",
                    report.rum_error.unwrap_or_else(|| "unknown error".to_string())
                );
                process::exit(1);
            }
            println!("Run details saved in {}", report.db_path.display());
            Ok(())
        }
        Err(e) => {
            eprintln!("Audit failed: {e:#}");
            process::exit(1);
        }
    }
}
