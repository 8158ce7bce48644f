//! Configuration types and CLI options.
//!
//! This module defines enums and structs used for command-line argument
//! parsing and configuration.

use std::path::PathBuf;

use clap::{Parser, ValueEnum};

use crate::config::constants::{DB_PATH, DEFAULT_USER_AGENT, HTTP_TIMEOUT_SECS, RUM_WINDOW_DAYS};

/// Logging level for the application.
///
/// Controls the verbosity of log output, from most restrictive (Error) to most
/// verbose (Trace).
#[derive(Clone, Debug, ValueEnum)]
pub enum LogLevel {
    /// Only error messages
    Error,
    /// Error and warning messages
    Warn,
    /// Error, warning, and informational messages
    Info,
    /// All messages except trace
    Debug,
    /// All messages including trace
    Trace,
}

impl From<LogLevel> for log::LevelFilter {
    fn from(l: LogLevel) -> Self {
        match l {
            LogLevel::Error => log::LevelFilter::Error,
            LogLevel::Warn => log::LevelFilter::Warn,
            LogLevel::Info => log::LevelFilter::Info,
            LogLevel::Debug => log::LevelFilter::Debug,
            LogLevel::Trace => log::LevelFilter::Trace,
        }
    }
}

/// Log output format.
#[derive(Clone, Debug, ValueEnum)]
pub enum LogFormat {
    /// Human-readable format with colors (default)
    Plain,
    /// Structured JSON format for machine parsing
    Json,
}

/// Audit configuration.
///
/// Doubles as the CLI argument surface (via clap derive) and as a plain
/// struct for programmatic library use.
#[derive(Debug, Clone, Parser)]
#[command(
    name = "link_audit",
    about = "Detects and prioritizes broken internal links for a site"
)]
pub struct Config {
    /// Base URL of the audited site (may carry a subpath, e.g. https://example.com/blog)
    #[arg(long)]
    pub base_url: String,

    /// Stable site identifier used for opportunities and queue messages
    #[arg(long, default_value = "")]
    pub site_id: String,

    /// Audit run identifier recorded on the opportunity (generated when empty)
    #[arg(long, default_value = "")]
    pub audit_id: String,

    /// Directory holding scraped page bodies plus a manifest.json mapping URL -> file
    #[arg(long, default_value = "./scrapes")]
    pub scrape_dir: PathBuf,

    /// Optional JSON file listing the site's top-page URLs (crawl index extract)
    #[arg(long)]
    pub top_pages_file: Option<PathBuf>,

    /// RUM analytics endpoint for the 404 internal-links report (skipped when absent)
    #[arg(long)]
    pub rum_endpoint: Option<String>,

    /// Rolling time window in days for the RUM report
    #[arg(long, default_value_t = RUM_WINDOW_DAYS)]
    pub rum_window_days: u32,

    /// SQLite database path for run metadata, crawl state, and suggestions
    #[arg(long, default_value = DB_PATH)]
    pub db_path: PathBuf,

    /// File that Mystique queue messages are appended to as JSON lines
    #[arg(long, default_value = "./mystique_outbox.jsonl")]
    pub mystique_outbox: PathBuf,

    /// Log broken-link batches instead of writing them to the outbox
    #[arg(long, default_value_t = false)]
    pub dry_run: bool,

    /// Maximum concurrent reachability probes
    #[arg(long, default_value_t = crate::config::constants::PROBE_CONCURRENCY)]
    pub max_concurrency: usize,

    /// Per-request timeout in seconds
    #[arg(long, default_value_t = HTTP_TIMEOUT_SECS)]
    pub timeout_seconds: u64,

    /// HTTP User-Agent header value for probes
    #[arg(long, default_value = DEFAULT_USER_AGENT)]
    pub user_agent: String,

    /// Log level
    #[arg(long, value_enum, default_value = "info")]
    pub log_level: LogLevel,

    /// Log format
    #[arg(long, value_enum, default_value = "plain")]
    pub log_format: LogFormat,
}

impl Default for Config {
    fn default() -> Self {
        Self {
            base_url: String::new(),
            site_id: String::new(),
            audit_id: String::new(),
            scrape_dir: PathBuf::from("./scrapes"),
            top_pages_file: None,
            rum_endpoint: None,
            rum_window_days: RUM_WINDOW_DAYS,
            db_path: PathBuf::from(DB_PATH),
            mystique_outbox: PathBuf::from("./mystique_outbox.jsonl"),
            dry_run: false,
            max_concurrency: crate::config::constants::PROBE_CONCURRENCY,
            timeout_seconds: HTTP_TIMEOUT_SECS,
            user_agent: DEFAULT_USER_AGENT.to_string(),
            log_level: LogLevel::Info,
            log_format: LogFormat::Plain,
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_log_level_conversion() {
        assert_eq!(
            log::LevelFilter::from(LogLevel::Error),
            log::LevelFilter::Error
        );
        assert_eq!(
            log::LevelFilter::from(LogLevel::Warn),
            log::LevelFilter::Warn
        );
        assert_eq!(
            log::LevelFilter::from(LogLevel::Info),
            log::LevelFilter::Info
        );
        assert_eq!(
            log::LevelFilter::from(LogLevel::Debug),
            log::LevelFilter::Debug
        );
        assert_eq!(
            log::LevelFilter::from(LogLevel::Trace),
            log::LevelFilter::Trace
        );
    }

    #[test]
    fn test_config_default() {
        let config = Config::default();
        assert_eq!(config.rum_window_days, 30);
        assert_eq!(config.max_concurrency, 30);
        assert_eq!(config.timeout_seconds, 10);
        assert!(!config.dry_run);
        assert_eq!(config.db_path, PathBuf::from("./link_audit.db"));
    }

    #[test]
    fn test_config_parses_minimal_args() {
        let config = Config::parse_from(["link_audit", "--base-url", "https://example.com"]);
        assert_eq!(config.base_url, "https://example.com");
        assert!(config.rum_endpoint.is_none());
        assert!(config.top_pages_file.is_none());
    }

    #[test]
    fn test_config_parses_full_args() {
        let config = Config::parse_from([
            "link_audit",
            "--base-url",
            "https://example.com/blog",
            "--site-id",
            "site-1",
            "--rum-endpoint",
            "https://rum.example.com/report",
            "--dry-run",
            "--log-level",
            "debug",
        ]);
        assert_eq!(config.site_id, "site-1");
        assert!(config.dry_run);
        assert_eq!(
            config.rum_endpoint.as_deref(),
            Some("https://rum.example.com/report")
        );
    }
}
