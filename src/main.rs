//! # Safe Scan CLI (`safe-scan`)
//!
//! Runs the HTTP proxy and offers the same scan, feedback, and counter
//! operations from the terminal.
//!
//! ## Usage
//!
//! ```bash
//! safe-scan --config ./config/safe-scan.toml <command>
//! ```
//!
//! ## Commands
//!
//! | Command | Description |
//! |---------|-------------|
//! | `safe-scan init` | Create the counter database and feedback file |
//! | `safe-scan serve` | Start the HTTP proxy |
//! | `safe-scan scan url <URL>` | Scan a URL and print the report |
//! | `safe-scan scan file <PATH>` | Upload a file (≤ 32 MiB) and print the report |
//! | `safe-scan report <ID>` | Fetch one analysis and print it if completed |
//! | `safe-scan feedback add <TEXT>` | Store a feedback entry |
//! | `safe-scan feedback list` | List feedback, newest first |
//! | `safe-scan counter` | Show the visit count |
//!
//! The scanning API key is read from the environment variable named by
//! `[scanner].api_key_env` (default `VIRUSTOTAL_API_KEY`).

use clap::{Parser, Subcommand};
use std::path::PathBuf;

use safe_scan::scan_cmd::{OutputOptions, ScanTarget};
use safe_scan::{config, counter_cmd, feedback_cmd, init_cmd, logging, scan_cmd, server};

/// Safe Scan: submit URLs and files to a malware-scanning API and report
/// the results.
#[derive(Parser)]
#[command(
    name = "safe-scan",
    about = "Safe Scan: a proxy and CLI for a malware-scanning API",
    version,
    long_about = "Safe Scan forwards URL and file scans to a VirusTotal-compatible API, \
    polls the analysis with backoff, and formats the verdict. It also serves a visit \
    counter and a feedback box for the accompanying web page."
)]
struct Cli {
    /// Path to configuration file (TOML).
    #[arg(long, global = true, default_value = "./config/safe-scan.toml")]
    config: PathBuf,

    /// Log progress at info level (overridden by `RUST_LOG`).
    #[arg(long, short, global = true)]
    verbose: bool,

    #[command(subcommand)]
    command: Commands,
}

/// Top-level CLI commands.
#[derive(Subcommand)]
enum Commands {
    /// Create the counter database and the feedback file.
    ///
    /// Idempotent: running it multiple times is safe.
    Init,

    /// Start the HTTP proxy.
    ///
    /// Binds to `[server].bind` and serves until interrupted.
    Serve,

    /// Submit a URL or file and wait for its report.
    Scan {
        #[command(subcommand)]
        target: ScanCommand,

        /// Print the formatted report as JSON.
        #[arg(long, global = true)]
        json: bool,

        /// Include the per-engine results table.
        #[arg(long, global = true)]
        details: bool,
    },

    /// Fetch an existing analysis once and print its report.
    Report {
        /// Analysis identifier returned by a previous scan.
        id: String,

        /// Print the formatted report as JSON.
        #[arg(long)]
        json: bool,

        /// Include the per-engine results table.
        #[arg(long)]
        details: bool,
    },

    /// Submit or list visitor feedback.
    Feedback {
        #[command(subcommand)]
        action: FeedbackAction,
    },

    /// Show the visit counter.
    Counter {
        /// Count this invocation as a visit before printing.
        #[arg(long)]
        hit: bool,
    },
}

#[derive(Subcommand)]
enum ScanCommand {
    /// Scan a URL.
    Url {
        /// Absolute URL, e.g. `https://example.com`.
        url: String,
    },
    /// Upload and scan a file.
    File {
        /// Path to the file (at most 32 MiB).
        path: PathBuf,
    },
}

#[derive(Subcommand)]
enum FeedbackAction {
    /// Store a feedback entry.
    Add {
        /// Feedback text; surrounding whitespace is trimmed.
        text: String,
    },
    /// List all feedback, newest first.
    List {
        /// Print entries as JSON.
        #[arg(long)]
        json: bool,
    },
}

#[tokio::main]
async fn main() -> anyhow::Result<()> {
    let cli = Cli::parse();
    logging::init(cli.verbose);

    let cfg = config::load_config(&cli.config)?;

    match cli.command {
        Commands::Init => {
            init_cmd::run_init(&cfg).await?;
        }
        Commands::Serve => {
            server::run_server(&cfg).await?;
        }
        Commands::Scan {
            target,
            json,
            details,
        } => {
            let target = match target {
                ScanCommand::Url { url } => ScanTarget::Url(url),
                ScanCommand::File { path } => ScanTarget::File(path),
            };
            scan_cmd::run_scan(&cfg, target, OutputOptions { json, details }).await?;
        }
        Commands::Report { id, json, details } => {
            scan_cmd::run_report(&cfg, &id, OutputOptions { json, details }).await?;
        }
        Commands::Feedback { action } => match action {
            FeedbackAction::Add { text } => {
                feedback_cmd::run_feedback_add(&cfg, &text).await?;
            }
            FeedbackAction::List { json } => {
                feedback_cmd::run_feedback_list(&cfg, json).await?;
            }
        },
        Commands::Counter { hit } => {
            counter_cmd::run_counter(&cfg, hit).await?;
        }
    }

    Ok(())
}
