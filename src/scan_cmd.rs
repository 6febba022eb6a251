//! End-to-end scan flow: submit, wait, poll, format.
//!
//! Used by the `safe-scan scan` and `safe-scan report` CLI commands.

use std::path::Path;

use anyhow::{Context, Result};
use safe_scan_core::report::{format_report, AnalysisStatus, FormattedReport};
use safe_scan_core::request::{AnalysisHandle, AnalysisRequest};
use safe_scan_core::ScanError;
use tracing::info;

use crate::config::{Config, PollConfig};
use crate::poller::poll_analysis;
use crate::render::{render_engine_table, render_text};
use crate::scanner::ScannerClient;

/// What to scan, as given on the command line.
#[derive(Debug, Clone)]
pub enum ScanTarget {
    Url(String),
    File(std::path::PathBuf),
}

/// Output switches shared by `scan` and `report`.
#[derive(Debug, Clone, Copy, Default)]
pub struct OutputOptions {
    pub json: bool,
    pub details: bool,
}

/// Read a file into a scan request, checking its size before loading it.
pub async fn file_request(path: &Path) -> Result<AnalysisRequest> {
    let meta = tokio::fs::metadata(path)
        .await
        .with_context(|| format!("Failed to read {}", path.display()))?;
    safe_scan_core::request::validate_file_len(meta.len())?;

    let bytes = tokio::fs::read(path)
        .await
        .with_context(|| format!("Failed to read {}", path.display()))?;
    let filename = path
        .file_name()
        .map(|n| n.to_string_lossy().to_string())
        .unwrap_or_else(|| "upload.bin".to_string());
    Ok(AnalysisRequest::file(bytes, filename))
}

/// Submit `request`, wait the initial delay, then poll until the analysis
/// finishes and format it.
pub async fn scan_and_report(
    scanner: &ScannerClient,
    request: AnalysisRequest,
    poll: &PollConfig,
) -> Result<(AnalysisHandle, FormattedReport), ScanError> {
    let handle = scanner.submit(request).await?;

    let initial = poll.initial_delay();
    if !initial.is_zero() {
        info!(analysis_id = %handle, delay_ms = initial.as_millis() as u64, "waiting before first poll");
        tokio::time::sleep(initial).await;
    }

    let report = poll_analysis(scanner, &handle, &poll.backoff()).await?;
    let formatted = format_report(&report)?;
    Ok((handle, formatted))
}

fn print_report(handle: &AnalysisHandle, report: &FormattedReport, opts: OutputOptions) -> Result<()> {
    if opts.json {
        println!("{}", serde_json::to_string_pretty(report)?);
        return Ok(());
    }
    println!("analysis: {}", handle);
    print!("{}", render_text(report));
    if opts.details {
        println!();
        print!("{}", render_engine_table(report));
    }
    Ok(())
}

/// CLI entry point for `safe-scan scan url|file`.
pub async fn run_scan(config: &Config, target: ScanTarget, opts: OutputOptions) -> Result<()> {
    let scanner = ScannerClient::from_config(&config.scanner)?;
    let request = match target {
        ScanTarget::Url(url) => AnalysisRequest::url(url),
        ScanTarget::File(path) => file_request(&path).await?,
    };
    eprintln!("Submitting {} for scanning...", request.describe());

    let (handle, report) = scan_and_report(&scanner, request, &config.poll)
        .await
        .map_err(|e| {
            if matches!(e, ScanError::Timeout { .. }) {
                anyhow::anyhow!("{} - please try again!", e)
            } else {
                anyhow::Error::from(e)
            }
        })?;
    print_report(&handle, &report, opts)
}

/// CLI entry point for `safe-scan report <id>`: a single fetch, no polling.
pub async fn run_report(config: &Config, id: &str, opts: OutputOptions) -> Result<()> {
    let scanner = ScannerClient::from_config(&config.scanner)?;
    let handle = AnalysisHandle::new(id)?;
    let report = scanner.fetch_analysis(&handle).await?;

    match report.status {
        AnalysisStatus::Completed => print_report(&handle, &format_report(&report)?, opts),
        AnalysisStatus::Failed => Err(ScanError::AnalysisFailed.into()),
        status => {
            println!("analysis {} is {}", handle, status);
            Ok(())
        }
    }
}
