//! HTTP client for the external scanning service (VirusTotal v3 API shape).
//!
//! | Operation | Upstream call | Encoding |
//! |-----------|---------------|----------|
//! | Submit URL | `POST {base}/urls` | form-urlencoded `url=...` |
//! | Submit file | `POST {base}/files` | multipart field `file` |
//! | Fetch analysis | `GET {base}/analyses/{id}` | none |
//!
//! Every request carries the API key in the `x-apikey` header and the
//! configured network timeout. Failures are classified into
//! [`ScanError`] variants: network errors become `Transport`, non-2xx
//! responses become `UpstreamError` with the status and body, and
//! responses missing expected fields become `MalformedUpstreamResponse`.

use std::time::Duration;

use anyhow::Context;
use async_trait::async_trait;
use reqwest::multipart::{Form, Part};
use safe_scan_core::report::AnalysisReport;
use safe_scan_core::request::{handle_from_submission, AnalysisHandle, AnalysisRequest};
use safe_scan_core::ScanError;
use tracing::{debug, info, warn};
use url::Url;

use crate::config::ScannerConfig;
use crate::poller::AnalysisSource;

/// Client for submitting scans and reading analyses.
#[derive(Clone)]
pub struct ScannerClient {
    client: reqwest::Client,
    base_url: Url,
    api_key: String,
}

impl ScannerClient {
    /// Build a client, reading the API key from the environment variable
    /// named by `scanner.api_key_env`.
    ///
    /// # Errors
    ///
    /// Returns an error if the variable is unset or empty, or if the base
    /// URL does not parse.
    pub fn from_config(config: &ScannerConfig) -> anyhow::Result<Self> {
        let api_key = std::env::var(&config.api_key_env)
            .ok()
            .filter(|k| !k.trim().is_empty())
            .with_context(|| format!("{} environment variable not set", config.api_key_env))?;
        Self::with_api_key(config, api_key)
    }

    /// Build a client with an explicit API key.
    pub fn with_api_key(config: &ScannerConfig, api_key: impl Into<String>) -> anyhow::Result<Self> {
        let base_url = Url::parse(&config.base_url)
            .with_context(|| format!("Invalid scanner base URL: {}", config.base_url))?;
        if base_url.cannot_be_a_base() {
            anyhow::bail!("Scanner base URL cannot be used as a base: {}", config.base_url);
        }

        let client = reqwest::Client::builder()
            .timeout(Duration::from_secs(config.timeout_secs))
            .build()?;

        Ok(Self {
            client,
            base_url,
            api_key: api_key.into(),
        })
    }

    fn endpoint(&self, segments: &[&str]) -> Url {
        let mut url = self.base_url.clone();
        if let Ok(mut path) = url.path_segments_mut() {
            path.pop_if_empty();
            for segment in segments {
                path.push(segment);
            }
        }
        url
    }

    /// Validate and submit a scan request, returning its analysis handle.
    pub async fn submit(&self, request: AnalysisRequest) -> Result<AnalysisHandle, ScanError> {
        request.validate()?;
        info!(request = %request.describe(), "submitting scan");

        let builder = match request {
            AnalysisRequest::Url { url } => self
                .client
                .post(self.endpoint(&["urls"]))
                .form(&[("url", url.as_str())]),
            AnalysisRequest::File { bytes, filename } => {
                let part = Part::bytes(bytes).file_name(filename);
                self.client
                    .post(self.endpoint(&["files"]))
                    .multipart(Form::new().part("file", part))
            }
        };

        let json = self.send_json(builder).await?;
        let handle = handle_from_submission(&json)?;
        info!(analysis_id = %handle, "scan accepted");
        Ok(handle)
    }

    /// Fetch the raw analysis JSON, exactly as the upstream returned it.
    pub async fn fetch_analysis_raw(
        &self,
        handle: &AnalysisHandle,
    ) -> Result<serde_json::Value, ScanError> {
        debug!(analysis_id = %handle, "fetching analysis");
        let builder = self
            .client
            .get(self.endpoint(&["analyses", handle.as_str()]));
        self.send_json(builder).await
    }

    /// Fetch and parse one analysis snapshot.
    pub async fn fetch_analysis(
        &self,
        handle: &AnalysisHandle,
    ) -> Result<AnalysisReport, ScanError> {
        let json = self.fetch_analysis_raw(handle).await?;
        AnalysisReport::from_envelope(&json)
    }

    async fn send_json(
        &self,
        builder: reqwest::RequestBuilder,
    ) -> Result<serde_json::Value, ScanError> {
        let response = builder
            .header("x-apikey", &self.api_key)
            .header("accept", "application/json")
            .send()
            .await
            .map_err(|e| ScanError::Transport(e.to_string()))?;

        let status = response.status();
        if !status.is_success() {
            let body = response.text().await.unwrap_or_default();
            warn!(status = status.as_u16(), "scanner returned an error");
            return Err(ScanError::UpstreamError {
                status: status.as_u16(),
                body,
            });
        }

        response
            .json::<serde_json::Value>()
            .await
            .map_err(|e| ScanError::MalformedUpstreamResponse(format!("invalid JSON: {}", e)))
    }
}

#[async_trait]
impl AnalysisSource for ScannerClient {
    async fn fetch(&self, handle: &AnalysisHandle) -> Result<AnalysisReport, ScanError> {
        self.fetch_analysis(handle).await
    }
}
