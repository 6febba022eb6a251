//! Scan requests and the handles returned for them.

use std::fmt;

use serde::{Deserialize, Serialize};

use crate::error::{Result, ScanError};

/// Largest file the scanning service accepts for direct upload (32 MiB).
pub const MAX_FILE_SIZE: usize = 32 * 1024 * 1024;

/// Something to scan: either a URL or an uploaded file.
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum AnalysisRequest {
    Url { url: String },
    File { bytes: Vec<u8>, filename: String },
}

impl AnalysisRequest {
    /// Build a URL request, trimming surrounding whitespace.
    pub fn url(url: impl AsRef<str>) -> Self {
        AnalysisRequest::Url {
            url: url.as_ref().trim().to_string(),
        }
    }

    pub fn file(bytes: Vec<u8>, filename: impl Into<String>) -> Self {
        AnalysisRequest::File {
            bytes,
            filename: filename.into(),
        }
    }

    /// Check the request against local limits before anything is sent
    /// upstream.
    ///
    /// URLs must parse as absolute URLs with a host. Files must be non-empty
    /// and at most [`MAX_FILE_SIZE`] bytes.
    pub fn validate(&self) -> Result<()> {
        match self {
            AnalysisRequest::Url { url } => validate_url(url),
            AnalysisRequest::File { bytes, .. } => validate_file_size(bytes.len()),
        }
    }

    /// Short human description for logs and progress output.
    pub fn describe(&self) -> String {
        match self {
            AnalysisRequest::Url { url } => url.clone(),
            AnalysisRequest::File { bytes, filename } => {
                format!("{} ({} bytes)", filename, bytes.len())
            }
        }
    }
}

pub fn validate_url(url: &str) -> Result<()> {
    if url.trim().is_empty() {
        return Err(ScanError::InvalidInput("URL is required".to_string()));
    }
    let parsed = url::Url::parse(url.trim())
        .map_err(|e| ScanError::InvalidInput(format!("not a valid URL ({}): {}", e, url)))?;
    if !parsed.has_host() {
        return Err(ScanError::InvalidInput(format!(
            "URL must include a host, e.g. https://example.com: {}",
            url
        )));
    }
    Ok(())
}

pub fn validate_file_size(size: usize) -> Result<()> {
    if size == 0 {
        return Err(ScanError::InvalidInput("file is empty".to_string()));
    }
    if size > MAX_FILE_SIZE {
        return Err(ScanError::PayloadTooLarge {
            size,
            limit: MAX_FILE_SIZE,
        });
    }
    Ok(())
}

/// Size check for a length reported by the filesystem, before the file is
/// read into memory. Lengths beyond `usize` saturate.
pub fn validate_file_len(len: u64) -> Result<()> {
    validate_file_size(usize::try_from(len).unwrap_or(usize::MAX))
}

/// Opaque analysis identifier issued by the scanning service.
#[derive(Debug, Clone, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(transparent)]
pub struct AnalysisHandle(String);

impl AnalysisHandle {
    /// Wrap an identifier, rejecting blank ones.
    pub fn new(id: impl Into<String>) -> Result<Self> {
        let id = id.into();
        if id.trim().is_empty() {
            return Err(ScanError::MalformedUpstreamResponse(
                "empty analysis id".to_string(),
            ));
        }
        Ok(Self(id))
    }

    pub fn as_str(&self) -> &str {
        &self.0
    }
}

impl fmt::Display for AnalysisHandle {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(&self.0)
    }
}

/// Pull the analysis handle out of a submission response (`data.id`).
pub fn handle_from_submission(json: &serde_json::Value) -> Result<AnalysisHandle> {
    let id = json
        .get("data")
        .and_then(|d| d.get("id"))
        .and_then(|id| id.as_str())
        .ok_or_else(|| {
            ScanError::MalformedUpstreamResponse("missing data.id in submission response".into())
        })?;
    AnalysisHandle::new(id)
}
