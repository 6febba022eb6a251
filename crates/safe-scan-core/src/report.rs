//! Analysis payloads and the report formatter.
//!
//! [`AnalysisReport`] is parsed from the scanning service's
//! `{data: {attributes: {status, stats, results}}}` envelope.
//! [`format_report`] turns a completed analysis into a [`FormattedReport`]:
//! pure data with a verdict, per-category counts and percentages, and the
//! per-engine results. Presentation is left to the caller.

use std::collections::BTreeMap;
use std::fmt;

use serde::{Deserialize, Serialize};

use crate::error::{Result, ScanError};

/// Upstream analysis status.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "kebab-case")]
pub enum AnalysisStatus {
    Queued,
    InProgress,
    Completed,
    Failed,
}

impl AnalysisStatus {
    pub fn is_terminal(self) -> bool {
        matches!(self, AnalysisStatus::Completed | AnalysisStatus::Failed)
    }

    pub fn as_str(self) -> &'static str {
        match self {
            AnalysisStatus::Queued => "queued",
            AnalysisStatus::InProgress => "in-progress",
            AnalysisStatus::Completed => "completed",
            AnalysisStatus::Failed => "failed",
        }
    }
}

impl fmt::Display for AnalysisStatus {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.as_str())
    }
}

/// One engine's verdict inside an analysis.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct EngineResult {
    pub category: String,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub engine_name: Option<String>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub result: Option<String>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub method: Option<String>,
}

/// A snapshot of an analysis as reported by the scanning service.
///
/// Read-only from this crate's point of view.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct AnalysisReport {
    pub status: AnalysisStatus,
    #[serde(default)]
    pub stats: Option<BTreeMap<String, u64>>,
    #[serde(default)]
    pub results: Option<BTreeMap<String, EngineResult>>,
}

#[derive(Deserialize)]
struct Envelope {
    data: EnvelopeData,
}

#[derive(Deserialize)]
struct EnvelopeData {
    attributes: AnalysisReport,
}

impl AnalysisReport {
    /// Parse the `{data: {attributes: ...}}` envelope returned by
    /// `GET /analyses/{id}`.
    pub fn from_envelope(json: &serde_json::Value) -> Result<Self> {
        let envelope: Envelope = serde_json::from_value(json.clone())
            .map_err(|e| ScanError::MalformedUpstreamResponse(format!("analysis payload: {}", e)))?;
        Ok(envelope.data.attributes)
    }
}

/// The four categories shown in a report, in display order.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum Category {
    Malicious,
    Suspicious,
    Harmless,
    Undetected,
}

impl Category {
    pub const ALL: [Category; 4] = [
        Category::Malicious,
        Category::Suspicious,
        Category::Harmless,
        Category::Undetected,
    ];

    /// Key used in the upstream `stats` map.
    pub fn key(self) -> &'static str {
        match self {
            Category::Malicious => "malicious",
            Category::Suspicious => "suspicious",
            Category::Harmless => "harmless",
            Category::Undetected => "undetected",
        }
    }

    pub fn label(self) -> &'static str {
        match self {
            Category::Malicious => "Malicious",
            Category::Suspicious => "Suspicious",
            Category::Harmless => "Clean",
            Category::Undetected => "Undetected",
        }
    }
}

/// Overall classification derived from the stats.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
pub enum Verdict {
    Malicious,
    Suspicious,
    Safe,
}

impl fmt::Display for Verdict {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        let s = match self {
            Verdict::Malicious => "Malicious",
            Verdict::Suspicious => "Suspicious",
            Verdict::Safe => "Safe",
        };
        f.write_str(s)
    }
}

#[derive(Debug, Clone, PartialEq, Serialize)]
pub struct CategorySummary {
    pub category: Category,
    pub label: &'static str,
    pub count: u64,
    pub percent: f64,
}

/// Display-ready report for a completed analysis.
#[derive(Debug, Clone, PartialEq, Serialize)]
pub struct FormattedReport {
    pub verdict: Verdict,
    /// Percentage of engines that flagged the target as malicious.
    pub detection_rate: f64,
    /// Sum of every stats entry, including ones not shown as categories.
    pub total: u64,
    pub categories: Vec<CategorySummary>,
    /// Engine name → category, sorted by engine name.
    pub engines: BTreeMap<String, String>,
}

impl FormattedReport {
    pub fn category(&self, category: Category) -> Option<&CategorySummary> {
        self.categories.iter().find(|c| c.category == category)
    }
}

/// Round to one decimal place.
fn round1(value: f64) -> f64 {
    (value * 10.0).round() / 10.0
}

pub fn verdict_for(stats: &BTreeMap<String, u64>) -> Verdict {
    let count = |c: Category| stats.get(c.key()).copied().unwrap_or(0);
    if count(Category::Malicious) > 0 {
        Verdict::Malicious
    } else if count(Category::Suspicious) > 0 {
        Verdict::Suspicious
    } else {
        Verdict::Safe
    }
}

/// Build a [`FormattedReport`] from an analysis.
///
/// Fails with [`ScanError::InvalidReport`] when the analysis carries no
/// stats or every count is zero.
pub fn format_report(report: &AnalysisReport) -> Result<FormattedReport> {
    let stats = report
        .stats
        .as_ref()
        .ok_or_else(|| ScanError::InvalidReport("analysis has no stats".to_string()))?;

    let total = stats
        .values()
        .try_fold(0u64, |acc, &n| acc.checked_add(n))
        .ok_or_else(|| ScanError::InvalidReport("stats total overflows".to_string()))?;
    if total == 0 {
        return Err(ScanError::InvalidReport(
            "no analysis results available".to_string(),
        ));
    }

    let categories: Vec<CategorySummary> = Category::ALL
        .iter()
        .map(|&category| {
            let count = stats.get(category.key()).copied().unwrap_or(0);
            CategorySummary {
                category,
                label: category.label(),
                count,
                percent: round1(100.0 * count as f64 / total as f64),
            }
        })
        .collect();

    let detection_rate = categories
        .iter()
        .find(|c| c.category == Category::Malicious)
        .map(|c| c.percent)
        .unwrap_or(0.0);

    let engines = report
        .results
        .as_ref()
        .map(|results| {
            results
                .iter()
                .map(|(engine, r)| (engine.clone(), r.category.clone()))
                .collect()
        })
        .unwrap_or_default();

    Ok(FormattedReport {
        verdict: verdict_for(stats),
        detection_rate,
        total,
        categories,
        engines,
    })
}
