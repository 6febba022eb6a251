//! Plain-text rendering of formatted reports for the terminal.
//!
//! The HTTP API serializes [`FormattedReport`] as JSON instead; both are
//! presentations of the same data.

use std::fmt::Write;

use safe_scan_core::report::FormattedReport;

const BAR_WIDTH: usize = 40;

/// Render the summary: verdict, detection rate, stacked bar, and per-category
/// counts.
pub fn render_text(report: &FormattedReport) -> String {
    let mut out = String::new();
    let _ = writeln!(out, "Scan Report");
    let _ = writeln!(out, "Verdict: {}", report.verdict);
    let _ = writeln!(
        out,
        "Detection rate: {:.1}% ({} engines)",
        report.detection_rate, report.total
    );
    let _ = writeln!(out, "[{}]", stacked_bar(report));
    for c in &report.categories {
        let _ = writeln!(out, "  {:<11} {:>4}  {:>5.1}%", c.label, c.count, c.percent);
    }
    out
}

/// Render the per-engine table shown by "View Full Report".
pub fn render_engine_table(report: &FormattedReport) -> String {
    if report.engines.is_empty() {
        return "No detailed results available!\n".to_string();
    }
    let width = report
        .engines
        .keys()
        .map(|name| name.len())
        .max()
        .unwrap_or(6)
        .max("Engine".len());

    let mut out = String::new();
    let _ = writeln!(out, "{:<width$}  Result", "Engine", width = width);
    for (engine, category) in &report.engines {
        let _ = writeln!(out, "{:<width$}  {}", engine, category, width = width);
    }
    out
}

fn stacked_bar(report: &FormattedReport) -> String {
    let marks = ['M', 'S', '=', '.'];
    let mut bar = String::with_capacity(BAR_WIDTH);
    for (c, mark) in report.categories.iter().zip(marks) {
        let cells = (c.percent / 100.0 * BAR_WIDTH as f64).round() as usize;
        for _ in 0..cells {
            if bar.len() < BAR_WIDTH {
                bar.push(mark);
            }
        }
    }
    while bar.len() < BAR_WIDTH {
        bar.push(' ');
    }
    bar
}

#[cfg(test)]
mod tests {
    use super::*;
    use safe_scan_core::report::{format_report, AnalysisReport, AnalysisStatus, EngineResult};
    use std::collections::BTreeMap;

    fn sample() -> FormattedReport {
        let stats = BTreeMap::from([
            ("malicious".to_string(), 2),
            ("suspicious".to_string(), 1),
            ("harmless".to_string(), 57),
            ("undetected".to_string(), 10),
        ]);
        let results = BTreeMap::from([(
            "EngineA".to_string(),
            EngineResult {
                category: "malicious".to_string(),
                engine_name: None,
                result: Some("phishing".to_string()),
                method: None,
            },
        )]);
        format_report(&AnalysisReport {
            status: AnalysisStatus::Completed,
            stats: Some(stats),
            results: Some(results),
        })
        .unwrap()
    }

    #[test]
    fn test_render_text_summary() {
        let text = render_text(&sample());
        assert!(text.contains("Verdict: Malicious"));
        assert!(text.contains("Detection rate: 2.9% (70 engines)"));
        assert!(text.contains("Clean"));
        assert!(text.contains("81.4%"));
    }

    #[test]
    fn test_stacked_bar_width() {
        let bar = stacked_bar(&sample());
        assert_eq!(bar.len(), BAR_WIDTH);
        assert!(bar.starts_with('M'));
    }

    #[test]
    fn test_engine_table() {
        let table = render_engine_table(&sample());
        assert!(table.starts_with("Engine"));
        assert!(table.contains("EngineA  malicious"));
    }
}
