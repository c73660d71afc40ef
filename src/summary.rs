//! Plain-text rendering of audit results.
//!
//! Used for headless text output and for the share payload.

use crate::feedback::SharePayload;
use crate::model::{AuditReport, OptimizationResult, ReportStatus};

/// Pre-formatted lines for text output.
pub(crate) struct TextSummary {
    pub lines: Vec<String>,
}

pub(crate) fn status_label(report: &AuditReport) -> &'static str {
    match (report.status(), report.is_synthetic()) {
        (ReportStatus::Clean, _) => "Code Clean",
        (ReportStatus::Flagged, true) => "Quota Reached",
        (ReportStatus::Flagged, false) => "Bugs Found",
    }
}

pub(crate) fn build_text_summary(
    report: &AuditReport,
    optimization: Option<&OptimizationResult>,
) -> TextSummary {
    let mut lines = vec![format!("Status: {}", status_label(report))];
    if let Some(c) = report.complexity_estimate() {
        lines.push(format!("Complexity: {c}"));
    }
    if let Some(h) = report.hint() {
        if !h.trim().is_empty() {
            lines.push(format!("Hint: {h}"));
        }
    }
    if !report.issues().is_empty() {
        lines.push("Issues:".to_string());
        for (i, issue) in report.issues().iter().enumerate() {
            lines.push(format!("  {}. {issue}", i + 1));
        }
    }
    if let Some(opt) = optimization {
        lines.push(String::new());
        lines.push("Optimized code:".to_string());
        lines.extend(opt.rewritten_code.lines().map(str::to_string));
    }
    TextSummary { lines }
}

/// Share payload: status, complexity estimate and hint, plus where the
/// report came from.
pub(crate) fn share_payload(report: &AuditReport, page_ref: &str) -> SharePayload {
    let text = format!(
        "Review-Bot audit\nStatus: {}\nComplexity: {}\nHint: {}",
        status_label(report),
        report.complexity_estimate().unwrap_or("-"),
        report.hint().unwrap_or("-"),
    );
    SharePayload {
        title: "Review-Bot audit report".to_string(),
        text,
        url: page_ref.to_string(),
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn share_text_carries_status_complexity_hint_and_reference() {
        let p = share_payload(&AuditReport::clean("O(n log n)", "use a heap"), "http://svc");
        assert_eq!(
            p.clipboard_text(),
            "Review-Bot audit\nStatus: Code Clean\nComplexity: O(n log n)\nHint: use a heap\nhttp://svc"
        );
    }

    #[test]
    fn flagged_summary_lists_issues_in_order() {
        let report =
            AuditReport::flagged(vec!["leak".into(), "overflow".into()], None, None).unwrap();
        let s = build_text_summary(&report, None);
        assert_eq!(
            s.lines,
            vec!["Status: Bugs Found", "Issues:", "  1. leak", "  2. overflow"]
        );
    }

    #[test]
    fn quota_report_is_labelled_as_such() {
        let s = build_text_summary(&AuditReport::quota_reached(60), None);
        assert_eq!(s.lines[0], "Status: Quota Reached");
        assert!(s.lines.contains(&"Hint: Wait 60s".to_string()));
    }
}
