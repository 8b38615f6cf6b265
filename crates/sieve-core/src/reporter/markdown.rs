//! Markdown rendering for run reports. Formatting only, no state.

use std::fmt::Write;

use super::report::RunReport;
use super::stats::EntitySummary;
use crate::types::EntityType;

pub(crate) fn render(report: &RunReport) -> String {
    let mut out = String::new();

    // Writing into a String cannot fail
    let _ = write_report(&mut out, report);
    out
}

fn write_report(out: &mut String, report: &RunReport) -> std::fmt::Result {
    writeln!(out, "# Screening Run Report: {}", report.label)?;
    writeln!(out)?;
    writeln!(
        out,
        "_Started {} · Finished {}_",
        report.started_at.format("%Y-%m-%d %H:%M:%S UTC"),
        report.finished_at.format("%Y-%m-%d %H:%M:%S UTC"),
    )?;
    writeln!(out)?;

    writeln!(out, "## Summary")?;
    writeln!(out)?;
    writeln!(out, "| Metric | Value |")?;
    writeln!(out, "|--------|-------|")?;
    writeln!(out, "| Entities processed | {} |", report.entities_processed)?;
    writeln!(
        out,
        "| Approved | {} ({}) |",
        report.outcomes.approved,
        percent(report.outcomes.approval_rate)
    )?;
    writeln!(
        out,
        "| Review | {} ({}) |",
        report.outcomes.review,
        percent(report.outcomes.review_rate)
    )?;
    writeln!(out, "| Rejected | {} |", report.outcomes.rejected)?;
    writeln!(
        out,
        "| Average confidence | {} |",
        optional(report.average_confidence, 2)
    )?;
    writeln!(
        out,
        "| Average match score | {} |",
        optional(report.average_match_score, 1)
    )?;
    writeln!(out, "| Errors | {} |", report.errors_total)?;
    writeln!(out)?;

    writeln!(out, "## Firewall")?;
    writeln!(out)?;
    writeln!(out, "- Checks: {}", report.firewall.checks)?;
    writeln!(out, "- Rejected (free): {}", report.firewall.rejected)?;
    writeln!(out, "- Passed (free): {}", report.firewall.passed)?;
    writeln!(out, "- Escalated to model: {}", report.firewall.uncertain)?;
    writeln!(out, "- Efficiency: {}", percent(report.firewall.efficiency))?;
    writeln!(out)?;

    writeln!(out, "## Classification")?;
    writeln!(out)?;
    writeln!(out, "| Entity type | Count |")?;
    writeln!(out, "|-------------|-------|")?;
    for entity_type in EntityType::ALL {
        let count = report
            .classification
            .by_type
            .get(&entity_type)
            .copied()
            .unwrap_or(0);
        writeln!(out, "| {} | {} |", entity_type, count)?;
    }
    writeln!(out)?;
    writeln!(
        out,
        "Sources: {} firewall, {} model, {} error",
        report.classification.firewall_heuristic,
        report.classification.llm_classification,
        report.classification.errors,
    )?;
    writeln!(out)?;

    writeln!(out, "## Cost")?;
    writeln!(out)?;
    writeln!(out, "- Total: ${:.4}", report.cost.total_usd)?;
    match report.cost.per_approved_usd {
        Some(per) => writeln!(out, "- Per approved: ${:.4}", per)?,
        None => writeln!(out, "- Per approved: n/a")?,
    }
    writeln!(out)?;

    write_entity_table(out, "Top Approved", &report.top_approved)?;
    write_entity_table(out, "Review Queue", &report.top_review)?;

    writeln!(out, "## Errors ({} total)", report.errors_total)?;
    writeln!(out)?;
    if report.recent_errors.is_empty() {
        writeln!(out, "_None_")?;
    }
    for entry in &report.recent_errors {
        writeln!(out, "- **{}**: {}", escape(&entry.company), escape(&entry.error))?;
    }

    Ok(())
}

fn write_entity_table(out: &mut String, title: &str, entries: &[EntitySummary]) -> std::fmt::Result {
    writeln!(out, "## {}", title)?;
    writeln!(out)?;

    if entries.is_empty() {
        writeln!(out, "_None_")?;
        writeln!(out)?;
        return Ok(());
    }

    writeln!(out, "| # | Company | Score | Confidence |")?;
    writeln!(out, "|---|---------|-------|------------|")?;
    for (i, entry) in entries.iter().enumerate() {
        let score = entry
            .match_score
            .map(|s| s.to_string())
            .unwrap_or_else(|| "-".to_string());
        writeln!(
            out,
            "| {} | {} | {} | {:.2} |",
            i + 1,
            escape(&entry.company),
            score,
            entry.confidence
        )?;
    }
    writeln!(out)
}

fn percent(rate: f64) -> String {
    format!("{:.1}%", rate * 100.0)
}

fn optional(value: Option<f64>, precision: usize) -> String {
    value
        .map(|v| format!("{:.*}", precision, v))
        .unwrap_or_else(|| "n/a".to_string())
}

/// Keep table cells intact.
fn escape(text: &str) -> String {
    text.replace('|', "\\|").replace('\n', " ")
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_escape_pipes_and_newlines() {
        assert_eq!(escape("A|B\nC"), "A\\|B C");
    }

    #[test]
    fn test_optional_formatting() {
        assert_eq!(optional(None, 2), "n/a");
        assert_eq!(optional(Some(0.756), 2), "0.76");
        assert_eq!(percent(0.5), "50.0%");
    }
}
