use std::fmt::Write as _;

use crate::engagement::EngagementBand;
use crate::reconcile::Report;

fn band_label(band: EngagementBand) -> &'static str {
    match band {
        EngagementBand::High => "high",
        EngagementBand::Medium => "medium",
        EngagementBand::Low => "low",
        EngagementBand::Critical => "critical",
    }
}

/// Collapse whitespace so a preview fits on one line.
fn one_line(text: &str) -> String {
    text.split_whitespace().collect::<Vec<_>>().join(" ")
}

/// Plain-text summary of a report for the terminal.
pub fn format_report(report: &Report) -> String {
    let mut out = String::new();
    let _ = writeln!(out, "{}", report.repository);

    if report.rows.is_empty() {
        out.push_str("No review comments.\n");
        return out;
    }

    let counts = &report.counts;
    let _ = writeln!(
        out,
        "{} pending, {} reported positive, {} reported negative",
        counts.pending, counts.reported_positive, counts.reported_negative
    );

    if !report.engagement.is_empty() {
        out.push_str("\nEngagement\n");
        for (handle, view) in &report.engagement {
            let _ = writeln!(
                out,
                "  {handle} {}/{} ({}%) {}",
                view.satisfied,
                view.opportunities,
                view.percentage,
                band_label(view.band)
            );
        }
    }

    if !report.findings.is_empty() {
        out.push_str("\nFindings\n");
        for finding in &report.findings {
            let members: Vec<String> = finding
                .members
                .iter()
                .map(|m| format!("{} ({})", m.suffix_label, m.author))
                .collect();
            let _ = writeln!(out, "  {}: {}", finding.label, members.join(", "));
        }
    }

    let reporting: Vec<_> = report
        .duplicate_assignments
        .iter()
        .filter(|(_, items)| !items.is_empty())
        .collect();
    if !reporting.is_empty() {
        out.push_str("\nDuplicate assignments\n");
        for (handle, items) in reporting {
            let labels: Vec<String> = items
                .iter()
                .map(|d| format!("{} (of {})", d.label, d.original_author))
                .collect();
            let _ = writeln!(out, "  {handle}: {}", labels.join(", "));
        }
    }

    out.push_str("\nComments\n");
    for row in &report.rows {
        let owner = if row.owner.is_empty() { "-" } else { row.owner.as_str() };
        let tracked = if row.tracked { " 🚀" } else { "" };
        let _ = writeln!(
            out,
            "  {} {}{} [{}] {}",
            row.issue_number,
            row.status.glyph(),
            tracked,
            owner,
            one_line(&row.preview)
        );
    }
    out
}
