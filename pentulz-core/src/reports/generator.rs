//! Report export

use std::path::Path;

use serde_json::Value;

use crate::Result;
use crate::findings::Severity;
use crate::statistics::Statistics;

use super::models::Report;

/// Serialize a report as pretty-printed JSON
pub fn to_json(report: &Report) -> Result<String> {
    Ok(serde_json::to_string_pretty(report)?)
}

/// Export report to JSON file
pub fn export_json(report: &Report, path: impl AsRef<Path>) -> Result<()> {
    std::fs::write(path, to_json(report)?)?;
    Ok(())
}

/// Export report to Markdown file
pub fn export_markdown(report: &Report, path: impl AsRef<Path>) -> Result<()> {
    let markdown = generate_markdown(report);
    std::fs::write(path, markdown)?;
    Ok(())
}

fn severity_label(severity: Severity) -> &'static str {
    match severity {
        Severity::Critical => "Critical",
        Severity::High => "High",
        Severity::Medium => "Medium",
        Severity::Low => "Low",
        Severity::Info => "Info",
    }
}

fn statistic_value(value: &Value) -> String {
    match value {
        Value::String(s) => s.clone(),
        Value::Object(map) => map
            .iter()
            .map(|(k, v)| format!("{}={}", k, statistic_value(v)))
            .collect::<Vec<_>>()
            .join(", "),
        other => other.to_string(),
    }
}

fn push_statistics(md: &mut String, statistics: &Statistics) {
    if statistics.is_empty() {
        return;
    }
    md.push_str("**Statistics:**\n\n");
    for (key, value) in statistics.iter() {
        md.push_str(&format!("- {}: {}\n", key, statistic_value(value)));
    }
    md.push('\n');
}

/// Generate markdown report content
pub fn generate_markdown(report: &Report) -> String {
    let mut md = String::new();

    // Title
    md.push_str(&format!("# {}\n\n", report.metadata.name));

    // Metadata
    md.push_str("## Report Information\n\n");
    md.push_str(&format!("- **Report ID:** {}\n", report.metadata.report_id));
    md.push_str(&format!(
        "- **Report Generated:** {}\n",
        report.metadata.created_at.format("%Y-%m-%d %H:%M UTC")
    ));
    md.push_str(&format!(
        "- **Jobs Parsed:** {} of {} requested\n",
        report.metadata.total_jobs,
        report.metadata.job_ids.len()
    ));
    let tools: Vec<&str> = report.summary.tools_used.iter().map(String::as_str).collect();
    md.push_str(&format!(
        "- **Tools Used:** {}\n\n",
        if tools.is_empty() {
            "none".to_string()
        } else {
            tools.join(", ")
        }
    ));

    // Summary
    md.push_str("## Executive Summary\n\n");
    md.push_str(&format!(
        "Overall Risk Rating: **{}**\n\n",
        report.summary.risk_rating
    ));

    md.push_str("### Severity Distribution\n\n");
    md.push_str("| Severity | Count |\n|----------|-------|\n");
    for severity in Severity::ALL {
        md.push_str(&format!(
            "| {} | {} |\n",
            severity_label(severity),
            report.summary.severity_distribution.get(severity)
        ));
    }
    md.push_str(&format!(
        "| **Total** | **{}** |\n\n",
        report.metadata.total_findings
    ));

    // Per tool
    md.push_str("## Findings by Tool\n\n");

    if report.all_findings.is_empty() {
        md.push_str("No findings were recorded for the selected jobs.\n\n");
    }

    for (tool, group) in &report.findings_by_tool {
        md.push_str(&format!(
            "### {} ({} jobs, {} findings)\n\n",
            tool,
            group.jobs_count,
            group.findings.len()
        ));
        push_statistics(&mut md, &group.statistics);

        for (i, finding) in group.findings.iter().enumerate() {
            md.push_str(&format!(
                "#### {}. {} [{}]\n\n",
                i + 1,
                finding.title,
                severity_label(finding.severity)
            ));
            if !finding.target.is_empty() {
                md.push_str(&format!("**Target:** {}\n\n", finding.target));
            }
            if !finding.description.is_empty() {
                md.push_str(&format!("{}\n\n", finding.description));
            }
            md.push_str(&format!(
                "*Agent {} at {}*\n\n",
                finding.agent_id,
                finding.timestamp.format("%Y-%m-%d %H:%M:%S UTC")
            ));
        }

        md.push_str("---\n\n");
    }

    // Footer
    md.push_str("## Disclaimer\n\n");
    md.push_str("This report was generated by pentulz from raw tool output. ");
    md.push_str(
        "Findings should be validated by qualified security professionals before taking action.\n",
    );

    md
}

#[cfg(test)]
#[allow(clippy::unwrap_used, clippy::expect_used, clippy::indexing_slicing)]
mod tests {
    use super::*;
    use crate::findings::Finding;
    use chrono::Utc;

    fn sample() -> Report {
        let mut report = Report::new("Quarterly Scan", vec!["1".into()], Utc::now());
        let mut stats = Statistics::new();
        stats.insert("open_ports", 1u64);
        stats.increment("status_codes", "200");
        report.add_job(
            "nmap",
            vec![
                Finding::new("port_10.0.0.1_22_tcp", "Open Port 22/tcp", Severity::High, Utc::now())
                    .with_target("10.0.0.1:22")
                    .with_description("Open tcp port 22 - Service: ssh"),
            ],
            &stats,
        );
        report
    }

    #[test]
    fn test_generate_markdown_empty_report() {
        let report = Report::new("Security Assessment Report", Vec::new(), Utc::now());
        let markdown = generate_markdown(&report);

        assert!(markdown.contains("# Security Assessment Report"));
        assert!(markdown.contains("Overall Risk Rating: **Minimal**"));
        assert!(markdown.contains("No findings were recorded"));
    }

    #[test]
    fn test_generate_markdown_with_findings() {
        let markdown = generate_markdown(&sample());

        assert!(markdown.contains("# Quarterly Scan"));
        assert!(markdown.contains("### nmap (1 jobs, 1 findings)"));
        assert!(markdown.contains("Open Port 22/tcp [High]"));
        assert!(markdown.contains("**Target:** 10.0.0.1:22"));
        assert!(markdown.contains("- open_ports: 1"));
        assert!(markdown.contains("- status_codes: 200=1"));
        assert!(markdown.contains("| High | 1 |"));
    }

    #[test]
    fn test_export_files() {
        let dir = tempfile::tempdir().unwrap();
        let report = sample();

        let json_path = dir.path().join("report.json");
        export_json(&report, &json_path).unwrap();
        let back: Report =
            serde_json::from_str(&std::fs::read_to_string(&json_path).unwrap()).unwrap();
        assert_eq!(back.metadata.report_id, report.metadata.report_id);
        assert_eq!(back.all_findings.len(), 1);

        let md_path = dir.path().join("report.md");
        export_markdown(&report, &md_path).unwrap();
        assert!(std::fs::read_to_string(&md_path).unwrap().starts_with("# Quarterly Scan"));
    }
}
