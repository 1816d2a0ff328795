//! Report data models

use std::collections::{BTreeMap, BTreeSet};

use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};
use uuid::Uuid;

use crate::findings::{Finding, Severity};
use crate::statistics::Statistics;

/// Overall risk rating for the report
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum RiskRating {
    Critical,
    High,
    Medium,
    Low,
    Minimal,
}

impl RiskRating {
    /// Rating of the most severe non-informational bucket with any findings
    pub fn from_counts(counts: &SeverityCounts) -> Self {
        if counts.critical > 0 {
            Self::Critical
        } else if counts.high > 0 {
            Self::High
        } else if counts.medium > 0 {
            Self::Medium
        } else if counts.low > 0 {
            Self::Low
        } else {
            Self::Minimal
        }
    }
}

impl std::fmt::Display for RiskRating {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        match self {
            Self::Critical => write!(f, "Critical"),
            Self::High => write!(f, "High"),
            Self::Medium => write!(f, "Medium"),
            Self::Low => write!(f, "Low"),
            Self::Minimal => write!(f, "Minimal"),
        }
    }
}

/// Finding counts by severity
#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize, Deserialize)]
pub struct SeverityCounts {
    pub critical: u64,
    pub high: u64,
    pub medium: u64,
    pub low: u64,
    pub info: u64,
}

impl SeverityCounts {
    pub fn from_findings<'a>(findings: impl IntoIterator<Item = &'a Finding>) -> Self {
        let mut counts = Self::default();
        for finding in findings {
            counts.record(finding.severity);
        }
        counts
    }

    pub fn record(&mut self, severity: Severity) {
        match severity {
            Severity::Critical => self.critical += 1,
            Severity::High => self.high += 1,
            Severity::Medium => self.medium += 1,
            Severity::Low => self.low += 1,
            Severity::Info => self.info += 1,
        }
    }

    pub fn get(&self, severity: Severity) -> u64 {
        match severity {
            Severity::Critical => self.critical,
            Severity::High => self.high,
            Severity::Medium => self.medium,
            Severity::Low => self.low,
            Severity::Info => self.info,
        }
    }

    pub fn total(&self) -> u64 {
        self.critical + self.high + self.medium + self.low + self.info
    }
}

/// Report metadata
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct ReportMetadata {
    /// Derived from the report name and requested job ids
    pub report_id: Uuid,
    pub name: String,
    pub created_at: DateTime<Utc>,
    /// Job ids as requested, including any the job source did not return
    pub job_ids: Vec<String>,
    /// Jobs actually parsed
    pub total_jobs: usize,
    pub total_findings: usize,
}

/// Report summary section
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct ReportSummary {
    pub severity_distribution: SeverityCounts,
    pub tools_used: BTreeSet<String>,
    pub risk_rating: RiskRating,
}

impl Default for ReportSummary {
    fn default() -> Self {
        Self {
            severity_distribution: SeverityCounts::default(),
            tools_used: BTreeSet::new(),
            risk_rating: RiskRating::Minimal,
        }
    }
}

/// Everything one tool contributed to a report
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct ToolFindings {
    pub tool_name: String,
    pub jobs_count: usize,
    pub findings: Vec<Finding>,
    /// Statistics of every job for this tool, merged
    pub statistics: Statistics,
}

impl ToolFindings {
    pub fn new(tool_name: impl Into<String>) -> Self {
        Self {
            tool_name: tool_name.into(),
            jobs_count: 0,
            findings: Vec::new(),
            statistics: Statistics::new(),
        }
    }
}

/// Findings aggregated across jobs, grouped by tool
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct Report {
    pub metadata: ReportMetadata,
    pub summary: ReportSummary,
    pub findings_by_tool: BTreeMap<String, ToolFindings>,
    /// Every finding, in job order then parser order
    pub all_findings: Vec<Finding>,
}

impl Report {
    /// Create an empty report
    pub fn new(name: impl Into<String>, job_ids: Vec<String>, created_at: DateTime<Utc>) -> Self {
        let name = name.into();
        Self {
            metadata: ReportMetadata {
                report_id: report_id(&name, &job_ids),
                name,
                created_at,
                job_ids,
                total_jobs: 0,
                total_findings: 0,
            },
            summary: ReportSummary::default(),
            findings_by_tool: BTreeMap::new(),
            all_findings: Vec::new(),
        }
    }

    /// Fold one parsed job into the report
    pub fn add_job(&mut self, tool_name: &str, findings: Vec<Finding>, statistics: &Statistics) {
        let entry = self
            .findings_by_tool
            .entry(tool_name.to_string())
            .or_insert_with(|| ToolFindings::new(tool_name));
        entry.jobs_count += 1;
        entry.statistics.merge(statistics);
        entry.findings.extend(findings.iter().cloned());

        self.all_findings.extend(findings);
        self.metadata.total_jobs += 1;
        self.update_summary();
    }

    /// Update summary based on findings
    fn update_summary(&mut self) {
        self.metadata.total_findings = self.all_findings.len();
        self.summary.severity_distribution = SeverityCounts::from_findings(&self.all_findings);
        self.summary.tools_used = self.findings_by_tool.keys().cloned().collect();
        self.summary.risk_rating = RiskRating::from_counts(&self.summary.severity_distribution);
    }
}

/// Stable id for a report over the same name and jobs
pub fn report_id(name: &str, job_ids: &[String]) -> Uuid {
    let mut key = name.to_string();
    for id in job_ids {
        key.push('\n');
        key.push_str(id);
    }
    Uuid::new_v5(&Uuid::NAMESPACE_OID, key.as_bytes())
}
