//! Normalized findings produced by the output parsers

use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};

use crate::statistics::Statistics;

/// Agent id recorded when the job did not name one
pub const UNKNOWN_AGENT: &str = "unknown";

/// Severity level for findings
#[derive(Debug, Clone, Copy, PartialEq, Eq, PartialOrd, Ord, Hash, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum Severity {
    Critical,
    High,
    Medium,
    Low,
    Info,
}

impl Severity {
    /// All severities, most severe first
    pub const ALL: [Severity; 5] = [
        Severity::Critical,
        Severity::High,
        Severity::Medium,
        Severity::Low,
        Severity::Info,
    ];

    /// Lenient conversion used for untrusted labels; anything unrecognised is `Info`
    pub fn from_label(label: &str) -> Self {
        label.parse().unwrap_or(Severity::Info)
    }
}

impl std::fmt::Display for Severity {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        match self {
            Severity::Critical => write!(f, "critical"),
            Severity::High => write!(f, "high"),
            Severity::Medium => write!(f, "medium"),
            Severity::Low => write!(f, "low"),
            Severity::Info => write!(f, "info"),
        }
    }
}

impl std::str::FromStr for Severity {
    type Err = String;

    fn from_str(s: &str) -> std::result::Result<Self, Self::Err> {
        match s.to_lowercase().as_str() {
            "critical" => Ok(Severity::Critical),
            "high" => Ok(Severity::High),
            "medium" => Ok(Severity::Medium),
            "low" => Ok(Severity::Low),
            "info" => Ok(Severity::Info),
            _ => Err(format!("Unknown severity: {}", s)),
        }
    }
}

/// One normalized observation extracted from raw tool output
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct Finding {
    pub id: String,
    pub title: String,
    pub description: String,
    /// host:port, URL or flow description
    pub target: String,
    pub severity: Severity,
    pub agent_id: String,
    pub timestamp: DateTime<Utc>,
}

impl Finding {
    /// Create a new finding observed at `timestamp`
    pub fn new(
        id: impl Into<String>,
        title: impl Into<String>,
        severity: Severity,
        timestamp: DateTime<Utc>,
    ) -> Self {
        Self {
            id: id.into(),
            title: title.into(),
            description: String::new(),
            target: String::new(),
            severity,
            agent_id: UNKNOWN_AGENT.to_string(),
            timestamp,
        }
    }

    pub fn with_description(mut self, description: impl Into<String>) -> Self {
        self.description = description.into();
        self
    }

    pub fn with_target(mut self, target: impl Into<String>) -> Self {
        self.target = target.into();
        self
    }

    pub fn with_agent(mut self, agent_id: impl Into<String>) -> Self {
        self.agent_id = agent_id.into();
        self
    }
}

/// Findings plus aggregate statistics for one tool run
#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
pub struct ParseResult {
    pub findings: Vec<Finding>,
    pub statistics: Statistics,
}

impl ParseResult {
    pub fn new(findings: Vec<Finding>, statistics: Statistics) -> Self {
        Self {
            findings,
            statistics,
        }
    }

    /// Result carrying no findings and an `error` statistic
    pub fn empty_with_error(message: impl Into<String>) -> Self {
        let mut statistics = Statistics::new();
        statistics.insert("error", message.into());
        Self {
            findings: Vec::new(),
            statistics,
        }
    }
}
