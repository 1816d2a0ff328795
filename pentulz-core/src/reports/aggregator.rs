//! Cross-job report aggregation

use std::collections::{HashMap, HashSet};
use std::path::Path;

use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};

use super::models::Report;
use crate::config::ReportConfig;
use crate::parsers::ParseContext;
use crate::tools::ToolRegistry;
use crate::{Error, Result};

/// What was asked of the agent for a job
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct JobAction {
    pub cmd: String,
    /// Template the command was built from
    #[serde(default)]
    pub variant: Option<String>,
    #[serde(default)]
    pub args: Vec<String>,
}

impl JobAction {
    /// Command line as it was run
    pub fn command_line(&self) -> String {
        let args = match self.args.split_first() {
            Some((first, rest)) if *first == self.cmd => rest,
            _ => self.args.as_slice(),
        };
        std::iter::once(self.cmd.as_str())
            .chain(args.iter().map(String::as_str))
            .filter(|part| !part.is_empty())
            .collect::<Vec<_>>()
            .join(" ")
    }
}

/// A finished job with its raw output
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct JobRecord {
    pub id: String,
    pub tool_name: String,
    #[serde(default)]
    pub raw_output: String,
    pub action: JobAction,
    #[serde(default)]
    pub agent_id: Option<String>,
}

/// Where finished jobs are read from
pub trait JobSource {
    /// Jobs with the given ids, in any order; unknown ids are left out
    fn fetch_jobs(&self, ids: &[String]) -> Result<Vec<JobRecord>>;
}

/// Job source over records held in memory
#[derive(Debug, Clone, Default)]
pub struct InMemoryJobSource {
    jobs: Vec<JobRecord>,
}

impl InMemoryJobSource {
    pub fn new(jobs: Vec<JobRecord>) -> Self {
        Self { jobs }
    }

    /// Parse a JSON array of job records
    pub fn from_json(content: &str) -> Result<Self> {
        let jobs: Vec<JobRecord> = serde_json::from_str(content)
            .map_err(|e| Error::JobSource(format!("invalid job records: {}", e)))?;
        Ok(Self::new(jobs))
    }

    pub fn from_file(path: impl AsRef<Path>) -> Result<Self> {
        let content = std::fs::read_to_string(path)?;
        Self::from_json(&content)
    }

    pub fn push(&mut self, job: JobRecord) {
        self.jobs.push(job);
    }

    pub fn ids(&self) -> Vec<String> {
        self.jobs.iter().map(|j| j.id.clone()).collect()
    }

    pub fn len(&self) -> usize {
        self.jobs.len()
    }

    pub fn is_empty(&self) -> bool {
        self.jobs.is_empty()
    }
}

impl JobSource for InMemoryJobSource {
    fn fetch_jobs(&self, ids: &[String]) -> Result<Vec<JobRecord>> {
        let wanted: HashSet<&str> = ids.iter().map(String::as_str).collect();
        Ok(self
            .jobs
            .iter()
            .filter(|job| wanted.contains(job.id.as_str()))
            .cloned()
            .collect())
    }
}

/// Combines the parsed output of many jobs into one report
pub struct ReportAggregator<'a> {
    registry: &'a ToolRegistry,
    source: &'a dyn JobSource,
    default_name: String,
}

impl<'a> ReportAggregator<'a> {
    pub fn new(registry: &'a ToolRegistry, source: &'a dyn JobSource) -> Self {
        Self {
            registry,
            source,
            default_name: ReportConfig::default().default_name,
        }
    }

    pub fn with_config(mut self, config: &ReportConfig) -> Self {
        self.default_name = config.default_name.clone();
        self
    }

    /// Generate a report stamped with the current time
    pub fn generate(&self, job_ids: &[String], name: Option<&str>) -> Result<Report> {
        self.generate_at(job_ids, name, Utc::now())
    }

    /// Generate a report as of `now`.
    ///
    /// Jobs are parsed in the order of `job_ids`; ids the source does not
    /// return, and repeats of an id already parsed, are skipped.
    pub fn generate_at(
        &self,
        job_ids: &[String],
        name: Option<&str>,
        now: DateTime<Utc>,
    ) -> Result<Report> {
        let name = name
            .filter(|n| !n.trim().is_empty())
            .unwrap_or(self.default_name.as_str());
        let mut report = Report::new(name, job_ids.to_vec(), now);

        let jobs = self.source.fetch_jobs(job_ids)?;
        let by_id: HashMap<&str, &JobRecord> = jobs.iter().map(|j| (j.id.as_str(), j)).collect();
        let mut processed = HashSet::new();

        for id in job_ids {
            let Some(job) = by_id.get(id.as_str()) else {
                tracing::warn!("Job {} not found, skipping", id);
                continue;
            };
            if !processed.insert(id.as_str()) {
                tracing::debug!("Job {} requested more than once, skipping repeat", id);
                continue;
            }

            let ctx = ParseContext::new(job.action.command_line(), job.agent_id.as_deref())
                .observed_at(now);
            let result = self.registry.parse_with(&job.tool_name, &job.raw_output, &ctx);
            tracing::debug!(
                "Job {} ({}) produced {} findings",
                id,
                job.tool_name,
                result.findings.len()
            );
            report.add_job(&job.tool_name, result.findings, &result.statistics);
        }

        Ok(report)
    }
}
