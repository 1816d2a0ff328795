//! Tool output parsers
//!
//! Every parser is total over string input: structured decoding is tried
//! first, malformed payloads fall back to a line-oriented reader, and
//! unexpected shapes become a single critical finding instead of an error.

mod ffuf;
mod nmap;
mod tshark;

pub use ffuf::FfufParser;
pub use nmap::NmapParser;
pub use tshark::TsharkParser;

use chrono::{DateTime, Utc};

use crate::findings::{Finding, ParseResult, Severity, UNKNOWN_AGENT};

/// Where a payload came from and when it was observed
#[derive(Debug, Clone)]
pub struct ParseContext {
    pub command_used: String,
    pub agent_id: String,
    /// Timestamp for findings whose payload carries no time of its own
    pub observed_at: DateTime<Utc>,
}

impl ParseContext {
    pub fn new(command_used: impl Into<String>, agent_id: Option<&str>) -> Self {
        Self {
            command_used: command_used.into(),
            agent_id: agent_id.unwrap_or(UNKNOWN_AGENT).to_string(),
            observed_at: Utc::now(),
        }
    }

    pub fn observed_at(mut self, at: DateTime<Utc>) -> Self {
        self.observed_at = at;
        self
    }

    /// Start a finding stamped with this context's agent and observation time
    pub fn finding(
        &self,
        id: impl Into<String>,
        title: impl Into<String>,
        severity: Severity,
    ) -> Finding {
        Finding::new(id, title, severity, self.observed_at).with_agent(&self.agent_id)
    }
}

/// Why structured decoding did not produce a result
#[derive(Debug, thiserror::Error)]
pub enum ParseError {
    /// Not the expected format at all; text fallback applies
    #[error("Malformed output: {0}")]
    Malformed(String),
    /// Decoded, but not in a shape the parser can handle
    #[error("Parser internal error: {0}")]
    Internal(String),
}

/// Trait for tool output parsing
pub trait OutputParser: Send + Sync {
    /// Tool whose output this parser reads
    fn tool_name(&self) -> &str;

    /// Decode the tool's structured export format
    fn parse_structured(
        &self,
        raw_output: &str,
        ctx: &ParseContext,
    ) -> Result<ParseResult, ParseError>;

    /// Permissive line-oriented reader for the tool's terminal output
    fn parse_text(&self, raw_output: &str, ctx: &ParseContext) -> ParseResult;

    /// Parse raw output, degrading instead of failing
    fn parse(&self, raw_output: &str, ctx: &ParseContext) -> ParseResult {
        match self.parse_structured(raw_output, ctx) {
            Ok(result) => result,
            Err(ParseError::Malformed(reason)) => {
                tracing::warn!(
                    "{} output is not structured ({}), falling back to text parsing",
                    self.tool_name(),
                    reason
                );
                let mut result = self.parse_text(raw_output, ctx);
                if result.findings.is_empty() {
                    result.statistics.insert("error", reason);
                }
                result
            }
            Err(ParseError::Internal(reason)) => {
                tracing::error!("{} parser failed: {}", self.tool_name(), reason);
                parse_failure(self.tool_name(), &reason, ctx)
            }
        }
    }
}

/// Single critical finding standing in for output that could not be parsed
pub fn parse_failure(tool: &str, reason: &str, ctx: &ParseContext) -> ParseResult {
    let target = if ctx.command_used.is_empty() {
        tool.to_string()
    } else {
        ctx.command_used.clone()
    };

    let finding = ctx
        .finding(format!("parse_error_{}", tool), "Parser Failure", Severity::Critical)
        .with_description(format!("Failed to parse {} output: {}", tool, reason))
        .with_target(target);

    let mut result = ParseResult::empty_with_error(reason);
    result.findings.push(finding);
    result
}

/// Timestamp from seconds since the epoch, with an optional fractional part
pub(crate) fn timestamp_from_epoch(raw: &str) -> Option<DateTime<Utc>> {
    let raw = raw.trim();
    let (secs, fraction) = raw.split_once('.').unwrap_or((raw, ""));
    let secs: i64 = secs.parse().ok()?;

    let nanos = if fraction.is_empty() {
        0
    } else {
        let digits: String = fraction.chars().take(9).collect();
        if !digits.chars().all(|c| c.is_ascii_digit()) {
            return None;
        }
        format!("{:0<9}", digits).parse::<u32>().ok()?
    };

    DateTime::from_timestamp(secs, nanos)
}
