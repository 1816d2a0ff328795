//! ffuf JSON (`-of json`) and terminal output

use once_cell::sync::Lazy;
use regex::Regex;
use serde::Deserialize;
use serde_json::Value;

use super::{OutputParser, ParseContext, ParseError};
use crate::findings::{Finding, ParseResult, Severity};
use crate::statistics::Statistics;

#[allow(clippy::expect_used)] // Static initialization with hardcoded regex - panic is appropriate
static STATUS_LINE_REGEX: Lazy<Regex> = Lazy::new(|| {
    Regex::new(r"^(\d{3})\s+(\d+)\s+(\S+)").expect("Hardcoded ffuf status line regex should be valid")
});

#[allow(clippy::expect_used)]
static RESULT_LINE_REGEX: Lazy<Regex> = Lazy::new(|| {
    Regex::new(r"^(\S+)\s+\[Status: (\d+), Size: (\d+), Words: (\d+), Lines: (\d+)")
        .expect("Hardcoded ffuf result line regex should be valid")
});

#[allow(clippy::expect_used)]
static ANSI_REGEX: Lazy<Regex> =
    Lazy::new(|| Regex::new(r"\x1b\[[0-9;]*[A-Za-z]").expect("Hardcoded ANSI regex should be valid"));

#[derive(Debug, Deserialize)]
struct FfufOutput {
    #[serde(default)]
    results: Vec<FfufResult>,
    #[serde(default)]
    config: Option<FfufConfig>,
}

#[derive(Debug, Deserialize)]
struct FfufResult {
    #[serde(default)]
    url: String,
    #[serde(default)]
    status: i64,
    #[serde(default)]
    length: i64,
    #[serde(default)]
    words: i64,
    #[serde(default)]
    lines: i64,
}

#[derive(Debug, Deserialize)]
struct FfufConfig {
    #[serde(default)]
    url: Option<String>,
    #[serde(default)]
    wordlist: Option<String>,
    #[serde(default)]
    inputproviders: Vec<InputProvider>,
}

#[derive(Debug, Deserialize)]
struct InputProvider {
    #[serde(default)]
    value: String,
}

/// One response, however it was read
struct Hit<'a> {
    target: String,
    status: i64,
    length: i64,
    words: i64,
    lines: i64,
    id_prefix: &'a str,
}

fn severity_for(status: i64, length: i64) -> Severity {
    if (200..400).contains(&status) && length > 0 {
        Severity::High
    } else if (300..500).contains(&status) {
        Severity::Medium
    } else {
        Severity::Low
    }
}

fn response_kind(status: i64) -> &'static str {
    match status {
        200..=299 => "Successful Response",
        300..=399 => "Redirect Response",
        400..=499 => "Client Error",
        500..=599 => "Server Error",
        _ => "Unknown Response",
    }
}

impl Hit<'_> {
    fn into_finding(self, ctx: &ParseContext) -> Finding {
        let mut parts = vec![format!("Status: {}", self.status)];
        if self.length > 0 {
            parts.push(format!("Length: {}", self.length));
        }
        if self.words > 0 {
            parts.push(format!("Words: {}", self.words));
        }
        if self.lines > 0 {
            parts.push(format!("Lines: {}", self.lines));
        }

        ctx.finding(
            format!("{}_{}_{}", self.id_prefix, self.status, self.target),
            format!("{} - {}", response_kind(self.status), self.status),
            severity_for(self.status, self.length),
        )
        .with_description(parts.join(" - "))
        .with_target(self.target)
    }
}

fn record(statistics: &mut Statistics, status: i64, length: i64) {
    statistics.increment("status_codes", status.to_string());
    if length > 0 {
        statistics.increment("content_lengths", length.to_string());
    }
}

/// Value following `flag` in a whitespace-split command line
fn flag_value<'a>(command: &'a str, flag: &str) -> Option<&'a str> {
    let mut parts = command.split_whitespace();
    parts.find(|p| *p == flag)?;
    parts.next()
}

/// Parser for ffuf
#[derive(Debug, Default, Clone, Copy)]
pub struct FfufParser;

impl OutputParser for FfufParser {
    fn tool_name(&self) -> &str {
        "ffuf"
    }

    fn parse_structured(&self, raw_output: &str, ctx: &ParseContext) -> Result<ParseResult, ParseError> {
        let value: Value =
            serde_json::from_str(raw_output).map_err(|e| ParseError::Malformed(e.to_string()))?;
        if !value.is_object() {
            return Err(ParseError::Malformed("expected a JSON object".to_string()));
        }
        let output: FfufOutput =
            serde_json::from_value(value).map_err(|e| ParseError::Internal(e.to_string()))?;

        let mut statistics = Statistics::new();
        statistics.insert("total_requests", output.results.len() as u64);
        // present even when no result matched
        statistics.insert("status_codes", serde_json::Map::new());
        statistics.insert("content_lengths", serde_json::Map::new());

        let mut findings = Vec::with_capacity(output.results.len());
        for result in output.results {
            record(&mut statistics, result.status, result.length);
            if result.url.is_empty() {
                continue;
            }
            findings.push(
                Hit {
                    target: result.url,
                    status: result.status,
                    length: result.length,
                    words: result.words,
                    lines: result.lines,
                    id_prefix: "ffuf",
                }
                .into_finding(ctx),
            );
        }

        let config = output.config.as_ref();
        let target_url = config
            .and_then(|c| c.url.clone())
            .unwrap_or_else(|| "unknown".to_string());
        let wordlist = config
            .and_then(|c| {
                c.wordlist
                    .clone()
                    .or_else(|| c.inputproviders.first().map(|p| p.value.clone()))
            })
            .filter(|w| !w.is_empty())
            .unwrap_or_else(|| "unknown".to_string());
        statistics.insert("target_url", target_url);
        statistics.insert("wordlist", wordlist);

        Ok(ParseResult::new(findings, statistics))
    }

    fn parse_text(&self, raw_output: &str, ctx: &ParseContext) -> ParseResult {
        let base_url = flag_value(&ctx.command_used, "-u");
        let mut statistics = Statistics::new();
        statistics.insert("status_codes", serde_json::Map::new());
        statistics.insert("content_lengths", serde_json::Map::new());
        let mut findings = Vec::new();

        for line in raw_output.lines() {
            let line = ANSI_REGEX.replace_all(line, "");
            let line = line.trim();
            if line.is_empty() {
                continue;
            }

            let hit = if let Some(caps) = RESULT_LINE_REGEX.captures(line) {
                let number = |i: usize| caps.get(i).and_then(|m| m.as_str().parse::<i64>().ok()).unwrap_or(0);
                let word = caps.get(1).map(|m| m.as_str()).unwrap_or_default();
                Hit {
                    target: base_url
                        .map(|url| url.replace("FUZZ", word))
                        .unwrap_or_else(|| word.to_string()),
                    status: number(2),
                    length: number(3),
                    words: number(4),
                    lines: number(5),
                    id_prefix: "ffuf_text",
                }
            } else if let Some(caps) = STATUS_LINE_REGEX.captures(line) {
                let number = |i: usize| caps.get(i).and_then(|m| m.as_str().parse::<i64>().ok()).unwrap_or(0);
                Hit {
                    target: caps.get(3).map(|m| m.as_str().to_string()).unwrap_or_default(),
                    status: number(1),
                    length: number(2),
                    words: 0,
                    lines: 0,
                    id_prefix: "ffuf_text",
                }
            } else {
                continue;
            };

            record(&mut statistics, hit.status, hit.length);
            findings.push(hit.into_finding(ctx));
        }

        statistics.insert("total_requests", findings.len() as u64);
        statistics.insert("target_url", base_url.unwrap_or("unknown"));
        statistics.insert(
            "wordlist",
            flag_value(&ctx.command_used, "-w").unwrap_or("unknown"),
        );
        ParseResult::new(findings, statistics)
    }
}
