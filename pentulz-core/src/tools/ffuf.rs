//! ffuf web fuzzer

use once_cell::sync::Lazy;
use regex::Regex;

use super::definition::{
    ArgumentDefinition, ArgumentKind, CommandTemplate, OutputFormat, ToolDefinition,
};
use super::{Tool, is_positive_integer};
use crate::parsers::{FfufParser, OutputParser};

/// Wordlist used when a command doesn't name one
pub const DEFAULT_WORDLIST: &str = "/usr/share/wordlists/dirb/common.txt";

#[allow(clippy::expect_used)] // Static initialization with hardcoded regex - panic is appropriate
static VERSION_REGEX: Lazy<Regex> = Lazy::new(|| {
    Regex::new(r"ffuf version:\s*v?(\d+\.\d+\.\d+)")
        .expect("Hardcoded ffuf version regex should be valid")
});

pub struct FfufTool {
    definition: ToolDefinition,
    parser: FfufParser,
}

impl FfufTool {
    pub fn new() -> Self {
        Self {
            definition: definition(),
            parser: FfufParser,
        }
    }
}

impl Default for FfufTool {
    fn default() -> Self {
        Self::new()
    }
}

fn wordlist_argument() -> ArgumentDefinition {
    ArgumentDefinition::optional("wordlist", ArgumentKind::String, DEFAULT_WORDLIST)
        .with_description("Path to wordlist file")
        .with_placeholder(DEFAULT_WORDLIST)
}

fn url_argument() -> ArgumentDefinition {
    ArgumentDefinition::required("url", ArgumentKind::String)
        .with_description("Target URL with FUZZ keyword")
        .with_placeholder("https://example.com/FUZZ")
}

fn definition() -> ToolDefinition {
    ToolDefinition::new("ffuf", "ffuf", OutputFormat::Json)
        .with_description("Fast web fuzzer")
        .with_version_flag("-V")
        .with_format_arguments(&["-s", "-noninteractive", "-o", "/dev/stdout", "-of", "json"])
        .with_template(
            CommandTemplate::new("directory_fuzzing", "Directory Fuzzing", "ffuf")
                .with_tokens(&["-w", "{wordlist}", "-u", "{url}"])
                .with_description("Directory and file fuzzing")
                .with_argument(wordlist_argument())
                .with_argument(url_argument()),
        )
        .with_template(
            CommandTemplate::new("status_code_matching", "Status Code Matching", "ffuf")
                .with_tokens(&["-w", "{wordlist}", "-u", "{url}", "-mc", "{match_codes}"])
                .with_description("Fuzzing with specific status code matching")
                .with_argument(wordlist_argument())
                .with_argument(url_argument())
                .with_argument(
                    ArgumentDefinition::required("match_codes", ArgumentKind::String)
                        .with_description("HTTP status codes to match (comma-separated)")
                        .with_placeholder("200,301,302"),
                ),
        )
        .with_template(
            CommandTemplate::new("size_filtering", "Size Filtering", "ffuf")
                .with_tokens(&["-w", "{wordlist}", "-u", "{url}", "-fs", "{filter_size}"])
                .with_description("Fuzzing with response size filtering")
                .with_argument(wordlist_argument())
                .with_argument(url_argument())
                .with_argument(
                    ArgumentDefinition::required("filter_size", ArgumentKind::Number)
                        .with_description("Response size to filter out")
                        .with_placeholder("1234"),
                ),
        )
}

impl Tool for FfufTool {
    fn definition(&self) -> &ToolDefinition {
        &self.definition
    }

    fn parser(&self) -> &dyn OutputParser {
        &self.parser
    }

    fn validate_placeholder(&self, name: &str, value: &str) -> bool {
        match name {
            "wordlist" => !value.trim().is_empty(),
            "url" => value.contains("FUZZ"),
            "match_codes" => validate_status_codes(value),
            "filter_size" => is_positive_integer(value),
            _ => true,
        }
    }

    fn parse_version(&self, raw: &str) -> Option<String> {
        VERSION_REGEX
            .captures(raw)
            .and_then(|c| c.get(1))
            .map(|m| m.as_str().to_string())
    }
}

/// Comma-separated HTTP status codes, each in 100..=599
fn validate_status_codes(value: &str) -> bool {
    value
        .split(',')
        .all(|code| code.trim().parse::<u16>().is_ok_and(|c| (100..=599).contains(&c)))
}

#[cfg(test)]
#[allow(clippy::unwrap_used, clippy::expect_used, clippy::indexing_slicing)]
mod tests {
    use std::collections::HashMap;

    use super::*;
    use crate::tools::ArgumentValue;

    #[test]
    fn test_definition_is_consistent() {
        let tool = FfufTool::new();
        tool.definition().check().unwrap();
        assert_eq!(tool.definition().version_command(), vec!["ffuf", "-V"]);
    }

    #[test]
    fn test_valid_ffuf_commands() {
        let tool = FfufTool::new();
        assert!(tool.validate(&[
            "ffuf",
            "-w",
            "/usr/share/wordlists/common.txt",
            "-u",
            "http://example.com/FUZZ"
        ]));
        assert!(tool.validate(&[
            "ffuf",
            "-w",
            "words.txt",
            "-u",
            "https://example.com/FUZZ",
            "-mc",
            "200,301,302"
        ]));
        assert!(tool.validate(&[
            "ffuf",
            "-w",
            "words.txt",
            "-u",
            "https://example.com/FUZZ",
            "-fs",
            "1234"
        ]));
    }

    #[test]
    fn test_url_requires_fuzz_keyword() {
        let tool = FfufTool::new();
        assert!(!tool.validate(&["ffuf", "-w", "words.txt", "-u", "http://example.com/admin"]));
    }

    #[test]
    fn test_status_code_range() {
        let tool = FfufTool::new();
        let with_codes = |codes: &str| {
            tool.validate(&["ffuf", "-w", "w.txt", "-u", "http://h/FUZZ", "-mc", codes])
        };
        assert!(with_codes("200"));
        assert!(with_codes("100,599"));
        assert!(!with_codes("999"));
        assert!(!with_codes("99"));
        assert!(!with_codes("200,abc"));
    }

    #[test]
    fn test_filter_size_must_be_positive() {
        let tool = FfufTool::new();
        let with_size =
            |size: &str| tool.validate(&["ffuf", "-w", "w.txt", "-u", "http://h/FUZZ", "-fs", size]);
        assert!(with_size("1"));
        assert!(!with_size("0"));
        assert!(!with_size("-5"));
        assert!(!with_size("big"));
    }

    #[test]
    fn test_build_uses_default_wordlist() {
        let tool = FfufTool::new();
        let mut args = HashMap::new();
        args.insert("url".to_string(), ArgumentValue::from("https://example.com/FUZZ"));
        let command = tool.build("directory_fuzzing", &args).unwrap();
        assert_eq!(command[2], DEFAULT_WORDLIST);
        assert!(command.ends_with(&["-of".to_string(), "json".to_string()]));
        assert!(tool.validate(&command));
    }

    #[test]
    fn test_parse_version() {
        let tool = FfufTool::new();
        assert_eq!(
            tool.parse_version("ffuf version: 2.1.0-dev"),
            Some("2.1.0".to_string())
        );
        assert_eq!(tool.parse_version("ffuf"), None);
    }
}
