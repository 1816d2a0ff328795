//! Nmap network scanner

use once_cell::sync::Lazy;
use regex::Regex;

use super::Tool;
use super::definition::{
    ArgumentDefinition, ArgumentKind, CommandTemplate, OutputFormat, ToolDefinition,
};
use crate::config::NmapSeverityRules;
use crate::parsers::{NmapParser, OutputParser};

#[allow(clippy::expect_used)] // Static initialization with hardcoded regex - panic is appropriate
static TARGET_REGEX: Lazy<Regex> = Lazy::new(|| {
    Regex::new(r"^[\w\.\-/:]+$").expect("Hardcoded nmap target regex pattern should be valid")
});

#[allow(clippy::expect_used)]
static VERSION_REGEX: Lazy<Regex> = Lazy::new(|| {
    Regex::new(r"Nmap version (\d+\.\d+)").expect("Hardcoded nmap version regex should be valid")
});

/// Nmap with XML export to stdout
pub struct NmapTool {
    definition: ToolDefinition,
    parser: NmapParser,
}

impl NmapTool {
    pub fn new(rules: NmapSeverityRules) -> Self {
        Self {
            definition: definition(),
            parser: NmapParser::new(rules),
        }
    }
}

impl Default for NmapTool {
    fn default() -> Self {
        Self::new(NmapSeverityRules::default())
    }
}

fn target_argument(description: &str) -> ArgumentDefinition {
    ArgumentDefinition::required("target", ArgumentKind::String)
        .with_description(description)
        .with_placeholder("192.168.1.1")
}

fn ports_argument(description: &str, placeholder: &str) -> ArgumentDefinition {
    ArgumentDefinition::required("ports", ArgumentKind::String)
        .with_description(description)
        .with_placeholder(placeholder)
}

fn definition() -> ToolDefinition {
    ToolDefinition::new("nmap", "nmap", OutputFormat::Xml)
        .with_description("Network exploration and port scanning")
        .with_version_flag("--version")
        .with_format_arguments(&["-oX", "-"])
        .with_template(
            CommandTemplate::new("list_scan", "List Scan", "nmap")
                .with_tokens(&["-sL", "{target}"])
                .with_description("List scan - just list targets")
                .with_argument(
                    ArgumentDefinition::required("target", ArgumentKind::String)
                        .with_description("Target host or network to scan")
                        .with_placeholder("192.168.1.0/24"),
                ),
        )
        .with_template(
            CommandTemplate::new("tcp_connect_scan", "TCP Connect Scan", "nmap")
                .with_tokens(&["-sT", "-p", "{ports}", "{target}"])
                .with_description("TCP connect scan on specific ports")
                .with_argument(ports_argument(
                    "Ports to scan (single port, range, or comma-separated)",
                    "80,443,8080-8090",
                ))
                .with_argument(target_argument("Target host to scan")),
        )
        .with_template(
            CommandTemplate::new("tcp_syn_scan", "TCP SYN Scan", "nmap")
                .with_tokens(&["-sS", "-p", "{ports}", "{target}"])
                .with_description("TCP SYN scan on specific ports")
                .with_argument(ports_argument(
                    "Ports to scan (single port, range, or comma-separated)",
                    "80,443,8080-8090",
                ))
                .with_argument(target_argument("Target host to scan")),
        )
        .with_template(
            CommandTemplate::new("service_version_detection", "Service Version Detection", "nmap")
                .with_tokens(&["-sV", "-p", "{ports}", "{target}"])
                .with_description("Service version detection")
                .with_argument(ports_argument(
                    "Ports to scan for service detection",
                    "80,443,22,21",
                ))
                .with_argument(target_argument("Target host to scan")),
        )
        .with_template(
            CommandTemplate::new("os_detection", "OS Detection", "nmap")
                .with_tokens(&["-O", "{target}"])
                .with_description("OS detection")
                .with_argument(target_argument("Target host for OS detection")),
        )
        .with_template(
            CommandTemplate::new("aggressive_scan", "Aggressive Scan", "nmap")
                .with_tokens(&["-A", "{target}"])
                .with_description("Aggressive scan")
                .with_argument(target_argument("Target host for aggressive scan")),
        )
}

impl Tool for NmapTool {
    fn definition(&self) -> &ToolDefinition {
        &self.definition
    }

    fn parser(&self) -> &dyn OutputParser {
        &self.parser
    }

    fn validate_placeholder(&self, name: &str, value: &str) -> bool {
        match name {
            "ports" => validate_ports(value),
            "target" => TARGET_REGEX.is_match(value),
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

/// Single port, `start-end` range, or a comma-separated list of either
fn validate_ports(value: &str) -> bool {
    value.split(',').all(|pattern| match pattern.split_once('-') {
        Some((start, end)) => match (parse_port(start), parse_port(end)) {
            (Some(start), Some(end)) => start <= end,
            _ => false,
        },
        None => parse_port(pattern).is_some(),
    })
}

fn parse_port(raw: &str) -> Option<u16> {
    raw.trim().parse::<u32>().ok().filter(|p| (1..=65535).contains(p)).map(|p| p as u16)
}
