//! TShark packet capture and analysis

use once_cell::sync::Lazy;
use regex::Regex;

use super::definition::{
    ArgumentDefinition, ArgumentKind, CommandTemplate, OutputFormat, ToolDefinition,
};
use super::{Tool, is_positive_integer};
use crate::parsers::{OutputParser, TsharkParser};

pub const DEFAULT_PACKET_COUNT: i64 = 100;
pub const DEFAULT_DURATION_SECS: i64 = 60;

#[allow(clippy::expect_used)] // Static initialization with hardcoded regex - panic is appropriate
static INTERFACE_REGEX: Lazy<Regex> = Lazy::new(|| {
    Regex::new(r"^[\w\-]+$").expect("Hardcoded interface regex pattern should be valid")
});

#[allow(clippy::expect_used)]
static VERSION_REGEX: Lazy<Regex> = Lazy::new(|| {
    Regex::new(r"TShark \(Wireshark\) (\d+\.\d+\.\d+)")
        .expect("Hardcoded tshark version regex should be valid")
});

pub struct TsharkTool {
    definition: ToolDefinition,
    parser: TsharkParser,
}

impl TsharkTool {
    pub fn new() -> Self {
        Self {
            definition: definition(),
            parser: TsharkParser,
        }
    }
}

impl Default for TsharkTool {
    fn default() -> Self {
        Self::new()
    }
}

fn interface_argument() -> ArgumentDefinition {
    ArgumentDefinition::required("interface", ArgumentKind::String)
        .with_description("Network interface to capture on")
        .with_placeholder("eth0")
}

fn pcap_argument() -> ArgumentDefinition {
    ArgumentDefinition::required("pcap_file", ArgumentKind::String)
        .with_description("Path to PCAP file")
        .with_placeholder("capture.pcap")
}

fn duration_argument() -> ArgumentDefinition {
    ArgumentDefinition::optional("duration", ArgumentKind::Number, DEFAULT_DURATION_SECS)
        .with_description("Capture duration in seconds")
        .with_placeholder("60")
}

fn definition() -> ToolDefinition {
    ToolDefinition::new("tshark", "tshark", OutputFormat::Json)
        .with_description("Network protocol analyzer")
        .with_version_flag("--version")
        .with_format_arguments(&["-T", "json"])
        .with_template(
            CommandTemplate::new("live_capture_with_count", "Live Capture With Count", "tshark")
                .with_tokens(&["-i", "{interface}", "-c", "{count}", "-a", "duration:{duration}"])
                .with_description("Live capture limited by packet count and duration")
                .with_argument(interface_argument())
                .with_argument(
                    ArgumentDefinition::optional("count", ArgumentKind::Number, DEFAULT_PACKET_COUNT)
                        .with_description("Number of packets to capture")
                        .with_placeholder("100"),
                )
                .with_argument(duration_argument()),
        )
        .with_template(
            CommandTemplate::new("pcap_duration_filter", "PCAP Analysis", "tshark")
                .with_tokens(&["-r", "{pcap_file}", "-a", "duration:{duration}"])
                .with_description("Analyze an existing PCAP file")
                .with_argument(pcap_argument())
                .with_argument(duration_argument()),
        )
        .with_template(
            CommandTemplate::new("pcap_filter_duration", "Filtered PCAP Analysis", "tshark")
                .with_tokens(&["-r", "{pcap_file}", "-Y", "{filter}", "-a", "duration:{duration}"])
                .with_description("Analyze a PCAP file with a display filter")
                .with_argument(pcap_argument())
                .with_argument(
                    ArgumentDefinition::required("filter", ArgumentKind::String)
                        .with_description("Display filter expression")
                        .with_placeholder("tcp.port == 80"),
                )
                .with_argument(duration_argument()),
        )
        .with_template(
            CommandTemplate::new("live_capture_duration_only", "Live Capture", "tshark")
                .with_tokens(&["-i", "{interface}", "-a", "duration:{duration}"])
                .with_description("Live capture limited by duration")
                .with_argument(interface_argument())
                .with_argument(duration_argument()),
        )
}

impl Tool for TsharkTool {
    fn definition(&self) -> &ToolDefinition {
        &self.definition
    }

    fn parser(&self) -> &dyn OutputParser {
        &self.parser
    }

    fn validate_placeholder(&self, name: &str, value: &str) -> bool {
        match name {
            "interface" => INTERFACE_REGEX.is_match(value),
            "count" | "duration" => is_positive_integer(value),
            "pcap_file" | "filter" => !value.trim().is_empty(),
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
