//! TShark packet dissections (`-T json`) and one-line summaries

use chrono::{DateTime, Utc};
use once_cell::sync::Lazy;
use regex::Regex;
use serde_json::{Map, Value};

use super::{OutputParser, ParseContext, ParseError, timestamp_from_epoch};
use crate::findings::{Finding, ParseResult, Severity};
use crate::statistics::Statistics;

#[allow(clippy::expect_used)] // Static initialization with hardcoded regex - panic is appropriate
static SUMMARY_LINE_REGEX: Lazy<Regex> = Lazy::new(|| {
    Regex::new(r"^(\d+)\s+([\d.]+)\s+(\S+)\s+(?:→|->)\s+(\S+)\s+(\S+)\s+(\d+)\s*(.*)$")
        .expect("Hardcoded tshark summary regex should be valid")
});

type Layers = Map<String, Value>;

/// Service names for well-known destination ports
fn service_for_port(port: u16) -> Option<&'static str> {
    let name = match port {
        22 => "SSH",
        80 => "HTTP",
        443 => "HTTPS",
        53 => "DNS",
        21 => "FTP",
        25 => "SMTP",
        110 => "POP3",
        143 => "IMAP",
        3306 => "MySQL",
        5432 => "PostgreSQL",
        1433 => "MSSQL",
        445 => "SMB",
        139 => "NetBIOS",
        3389 => "RDP",
        _ => return None,
    };
    Some(name)
}

fn icmp_type_name(icmp_type: &str) -> String {
    match icmp_type {
        "0" => "Echo Reply".to_string(),
        "3" => "Destination Unreachable".to_string(),
        "8" => "Echo Request (Ping)".to_string(),
        "11" => "Time Exceeded".to_string(),
        other => format!("Type {}", other),
    }
}

/// Field value as a string; the first element when tshark emits a list
fn field(layer: Option<&Value>, key: &str) -> Option<String> {
    let value = layer?.get(key)?;
    let value = match value {
        Value::Array(items) => items.first()?,
        other => other,
    };
    match value {
        Value::String(s) if !s.is_empty() => Some(s.clone()),
        Value::Number(n) => Some(n.to_string()),
        _ => None,
    }
}

fn packet_time(raw: &str) -> Option<DateTime<Utc>> {
    timestamp_from_epoch(raw).or_else(|| {
        DateTime::parse_from_rfc3339(raw)
            .ok()
            .map(|t| t.with_timezone(&Utc))
    })
}

/// Protocol a packet was classified as, with its finding
struct Classified {
    protocol: &'static str,
    finding: Option<Finding>,
}

struct Packet<'a> {
    layers: &'a Layers,
    frame_number: String,
    timestamp: DateTime<Utc>,
    ctx: &'a ParseContext,
}

impl Packet<'_> {
    fn layer(&self, name: &str) -> Option<&Value> {
        self.layers.get(name)
    }

    fn finding(&self, kind: &str, title: String, description: String, target: String) -> Finding {
        Finding::new(
            format!("{}_{}", kind, self.frame_number),
            title,
            Severity::Info,
            self.timestamp,
        )
        .with_description(description)
        .with_target(target)
        .with_agent(&self.ctx.agent_id)
    }

    fn ip_pair(&self) -> Option<(String, String)> {
        let ip = self.layer("ip");
        Some((field(ip, "ip.src")?, field(ip, "ip.dst")?))
    }

    fn classify(&self) -> Classified {
        let has = |name: &str| self.layers.contains_key(name);
        let (protocol, finding) = if has("arp") {
            ("ARP", self.arp())
        } else if has("tcp") && has("ip") {
            ("TCP", self.transport("tcp", "TCP", "connection"))
        } else if has("udp") && has("ip") {
            ("UDP", self.transport("udp", "UDP", "communication"))
        } else if has("http") {
            ("HTTP", self.http())
        } else if has("dns") {
            ("DNS", Some(self.dns()))
        } else if has("icmp") {
            ("ICMP", self.icmp())
        } else {
            ("OTHER", Some(self.generic()))
        };
        Classified { protocol, finding }
    }

    fn arp(&self) -> Option<Finding> {
        let arp = self.layer("arp");
        let src = field(arp, "arp.src.proto_ipv4")?;
        let dst = field(arp, "arp.dst.proto_ipv4")?;
        let kind = if field(arp, "arp.opcode").as_deref() == Some("1") {
            "Request"
        } else {
            "Reply"
        };
        Some(self.finding(
            "arp",
            format!("ARP {}", kind),
            format!("ARP {} between {} and {}", kind.to_lowercase(), src, dst),
            format!("{} → {}", src, dst),
        ))
    }

    fn transport(&self, layer: &str, label: &str, verb: &str) -> Option<Finding> {
        let (src_ip, dst_ip) = self.ip_pair()?;
        let transport = self.layer(layer);
        let src_port = field(transport, &format!("{}.srcport", layer))?;
        let dst_port = field(transport, &format!("{}.dstport", layer))?;

        let service = dst_port
            .parse::<u16>()
            .ok()
            .and_then(service_for_port)
            .map(str::to_string)
            .unwrap_or_else(|| format!("Port {}", dst_port));

        Some(self.finding(
            layer,
            format!("{} Traffic to {}", label, service),
            format!(
                "{} {} from {}:{} to {}:{}",
                label, verb, src_ip, src_port, dst_ip, dst_port
            ),
            format!("{}:{} → {}:{}", src_ip, src_port, dst_ip, dst_port),
        ))
    }

    fn http(&self) -> Option<Finding> {
        let http = self.layer("http");
        let method = field(http, "http.request.method");
        let uri = field(http, "http.request.uri");

        if let (Some(method), Some(uri)) = (method, uri) {
            let host = field(http, "http.host").unwrap_or_default();
            return Some(self.finding(
                "http",
                format!("HTTP {} Request", method),
                format!("{} request to {}{}", method, host, uri),
                format!("{}{}", host, uri),
            ));
        }

        let code = field(http, "http.response.code")?;
        let ip = self.layer("ip");
        let src = field(ip, "ip.src").unwrap_or_else(|| "unknown".to_string());
        let dst = field(ip, "ip.dst").unwrap_or_else(|| "unknown".to_string());
        Some(self.finding(
            "http",
            format!("HTTP {} Response", code),
            format!("HTTP response code {}", code),
            format!("{} → {}", src, dst),
        ))
    }

    fn dns(&self) -> Finding {
        let dns = self.layer("dns");
        match field(dns, "dns.qry.name") {
            Some(name) => {
                let query_type = field(dns, "dns.qry.type").unwrap_or_else(|| "unknown".to_string());
                self.finding(
                    "dns",
                    "DNS Query".to_string(),
                    format!("DNS {} query for {}", query_type, name),
                    name,
                )
            }
            None => self.finding(
                "dns",
                "DNS Response".to_string(),
                "DNS response packet".to_string(),
                "DNS Server".to_string(),
            ),
        }
    }

    fn icmp(&self) -> Option<Finding> {
        let (src, dst) = self.ip_pair()?;
        let icmp_type = field(self.layer("icmp"), "icmp.type").unwrap_or_default();
        let name = icmp_type_name(&icmp_type);
        Some(self.finding(
            "icmp",
            format!("ICMP {}", name),
            format!("ICMP {} from {} to {}", name, src, dst),
            format!("{} → {}", src, dst),
        ))
    }

    fn generic(&self) -> Finding {
        let frame = self.layer("frame");
        let protocols = field(frame, "frame.protocols").unwrap_or_else(|| "unknown".to_string());
        let size = field(frame, "frame.len").unwrap_or_else(|| "0".to_string());

        let (target, description) = match self.ip_pair() {
            Some((src, dst)) => (
                format!("{} → {}", src, dst),
                format!("Network traffic ({}) - Size: {} bytes", protocols, size),
            ),
            None => (
                "Unknown hosts".to_string(),
                format!("Network packet ({}) - Size: {} bytes", protocols, size),
            ),
        };
        self.finding("packet", "Network Traffic".to_string(), description, target)
    }
}

/// Parser for tshark
#[derive(Debug, Default, Clone, Copy)]
pub struct TsharkParser;

impl OutputParser for TsharkParser {
    fn tool_name(&self) -> &str {
        "tshark"
    }

    fn parse_structured(&self, raw_output: &str, ctx: &ParseContext) -> Result<ParseResult, ParseError> {
        let value: Value =
            serde_json::from_str(raw_output).map_err(|e| ParseError::Malformed(e.to_string()))?;
        let Value::Array(packets) = value else {
            return Err(ParseError::Internal(
                "expected a JSON array of packets".to_string(),
            ));
        };

        let mut findings = Vec::new();
        let mut statistics = Statistics::new();
        statistics.insert("packets_analyzed", packets.len() as u64);
        statistics.insert("protocols_seen", Map::new());

        for raw_packet in &packets {
            let Some(layers) = raw_packet
                .get("_source")
                .and_then(|s| s.get("layers"))
                .and_then(Value::as_object)
            else {
                tracing::debug!("Skipping tshark packet without layers");
                continue;
            };
            let frame = layers.get("frame");
            let Some(frame_number) = field(frame, "frame.number") else {
                tracing::debug!("Skipping tshark packet without a frame number");
                continue;
            };
            let timestamp = field(frame, "frame.time_epoch")
                .as_deref()
                .and_then(packet_time)
                .unwrap_or(ctx.observed_at);

            let packet = Packet {
                layers,
                frame_number,
                timestamp,
                ctx,
            };
            let classified = packet.classify();
            statistics.increment("protocols_seen", classified.protocol);
            findings.extend(classified.finding);
        }

        Ok(ParseResult::new(findings, statistics))
    }

    fn parse_text(&self, raw_output: &str, ctx: &ParseContext) -> ParseResult {
        let mut findings = Vec::new();
        let mut statistics = Statistics::new();
        statistics.insert("protocols_seen", Map::new());

        for line in raw_output.lines().map(str::trim) {
            let Some(caps) = SUMMARY_LINE_REGEX.captures(line) else {
                continue;
            };
            let text = |i: usize| caps.get(i).map(|m| m.as_str()).unwrap_or_default();
            let (number, src, dst, protocol, length, info) =
                (text(1), text(3), text(4), text(5), text(6), text(7).trim());

            let mut description = format!("{} packet - Size: {} bytes", protocol, length);
            if !info.is_empty() {
                description.push_str(&format!(" - {}", info));
            }

            statistics.increment("protocols_seen", protocol.to_uppercase());
            findings.push(
                ctx.finding(
                    format!("packet_text_{}", number),
                    format!("{} Traffic", protocol),
                    Severity::Info,
                )
                .with_description(description)
                .with_target(format!("{} → {}", src, dst)),
            );
        }

        statistics.insert("packets_analyzed", findings.len() as u64);
        ParseResult::new(findings, statistics)
    }
}
