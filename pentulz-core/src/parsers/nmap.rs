//! Nmap XML (`-oX`) and terminal output

use chrono::{DateTime, Utc};
use once_cell::sync::Lazy;
use quick_xml::de::DeError;
use regex::Regex;
use serde::Deserialize;

use super::{OutputParser, ParseContext, ParseError, timestamp_from_epoch};
use crate::config::NmapSeverityRules;
use crate::findings::{Finding, ParseResult, Severity};
use crate::statistics::Statistics;

#[allow(clippy::expect_used)] // Static initialization with hardcoded regex - panic is appropriate
static PORT_LINE_REGEX: Lazy<Regex> = Lazy::new(|| {
    Regex::new(r"^(\d+)/(tcp|udp|sctp)\s+(\S+)(?:\s+(\S+))?(?:\s+(.+))?$")
        .expect("Hardcoded nmap port line regex should be valid")
});

#[allow(clippy::expect_used)]
static DONE_LINE_REGEX: Lazy<Regex> = Lazy::new(|| {
    Regex::new(r"Nmap done: (\d+) IP addresse?s? \((\d+) hosts? up\) scanned in ([\d.]+) seconds")
        .expect("Hardcoded nmap summary regex should be valid")
});

const REPORT_PREFIX: &str = "Nmap scan report for";

#[derive(Debug, Deserialize)]
struct NmapRun {
    #[serde(rename = "@start", default)]
    start: Option<String>,
    #[serde(rename = "host", default)]
    hosts: Vec<Host>,
    #[serde(default)]
    runstats: Option<RunStats>,
}

#[derive(Debug, Deserialize)]
struct Host {
    #[serde(rename = "@starttime", default)]
    starttime: Option<String>,
    #[serde(default)]
    status: Option<State>,
    #[serde(rename = "address", default)]
    addresses: Vec<Address>,
    #[serde(default)]
    hostnames: Option<Hostnames>,
    #[serde(default)]
    ports: Option<Ports>,
    #[serde(default)]
    os: Option<Os>,
}

#[derive(Debug, Deserialize)]
struct Address {
    #[serde(rename = "@addr")]
    addr: String,
    #[serde(rename = "@addrtype", default)]
    addr_type: Option<String>,
}

#[derive(Debug, Deserialize)]
struct State {
    #[serde(rename = "@state")]
    state: String,
}

#[derive(Debug, Deserialize)]
struct Hostnames {
    #[serde(rename = "hostname", default)]
    hostnames: Vec<Hostname>,
}

#[derive(Debug, Deserialize)]
struct Hostname {
    #[serde(rename = "@name")]
    name: String,
}

#[derive(Debug, Deserialize)]
struct Ports {
    #[serde(rename = "port", default)]
    ports: Vec<Port>,
}

#[derive(Debug, Deserialize)]
struct Port {
    #[serde(rename = "@portid")]
    portid: String,
    #[serde(rename = "@protocol", default)]
    protocol: Option<String>,
    #[serde(default)]
    state: Option<State>,
    #[serde(default)]
    service: Option<Service>,
}

#[derive(Debug, Deserialize)]
struct Service {
    #[serde(rename = "@name", default)]
    name: Option<String>,
    #[serde(rename = "@product", default)]
    product: Option<String>,
    #[serde(rename = "@version", default)]
    version: Option<String>,
}

#[derive(Debug, Deserialize)]
struct Os {
    #[serde(rename = "osmatch", default)]
    matches: Vec<OsMatch>,
}

#[derive(Debug, Deserialize)]
struct OsMatch {
    #[serde(rename = "@name", default)]
    name: Option<String>,
    #[serde(rename = "@accuracy", default)]
    accuracy: Option<String>,
}

#[derive(Debug, Deserialize)]
struct RunStats {
    #[serde(default)]
    finished: Option<Finished>,
    #[serde(default)]
    hosts: Option<HostCounts>,
}

#[derive(Debug, Deserialize)]
struct Finished {
    #[serde(rename = "@elapsed", default)]
    elapsed: Option<String>,
}

#[derive(Debug, Deserialize)]
struct HostCounts {
    #[serde(rename = "@up", default)]
    up: Option<String>,
    #[serde(rename = "@down", default)]
    down: Option<String>,
    #[serde(rename = "@total", default)]
    total: Option<String>,
}

impl Port {
    fn is_open(&self) -> bool {
        self.state.as_ref().is_some_and(|s| s.state == "open")
    }
}

impl Host {
    /// First non-MAC address
    fn ip(&self) -> &str {
        self.addresses
            .iter()
            .find(|a| a.addr_type.as_deref() != Some("mac"))
            .map(|a| a.addr.as_str())
            .unwrap_or("Unknown")
    }

    fn hostname(&self) -> Option<&str> {
        self.hostnames
            .as_ref()
            .and_then(|h| h.hostnames.first())
            .map(|h| h.name.as_str())
            .filter(|name| !name.is_empty())
    }

    fn open_ports(&self) -> impl Iterator<Item = &Port> {
        self.ports
            .iter()
            .flat_map(|p| p.ports.iter())
            .filter(|p| p.is_open())
    }
}

/// Parser for nmap
pub struct NmapParser {
    rules: NmapSeverityRules,
}

impl NmapParser {
    pub fn new(rules: NmapSeverityRules) -> Self {
        Self { rules }
    }

    /// Rate an open port by the configured port tables, then by service name
    pub fn port_severity(&self, port: u16, service: Option<&str>) -> Severity {
        if self.rules.high_ports.contains(&port) {
            return Severity::High;
        }
        if self.rules.medium_ports.contains(&port) {
            return Severity::Medium;
        }
        if let Some(service) = service.map(str::to_lowercase) {
            if self.rules.high_services.iter().any(|s| *s == service) {
                return Severity::High;
            }
            if self.rules.medium_services.iter().any(|s| *s == service) {
                return Severity::Medium;
            }
        }
        Severity::Low
    }

    fn port_finding(&self, host: &Host, port: &Port, timestamp: DateTime<Utc>, ctx: &ParseContext) -> Finding {
        let ip = host.ip();
        let protocol = port.protocol.as_deref().unwrap_or("unknown");
        let service = port.service.as_ref();
        let service_name = service
            .and_then(|s| s.name.as_deref())
            .filter(|name| !name.is_empty() && *name != "unknown");

        let port_number = port.portid.trim().parse::<u16>().unwrap_or(0);
        let severity = self.port_severity(port_number, service_name);

        let mut parts = vec![format!("Open {} port {}", protocol, port.portid)];
        if let Some(name) = service_name {
            parts.push(format!("Service: {}", name));
        }
        if let Some(product) = service.and_then(|s| s.product.as_deref()).filter(|p| !p.is_empty()) {
            parts.push(format!("Product: {}", product));
        }
        if let Some(version) = service.and_then(|s| s.version.as_deref()).filter(|v| !v.is_empty()) {
            parts.push(format!("Version: {}", version));
        }

        let target = match host.hostname() {
            Some(hostname) => format!("{} ({}):{}", hostname, ip, port.portid),
            None => format!("{}:{}", ip, port.portid),
        };

        Finding::new(
            format!("port_{}_{}_{}", ip, port.portid, protocol),
            format!("Open Port {}/{}", port.portid, protocol),
            severity,
            timestamp,
        )
        .with_description(parts.join(" - "))
        .with_target(target)
        .with_agent(&ctx.agent_id)
    }

    fn host_findings(&self, host: &Host, run_start: Option<DateTime<Utc>>, ctx: &ParseContext) -> Vec<Finding> {
        let timestamp = host
            .starttime
            .as_deref()
            .and_then(timestamp_from_epoch)
            .or(run_start)
            .unwrap_or(ctx.observed_at);

        let mut findings: Vec<Finding> = host
            .open_ports()
            .map(|port| self.port_finding(host, port, timestamp, ctx))
            .collect();

        if let Some(os) = host.os.as_ref().and_then(|os| os.matches.first()) {
            let ip = host.ip();
            findings.push(
                Finding::new(
                    format!("os_{}", ip),
                    "Operating System Detection",
                    Severity::Info,
                    timestamp,
                )
                .with_description(format!(
                    "Detected OS: {} (Accuracy: {}%)",
                    os.name.as_deref().unwrap_or("Unknown OS"),
                    os.accuracy.as_deref().unwrap_or("0")
                ))
                .with_target(ip)
                .with_agent(&ctx.agent_id),
            );
        }

        findings
    }
}

impl Default for NmapParser {
    fn default() -> Self {
        Self::new(NmapSeverityRules::default())
    }
}

fn count(raw: Option<&str>) -> Option<u64> {
    raw.and_then(|v| v.trim().parse().ok())
}

fn run_statistics(run: &NmapRun) -> Statistics {
    let counts = run.runstats.as_ref().and_then(|r| r.hosts.as_ref());
    let up_by_status = run
        .hosts
        .iter()
        .filter(|h| h.status.as_ref().is_some_and(|s| s.state == "up"))
        .count() as u64;

    let total_hosts = count(counts.and_then(|c| c.total.as_deref())).unwrap_or(run.hosts.len() as u64);
    let up_hosts = count(counts.and_then(|c| c.up.as_deref())).unwrap_or(up_by_status);
    let down_hosts = count(counts.and_then(|c| c.down.as_deref()))
        .unwrap_or_else(|| total_hosts.saturating_sub(up_hosts));

    let all_ports: Vec<&Port> = run
        .hosts
        .iter()
        .flat_map(|h| h.ports.iter().flat_map(|p| p.ports.iter()))
        .collect();
    let total_ports = all_ports.len() as u64;
    let open_ports = all_ports.iter().filter(|p| p.is_open()).count() as u64;

    let scan_duration = run
        .runstats
        .as_ref()
        .and_then(|r| r.finished.as_ref())
        .and_then(|f| f.elapsed.as_deref())
        .and_then(|e| e.trim().trim_end_matches('s').parse::<f64>().ok())
        .unwrap_or(0.0);

    let mut statistics = Statistics::new();
    statistics.insert("total_hosts", total_hosts);
    statistics.insert("up_hosts", up_hosts);
    statistics.insert("down_hosts", down_hosts);
    statistics.insert("total_ports", total_ports);
    statistics.insert("open_ports", open_ports);
    statistics.insert("scan_duration", scan_duration);
    statistics
}

impl OutputParser for NmapParser {
    fn tool_name(&self) -> &str {
        "nmap"
    }

    fn parse_structured(&self, raw_output: &str, ctx: &ParseContext) -> Result<ParseResult, ParseError> {
        let trimmed = raw_output.trim_start();
        if !trimmed.starts_with('<') {
            return Err(ParseError::Malformed("output is not XML".to_string()));
        }

        let run: NmapRun = quick_xml::de::from_str(trimmed).map_err(|e| match e {
            DeError::InvalidXml(_) | DeError::UnexpectedEof => ParseError::Malformed(e.to_string()),
            other => ParseError::Internal(other.to_string()),
        })?;

        let run_start = run.start.as_deref().and_then(timestamp_from_epoch);
        let findings = run
            .hosts
            .iter()
            .flat_map(|host| self.host_findings(host, run_start, ctx))
            .collect();

        Ok(ParseResult::new(findings, run_statistics(&run)))
    }

    fn parse_text(&self, raw_output: &str, ctx: &ParseContext) -> ParseResult {
        let mut findings = Vec::new();
        let mut current_host: Option<String> = None;
        let mut hosts_seen = 0u64;
        let mut open_ports = 0u64;
        let mut summary = None;

        for line in raw_output.lines().map(str::trim).filter(|l| !l.is_empty()) {
            if let Some(host) = line.strip_prefix(REPORT_PREFIX) {
                let host = host.trim().to_string();
                hosts_seen += 1;
                findings.push(
                    ctx.finding(format!("host_{}", host), "Host Discovery", Severity::Info)
                        .with_description("Nmap discovered host")
                        .with_target(&host),
                );
                current_host = Some(host);
                continue;
            }

            if let Some(caps) = DONE_LINE_REGEX.captures(line) {
                summary = Some(caps);
                continue;
            }

            let Some(caps) = PORT_LINE_REGEX.captures(line) else {
                continue;
            };
            let (Some(port), Some(protocol), Some(state)) = (caps.get(1), caps.get(2), caps.get(3)) else {
                continue;
            };
            if state.as_str() != "open" {
                continue;
            }

            let (port, protocol) = (port.as_str(), protocol.as_str());
            let service = caps.get(4).map(|m| m.as_str()).unwrap_or("unknown");
            let severity = self.port_severity(port.parse().unwrap_or(0), Some(service));

            let mut description = format!("Open {} port {} - Service: {}", protocol, port, service);
            if let Some(version) = caps.get(5) {
                description.push_str(&format!(" - Version: {}", version.as_str()));
            }

            let (id_host, target) = match &current_host {
                Some(host) => (host.as_str(), format!("{}:{}", host, port)),
                None => ("unknown", format!("Port {}", port)),
            };

            open_ports += 1;
            findings.push(
                ctx.finding(
                    format!("port_text_{}_{}_{}", id_host, port, protocol),
                    format!("Open Port {}/{}", port, protocol),
                    severity,
                )
                .with_description(description)
                .with_target(target),
            );
        }

        let summary_value = |i: usize| summary.as_ref().and_then(|c| c.get(i)).map(|m| m.as_str());
        let total_hosts = count(summary_value(1)).unwrap_or(hosts_seen);
        let up_hosts = count(summary_value(2)).unwrap_or(hosts_seen);
        let scan_duration = summary_value(3)
            .and_then(|s| s.parse::<f64>().ok())
            .unwrap_or(0.0);

        let mut statistics = Statistics::new();
        statistics.insert("total_hosts", total_hosts);
        statistics.insert("up_hosts", up_hosts);
        statistics.insert("down_hosts", total_hosts.saturating_sub(up_hosts));
        statistics.insert("total_ports", open_ports);
        statistics.insert("open_ports", open_ports);
        statistics.insert("scan_duration", scan_duration);
        ParseResult::new(findings, statistics)
    }
}
