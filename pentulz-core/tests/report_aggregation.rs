//! Reports over recorded nmap, ffuf and tshark jobs

#![allow(clippy::unwrap_used, clippy::expect_used, clippy::indexing_slicing)]

use chrono::{TimeZone, Utc};
use pentulz_core::config::EngineConfig;
use pentulz_core::reports::{
    self, InMemoryJobSource, JobAction, JobRecord, ReportAggregator, RiskRating,
};
use pentulz_core::{Severity, ToolRegistry};

const NMAP_XML: &str = include_str!("fixtures/nmap_sample.xml");
const FFUF_JSON: &str = include_str!("fixtures/ffuf_sample.json");
const TSHARK_JSON: &str = include_str!("fixtures/tshark_sample.json");

fn job(id: &str, tool: &str, raw: &str, args: &[&str]) -> JobRecord {
    JobRecord {
        id: id.to_string(),
        tool_name: tool.to_string(),
        raw_output: raw.to_string(),
        action: JobAction {
            cmd: tool.to_string(),
            variant: None,
            args: args.iter().map(|a| a.to_string()).collect(),
        },
        agent_id: Some("recon-1".to_string()),
    }
}

fn source() -> InMemoryJobSource {
    InMemoryJobSource::new(vec![
        job("101", "nmap", NMAP_XML, &["-sV", "-p", "22,80,443", "192.168.1.10"]),
        job(
            "102",
            "ffuf",
            FFUF_JSON,
            &["-w", "/usr/share/wordlists/dirb/common.txt", "-u", "http://192.168.1.10/FUZZ"],
        ),
        job("103", "tshark", TSHARK_JSON, &["-i", "eth0", "-c", "3"]),
    ])
}

fn ids(raw: &[&str]) -> Vec<String> {
    raw.iter().map(|s| s.to_string()).collect()
}

fn registry() -> ToolRegistry {
    ToolRegistry::with_config(&EngineConfig::default()).unwrap()
}

#[test]
fn nmap_and_ffuf_jobs_are_grouped_by_tool() {
    let registry = registry();
    let source = source();
    let report = ReportAggregator::new(&registry, &source)
        .generate(&ids(&["101", "102"]), Some("Web Host Review"))
        .unwrap();

    assert_eq!(report.findings_by_tool.len(), 2);
    assert_eq!(report.findings_by_tool["nmap"].findings.len(), 2);
    assert_eq!(report.findings_by_tool["ffuf"].findings.len(), 3);
    assert_eq!(report.all_findings.len(), 5);
    assert_eq!(report.metadata.total_findings, 5);
    assert_eq!(report.metadata.total_jobs, 2);

    let tools: Vec<&str> = report.summary.tools_used.iter().map(String::as_str).collect();
    assert_eq!(tools, vec!["ffuf", "nmap"]);

    let counts = &report.summary.severity_distribution;
    assert_eq!(counts.total(), 5);
    assert_eq!(counts.high, 3);
    assert_eq!(counts.medium, 2);
    assert_eq!(report.summary.risk_rating, RiskRating::High);
}

#[test]
fn findings_keep_job_order() {
    let registry = registry();
    let source = source();
    let report = ReportAggregator::new(&registry, &source)
        .generate(&ids(&["102", "101"]), None)
        .unwrap();

    let ids: Vec<&str> = report.all_findings.iter().map(|f| f.id.as_str()).collect();
    assert_eq!(
        ids,
        vec![
            "ffuf_200_http://192.168.1.10/admin",
            "ffuf_301_http://192.168.1.10/login",
            "ffuf_403_http://192.168.1.10/server-status",
            "port_192.168.1.10_22_tcp",
            "port_192.168.1.10_80_tcp",
        ]
    );
    assert!(report.all_findings.iter().all(|f| f.agent_id == "recon-1"));
}

#[test]
fn per_tool_statistics_survive_aggregation() {
    let registry = registry();
    let source = source();
    let report = ReportAggregator::new(&registry, &source)
        .generate(&source.ids(), None)
        .unwrap();

    let nmap = &report.findings_by_tool["nmap"].statistics;
    assert_eq!(nmap.get("total_hosts").unwrap(), 1);
    assert_eq!(nmap.get("total_ports").unwrap(), 3);
    assert_eq!(nmap.get("open_ports").unwrap(), 2);
    assert_eq!(nmap.get("scan_duration").unwrap(), 12.04);

    let ffuf = &report.findings_by_tool["ffuf"].statistics;
    assert_eq!(ffuf.get("total_requests").unwrap(), 3);
    assert_eq!(ffuf.get("status_codes").unwrap()["403"], 1);
    assert!(ffuf.get("content_lengths").unwrap().get("0").is_none());
    assert_eq!(ffuf.get("target_url").unwrap(), "http://192.168.1.10/FUZZ");
    assert_eq!(ffuf.get("wordlist").unwrap(), "/usr/share/wordlists/dirb/common.txt");

    let tshark = &report.findings_by_tool["tshark"];
    assert_eq!(tshark.findings.len(), 3);
    assert!(tshark.findings.iter().all(|f| f.severity == Severity::Info));
    let seen = tshark.statistics.get("protocols_seen").unwrap();
    assert_eq!(seen["TCP"], 1);
    assert_eq!(seen["ARP"], 1);
    assert_eq!(seen["ICMP"], 1);
}

#[test]
fn payload_timestamps_are_preserved() {
    let registry = registry();
    let source = source();
    let report = ReportAggregator::new(&registry, &source)
        .generate(&ids(&["101", "103"]), None)
        .unwrap();

    let nmap = &report.findings_by_tool["nmap"].findings[0];
    assert_eq!(nmap.timestamp, Utc.timestamp_opt(1_712_000_001, 0).unwrap());
    assert_eq!(nmap.target, "web01.lab (192.168.1.10):22");

    let tcp = &report.findings_by_tool["tshark"].findings[0];
    assert_eq!(tcp.title, "TCP Traffic to SSH");
    assert_eq!(tcp.timestamp.timestamp(), 1_712_000_100);
    assert_eq!(tcp.timestamp.timestamp_subsec_millis(), 250);
}

#[test]
fn report_id_is_stable_for_the_same_request() {
    let registry = registry();
    let source = source();
    let aggregator = ReportAggregator::new(&registry, &source);

    let first = aggregator.generate(&ids(&["101", "102"]), Some("R")).unwrap();
    let second = aggregator.generate(&ids(&["101", "102"]), Some("R")).unwrap();
    let other = aggregator.generate(&ids(&["101"]), Some("R")).unwrap();

    assert_eq!(first.metadata.report_id, second.metadata.report_id);
    assert_ne!(first.metadata.report_id, other.metadata.report_id);
}

#[test]
fn broken_outputs_still_produce_a_report() {
    let registry = registry();
    let source = InMemoryJobSource::new(vec![
        job("1", "nmap", "<nmaprun><host>", &[]),
        job("2", "tshark", r#"{"not":"packets"}"#, &[]),
        job("3", "ffuf", "", &[]),
    ]);
    let report = ReportAggregator::new(&registry, &source)
        .generate(&ids(&["1", "2", "3"]), None)
        .unwrap();

    assert_eq!(report.metadata.total_jobs, 3);
    // the tshark object is JSON of the wrong shape
    let tshark = &report.findings_by_tool["tshark"].findings;
    assert_eq!(tshark.len(), 1);
    assert_eq!(tshark[0].severity, Severity::Critical);
    assert_eq!(report.summary.risk_rating, RiskRating::Critical);
    assert!(report.findings_by_tool["ffuf"].findings.is_empty());
    assert!(report.findings_by_tool["ffuf"].statistics.contains_key("error"));
}

#[test]
fn markdown_export_lists_every_tool() {
    let registry = registry();
    let source = source();
    let report = ReportAggregator::new(&registry, &source)
        .generate_at(
            &source.ids(),
            Some("Lab Sweep"),
            Utc.with_ymd_and_hms(2024, 4, 2, 9, 0, 0).unwrap(),
        )
        .unwrap();

    let markdown = reports::generate_markdown(&report);
    assert!(markdown.starts_with("# Lab Sweep"));
    assert!(markdown.contains("- **Report Generated:** 2024-04-02 09:00 UTC"));
    assert!(markdown.contains("- **Jobs Parsed:** 3 of 3 requested"));
    assert!(markdown.contains("### ffuf (1 jobs, 3 findings)"));
    assert!(markdown.contains("### nmap (1 jobs, 2 findings)"));
    assert!(markdown.contains("### tshark (1 jobs, 3 findings)"));
    assert!(markdown.contains("Overall Risk Rating: **High**"));

    let json: serde_json::Value =
        serde_json::from_str(&reports::to_json(&report).unwrap()).unwrap();
    assert_eq!(json["metadata"]["total_findings"], 8);
    assert_eq!(json["summary"]["risk_rating"], "high");
}
