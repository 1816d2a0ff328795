//! Report generation module

pub mod aggregator;
pub mod generator;
pub mod models;

pub use aggregator::{InMemoryJobSource, JobAction, JobRecord, JobSource, ReportAggregator};
pub use generator::{export_json, export_markdown, generate_markdown, to_json};
pub use models::{
    Report, ReportMetadata, ReportSummary, RiskRating, SeverityCounts, ToolFindings, report_id,
};
