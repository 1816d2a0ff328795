//! pentulz-core: command templates, output parsers and report aggregation
//! for penetration-testing tools

#![allow(clippy::missing_errors_doc)]
#![allow(clippy::missing_panics_doc)]

pub mod config;
pub mod error;
pub mod findings;
pub mod parsers;
pub mod reports;
pub mod statistics;
pub mod tools;

pub use error::{Error, Result};
pub use findings::{Finding, ParseResult, Severity};
pub use statistics::Statistics;
pub use tools::{Tool, ToolRegistry};
