//! Tool catalog: definitions, command building and validation, registry

pub mod command;
pub mod definition;
pub mod ffuf;
pub mod nmap;
pub mod registry;
pub mod tshark;

use std::collections::HashMap;

pub use definition::{
    ArgumentDefinition, ArgumentKind, ArgumentValue, CommandTemplate, OutputFormat,
    TemplateToken, ToolDefinition,
};
pub use ffuf::FfufTool;
pub use nmap::NmapTool;
pub use registry::{ToolRegistry, ToolSummary};
pub use tshark::TsharkTool;

use crate::Result;
use crate::findings::ParseResult;
use crate::parsers::{OutputParser, ParseContext};

/// Capabilities every supported tool provides
pub trait Tool: Send + Sync {
    /// Catalog entry for this tool
    fn definition(&self) -> &ToolDefinition;

    /// Parser for this tool's output
    fn parser(&self) -> &dyn OutputParser;

    /// Check one placeholder value, already stripped of any prefix/suffix.
    /// Placeholders without a rule are accepted.
    fn validate_placeholder(&self, name: &str, value: &str) -> bool;

    /// Extract a version string from the output of the version command
    fn parse_version(&self, raw: &str) -> Option<String>;

    fn name(&self) -> &str {
        &self.definition().name
    }

    /// Build a command line from one of this tool's templates
    fn build(&self, template_id: &str, args: &HashMap<String, ArgumentValue>) -> Result<Vec<String>> {
        command::build_command(self.definition(), template_id, args)
    }

    /// Whether `command_args` matches one of this tool's templates
    fn validate<S: AsRef<str>>(&self, command_args: &[S]) -> bool
    where
        Self: Sized,
    {
        self.validate_args(&command_args.iter().map(AsRef::as_ref).collect::<Vec<_>>())
    }

    /// Object-safe form of [`Tool::validate`]
    fn validate_args(&self, command_args: &[&str]) -> bool {
        command::validate_command(self.definition(), command_args, |name, value| {
            self.validate_placeholder(name, value)
        })
    }

    fn parse(&self, raw_output: &str, ctx: &ParseContext) -> ParseResult {
        self.parser().parse(raw_output, ctx)
    }
}

/// Positive integer, as accepted for counts, durations and sizes
pub(crate) fn is_positive_integer(value: &str) -> bool {
    value.trim().parse::<i64>().is_ok_and(|n| n > 0)
}
