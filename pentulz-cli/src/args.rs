//! CLI argument parsing

use clap::{ArgAction, Parser, Subcommand, ValueEnum};
use std::path::PathBuf;

#[derive(Debug, Parser)]
#[command(name = "pentulz")]
#[command(author, version, about = "Command templates, output parsing and reports for pentest tools")]
pub struct Args {
    /// Path to configuration file
    #[arg(short, long, global = true)]
    pub config: Option<PathBuf>,

    /// Verbose output
    #[arg(short, long, global = true, action = ArgAction::Count)]
    pub verbose: u8,

    #[command(subcommand)]
    pub command: Command,
}

#[derive(Debug, Subcommand)]
pub enum Command {
    /// List available tools and their templates
    Tools {
        /// Print the full catalog as JSON
        #[arg(long)]
        json: bool,
    },

    /// Build a command line from a template
    Build {
        tool: String,
        template: String,

        /// Template argument as name=value (can be repeated)
        #[arg(short = 'a', long = "arg", action = ArgAction::Append, value_parser = parse_key_value)]
        args: Vec<(String, String)>,
    },

    /// Check a command line against a tool's templates
    Validate {
        tool: String,

        /// Command line, with or without the base command
        #[arg(trailing_var_arg = true, allow_hyphen_values = true, required = true)]
        command: Vec<String>,
    },

    /// Validate a command line and print it with export arguments appended
    Complete {
        tool: String,

        #[arg(trailing_var_arg = true, allow_hyphen_values = true, required = true)]
        command: Vec<String>,
    },

    /// Print a tool's version command, or parse its output
    Version {
        tool: String,

        /// File holding the version command's output
        #[arg(long)]
        output: Option<PathBuf>,
    },

    /// Parse raw tool output into findings
    Parse {
        tool: String,

        /// Raw output file (stdin when omitted or "-")
        #[arg(short, long)]
        input: Option<PathBuf>,

        /// Command line that produced the output
        #[arg(long, default_value = "")]
        command_used: String,

        /// Agent that ran the command
        #[arg(long)]
        agent: Option<String>,
    },

    /// Aggregate jobs into a report
    Report {
        /// JSON array of job records
        #[arg(short, long)]
        jobs: PathBuf,

        /// Job id to include (can be repeated; all jobs when omitted)
        #[arg(long = "id", action = ArgAction::Append)]
        ids: Vec<String>,

        /// Report name
        #[arg(short, long)]
        name: Option<String>,

        /// Export format
        #[arg(short, long, value_enum, default_value = "json")]
        format: ReportFormat,

        /// Write the report here instead of stdout
        #[arg(short, long)]
        output: Option<PathBuf>,
    },
}

#[derive(Debug, Clone, Copy, PartialEq, Eq, ValueEnum)]
pub enum ReportFormat {
    Json,
    Markdown,
}

fn parse_key_value(raw: &str) -> Result<(String, String), String> {
    raw.split_once('=')
        .filter(|(key, _)| !key.is_empty())
        .map(|(key, value)| (key.to_string(), value.to_string()))
        .ok_or_else(|| format!("expected name=value, got '{}'", raw))
}
