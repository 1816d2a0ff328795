//! Error types for pentulz-core

use miette::Diagnostic;
use thiserror::Error;

/// Result type alias using pentulz Error
pub type Result<T> = std::result::Result<T, Error>;

/// Core error types for pentulz
#[derive(Debug, Error, Diagnostic)]
pub enum Error {
    #[error("Unknown tool: {0}")]
    #[diagnostic(code(pentulz::unknown_tool))]
    UnknownTool(String),

    #[error("Unknown template '{template}' for tool '{tool}'")]
    #[diagnostic(code(pentulz::unknown_template))]
    UnknownTemplate { tool: String, template: String },

    #[error("Missing required argument: {0}")]
    #[diagnostic(code(pentulz::missing_argument))]
    MissingRequiredArgument(String),

    #[error("Command rejected for tool '{tool}': {command}")]
    #[diagnostic(
        code(pentulz::invalid_command),
        help("the arguments must match one of the tool's templates exactly")
    )]
    InvalidCommand { tool: String, command: String },

    #[error("Invalid template: {0}")]
    #[diagnostic(code(pentulz::invalid_template))]
    InvalidTemplate(String),

    #[error("Tool already registered: {0}")]
    #[diagnostic(code(pentulz::duplicate_tool))]
    DuplicateTool(String),

    #[error("Job source error: {0}")]
    #[diagnostic(code(pentulz::job_source))]
    JobSource(String),

    #[error("Configuration error: {0}")]
    #[diagnostic(code(pentulz::config))]
    Config(String),

    #[error("IO error: {0}")]
    #[diagnostic(code(pentulz::io))]
    Io(#[from] std::io::Error),

    #[error("Serialization error: {0}")]
    #[diagnostic(code(pentulz::serde))]
    Serde(#[from] serde_json::Error),

    #[error("TOML parse error: {0}")]
    #[diagnostic(code(pentulz::toml))]
    Toml(#[from] toml::de::Error),
}
