//! Tool catalog entries: argument schemas, command templates, tool definitions

use std::collections::HashSet;
use std::fmt;

use serde::{Deserialize, Serialize, Serializer};

use crate::{Error, Result};

/// Declared type of a template argument
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum ArgumentKind {
    String,
    Number,
    Boolean,
}

/// Caller-supplied or default argument value
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(untagged)]
pub enum ArgumentValue {
    Boolean(bool),
    Number(i64),
    Text(String),
}

impl fmt::Display for ArgumentValue {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            ArgumentValue::Boolean(b) => write!(f, "{}", b),
            ArgumentValue::Number(n) => write!(f, "{}", n),
            ArgumentValue::Text(s) => f.write_str(s),
        }
    }
}

impl From<&str> for ArgumentValue {
    fn from(value: &str) -> Self {
        ArgumentValue::Text(value.to_string())
    }
}

impl From<String> for ArgumentValue {
    fn from(value: String) -> Self {
        ArgumentValue::Text(value)
    }
}

impl From<i64> for ArgumentValue {
    fn from(value: i64) -> Self {
        ArgumentValue::Number(value)
    }
}

impl From<bool> for ArgumentValue {
    fn from(value: bool) -> Self {
        ArgumentValue::Boolean(value)
    }
}

/// Typed definition of a named template argument
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct ArgumentDefinition {
    pub name: String,
    #[serde(rename = "type")]
    pub kind: ArgumentKind,
    pub required: bool,
    #[serde(default)]
    pub description: String,
    #[serde(default)]
    pub default_value: Option<ArgumentValue>,
    /// Example value shown to whoever fills in the template
    #[serde(default)]
    pub placeholder: String,
}

impl ArgumentDefinition {
    /// An argument the caller must always supply
    pub fn required(name: impl Into<String>, kind: ArgumentKind) -> Self {
        Self {
            name: name.into(),
            kind,
            required: true,
            description: String::new(),
            default_value: None,
            placeholder: String::new(),
        }
    }

    /// An argument that falls back to `default` when omitted
    pub fn optional(
        name: impl Into<String>,
        kind: ArgumentKind,
        default: impl Into<ArgumentValue>,
    ) -> Self {
        Self {
            name: name.into(),
            kind,
            required: false,
            description: String::new(),
            default_value: Some(default.into()),
            placeholder: String::new(),
        }
    }

    pub fn with_description(mut self, description: impl Into<String>) -> Self {
        self.description = description.into();
        self
    }

    pub fn with_placeholder(mut self, placeholder: impl Into<String>) -> Self {
        self.placeholder = placeholder.into();
        self
    }
}

/// One argument position of a command template
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum TemplateToken {
    /// Copied verbatim
    Literal(String),
    /// `{name}`: the whole token is the value
    Placeholder(String),
    /// `prefix{name}suffix`, e.g. `duration:{duration}`
    Embedded {
        prefix: String,
        name: String,
        suffix: String,
    },
}

impl TemplateToken {
    /// Parse a raw template token such as `-p`, `{ports}` or `duration:{duration}`
    pub fn parse(raw: &str) -> Self {
        if let (Some(open), Some(close)) = (raw.find('{'), raw.find('}'))
            && open < close
            && let Some(name) = raw.get(open + 1..close)
            && !name.is_empty()
        {
            let prefix = raw.get(..open).unwrap_or_default();
            let suffix = raw.get(close + 1..).unwrap_or_default();
            if prefix.is_empty() && suffix.is_empty() {
                return TemplateToken::Placeholder(name.to_string());
            }
            return TemplateToken::Embedded {
                prefix: prefix.to_string(),
                name: name.to_string(),
                suffix: suffix.to_string(),
            };
        }
        TemplateToken::Literal(raw.to_string())
    }

    /// Name of the argument this token is filled from, if any
    pub fn placeholder_name(&self) -> Option<&str> {
        match self {
            TemplateToken::Literal(_) => None,
            TemplateToken::Placeholder(name) | TemplateToken::Embedded { name, .. } => Some(name),
        }
    }

    /// Render the token with `value` substituted for its placeholder
    pub fn fill(&self, value: &str) -> String {
        match self {
            TemplateToken::Literal(literal) => literal.clone(),
            TemplateToken::Placeholder(_) => value.to_string(),
            TemplateToken::Embedded { prefix, suffix, .. } => {
                format!("{}{}{}", prefix, value, suffix)
            }
        }
    }

    /// Recover the placeholder value from a concrete argument.
    ///
    /// Returns `None` for literals, or when an embedded token's prefix/suffix
    /// is not present on `arg`.
    pub fn extract<'a>(&self, arg: &'a str) -> Option<&'a str> {
        match self {
            TemplateToken::Literal(_) => None,
            TemplateToken::Placeholder(_) => Some(arg),
            TemplateToken::Embedded { prefix, suffix, .. } => {
                arg.strip_prefix(prefix.as_str())?.strip_suffix(suffix.as_str())
            }
        }
    }
}

impl fmt::Display for TemplateToken {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            TemplateToken::Literal(literal) => f.write_str(literal),
            TemplateToken::Placeholder(name) => write!(f, "{{{}}}", name),
            TemplateToken::Embedded {
                prefix,
                name,
                suffix,
            } => write!(f, "{}{{{}}}{}", prefix, name, suffix),
        }
    }
}

impl Serialize for TemplateToken {
    fn serialize<S: Serializer>(&self, serializer: S) -> std::result::Result<S::Ok, S::Error> {
        serializer.collect_str(self)
    }
}

/// A named, parameterized shape of a tool invocation
#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
pub struct CommandTemplate {
    pub id: String,
    pub display_name: String,
    pub base_command: String,
    #[serde(rename = "arguments")]
    pub tokens: Vec<TemplateToken>,
    pub description: String,
    pub argument_definitions: Vec<ArgumentDefinition>,
}

impl CommandTemplate {
    pub fn new(
        id: impl Into<String>,
        display_name: impl Into<String>,
        base_command: impl Into<String>,
    ) -> Self {
        Self {
            id: id.into(),
            display_name: display_name.into(),
            base_command: base_command.into(),
            tokens: Vec::new(),
            description: String::new(),
            argument_definitions: Vec::new(),
        }
    }

    /// Set the argument tokens, parsing placeholders once
    pub fn with_tokens(mut self, tokens: &[&str]) -> Self {
        self.tokens = tokens.iter().map(|t| TemplateToken::parse(t)).collect();
        self
    }

    pub fn with_description(mut self, description: impl Into<String>) -> Self {
        self.description = description.into();
        self
    }

    pub fn with_argument(mut self, argument: ArgumentDefinition) -> Self {
        self.argument_definitions.push(argument);
        self
    }

    /// Look up the definition for a placeholder
    pub fn argument(&self, name: &str) -> Option<&ArgumentDefinition> {
        self.argument_definitions.iter().find(|a| a.name == name)
    }

    /// Placeholder names in token order
    pub fn placeholders(&self) -> impl Iterator<Item = &str> {
        self.tokens.iter().filter_map(TemplateToken::placeholder_name)
    }

    /// Check that placeholders and argument definitions line up one-to-one
    pub fn check(&self) -> Result<()> {
        let mut defined = HashSet::new();
        for argument in &self.argument_definitions {
            if !defined.insert(argument.name.as_str()) {
                return Err(Error::InvalidTemplate(format!(
                    "{}: argument '{}' is defined more than once",
                    self.id, argument.name
                )));
            }
        }

        let referenced: HashSet<&str> = self.placeholders().collect();
        if let Some(missing) = referenced.difference(&defined).next() {
            return Err(Error::InvalidTemplate(format!(
                "{}: placeholder '{}' has no argument definition",
                self.id, missing
            )));
        }
        if let Some(unused) = defined.difference(&referenced).next() {
            return Err(Error::InvalidTemplate(format!(
                "{}: argument '{}' is not referenced by any token",
                self.id, unused
            )));
        }
        Ok(())
    }
}

/// Format a tool is forced to emit so its parser can read it
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum OutputFormat {
    Xml,
    Json,
    Text,
}

impl fmt::Display for OutputFormat {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            OutputFormat::Xml => write!(f, "xml"),
            OutputFormat::Json => write!(f, "json"),
            OutputFormat::Text => write!(f, "text"),
        }
    }
}

/// Read-only catalog entry describing one tool
#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
pub struct ToolDefinition {
    pub name: String,
    pub description: String,
    pub base_command: String,
    pub version_flag: String,
    pub output_format: OutputFormat,
    /// Appended to every built command
    pub output_format_arguments: Vec<String>,
    pub templates: Vec<CommandTemplate>,
}

impl ToolDefinition {
    pub fn new(
        name: impl Into<String>,
        base_command: impl Into<String>,
        output_format: OutputFormat,
    ) -> Self {
        Self {
            name: name.into(),
            description: String::new(),
            base_command: base_command.into(),
            version_flag: "--version".to_string(),
            output_format,
            output_format_arguments: Vec::new(),
            templates: Vec::new(),
        }
    }

    pub fn with_description(mut self, description: impl Into<String>) -> Self {
        self.description = description.into();
        self
    }

    pub fn with_version_flag(mut self, flag: impl Into<String>) -> Self {
        self.version_flag = flag.into();
        self
    }

    pub fn with_format_arguments(mut self, arguments: &[&str]) -> Self {
        self.output_format_arguments = arguments.iter().map(|a| a.to_string()).collect();
        self
    }

    pub fn with_template(mut self, template: CommandTemplate) -> Self {
        self.templates.push(template);
        self
    }

    /// Get a template by id
    pub fn template(&self, id: &str) -> Option<&CommandTemplate> {
        self.templates.iter().find(|t| t.id == id)
    }

    /// Command that prints the tool's version
    pub fn version_command(&self) -> Vec<String> {
        vec![self.base_command.clone(), self.version_flag.clone()]
    }

    /// Check every template and that template ids are unique
    pub fn check(&self) -> Result<()> {
        let mut ids = HashSet::new();
        for template in &self.templates {
            if !ids.insert(template.id.as_str()) {
                return Err(Error::InvalidTemplate(format!(
                    "{}: duplicate template id '{}'",
                    self.name, template.id
                )));
            }
            if template.base_command != self.base_command {
                return Err(Error::InvalidTemplate(format!(
                    "{}: template '{}' runs '{}' instead of '{}'",
                    self.name, template.id, template.base_command, self.base_command
                )));
            }
            template.check()?;
        }
        Ok(())
    }
}

#[cfg(test)]
#[allow(clippy::unwrap_used, clippy::expect_used, clippy::indexing_slicing)]
mod tests {
    use super::*;

    #[test]
    fn test_parse_tokens() {
        assert_eq!(TemplateToken::parse("-sT"), TemplateToken::Literal("-sT".into()));
        assert_eq!(
            TemplateToken::parse("{target}"),
            TemplateToken::Placeholder("target".into())
        );
        assert_eq!(
            TemplateToken::parse("duration:{duration}"),
            TemplateToken::Embedded {
                prefix: "duration:".into(),
                name: "duration".into(),
                suffix: String::new(),
            }
        );
        assert_eq!(
            TemplateToken::parse("--rate={rate}/s"),
            TemplateToken::Embedded {
                prefix: "--rate=".into(),
                name: "rate".into(),
                suffix: "/s".into(),
            }
        );
    }

    #[test]
    fn test_parse_degenerate_braces_as_literals() {
        assert!(matches!(TemplateToken::parse("{}"), TemplateToken::Literal(_)));
        assert!(matches!(TemplateToken::parse("}x{"), TemplateToken::Literal(_)));
        assert!(matches!(TemplateToken::parse("{open"), TemplateToken::Literal(_)));
    }

    #[test]
    fn test_token_display_round_trip() {
        for raw in ["-p", "{ports}", "duration:{duration}", "a{b}c"] {
            assert_eq!(TemplateToken::parse(raw).to_string(), raw);
        }
    }

    #[test]
    fn test_fill_and_extract() {
        let token = TemplateToken::parse("duration:{duration}");
        assert_eq!(token.fill("60"), "duration:60");
        assert_eq!(token.extract("duration:60"), Some("60"));
        assert_eq!(token.extract("filesize:60"), None);

        let literal = TemplateToken::parse("-i");
        assert_eq!(literal.fill("ignored"), "-i");
        assert_eq!(literal.extract("-i"), None);
    }

    #[test]
    fn test_argument_value_display_and_serde() {
        assert_eq!(ArgumentValue::from(60).to_string(), "60");
        assert_eq!(ArgumentValue::from(true).to_string(), "true");
        assert_eq!(ArgumentValue::from("eth0").to_string(), "eth0");

        let parsed: ArgumentValue = serde_json::from_str("100").unwrap();
        assert_eq!(parsed, ArgumentValue::Number(100));
        let parsed: ArgumentValue = serde_json::from_str("\"80,443\"").unwrap();
        assert_eq!(parsed, ArgumentValue::Text("80,443".into()));
    }

    fn scan_template() -> CommandTemplate {
        CommandTemplate::new("scan", "Scan", "nmap")
            .with_tokens(&["-p", "{ports}", "{target}"])
            .with_argument(ArgumentDefinition::required("ports", ArgumentKind::String))
            .with_argument(ArgumentDefinition::required("target", ArgumentKind::String))
    }

    #[test]
    fn test_template_check_accepts_matching_definitions() {
        let template = scan_template();
        assert!(template.check().is_ok());
        assert_eq!(template.placeholders().collect::<Vec<_>>(), vec!["ports", "target"]);
    }

    #[test]
    fn test_template_check_rejects_undefined_placeholder() {
        let template = CommandTemplate::new("scan", "Scan", "nmap").with_tokens(&["{target}"]);
        assert!(matches!(template.check(), Err(Error::InvalidTemplate(_))));
    }

    #[test]
    fn test_template_check_rejects_unused_or_duplicate_definitions() {
        let unused = scan_template()
            .with_argument(ArgumentDefinition::required("timing", ArgumentKind::Number));
        assert!(unused.check().is_err());

        let duplicate = scan_template()
            .with_argument(ArgumentDefinition::required("target", ArgumentKind::String));
        assert!(duplicate.check().is_err());
    }

    #[test]
    fn test_tool_check_rejects_duplicate_template_ids() {
        let tool = ToolDefinition::new("nmap", "nmap", OutputFormat::Xml)
            .with_template(scan_template())
            .with_template(scan_template());
        assert!(tool.check().is_err());
    }

    #[test]
    fn test_template_serializes_tokens_as_strings() {
        let json = serde_json::to_value(scan_template()).unwrap();
        assert_eq!(json["arguments"], serde_json::json!(["-p", "{ports}", "{target}"]));
        assert_eq!(json["argument_definitions"][0]["type"], "string");
    }

    #[test]
    fn test_version_command() {
        let tool = ToolDefinition::new("ffuf", "ffuf", OutputFormat::Json).with_version_flag("-V");
        assert_eq!(tool.version_command(), vec!["ffuf".to_string(), "-V".to_string()]);
    }
}
