//! Process-wide tool catalog

use std::collections::HashMap;

use once_cell::sync::Lazy;
use serde::Serialize;

use super::definition::{ArgumentDefinition, ArgumentValue, OutputFormat, ToolDefinition};
use super::{FfufTool, NmapTool, Tool, TsharkTool};
use crate::config::EngineConfig;
use crate::findings::{ParseResult, Severity};
use crate::parsers::ParseContext;
use crate::{Error, Result};

/// Registry built once from the default configuration
#[allow(clippy::expect_used)] // Built-in tool definitions are static; failing to register them is a defect
static GLOBAL_REGISTRY: Lazy<ToolRegistry> = Lazy::new(|| {
    ToolRegistry::with_config(&EngineConfig::default())
        .expect("Built-in tool definitions should register cleanly")
});

/// Registry of available tools, in registration order
pub struct ToolRegistry {
    tools: Vec<Box<dyn Tool>>,
}

impl ToolRegistry {
    /// Registry with no tools
    pub fn empty() -> Self {
        Self { tools: Vec::new() }
    }

    /// Registry with the built-in tools, rated with `config`'s severity tables
    pub fn with_config(config: &EngineConfig) -> Result<Self> {
        let mut registry = Self::empty();
        registry.register(Box::new(NmapTool::new(config.severity.nmap.clone())))?;
        registry.register(Box::new(FfufTool::new()))?;
        registry.register(Box::new(TsharkTool::new()))?;
        Ok(registry)
    }

    /// Shared registry with the built-in tools and default configuration
    pub fn global() -> &'static ToolRegistry {
        &GLOBAL_REGISTRY
    }

    /// Add a tool after checking its templates
    pub fn register(&mut self, tool: Box<dyn Tool>) -> Result<()> {
        tool.definition().check()?;
        if self.get(tool.name()).is_some() {
            return Err(Error::DuplicateTool(tool.name().to_string()));
        }
        tracing::debug!("Registered tool: {}", tool.name());
        self.tools.push(tool);
        Ok(())
    }

    /// Get a tool by name
    pub fn get(&self, name: &str) -> Option<&dyn Tool> {
        self.tools
            .iter()
            .find(|t| t.name() == name)
            .map(|t| t.as_ref())
    }

    fn require(&self, name: &str) -> Result<&dyn Tool> {
        self.get(name)
            .ok_or_else(|| Error::UnknownTool(name.to_string()))
    }

    /// Get all tool definitions
    pub fn all(&self) -> Vec<&ToolDefinition> {
        self.tools.iter().map(|t| t.definition()).collect()
    }

    /// Registered tool names
    pub fn names(&self) -> Vec<&str> {
        self.tools.iter().map(|t| t.name()).collect()
    }

    /// Discovery view of every tool
    pub fn list_available(&self) -> Vec<ToolSummary> {
        self.tools
            .iter()
            .map(|t| ToolSummary::from(t.definition()))
            .collect()
    }

    pub fn build_command(
        &self,
        tool_name: &str,
        template_id: &str,
        args: &HashMap<String, ArgumentValue>,
    ) -> Result<Vec<String>> {
        let command = self.require(tool_name)?.build(template_id, args)?;
        tracing::debug!("Built {} command: {}", tool_name, command.join(" "));
        Ok(command)
    }

    /// Check a command line; `Err` only for an unknown tool
    pub fn validate_command<S: AsRef<str>>(&self, tool_name: &str, command_args: &[S]) -> Result<bool> {
        let args: Vec<&str> = command_args.iter().map(AsRef::as_ref).collect();
        Ok(self.require(tool_name)?.validate_args(&args))
    }

    /// Build a command and check the substituted values against the tool's rules
    pub fn prepare_command(
        &self,
        tool_name: &str,
        template_id: &str,
        args: &HashMap<String, ArgumentValue>,
    ) -> Result<Vec<String>> {
        let tool = self.require(tool_name)?;
        let command = tool.build(template_id, args)?;
        let argv: Vec<&str> = command.iter().map(String::as_str).collect();
        if !tool.validate_args(&argv) {
            return Err(Error::InvalidCommand {
                tool: tool_name.to_string(),
                command: command.join(" "),
            });
        }
        tracing::debug!("Prepared {} command: {}", tool_name, command.join(" "));
        Ok(command)
    }

    /// Validate an externally supplied command line and return it with the
    /// base command and format arguments in place
    pub fn complete_command<S: AsRef<str>>(&self, tool_name: &str, command_args: &[S]) -> Result<Vec<String>> {
        let tool = self.require(tool_name)?;
        let definition = tool.definition();
        let args: Vec<&str> = command_args.iter().map(AsRef::as_ref).collect();

        if !tool.validate_args(&args) {
            return Err(Error::InvalidCommand {
                tool: tool_name.to_string(),
                command: args.join(" "),
            });
        }

        let args = match args.split_first() {
            Some((first, rest)) if *first == definition.base_command => rest,
            _ => args.as_slice(),
        };

        let mut command = Vec::with_capacity(1 + args.len() + definition.output_format_arguments.len());
        command.push(definition.base_command.clone());
        command.extend(args.iter().map(|a| a.to_string()));
        if !command.ends_with(&definition.output_format_arguments) {
            command.extend(definition.output_format_arguments.iter().cloned());
        }
        Ok(command)
    }

    /// Command that prints the tool's version
    pub fn version_command(&self, tool_name: &str) -> Result<Vec<String>> {
        Ok(self.require(tool_name)?.definition().version_command())
    }

    pub fn parse_version(&self, tool_name: &str, raw: &str) -> Result<Option<String>> {
        Ok(self.require(tool_name)?.parse_version(raw))
    }

    /// Parse raw tool output into findings.
    ///
    /// Never fails: an unknown tool yields a single info finding.
    pub fn parse(
        &self,
        tool_name: &str,
        raw_output: &str,
        command_used: &str,
        agent_id: Option<&str>,
    ) -> ParseResult {
        self.parse_with(tool_name, raw_output, &ParseContext::new(command_used, agent_id))
    }

    pub fn parse_with(&self, tool_name: &str, raw_output: &str, ctx: &ParseContext) -> ParseResult {
        match self.get(tool_name) {
            Some(tool) => {
                tracing::debug!(
                    "Parsing {} bytes of {} output",
                    raw_output.len(),
                    tool_name
                );
                tool.parse(raw_output, ctx)
            }
            None => {
                tracing::warn!("No parser registered for tool: {}", tool_name);
                unknown_tool_result(tool_name, ctx)
            }
        }
    }
}

fn unknown_tool_result(tool_name: &str, ctx: &ParseContext) -> ParseResult {
    let target = if ctx.command_used.is_empty() {
        tool_name.to_string()
    } else {
        ctx.command_used.clone()
    };
    let finding = ctx
        .finding(
            format!("unknown_tool_{}", tool_name),
            "Unknown Tool Output",
            Severity::Info,
        )
        .with_description(format!(
            "Output received for unsupported tool '{}'",
            tool_name
        ))
        .with_target(target);

    let mut result = ParseResult::empty_with_error(format!("Unknown tool: {}", tool_name));
    result.findings.push(finding);
    result
}

/// Discovery entry for one tool
#[derive(Debug, Clone, Serialize)]
pub struct ToolSummary {
    #[serde(rename = "type")]
    pub kind: &'static str,
    pub attributes: ToolAttributes,
}

#[derive(Debug, Clone, Serialize)]
pub struct ToolAttributes {
    pub name: String,
    pub description: String,
    pub cmd: String,
    pub export_format: OutputFormat,
    pub export_arguments: Vec<String>,
    pub version_arg: String,
    pub variants: Vec<VariantSummary>,
}

/// One command template as exposed for discovery
#[derive(Debug, Clone, Serialize)]
pub struct VariantSummary {
    pub id: String,
    pub display_name: String,
    pub args: Vec<String>,
    pub description: String,
    pub arguments: Vec<ArgumentDefinition>,
}

impl From<&ToolDefinition> for ToolSummary {
    fn from(definition: &ToolDefinition) -> Self {
        let variants = definition
            .templates
            .iter()
            .map(|template| VariantSummary {
                id: template.id.clone(),
                display_name: template.display_name.clone(),
                args: template.tokens.iter().map(ToString::to_string).collect(),
                description: template.description.clone(),
                arguments: template.argument_definitions.clone(),
            })
            .collect();

        Self {
            kind: "tools",
            attributes: ToolAttributes {
                name: definition.name.clone(),
                description: definition.description.clone(),
                cmd: definition.base_command.clone(),
                export_format: definition.output_format,
                export_arguments: definition.output_format_arguments.clone(),
                version_arg: definition.version_flag.clone(),
                variants,
            },
        }
    }
}

#[cfg(test)]
#[allow(clippy::unwrap_used, clippy::expect_used, clippy::indexing_slicing)]
mod tests {
    use super::*;
    use crate::config::NmapSeverityRules;

    fn args(pairs: &[(&str, &str)]) -> HashMap<String, ArgumentValue> {
        pairs
            .iter()
            .map(|(k, v)| (k.to_string(), ArgumentValue::from(*v)))
            .collect()
    }

    #[test]
    fn test_registry_contains_builtin_tools() {
        let registry = ToolRegistry::global();
        assert_eq!(registry.names(), vec!["nmap", "ffuf", "tshark"]);
        assert!(registry.get("nmap").is_some());
        assert!(registry.get("masscan").is_none());
    }

    #[test]
    fn test_register_rejects_duplicates() {
        let mut registry = ToolRegistry::empty();
        registry.register(Box::new(FfufTool::new())).unwrap();
        let err = registry.register(Box::new(FfufTool::new())).unwrap_err();
        assert!(matches!(err, Error::DuplicateTool(name) if name == "ffuf"));
    }

    #[test]
    fn test_build_command_unknown_tool() {
        let err = ToolRegistry::global()
            .build_command("masscan", "fast", &HashMap::new())
            .unwrap_err();
        assert!(matches!(err, Error::UnknownTool(name) if name == "masscan"));
    }

    #[test]
    fn test_validate_command_unknown_tool_is_error() {
        let registry = ToolRegistry::global();
        assert!(registry.validate_command("masscan", &["masscan", "-p80"]).is_err());
        assert!(registry
            .validate_command("nmap", &["nmap", "-A", "10.0.0.1"])
            .unwrap());
    }

    #[test]
    fn test_prepare_command_rejects_invalid_values() {
        let registry = ToolRegistry::global();
        let err = registry
            .prepare_command(
                "nmap",
                "tcp_connect_scan",
                &args(&[("ports", "100-50"), ("target", "10.0.0.1")]),
            )
            .unwrap_err();
        assert!(matches!(err, Error::InvalidCommand { .. }));

        let command = registry
            .prepare_command(
                "nmap",
                "tcp_connect_scan",
                &args(&[("ports", "22,80"), ("target", "10.0.0.1")]),
            )
            .unwrap();
        assert_eq!(
            command,
            vec!["nmap", "-sT", "-p", "22,80", "10.0.0.1", "-oX", "-"]
        );
    }

    #[test]
    fn test_complete_command_appends_format_args_once() {
        let registry = ToolRegistry::global();
        let command = registry
            .complete_command("tshark", &["-i", "eth0", "-a", "duration:10"])
            .unwrap();
        assert_eq!(
            command,
            vec!["tshark", "-i", "eth0", "-a", "duration:10", "-T", "json"]
        );

        let again = registry.complete_command("tshark", &command).unwrap();
        assert_eq!(again, command);

        assert!(matches!(
            registry.complete_command("tshark", &["-i", "eth0", "-a", "duration:0"]),
            Err(Error::InvalidCommand { .. })
        ));
    }

    #[test]
    fn test_version_probing() {
        let registry = ToolRegistry::global();
        assert_eq!(registry.version_command("ffuf").unwrap(), vec!["ffuf", "-V"]);
        assert_eq!(
            registry
                .parse_version("nmap", "Nmap version 7.80 ( https://nmap.org )")
                .unwrap(),
            Some("7.80".to_string())
        );
    }

    #[test]
    fn test_list_available_shape() {
        let summaries = ToolRegistry::global().list_available();
        assert_eq!(summaries.len(), 3);

        let value = serde_json::to_value(&summaries[0]).unwrap();
        assert_eq!(value["type"], "tools");
        assert_eq!(value["attributes"]["name"], "nmap");
        assert_eq!(value["attributes"]["export_format"], "xml");
        assert_eq!(value["attributes"]["version_arg"], "--version");
        assert_eq!(value["attributes"]["export_arguments"][0], "-oX");
        let variant = &value["attributes"]["variants"][1];
        assert_eq!(variant["id"], "tcp_connect_scan");
        assert_eq!(variant["args"][2], "{ports}");
        assert_eq!(variant["arguments"][0]["type"], "string");
        assert_eq!(variant["arguments"][0]["required"], true);
    }

    #[test]
    fn test_parse_unknown_tool_degrades() {
        let result = ToolRegistry::global().parse("masscan", "raw", "masscan -p80 host", None);
        assert_eq!(result.findings.len(), 1);
        let finding = &result.findings[0];
        assert_eq!(finding.severity, Severity::Info);
        assert_eq!(finding.id, "unknown_tool_masscan");
        assert_eq!(finding.agent_id, "unknown");
        assert!(result.statistics.contains_key("error"));
    }

    #[test]
    fn test_with_config_uses_severity_tables() {
        let mut config = EngineConfig::default();
        config.severity.nmap = NmapSeverityRules {
            high_ports: vec![],
            medium_ports: vec![],
            high_services: vec![],
            medium_services: vec![],
        };
        let registry = ToolRegistry::with_config(&config).unwrap();
        let xml = r#"<?xml version="1.0"?>
<nmaprun start="1700000000">
  <host>
    <status state="up"/>
    <address addr="10.0.0.5" addrtype="ipv4"/>
    <ports>
      <port protocol="tcp" portid="22"><state state="open"/><service name="ssh"/></port>
    </ports>
  </host>
</nmaprun>"#;
        let result = registry.parse("nmap", xml, "nmap -A 10.0.0.5", None);
        assert_eq!(result.findings.len(), 1);
        assert_eq!(result.findings[0].severity, Severity::Low);
    }
}
