//! Subcommand handlers

use std::collections::HashMap;
use std::io::Read;
use std::path::{Path, PathBuf};

use anyhow::{Context, Result, bail};
use pentulz_core::ToolRegistry;
use pentulz_core::config::EngineConfig;
use pentulz_core::reports::{self, InMemoryJobSource, ReportAggregator};
use pentulz_core::tools::ArgumentValue;

use crate::args::{Command, ReportFormat};

/// Outcome of a subcommand that maps onto the process exit code
pub enum Outcome {
    Success,
    Rejected,
}

pub fn load_config(path: Option<&Path>) -> Result<EngineConfig> {
    match path {
        Some(path) => EngineConfig::from_file(path)
            .with_context(|| format!("Failed to load config from {}", path.display())),
        None => Ok(EngineConfig::load_default()),
    }
}

pub fn run(command: Command, config: &EngineConfig) -> Result<Outcome> {
    let registry = ToolRegistry::with_config(config)?;

    match command {
        Command::Tools { json } => list_tools(&registry, json)?,
        Command::Build {
            tool,
            template,
            args,
        } => {
            let args: HashMap<String, ArgumentValue> = args
                .into_iter()
                .map(|(name, value)| (name, ArgumentValue::from(value)))
                .collect();
            let command = registry.prepare_command(&tool, &template, &args)?;
            println!("{}", command.join(" "));
        }
        Command::Validate { tool, command } => {
            if registry.validate_command(&tool, &command)? {
                println!("valid");
            } else {
                println!("invalid");
                return Ok(Outcome::Rejected);
            }
        }
        Command::Complete { tool, command } => {
            let command = registry.complete_command(&tool, &command)?;
            println!("{}", command.join(" "));
        }
        Command::Version { tool, output } => match output {
            None => println!("{}", registry.version_command(&tool)?.join(" ")),
            Some(path) => {
                let raw = read_input(Some(&path))?;
                match registry.parse_version(&tool, &raw)? {
                    Some(version) => println!("{}", version),
                    None => {
                        eprintln!("No {} version found in {}", tool, path.display());
                        return Ok(Outcome::Rejected);
                    }
                }
            }
        },
        Command::Parse {
            tool,
            input,
            command_used,
            agent,
        } => {
            let raw = read_input(input.as_deref())?;
            let result = registry.parse(&tool, &raw, &command_used, agent.as_deref());
            println!("{}", serde_json::to_string_pretty(&result)?);
        }
        Command::Report {
            jobs,
            ids,
            name,
            format,
            output,
        } => report(&registry, config, &jobs, ids, name.as_deref(), format, output)?,
    }

    Ok(Outcome::Success)
}

fn list_tools(registry: &ToolRegistry, json: bool) -> Result<()> {
    if json {
        println!("{}", serde_json::to_string_pretty(&registry.list_available())?);
        return Ok(());
    }

    for tool in registry.all() {
        println!("{} - {}", tool.name, tool.description);
        for template in &tool.templates {
            let placeholders: Vec<&str> = template.placeholders().collect();
            println!(
                "  {:<28} {}",
                template.id,
                if placeholders.is_empty() {
                    template.display_name.clone()
                } else {
                    format!("{} [{}]", template.display_name, placeholders.join(", "))
                }
            );
        }
    }
    Ok(())
}

fn report(
    registry: &ToolRegistry,
    config: &EngineConfig,
    jobs: &Path,
    ids: Vec<String>,
    name: Option<&str>,
    format: ReportFormat,
    output: Option<PathBuf>,
) -> Result<()> {
    let source = InMemoryJobSource::from_file(jobs)
        .with_context(|| format!("Failed to read jobs from {}", jobs.display()))?;
    let ids = if ids.is_empty() { source.ids() } else { ids };
    if ids.is_empty() {
        bail!("No jobs to report on in {}", jobs.display());
    }

    let report = ReportAggregator::new(registry, &source)
        .with_config(&config.report)
        .generate(&ids, name)?;
    tracing::info!(
        "Report {} covers {} jobs with {} findings",
        report.metadata.report_id,
        report.metadata.total_jobs,
        report.metadata.total_findings
    );

    match (format, output) {
        (ReportFormat::Json, Some(path)) => reports::export_json(&report, &path)?,
        (ReportFormat::Markdown, Some(path)) => reports::export_markdown(&report, &path)?,
        (ReportFormat::Json, None) => println!("{}", reports::to_json(&report)?),
        (ReportFormat::Markdown, None) => print!("{}", reports::generate_markdown(&report)),
    }
    Ok(())
}

fn read_input(path: Option<&Path>) -> Result<String> {
    match path {
        Some(path) if path != Path::new("-") => std::fs::read_to_string(path)
            .with_context(|| format!("Failed to read {}", path.display())),
        _ => {
            let mut raw = String::new();
            std::io::stdin()
                .read_to_string(&mut raw)
                .context("Failed to read stdin")?;
            Ok(raw)
        }
    }
}

#[cfg(test)]
#[allow(clippy::unwrap_used, clippy::expect_used, clippy::indexing_slicing)]
mod tests {
    use super::*;

    #[test]
    fn test_load_config_from_file() {
        let dir = tempfile::tempdir().unwrap();
        let path = dir.path().join("pentulz.toml");
        std::fs::write(&path, "[report]\ndefault_name = \"Nightly\"\n").unwrap();

        let config = load_config(Some(&path)).unwrap();
        assert_eq!(config.report.default_name, "Nightly");
        assert!(load_config(Some(&dir.path().join("missing.toml"))).is_err());
    }

    #[test]
    fn test_report_writes_markdown() {
        let dir = tempfile::tempdir().unwrap();
        let jobs = dir.path().join("jobs.json");
        std::fs::write(
            &jobs,
            r#"[{"id":"1","tool_name":"ffuf","raw_output":"{\"results\":[{\"url\":\"http://h/a\",\"status\":200,\"length\":5}]}","action":{"cmd":"ffuf","args":[]}}]"#,
        )
        .unwrap();
        let output = dir.path().join("report.md");
        let config = EngineConfig::default();
        let registry = ToolRegistry::with_config(&config).unwrap();

        report(
            &registry,
            &config,
            &jobs,
            Vec::new(),
            Some("CLI Report"),
            ReportFormat::Markdown,
            Some(output.clone()),
        )
        .unwrap();

        let markdown = std::fs::read_to_string(&output).unwrap();
        assert!(markdown.starts_with("# CLI Report"));
        assert!(markdown.contains("### ffuf (1 jobs, 1 findings)"));
    }

    #[test]
    fn test_report_without_jobs_fails() {
        let dir = tempfile::tempdir().unwrap();
        let jobs = dir.path().join("jobs.json");
        std::fs::write(&jobs, "[]").unwrap();
        let config = EngineConfig::default();
        let registry = ToolRegistry::with_config(&config).unwrap();

        let err = report(
            &registry,
            &config,
            &jobs,
            Vec::new(),
            None,
            ReportFormat::Json,
            None,
        )
        .unwrap_err();
        assert!(err.to_string().contains("No jobs"));
    }
}
