//! Building concrete command lines from templates and checking them back

use std::collections::HashMap;

use super::definition::{ArgumentValue, CommandTemplate, TemplateToken, ToolDefinition};
use crate::{Error, Result};

/// Substitute `args` into a template and append the tool's format arguments.
///
/// Missing placeholders take the argument's default value; a placeholder
/// with neither fails with [`Error::MissingRequiredArgument`].
pub fn build_command(
    tool: &ToolDefinition,
    template_id: &str,
    args: &HashMap<String, ArgumentValue>,
) -> Result<Vec<String>> {
    let template = tool
        .template(template_id)
        .ok_or_else(|| Error::UnknownTemplate {
            tool: tool.name.clone(),
            template: template_id.to_string(),
        })?;

    let mut command = Vec::with_capacity(
        1 + template.tokens.len() + tool.output_format_arguments.len(),
    );
    command.push(tool.base_command.clone());

    for token in &template.tokens {
        match token.placeholder_name() {
            None => command.push(token.fill("")),
            Some(name) => {
                let value = resolve_argument(template, name, args)?;
                command.push(token.fill(&value));
            }
        }
    }

    if !command.ends_with(&tool.output_format_arguments) {
        command.extend(tool.output_format_arguments.iter().cloned());
    }

    Ok(command)
}

fn resolve_argument(
    template: &CommandTemplate,
    name: &str,
    args: &HashMap<String, ArgumentValue>,
) -> Result<String> {
    if let Some(value) = args.get(name) {
        return Ok(value.to_string());
    }
    template
        .argument(name)
        .and_then(|definition| definition.default_value.as_ref())
        .map(ToString::to_string)
        .ok_or_else(|| Error::MissingRequiredArgument(name.to_string()))
}

/// Check a command line against every template of `tool`.
///
/// A leading base command and trailing format arguments are ignored. The
/// remaining arguments must match one template token-for-token: literals
/// exactly, placeholders through `validate_placeholder(name, value)`.
pub fn validate_command<S, F>(
    tool: &ToolDefinition,
    command_args: &[S],
    validate_placeholder: F,
) -> bool
where
    S: AsRef<str>,
    F: Fn(&str, &str) -> bool,
{
    let args: Vec<&str> = command_args.iter().map(AsRef::as_ref).collect();
    if args.is_empty() {
        return false;
    }

    let args = match args.split_first() {
        Some((first, rest)) if *first == tool.base_command => rest,
        _ => args.as_slice(),
    };

    let format_args: Vec<&str> = tool
        .output_format_arguments
        .iter()
        .map(String::as_str)
        .collect();
    let stripped = if !format_args.is_empty() && args.ends_with(&format_args) {
        args.get(..args.len() - format_args.len())
    } else {
        None
    };

    let matches_any = |candidate: &[&str]| {
        tool.templates
            .iter()
            .any(|template| matches_template(template, candidate, &validate_placeholder))
    };

    stripped.is_some_and(|candidate| matches_any(candidate)) || matches_any(args)
}

fn matches_template<F>(
    template: &CommandTemplate,
    args: &[&str],
    validate_placeholder: &F,
) -> bool
where
    F: Fn(&str, &str) -> bool,
{
    if args.len() != template.tokens.len() {
        return false;
    }

    template
        .tokens
        .iter()
        .zip(args)
        .all(|(token, arg)| match token {
            TemplateToken::Literal(literal) => literal.as_str() == *arg,
            TemplateToken::Placeholder(name) | TemplateToken::Embedded { name, .. } => token
                .extract(arg)
                .is_some_and(|value| !value.trim().is_empty() && validate_placeholder(name, value)),
        })
}
