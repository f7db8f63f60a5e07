//! Tools command - list the catalog and describe option panels.

use clap::Args;
use console::style;
use serde::Serialize;

use pixflow_core::registry::ControlKind;
use pixflow_core::{OptionsPanel, ParamValue, ToolDescriptor};

use super::{load_config, open_session};

/// Arguments for the tools command.
#[derive(Args)]
pub struct ToolsArgs {
    /// Show the options of a single tool
    #[arg(short, long)]
    tool: Option<String>,

    /// Print JSON instead of text
    #[arg(long)]
    json: bool,
}

/// Catalog entry as printed.
#[derive(Serialize)]
struct ToolInfo<'a> {
    id: &'a str,
    title: &'a str,
    description: &'a str,
    accepts: &'a [String],
}

impl<'a> From<&'a ToolDescriptor> for ToolInfo<'a> {
    fn from(tool: &'a ToolDescriptor) -> Self {
        Self {
            id: &tool.id,
            title: &tool.title,
            description: &tool.description,
            accepts: &tool.accepts,
        }
    }
}

pub async fn run(args: ToolsArgs, config_path: Option<&str>) -> anyhow::Result<()> {
    let config = load_config(config_path)?;
    let session = open_session(&config)?;

    if let Some(tool_id) = args.tool {
        let panel = session.select_tool(&tool_id)?;
        if args.json {
            println!("{}", serde_json::to_string_pretty(&panel)?);
        } else {
            print_panel(&panel);
        }
        return Ok(());
    }

    let tools: Vec<ToolInfo> = session.tools().map(ToolInfo::from).collect();
    if args.json {
        println!("{}", serde_json::to_string_pretty(&tools)?);
        return Ok(());
    }

    for tool in &tools {
        println!("{:<18} {}", style(tool.id).cyan().bold(), tool.title);
        if !tool.description.is_empty() {
            println!("{:<18} {}", "", style(tool.description).dim());
        }
    }
    println!();
    println!("Run 'pixflow tools --tool <ID>' to see a tool's options.");

    Ok(())
}

fn print_panel(panel: &OptionsPanel) {
    println!("{} ({})", style(&panel.title).bold(), panel.tool_id);

    if panel.controls.is_empty() {
        println!("  No options");
        return;
    }

    for control in &panel.controls {
        let range = match &control.control {
            ControlKind::Slider { min, max, .. } => format!("{}..{}", min, max),
            ControlKind::Select { options } => options
                .iter()
                .map(|o| o.value.as_str())
                .collect::<Vec<_>>()
                .join("|"),
            ControlKind::Checkbox => "true|false".to_string(),
        };

        println!(
            "  {:<16} {:<24} default {:<10} {}",
            style(&control.key).cyan(),
            control.label,
            format_value(&control.value),
            style(range).dim()
        );
    }
}

fn format_value(value: &ParamValue) -> String {
    match value {
        ParamValue::Flag(b) => b.to_string(),
        ParamValue::Number(n) => n.to_string(),
        ParamValue::Choice(c) => c.clone(),
    }
}
