//! Run command - apply one tool to a selection of files.

use std::path::{Path, PathBuf};
use std::time::{Duration, Instant};

use clap::Args;
use console::style;
use indicatif::{ProgressBar, ProgressStyle};
use tracing::info;

use pixflow_core::{FileHandle, ParamValue};

use super::{load_config, open_session, parse_setting, prepare_tool, save_download};

/// Arguments for the run command.
#[derive(Args)]
pub struct RunArgs {
    /// Tool id (see 'pixflow tools')
    tool: String,

    /// Input files, in order
    #[arg(required = true)]
    inputs: Vec<PathBuf>,

    /// Output file or directory (default: the tool's file name in the current directory)
    #[arg(short, long)]
    output: Option<PathBuf>,

    /// Tool option as key=value, repeatable
    #[arg(short = 's', long = "set", value_parser = parse_setting)]
    settings: Vec<(String, ParamValue)>,
}

pub async fn run(args: RunArgs, config_path: Option<&str>) -> anyhow::Result<()> {
    let start = Instant::now();
    let config = load_config(config_path)?;
    let session = open_session(&config)?;

    prepare_tool(&session, &args.tool, &args.settings)?;

    let mut files = Vec::with_capacity(args.inputs.len());
    for path in &args.inputs {
        if !path.exists() {
            anyhow::bail!("Input file not found: {}", path.display());
        }
        files.push(FileHandle::from_path(path)?);
    }

    if let Some(preview) = session.accept(files)? {
        for file in &preview.files {
            println!("{} {} ({})", style("•").dim(), file.name, file.size_label);
        }
    }

    let spinner = ProgressBar::new_spinner();
    spinner.set_style(ProgressStyle::default_spinner().template("{spinner:.green} {msg}")?);
    spinner.set_message(format!("Running {}...", args.tool));
    spinner.enable_steady_tick(Duration::from_millis(100));

    let outcome = session.run();
    spinner.finish_and_clear();
    let outcome = outcome?;

    let output_path = resolve_output(args.output.as_deref(), &outcome.handle.filename);
    let written = save_download(&session, &output_path)?;
    info!("{} finished in {:?}", args.tool, start.elapsed());

    for line in &outcome.summary {
        println!("  {}", line);
    }
    println!(
        "{} Saved {} ({} bytes)",
        style("✓").green(),
        output_path.display(),
        written
    );

    Ok(())
}

/// An existing directory receives the tool's file name; anything else is taken as the file path.
fn resolve_output(output: Option<&Path>, filename: &str) -> PathBuf {
    match output {
        Some(path) if path.is_dir() => path.join(filename),
        Some(path) => path.to_path_buf(),
        None => PathBuf::from(filename),
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_resolve_output() {
        let dir = tempfile::tempdir().unwrap();
        assert_eq!(resolve_output(Some(dir.path()), "converted.pdf"), dir.path().join("converted.pdf"));
        assert_eq!(
            resolve_output(Some(Path::new("out/a.pdf")), "converted.pdf"),
            PathBuf::from("out/a.pdf")
        );
        assert_eq!(resolve_output(None, "resized.png"), PathBuf::from("resized.png"));
    }
}
