//! Batch command - run one tool over every file matching a pattern.

use std::fs;
use std::path::{Path, PathBuf};
use std::time::Instant;

use clap::Args;
use console::style;
use glob::glob;
use indicatif::{ProgressBar, ProgressStyle};
use tracing::{debug, error, warn};

use pixflow_core::{FileHandle, MemoryHost, ParamValue, Session};

use super::{load_config, open_session, parse_setting, prepare_tool, save_download};

/// Arguments for the batch command.
#[derive(Args)]
pub struct BatchArgs {
    /// Tool id (see 'pixflow tools')
    tool: String,

    /// Glob pattern selecting the input files
    #[arg(required = true)]
    input: String,

    /// Output directory
    #[arg(short, long)]
    output_dir: PathBuf,

    /// Tool option as key=value, repeatable
    #[arg(short = 's', long = "set", value_parser = parse_setting)]
    settings: Vec<(String, ParamValue)>,

    /// Continue on error
    #[arg(long)]
    continue_on_error: bool,
}

/// Outcome for a single input.
struct FileResult {
    path: PathBuf,
    output: Option<PathBuf>,
    error: Option<String>,
}

pub async fn run(args: BatchArgs, config_path: Option<&str>) -> anyhow::Result<()> {
    let start = Instant::now();
    let config = load_config(config_path)?;
    let session = open_session(&config)?;
    prepare_tool(&session, &args.tool, &args.settings)?;

    let mut files: Vec<PathBuf> = glob(&args.input)?
        .filter_map(|r| r.ok())
        .filter(|p| p.is_file())
        .collect();
    files.sort();

    if files.is_empty() {
        anyhow::bail!("No matching files found for pattern: {}", args.input);
    }

    println!("{} Found {} files to process", style("ℹ").blue(), files.len());
    fs::create_dir_all(&args.output_dir)?;

    let progress = ProgressBar::new(files.len() as u64);
    progress.set_style(
        ProgressStyle::default_bar()
            .template("{spinner:.green} [{elapsed_precise}] [{bar:40.cyan/blue}] {pos}/{len} files")?
            .progress_chars("=>-"),
    );

    let mut results = Vec::with_capacity(files.len());

    for path in files {
        match process_file(&session, &path, &args.output_dir) {
            Ok(output) => {
                debug!("{} -> {}", path.display(), output.display());
                results.push(FileResult {
                    path,
                    output: Some(output),
                    error: None,
                });
            }
            Err(e) => {
                let error_msg = e.to_string();
                if args.continue_on_error {
                    warn!("Failed to process {}: {}", path.display(), error_msg);
                    results.push(FileResult {
                        path,
                        output: None,
                        error: Some(error_msg),
                    });
                } else {
                    progress.abandon();
                    error!("Failed to process {}: {}", path.display(), error_msg);
                    anyhow::bail!("Processing {} failed: {}", path.display(), error_msg);
                }
            }
        }

        progress.inc(1);
    }

    progress.finish_with_message("Complete");

    let failed: Vec<&FileResult> = results.iter().filter(|r| r.error.is_some()).collect();
    let succeeded = results.len() - failed.len();

    println!();
    println!(
        "{} Processed {} files in {:?}",
        style("✓").green(),
        results.len(),
        start.elapsed()
    );
    println!(
        "   {} successful, {} failed",
        style(succeeded).green(),
        style(failed.len()).red()
    );

    for result in results.iter().filter(|r| r.output.is_some()) {
        if let Some(output) = &result.output {
            println!("  {} -> {}", result.path.display(), output.display());
        }
    }

    if !failed.is_empty() {
        println!();
        println!("{}", style("Failed files:").red());
        for result in &failed {
            println!(
                "  - {}: {}",
                result.path.display(),
                result.error.as_deref().unwrap_or("unknown error")
            );
        }
    }

    Ok(())
}

fn process_file(session: &Session<MemoryHost>, path: &Path, output_dir: &Path) -> anyhow::Result<PathBuf> {
    let file = FileHandle::from_path(path)?;
    session.accept(vec![file])?;

    let outcome = session.run()?;
    let output = output_dir.join(output_name(path, &outcome.handle.filename));
    save_download(session, &output)?;
    Ok(output)
}

/// `photo.png` run through a tool producing `resized.jpg` becomes `photo-resized.jpg`.
fn output_name(input: &Path, filename: &str) -> String {
    match input.file_stem().and_then(|s| s.to_str()) {
        Some(stem) => format!("{}-{}", stem, filename),
        None => filename.to_string(),
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_output_name() {
        assert_eq!(output_name(Path::new("in/photo.png"), "resized.jpg"), "photo-resized.jpg");
        assert_eq!(output_name(Path::new("scan.pdf"), "compressed.pdf"), "scan-compressed.pdf");
    }
}
