//! Subcommands and the helpers they share.

pub mod batch;
pub mod config;
pub mod run;
pub mod tools;

use std::fs;
use std::path::{Path, PathBuf};

use tracing::debug;

use pixflow_core::{Collaborators, MemoryHost, ParamValue, PixflowConfig, Session};

/// `<config_dir>/pixflow/config.json`
pub fn default_config_path() -> PathBuf {
    dirs::config_dir()
        .unwrap_or_else(|| PathBuf::from("."))
        .join("pixflow")
        .join("config.json")
}

/// The `--config` path when given, the default location otherwise.
pub fn config_path(config_path: Option<&str>) -> PathBuf {
    config_path.map(PathBuf::from).unwrap_or_else(default_config_path)
}

/// Load the configuration. An explicit path must exist; a missing default file means defaults.
pub fn load_config(config_path: Option<&str>) -> anyhow::Result<PixflowConfig> {
    match config_path {
        Some(path) => Ok(PixflowConfig::from_file(Path::new(path))?),
        None => {
            let path = default_config_path();
            if path.exists() {
                debug!("Loading config from {}", path.display());
                Ok(PixflowConfig::from_file(&path)?)
            } else {
                Ok(PixflowConfig::default())
            }
        }
    }
}

/// Session over the built-in catalog with in-memory download handles.
pub fn open_session(config: &PixflowConfig) -> anyhow::Result<Session<MemoryHost>> {
    let collab = Collaborators::new(config.pdf.jpeg_quality);
    Ok(Session::builtin(config, collab, MemoryHost::new())?)
}

/// Parse a `key=value` tool setting.
pub fn parse_setting(raw: &str) -> Result<(String, ParamValue), String> {
    let (key, value) = raw
        .split_once('=')
        .ok_or_else(|| format!("expected key=value, got '{}'", raw))?;
    let key = key.trim();
    if key.is_empty() {
        return Err(format!("missing key in '{}'", raw));
    }
    Ok((key.to_string(), ParamValue::parse(value.trim())))
}

/// Select `tool` and apply the settings on top of its defaults.
pub fn prepare_tool(
    session: &Session<MemoryHost>,
    tool: &str,
    settings: &[(String, ParamValue)],
) -> anyhow::Result<()> {
    session.select_tool(tool)?;
    for (key, value) in settings {
        session.set_param(key, value.clone())?;
    }
    Ok(())
}

/// Save the published result to `path` and release its handle.
pub fn save_download(session: &Session<MemoryHost>, path: &Path) -> anyhow::Result<u64> {
    let bytes = session
        .download(|handle, host| host.resolve(&handle.url))
        .flatten()
        .ok_or_else(|| anyhow::anyhow!("No result to save"))?;

    if let Some(parent) = path.parent().filter(|p| !p.as_os_str().is_empty()) {
        fs::create_dir_all(parent)?;
    }
    fs::write(path, &bytes)?;
    debug!("Wrote {} bytes to {}", bytes.len(), path.display());
    Ok(bytes.len() as u64)
}
