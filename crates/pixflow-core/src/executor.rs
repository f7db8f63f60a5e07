//! Single-flight transform executor.

use std::sync::atomic::{AtomicBool, Ordering};
use std::sync::{Arc, Mutex, MutexGuard, PoisonError};
use std::time::Instant;

use tracing::{debug, error, info, warn};

use crate::error::{PixflowError, Result};
use crate::models::{FileSet, ParamValue, ParamValues, ResultArtifact};
use crate::registry::{OptionsPanel, ToolRegistry};

/// Active tool and its current parameter values.
#[derive(Debug, Clone, Default)]
pub struct Selection {
    pub active_tool: Option<String>,
    pub params: ParamValues,
}

/// Execution state of one session.
#[derive(Debug, Default)]
pub struct ExecutionState {
    selection: Mutex<Selection>,
    busy: AtomicBool,
}

impl ExecutionState {
    fn selection(&self) -> MutexGuard<'_, Selection> {
        self.selection.lock().unwrap_or_else(PoisonError::into_inner)
    }

    pub fn is_busy(&self) -> bool {
        self.busy.load(Ordering::Acquire)
    }

    /// Claim the busy flag; `None` when a run is already in flight.
    fn try_claim(&self) -> Option<BusyGuard<'_>> {
        self.busy
            .compare_exchange(false, true, Ordering::AcqRel, Ordering::Acquire)
            .ok()
            .map(|_| BusyGuard { flag: &self.busy })
    }
}

/// Clears the busy flag on every exit path, including unwinding.
struct BusyGuard<'a> {
    flag: &'a AtomicBool,
}

impl Drop for BusyGuard<'_> {
    fn drop(&mut self) {
        self.flag.store(false, Ordering::Release);
    }
}

/// Runs registered transforms, at most one at a time.
#[derive(Debug)]
pub struct Executor {
    registry: Arc<ToolRegistry>,
    state: ExecutionState,
}

impl Executor {
    pub fn new(registry: Arc<ToolRegistry>) -> Self {
        Self {
            registry,
            state: ExecutionState::default(),
        }
    }

    pub fn registry(&self) -> &ToolRegistry {
        &self.registry
    }

    pub fn state(&self) -> &ExecutionState {
        &self.state
    }

    pub fn active_tool(&self) -> Option<String> {
        self.state.selection().active_tool.clone()
    }

    /// Current parameter values of the active tool.
    pub fn params(&self) -> ParamValues {
        self.state.selection().params.clone()
    }

    /// Make `tool_id` the active tool, resetting its parameters to defaults.
    pub fn select_tool(&self, tool_id: &str) -> Result<OptionsPanel> {
        let defaults = self.registry.defaults(tool_id)?;
        let panel = self.registry.render_options_panel(tool_id, &defaults)?;

        let mut selection = self.state.selection();
        selection.active_tool = Some(tool_id.to_string());
        selection.params = defaults;
        debug!("Selected tool {}", tool_id);

        Ok(panel)
    }

    /// Set one parameter of the active tool.
    pub fn set_param(&self, key: &str, value: ParamValue) -> Result<()> {
        let mut selection = self.state.selection();
        let tool_id = selection.active_tool.clone().ok_or(PixflowError::NoActiveTool)?;

        self.registry.validate(&tool_id, key, &value)?;
        selection.params.set(key, value);
        Ok(())
    }

    /// Options panel of the active tool with its current values.
    pub fn options_panel(&self) -> Result<OptionsPanel> {
        let selection = self.state.selection();
        let tool_id = selection.active_tool.as_deref().ok_or(PixflowError::NoActiveTool)?;
        self.registry.render_options_panel(tool_id, &selection.params)
    }

    /// Run `tool_id` over `files`.
    ///
    /// Parameters are captured once here: the current values when `tool_id`
    /// is the active tool, its defaults otherwise. A call made while another
    /// run is in flight fails with [`PixflowError::Busy`].
    pub fn run(&self, tool_id: &str, files: &FileSet) -> Result<ResultArtifact> {
        let tool = self.registry.get(tool_id)?;

        if files.is_empty() {
            return Err(PixflowError::NoFiles);
        }

        let Some(_guard) = self.state.try_claim() else {
            warn!("Rejected run of {}: another run is in flight", tool_id);
            return Err(PixflowError::Busy);
        };

        let params = {
            let selection = self.state.selection();
            if selection.active_tool.as_deref() == Some(tool_id) {
                selection.params.clone()
            } else {
                tool.defaults()
            }
        };

        let start = Instant::now();
        info!("Running {} on {} file(s)", tool_id, files.len());

        match tool.transform.apply(files, &params) {
            Ok(artifact) => {
                info!(
                    "{} produced {} ({} bytes) in {:?}",
                    tool_id,
                    artifact.filename,
                    artifact.size(),
                    start.elapsed()
                );
                Ok(artifact)
            }
            Err(cause) => {
                error!("{} failed after {:?}: {}", tool_id, start.elapsed(), cause);
                Err(PixflowError::Transform {
                    tool_id: tool_id.to_string(),
                    cause,
                })
            }
        }
    }
}
