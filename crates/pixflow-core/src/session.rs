//! One user session: file intake, tool selection, execution and download.

use std::sync::{Arc, Mutex, MutexGuard, PoisonError};

use serde::Serialize;
use tracing::{debug, info};

use crate::collab::Collaborators;
use crate::error::{PixflowError, Result};
use crate::executor::Executor;
use crate::intake::{AcceptRule, FileIntake, Preview};
use crate::models::{FileHandle, FileSet, ParamValue, ParamValues, PixflowConfig};
use crate::registry::{OptionsPanel, ToolDescriptor, ToolRegistry};
use crate::sink::{DownloadHandle, OutputSink, UrlHost};
use crate::tools::builtin_registry;

/// Published result of a successful run.
#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
pub struct RunOutcome {
    pub handle: DownloadHandle,
    pub summary: Vec<String>,
}

/// Ties the pipeline stages together for one UI.
pub struct Session<H: UrlHost> {
    intake: FileIntake,
    executor: Executor,
    host: Arc<H>,
    sink: Mutex<OutputSink<Arc<H>>>,
}

impl<H: UrlHost> Session<H> {
    pub fn new(registry: Arc<ToolRegistry>, host: H) -> Self {
        let host = Arc::new(host);
        Self {
            intake: FileIntake::new(),
            executor: Executor::new(registry),
            sink: Mutex::new(OutputSink::new(Arc::clone(&host))),
            host,
        }
    }

    /// Session over the built-in catalog.
    pub fn builtin(config: &PixflowConfig, collab: Collaborators, host: H) -> Result<Self> {
        let registry = builtin_registry(config, collab)?;
        Ok(Self::new(Arc::new(registry), host))
    }

    fn sink(&self) -> MutexGuard<'_, OutputSink<Arc<H>>> {
        self.sink.lock().unwrap_or_else(PoisonError::into_inner)
    }

    pub fn host(&self) -> &H {
        &self.host
    }

    pub fn registry(&self) -> &ToolRegistry {
        self.executor.registry()
    }

    /// Catalog listing, in registration order.
    pub fn tools(&self) -> impl Iterator<Item = &ToolDescriptor> {
        self.registry().tools()
    }

    pub fn active_tool(&self) -> Option<String> {
        self.executor.active_tool()
    }

    pub fn params(&self) -> ParamValues {
        self.executor.params()
    }

    pub fn is_busy(&self) -> bool {
        self.executor.state().is_busy()
    }

    pub fn select_tool(&self, tool_id: &str) -> Result<OptionsPanel> {
        self.executor.select_tool(tool_id)
    }

    pub fn set_param(&self, key: &str, value: impl Into<ParamValue>) -> Result<()> {
        self.executor.set_param(key, value.into())
    }

    pub fn options_panel(&self) -> Result<OptionsPanel> {
        self.executor.options_panel()
    }

    /// Replace the selection, checked against the active tool's allowlist.
    ///
    /// Without an active tool any file is accepted.
    pub fn accept(&self, files: Vec<FileHandle>) -> Result<Option<Preview>> {
        let active = self.executor.active_tool();
        let tool = active.as_deref().map(|id| self.registry().get(id)).transpose()?;
        let rule = tool.map(|t| AcceptRule {
            tool_id: &t.id,
            accepts: &t.accepts,
        });
        self.intake.accept(files, rule)
    }

    /// Snapshot of the current selection.
    pub fn files(&self) -> FileSet {
        self.intake.files()
    }

    pub fn clear_files(&self) {
        self.intake.clear();
    }

    /// Run the active tool on the current selection and publish the result.
    ///
    /// The selection is checked against the tool's allowlist again, since it
    /// may have been accepted before the tool was chosen.
    pub fn run(&self) -> Result<RunOutcome> {
        let tool_id = self.executor.active_tool().ok_or(PixflowError::NoActiveTool)?;
        let files = self.intake.files();

        let tool = self.registry().get(&tool_id)?;
        let rule = AcceptRule {
            tool_id: &tool.id,
            accepts: &tool.accepts,
        };
        files.iter().try_for_each(|file| rule.check(file))?;

        let artifact = self.executor.run(&tool_id, &files)?;
        let handle = self.sink().publish(&artifact)?;
        info!("{} ready for download as {}", tool_id, handle.filename);

        Ok(RunOutcome {
            handle,
            summary: artifact.summary,
        })
    }

    /// The live download handle, if a result is published.
    pub fn current_download(&self) -> Option<DownloadHandle> {
        self.sink().current().cloned()
    }

    /// Fire the user-initiated download; the handle is revoked afterwards.
    ///
    /// The trigger runs without the sink locked, so it may call back into the session.
    pub fn download<R>(&self, trigger: impl FnOnce(&DownloadHandle, &H) -> R) -> Option<R> {
        let Some(handle) = self.sink().take() else {
            debug!("Download requested with nothing published");
            return None;
        };

        let result = trigger(&handle, &self.host);
        self.host.revoke_url(&handle.url);
        debug!("Revoked {} after download", handle.url);
        Some(result)
    }
}
