//! Tool registry: tool ids mapped to parameter schemas and transforms.

use std::collections::HashMap;
use std::fmt;
use std::sync::Arc;

use serde::Serialize;
use tracing::debug;

use crate::error::{PixflowError, Result, TransformError};
use crate::models::{Choice, FileSet, ParamKind, ParamSpec, ParamValue, ParamValues, ResultArtifact};

/// A file transform registered under a tool id.
pub trait Transform: Send + Sync {
    /// Transform the file set with the captured parameter values.
    fn apply(&self, files: &FileSet, params: &ParamValues) -> std::result::Result<ResultArtifact, TransformError>;
}

impl<F> Transform for F
where
    F: Fn(&FileSet, &ParamValues) -> std::result::Result<ResultArtifact, TransformError> + Send + Sync,
{
    fn apply(&self, files: &FileSet, params: &ParamValues) -> std::result::Result<ResultArtifact, TransformError> {
        self(files, params)
    }
}

/// Immutable description of a tool.
#[derive(Clone)]
pub struct ToolDescriptor {
    pub id: String,
    pub title: String,
    pub description: String,
    pub params: Vec<ParamSpec>,
    /// Accepted MIME types (`image/*` wildcards allowed); empty accepts anything.
    pub accepts: Vec<String>,
    pub transform: Arc<dyn Transform>,
}

impl ToolDescriptor {
    pub fn new(id: &str, title: &str, transform: impl Transform + 'static) -> Self {
        Self {
            id: id.to_string(),
            title: title.to_string(),
            description: String::new(),
            params: Vec::new(),
            accepts: Vec::new(),
            transform: Arc::new(transform),
        }
    }

    pub fn with_description(mut self, description: &str) -> Self {
        self.description = description.to_string();
        self
    }

    pub fn with_param(mut self, spec: ParamSpec) -> Self {
        self.params.push(spec);
        self
    }

    pub fn accepting(mut self, mime: &str) -> Self {
        self.accepts.push(mime.to_string());
        self
    }

    pub fn param(&self, key: &str) -> Option<&ParamSpec> {
        self.params.iter().find(|p| p.key == key)
    }

    pub fn defaults(&self) -> ParamValues {
        ParamValues::defaults_of(&self.params)
    }
}

impl fmt::Debug for ToolDescriptor {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("ToolDescriptor")
            .field("id", &self.id)
            .field("title", &self.title)
            .field("params", &self.params)
            .field("accepts", &self.accepts)
            .finish_non_exhaustive()
    }
}

/// UI-agnostic description of a tool's options panel.
#[derive(Debug, Clone, PartialEq, Serialize)]
pub struct OptionsPanel {
    pub tool_id: String,
    pub title: String,
    pub controls: Vec<Control>,
}

/// One control in an options panel.
#[derive(Debug, Clone, PartialEq, Serialize)]
pub struct Control {
    pub key: String,
    pub label: String,
    pub control: ControlKind,
    pub value: ParamValue,
}

/// How a parameter is presented.
#[derive(Debug, Clone, PartialEq, Serialize)]
#[serde(tag = "type", rename_all = "snake_case")]
pub enum ControlKind {
    Slider { min: f64, max: f64, step: f64 },
    Select { options: Vec<Choice> },
    Checkbox,
}

impl From<&ParamKind> for ControlKind {
    fn from(kind: &ParamKind) -> Self {
        match kind {
            ParamKind::Number { min, max, step } => Self::Slider {
                min: *min,
                max: *max,
                step: *step,
            },
            ParamKind::Enum { choices } => Self::Select {
                options: choices.clone(),
            },
            ParamKind::Boolean => Self::Checkbox,
        }
    }
}

/// Registry of tools, kept in registration order.
#[derive(Debug, Default)]
pub struct ToolRegistry {
    tools: Vec<ToolDescriptor>,
    index: HashMap<String, usize>,
}

impl ToolRegistry {
    pub fn new() -> Self {
        Self::default()
    }

    /// Add a tool; fails if its id is taken.
    pub fn register(&mut self, descriptor: ToolDescriptor) -> Result<()> {
        if self.index.contains_key(&descriptor.id) {
            return Err(PixflowError::DuplicateTool(descriptor.id));
        }
        debug!("Registered tool {}", descriptor.id);
        self.index.insert(descriptor.id.clone(), self.tools.len());
        self.tools.push(descriptor);
        Ok(())
    }

    /// Look up a tool by id.
    pub fn get(&self, id: &str) -> Result<&ToolDescriptor> {
        self.index
            .get(id)
            .map(|&i| &self.tools[i])
            .ok_or_else(|| PixflowError::UnknownTool(id.to_string()))
    }

    pub fn contains(&self, id: &str) -> bool {
        self.index.contains_key(id)
    }

    /// Tools in registration order.
    pub fn tools(&self) -> impl Iterator<Item = &ToolDescriptor> {
        self.tools.iter()
    }

    pub fn len(&self) -> usize {
        self.tools.len()
    }

    pub fn is_empty(&self) -> bool {
        self.tools.is_empty()
    }

    /// Default parameter values of a tool.
    pub fn defaults(&self, id: &str) -> Result<ParamValues> {
        Ok(self.get(id)?.defaults())
    }

    /// Validate a single parameter value against a tool's schema.
    pub fn validate(&self, id: &str, key: &str, value: &ParamValue) -> Result<()> {
        let tool = self.get(id)?;
        let spec = tool.param(key).ok_or_else(|| PixflowError::InvalidParameter {
            key: key.to_string(),
            reason: format!("{} has no such parameter", id),
        })?;
        spec.check(value).map_err(|reason| PixflowError::InvalidParameter {
            key: key.to_string(),
            reason,
        })
    }

    /// Describe the options panel for a tool given the current values.
    ///
    /// Values that are missing or do not fit the schema fall back to defaults.
    pub fn render_options_panel(&self, id: &str, current: &ParamValues) -> Result<OptionsPanel> {
        let tool = self.get(id)?;

        let controls = tool
            .params
            .iter()
            .map(|spec| {
                let value = current
                    .get(&spec.key)
                    .filter(|v| spec.check(v).is_ok())
                    .unwrap_or(&spec.default)
                    .clone();
                Control {
                    key: spec.key.clone(),
                    label: spec.label.clone(),
                    control: ControlKind::from(&spec.kind),
                    value,
                }
            })
            .collect();

        Ok(OptionsPanel {
            tool_id: tool.id.clone(),
            title: tool.title.clone(),
            controls,
        })
    }
}
