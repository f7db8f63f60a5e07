//! WASM bindings for the PixFlow tools.
//!
//! This crate provides WebAssembly bindings for use in browsers. Results are
//! handed out as `blob:` URLs that are revoked once downloaded or superseded.

mod host;
mod prefs;

use std::path::Path;

use js_sys::{Array, Reflect, Uint8Array};
use serde::Serialize;
use wasm_bindgen::prelude::*;
use wasm_bindgen_futures::JsFuture;

use pixflow_core::models::mime_from_path;
use pixflow_core::{Collaborators, FileHandle, ParamValue, PixflowConfig, Session, ToolDescriptor};

pub use host::BlobUrlHost;

/// Initialize panic hook for better error messages in console.
#[wasm_bindgen(start)]
pub fn init() {
    #[cfg(feature = "console_error_panic_hook")]
    console_error_panic_hook::set_once();
}

/// Version information.
#[wasm_bindgen]
pub fn version() -> String {
    env!("CARGO_PKG_VERSION").to_string()
}

fn js_error(err: impl std::fmt::Display) -> JsValue {
    JsValue::from_str(&err.to_string())
}

fn to_js<T: Serialize>(value: &T) -> Result<JsValue, JsValue> {
    serde_wasm_bindgen::to_value(value).map_err(js_error)
}

/// Current theme (`light` or `dark`).
#[wasm_bindgen]
pub fn theme() -> String {
    prefs::load_theme().as_str().to_string()
}

/// Switch between light and dark, returning the new theme.
#[wasm_bindgen]
pub fn toggle_theme() -> Result<String, JsValue> {
    let theme = prefs::load_theme().toggled();
    prefs::save_theme(theme)?;
    Ok(theme.as_str().to_string())
}

#[wasm_bindgen]
pub fn install_banner_dismissed() -> bool {
    prefs::banner_dismissed()
}

#[wasm_bindgen]
pub fn dismiss_install_banner() -> Result<(), JsValue> {
    prefs::dismiss_banner()
}

/// Read a `FileList` into `{name, type, bytes}` objects for [`PixflowApp::accept`].
#[wasm_bindgen]
pub async fn read_files(list: web_sys::FileList) -> Result<Array, JsValue> {
    let out = Array::new();

    for index in 0..list.length() {
        let Some(file) = list.get(index) else {
            continue;
        };
        let buffer = JsFuture::from(file.array_buffer()).await?;

        let entry = js_sys::Object::new();
        Reflect::set(&entry, &"name".into(), &file.name().into())?;
        Reflect::set(&entry, &"type".into(), &file.type_().into())?;
        Reflect::set(&entry, &"bytes".into(), &Uint8Array::new(&buffer))?;
        out.push(&entry);
    }

    Ok(out)
}

fn file_from_js(value: &JsValue) -> Result<FileHandle, JsValue> {
    let name = Reflect::get(value, &"name".into())?
        .as_string()
        .ok_or_else(|| JsValue::from_str("file entry without a name"))?;
    let mime = Reflect::get(value, &"type".into())?
        .as_string()
        .filter(|m| !m.is_empty())
        .unwrap_or_else(|| mime_from_path(Path::new(&name)).to_string());
    let bytes = Uint8Array::new(&Reflect::get(value, &"bytes".into())?).to_vec();

    Ok(FileHandle::new(name, mime, bytes))
}

/// Catalog entry exposed to JavaScript.
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

/// Tool session for browser use.
#[wasm_bindgen]
pub struct PixflowApp {
    session: Session<BlobUrlHost>,
}

#[wasm_bindgen]
impl PixflowApp {
    /// Create a session; `config` is an optional configuration object.
    #[wasm_bindgen(constructor)]
    pub fn new(config: JsValue) -> Result<PixflowApp, JsValue> {
        let config: PixflowConfig = if config.is_undefined() || config.is_null() {
            PixflowConfig::default()
        } else {
            serde_wasm_bindgen::from_value(config)?
        };

        let collab = Collaborators::new(config.pdf.jpeg_quality);
        let session = Session::builtin(&config, collab, BlobUrlHost).map_err(js_error)?;
        Ok(Self { session })
    }

    /// Catalog of available tools.
    #[wasm_bindgen]
    pub fn tools(&self) -> Result<JsValue, JsValue> {
        let tools: Vec<ToolInfo> = self.session.tools().map(ToolInfo::from).collect();
        to_js(&tools)
    }

    /// Activate a tool and return its options panel.
    #[wasm_bindgen]
    pub fn select_tool(&self, tool_id: &str) -> Result<JsValue, JsValue> {
        let panel = self.session.select_tool(tool_id).map_err(js_error)?;
        to_js(&panel)
    }

    /// Set an option of the active tool (boolean, number or string).
    #[wasm_bindgen]
    pub fn set_param(&self, key: &str, value: JsValue) -> Result<(), JsValue> {
        let value: ParamValue = serde_wasm_bindgen::from_value(value)?;
        self.session.set_param(key, value).map_err(js_error)
    }

    #[wasm_bindgen]
    pub fn options_panel(&self) -> Result<JsValue, JsValue> {
        let panel = self.session.options_panel().map_err(js_error)?;
        to_js(&panel)
    }

    /// Replace the selection with `{name, type, bytes}` entries.
    ///
    /// Returns the preview, or `null` for an empty selection.
    #[wasm_bindgen]
    pub fn accept(&self, files: Array) -> Result<JsValue, JsValue> {
        let files = files
            .iter()
            .map(|entry| file_from_js(&entry))
            .collect::<Result<Vec<_>, _>>()?;

        match self.session.accept(files).map_err(js_error)? {
            Some(preview) => to_js(&preview),
            None => Ok(JsValue::NULL),
        }
    }

    /// Bytes of the first selected file when it is an image.
    #[wasm_bindgen]
    pub fn thumbnail(&self) -> Option<Uint8Array> {
        let files = self.session.files();
        files
            .first()
            .filter(|f| f.is_image())
            .map(|f| Uint8Array::from(f.bytes()))
    }

    /// Run the active tool; returns `{handle, summary}`.
    #[wasm_bindgen]
    pub fn run(&self) -> Result<JsValue, JsValue> {
        let outcome = self.session.run().map_err(js_error)?;
        to_js(&outcome)
    }

    /// Download the published result. Returns `false` when there is none.
    #[wasm_bindgen]
    pub fn download(&self) -> Result<bool, JsValue> {
        match self.session.download(|handle, _host| host::click_download(handle)) {
            Some(clicked) => clicked.map(|_| true),
            None => Ok(false),
        }
    }

    #[wasm_bindgen]
    pub fn is_busy(&self) -> bool {
        self.session.is_busy()
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use wasm_bindgen_test::*;

    wasm_bindgen_test_configure!(run_in_browser);

    #[wasm_bindgen_test]
    fn test_catalog() {
        let app = PixflowApp::new(JsValue::UNDEFINED).unwrap();
        let tools: Vec<serde_json::Value> = serde_wasm_bindgen::from_value(app.tools().unwrap()).unwrap();
        assert_eq!(tools.len(), 6);
        assert_eq!(tools[0]["id"], "image-to-pdf");
    }

    #[wasm_bindgen_test]
    fn test_set_param_from_js() {
        let app = PixflowApp::new(JsValue::UNDEFINED).unwrap();
        app.select_tool("image-resizer").unwrap();
        app.set_param("scale", JsValue::from_f64(50.0)).unwrap();
        app.set_param("maintain_aspect", JsValue::TRUE).unwrap();
        assert!(app.set_param("scale", JsValue::from_f64(5.0)).is_err());
        assert!(app.set_param("format", JsValue::from_str("gif")).is_err());
    }

    #[wasm_bindgen_test]
    fn test_accept_rejects_wrong_type() {
        let app = PixflowApp::new(JsValue::UNDEFINED).unwrap();
        app.select_tool("pdf-merger").unwrap();

        let entry = js_sys::Object::new();
        Reflect::set(&entry, &"name".into(), &"photo.png".into()).unwrap();
        Reflect::set(&entry, &"type".into(), &"image/png".into()).unwrap();
        Reflect::set(&entry, &"bytes".into(), &Uint8Array::from(&[1u8, 2, 3][..])).unwrap();
        let files = Array::of1(&entry);

        assert!(app.accept(files).is_err());
        assert!(app.accept(Array::new()).unwrap().is_null());
    }

    #[wasm_bindgen_test]
    fn test_theme_toggle_persists() {
        let before = theme();
        let after = toggle_theme().unwrap();
        assert_ne!(before, after);
        assert_eq!(theme(), after);
        toggle_theme().unwrap();
    }
}
