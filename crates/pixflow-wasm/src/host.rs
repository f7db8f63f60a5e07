//! Blob URLs as download handles.
//!
//! Requires a browser environment (`wasm32-unknown-unknown` target).

use std::sync::Arc;

use js_sys::{Array, Uint8Array};
use wasm_bindgen::{JsCast, JsValue};
use web_sys::{Blob, BlobPropertyBag, HtmlAnchorElement, Url};

use pixflow_core::{DownloadHandle, SinkError, UrlHost};

/// Hands out `blob:` object URLs.
#[derive(Debug, Clone, Copy, Default)]
pub struct BlobUrlHost;

fn host_error(value: JsValue) -> SinkError {
    SinkError::Host(format!("{value:?}"))
}

impl UrlHost for BlobUrlHost {
    fn create_url(&self, bytes: &Arc<[u8]>, mime: &str) -> Result<String, SinkError> {
        let parts = Array::new();
        parts.push(&Uint8Array::from(&bytes[..]));

        let opts = BlobPropertyBag::new();
        opts.set_type(mime);

        let blob = Blob::new_with_u8_array_sequence_and_options(&parts, &opts).map_err(host_error)?;
        Url::create_object_url_with_blob(&blob).map_err(host_error)
    }

    fn revoke_url(&self, url: &str) {
        let _ = Url::revoke_object_url(url);
    }
}

/// Click a temporary `<a download>` pointing at the handle's URL.
///
/// The URL itself is left alone; the output sink revokes it afterwards.
pub fn click_download(handle: &DownloadHandle) -> Result<(), JsValue> {
    let window = web_sys::window().ok_or_else(|| JsValue::from_str("no global window"))?;
    let document = window
        .document()
        .ok_or_else(|| JsValue::from_str("no document"))?;

    let anchor: HtmlAnchorElement = document
        .create_element("a")?
        .dyn_into::<HtmlAnchorElement>()
        .map_err(|e| JsValue::from_str(&format!("failed to cast element: {e:?}")))?;
    anchor.set_href(&handle.url);
    anchor.set_download(&handle.filename);

    let body = document
        .body()
        .ok_or_else(|| JsValue::from_str("no document body"))?;
    body.append_child(&anchor)?;
    anchor.click();
    let _ = body.remove_child(&anchor);

    Ok(())
}
