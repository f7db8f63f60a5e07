//! Preferences persisted in `localStorage`.

use wasm_bindgen::JsValue;
use web_sys::Storage;

use pixflow_core::Theme;

const THEME_KEY: &str = "theme";
const BANNER_KEY: &str = "install-banner-dismissed";

fn storage() -> Option<Storage> {
    web_sys::window()?.local_storage().ok()?
}

fn read(key: &str) -> Option<String> {
    storage()?.get_item(key).ok()?
}

fn write(key: &str, value: &str) -> Result<(), JsValue> {
    let storage = storage().ok_or_else(|| JsValue::from_str("localStorage is not available"))?;
    storage.set_item(key, value)
}

/// Stored theme; light when unset or unreadable.
pub fn load_theme() -> Theme {
    read(THEME_KEY)
        .and_then(|value| Theme::from_str(&value))
        .unwrap_or_default()
}

pub fn save_theme(theme: Theme) -> Result<(), JsValue> {
    write(THEME_KEY, theme.as_str())
}

pub fn banner_dismissed() -> bool {
    read(BANNER_KEY).is_some_and(|value| value == "true")
}

pub fn dismiss_banner() -> Result<(), JsValue> {
    write(BANNER_KEY, "true")
}
