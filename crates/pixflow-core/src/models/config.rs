//! Configuration structures for the tool catalog.

use serde::{Deserialize, Serialize};

/// Main configuration for pixflow.
#[derive(Debug, Clone, Default, Serialize, Deserialize)]
#[serde(default)]
pub struct PixflowConfig {
    /// Image-to-PDF defaults.
    pub pdf: PdfConfig,

    /// Image encoding defaults.
    pub image: ImageConfig,

    /// Background removal defaults.
    pub background: BackgroundConfig,

    /// User interface preferences.
    pub preferences: Preferences,
}

/// Image-to-PDF configuration.
#[derive(Debug, Clone, Serialize, Deserialize)]
#[serde(default)]
pub struct PdfConfig {
    /// Default page size (a4, letter, legal, fit).
    pub page_size: String,

    /// Default orientation (portrait, landscape, auto).
    pub orientation: String,

    /// Default page margin in millimetres.
    pub margin_mm: f64,

    /// JPEG quality used when embedding images into PDF pages.
    pub jpeg_quality: u8,
}

impl Default for PdfConfig {
    fn default() -> Self {
        Self {
            page_size: "a4".to_string(),
            orientation: "portrait".to_string(),
            margin_mm: 0.0,
            jpeg_quality: 92,
        }
    }
}

/// Image output configuration.
#[derive(Debug, Clone, Serialize, Deserialize)]
#[serde(default)]
pub struct ImageConfig {
    /// Default output format (jpg, png, webp).
    pub format: String,

    /// Default encoding quality (10 - 100).
    pub quality: u8,
}

impl Default for ImageConfig {
    fn default() -> Self {
        Self {
            format: "jpg".to_string(),
            quality: 90,
        }
    }
}

/// Background removal configuration.
#[derive(Debug, Clone, Serialize, Deserialize)]
#[serde(default)]
pub struct BackgroundConfig {
    /// Default strategy (segment, threshold).
    pub strategy: String,

    /// Brightness above which a pixel counts as background (0 - 255).
    pub threshold: u8,
}

impl Default for BackgroundConfig {
    fn default() -> Self {
        Self {
            strategy: "threshold".to_string(),
            threshold: 240,
        }
    }
}

/// Colour theme.
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum Theme {
    #[default]
    Light,
    Dark,
}

impl Theme {
    pub fn as_str(&self) -> &'static str {
        match self {
            Self::Light => "light",
            Self::Dark => "dark",
        }
    }

    pub fn from_str(s: &str) -> Option<Self> {
        match s.to_lowercase().as_str() {
            "light" => Some(Self::Light),
            "dark" => Some(Self::Dark),
            _ => None,
        }
    }

    pub fn toggled(self) -> Self {
        match self {
            Self::Light => Self::Dark,
            Self::Dark => Self::Light,
        }
    }
}

/// Persisted user preferences.
#[derive(Debug, Clone, Default, Serialize, Deserialize)]
#[serde(default)]
pub struct Preferences {
    pub theme: Theme,

    /// Set once the install banner has been dismissed.
    pub install_banner_dismissed: bool,
}

impl PixflowConfig {
    /// Load configuration from a JSON file.
    pub fn from_file(path: &std::path::Path) -> Result<Self, std::io::Error> {
        let content = std::fs::read_to_string(path)?;
        serde_json::from_str(&content).map_err(|e| {
            std::io::Error::new(std::io::ErrorKind::InvalidData, e.to_string())
        })
    }

    /// Save configuration to a JSON file.
    pub fn save(&self, path: &std::path::Path) -> Result<(), std::io::Error> {
        let content = serde_json::to_string_pretty(self).map_err(|e| {
            std::io::Error::new(std::io::ErrorKind::InvalidData, e.to_string())
        })?;
        std::fs::write(path, content)
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_partial_config_uses_defaults() {
        let config: PixflowConfig =
            serde_json::from_str(r#"{"background": {"threshold": 200}}"#).unwrap();
        assert_eq!(config.background.threshold, 200);
        assert_eq!(config.background.strategy, "threshold");
        assert_eq!(config.pdf.page_size, "a4");
        assert_eq!(config.preferences.theme, Theme::Light);
    }

    #[test]
    fn test_save_and_load() {
        let dir = tempfile::tempdir().unwrap();
        let path = dir.path().join("config.json");

        let mut config = PixflowConfig::default();
        config.preferences.theme = Theme::Dark;
        config.image.quality = 70;
        config.save(&path).unwrap();

        let loaded = PixflowConfig::from_file(&path).unwrap();
        assert_eq!(loaded.preferences.theme, Theme::Dark);
        assert_eq!(loaded.image.quality, 70);
    }

    #[test]
    fn test_theme_toggle() {
        assert_eq!(Theme::Light.toggled(), Theme::Dark);
        assert_eq!(Theme::from_str("DARK"), Some(Theme::Dark));
        assert_eq!(Theme::from_str("sepia"), None);
    }
}
