//! Renderer configuration.
//!
//! Everything here is deployment-specific: where the brand background
//! templates live, which extra fonts to load, how long remote loads may take
//! and the display density to render at. Layout and palette constants are
//! not configurable.

use std::path::{Path, PathBuf};
use std::time::Duration;

use serde::{Deserialize, Serialize};

use crate::brand::Brand;
use crate::error::{Error, Result};
use crate::request::ImageSource;

/// Runtime configuration for a [`SignatureRenderer`](crate::SignatureRenderer).
///
/// # JSON Format
///
/// ```json
/// {
///   "pixelRatio": 2.0,
///   "assetDir": "public",
///   "fontDirs": ["fonts"],
///   "httpTimeoutMs": 10000
/// }
/// ```
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase", default)]
pub struct RendererConfig {
    /// Device pixel ratio the physical buffer is scaled by.
    pub pixel_ratio: f32,

    /// Directory holding the brand background templates.
    pub asset_dir: PathBuf,

    /// Extra font directories loaded on top of the system fonts.
    pub font_dirs: Vec<PathBuf>,

    /// Timeout for remote image loads, in milliseconds.
    pub http_timeout_ms: u64,

    pub user_agent: String,
}

impl Default for RendererConfig {
    fn default() -> Self {
        Self {
            pixel_ratio: 1.0,
            asset_dir: PathBuf::from("assets"),
            font_dirs: Vec::new(),
            http_timeout_ms: 15_000,
            user_agent: concat!("firma-renderer/", env!("CARGO_PKG_VERSION")).to_string(),
        }
    }
}

impl RendererConfig {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn with_pixel_ratio(mut self, ratio: f32) -> Self {
        self.pixel_ratio = ratio;
        self
    }

    pub fn with_asset_dir(mut self, dir: impl Into<PathBuf>) -> Self {
        self.asset_dir = dir.into();
        self
    }

    pub fn http_timeout(&self) -> Duration {
        Duration::from_millis(self.http_timeout_ms)
    }

    /// The default background template for a brand.
    pub fn default_background(&self, brand: Brand) -> ImageSource {
        ImageSource::File(self.asset_dir.join(brand.background_file()))
    }

    pub fn validate(&self) -> Result<()> {
        validate_pixel_ratio(self.pixel_ratio)?;
        if self.http_timeout_ms == 0 {
            return Err(Error::Config("httpTimeoutMs must be positive".into()));
        }
        Ok(())
    }

    pub fn from_json(json: &str) -> Result<Self> {
        let config: Self = serde_json::from_str(json)?;
        config.validate()?;
        Ok(config)
    }

    pub fn from_file(path: impl AsRef<Path>) -> Result<Self> {
        let json = std::fs::read_to_string(path)?;
        Self::from_json(&json)
    }
}

pub(crate) fn validate_pixel_ratio(ratio: f32) -> Result<()> {
    if !ratio.is_finite() || ratio <= 0.0 {
        return Err(Error::Config(format!(
            "pixel ratio must be a positive number, got {ratio}"
        )));
    }
    Ok(())
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn empty_json_uses_defaults() {
        let config = RendererConfig::from_json("{}").unwrap();
        assert_eq!(config, RendererConfig::default());
        assert_eq!(config.http_timeout(), Duration::from_secs(15));
    }

    #[test]
    fn partial_json_overrides() {
        let config =
            RendererConfig::from_json(r#"{"pixelRatio": 2.0, "assetDir": "public"}"#).unwrap();
        assert_eq!(config.pixel_ratio, 2.0);
        assert_eq!(
            config.default_background(Brand::Samoo),
            ImageSource::File(PathBuf::from("public/BG_samoo.png"))
        );
    }

    #[test]
    fn rejects_bad_pixel_ratio() {
        assert!(matches!(
            RendererConfig::from_json(r#"{"pixelRatio": 0}"#),
            Err(Error::Config(_))
        ));
        assert!(RendererConfig::new().with_pixel_ratio(f32::NAN).validate().is_err());
    }
}
