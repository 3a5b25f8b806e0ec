//! Engine configuration: layout, animation and initial viewport.
//!
//! Loaded from TOML; every table and key is optional and falls back to the
//! defaults.
//!
//! ```toml
//! [viewport]
//! width = 1600.0
//! height = 900.0
//!
//! [layout]
//! max_visible_units = 8
//!
//! [animation]
//! ambient_sample_rate = 0.1
//! ```

use crate::animation::AnimationConfig;
use crate::error::{Error, Result};
use crate::layout::{LayoutConfig, Viewport};
use serde::{Deserialize, Serialize};
use std::path::Path;

/// Everything the engine needs besides the architecture itself.
#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
#[serde(default)]
pub struct EngineConfig {
    /// Viewport used when the visualization is first mounted.
    pub viewport: Viewport,

    /// Layout parameters.
    pub layout: LayoutConfig,

    /// Particle scheduler parameters.
    pub animation: AnimationConfig,
}

impl EngineConfig {
    /// Smaller canvas and fewer units per layer, for embedding.
    pub fn compact() -> Self {
        Self {
            viewport: Viewport::new(800.0, 400.0),
            layout: LayoutConfig {
                padding: 50.0,
                unit_spacing: 24.0,
                max_visible_units: 8,
                unit_radius: 7.0,
            },
            animation: AnimationConfig {
                ambient_sample_rate: 0.03,
                ..AnimationConfig::default()
            },
        }
    }

    /// Large canvas for slides and screenshots.
    pub fn presentation() -> Self {
        Self {
            viewport: Viewport::new(1920.0, 1080.0),
            layout: LayoutConfig {
                padding: 120.0,
                unit_spacing: 60.0,
                unit_radius: 14.0,
                ..LayoutConfig::default()
            },
            animation: AnimationConfig {
                ambient_sample_rate: 0.1,
                ..AnimationConfig::default()
            },
        }
    }

    /// Parse from TOML.
    ///
    /// ```
    /// use synapse_viz::EngineConfig;
    ///
    /// let config = EngineConfig::from_toml("[layout]\nmax_visible_units = 6\n").unwrap();
    /// assert_eq!(config.layout.max_visible_units, 6);
    /// assert_eq!(config.layout.padding, 80.0);
    /// ```
    pub fn from_toml(content: &str) -> Result<Self> {
        Ok(toml::from_str(content)?)
    }

    /// Serialize to TOML.
    pub fn to_toml(&self) -> Result<String> {
        toml::to_string_pretty(self).map_err(|e| Error::Config(e.to_string()))
    }

    /// Reads and validates a TOML file.
    pub fn load(path: impl AsRef<Path>) -> Result<Self> {
        let path = path.as_ref();
        let config = Self::from_toml(&std::fs::read_to_string(path)?)?;
        config
            .validate()
            .map_err(|e| Error::Config(format!("{}: {}", path.display(), e)))?;
        log::info!("Loaded engine configuration from {}", path.display());
        Ok(config)
    }

    /// Validate configuration.
    pub fn validate(&self) -> std::result::Result<(), String> {
        if !(self.viewport.width > 0.0 && self.viewport.height > 0.0) {
            return Err(format!(
                "viewport must be positive, got {}x{}",
                self.viewport.width, self.viewport.height
            ));
        }
        let layout = &self.layout;
        if layout.max_visible_units == 0 {
            return Err("layout.max_visible_units must be at least 1".to_string());
        }
        if layout.padding < 0.0 || layout.unit_spacing <= 0.0 || layout.unit_radius <= 0.0 {
            return Err("layout distances must be positive".to_string());
        }
        if 2.0 * layout.padding >= self.viewport.width {
            return Err("layout.padding leaves no room for columns".to_string());
        }
        self.animation.validate()
    }
}
