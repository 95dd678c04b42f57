//! Engine configuration, loaded from TOML.
//!
//! ```toml
//! [backend]
//! base_url = "https://civic.example/api"
//! city = "Karachi"
//!
//! [map]
//! show_legend = true
//! debounce_ms = 300
//!
//! [clustering]
//! radius_px = 60
//!
//! [layers]
//! heatmap = true
//!
//! [initial_filters]
//! categories = ["Water"]
//! severity_min = 4
//! ```
//!
//! Every section and key is optional.

use std::path::Path;
use std::time::Duration;

use civic_map_api::BackendConfig;
use civic_map_filter::{FilterOverrides, LayerVisibility};
use civic_map_render::{ClusterConfig, HeatmapOptions};
use serde::{Deserialize, Serialize};

/// Errors that can occur while loading the engine configuration.
#[derive(Debug, thiserror::Error)]
pub enum ConfigError {
    /// The file could not be read.
    #[error("I/O error: {0}")]
    Io(#[from] std::io::Error),

    /// The file is not valid TOML for [`EngineConfig`].
    #[error("Failed to decode config: {0}")]
    Decode(#[from] toml::de::Error),

    /// A value is out of range.
    #[error("Invalid config: {message}")]
    Invalid {
        /// What is wrong.
        message: String,
    },
}

/// Presentation settings of the embedding page.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(default)]
pub struct MapSettings {
    /// Whether the filter panel is shown.
    pub show_filter_panel: bool,
    /// Whether the category legend is shown.
    pub show_legend: bool,
    /// Quiet interval before a complaint fetch is sent, in milliseconds.
    pub debounce_ms: u64,
}

impl Default for MapSettings {
    fn default() -> Self {
        Self {
            show_filter_panel: true,
            show_legend: true,
            debounce_ms: 300,
        }
    }
}

/// Everything the engine is constructed from.
#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
#[serde(default)]
pub struct EngineConfig {
    /// Backend connection.
    pub backend: BackendConfig,
    /// Presentation settings.
    pub map: MapSettings,
    /// Marker clustering constants.
    pub clustering: ClusterConfig,
    /// Heatmap rendering options.
    pub heatmap: HeatmapOptions,
    /// Initial layer visibility.
    pub layers: LayerVisibility,
    /// Initial filters, merged over the built-in defaults.
    pub initial_filters: FilterOverrides,
}

impl EngineConfig {
    /// Loads the configuration from `path` and applies environment
    /// overrides. A missing file yields the built-in defaults.
    ///
    /// # Errors
    ///
    /// Returns [`ConfigError`] if the file exists but cannot be read or
    /// decoded, or holds out-of-range values.
    pub fn load(path: &Path) -> Result<Self, ConfigError> {
        let config = match std::fs::read_to_string(path) {
            Ok(text) => {
                log::info!("Loading engine config from {}", path.display());
                Self::from_toml_str(&text)?
            }
            Err(e) if e.kind() == std::io::ErrorKind::NotFound => {
                log::info!("No config at {}, using defaults", path.display());
                Self::default()
            }
            Err(e) => return Err(e.into()),
        };
        let config = Self {
            backend: config.backend.with_env_overrides(),
            ..config
        };
        config.validate()?;
        Ok(config)
    }

    /// Parses and validates a TOML document.
    ///
    /// # Errors
    ///
    /// Returns [`ConfigError`] if the document cannot be decoded or holds
    /// out-of-range values.
    pub fn from_toml_str(text: &str) -> Result<Self, ConfigError> {
        let config: Self = toml::from_str(text)?;
        config.validate()?;
        Ok(config)
    }

    /// Checks value ranges.
    ///
    /// # Errors
    ///
    /// Returns [`ConfigError::Invalid`] naming the first offending value.
    pub fn validate(&self) -> Result<(), ConfigError> {
        self.backend.endpoint("").map_err(|e| ConfigError::Invalid {
            message: e.to_string(),
        })?;
        if !(self.clustering.radius_px.is_finite() && self.clustering.radius_px > 0.0) {
            return Err(ConfigError::Invalid {
                message: format!(
                    "clustering.radius_px must be positive, got {}",
                    self.clustering.radius_px
                ),
            });
        }
        if self.backend.timeout_secs == 0 {
            return Err(ConfigError::Invalid {
                message: "backend.timeout_secs must be at least 1".to_string(),
            });
        }
        Ok(())
    }

    /// Fetch debounce interval.
    #[must_use]
    pub const fn debounce(&self) -> Duration {
        Duration::from_millis(self.map.debounce_ms)
    }
}
