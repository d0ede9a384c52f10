//! Editor configuration.

use serde::{Deserialize, Serialize};
use thiserror::Error;

use crate::hit::DEFAULT_PICK_RADIUS;
use crate::protocol::Algorithm;

/// Smallest grid spacing accepted, in world units.
pub const MIN_GRID_SPACING: f64 = 4.0;

/// Configuration errors.
#[derive(Debug, Error)]
pub enum ConfigError {
    #[error("Invalid configuration: {0}")]
    Parse(#[from] serde_json::Error),
    #[error("Invalid value for {field}: {reason}")]
    Invalid { field: &'static str, reason: String },
}

/// Editor settings. Every field has a default, so partial JSON is fine.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(default)]
pub struct EditorConfig {
    /// WebSocket endpoint of the graph server.
    pub server_url: String,
    /// Hit-test radius in world units.
    pub pick_radius: f64,
    /// Drawn node radius in world units.
    pub node_radius: f64,
    /// Distance between grid lines in world units.
    pub grid_spacing: f64,
    pub viewport_width: f64,
    pub viewport_height: f64,
    /// Path search strategy used for find-path requests.
    pub algorithm: Algorithm,
}

impl Default for EditorConfig {
    fn default() -> Self {
        Self {
            server_url: "ws://127.0.0.1:8888/ws".to_string(),
            pick_radius: DEFAULT_PICK_RADIUS,
            node_radius: 16.0,
            grid_spacing: 512.0 / 10.0,
            viewport_width: 512.0,
            viewport_height: 512.0,
            algorithm: Algorithm::BreadthFirst,
        }
    }
}

impl EditorConfig {
    /// Parse a JSON configuration and validate it.
    pub fn from_json(json: &str) -> Result<Self, ConfigError> {
        let config: Self = serde_json::from_str(json)?;
        config.validate()?;
        Ok(config)
    }

    /// Check value ranges.
    pub fn validate(&self) -> Result<(), ConfigError> {
        let positive = [
            ("pick_radius", self.pick_radius),
            ("node_radius", self.node_radius),
            ("grid_spacing", self.grid_spacing),
        ];
        for (field, value) in positive {
            if !(value.is_finite() && value > 0.0) {
                return Err(ConfigError::Invalid {
                    field,
                    reason: format!("expected a positive number, got {}", value),
                });
            }
        }
        if self.grid_spacing < MIN_GRID_SPACING {
            return Err(ConfigError::Invalid {
                field: "grid_spacing",
                reason: format!("must be at least {}, got {}", MIN_GRID_SPACING, self.grid_spacing),
            });
        }
        if self.viewport_width < 0.0 || self.viewport_height < 0.0 {
            return Err(ConfigError::Invalid {
                field: "viewport",
                reason: "size cannot be negative".to_string(),
            });
        }
        Ok(())
    }
}
