//! Engine tuning loaded from JSON.
//!
//! Every section and every field has a default, so a file only needs to name
//! what it changes:
//!
//! ```
//! use duet_engine::config::EngineConfig;
//!
//! let config = EngineConfig::from_json_str(r#"{ "physics": { "gravity": -30.0 } }"#).unwrap();
//! assert_eq!(config.physics.gravity, -30.0);
//! assert_eq!(config.physics.slop, 0.01);
//! ```

use std::path::Path;

use serde::{Deserialize, Serialize};

use crate::collision::CollisionConfig;
use crate::physics::PhysicsConfig;
use crate::simulation::TickConfig;

/// Errors from loading or validating an [`EngineConfig`].
#[derive(Debug, thiserror::Error)]
pub enum ConfigError {
    #[error("failed to read config file: {0}")]
    Io(#[from] std::io::Error),

    #[error("failed to parse config: {0}")]
    Parse(#[from] serde_json::Error),

    #[error("invalid config value `{field}`: {reason}")]
    Invalid { field: &'static str, reason: String },
}

/// All engine tuning in one document.
#[derive(Debug, Clone, Copy, Default, PartialEq, Serialize, Deserialize)]
#[serde(default)]
pub struct EngineConfig {
    pub tick: TickConfig,
    pub collision: CollisionConfig,
    pub physics: PhysicsConfig,
}

impl EngineConfig {
    /// Parse and validate a JSON document.
    pub fn from_json_str(json: &str) -> Result<Self, ConfigError> {
        let config: Self = serde_json::from_str(json)?;
        config.validate()?;
        Ok(config)
    }

    /// Read, parse and validate a JSON file.
    pub fn from_path(path: impl AsRef<Path>) -> Result<Self, ConfigError> {
        let text = std::fs::read_to_string(path)?;
        Self::from_json_str(&text)
    }

    /// Serialize as pretty JSON.
    pub fn to_json_pretty(&self) -> Result<String, ConfigError> {
        Ok(serde_json::to_string_pretty(self)?)
    }

    /// Check every value the simulation relies on. The first offending field
    /// is reported.
    pub fn validate(&self) -> Result<(), ConfigError> {
        let t = &self.tick;
        if !(t.fixed_dt > 0.0 && t.fixed_dt.is_finite()) {
            return Err(invalid(
                "tick.fixed_dt",
                format!("must be positive and finite, got {}", t.fixed_dt),
            ));
        }
        if t.max_steps_per_advance == 0 {
            return Err(invalid("tick.max_steps_per_advance", "must be at least 1".into()));
        }

        // Infinity is allowed and disables pruning.
        let radius = self.collision.prune_radius;
        if radius.is_nan() || radius < 0.0 {
            return Err(invalid(
                "collision.prune_radius",
                format!("must be non-negative, got {radius}"),
            ));
        }

        let p = &self.physics;
        if !p.gravity.is_finite() {
            return Err(invalid(
                "physics.gravity",
                format!("must be finite, got {}", p.gravity),
            ));
        }
        non_negative("physics.slop", p.slop)?;
        non_negative("physics.ground_snap_band", p.ground_snap_band)?;
        non_negative("physics.rest_depth", p.rest_depth)?;
        if p.rest_depth > p.slop {
            return Err(invalid(
                "physics.rest_depth",
                format!("must not exceed slop ({}), got {}", p.slop, p.rest_depth),
            ));
        }
        unit_interval("physics.vertical_correction_percent", p.vertical_correction_percent)?;
        unit_interval("physics.horizontal_correction_percent", p.horizontal_correction_percent)?;
        unit_interval("physics.horizontal_velocity_damping", p.horizontal_velocity_damping)?;
        Ok(())
    }
}

fn invalid(field: &'static str, reason: String) -> ConfigError {
    ConfigError::Invalid { field, reason }
}

fn non_negative(field: &'static str, value: f32) -> Result<(), ConfigError> {
    if value.is_finite() && value >= 0.0 {
        Ok(())
    } else {
        Err(invalid(field, format!("must be finite and >= 0, got {value}")))
    }
}

fn unit_interval(field: &'static str, value: f32) -> Result<(), ConfigError> {
    if (0.0..=1.0).contains(&value) {
        Ok(())
    } else {
        Err(invalid(field, format!("must be within [0, 1], got {value}")))
    }
}

// ---------------------------------------------------------------------------
// Tests
// ---------------------------------------------------------------------------
