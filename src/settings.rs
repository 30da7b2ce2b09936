//! Generation settings
//!
//! Tunable geometry shared by every stage. Loaded from JSON; every field falls back
//! to the defaults in [`crate::consts`].

use std::path::Path;

use serde::{Deserialize, Serialize};

use crate::consts::*;
use crate::error::{AtlasError, Result};

/// World generation configuration
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(default)]
pub struct WorldConfig {
    /// Global seed; each area derives its own seed from this and its name
    pub seed: i64,

    // === Normal sections ===
    pub min_distance: f32,
    pub max_distance: f32,
    /// Distance limit from the area's generation center
    pub max_radius: f32,

    // === Hub sections ===
    pub hub_min_distance: f32,
    pub hub_max_distance: f32,

    // === Sampling guards ===
    /// Attempts per point before the exhaustion policy applies
    pub attempt_guard: u32,
    /// Relaxation passes allowed before the dense policy gives up too
    pub max_relax_passes: u32,
    /// Generate areas on scoped threads
    pub parallel_generation: bool,

    // === Layout ===
    pub gap: f32,
    pub strip_height: f32,
    pub area_padding: f32,
    pub staging_stride: f32,
    pub layout_duration_min: f32,
    pub layout_duration_max: f32,
    /// Area groups to bridge, by name. Empty derives the groups from the layout slots.
    pub bridges: Vec<Vec<String>>,

    // === Reachability ===
    pub detection_radius: f32,
    pub section_radius: f32,
    pub proxy_epsilon: f32,
}

impl Default for WorldConfig {
    fn default() -> Self {
        Self {
            seed: 42,

            min_distance: MIN_DISTANCE,
            max_distance: MAX_DISTANCE,
            max_radius: MAX_RADIUS,

            hub_min_distance: HUB_MIN_DISTANCE,
            hub_max_distance: HUB_MAX_DISTANCE,

            attempt_guard: ATTEMPT_GUARD,
            max_relax_passes: MAX_RELAX_PASSES,
            parallel_generation: false,

            gap: LAYOUT_GAP,
            strip_height: STRIP_HEIGHT,
            area_padding: AREA_PADDING,
            staging_stride: STAGING_STRIDE,
            layout_duration_min: LAYOUT_DURATION_MIN,
            layout_duration_max: LAYOUT_DURATION_MAX,
            bridges: Vec::new(),

            detection_radius: DETECTION_RADIUS,
            section_radius: SECTION_RADIUS,
            proxy_epsilon: PROXY_EPSILON,
        }
    }
}

impl WorldConfig {
    /// Parse a config from JSON and validate it
    pub fn from_json_str(json: &str) -> Result<Self> {
        let config: Self = serde_json::from_str(json)?;
        config.validate()?;
        Ok(config)
    }

    /// Load a config file from disk
    pub fn load(path: impl AsRef<Path>) -> Result<Self> {
        let json = std::fs::read_to_string(path.as_ref())?;
        let config = Self::from_json_str(&json)?;
        log::info!("Loaded config from {}", path.as_ref().display());
        Ok(config)
    }

    /// Write the config as pretty JSON
    pub fn save(&self, path: impl AsRef<Path>) -> Result<()> {
        let json = serde_json::to_string_pretty(self)?;
        std::fs::write(path, json)?;
        Ok(())
    }

    /// Reject values the generator cannot work with
    pub fn validate(&self) -> Result<()> {
        fn positive(name: &str, value: f32) -> Result<()> {
            if value.is_finite() && value > 0.0 {
                Ok(())
            } else {
                Err(AtlasError::Config(format!("{name} must be positive, got {value}")))
            }
        }

        positive("min_distance", self.min_distance)?;
        positive("hub_min_distance", self.hub_min_distance)?;
        positive("max_radius", self.max_radius)?;
        positive("detection_radius", self.detection_radius)?;
        positive("layout_duration_min", self.layout_duration_min)?;

        if self.min_distance >= self.max_distance {
            return Err(AtlasError::Config(format!(
                "min_distance ({}) must be below max_distance ({})",
                self.min_distance, self.max_distance
            )));
        }
        if self.hub_min_distance >= self.hub_max_distance {
            return Err(AtlasError::Config(format!(
                "hub_min_distance ({}) must be below hub_max_distance ({})",
                self.hub_min_distance, self.hub_max_distance
            )));
        }
        if self.layout_duration_min > self.layout_duration_max {
            return Err(AtlasError::Config("layout duration range is inverted".into()));
        }
        if self.gap < 0.0 || self.strip_height < 0.0 || self.area_padding < 0.0 {
            return Err(AtlasError::Config("gap, strip_height and area_padding must not be negative".into()));
        }
        if self.proxy_epsilon < 0.0 || self.proxy_epsilon >= self.detection_radius {
            return Err(AtlasError::Config(format!(
                "proxy_epsilon must lie in [0, {})",
                self.detection_radius
            )));
        }
        if self.attempt_guard == 0 {
            return Err(AtlasError::Config("attempt_guard must be at least 1".into()));
        }
        Ok(())
    }
}
