//! Engine settings
//!
//! Fixed per level, never per query. Stored as JSON next to the level data.

use std::path::Path;

use serde::{Deserialize, Serialize};

use crate::consts::{AGENT_RADIUS, MELEE_RANGE, PERCEPTION_RANGE};

/// Navigation engine settings
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(default)]
pub struct NavSettings {
    /// Radius of the disc every agent is approximated by
    pub agent_radius: f32,
    /// Anything within this range is visible regardless of walls
    pub melee_range: f32,
    /// Line-of-sight cut-off
    pub perception_range: f32,
    /// Outdoor levels have no ceiling: floor edges don't block sight
    pub outdoors: bool,

    // === World bounds ===
    /// Declared world width (None = only enforce the non-negative quadrant)
    pub world_width: Option<f32>,
    /// Declared world height
    pub world_height: Option<f32>,
}

impl Default for NavSettings {
    fn default() -> Self {
        Self {
            agent_radius: AGENT_RADIUS,
            melee_range: MELEE_RANGE,
            perception_range: PERCEPTION_RANGE,
            outdoors: false,

            world_width: None,
            world_height: None,
        }
    }
}

impl NavSettings {
    /// Settings for an outdoor level
    pub fn outdoors() -> Self {
        Self {
            outdoors: true,
            ..Self::default()
        }
    }

    /// Parse settings from JSON (missing fields take their defaults)
    pub fn from_json(json: &str) -> Result<Self, serde_json::Error> {
        serde_json::from_str(json)
    }

    pub fn to_json(&self) -> Result<String, serde_json::Error> {
        serde_json::to_string_pretty(self)
    }

    /// Load settings from a JSON file, falling back to defaults
    pub fn load(path: impl AsRef<Path>) -> Self {
        let path = path.as_ref();
        match std::fs::read_to_string(path) {
            Ok(json) => match Self::from_json(&json) {
                Ok(settings) => {
                    log::info!("Loaded nav settings from {}", path.display());
                    return settings;
                }
                Err(e) => log::warn!("Bad nav settings in {}: {}", path.display(), e),
            },
            Err(e) => log::warn!("Can't read nav settings {}: {}", path.display(), e),
        }

        log::info!("Using default nav settings");
        Self::default()
    }

    /// Save settings as pretty JSON
    pub fn save(&self, path: impl AsRef<Path>) -> std::io::Result<()> {
        let json = self.to_json().map_err(std::io::Error::other)?;
        std::fs::write(path.as_ref(), json)?;
        log::info!("Nav settings saved to {}", path.as_ref().display());
        Ok(())
    }

    /// Declared world extent, if both dimensions were given
    pub fn world_size(&self) -> Option<(f32, f32)> {
        match (self.world_width, self.world_height) {
            (Some(w), Some(h)) => Some((w, h)),
            _ => None,
        }
    }
}
