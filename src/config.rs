//! Bake configuration, loaded from JSON.

use std::path::Path;

use serde::{Deserialize, Serialize};

use crate::occlusion::OcclusionParams;
use crate::postprocess::BlurParams;
use crate::util::{Error, Result};

/// Everything one bake needs besides the geometry.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(default)]
pub struct BakeConfig {
    // Output map
    pub width: u32,
    pub height: u32,
    /// Linear rasterization factor; 1 disables supersampling
    pub supersampling: u32,

    // Sampling
    pub occlusion: OcclusionParams,

    // Post-processing
    pub blur: BlurParams,
    pub invert: bool,
}

impl Default for BakeConfig {
    fn default() -> Self {
        Self {
            width: 512,
            height: 512,
            supersampling: 2,
            occlusion: OcclusionParams::default(),
            blur: BlurParams::default(),
            invert: true,
        }
    }
}

impl BakeConfig {
    /// Load and validate a config file. Missing fields take their defaults.
    pub fn load(path: impl AsRef<Path>) -> Result<Self> {
        let text = std::fs::read_to_string(path.as_ref())?;
        Self::from_json_str(&text)
    }

    pub fn from_json_str(text: &str) -> Result<Self> {
        let config: Self = serde_json::from_str(text)?;
        config.validate()?;
        Ok(config)
    }

    pub fn to_json_string(&self) -> Result<String> {
        Ok(serde_json::to_string_pretty(self)?)
    }

    /// Write as pretty JSON.
    pub fn save(&self, path: impl AsRef<Path>) -> Result<()> {
        std::fs::write(path.as_ref(), self.to_json_string()?)?;
        Ok(())
    }

    pub fn validate(&self) -> Result<()> {
        if self.width == 0 || self.height == 0 {
            return Err(Error::config(format!("map size {}x{} must be non-zero", self.width, self.height)));
        }
        if self.supersampling == 0 {
            return Err(Error::config("supersampling must be at least 1"));
        }
        self.occlusion.validate(self.width, self.height)?;
        self.blur.validate()
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_default_is_valid() {
        BakeConfig::default().validate().unwrap();
    }

    #[test]
    fn test_partial_json() {
        let config = BakeConfig::from_json_str(
            r#"{
                "width": 128,
                "height": 64,
                "occlusion": { "quality": 8, "tile_width": 32, "tile_height": 32 },
                "blur": { "num_pass": 0 }
            }"#,
        )
        .unwrap();
        assert_eq!(config.width, 128);
        assert_eq!(config.occlusion.quality, 8);
        assert_eq!(config.occlusion.max_distance, 100.0);
        assert_eq!(config.blur.num_pass, 0);
        assert_eq!(config.blur.kernel_size, 3);
        assert!(config.invert);
    }

    #[test]
    fn test_invalid_values_rejected() {
        let err = BakeConfig::from_json_str(r#"{ "width": 100 }"#).unwrap_err();
        assert!(matches!(err, Error::InvalidConfig(_)), "{err}");

        let err = BakeConfig::from_json_str(r#"{ "blur": { "kernel_size": 4 } }"#).unwrap_err();
        assert!(matches!(err, Error::InvalidConfig(_)));

        let err = BakeConfig::from_json_str(r#"{ "supersampling": 0 }"#).unwrap_err();
        assert!(matches!(err, Error::InvalidConfig(_)));

        let err = BakeConfig::from_json_str("{ not json").unwrap_err();
        assert!(matches!(err, Error::Json(_)));
    }

    #[test]
    fn test_json_round_trip() {
        let config = BakeConfig { width: 256, invert: false, ..BakeConfig::default() };
        let back = BakeConfig::from_json_str(&config.to_json_string().unwrap()).unwrap();
        assert_eq!(back, config);
    }
}
