#![forbid(unsafe_code)]

//! Page-supplied configuration.
//!
//! Every field has a default matching the site's markup, so the page can pass
//! `{}` (or nothing) and only override what differs. Field names are
//! camelCase on the JS side.

use serde::Deserialize;

use crate::error::ConfigError;

/// Options for the guest host bridge (`wasmInit(options)`).
#[derive(Debug, Clone, PartialEq, Deserialize)]
#[serde(default, rename_all = "camelCase")]
pub struct BridgeConfig {
    /// Id of the `<canvas>` the GL context is created on.
    pub canvas_id: String,
    /// Id of the element whose height tracks the guest's content height.
    pub spacer_id: String,
    /// Id of the element overlay nodes are appended to.
    pub overlay_parent_id: String,
    /// Class tagging text overlays for bulk removal.
    pub text_class: String,
    /// Class tagging embed overlays for bulk removal.
    pub embed_class: String,
    /// Horizontal inset compensation for text overlays, as a fraction of the
    /// font size. Visually calibrated; varies by font family.
    pub left_gap_ratio: f64,
    /// URL the guest module is fetched from.
    pub module_url: String,
    /// Texture metadata endpoint (`?path=..&chunkSizeMax=..`).
    pub metadata_endpoint: String,
    /// Texture chunk endpoint (`?path=..&index=..`).
    pub chunk_endpoint: String,
    /// Upper bound on pixels per chunk the server may choose.
    pub chunk_size_max: u32,
    /// When set, the host creates a memory of this many bytes and imports it
    /// as `env.memory` instead of relying on the guest's exported memory.
    pub memory_bytes: Option<u32>,
    /// Most verbose level written to the browser console.
    pub log_level: String,
}

impl Default for BridgeConfig {
    fn default() -> Self {
        Self {
            canvas_id: "canvas".to_owned(),
            spacer_id: "dummyBackground".to_owned(),
            overlay_parent_id: "dummyBackground".to_owned(),
            text_class: "_wasmText".to_owned(),
            embed_class: "_wasmEmbed".to_owned(),
            left_gap_ratio: 0.08,
            module_url: "yorstory.wasm".to_owned(),
            metadata_endpoint: "/webgl_png".to_owned(),
            chunk_endpoint: "/webgl_png_chunk".to_owned(),
            chunk_size_max: 512 * 1024,
            memory_bytes: None,
            log_level: "info".to_owned(),
        }
    }
}

/// Level names accepted by `logLevel`, least to most verbose.
pub const LOG_LEVELS: [&str; 5] = ["error", "warn", "info", "debug", "trace"];

/// Size of one WebAssembly memory page.
pub const WASM_PAGE_SIZE: u32 = 64 * 1024;

impl BridgeConfig {
    /// Parse a JSON options object. An empty string means all defaults.
    pub fn from_json(json: &str) -> Result<Self, ConfigError> {
        if json.trim().is_empty() {
            return Ok(Self::default());
        }
        let config: Self =
            serde_json::from_str(json).map_err(|e| ConfigError::Json(e.to_string()))?;
        config.validate()?;
        Ok(config)
    }

    fn validate(&self) -> Result<(), ConfigError> {
        if !self.left_gap_ratio.is_finite() {
            return Err(ConfigError::Invalid {
                field: "leftGapRatio",
                reason: "must be finite",
            });
        }
        if self.memory_bytes == Some(0) {
            return Err(ConfigError::Invalid {
                field: "memoryBytes",
                reason: "must be positive",
            });
        }
        if !LOG_LEVELS.contains(&self.log_level.as_str()) {
            return Err(ConfigError::Invalid {
                field: "logLevel",
                reason: "must be error, warn, info, debug or trace",
            });
        }
        Ok(())
    }

    /// Number of 64 KiB pages needed for `memory_bytes`, if configured.
    #[must_use]
    pub fn memory_pages(&self) -> Option<u32> {
        self.memory_bytes.map(|bytes| bytes.div_ceil(WASM_PAGE_SIZE))
    }
}

/// Options for the landing-page parallax carousel.
#[derive(Debug, Clone, PartialEq, Deserialize)]
#[serde(default, rename_all = "camelCase")]
pub struct ParallaxConfig {
    /// Maximum layer translation in CSS pixels for a layer with factor 1.
    pub motion_max: f64,
    /// Seconds each image set stays up before rotating.
    pub swap_seconds: f64,
    /// Index of the set shown first.
    pub initial_set: usize,
    /// Class tagging layer `<img>` elements.
    pub image_class: String,
}

impl Default for ParallaxConfig {
    fn default() -> Self {
        Self {
            motion_max: 100.0,
            swap_seconds: 6.0,
            initial_set: 0,
            image_class: "parallaxImage".to_owned(),
        }
    }
}

impl ParallaxConfig {
    pub fn from_json(json: &str) -> Result<Self, ConfigError> {
        if json.trim().is_empty() {
            return Ok(Self::default());
        }
        let config: Self =
            serde_json::from_str(json).map_err(|e| ConfigError::Json(e.to_string()))?;
        if !(config.swap_seconds.is_finite() && config.swap_seconds > 0.0) {
            return Err(ConfigError::Invalid {
                field: "swapSeconds",
                reason: "must be a positive number",
            });
        }
        Ok(config)
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use pretty_assertions::assert_eq;

    #[test]
    fn empty_json_is_default() {
        assert_eq!(BridgeConfig::from_json("").unwrap(), BridgeConfig::default());
        assert_eq!(BridgeConfig::from_json("{}").unwrap(), BridgeConfig::default());
    }

    #[test]
    fn partial_override_keeps_other_defaults() {
        let config =
            BridgeConfig::from_json(r#"{"leftGapRatio":0.1,"moduleUrl":"/site.wasm"}"#).unwrap();
        assert_eq!(config.left_gap_ratio, 0.1);
        assert_eq!(config.module_url, "/site.wasm");
        assert_eq!(config.canvas_id, "canvas");
        assert_eq!(config.chunk_size_max, 512 * 1024);
    }

    #[test]
    fn malformed_json_is_error() {
        assert!(matches!(
            BridgeConfig::from_json("{not json"),
            Err(ConfigError::Json(_))
        ));
    }

    #[test]
    fn zero_memory_rejected() {
        assert_eq!(
            BridgeConfig::from_json(r#"{"memoryBytes":0}"#),
            Err(ConfigError::Invalid {
                field: "memoryBytes",
                reason: "must be positive"
            })
        );
    }

    #[test]
    fn unknown_log_level_rejected() {
        assert!(BridgeConfig::from_json(r#"{"logLevel":"debug"}"#).is_ok());
        assert!(matches!(
            BridgeConfig::from_json(r#"{"logLevel":"loud"}"#),
            Err(ConfigError::Invalid {
                field: "logLevel",
                ..
            })
        ));
    }

    #[test]
    fn memory_pages_round_up() {
        let config = BridgeConfig {
            memory_bytes: Some(4 * 1024 * 1024 + 1),
            ..BridgeConfig::default()
        };
        assert_eq!(config.memory_pages(), Some(65));
        assert_eq!(BridgeConfig::default().memory_pages(), None);
    }

    #[test]
    fn parallax_defaults_and_validation() {
        let config = ParallaxConfig::from_json(r#"{"initialSet":3}"#).unwrap();
        assert_eq!(config.initial_set, 3);
        assert_eq!(config.motion_max, 100.0);
        assert!(ParallaxConfig::from_json(r#"{"swapSeconds":0}"#).is_err());
    }
}
