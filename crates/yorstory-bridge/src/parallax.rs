#![forbid(unsafe_code)]

//! Landing-page parallax: layered images that drift with the pointer, with
//! the whole set rotating on a timer.
//!
//! Set descriptions come from the page as JSON:
//!
//! ```json
//! [{"color": "#101010", "images": [{"url": "p1-1.png", "factor": 0.05}]},
//!  {"colorTop": "#1a1b1a", "colorBottom": "#fff", "images": []}]
//! ```

use serde::Deserialize;

use crate::config::ParallaxConfig;
use crate::error::ConfigError;

/// One image layer. `factor` scales how far it moves with the pointer.
#[derive(Debug, Clone, PartialEq, Deserialize)]
pub struct ParallaxLayer {
    pub url: String,
    pub factor: f64,
}

/// Backdrop behind a set's layers.
#[derive(Debug, Clone, PartialEq, Deserialize)]
#[serde(untagged)]
pub enum Background {
    Solid {
        color: String,
    },
    Gradient {
        #[serde(rename = "colorTop")]
        top: String,
        #[serde(rename = "colorBottom")]
        bottom: String,
    },
}

impl Background {
    /// `(background-color, background-image)` CSS values; the unused one is empty.
    #[must_use]
    pub fn css(&self) -> (String, String) {
        match self {
            Self::Solid { color } => (color.clone(), String::new()),
            Self::Gradient { top, bottom } => {
                (String::new(), format!("linear-gradient({top}, {bottom})"))
            }
        }
    }
}

#[derive(Debug, Clone, PartialEq, Deserialize)]
pub struct ParallaxSet {
    #[serde(flatten)]
    pub background: Background,
    #[serde(rename = "images")]
    pub layers: Vec<ParallaxLayer>,
}

pub fn parse_sets(json: &str) -> Result<Vec<ParallaxSet>, ConfigError> {
    serde_json::from_str(json).map_err(|e| ConfigError::Json(e.to_string()))
}

/// Pointer position as an offset in `[-1, 1]`. Vertical motion is disabled.
#[must_use]
pub fn pointer_offset(client_x: f64, inner_width: f64) -> (f64, f64) {
    if inner_width <= 0.0 {
        return (0.0, 0.0);
    }
    (client_x / inner_width * 2.0 - 1.0, 0.0)
}

/// Pixel translation of a layer for a pointer offset.
#[must_use]
pub fn layer_offset(offset: (f64, f64), motion_max: f64, factor: f64) -> (f64, f64) {
    (offset.0 * motion_max * factor, offset.1 * motion_max * factor)
}

#[must_use]
pub fn translate_css(dx: f64, dy: f64) -> String {
    format!("translate({dx}px, {dy}px)")
}

/// Left edge that centres an image horizontally in its container.
#[must_use]
pub fn centered_left(container_width: f64, image_width: f64) -> f64 {
    container_width / 2.0 - image_width / 2.0
}

/// Element id of layer `index`.
#[must_use]
pub fn layer_element_id(image_class: &str, index: usize) -> String {
    format!("{image_class}{index}")
}

/// Rotating selection of parallax sets plus the current pointer offset.
#[derive(Debug, Clone)]
pub struct Carousel {
    sets: Vec<ParallaxSet>,
    start: usize,
    current: usize,
    offset: (f64, f64),
    motion_max: f64,
}

impl Carousel {
    pub fn new(sets: Vec<ParallaxSet>, config: &ParallaxConfig) -> Result<Self, ConfigError> {
        if sets.is_empty() {
            return Err(ConfigError::Invalid {
                field: "sets",
                reason: "must not be empty",
            });
        }
        let current = config.initial_set % sets.len();
        Ok(Self {
            sets,
            start: current,
            current,
            offset: (0.0, 0.0),
            motion_max: config.motion_max,
        })
    }

    #[must_use]
    pub fn current_index(&self) -> usize {
        self.current
    }

    #[must_use]
    pub fn current(&self) -> &ParallaxSet {
        &self.sets[self.current]
    }

    /// Move to the next set, wrapping around. Offsets reset to zero.
    pub fn advance(&mut self) -> &ParallaxSet {
        self.current = (self.current + 1) % self.sets.len();
        self.offset = (0.0, 0.0);
        tracing::debug!(set = self.current, "parallax set advanced");
        &self.sets[self.current]
    }

    /// Advance only if the next set's images are preloaded.
    ///
    /// `preloaded_lists` counts completed lists of [`preload_lists`](Self::preload_lists).
    pub fn advance_if_ready(&mut self, preloaded_lists: usize) -> Option<&ParallaxSet> {
        let n = self.sets.len();
        let next = (self.current + 1) % n;
        let list = (next + n - self.start) % n;
        if list >= preloaded_lists {
            tracing::trace!(next, preloaded_lists, "parallax set not preloaded yet");
            return None;
        }
        Some(self.advance())
    }

    pub fn set_pointer(&mut self, offset: (f64, f64)) {
        self.offset = offset;
    }

    /// CSS `transform` for each layer of the current set.
    #[must_use]
    pub fn layer_transforms(&self) -> Vec<String> {
        self.current()
            .layers
            .iter()
            .map(|layer| {
                let (dx, dy) = layer_offset(self.offset, self.motion_max, layer.factor);
                translate_css(dx, dy)
            })
            .collect()
    }

    /// Image URLs per set, starting from the initial one, for preloading.
    #[must_use]
    pub fn preload_lists(&self) -> Vec<Vec<String>> {
        let n = self.sets.len();
        (0..n)
            .map(|i| {
                self.sets[(self.start + i) % n]
                    .layers
                    .iter()
                    .map(|layer| layer.url.clone())
                    .collect()
            })
            .collect()
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use pretty_assertions::assert_eq;

    const SETS: &str = r##"[
        {"color": "#101010", "images": [
            {"url": "p1-1.png", "factor": 0.05},
            {"url": "p1-2.png", "factor": 0.5}
        ]},
        {"colorTop": "#1a1b1a", "colorBottom": "#ffffff", "images": [
            {"url": "p2-1.png", "factor": 1.0}
        ]}
    ]"##;

    fn carousel() -> Carousel {
        Carousel::new(parse_sets(SETS).unwrap(), &ParallaxConfig::default()).unwrap()
    }

    #[test]
    fn parses_both_background_kinds() {
        let sets = parse_sets(SETS).unwrap();
        assert_eq!(
            sets[0].background,
            Background::Solid {
                color: "#101010".into()
            }
        );
        assert_eq!(
            sets[1].background.css(),
            (String::new(), "linear-gradient(#1a1b1a, #ffffff)".to_owned())
        );
        assert_eq!(sets[0].layers[1].factor, 0.5);
    }

    #[test]
    fn missing_background_is_rejected() {
        assert!(parse_sets(r#"[{"images": []}]"#).is_err());
    }

    #[test]
    fn offsets_scale_with_factor() {
        assert_eq!(layer_offset((1.0, 0.0), 100.0, 0.5), (50.0, 0.0));
        assert_eq!(layer_offset((-0.5, 0.0), 100.0, 1.2), (-60.0, 0.0));
        assert_eq!(layer_offset((0.3, 0.0), 100.0, 0.0), (0.0, 0.0));
    }

    #[test]
    fn pointer_maps_to_unit_range() {
        assert_eq!(pointer_offset(0.0, 1000.0), (-1.0, 0.0));
        assert_eq!(pointer_offset(500.0, 1000.0), (0.0, 0.0));
        assert_eq!(pointer_offset(1000.0, 1000.0), (1.0, 0.0));
        assert_eq!(pointer_offset(10.0, 0.0), (0.0, 0.0));
    }

    #[test]
    fn carousel_wraps_and_resets_offset() {
        let mut c = carousel();
        c.set_pointer((1.0, 0.0));
        assert_eq!(c.layer_transforms(), vec!["translate(5px, 0px)", "translate(50px, 0px)"]);
        c.advance();
        assert_eq!(c.current_index(), 1);
        assert_eq!(c.layer_transforms(), vec!["translate(0px, 0px)"]);
        c.advance();
        assert_eq!(c.current_index(), 0);
    }

    #[test]
    fn initial_set_wraps_into_range() {
        let config = ParallaxConfig {
            initial_set: 3,
            ..ParallaxConfig::default()
        };
        let c = Carousel::new(parse_sets(SETS).unwrap(), &config).unwrap();
        assert_eq!(c.current_index(), 1);
        assert_eq!(
            c.preload_lists(),
            vec![
                vec!["p2-1.png".to_owned()],
                vec!["p1-1.png".to_owned(), "p1-2.png".to_owned()]
            ]
        );
    }

    #[test]
    fn advance_waits_for_preload() {
        let config = ParallaxConfig {
            initial_set: 1,
            ..ParallaxConfig::default()
        };
        let mut c = Carousel::new(parse_sets(SETS).unwrap(), &config).unwrap();
        assert!(c.advance_if_ready(1).is_none());
        assert_eq!(c.current_index(), 1);
        assert!(c.advance_if_ready(2).is_some());
        assert_eq!(c.current_index(), 0);
        // Back to the first preloaded list.
        assert!(c.advance_if_ready(2).is_some());
        assert_eq!(c.current_index(), 1);
    }

    #[test]
    fn empty_carousel_is_rejected() {
        assert!(Carousel::new(Vec::new(), &ParallaxConfig::default()).is_err());
    }

    #[test]
    fn centering_and_ids() {
        assert_eq!(centered_left(1200.0, 1600.0), -200.0);
        assert_eq!(layer_element_id("parallaxImage", 2), "parallaxImage2");
    }
}
