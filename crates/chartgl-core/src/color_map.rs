//! Continuous color maps.

use std::collections::HashMap;

use glam::{Vec3, Vec4};
use serde::{Deserialize, Serialize};

/// A color map sampled evenly on `[0, 1]`, with optional out-of-range colors.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct ColorMap {
    /// Color map name.
    pub name: String,
    /// RGBA samples, evenly spaced from 0 to 1.
    pub colors: Vec<Vec4>,
    /// Color for values below the normalized range (defaults to the first sample).
    pub under: Option<Vec4>,
    /// Color for values above the normalized range (defaults to the last sample).
    pub over: Option<Vec4>,
}

impl ColorMap {
    /// Creates a color map from RGBA samples.
    pub fn new(name: impl Into<String>, colors: Vec<Vec4>) -> Self {
        Self {
            name: name.into(),
            colors,
            under: None,
            over: None,
        }
    }

    /// Creates an opaque color map from RGB samples.
    pub fn from_rgb(name: impl Into<String>, colors: &[Vec3]) -> Self {
        Self::new(name, colors.iter().map(|c| c.extend(1.0)).collect())
    }

    /// Samples the color map at `t`, clamped to `[0, 1]`.
    #[must_use]
    #[allow(
        clippy::cast_possible_truncation,
        clippy::cast_sign_loss,
        clippy::cast_precision_loss
    )]
    pub fn sample(&self, t: f32) -> Vec4 {
        let t = if t.is_nan() { 0.0 } else { t.clamp(0.0, 1.0) };

        match self.colors.len() {
            0 => Vec4::new(0.0, 0.0, 0.0, 1.0),
            1 => self.colors[0],
            len => {
                let n = len - 1;
                let idx = ((t * n as f32).floor() as usize).min(n - 1);
                let frac = t * n as f32 - idx as f32;
                self.colors[idx].lerp(self.colors[idx + 1], frac)
            }
        }
    }

    /// Samples a normalized value, using the under/over colors outside `[0, 1]`.
    #[must_use]
    pub fn map(&self, t: f64) -> Vec4 {
        if t < 0.0 {
            self.under_color()
        } else if t > 1.0 {
            self.over_color()
        } else {
            #[allow(clippy::cast_possible_truncation)]
            self.sample(t as f32)
        }
    }

    /// Color shown for values below the range.
    #[must_use]
    pub fn under_color(&self) -> Vec4 {
        self.under.unwrap_or_else(|| self.sample(0.0))
    }

    /// Color shown for values above the range.
    #[must_use]
    pub fn over_color(&self) -> Vec4 {
        self.over.unwrap_or_else(|| self.sample(1.0))
    }

    /// `n` colors evenly spread over the map.
    #[must_use]
    #[allow(clippy::cast_precision_loss)]
    pub fn colors(&self, n: usize) -> Vec<Vec4> {
        match n {
            0 => Vec::new(),
            1 => vec![self.sample(0.5)],
            _ => (0..n)
                .map(|i| self.sample(i as f32 / (n - 1) as f32))
                .collect(),
        }
    }

    /// The same map running the other way.
    #[must_use]
    pub fn reversed(&self) -> Self {
        let mut colors = self.colors.clone();
        colors.reverse();
        Self {
            name: format!("{}_r", self.name),
            colors,
            under: self.over,
            over: self.under,
        }
    }
}

/// Named color maps available to legend builders.
#[derive(Default)]
pub struct ColorMapRegistry {
    color_maps: HashMap<String, ColorMap>,
}

impl ColorMapRegistry {
    /// Creates a registry holding the built-in maps.
    pub fn new() -> Self {
        let mut registry = Self::default();
        for map in builtin_maps() {
            registry.register(map);
        }
        registry
    }

    /// Registers a color map, replacing any map of the same name.
    pub fn register(&mut self, color_map: ColorMap) {
        self.color_maps.insert(color_map.name.clone(), color_map);
    }

    /// Gets a color map by name. A `_r` suffix returns the reversed map.
    pub fn get(&self, name: &str) -> Option<ColorMap> {
        if let Some(map) = self.color_maps.get(name) {
            return Some(map.clone());
        }
        name.strip_suffix("_r")
            .and_then(|base| self.color_maps.get(base))
            .map(ColorMap::reversed)
    }

    /// Returns all registered names.
    pub fn names(&self) -> impl Iterator<Item = &str> {
        self.color_maps.keys().map(String::as_str)
    }
}

fn builtin_maps() -> Vec<ColorMap> {
    vec![
        ColorMap::from_rgb(
            "viridis",
            &[
                Vec3::new(0.267, 0.004, 0.329),
                Vec3::new(0.282, 0.140, 0.457),
                Vec3::new(0.253, 0.265, 0.529),
                Vec3::new(0.206, 0.371, 0.553),
                Vec3::new(0.163, 0.471, 0.558),
                Vec3::new(0.127, 0.566, 0.550),
                Vec3::new(0.134, 0.658, 0.517),
                Vec3::new(0.266, 0.749, 0.440),
                Vec3::new(0.477, 0.821, 0.318),
                Vec3::new(0.741, 0.873, 0.150),
                Vec3::new(0.993, 0.906, 0.144),
            ],
        ),
        ColorMap::from_rgb(
            "blues",
            &[
                Vec3::new(0.969, 0.984, 1.000),
                Vec3::new(0.776, 0.859, 0.937),
                Vec3::new(0.419, 0.682, 0.839),
                Vec3::new(0.129, 0.443, 0.710),
                Vec3::new(0.031, 0.188, 0.420),
            ],
        ),
        ColorMap::from_rgb(
            "reds",
            &[
                Vec3::new(1.000, 0.961, 0.941),
                Vec3::new(0.988, 0.733, 0.631),
                Vec3::new(0.984, 0.416, 0.290),
                Vec3::new(0.796, 0.094, 0.114),
                Vec3::new(0.404, 0.000, 0.051),
            ],
        ),
        ColorMap::from_rgb(
            "coolwarm",
            &[
                Vec3::new(0.230, 0.299, 0.754),
                Vec3::new(0.552, 0.690, 0.996),
                Vec3::new(0.866, 0.866, 0.866),
                Vec3::new(0.956, 0.604, 0.486),
                Vec3::new(0.706, 0.016, 0.150),
            ],
        ),
        ColorMap::from_rgb(
            "rainbow",
            &[
                Vec3::new(0.5, 0.0, 1.0),
                Vec3::new(0.0, 0.0, 1.0),
                Vec3::new(0.0, 1.0, 1.0),
                Vec3::new(0.0, 1.0, 0.0),
                Vec3::new(1.0, 1.0, 0.0),
                Vec3::new(1.0, 0.0, 0.0),
            ],
        ),
        ColorMap::from_rgb("grayscale", &[Vec3::ZERO, Vec3::ONE]),
    ]
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_sample_endpoints_and_midpoint() {
        let map = ColorMap::from_rgb("gray", &[Vec3::ZERO, Vec3::ONE]);
        assert_eq!(map.sample(0.0), Vec4::new(0.0, 0.0, 0.0, 1.0));
        assert_eq!(map.sample(1.0), Vec4::ONE);
        assert!((map.sample(0.5).x - 0.5).abs() < 1e-6);
        assert_eq!(map.sample(-3.0), map.sample(0.0));
    }

    #[test]
    fn test_under_over() {
        let mut map = ColorMap::from_rgb("gray", &[Vec3::ZERO, Vec3::ONE]);
        assert_eq!(map.map(-0.1), map.sample(0.0));
        map.over = Some(Vec4::new(1.0, 0.0, 0.0, 1.0));
        assert_eq!(map.map(1.5), Vec4::new(1.0, 0.0, 0.0, 1.0));
    }

    #[test]
    fn test_registry_reversed_lookup() {
        let registry = ColorMapRegistry::new();
        let viridis = registry.get("viridis").unwrap();
        let reversed = registry.get("viridis_r").unwrap();
        assert_eq!(reversed.sample(0.0), viridis.sample(1.0));
        assert!(registry.get("nope").is_none());
        assert!(registry.names().count() >= 6);
    }

    #[test]
    fn test_colors_spread() {
        let map = ColorMap::from_rgb("gray", &[Vec3::ZERO, Vec3::ONE]);
        let c = map.colors(3);
        assert_eq!(c.len(), 3);
        assert!((c[1].x - 0.5).abs() < 1e-6);
    }
}
