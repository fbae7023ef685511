//! Legend schemes: ordered breaks or a continuous color map.

use glam::Vec4;
use serde::{Deserialize, Serialize};

use super::color_break::{BreakKind, ColorBreak};
use crate::color_map::ColorMap;
use crate::error::{ChartError, Result};
use crate::normalize::Normalize;

#[derive(Debug, Clone, Copy, PartialEq, Eq, Default, Serialize, Deserialize)]
pub enum LegendType {
    #[default]
    SingleSymbol,
    UniqueValue,
    GraduatedColor,
}

/// Kind of geometry the scheme styles.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default, Serialize, Deserialize)]
pub enum ShapeType {
    #[default]
    Point,
    Polyline,
    Polygon,
    Image,
}

/// Which ends of a colorbar get an out-of-range cap.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default, Serialize, Deserialize)]
pub enum ExtendMode {
    #[default]
    Neither,
    Min,
    Max,
    Both,
}

impl ExtendMode {
    #[must_use]
    pub fn extends_min(self) -> bool {
        matches!(self, Self::Min | Self::Both)
    }

    #[must_use]
    pub fn extends_max(self) -> bool {
        matches!(self, Self::Max | Self::Both)
    }
}

/// Style rules shared by a graphic or shown by a legend.
///
/// A scheme is discrete (a list of breaks) unless it carries a color map,
/// in which case it is continuous and also needs a normalization.
#[derive(Debug, Clone, PartialEq, Default, Serialize, Deserialize)]
pub struct LegendScheme {
    pub legend_type: LegendType,
    pub shape_type: ShapeType,
    pub breaks: Vec<ColorBreak>,
    pub color_map: Option<ColorMap>,
    pub normalize: Option<Normalize>,
    pub extend: ExtendMode,
}

impl LegendScheme {
    /// A scheme with one break applied to everything.
    #[must_use]
    pub fn single(shape_type: ShapeType, brk: ColorBreak) -> Self {
        Self {
            legend_type: LegendType::SingleSymbol,
            shape_type,
            breaks: vec![brk],
            ..Self::default()
        }
    }

    /// Graduated breaks between consecutive `values`; needs one color per interval.
    pub fn graduated(shape_type: ShapeType, values: &[f64], colors: &[Vec4]) -> Result<Self> {
        if values.len() < 2 {
            return Err(ChartError::MalformedLegend(
                "graduated scheme needs at least two values".into(),
            ));
        }
        if colors.len() != values.len() - 1 {
            return Err(ChartError::SizeMismatch {
                expected: values.len() - 1,
                actual: colors.len(),
            });
        }
        if values.windows(2).any(|w| w[0] >= w[1]) {
            return Err(ChartError::MalformedLegend(
                "graduated values must increase".into(),
            ));
        }
        let breaks = values
            .windows(2)
            .zip(colors)
            .map(|(w, c)| {
                break_for(shape_type, *c)
                    .with_range(w[0], w[1])
                    .with_caption(format!("{} - {}", w[0], w[1]))
            })
            .collect();
        Ok(Self {
            legend_type: LegendType::GraduatedColor,
            shape_type,
            breaks,
            ..Self::default()
        })
    }

    /// Graduated breaks colored by sampling `color_map` evenly.
    pub fn graduated_from_map(
        shape_type: ShapeType,
        values: &[f64],
        color_map: &ColorMap,
        extend: ExtendMode,
    ) -> Result<Self> {
        let n = values.len().saturating_sub(1);
        let mut scheme = Self::graduated(shape_type, values, &color_map.colors(n))?;
        scheme.extend = extend;
        Ok(scheme)
    }

    /// One break per distinct value.
    pub fn unique_values(shape_type: ShapeType, values: &[f64], colors: &[Vec4]) -> Result<Self> {
        if values.len() != colors.len() {
            return Err(ChartError::SizeMismatch {
                expected: values.len(),
                actual: colors.len(),
            });
        }
        let breaks = values
            .iter()
            .zip(colors)
            .map(|(v, c)| {
                break_for(shape_type, *c)
                    .with_range(*v, *v)
                    .with_caption(v.to_string())
            })
            .collect();
        Ok(Self {
            legend_type: LegendType::UniqueValue,
            shape_type,
            breaks,
            ..Self::default()
        })
    }

    /// A continuous scheme driven by a color map and a normalization.
    pub fn continuous(color_map: ColorMap, normalize: Normalize) -> Result<Self> {
        normalize.validate()?;
        Ok(Self {
            legend_type: LegendType::GraduatedColor,
            shape_type: ShapeType::Image,
            breaks: Vec::new(),
            color_map: Some(color_map),
            normalize: Some(normalize),
            extend: ExtendMode::Neither,
        })
    }

    #[must_use]
    pub fn with_extend(mut self, extend: ExtendMode) -> Self {
        self.extend = extend;
        self
    }

    /// Whether values are colored through a color map.
    #[must_use]
    pub fn is_continuous(&self) -> bool {
        self.color_map.is_some()
    }

    #[must_use]
    pub fn break_count(&self) -> usize {
        self.breaks.len()
    }

    /// Checks that the scheme can be drawn as a legend.
    pub fn validate(&self) -> Result<()> {
        if self.is_continuous() {
            let norm = self.normalize.as_ref().ok_or_else(|| {
                ChartError::MalformedLegend("continuous scheme without normalization".into())
            })?;
            norm.validate()
                .map_err(|e| ChartError::MalformedLegend(e.to_string()))?;
        } else if self.breaks.is_empty() {
            return Err(ChartError::MalformedLegend("scheme has no breaks".into()));
        }
        Ok(())
    }

    /// Smallest classified value.
    #[must_use]
    pub fn min_value(&self) -> f64 {
        match &self.normalize {
            Some(n) if self.is_continuous() => n.vmin(),
            _ => self.breaks.first().map_or(0.0, |b| b.start_value),
        }
    }

    /// Largest classified value.
    #[must_use]
    pub fn max_value(&self) -> f64 {
        match &self.normalize {
            Some(n) if self.is_continuous() => n.vmax(),
            _ => self.breaks.last().map_or(0.0, |b| b.end_value),
        }
    }

    /// Finds the break classifying `value`.
    ///
    /// The last graduated break also includes its end value. Values outside
    /// the breaks go to the end break only when the scheme extends that way.
    #[must_use]
    pub fn find_break(&self, value: f64) -> Option<&ColorBreak> {
        if value.is_nan() {
            return None;
        }
        match self.legend_type {
            LegendType::SingleSymbol => self.breaks.first(),
            LegendType::UniqueValue => self.breaks.iter().find(|b| b.start_value == value),
            LegendType::GraduatedColor => {
                let first = self.breaks.first()?;
                let last = self.breaks.last()?;
                if value < first.start_value {
                    return self.extend.extends_min().then_some(first);
                }
                if value > last.end_value {
                    return self.extend.extends_max().then_some(last);
                }
                if value == last.end_value {
                    return Some(last);
                }
                self.breaks.iter().find(|b| b.contains(value))
            }
        }
    }

    /// Color for `value`, or `None` when the value is masked or unclassified.
    #[must_use]
    pub fn color_for(&self, value: f64) -> Option<Vec4> {
        match (&self.color_map, &self.normalize) {
            (Some(map), Some(norm)) => {
                let t = norm.color_fraction(value);
                if t.is_nan() {
                    None
                } else {
                    Some(map.map(t))
                }
            }
            (Some(_), None) => None,
            _ => self.find_break(value).map(|b| b.color),
        }
    }

    /// Normalization used to position values along a legend bar.
    ///
    /// Discrete graduated schemes get a boundary norm over their breaks.
    #[must_use]
    pub fn positioning_norm(&self) -> Option<Normalize> {
        if let Some(n) = &self.normalize {
            return Some(n.clone());
        }
        if self.breaks.is_empty() {
            return None;
        }
        let mut bounds: Vec<f64> = self.breaks.iter().map(|b| b.start_value).collect();
        bounds.push(self.breaks.last()?.end_value);
        let norm = Normalize::boundary(bounds);
        norm.validate().ok().map(|()| norm)
    }
}

fn break_for(shape_type: ShapeType, color: Vec4) -> ColorBreak {
    match shape_type {
        ShapeType::Point => ColorBreak::point(color, 6.0),
        ShapeType::Polyline => ColorBreak::line(color, 1.0),
        ShapeType::Polygon => ColorBreak::polygon(color),
        ShapeType::Image => ColorBreak {
            kind: BreakKind::ColorBar,
            ..ColorBreak::color(color)
        },
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use glam::Vec3;

    fn red() -> Vec4 {
        Vec4::new(1.0, 0.0, 0.0, 1.0)
    }

    fn blue() -> Vec4 {
        Vec4::new(0.0, 0.0, 1.0, 1.0)
    }

    #[test]
    fn test_graduated_find_break() {
        let s = LegendScheme::graduated(ShapeType::Polygon, &[0.0, 10.0, 20.0], &[red(), blue()])
            .unwrap();
        assert_eq!(s.find_break(5.0).unwrap().color, red());
        assert_eq!(s.find_break(10.0).unwrap().color, blue());
        assert_eq!(s.find_break(20.0).unwrap().color, blue());
        assert!(s.find_break(-1.0).is_none());
        assert!(s.find_break(25.0).is_none());

        let s = s.with_extend(ExtendMode::Both);
        assert_eq!(s.find_break(-1.0).unwrap().color, red());
        assert_eq!(s.find_break(25.0).unwrap().color, blue());
    }

    #[test]
    fn test_graduated_size_mismatch() {
        let err = LegendScheme::graduated(ShapeType::Point, &[0.0, 1.0], &[red(), blue()]);
        assert!(matches!(err, Err(ChartError::SizeMismatch { .. })));
    }

    #[test]
    fn test_unique_values() {
        let s = LegendScheme::unique_values(ShapeType::Point, &[1.0, 2.0], &[red(), blue()])
            .unwrap();
        assert_eq!(s.color_for(2.0), Some(blue()));
        assert_eq!(s.color_for(1.5), None);
    }

    #[test]
    fn test_continuous_color_for() {
        let map = ColorMap::from_rgb("gray", &[Vec3::ZERO, Vec3::ONE]);
        let s = LegendScheme::continuous(map, Normalize::linear(0.0, 10.0)).unwrap();
        let c = s.color_for(5.0).unwrap();
        assert!((c.x - 0.5).abs() < 1e-6);
        assert!(s.validate().is_ok());
        assert_eq!(s.min_value(), 0.0);
        assert_eq!(s.max_value(), 10.0);
    }

    #[test]
    fn test_malformed_schemes() {
        assert!(LegendScheme::default().validate().is_err());
        let no_norm = LegendScheme {
            color_map: Some(ColorMap::from_rgb("gray", &[Vec3::ZERO, Vec3::ONE])),
            ..LegendScheme::default()
        };
        assert!(matches!(no_norm.validate(), Err(ChartError::MalformedLegend(_))));
        assert_eq!(no_norm.color_for(1.0), None);
    }

    #[test]
    fn test_positioning_norm_for_breaks() {
        let s = LegendScheme::graduated(
            ShapeType::Polygon,
            &[0.0, 1.0, 10.0, 100.0],
            &[red(), red(), blue()],
        )
        .unwrap();
        let n = s.positioning_norm().unwrap();
        assert!((n.normalize(10.0) - 2.0 / 3.0).abs() < 1e-12);
    }
}
