//! Individual legend breaks.

use glam::Vec4;
use serde::{Deserialize, Serialize};

/// Marker drawn for a point break.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default, Serialize, Deserialize)]
pub enum MarkerKind {
    #[default]
    Circle,
    Square,
    Triangle,
    Diamond,
    /// A lit 3D sphere instead of a flat marker.
    Sphere,
}

/// Dash pattern of a line break.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default, Serialize, Deserialize)]
pub enum LineDash {
    #[default]
    Solid,
    Dash,
    Dot,
    DashDot,
}

impl LineDash {
    /// On/off lengths in multiples of the line width. Empty for solid lines.
    #[must_use]
    pub fn pattern(self) -> &'static [f32] {
        match self {
            Self::Solid => &[],
            Self::Dash => &[6.0, 3.0],
            Self::Dot => &[1.0, 2.0],
            Self::DashDot => &[6.0, 2.0, 1.0, 2.0],
        }
    }
}

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct PointStyle {
    /// Marker size in pixels (or sphere radius in normalized units * 100).
    pub size: f32,
    pub marker: MarkerKind,
    pub draw_outline: bool,
    pub outline_color: Vec4,
}

impl Default for PointStyle {
    fn default() -> Self {
        Self {
            size: 6.0,
            marker: MarkerKind::default(),
            draw_outline: false,
            outline_color: Vec4::new(0.0, 0.0, 0.0, 1.0),
        }
    }
}

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct LineStyle {
    /// Line width in pixels.
    pub width: f32,
    pub dash: LineDash,
    /// Draw point markers at the vertices.
    pub draw_symbol: bool,
}

impl Default for LineStyle {
    fn default() -> Self {
        Self {
            width: 1.0,
            dash: LineDash::default(),
            draw_symbol: false,
        }
    }
}

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct PolygonStyle {
    pub draw_fill: bool,
    pub draw_outline: bool,
    pub outline_color: Vec4,
    pub outline_size: f32,
}

impl Default for PolygonStyle {
    fn default() -> Self {
        Self {
            draw_fill: true,
            draw_outline: true,
            outline_color: Vec4::new(0.0, 0.0, 0.0, 1.0),
            outline_size: 1.0,
        }
    }
}

/// Shape-specific part of a break.
#[derive(Debug, Clone, PartialEq, Default, Serialize, Deserialize)]
pub enum BreakKind {
    /// Color only, no shape attributes.
    #[default]
    Color,
    Point(PointStyle),
    Line(LineStyle),
    Polygon(PolygonStyle),
    /// A cell of a continuous colorbar.
    ColorBar,
}

/// One classification rule: a value range and the style drawn for it.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct ColorBreak {
    pub start_value: f64,
    pub end_value: f64,
    pub caption: String,
    pub color: Vec4,
    pub draw_shape: bool,
    pub kind: BreakKind,
}

impl Default for ColorBreak {
    fn default() -> Self {
        Self {
            start_value: 0.0,
            end_value: 0.0,
            caption: String::new(),
            color: Vec4::new(0.0, 0.0, 0.0, 1.0),
            draw_shape: true,
            kind: BreakKind::Color,
        }
    }
}

impl ColorBreak {
    /// A plain color break.
    #[must_use]
    pub fn color(color: Vec4) -> Self {
        Self {
            color,
            ..Self::default()
        }
    }

    #[must_use]
    pub fn point(color: Vec4, size: f32) -> Self {
        Self {
            color,
            kind: BreakKind::Point(PointStyle {
                size,
                ..PointStyle::default()
            }),
            ..Self::default()
        }
    }

    #[must_use]
    pub fn line(color: Vec4, width: f32) -> Self {
        Self {
            color,
            kind: BreakKind::Line(LineStyle {
                width,
                ..LineStyle::default()
            }),
            ..Self::default()
        }
    }

    #[must_use]
    pub fn polygon(color: Vec4) -> Self {
        Self {
            color,
            kind: BreakKind::Polygon(PolygonStyle::default()),
            ..Self::default()
        }
    }

    /// Sets the value range `[start, end)`.
    #[must_use]
    pub fn with_range(mut self, start: f64, end: f64) -> Self {
        self.start_value = start;
        self.end_value = end;
        self
    }

    #[must_use]
    pub fn with_caption(mut self, caption: impl Into<String>) -> Self {
        self.caption = caption.into();
        self
    }

    /// Whether `value` falls in this break.
    ///
    /// A break whose start equals its end matches that single value.
    #[must_use]
    pub fn contains(&self, value: f64) -> bool {
        if self.start_value == self.end_value {
            value == self.start_value
        } else {
            value >= self.start_value && value < self.end_value
        }
    }

    /// Point size in pixels, or a default for non-point breaks.
    #[must_use]
    pub fn size(&self) -> f32 {
        match &self.kind {
            BreakKind::Point(p) => p.size,
            BreakKind::Line(l) => l.width,
            BreakKind::Polygon(p) => p.outline_size,
            BreakKind::Color | BreakKind::ColorBar => 1.0,
        }
    }

    /// Whether polygon interiors should be filled.
    #[must_use]
    pub fn draws_fill(&self) -> bool {
        match &self.kind {
            BreakKind::Polygon(p) => p.draw_fill,
            _ => true,
        }
    }

    /// A line break tracing this break's outline, if it has one.
    ///
    /// The result is an independent copy; editing it never changes `self`.
    #[must_use]
    pub fn outline_variant(&self) -> Option<ColorBreak> {
        match &self.kind {
            BreakKind::Polygon(p) if p.draw_outline => Some(ColorBreak {
                color: p.outline_color,
                kind: BreakKind::Line(LineStyle {
                    width: p.outline_size,
                    ..LineStyle::default()
                }),
                ..self.clone()
            }),
            BreakKind::Point(p) if p.draw_outline => Some(ColorBreak {
                color: p.outline_color,
                kind: BreakKind::Line(LineStyle::default()),
                ..self.clone()
            }),
            _ => None,
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_contains_half_open() {
        let b = ColorBreak::color(Vec4::ONE).with_range(0.0, 10.0);
        assert!(b.contains(0.0));
        assert!(b.contains(9.99));
        assert!(!b.contains(10.0));
        let unique = ColorBreak::color(Vec4::ONE).with_range(3.0, 3.0);
        assert!(unique.contains(3.0));
        assert!(!unique.contains(3.1));
    }

    #[test]
    fn test_outline_variant_is_a_copy() {
        let mut poly = ColorBreak::polygon(Vec4::new(1.0, 0.0, 0.0, 1.0)).with_caption("land");
        let mut outline = poly.outline_variant().unwrap();
        assert!(matches!(outline.kind, BreakKind::Line(_)));
        assert_eq!(outline.color, Vec4::new(0.0, 0.0, 0.0, 1.0));
        assert_eq!(outline.caption, "land");

        outline.caption.push_str(" outline");
        poly.color = Vec4::ZERO;
        assert_eq!(poly.caption, "land");
        assert_eq!(outline.color, Vec4::new(0.0, 0.0, 0.0, 1.0));
    }

    #[test]
    fn test_no_outline_when_disabled() {
        let mut poly = ColorBreak::polygon(Vec4::ONE);
        if let BreakKind::Polygon(p) = &mut poly.kind {
            p.draw_outline = false;
        }
        assert!(poly.outline_variant().is_none());
        assert!(ColorBreak::line(Vec4::ONE, 2.0).outline_variant().is_none());
    }
}
