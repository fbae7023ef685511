//! Legend breaks and schemes.

mod color_break;
mod scheme;

pub use color_break::{
    BreakKind, ColorBreak, LineDash, LineStyle, MarkerKind, PointStyle, PolygonStyle,
};
pub use scheme::{ExtendMode, LegendScheme, LegendType, ShapeType};
