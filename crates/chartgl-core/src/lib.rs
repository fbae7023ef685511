//! Core abstractions for chartgl.
//!
//! This crate holds everything about a 3D plot that does not touch the GPU:
//! - [`Extent3D`] and the [`Transform`] into the normalized cube
//! - [`Axis`] tick generation and label formatting
//! - the [`Graphic`] tree and its [`Shape`] variants
//! - [`LegendScheme`], [`ColorBreak`], [`Normalize`] and [`ColorMap`]
//! - [`CameraState`] and the pure [`interact`] function
//! - [`Scene`], which owns the draw/axes extent state

// Documentation lints - internal functions don't need exhaustive panic/error docs
#![allow(clippy::missing_panics_doc)]
#![allow(clippy::missing_errors_doc)]
// Options structs legitimately have many boolean flags
#![allow(clippy::struct_excessive_bools)]
// Builder patterns return Self which doesn't need must_use
#![allow(clippy::must_use_candidate)]
// Exact float comparisons are intended for extents and break bounds
#![allow(clippy::float_cmp)]
#![allow(clippy::module_name_repetitions)]

pub mod axis;
pub mod camera;
pub mod clip_plane;
pub mod color_map;
pub mod error;
pub mod extent;
pub mod graphic;
pub mod interaction;
pub mod legend;
pub mod normalize;
pub mod options;
pub mod scene;
pub mod transform;

pub use axis::{Axis, AxisKind, AxisScale, TickLabel, TickSet};
pub use camera::{CameraState, Projection, ProjectionMode, ProjectionSnapshot};
pub use clip_plane::{clip_box, ClipPlane, ClipPlaneUniforms, MAX_CLIP_PLANES};
pub use color_map::{ColorMap, ColorMapRegistry};
pub use error::{ChartError, Result};
pub use extent::{Extent3D, FLAT_AXIS_PAD, MIN_AXIS_SPAN};
pub use graphic::{
    Content, Graphic, GraphicCollection, GraphicId, ImageData, Shape, ShapeKind, Style,
    VolumeGrid,
};
pub use interaction::{
    interact, Interaction, InteractionConfig, InteractionEvent, Modifiers, PointerButton,
    ViewState, ZoomPolicy,
};
pub use legend::{
    BreakKind, ColorBreak, ExtendMode, LegendScheme, LegendType, LineDash, LineStyle, MarkerKind,
    PointStyle, PolygonStyle, ShapeType,
};
pub use normalize::Normalize;
pub use options::{
    LegendOptions, LegendPosition, Lighting, LightingUniforms, Orientation, PlotOptions,
};
pub use scene::{LegendSpec, Scene};
pub use transform::Transform;

// Re-export glam types for convenience
pub use glam::{DVec3, Mat4, Vec2, Vec3, Vec4};
