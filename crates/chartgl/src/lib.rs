//! chartgl: a Rust-native 3D scientific plotting core.
//!
//! A plot is a [`Scene`]: a tree of [`Graphic`]s in data coordinates, the
//! extents that map them into a normalized cube, three axes, a camera and
//! an optional legend. A [`Figure`] pairs a scene with a [`RenderEngine`]
//! behind one lock, so interaction and rendering can come from different
//! threads.
//!
//! # Quick Start
//!
//! ```no_run
//! use chartgl::*;
//!
//! fn main() -> Result<()> {
//!     init_logging();
//!
//!     let figure = Figure::headless(800, 600)?;
//!     figure.add_graphic(Graphic::new(
//!         Shape::Mesh {
//!             vertices: vec![DVec3::ZERO, DVec3::X, DVec3::Y],
//!             triangles: vec![[0, 1, 2]],
//!             values: None,
//!         },
//!         ColorBreak::polygon(Vec4::new(0.2, 0.4, 0.8, 1.0)),
//!     ));
//!     figure.set_title("one triangle");
//!
//!     figure.request_screenshot();
//!     let report = figure.render(FrameRequest::new(800, 600))?;
//!     if let Some(image) = report.screenshot {
//!         save_image("triangle.png", &image)?;
//!     }
//!     Ok(())
//! }
//! ```
//!
//! # Crates
//!
//! - `chartgl-core`: extents, transforms, axes, graphics, legend schemes,
//!   camera and the interaction model. No GPU types.
//! - `chartgl-render`: the engine state machine, tessellation, the buffer
//!   cache, decorations and the backends.

mod error;
mod figure;
mod headless;
mod init;

pub use error::{Error, Result};
pub use figure::Figure;
pub use headless::{render_to_file, render_to_image, HEADLESS_SAMPLE_COUNT};
pub use init::init_logging;

// Re-export core types
pub use chartgl_core::{
    interact, Axis, AxisKind, AxisScale, CameraState, ChartError, ClipPlane, ColorBreak,
    ColorMap, ColorMapRegistry, Content, ExtendMode, Extent3D, Graphic, GraphicCollection,
    GraphicId, ImageData, Interaction, InteractionConfig, InteractionEvent, LegendOptions,
    LegendPosition, LegendScheme, LegendType, Lighting, LineDash, LineStyle, MarkerKind,
    Modifiers, Normalize, Orientation, PlotOptions, PointStyle, PointerButton, PolygonStyle,
    Projection, ProjectionMode, Scene, Shape, ShapeKind, ShapeType, Style, Transform, ViewState,
    VolumeGrid, ZoomPolicy,
};
pub use chartgl_core::{DVec3, Mat4, Vec2, Vec3, Vec4};

// Re-export render types
pub use chartgl_render::{
    encode_png, save_image, EngineState, FrameReport, FrameRequest, HAlign, LegendStatus,
    RecordingBackend, RenderBackend, RenderEngine, RenderError, ScreenshotError, SkipReason,
    SkippedGraphic, TextLabel, VAlign, WgpuBackend,
};
