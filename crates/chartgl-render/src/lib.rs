//! Rendering for chartgl.
//!
//! This crate turns a [`chartgl_core::Scene`] into frames:
//! - the [`RenderEngine`] state machine and per-frame [`FrameReport`]
//! - shape tessellation into normalized-space [`Geometry`]
//! - the [`BufferCache`] that keeps uploads alive across frames
//! - axes, legend and title decorations
//! - the [`RenderBackend`] seam, with a wgpu implementation and a
//!   recording one for tests and exporters

// Documentation lints - internal functions don't need exhaustive panic/error docs
#![allow(clippy::missing_panics_doc)]
#![allow(clippy::missing_errors_doc)]
#![allow(clippy::must_use_candidate)]
#![allow(clippy::module_name_repetitions)]
#![allow(clippy::similar_names)]
#![allow(clippy::too_many_lines)]
#![allow(clippy::float_cmp)]

pub mod axes;
pub mod backend;
pub mod buffer;
pub mod cache;
pub mod engine;
pub mod error;
pub mod legend;
pub mod recording;
pub mod screenshot;
pub mod tessellate;
pub mod triangulate;
pub mod wgpu_backend;

pub use backend::{
    Batch, FrameSetup, Geometry, GeometryHandle, HAlign, OverlayBatch, OverlayVertex,
    RenderBackend, TextLabel, TexturedQuad, TexturedVertex, Topology, VAlign, Vertex,
    ViewUniforms, WorldLabel,
};
pub use cache::{BufferCache, CacheEntry};
pub use engine::{
    EngineState, FrameReport, FrameRequest, LegendStatus, RenderEngine, SkipReason,
    SkippedGraphic,
};
pub use error::{RenderError, RenderResult};
pub use legend::{LegendCell, LegendGeometry};
pub use recording::{Command, RecordingBackend, RecordingStats};
pub use screenshot::{encode_png, image_from_rgba, save_image, ScreenshotError};
pub use tessellate::{tessellate, TessellationContext};
pub use wgpu_backend::WgpuBackend;
