//! Rendering error types.

use chartgl_core::{ChartError, ShapeKind};
use thiserror::Error;

use crate::engine::EngineState;
use crate::screenshot::ScreenshotError;

/// Errors that can occur during rendering operations.
#[derive(Error, Debug)]
pub enum RenderError {
    /// Failed to create wgpu adapter.
    #[error("failed to create graphics adapter")]
    AdapterCreationFailed,

    /// Failed to create wgpu device.
    #[error("failed to create graphics device: {0}")]
    DeviceCreationFailed(#[from] wgpu::RequestDeviceError),

    /// The backend lost its context; every handle it gave out is invalid.
    #[error("rendering context lost: {0}")]
    ContextLost(String),

    /// The engine is not in a state that allows the operation.
    #[error("invalid engine state: expected {expected:?}, found {actual:?}")]
    InvalidState {
        expected: EngineState,
        actual: EngineState,
    },

    /// Viewport with a zero dimension.
    #[error("invalid viewport {width}x{height}")]
    InvalidViewport { width: u32, height: u32 },

    /// The backend cannot draw this shape kind.
    #[error("no draw routine for {0}")]
    Unsupported(ShapeKind),

    /// A handle the backend does not know.
    #[error("unknown geometry handle {0}")]
    UnknownHandle(u64),

    /// Texture creation failed.
    #[error("texture creation failed: {0}")]
    TextureCreationFailed(String),

    /// Model-level error (bad geometry, malformed legend).
    #[error(transparent)]
    Chart(#[from] ChartError),

    /// Capturing or encoding the frame failed.
    #[error(transparent)]
    Screenshot(#[from] ScreenshotError),
}

impl RenderError {
    /// Whether the engine must be re-initialized after this error.
    #[must_use]
    pub fn is_context_lost(&self) -> bool {
        matches!(self, Self::ContextLost(_))
    }
}

/// A specialized Result type for rendering operations.
pub type RenderResult<T> = std::result::Result<T, RenderError>;
