//! Errors surfaced by the facade.

use chartgl_core::ChartError;
use chartgl_render::{RenderError, ScreenshotError};
use thiserror::Error;

#[derive(Error, Debug)]
pub enum Error {
    /// Bad model input: degenerate extent, unknown graphic, malformed legend.
    #[error(transparent)]
    Chart(#[from] ChartError),

    #[error(transparent)]
    Render(#[from] RenderError),

    #[error(transparent)]
    Screenshot(#[from] ScreenshotError),

    /// A frame was rendered but nothing was captured.
    #[error("frame produced no image")]
    NoImage,
}

impl Error {
    /// Whether the figure must be re-initialized before the next frame.
    #[must_use]
    pub fn is_context_lost(&self) -> bool {
        matches!(self, Self::Render(e) if e.is_context_lost())
    }
}

pub type Result<T> = std::result::Result<T, Error>;
