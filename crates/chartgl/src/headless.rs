//! Offscreen rendering to images and files.
//!
//! Each call creates its own GPU device, so these work without a window and
//! without a prior [`Figure::initialize`](crate::Figure::initialize).

use std::path::Path;

use chartgl_core::Scene;
use chartgl_render::{save_image, FrameRequest, RenderEngine, WgpuBackend};
use image::RgbaImage;
use pollster::FutureExt;

use crate::error::{Error, Result};
use crate::figure::Figure;

/// Multisample count used by the headless helpers.
pub const HEADLESS_SAMPLE_COUNT: u32 = 4;

/// Renders one frame of `scene` and returns its pixels.
///
/// Text labels are not rasterized; they are placed by the engine and
/// returned by [`Figure::render`] for hosts that draw text themselves.
///
/// # Example
/// ```no_run
/// use chartgl::*;
///
/// let mut scene = Scene::new();
/// scene.add_graphic(Graphic::new(
///     Shape::Points { points: vec![DVec3::ZERO, DVec3::ONE], values: None },
///     ColorBreak::point(Vec4::new(1.0, 0.0, 0.0, 1.0), 6.0),
/// ));
/// let image = render_to_image(&scene, 800, 600).unwrap();
/// assert_eq!(image.dimensions(), (800, 600));
/// ```
pub fn render_to_image(scene: &Scene, width: u32, height: u32) -> Result<RgbaImage> {
    let backend = WgpuBackend::new_headless(HEADLESS_SAMPLE_COUNT).block_on()?;
    let mut engine = RenderEngine::new(backend);
    engine.initialize(width, height)?;
    engine.request_screenshot();
    let report = engine.render(scene, FrameRequest::new(width, height));
    engine.dispose();
    report?.screenshot.ok_or(Error::NoImage)
}

/// Renders one frame of `scene` and saves it; the format follows the
/// file extension (`png`, `jpg`, `jpeg`).
pub fn render_to_file(
    scene: &Scene,
    path: impl AsRef<Path>,
    width: u32,
    height: u32,
) -> Result<()> {
    let path = path.as_ref();
    let image = render_to_image(scene, width, height)?;
    save_image(path, &image)?;
    log::info!("Screenshot saved to {}", path.display());
    Ok(())
}

impl Figure<WgpuBackend> {
    /// A figure drawn offscreen by wgpu, already initialized.
    pub fn headless(width: u32, height: u32) -> Result<Self> {
        let backend = WgpuBackend::new_headless(HEADLESS_SAMPLE_COUNT).block_on()?;
        let figure = Self::new(backend);
        figure.initialize(width, height)?;
        Ok(figure)
    }
}
