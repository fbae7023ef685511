//! A shared handle over one plot and the engine that draws it.
//!
//! Interaction and rendering may be driven from different threads; both
//! take the same lock, so a drag handler never mutates the camera or the
//! extents while a frame is being built, and a render request waits for
//! the previous frame to finish.

use std::sync::{Arc, PoisonError, RwLock};

use chartgl_core::{Graphic, GraphicId, InteractionEvent, LegendOptions, LegendScheme, Scene};
use chartgl_render::{
    EngineState, FrameReport, FrameRequest, RecordingBackend, RenderBackend, RenderEngine,
};

use crate::error::Result;

struct FigureState<B: RenderBackend> {
    scene: Scene,
    engine: RenderEngine<B>,
}

/// Cloneable, thread-safe plot handle.
pub struct Figure<B: RenderBackend = RecordingBackend> {
    inner: Arc<RwLock<FigureState<B>>>,
}

impl<B: RenderBackend> Clone for Figure<B> {
    fn clone(&self) -> Self {
        Self {
            inner: Arc::clone(&self.inner),
        }
    }
}

impl<B: RenderBackend> Figure<B> {
    /// Creates an empty plot drawn by `backend`. Call [`Figure::initialize`]
    /// before the first frame.
    pub fn new(backend: B) -> Self {
        Self::with_scene(Scene::new(), backend)
    }

    pub fn with_scene(scene: Scene, backend: B) -> Self {
        Self {
            inner: Arc::new(RwLock::new(FigureState {
                scene,
                engine: RenderEngine::new(backend),
            })),
        }
    }

    // A panic in a caller's closure leaves the plot state itself consistent,
    // so poisoning is ignored.
    fn read<R>(&self, f: impl FnOnce(&FigureState<B>) -> R) -> R {
        let guard = self.inner.read().unwrap_or_else(PoisonError::into_inner);
        f(&guard)
    }

    fn write<R>(&self, f: impl FnOnce(&mut FigureState<B>) -> R) -> R {
        let mut guard = self.inner.write().unwrap_or_else(PoisonError::into_inner);
        f(&mut guard)
    }

    /// Reads the plot state.
    pub fn scene<R>(&self, f: impl FnOnce(&Scene) -> R) -> R {
        self.read(|s| f(&s.scene))
    }

    /// Mutates the plot state. Graphics removed here are released on the
    /// next frame; use [`Figure::remove_graphic`] to release them at once.
    pub fn scene_mut<R>(&self, f: impl FnOnce(&mut Scene) -> R) -> R {
        self.write(|s| f(&mut s.scene))
    }

    /// Accesses the engine, for example to inspect the backend.
    pub fn engine<R>(&self, f: impl FnOnce(&mut RenderEngine<B>) -> R) -> R {
        self.write(|s| f(&mut s.engine))
    }

    pub fn state(&self) -> EngineState {
        self.read(|s| s.engine.state())
    }

    /// Creates the backend context. Also the recovery path after a lost context.
    pub fn initialize(&self, width: u32, height: u32) -> Result<()> {
        self.write(|s| {
            s.engine.initialize(width, height)?;
            #[allow(clippy::cast_precision_loss)]
            s.scene.set_viewport(width as f32, height as f32);
            Ok(())
        })
    }

    pub fn add_graphic(&self, graphic: Graphic) -> GraphicId {
        self.write(|s| s.scene.add_graphic(graphic))
    }

    pub fn insert_graphic(&self, index: usize, graphic: Graphic) -> Result<GraphicId> {
        self.write(|s| Ok(s.scene.insert_graphic(index, graphic)?))
    }

    /// Removes a graphic and frees any buffers uploaded for it or its children.
    pub fn remove_graphic(&self, id: GraphicId) -> Result<Vec<GraphicId>> {
        self.write(|s| {
            let removed = s.scene.remove_graphic(id)?;
            for leaf in &removed {
                s.engine.release_graphic(*leaf);
            }
            Ok(removed)
        })
    }

    pub fn set_legend(&self, scheme: LegendScheme, options: LegendOptions) {
        self.write(|s| s.scene.set_legend(scheme, options));
    }

    pub fn set_title(&self, title: impl Into<String>) {
        self.write(|s| s.scene.set_title(title));
    }

    /// Feeds a pointer, wheel or resize event to the camera model.
    ///
    /// Returns whether the plot needs repainting.
    pub fn handle_event(&self, event: &InteractionEvent) -> bool {
        self.write(|s| s.scene.apply_interaction(event))
    }

    /// Restores the full data extent and the default camera.
    pub fn undo_zoom(&self) {
        self.write(|s| s.scene.undo_zoom());
    }

    /// Captures the next frame into [`FrameReport::screenshot`].
    pub fn request_screenshot(&self) {
        self.write(|s| s.engine.request_screenshot());
    }

    /// Re-uploads every cached graphic on the next frame.
    pub fn set_always_update_buffers(&self) {
        self.write(|s| s.engine.set_always_update_buffers());
    }

    /// Draws one frame.
    pub fn render(&self, request: FrameRequest) -> Result<FrameReport> {
        self.write(|s| {
            #[allow(clippy::cast_precision_loss)]
            s.scene
                .set_viewport(request.width as f32, request.height as f32);
            Ok(s.engine.render(&s.scene, request)?)
        })
    }

    /// Releases the backend. The plot state is kept.
    pub fn dispose(&self) {
        self.write(|s| s.engine.dispose());
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use chartgl_core::{ColorBreak, DVec3, Shape, Vec4};

    fn mesh() -> Graphic {
        Graphic::new(
            Shape::Mesh {
                vertices: vec![DVec3::ZERO, DVec3::X, DVec3::Y],
                triangles: vec![[0, 1, 2]],
                values: None,
            },
            ColorBreak::polygon(Vec4::ONE),
        )
    }

    #[test]
    fn test_clones_share_state() {
        let figure = Figure::new(RecordingBackend::new());
        let other = figure.clone();
        other.add_graphic(mesh());
        assert_eq!(figure.scene(|s| s.graphics().len()), 1);
    }

    #[test]
    fn test_render_from_another_thread() {
        let figure = Figure::new(RecordingBackend::new());
        figure.add_graphic(mesh());
        figure.initialize(64, 48).unwrap();
        let worker = figure.clone();
        let handle = std::thread::spawn(move || worker.render(FrameRequest::new(64, 48)));
        figure.handle_event(&InteractionEvent::Wheel {
            ticks: 1.0,
            modifiers: chartgl_core::Modifiers::NONE,
        });
        let report = handle.join().unwrap().unwrap();
        assert_eq!(report.drawn.len(), 1);
    }
}
