//! Plot state: graphics, extents, camera and decorations.
//!
//! The scene tracks two extents. The draw extent is the window the camera
//! currently shows and drives the [`Transform`]. The axes extent positions
//! axis lines, ticks and the bounding box. It follows the draw extent
//! unless axes zoom is on, in which case it stays put while the camera
//! pans and zooms.

use std::sync::Arc;

use glam::{DVec3, Vec2};

use crate::axis::{Axis, AxisKind};
use crate::camera::{CameraState, Projection};
use crate::error::Result;
use crate::extent::Extent3D;
use crate::graphic::{Graphic, GraphicCollection, GraphicId};
use crate::interaction::{interact, InteractionEvent, ViewState};
use crate::legend::LegendScheme;
use crate::options::{LegendOptions, PlotOptions};
use crate::transform::Transform;

/// A legend scheme plus how to lay it out.
#[derive(Debug, Clone, PartialEq)]
pub struct LegendSpec {
    pub scheme: Arc<LegendScheme>,
    pub options: LegendOptions,
}

/// One 3D plot.
#[derive(Debug, Clone)]
pub struct Scene {
    graphics: GraphicCollection,
    view: ViewState,
    axes_extent: Extent3D,
    transform: Transform,
    fix_extent: bool,
    axes_zoom: bool,
    axes: [Axis; 3],
    title: String,
    legend: Option<LegendSpec>,
    options: PlotOptions,
}

impl Default for Scene {
    fn default() -> Self {
        Self::new()
    }
}

impl Scene {
    pub fn new() -> Self {
        let extent = Extent3D::default();
        let mut scene = Self {
            graphics: GraphicCollection::new(),
            view: ViewState::new(extent, Vec2::new(800.0, 600.0)),
            axes_extent: extent,
            transform: Transform::default(),
            fix_extent: false,
            axes_zoom: false,
            axes: [
                Axis::new(AxisKind::X),
                Axis::new(AxisKind::Y),
                Axis::new(AxisKind::Z),
            ],
            title: String::new(),
            legend: None,
            options: PlotOptions::default(),
        };
        scene.sync_axes();
        scene
    }

    pub fn graphics(&self) -> &GraphicCollection {
        &self.graphics
    }

    /// Appends a graphic. Unless the extent is fixed, the view resets to the new data.
    pub fn add_graphic(&mut self, graphic: Graphic) -> GraphicId {
        let id = self.graphics.add(graphic);
        log::debug!("added graphic {id}");
        self.on_data_changed();
        id
    }

    /// Inserts a graphic at `index` in draw order.
    pub fn insert_graphic(&mut self, index: usize, graphic: Graphic) -> Result<GraphicId> {
        let id = self.graphics.insert(index, graphic)?;
        log::debug!("inserted graphic {id} at {index}");
        self.on_data_changed();
        Ok(id)
    }

    /// Removes a graphic and returns the ids of every leaf removed with it.
    pub fn remove_graphic(&mut self, id: GraphicId) -> Result<Vec<GraphicId>> {
        let removed = self.graphics.remove(id)?;
        let ids = match removed.children() {
            Some(children) => children.leaf_ids(),
            None => vec![removed.id()],
        };
        log::debug!("removed graphic {id} ({} leaves)", ids.len());
        self.on_data_changed();
        Ok(ids)
    }

    /// Removes every graphic, returning the removed leaf ids.
    pub fn clear_graphics(&mut self) -> Vec<GraphicId> {
        let ids = self.graphics.leaf_ids();
        self.graphics.clear();
        self.on_data_changed();
        ids
    }

    /// Edits a graphic in place.
    ///
    /// The view is refit only when the edit moved the data extent; style and
    /// visibility edits keep the current pan and zoom.
    pub fn update_graphic<R>(
        &mut self,
        id: GraphicId,
        f: impl FnOnce(&mut Graphic) -> R,
    ) -> Result<R> {
        let before = self.graphics.extent();
        let r = self.graphics.update(id, f)?;
        if self.graphics.extent() != before {
            self.on_data_changed();
        }
        Ok(r)
    }

    fn on_data_changed(&mut self) {
        if self.fix_extent {
            return;
        }
        let extent = self.data_extent();
        self.view.full_extent = extent;
        if let Err(e) = self.apply_draw_extent(extent, true) {
            log::warn!("data extent rejected: {e}");
        }
    }

    /// Extent of the data in world space, padded so every axis is displayable.
    ///
    /// Falls back to the default cube when there is no data.
    pub fn data_extent(&self) -> Extent3D {
        let Some(extent) = self.graphics.extent() else {
            return Extent3D::default();
        };
        let world = match self.view.projection {
            Projection::Flat => extent,
            Projection::Spherical { radius } => {
                let r = radius + extent.min_z.abs().max(extent.max_z.abs());
                Extent3D::from_corners(DVec3::splat(-r), DVec3::splat(r))
            }
        };
        world.with_min_span()
    }

    pub fn is_fix_extent(&self) -> bool {
        self.fix_extent
    }

    /// When set, adding or removing graphics keeps the current extents.
    pub fn set_fix_extent(&mut self, fix: bool) {
        self.fix_extent = fix;
    }

    pub fn draw_extent(&self) -> Extent3D {
        self.view.draw_extent
    }

    pub fn axes_extent(&self) -> Extent3D {
        self.axes_extent
    }

    /// The snapshot undo-zoom returns to.
    pub fn full_extent(&self) -> Extent3D {
        self.view.full_extent
    }

    /// Sets the camera window. The axes extent follows unless axes zoom is on.
    ///
    /// A degenerate extent is rejected and nothing changes.
    pub fn set_draw_extent(&mut self, extent: Extent3D) -> Result<()> {
        self.apply_draw_extent(extent, false)
    }

    fn apply_draw_extent(&mut self, extent: Extent3D, force_axes: bool) -> Result<()> {
        self.transform.set_extent(&extent)?;
        self.view.draw_extent = extent;
        if force_axes || !self.axes_zoom {
            self.axes_extent = extent;
            self.sync_axes();
        }
        Ok(())
    }

    /// Sets where axes and the bounding box are drawn.
    pub fn set_axes_extent(&mut self, extent: Extent3D) -> Result<()> {
        Transform::new(&extent)?;
        self.axes_extent = extent;
        self.sync_axes();
        Ok(())
    }

    /// Also replaces the undo-zoom snapshot.
    pub fn set_full_extent(&mut self, extent: Extent3D) -> Result<()> {
        self.set_draw_extent(extent)?;
        self.view.full_extent = extent;
        Ok(())
    }

    pub fn is_axes_zoom(&self) -> bool {
        self.axes_zoom
    }

    /// Toggles axes zoom. Turning it off snaps the axes back onto the draw extent.
    pub fn set_axes_zoom(&mut self, axes_zoom: bool) {
        self.axes_zoom = axes_zoom;
        if !axes_zoom {
            self.axes_extent = self.view.draw_extent;
            self.sync_axes();
        }
    }

    /// Restores the full extent and the default camera angles.
    pub fn undo_zoom(&mut self) {
        self.apply_interaction(&InteractionEvent::UndoZoom);
    }

    /// Feeds one pointer or wheel event through the interaction model.
    ///
    /// Returns whether the plot needs repainting.
    pub fn apply_interaction(&mut self, event: &InteractionEvent) -> bool {
        let result = interact(&self.view, event, &self.options.interaction);
        let mut next = result.state;
        if next.draw_extent != self.view.draw_extent {
            if let Err(e) = self.transform.set_extent(&next.draw_extent) {
                log::warn!("interaction produced an unusable extent: {e}");
                next.draw_extent = self.view.draw_extent;
            } else if !self.axes_zoom {
                self.axes_extent = next.draw_extent;
            }
        }
        self.view = next;
        self.sync_axes();
        result.repaint
    }

    pub fn view_state(&self) -> &ViewState {
        &self.view
    }

    pub fn transform(&self) -> &Transform {
        &self.transform
    }

    pub fn camera(&self) -> &CameraState {
        &self.view.camera
    }

    pub fn camera_mut(&mut self) -> &mut CameraState {
        &mut self.view.camera
    }

    pub fn projection(&self) -> Projection {
        self.view.projection
    }

    /// Switches the projection strategy and refits the view to the data.
    pub fn set_projection(&mut self, projection: Projection) {
        self.view.projection = projection;
        let extent = self.data_extent();
        self.view.full_extent = extent;
        if let Err(e) = self.apply_draw_extent(extent, true) {
            log::warn!("projected extent rejected: {e}");
        }
    }

    pub fn viewport(&self) -> Vec2 {
        self.view.viewport
    }

    pub fn set_viewport(&mut self, width: f32, height: f32) {
        self.view.viewport = Vec2::new(width, height);
    }

    pub fn axis(&self, kind: AxisKind) -> &Axis {
        &self.axes[kind.index()]
    }

    pub fn axis_mut(&mut self, kind: AxisKind) -> &mut Axis {
        &mut self.axes[kind.index()]
    }

    fn sync_axes(&mut self) {
        for (i, axis) in self.axes.iter_mut().enumerate() {
            let (lo, hi) = self.axes_extent.axis_range(i);
            axis.set_range(lo, hi);
        }
    }

    pub fn title(&self) -> &str {
        &self.title
    }

    pub fn set_title(&mut self, title: impl Into<String>) {
        self.title = title.into();
    }

    pub fn legend(&self) -> Option<&LegendSpec> {
        self.legend.as_ref()
    }

    pub fn set_legend(&mut self, scheme: impl Into<Arc<LegendScheme>>, options: LegendOptions) {
        self.legend = Some(LegendSpec {
            scheme: scheme.into(),
            options,
        });
    }

    pub fn clear_legend(&mut self) {
        self.legend = None;
    }

    pub fn options(&self) -> &PlotOptions {
        &self.options
    }

    pub fn options_mut(&mut self) -> &mut PlotOptions {
        &mut self.options
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::graphic::{Shape, Style};
    use crate::interaction::Modifiers;
    use crate::legend::ColorBreak;
    use glam::Vec4;

    fn points(pts: &[[f64; 3]]) -> Graphic {
        Graphic::new(
            Shape::Points {
                points: pts.iter().map(|p| DVec3::from_array(*p)).collect(),
                values: None,
            },
            ColorBreak::point(Vec4::ONE, 4.0),
        )
    }

    fn wheel(ticks: f32) -> InteractionEvent {
        InteractionEvent::Wheel {
            ticks,
            modifiers: Modifiers::NONE,
        }
    }

    #[test]
    fn test_add_resets_extents() {
        let mut scene = Scene::new();
        scene.add_graphic(points(&[[0.0, 0.0, 0.0], [10.0, 20.0, 30.0]]));
        let e = Extent3D::new(0.0, 10.0, 0.0, 20.0, 0.0, 30.0);
        assert_eq!(scene.draw_extent(), e);
        assert_eq!(scene.axes_extent(), e);
        assert_eq!(scene.full_extent(), e);
        assert_eq!(scene.axis(AxisKind::Y).range(), (0.0, 20.0));
    }

    #[test]
    fn test_fix_extent_keeps_view() {
        let mut scene = Scene::new();
        scene.add_graphic(points(&[[0.0, 0.0, 0.0], [1.0, 1.0, 1.0]]));
        scene.set_fix_extent(true);
        scene.add_graphic(points(&[[50.0, 50.0, 50.0]]));
        assert_eq!(scene.draw_extent(), Extent3D::new(0.0, 1.0, 0.0, 1.0, 0.0, 1.0));
    }

    #[test]
    fn test_flat_data_is_padded() {
        let mut scene = Scene::new();
        scene.add_graphic(points(&[[0.0, 0.0, 100.0], [10.0, 10.0, 100.0]]));
        let e = scene.draw_extent();
        assert!(e.depth() > 0.0);
        assert!(scene.transform().transform_z(100.0).abs() < 1e-12);
    }

    #[test]
    fn test_axes_follow_draw_extent_without_axes_zoom() {
        let mut scene = Scene::new();
        scene.add_graphic(points(&[[0.0, 0.0, 0.0], [10.0, 10.0, 10.0]]));
        let zoomed = Extent3D::new(2.0, 8.0, 2.0, 8.0, 0.0, 10.0);
        scene.set_draw_extent(zoomed).unwrap();
        assert_eq!(scene.axes_extent(), zoomed);
        scene.apply_interaction(&wheel(1.0));
        assert_eq!(scene.axes_extent(), scene.draw_extent());
    }

    #[test]
    fn test_axes_zoom_freezes_axes() {
        let mut scene = Scene::new();
        scene.add_graphic(points(&[[0.0, 0.0, 0.0], [10.0, 10.0, 10.0]]));
        let before = scene.axes_extent();
        scene.set_axes_zoom(true);
        scene
            .set_draw_extent(Extent3D::new(2.0, 8.0, 2.0, 8.0, 0.0, 10.0))
            .unwrap();
        assert!(scene.apply_interaction(&wheel(-1.0)));
        assert_eq!(scene.axes_extent(), before);
        assert_ne!(scene.draw_extent(), before);

        scene.set_axes_zoom(false);
        assert_eq!(scene.axes_extent(), scene.draw_extent());
    }

    #[test]
    fn test_degenerate_draw_extent_rejected() {
        let mut scene = Scene::new();
        scene.add_graphic(points(&[[0.0, 0.0, 0.0], [10.0, 10.0, 10.0]]));
        let before = scene.draw_extent();
        assert!(scene
            .set_draw_extent(Extent3D::new(0.0, 0.0, 0.0, 1.0, 0.0, 1.0))
            .is_err());
        assert_eq!(scene.draw_extent(), before);
        assert_eq!(scene.transform().extent(), before);
    }

    #[test]
    fn test_undo_zoom_is_exact() {
        let mut scene = Scene::new();
        scene.add_graphic(points(&[[0.1, -7.3, 1e-3], [9.9, 3.3, 0.7]]));
        let full = scene.full_extent();
        for t in [2.0, -1.0, 0.5] {
            scene.apply_interaction(&wheel(t));
        }
        scene.undo_zoom();
        assert_eq!(scene.draw_extent(), full);
        assert_eq!(scene.transform().extent(), full);
    }

    #[test]
    fn test_remove_returns_leaf_ids() {
        let mut scene = Scene::new();
        let a = scene.add_graphic(points(&[[0.0, 0.0, 0.0]]));
        let mut group = GraphicCollection::new();
        let b = group.add(points(&[[1.0, 1.0, 1.0]]));
        let c = group.add(points(&[[2.0, 2.0, 2.0]]));
        let g = scene.add_graphic(Graphic::group(group));
        assert_eq!(scene.remove_graphic(g).unwrap(), vec![b, c]);
        assert_eq!(scene.remove_graphic(a).unwrap(), vec![a]);
        assert!(scene.remove_graphic(a).is_err());
        assert_eq!(scene.draw_extent(), Extent3D::default());
    }

    #[test]
    fn test_style_edit_keeps_zoom() {
        let mut scene = Scene::new();
        let id = scene.add_graphic(points(&[[0.0, 0.0, 0.0], [10.0, 10.0, 10.0]]));
        let full = scene.full_extent();
        let zoomed = Extent3D::new(2.0, 8.0, 2.0, 8.0, 2.0, 8.0);
        scene.set_draw_extent(zoomed).unwrap();

        scene
            .update_graphic(id, |g| {
                g.update_style(|s| *s = Style::Break(ColorBreak::point(Vec4::X, 6.0)));
                g.set_visible(false);
            })
            .unwrap();
        assert_eq!(scene.draw_extent(), zoomed);
        assert_eq!(scene.axes_extent(), zoomed);
        assert_eq!(scene.full_extent(), full);
    }

    #[test]
    fn test_shape_edit_refits_view() {
        let mut scene = Scene::new();
        let id = scene.add_graphic(points(&[[0.0, 0.0, 0.0], [10.0, 10.0, 10.0]]));
        scene
            .set_draw_extent(Extent3D::new(2.0, 8.0, 2.0, 8.0, 2.0, 8.0))
            .unwrap();
        scene
            .update_graphic(id, |g| {
                g.update_shape(|s| {
                    if let Shape::Points { points, .. } = s {
                        points.push(DVec3::splat(20.0));
                    }
                });
            })
            .unwrap();
        let e = Extent3D::new(0.0, 20.0, 0.0, 20.0, 0.0, 20.0);
        assert_eq!(scene.draw_extent(), e);
        assert_eq!(scene.full_extent(), e);
    }

    #[test]
    fn test_spherical_extent_is_a_cube() {
        let mut scene = Scene::new();
        scene.add_graphic(points(&[[0.0, 0.0, 0.0], [90.0, 45.0, 0.5]]));
        scene.set_projection(Projection::Spherical { radius: 1.0 });
        assert_eq!(
            scene.draw_extent(),
            Extent3D::new(-1.5, 1.5, -1.5, 1.5, -1.5, 1.5)
        );
    }
}
