//! Frame-level behavior of a figure driven by the recording backend.

use chartgl::*;

fn mesh(offset: f64) -> Graphic {
    Graphic::new(
        Shape::Mesh {
            vertices: vec![
                DVec3::new(offset, 0.0, 0.0),
                DVec3::new(offset + 10.0, 0.0, 0.0),
                DVec3::new(offset, 10.0, 5.0),
            ],
            triangles: vec![[0, 1, 2]],
            values: None,
        },
        ColorBreak::polygon(Vec4::new(0.2, 0.4, 0.8, 1.0)),
    )
}

fn figure() -> Figure {
    let figure = Figure::new(RecordingBackend::new());
    figure.initialize(640, 480).unwrap();
    figure
}

fn request() -> FrameRequest {
    FrameRequest::new(640, 480)
}

#[test]
fn unchanged_mesh_is_not_reuploaded() {
    let figure = figure();
    figure.add_graphic(mesh(0.0));

    let first = figure.render(request()).unwrap();
    let second = figure.render(request()).unwrap();

    assert_eq!(first.uploads, 1);
    assert_eq!(second.uploads, 0);
    assert_eq!(second.cache_hits, 1);
    assert_eq!(figure.engine(|e| e.backend().stats().uploads), 1);
}

#[test]
fn always_update_forces_exactly_one_reupload() {
    let figure = figure();
    figure.add_graphic(mesh(0.0));
    figure.render(request()).unwrap();

    figure.set_always_update_buffers();
    assert!(figure.engine(|e| e.always_update_buffers()));
    let forced = figure.render(request()).unwrap();
    assert_eq!(forced.uploads, 1);
    assert!(!figure.engine(|e| e.always_update_buffers()));

    let next = figure.render(request()).unwrap();
    assert_eq!(next.uploads, 0);
}

#[test]
fn panning_reuses_cached_geometry() {
    let figure = figure();
    figure.add_graphic(mesh(0.0));
    figure.render(request()).unwrap();

    figure.handle_event(&InteractionEvent::Wheel {
        ticks: 2.0,
        modifiers: Modifiers::NONE,
    });
    let zoomed = figure.render(request()).unwrap();
    assert_eq!(zoomed.uploads, 0);
    assert_eq!(zoomed.cache_hits, 1);
}

#[test]
fn removing_a_graphic_releases_its_upload() {
    let figure = figure();
    let keep = figure.add_graphic(mesh(0.0));
    let drop = figure.add_graphic(mesh(20.0));
    figure.render(request()).unwrap();
    assert_eq!(figure.engine(|e| e.backend().live_handles()), 2);

    assert_eq!(figure.remove_graphic(drop).unwrap(), vec![drop]);
    assert_eq!(figure.engine(|e| e.backend().live_handles()), 1);
    assert_eq!(figure.engine(|e| e.cached_graphics()), 1);

    let report = figure.render(request()).unwrap();
    assert_eq!(report.drawn, vec![keep]);
    assert!(matches!(
        figure.remove_graphic(drop),
        Err(Error::Chart(ChartError::GraphicNotFound(_)))
    ));
}

#[test]
fn removing_a_group_releases_every_child() {
    let figure = figure();
    let mut children = GraphicCollection::new();
    let a = children.add(mesh(0.0));
    let b = children.add(mesh(20.0));
    let group = figure.add_graphic(Graphic::group(children));
    figure.render(request()).unwrap();
    assert_eq!(figure.engine(|e| e.backend().live_handles()), 2);

    let removed = figure.remove_graphic(group).unwrap();
    assert_eq!(removed, vec![a, b]);
    assert_eq!(figure.engine(|e| e.backend().live_handles()), 0);
}

#[test]
fn unsupported_graphic_is_skipped_and_the_rest_drawn() {
    let figure = Figure::new(RecordingBackend::without([ShapeKind::Image]));
    figure.initialize(640, 480).unwrap();
    let image = figure.add_graphic(Graphic::new(
        Shape::Image {
            corners: [
                DVec3::new(0.0, 0.0, 0.0),
                DVec3::new(1.0, 0.0, 0.0),
                DVec3::new(1.0, 1.0, 0.0),
                DVec3::new(0.0, 1.0, 0.0),
            ],
            image: ImageData {
                width: 1,
                height: 1,
                pixels: vec![255, 0, 0, 255],
            },
        },
        ColorBreak::color(Vec4::ONE),
    ));
    let surface = figure.add_graphic(mesh(0.0));

    let report = figure.render(request()).unwrap();
    assert_eq!(report.drawn, vec![surface]);
    assert_eq!(report.skipped.len(), 1);
    assert_eq!(report.skipped[0].id, image);
    assert_eq!(report.skipped[0].kind, ShapeKind::Image);
    assert_eq!(report.skipped[0].reason, SkipReason::Unsupported);
}

#[test]
fn context_loss_requires_reinitialization() {
    let figure = figure();
    figure.add_graphic(mesh(0.0));
    figure.render(request()).unwrap();

    figure.engine(|e| e.backend_mut().lose_context());
    let err = figure.render(request()).unwrap_err();
    assert!(err.is_context_lost());
    assert_eq!(figure.state(), EngineState::Uninitialized);
    assert_eq!(figure.engine(|e| e.cached_graphics()), 0);

    // no frame until the host re-initializes
    assert!(matches!(
        figure.render(request()),
        Err(Error::Render(RenderError::InvalidState { .. }))
    ));

    figure.initialize(640, 480).unwrap();
    let report = figure.render(request()).unwrap();
    assert_eq!(report.uploads, 1);
    assert_eq!(figure.engine(|e| e.backend().live_handles()), 1);
}

#[test]
fn malformed_legend_leaves_the_scene_drawn() {
    let figure = figure();
    let id = figure.add_graphic(mesh(0.0));
    figure.set_legend(LegendScheme::default(), LegendOptions::default());

    let report = figure.render(request()).unwrap();
    assert!(matches!(report.legend, LegendStatus::Skipped(_)));
    assert_eq!(report.drawn, vec![id]);
}

#[test]
fn screenshot_is_captured_once() {
    let figure = figure();
    figure.scene_mut(|s| s.options_mut().background_color = Vec4::new(0.0, 1.0, 0.0, 1.0));
    figure.request_screenshot();

    let report = figure.render(request()).unwrap();
    let image = report.screenshot.unwrap();
    assert_eq!(image.dimensions(), (640, 480));
    assert_eq!(image.get_pixel(10, 10).0, [0, 255, 0, 255]);

    assert!(figure.render(request()).unwrap().screenshot.is_none());
}

#[test]
fn resize_between_frames() {
    let figure = figure();
    figure.add_graphic(mesh(0.0));
    figure.render(request()).unwrap();

    figure.request_screenshot();
    let report = figure.render(FrameRequest::new(200, 100)).unwrap();
    assert_eq!(report.screenshot.unwrap().dimensions(), (200, 100));
    assert_eq!(report.uploads, 0);
    assert_eq!(figure.scene(Scene::viewport), Vec2::new(200.0, 100.0));
}

#[test]
fn dispose_releases_everything() {
    let figure = figure();
    figure.add_graphic(mesh(0.0));
    figure.render(request()).unwrap();
    figure.dispose();
    assert_eq!(figure.state(), EngineState::Disposed);
    assert_eq!(figure.engine(|e| e.backend().live_handles()), 0);
    assert!(figure.render(request()).is_err());
}
