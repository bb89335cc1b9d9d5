//! Render loop, dirty tracking and teardown

use super::{engine_with, record, single_sphere};
use crate::config::{RendererKind, SceneSettings};
use crate::events::EventType;
use crate::render::{Frame, OffscreenSurface};
use crate::sync::CameraSyncBus;
use crate::{DragMode, EngineError, EngineOptions, SceneEngine};

#[test]
fn test_render_loop_guards() {
    let bus = CameraSyncBus::new();
    let surface = OffscreenSurface::new(100, 100);
    let mut engine = engine_with(single_sphere(), &surface, &bus);

    assert!(matches!(engine.frame(0.016), Err(EngineError::RenderLoopNotRunning)));
    assert!(matches!(engine.stop_render_loop(), Err(EngineError::RenderLoopNotRunning)));
    engine.start_render_loop().unwrap();
    assert!(matches!(engine.start_render_loop(), Err(EngineError::RenderLoopAlreadyRunning)));
    engine.stop_render_loop().unwrap();
    assert!(!engine.is_running());
}

#[test]
fn test_static_scene_renders_on_demand() {
    let bus = CameraSyncBus::new();
    let surface = OffscreenSurface::new(100, 100);
    let mut engine = engine_with(single_sphere(), &surface, &bus);
    engine.start_render_loop().unwrap();

    assert!(engine.frame(0.016).unwrap().rendered);
    assert!(!engine.frame(0.016).unwrap().rendered);
    assert_eq!(surface.present_count(), 1);

    engine.pointer_drag(5.0, 0.0, DragMode::Rotate).unwrap();
    assert!(engine.frame(0.016).unwrap().rendered);

    surface.resize(120, 80);
    assert!(engine.frame(0.016).unwrap().rendered);
    let frame = surface.last_frame().unwrap();
    assert_eq!(frame.as_raster().map(image::RgbaImage::dimensions), Some((120, 80)));
    assert_eq!(surface.present_count(), 3);
}

#[test]
fn test_continuous_scene_renders_every_frame() {
    let bus = CameraSyncBus::new();
    let surface = OffscreenSurface::new(40, 40);
    let settings = SceneSettings { static_scene: false, antialias: false, ..SceneSettings::default() };
    let options = EngineOptions { settings, document: Some(single_sphere()), ..EngineOptions::default() };
    let mut engine = SceneEngine::create(options, Box::new(surface.clone()), &bus).unwrap();
    engine.start_render_loop().unwrap();
    for _ in 0..3 {
        assert!(engine.frame(0.016).unwrap().rendered);
    }
    assert_eq!(surface.present_count(), 3);
}

#[test]
fn test_svg_renderer_presents_vector_frames() {
    let bus = CameraSyncBus::new();
    let surface = OffscreenSurface::new(100, 100);
    let settings = SceneSettings { renderer: RendererKind::Svg, ..SceneSettings::default() };
    let options = EngineOptions { settings, document: Some(single_sphere()), ..EngineOptions::default() };
    let mut engine = SceneEngine::create(options, Box::new(surface.clone()), &bus).unwrap();
    engine.start_render_loop().unwrap();
    engine.frame(0.016).unwrap();
    assert!(matches!(surface.last_frame(), Some(Frame::Vector(svg)) if svg.contains("<polygon")));

    // raster export still produces a PNG
    assert!(engine.request_export("raster-image").unwrap().data.starts_with("data:image/png"));
}

#[test]
fn test_context_loss_is_fatal() {
    let bus = CameraSyncBus::new();
    let surface = OffscreenSurface::new(100, 100);
    let mut engine = engine_with(single_sphere(), &surface, &bus);
    let fatal = record(&mut engine, EventType::Fatal);
    engine.start_render_loop().unwrap();
    engine.frame(0.016).unwrap();

    surface.lose_context();
    assert!(matches!(engine.frame(0.016), Err(EngineError::Fatal(_))));
    assert!(engine.is_destroyed());
    assert!(surface.is_released());
    assert_eq!(fatal.borrow().len(), 1);
    assert!(fatal.borrow()[0].message().is_some());
}

#[test]
fn test_destroy_is_idempotent() {
    let bus = CameraSyncBus::new();
    let surface = OffscreenSurface::new(100, 100);
    let mut engine = engine_with(single_sphere(), &surface, &bus);
    engine.start_render_loop().unwrap();

    engine.destroy();
    engine.destroy();
    assert!(engine.is_destroyed());
    assert!(!engine.is_running());
    assert!(engine.graph().is_none());
    assert!(matches!(engine.rebuild_graph(Some(&single_sphere())), Err(EngineError::Destroyed)));
    assert!(matches!(engine.pick(50.0, 50.0), Err(EngineError::Destroyed)));
    assert!(matches!(engine.start_render_loop(), Err(EngineError::Destroyed)));
    assert!(matches!(engine.request_export("raster-image"), Err(EngineError::Destroyed)));
    assert_eq!(bus.subscriber_count(crate::DEFAULT_ROOM), 0);
}

#[test]
fn test_invalid_settings_rejected() {
    let bus = CameraSyncBus::new();
    let settings = SceneSettings { sphere_segments: 1, ..SceneSettings::default() };
    let options = EngineOptions { settings, ..EngineOptions::default() };
    let result = SceneEngine::create(options, Box::new(OffscreenSurface::new(10, 10)), &bus);
    assert!(matches!(result, Err(EngineError::Config(_))));
}
