//! Raster and COLLADA export through the engine

use base64::engine::general_purpose::STANDARD;
use base64::Engine as _;
use image::ImageFormat;
use serde_json::json;

use super::{engine_with, record, single_sphere};
use crate::events::EventType;
use crate::export::{ExportError, ExportFormat, PNG_DATA_URL_PREFIX};
use crate::render::OffscreenSurface;
use crate::sync::CameraSyncBus;
use crate::EngineError;

fn decode_png(data: &str) -> image::RgbaImage {
    let payload = data.strip_prefix(PNG_DATA_URL_PREFIX).expect("PNG data URL");
    let bytes = STANDARD.decode(payload).unwrap();
    image::load_from_memory_with_format(&bytes, ImageFormat::Png).unwrap().to_rgba8()
}

#[test]
fn test_raster_export_red_sphere_on_white() {
    let bus = CameraSyncBus::new();
    let surface = OffscreenSurface::new(100, 100);
    let mut engine = engine_with(single_sphere(), &surface, &bus);

    let response = engine.request_export("raster-image").unwrap();
    assert_eq!(response.format, ExportFormat::RasterImage);
    let image = decode_png(&response.data);
    // default export pixel ratio is 2
    assert_eq!(image.dimensions(), (200, 200));

    let center = image.get_pixel(100, 100).0;
    assert!(center[0] > 240 && center[1] < 15 && center[2] < 15, "center {center:?}");
    assert_eq!(image.get_pixel(0, 0).0, [255, 255, 255, 255]);

    // the live viewport keeps its density
    assert!((engine.controller().unwrap().pixel_ratio() - 1.0).abs() < f32::EPSILON);
}

#[test]
fn test_raster_export_draws_labels() {
    let bus = CameraSyncBus::new();
    let surface = OffscreenSurface::new(60, 60);
    let document = json!({
        "name": "root",
        "contents": [
            {"name": "anchor", "type": "spheres", "positions": [[0, 0, 0]], "radius": 0.05, "color": "#ffffff"},
            {"name": "site", "type": "labels", "positions": [[0, 0, 0]], "label": "WWWWWWWW", "color": "#000000"}
        ]
    });
    let mut engine = engine_with(document, &surface, &bus);

    let image = decode_png(&engine.request_export("raster-image").unwrap().data);
    let ink = image.pixels().filter(|p| p[0] < 128).count();
    assert!(ink > 50, "only {ink} dark pixels");
}

#[test]
fn test_oversized_raster_export_leaves_engine_alive() {
    let bus = CameraSyncBus::new();
    // 4100 CSS px at the default export ratio of 2 exceeds the frame cap
    let surface = OffscreenSurface::new(4100, 4100);
    let mut engine = engine_with(single_sphere(), &surface, &bus);

    let result = engine.request_export("raster-image");
    assert!(
        matches!(result, Err(EngineError::Export(ExportError::TooLarge { width: 8200, height: 8200 }))),
        "{result:?}"
    );
    assert!(!engine.is_destroyed());
    assert!(!surface.is_released());
    assert!((engine.controller().unwrap().pixel_ratio() - 1.0).abs() < f32::EPSILON);
    assert!(engine.request_export("collada-document").is_ok());
}

#[test]
fn test_collada_export_is_base64_document() {
    let bus = CameraSyncBus::new();
    let surface = OffscreenSurface::new(100, 100);
    let document = json!({
        "name": "root",
        "contents": [
            {"name": "a", "type": "spheres", "positions": [[0, 0, 0]]},
            {"name": "hidden", "type": "cubes", "positions": [[2, 0, 0]], "visible": false}
        ]
    });
    let mut engine = engine_with(document, &surface, &bus);

    let response = engine.request_export("collada-document").unwrap();
    let xml = String::from_utf8(STANDARD.decode(&response.data).unwrap()).unwrap();
    assert!(xml.contains("COLLADA"));
    assert!(xml.contains(r#"name="a""#));
    assert_eq!(xml.matches("<geometry ").count(), 1);
}

#[test]
fn test_unsupported_formats_fail_loudly() {
    let bus = CameraSyncBus::new();
    let surface = OffscreenSurface::new(100, 100);
    let mut engine = engine_with(single_sphere(), &surface, &bus);

    assert!(matches!(
        engine.request_export("bitmap"),
        Err(EngineError::Export(ExportError::UnsupportedFormat(_)))
    ));
    assert!(matches!(
        engine.request_export("gltf-document"),
        Err(EngineError::Export(ExportError::NotImplemented(_)))
    ));
    assert!(matches!(engine.queue_export("bitmap"), Err(EngineError::Export(_))));
    // the engine keeps working
    assert!(engine.pick(50.0, 50.0).unwrap().is_some());
}

#[test]
fn test_queued_export_completes_on_next_frame() {
    let bus = CameraSyncBus::new();
    let surface = OffscreenSurface::new(100, 100);
    let mut engine = engine_with(single_sphere(), &surface, &bus);
    let ready = record(&mut engine, EventType::ExportReady);
    engine.start_render_loop().unwrap();

    engine.queue_export("collada-document").unwrap();
    assert!(ready.borrow().is_empty());
    let outcome = engine.frame(0.016).unwrap();
    assert_eq!(outcome.exports, 1);

    let events = ready.borrow();
    assert_eq!(events.len(), 1);
    assert_eq!(events[0].export().map(|r| r.format), Some(ExportFormat::ColladaDocument));
}

#[test]
fn test_queued_export_dropped_on_destroy() {
    let bus = CameraSyncBus::new();
    let surface = OffscreenSurface::new(100, 100);
    let mut engine = engine_with(single_sphere(), &surface, &bus);
    let ready = record(&mut engine, EventType::ExportReady);

    engine.queue_export("raster-image").unwrap();
    engine.destroy();
    assert!(matches!(engine.frame(0.016), Err(EngineError::Destroyed)));
    assert!(ready.borrow().is_empty());
}
