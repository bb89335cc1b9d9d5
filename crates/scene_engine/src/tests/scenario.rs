//! Build, pick, toggle and animate through the engine API

use std::collections::HashMap;

use approx::assert_relative_eq;
use serde_json::json;

use super::{engine_with, record, single_sphere};
use crate::animation::AnimationMode;
use crate::events::EventType;
use crate::render::OffscreenSurface;
use crate::sync::CameraSyncBus;
use crate::RebuildOutcome;

fn toggles(entries: &[(&str, u8)]) -> HashMap<String, u8> {
    entries.iter().map(|(n, v)| ((*n).to_string(), *v)).collect()
}

#[test]
fn test_pick_after_resize_uses_new_viewport() {
    let bus = CameraSyncBus::new();
    let surface = OffscreenSurface::new(100, 100);
    let mut engine = engine_with(single_sphere(), &surface, &bus);

    // no frame runs between the resize and the pick
    surface.resize(200, 100);
    let hit = engine.pick(100.0, 50.0).unwrap();
    assert_eq!(hit.map(|h| h.object.name), Some(Some("a".to_string())));
    assert_eq!(engine.controller().unwrap().device_size(1.0), (200, 100));
}

#[test]
fn test_pick_toggle_pick() {
    let bus = CameraSyncBus::new();
    let surface = OffscreenSurface::new(100, 100);
    let mut engine = engine_with(single_sphere(), &surface, &bus);

    let registry = engine.registry().unwrap();
    assert_eq!(registry.renderable_count(), 1);
    assert_eq!(registry.clickable().count(), 1);

    let hit = engine.pick(50.0, 50.0).unwrap().expect("sphere under the center pixel");
    assert_eq!(hit.object.name.as_deref(), Some("a"));
    assert!(engine.pick(2.0, 2.0).unwrap().is_none());

    engine.toggle_visibility(&toggles(&[("a", 0)])).unwrap();
    assert!(engine.pick(50.0, 50.0).unwrap().is_none());

    engine.toggle_visibility(&toggles(&[("a", 1)])).unwrap();
    assert!(engine.pick(50.0, 50.0).unwrap().is_some());
}

#[test]
fn test_fan_out_counts() {
    let bus = CameraSyncBus::new();
    let surface = OffscreenSurface::new(100, 100);
    let document = json!({
        "name": "root",
        "contents": [
            {"name": "atoms", "type": "spheres", "positions": [[0, 0, 0], [1, 0, 0], [2, 0, 0]]},
            {"name": "bond", "type": "cylinders", "positionPairs": [[[0, 0, 0], [1, 0, 0]]]},
            {"name": "bogus", "type": "teapots", "positions": [[0, 0, 0]]}
        ]
    });
    let engine = engine_with(document, &surface, &bus);
    let shape = engine.registry().unwrap().shape();
    assert_eq!(shape.get("atoms"), Some(&3));
    assert_eq!(shape.get("bond"), Some(&1));
    assert_eq!(shape.get("bogus"), None);
    assert_eq!(shape.get("root"), Some(&4));
}

#[test]
fn test_rebuild_is_idempotent() {
    let bus = CameraSyncBus::new();
    let surface = OffscreenSurface::new(100, 100);
    let mut engine = engine_with(single_sphere(), &surface, &bus);
    let first = engine.registry().unwrap().shape();
    let outcome = engine.rebuild_graph(Some(&single_sphere())).unwrap();
    assert!(matches!(outcome, RebuildOutcome::Built(stats) if stats.renderables == 1));
    assert_eq!(engine.registry().unwrap().shape(), first);
}

#[test]
fn test_missing_document_keeps_previous_graph() {
    let bus = CameraSyncBus::new();
    let surface = OffscreenSurface::new(100, 100);
    let mut engine = engine_with(single_sphere(), &surface, &bus);

    assert!(matches!(engine.rebuild_graph(None).unwrap(), RebuildOutcome::Skipped(_)));
    assert!(matches!(engine.rebuild_graph(Some(&json!({"name": "x"}))).unwrap(), RebuildOutcome::Skipped(_)));
    assert_eq!(engine.registry().unwrap().renderable_count(), 1);
    assert!(engine.pick(50.0, 50.0).unwrap().is_some());
}

#[test]
fn test_visibility_toggle_restores_prior_state() {
    let bus = CameraSyncBus::new();
    let surface = OffscreenSurface::new(100, 100);
    let document = json!({
        "name": "root",
        "contents": [
            {"name": "a", "type": "spheres", "positions": [[0, 0, 0], [1, 1, 1]]},
            {"name": "b", "type": "cubes", "positions": [[3, 0, 0]]},
            {"name": "c", "type": "cubes", "positions": [[-3, 0, 0]], "visible": false}
        ]
    });
    let mut engine = engine_with(document, &surface, &bus);
    let snapshot = |engine: &crate::SceneEngine| {
        let mut states: Vec<(u64, bool)> = engine
            .graph()
            .unwrap()
            .renderables()
            .map(|(_, r)| (r.id.0, r.is_visible()))
            .collect();
        states.sort_unstable();
        states
    };
    let before = snapshot(&engine);

    engine.toggle_visibility(&toggles(&[("a", 0)])).unwrap();
    let hidden = snapshot(&engine);
    let registry = engine.registry().unwrap();
    let graph = engine.graph().unwrap();
    for key in registry.keys_for_name("a") {
        assert!(!graph.renderable(key).unwrap().is_visible());
    }
    for key in registry.keys_for_name("b") {
        assert!(graph.renderable(key).unwrap().is_visible());
    }
    assert_ne!(before, hidden);

    engine.toggle_visibility(&toggles(&[("a", 1), ("c", 1)])).unwrap();
    assert_eq!(snapshot(&engine), before);
}

#[test]
fn test_hidden_names_survive_rebuild() {
    let bus = CameraSyncBus::new();
    let surface = OffscreenSurface::new(100, 100);
    let mut engine = engine_with(single_sphere(), &surface, &bus);
    engine.toggle_visibility(&toggles(&[("a", 0)])).unwrap();
    engine.rebuild_graph(Some(&single_sphere())).unwrap();
    assert!(engine.pick(50.0, 50.0).unwrap().is_none());
}

#[test]
fn test_click_selects_and_reports() {
    let bus = CameraSyncBus::new();
    let surface = OffscreenSurface::new(100, 100);
    let mut engine = engine_with(single_sphere(), &surface, &bus);
    let clicks = record(&mut engine, EventType::ObjectClicked);

    engine.pointer_click(50.0, 50.0, false, false).unwrap();
    assert_eq!(engine.selected_names(), vec!["a".to_string()]);
    let events = clicks.borrow();
    assert_eq!(events.len(), 1);
    assert_eq!(events[0].object().and_then(|o| o.name.as_deref()), Some("a"));
    assert!(events[0].point().is_some_and(|p| p.z > 0.5));
    drop(events);

    // a miss in replace mode clears the selection
    engine.pointer_click(2.0, 2.0, false, false).unwrap();
    assert!(engine.selected_names().is_empty());
    assert_eq!(clicks.borrow().len(), 1);
}

#[test]
fn test_hover_reports_tooltip() {
    let bus = CameraSyncBus::new();
    let surface = OffscreenSurface::new(100, 100);
    let document = json!({
        "name": "root",
        "contents": [{
            "name": "Fe", "type": "spheres", "positions": [[0, 0, 0]], "radius": 1,
            "clickable": true, "tooltip": "Fe site"
        }]
    });
    let mut engine = engine_with(document, &surface, &bus);
    let hovers = record(&mut engine, EventType::ObjectHovered);

    engine.pointer_move(50.0, 50.0).unwrap();
    engine.pointer_move(51.0, 50.0).unwrap();
    engine.pointer_move(1.0, 1.0).unwrap();

    let events = hovers.borrow();
    assert_eq!(events.len(), 2);
    assert_eq!(events[0].tooltip(), Some("Fe site"));
    assert!(events[1].object().is_none());
}

#[test]
fn test_remove_and_replace_by_name() {
    let bus = CameraSyncBus::new();
    let surface = OffscreenSurface::new(100, 100);
    let mut engine = engine_with(single_sphere(), &surface, &bus);

    assert_eq!(engine.remove_object_by_name("missing").unwrap(), 0);
    let node = serde_json::from_value(json!({
        "name": "a", "type": "cubes", "positions": [[0, 0, 0], [2, 0, 0]], "clickable": true
    }))
    .unwrap();
    let stats = engine.replace_object("a", &node).unwrap();
    assert_eq!(stats.renderables, 2);
    assert_eq!(engine.registry().unwrap().shape().get("a"), Some(&2));

    assert_eq!(engine.remove_object_by_name("a").unwrap(), 2);
    assert!(engine.pick(50.0, 50.0).unwrap().is_none());
    assert!(engine.registry().unwrap().validate().is_ok());
}

#[test]
fn test_slider_and_play_animation() {
    let bus = CameraSyncBus::new();
    let surface = OffscreenSurface::new(100, 100);
    let document = json!({
        "name": "root",
        "contents": [{
            "name": "moving", "type": "spheres", "positions": [[0, 0, 0]],
            "keyframes": [0, 1], "animate": [[0, 0, 0], [2, 0, 0]]
        }]
    });
    let mut engine = engine_with(document, &surface, &bus);
    let offset = |engine: &crate::SceneEngine| {
        engine.graph().unwrap().renderables().next().map(|(_, r)| r.animated.offset.x).unwrap()
    };
    engine.start_render_loop().unwrap();

    // NONE leaves objects alone
    engine.set_slider(0.5).unwrap();
    engine.frame(0.1).unwrap();
    assert_relative_eq!(offset(&engine), 0.0);

    engine.set_animation_mode(AnimationMode::Slider).unwrap();
    engine.frame(0.1).unwrap();
    assert_relative_eq!(offset(&engine), 1.0, epsilon = 1e-5);

    // the slider does not advance with frames
    engine.frame(0.3).unwrap();
    assert_relative_eq!(offset(&engine), 1.0, epsilon = 1e-5);

    engine.set_animation_mode(AnimationMode::Play).unwrap();
    engine.frame(0.25).unwrap();
    assert_relative_eq!(offset(&engine), 0.5, epsilon = 1e-5);
    engine.frame(0.5).unwrap();
    assert_relative_eq!(offset(&engine), 1.5, epsilon = 1e-5);

    // suspending keeps the phase
    engine.set_animation_mode(AnimationMode::None).unwrap();
    engine.frame(0.5).unwrap();
    assert_relative_eq!(offset(&engine), 1.5, epsilon = 1e-5);
    engine.set_animation_mode(AnimationMode::Play).unwrap();
    engine.frame(0.0).unwrap();
    assert_relative_eq!(offset(&engine), 1.5, epsilon = 1e-5);
}
