//! Scenario tests spanning several subsystems
//!
//! Engines render onto offscreen surfaces, so none of these need a window.

mod export;
mod lifecycle;
mod scenario;

use std::cell::RefCell;
use std::rc::Rc;

use serde_json::{json, Value};

use crate::events::{Event, EventType};
use crate::render::OffscreenSurface;
use crate::sync::CameraSyncBus;
use crate::{EngineOptions, SceneEngine};

/// One clickable red sphere named "a" at the origin
pub(crate) fn single_sphere() -> Value {
    json!({
        "name": "root",
        "contents": [{
            "name": "a",
            "type": "spheres",
            "positions": [[0, 0, 0]],
            "radius": 1,
            "color": "#ff0000",
            "clickable": true
        }]
    })
}

pub(crate) fn engine_with(document: Value, surface: &OffscreenSurface, bus: &CameraSyncBus) -> SceneEngine {
    crate::foundation::logging::init();
    let options = EngineOptions { document: Some(document), ..EngineOptions::default() };
    SceneEngine::create(options, Box::new(surface.clone()), bus).unwrap()
}

/// Record every event of `event_type` delivered to `engine`
pub(crate) fn record(engine: &mut SceneEngine, event_type: EventType) -> Rc<RefCell<Vec<Event>>> {
    let log = Rc::new(RefCell::new(Vec::new()));
    let sink = Rc::clone(&log);
    engine
        .on(event_type, move |event: &Event| {
            sink.borrow_mut().push(event.clone());
            false
        })
        .unwrap();
    log
}
