//! Events delivered to the application that owns an engine
//!
//! - Key-value arguments (no order dependency)
//! - Handler returns bool (true = consumed, stops forwarding)
//! - Registration per event type (only interested handlers are notified)
//! - Events are queued while the engine works and delivered in one batch

use std::collections::HashMap;

use chrono::{DateTime, Utc};

use crate::export::ExportResponse;
use crate::foundation::math::Vec3;
use crate::scene::LogicalObject;
use crate::sync::CameraState;

/// Event type identification
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub enum EventType {
    /// A clickable object was clicked
    ObjectClicked,
    /// The hovered object changed (including to nothing)
    ObjectHovered,
    /// The user moved the camera
    CameraStateChanged,
    /// A queued export finished
    ExportReady,
    /// The engine hit a fatal condition and tore itself down
    Fatal,
}

/// Typed event argument
#[derive(Debug, Clone)]
pub enum EventArg {
    /// Logical object resolved by picking
    Object(LogicalObject),
    /// World-space point
    Point(Vec3),
    /// Tooltip text
    Tooltip(String),
    /// Camera state
    Camera(CameraState),
    /// Finished export
    Export(ExportResponse),
    /// Human-readable message
    Message(String),
}

/// Event with type ID and key-value arguments
#[derive(Debug, Clone)]
pub struct Event {
    /// Type of event
    pub event_type: EventType,
    /// When the event was raised
    pub timestamp: DateTime<Utc>,
    args: HashMap<&'static str, EventArg>,
}

impl Event {
    /// Create an event stamped with the current time
    pub fn new(event_type: EventType) -> Self {
        Self { event_type, timestamp: Utc::now(), args: HashMap::new() }
    }

    /// Add an argument (builder pattern)
    #[must_use]
    pub fn with_arg(mut self, key: &'static str, value: EventArg) -> Self {
        self.args.insert(key, value);
        self
    }

    /// Get an argument by key
    pub fn get_arg(&self, key: &str) -> Option<&EventArg> {
        self.args.get(key)
    }

    /// `object` argument
    pub fn object(&self) -> Option<&LogicalObject> {
        match self.get_arg("object") {
            Some(EventArg::Object(object)) => Some(object),
            _ => None,
        }
    }

    /// `point` argument
    pub fn point(&self) -> Option<Vec3> {
        match self.get_arg("point") {
            Some(EventArg::Point(point)) => Some(*point),
            _ => None,
        }
    }

    /// `tooltip` argument
    pub fn tooltip(&self) -> Option<&str> {
        match self.get_arg("tooltip") {
            Some(EventArg::Tooltip(text)) => Some(text),
            _ => None,
        }
    }

    /// `camera` argument
    pub fn camera(&self) -> Option<&CameraState> {
        match self.get_arg("camera") {
            Some(EventArg::Camera(state)) => Some(state),
            _ => None,
        }
    }

    /// `export` argument
    pub fn export(&self) -> Option<&ExportResponse> {
        match self.get_arg("export") {
            Some(EventArg::Export(response)) => Some(response),
            _ => None,
        }
    }

    /// `message` argument
    pub fn message(&self) -> Option<&str> {
        match self.get_arg("message") {
            Some(EventArg::Message(message)) => Some(message),
            _ => None,
        }
    }
}

/// Event handler
/// Returns true if the event was consumed (stops forwarding)
pub trait EventHandler {
    /// Handle an event, return true if consumed
    fn on_event(&mut self, event: &Event) -> bool;
}

impl<F> EventHandler for F
where
    F: FnMut(&Event) -> bool,
{
    fn on_event(&mut self, event: &Event) -> bool {
        self(event)
    }
}

/// Event system with registration and queuing
#[derive(Default)]
pub struct EventSystem {
    queue: Vec<Event>,
    handlers: HashMap<EventType, Vec<Box<dyn EventHandler>>>,
}

impl std::fmt::Debug for EventSystem {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("EventSystem")
            .field("queued", &self.queue.len())
            .field("handlers", &self.handler_count())
            .finish()
    }
}

impl EventSystem {
    /// Create an empty event system
    pub fn new() -> Self {
        Self::default()
    }

    /// Register a handler for one event type
    pub fn register_handler(&mut self, event_type: EventType, handler: Box<dyn EventHandler>) {
        self.handlers.entry(event_type).or_default().push(handler);
    }

    /// Queue an event for the next dispatch
    pub fn send(&mut self, event: Event) {
        self.queue.push(event);
    }

    /// Number of queued events
    pub fn pending(&self) -> usize {
        self.queue.len()
    }

    /// Number of registered handlers across all types
    pub fn handler_count(&self) -> usize {
        self.handlers.values().map(Vec::len).sum()
    }

    /// Deliver every queued event
    pub fn dispatch(&mut self) {
        let queued = std::mem::take(&mut self.queue);
        for event in queued {
            self.dispatch_event(&event);
        }
    }

    /// Stops on first handler that returns true (consumed)
    fn dispatch_event(&mut self, event: &Event) {
        if let Some(handlers) = self.handlers.get_mut(&event.event_type) {
            for handler in handlers.iter_mut() {
                if handler.on_event(event) {
                    break;
                }
            }
        }
    }

    /// Drop queued events and every handler
    pub fn clear(&mut self) {
        self.queue.clear();
        self.handlers.clear();
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use std::cell::RefCell;
    use std::rc::Rc;

    fn recorder(log: &Rc<RefCell<Vec<EventType>>>, consume: bool) -> Box<dyn EventHandler> {
        let log = Rc::clone(log);
        Box::new(move |event: &Event| {
            log.borrow_mut().push(event.event_type);
            consume
        })
    }

    #[test]
    fn test_only_registered_types_are_delivered() {
        let log = Rc::new(RefCell::new(Vec::new()));
        let mut system = EventSystem::new();
        system.register_handler(EventType::ObjectClicked, recorder(&log, false));

        system.send(Event::new(EventType::ObjectClicked).with_arg("point", EventArg::Point(Vec3::x())));
        system.send(Event::new(EventType::ExportReady));
        assert_eq!(system.pending(), 2);
        system.dispatch();

        assert_eq!(*log.borrow(), vec![EventType::ObjectClicked]);
        assert_eq!(system.pending(), 0);
    }

    #[test]
    fn test_consumed_event_stops_forwarding() {
        let first = Rc::new(RefCell::new(Vec::new()));
        let second = Rc::new(RefCell::new(Vec::new()));
        let mut system = EventSystem::new();
        system.register_handler(EventType::Fatal, recorder(&first, true));
        system.register_handler(EventType::Fatal, recorder(&second, false));

        system.send(Event::new(EventType::Fatal));
        system.dispatch();

        assert_eq!(first.borrow().len(), 1);
        assert!(second.borrow().is_empty());
    }

    #[test]
    fn test_typed_arguments() {
        let event = Event::new(EventType::ObjectHovered)
            .with_arg("tooltip", EventArg::Tooltip("Fe".into()))
            .with_arg("point", EventArg::Point(Vec3::y()));
        assert_eq!(event.tooltip(), Some("Fe"));
        assert_eq!(event.point(), Some(Vec3::y()));
        assert!(event.object().is_none());
    }

    #[test]
    fn test_clear_drops_handlers() {
        let log = Rc::new(RefCell::new(Vec::new()));
        let mut system = EventSystem::new();
        system.register_handler(EventType::ExportReady, recorder(&log, false));
        system.send(Event::new(EventType::ExportReady));
        system.clear();
        system.dispatch();
        assert_eq!(system.handler_count(), 0);
        assert!(log.borrow().is_empty());
    }
}
