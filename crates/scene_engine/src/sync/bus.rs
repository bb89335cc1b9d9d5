//! Shared camera state, keyed by room
//!
//! Every engine mounted in the same room sees the same latest camera state.
//! Publishing bumps the room revision; each subscription remembers the last
//! revision it saw so an engine only handles a state once.

use std::collections::{HashMap, HashSet};
use std::sync::{Arc, PoisonError, RwLock};

use crate::foundation::collections::ComponentId;
use super::camera_state::CameraState;

#[derive(Debug, Default)]
struct Room {
    state: Option<CameraState>,
    revision: u64,
    subscribers: HashSet<ComponentId>,
}

/// Cloneable handle to the shared camera state
#[derive(Debug, Clone, Default)]
pub struct CameraSyncBus {
    rooms: Arc<RwLock<HashMap<String, Room>>>,
}

impl CameraSyncBus {
    /// Create an empty bus
    pub fn new() -> Self {
        Self::default()
    }

    /// Store `state` as the room's latest camera and return the new revision
    pub fn publish(&self, room: &str, state: CameraState) -> u64 {
        let mut rooms = self.rooms.write().unwrap_or_else(PoisonError::into_inner);
        let entry = rooms.entry(room.to_string()).or_default();
        entry.revision += 1;
        entry.state = Some(state);
        log::trace!("Camera published to room '{}' (revision {})", room, entry.revision);
        entry.revision
    }

    /// Latest state of a room with its revision
    pub fn latest(&self, room: &str) -> Option<(u64, CameraState)> {
        let rooms = self.rooms.read().unwrap_or_else(PoisonError::into_inner);
        let entry = rooms.get(room)?;
        entry.state.clone().map(|state| (entry.revision, state))
    }

    /// Register `id` in `room`
    ///
    /// A state already on the bus counts as unseen, so a late subscriber
    /// picks it up on its first poll.
    pub fn subscribe(&self, room: &str, id: ComponentId) -> Subscription {
        let mut rooms = self.rooms.write().unwrap_or_else(PoisonError::into_inner);
        rooms.entry(room.to_string()).or_default().subscribers.insert(id.clone());
        log::debug!("{} joined camera room '{}'", id, room);
        Subscription { bus: self.clone(), room: room.to_string(), id, seen: 0 }
    }

    /// Number of live subscriptions in a room
    pub fn subscriber_count(&self, room: &str) -> usize {
        let rooms = self.rooms.read().unwrap_or_else(PoisonError::into_inner);
        rooms.get(room).map_or(0, |r| r.subscribers.len())
    }

    fn unsubscribe(&self, room: &str, id: &ComponentId) {
        let mut rooms = self.rooms.write().unwrap_or_else(PoisonError::into_inner);
        if let Some(entry) = rooms.get_mut(room) {
            entry.subscribers.remove(id);
        }
    }
}

/// One engine's membership in a room; leaves the room when dropped
#[derive(Debug)]
pub struct Subscription {
    bus: CameraSyncBus,
    room: String,
    id: ComponentId,
    seen: u64,
}

impl Subscription {
    /// Room name
    pub fn room(&self) -> &str {
        &self.room
    }

    /// Subscriber identity
    pub const fn id(&self) -> &ComponentId {
        &self.id
    }

    /// Publish on behalf of this subscriber
    ///
    /// The state is stamped with the subscriber's id and marked as seen so
    /// the next poll does not hand it back.
    pub fn publish(&mut self, state: CameraState) -> u64 {
        let revision = self.bus.publish(&self.room, state.stamped(&self.id));
        self.seen = revision;
        revision
    }

    /// The room's state if it changed since the last poll
    pub fn poll(&mut self) -> Option<CameraState> {
        let (revision, state) = self.bus.latest(&self.room)?;
        if revision <= self.seen {
            return None;
        }
        self.seen = revision;
        Some(state)
    }
}

impl Drop for Subscription {
    fn drop(&mut self) {
        self.bus.unsubscribe(&self.room, &self.id);
        log::debug!("{} left camera room '{}'", self.id, self.room);
    }
}

/// What an engine did with a polled camera state
#[derive(Debug, Clone, PartialEq)]
pub enum SyncOutcome {
    /// Nothing new on the bus
    NoUpdate,
    /// The state was applied to the camera
    Applied,
    /// The state was written by this engine and ignored
    OwnUpdate,
    /// This engine does not follow the bus
    NotFollowing,
    /// The state could not be converted to a pose
    Invalid(String),
}

/// Decide whether an engine with `own_id` should apply `state`
///
/// A state is never applied by the instance that wrote it.
pub fn should_apply(state: &CameraState, own_id: &ComponentId, following: bool) -> SyncOutcome {
    if state.is_from(own_id) {
        SyncOutcome::OwnUpdate
    } else if !following {
        SyncOutcome::NotFollowing
    } else {
        SyncOutcome::Applied
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::render::Camera;

    fn state() -> CameraState {
        CameraState::from_pose(&Camera::default().pose(), None)
    }

    #[test]
    fn test_poll_sees_each_revision_once() {
        let bus = CameraSyncBus::new();
        let mut a = bus.subscribe("main", ComponentId::from("a"));
        let mut b = bus.subscribe("main", ComponentId::from("b"));

        a.publish(state());
        assert!(a.poll().is_none());
        let received = b.poll().unwrap();
        assert!(received.is_from(&ComponentId::from("a")));
        assert!(b.poll().is_none());
    }

    #[test]
    fn test_rooms_are_isolated() {
        let bus = CameraSyncBus::new();
        let mut a = bus.subscribe("left", ComponentId::from("a"));
        let mut b = bus.subscribe("right", ComponentId::from("b"));
        a.publish(state());
        assert!(b.poll().is_none());
    }

    #[test]
    fn test_late_subscriber_gets_latest() {
        let bus = CameraSyncBus::new();
        bus.publish("main", state().stamped(&ComponentId::from("a")));
        let mut late = bus.subscribe("main", ComponentId::from("b"));
        assert!(late.poll().is_some());
    }

    #[test]
    fn test_drop_unsubscribes() {
        let bus = CameraSyncBus::new();
        let a = bus.subscribe("main", ComponentId::from("a"));
        let b = bus.subscribe("main", ComponentId::from("b"));
        assert_eq!(bus.subscriber_count("main"), 2);
        drop(a);
        assert_eq!(bus.subscriber_count("main"), 1);
        drop(b);
        assert_eq!(bus.subscriber_count("main"), 0);
    }

    #[test]
    fn test_own_updates_are_never_applied() {
        let own = ComponentId::from("a");
        let mine = state().stamped(&own);
        assert_eq!(should_apply(&mine, &own, true), SyncOutcome::OwnUpdate);
        let theirs = state().stamped(&ComponentId::from("b"));
        assert_eq!(should_apply(&theirs, &own, true), SyncOutcome::Applied);
        assert_eq!(should_apply(&theirs, &own, false), SyncOutcome::NotFollowing);
    }
}
