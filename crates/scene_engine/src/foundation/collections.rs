//! Arena keys and identity types
//!
//! The scene graph stores every object in a slot map; everything else refers to
//! objects through these keys instead of holding references into the graph.

pub use slotmap::SlotMap;

slotmap::new_key_type! {
    /// Stable handle to an object stored in the scene graph arena
    pub struct ObjectKey;
}

/// Identity assigned to a renderable by the assembler
///
/// Generated from a counter owned by one engine instance and reset on every
/// rebuild, so two builds of the same document produce the same ids.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, PartialOrd, Ord)]
pub struct GeneratedId(pub u64);

impl std::fmt::Display for GeneratedId {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        write!(f, "obj-{}", self.0)
    }
}

/// Counter handing out [`GeneratedId`]s for a single engine instance
#[derive(Debug, Default)]
pub struct IdCounter {
    next: u64,
}

impl IdCounter {
    /// Create a counter starting at zero
    pub fn new() -> Self {
        Self::default()
    }

    /// Hand out the next id
    pub fn next_id(&mut self) -> GeneratedId {
        let id = GeneratedId(self.next);
        self.next += 1;
        id
    }

    /// Restart numbering from zero
    pub fn reset(&mut self) {
        self.next = 0;
    }
}

/// Identity of one Scene Engine instance
///
/// Stamped on every camera state the instance publishes so it can recognize
/// (and ignore) its own updates when they come back from the bus.
#[derive(Debug, Clone, PartialEq, Eq, Hash, serde::Serialize, serde::Deserialize)]
#[serde(transparent)]
pub struct ComponentId(pub String);

impl ComponentId {
    /// Generate a fresh random id
    pub fn generate() -> Self {
        Self(uuid::Uuid::new_v4().to_string())
    }

    /// Borrow the id as a string slice
    pub fn as_str(&self) -> &str {
        &self.0
    }
}

impl From<&str> for ComponentId {
    fn from(value: &str) -> Self {
        Self(value.to_string())
    }
}

impl std::fmt::Display for ComponentId {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.write_str(&self.0)
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_counter_reset_restarts_numbering() {
        let mut counter = IdCounter::new();
        assert_eq!(counter.next_id(), GeneratedId(0));
        assert_eq!(counter.next_id(), GeneratedId(1));
        counter.reset();
        assert_eq!(counter.next_id(), GeneratedId(0));
    }

    #[test]
    fn test_generated_component_ids_differ() {
        assert_ne!(ComponentId::generate(), ComponentId::generate());
    }
}
