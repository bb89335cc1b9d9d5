//! Non-owning identity index over the scene graph

use std::collections::{BTreeMap, HashMap, HashSet};

use crate::foundation::collections::{GeneratedId, ObjectKey};
use super::document::{NodeKind, SceneNode};
use super::scene_graph::SceneGraph;

/// Logical (document-level) identity of a container
///
/// This is what picking resolves to and what click events report.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct LogicalObject {
    /// Node name
    pub name: Option<String>,
    /// Explicit `id` from the document
    pub id: Option<String>,
    /// Primitive kind for leaves, `None` for groups
    pub kind: Option<NodeKind>,
    /// Tooltip text
    pub tooltip: Option<String>,
    /// Whether the node was declared clickable
    pub clickable: bool,
}

impl LogicalObject {
    /// Logical identity of a document node
    pub fn from_node(node: &SceneNode, kind: Option<NodeKind>) -> Self {
        Self {
            name: node.name.clone(),
            id: node.id.clone(),
            kind,
            tooltip: node.tooltip.clone(),
            clickable: node.is_clickable(),
        }
    }
}

/// Registry inconsistency found by [`ObjectRegistry::validate`]
#[derive(Debug, Clone, PartialEq, Eq, thiserror::Error)]
pub enum RegistryError {
    /// A clickable key is not a registered renderable
    #[error("clickable object {0:?} is not registered")]
    DanglingClickable(ObjectKey),
    /// A tooltip key is not a registered renderable
    #[error("tooltip object {0:?} is not registered")]
    DanglingTooltip(ObjectKey),
    /// A name maps to an unregistered key
    #[error("name `{0}` refers to an unregistered object")]
    DanglingName(String),
}

/// Lookup maps between renderables, their generated ids and document nodes
///
/// Keys point into the [`SceneGraph`] arena; the registry never owns objects
/// and is rebuilt together with the graph.
#[derive(Debug, Default)]
pub struct ObjectRegistry {
    logical: HashMap<ObjectKey, LogicalObject>,
    renderables: HashMap<ObjectKey, GeneratedId>,
    by_id: HashMap<GeneratedId, ObjectKey>,
    by_name: HashMap<String, HashSet<ObjectKey>>,
    clickable: HashSet<ObjectKey>,
    tooltips: HashMap<ObjectKey, String>,
}

impl ObjectRegistry {
    /// Create an empty registry
    pub fn new() -> Self {
        Self::default()
    }

    /// Record the logical node behind a container
    pub fn register_logical(&mut self, container: ObjectKey, logical: LogicalObject) {
        self.logical.insert(container, logical);
    }

    /// Record a renderable produced under the given names
    ///
    /// `names` holds every named ancestor including the producing leaf, so
    /// toggling a group name reaches all of its descendants.
    pub fn register_renderable(
        &mut self,
        key: ObjectKey,
        id: GeneratedId,
        names: &[String],
        clickable: bool,
        tooltip: Option<&str>,
    ) {
        self.renderables.insert(key, id);
        self.by_id.insert(id, key);
        for name in names {
            self.by_name.entry(name.clone()).or_default().insert(key);
        }
        if clickable {
            self.clickable.insert(key);
        }
        if let Some(text) = tooltip {
            self.tooltips.insert(key, text.to_string());
        }
    }

    /// Drop every entry for `key`
    pub fn unregister(&mut self, key: ObjectKey) {
        self.logical.remove(&key);
        if let Some(id) = self.renderables.remove(&key) {
            self.by_id.remove(&id);
        }
        self.clickable.remove(&key);
        self.tooltips.remove(&key);
        self.by_name.retain(|_, keys| {
            keys.remove(&key);
            !keys.is_empty()
        });
    }

    /// Remove everything
    pub fn clear(&mut self) {
        self.logical.clear();
        self.renderables.clear();
        self.by_id.clear();
        self.by_name.clear();
        self.clickable.clear();
        self.tooltips.clear();
    }

    /// Renderables registered under `name`
    pub fn keys_for_name(&self, name: &str) -> Vec<ObjectKey> {
        self.by_name.get(name).map(|s| s.iter().copied().collect()).unwrap_or_default()
    }

    /// Whether anything is registered under `name`
    pub fn contains_name(&self, name: &str) -> bool {
        self.by_name.contains_key(name)
    }

    /// Arena key of a generated id
    pub fn key_for_id(&self, id: GeneratedId) -> Option<ObjectKey> {
        self.by_id.get(&id).copied()
    }

    /// Logical entry recorded for exactly this key
    pub fn logical(&self, key: ObjectKey) -> Option<&LogicalObject> {
        self.logical.get(&key)
    }

    /// Walk up from `key` to the nearest ancestor with a logical entry
    pub fn resolve_logical(&self, graph: &SceneGraph, key: ObjectKey) -> Option<(ObjectKey, &LogicalObject)> {
        let mut current = Some(key);
        while let Some(k) = current {
            if let Some(logical) = self.logical.get(&k) {
                return Some((k, logical));
            }
            current = graph.parent(k);
        }
        None
    }

    /// Containers whose logical node carries `name`
    pub fn containers_named(&self, name: &str) -> Vec<ObjectKey> {
        self.logical
            .iter()
            .filter(|(_, l)| l.name.as_deref() == Some(name))
            .map(|(k, _)| *k)
            .collect()
    }

    /// Whether `key` is a registered renderable
    pub fn is_renderable(&self, key: ObjectKey) -> bool {
        self.renderables.contains_key(&key)
    }

    /// Whether `key` was declared clickable
    pub fn is_clickable(&self, key: ObjectKey) -> bool {
        self.clickable.contains(&key)
    }

    /// Clickable renderables
    pub fn clickable(&self) -> impl Iterator<Item = ObjectKey> + '_ {
        self.clickable.iter().copied()
    }

    /// Tooltip for a renderable
    pub fn tooltip(&self, key: ObjectKey) -> Option<&str> {
        self.tooltips.get(&key).map(String::as_str)
    }

    /// Number of registered renderables
    pub fn renderable_count(&self) -> usize {
        self.renderables.len()
    }

    /// Name → renderable count, sorted, for comparing registries across builds
    pub fn shape(&self) -> BTreeMap<String, usize> {
        self.by_name.iter().map(|(n, keys)| (n.clone(), keys.len())).collect()
    }

    /// Check that clickable, tooltip and name entries refer to registered renderables
    pub fn validate(&self) -> Result<(), RegistryError> {
        if let Some(key) = self.clickable.iter().find(|k| !self.renderables.contains_key(k)) {
            return Err(RegistryError::DanglingClickable(*key));
        }
        if let Some(key) = self.tooltips.keys().find(|k| !self.renderables.contains_key(k)) {
            return Err(RegistryError::DanglingTooltip(*key));
        }
        for (name, keys) in &self.by_name {
            if keys.iter().any(|k| !self.renderables.contains_key(k)) {
                return Err(RegistryError::DanglingName(name.clone()));
            }
        }
        Ok(())
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::foundation::color::Color;
    use crate::foundation::math::Vec3;
    use crate::scene::{Primitive, RenderableObject};

    fn setup() -> (SceneGraph, ObjectRegistry, ObjectKey, ObjectKey) {
        let mut graph = SceneGraph::new(None);
        let mut registry = ObjectRegistry::new();
        let container = graph.insert_group(graph.root(), Some("a".into())).unwrap();
        let node = SceneNode { name: Some("a".into()), clickable: Some(true), ..SceneNode::default() };
        registry.register_logical(container, LogicalObject::from_node(&node, Some(NodeKind::Spheres)));
        let obj = RenderableObject::new(
            GeneratedId(0),
            Primitive::Sphere { center: Vec3::zeros(), radius: 1.0 },
            Color::RED,
            1.0,
            true,
        );
        let key = graph.insert_renderable(container, obj).unwrap();
        registry.register_renderable(key, GeneratedId(0), &["root".into(), "a".into()], true, Some("Fe"));
        (graph, registry, container, key)
    }

    #[test]
    fn test_resolve_walks_to_container() {
        let (graph, registry, container, key) = setup();
        let (found, logical) = registry.resolve_logical(&graph, key).unwrap();
        assert_eq!(found, container);
        assert_eq!(logical.name.as_deref(), Some("a"));
        assert_eq!(registry.tooltip(key), Some("Fe"));
        assert_eq!(registry.key_for_id(GeneratedId(0)), Some(key));
    }

    #[test]
    fn test_unregister_purges_every_map() {
        let (_graph, mut registry, _container, key) = setup();
        assert_eq!(registry.shape().get("root"), Some(&1));
        registry.unregister(key);
        assert!(!registry.contains_name("a"));
        assert!(!registry.is_clickable(key));
        assert_eq!(registry.tooltip(key), None);
        assert_eq!(registry.renderable_count(), 0);
        assert!(registry.validate().is_ok());
    }

    #[test]
    fn test_validate_detects_dangling_clickable() {
        let (_graph, mut registry, _container, key) = setup();
        registry.renderables.remove(&key);
        assert_eq!(registry.validate(), Err(RegistryError::DanglingClickable(key)));
    }
}
