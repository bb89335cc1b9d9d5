//! Scene graph assembler
//!
//! Walks a document recursively, delegates leaves to the
//! [`GeometryBuilder`] and fills the [`ObjectRegistry`]. Every leaf becomes a
//! named container whose children are its primitives, so picking can resolve
//! a hit on any instance back to the node that declared it.

use crate::config::SceneSettings;
use crate::foundation::collections::{IdCounter, ObjectKey};
use super::document::SceneNode;
use super::geometry::GeometryBuilder;
use super::registry::{LogicalObject, ObjectRegistry};
use super::renderable_object::RenderableObject;
use super::scene_graph::SceneGraph;

/// Counters reported after a build or an append
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq)]
pub struct BuildStats {
    /// Groups created
    pub groups: usize,
    /// Leaves that produced geometry
    pub leaves: usize,
    /// Renderables created
    pub renderables: usize,
    /// Leaves skipped with a warning
    pub skipped: usize,
}

/// Result of a full build, ready to be swapped in
#[derive(Debug)]
pub struct BuiltGraph {
    /// Fresh graph
    pub graph: SceneGraph,
    /// Registry indexing `graph`
    pub registry: ObjectRegistry,
    /// Axis node pulled out of the scene when `extract_axis` is on
    pub axis: Option<SceneNode>,
    /// Counters
    pub stats: BuildStats,
}

struct Walk<'a> {
    graph: &'a mut SceneGraph,
    registry: &'a mut ObjectRegistry,
    settings: &'a SceneSettings,
    extract: Option<&'a str>,
    axis: Option<SceneNode>,
    names: Vec<String>,
    stats: BuildStats,
}

/// Builds scene graphs with an instance-scoped id counter
#[derive(Debug, Default)]
pub struct SceneAssembler {
    counter: IdCounter,
}

impl SceneAssembler {
    /// Create an assembler whose ids start at zero
    pub fn new() -> Self {
        Self::default()
    }

    /// Build a complete graph from a document
    ///
    /// The id counter restarts at zero, so building the same document twice
    /// yields identical ids and registry shapes.
    pub fn build(&mut self, document: &SceneNode, settings: &SceneSettings) -> BuiltGraph {
        self.counter.reset();
        let mut graph = SceneGraph::new(document.name.clone());
        let mut registry = ObjectRegistry::new();
        let root = graph.root();
        registry.register_logical(root, LogicalObject::from_node(document, None));

        let mut walk = Walk {
            graph: &mut graph,
            registry: &mut registry,
            settings,
            extract: settings.extract_axis.then_some(settings.axis_node_name.as_str()),
            axis: None,
            names: document.name.iter().cloned().collect(),
            stats: BuildStats::default(),
        };
        for child in document.children() {
            self.visit(&mut walk, root, child, document.is_visible());
        }
        let (axis, stats) = (walk.axis, walk.stats);

        log::debug!(
            "Built scene graph: {} groups, {} leaves, {} renderables, {} skipped",
            stats.groups, stats.leaves, stats.renderables, stats.skipped
        );
        BuiltGraph { graph, registry, axis, stats }
    }

    /// Append a subtree under the root of an existing graph
    pub fn add_nodes(
        &mut self,
        graph: &mut SceneGraph,
        registry: &mut ObjectRegistry,
        node: &SceneNode,
        settings: &SceneSettings,
    ) -> BuildStats {
        let root = graph.root();
        let names = graph.get(root).and_then(|o| o.name.clone()).into_iter().collect();
        let mut walk = Walk { graph, registry, settings, extract: None, axis: None, names, stats: BuildStats::default() };
        self.visit(&mut walk, root, node, true);
        walk.stats
    }

    /// Detach everything registered under `name`; returns the renderables removed
    ///
    /// Containers carrying the name are removed with their whole subtree.
    /// An unknown name is a no-op.
    pub fn remove_object_by_name(graph: &mut SceneGraph, registry: &mut ObjectRegistry, name: &str) -> usize {
        let containers = registry.containers_named(name);
        let mut removed = 0;
        for container in containers {
            for key in graph.detach(container) {
                if registry.is_renderable(key) {
                    removed += 1;
                }
                registry.unregister(key);
            }
        }
        for key in registry.keys_for_name(name) {
            for detached in graph.detach(key) {
                removed += 1;
                registry.unregister(detached);
            }
        }
        if removed > 0 {
            log::debug!("Removed {} objects named {:?}", removed, name);
        }
        removed
    }

    /// Replace the objects named `name` with a new subtree
    pub fn replace_object(
        &mut self,
        graph: &mut SceneGraph,
        registry: &mut ObjectRegistry,
        name: &str,
        node: &SceneNode,
        settings: &SceneSettings,
    ) -> BuildStats {
        Self::remove_object_by_name(graph, registry, name);
        self.add_nodes(graph, registry, node, settings)
    }

    fn visit(&mut self, walk: &mut Walk<'_>, parent: ObjectKey, node: &SceneNode, inherited_visible: bool) {
        if let (Some(axis_name), Some(name)) = (walk.extract, node.name.as_deref()) {
            if name == axis_name && walk.axis.is_none() {
                walk.axis = Some(node.clone());
                return;
            }
        }
        let visible = inherited_visible && node.is_visible();

        if node.is_group() {
            let Some(container) = walk.graph.insert_group(parent, node.name.clone()) else {
                return;
            };
            walk.registry.register_logical(container, LogicalObject::from_node(node, None));
            walk.stats.groups += 1;
            if let Some(name) = &node.name {
                walk.names.push(name.clone());
            }
            for child in node.children() {
                self.visit(walk, container, child, visible);
            }
            if node.name.is_some() {
                walk.names.pop();
            }
            return;
        }

        let leaf = match GeometryBuilder::new(walk.settings).build(node) {
            Ok(leaf) => leaf,
            Err(e) => {
                log::warn!("Skipping node {:?}: {}", node.name, e);
                walk.stats.skipped += 1;
                return;
            }
        };
        if leaf.instances.is_empty() {
            log::debug!("Node {:?} declares no instances", node.name);
            return;
        }
        let Some(container) = walk.graph.insert_group(parent, node.name.clone()) else {
            return;
        };
        walk.registry.register_logical(container, LogicalObject::from_node(node, Some(leaf.kind)));
        walk.stats.leaves += 1;

        let mut names = walk.names.clone();
        names.extend(node.name.iter().cloned());
        for instance in leaf.instances {
            let id = self.counter.next_id();
            let object = RenderableObject::new(id, instance.primitive, leaf.color, leaf.opacity, visible)
                .with_track(instance.track);
            if let Some(key) = walk.graph.insert_renderable(container, object) {
                walk.registry.register_renderable(key, id, &names, node.is_clickable(), node.tooltip.as_deref());
                walk.stats.renderables += 1;
            }
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::scene::parse_document;
    use serde_json::json;

    fn document(value: serde_json::Value) -> SceneNode {
        parse_document(Some(&value)).unwrap()
    }

    fn crystal() -> SceneNode {
        document(json!({
            "name": "root",
            "contents": [
                {"name": "atoms", "contents": [
                    {"name": "Fe", "type": "spheres", "positions": [[0, 0, 0], [1, 1, 1]], "clickable": true, "tooltip": "iron"},
                    {"name": "O", "type": "spheres", "positions": [[0.5, 0.5, 0.5]]}
                ]},
                {"name": "bonds", "type": "cylinders", "positionPairs": [[[0, 0, 0], [0.5, 0.5, 0.5]]]},
                {"name": "broken", "type": "cylinders"},
                {"name": "axes", "contents": [
                    {"type": "arrows", "positionPairs": [[[0, 0, 0], [1, 0, 0]]]}
                ]}
            ]
        }))
    }

    #[test]
    fn test_build_counts_and_names() {
        let settings = SceneSettings::default();
        let built = SceneAssembler::new().build(&crystal(), &settings);
        assert_eq!(built.stats.renderables, 5);
        assert_eq!(built.stats.skipped, 1);
        assert_eq!(built.registry.keys_for_name("Fe").len(), 2);
        assert_eq!(built.registry.keys_for_name("atoms").len(), 3);
        assert_eq!(built.registry.keys_for_name("root").len(), 5);
        assert_eq!(built.registry.clickable().count(), 2);
        assert!(built.registry.validate().is_ok());
        assert!(built.axis.is_none());
    }

    #[test]
    fn test_rebuild_is_idempotent() {
        let settings = SceneSettings::default();
        let mut assembler = SceneAssembler::new();
        let first = assembler.build(&crystal(), &settings);
        let second = assembler.build(&crystal(), &settings);
        assert_eq!(first.registry.shape(), second.registry.shape());
        let ids = |b: &BuiltGraph| {
            let mut ids: Vec<_> = b.graph.renderables().map(|(_, r)| r.id).collect();
            ids.sort();
            ids
        };
        assert_eq!(ids(&first), ids(&second));
    }

    #[test]
    fn test_extract_axis() {
        let settings = SceneSettings { extract_axis: true, ..SceneSettings::default() };
        let built = SceneAssembler::new().build(&crystal(), &settings);
        assert_eq!(built.axis.as_ref().and_then(|n| n.name.as_deref()), Some("axes"));
        assert_eq!(built.stats.renderables, 4);
    }

    #[test]
    fn test_hidden_group_hides_descendants() {
        let settings = SceneSettings::default();
        let doc = document(json!({
            "contents": [{"name": "g", "visible": false, "contents": [
                {"type": "spheres", "positions": [[0, 0, 0]]}
            ]}]
        }));
        let built = SceneAssembler::new().build(&doc, &settings);
        assert_eq!(built.graph.visible_renderables().count(), 0);
    }

    #[test]
    fn test_remove_and_replace_by_name() {
        let settings = SceneSettings::default();
        let mut assembler = SceneAssembler::new();
        let BuiltGraph { mut graph, mut registry, .. } = assembler.build(&crystal(), &settings);

        assert_eq!(SceneAssembler::remove_object_by_name(&mut graph, &mut registry, "Fe"), 2);
        assert!(!registry.contains_name("Fe"));
        assert_eq!(registry.keys_for_name("atoms").len(), 1);
        assert_eq!(SceneAssembler::remove_object_by_name(&mut graph, &mut registry, "missing"), 0);

        let replacement = document(json!({
            "contents": [{"name": "O", "type": "cubes", "positions": [[0, 0, 0], [1, 0, 0]]}]
        }));
        let node = replacement.children()[0].clone();
        let stats = assembler.replace_object(&mut graph, &mut registry, "O", &node, &settings);
        assert_eq!(stats.renderables, 2);
        assert_eq!(registry.keys_for_name("O").len(), 2);
        assert_eq!(registry.keys_for_name("root").len(), 4);
        assert!(registry.validate().is_ok());
    }
}
