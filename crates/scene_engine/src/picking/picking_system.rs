//! Picking system for pointer-based object selection
//!
//! Orchestrates the picking pipeline: pointer → camera ray → clickable
//! shapes → logical object. Hits on any instance of a fan-out node resolve
//! to the node's container, which is what selection and click events use.

use std::collections::{HashMap, HashSet};

use crate::foundation::collections::ObjectKey;
use crate::foundation::math::Vec3;
use crate::scene::{LogicalObject, ObjectRegistry, SceneGraph};
use super::primitives::{Ray, RayHit};
use super::shape::WorldShape;

/// Selection mode for picking system
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum SelectionMode {
    /// Replace current selection (default)
    Replace,
    /// Add to current selection (Ctrl)
    Add,
    /// Remove from current selection (Shift)
    Remove,
    /// Flip membership (multi-select without modifiers)
    Toggle,
}

/// Why a renderable is outlined
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum Highlight {
    /// Part of the selection
    Selected,
    /// Under the pointer
    Hovered,
}

/// A resolved pick
#[derive(Debug, Clone)]
pub struct PickResult {
    /// Renderable the ray hit
    pub renderable: ObjectKey,
    /// Container the hit resolved to
    pub logical_key: ObjectKey,
    /// Logical node behind the container
    pub object: LogicalObject,
    /// World-space intersection point
    pub point: Vec3,
    /// Distance along the ray
    pub distance: f32,
}

/// Parameters describing how shapes are built for the current view
#[derive(Debug, Clone, Copy)]
pub struct CastParams {
    /// World units covered by one pixel
    pub pixel_world_size: f32,
    /// Tessellation used for cone heads
    pub cylinder_segments: u32,
}

/// Selection and hover state plus the clickable-set ray cast
#[derive(Debug, Default)]
pub struct PickingSystem {
    /// Selected containers
    selected: HashSet<ObjectKey>,
    /// Hovered container
    hovered: Option<ObjectKey>,
    multi_select: bool,
    ctrl_pressed: bool,
    shift_pressed: bool,
}

impl PickingSystem {
    /// Create a picking system
    pub fn new(multi_select: bool) -> Self {
        Self { multi_select, ..Self::default() }
    }

    /// Enable or disable the multi-selection toggle
    pub fn set_multi_select(&mut self, enabled: bool) {
        self.multi_select = enabled;
    }

    /// Update modifier key states (Ctrl for add, Shift for remove)
    pub fn update_modifiers(&mut self, ctrl: bool, shift: bool) {
        self.ctrl_pressed = ctrl;
        self.shift_pressed = shift;
    }

    /// Current selection mode based on modifier keys
    pub const fn selection_mode(&self) -> SelectionMode {
        if self.ctrl_pressed {
            SelectionMode::Add
        } else if self.shift_pressed {
            SelectionMode::Remove
        } else if self.multi_select {
            SelectionMode::Toggle
        } else {
            SelectionMode::Replace
        }
    }

    /// Closest visible clickable renderable along `ray`
    pub fn ray_cast(graph: &SceneGraph, registry: &ObjectRegistry, ray: &Ray, params: CastParams) -> Option<RayHit> {
        let mut closest: Option<RayHit> = None;
        for key in registry.clickable() {
            let Some(object) = graph.renderable(key) else {
                continue;
            };
            if !object.is_visible() {
                continue;
            }
            let Some(shape) = WorldShape::from_primitive(
                &object.primitive,
                &object.animated.offset,
                params.pixel_world_size,
                params.cylinder_segments,
            ) else {
                continue;
            };
            if let Some((distance, normal)) = shape.cast(ray) {
                if closest.map_or(true, |c| distance < c.distance) {
                    closest = Some(RayHit { key, distance, point: ray.point_at(distance), normal });
                }
            }
        }
        closest
    }

    /// Ray cast and resolve the hit to its logical object
    pub fn pick(graph: &SceneGraph, registry: &ObjectRegistry, ray: &Ray, params: CastParams) -> Option<PickResult> {
        let hit = Self::ray_cast(graph, registry, ray, params)?;
        let (logical_key, object) = registry.resolve_logical(graph, hit.key)?;
        log::debug!("Picked {:?} at distance {:.3}", object.name, hit.distance);
        Some(PickResult {
            renderable: hit.key,
            logical_key,
            object: object.clone(),
            point: hit.point,
            distance: hit.distance,
        })
    }

    /// Apply a click; returns whether the selection changed
    pub fn click(&mut self, hit: Option<&PickResult>) -> bool {
        let before = self.selected.clone();
        match (hit, self.selection_mode()) {
            (Some(hit), SelectionMode::Replace) => {
                self.selected.clear();
                self.selected.insert(hit.logical_key);
            }
            (Some(hit), SelectionMode::Add) => {
                self.selected.insert(hit.logical_key);
            }
            (Some(hit), SelectionMode::Remove) => {
                self.selected.remove(&hit.logical_key);
            }
            (Some(hit), SelectionMode::Toggle) => {
                if !self.selected.remove(&hit.logical_key) {
                    self.selected.insert(hit.logical_key);
                }
            }
            // Only deselect on a miss in replace mode
            (None, SelectionMode::Replace) => self.selected.clear(),
            (None, _) => {}
        }
        before != self.selected
    }

    /// Update hover state; returns whether it changed
    pub fn hover(&mut self, hit: Option<&PickResult>) -> bool {
        let next = hit.map(|h| h.logical_key);
        let changed = next != self.hovered;
        self.hovered = next;
        changed
    }

    /// Currently selected containers
    pub const fn selected(&self) -> &HashSet<ObjectKey> {
        &self.selected
    }

    /// Currently hovered container
    pub const fn hovered(&self) -> Option<ObjectKey> {
        self.hovered
    }

    /// Forget selection and hover (keys die with the graph on rebuild)
    pub fn clear(&mut self) {
        self.selected.clear();
        self.hovered = None;
    }

    /// Drop entries whose containers no longer exist
    pub fn retain_live(&mut self, graph: &SceneGraph) {
        self.selected.retain(|k| graph.get(*k).is_some());
        if self.hovered.is_some_and(|k| graph.get(k).is_none()) {
            self.hovered = None;
        }
    }

    /// Renderables to outline; selection wins over hover
    pub fn highlights(&self, graph: &SceneGraph) -> HashMap<ObjectKey, Highlight> {
        let mut out = HashMap::new();
        if let Some(hovered) = self.hovered {
            for key in graph.subtree(hovered) {
                out.insert(key, Highlight::Hovered);
            }
        }
        for selected in &self.selected {
            for key in graph.subtree(*selected) {
                out.insert(key, Highlight::Selected);
            }
        }
        out.retain(|k, _| graph.renderable(*k).is_some());
        out
    }
}
