//! Scene graph arena
//!
//! Every group and renderable lives in one slot map. Parents hold ordered
//! child keys and children hold a parent key; nothing outside the graph
//! keeps references into it.

use crate::foundation::collections::{ObjectKey, SlotMap};
use crate::foundation::math::Vec3;
use super::renderable_object::RenderableObject;

/// Axis-Aligned Bounding Box for spatial queries
#[derive(Debug, Clone, Copy, PartialEq)]
pub struct AABB {
    /// Minimum corner of the bounding box
    pub min: Vec3,
    /// Maximum corner of the bounding box
    pub max: Vec3,
}

impl AABB {
    /// Create a new AABB from min and max points
    pub fn new(min: Vec3, max: Vec3) -> Self {
        Self { min, max }
    }

    /// Smallest box containing every point, `None` for an empty slice
    pub fn from_points(points: &[Vec3]) -> Option<Self> {
        let (first, rest) = points.split_first()?;
        Some(rest.iter().fold(Self::new(*first, *first), |acc, p| acc.expanded_to(p)))
    }

    /// Grow to include a point
    #[must_use]
    pub fn expanded_to(&self, point: &Vec3) -> Self {
        Self {
            min: self.min.inf(point),
            max: self.max.sup(point),
        }
    }

    /// Union of two boxes
    #[must_use]
    pub fn union(&self, other: &Self) -> Self {
        Self {
            min: self.min.inf(&other.min),
            max: self.max.sup(&other.max),
        }
    }

    /// Get the center of the AABB
    pub fn center(&self) -> Vec3 {
        (self.min + self.max) * 0.5
    }

    /// Get the extents (half-size) of the AABB
    pub fn extents(&self) -> Vec3 {
        (self.max - self.min) * 0.5
    }

    /// Radius of the sphere enclosing the box
    pub fn bounding_radius(&self) -> f32 {
        self.extents().norm()
    }

    /// Check if this AABB contains a point
    pub fn contains_point(&self, point: Vec3) -> bool {
        point.x >= self.min.x && point.x <= self.max.x &&
        point.y >= self.min.y && point.y <= self.max.y &&
        point.z >= self.min.z && point.z <= self.max.z
    }

    /// Test ray intersection with this AABB using the slab method
    ///
    /// Returns the distance to the entry point (0 when the origin is inside).
    pub fn intersect_ray(&self, ray_origin: Vec3, ray_dir: Vec3) -> Option<f32> {
        let inv = |d: f32| if d != 0.0 { 1.0 / d } else { f32::INFINITY };
        let inv_dir = Vec3::new(inv(ray_dir.x), inv(ray_dir.y), inv(ray_dir.z));

        let t1 = (self.min - ray_origin).component_mul(&inv_dir);
        let t2 = (self.max - ray_origin).component_mul(&inv_dir);

        let tmin = t1.inf(&t2).max();
        let tmax = t1.sup(&t2).min();

        if tmax >= tmin && tmax >= 0.0 {
            Some(tmin.max(0.0))
        } else {
            None
        }
    }
}

/// What an arena slot holds
#[derive(Debug, Clone)]
pub enum ObjectKind {
    /// Named container with ordered children
    Group {
        /// Child keys in document order
        children: Vec<ObjectKey>,
    },
    /// A single primitive
    Renderable(RenderableObject),
}

/// One arena slot
#[derive(Debug, Clone)]
pub struct SceneObject {
    /// Name copied from the document node (containers only)
    pub name: Option<String>,
    /// Owning container, `None` only for the root
    pub parent: Option<ObjectKey>,
    /// Payload
    pub kind: ObjectKind,
}

impl SceneObject {
    /// Renderable payload, if any
    pub const fn as_renderable(&self) -> Option<&RenderableObject> {
        match &self.kind {
            ObjectKind::Renderable(r) => Some(r),
            ObjectKind::Group { .. } => None,
        }
    }

    /// Child keys (empty for renderables)
    pub fn children(&self) -> &[ObjectKey] {
        match &self.kind {
            ObjectKind::Group { children } => children,
            ObjectKind::Renderable(_) => &[],
        }
    }
}

/// Arena-backed scene graph with a single root container
#[derive(Debug)]
pub struct SceneGraph {
    objects: SlotMap<ObjectKey, SceneObject>,
    root: ObjectKey,
}

impl Default for SceneGraph {
    fn default() -> Self {
        Self::new(None)
    }
}

impl SceneGraph {
    /// Create a graph holding only a root container
    pub fn new(root_name: Option<String>) -> Self {
        let mut objects = SlotMap::with_key();
        let root = objects.insert(SceneObject {
            name: root_name,
            parent: None,
            kind: ObjectKind::Group { children: Vec::new() },
        });
        Self { objects, root }
    }

    /// Root container key
    pub const fn root(&self) -> ObjectKey {
        self.root
    }

    /// Total number of slots including the root
    pub fn len(&self) -> usize {
        self.objects.len()
    }

    /// True when only the root remains
    pub fn is_empty(&self) -> bool {
        self.objects.len() <= 1
    }

    /// Look up a slot
    pub fn get(&self, key: ObjectKey) -> Option<&SceneObject> {
        self.objects.get(key)
    }

    /// Renderable stored at `key`
    pub fn renderable(&self, key: ObjectKey) -> Option<&RenderableObject> {
        self.objects.get(key).and_then(SceneObject::as_renderable)
    }

    /// Mutable renderable stored at `key`
    pub fn renderable_mut(&mut self, key: ObjectKey) -> Option<&mut RenderableObject> {
        match &mut self.objects.get_mut(key)?.kind {
            ObjectKind::Renderable(r) => Some(r),
            ObjectKind::Group { .. } => None,
        }
    }

    /// Parent of `key`
    pub fn parent(&self, key: ObjectKey) -> Option<ObjectKey> {
        self.objects.get(key).and_then(|o| o.parent)
    }

    /// Children of `key` in insertion order
    pub fn children(&self, key: ObjectKey) -> &[ObjectKey] {
        self.objects.get(key).map_or(&[], SceneObject::children)
    }

    fn attach(&mut self, parent: ObjectKey, object: SceneObject) -> Option<ObjectKey> {
        if !matches!(self.objects.get(parent)?.kind, ObjectKind::Group { .. }) {
            return None;
        }
        let key = self.objects.insert(object);
        if let Some(ObjectKind::Group { children }) = self.objects.get_mut(parent).map(|p| &mut p.kind) {
            children.push(key);
        }
        Some(key)
    }

    /// Add a container under `parent`; `None` if `parent` is not a live group
    pub fn insert_group(&mut self, parent: ObjectKey, name: Option<String>) -> Option<ObjectKey> {
        self.attach(parent, SceneObject {
            name,
            parent: Some(parent),
            kind: ObjectKind::Group { children: Vec::new() },
        })
    }

    /// Add a renderable under `parent`; `None` if `parent` is not a live group
    pub fn insert_renderable(&mut self, parent: ObjectKey, object: RenderableObject) -> Option<ObjectKey> {
        self.attach(parent, SceneObject {
            name: None,
            parent: Some(parent),
            kind: ObjectKind::Renderable(object),
        })
    }

    /// Keys of `key` and everything below it, parents before children
    pub fn subtree(&self, key: ObjectKey) -> Vec<ObjectKey> {
        let mut out = Vec::new();
        let mut stack = vec![key];
        while let Some(current) = stack.pop() {
            if self.objects.contains_key(current) {
                out.push(current);
                stack.extend(self.children(current).iter().rev());
            }
        }
        out
    }

    /// Remove `key` and its descendants, returning every removed key
    ///
    /// The root itself cannot be detached; detaching it clears its children.
    pub fn detach(&mut self, key: ObjectKey) -> Vec<ObjectKey> {
        if key == self.root {
            let children = self.children(key).to_vec();
            return children.into_iter().flat_map(|c| self.detach(c)).collect();
        }
        let removed = self.subtree(key);
        if let Some(parent) = self.parent(key) {
            if let Some(ObjectKind::Group { children }) = self.objects.get_mut(parent).map(|p| &mut p.kind) {
                children.retain(|c| *c != key);
            }
        }
        for k in &removed {
            self.objects.remove(*k);
        }
        removed
    }

    /// Drop everything except an empty root
    pub fn clear(&mut self) {
        self.detach(self.root);
    }

    /// Iterate over every renderable
    pub fn renderables(&self) -> impl Iterator<Item = (ObjectKey, &RenderableObject)> {
        self.objects.iter().filter_map(|(k, o)| o.as_renderable().map(|r| (k, r)))
    }

    /// Iterate mutably over every renderable
    pub fn renderables_mut(&mut self) -> impl Iterator<Item = (ObjectKey, &mut RenderableObject)> {
        self.objects.iter_mut().filter_map(|(k, o)| match &mut o.kind {
            ObjectKind::Renderable(r) => Some((k, r)),
            ObjectKind::Group { .. } => None,
        })
    }

    /// Renderables whose own visibility allows drawing
    pub fn visible_renderables(&self) -> impl Iterator<Item = (ObjectKey, &RenderableObject)> {
        self.renderables().filter(|(_, r)| r.is_visible())
    }

    /// Bounds of visible geometry including animated offsets
    ///
    /// With `ignore_depth` the z extent collapses to the center plane, for
    /// fitting flat scenes.
    pub fn bounds(&self, ignore_depth: bool) -> Option<AABB> {
        let points: Vec<Vec3> = self
            .visible_renderables()
            .flat_map(|(_, r)| {
                let offset = r.animated.offset;
                r.primitive.extent_points().into_iter().map(move |p| p + offset)
            })
            .collect();
        let mut aabb = AABB::from_points(&points)?;
        if ignore_depth {
            let z = aabb.center().z;
            aabb.min.z = z;
            aabb.max.z = z;
        }
        Some(aabb)
    }
}
