//! Scene module
//!
//! Declarative documents, the geometry they expand into, and the arena +
//! registry pair that holds the live scene.

mod assembler;
mod document;
mod geometry;
mod mesh;
mod registry;
mod renderable_object;
mod scene_graph;

pub use assembler::{BuildStats, BuiltGraph, SceneAssembler};
pub use document::{parse_document, DocumentError, NodeKind, SceneNode};
pub use geometry::{BuiltPrimitive, GeometryBuilder, GeometryError, LeafGeometry};
pub use mesh::TriangleMesh;
pub use registry::{LogicalObject, ObjectRegistry, RegistryError};
pub use renderable_object::{AnimatedState, Primitive, RenderableObject};
pub use scene_graph::{ObjectKind, SceneGraph, SceneObject, AABB};
