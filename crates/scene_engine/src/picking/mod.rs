//! Picking
//!
//! Ray intersection primitives, world-space shapes for scene primitives, and
//! the selection/hover state machine driven by pointer events.

pub mod primitives;
pub mod shape;
mod picking_system;

pub use picking_system::{CastParams, Highlight, PickResult, PickingSystem, SelectionMode};
pub use primitives::{BoundingSphere, Ray, RayHit};
pub use shape::WorldShape;
