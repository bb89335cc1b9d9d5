//! # Scene Engine
//!
//! Renders declarative 3D scenes (crystal structures, molecules, vector
//! fields) described as JSON documents.
//!
//! ## Features
//!
//! - **Scene graph**: arena-backed graph built from nested document nodes,
//!   with a registry mapping names and generated ids to objects
//! - **Picking**: ray casts against clickable objects, resolved to the node
//!   that declared them, with selection/hover outlines
//! - **Camera sync**: several engines mirror each other's camera through a
//!   shared bus without feedback loops
//! - **Animation**: keyframed offsets and opacity, played or scrubbed
//! - **Export**: PNG data URLs and base64 COLLADA documents
//!
//! ## Quick Start
//!
//! ```rust,no_run
//! use scene_engine::prelude::*;
//!
//! fn main() -> Result<(), EngineError> {
//!     let bus = CameraSyncBus::new();
//!     let surface = OffscreenSurface::new(400, 300);
//!     let document = serde_json::json!({
//!         "name": "root",
//!         "contents": [{"name": "a", "type": "spheres", "positions": [[0, 0, 0]], "radius": 1}]
//!     });
//!     let options = EngineOptions { document: Some(document), ..EngineOptions::default() };
//!     let mut engine = SceneEngine::create(options, Box::new(surface), &bus)?;
//!     engine.start_render_loop()?;
//!     engine.frame(1.0 / 60.0)?;
//!     let png = engine.request_export("raster-image")?;
//!     println!("{}", &png.data[..32]);
//!     Ok(())
//! }
//! ```

#![warn(missing_docs)]
#![warn(clippy::all, clippy::pedantic, clippy::nursery)]
#![allow(clippy::module_name_repetitions, clippy::similar_names, clippy::too_many_arguments)]

pub mod foundation;
pub mod config;
pub mod scene;
pub mod animation;
pub mod picking;
pub mod render;
pub mod sync;
pub mod export;
pub mod events;

mod engine;

pub use engine::{
    DragMode, EngineError, EngineOptions, EngineResult, FrameOutcome, RebuildOutcome, SceneEngine, DEFAULT_ROOM,
};

#[cfg(test)]
mod tests;

/// Common imports for engine users
pub mod prelude {
    pub use crate::{
        DragMode, EngineError, EngineOptions, FrameOutcome, RebuildOutcome, SceneEngine,
        animation::AnimationMode,
        config::{Config, SceneSettings},
        events::{Event, EventType},
        export::{ExportFormat, ExportResponse},
        foundation::{collections::ComponentId, math::Vec3},
        picking::PickResult,
        render::{MountSurface, OffscreenSurface},
        scene::SceneNode,
        sync::{CameraState, CameraSyncBus},
    };
}
