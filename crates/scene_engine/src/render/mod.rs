//! # Rendering System
//!
//! Turns the live scene graph into frames and presents them on a mount
//! surface.
//!
//! ## Architecture
//!
//! - **Camera**: orthographic camera with pose, projection and picking rays
//! - **Controls**: orbit/pan/zoom controller that reports user-driven changes
//! - **Backends**: CPU ray caster (RGBA) and vector (SVG) implementations of
//!   [`RenderBackend`]
//! - **Outline**: screen-space highlight ring around selected/hovered objects
//! - **Inset**: corner orientation gizmo with its own scene graph
//! - **Surface**: the host-provided target frames are presented to

pub mod camera;
pub mod controls;
pub mod backend;
pub mod surface;
pub mod outline;
pub mod inset;
mod raster;
mod text;
mod vector;

pub use backend::{create_backend, BackendResult, Frame, RenderBackend, RenderError, RenderView};
pub use camera::{Camera, CameraPose};
pub use controls::{CameraController, CameraDispatch};
pub use inset::{InsetRect, InsetRenderer};
pub use raster::RasterBackend;
pub use surface::{MountSurface, OffscreenSurface};
pub use vector::VectorBackend;
