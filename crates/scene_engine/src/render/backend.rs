//! Backend abstraction for the rendering system
//!
//! A back end turns the live scene graph plus a camera into a [`Frame`].
//! Two implementations exist: a CPU ray caster producing RGBA images and a
//! vector back end producing SVG documents.

use std::collections::HashMap;

use image::RgbaImage;

use crate::config::{RendererKind, SceneSettings};
use crate::foundation::collections::ObjectKey;
use crate::picking::Highlight;
use crate::scene::SceneGraph;
use super::camera::Camera;
use super::inset::InsetRenderer;

/// Largest frame a back end will allocate, in pixels
pub const MAX_FRAME_PIXELS: u64 = 64 * 1024 * 1024;

/// Result type for backend operations
pub type BackendResult<T> = Result<T, RenderError>;

/// Rendering errors
#[derive(Debug, thiserror::Error)]
pub enum RenderError {
    /// The mount surface lost its drawing context
    #[error("Rendering context lost")]
    ContextLost,

    /// The requested frame is too large to allocate
    #[error("Out of memory allocating a {width}x{height} frame")]
    OutOfMemory {
        /// Width in device pixels
        width: u32,
        /// Height in device pixels
        height: u32,
    },

    /// The viewport has zero area
    #[error("Viewport has zero area")]
    EmptyViewport,

    /// Image encoding failed
    #[error("Image error: {0}")]
    Image(#[from] image::ImageError),
}

impl RenderError {
    /// Conditions that end the engine instance
    pub const fn is_fatal(&self) -> bool {
        matches!(self, Self::ContextLost | Self::OutOfMemory { .. })
    }
}

/// One rendered frame
#[derive(Debug, Clone, PartialEq)]
pub enum Frame {
    /// RGBA pixels (device resolution)
    Raster(RgbaImage),
    /// SVG document
    Vector(String),
}

impl Frame {
    /// Pixel buffer of a raster frame
    pub const fn as_raster(&self) -> Option<&RgbaImage> {
        match self {
            Self::Raster(image) => Some(image),
            Self::Vector(_) => None,
        }
    }

    /// Markup of a vector frame
    pub fn as_vector(&self) -> Option<&str> {
        match self {
            Self::Vector(svg) => Some(svg),
            Self::Raster(_) => None,
        }
    }
}

/// Everything a back end reads to draw a frame
#[derive(Clone, Copy)]
pub struct RenderView<'a> {
    /// Scene to draw
    pub graph: &'a SceneGraph,
    /// Main camera
    pub camera: &'a Camera,
    /// Frame size in device pixels
    pub size: (u32, u32),
    /// Device pixels per CSS pixel
    pub pixel_ratio: f32,
    /// Appearance settings
    pub settings: &'a SceneSettings,
    /// Outlined renderables
    pub highlights: &'a HashMap<ObjectKey, Highlight>,
    /// Orientation inset drawn after the main pass
    pub inset: Option<&'a InsetRenderer>,
}

impl RenderView<'_> {
    /// Reject frames that are empty or too large to allocate
    pub fn check_size(&self) -> BackendResult<()> {
        let (width, height) = self.size;
        if width == 0 || height == 0 {
            return Err(RenderError::EmptyViewport);
        }
        if u64::from(width) * u64::from(height) > MAX_FRAME_PIXELS {
            return Err(RenderError::OutOfMemory { width, height });
        }
        Ok(())
    }

    /// World units per CSS pixel at this frame size
    pub fn css_pixel_world_size(&self) -> f32 {
        self.camera.pixel_world_size(self.size.1) * self.pixel_ratio
    }
}

/// Main rendering backend trait
pub trait RenderBackend {
    /// Short name for logs
    fn name(&self) -> &'static str;

    /// Draw one frame
    fn render(&mut self, view: &RenderView<'_>) -> BackendResult<Frame>;
}

/// Back end for a renderer selection
pub fn create_backend(kind: RendererKind) -> Box<dyn RenderBackend> {
    match kind {
        RendererKind::Webgl => Box::new(super::raster::RasterBackend::new()),
        RendererKind::Svg => Box::new(super::vector::VectorBackend::new()),
    }
}
