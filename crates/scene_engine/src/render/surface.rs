//! Mount surfaces
//!
//! The host surface a Scene Engine draws into. It reports its size and
//! pixel density, accepts finished frames, and can report context loss.

use std::cell::RefCell;
use std::rc::Rc;

use super::backend::{BackendResult, Frame, RenderError};

/// Host surface a Scene Engine instance is bound to
pub trait MountSurface {
    /// Size in CSS pixels
    fn size(&self) -> (u32, u32);

    /// Device pixels per CSS pixel
    fn pixel_ratio(&self) -> f32;

    /// Whether the drawing context is gone for good
    fn is_context_lost(&self) -> bool;

    /// Show a finished frame
    fn present(&mut self, frame: Frame) -> BackendResult<()>;

    /// Release host resources; no more frames will arrive
    fn release(&mut self) {}
}

#[derive(Debug)]
struct OffscreenState {
    width: u32,
    height: u32,
    pixel_ratio: f32,
    context_lost: bool,
    released: bool,
    presented: u64,
    last_frame: Option<Frame>,
}

/// In-memory surface for headless rendering and tests
///
/// Clones share state, so a caller can keep a handle after giving one to an
/// engine and inspect what was presented.
#[derive(Debug, Clone)]
pub struct OffscreenSurface {
    state: Rc<RefCell<OffscreenState>>,
}

impl OffscreenSurface {
    /// Create a surface of `width`×`height` CSS pixels at density 1
    pub fn new(width: u32, height: u32) -> Self {
        Self {
            state: Rc::new(RefCell::new(OffscreenState {
                width,
                height,
                pixel_ratio: 1.0,
                context_lost: false,
                released: false,
                presented: 0,
                last_frame: None,
            })),
        }
    }

    /// Set the device pixel ratio
    #[must_use]
    pub fn with_pixel_ratio(self, pixel_ratio: f32) -> Self {
        self.state.borrow_mut().pixel_ratio = pixel_ratio;
        self
    }

    /// Change the CSS size (simulates a layout change)
    pub fn resize(&self, width: u32, height: u32) {
        let mut state = self.state.borrow_mut();
        state.width = width;
        state.height = height;
    }

    /// Simulate losing the drawing context
    pub fn lose_context(&self) {
        self.state.borrow_mut().context_lost = true;
    }

    /// Number of frames presented so far
    pub fn present_count(&self) -> u64 {
        self.state.borrow().presented
    }

    /// Most recently presented frame
    pub fn last_frame(&self) -> Option<Frame> {
        self.state.borrow().last_frame.clone()
    }

    /// Whether the owning engine released the surface
    pub fn is_released(&self) -> bool {
        self.state.borrow().released
    }
}

impl MountSurface for OffscreenSurface {
    fn size(&self) -> (u32, u32) {
        let state = self.state.borrow();
        (state.width, state.height)
    }

    fn pixel_ratio(&self) -> f32 {
        self.state.borrow().pixel_ratio
    }

    fn is_context_lost(&self) -> bool {
        self.state.borrow().context_lost
    }

    fn present(&mut self, frame: Frame) -> BackendResult<()> {
        let mut state = self.state.borrow_mut();
        if state.context_lost {
            return Err(RenderError::ContextLost);
        }
        state.presented += 1;
        state.last_frame = Some(frame);
        Ok(())
    }

    fn release(&mut self) {
        let mut state = self.state.borrow_mut();
        state.released = true;
        state.last_frame = None;
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use image::RgbaImage;

    #[test]
    fn test_clones_share_state() {
        let surface = OffscreenSurface::new(10, 20).with_pixel_ratio(2.0);
        let mut handle: Box<dyn MountSurface> = Box::new(surface.clone());
        handle.present(Frame::Raster(RgbaImage::new(1, 1))).unwrap();
        assert_eq!(surface.present_count(), 1);
        surface.resize(30, 40);
        assert_eq!(handle.size(), (30, 40));
        assert_eq!(handle.pixel_ratio(), 2.0);
    }

    #[test]
    fn test_lost_context_rejects_frames() {
        let surface = OffscreenSurface::new(10, 10);
        let mut handle = surface.clone();
        surface.lose_context();
        assert!(handle.is_context_lost());
        assert!(matches!(handle.present(Frame::Vector(String::new())), Err(RenderError::ContextLost)));
    }
}
