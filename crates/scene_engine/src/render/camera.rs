//! # Orthographic Camera
//!
//! Camera math for the scene viewer: matrices, screen/world conversion and
//! the pose that is published to other viewers.
//!
//! ## Design Principles
//! - **Backend-agnostic**: No rendering back end types in camera math
//! - **Orthographic**: Crystal structures are viewed without perspective so
//!   lattice planes stay parallel
//! - **Pose-based**: Position, orientation and zoom fully describe the view

use crate::foundation::math::{Mat4, Point3, Quat, Vec3};
use crate::picking::Ray;

/// The three values that describe a camera and travel between viewers
#[derive(Debug, Clone, Copy, PartialEq)]
pub struct CameraPose {
    /// Camera position in world space
    pub position: Vec3,
    /// Rotation from the canonical view (looking down -Z with +Y up)
    pub orientation: Quat,
    /// Magnification, 1.0 shows `view_height` world units vertically
    pub zoom: f32,
}

/// Orthographic camera
///
/// # Coordinate System
/// Right-handed, Y-up. With identity orientation the camera looks down -Z:
/// - X+ = Right
/// - Y+ = Up
/// - Z+ = Towards the viewer
///
/// # Screen Convention
/// Screen coordinates are in pixels from the top-left corner; NDC y points up.
#[derive(Debug, Clone, PartialEq)]
pub struct Camera {
    /// Camera position in world space
    pub position: Vec3,

    /// Camera orientation
    pub orientation: Quat,

    /// Zoom factor (must be positive)
    pub zoom: f32,

    /// World-space height of the view at zoom 1
    pub view_height: f32,

    /// Aspect ratio (width / height) for projection calculations
    pub aspect: f32,

    /// Distance to near clipping plane
    pub near: f32,

    /// Distance to far clipping plane
    pub far: f32,
}

impl Camera {
    /// Create an orthographic camera looking down -Z from `position`
    ///
    /// # Arguments
    /// * `position` - Camera position in world space
    /// * `view_height` - World units visible vertically at zoom 1
    /// * `aspect` - Aspect ratio (width / height) of the viewport
    pub fn orthographic(position: Vec3, view_height: f32, aspect: f32) -> Self {
        Self {
            position,
            orientation: Quat::identity(),
            zoom: 1.0,
            view_height,
            aspect,
            near: 0.0,
            far: 1000.0,
        }
    }

    /// Current pose
    pub fn pose(&self) -> CameraPose {
        CameraPose {
            position: self.position,
            orientation: self.orientation,
            zoom: self.zoom,
        }
    }

    /// Apply a pose; non-positive or non-finite zoom values are ignored
    pub fn set_pose(&mut self, pose: &CameraPose) {
        self.position = pose.position;
        self.orientation = pose.orientation;
        if pose.zoom.is_finite() && pose.zoom > 0.0 {
            self.zoom = pose.zoom;
        }
        log::trace!("Camera pose updated: {:?}", pose);
    }

    /// Update camera aspect ratio for viewport changes
    ///
    /// Only logs changes larger than 0.01 to keep resize storms quiet.
    pub fn set_aspect_ratio(&mut self, aspect: f32) {
        if (self.aspect - aspect).abs() > 0.01 {
            log::debug!("Camera aspect ratio changed: {:.3} -> {:.3}", self.aspect, aspect);
        }
        self.aspect = aspect;
    }

    /// Viewing direction
    pub fn forward(&self) -> Vec3 {
        self.orientation * -Vec3::z()
    }

    /// Screen-up direction
    pub fn up(&self) -> Vec3 {
        self.orientation * Vec3::y()
    }

    /// Screen-right direction
    pub fn right(&self) -> Vec3 {
        self.orientation * Vec3::x()
    }

    /// Half the visible height in world units
    pub fn half_height(&self) -> f32 {
        self.view_height / (2.0 * self.zoom)
    }

    /// Half the visible width in world units
    pub fn half_width(&self) -> f32 {
        self.half_height() * self.aspect
    }

    /// World units covered by one pixel of a viewport `height_px` tall
    pub fn pixel_world_size(&self, height_px: u32) -> f32 {
        2.0 * self.half_height() / height_px.max(1) as f32
    }

    /// Generate view matrix for world-to-camera space transformation
    pub fn view_matrix(&self) -> Mat4 {
        let eye = Point3::from(self.position);
        let target = Point3::from(self.position + self.forward());
        Mat4::look_at_rh(&eye, &target, &self.up())
    }

    /// Generate orthographic projection matrix
    pub fn projection_matrix(&self) -> Mat4 {
        let (hw, hh) = (self.half_width(), self.half_height());
        Mat4::new_orthographic(-hw, hw, -hh, hh, self.near, self.far)
    }

    /// Generate combined view-projection matrix
    pub fn view_projection_matrix(&self) -> Mat4 {
        self.projection_matrix() * self.view_matrix()
    }

    /// Convert NDC coordinates to a world-space ray
    ///
    /// # Arguments
    /// * `ndc_x` - NDC X coordinate (-1 to 1, left to right)
    /// * `ndc_y` - NDC Y coordinate (-1 to 1, bottom to top)
    ///
    /// # Returns
    /// Ray starting on the camera plane, pointing along the view direction.
    /// Orthographic rays are parallel, so only the origin depends on the
    /// screen position.
    pub fn screen_to_world_ray(&self, ndc_x: f32, ndc_y: f32) -> Ray {
        let origin = self.position
            + self.right() * (ndc_x * self.half_width())
            + self.up() * (ndc_y * self.half_height());
        Ray::new(origin, self.forward())
    }

    /// Project a world point to NDC plus its depth along the view direction
    pub fn world_to_ndc(&self, point: &Vec3) -> (f32, f32, f32) {
        let rel = point - self.position;
        (
            rel.dot(&self.right()) / self.half_width(),
            rel.dot(&self.up()) / self.half_height(),
            rel.dot(&self.forward()),
        )
    }

    /// Project a world point to pixel coordinates of a `width`×`height` viewport
    pub fn world_to_screen(&self, point: &Vec3, width: u32, height: u32) -> (f32, f32, f32) {
        let (x, y, depth) = self.world_to_ndc(point);
        let (sx, sy) = ndc_to_screen(x, y, width, height);
        (sx, sy, depth)
    }
}

/// Pixel coordinates (top-left origin) to NDC (y up)
pub fn screen_to_ndc(x: f32, y: f32, width: u32, height: u32) -> (f32, f32) {
    let (w, h) = (width.max(1) as f32, height.max(1) as f32);
    (2.0 * x / w - 1.0, 1.0 - 2.0 * y / h)
}

/// NDC (y up) to pixel coordinates (top-left origin)
pub fn ndc_to_screen(x: f32, y: f32, width: u32, height: u32) -> (f32, f32) {
    ((x + 1.0) * 0.5 * width as f32, (1.0 - y) * 0.5 * height as f32)
}

impl Default for Camera {
    /// Ten world units tall, square viewport, ten units back from the origin
    fn default() -> Self {
        Self::orthographic(Vec3::new(0.0, 0.0, 10.0), 10.0, 1.0)
    }
}
