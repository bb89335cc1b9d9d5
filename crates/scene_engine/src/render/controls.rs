//! Orbit camera controller
//!
//! User gestures (rotate, pan, wheel) change the camera and fire the
//! registered dispatch callback. Programmatic changes (`update_camera`,
//! `fit_to_bounds`) never dispatch, so restoring a state received from
//! elsewhere cannot echo it back.

use crate::foundation::math::{constants::EPSILON, Quat, Unit, Vec3};
use crate::picking::Ray;
use crate::scene::AABB;
use super::camera::{screen_to_ndc, Camera, CameraPose};

/// Callback fired after each user-driven camera change
pub type CameraDispatch = Box<dyn FnMut(CameraPose)>;

/// Smallest zoom the wheel can reach
pub const MIN_ZOOM: f32 = 0.05;
/// Largest zoom the wheel can reach
pub const MAX_ZOOM: f32 = 50.0;

/// Camera plus orbit controls and viewport bookkeeping
pub struct CameraController {
    camera: Camera,
    target: Vec3,
    /// CSS-pixel viewport size
    viewport: (u32, u32),
    pixel_ratio: f32,
    /// Radians per dragged pixel
    pub rotate_speed: f32,
    /// Zoom exponent per wheel unit
    pub zoom_speed: f32,
    /// Zoom clamp
    pub zoom_range: (f32, f32),
    dispatch: Option<CameraDispatch>,
}

impl std::fmt::Debug for CameraController {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("CameraController")
            .field("camera", &self.camera)
            .field("target", &self.target)
            .field("viewport", &self.viewport)
            .field("pixel_ratio", &self.pixel_ratio)
            .field("dispatch", &self.dispatch.is_some())
            .finish_non_exhaustive()
    }
}

impl CameraController {
    /// Create a controller for a viewport of `width`×`height` CSS pixels
    pub fn new(width: u32, height: u32, pixel_ratio: f32) -> Self {
        let mut camera = Camera::default();
        camera.set_aspect_ratio(width.max(1) as f32 / height.max(1) as f32);
        Self {
            camera,
            target: Vec3::zeros(),
            viewport: (width, height),
            pixel_ratio,
            rotate_speed: 0.01,
            zoom_speed: 0.001,
            zoom_range: (MIN_ZOOM, MAX_ZOOM),
            dispatch: None,
        }
    }

    /// The controlled camera
    pub const fn camera(&self) -> &Camera {
        &self.camera
    }

    /// Orbit pivot
    pub const fn target(&self) -> Vec3 {
        self.target
    }

    /// Current pose
    pub fn pose(&self) -> CameraPose {
        self.camera.pose()
    }

    /// Viewport size in CSS pixels
    pub const fn viewport(&self) -> (u32, u32) {
        self.viewport
    }

    /// Device pixels per CSS pixel
    pub const fn pixel_ratio(&self) -> f32 {
        self.pixel_ratio
    }

    /// Viewport size in device pixels at `pixel_ratio`
    pub fn device_size(&self, pixel_ratio: f32) -> (u32, u32) {
        let scale = |v: u32| ((v as f32 * pixel_ratio).round() as u32).max(1);
        (scale(self.viewport.0), scale(self.viewport.1))
    }

    /// World units per CSS pixel
    pub fn pixel_world_size(&self) -> f32 {
        self.camera.pixel_world_size(self.viewport.1)
    }

    /// Register the callback fired on user-driven changes
    pub fn set_dispatch(&mut self, dispatch: CameraDispatch) {
        self.dispatch = Some(dispatch);
    }

    /// Drop the dispatch callback
    pub fn clear_dispatch(&mut self) {
        self.dispatch = None;
    }

    fn dispatch(&mut self) {
        let pose = self.camera.pose();
        if let Some(dispatch) = self.dispatch.as_mut() {
            dispatch(pose);
        }
    }

    /// Programmatic update; keeps the orbit distance and never dispatches
    pub fn update_camera(&mut self, pose: &CameraPose) {
        let distance = (self.target - self.camera.position).norm().max(EPSILON);
        self.camera.set_pose(pose);
        self.target = self.camera.position + self.camera.forward() * distance;
    }

    /// Recompute projection parameters for a new display size
    ///
    /// Returns whether anything changed; calling it with the same size is a
    /// cheap no-op.
    pub fn resize_renderer_to_display_size(&mut self, width: u32, height: u32, pixel_ratio: f32) -> bool {
        if (width, height) == self.viewport && (pixel_ratio - self.pixel_ratio).abs() < f32::EPSILON {
            return false;
        }
        self.viewport = (width, height);
        self.pixel_ratio = pixel_ratio;
        self.camera.set_aspect_ratio(width.max(1) as f32 / height.max(1) as f32);
        true
    }

    /// Temporarily change the device pixel ratio (raster export)
    pub fn set_pixel_ratio(&mut self, pixel_ratio: f32) {
        self.pixel_ratio = pixel_ratio;
    }

    /// Ray through a CSS-pixel position
    pub fn ray_at(&self, x: f32, y: f32) -> Ray {
        let (nx, ny) = screen_to_ndc(x, y, self.viewport.0, self.viewport.1);
        self.camera.screen_to_world_ray(nx, ny)
    }

    /// Orbit around the target by a drag of `(dx, dy)` pixels (user-driven)
    pub fn rotate(&mut self, dx: f32, dy: f32) {
        if dx == 0.0 && dy == 0.0 {
            return;
        }
        let up = Unit::new_normalize(self.camera.up());
        let right = Unit::new_normalize(self.camera.right());
        let rotation = Quat::from_axis_angle(&up, -dx * self.rotate_speed)
            * Quat::from_axis_angle(&right, -dy * self.rotate_speed);
        self.camera.position = self.target + rotation * (self.camera.position - self.target);
        self.camera.orientation = rotation * self.camera.orientation;
        self.dispatch();
    }

    /// Translate camera and target by a drag of `(dx, dy)` pixels (user-driven)
    pub fn pan(&mut self, dx: f32, dy: f32) {
        if dx == 0.0 && dy == 0.0 {
            return;
        }
        let scale = self.pixel_world_size();
        let shift = (self.camera.right() * -dx + self.camera.up() * dy) * scale;
        self.camera.position += shift;
        self.target += shift;
        self.dispatch();
    }

    /// Zoom by a wheel delta, positive zooming out (user-driven)
    pub fn wheel(&mut self, delta: f32) {
        let (lo, hi) = self.zoom_range;
        let zoom = (self.camera.zoom * (-delta * self.zoom_speed).exp()).clamp(lo, hi);
        if (zoom - self.camera.zoom).abs() > f32::EPSILON {
            self.camera.zoom = zoom;
            self.dispatch();
        }
    }

    /// Center on `bounds` and size the view to contain it (programmatic)
    ///
    /// With `ignore_depth` only the x/y extents are used, which suits flat
    /// scenes. The orientation is kept.
    pub fn fit_to_bounds(&mut self, bounds: &AABB, ignore_depth: bool, zoom: f32) {
        let extents = bounds.extents();
        let radius = if ignore_depth {
            extents.x.hypot(extents.y)
        } else {
            extents.norm()
        }
        .max(0.5);
        let center = bounds.center();
        let aspect = self.camera.aspect.max(EPSILON);
        self.camera.view_height = 2.0 * radius / aspect.min(1.0);
        self.camera.far = radius * 4.0 + 10.0;
        self.camera.position = center - self.camera.forward() * (radius * 2.0 + 1.0);
        if zoom.is_finite() && zoom > 0.0 {
            self.camera.zoom = zoom;
        }
        self.target = center;
        log::debug!("Camera fitted to bounds center={:?} radius={:.3}", center, radius);
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use approx::assert_relative_eq;
    use std::cell::RefCell;
    use std::rc::Rc;

    fn recording(controller: &mut CameraController) -> Rc<RefCell<Vec<CameraPose>>> {
        let log = Rc::new(RefCell::new(Vec::new()));
        let sink = Rc::clone(&log);
        controller.set_dispatch(Box::new(move |pose| sink.borrow_mut().push(pose)));
        log
    }

    #[test]
    fn test_user_gestures_dispatch() {
        let mut controller = CameraController::new(100, 100, 1.0);
        let log = recording(&mut controller);
        controller.rotate(10.0, 0.0);
        controller.pan(5.0, 5.0);
        controller.wheel(-100.0);
        assert_eq!(log.borrow().len(), 3);
        assert_eq!(log.borrow().last().copied(), Some(controller.pose()));
    }

    #[test]
    fn test_programmatic_updates_do_not_dispatch() {
        let mut controller = CameraController::new(100, 100, 1.0);
        let log = recording(&mut controller);
        let mut pose = controller.pose();
        pose.zoom = 3.0;
        controller.update_camera(&pose);
        controller.fit_to_bounds(&AABB::new(Vec3::repeat(-1.0), Vec3::repeat(1.0)), false, 1.0);
        assert!(log.borrow().is_empty());
    }

    #[test]
    fn test_rotate_keeps_orbit_distance() {
        let mut controller = CameraController::new(100, 100, 1.0);
        let before = (controller.camera().position - controller.target()).norm();
        controller.rotate(40.0, -25.0);
        let after = (controller.camera().position - controller.target()).norm();
        assert_relative_eq!(before, after, epsilon = 1e-4);
        // still looking at the target
        let to_target = (controller.target() - controller.camera().position).normalize();
        assert_relative_eq!(to_target, controller.camera().forward(), epsilon = 1e-4);
    }

    #[test]
    fn test_wheel_zoom_is_clamped() {
        let mut controller = CameraController::new(100, 100, 1.0);
        controller.wheel(-1.0e6);
        assert_relative_eq!(controller.camera().zoom, MAX_ZOOM);
        controller.wheel(1.0e6);
        assert_relative_eq!(controller.camera().zoom, MIN_ZOOM);
    }

    #[test]
    fn test_resize_is_idempotent() {
        let mut controller = CameraController::new(100, 100, 1.0);
        assert!(controller.resize_renderer_to_display_size(200, 100, 1.0));
        assert!(!controller.resize_renderer_to_display_size(200, 100, 1.0));
        assert_relative_eq!(controller.camera().aspect, 2.0);
    }

    #[test]
    fn test_fit_centers_bounds() {
        let mut controller = CameraController::new(100, 100, 1.0);
        let bounds = AABB::new(Vec3::new(4.0, -1.0, -1.0), Vec3::new(6.0, 1.0, 1.0));
        controller.fit_to_bounds(&bounds, false, 1.0);
        let ray = controller.ray_at(50.0, 50.0);
        assert_relative_eq!(ray.origin.x, 5.0, epsilon = 1e-5);
        assert_relative_eq!(ray.origin.y, 0.0, epsilon = 1e-5);
        assert!(ray.origin.z > 1.0);
    }
}
