//! Orientation inset
//!
//! A small square viewport in one corner of the frame showing an axis gizmo
//! from the main camera's orientation. The gizmo lives in its own graph, so
//! it never shows up in picking, bounds or exports.

use image::RgbaImage;

use crate::config::{InsetCorner, InsetSettings, SceneSettings};
use crate::foundation::math::Vec3;
use crate::scene::{SceneAssembler, SceneGraph, SceneNode, AABB};
use super::camera::Camera;
use super::raster;

/// Axis gizmo graph plus placement settings
#[derive(Debug)]
pub struct InsetRenderer {
    settings: InsetSettings,
    graph: SceneGraph,
    bounds: Option<AABB>,
}

/// Square region of the frame, in device pixels
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct InsetRect {
    /// Left edge
    pub x: u32,
    /// Top edge
    pub y: u32,
    /// Edge length
    pub size: u32,
}

impl InsetRenderer {
    /// Build the inset from an extracted axis node, or the default red/green/blue axes
    pub fn new(settings: &SceneSettings, axis: Option<&SceneNode>) -> Self {
        let gizmo = axis.cloned().unwrap_or_else(default_gizmo);
        let document = SceneNode::group("inset", vec![gizmo]);
        let built = SceneAssembler::new().build(&document, settings);
        let bounds = built.graph.bounds(false);
        Self {
            settings: settings.inset.clone(),
            graph: built.graph,
            bounds,
        }
    }

    /// Gizmo graph
    pub const fn graph(&self) -> &SceneGraph {
        &self.graph
    }

    /// Where the inset goes in a `width`×`height` frame, `None` if it doesn't fit
    pub fn rect(&self, width: u32, height: u32, pixel_ratio: f32) -> Option<InsetRect> {
        if !self.settings.enabled {
            return None;
        }
        let scale = |v: u32| (v as f32 * pixel_ratio).round() as u32;
        let (size, padding) = (scale(self.settings.size), scale(self.settings.padding));
        if size == 0 || size + 2 * padding > width.min(height) {
            return None;
        }
        let (left, top) = (padding, padding);
        let (right, bottom) = (width - padding - size, height - padding - size);
        let (x, y) = match self.settings.corner {
            InsetCorner::TopLeft => (left, top),
            InsetCorner::TopRight => (right, top),
            InsetCorner::BottomLeft => (left, bottom),
            InsetCorner::BottomRight => (right, bottom),
        };
        Some(InsetRect { x, y, size })
    }

    /// Camera sharing the main orientation at a fixed distance from the gizmo
    pub fn camera(&self, main: &Camera) -> Camera {
        let (center, radius) = self
            .bounds
            .map_or((Vec3::zeros(), 1.0), |b| (b.center(), b.bounding_radius().max(0.1)));
        let mut camera = Camera::orthographic(Vec3::zeros(), radius * 2.2, 1.0);
        camera.orientation = main.orientation;
        camera.position = center - camera.forward() * (radius * 3.0);
        camera.far = radius * 6.0;
        camera
    }

    /// Draw the gizmo over the corner of `image`
    pub fn render_into(&self, image: &mut RgbaImage, main: &Camera, pixel_ratio: f32, settings: &SceneSettings) {
        let Some(rect) = self.rect(image.width(), image.height(), pixel_ratio) else {
            return;
        };
        let camera = self.camera(main);
        let items = raster::prepare_items(&self.graph, camera.pixel_world_size(rect.size) * pixel_ratio, settings.cylinder_segments);
        let pass = raster::ray_cast_pass(&items, &camera, rect.size, rect.size, &[0.0; 4], settings.antialias);
        image::imageops::overlay(image, &pass.image, i64::from(rect.x), i64::from(rect.y));
    }
}

/// Unit arrows along +x (red), +y (green) and +z (blue)
pub fn default_gizmo() -> SceneNode {
    let arrow = |name: &str, tip: [f32; 3], color: &str| SceneNode {
        name: Some(name.to_string()),
        kind: Some("arrows".to_string()),
        position_pairs: Some(vec![[[0.0, 0.0, 0.0], tip]]),
        color: Some(color.to_string()),
        radius: Some(0.06),
        head_length: Some(0.3),
        head_width: Some(0.14),
        ..SceneNode::default()
    };
    SceneNode::group(
        "axes",
        vec![
            arrow("x", [1.0, 0.0, 0.0], "#ff0000"),
            arrow("y", [0.0, 1.0, 0.0], "#00ff00"),
            arrow("z", [0.0, 0.0, 1.0], "#0000ff"),
        ],
    )
}

#[cfg(test)]
mod tests {
    use super::*;
    use image::Rgba;

    #[test]
    fn test_default_gizmo_has_three_arrows() {
        let inset = InsetRenderer::new(&SceneSettings::default(), None);
        assert_eq!(inset.graph().renderables().count(), 3);
    }

    #[test]
    fn test_rect_placement_and_fit() {
        let inset = InsetRenderer::new(&SceneSettings::default(), None);
        assert_eq!(inset.rect(400, 300, 1.0), Some(InsetRect { x: 20, y: 150, size: 130 }));
        assert_eq!(inset.rect(100, 100, 1.0), None);

        let mut settings = SceneSettings::default();
        settings.inset.corner = InsetCorner::TopRight;
        let inset = InsetRenderer::new(&settings, None);
        assert_eq!(inset.rect(400, 300, 2.0), None);
        assert_eq!(inset.rect(800, 600, 2.0), Some(InsetRect { x: 800 - 40 - 260, y: 40, size: 260 }));
    }

    #[test]
    fn test_render_into_draws_only_inside_rect() {
        let settings = SceneSettings::default();
        let inset = InsetRenderer::new(&settings, None);
        let white = Rgba([255, 255, 255, 255]);
        let mut image = RgbaImage::from_pixel(300, 300, white);
        inset.render_into(&mut image, &Camera::default(), 1.0, &settings);
        let rect = inset.rect(300, 300, 1.0).unwrap();
        let changed_inside = (rect.y..rect.y + rect.size)
            .flat_map(|y| (rect.x..rect.x + rect.size).map(move |x| (x, y)))
            .any(|(x, y)| *image.get_pixel(x, y) != white);
        assert!(changed_inside);
        assert_eq!(*image.get_pixel(0, 0), white);
        assert_eq!(*image.get_pixel(299, 0), white);
    }
}
