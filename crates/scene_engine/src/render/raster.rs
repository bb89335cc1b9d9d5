//! CPU ray-cast raster back end
//!
//! Casts one orthographic ray per sample against the visible renderables,
//! shades the closest hit with a headlight and writes an RGBA image. The same
//! world shapes are used for picking, so what you see is what you can click.
//! Label text is blended over the result before the outline and inset.

use image::{Rgba, RgbaImage};

use crate::foundation::collections::ObjectKey;
use crate::foundation::color::Color;
use crate::foundation::math::Vec3;
use crate::picking::{BoundingSphere, Ray, WorldShape};
use crate::scene::SceneGraph;
use super::backend::{BackendResult, Frame, RenderBackend, RenderView};
use super::camera::Camera;
use super::{outline, text};

/// Light that does not depend on the surface orientation
const AMBIENT: f32 = 0.35;
/// Headlight contribution at normal incidence
const DIFFUSE: f32 = 0.65;

/// A renderable prepared for ray casting
pub(crate) struct RasterItem {
    pub key: ObjectKey,
    shape: WorldShape,
    bound: BoundingSphere,
    color: Color,
    opacity: f32,
}

/// Pixels plus the object visible at each pixel center
pub(crate) struct RasterPass {
    pub image: RgbaImage,
    pub ids: Vec<Option<ObjectKey>>,
}

/// Build ray-cast shapes for every visible, non-transparent renderable
pub(crate) fn prepare_items(graph: &SceneGraph, css_pixel_world_size: f32, cylinder_segments: u32) -> Vec<RasterItem> {
    graph
        .visible_renderables()
        .filter(|(_, r)| r.effective_opacity() > 0.0)
        .filter_map(|(key, r)| {
            let shape = WorldShape::from_primitive(&r.primitive, &r.animated.offset, css_pixel_world_size, cylinder_segments)?;
            Some(RasterItem {
                key,
                bound: shape.bounding_sphere(),
                shape,
                color: r.color,
                opacity: r.effective_opacity(),
            })
        })
        .collect()
}

fn closest<'a>(items: &'a [RasterItem], ray: &Ray) -> Option<(&'a RasterItem, Vec3)> {
    let mut best: Option<(&RasterItem, f32, Vec3)> = None;
    for item in items {
        if item.bound.intersect_ray(ray).is_none() {
            continue;
        }
        if let Some((t, normal)) = item.shape.intersect_ray(ray) {
            if best.map_or(true, |(_, bt, _)| t < bt) {
                best = Some((item, t, normal));
            }
        }
    }
    best.map(|(item, _, normal)| (item, normal))
}

/// Headlight Lambert shading; the normal is flipped to face the viewer
pub(crate) fn shade(color: Color, normal: &Vec3, view_dir: &Vec3) -> Color {
    let facing = if normal.dot(view_dir) > 0.0 { -normal } else { *normal };
    color.scaled(AMBIENT + DIFFUSE * facing.dot(&-view_dir).max(0.0))
}

/// Premultiplied RGBA
type Premul = [f32; 4];

fn over(color: Color, alpha: f32, clear: &Premul) -> Premul {
    let keep = 1.0 - alpha;
    [
        color.r * alpha + clear[0] * keep,
        color.g * alpha + clear[1] * keep,
        color.b * alpha + clear[2] * keep,
        alpha + clear[3] * keep,
    ]
}

fn to_rgba8(p: &Premul) -> Rgba<u8> {
    if p[3] <= 0.0 {
        return Rgba([0, 0, 0, 0]);
    }
    let c = |v: f32| ((v / p[3]).clamp(0.0, 1.0) * 255.0).round() as u8;
    Rgba([c(p[0]), c(p[1]), c(p[2]), (p[3].clamp(0.0, 1.0) * 255.0).round() as u8])
}

/// Premultiplied clear color for the settings
pub(crate) fn clear_color(background: Color, transparent: bool) -> Premul {
    if transparent {
        [0.0; 4]
    } else {
        [background.r, background.g, background.b, 1.0]
    }
}

/// Ray cast `items` into a `width`×`height` image
pub(crate) fn ray_cast_pass(
    items: &[RasterItem],
    camera: &Camera,
    width: u32,
    height: u32,
    clear: &Premul,
    antialias: bool,
) -> RasterPass {
    const SUPERSAMPLE: [(f32, f32); 4] = [(0.25, 0.25), (0.75, 0.25), (0.25, 0.75), (0.75, 0.75)];

    let mut image = RgbaImage::new(width, height);
    let mut ids = vec![None; (width as usize) * (height as usize)];
    let view_dir = camera.forward();
    let sample = move |sx: f32, sy: f32| {
        let (nx, ny) = super::camera::screen_to_ndc(sx, sy, width, height);
        let ray = camera.screen_to_world_ray(nx, ny);
        closest(items, &ray)
    };
    let resolve = |hit: Option<(&RasterItem, Vec3)>| match hit {
        Some((item, normal)) => over(shade(item.color, &normal, &view_dir), item.opacity, clear),
        None => *clear,
    };

    for y in 0..height {
        for x in 0..width {
            // The center hit feeds the id buffer and, without antialiasing, the color
            let center = sample(x as f32 + 0.5, y as f32 + 0.5);
            ids[(y * width + x) as usize] = center.map(|(item, _)| item.key);
            let color = if antialias {
                let mut acc = [0.0f32; 4];
                for (ox, oy) in SUPERSAMPLE {
                    for (a, v) in acc.iter_mut().zip(resolve(sample(x as f32 + ox, y as f32 + oy))) {
                        *a += v;
                    }
                }
                acc.map(|a| a / SUPERSAMPLE.len() as f32)
            } else {
                resolve(center)
            };
            image.put_pixel(x, y, to_rgba8(&color));
        }
    }
    RasterPass { image, ids }
}

/// CPU ray caster
#[derive(Debug, Default)]
pub struct RasterBackend {
    frames: u64,
}

impl RasterBackend {
    /// Create a raster back end
    pub fn new() -> Self {
        Self::default()
    }

    /// Frames rendered so far
    pub const fn frame_count(&self) -> u64 {
        self.frames
    }
}

impl RenderBackend for RasterBackend {
    fn name(&self) -> &'static str {
        "raster"
    }

    fn render(&mut self, view: &RenderView<'_>) -> BackendResult<Frame> {
        view.check_size()?;
        let (width, height) = view.size;
        let settings = view.settings;
        let items = prepare_items(view.graph, view.css_pixel_world_size(), settings.cylinder_segments);
        let clear = clear_color(settings.background, settings.transparent_background);
        let RasterPass { mut image, ids } =
            ray_cast_pass(&items, view.camera, width, height, &clear, settings.antialias);
        text::draw_labels(&mut image, view.graph, view.camera, settings.label_font_size * view.pixel_ratio);

        if settings.outline.enabled && !view.highlights.is_empty() {
            outline::apply_outline(&mut image, &ids, view.highlights, &settings.outline);
        }
        if let Some(inset) = view.inset {
            inset.render_into(&mut image, view.camera, view.pixel_ratio, settings);
        }

        self.frames += 1;
        log::trace!("Raster frame {} ({}x{}, {} items)", self.frames, width, height, items.len());
        Ok(Frame::Raster(image))
    }
}
