//! Label text for the raster back end
//!
//! Glyphs are rasterized with `fontdue` from the bundled DejaVu Sans face
//! and blended straight into the frame, centered on each label anchor.

use std::sync::OnceLock;

use fontdue::{Font, FontSettings};
use image::{Rgba, RgbaImage};

use crate::foundation::color::Color;
use crate::scene::{Primitive, SceneGraph};
use super::camera::Camera;

static DEFAULT_FONT_DATA: &[u8] = include_bytes!("../../assets/fonts/DejaVuSans.ttf");

/// Bundled label face, parsed on first use
fn default_font() -> Option<&'static Font> {
    static FONT: OnceLock<Option<Font>> = OnceLock::new();
    FONT.get_or_init(|| match Font::from_bytes(DEFAULT_FONT_DATA, FontSettings::default()) {
        Ok(font) => Some(font),
        Err(e) => {
            log::error!("Failed to load label font: {}", e);
            None
        }
    })
    .as_ref()
}

/// Draw every visible label of `graph` over `image`
///
/// `font_px` is the glyph size in device pixels. Labels sit on top of the
/// shaded geometry regardless of depth.
pub(crate) fn draw_labels(image: &mut RgbaImage, graph: &SceneGraph, camera: &Camera, font_px: f32) -> usize {
    let Some(font) = default_font() else {
        return 0;
    };
    let (width, height) = image.dimensions();
    let mut drawn = 0;
    for (_, object) in graph.visible_renderables() {
        let Primitive::Label { position, text } = &object.primitive else {
            continue;
        };
        let opacity = object.effective_opacity();
        if opacity <= 0.0 || text.is_empty() {
            continue;
        }
        let (x, y, _) = camera.world_to_screen(&(position + object.animated.offset), width, height);
        draw_text(image, font, text, (x, y), font_px, object.color, opacity);
        drawn += 1;
    }
    drawn
}

fn draw_text(image: &mut RgbaImage, font: &Font, text: &str, center: (f32, f32), font_px: f32, color: Color, opacity: f32) {
    let advance: f32 = text.chars().map(|ch| font.metrics(ch, font_px).advance_width).sum();
    let mut pen_x = center.0 - advance * 0.5;
    // roughly half the cap height below the anchor
    let baseline = center.1 + font_px * 0.35;

    for ch in text.chars() {
        let (metrics, coverage) = font.rasterize(ch, font_px);
        let left = (pen_x + metrics.xmin as f32).round() as i64;
        let top = (baseline - (metrics.ymin + metrics.height as i32) as f32).round() as i64;
        for row in 0..metrics.height {
            for col in 0..metrics.width {
                let alpha = f32::from(coverage[row * metrics.width + col]) / 255.0 * opacity;
                if alpha <= 0.0 {
                    continue;
                }
                let (px, py) = (left + col as i64, top + row as i64);
                if px < 0 || py < 0 || px >= i64::from(image.width()) || py >= i64::from(image.height()) {
                    continue;
                }
                let pixel = image.get_pixel_mut(px as u32, py as u32);
                *pixel = blend(*pixel, color, alpha);
            }
        }
        pen_x += metrics.advance_width;
    }
}

/// Straight-alpha source over
fn blend(dst: Rgba<u8>, color: Color, alpha: f32) -> Rgba<u8> {
    let dst_a = f32::from(dst[3]) / 255.0;
    let out_a = alpha + dst_a * (1.0 - alpha);
    if out_a <= 0.0 {
        return Rgba([0, 0, 0, 0]);
    }
    let mix = |src: f32, d: u8| {
        let v = (src * alpha + f32::from(d) / 255.0 * dst_a * (1.0 - alpha)) / out_a;
        (v.clamp(0.0, 1.0) * 255.0).round() as u8
    };
    Rgba([mix(color.r, dst[0]), mix(color.g, dst[1]), mix(color.b, dst[2]), (out_a * 255.0).round() as u8])
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::foundation::collections::GeneratedId;
    use crate::foundation::math::Vec3;
    use crate::scene::RenderableObject;

    fn label_graph(text: &str, visible: bool) -> SceneGraph {
        let mut graph = SceneGraph::new(None);
        let root = graph.root();
        let label = Primitive::Label { position: Vec3::zeros(), text: text.into() };
        graph.insert_renderable(root, RenderableObject::new(GeneratedId(0), label, Color::BLACK, 1.0, visible));
        graph
    }

    fn dark_pixels(image: &RgbaImage) -> usize {
        image.pixels().filter(|p| p[0] < 128).count()
    }

    #[test]
    fn test_bundled_font_loads() {
        assert!(default_font().is_some());
    }

    #[test]
    fn test_label_is_drawn_around_its_anchor() {
        let camera = Camera::orthographic(Vec3::new(0.0, 0.0, 10.0), 4.0, 1.0);
        let mut image = RgbaImage::from_pixel(60, 60, Rgba([255, 255, 255, 255]));
        let drawn = draw_labels(&mut image, &label_graph("WW", true), &camera, 16.0);
        assert_eq!(drawn, 1);
        assert!(dark_pixels(&image) > 20, "only {} dark pixels", dark_pixels(&image));
        // ink stays near the middle of the frame
        assert_eq!(*image.get_pixel(0, 0), Rgba([255, 255, 255, 255]));
        assert_eq!(*image.get_pixel(59, 59), Rgba([255, 255, 255, 255]));
    }

    #[test]
    fn test_hidden_label_is_skipped() {
        let camera = Camera::orthographic(Vec3::new(0.0, 0.0, 10.0), 4.0, 1.0);
        let mut image = RgbaImage::from_pixel(60, 60, Rgba([255, 255, 255, 255]));
        assert_eq!(draw_labels(&mut image, &label_graph("WW", false), &camera, 16.0), 0);
        assert_eq!(dark_pixels(&image), 0);
    }

    #[test]
    fn test_blend_onto_transparent_keeps_source_color() {
        let out = blend(Rgba([0, 0, 0, 0]), Color::RED, 0.5);
        assert_eq!(out, Rgba([255, 0, 0, 128]));
    }
}
