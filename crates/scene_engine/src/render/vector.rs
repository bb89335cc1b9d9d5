//! Vector back end
//!
//! Projects tessellated primitives through the camera and writes an SVG
//! document, drawing far elements first (painter's algorithm). Strokes keep
//! their pixel width and labels become `<text>` elements.

use std::fmt::Write as _;

use crate::foundation::color::Color;
use crate::foundation::math::Vec3;
use crate::scene::{Primitive, RenderableObject, TriangleMesh};
use super::backend::{BackendResult, Frame, RenderBackend, RenderView};
use super::camera::Camera;
use super::raster::shade;

enum Element {
    Polygon { points: [(f32, f32); 3], color: Color, opacity: f32 },
    Line { from: (f32, f32), to: (f32, f32), color: Color, opacity: f32, width: f32 },
    Text { at: (f32, f32), text: String, color: Color, opacity: f32 },
}

struct Projector<'a> {
    camera: &'a Camera,
    width: u32,
    height: u32,
}

impl Projector<'_> {
    fn project(&self, p: &Vec3) -> ((f32, f32), f32) {
        let (x, y, depth) = self.camera.world_to_screen(p, self.width, self.height);
        ((x, y), depth)
    }
}

fn escape(text: &str) -> String {
    text.replace('&', "&amp;").replace('<', "&lt;").replace('>', "&gt;").replace('"', "&quot;")
}

fn collect(object: &RenderableObject, projector: &Projector<'_>, view: &RenderView<'_>, out: &mut Vec<(f32, Element)>) {
    let offset = object.animated.offset;
    let opacity = object.effective_opacity();
    let color = object.color;
    let view_dir = projector.camera.forward();
    let stroke = |segments: &[(Vec3, Vec3)], width: f32, out: &mut Vec<(f32, Element)>| {
        for (a, b) in segments {
            let (from, da) = projector.project(&(a + offset));
            let (to, db) = projector.project(&(b + offset));
            out.push(((da + db) * 0.5, Element::Line { from, to, color, opacity, width: width * view.pixel_ratio }));
        }
    };

    match &object.primitive {
        Primitive::Lines { segments, width } => stroke(segments.as_slice(), *width, out),
        Primitive::Bezier { control, width } => stroke(Primitive::bezier_segments(control).as_slice(), *width, out),
        Primitive::Label { position, text } => {
            let (at, depth) = projector.project(&(position + offset));
            out.push((depth, Element::Text { at, text: text.clone(), color, opacity }));
        }
        solid => {
            let Some(mesh) = TriangleMesh::from_primitive(solid, view.settings.sphere_segments, view.settings.cylinder_segments) else {
                return;
            };
            for i in 0..mesh.triangle_count() {
                let tri = mesh.triangle(i).map(|v| v + offset);
                let normal = (tri[1] - tri[0]).cross(&(tri[2] - tri[0]));
                if normal.norm_squared() <= f32::EPSILON {
                    continue;
                }
                let normal = normal.normalize();
                // Closed meshes only show their front faces
                if !matches!(solid, Primitive::Mesh(_)) && normal.dot(&view_dir) > -1e-4 {
                    continue;
                }
                let projected = tri.map(|v| projector.project(&v));
                let depth = projected.iter().map(|(_, d)| d).sum::<f32>() / 3.0;
                out.push((depth, Element::Polygon {
                    points: projected.map(|(p, _)| p),
                    color: shade(color, &normal, &view_dir),
                    opacity,
                }));
            }
        }
    }
}

/// SVG back end
#[derive(Debug, Default)]
pub struct VectorBackend {
    frames: u64,
}

impl VectorBackend {
    /// Create a vector back end
    pub fn new() -> Self {
        Self::default()
    }
}

impl RenderBackend for VectorBackend {
    fn name(&self) -> &'static str {
        "vector"
    }

    fn render(&mut self, view: &RenderView<'_>) -> BackendResult<Frame> {
        view.check_size()?;
        let (width, height) = view.size;
        let projector = Projector { camera: view.camera, width, height };
        let font_size = view.settings.label_font_size * view.pixel_ratio;

        let mut elements = Vec::new();
        for (_, object) in view.graph.visible_renderables() {
            if object.effective_opacity() > 0.0 {
                collect(object, &projector, view, &mut elements);
            }
        }
        // Far to near
        elements.sort_by(|a, b| b.0.total_cmp(&a.0));

        let mut svg = String::new();
        let _ = writeln!(
            svg,
            r#"<svg xmlns="http://www.w3.org/2000/svg" width="{width}" height="{height}" viewBox="0 0 {width} {height}">"#
        );
        if !view.settings.transparent_background {
            let _ = writeln!(svg, r#"<rect width="100%" height="100%" fill="{}"/>"#, view.settings.background.to_hex());
        }
        for (_, element) in &elements {
            let _ = match element {
                Element::Polygon { points, color, opacity } => writeln!(
                    svg,
                    r#"<polygon points="{:.2},{:.2} {:.2},{:.2} {:.2},{:.2}" fill="{}" fill-opacity="{:.3}"/>"#,
                    points[0].0, points[0].1, points[1].0, points[1].1, points[2].0, points[2].1,
                    color.to_hex(), opacity
                ),
                Element::Line { from, to, color, opacity, width } => writeln!(
                    svg,
                    r#"<line x1="{:.2}" y1="{:.2}" x2="{:.2}" y2="{:.2}" stroke="{}" stroke-opacity="{:.3}" stroke-width="{:.2}"/>"#,
                    from.0, from.1, to.0, to.1, color.to_hex(), opacity, width
                ),
                Element::Text { at, text, color, opacity } => writeln!(
                    svg,
                    r#"<text x="{:.2}" y="{:.2}" fill="{}" fill-opacity="{:.3}" font-size="{:.1}" text-anchor="middle" dominant-baseline="central">{}</text>"#,
                    at.0, at.1, color.to_hex(), opacity, font_size, escape(text)
                ),
            };
        }
        svg.push_str("</svg>\n");

        self.frames += 1;
        log::trace!("Vector frame {} ({} elements)", self.frames, elements.len());
        Ok(Frame::Vector(svg))
    }
}
