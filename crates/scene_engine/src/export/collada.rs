//! COLLADA 1.4.1 writer
//!
//! Serializes the live scene graph: containers become nested `<node>`s and
//! each visible renderable becomes a tessellated `<geometry>` instanced by a
//! node. One material/effect pair is written per distinct color and opacity.
//! Line strokes are written as `<lines>`; labels have no geometry and are
//! skipped.

use std::collections::BTreeMap;
use std::fmt::Write as _;

use chrono::{DateTime, Utc};

use crate::foundation::collections::ObjectKey;
use crate::foundation::color::Color;
use crate::foundation::math::Vec3;
use crate::scene::{ObjectKind, Primitive, RenderableObject, SceneGraph, TriangleMesh};

/// Tessellation density used for exported solids
#[derive(Debug, Clone, Copy)]
pub struct Tessellation {
    /// Sphere and ellipsoid segments
    pub sphere_segments: u32,
    /// Cylinder, arrow and cone segments
    pub cylinder_segments: u32,
}

enum Body {
    Triangles(TriangleMesh),
    Lines(Vec<(Vec3, Vec3)>),
}

struct Geometry {
    id: String,
    material: String,
    body: Body,
}

#[derive(Default)]
struct Writer {
    geometries: Vec<Geometry>,
    // material id -> (color, opacity)
    materials: BTreeMap<String, (Color, f32)>,
    nodes: String,
    groups: usize,
}

fn material_id(color: Color, opacity: f32) -> String {
    let [r, g, b, a] = color.to_rgba8(opacity);
    format!("mat-{r:02x}{g:02x}{b:02x}{a:02x}")
}

fn floats<'a>(values: impl Iterator<Item = &'a Vec3>) -> (usize, String) {
    let mut count = 0;
    let mut out = String::new();
    for v in values {
        if count > 0 {
            out.push(' ');
        }
        let _ = write!(out, "{} {} {}", v.x, v.y, v.z);
        count += 3;
    }
    (count, out)
}

fn escape(text: &str) -> String {
    text.replace('&', "&amp;").replace('<', "&lt;").replace('>', "&gt;").replace('"', "&quot;")
}

impl Writer {
    fn body(object: &RenderableObject, tessellation: Tessellation) -> Option<Body> {
        let offset = object.animated.offset;
        match &object.primitive {
            Primitive::Lines { segments, .. } => {
                Some(Body::Lines(segments.iter().map(|(a, b)| (a + offset, b + offset)).collect()))
            }
            Primitive::Bezier { control, .. } => Some(Body::Lines(
                Primitive::bezier_segments(control).into_iter().map(|(a, b)| (a + offset, b + offset)).collect(),
            )),
            Primitive::Label { .. } => None,
            solid => TriangleMesh::from_primitive(solid, tessellation.sphere_segments, tessellation.cylinder_segments)
                .filter(|mesh| !mesh.is_empty())
                .map(|mesh| Body::Triangles(mesh.translated(&offset))),
        }
    }

    fn visit(&mut self, graph: &SceneGraph, key: ObjectKey, depth: usize, tessellation: Tessellation) {
        let Some(object) = graph.get(key) else { return };
        let indent = "  ".repeat(depth + 3);
        match &object.kind {
            ObjectKind::Group { children } => {
                let name = object.name.as_deref().unwrap_or("group");
                let _ = writeln!(self.nodes, r#"{indent}<node id="group-{}" name="{}">"#, self.groups, escape(name));
                self.groups += 1;
                for child in children {
                    self.visit(graph, *child, depth + 1, tessellation);
                }
                let _ = writeln!(self.nodes, "{indent}</node>");
            }
            ObjectKind::Renderable(renderable) => {
                if !renderable.is_visible() {
                    return;
                }
                let Some(body) = Self::body(renderable, tessellation) else { return };
                let opacity = renderable.effective_opacity();
                let material = material_id(renderable.color, opacity);
                self.materials.entry(material.clone()).or_insert((renderable.color, opacity));
                let id = format!("geom-{}", renderable.id.0);
                let _ = writeln!(
                    self.nodes,
                    r##"{indent}<node id="{}" name="{}-{}"><instance_geometry url="#{id}"><bind_material><technique_common><instance_material symbol="{material}" target="#{material}"/></technique_common></bind_material></instance_geometry></node>"##,
                    renderable.id,
                    renderable.primitive.kind_name(),
                    renderable.id.0,
                );
                self.geometries.push(Geometry { id, material, body });
            }
        }
    }

    fn write_geometry(out: &mut String, geometry: &Geometry) {
        let id = &geometry.id;
        let material = &geometry.material;
        let _ = writeln!(out, r#"    <geometry id="{id}" name="{id}">"#);
        out.push_str("      <mesh>\n");
        match &geometry.body {
            Body::Triangles(mesh) => {
                let (pc, positions) = floats(mesh.positions.iter());
                let (nc, normals) = floats(mesh.normals.iter());
                let _ = writeln!(out, r##"        <source id="{id}-positions"><float_array id="{id}-positions-array" count="{pc}">{positions}</float_array><technique_common><accessor source="#{id}-positions-array" count="{}" stride="3"><param name="X" type="float"/><param name="Y" type="float"/><param name="Z" type="float"/></accessor></technique_common></source>"##, pc / 3);
                let _ = writeln!(out, r##"        <source id="{id}-normals"><float_array id="{id}-normals-array" count="{nc}">{normals}</float_array><technique_common><accessor source="#{id}-normals-array" count="{}" stride="3"><param name="X" type="float"/><param name="Y" type="float"/><param name="Z" type="float"/></accessor></technique_common></source>"##, nc / 3);
                let _ = writeln!(out, r##"        <vertices id="{id}-vertices"><input semantic="POSITION" source="#{id}-positions"/></vertices>"##);
                let indices: Vec<String> = mesh
                    .indices
                    .iter()
                    .flat_map(|tri| tri.iter().flat_map(|i| [i.to_string(), i.to_string()]))
                    .collect();
                let _ = writeln!(
                    out,
                    r##"        <triangles material="{material}" count="{}"><input semantic="VERTEX" source="#{id}-vertices" offset="0"/><input semantic="NORMAL" source="#{id}-normals" offset="1"/><p>{}</p></triangles>"##,
                    mesh.triangle_count(),
                    indices.join(" ")
                );
            }
            Body::Lines(segments) => {
                let (pc, positions) = floats(segments.iter().flat_map(|(a, b)| [a, b]));
                let _ = writeln!(out, r##"        <source id="{id}-positions"><float_array id="{id}-positions-array" count="{pc}">{positions}</float_array><technique_common><accessor source="#{id}-positions-array" count="{}" stride="3"><param name="X" type="float"/><param name="Y" type="float"/><param name="Z" type="float"/></accessor></technique_common></source>"##, pc / 3);
                let _ = writeln!(out, r##"        <vertices id="{id}-vertices"><input semantic="POSITION" source="#{id}-positions"/></vertices>"##);
                let indices: Vec<String> = (0..segments.len() * 2).map(|i| i.to_string()).collect();
                let _ = writeln!(
                    out,
                    r##"        <lines material="{material}" count="{}"><input semantic="VERTEX" source="#{id}-vertices" offset="0"/><p>{}</p></lines>"##,
                    segments.len(),
                    indices.join(" ")
                );
            }
        }
        out.push_str("      </mesh>\n    </geometry>\n");
    }

    fn finish(self, created: DateTime<Utc>) -> String {
        let stamp = created.to_rfc3339_opts(chrono::SecondsFormat::Secs, true);
        let mut out = String::new();
        out.push_str(r#"<?xml version="1.0" encoding="utf-8"?>"#);
        out.push('\n');
        out.push_str(r#"<COLLADA xmlns="http://www.collada.org/2005/11/COLLADASchema" version="1.4.1">"#);
        out.push('\n');
        let _ = writeln!(
            out,
            "  <asset><contributor><authoring_tool>scene_engine {}</authoring_tool></contributor><created>{stamp}</created><modified>{stamp}</modified><unit name=\"meter\" meter=\"1\"/><up_axis>Y_UP</up_axis></asset>",
            env!("CARGO_PKG_VERSION")
        );

        out.push_str("  <library_effects>\n");
        for (id, (color, opacity)) in &self.materials {
            let _ = writeln!(
                out,
                r#"    <effect id="{id}-effect"><profile_COMMON><technique sid="common"><lambert><diffuse><color>{} {} {} 1</color></diffuse><transparency><float>{opacity}</float></transparency></lambert></technique></profile_COMMON></effect>"#,
                color.r, color.g, color.b
            );
        }
        out.push_str("  </library_effects>\n  <library_materials>\n");
        for id in self.materials.keys() {
            let _ = writeln!(out, r##"    <material id="{id}" name="{id}"><instance_effect url="#{id}-effect"/></material>"##);
        }
        out.push_str("  </library_materials>\n  <library_geometries>\n");
        for geometry in &self.geometries {
            Self::write_geometry(&mut out, geometry);
        }
        out.push_str("  </library_geometries>\n  <library_visual_scenes>\n");
        out.push_str(r#"    <visual_scene id="scene" name="scene">"#);
        out.push('\n');
        out.push_str(&self.nodes);
        out.push_str("    </visual_scene>\n  </library_visual_scenes>\n");
        out.push_str(r##"  <scene><instance_visual_scene url="#scene"/></scene>"##);
        out.push_str("\n</COLLADA>\n");
        out
    }
}

/// Write the visible part of `graph` as a COLLADA document
pub fn write_document(graph: &SceneGraph, tessellation: Tessellation, created: DateTime<Utc>) -> String {
    let mut writer = Writer::default();
    writer.visit(graph, graph.root(), 0, tessellation);
    log::debug!(
        "COLLADA export: {} geometries, {} materials",
        writer.geometries.len(),
        writer.materials.len()
    );
    writer.finish(created)
}
