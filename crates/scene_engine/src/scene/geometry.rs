//! Geometry builder
//!
//! Converts one leaf [`SceneNode`] into the primitives it declares. The
//! builder is stateless; the assembler owns ids, arena slots and registry
//! entries.

use crate::animation::KeyframeTrack;
use crate::config::SceneSettings;
use crate::foundation::color::Color;
use crate::foundation::math::{vec3, Vec3};
use super::document::{NodeKind, SceneNode};
use super::mesh::TriangleMesh;
use super::renderable_object::Primitive;

/// Reasons a leaf produces no geometry
#[derive(Debug, Clone, PartialEq, thiserror::Error)]
pub enum GeometryError {
    /// Leaf without a `type`
    #[error("leaf node has no type")]
    MissingType,
    /// `type` outside the supported set
    #[error("unknown node type `{0}`")]
    UnknownKind(String),
    /// A field the kind requires is absent
    #[error("{kind} node is missing `{field}`")]
    MissingField {
        /// Node kind
        kind: &'static str,
        /// Field name as spelled in documents
        field: &'static str,
    },
    /// Not enough points for the kind
    #[error("{kind} node needs at least {required} positions, found {found}")]
    TooFewPoints {
        /// Node kind
        kind: &'static str,
        /// Minimum count
        required: usize,
        /// Supplied count
        found: usize,
    },
    /// `scale` is neither shared nor one entry per position
    #[error("ellipsoids node has {scales} scale entries for {positions} positions")]
    ScaleMismatch {
        /// Number of positions
        positions: usize,
        /// Number of scale entries
        scales: usize,
    },
    /// Points don't span the shape (e.g. coplanar hull input)
    #[error("{kind} node is degenerate: {reason}")]
    Degenerate {
        /// Node kind
        kind: &'static str,
        /// Short description
        reason: &'static str,
    },
}

/// One instance produced by a leaf
#[derive(Debug, Clone)]
pub struct BuiltPrimitive {
    /// Geometry with `origin` applied
    pub primitive: Primitive,
    /// Animation for this instance
    pub track: Option<KeyframeTrack>,
}

/// Everything a leaf contributes, sharing the node's static attributes
#[derive(Debug, Clone)]
pub struct LeafGeometry {
    /// Resolved kind
    pub kind: NodeKind,
    /// Material color
    pub color: Color,
    /// Base opacity
    pub opacity: f32,
    /// Fan-out instances in declaration order
    pub instances: Vec<BuiltPrimitive>,
}

/// Stateless converter from leaf nodes to primitives
#[derive(Debug, Clone, Copy)]
pub struct GeometryBuilder<'a> {
    settings: &'a SceneSettings,
}

fn required<'n, T>(value: Option<&'n T>, kind: NodeKind, field: &'static str) -> Result<&'n T, GeometryError> {
    value.ok_or(GeometryError::MissingField { kind: kind.as_str(), field })
}

impl<'a> GeometryBuilder<'a> {
    /// Create a builder reading defaults from `settings`
    pub const fn new(settings: &'a SceneSettings) -> Self {
        Self { settings }
    }

    /// Build the primitives declared by a leaf
    pub fn build(&self, node: &SceneNode) -> Result<LeafGeometry, GeometryError> {
        let raw = node.kind.as_deref().ok_or(GeometryError::MissingType)?;
        let kind: NodeKind = raw.parse().map_err(GeometryError::UnknownKind)?;
        let origin = node.origin.map_or_else(Vec3::zeros, vec3);
        let primitives = self.primitives(node, kind, &origin)?;

        let tracks = match KeyframeTrack::tracks_for_instances(
            node.keyframes.as_deref(),
            node.animate.as_deref(),
            primitives.len(),
        ) {
            Ok(tracks) => tracks,
            Err(e) => {
                log::warn!("Ignoring animation on {} node {:?}: {}", kind.as_str(), node.name, e);
                vec![None; primitives.len()]
            }
        };

        Ok(LeafGeometry {
            kind,
            color: self.color(node),
            opacity: node.opacity.unwrap_or(1.0).clamp(0.0, 1.0),
            instances: primitives
                .into_iter()
                .zip(tracks)
                .map(|(primitive, track)| BuiltPrimitive { primitive, track })
                .collect(),
        })
    }

    fn color(&self, node: &SceneNode) -> Color {
        match node.color.as_deref().map(Color::parse) {
            None => self.settings.default_color,
            Some(Ok(color)) => color,
            Some(Err(e)) => {
                log::warn!("{} on node {:?}, using default color", e, node.name);
                self.settings.default_color
            }
        }
    }

    fn primitives(&self, node: &SceneNode, kind: NodeKind, origin: &Vec3) -> Result<Vec<Primitive>, GeometryError> {
        let at = |p: &[f32; 3]| vec3(*p) + origin;
        let positions = || required(node.positions.as_ref(), kind, "positions");
        let pairs = || required(node.position_pairs.as_ref(), kind, "positionPairs");

        Ok(match kind {
            NodeKind::Spheres => {
                let radius = node.radius.unwrap_or(self.settings.default_radius);
                positions()?.iter().map(|p| Primitive::Sphere { center: at(p), radius }).collect()
            }
            NodeKind::Ellipsoids => {
                let positions = positions()?;
                let scale = required(node.scale.as_ref(), kind, "scale")?;
                let shared = scale.len() == 1;
                if !shared && scale.len() != positions.len() {
                    return Err(GeometryError::ScaleMismatch { positions: positions.len(), scales: scale.len() });
                }
                let radius = node.radius.unwrap_or(1.0);
                positions
                    .iter()
                    .enumerate()
                    .map(|(i, p)| Primitive::Ellipsoid {
                        center: at(p),
                        radii: vec3(scale[if shared { 0 } else { i }]) * radius,
                    })
                    .collect()
            }
            NodeKind::Cubes => {
                let width = node.width.unwrap_or(1.0);
                positions()?.iter().map(|p| Primitive::Cube { center: at(p), width }).collect()
            }
            NodeKind::Cylinders => {
                let radius = node.radius.unwrap_or(self.settings.default_cylinder_radius);
                pairs()?
                    .iter()
                    .map(|[a, b]| Primitive::Cylinder { start: at(a), end: at(b), radius })
                    .collect()
            }
            NodeKind::Arrows => {
                let radius = node.radius.unwrap_or(self.settings.default_cylinder_radius);
                let head_length = node.head_length.unwrap_or(radius * 4.0);
                let head_width = node.head_width.unwrap_or(radius * 2.0);
                pairs()?
                    .iter()
                    .map(|[a, b]| Primitive::Arrow { start: at(a), end: at(b), radius, head_length, head_width })
                    .collect()
            }
            NodeKind::Labels => {
                let text = required(node.label.as_ref(), kind, "label")?;
                positions()?
                    .iter()
                    .map(|p| Primitive::Label { position: at(p), text: text.clone() })
                    .collect()
            }
            NodeKind::Bezier => required(node.control_points.as_ref(), kind, "controlPoints")?
                .iter()
                .map(|points| Primitive::Bezier {
                    control: points.map(|p| at(&p)),
                    width: node.linewidth.unwrap_or(self.settings.line_width),
                })
                .collect(),
            NodeKind::Lines => {
                let positions = positions()?;
                if positions.len() < 2 {
                    return Err(GeometryError::TooFewPoints { kind: kind.as_str(), required: 2, found: positions.len() });
                }
                if positions.len() % 2 == 1 {
                    log::warn!("lines node {:?} has an odd point count, dropping the last point", node.name);
                }
                let segments = positions.chunks_exact(2).map(|pair| (at(&pair[0]), at(&pair[1]))).collect();
                vec![Primitive::Lines { segments, width: node.linewidth.unwrap_or(self.settings.line_width) }]
            }
            NodeKind::Surface => {
                let positions = positions()?;
                if positions.len() < 3 {
                    return Err(GeometryError::TooFewPoints { kind: kind.as_str(), required: 3, found: positions.len() });
                }
                let vertices: Vec<Vec3> = positions.iter().map(at).collect();
                let normals: Option<Vec<Vec3>> = node
                    .normals
                    .as_ref()
                    .filter(|n| n.len() == positions.len())
                    .map(|n| n.iter().map(|v| vec3(*v)).collect());
                vec![Primitive::Mesh(TriangleMesh::from_triangle_list(&vertices, normals.as_deref()))]
            }
            NodeKind::Convex => {
                let positions = positions()?;
                if positions.len() < 4 {
                    return Err(GeometryError::TooFewPoints { kind: kind.as_str(), required: 4, found: positions.len() });
                }
                let points: Vec<Vec3> = positions.iter().map(at).collect();
                let hull = TriangleMesh::convex_hull(&points)
                    .ok_or(GeometryError::Degenerate { kind: kind.as_str(), reason: "points are coplanar" })?;
                vec![Primitive::Mesh(hull)]
            }
        })
    }
}
