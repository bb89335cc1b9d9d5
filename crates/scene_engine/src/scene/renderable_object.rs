//! Renderable objects stored in the scene graph arena
//!
//! A [`RenderableObject`] is one constructed primitive plus the per-object
//! state the engine mutates after the build (toggle visibility, animated
//! offset and opacity). It carries no reference back to its document node;
//! that association lives in the [`ObjectRegistry`](super::ObjectRegistry).

use crate::animation::KeyframeTrack;
use crate::foundation::collections::GeneratedId;
use crate::foundation::color::Color;
use crate::foundation::math::Vec3;
use super::mesh::TriangleMesh;

/// Geometry of a single renderable, in scene coordinates
#[derive(Debug, Clone, PartialEq)]
pub enum Primitive {
    /// Sphere
    Sphere {
        /// Center
        center: Vec3,
        /// Radius
        radius: f32,
    },
    /// Axis-aligned ellipsoid
    Ellipsoid {
        /// Center
        center: Vec3,
        /// Semi-axis lengths
        radii: Vec3,
    },
    /// Capped cylinder between two points
    Cylinder {
        /// First cap center
        start: Vec3,
        /// Second cap center
        end: Vec3,
        /// Radius
        radius: f32,
    },
    /// Axis-aligned cube
    Cube {
        /// Center
        center: Vec3,
        /// Edge length
        width: f32,
    },
    /// Cylinder shaft with a cone head ending at `end`
    Arrow {
        /// Tail
        start: Vec3,
        /// Tip
        end: Vec3,
        /// Shaft radius
        radius: f32,
        /// Length of the cone head
        head_length: f32,
        /// Radius of the cone head base
        head_width: f32,
    },
    /// Independent line segments with a screen-space width
    Lines {
        /// Segment end points
        segments: Vec<(Vec3, Vec3)>,
        /// Stroke width in pixels
        width: f32,
    },
    /// Arbitrary triangle mesh (surfaces and convex hulls)
    Mesh(TriangleMesh),
    /// Cubic Bezier curve drawn as a polyline
    Bezier {
        /// Control points
        control: [Vec3; 4],
        /// Stroke width in pixels
        width: f32,
    },
    /// Text anchored at a point
    Label {
        /// Anchor
        position: Vec3,
        /// Text
        text: String,
    },
}

impl Primitive {
    /// Number of polyline samples used for Bezier curves
    pub const BEZIER_SAMPLES: usize = 24;

    /// Short name used in logs and exported node names
    pub const fn kind_name(&self) -> &'static str {
        match self {
            Self::Sphere { .. } => "sphere",
            Self::Ellipsoid { .. } => "ellipsoid",
            Self::Cylinder { .. } => "cylinder",
            Self::Cube { .. } => "cube",
            Self::Arrow { .. } => "arrow",
            Self::Lines { .. } => "lines",
            Self::Mesh(_) => "mesh",
            Self::Bezier { .. } => "bezier",
            Self::Label { .. } => "label",
        }
    }

    /// Points that bound the primitive, used for scene bounds and fitting
    pub fn extent_points(&self) -> Vec<Vec3> {
        match self {
            Self::Sphere { center, radius } => {
                vec![center - Vec3::repeat(*radius), center + Vec3::repeat(*radius)]
            }
            Self::Ellipsoid { center, radii } => vec![center - radii, center + radii],
            Self::Cylinder { start, end, radius } => {
                let r = Vec3::repeat(*radius);
                vec![start - r, start + r, end - r, end + r]
            }
            Self::Cube { center, width } => {
                let h = Vec3::repeat(width * 0.5);
                vec![center - h, center + h]
            }
            Self::Arrow { start, end, radius, head_width, .. } => {
                let r = Vec3::repeat(radius.max(*head_width));
                vec![start - r, start + r, end - r, end + r]
            }
            Self::Lines { segments, .. } => segments.iter().flat_map(|(a, b)| [*a, *b]).collect(),
            Self::Mesh(mesh) => mesh.positions.clone(),
            Self::Bezier { control, .. } => control.to_vec(),
            Self::Label { position, .. } => vec![*position],
        }
    }

    /// Sample a cubic Bezier at `t` in `[0, 1]`
    pub fn bezier_point(control: &[Vec3; 4], t: f32) -> Vec3 {
        let u = 1.0 - t;
        control[0] * (u * u * u)
            + control[1] * (3.0 * u * u * t)
            + control[2] * (3.0 * u * t * t)
            + control[3] * (t * t * t)
    }

    /// Bezier curve flattened into consecutive segments
    pub fn bezier_segments(control: &[Vec3; 4]) -> Vec<(Vec3, Vec3)> {
        let n = Self::BEZIER_SAMPLES;
        (0..n)
            .map(|i| {
                let a = Self::bezier_point(control, i as f32 / n as f32);
                let b = Self::bezier_point(control, (i + 1) as f32 / n as f32);
                (a, b)
            })
            .collect()
    }
}

/// Per-frame animated state of a renderable
#[derive(Debug, Clone, Copy, PartialEq)]
pub struct AnimatedState {
    /// Translation added to the primitive
    pub offset: Vec3,
    /// Opacity multiplier
    pub opacity: f32,
}

impl Default for AnimatedState {
    fn default() -> Self {
        Self { offset: Vec3::zeros(), opacity: 1.0 }
    }
}

/// One constructed primitive owned by the scene graph
#[derive(Debug, Clone)]
pub struct RenderableObject {
    /// Instance-scoped identity
    pub id: GeneratedId,
    /// Geometry
    pub primitive: Primitive,
    /// Base color
    pub color: Color,
    /// Base opacity from the document
    pub opacity: f32,
    /// Visibility declared by the document
    pub document_visible: bool,
    /// Hidden by a visibility toggle map
    pub toggled_off: bool,
    /// Keyframe animation, if the node declared one
    pub track: Option<KeyframeTrack>,
    /// Current animated state
    pub animated: AnimatedState,
}

impl RenderableObject {
    /// Create a renderable with default per-frame state
    pub fn new(id: GeneratedId, primitive: Primitive, color: Color, opacity: f32, visible: bool) -> Self {
        Self {
            id,
            primitive,
            color,
            opacity: opacity.clamp(0.0, 1.0),
            document_visible: visible,
            toggled_off: false,
            track: None,
            animated: AnimatedState::default(),
        }
    }

    /// Attach a keyframe track
    #[must_use]
    pub fn with_track(mut self, track: Option<KeyframeTrack>) -> Self {
        self.track = track;
        self
    }

    /// Own visibility (document flag and toggles; ancestors are not considered)
    pub const fn is_visible(&self) -> bool {
        self.document_visible && !self.toggled_off
    }

    /// Opacity after animation
    pub fn effective_opacity(&self) -> f32 {
        (self.opacity * self.animated.opacity).clamp(0.0, 1.0)
    }
}
