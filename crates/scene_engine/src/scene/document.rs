//! Declarative scene document model
//!
//! A scene is a tree of [`SceneNode`]s deserialized from JSON. Group nodes only
//! carry `contents`; leaf nodes carry a `type` plus the geometry fields that
//! type needs. The `type` string stays raw here so one unknown type can be
//! skipped without rejecting the whole document.

use serde::{Deserialize, Serialize};

/// One node of a declarative scene document
#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase", default)]
pub struct SceneNode {
    /// Name used for visibility toggling and lookup
    pub name: Option<String>,
    /// Primitive type for leaf nodes (see [`NodeKind`])
    #[serde(rename = "type")]
    pub kind: Option<String>,
    /// Children; a node with contents is a pure group
    pub contents: Option<Vec<SceneNode>>,
    /// Whether clicks on this node's primitives are reported
    pub clickable: Option<bool>,
    /// Color string (`#rrggbb`, `#rgb` or a basic name)
    pub color: Option<String>,
    /// Sphere/cylinder/arrow radius
    pub radius: Option<f32>,
    /// Initial visibility
    pub visible: Option<bool>,
    /// Translation applied to every produced primitive
    pub origin: Option<[f32; 3]>,
    /// Point list; meaning depends on the type
    pub positions: Option<Vec<[f32; 3]>>,
    /// Arrow head length
    pub head_length: Option<f32>,
    /// Arrow head width
    pub head_width: Option<f32>,
    /// Hover text
    pub tooltip: Option<String>,
    /// Ellipsoid semi-axis scales
    pub scale: Option<Vec<[f32; 3]>>,
    /// Start/end pairs for cylinders and arrows
    pub position_pairs: Option<Vec<[[f32; 3]; 2]>>,
    /// Keyframe times
    pub keyframes: Option<Vec<f32>>,
    /// Per-keyframe animation values
    pub animate: Option<Vec<serde_json::Value>>,
    /// Explicit identifier supplied by the document author
    pub id: Option<String>,
    /// Label text
    pub label: Option<String>,
    /// Cubic Bezier control points, four per curve
    pub control_points: Option<Vec<[[f32; 3]; 4]>>,
    /// Cube edge length
    pub width: Option<f32>,
    /// Line stroke width
    pub linewidth: Option<f32>,
    /// Base opacity
    pub opacity: Option<f32>,
    /// Per-vertex normals for surfaces
    pub normals: Option<Vec<[f32; 3]>>,
}

/// Closed set of primitive types a leaf can declare
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub enum NodeKind {
    /// `ellipsoids`
    Ellipsoids,
    /// `cylinders`
    Cylinders,
    /// `spheres`
    Spheres,
    /// `arrows`
    Arrows,
    /// `cubes`
    Cubes,
    /// `lines`
    Lines,
    /// `surface`
    Surface,
    /// `convex`
    Convex,
    /// `labels`
    Labels,
    /// `bezier`
    Bezier,
}

impl std::str::FromStr for NodeKind {
    type Err = String;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        Ok(match s {
            "ellipsoids" => Self::Ellipsoids,
            "cylinders" => Self::Cylinders,
            "spheres" => Self::Spheres,
            "arrows" => Self::Arrows,
            "cubes" => Self::Cubes,
            "lines" => Self::Lines,
            "surface" => Self::Surface,
            "convex" => Self::Convex,
            "labels" => Self::Labels,
            "bezier" => Self::Bezier,
            other => return Err(other.to_string()),
        })
    }
}

impl NodeKind {
    /// Document spelling of this kind
    pub const fn as_str(self) -> &'static str {
        match self {
            Self::Ellipsoids => "ellipsoids",
            Self::Cylinders => "cylinders",
            Self::Spheres => "spheres",
            Self::Arrows => "arrows",
            Self::Cubes => "cubes",
            Self::Lines => "lines",
            Self::Surface => "surface",
            Self::Convex => "convex",
            Self::Labels => "labels",
            Self::Bezier => "bezier",
        }
    }
}

impl SceneNode {
    /// A node with `contents` is a group regardless of its other fields
    pub fn is_group(&self) -> bool {
        self.contents.is_some()
    }

    /// Children of a group (empty for leaves)
    pub fn children(&self) -> &[SceneNode] {
        self.contents.as_deref().unwrap_or(&[])
    }

    /// Effective visibility (defaults to shown)
    pub fn is_visible(&self) -> bool {
        self.visible.unwrap_or(true)
    }

    /// Effective clickability (defaults to not clickable)
    pub fn is_clickable(&self) -> bool {
        self.clickable.unwrap_or(false)
    }

    /// Convenience constructor for a named group
    pub fn group(name: impl Into<String>, contents: Vec<SceneNode>) -> Self {
        Self {
            name: Some(name.into()),
            contents: Some(contents),
            ..Self::default()
        }
    }
}

/// Reasons a document cannot be built at all
#[derive(Debug, thiserror::Error)]
pub enum DocumentError {
    /// No document was supplied
    #[error("No scene document supplied")]
    Missing,

    /// The document is not a JSON object
    #[error("Scene document must be an object, found {0}")]
    NotAnObject(&'static str),

    /// The top-level `contents` array is absent
    #[error("Scene document is missing the top-level `contents` array")]
    MissingContents,

    /// A field has the wrong JSON type
    #[error("Malformed scene document: {0}")]
    Malformed(#[from] serde_json::Error),
}

/// Validate and deserialize a raw JSON document
///
/// The top level must be an object with a `contents` array; anything else is
/// a missing document and the caller keeps displaying its previous graph.
pub fn parse_document(value: Option<&serde_json::Value>) -> Result<SceneNode, DocumentError> {
    let value = value.ok_or(DocumentError::Missing)?;
    let object = value.as_object().ok_or_else(|| DocumentError::NotAnObject(json_type_name(value)))?;
    if !object.get("contents").is_some_and(serde_json::Value::is_array) {
        return Err(DocumentError::MissingContents);
    }
    Ok(SceneNode::deserialize(value)?)
}

const fn json_type_name(value: &serde_json::Value) -> &'static str {
    match value {
        serde_json::Value::Null => "null",
        serde_json::Value::Bool(_) => "a boolean",
        serde_json::Value::Number(_) => "a number",
        serde_json::Value::String(_) => "a string",
        serde_json::Value::Array(_) => "an array",
        serde_json::Value::Object(_) => "an object",
    }
}
