//! # Scene settings
//!
//! Every option recognized by the Scene Engine, with defaults matching the
//! viewer's out-of-the-box behavior. Keys are camelCase so a settings object
//! can be shared verbatim with the JSON the scene documents come from.

use serde::{Deserialize, Serialize};

use super::{Config, ConfigError};
use crate::foundation::color::Color;

/// Which back end renders frames
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize, Default)]
#[serde(rename_all = "lowercase")]
pub enum RendererKind {
    /// Ray-cast raster image (the "real" renderer)
    #[default]
    #[serde(alias = "raster")]
    Webgl,
    /// Depth-sorted vector document
    #[serde(alias = "vector")]
    Svg,
}

/// Corner of the output surface the orientation inset is drawn into
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize, Default)]
#[serde(rename_all = "kebab-case")]
pub enum InsetCorner {
    /// Upper left
    TopLeft,
    /// Upper right
    TopRight,
    /// Lower left
    #[default]
    BottomLeft,
    /// Lower right
    BottomRight,
}

/// Orientation inset configuration
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase", default)]
pub struct InsetSettings {
    /// Draw the inset at all
    pub enabled: bool,
    /// Edge length of the square inset viewport (CSS pixels)
    pub size: u32,
    /// Gap between the inset and the surface edges (CSS pixels)
    pub padding: u32,
    /// Which corner to draw into
    pub corner: InsetCorner,
}

impl Default for InsetSettings {
    fn default() -> Self {
        Self {
            enabled: true,
            size: 130,
            padding: 20,
            corner: InsetCorner::BottomLeft,
        }
    }
}

/// Selection and hover highlight configuration
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase", default)]
pub struct OutlineSettings {
    /// Draw outlines around selected objects
    pub enabled: bool,
    /// Outline color for selected objects
    pub selected_color: Color,
    /// Outline color for the hovered object
    pub hover_color: Color,
    /// Outline thickness in device pixels
    pub thickness: u32,
}

impl Default for OutlineSettings {
    fn default() -> Self {
        Self {
            enabled: true,
            selected_color: Color::from_u8(0xff, 0xbf, 0x00),
            hover_color: Color::from_u8(0x99, 0xcc, 0xff),
            thickness: 2,
        }
    }
}

/// Animation playback configuration
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase", default)]
pub struct AnimationSettings {
    /// Keyframe time units advanced per second in PLAY mode
    pub playback_speed: f32,
}

impl Default for AnimationSettings {
    fn default() -> Self {
        Self { playback_speed: 1.0 }
    }
}

/// Settings recognized by the Scene Engine
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase", default)]
pub struct SceneSettings {
    /// Supersample raster frames (quality over speed)
    pub antialias: bool,
    /// Back end selection
    pub renderer: RendererKind,
    /// Clear to a fully transparent background instead of `background`
    pub transparent_background: bool,
    /// Clear color
    pub background: Color,
    /// Longitudinal segments used to tessellate spheres
    pub sphere_segments: u32,
    /// Radial segments used to tessellate cylinders and cones
    pub cylinder_segments: u32,
    /// Render only on state changes instead of every frame
    pub static_scene: bool,
    /// Zoom applied after fitting the camera to the scene bounds
    pub default_zoom: f32,
    /// Fit bounds using only the x/y extents
    #[serde(rename = "zoomToFit2D")]
    pub zoom_to_fit_2d: bool,
    /// Pull the axis gizmo node out of the main scene into the inset
    pub extract_axis: bool,
    /// Name of the node `extract_axis` looks for
    pub axis_node_name: String,
    /// Color used when a node has none (or an unparsable one)
    pub default_color: Color,
    /// Sphere radius used when a node has none
    pub default_radius: f32,
    /// Cylinder radius used when a node has none
    pub default_cylinder_radius: f32,
    /// Line width used when a node has none
    pub line_width: f32,
    /// Label glyph size in CSS pixels
    pub label_font_size: f32,
    /// Scale applied on top of the surface's device pixel ratio for live frames
    pub pixel_ratio: f32,
    /// Device pixels per CSS pixel for raster export
    pub export_pixel_ratio: f32,
    /// Clicking adds to / removes from the selection instead of replacing it
    pub multi_select: bool,
    /// Adopt camera updates published by other instances
    pub following: bool,
    /// Orientation inset
    pub inset: InsetSettings,
    /// Selection highlight
    pub outline: OutlineSettings,
    /// Animation playback
    pub animation: AnimationSettings,
}

impl Default for SceneSettings {
    fn default() -> Self {
        Self {
            antialias: true,
            renderer: RendererKind::Webgl,
            transparent_background: false,
            background: Color::WHITE,
            sphere_segments: 32,
            cylinder_segments: 16,
            static_scene: true,
            default_zoom: 0.8,
            zoom_to_fit_2d: false,
            extract_axis: false,
            axis_node_name: "axes".to_string(),
            default_color: Color::from_u8(0x52, 0xaf, 0xb0),
            default_radius: 0.5,
            default_cylinder_radius: 0.1,
            line_width: 1.0,
            label_font_size: 14.0,
            pixel_ratio: 1.0,
            export_pixel_ratio: 2.0,
            multi_select: false,
            following: true,
            inset: InsetSettings::default(),
            outline: OutlineSettings::default(),
            animation: AnimationSettings::default(),
        }
    }
}

impl Config for SceneSettings {}

impl SceneSettings {
    /// Check ranges that serde cannot express
    pub fn validate(&self) -> Result<(), ConfigError> {
        if self.sphere_segments < 3 {
            return Err(ConfigError::Invalid {
                field: "sphereSegments",
                reason: format!("{} is below the minimum of 3", self.sphere_segments),
            });
        }
        if self.cylinder_segments < 3 {
            return Err(ConfigError::Invalid {
                field: "cylinderSegments",
                reason: format!("{} is below the minimum of 3", self.cylinder_segments),
            });
        }
        if self.default_zoom <= 0.0 || !self.default_zoom.is_finite() {
            return Err(ConfigError::Invalid {
                field: "defaultZoom",
                reason: "must be a positive number".to_string(),
            });
        }
        if self.label_font_size <= 0.0 || !self.label_font_size.is_finite() {
            return Err(ConfigError::Invalid {
                field: "labelFontSize",
                reason: "must be a positive number".to_string(),
            });
        }
        if self.pixel_ratio <= 0.0 || self.export_pixel_ratio <= 0.0 {
            return Err(ConfigError::Invalid {
                field: "pixelRatio",
                reason: "pixel ratios must be positive".to_string(),
            });
        }
        Ok(())
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_defaults_validate() {
        assert!(SceneSettings::default().validate().is_ok());
    }

    #[test]
    fn test_json_uses_camel_case_and_defaults() {
        let json = r##"{
            "antialias": false,
            "renderer": "svg",
            "transparentBackground": true,
            "background": "#000000",
            "sphereSegments": 12,
            "zoomToFit2D": true,
            "inset": { "corner": "top-right" }
        }"##;
        let settings = SceneSettings::load_from_str("settings.json", json).unwrap();
        assert!(!settings.antialias);
        assert_eq!(settings.renderer, RendererKind::Svg);
        assert!(settings.transparent_background);
        assert_eq!(settings.background, Color::BLACK);
        assert_eq!(settings.sphere_segments, 12);
        assert!(settings.zoom_to_fit_2d);
        assert_eq!(settings.inset.corner, InsetCorner::TopRight);
        assert_eq!(settings.inset.size, InsetSettings::default().size);
        assert_eq!(settings.cylinder_segments, 16);
    }

    #[test]
    fn test_toml_and_ron_load() {
        let toml_text = "staticScene = false\ndefaultZoom = 1.5\n";
        let settings = SceneSettings::load_from_str("scene.toml", toml_text).unwrap();
        assert!(!settings.static_scene);
        assert!((settings.default_zoom - 1.5).abs() < 1e-6);

        let ron_text = "(extractAxis: true, axisNodeName: \"gizmo\")";
        let settings = SceneSettings::load_from_str("scene.ron", ron_text).unwrap();
        assert!(settings.extract_axis);
        assert_eq!(settings.axis_node_name, "gizmo");
    }

    #[test]
    fn test_unknown_extension_rejected() {
        let err = SceneSettings::load_from_str("scene.yaml", "").unwrap_err();
        assert!(matches!(err, ConfigError::UnsupportedFormat(_)));
    }

    #[test]
    fn test_validate_rejects_degenerate_tessellation() {
        let settings = SceneSettings { sphere_segments: 2, ..SceneSettings::default() };
        assert!(matches!(settings.validate(), Err(ConfigError::Invalid { field: "sphereSegments", .. })));
    }
}
