//! Camera state as it travels between viewers

use serde::{Deserialize, Serialize};

use crate::foundation::collections::ComponentId;
use crate::foundation::math::{Quat, Quaternion, Vec3};
use crate::render::CameraPose;

/// `{x, y, z}` position
#[derive(Debug, Clone, Copy, PartialEq, Default, Serialize, Deserialize)]
pub struct Position {
    /// X
    pub x: f32,
    /// Y
    pub y: f32,
    /// Z
    pub z: f32,
}

/// `{x, y, z, w}` quaternion
#[derive(Debug, Clone, Copy, PartialEq, Serialize, Deserialize)]
pub struct Orientation {
    /// X
    pub x: f32,
    /// Y
    pub y: f32,
    /// Z
    pub z: f32,
    /// W
    pub w: f32,
}

impl Default for Orientation {
    fn default() -> Self {
        Self { x: 0.0, y: 0.0, z: 0.0, w: 1.0 }
    }
}

/// Rejected camera state
#[derive(Debug, Clone, PartialEq, thiserror::Error)]
pub enum CameraStateError {
    /// A component is NaN or infinite
    #[error("Camera state contains a non-finite value")]
    NonFinite,
    /// Zoom must be strictly positive
    #[error("Camera zoom must be positive, got {0}")]
    InvalidZoom(f32),
    /// The quaternion has zero length
    #[error("Camera orientation is not a rotation")]
    DegenerateOrientation,
}

/// Serialized camera state shared through the sync bus
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct CameraState {
    /// Camera position
    pub position: Position,
    /// Camera orientation
    pub orientation: Orientation,
    /// Zoom factor
    pub zoom: f32,
    /// Instance that wrote this state
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub set_by_component_id: Option<ComponentId>,
    /// Whether the receiving instance should follow bus updates
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub following: Option<bool>,
}

impl CameraState {
    /// Capture a pose, stamped with the publishing instance
    pub fn from_pose(pose: &CameraPose, set_by: Option<ComponentId>) -> Self {
        let q = pose.orientation.quaternion();
        Self {
            position: Position { x: pose.position.x, y: pose.position.y, z: pose.position.z },
            orientation: Orientation { x: q.i, y: q.j, z: q.k, w: q.w },
            zoom: pose.zoom,
            set_by_component_id: set_by,
            following: None,
        }
    }

    /// Same state with a different author
    #[must_use]
    pub fn stamped(mut self, id: &ComponentId) -> Self {
        self.set_by_component_id = Some(id.clone());
        self
    }

    /// Whether `id` wrote this state
    pub fn is_from(&self, id: &ComponentId) -> bool {
        self.set_by_component_id.as_ref() == Some(id)
    }

    /// Validate and convert to a camera pose
    ///
    /// The orientation is renormalized; a zero quaternion is rejected.
    pub fn to_pose(&self) -> Result<CameraPose, CameraStateError> {
        let Position { x, y, z } = self.position;
        let o = self.orientation;
        let values = [x, y, z, o.x, o.y, o.z, o.w, self.zoom];
        if values.iter().any(|v| !v.is_finite()) {
            return Err(CameraStateError::NonFinite);
        }
        if self.zoom <= 0.0 {
            return Err(CameraStateError::InvalidZoom(self.zoom));
        }
        let orientation = Quat::try_new(Quaternion::new(o.w, o.x, o.y, o.z), 1.0e-6)
            .ok_or(CameraStateError::DegenerateOrientation)?;
        Ok(CameraPose { position: Vec3::new(x, y, z), orientation, zoom: self.zoom })
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use approx::assert_relative_eq;

    #[test]
    fn test_json_shape() {
        let json = r#"{
            "position": {"x": 1, "y": 2, "z": 3},
            "orientation": {"x": 0, "y": 0, "z": 0, "w": 2},
            "zoom": 1.5,
            "setByComponentId": "viewer-a",
            "following": true
        }"#;
        let state: CameraState = serde_json::from_str(json).unwrap();
        assert!(state.is_from(&ComponentId::from("viewer-a")));
        assert_eq!(state.following, Some(true));

        let pose = state.to_pose().unwrap();
        assert_relative_eq!(pose.position, Vec3::new(1.0, 2.0, 3.0));
        assert_relative_eq!(pose.orientation.quaternion().w, 1.0);

        let out = serde_json::to_value(CameraState::from_pose(&pose, None)).unwrap();
        assert!(out.get("setByComponentId").is_none());
        assert_eq!(out["zoom"], 1.5);
    }

    #[test]
    fn test_invalid_states() {
        let mut state = CameraState::from_pose(&crate::render::Camera::default().pose(), None);
        state.zoom = 0.0;
        assert_eq!(state.to_pose(), Err(CameraStateError::InvalidZoom(0.0)));
        state.zoom = 1.0;
        state.orientation = Orientation { x: 0.0, y: 0.0, z: 0.0, w: 0.0 };
        assert_eq!(state.to_pose(), Err(CameraStateError::DegenerateOrientation));
        state.position.x = f32::NAN;
        assert_eq!(state.to_pose(), Err(CameraStateError::NonFinite));
    }
}
