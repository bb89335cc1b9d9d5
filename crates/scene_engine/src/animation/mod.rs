//! Keyframe animation
//!
//! Nodes may carry `keyframes` (times) and `animate` (one value per
//! keyframe). The assembler turns those into a [`KeyframeTrack`] per
//! renderable; the [`AnimationClock`] decides which time to sample each frame.

mod clock;
mod keyframes;

pub use clock::{AnimationClock, AnimationMode};
pub use keyframes::{AnimationError, KeyframeTrack, TrackValues};
