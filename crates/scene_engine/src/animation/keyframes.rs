//! Keyframe tracks parsed from scene documents

use serde_json::Value;

use crate::foundation::math::{utils, Vec3};
use crate::scene::AnimatedState;

/// Values interpolated by a track
#[derive(Debug, Clone, PartialEq)]
pub enum TrackValues {
    /// Translation offsets added to the primitive
    Offset(Vec<Vec3>),
    /// Opacity multipliers
    Opacity(Vec<f32>),
}

impl TrackValues {
    fn len(&self) -> usize {
        match self {
            Self::Offset(v) => v.len(),
            Self::Opacity(v) => v.len(),
        }
    }
}

/// Keyframe times plus one value per keyframe
#[derive(Debug, Clone, PartialEq)]
pub struct KeyframeTrack {
    times: Vec<f32>,
    values: TrackValues,
}

/// Problems with a node's animation data
///
/// These never reject the node; the assembler logs them and builds the node
/// without animation.
#[derive(Debug, Clone, PartialEq, thiserror::Error)]
pub enum AnimationError {
    /// `animate` is present but empty
    #[error("animate is empty")]
    Empty,
    /// Entry `index` is not a number, a 3-vector or a list of 3-vectors
    #[error("animate[{index}] has an unsupported shape")]
    UnsupportedValue {
        /// Offending entry
        index: usize,
    },
    /// Entries mix different shapes
    #[error("animate mixes value shapes")]
    MixedValues,
    /// `keyframes` and `animate` lengths differ
    #[error("{times} keyframes but {values} animate entries")]
    LengthMismatch {
        /// Number of keyframe times
        times: usize,
        /// Number of values
        values: usize,
    },
    /// Per-instance offsets don't match the number of instances
    #[error("expected offsets for {expected} instances, found {found}")]
    InstanceMismatch {
        /// Instances produced by the node
        expected: usize,
        /// Offsets supplied
        found: usize,
    },
    /// Keyframe times go backwards
    #[error("keyframe times must be non-decreasing")]
    Unordered,
}

enum ParsedValue {
    Scalar(f32),
    Vector(Vec3),
    PerInstance(Vec<Vec3>),
}

fn as_vec3(value: &Value) -> Option<Vec3> {
    let array = value.as_array()?;
    if array.len() != 3 {
        return None;
    }
    let c = |i: usize| array[i].as_f64().map(|v| v as f32);
    Some(Vec3::new(c(0)?, c(1)?, c(2)?))
}

fn parse_value(value: &Value) -> Option<ParsedValue> {
    if let Some(n) = value.as_f64() {
        return Some(ParsedValue::Scalar(n as f32));
    }
    if let Some(v) = as_vec3(value) {
        return Some(ParsedValue::Vector(v));
    }
    let list = value.as_array()?;
    list.iter().map(as_vec3).collect::<Option<Vec<_>>>().map(ParsedValue::PerInstance)
}

impl KeyframeTrack {
    /// Create a track, checking lengths and ordering
    pub fn new(times: Vec<f32>, values: TrackValues) -> Result<Self, AnimationError> {
        if values.len() == 0 {
            return Err(AnimationError::Empty);
        }
        if times.len() != values.len() {
            return Err(AnimationError::LengthMismatch { times: times.len(), values: values.len() });
        }
        if times.windows(2).any(|w| w[1] < w[0]) {
            return Err(AnimationError::Unordered);
        }
        Ok(Self { times, values })
    }

    /// Build one track per instance from a node's `keyframes`/`animate`
    ///
    /// Returns `vec![None; instances]` when the node has no animation.
    /// Missing `keyframes` default to `0, 1, ..., n-1`.
    pub fn tracks_for_instances(
        keyframes: Option<&[f32]>,
        animate: Option<&[Value]>,
        instances: usize,
    ) -> Result<Vec<Option<Self>>, AnimationError> {
        let Some(animate) = animate else {
            return Ok(vec![None; instances]);
        };
        if animate.is_empty() {
            return Err(AnimationError::Empty);
        }
        let parsed = animate
            .iter()
            .enumerate()
            .map(|(index, v)| parse_value(v).ok_or(AnimationError::UnsupportedValue { index }))
            .collect::<Result<Vec<_>, _>>()?;
        let times: Vec<f32> = keyframes.map_or_else(
            || (0..animate.len()).map(|i| i as f32).collect(),
            <[f32]>::to_vec,
        );

        match &parsed[0] {
            ParsedValue::Scalar(_) => {
                let values = parsed
                    .iter()
                    .map(|p| match p {
                        ParsedValue::Scalar(s) => Ok(*s),
                        _ => Err(AnimationError::MixedValues),
                    })
                    .collect::<Result<Vec<_>, _>>()?;
                let track = Self::new(times, TrackValues::Opacity(values))?;
                Ok(vec![Some(track); instances])
            }
            ParsedValue::Vector(_) => {
                let values = parsed
                    .iter()
                    .map(|p| match p {
                        ParsedValue::Vector(v) => Ok(*v),
                        _ => Err(AnimationError::MixedValues),
                    })
                    .collect::<Result<Vec<_>, _>>()?;
                let track = Self::new(times, TrackValues::Offset(values))?;
                Ok(vec![Some(track); instances])
            }
            ParsedValue::PerInstance(_) => {
                let per_keyframe = parsed
                    .iter()
                    .map(|p| match p {
                        ParsedValue::PerInstance(list) if list.len() == instances => Ok(list.clone()),
                        ParsedValue::PerInstance(list) => Err(AnimationError::InstanceMismatch {
                            expected: instances,
                            found: list.len(),
                        }),
                        _ => Err(AnimationError::MixedValues),
                    })
                    .collect::<Result<Vec<_>, _>>()?;
                (0..instances)
                    .map(|i| {
                        let offsets = per_keyframe.iter().map(|frame| frame[i]).collect();
                        Self::new(times.clone(), TrackValues::Offset(offsets)).map(Some)
                    })
                    .collect()
            }
        }
    }

    /// Keyframe times
    pub fn times(&self) -> &[f32] {
        &self.times
    }

    /// Time of the last keyframe
    pub fn duration(&self) -> f32 {
        self.times.last().copied().unwrap_or(0.0)
    }

    /// Segment index and interpolation fraction for `time`, clamped to the track
    pub fn locate(&self, time: f32) -> (usize, f32) {
        locate_in(&self.times, time)
    }

    /// Interpolated state at `time`
    pub fn sample(&self, time: f32) -> AnimatedState {
        let (i, f) = self.locate(time);
        let j = (i + 1).min(self.times.len() - 1);
        match &self.values {
            TrackValues::Offset(values) => AnimatedState {
                offset: utils::lerp_vec3(&values[i], &values[j], f),
                opacity: 1.0,
            },
            TrackValues::Opacity(values) => AnimatedState {
                offset: Vec3::zeros(),
                opacity: utils::lerp(values[i], values[j], f),
            },
        }
    }
}

/// Segment index and fraction of `time` within sorted keyframe `times`
pub(crate) fn locate_in(times: &[f32], time: f32) -> (usize, f32) {
    match times {
        [] | [_] => (0, 0.0),
        _ if time <= times[0] => (0, 0.0),
        _ => {
            let last = times.len() - 1;
            if time >= times[last] {
                return (last, 0.0);
            }
            let i = times.partition_point(|t| *t <= time) - 1;
            let span = times[i + 1] - times[i];
            let fraction = if span > 0.0 { (time - times[i]) / span } else { 0.0 };
            (i, fraction)
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use approx::assert_relative_eq;
    use serde_json::json;

    fn values(v: Value) -> Vec<Value> {
        v.as_array().unwrap().clone()
    }

    #[test]
    fn test_offset_track_interpolates() {
        let animate = values(json!([[0, 0, 0], [2, 0, 0]]));
        let tracks = KeyframeTrack::tracks_for_instances(None, Some(&animate), 2).unwrap();
        assert_eq!(tracks.len(), 2);
        let track = tracks[0].as_ref().unwrap();
        assert_relative_eq!(track.sample(0.5).offset, Vec3::new(1.0, 0.0, 0.0));
        assert_relative_eq!(track.sample(5.0).offset, Vec3::new(2.0, 0.0, 0.0));
        assert_relative_eq!(track.sample(-1.0).offset, Vec3::zeros());
    }

    #[test]
    fn test_opacity_track_with_explicit_times() {
        let animate = values(json!([1.0, 0.0]));
        let times = [0.0, 4.0];
        let tracks = KeyframeTrack::tracks_for_instances(Some(&times), Some(&animate), 1).unwrap();
        let track = tracks[0].as_ref().unwrap();
        assert_relative_eq!(track.sample(1.0).opacity, 0.75);
        assert_relative_eq!(track.duration(), 4.0);
    }

    #[test]
    fn test_per_instance_offsets_are_split() {
        let animate = values(json!([
            [[0, 0, 0], [0, 0, 0]],
            [[1, 0, 0], [0, 1, 0]]
        ]));
        let tracks = KeyframeTrack::tracks_for_instances(None, Some(&animate), 2).unwrap();
        assert_relative_eq!(tracks[0].as_ref().unwrap().sample(1.0).offset, Vec3::x());
        assert_relative_eq!(tracks[1].as_ref().unwrap().sample(1.0).offset, Vec3::y());
    }

    #[test]
    fn test_errors() {
        let mixed = values(json!([1.0, [0, 0, 0]]));
        assert_eq!(
            KeyframeTrack::tracks_for_instances(None, Some(&mixed), 1),
            Err(AnimationError::MixedValues)
        );
        let animate = values(json!([1.0, 0.5]));
        assert_eq!(
            KeyframeTrack::tracks_for_instances(Some(&[0.0]), Some(&animate), 1),
            Err(AnimationError::LengthMismatch { times: 1, values: 2 })
        );
        assert_eq!(
            KeyframeTrack::tracks_for_instances(Some(&[1.0, 0.0]), Some(&animate), 1),
            Err(AnimationError::Unordered)
        );
        let wrong = values(json!([[[0, 0, 0]]]));
        assert_eq!(
            KeyframeTrack::tracks_for_instances(None, Some(&wrong), 2),
            Err(AnimationError::InstanceMismatch { expected: 2, found: 1 })
        );
        let bad = values(json!(["x"]));
        assert_eq!(
            KeyframeTrack::tracks_for_instances(None, Some(&bad), 1),
            Err(AnimationError::UnsupportedValue { index: 0 })
        );
    }

    #[test]
    fn test_no_animation_yields_none_per_instance() {
        let tracks = KeyframeTrack::tracks_for_instances(None, None, 3).unwrap();
        assert_eq!(tracks, vec![None, None, None]);
    }

    #[test]
    fn test_locate_in() {
        let times = [0.0, 1.0, 3.0];
        assert_eq!(locate_in(&times, 0.5), (0, 0.5));
        let (i, f) = locate_in(&times, 2.0);
        assert_eq!(i, 1);
        assert_relative_eq!(f, 0.5);
        assert_eq!(locate_in(&times, 3.0), (2, 0.0));
        assert_eq!(locate_in(&[], 1.0), (0, 0.0));
    }
}
