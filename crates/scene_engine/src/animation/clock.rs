//! Animation clock and playback modes

use super::keyframes::locate_in;

/// Playback mode
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default)]
pub enum AnimationMode {
    /// No time-driven mutation
    #[default]
    None,
    /// Time advances with every frame and loops
    Play,
    /// Time comes from an external slider value in `[0, 1]`
    Slider,
}

/// Clock deciding which animation time the scene is sampled at
///
/// Switching away from [`AnimationMode::Play`] keeps the elapsed time, so
/// returning to PLAY resumes from the same phase.
#[derive(Debug, Clone, Default)]
pub struct AnimationClock {
    mode: AnimationMode,
    elapsed: f32,
    slider: f32,
    timeline: Vec<f32>,
}

impl AnimationClock {
    /// Create a clock in [`AnimationMode::None`]
    pub fn new() -> Self {
        Self::default()
    }

    /// Current mode
    pub const fn mode(&self) -> AnimationMode {
        self.mode
    }

    /// Change mode; takes effect on the next sampled frame
    pub fn set_mode(&mut self, mode: AnimationMode) {
        if mode != self.mode {
            log::debug!("Animation mode {:?} -> {:?} at t={:.3}", self.mode, mode, self.elapsed);
            self.mode = mode;
        }
    }

    /// Replace the keyframe timeline (union of every track's times)
    pub fn set_timeline(&mut self, mut times: Vec<f32>) {
        times.sort_by(f32::total_cmp);
        times.dedup();
        self.timeline = times;
    }

    /// Length of the loop in keyframe time units
    pub fn duration(&self) -> f32 {
        self.timeline.last().copied().unwrap_or(0.0)
    }

    /// Whether any keyframed objects exist
    pub fn has_timeline(&self) -> bool {
        self.duration() > 0.0
    }

    /// Advance the PLAY clock; returns whether the sampled time changed
    pub fn advance(&mut self, delta: f32, speed: f32) -> bool {
        if self.mode != AnimationMode::Play || !self.has_timeline() {
            return false;
        }
        self.elapsed = (self.elapsed + delta * speed).rem_euclid(self.duration());
        delta * speed != 0.0
    }

    /// Set the slider position (clamped to `[0, 1]`)
    pub fn set_slider(&mut self, value: f32) {
        self.slider = if value.is_finite() { value.clamp(0.0, 1.0) } else { 0.0 };
    }

    /// Current slider position
    pub const fn slider(&self) -> f32 {
        self.slider
    }

    /// Elapsed PLAY time (kept while suspended)
    pub const fn elapsed(&self) -> f32 {
        self.elapsed
    }

    /// Time to sample tracks at, or `None` when the scene must not be mutated
    pub fn sample_time(&self) -> Option<f32> {
        match self.mode {
            AnimationMode::None => None,
            AnimationMode::Play => Some(self.elapsed),
            AnimationMode::Slider => Some(self.slider * self.duration()),
        }
    }

    /// Keyframe index and interpolation fraction on the shared timeline
    pub fn keyframe_position(&self) -> (usize, f32) {
        self.sample_time()
            .map_or((0, 0.0), |t| locate_in(&self.timeline, t))
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use approx::assert_relative_eq;

    fn clock_with_timeline() -> AnimationClock {
        let mut clock = AnimationClock::new();
        clock.set_timeline(vec![2.0, 0.0, 1.0, 1.0]);
        clock
    }

    #[test]
    fn test_none_mode_does_not_sample() {
        let mut clock = clock_with_timeline();
        assert!(!clock.advance(0.5, 1.0));
        assert_eq!(clock.sample_time(), None);
    }

    #[test]
    fn test_play_loops() {
        let mut clock = clock_with_timeline();
        clock.set_mode(AnimationMode::Play);
        assert!(clock.advance(1.5, 1.0));
        assert_relative_eq!(clock.sample_time().unwrap(), 1.5);
        clock.advance(1.0, 1.0);
        assert_relative_eq!(clock.sample_time().unwrap(), 0.5);
        assert_eq!(clock.keyframe_position(), (0, 0.5));
    }

    #[test]
    fn test_switching_away_suspends_phase() {
        let mut clock = clock_with_timeline();
        clock.set_mode(AnimationMode::Play);
        clock.advance(0.75, 1.0);
        clock.set_mode(AnimationMode::Slider);
        assert!(!clock.advance(10.0, 1.0));
        clock.set_mode(AnimationMode::Play);
        assert_relative_eq!(clock.sample_time().unwrap(), 0.75);
    }

    #[test]
    fn test_slider_maps_to_timeline() {
        let mut clock = clock_with_timeline();
        clock.set_mode(AnimationMode::Slider);
        clock.set_slider(0.5);
        assert_relative_eq!(clock.sample_time().unwrap(), 1.0);
        clock.set_slider(7.0);
        assert_relative_eq!(clock.sample_time().unwrap(), 2.0);
        clock.set_slider(f32::NAN);
        assert_relative_eq!(clock.sample_time().unwrap(), 0.0);
    }
}
