//! Time management utilities

use std::time::Instant;

/// Frame timer used by the render loop
///
/// The host drives the loop, so the timer can either measure wall time itself
/// (`update`) or accept a delta supplied by the host (`advance`).
#[derive(Debug)]
pub struct Timer {
    last_frame: Instant,
    delta_time: f32,
    total_time: f32,
    frame_count: u64,
}

impl Default for Timer {
    fn default() -> Self {
        Self::new()
    }
}

impl Timer {
    /// Create a new timer
    pub fn new() -> Self {
        Self {
            last_frame: Instant::now(),
            delta_time: 0.0,
            total_time: 0.0,
            frame_count: 0,
        }
    }
    
    /// Measure the wall-clock time since the last frame
    pub fn update(&mut self) -> f32 {
        let now = Instant::now();
        let delta = now.duration_since(self.last_frame).as_secs_f32();
        self.last_frame = now;
        self.advance(delta)
    }

    /// Advance by a host-supplied delta (seconds)
    pub fn advance(&mut self, delta: f32) -> f32 {
        self.delta_time = delta.max(0.0);
        self.total_time += self.delta_time;
        self.frame_count += 1;
        self.delta_time
    }
    
    /// Get the time since the last frame in seconds
    pub fn delta_time(&self) -> f32 {
        self.delta_time
    }
    
    /// Get the total elapsed time since timer creation
    pub fn total_time(&self) -> f32 {
        self.total_time
    }
    
    /// Get the current frame count
    pub fn frame_count(&self) -> u64 {
        self.frame_count
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_advance_accumulates() {
        let mut timer = Timer::new();
        timer.advance(0.5);
        timer.advance(0.25);
        assert_eq!(timer.frame_count(), 2);
        assert!((timer.total_time() - 0.75).abs() < 1e-6);
        assert!((timer.delta_time() - 0.25).abs() < 1e-6);
    }

    #[test]
    fn test_negative_delta_is_clamped() {
        let mut timer = Timer::new();
        assert_eq!(timer.advance(-1.0), 0.0);
    }
}
