//! Lane Runner - endless-runner simulation core
//!
//! Core modules:
//! - `sim`: Frame-stepped simulation (player motion, pooled spawning, collisions)
//! - `settings`: Data-driven tuning (every gameplay constant lives here)
//!
//! Rendering, audio, UI and persistence are external: the core consumes a
//! step `dt` plus a few flags and emits events and snapshots.

pub mod settings;
pub mod sim;

pub use settings::{CharacterProfile, DifficultyPreset, Tuning, TuningError};

/// Game configuration constants
pub mod consts {
    /// Nominal frame step used by the headless driver and tests (60 Hz)
    pub const SIM_DT: f32 = 1.0 / 60.0;

    /// Number of lanes in the corridor
    pub const LANE_COUNT: usize = 3;
    /// Lane the player starts in (center)
    pub const CENTER_LANE: usize = 1;
    /// World X of each lane center
    pub const LANE_POSITIONS: [f32; LANE_COUNT] = [-3.0, 0.0, 3.0];

    /// Speed units are "per 60 Hz frame", scaled to per-second with this
    pub const FRAMES_PER_SECOND: f32 = 60.0;
}

/// World X of a lane center (out-of-range lanes clamp to the nearest edge lane)
#[inline]
pub fn lane_x(lane: usize) -> f32 {
    consts::LANE_POSITIONS[lane.min(consts::LANE_COUNT - 1)]
}

/// Nearest lane for a world X (used when an external system hands control back)
#[inline]
pub fn lane_for_x(x: f32) -> usize {
    if x < -1.5 {
        0
    } else if x > 1.5 {
        2
    } else {
        1
    }
}

/// Frame-rate independent exponential smoothing factor: `1 - e^(-k*dt)`
#[inline]
pub fn smoothing_alpha(rate: f32, dt: f32) -> f32 {
    1.0 - (-rate * dt).exp()
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_lane_x_clamps() {
        assert_eq!(lane_x(0), -3.0);
        assert_eq!(lane_x(1), 0.0);
        assert_eq!(lane_x(2), 3.0);
        assert_eq!(lane_x(7), 3.0);
    }

    #[test]
    fn test_lane_for_x() {
        assert_eq!(lane_for_x(-3.0), 0);
        assert_eq!(lane_for_x(0.4), 1);
        assert_eq!(lane_for_x(2.9), 2);
    }

    #[test]
    fn test_smoothing_alpha_bounds() {
        assert_eq!(smoothing_alpha(6.0, 0.0), 0.0);
        let a = smoothing_alpha(6.0, 1.0 / 60.0);
        assert!(a > 0.0 && a < 1.0);
        // Two half steps compose to one full step
        let half = smoothing_alpha(6.0, 1.0 / 120.0);
        let composed = 1.0 - (1.0 - half) * (1.0 - half);
        assert!((composed - a).abs() < 1e-5);
    }
}
