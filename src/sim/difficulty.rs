//! Difficulty signal: wave intensity, distance progression and spawn cadence

use log::info;
use rand::Rng;
use serde::{Deserialize, Serialize};

use super::obstacle::ObstacleKind;
use crate::settings::SpawnTuning;

/// Seconds per intensity wave
pub const WAVE_DURATION: f32 = 15.0;
/// Distance over which obstacle-type bands progress
const TYPE_PROGRESS_DISTANCE: f32 = 3000.0;

const EARLY_KINDS: &[ObstacleKind] = &[
    ObstacleKind::Box,
    ObstacleKind::Spike,
    ObstacleKind::Barrier,
    ObstacleKind::EnergyBarrier,
    ObstacleKind::TallWall,
    ObstacleKind::BarHigh,
];

const MID_KINDS: &[ObstacleKind] = &[
    ObstacleKind::Box,
    ObstacleKind::Wall,
    ObstacleKind::Spike,
    ObstacleKind::Barrier,
    ObstacleKind::LaserGrid,
    ObstacleKind::MovingBarrier,
    ObstacleKind::EnergyBarrier,
    ObstacleKind::DroneTurret,
    ObstacleKind::TallWall,
    ObstacleKind::BarLow,
    ObstacleKind::BarHigh,
    ObstacleKind::PlasmaGate,
];

const LATE_KINDS: &[ObstacleKind] = &[
    ObstacleKind::Box,
    ObstacleKind::Wall,
    ObstacleKind::Spike,
    ObstacleKind::Barrier,
    ObstacleKind::Drone,
    ObstacleKind::LaserGrid,
    ObstacleKind::MovingBarrier,
    ObstacleKind::RotatingLaser,
    ObstacleKind::EnergyBarrier,
    ObstacleKind::DroneTurret,
    ObstacleKind::PlasmaGate,
    ObstacleKind::TallWall,
    ObstacleKind::BarHigh,
];

/// Momentary intensity bucket
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum IntensityLevel {
    Calm,
    Moderate,
    Intense,
    Extreme,
}

impl IntensityLevel {
    pub fn from_intensity(intensity: f32) -> Self {
        if intensity < 0.3 {
            IntensityLevel::Calm
        } else if intensity < 0.6 {
            IntensityLevel::Moderate
        } else if intensity < 0.8 {
            IntensityLevel::Intense
        } else {
            IntensityLevel::Extreme
        }
    }
}

/// Long-run progression phase, driven by distance alone
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum DifficultyPhase {
    Easy,
    EasyPlus,
    Normal,
    Hard,
    Extreme,
}

impl DifficultyPhase {
    fn from_progression(p: f32) -> Self {
        if p < 0.2 {
            DifficultyPhase::Easy
        } else if p < 0.4 {
            DifficultyPhase::EasyPlus
        } else if p < 0.6 {
            DifficultyPhase::Normal
        } else if p < 0.8 {
            DifficultyPhase::Hard
        } else {
            DifficultyPhase::Extreme
        }
    }
}

/// Coin layouts
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum CoinPattern {
    Line,
    Zigzag,
    Arc,
    RiskReward,
}

/// Wave/progression state, updated once per step
#[derive(Debug, Clone, Serialize)]
pub struct Difficulty {
    pub distance: f32,
    pub wave_timer: f32,
    pub intensity: f32,
    pub phase: DifficultyPhase,
    pub combo_bonus: f32,
    pub safe_zone_remaining: f32,
    last_logged_section: u32,
}

impl Default for Difficulty {
    fn default() -> Self {
        Self {
            distance: 0.0,
            wave_timer: 0.0,
            intensity: 0.5,
            phase: DifficultyPhase::Easy,
            combo_bonus: 0.0,
            safe_zone_remaining: 0.0,
            last_logged_section: 0,
        }
    }
}

impl Difficulty {
    /// Fresh state pinned at a given intensity
    pub fn with_intensity(intensity: f32) -> Self {
        Self {
            intensity,
            ..Self::default()
        }
    }

    pub fn reset(&mut self) {
        *self = Self::default();
    }

    /// `distance_step` is how far the player moved this step (drains safe zones)
    pub fn update(&mut self, dt: f32, distance: f32, distance_step: f32, combo_multiplier: f32) {
        self.distance = distance;
        self.wave_timer += dt;

        let wave_progress = (self.wave_timer % WAVE_DURATION) / WAVE_DURATION;
        let wave = 0.3 + (wave_progress * std::f32::consts::PI).sin() * 0.6;

        let progression = ((distance / 1000.0 + 1.0).log10() / 5.0).min(1.0);
        self.intensity = (wave + progression * 0.3).min(1.0);
        self.phase = DifficultyPhase::from_progression(progression);
        self.combo_bonus = (combo_multiplier * 0.2).min(0.5);

        if self.safe_zone_remaining > 0.0 {
            self.safe_zone_remaining = (self.safe_zone_remaining - distance_step).max(0.0);
        }

        let section = (distance / 500.0) as u32;
        if section > self.last_logged_section {
            self.last_logged_section = section;
            info!(
                "difficulty {:?} at {:.0}m (intensity {:.2})",
                self.phase, distance, self.intensity
            );
        }
    }

    pub fn level(&self) -> IntensityLevel {
        IntensityLevel::from_intensity(self.intensity)
    }

    pub fn wave(&self) -> u32 {
        (self.wave_timer / WAVE_DURATION) as u32 + 1
    }

    /// Suppress obstacle spawns for the next `distance` units
    pub fn trigger_safe_zone(&mut self, distance: f32) {
        self.safe_zone_remaining = self.safe_zone_remaining.max(distance);
    }

    pub fn in_safe_zone(&self) -> bool {
        self.safe_zone_remaining > 0.0
    }

    /// Pick an obstacle kind from the band for the current distance
    pub fn pick_obstacle(&self, rng: &mut impl Rng) -> ObstacleKind {
        let progress = (self.distance / TYPE_PROGRESS_DISTANCE).min(1.0);
        let band = if progress < 0.3 {
            EARLY_KINDS
        } else if progress < 0.7 {
            MID_KINDS
        } else {
            LATE_KINDS
        };
        band[rng.random_range(0..band.len())]
    }

    pub fn pick_coin_pattern(&self, rng: &mut impl Rng) -> CoinPattern {
        let roll: f32 = rng.random();
        if self.intensity < 0.4 {
            if roll < 0.6 {
                CoinPattern::Line
            } else {
                CoinPattern::Zigzag
            }
        } else if self.intensity < 0.7 {
            [
                CoinPattern::Line,
                CoinPattern::Zigzag,
                CoinPattern::Arc,
                CoinPattern::RiskReward,
            ][((roll * 4.0) as usize).min(3)]
        } else if roll < 0.5 {
            CoinPattern::RiskReward
        } else {
            CoinPattern::Arc
        }
    }

    /// Seconds until the next obstacle spawn
    pub fn obstacle_interval(&self, spawn: &SpawnTuning, in_grace: bool, roll: f32) -> f32 {
        let base = if in_grace {
            spawn.grace_obstacle_interval
        } else {
            spawn.obstacle_interval
        };
        (base + roll * spawn.obstacle_interval_jitter)
            / (1.0 + self.intensity * 0.5)
            / (1.0 + self.combo_bonus * 0.2)
    }

    /// Seconds until the next coin pattern (calm waves get more coins)
    pub fn coin_interval(&self, spawn: &SpawnTuning, roll: f32) -> f32 {
        (spawn.coin_interval + roll * spawn.coin_interval_jitter)
            * (1.0 + (1.0 - self.intensity) * 0.3)
    }

    pub fn power_up_interval(&self, spawn: &SpawnTuning, roll: f32) -> f32 {
        (spawn.power_up_interval + roll * spawn.power_up_interval_jitter)
            / (1.0 + self.intensity * 0.25)
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use rand::SeedableRng;
    use rand_pcg::Pcg32;

    #[test]
    fn test_intensity_wave_shape() {
        let mut d = Difficulty::default();
        d.update(0.0, 0.0, 0.0, 1.0);
        assert!((d.intensity - 0.3).abs() < 1e-5);
        d.update(WAVE_DURATION / 2.0, 0.0, 0.0, 1.0);
        assert!((d.intensity - 0.9).abs() < 1e-4);
        assert_eq!(d.level(), IntensityLevel::Extreme);
    }

    #[test]
    fn test_distance_raises_intensity_and_phase() {
        let mut d = Difficulty::default();
        d.update(0.0, 1_000_000.0, 0.0, 1.0);
        assert!(d.intensity > 0.3);
        assert_ne!(d.phase, DifficultyPhase::Easy);
    }

    #[test]
    fn test_combo_bonus_capped() {
        let mut d = Difficulty::default();
        d.update(0.1, 0.0, 0.0, 3.0);
        assert!((d.combo_bonus - 0.5).abs() < 1e-6);
    }

    #[test]
    fn test_early_band_only_simple_kinds() {
        let d = Difficulty::default();
        let mut rng = Pcg32::seed_from_u64(7);
        for _ in 0..200 {
            assert!(EARLY_KINDS.contains(&d.pick_obstacle(&mut rng)));
        }
    }

    #[test]
    fn test_safe_zone_drains_with_distance() {
        let mut d = Difficulty::default();
        d.trigger_safe_zone(100.0);
        assert!(d.in_safe_zone());
        d.update(0.1, 60.0, 60.0, 1.0);
        assert!(d.in_safe_zone());
        d.update(0.1, 120.0, 60.0, 1.0);
        assert!(!d.in_safe_zone());
    }

    #[test]
    fn test_calm_waves_spawn_more_coins() {
        let spawn = SpawnTuning::default();
        let calm = Difficulty::with_intensity(0.1);
        let busy = Difficulty::with_intensity(1.0);
        assert!(calm.coin_interval(&spawn, 0.5) > busy.coin_interval(&spawn, 0.5));
        assert!(calm.obstacle_interval(&spawn, false, 0.5) > busy.obstacle_interval(&spawn, false, 0.5));
        assert!(busy.obstacle_interval(&spawn, true, 0.0) < busy.obstacle_interval(&spawn, false, 0.0));
    }
}
