//! Gameplay tuning
//!
//! Every balance constant the simulation uses lives here so a run can be
//! re-tuned from JSON without touching code. Sections deserialize with
//! `#[serde(default)]`, so a profile only needs the fields it overrides.

use std::path::Path;

use serde::{Deserialize, Serialize};
use thiserror::Error;

/// Errors produced while loading or validating a tuning profile
#[derive(Debug, Error)]
pub enum TuningError {
    #[error("failed to read tuning profile: {0}")]
    Io(#[from] std::io::Error),
    #[error("failed to parse tuning profile: {0}")]
    Parse(#[from] serde_json::Error),
    #[error("invalid tuning value for `{field}`: {reason}")]
    Invalid { field: &'static str, reason: String },
}

/// Difficulty preset levels
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize, Default)]
pub enum DifficultyPreset {
    Casual,
    #[default]
    Standard,
    Hardcore,
}

impl DifficultyPreset {
    pub fn as_str(&self) -> &'static str {
        match self {
            DifficultyPreset::Casual => "Casual",
            DifficultyPreset::Standard => "Standard",
            DifficultyPreset::Hardcore => "Hardcore",
        }
    }

    pub fn from_str(s: &str) -> Option<Self> {
        match s.to_lowercase().as_str() {
            "casual" | "easy" => Some(DifficultyPreset::Casual),
            "standard" | "normal" => Some(DifficultyPreset::Standard),
            "hardcore" | "hard" => Some(DifficultyPreset::Hardcore),
            _ => None,
        }
    }

    /// Multiplier applied to every damage value
    pub fn damage_scale(&self) -> f32 {
        match self {
            DifficultyPreset::Casual => 0.6,
            DifficultyPreset::Standard => 1.0,
            DifficultyPreset::Hardcore => 1.4,
        }
    }

    /// Multiplier applied to spawn intervals (smaller = denser)
    pub fn interval_scale(&self) -> f32 {
        match self {
            DifficultyPreset::Casual => 1.3,
            DifficultyPreset::Standard => 1.0,
            DifficultyPreset::Hardcore => 0.75,
        }
    }
}

/// Vertical motion, lane easing and slide timing
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(default)]
pub struct PhysicsTuning {
    /// Upward velocity applied by the first jump (units/s)
    pub jump_force: f32,
    /// Downward acceleration (units/s²)
    pub gravity: f32,
    /// Seconds a slide lasts unless cancelled
    pub slide_duration: f32,
    /// Exponential lane easing rate
    pub lane_change_speed: f32,
    /// Largest step integrated in one update (seconds)
    pub max_delta_time: f32,
    /// Y of the running surface
    pub base_height: f32,
    /// Tolerance for the grounded test
    pub ground_epsilon: f32,
    /// Force multiplier for every jump after the first
    pub extra_jump_penalty: f32,
    /// Fraction of `jump_force` re-applied when a grapple releases
    pub grapple_exit_factor: f32,
    /// Starting a slide mid-air sets velocity to `-gravity * factor`
    pub airborne_slide_factor: f32,
    /// Lane changes are refused while falling faster than this...
    pub hard_landing_velocity: f32,
    /// ...and closer than this to the ground
    pub hard_landing_height: f32,
    /// Snap to the lane center once within this distance
    pub lane_snap_epsilon: f32,
}

impl Default for PhysicsTuning {
    fn default() -> Self {
        Self {
            jump_force: 15.0,
            gravity: 60.0,
            slide_duration: 0.8,
            lane_change_speed: 6.0,
            max_delta_time: 0.05,
            base_height: 0.0,
            ground_epsilon: 0.01,
            extra_jump_penalty: 0.85,
            grapple_exit_factor: 0.5,
            airborne_slide_factor: 1.5,
            hard_landing_velocity: -5.0,
            hard_landing_height: 0.5,
            lane_snap_epsilon: 0.01,
        }
    }
}

/// Player body dimensions and health
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(default)]
pub struct PlayerTuning {
    pub width: f32,
    pub height: f32,
    pub depth: f32,
    /// Box height while sliding, measured from the box floor
    pub slide_height: f32,
    /// Box X half-width while sliding
    pub slide_half_width: f32,
    pub max_health: u32,
}

impl Default for PlayerTuning {
    fn default() -> Self {
        Self {
            width: 0.7,
            height: 1.8,
            depth: 0.7,
            slide_height: 0.4,
            slide_half_width: 0.35,
            max_health: 100,
        }
    }
}

/// Contact detection thresholds, debounce windows and damage values
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(default)]
pub struct CollisionTuning {
    /// Only obstacles within this Z distance of the player are tested
    pub check_window: f32,
    /// Jump clearance: player floor must be this far above the obstacle top
    pub jump_clearance_buffer: f32,
    /// Slide clearance: player top must be this far below the obstacle bottom
    pub slide_clearance_buffer: f32,
    /// 3D distance fallback for obstacles that allow neither jump nor slide
    pub distance_fallback: f32,
    /// Lateral/depth window of the instanced-obstacle fallback
    pub instanced_lateral_window: f32,
    /// Instanced fallback only applies while the player is below this height
    pub instanced_fallback_max_y: f32,
    /// World boxes thinner than this on any axis are treated as placeholders
    pub min_box_extent: f32,
    /// Global window after any damage/block during which contacts are ignored
    pub damage_cooldown: f64,
    /// Per-obstacle window that absorbs a repeated report of the same contact
    pub obstacle_debounce: f64,
    pub default_damage: u32,
    pub tall_wall_damage: u32,
    /// Damage for a slide-specialized obstacle when no impact severity applies
    pub sliding_damage: u32,
    /// Base of the head-impact damage curve for slide-specialized obstacles
    pub impact_base_damage: f32,
    /// Player feet below `box_center_y + slide_threshold` counts as ducking under
    pub slide_threshold: f32,
    /// Upper bound of the impact zone above the box center
    pub damage_zone_height: f32,
    pub damage_zone_margin: f32,
    pub hit_shake: f32,
    pub sliding_hit_shake: f32,
    /// Coins are only tested within this Z distance
    pub coin_window: f32,
    pub coin_pickup_radius: f32,
    pub power_up_radius: f32,
    /// Base magnet radius before character modifiers
    pub magnet_radius: f32,
    pub magnet_active_factor: f32,
    pub magnet_idle_factor: f32,
    pub magnet_idle_min: f32,
    /// Fraction of the remaining gap a magnetized coin closes per frame
    pub magnet_pull: f32,
}

impl Default for CollisionTuning {
    fn default() -> Self {
        Self {
            check_window: 120.0,
            jump_clearance_buffer: 0.2,
            slide_clearance_buffer: 0.1,
            distance_fallback: 1.5,
            instanced_lateral_window: 0.8,
            instanced_fallback_max_y: 1.0,
            min_box_extent: 0.01,
            damage_cooldown: 0.18,
            obstacle_debounce: 0.1,
            default_damage: 25,
            tall_wall_damage: 35,
            sliding_damage: 20,
            impact_base_damage: 15.0,
            slide_threshold: 1.0,
            damage_zone_height: 1.5,
            damage_zone_margin: 0.4,
            hit_shake: 1.0,
            sliding_hit_shake: 0.6,
            coin_window: 40.0,
            coin_pickup_radius: 2.2,
            power_up_radius: 2.5,
            magnet_radius: 8.0,
            magnet_active_factor: 2.5,
            magnet_idle_factor: 0.19,
            magnet_idle_min: 1.5,
            magnet_pull: 0.25,
        }
    }
}

/// Pool capacities and spawn cadence
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(default)]
pub struct SpawnTuning {
    /// Entities appear this far ahead of the player
    pub spawn_distance: f32,
    /// Obstacle spawns closer than this are refused
    pub min_safe_distance: f32,
    /// Entities are retired once this far behind the player
    pub retire_margin: f32,
    /// Slots per complex / slide-specialized obstacle kind
    pub complex_capacity: usize,
    pub box_capacity: usize,
    pub spike_capacity: usize,
    pub barrier_capacity: usize,
    pub coin_capacity: usize,
    pub power_up_capacity: usize,
    pub light_capacity: usize,
    pub obstacle_interval: f32,
    /// Obstacle interval while the start grace is running
    pub grace_obstacle_interval: f32,
    pub obstacle_interval_jitter: f32,
    pub coin_interval: f32,
    pub coin_interval_jitter: f32,
    pub power_up_interval: f32,
    pub power_up_interval_jitter: f32,
    /// Z spacing between coins of one pattern
    pub coin_spacing: f32,
}

impl Default for SpawnTuning {
    fn default() -> Self {
        Self {
            spawn_distance: 120.0,
            min_safe_distance: 50.0,
            retire_margin: 20.0,
            complex_capacity: 30,
            box_capacity: 30,
            spike_capacity: 30,
            barrier_capacity: 20,
            coin_capacity: 30,
            power_up_capacity: 8,
            light_capacity: 10,
            obstacle_interval: 1.8,
            grace_obstacle_interval: 1.2,
            obstacle_interval_jitter: 1.0,
            coin_interval: 1.5,
            coin_interval_jitter: 1.0,
            power_up_interval: 6.0,
            power_up_interval_jitter: 4.0,
            coin_spacing: 2.0,
        }
    }
}

/// Score awards and combo rules
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(default)]
pub struct ScoringTuning {
    /// Score per coin value point
    pub coin_score: u64,
    /// One-time award for sliding under a slide-specialized obstacle
    pub slide_bonus: u64,
    pub near_miss_points: u64,
    pub near_miss_min_lateral: f32,
    pub near_miss_max_lateral: f32,
    pub near_miss_depth: f32,
    pub destruction_bonus: u64,
    pub destruction_chain_window: f64,
    pub destruction_chain_cap: u32,
    pub combo_timeout: f64,
    pub coin_streak_window: f64,
    /// Distance of one scoring section
    pub section_length: f32,
    pub perfect_section_base: u64,
    pub health_pickup: u32,
}

impl Default for ScoringTuning {
    fn default() -> Self {
        Self {
            coin_score: 10,
            slide_bonus: 30,
            near_miss_points: 20,
            near_miss_min_lateral: 0.8,
            near_miss_max_lateral: 2.2,
            near_miss_depth: 0.5,
            destruction_bonus: 50,
            destruction_chain_window: 2.0,
            destruction_chain_cap: 5,
            combo_timeout: 2.0,
            coin_streak_window: 3.0,
            section_length: 500.0,
            perfect_section_base: 500,
            health_pickup: 25,
        }
    }
}

/// Invincibility source timings
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(default)]
pub struct ProtectionTuning {
    /// Grace window granted by each landing
    pub landing_grace: f32,
    /// Coins needed in one run to trigger energy mode
    pub energy_threshold: u32,
    pub energy_duration: f32,
    pub energy_speed_multiplier: f32,
    pub grapple_duration: f32,
    /// Invincibility kept after a grapple releases
    pub grapple_release_buffer: f32,
    pub grapple_cooldown: f32,
    pub ability_shield_cooldown: f32,
}

impl Default for ProtectionTuning {
    fn default() -> Self {
        Self {
            landing_grace: 0.5,
            energy_threshold: 50,
            energy_duration: 5.0,
            energy_speed_multiplier: 2.0,
            grapple_duration: 0.6,
            grapple_release_buffer: 0.2,
            grapple_cooldown: 8.0,
            ability_shield_cooldown: 15.0,
        }
    }
}

/// Run-level pacing
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(default)]
pub struct RunTuning {
    pub start_health: u32,
    /// Forward speed per 60 Hz frame at distance 0
    pub base_speed: f32,
    pub max_speed: f32,
    /// Distance over which speed ramps from base to max
    pub ramp_distance: f32,
    /// Obstacle checks are suppressed this long after a run starts
    pub start_grace: f32,
    /// ...and this long after a revive
    pub revive_grace: f32,
    /// Minimum sim time between stats snapshots
    pub stats_interval: f64,
    /// Physics step multiplier while time slow is active
    pub time_slow_factor: f32,
}

impl Default for RunTuning {
    fn default() -> Self {
        Self {
            start_health: 100,
            base_speed: 0.25,
            max_speed: 0.6,
            ramp_distance: 5000.0,
            start_grace: 0.8,
            revive_grace: 3.0,
            stats_interval: 0.1,
            time_slow_factor: 0.5,
        }
    }
}

/// Timed world events (meteor shower, lightning storm, speed-boost zone, coin rain)
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(default)]
pub struct EventTuning {
    pub enabled: bool,
    /// Sim seconds before the first event of a run
    pub first_event_at: f32,
    /// Gap between the end of one event and the next is `min_gap + roll * gap_jitter`
    pub min_gap: f32,
    pub gap_jitter: f32,
    pub meteor_interval: f32,
    pub lightning_interval: f32,
    pub coin_rain_interval: f32,
    /// Coins dropped per coin-rain burst
    pub coin_rain_burst: usize,
    /// Length of a speed-boost zone along the track
    pub boost_zone_length: f32,
    pub boost_speed_multiplier: f32,
    pub coin_rain_multiplier: f32,
}

impl Default for EventTuning {
    fn default() -> Self {
        Self {
            enabled: true,
            first_event_at: 30.0,
            min_gap: 20.0,
            gap_jitter: 30.0,
            meteor_interval: 2.0,
            lightning_interval: 1.5,
            coin_rain_interval: 0.8,
            coin_rain_burst: 5,
            boost_zone_length: 200.0,
            boost_speed_multiplier: 1.3,
            coin_rain_multiplier: 1.5,
        }
    }
}

/// Complete tuning profile
#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
#[serde(default)]
pub struct Tuning {
    pub physics: PhysicsTuning,
    pub player: PlayerTuning,
    pub collision: CollisionTuning,
    pub spawn: SpawnTuning,
    pub scoring: ScoringTuning,
    pub protection: ProtectionTuning,
    pub run: RunTuning,
    pub events: EventTuning,
}

impl Tuning {
    /// Create tuning from a preset (applies preset scaling over defaults)
    pub fn from_preset(preset: DifficultyPreset) -> Self {
        let mut tuning = Self::default();
        tuning.apply_preset(preset);
        tuning
    }

    /// Scale damage and spawn cadence by a preset
    pub fn apply_preset(&mut self, preset: DifficultyPreset) {
        let damage = preset.damage_scale();
        let scale = |v: u32| ((v as f32) * damage).round().max(1.0) as u32;
        self.collision.default_damage = scale(self.collision.default_damage);
        self.collision.tall_wall_damage = scale(self.collision.tall_wall_damage);
        self.collision.sliding_damage = scale(self.collision.sliding_damage);
        self.collision.impact_base_damage *= damage;

        let interval = preset.interval_scale();
        self.spawn.obstacle_interval *= interval;
        self.spawn.grace_obstacle_interval *= interval;
    }

    /// Parse and validate a JSON tuning profile
    pub fn from_json(json: &str) -> Result<Self, TuningError> {
        let tuning: Tuning = serde_json::from_str(json)?;
        tuning.validate()?;
        Ok(tuning)
    }

    /// Read, parse and validate a JSON tuning file
    pub fn from_path(path: impl AsRef<Path>) -> Result<Self, TuningError> {
        let json = std::fs::read_to_string(path)?;
        Self::from_json(&json)
    }

    /// Serialize to pretty JSON
    pub fn to_json(&self) -> Result<String, TuningError> {
        Ok(serde_json::to_string_pretty(self)?)
    }

    /// Reject values the simulation cannot run with
    pub fn validate(&self) -> Result<(), TuningError> {
        fn positive(field: &'static str, v: f32) -> Result<(), TuningError> {
            if v > 0.0 && v.is_finite() {
                Ok(())
            } else {
                Err(TuningError::Invalid {
                    field,
                    reason: format!("must be a positive number, got {v}"),
                })
            }
        }
        fn non_empty(field: &'static str, v: usize) -> Result<(), TuningError> {
            if v > 0 {
                Ok(())
            } else {
                Err(TuningError::Invalid {
                    field,
                    reason: "pool capacity must be at least 1".to_string(),
                })
            }
        }

        positive("physics.gravity", self.physics.gravity)?;
        positive("physics.jump_force", self.physics.jump_force)?;
        positive("physics.max_delta_time", self.physics.max_delta_time)?;
        positive("physics.lane_change_speed", self.physics.lane_change_speed)?;
        positive("physics.slide_duration", self.physics.slide_duration)?;
        positive("player.height", self.player.height)?;
        positive("player.slide_height", self.player.slide_height)?;
        if self.player.slide_height >= self.player.height {
            return Err(TuningError::Invalid {
                field: "player.slide_height",
                reason: "slide box must be shorter than the standing box".to_string(),
            });
        }
        if self.player.max_health == 0 {
            return Err(TuningError::Invalid {
                field: "player.max_health",
                reason: "must be at least 1".to_string(),
            });
        }
        positive("collision.check_window", self.collision.check_window)?;
        if self.events.enabled {
            positive("events.min_gap", self.events.min_gap)?;
            positive("events.meteor_interval", self.events.meteor_interval)?;
            positive("events.lightning_interval", self.events.lightning_interval)?;
            positive("events.coin_rain_interval", self.events.coin_rain_interval)?;
        }
        positive("spawn.spawn_distance", self.spawn.spawn_distance)?;
        non_empty("spawn.complex_capacity", self.spawn.complex_capacity)?;
        non_empty("spawn.box_capacity", self.spawn.box_capacity)?;
        non_empty("spawn.spike_capacity", self.spawn.spike_capacity)?;
        non_empty("spawn.barrier_capacity", self.spawn.barrier_capacity)?;
        non_empty("spawn.coin_capacity", self.spawn.coin_capacity)?;
        non_empty("spawn.power_up_capacity", self.spawn.power_up_capacity)?;
        if self.run.base_speed > self.run.max_speed {
            return Err(TuningError::Invalid {
                field: "run.base_speed",
                reason: format!(
                    "base speed {} exceeds max speed {}",
                    self.run.base_speed, self.run.max_speed
                ),
            });
        }
        if self.run.start_health == 0 || self.run.start_health > self.player.max_health {
            return Err(TuningError::Invalid {
                field: "run.start_health",
                reason: format!("must be in 1..={}", self.player.max_health),
            });
        }
        Ok(())
    }
}

/// Per-character gameplay modifiers
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct CharacterProfile {
    pub id: String,
    /// Forward speed multiplier
    pub speed: f32,
    /// Jump velocity multiplier
    pub jump_height: f32,
    /// Coin magnet radius multiplier
    pub magnet_radius: f32,
    /// Jump charges available before touching the ground
    pub max_jumps: u32,
}

impl Default for CharacterProfile {
    fn default() -> Self {
        Self {
            id: "default".to_string(),
            speed: 1.0,
            jump_height: 1.0,
            magnet_radius: 1.0,
            max_jumps: 1,
        }
    }
}

impl CharacterProfile {
    /// Look up a built-in character by id
    pub fn named(id: &str) -> Option<Self> {
        let (speed, jump_height, magnet_radius) = match id {
            "default" => (1.0, 1.0, 1.0),
            "eve" => (1.05, 1.0, 1.0),
            "kachujin" => (1.0, 1.08, 1.0),
            "swat" => (1.0, 1.0, 1.1),
            "vanguard" => (1.03, 1.03, 1.02),
            _ => return None,
        };
        Some(Self {
            id: id.to_string(),
            speed,
            jump_height,
            magnet_radius,
            max_jumps: 1,
        })
    }
}
