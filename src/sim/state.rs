//! Run state and the signals the simulation emits
//!
//! Everything one run owns lives in [`RunState`]. The external world only
//! sees [`GameEvent`]s, [`StatsSnapshot`]s and the [`GameOverReport`].

use glam::Vec3;
use log::{info, warn};
use serde::{Deserialize, Serialize};

use super::collectible::PowerUpKind;
use super::collision::CollisionEngine;
use super::combo::ComboTracker;
use super::difficulty::{Difficulty, DifficultyPhase, IntensityLevel};
use super::obstacle::ObstacleKind;
use super::player::PlayerController;
use super::protection::{Collaborators, DangerZone, GrappleStatus, LandingZone, ProtectionSources};
use super::spawner::EntitySpawner;
use super::world_events::{WorldEventKind, WorldEventStatus, WorldEvents};
use crate::settings::{CharacterProfile, Tuning};

/// Current phase of a run
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
pub enum RunPhase {
    Running,
    Paused,
    /// Health reached zero; only `start_run` or `revive` leave this phase
    GameOver,
}

/// Running totals for the current run
#[derive(Debug, Clone, Copy, PartialEq, Default, Serialize)]
pub struct RunStats {
    pub score: u64,
    pub coins: u64,
    /// Units travelled along -z
    pub distance: f32,
    pub health: u32,
    /// Forward speed per 60 Hz frame, after all multipliers
    pub speed: f32,
}

impl RunStats {
    pub fn new(health: u32) -> Self {
        Self {
            health,
            ..Default::default()
        }
    }
}

/// What killed the player, for post-mortem reporting
#[derive(Debug, Clone, Copy, PartialEq, Serialize)]
pub struct DeathReport {
    pub cause: ObstacleKind,
    pub position: Vec3,
    pub speed: f32,
}

/// Final stats handed to `on_game_over`
#[derive(Debug, Clone, PartialEq, Serialize)]
pub struct GameOverReport {
    pub score: u64,
    pub coins: u64,
    pub distance: f32,
    pub max_combo: u32,
    pub perfect_section_total: u64,
    /// Sim seconds survived
    pub elapsed: f64,
    pub character: String,
    pub death: Option<DeathReport>,
}

/// Events emitted by a simulation step, in the order they happened
#[derive(Debug, Clone, PartialEq, Serialize)]
#[serde(tag = "type", rename_all = "snake_case")]
pub enum GameEvent {
    RunStarted { seed: u64 },
    Revived { health: u32 },
    Paused,
    Resumed,
    Jumped { jump_count: u32 },
    /// A jump ended on the ground; landing grace starts here
    Landed,
    SlideStarted,
    LaneChanged { lane: usize },
    GrappleLaunched,
    GrappleReleased { lane: usize },
    AbilityShieldArmed,
    CoinCollected { value: u64, total: u64 },
    PowerUpCollected { kind: PowerUpKind },
    /// A protection-granting power-up absorbed a hit and ended
    PowerUpEnded { kind: PowerUpKind },
    Damaged {
        kind: ObstacleKind,
        damage: u32,
        health: u32,
        shake: f32,
        hit_sound: &'static str,
    },
    Blocked { kind: ObstacleKind },
    AbilityShieldConsumed,
    ObstacleDestroyed { kind: ObstacleKind, bonus: u64, chain: u32 },
    SlideBonus { kind: ObstacleKind, points: u64 },
    NearMiss { kind: ObstacleKind, points: u64 },
    ComboBroken { lost: u32 },
    PerfectSection { bonus: u64 },
    EnergyModeActivated,
    WorldEventStarted { kind: WorldEventKind },
    WorldEventEnded { kind: WorldEventKind },
    /// Health reached zero; emitted once per death
    Died { death: DeathReport },
}

/// Ability and collaborator state for the HUD
#[derive(Debug, Clone, Copy, PartialEq, Serialize)]
pub struct AbilityStates {
    pub shield_active: bool,
    pub shield_cooldown: f32,
    pub energy_mode: bool,
    pub energy_coins: u32,
    pub grapple: GrappleStatus,
}

/// Per-frame HUD/analytics view of the run
#[derive(Debug, Clone, PartialEq, Serialize)]
pub struct StatsSnapshot {
    pub time: f64,
    pub score: u64,
    pub coins: u64,
    pub distance: f32,
    pub health: u32,
    pub max_health: u32,
    pub speed: f32,
    pub combo: u32,
    pub multiplier: f32,
    pub difficulty_phase: DifficultyPhase,
    pub intensity: IntensityLevel,
    pub wave: u32,
    pub danger_zones: Vec<DangerZone>,
    pub predicted_landing: Option<LandingZone>,
    pub grapple: GrappleStatus,
    pub player_lane: usize,
    pub ability_states: AbilityStates,
    pub protection: ProtectionSources,
    pub world_event: Option<WorldEventStatus>,
}

impl StatsSnapshot {
    pub fn to_json(&self) -> Result<String, serde_json::Error> {
        serde_json::to_string(self)
    }
}

/// Complete state of one run (deterministic for a given seed and input stream)
#[derive(Debug)]
pub struct RunState {
    /// Run seed for reproducibility
    pub seed: u64,
    pub tuning: Tuning,
    pub character: CharacterProfile,
    pub phase: RunPhase,
    /// Sim seconds since the run started (time slow included)
    pub time: f64,
    pub stats: RunStats,
    pub player: PlayerController,
    pub spawner: EntitySpawner,
    pub difficulty: Difficulty,
    pub world_events: WorldEvents,
    pub combo: ComboTracker,
    pub collaborators: Collaborators,
    pub collision: CollisionEngine,
    /// Obstacle checks are suppressed while this is positive
    pub grace_remaining: f32,
    /// Camera shake magnitude, decays every step
    pub screen_shake: f32,
    pub revives: u32,
    pub(crate) last_stats_at: Option<f64>,
    /// Lifecycle events queued outside a step, drained by the next `tick`
    pub(crate) pending: Vec<GameEvent>,
}

impl RunState {
    /// Create a run with the default character and built-in collaborators.
    /// An invalid tuning profile falls back to defaults.
    pub fn new(seed: u64, tuning: Tuning) -> Self {
        Self::with_character(seed, tuning, CharacterProfile::default())
    }

    pub fn with_character(seed: u64, tuning: Tuning, character: CharacterProfile) -> Self {
        let tuning = checked(tuning);
        let collaborators = Collaborators::builtin(&tuning.protection, character.clone());
        Self::with_collaborators(seed, tuning, character, collaborators)
    }

    /// Create a run backed by externally supplied collaborators
    pub fn with_collaborators(
        seed: u64,
        tuning: Tuning,
        character: CharacterProfile,
        collaborators: Collaborators,
    ) -> Self {
        let tuning = checked(tuning);
        let mut state = Self {
            seed,
            character,
            phase: RunPhase::Running,
            time: 0.0,
            stats: RunStats::new(tuning.run.start_health),
            player: PlayerController::new(&tuning.physics, &tuning.player),
            spawner: EntitySpawner::new(&tuning.spawn, seed),
            difficulty: Difficulty::default(),
            world_events: WorldEvents::new(&tuning.events, seed),
            combo: ComboTracker::new(&tuning.scoring),
            collaborators,
            collision: CollisionEngine::default(),
            grace_remaining: 0.0,
            screen_shake: 0.0,
            revives: 0,
            last_stats_at: None,
            pending: Vec::new(),
            tuning,
        };
        state.start_run();
        state
    }

    /// Full reset to a fresh run with the same seed
    pub fn start_run(&mut self) {
        self.phase = RunPhase::Running;
        self.time = 0.0;
        self.stats = RunStats::new(self.tuning.run.start_health);
        self.stats.speed = self.tuning.run.base_speed;
        self.player.reset();
        self.player.position.z = 0.0;
        self.player.refresh_world_box();
        self.spawner.reset(self.seed);
        self.difficulty.reset();
        self.world_events.reset(self.seed);
        self.combo.reset();
        self.collaborators.reset();
        self.collision.reset();
        self.grace_remaining = self.tuning.run.start_grace;
        self.screen_shake = 0.0;
        self.revives = 0;
        self.last_stats_at = None;
        self.pending.clear();
        self.pending.push(GameEvent::RunStarted { seed: self.seed });
        info!("run started (seed {}, character {})", self.seed, self.character.id);
    }

    /// Continue a finished run: health restored, player re-centered, longer grace.
    /// Returns false unless the run is over.
    pub fn revive(&mut self) -> bool {
        if self.phase != RunPhase::GameOver {
            return false;
        }
        self.phase = RunPhase::Running;
        self.stats.health = self.tuning.run.start_health;
        self.player.reset();
        self.collision.last_death = None;
        self.collision.last_damage_at = None;
        self.grace_remaining = self.tuning.run.revive_grace;
        self.revives += 1;
        self.pending.push(GameEvent::Revived {
            health: self.stats.health,
        });
        info!(
            "revived at distance {:.0} (revive #{})",
            self.stats.distance, self.revives
        );
        true
    }

    #[inline]
    pub fn in_grace(&self) -> bool {
        self.grace_remaining > 0.0
    }

    pub fn protection(&self, shield_pickup: bool) -> ProtectionSources {
        ProtectionSources::gather(shield_pickup, &self.collaborators)
    }

    pub fn death_report(&self) -> Option<DeathReport> {
        self.collision.last_death
    }

    /// Final stats, available once the run is over
    pub fn game_over_report(&self) -> Option<GameOverReport> {
        (self.phase == RunPhase::GameOver).then(|| GameOverReport {
            score: self.stats.score,
            coins: self.stats.coins,
            distance: self.stats.distance,
            max_combo: self.combo.max_combo,
            perfect_section_total: self.combo.perfect_section_total,
            elapsed: self.time,
            character: self.character.id.clone(),
            death: self.collision.last_death,
        })
    }

    pub fn snapshot(&self, shield_pickup: bool) -> StatsSnapshot {
        let safety = &self.collaborators.jump_safety;
        let grapple = self.collaborators.grapple.status();
        StatsSnapshot {
            time: self.time,
            score: self.stats.score,
            coins: self.stats.coins,
            distance: self.stats.distance,
            health: self.stats.health,
            max_health: self.tuning.player.max_health,
            speed: self.stats.speed,
            combo: self.combo.combo,
            multiplier: self.combo.multiplier,
            difficulty_phase: self.difficulty.phase,
            intensity: self.difficulty.level(),
            wave: self.difficulty.wave(),
            danger_zones: safety.danger_zones().to_vec(),
            predicted_landing: safety.predicted_landing(),
            grapple,
            player_lane: self.player.lane,
            ability_states: AbilityStates {
                shield_active: self.collaborators.ability_shield.is_shielded(),
                shield_cooldown: self.collaborators.ability_shield.cooldown_remaining(),
                energy_mode: self.collaborators.energy.is_invincible(),
                energy_coins: self.collaborators.energy.coins_collected(),
                grapple,
            },
            protection: self.protection(shield_pickup),
            world_event: self.world_events.status(),
        }
    }
}

fn checked(tuning: Tuning) -> Tuning {
    match tuning.validate() {
        Ok(()) => tuning,
        Err(e) => {
            warn!("{e}; using default tuning");
            Tuning::default()
        }
    }
}
