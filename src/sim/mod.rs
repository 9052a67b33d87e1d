//! Deterministic simulation module
//!
//! All gameplay logic lives here. This module must be pure and deterministic:
//! - Caller-supplied `dt`, clamped before integration
//! - Seeded RNG only
//! - Stable iteration order (pool slot order, kinds in declaration order)
//! - No rendering, audio or platform dependencies

pub mod aabb;
pub mod collectible;
pub mod collision;
pub mod combo;
pub mod difficulty;
pub mod obstacle;
pub mod player;
pub mod pool;
pub mod protection;
pub mod scoring;
pub mod spawner;
pub mod state;
pub mod tick;
pub mod world_events;

pub use aabb::{Aabb, Pose, world_box};
pub use collectible::{Coin, PowerUp, PowerUpKind, PowerUpLight};
pub use collision::{CollisionEngine, Contact, SlideZone, box_collision, clearance_holds, slide_zone};
pub use combo::ComboTracker;
pub use difficulty::{CoinPattern, Difficulty, DifficultyPhase, IntensityLevel};
pub use obstacle::{Obstacle, ObstacleCategory, ObstacleKind, ObstacleMeta};
pub use player::{MotionState, PlayerController};
pub use pool::{Pool, Poolable};
pub use protection::{
    AbilityShield, CharacterStats, Collaborators, EnergyMode, Grapple, JumpSafety, ProtectionSources,
};
pub use spawner::{EntitySpawner, SpawnReport};
pub use state::{DeathReport, GameEvent, GameOverReport, RunPhase, RunState, RunStats, StatsSnapshot};
pub use tick::{ExternalFlags, RunObserver, StepOutput, TickInput, dispatch, tick, tick_observed};
pub use world_events::{WorldEventKind, WorldEventStatus, WorldEvents};
