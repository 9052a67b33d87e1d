//! Near-miss and destructible-obstacle bonuses

use glam::Vec3;

use super::obstacle::{Obstacle, ObstacleKind};
use crate::settings::ScoringTuning;

/// A near miss that should be awarded
#[derive(Debug, Clone, Copy, PartialEq)]
pub struct NearMiss {
    pub kind: ObstacleKind,
    pub lateral: f32,
    pub points: u64,
}

/// Awards points for passing an obstacle in an adjacent lane
#[derive(Debug, Clone, Default)]
pub struct NearMissScorer;

impl NearMissScorer {
    /// Check one obstacle; latches `near_miss_checked` so each instance pays once
    pub fn check(&self, tuning: &ScoringTuning, player: Vec3, obstacle: &mut Obstacle) -> Option<NearMiss> {
        if !obstacle.is_collidable() || obstacle.near_miss_checked {
            return None;
        }
        let center = obstacle.world_box.center();
        if (center.z - player.z).abs() >= tuning.near_miss_depth {
            return None;
        }
        let lateral = (center.x - player.x).abs();
        if lateral <= tuning.near_miss_min_lateral || lateral >= tuning.near_miss_max_lateral {
            return None;
        }
        obstacle.near_miss_checked = true;
        Some(NearMiss {
            kind: obstacle.kind,
            lateral,
            points: tuning.near_miss_points,
        })
    }
}

/// Chained bonus for smashing destructible obstacles while protected
#[derive(Debug, Clone, Default)]
pub struct DestructibleScorer {
    chain: u32,
    last_at: Option<f64>,
}

impl DestructibleScorer {
    /// Register a destruction and return its bonus, or `None` for sturdy kinds
    pub fn on_destroyed(&mut self, tuning: &ScoringTuning, kind: ObstacleKind, now: f64) -> Option<u64> {
        if !kind.is_destructible() {
            return None;
        }
        let chained = self
            .last_at
            .is_some_and(|t| now - t < tuning.destruction_chain_window);
        self.chain = if chained { self.chain + 1 } else { 1 };
        self.last_at = Some(now);
        Some(tuning.destruction_bonus * self.chain.min(tuning.destruction_chain_cap) as u64)
    }

    pub fn chain(&self) -> u32 {
        self.chain
    }

    pub fn reset(&mut self) {
        self.chain = 0;
        self.last_at = None;
    }
}
