//! Contact detection and resolution
//!
//! Detection is a set of pure functions over world boxes and metadata.
//! [`CollisionEngine::step`] runs them against every live entity near the
//! player and resolves the outcome: blocked, damaged, slid under, collected.
//!
//! Obstacles take one of three paths by category:
//! - instanced (box/spike/barrier): box test, then a small-footprint fallback;
//!   degenerate world boxes are skipped outright
//! - complex (wall/drone/lasers): box test, then a 3D distance fallback when
//!   neither clearance rule could ever apply
//! - sliding (energy barrier, turret, plasma gate, bars, tall wall): player
//!   height is compared against the hit volume center, with a one-time bonus
//!   for a successful slide

use glam::Vec3;
use log::{debug, info};

use super::aabb::Aabb;
use super::combo::ComboTracker;
use super::collectible::PowerUpKind;
use super::obstacle::{Obstacle, ObstacleCategory, ObstacleKind, ObstacleMeta};
use super::player::PlayerController;
use super::pool::Poolable;
use super::protection::{Collaborators, ProtectionSources};
use super::scoring::{DestructibleScorer, NearMissScorer};
use super::spawner::EntitySpawner;
use super::state::{DeathReport, GameEvent, RunStats};
use super::tick::ExternalFlags;
use crate::settings::{CollisionTuning, Tuning};

/// Sliding under a bar counts as a near miss at this distance for the combo
const SLIDE_UNDER_COMBO_DISTANCE: f32 = 0.5;

/// Where the player's feet are relative to a sliding obstacle's hit volume
#[derive(Debug, Clone, Copy, PartialEq)]
pub enum SlideZone {
    /// Low enough to pass beneath
    SafeSlide,
    /// Head-height band; `severity` runs 0..=1 from bottom to top
    Impact { severity: f32 },
    /// Clear above the volume
    Above,
}

/// Outcome of testing one obstacle
#[derive(Debug, Clone, Copy, PartialEq)]
pub enum Contact {
    None,
    /// Successful slide under a sliding obstacle
    SlidUnder,
    Hit { damage: u32, shake: f32 },
}

/// Player motion flags relevant to clearance
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default)]
pub struct Stance {
    pub jumping: bool,
    pub sliding: bool,
}

impl Stance {
    pub fn of(player: &PlayerController) -> Self {
        Self {
            jumping: player.is_jumping,
            sliding: player.is_sliding,
        }
    }
}

/// An otherwise-overlapping pair is excused by jumping over or sliding under
pub fn clearance_holds(
    player: &Aabb,
    obstacle: &Aabb,
    meta: &ObstacleMeta,
    stance: Stance,
    tuning: &CollisionTuning,
) -> bool {
    let jumped = stance.jumping
        && meta.can_jump_over
        && player.min.y > obstacle.max.y + tuning.jump_clearance_buffer;
    let slid = stance.sliding
        && meta.can_slide_under
        && player.max.y < obstacle.min.y - tuning.slide_clearance_buffer;
    jumped || slid
}

/// AABB overlap not excused by a clearance rule
pub fn box_collision(
    player: &Aabb,
    obstacle: &Aabb,
    meta: &ObstacleMeta,
    stance: Stance,
    tuning: &CollisionTuning,
) -> bool {
    player.intersects(obstacle) && !clearance_holds(player, obstacle, meta, stance, tuning)
}

pub fn slide_zone(player_y: f32, box_center_y: f32, tuning: &CollisionTuning) -> SlideZone {
    let lower = box_center_y + tuning.slide_threshold;
    let upper = box_center_y + tuning.damage_zone_height + tuning.damage_zone_margin;
    if player_y < lower {
        SlideZone::SafeSlide
    } else if player_y > upper {
        SlideZone::Above
    } else {
        SlideZone::Impact {
            severity: ((player_y - lower) / (upper - lower)).clamp(0.0, 1.0),
        }
    }
}

/// Damage for a head-height impact
pub fn impact_damage(severity: f32, tuning: &CollisionTuning) -> u32 {
    (tuning.impact_base_damage * (0.5 + severity * 1.5)).ceil() as u32
}

/// Instanced and complex obstacles
pub fn generic_contact(
    player: &PlayerController,
    obstacle: &Obstacle,
    tuning: &CollisionTuning,
) -> Contact {
    let stance = Stance::of(player);
    let pbox = &player.world_box;
    let obox = &obstacle.world_box;
    let meta = &obstacle.meta;

    let mut hit = box_collision(pbox, obox, meta, stance, tuning);
    if !hit {
        hit = match obstacle.kind.category() {
            ObstacleCategory::Instanced => {
                let dx = (player.position.x - obstacle.position.x).abs();
                let dz = (player.position.z - obstacle.position.z).abs();
                !meta.can_slide_under
                    && dx < tuning.instanced_lateral_window
                    && dz < tuning.instanced_lateral_window
                    && player.position.y < tuning.instanced_fallback_max_y
            }
            _ => meta.forbids_clearance()
                && pbox.center().distance(obox.center()) < tuning.distance_fallback,
        };
    }

    if hit {
        Contact::Hit {
            damage: tuning.default_damage,
            shake: tuning.hit_shake,
        }
    } else {
        Contact::None
    }
}

/// Slide-specialized obstacles
pub fn sliding_contact(
    player: &PlayerController,
    obstacle: &Obstacle,
    tuning: &CollisionTuning,
) -> Contact {
    let pbox = &player.world_box;
    let obox = &obstacle.world_box;
    if !pbox.overlaps_xz(obox) {
        return Contact::None;
    }

    let zone = slide_zone(player.position.y, obox.center().y, tuning);
    if player.is_sliding && obstacle.meta.can_slide_under && zone == SlideZone::SafeSlide {
        return Contact::SlidUnder;
    }

    if !box_collision(pbox, obox, &obstacle.meta, Stance::of(player), tuning) {
        return Contact::None;
    }

    let (damage, shake) = match (obstacle.kind, zone) {
        (ObstacleKind::TallWall, _) => (tuning.tall_wall_damage, tuning.hit_shake),
        (_, SlideZone::Impact { severity }) => (impact_damage(severity, tuning), tuning.sliding_hit_shake),
        _ => (tuning.sliding_damage, tuning.sliding_hit_shake),
    };
    Contact::Hit { damage, shake }
}

/// Dispatch by category
pub fn obstacle_contact(
    player: &PlayerController,
    obstacle: &Obstacle,
    tuning: &CollisionTuning,
) -> Contact {
    match obstacle.kind.category() {
        ObstacleCategory::Sliding => sliding_contact(player, obstacle, tuning),
        _ => generic_contact(player, obstacle, tuning),
    }
}

/// Magnet radius for this step
pub fn magnet_radius(base: f32, magnet_active: bool, tuning: &CollisionTuning) -> f32 {
    if magnet_active {
        base * tuning.magnet_active_factor
    } else {
        (base * tuning.magnet_idle_factor).max(tuning.magnet_idle_min)
    }
}

/// Everything one collision pass reads or mutates
pub struct CollisionWorld<'a> {
    pub tuning: &'a Tuning,
    pub now: f64,
    pub player: &'a mut PlayerController,
    pub spawner: &'a mut EntitySpawner,
    pub collaborators: &'a mut Collaborators,
    pub combo: &'a mut ComboTracker,
    pub stats: &'a mut RunStats,
    pub flags: ExternalFlags,
    /// Coin value multiplier from the running world event
    pub coin_multiplier: f32,
    pub protection: ProtectionSources,
    /// False during start/revive grace: obstacles are not tested
    pub check_obstacles: bool,
    pub events: &'a mut Vec<GameEvent>,
}

/// Debounce state and bonus trackers that persist across steps
#[derive(Debug, Clone, Default)]
pub struct CollisionEngine {
    /// Sim time of the last damage or block
    pub last_damage_at: Option<f64>,
    /// Death metadata of the run, set once
    pub last_death: Option<DeathReport>,
    pub destructible: DestructibleScorer,
    near_miss: NearMissScorer,
}

impl CollisionEngine {
    pub fn reset(&mut self) {
        *self = Self::default();
    }

    /// Run every contact test for this step
    pub fn step(&mut self, world: &mut CollisionWorld) {
        if world.check_obstacles {
            self.check_obstacles(world);
        }
        self.collect_coins(world);
        self.collect_power_ups(world);
    }

    fn check_obstacles(&mut self, world: &mut CollisionWorld) {
        let tuning = &world.tuning.collision;
        let player_z = world.player.position.z;
        let mut contact: Option<(ObstacleKind, usize, u32, f32)> = None;

        'scan: for kind in ObstacleKind::ALL {
            let pool = world.spawner.pool_mut(kind);
            for obstacle in pool.iter_active_mut() {
                if !obstacle.is_collidable() || (obstacle.position.z - player_z).abs() > tuning.check_window {
                    continue;
                }
                obstacle.refresh_world_box();
                if kind.category() == ObstacleCategory::Instanced
                    && obstacle.world_box.is_degenerate(tuning.min_box_extent)
                {
                    debug!("skipping degenerate {} box at {}", kind.as_str(), obstacle.position);
                    continue;
                }

                match obstacle_contact(world.player, obstacle, tuning) {
                    Contact::Hit { damage, shake } => {
                        contact = Some((kind, obstacle.pool_index, damage, shake));
                        break 'scan;
                    }
                    Contact::SlidUnder => {
                        if !obstacle.slide_reward_given {
                            obstacle.slide_reward_given = true;
                            let points = world.tuning.scoring.slide_bonus;
                            world.stats.score += points;
                            world.combo.on_near_miss(world.now, SLIDE_UNDER_COMBO_DISTANCE);
                            world.events.push(GameEvent::SlideBonus { kind, points });
                        }
                    }
                    Contact::None => {
                        let player_pos = world.player.position;
                        if let Some(miss) = self.near_miss.check(&world.tuning.scoring, player_pos, obstacle) {
                            world.stats.score += miss.points;
                            world.combo.on_near_miss(world.now, miss.lateral);
                            world.events.push(GameEvent::NearMiss {
                                kind,
                                points: miss.points,
                            });
                        }
                    }
                }
            }
        }

        if let Some((kind, idx, damage, shake)) = contact {
            self.resolve_hit(world, kind, idx, damage, shake);
        }
    }

    /// Apply a detected obstacle contact through both debounce layers
    fn resolve_hit(&mut self, world: &mut CollisionWorld, kind: ObstacleKind, idx: usize, damage: u32, shake: f32) {
        let tuning = &world.tuning.collision;
        let now = world.now;

        if self
            .last_damage_at
            .is_some_and(|t| now - t < tuning.damage_cooldown)
        {
            return;
        }
        let Some(obstacle) = world.spawner.pool_mut(kind).get_mut(idx) else {
            return;
        };
        if obstacle
            .last_hit_at
            .is_some_and(|t| now - t < tuning.obstacle_debounce)
        {
            return;
        }
        obstacle.last_hit_at = Some(now);
        let position = obstacle.position;
        let hit_sound = obstacle.meta.hit_sound;
        obstacle.deactivate();
        self.last_damage_at = Some(now);

        if world.protection.is_invincible() {
            debug!("{} blocked by {:?}", kind.as_str(), world.protection);
            world.events.push(GameEvent::Blocked { kind });
            if world.flags.shield_active && !world.protection.energy_mode {
                world.events.push(GameEvent::PowerUpEnded {
                    kind: PowerUpKind::Shield,
                });
            }
            if world.protection.ability_shield {
                world.collaborators.ability_shield.deactivate_shield();
                world.events.push(GameEvent::AbilityShieldConsumed);
            }
            if let Some(bonus) = self.destructible.on_destroyed(&world.tuning.scoring, kind, now) {
                world.stats.score += bonus;
                world.events.push(GameEvent::ObstacleDestroyed {
                    kind,
                    bonus,
                    chain: self.destructible.chain(),
                });
            }
            return;
        }

        world.stats.health = world.stats.health.saturating_sub(damage);
        debug!(
            "hit {} for {damage} (health {}) at {position}",
            kind.as_str(),
            world.stats.health
        );
        world.events.push(GameEvent::Damaged {
            kind,
            damage,
            health: world.stats.health,
            shake,
            hit_sound,
        });

        let lost = world.combo.on_hit();
        world.events.push(GameEvent::ComboBroken { lost });
        world.collaborators.energy.on_damage();
        world.player.reset_from_collision();

        if world.stats.health == 0 && self.last_death.is_none() {
            let death = DeathReport {
                cause: kind,
                position: world.player.position,
                speed: world.stats.speed,
            };
            info!(
                "run over: {} at distance {:.0}, score {}",
                kind.as_str(),
                world.stats.distance,
                world.stats.score
            );
            self.last_death = Some(death);
            world.events.push(GameEvent::Died { death });
        }
    }

    fn collect_coins(&mut self, world: &mut CollisionWorld) {
        let tuning = &world.tuning.collision;
        let player_pos = world.player.position;
        let player_box = world.player.world_box;
        let base = world.collaborators.character.modified_magnet_radius(tuning.magnet_radius);
        let radius = magnet_radius(base, world.flags.magnet_active, tuning);

        let mut collected = Vec::new();
        for coin in world.spawner.coins.iter_active_mut() {
            if (coin.position.z - player_pos.z).abs() > tuning.coin_window {
                continue;
            }
            let distance = coin.position.distance(player_pos);
            if world.flags.magnet_active && distance < radius {
                coin.position = coin.position.lerp(player_pos, tuning.magnet_pull);
                coin.base_y = coin.position.y;
                coin.refresh_world_box();
            }
            let distance = coin.position.distance(player_pos);
            if player_box.intersects(&coin.world_box) || distance < tuning.coin_pickup_radius {
                coin.deactivate();
                collected.push(coin.value);
            }
        }

        for coin_value in collected {
            let multiplier = world.flags.multiplier * world.combo.multiplier * world.coin_multiplier;
            let value = (multiplier * coin_value as f32).floor() as u64;
            world.stats.coins += value;
            world.stats.score += world.tuning.scoring.coin_score * value;
            world.combo.on_coin_collect(world.now);
            world.events.push(GameEvent::CoinCollected {
                value,
                total: world.stats.coins,
            });
            if world.collaborators.energy.on_coin_collect() {
                world.events.push(GameEvent::EnergyModeActivated);
            }
        }
    }

    fn collect_power_ups(&mut self, world: &mut CollisionWorld) {
        let tuning = &world.tuning.collision;
        let player_pos = world.player.position;
        let player_box = world.player.world_box;

        let picked: Vec<(usize, PowerUpKind)> = world
            .spawner
            .power_ups
            .iter_active()
            .filter(|pu| {
                player_box.intersects(&pu.world_box)
                    || pu.position.distance(player_pos) < tuning.power_up_radius
            })
            .map(|pu| (pu.pool_index, pu.kind))
            .collect();

        for (idx, kind) in picked {
            world.spawner.release_power_up(idx);
            if kind == PowerUpKind::Health {
                world.stats.health =
                    (world.stats.health + world.tuning.scoring.health_pickup).min(world.tuning.player.max_health);
            }
            world.events.push(GameEvent::PowerUpCollected { kind });
        }
    }
}

/// Convenience for tests and tools: a player-sized box at a position
pub fn player_box_at(position: Vec3, size: Vec3) -> Aabb {
    Aabb::from_center_size(position + Vec3::Y * size.y * 0.5, size)
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::settings::{CharacterProfile, PlayerTuning};
    use proptest::prelude::*;

    struct Harness {
        tuning: Tuning,
        player: PlayerController,
        spawner: EntitySpawner,
        collaborators: Collaborators,
        combo: ComboTracker,
        stats: RunStats,
        engine: CollisionEngine,
        events: Vec<GameEvent>,
        flags: ExternalFlags,
        now: f64,
    }

    impl Harness {
        fn new() -> Self {
            let tuning = Tuning::default();
            let mut player = PlayerController::new(&tuning.physics, &tuning.player);
            player.position.z = -100.0;
            player.refresh_world_box();
            Self {
                spawner: EntitySpawner::new(&tuning.spawn, 3),
                collaborators: Collaborators::builtin(&tuning.protection, CharacterProfile::default()),
                combo: ComboTracker::new(&tuning.scoring),
                stats: RunStats::new(tuning.run.start_health),
                engine: CollisionEngine::default(),
                events: Vec::new(),
                flags: ExternalFlags::default(),
                now: 10.0,
                player,
                tuning,
            }
        }

        fn run(&mut self, f: impl FnOnce(&mut CollisionEngine, &mut CollisionWorld<'_>)) {
            let protection = ProtectionSources::gather(self.flags.shield_active, &self.collaborators);
            let mut world = CollisionWorld {
                tuning: &self.tuning,
                now: self.now,
                player: &mut self.player,
                spawner: &mut self.spawner,
                collaborators: &mut self.collaborators,
                combo: &mut self.combo,
                stats: &mut self.stats,
                flags: self.flags,
                coin_multiplier: 1.0,
                protection,
                check_obstacles: true,
                events: &mut self.events,
            };
            f(&mut self.engine, &mut world);
        }

        fn step(&mut self) {
            self.run(|engine, world| engine.step(world));
        }

        fn place(&mut self, kind: ObstacleKind, dz: f32) -> usize {
            let z = self.player.position.z + dz;
            self.spawner.place_obstacle(kind, self.player.lane, z).unwrap()
        }

        fn obstacle(&self, kind: ObstacleKind, idx: usize) -> &Obstacle {
            self.spawner.pool(kind).get(idx).unwrap()
        }
    }

    #[test]
    fn test_grounded_box_hit() {
        let mut h = Harness::new();
        h.combo.on_coin_collect(9.0);
        let idx = h.place(ObstacleKind::Box, 0.0);
        assert!(h.obstacle(ObstacleKind::Box, idx).meta.forbids_clearance());

        h.step();
        assert_eq!(h.stats.health, 75);
        assert!(!h.obstacle(ObstacleKind::Box, idx).active);
        assert!(h.events.iter().any(|e| matches!(e, GameEvent::ComboBroken { lost: 1 })));
        assert!(h.events.iter().any(|e| matches!(
            e,
            GameEvent::Damaged { kind: ObstacleKind::Box, damage: 25, .. }
        )));
    }

    #[test]
    fn test_tall_wall_hits_while_jumping_or_sliding() {
        for stance in [Stance { jumping: true, sliding: false }, Stance { jumping: false, sliding: true }] {
            let mut h = Harness::new();
            if stance.sliding {
                h.player.slide();
            } else {
                h.player.is_jumping = true;
                h.player.position.y = 1.0;
                h.player.refresh_world_box();
            }
            h.place(ObstacleKind::TallWall, 0.0);
            h.step();
            assert_eq!(h.stats.health, 65);
        }
    }

    #[test]
    fn test_bar_high_slide_bonus_once() {
        let mut h = Harness::new();
        h.player.slide();
        let idx = h.place(ObstacleKind::BarHigh, 0.0);

        let o = h.obstacle(ObstacleKind::BarHigh, idx);
        assert!(o.meta.can_slide_under);
        assert_eq!(obstacle_contact(&h.player, o, &h.tuning.collision), Contact::SlidUnder);

        h.step();
        assert_eq!(h.stats.score, 30);
        assert_eq!(h.stats.health, 100);
        assert_eq!(h.combo.combo, 2);
        h.now += 0.05;
        h.step();
        assert_eq!(h.stats.score, 30);
        assert_eq!(h.combo.combo, 2);
        assert!(h.obstacle(ObstacleKind::BarHigh, idx).active);
    }

    #[test]
    fn test_standing_player_hit_by_overhead_obstacles() {
        let overhead = [
            ObstacleKind::BarHigh,
            ObstacleKind::EnergyBarrier,
            ObstacleKind::DroneTurret,
            ObstacleKind::PlasmaGate,
            ObstacleKind::Wall,
            ObstacleKind::Barrier,
        ];
        for kind in overhead {
            let mut h = Harness::new();
            let idx = h.place(kind, 0.0);
            h.step();
            assert!(h.stats.health < 100, "{} missed a standing player", kind.as_str());
            assert!(!h.obstacle(kind, idx).active);

            let mut h = Harness::new();
            h.player.slide();
            h.place(kind, 0.0);
            h.step();
            assert_eq!(h.stats.health, 100, "{} hit a sliding player", kind.as_str());
        }
    }

    #[test]
    fn test_repeated_report_of_same_obstacle_debounced() {
        let mut h = Harness::new();
        h.tuning.collision.damage_cooldown = 0.0;
        let idx = h.place(ObstacleKind::Box, 0.0);
        let hit = |h: &mut Harness| {
            h.run(|engine, world| engine.resolve_hit(world, ObstacleKind::Box, idx, 25, 1.0));
        };

        hit(&mut h);
        h.now += 0.05;
        hit(&mut h);
        assert_eq!(h.stats.health, 75);
        let damaged = h.events.iter().filter(|e| matches!(e, GameEvent::Damaged { .. })).count();
        assert_eq!(damaged, 1);

        h.now += 0.2;
        hit(&mut h);
        assert_eq!(h.stats.health, 50);
    }

    #[test]
    fn test_bar_low_hits_standing_player() {
        let mut h = Harness::new();
        h.place(ObstacleKind::BarLow, 0.0);
        h.step();
        assert_eq!(h.stats.health, 80);
    }

    #[test]
    fn test_each_invincibility_source_blocks() {
        for source in 0..5 {
            let mut h = Harness::new();
            match source {
                0 => h.flags.shield_active = true,
                1 => {
                    for _ in 0..h.tuning.protection.energy_threshold {
                        h.collaborators.energy.on_coin_collect();
                    }
                }
                2 => {
                    let from = h.player.position;
                    h.collaborators.grapple.launch(from, from + Vec3::new(0.0, 0.0, -10.0));
                }
                3 => h.collaborators.jump_safety.record_landing(Vec3::ZERO),
                _ => {
                    h.collaborators.ability_shield.activate();
                }
            }
            let idx = h.place(ObstacleKind::Wall, 0.0);
            // Force an overlap: drop the wall's hit volume to player height
            let o = h.spawner.pool_mut(ObstacleKind::Wall).get_mut(idx).unwrap();
            o.position.y = -1.2;
            o.refresh_world_box();

            h.step();
            assert_eq!(h.stats.health, 100, "source {source}");
            assert!(!h.obstacle(ObstacleKind::Wall, idx).active);
            assert!(h.events.iter().any(|e| matches!(e, GameEvent::Blocked { .. })));
            if source == 4 {
                assert!(!h.collaborators.ability_shield.is_shielded());
                let consumed = h
                    .events
                    .iter()
                    .filter(|e| matches!(e, GameEvent::AbilityShieldConsumed))
                    .count();
                assert_eq!(consumed, 1);
            }
        }
    }

    #[test]
    fn test_blocked_destructible_awards_bonus() {
        let mut h = Harness::new();
        h.flags.shield_active = true;
        h.place(ObstacleKind::Spike, 0.0);
        h.step();
        assert_eq!(h.stats.score, 50);
        assert!(h.events.iter().any(|e| matches!(e, GameEvent::PowerUpEnded { kind: PowerUpKind::Shield })));
    }

    #[test]
    fn test_damage_cooldown_absorbs_second_contact() {
        let mut h = Harness::new();
        h.place(ObstacleKind::Box, 0.0);
        h.step();
        h.place(ObstacleKind::Spike, 0.0);
        h.now += 0.1;
        h.step();
        assert_eq!(h.stats.health, 75);
        h.now += 0.1;
        h.step();
        assert_eq!(h.stats.health, 50);
    }

    #[test]
    fn test_degenerate_instanced_box_skipped() {
        let mut h = Harness::new();
        let idx = h.place(ObstacleKind::Box, 0.0);
        let o = h.spawner.pool_mut(ObstacleKind::Box).get_mut(idx).unwrap();
        o.local_box = Some(Aabb::new(Vec3::ZERO, Vec3::new(1.0, 0.0, 1.0)));
        o.refresh_world_box();
        h.step();
        assert_eq!(h.stats.health, 100);
        assert!(h.obstacle(ObstacleKind::Box, idx).active);
    }

    #[test]
    fn test_instanced_small_footprint_fallback() {
        let h = Harness::new();
        let mut o = Obstacle::default();
        o.activate(0);
        o.init(ObstacleKind::Spike, 0.5, h.player.position.z - 0.5, 0.0);
        // Shrink the box so only the footprint fallback can fire
        o.local_box = Some(Aabb::from_center_size(Vec3::new(0.0, 5.0, 0.0), Vec3::splat(0.1)));
        o.refresh_world_box();
        assert!(matches!(generic_contact(&h.player, &o, &h.tuning.collision), Contact::Hit { .. }));
    }

    #[test]
    fn test_game_over_reported_once() {
        let mut h = Harness::new();
        h.stats.health = 30;
        for i in 0..3 {
            h.place(ObstacleKind::Box, 0.0);
            h.now += 1.0 + i as f64;
            h.step();
        }
        assert_eq!(h.stats.health, 0);
        let deaths = h.events.iter().filter(|e| matches!(e, GameEvent::Died { .. })).count();
        assert_eq!(deaths, 1);
        let death = h.engine.last_death.unwrap();
        assert_eq!(death.cause, ObstacleKind::Box);
    }

    #[test]
    fn test_coin_pickup_and_magnet() {
        let mut h = Harness::new();
        let p = h.player.position;
        h.spawner.place_coin(p + Vec3::new(0.0, 1.0, -1.0), 1).unwrap();
        let far = h.spawner.place_coin(p + Vec3::new(0.0, 1.0, -10.0), 1).unwrap();
        h.step();
        assert_eq!(h.stats.coins, 1);
        assert_eq!(h.stats.score, 10);
        assert!(h.spawner.coins.get(far).unwrap().active);

        h.flags.magnet_active = true;
        let before = h.spawner.coins.get(far).unwrap().position.z;
        h.step();
        let after = h.spawner.coins.get(far).unwrap().position.z;
        assert!(after > before);
    }

    #[test]
    fn test_coins_stay_put_without_magnet() {
        let mut h = Harness::new();
        h.tuning.collision.magnet_idle_min = 5.0;
        let p = h.player.position;
        let idx = h.spawner.place_coin(p + Vec3::new(0.0, 1.0, -4.0), 1).unwrap();
        let before = h.spawner.coins.get(idx).unwrap().position;
        h.step();
        let coin = h.spawner.coins.get(idx).unwrap();
        assert!(coin.active);
        assert_eq!(coin.position, before);

        h.flags.magnet_active = true;
        h.step();
        assert_ne!(h.spawner.coins.get(idx).unwrap().position, before);
    }

    #[test]
    fn test_magnet_radius() {
        let t = CollisionTuning::default();
        assert!((magnet_radius(8.0, true, &t) - 20.0).abs() < 1e-5);
        assert!((magnet_radius(8.0, false, &t) - 1.52).abs() < 1e-5);
        assert!((magnet_radius(2.0, false, &t) - 1.5).abs() < 1e-5);
    }

    #[test]
    fn test_health_power_up_clamped() {
        let mut h = Harness::new();
        h.stats.health = 90;
        let lane = h.player.lane;
        let z = h.player.position.z;
        h.spawner.place_power_up(PowerUpKind::Health, lane, z).unwrap();
        h.step();
        assert_eq!(h.stats.health, 100);
        assert_eq!(h.spawner.power_ups.active_count(), 0);
        assert_eq!(h.spawner.lights.active_count(), 0);
    }

    #[test]
    fn test_slide_zone_bands() {
        let t = CollisionTuning::default();
        assert_eq!(slide_zone(0.0, 1.6, &t), SlideZone::SafeSlide);
        assert_eq!(slide_zone(5.0, 1.6, &t), SlideZone::Above);
        match slide_zone(3.0, 1.6, &t) {
            SlideZone::Impact { severity } => assert!(severity > 0.0 && severity < 1.0),
            other => panic!("expected impact, got {other:?}"),
        }
        assert_eq!(impact_damage(0.0, &t), 8);
        assert_eq!(impact_damage(1.0, &t), 30);
    }

    #[test]
    fn test_energy_mode_counts_coins() {
        let mut h = Harness::new();
        let p = h.player.position;
        h.spawner.place_coin(p + Vec3::Y, 1).unwrap();
        h.step();
        assert_eq!(h.collaborators.energy.coins_collected(), 1);
    }

    fn overlapping_obstacle_box() -> impl Strategy<Value = (Aabb, Aabb)> {
        (-4.0f32..4.0, -1.0f32..1.0, 0.2f32..2.5, 0.2f32..1.5).prop_map(|(x, z, h, y0)| {
            let player = player_box_at(Vec3::new(x, 0.0, z), Vec3::new(0.7, 1.8, 0.7));
            let obstacle = Aabb::from_center_size(Vec3::new(x, y0 + h * 0.5, z), Vec3::new(2.4, h, 0.3));
            (player, obstacle)
        })
    }

    proptest! {
        #[test]
        fn prop_slide_clearance_never_collides(
            x in -4.0f32..4.0,
            z in -50.0f32..50.0,
            gap in 0.11f32..3.0,
            top in 0.1f32..1.2,
        ) {
            let tuning = CollisionTuning::default();
            let meta = ObstacleMeta { can_slide_under: true, ..Default::default() };
            let player = Aabb::new(Vec3::new(x - 0.35, 0.0, z - 0.3), Vec3::new(x + 0.35, top, z + 0.3));
            let obstacle = Aabb::new(
                Vec3::new(x - 1.2, top + gap, z - 0.15),
                Vec3::new(x + 1.2, top + gap + 0.3, z + 0.15),
            );
            let stance = Stance { jumping: false, sliding: true };
            prop_assert!(!box_collision(&player, &obstacle, &meta, stance, &tuning));
        }

        #[test]
        fn prop_unavoidable_always_collides(
            (player, obstacle) in overlapping_obstacle_box(),
            jumping in any::<bool>(),
            sliding in any::<bool>(),
        ) {
            let tuning = CollisionTuning::default();
            let meta = ObstacleMeta::for_kind(ObstacleKind::TallWall);
            prop_assume!(player.intersects(&obstacle));
            let stance = Stance { jumping, sliding };
            prop_assert!(box_collision(&player, &obstacle, &meta, stance, &tuning));
        }

        #[test]
        fn prop_debounce_single_damage(gap in 0.0f64..0.179) {
            let mut h = Harness::new();
            h.place(ObstacleKind::Box, 0.0);
            h.step();
            h.place(ObstacleKind::Box, 0.0);
            h.now += gap;
            h.step();
            prop_assert_eq!(h.stats.health, 75);
        }
    }

    #[test]
    fn test_player_box_at() {
        let b = player_box_at(Vec3::ZERO, Vec3::new(0.7, 1.8, 0.7));
        assert!((b.min.y).abs() < 1e-6);
        let p = PlayerController::new(&Default::default(), &PlayerTuning::default());
        assert_eq!(b, p.local_box);
    }
}
