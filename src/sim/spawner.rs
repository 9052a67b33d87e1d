//! Entity spawning, animation and retirement over fixed-capacity pools

use glam::Vec3;
use log::{debug, info};
use rand::{Rng, SeedableRng};
use rand_pcg::Pcg32;

use super::collectible::{Coin, PowerUp, PowerUpKind, PowerUpLight};
use super::difficulty::{CoinPattern, Difficulty};
use super::obstacle::{Obstacle, ObstacleCategory, ObstacleKind};
use super::pool::{Pool, Poolable};
use super::protection::JumpSafety;
use super::world_events::WorldEvents;
use crate::consts::LANE_COUNT;
use crate::lane_x;
use crate::settings::SpawnTuning;

/// Coin height for flat patterns
const COIN_HEIGHT: f32 = 1.0;
/// Extra height at the top of an arc pattern
const ARC_RISE: f32 = 2.0;
/// Power-ups float at this height
const POWER_UP_HEIGHT: f32 = 1.5;

/// What one spawn-timer pass produced
#[derive(Debug, Clone, Default, PartialEq)]
pub struct SpawnReport {
    pub obstacle: Option<ObstacleKind>,
    pub coins: usize,
    pub power_up: Option<PowerUpKind>,
    /// Obstacle spawns refused because they fell in the predicted landing zone
    pub vetoed: usize,
}

/// Player data the spawner needs for one pass
#[derive(Debug, Clone, Copy)]
pub struct SpawnContext {
    pub player_position: Vec3,
    pub player_jumping: bool,
    pub now: f64,
    pub in_start_grace: bool,
}

#[derive(Debug, Clone)]
pub struct EntitySpawner {
    /// One pool per obstacle kind, indexed by [`ObstacleKind::index`]
    obstacles: Vec<Pool<Obstacle>>,
    pub coins: Pool<Coin>,
    pub power_ups: Pool<PowerUp>,
    pub lights: Pool<PowerUpLight>,
    rng: Pcg32,
    obstacle_timer: f32,
    coin_timer: f32,
    power_up_timer: f32,
    tuning: SpawnTuning,
}

impl EntitySpawner {
    pub fn new(tuning: &SpawnTuning, seed: u64) -> Self {
        let obstacles = ObstacleKind::ALL
            .iter()
            .map(|&kind| Pool::with_capacity(kind.as_str(), Self::capacity_for(tuning, kind)))
            .collect();
        let spawner = Self {
            obstacles,
            coins: Pool::with_capacity("coin", tuning.coin_capacity),
            power_ups: Pool::with_capacity("power_up", tuning.power_up_capacity),
            lights: Pool::with_capacity("power_up_light", tuning.light_capacity),
            rng: Pcg32::seed_from_u64(seed),
            obstacle_timer: tuning.grace_obstacle_interval,
            coin_timer: tuning.coin_interval,
            power_up_timer: tuning.power_up_interval,
            tuning: tuning.clone(),
        };
        info!(
            "spawner ready: {} obstacle pools, {} coin slots, {} power-up slots",
            spawner.obstacles.len(),
            spawner.coins.capacity(),
            spawner.power_ups.capacity()
        );
        spawner
    }

    fn capacity_for(tuning: &SpawnTuning, kind: ObstacleKind) -> usize {
        match kind {
            ObstacleKind::Box => tuning.box_capacity,
            ObstacleKind::Spike => tuning.spike_capacity,
            ObstacleKind::Barrier => tuning.barrier_capacity,
            _ => tuning.complex_capacity,
        }
    }

    /// Clear every pool and restart the timers with a new seed
    pub fn reset(&mut self, seed: u64) {
        for pool in &mut self.obstacles {
            pool.clear();
        }
        self.coins.clear();
        self.power_ups.clear();
        self.lights.clear();
        self.rng = Pcg32::seed_from_u64(seed);
        self.obstacle_timer = self.tuning.grace_obstacle_interval;
        self.coin_timer = self.tuning.coin_interval;
        self.power_up_timer = self.tuning.power_up_interval;
    }

    pub fn pool(&self, kind: ObstacleKind) -> &Pool<Obstacle> {
        &self.obstacles[kind.index()]
    }

    pub fn pool_mut(&mut self, kind: ObstacleKind) -> &mut Pool<Obstacle> {
        &mut self.obstacles[kind.index()]
    }

    pub fn active_obstacles(&self) -> impl Iterator<Item = &Obstacle> {
        self.obstacles.iter().flat_map(|p| p.iter_active())
    }

    pub fn active_obstacles_mut(&mut self) -> impl Iterator<Item = &mut Obstacle> {
        self.obstacles.iter_mut().flat_map(|p| p.iter_active_mut())
    }

    pub fn active_obstacle_count(&self) -> usize {
        self.obstacles.iter().map(|p| p.active_count()).sum()
    }

    /// Acquire a slot and stamp an obstacle at `(x, z)`; `None` when the pool is full
    pub fn place_obstacle_at(&mut self, kind: ObstacleKind, x: f32, z: f32) -> Option<usize> {
        let phase = self.rng.random::<f32>() * std::f32::consts::TAU;
        let pool = &mut self.obstacles[kind.index()];
        let idx = pool.acquire()?;
        if let Some(obstacle) = pool.get_mut(idx) {
            obstacle.init(kind, x, z, phase);
        }
        Some(idx)
    }

    pub fn place_obstacle(&mut self, kind: ObstacleKind, lane: usize, z: f32) -> Option<usize> {
        self.place_obstacle_at(kind, lane_x(lane), z)
    }

    /// Pick a kind and lane from the difficulty signal and spawn it ahead of the player
    pub fn spawn_obstacle_pattern(
        &mut self,
        ctx: &SpawnContext,
        difficulty: &Difficulty,
        safety: &mut dyn JumpSafety,
    ) -> Result<Option<ObstacleKind>, SpawnRefusal> {
        let kind = difficulty.pick_obstacle(&mut self.rng);
        let lane = self.rng.random_range(0..LANE_COUNT);
        let z = ctx.player_position.z - self.tuning.spawn_distance;

        if (z - ctx.player_position.z).abs() < self.tuning.min_safe_distance {
            return Err(SpawnRefusal::TooClose);
        }
        let position = Vec3::new(lane_x(lane), 0.0, z);
        if !safety.is_safe_to_spawn(position, kind, ctx.player_jumping, ctx.now) {
            safety.add_danger_zone(position, ctx.now);
            debug!("{} spawn vetoed inside landing zone", kind.as_str());
            return Err(SpawnRefusal::LandingZone);
        }
        Ok(self.place_obstacle(kind, lane, z).map(|_| kind))
    }

    /// Lay out a coin pattern ahead of the player; returns coins placed
    pub fn spawn_coin_pattern(&mut self, player_z: f32, difficulty: &Difficulty) -> usize {
        let intensity = difficulty.intensity;
        let pattern = difficulty.pick_coin_pattern(&mut self.rng);
        let count = (3.0 * (0.8 + intensity * 0.6)).floor().max(1.0) as usize;
        let mut value = 1 + (intensity * 2.0).floor() as u32;
        if pattern == CoinPattern::RiskReward {
            value *= 2;
        }
        let lane = self.rng.random_range(0..LANE_COUNT);
        let start_z = player_z - self.tuning.spawn_distance;

        let mut placed = 0;
        for i in 0..count {
            let (coin_lane, height) = match pattern {
                CoinPattern::Line | CoinPattern::RiskReward => (lane, COIN_HEIGHT),
                CoinPattern::Zigzag => ((lane + i) % LANE_COUNT, COIN_HEIGHT),
                CoinPattern::Arc => {
                    let t = if count > 1 { i as f32 / (count - 1) as f32 } else { 0.5 };
                    (lane, COIN_HEIGHT + (t * std::f32::consts::PI).sin() * ARC_RISE)
                }
            };
            let phase = self.rng.random::<f32>() * std::f32::consts::TAU;
            let Some(idx) = self.coins.acquire() else {
                break;
            };
            if let Some(coin) = self.coins.get_mut(idx) {
                let z = start_z - i as f32 * self.tuning.coin_spacing;
                coin.init(Vec3::new(lane_x(coin_lane), height, z), value, phase);
                placed += 1;
            }
        }
        placed
    }

    /// Spawn one weighted-random power-up, with a light when one is free
    pub fn spawn_power_up(&mut self, player_z: f32) -> Option<PowerUpKind> {
        let kind = PowerUpKind::from_roll(self.rng.random());
        let lane = self.rng.random_range(0..LANE_COUNT);
        self.place_power_up(kind, lane, player_z - self.tuning.spawn_distance)
    }

    pub fn place_power_up(&mut self, kind: PowerUpKind, lane: usize, z: f32) -> Option<PowerUpKind> {
        let idx = self.power_ups.acquire()?;
        let position = Vec3::new(lane_x(lane), POWER_UP_HEIGHT, z);
        let light = self.lights.acquire();
        if let Some(l) = light.and_then(|i| self.lights.get_mut(i)) {
            l.kind = kind;
            l.position = position;
        }
        if let Some(pu) = self.power_ups.get_mut(idx) {
            pu.init(kind, position, light);
        }
        Some(kind)
    }

    pub fn place_coin(&mut self, position: Vec3, value: u32) -> Option<usize> {
        let idx = self.coins.acquire()?;
        if let Some(coin) = self.coins.get_mut(idx) {
            coin.init(position, value, 0.0);
        }
        Some(idx)
    }

    /// Place everything a world event queued; returns how many entities landed
    pub fn drain_world_events(&mut self, events: &mut WorldEvents) -> usize {
        let spawns = events.drain();
        let mut placed = 0;
        for drop in &spawns.obstacles {
            placed += usize::from(self.place_obstacle(drop.kind, drop.lane, drop.z).is_some());
        }
        for drop in &spawns.coins {
            let position = Vec3::new(lane_x(drop.lane), drop.height, drop.z);
            placed += usize::from(self.place_coin(position, drop.value).is_some());
        }
        if placed > 0 {
            debug!("placed {placed} world-event entities");
        }
        placed
    }

    /// Deactivate a power-up and the light attached to it
    pub fn release_power_up(&mut self, idx: usize) {
        let light = self.power_ups.get(idx).and_then(|p| p.light);
        self.power_ups.release(idx);
        if let Some(l) = light {
            self.lights.release(l);
        }
    }

    /// Run the spawn timers for one step
    pub fn tick_timers(
        &mut self,
        dt: f32,
        ctx: &SpawnContext,
        difficulty: &Difficulty,
        safety: &mut dyn JumpSafety,
    ) -> SpawnReport {
        let mut report = SpawnReport::default();

        self.obstacle_timer -= dt;
        if self.obstacle_timer <= 0.0 {
            if !difficulty.in_safe_zone() {
                match self.spawn_obstacle_pattern(ctx, difficulty, safety) {
                    Ok(kind) => report.obstacle = kind,
                    Err(SpawnRefusal::LandingZone) => report.vetoed += 1,
                    Err(SpawnRefusal::TooClose) => {}
                }
            }
            let roll = self.rng.random();
            self.obstacle_timer = difficulty.obstacle_interval(&self.tuning, ctx.in_start_grace, roll);
        }

        self.coin_timer -= dt;
        if self.coin_timer <= 0.0 {
            report.coins = self.spawn_coin_pattern(ctx.player_position.z, difficulty);
            let roll = self.rng.random();
            self.coin_timer = difficulty.coin_interval(&self.tuning, roll);
        }

        self.power_up_timer -= dt;
        if self.power_up_timer <= 0.0 {
            report.power_up = self.spawn_power_up(ctx.player_position.z);
            let roll = self.rng.random();
            self.power_up_timer = difficulty.power_up_interval(&self.tuning, roll);
        }

        report
    }

    /// Animate every active entity, refresh its world box, and retire what the
    /// player has passed. Retiring only clears the active flag.
    pub fn update(&mut self, dt: f32, player_z: f32) {
        let limit = player_z + self.tuning.retire_margin;

        for pool in &mut self.obstacles {
            for obstacle in pool.iter_active_mut() {
                if obstacle.position.z > limit {
                    obstacle.deactivate();
                    continue;
                }
                if obstacle.kind.category() != ObstacleCategory::Instanced {
                    obstacle.animate(dt);
                }
                obstacle.refresh_world_box();
            }
        }

        for coin in self.coins.iter_active_mut() {
            if coin.position.z > limit {
                coin.deactivate();
                continue;
            }
            coin.animate(dt);
            coin.refresh_world_box();
        }

        let mut retired_lights = Vec::new();
        for pu in self.power_ups.iter_active_mut() {
            if pu.position.z > limit {
                pu.deactivate();
                retired_lights.extend(pu.light.take());
                continue;
            }
            pu.animate(dt);
            pu.refresh_world_box();
        }
        for l in retired_lights {
            self.lights.release(l);
        }
    }
}

/// Why an obstacle spawn was skipped
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum SpawnRefusal {
    /// Spawn point closer than the minimum safe distance
    TooClose,
    /// Spawn point inside an imminent predicted landing zone
    LandingZone,
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::settings::{EventTuning, ProtectionTuning};
    use crate::sim::protection::LandingGrace;
    use crate::sim::world_events::WorldEventKind;

    fn spawner() -> EntitySpawner {
        EntitySpawner::new(&SpawnTuning::default(), 42)
    }

    fn ctx(z: f32) -> SpawnContext {
        SpawnContext {
            player_position: Vec3::new(0.0, 0.0, z),
            player_jumping: false,
            now: 0.0,
            in_start_grace: false,
        }
    }

    #[test]
    fn test_pool_capacities() {
        let s = spawner();
        assert_eq!(s.pool(ObstacleKind::Box).capacity(), 30);
        assert_eq!(s.pool(ObstacleKind::Barrier).capacity(), 20);
        assert_eq!(s.pool(ObstacleKind::TallWall).capacity(), 30);
        assert_eq!(s.power_ups.capacity(), 8);
        assert_eq!(s.lights.capacity(), 10);
    }

    #[test]
    fn test_full_pool_drops_spawn() {
        let mut s = spawner();
        for i in 0..30 {
            assert!(s.place_obstacle(ObstacleKind::Box, 1, -50.0 - i as f32).is_some());
        }
        let snapshot: Vec<_> = s
            .pool(ObstacleKind::Box)
            .slots()
            .iter()
            .map(|o| (o.position, o.active))
            .collect();
        assert!(s.place_obstacle(ObstacleKind::Box, 0, -10.0).is_none());
        let after: Vec<_> = s
            .pool(ObstacleKind::Box)
            .slots()
            .iter()
            .map(|o| (o.position, o.active))
            .collect();
        assert_eq!(snapshot, after);
    }

    #[test]
    fn test_retire_flips_flag_and_slot_is_reused() {
        let mut s = spawner();
        let idx = s.place_obstacle(ObstacleKind::Spike, 1, -5.0).unwrap();
        s.update(0.016, -30.0);
        assert_eq!(s.active_obstacle_count(), 0);
        assert_eq!(s.pool(ObstacleKind::Spike).capacity(), 30);
        assert!(!s.pool(ObstacleKind::Spike).get(idx).unwrap().visible);

        // Cursor moved on, but once it wraps the retired slot is handed out again
        for _ in 0..30 {
            s.place_obstacle(ObstacleKind::Spike, 1, -100.0).unwrap();
        }
        assert!(s.pool(ObstacleKind::Spike).get(idx).unwrap().active);
    }

    #[test]
    fn test_obstacle_spawns_at_spawn_distance() {
        let mut s = spawner();
        let mut safety = LandingGrace::new(&ProtectionTuning::default());
        let kind = s
            .spawn_obstacle_pattern(&ctx(-200.0), &Difficulty::default(), &mut safety)
            .unwrap()
            .unwrap();
        let o = s.pool(kind).iter_active().next().unwrap();
        assert!((o.position.z + 320.0).abs() < 1e-4);
        assert!(o.world_box.volume() > 0.0);
    }

    #[test]
    fn test_min_safe_distance_refuses() {
        let tuning = SpawnTuning {
            spawn_distance: 30.0,
            ..Default::default()
        };
        let mut s = EntitySpawner::new(&tuning, 1);
        let mut safety = LandingGrace::new(&ProtectionTuning::default());
        let result = s.spawn_obstacle_pattern(&ctx(0.0), &Difficulty::default(), &mut safety);
        assert_eq!(result, Err(SpawnRefusal::TooClose));
        assert_eq!(s.active_obstacle_count(), 0);
    }

    #[test]
    fn test_coin_pattern_count_and_value() {
        let mut s = spawner();
        let calm = Difficulty::with_intensity(0.1);
        let placed = s.spawn_coin_pattern(0.0, &calm);
        assert_eq!(placed, 2);
        for coin in s.coins.iter_active() {
            assert_eq!(coin.value, 1);
            assert!(coin.position.z <= -120.0);
        }
    }

    #[test]
    fn test_drains_world_event_queue() {
        let mut s = spawner();
        let mut events = WorldEvents::new(&EventTuning::default(), 4);
        events.start(WorldEventKind::LightningStorm, 0.0);
        for _ in 0..20 {
            events.update(0.1, 0.0, -120.0);
        }
        assert_eq!(s.drain_world_events(&mut events), 1);
        let laser = s.pool(ObstacleKind::RotatingLaser).iter_active().next().unwrap();
        assert!((laser.position.z + 120.0).abs() < 1e-4);
        assert_eq!(s.drain_world_events(&mut events), 0);
    }

    #[test]
    fn test_power_up_takes_light_and_releases_it() {
        let mut s = spawner();
        s.place_power_up(PowerUpKind::Health, 0, -30.0).unwrap();
        assert_eq!(s.lights.active_count(), 1);
        s.update(0.016, -60.0);
        assert_eq!(s.power_ups.active_count(), 0);
        assert_eq!(s.lights.active_count(), 0);
    }

    #[test]
    fn test_timers_spawn_over_time() {
        let mut s = spawner();
        let mut safety = LandingGrace::new(&ProtectionTuning::default());
        let difficulty = Difficulty::default();
        let mut obstacles = 0;
        let mut coins = 0;
        let mut power_ups = 0;
        for step in 0..600 {
            let c = ctx(-(step as f32) * 0.25);
            let report = s.tick_timers(1.0 / 60.0, &c, &difficulty, &mut safety);
            obstacles += report.obstacle.is_some() as usize;
            coins += report.coins;
            power_ups += report.power_up.is_some() as usize;
        }
        assert!(obstacles >= 3);
        assert!(coins > 0);
        assert!(power_ups >= 1);
    }

    #[test]
    fn test_safe_zone_blocks_obstacles() {
        let mut s = spawner();
        let mut safety = LandingGrace::new(&ProtectionTuning::default());
        let mut difficulty = Difficulty::default();
        difficulty.trigger_safe_zone(1.0e6);
        for _ in 0..600 {
            let report = s.tick_timers(1.0 / 60.0, &ctx(0.0), &difficulty, &mut safety);
            assert!(report.obstacle.is_none());
        }
        assert_eq!(s.active_obstacle_count(), 0);
    }

    #[test]
    fn test_same_seed_same_spawns() {
        let run = |seed| {
            let mut s = EntitySpawner::new(&SpawnTuning::default(), seed);
            let mut safety = LandingGrace::new(&ProtectionTuning::default());
            let d = Difficulty::default();
            let mut kinds = Vec::new();
            for _ in 0..20 {
                if let Ok(Some(k)) = s.spawn_obstacle_pattern(&ctx(0.0), &d, &mut safety) {
                    kinds.push(k);
                }
            }
            kinds
        };
        assert_eq!(run(9), run(9));
    }
}
