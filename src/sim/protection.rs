//! Invincibility sources and the narrow collaborator contracts behind them
//!
//! Each source is independent; [`ProtectionSources::gather`] samples them once
//! per step and [`ProtectionSources::is_invincible`] ORs them together.

use std::fmt;

use glam::Vec3;
use log::{debug, info};
use serde::Serialize;

use super::obstacle::ObstacleKind;
use crate::lane_for_x;
use crate::settings::{CharacterProfile, ProtectionTuning};

/// Danger zones kept at once
const MAX_DANGER_ZONES: usize = 3;
/// Seconds a danger zone stays visible
const DANGER_ZONE_LIFETIME: f64 = 2.0;
/// Radius of the predicted landing zone
const LANDING_ZONE_RADIUS: f32 = 2.0;
/// Z distance within which a spawn counts as inside the landing zone
const LANDING_ZONE_DEPTH: f32 = 10.0;
/// Static obstacles are refused when the landing is closer than this (seconds)
const IMMINENT_LANDING: f64 = 0.5;
/// Grapple flight snaps to the target past this progress
const GRAPPLE_COMPLETE: f32 = 0.95;

/// Coin-streak super mode
pub trait EnergyMode: fmt::Debug {
    fn is_invincible(&self) -> bool;
    fn speed_multiplier(&self) -> f32;
    /// Count a coin; returns true when this coin activated the mode
    fn on_coin_collect(&mut self) -> bool;
    fn on_damage(&mut self);
    fn update(&mut self, dt: f32);
    fn reset(&mut self);
    fn coins_collected(&self) -> u32;
}

/// Grapple flight that temporarily owns the player position
pub trait Grapple: fmt::Debug {
    fn is_active(&self) -> bool;
    fn is_player_invincible(&self) -> bool;
    /// Start a flight; false while cooling down or already flying
    fn launch(&mut self, from: Vec3, target: Vec3) -> bool;
    /// Position for this step, or `None` once the flight has released
    fn update_position(&mut self, dt: f32) -> Option<Vec3>;
    fn last_target_lane(&self) -> usize;
    fn update(&mut self, dt: f32);
    fn reset(&mut self);
    fn status(&self) -> GrappleStatus;
}

/// Single-use shield charge
pub trait AbilityShield: fmt::Debug {
    fn is_shielded(&self) -> bool;
    fn deactivate_shield(&mut self);
    /// Arm the shield; false while cooling down
    fn activate(&mut self) -> bool;
    fn update(&mut self, dt: f32);
    fn reset(&mut self);
    fn cooldown_remaining(&self) -> f32;
}

/// Landing grace plus predicted-landing spawn veto
pub trait JumpSafety: fmt::Debug {
    fn is_invincible(&self) -> bool;
    fn record_jump(&mut self, position: Vec3, jump_velocity: f32, gravity: f32, forward_speed: f32, now: f64);
    fn record_landing(&mut self, position: Vec3);
    fn is_safe_to_spawn(&self, position: Vec3, kind: ObstacleKind, player_jumping: bool, now: f64) -> bool;
    fn add_danger_zone(&mut self, position: Vec3, now: f64);
    fn danger_zones(&self) -> &[DangerZone];
    fn predicted_landing(&self) -> Option<LandingZone>;
    fn update(&mut self, dt: f32, now: f64);
    fn reset(&mut self);
}

/// Per-character modifiers
pub trait CharacterStats: fmt::Debug {
    fn modified_jump_velocity(&self, base: f32) -> f32;
    fn modified_magnet_radius(&self, base: f32) -> f32;
    fn max_jumps(&self) -> u32;
    fn speed_multiplier(&self) -> f32;
}

impl CharacterStats for CharacterProfile {
    fn modified_jump_velocity(&self, base: f32) -> f32 {
        base * self.jump_height
    }

    fn modified_magnet_radius(&self, base: f32) -> f32 {
        base * self.magnet_radius
    }

    fn max_jumps(&self) -> u32 {
        self.max_jumps.max(1)
    }

    fn speed_multiplier(&self) -> f32 {
        self.speed
    }
}

#[derive(Debug, Clone, Copy, PartialEq, Serialize)]
pub struct DangerZone {
    pub position: Vec3,
    pub created_at: f64,
}

#[derive(Debug, Clone, Copy, PartialEq, Serialize)]
pub struct LandingZone {
    pub x: f32,
    pub z: f32,
    pub radius: f32,
    /// Sim time the landing is expected
    pub land_at: f64,
}

#[derive(Debug, Clone, Copy, PartialEq, Default, Serialize)]
pub struct GrappleStatus {
    pub active: bool,
    pub invincible: bool,
    pub cooldown_remaining: f32,
    pub can_use: bool,
}

/// Built-in energy mode: 50 coins in a run, once per run
#[derive(Debug, Clone)]
pub struct EnergyMeter {
    threshold: u32,
    duration: f32,
    multiplier: f32,
    coins: u32,
    remaining: f32,
    active: bool,
    triggered: bool,
}

impl EnergyMeter {
    pub fn new(tuning: &ProtectionTuning) -> Self {
        Self {
            threshold: tuning.energy_threshold,
            duration: tuning.energy_duration,
            multiplier: tuning.energy_speed_multiplier,
            coins: 0,
            remaining: 0.0,
            active: false,
            triggered: false,
        }
    }
}

impl EnergyMode for EnergyMeter {
    fn is_invincible(&self) -> bool {
        self.active
    }

    fn speed_multiplier(&self) -> f32 {
        if self.active { self.multiplier } else { 1.0 }
    }

    fn on_coin_collect(&mut self) -> bool {
        if self.active {
            return false;
        }
        self.coins += 1;
        if self.coins >= self.threshold && !self.triggered {
            self.active = true;
            self.triggered = true;
            self.remaining = self.duration;
            info!("energy mode activated after {} coins", self.coins);
            return true;
        }
        false
    }

    fn on_damage(&mut self) {
        if !self.active {
            self.coins = 0;
        }
    }

    fn update(&mut self, dt: f32) {
        if self.active {
            self.remaining -= dt;
            if self.remaining <= 0.0 {
                self.active = false;
                self.remaining = 0.0;
                info!("energy mode ended");
            }
        }
    }

    fn reset(&mut self) {
        self.coins = 0;
        self.remaining = 0.0;
        self.active = false;
        self.triggered = false;
    }

    fn coins_collected(&self) -> u32 {
        self.coins
    }
}

/// Built-in grapple: eased flight toward a target point
#[derive(Debug, Clone)]
pub struct GrappleHook {
    duration: f32,
    cooldown: f32,
    release_buffer: f32,
    active: bool,
    elapsed: f32,
    start: Vec3,
    target: Vec3,
    cooldown_timer: f32,
    buffer_timer: f32,
    last_target_lane: usize,
}

impl GrappleHook {
    pub fn new(tuning: &ProtectionTuning) -> Self {
        Self {
            duration: tuning.grapple_duration,
            cooldown: tuning.grapple_cooldown,
            release_buffer: tuning.grapple_release_buffer,
            active: false,
            elapsed: 0.0,
            start: Vec3::ZERO,
            target: Vec3::ZERO,
            cooldown_timer: 0.0,
            buffer_timer: 0.0,
            last_target_lane: crate::consts::CENTER_LANE,
        }
    }

    fn can_use(&self) -> bool {
        self.cooldown_timer <= 0.0 && !self.active
    }

    fn release(&mut self) {
        self.active = false;
        self.buffer_timer = self.release_buffer;
        self.cooldown_timer = self.cooldown;
        debug!("grapple released, cooldown {:.1}s", self.cooldown);
    }
}

/// Quadratic ease-in-out
fn ease_in_out(t: f32) -> f32 {
    if t < 0.5 {
        2.0 * t * t
    } else {
        1.0 - (-2.0 * t + 2.0).powi(2) / 2.0
    }
}

impl Grapple for GrappleHook {
    fn is_active(&self) -> bool {
        self.active
    }

    fn is_player_invincible(&self) -> bool {
        self.active || self.buffer_timer > 0.0
    }

    fn launch(&mut self, from: Vec3, target: Vec3) -> bool {
        if !self.can_use() {
            return false;
        }
        self.active = true;
        self.elapsed = 0.0;
        self.start = from;
        self.target = target;
        self.last_target_lane = lane_for_x(target.x);
        info!("grapple launched toward {target}");
        true
    }

    fn update_position(&mut self, dt: f32) -> Option<Vec3> {
        if !self.active {
            return None;
        }
        self.elapsed += dt;
        let progress = (self.elapsed / self.duration).min(1.0);
        if progress >= GRAPPLE_COMPLETE {
            self.release();
            return Some(self.target);
        }
        Some(self.start + (self.target - self.start) * ease_in_out(progress))
    }

    fn last_target_lane(&self) -> usize {
        self.last_target_lane
    }

    fn update(&mut self, dt: f32) {
        if self.cooldown_timer > 0.0 {
            self.cooldown_timer = (self.cooldown_timer - dt).max(0.0);
        }
        if self.buffer_timer > 0.0 {
            self.buffer_timer = (self.buffer_timer - dt).max(0.0);
        }
    }

    fn reset(&mut self) {
        *self = Self {
            duration: self.duration,
            cooldown: self.cooldown,
            release_buffer: self.release_buffer,
            ..GrappleHook::new(&ProtectionTuning::default())
        };
    }

    fn status(&self) -> GrappleStatus {
        GrappleStatus {
            active: self.active,
            invincible: self.is_player_invincible(),
            cooldown_remaining: self.cooldown_timer,
            can_use: self.can_use(),
        }
    }
}

/// Built-in ability shield: armed on demand, consumed by one block
#[derive(Debug, Clone)]
pub struct ShieldCharge {
    cooldown: f32,
    armed: bool,
    cooldown_timer: f32,
}

impl ShieldCharge {
    pub fn new(tuning: &ProtectionTuning) -> Self {
        Self {
            cooldown: tuning.ability_shield_cooldown,
            armed: false,
            cooldown_timer: 0.0,
        }
    }
}

impl AbilityShield for ShieldCharge {
    fn is_shielded(&self) -> bool {
        self.armed
    }

    fn deactivate_shield(&mut self) {
        if self.armed {
            self.armed = false;
            self.cooldown_timer = self.cooldown;
            debug!("ability shield consumed");
        }
    }

    fn activate(&mut self) -> bool {
        if self.armed || self.cooldown_timer > 0.0 {
            return false;
        }
        self.armed = true;
        true
    }

    fn update(&mut self, dt: f32) {
        if self.cooldown_timer > 0.0 {
            self.cooldown_timer = (self.cooldown_timer - dt).max(0.0);
        }
    }

    fn reset(&mut self) {
        self.armed = false;
        self.cooldown_timer = 0.0;
    }

    fn cooldown_remaining(&self) -> f32 {
        self.cooldown_timer
    }
}

/// Built-in jump safety: landing grace timer and landing-zone prediction
#[derive(Debug, Clone)]
pub struct LandingGrace {
    duration: f32,
    remaining: f32,
    predicted: Option<LandingZone>,
    zones: Vec<DangerZone>,
}

impl LandingGrace {
    pub fn new(tuning: &ProtectionTuning) -> Self {
        Self {
            duration: tuning.landing_grace,
            remaining: 0.0,
            predicted: None,
            zones: Vec::with_capacity(MAX_DANGER_ZONES),
        }
    }
}

impl JumpSafety for LandingGrace {
    fn is_invincible(&self) -> bool {
        self.remaining > 0.0
    }

    fn record_jump(&mut self, position: Vec3, jump_velocity: f32, gravity: f32, forward_speed: f32, now: f64) {
        let time_to_land = 2.0 * jump_velocity / gravity;
        self.predicted = Some(LandingZone {
            x: position.x,
            z: position.z - forward_speed * time_to_land,
            radius: LANDING_ZONE_RADIUS,
            land_at: now + time_to_land as f64,
        });
        self.remaining = 0.0;
    }

    fn record_landing(&mut self, _position: Vec3) {
        self.remaining = self.duration;
        self.predicted = None;
    }

    fn is_safe_to_spawn(&self, position: Vec3, kind: ObstacleKind, player_jumping: bool, now: f64) -> bool {
        let Some(landing) = self.predicted.filter(|_| player_jumping) else {
            return true;
        };
        let inside = (position.x - landing.x).abs() < landing.radius
            && (position.z - landing.z).abs() < LANDING_ZONE_DEPTH;
        if !inside {
            return true;
        }
        !(kind.profile().is_dynamic || landing.land_at - now < IMMINENT_LANDING)
    }

    fn add_danger_zone(&mut self, position: Vec3, now: f64) {
        if self.zones.len() >= MAX_DANGER_ZONES {
            self.zones.remove(0);
        }
        self.zones.push(DangerZone {
            position,
            created_at: now,
        });
    }

    fn danger_zones(&self) -> &[DangerZone] {
        &self.zones
    }

    fn predicted_landing(&self) -> Option<LandingZone> {
        self.predicted
    }

    fn update(&mut self, dt: f32, now: f64) {
        if self.remaining > 0.0 {
            self.remaining = (self.remaining - dt).max(0.0);
        }
        self.zones.retain(|z| now - z.created_at < DANGER_ZONE_LIFETIME);
    }

    fn reset(&mut self) {
        self.remaining = 0.0;
        self.predicted = None;
        self.zones.clear();
    }
}

/// External systems the simulation queries each step
#[derive(Debug)]
pub struct Collaborators {
    pub energy: Box<dyn EnergyMode>,
    pub grapple: Box<dyn Grapple>,
    pub ability_shield: Box<dyn AbilityShield>,
    pub jump_safety: Box<dyn JumpSafety>,
    pub character: Box<dyn CharacterStats>,
}

impl Collaborators {
    /// Built-in implementations of every collaborator
    pub fn builtin(tuning: &ProtectionTuning, character: CharacterProfile) -> Self {
        Self {
            energy: Box::new(EnergyMeter::new(tuning)),
            grapple: Box::new(GrappleHook::new(tuning)),
            ability_shield: Box::new(ShieldCharge::new(tuning)),
            jump_safety: Box::new(LandingGrace::new(tuning)),
            character: Box::new(character),
        }
    }

    /// Advance every timer-driven collaborator
    pub fn update(&mut self, dt: f32, now: f64) {
        self.energy.update(dt);
        self.grapple.update(dt);
        self.ability_shield.update(dt);
        self.jump_safety.update(dt, now);
    }

    pub fn reset(&mut self) {
        self.energy.reset();
        self.grapple.reset();
        self.ability_shield.reset();
        self.jump_safety.reset();
    }
}

impl Default for Collaborators {
    fn default() -> Self {
        Self::builtin(&ProtectionTuning::default(), CharacterProfile::default())
    }
}

/// One step's sample of every invincibility source
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default, Serialize)]
pub struct ProtectionSources {
    pub shield_pickup: bool,
    pub energy_mode: bool,
    pub grapple: bool,
    pub landing_grace: bool,
    pub ability_shield: bool,
}

impl ProtectionSources {
    pub fn gather(shield_pickup: bool, collaborators: &Collaborators) -> Self {
        Self {
            shield_pickup,
            energy_mode: collaborators.energy.is_invincible(),
            grapple: collaborators.grapple.is_player_invincible(),
            landing_grace: collaborators.jump_safety.is_invincible(),
            ability_shield: collaborators.ability_shield.is_shielded(),
        }
    }

    #[inline]
    pub fn is_invincible(&self) -> bool {
        self.shield_pickup || self.energy_mode || self.grapple || self.landing_grace || self.ability_shield
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_sources_or_together() {
        assert!(!ProtectionSources::default().is_invincible());
        let each = [
            ProtectionSources { shield_pickup: true, ..Default::default() },
            ProtectionSources { energy_mode: true, ..Default::default() },
            ProtectionSources { grapple: true, ..Default::default() },
            ProtectionSources { landing_grace: true, ..Default::default() },
            ProtectionSources { ability_shield: true, ..Default::default() },
        ];
        for sources in each {
            assert!(sources.is_invincible());
        }
    }

    #[test]
    fn test_energy_meter_triggers_once() {
        let tuning = ProtectionTuning {
            energy_threshold: 3,
            energy_duration: 1.0,
            ..Default::default()
        };
        let mut meter = EnergyMeter::new(&tuning);
        assert!(!meter.on_coin_collect());
        meter.on_damage();
        assert_eq!(meter.coins_collected(), 0);
        assert!(!meter.on_coin_collect());
        assert!(!meter.on_coin_collect());
        assert!(meter.on_coin_collect());
        assert!(meter.is_invincible());
        assert_eq!(meter.speed_multiplier(), 2.0);

        meter.update(1.1);
        assert!(!meter.is_invincible());
        for _ in 0..10 {
            assert!(!meter.on_coin_collect());
        }
    }

    #[test]
    fn test_grapple_flight_and_release_buffer() {
        let tuning = ProtectionTuning::default();
        let mut hook = GrappleHook::new(&tuning);
        assert!(hook.launch(Vec3::ZERO, Vec3::new(3.0, 2.0, -10.0)));
        assert!(!hook.launch(Vec3::ZERO, Vec3::ZERO));
        assert_eq!(hook.last_target_lane(), 2);

        let mut last = Vec3::ZERO;
        let mut steps = 0;
        while let Some(p) = hook.update_position(1.0 / 60.0) {
            last = p;
            steps += 1;
            assert!(steps < 100);
        }
        assert_eq!(last, Vec3::new(3.0, 2.0, -10.0));
        assert!(!hook.is_active());
        assert!(hook.is_player_invincible());

        hook.update(0.25);
        assert!(!hook.is_player_invincible());
        assert!(!hook.status().can_use);
        hook.update(tuning.grapple_cooldown);
        assert!(hook.status().can_use);
    }

    #[test]
    fn test_ability_shield_single_use() {
        let mut shield = ShieldCharge::new(&ProtectionTuning::default());
        assert!(shield.activate());
        assert!(shield.is_shielded());
        shield.deactivate_shield();
        assert!(!shield.is_shielded());
        assert!(!shield.activate());
        shield.update(100.0);
        assert!(shield.activate());
    }

    #[test]
    fn test_landing_grace_window() {
        let mut grace = LandingGrace::new(&ProtectionTuning::default());
        grace.record_jump(Vec3::ZERO, 15.0, 60.0, 15.0, 0.0);
        assert!(!grace.is_invincible());
        let landing = grace.predicted_landing().unwrap();
        assert!((landing.z + 7.5).abs() < 1e-4);

        grace.record_landing(Vec3::ZERO);
        assert!(grace.is_invincible());
        assert!(grace.predicted_landing().is_none());
        grace.update(0.3, 0.8);
        assert!(grace.is_invincible());
        grace.update(0.3, 1.1);
        assert!(!grace.is_invincible());
    }

    #[test]
    fn test_spawn_veto_in_landing_zone() {
        let mut grace = LandingGrace::new(&ProtectionTuning::default());
        grace.record_jump(Vec3::ZERO, 15.0, 60.0, 15.0, 0.0);
        let near = Vec3::new(0.0, 0.0, -8.0);
        // Landing at t=0.5: static obstacles are fine early in the flight
        assert!(grace.is_safe_to_spawn(near, ObstacleKind::Box, true, 0.0));
        assert!(!grace.is_safe_to_spawn(near, ObstacleKind::Box, true, 0.2));
        assert!(!grace.is_safe_to_spawn(near, ObstacleKind::MovingBarrier, true, 0.0));
        assert!(grace.is_safe_to_spawn(near, ObstacleKind::MovingBarrier, false, 0.0));
        assert!(grace.is_safe_to_spawn(Vec3::new(3.0, 0.0, -8.0), ObstacleKind::Box, true, 0.2));
    }

    #[test]
    fn test_danger_zones_capped_and_expire() {
        let mut grace = LandingGrace::new(&ProtectionTuning::default());
        for i in 0..5 {
            grace.add_danger_zone(Vec3::new(0.0, 0.0, -(i as f32)), i as f64 * 0.1);
        }
        assert_eq!(grace.danger_zones().len(), MAX_DANGER_ZONES);
        grace.update(0.0, 10.0);
        assert!(grace.danger_zones().is_empty());
    }

    #[test]
    fn test_character_modifiers() {
        let kachujin = CharacterProfile::named("kachujin").unwrap();
        assert!((kachujin.modified_jump_velocity(15.0) - 16.2).abs() < 1e-4);
        assert_eq!(kachujin.max_jumps(), 1);
    }
}
