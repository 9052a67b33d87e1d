//! Coins, power-ups and the lights attached to power-ups

use glam::Vec3;
use serde::{Deserialize, Serialize};

use super::aabb::{Aabb, Pose, world_box};
use super::pool::Poolable;

/// Power-up types
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Default, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum PowerUpKind {
    #[default]
    Shield,
    Multiplier,
    Magnet,
    Health,
    TimeSlow,
    Lightning,
}

impl PowerUpKind {
    pub fn as_str(self) -> &'static str {
        match self {
            PowerUpKind::Shield => "shield",
            PowerUpKind::Multiplier => "multiplier",
            PowerUpKind::Magnet => "magnet",
            PowerUpKind::Health => "health",
            PowerUpKind::TimeSlow => "time",
            PowerUpKind::Lightning => "lightning",
        }
    }

    /// Weighted pick from a uniform roll in [0, 1)
    pub fn from_roll(roll: f32) -> Self {
        if roll < 0.15 {
            PowerUpKind::Shield
        } else if roll < 0.25 {
            PowerUpKind::Multiplier
        } else if roll < 0.35 {
            PowerUpKind::Magnet
        } else if roll < 0.45 {
            PowerUpKind::Health
        } else if roll < 0.70 {
            PowerUpKind::TimeSlow
        } else {
            PowerUpKind::Lightning
        }
    }
}

#[derive(Debug, Clone, Default, Serialize)]
pub struct Coin {
    pub position: Vec3,
    pub value: u32,
    pub local_box: Aabb,
    pub world_box: Aabb,
    pub active: bool,
    pub visible: bool,
    pub pool_index: usize,
    pub anim_time: f32,
    pub base_y: f32,
    pub yaw: f32,
}

impl Poolable for Coin {
    fn is_active(&self) -> bool {
        self.active
    }

    fn activate(&mut self, slot: usize) {
        self.active = true;
        self.visible = true;
        self.pool_index = slot;
    }

    fn deactivate(&mut self) {
        self.active = false;
        self.visible = false;
    }
}

impl Coin {
    pub fn init(&mut self, position: Vec3, value: u32, phase: f32) {
        self.position = position;
        self.value = value;
        self.local_box = Aabb::from_center_size(Vec3::ZERO, Vec3::new(0.8, 0.2, 0.8));
        self.anim_time = phase;
        self.base_y = position.y;
        self.yaw = 0.0;
        self.refresh_world_box();
    }

    /// Bob and spin
    pub fn animate(&mut self, dt: f32) {
        self.anim_time += dt * 3.0;
        self.position.y = self.base_y + self.anim_time.sin() * 0.2;
        self.yaw += dt * 2.0;
    }

    pub fn refresh_world_box(&mut self) {
        let pose = Pose {
            translation: self.position,
            yaw: self.yaw,
            scale: Vec3::ONE,
        };
        self.world_box = world_box(&self.local_box, &pose);
    }
}

#[derive(Debug, Clone, Default, Serialize)]
pub struct PowerUp {
    pub kind: PowerUpKind,
    pub position: Vec3,
    pub local_box: Aabb,
    pub world_box: Aabb,
    pub active: bool,
    pub visible: bool,
    pub pool_index: usize,
    pub yaw: f32,
    /// Slot in the light pool, if one was free at spawn
    pub light: Option<usize>,
}

impl Poolable for PowerUp {
    fn is_active(&self) -> bool {
        self.active
    }

    fn activate(&mut self, slot: usize) {
        self.active = true;
        self.visible = true;
        self.pool_index = slot;
    }

    fn deactivate(&mut self) {
        self.active = false;
        self.visible = false;
    }
}

impl PowerUp {
    pub fn init(&mut self, kind: PowerUpKind, position: Vec3, light: Option<usize>) {
        self.kind = kind;
        self.position = position;
        self.local_box = Aabb::from_center_size(Vec3::ZERO, Vec3::new(0.8, 0.8, 0.3));
        self.yaw = 0.0;
        self.light = light;
        self.refresh_world_box();
    }

    pub fn animate(&mut self, dt: f32) {
        self.yaw += dt * 2.0;
    }

    pub fn refresh_world_box(&mut self) {
        let pose = Pose {
            translation: self.position,
            yaw: self.yaw,
            scale: Vec3::ONE,
        };
        self.world_box = world_box(&self.local_box, &pose);
    }
}

/// Point light that follows a power-up
#[derive(Debug, Clone, Default, Serialize)]
pub struct PowerUpLight {
    pub position: Vec3,
    pub kind: PowerUpKind,
    pub active: bool,
    pub pool_index: usize,
}

impl Poolable for PowerUpLight {
    fn is_active(&self) -> bool {
        self.active
    }

    fn activate(&mut self, slot: usize) {
        self.active = true;
        self.pool_index = slot;
    }

    fn deactivate(&mut self) {
        self.active = false;
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_power_up_roll_bands() {
        assert_eq!(PowerUpKind::from_roll(0.0), PowerUpKind::Shield);
        assert_eq!(PowerUpKind::from_roll(0.2), PowerUpKind::Multiplier);
        assert_eq!(PowerUpKind::from_roll(0.3), PowerUpKind::Magnet);
        assert_eq!(PowerUpKind::from_roll(0.4), PowerUpKind::Health);
        assert_eq!(PowerUpKind::from_roll(0.5), PowerUpKind::TimeSlow);
        assert_eq!(PowerUpKind::from_roll(0.99), PowerUpKind::Lightning);
    }

    #[test]
    fn test_coin_bob_stays_in_range() {
        let mut coin = Coin::default();
        coin.init(Vec3::new(0.0, 1.0, -20.0), 1, 0.0);
        for _ in 0..120 {
            coin.animate(1.0 / 60.0);
            assert!((coin.position.y - 1.0).abs() <= 0.2 + 1e-5);
        }
        coin.refresh_world_box();
        assert!(coin.world_box.intersects(&Aabb::from_center_size(coin.position, Vec3::splat(0.1))));
    }
}
