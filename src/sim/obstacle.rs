//! Obstacle kinds, per-kind metadata table and the pooled obstacle entity

use glam::Vec3;
use serde::{Deserialize, Serialize};

use super::aabb::{Aabb, Pose, world_box};
use super::pool::Poolable;

/// Closed set of obstacle types
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Default, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum ObstacleKind {
    #[default]
    Box,
    Spike,
    Barrier,
    Wall,
    Drone,
    LaserGrid,
    MovingBarrier,
    RotatingLaser,
    EnergyBarrier,
    DroneTurret,
    PlasmaGate,
    BarHigh,
    BarLow,
    TallWall,
}

/// Which contact path an obstacle kind goes through
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum ObstacleCategory {
    /// Pool-only simple shapes: translation-only pose, degenerate-box skip
    Instanced,
    /// Named multi-part obstacles: generic check plus 3D distance fallback
    Complex,
    /// Slide-specialized: compares player height against the hit volume center
    Sliding,
}

/// Static per-kind data, resolved once at spawn
#[derive(Debug, Clone, Copy, PartialEq)]
pub struct ObstacleProfile {
    pub height: f32,
    pub is_wall: bool,
    /// Explicit overrides of the height-derived clearance flags
    pub jump_override: Option<bool>,
    pub slide_override: Option<bool>,
    pub requires_slide: bool,
    pub is_dynamic: bool,
    pub unavoidable: bool,
    /// Y of the entity origin at spawn
    pub spawn_y: f32,
    /// Body-relative hit volume (center, size)
    pub local_box: (Vec3, Vec3),
    pub hit_sound: &'static str,
    pub category: ObstacleCategory,
}

const fn profile(
    height: f32,
    is_wall: bool,
    spawn_y: f32,
    center_y: f32,
    size: (f32, f32, f32),
    category: ObstacleCategory,
) -> ObstacleProfile {
    ObstacleProfile {
        height,
        is_wall,
        jump_override: None,
        slide_override: None,
        requires_slide: false,
        is_dynamic: false,
        unavoidable: false,
        spawn_y,
        local_box: (Vec3::new(0.0, center_y, 0.0), Vec3::new(size.0, size.1, size.2)),
        hit_sound: "crash",
        category,
    }
}

impl ObstacleKind {
    pub const ALL: [ObstacleKind; 14] = [
        ObstacleKind::Box,
        ObstacleKind::Spike,
        ObstacleKind::Barrier,
        ObstacleKind::Wall,
        ObstacleKind::Drone,
        ObstacleKind::LaserGrid,
        ObstacleKind::MovingBarrier,
        ObstacleKind::RotatingLaser,
        ObstacleKind::EnergyBarrier,
        ObstacleKind::DroneTurret,
        ObstacleKind::PlasmaGate,
        ObstacleKind::BarHigh,
        ObstacleKind::BarLow,
        ObstacleKind::TallWall,
    ];

    /// Position in [`ObstacleKind::ALL`] (used to index per-kind pools)
    pub fn index(self) -> usize {
        self as usize
    }

    pub fn as_str(self) -> &'static str {
        match self {
            ObstacleKind::Box => "box",
            ObstacleKind::Spike => "spike",
            ObstacleKind::Barrier => "barrier",
            ObstacleKind::Wall => "wall",
            ObstacleKind::Drone => "drone",
            ObstacleKind::LaserGrid => "laser_grid",
            ObstacleKind::MovingBarrier => "moving_barrier",
            ObstacleKind::RotatingLaser => "rotating_laser",
            ObstacleKind::EnergyBarrier => "energy_barrier",
            ObstacleKind::DroneTurret => "drone_turret",
            ObstacleKind::PlasmaGate => "plasma_gate",
            ObstacleKind::BarHigh => "bar_high",
            ObstacleKind::BarLow => "bar_low",
            ObstacleKind::TallWall => "tall_wall",
        }
    }

    pub fn from_str(s: &str) -> Option<Self> {
        Self::ALL.into_iter().find(|k| k.as_str() == s)
    }

    pub fn category(self) -> ObstacleCategory {
        self.profile().category
    }

    /// Box/spike/barrier can be smashed while protected
    pub fn is_destructible(self) -> bool {
        matches!(
            self,
            ObstacleKind::Box | ObstacleKind::Spike | ObstacleKind::Barrier
        )
    }

    /// Size of the box fitted around the entity when it carries no local box
    pub fn visual_extent(self) -> Vec3 {
        match self {
            ObstacleKind::Box => Vec3::new(0.9, 1.5, 0.9),
            ObstacleKind::Spike => Vec3::new(0.7, 1.2, 0.7),
            ObstacleKind::Barrier => Vec3::new(3.0, 0.8, 0.4),
            _ => Vec3::new(0.8, 1.0, 0.6),
        }
    }

    pub fn profile(self) -> ObstacleProfile {
        use ObstacleCategory::*;
        match self {
            ObstacleKind::Box => ObstacleProfile {
                slide_override: Some(false),
                ..profile(1.5, false, 0.75, 0.0, (1.3, 1.3, 1.3), Instanced)
            },
            ObstacleKind::Spike => ObstacleProfile {
                slide_override: Some(false),
                ..profile(1.2, false, 0.6, 0.0, (0.8, 1.1, 0.8), Instanced)
            },
            ObstacleKind::Barrier => ObstacleProfile {
                slide_override: Some(true),
                ..profile(1.8, false, 1.8, 0.0, (2.8, 0.5, 0.3), Instanced)
            },
            ObstacleKind::Wall => ObstacleProfile {
                slide_override: Some(true),
                ..profile(1.8, true, 0.0, 1.8, (2.4, 0.4, 0.3), Complex)
            },
            ObstacleKind::Drone => ObstacleProfile {
                is_dynamic: true,
                ..profile(1.5, false, 1.5, 0.0, (1.0, 1.0, 1.5), Complex)
            },
            ObstacleKind::LaserGrid => profile(1.5, false, 0.0, 0.75, (3.2, 1.5, 0.1), Complex),
            ObstacleKind::MovingBarrier => ObstacleProfile {
                is_dynamic: true,
                ..profile(2.0, false, 0.0, 1.0, (1.0, 2.0, 0.4), Complex)
            },
            ObstacleKind::RotatingLaser => ObstacleProfile {
                is_dynamic: true,
                hit_sound: "laser_zap",
                ..profile(3.0, false, 0.0, 1.5, (0.5, 3.0, 2.5), Complex)
            },
            ObstacleKind::EnergyBarrier => ObstacleProfile {
                slide_override: Some(true),
                requires_slide: true,
                ..profile(1.35, true, 0.0, 1.85, (2.8, 0.3, 0.4), Sliding)
            },
            ObstacleKind::DroneTurret => ObstacleProfile {
                slide_override: Some(true),
                requires_slide: true,
                is_dynamic: true,
                ..profile(1.4, true, 0.0, 1.9, (1.8, 0.25, 0.25), Sliding)
            },
            ObstacleKind::PlasmaGate => ObstacleProfile {
                slide_override: Some(true),
                requires_slide: true,
                is_dynamic: true,
                ..profile(1.25, true, 0.0, 1.75, (2.6, 0.35, 0.2), Sliding)
            },
            ObstacleKind::BarHigh => ObstacleProfile {
                jump_override: Some(false),
                slide_override: Some(true),
                requires_slide: true,
                hit_sound: "bar_whoosh_high",
                ..profile(1.6, false, 0.0, 1.6, (2.4, 0.25, 0.3), Sliding)
            },
            ObstacleKind::BarLow => ObstacleProfile {
                jump_override: Some(true),
                slide_override: Some(true),
                hit_sound: "bar_whoosh",
                ..profile(1.2, false, 0.0, 1.2, (2.4, 0.25, 0.3), Sliding)
            },
            ObstacleKind::TallWall => ObstacleProfile {
                jump_override: Some(false),
                slide_override: Some(false),
                unavoidable: true,
                hit_sound: "wall_crash",
                ..profile(2.5, true, 0.0, 1.25, (2.4, 2.5, 0.3), Sliding)
            },
        }
    }
}

/// Clearance and behavior flags, fixed at spawn
#[derive(Debug, Clone, Copy, PartialEq, Default, Serialize)]
pub struct ObstacleMeta {
    pub can_jump_over: bool,
    pub can_slide_under: bool,
    pub requires_grapple: bool,
    pub requires_slide: bool,
    pub is_dynamic: bool,
    pub unavoidable: bool,
    pub hit_sound: &'static str,
}

impl ObstacleMeta {
    /// Derive clearance flags from obstacle height and wall flag
    pub fn derive(height: f32, is_wall: bool) -> Self {
        Self {
            can_jump_over: height <= 1.0,
            can_slide_under: height >= 1.2,
            requires_grapple: height > 1.8 || is_wall,
            hit_sound: "crash",
            ..Default::default()
        }
    }

    /// Height-derived flags with the kind's overrides applied
    pub fn for_kind(kind: ObstacleKind) -> Self {
        let profile = kind.profile();
        let mut meta = Self::derive(profile.height, profile.is_wall);
        if let Some(jump) = profile.jump_override {
            meta.can_jump_over = jump;
        }
        if let Some(slide) = profile.slide_override {
            meta.can_slide_under = slide;
        }
        meta.requires_slide = profile.requires_slide;
        meta.is_dynamic = profile.is_dynamic;
        meta.unavoidable = profile.unavoidable;
        meta.hit_sound = profile.hit_sound;
        meta
    }

    /// Neither clearance rule can ever excuse an overlap
    pub fn forbids_clearance(&self) -> bool {
        !self.can_jump_over && !self.can_slide_under
    }
}

/// Per-kind animation state
#[derive(Debug, Clone, Copy, PartialEq, Default, Serialize)]
pub struct ObstacleAnim {
    pub time: f32,
    /// Origin the bob/oscillation is measured from
    pub anchor: Vec3,
}

/// A pooled obstacle
#[derive(Debug, Clone, Default, Serialize)]
pub struct Obstacle {
    pub kind: ObstacleKind,
    pub position: Vec3,
    pub yaw: f32,
    /// Body-relative hit volume; `None` falls back to the kind's visual extent
    pub local_box: Option<Aabb>,
    pub world_box: Aabb,
    pub meta: ObstacleMeta,
    pub active: bool,
    pub visible: bool,
    pub pool_index: usize,
    /// One-time slide bonus latch
    pub slide_reward_given: bool,
    /// One-time near-miss latch
    pub near_miss_checked: bool,
    /// Sim time of the last contact reported for this instance
    pub last_hit_at: Option<f64>,
    pub anim: ObstacleAnim,
}

impl Poolable for Obstacle {
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

impl Obstacle {
    /// Stamp a freshly acquired slot with kind data at a lane position
    pub fn init(&mut self, kind: ObstacleKind, x: f32, z: f32, phase: f32) {
        let profile = kind.profile();
        let (center, size) = profile.local_box;
        self.kind = kind;
        self.position = Vec3::new(x, profile.spawn_y, z);
        self.yaw = 0.0;
        self.local_box = Some(Aabb::from_center_size(center, size));
        self.meta = ObstacleMeta::for_kind(kind);
        self.slide_reward_given = false;
        self.near_miss_checked = false;
        self.last_hit_at = None;
        self.anim = ObstacleAnim {
            time: phase,
            anchor: self.position,
        };
        self.refresh_world_box();
    }

    #[inline]
    pub fn is_collidable(&self) -> bool {
        self.active && self.visible
    }

    pub fn pose(&self) -> Pose {
        match self.kind.category() {
            // Instanced shapes carry translation only
            ObstacleCategory::Instanced => Pose::at(self.position),
            _ => Pose {
                translation: self.position,
                yaw: self.yaw,
                scale: Vec3::ONE,
            },
        }
    }

    /// Re-derive `world_box` from `local_box` and the current pose
    pub fn refresh_world_box(&mut self) {
        self.world_box = match &self.local_box {
            Some(local) => world_box(local, &self.pose()),
            None => Aabb::from_center_size(self.position, self.kind.visual_extent()),
        };
    }

    /// Advance bob / oscillation / spin
    pub fn animate(&mut self, dt: f32) {
        match self.kind {
            ObstacleKind::Drone => {
                self.anim.time += dt * 2.0;
                self.position.y = self.anim.anchor.y + self.anim.time.sin() * 0.3;
                self.yaw += dt * 2.0;
            }
            ObstacleKind::MovingBarrier => {
                self.anim.time += dt;
                self.position.x = self.anim.anchor.x + (self.anim.time * 2.0).sin() * 1.5;
            }
            ObstacleKind::RotatingLaser => {
                self.yaw += dt * 0.7;
            }
            _ => {}
        }
    }
}
