//! Player motion and state machine
//!
//! Vertical motion integrates gravity and jump impulses, lateral motion eases
//! toward the target lane, and sliding swaps in a compressed local box. While
//! an external grapple is flying, it owns the position and lane control is
//! suspended until release.

use glam::Vec3;
use serde::Serialize;

use super::aabb::Aabb;
use super::protection::{CharacterStats, Grapple, JumpSafety};
use crate::consts::{CENTER_LANE, FRAMES_PER_SECOND, LANE_COUNT};
use crate::settings::{PhysicsTuning, PlayerTuning};
use crate::{lane_x, smoothing_alpha};

/// Coarse motion state
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize)]
pub enum MotionState {
    Grounded,
    Jumping,
    Sliding,
    Grappling,
}

/// Result of one controller update
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default)]
pub struct MotionUpdate {
    /// A jump ended on the ground this step
    pub landed: bool,
    /// A grapple flight handed control back this step
    pub grapple_released: bool,
}

#[derive(Debug, Clone, Serialize)]
pub struct PlayerController {
    pub position: Vec3,
    pub lane: usize,
    pub target_lane: usize,
    pub vertical_velocity: f32,
    pub is_jumping: bool,
    pub is_sliding: bool,
    pub is_grappling: bool,
    pub jump_count: u32,
    pub slide_timer: f32,
    /// Visual squash while sliding
    pub scale_y: f32,
    pub local_box: Aabb,
    pub world_box: Aabb,
    #[serde(skip)]
    physics: PhysicsTuning,
    #[serde(skip)]
    standing_box: Aabb,
    #[serde(skip)]
    sliding_box: Aabb,
}

impl PlayerController {
    pub fn new(physics: &PhysicsTuning, body: &PlayerTuning) -> Self {
        let standing_box = Aabb::from_center_size(
            Vec3::new(0.0, body.height * 0.5, 0.0),
            Vec3::new(body.width, body.height, body.depth),
        );
        let sliding_box = Aabb::new(
            Vec3::new(-body.slide_half_width, standing_box.min.y, standing_box.min.z),
            Vec3::new(
                body.slide_half_width,
                standing_box.min.y + body.slide_height,
                standing_box.max.z,
            ),
        );
        let position = Vec3::new(lane_x(CENTER_LANE), physics.base_height, 0.0);
        Self {
            position,
            lane: CENTER_LANE,
            target_lane: CENTER_LANE,
            vertical_velocity: 0.0,
            is_jumping: false,
            is_sliding: false,
            is_grappling: false,
            jump_count: 0,
            slide_timer: 0.0,
            scale_y: 1.0,
            local_box: standing_box,
            world_box: standing_box.translated(position),
            physics: physics.clone(),
            standing_box,
            sliding_box,
        }
    }

    pub fn state(&self) -> MotionState {
        if self.is_grappling {
            MotionState::Grappling
        } else if self.is_sliding {
            MotionState::Sliding
        } else if self.is_jumping {
            MotionState::Jumping
        } else {
            MotionState::Grounded
        }
    }

    pub fn is_airborne(&self) -> bool {
        self.position.y > self.physics.base_height + self.physics.ground_epsilon
    }

    /// Start or chain a jump. `forward_speed` is in units per second.
    pub fn jump(
        &mut self,
        character: &dyn CharacterStats,
        safety: &mut dyn JumpSafety,
        forward_speed: f32,
        now: f64,
    ) -> bool {
        if self.is_grappling || self.jump_count >= character.max_jumps() {
            return false;
        }

        let mut force = character.modified_jump_velocity(self.physics.jump_force);
        if self.jump_count > 0 {
            force *= self.physics.extra_jump_penalty;
        }
        self.vertical_velocity = force;
        self.is_jumping = true;
        self.jump_count += 1;
        self.set_sliding(false);

        safety.record_jump(self.position, force, self.physics.gravity, forward_speed, now);
        true
    }

    /// Toggle sliding; returns true when a slide started
    pub fn slide(&mut self) -> bool {
        if self.is_grappling {
            return false;
        }
        if self.is_sliding {
            self.set_sliding(false);
            return false;
        }
        self.set_sliding(true);
        if self.is_jumping {
            self.vertical_velocity = -self.physics.gravity * self.physics.airborne_slide_factor;
        }
        true
    }

    /// Shift the target lane by `direction` (±1)
    pub fn change_lane(&mut self, direction: i8) -> bool {
        if self.is_grappling {
            return false;
        }
        let hard_landing = self.is_jumping
            && self.vertical_velocity < self.physics.hard_landing_velocity
            && self.position.y < self.physics.base_height + self.physics.hard_landing_height;
        if hard_landing {
            return false;
        }

        let lane = self.target_lane as i32 + direction as i32;
        if (0..LANE_COUNT as i32).contains(&lane) {
            self.target_lane = lane as usize;
            true
        } else {
            false
        }
    }

    /// Advance one step. `speed` is forward speed per 60 Hz frame.
    pub fn update(
        &mut self,
        dt: f32,
        speed: f32,
        grapple: &mut dyn Grapple,
        safety: &mut dyn JumpSafety,
    ) -> MotionUpdate {
        let dt = dt.min(self.physics.max_delta_time);
        let mut result = MotionUpdate::default();

        self.position.z -= speed * FRAMES_PER_SECOND * dt;

        if grapple.is_active() && !self.is_grappling {
            self.is_grappling = true;
            self.set_sliding(false);
        }

        if self.is_grappling {
            match grapple.update_position(dt) {
                Some(p) => self.position = p,
                None => {
                    self.is_grappling = false;
                    self.lane = grapple.last_target_lane().min(LANE_COUNT - 1);
                    self.target_lane = self.lane;
                    self.position.x = lane_x(self.lane);
                    self.vertical_velocity = self.physics.jump_force * self.physics.grapple_exit_factor;
                    self.is_jumping = true;
                    result.grapple_released = true;
                }
            }
        } else {
            let target_x = lane_x(self.target_lane);
            let alpha = smoothing_alpha(self.physics.lane_change_speed, dt);
            self.position.x += (target_x - self.position.x) * alpha;
            if (self.position.x - target_x).abs() < self.physics.lane_snap_epsilon {
                self.position.x = target_x;
            }

            self.position.y += self.vertical_velocity * dt;
            self.vertical_velocity -= self.physics.gravity * dt;

            let grounded = self.position.y <= self.physics.base_height + self.physics.ground_epsilon;
            if grounded && self.vertical_velocity <= 0.0 {
                self.position.y = self.physics.base_height;
                self.vertical_velocity = 0.0;
                self.jump_count = 0;
                self.lane = self.target_lane;
                if self.is_jumping {
                    self.is_jumping = false;
                    safety.record_landing(self.position);
                    result.landed = true;
                }
            }
        }

        if self.is_sliding {
            self.slide_timer -= dt;
            if self.slide_timer <= 0.0 {
                self.set_sliding(false);
            }
        }

        if self.position.y < self.physics.base_height {
            self.position.y = self.physics.base_height;
            self.vertical_velocity = self.vertical_velocity.max(0.0);
        }

        self.refresh_world_box();
        result
    }

    /// Re-derive the world box from the current local box and position
    pub fn refresh_world_box(&mut self) {
        self.world_box = self.local_box.translated(self.position);
    }

    /// Full reset for a new run or a revive
    pub fn reset(&mut self) {
        self.lane = CENTER_LANE;
        self.target_lane = CENTER_LANE;
        self.vertical_velocity = 0.0;
        self.is_jumping = false;
        self.is_grappling = false;
        self.jump_count = 0;
        self.set_sliding(false);
        self.position = Vec3::new(lane_x(CENTER_LANE), self.physics.base_height, self.position.z);
        self.refresh_world_box();
    }

    /// Snap to the target lane center
    pub fn reset_to_lane(&mut self) {
        self.lane = self.target_lane;
        self.position.x = lane_x(self.lane);
        self.refresh_world_box();
    }

    /// Recover after taking a hit: cancel slide/jump and re-center in lane
    pub fn reset_from_collision(&mut self) {
        self.set_sliding(false);
        self.vertical_velocity = 0.0;
        self.is_jumping = false;
        self.jump_count = 0;
        self.position.x = lane_x(self.lane);
        self.position.y = self.position.y.max(self.physics.base_height);
        self.refresh_world_box();
    }

    /// Slide flag, timer, local box and visual scale change together
    fn set_sliding(&mut self, sliding: bool) {
        self.is_sliding = sliding;
        if sliding {
            self.slide_timer = self.physics.slide_duration;
            self.local_box = self.sliding_box;
            self.scale_y = 0.5;
        } else {
            self.slide_timer = 0.0;
            self.local_box = self.standing_box;
            self.scale_y = 1.0;
        }
        self.refresh_world_box();
    }
}
