//! Frame-stepped simulation tick
//!
//! One call advances a run by `dt` seconds in a fixed order: spawner, player
//! motion, protection sampling, collisions, combo bookkeeping. Events are
//! collected during the step and only handed to observers once it is done.

use glam::Vec3;
use log::{debug, info};

use super::collectible::PowerUpKind;
use super::collision::CollisionWorld;
use super::obstacle::Obstacle;
use super::spawner::SpawnContext;
use super::state::{GameEvent, GameOverReport, RunPhase, RunState, StatsSnapshot};
use super::world_events::WorldEventChange;
use crate::consts::{FRAMES_PER_SECOND, LANE_COUNT};
use crate::lane_x;

/// Distance of obstacle-free running granted after a perfect section
const PERFECT_SECTION_SAFE_ZONE: f32 = 60.0;
/// Autopilot looks this far ahead (units)
const AUTOPILOT_LOOKAHEAD: f32 = 14.0;
/// Half-width of a lane for autopilot occupancy checks
const LANE_HALF_WIDTH: f32 = 1.5;

/// Externally owned values read once per step; the core never writes them
#[derive(Debug, Clone, Copy, PartialEq)]
pub struct ExternalFlags {
    /// Shield power-up effect is running
    pub shield_active: bool,
    /// Coin value multiplier from the multiplier power-up
    pub multiplier: f32,
    pub magnet_active: bool,
    pub time_slow_active: bool,
}

impl Default for ExternalFlags {
    fn default() -> Self {
        Self {
            shield_active: false,
            multiplier: 1.0,
            magnet_active: false,
            time_slow_active: false,
        }
    }
}

/// Input commands for a single step
#[derive(Debug, Clone, Default)]
pub struct TickInput {
    /// -1 left, +1 right
    pub lane_change: Option<i8>,
    pub jump: bool,
    /// Slide toggle
    pub slide: bool,
    /// Pause toggle
    pub pause: bool,
    /// Launch the grapple toward a world point
    pub grapple_target: Option<Vec3>,
    /// Arm the ability shield
    pub activate_shield: bool,
    /// Demo mode: the simulation steers itself
    pub autopilot: bool,
    pub flags: ExternalFlags,
}

/// Everything one step produced
#[derive(Debug, Clone, Default)]
pub struct StepOutput {
    pub events: Vec<GameEvent>,
    /// Present when the stats cadence elapsed this step
    pub stats: Option<StatsSnapshot>,
    /// Present only on the step the run ended
    pub game_over: Option<GameOverReport>,
}

/// Callbacks fired after a step; none of them can reach back into the run
pub trait RunObserver {
    fn on_game_over(&mut self, _report: &GameOverReport) {}
    /// `is_pickup` is false when a protection power-up ends by absorbing a hit
    fn on_power_up(&mut self, _kind: PowerUpKind, _is_pickup: bool) {}
    fn on_stats_update(&mut self, _stats: &StatsSnapshot) {}
    fn on_event(&mut self, _event: &GameEvent) {}
}

/// Hand a finished step's output to an observer
pub fn dispatch(output: &StepOutput, observer: &mut dyn RunObserver) {
    for event in &output.events {
        observer.on_event(event);
        match *event {
            GameEvent::PowerUpCollected { kind } => observer.on_power_up(kind, true),
            GameEvent::PowerUpEnded { kind } => observer.on_power_up(kind, false),
            _ => {}
        }
    }
    if let Some(stats) = &output.stats {
        observer.on_stats_update(stats);
    }
    if let Some(report) = &output.game_over {
        observer.on_game_over(report);
    }
}

/// [`tick`] followed by [`dispatch`]
pub fn tick_observed(
    state: &mut RunState,
    input: &TickInput,
    dt: f32,
    observer: &mut dyn RunObserver,
) -> StepOutput {
    let output = tick(state, input, dt);
    dispatch(&output, observer);
    output
}

/// Advance the run by one step
pub fn tick(state: &mut RunState, input: &TickInput, dt: f32) -> StepOutput {
    let mut out = StepOutput {
        events: std::mem::take(&mut state.pending),
        ..Default::default()
    };

    // Handle pause toggle
    if input.pause {
        match state.phase {
            RunPhase::Running => {
                state.phase = RunPhase::Paused;
                out.events.push(GameEvent::Paused);
                return out;
            }
            RunPhase::Paused => {
                state.phase = RunPhase::Running;
                out.events.push(GameEvent::Resumed);
            }
            RunPhase::GameOver => {}
        }
    }

    if state.phase != RunPhase::Running {
        return out;
    }

    let mut input = input.clone();
    if input.autopilot {
        steer(state, &mut input);
    }
    let flags = input.flags;

    let mut dt = dt.clamp(0.0, state.tuning.physics.max_delta_time);
    if flags.time_slow_active {
        dt *= state.tuning.run.time_slow_factor;
    }
    state.time += dt as f64;
    let now = state.time;

    state.screen_shake *= 0.9;
    if state.screen_shake < 0.01 {
        state.screen_shake = 0.0;
    }
    state.grace_remaining = (state.grace_remaining - dt).max(0.0);
    state.collaborators.update(dt, now);

    // Speed ramps with distance, then character, energy-mode and boost-zone multipliers
    let run = &state.tuning.run;
    let ramp = (state.stats.distance / run.ramp_distance).min(1.0);
    state.stats.speed = (run.base_speed + (run.max_speed - run.base_speed) * ramp)
        * state.collaborators.character.speed_multiplier()
        * state.collaborators.energy.speed_multiplier()
        * state.world_events.speed_multiplier();
    let speed_per_sec = state.stats.speed * FRAMES_PER_SECOND;

    // Spawner: new entities ahead, retire what is behind
    let ctx = SpawnContext {
        player_position: state.player.position,
        player_jumping: state.player.is_jumping,
        now,
        in_start_grace: state.in_grace(),
    };
    let report = state.spawner.tick_timers(
        dt,
        &ctx,
        &state.difficulty,
        state.collaborators.jump_safety.as_mut(),
    );
    if report.vetoed > 0 {
        debug!("{} spawn(s) vetoed by landing prediction", report.vetoed);
    }
    state.spawner.update(dt, state.player.position.z);

    // World events feed their own drops through the spawner
    let player_z = state.player.position.z;
    let spawn_z = player_z - state.tuning.spawn.spawn_distance;
    match state.world_events.update(dt, player_z, spawn_z) {
        Some(WorldEventChange::Started(kind)) => {
            out.events.push(GameEvent::WorldEventStarted { kind })
        }
        Some(WorldEventChange::Ended(kind)) => out.events.push(GameEvent::WorldEventEnded { kind }),
        None => {}
    }
    state.spawner.drain_world_events(&mut state.world_events);

    // Player commands
    if input.activate_shield && state.collaborators.ability_shield.activate() {
        out.events.push(GameEvent::AbilityShieldArmed);
    }
    if let Some(target) = input.grapple_target
        && state.collaborators.grapple.launch(state.player.position, target)
    {
        out.events.push(GameEvent::GrappleLaunched);
    }
    if let Some(direction) = input.lane_change
        && state.player.change_lane(direction)
    {
        out.events.push(GameEvent::LaneChanged {
            lane: state.player.target_lane,
        });
    }
    if input.jump
        && state.player.jump(
            state.collaborators.character.as_ref(),
            state.collaborators.jump_safety.as_mut(),
            speed_per_sec,
            now,
        )
    {
        out.events.push(GameEvent::Jumped {
            jump_count: state.player.jump_count,
        });
    }
    if input.slide && state.player.slide() {
        out.events.push(GameEvent::SlideStarted);
    }

    // Player motion
    let prev_z = state.player.position.z;
    let motion = state.player.update(
        dt,
        state.stats.speed,
        state.collaborators.grapple.as_mut(),
        state.collaborators.jump_safety.as_mut(),
    );
    if motion.landed {
        out.events.push(GameEvent::Landed);
    }
    if motion.grapple_released {
        out.events.push(GameEvent::GrappleReleased {
            lane: state.player.lane,
        });
    }
    let distance_step = (prev_z - state.player.position.z).max(0.0);
    state.stats.distance += distance_step;
    state
        .difficulty
        .update(dt, state.stats.distance, distance_step, state.combo.multiplier);

    // Protection, then contacts
    let protection = state.protection(flags.shield_active);
    let check_obstacles = !state.in_grace();
    let first_event = out.events.len();
    let mut world = CollisionWorld {
        tuning: &state.tuning,
        now,
        player: &mut state.player,
        spawner: &mut state.spawner,
        collaborators: &mut state.collaborators,
        combo: &mut state.combo,
        stats: &mut state.stats,
        flags,
        coin_multiplier: state.world_events.coin_multiplier(),
        protection,
        check_obstacles,
        events: &mut out.events,
    };
    state.collision.step(&mut world);

    for event in &out.events[first_event..] {
        if let GameEvent::Damaged { shake, .. } = *event {
            state.screen_shake = state.screen_shake.max(shake);
        }
    }

    if let Some(bonus) = state.combo.update(now, distance_step) {
        state.stats.score += bonus;
        state.difficulty.trigger_safe_zone(PERFECT_SECTION_SAFE_ZONE);
        out.events.push(GameEvent::PerfectSection { bonus });
    }

    if state.stats.health == 0 {
        state.phase = RunPhase::GameOver;
        out.game_over = state.game_over_report();
        info!(
            "game over: score {}, coins {}, distance {:.0}",
            state.stats.score, state.stats.coins, state.stats.distance
        );
    }

    let due = state
        .last_stats_at
        .is_none_or(|t| now - t >= state.tuning.run.stats_interval);
    if due || out.game_over.is_some() {
        state.last_stats_at = Some(now);
        out.stats = Some(state.snapshot(flags.shield_active));
    }

    out
}

/// Obstacle the player would meet in `lane` within the lookahead, nearest first
fn obstacle_ahead(state: &RunState, lane: usize) -> Option<&Obstacle> {
    let z = state.player.position.z;
    let x = lane_x(lane);
    state
        .spawner
        .active_obstacles()
        .filter(|o| o.is_collidable())
        .filter(|o| {
            let c = o.world_box.center();
            let ahead = z - c.z;
            ahead > -0.5 && ahead < AUTOPILOT_LOOKAHEAD && (c.x - x).abs() < LANE_HALF_WIDTH
        })
        .min_by(|a, b| {
            b.position
                .z
                .partial_cmp(&a.position.z)
                .unwrap_or(std::cmp::Ordering::Equal)
        })
}

/// Idle/demo mode: dodge, jump or slide whatever is coming in the current lane
fn steer(state: &RunState, input: &mut TickInput) {
    let player = &state.player;
    if player.is_grappling {
        return;
    }
    let Some(threat) = obstacle_ahead(state, player.target_lane) else {
        return;
    };
    let meta = threat.meta;
    let distance = player.position.z - threat.world_box.center().z;
    let apex_distance = state.stats.speed * FRAMES_PER_SECOND * state.tuning.physics.jump_force
        / state.tuning.physics.gravity;

    // Prefer sidestepping into a clear adjacent lane
    let free_lane = [-1i8, 1]
        .into_iter()
        .map(|d| (d, player.target_lane as i32 + d as i32))
        .filter(|&(_, lane)| (0..LANE_COUNT as i32).contains(&lane))
        .find(|&(_, lane)| obstacle_ahead(state, lane as usize).is_none());
    if meta.forbids_clearance() || meta.unavoidable {
        if let Some((direction, _)) = free_lane {
            input.lane_change = Some(direction);
        }
        return;
    }

    if meta.can_slide_under && !player.is_sliding && distance < AUTOPILOT_LOOKAHEAD * 0.5 {
        input.slide = true;
    } else if meta.can_jump_over && !player.is_jumping && distance <= apex_distance + 0.5 {
        input.jump = true;
    } else if let Some((direction, _)) = free_lane
        && distance < AUTOPILOT_LOOKAHEAD * 0.5
    {
        input.lane_change = Some(direction);
    }
}
