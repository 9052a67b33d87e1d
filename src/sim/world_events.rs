//! Timed world events
//!
//! Every so often the run enters a themed stretch. Meteor showers drop extra
//! spikes, lightning storms drop rotating lasers, coin rain drops bursts of
//! coins, and a speed-boost zone speeds the player up while inside it. At most
//! one event runs at a time. Spawns are queued here and drained by the
//! spawner once per step.

use log::{debug, info};
use rand::{Rng, SeedableRng};
use rand_pcg::Pcg32;
use serde::{Deserialize, Serialize};

use super::obstacle::ObstacleKind;
use crate::consts::LANE_COUNT;
use crate::settings::EventTuning;

/// Mixed into the run seed so event rolls leave the spawner's stream alone
const EVENT_SEED_SALT: u64 = 0x9e37_79b9_7f4a_7c15;
/// Z spacing between coins of one coin-rain burst
const COIN_RAIN_SPACING: f32 = 2.0;

#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum WorldEventKind {
    MeteorShower,
    LightningStorm,
    SpeedBoostZone,
    CoinRain,
}

impl WorldEventKind {
    pub const ALL: [WorldEventKind; 4] = [
        WorldEventKind::MeteorShower,
        WorldEventKind::LightningStorm,
        WorldEventKind::SpeedBoostZone,
        WorldEventKind::CoinRain,
    ];

    pub fn as_str(self) -> &'static str {
        match self {
            WorldEventKind::MeteorShower => "meteor_shower",
            WorldEventKind::LightningStorm => "lightning_storm",
            WorldEventKind::SpeedBoostZone => "speed_boost_zone",
            WorldEventKind::CoinRain => "coin_rain",
        }
    }

    pub fn weight(self) -> f32 {
        match self {
            WorldEventKind::MeteorShower | WorldEventKind::LightningStorm => 1.0,
            WorldEventKind::SpeedBoostZone => 0.8,
            WorldEventKind::CoinRain => 1.2,
        }
    }

    /// Seconds the event runs
    pub fn duration(self) -> f32 {
        match self {
            WorldEventKind::MeteorShower => 15.0,
            WorldEventKind::LightningStorm => 12.0,
            WorldEventKind::SpeedBoostZone => 10.0,
            WorldEventKind::CoinRain => 8.0,
        }
    }

    /// Weighted pick from a uniform roll in [0, 1)
    pub fn from_roll(roll: f32) -> Self {
        let total: f32 = Self::ALL.iter().map(|k| k.weight()).sum();
        let mut remaining = roll * total;
        for kind in Self::ALL {
            remaining -= kind.weight();
            if remaining <= 0.0 {
                return kind;
            }
        }
        WorldEventKind::CoinRain
    }
}

/// An obstacle an event wants placed
#[derive(Debug, Clone, Copy, PartialEq)]
pub struct ObstacleDrop {
    pub kind: ObstacleKind,
    pub lane: usize,
    pub z: f32,
}

/// A coin an event wants placed
#[derive(Debug, Clone, Copy, PartialEq)]
pub struct CoinDrop {
    pub lane: usize,
    pub z: f32,
    pub height: f32,
    pub value: u32,
}

/// Spawns queued since the last drain
#[derive(Debug, Clone, Default, PartialEq)]
pub struct EventSpawns {
    pub obstacles: Vec<ObstacleDrop>,
    pub coins: Vec<CoinDrop>,
}

impl EventSpawns {
    pub fn is_empty(&self) -> bool {
        self.obstacles.is_empty() && self.coins.is_empty()
    }
}

/// The event currently running
#[derive(Debug, Clone, Copy, PartialEq, Serialize)]
pub struct ActiveWorldEvent {
    pub kind: WorldEventKind,
    pub elapsed: f32,
    pub duration: f32,
    /// Player Z when the event began; a speed-boost zone is measured from here
    pub zone_start: f32,
    pub player_in_zone: bool,
    #[serde(skip)]
    spawn_timer: f32,
}

/// HUD view of the running event
#[derive(Debug, Clone, Copy, PartialEq, Serialize)]
pub struct WorldEventStatus {
    pub kind: WorldEventKind,
    pub time_remaining: f32,
    pub speed_multiplier: f32,
    pub coin_multiplier: f32,
}

/// Lifecycle transition reported by [`WorldEvents::update`]
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum WorldEventChange {
    Started(WorldEventKind),
    Ended(WorldEventKind),
}

#[derive(Debug, Clone)]
pub struct WorldEvents {
    tuning: EventTuning,
    rng: Pcg32,
    /// Seconds since the last event started (or since the run began)
    timer: f32,
    next_at: f32,
    active: Option<ActiveWorldEvent>,
    queued: EventSpawns,
}

impl WorldEvents {
    pub fn new(tuning: &EventTuning, seed: u64) -> Self {
        Self {
            tuning: tuning.clone(),
            rng: Pcg32::seed_from_u64(seed ^ EVENT_SEED_SALT),
            timer: 0.0,
            next_at: tuning.first_event_at,
            active: None,
            queued: EventSpawns::default(),
        }
    }

    pub fn reset(&mut self, seed: u64) {
        *self = Self::new(&self.tuning, seed);
    }

    pub fn active(&self) -> Option<&ActiveWorldEvent> {
        self.active.as_ref()
    }

    /// Begin `kind` now, replacing whatever was running
    pub fn start(&mut self, kind: WorldEventKind, player_z: f32) -> WorldEventChange {
        self.active = Some(ActiveWorldEvent {
            kind,
            elapsed: 0.0,
            duration: kind.duration(),
            zone_start: player_z,
            player_in_zone: kind == WorldEventKind::SpeedBoostZone,
            spawn_timer: 0.0,
        });
        self.timer = 0.0;
        self.next_at = self.tuning.min_gap + self.rng.random::<f32>() * self.tuning.gap_jitter;
        info!("world event started: {} ({:.0}s)", kind.as_str(), kind.duration());
        WorldEventChange::Started(kind)
    }

    /// Advance the event clock. `spawn_z` is where queued entities appear.
    pub fn update(&mut self, dt: f32, player_z: f32, spawn_z: f32) -> Option<WorldEventChange> {
        if !self.tuning.enabled {
            return None;
        }
        self.timer += dt;

        let mut change = None;
        if self.active.is_none() && self.timer >= self.next_at {
            let kind = WorldEventKind::from_roll(self.rng.random());
            change = Some(self.start(kind, player_z));
        }

        let mut event = self.active?;
        event.elapsed += dt;
        self.advance(&mut event, dt, player_z, spawn_z);

        if event.elapsed >= event.duration {
            self.active = None;
            info!("world event ended: {}", event.kind.as_str());
            return Some(WorldEventChange::Ended(event.kind));
        }
        self.active = Some(event);
        change
    }

    fn advance(&mut self, event: &mut ActiveWorldEvent, dt: f32, player_z: f32, spawn_z: f32) {
        let interval = match event.kind {
            WorldEventKind::MeteorShower => self.tuning.meteor_interval,
            WorldEventKind::LightningStorm => self.tuning.lightning_interval,
            WorldEventKind::CoinRain => self.tuning.coin_rain_interval,
            WorldEventKind::SpeedBoostZone => {
                let travelled = event.zone_start - player_z;
                let inside = (0.0..=self.tuning.boost_zone_length).contains(&travelled);
                if inside != event.player_in_zone {
                    debug!("speed boost zone {}", if inside { "entered" } else { "left" });
                }
                event.player_in_zone = inside;
                return;
            }
        };

        event.spawn_timer += dt;
        if event.spawn_timer < interval {
            return;
        }
        event.spawn_timer = 0.0;

        match event.kind {
            WorldEventKind::MeteorShower => self.queue_obstacle(ObstacleKind::Spike, spawn_z),
            WorldEventKind::LightningStorm => self.queue_obstacle(ObstacleKind::RotatingLaser, spawn_z),
            _ => {
                for i in 0..self.tuning.coin_rain_burst {
                    let lane = self.rng.random_range(0..LANE_COUNT);
                    let height = 1.0 + self.rng.random::<f32>() * 1.5;
                    self.queued.coins.push(CoinDrop {
                        lane,
                        z: spawn_z - i as f32 * COIN_RAIN_SPACING,
                        height,
                        value: 1,
                    });
                }
            }
        }
    }

    fn queue_obstacle(&mut self, kind: ObstacleKind, z: f32) {
        let lane = self.rng.random_range(0..LANE_COUNT);
        self.queued.obstacles.push(ObstacleDrop { kind, lane, z });
    }

    /// Hand over everything queued since the last drain
    pub fn drain(&mut self) -> EventSpawns {
        std::mem::take(&mut self.queued)
    }

    pub fn speed_multiplier(&self) -> f32 {
        match self.active {
            Some(e) if e.kind == WorldEventKind::SpeedBoostZone && e.player_in_zone => {
                self.tuning.boost_speed_multiplier
            }
            _ => 1.0,
        }
    }

    pub fn coin_multiplier(&self) -> f32 {
        match self.active {
            Some(e) if e.kind == WorldEventKind::CoinRain => self.tuning.coin_rain_multiplier,
            _ => 1.0,
        }
    }

    pub fn status(&self) -> Option<WorldEventStatus> {
        self.active.map(|e| WorldEventStatus {
            kind: e.kind,
            time_remaining: (e.duration - e.elapsed).max(0.0),
            speed_multiplier: self.speed_multiplier(),
            coin_multiplier: self.coin_multiplier(),
        })
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    const DT: f32 = 0.1;

    fn events() -> WorldEvents {
        WorldEvents::new(&EventTuning::default(), 8)
    }

    /// Step `seconds` of sim time with the player standing still
    fn run(ev: &mut WorldEvents, seconds: f32) -> Vec<WorldEventChange> {
        let steps = (seconds / DT).round() as usize;
        (0..steps).filter_map(|_| ev.update(DT, 0.0, -120.0)).collect()
    }

    #[test]
    fn test_weighted_roll() {
        assert_eq!(WorldEventKind::from_roll(0.0), WorldEventKind::MeteorShower);
        assert_eq!(WorldEventKind::from_roll(0.3), WorldEventKind::LightningStorm);
        assert_eq!(WorldEventKind::from_roll(0.6), WorldEventKind::SpeedBoostZone);
        assert_eq!(WorldEventKind::from_roll(0.99), WorldEventKind::CoinRain);
    }

    #[test]
    fn test_first_event_waits() {
        let mut ev = events();
        assert!(run(&mut ev, 29.5).is_empty());
        assert!(ev.active().is_none());
        let changes = run(&mut ev, 1.0);
        assert!(matches!(changes.as_slice(), [WorldEventChange::Started(_)]));
        assert!(ev.status().is_some());
    }

    #[test]
    fn test_meteor_shower_queues_spikes_and_ends() {
        let mut ev = events();
        ev.start(WorldEventKind::MeteorShower, 0.0);
        run(&mut ev, 5.0);
        let spawns = ev.drain();
        assert_eq!(spawns.obstacles.len(), 2);
        assert!(spawns.obstacles.iter().all(|o| o.kind == ObstacleKind::Spike && o.z == -120.0));
        assert!(ev.drain().is_empty());

        let changes = run(&mut ev, 11.0);
        assert_eq!(changes, vec![WorldEventChange::Ended(WorldEventKind::MeteorShower)]);
        assert!(ev.active().is_none());
    }

    #[test]
    fn test_coin_rain_bursts_and_multiplier() {
        let mut ev = events();
        ev.start(WorldEventKind::CoinRain, 0.0);
        assert_eq!(ev.coin_multiplier(), 1.5);
        run(&mut ev, 1.0);
        let coins = ev.drain().coins;
        assert_eq!(coins.len(), 5);
        for (i, c) in coins.iter().enumerate() {
            assert!((1.0..=2.5).contains(&c.height));
            assert!((c.z - (-120.0 - 2.0 * i as f32)).abs() < 1e-4);
        }
        run(&mut ev, 8.0);
        assert_eq!(ev.coin_multiplier(), 1.0);
    }

    #[test]
    fn test_speed_boost_zone_covers_its_length() {
        let mut ev = events();
        ev.start(WorldEventKind::SpeedBoostZone, 0.0);
        ev.update(DT, -50.0, -170.0);
        assert_eq!(ev.speed_multiplier(), 1.3);
        ev.update(DT, -250.0, -370.0);
        assert_eq!(ev.speed_multiplier(), 1.0);
        assert!(ev.drain().is_empty());
    }

    #[test]
    fn test_disabled_never_starts() {
        let tuning = EventTuning {
            enabled: false,
            ..Default::default()
        };
        let mut ev = WorldEvents::new(&tuning, 1);
        assert!(run(&mut ev, 120.0).is_empty());
    }

    #[test]
    fn test_same_seed_same_schedule() {
        let mut a = events();
        let mut b = events();
        assert_eq!(run(&mut a, 200.0), run(&mut b, 200.0));
    }
}
