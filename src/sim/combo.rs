//! Combo streaks, multiplier and perfect-section bonus

use serde::Serialize;

use crate::settings::ScoringTuning;

/// Near misses only extend the combo when closer than this
const NEAR_MISS_COMBO_DISTANCE: f32 = 1.5;
/// Combo points per near miss
const NEAR_MISS_COMBO: u32 = 2;
const MAX_MULTIPLIER: f32 = 3.0;

#[derive(Debug, Clone, Serialize)]
pub struct ComboTracker {
    pub combo: u32,
    pub max_combo: u32,
    pub coin_streak: u32,
    pub near_miss_streak: u32,
    pub multiplier: f32,
    pub perfect_section_total: u64,
    #[serde(skip)]
    last_coin_at: Option<f64>,
    #[serde(skip)]
    last_event_at: f64,
    #[serde(skip)]
    section_distance: f32,
    #[serde(skip)]
    hit_in_section: bool,
    #[serde(skip)]
    tuning: ScoringTuning,
}

impl ComboTracker {
    pub fn new(tuning: &ScoringTuning) -> Self {
        Self {
            combo: 0,
            max_combo: 0,
            coin_streak: 0,
            near_miss_streak: 0,
            multiplier: 1.0,
            perfect_section_total: 0,
            last_coin_at: None,
            last_event_at: 0.0,
            section_distance: 0.0,
            hit_in_section: false,
            tuning: tuning.clone(),
        }
    }

    pub fn reset(&mut self) {
        *self = Self::new(&self.tuning);
    }

    pub fn on_coin_collect(&mut self, now: f64) {
        let in_streak = self
            .last_coin_at
            .is_some_and(|t| now - t < self.tuning.coin_streak_window);
        if in_streak {
            self.coin_streak += 1;
            self.combo += 1;
        } else {
            self.coin_streak = 1;
            self.combo = 1;
        }
        self.last_coin_at = Some(now);
        self.touch(now);
    }

    /// Returns true when the near miss counted toward the combo
    pub fn on_near_miss(&mut self, now: f64, distance: f32) -> bool {
        if distance >= NEAR_MISS_COMBO_DISTANCE {
            return false;
        }
        self.near_miss_streak += 1;
        self.combo += NEAR_MISS_COMBO;
        self.touch(now);
        true
    }

    /// Drop the streak; returns the combo that was lost
    pub fn on_hit(&mut self) -> u32 {
        let lost = self.combo;
        self.clear_streak();
        self.hit_in_section = true;
        lost
    }

    /// Timeout check and section tracking; returns a perfect-section bonus
    pub fn update(&mut self, now: f64, distance_step: f32) -> Option<u64> {
        if self.combo > 0 && now - self.last_event_at > self.tuning.combo_timeout {
            self.clear_streak();
        }

        self.section_distance += distance_step;
        if self.section_distance < self.tuning.section_length {
            return None;
        }
        let bonus = if self.hit_in_section {
            0
        } else {
            self.tuning.perfect_section_base + self.combo as u64 * 10
        };
        self.section_distance = 0.0;
        self.hit_in_section = false;
        self.perfect_section_total += bonus;
        (bonus > 0).then_some(bonus)
    }

    /// Seconds left before the combo times out
    pub fn time_remaining(&self, now: f64) -> f64 {
        if self.combo == 0 {
            0.0
        } else {
            (self.tuning.combo_timeout - (now - self.last_event_at)).max(0.0)
        }
    }

    fn touch(&mut self, now: f64) {
        self.last_event_at = now;
        self.max_combo = self.max_combo.max(self.combo);
        self.multiplier = (1.0 + (self.combo / 5) as f32 * 0.1).min(MAX_MULTIPLIER);
    }

    fn clear_streak(&mut self) {
        self.combo = 0;
        self.coin_streak = 0;
        self.near_miss_streak = 0;
        self.multiplier = 1.0;
    }
}
