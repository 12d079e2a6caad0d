//! Drive state store and decay arithmetic.
//!
//! Four bounded scalars accumulate pressure toward autonomous research. The
//! decay clock advances them by elapsed time; stimuli (user activity, cycle
//! completion, admin overrides) mutate them directly. Impetus is derived on
//! every read and never stored.

use std::time::{SystemTime, UNIX_EPOCH};

use scout_protocol::{ConfigUpdate, DriveOverride, DriveRates, Drives};

use crate::error::EngineError;

/// Per-user drive tuning. Rates are per second.
#[derive(Debug, Clone, Copy)]
pub struct DriveConfig {
    pub threshold: f64,
    pub rates: DriveRates,
    /// Curiosity added per user-activity event.
    pub curiosity_bump: f64,
    /// Tiredness added per completed research cycle.
    pub tiredness_per_cycle: f64,
    /// Satisfaction gained per unit of cycle quality.
    pub satisfaction_gain: f64,
}

impl Default for DriveConfig {
    fn default() -> Self {
        Self {
            threshold: 1.0,
            rates: DriveRates {
                boredom_rate: 0.01,
                curiosity_decay: 0.005,
                tiredness_decay: 0.01,
                satisfaction_decay: 0.005,
            },
            curiosity_bump: 0.1,
            tiredness_per_cycle: 0.2,
            satisfaction_gain: 0.5,
        }
    }
}

/// Mutable drive record for one user. Owned exclusively by that user's actor.
#[derive(Debug, Clone)]
pub struct DriveState {
    drives: Drives,
    config: DriveConfig,
    last_tick_ms: u64,
}

fn clamp01(v: f64) -> f64 {
    v.clamp(0.0, 1.0)
}

pub fn now_ms() -> u64 {
    SystemTime::now()
        .duration_since(UNIX_EPOCH)
        .unwrap_or_default()
        .as_millis() as u64
}

impl DriveState {
    pub fn new(config: DriveConfig, now_ms: u64) -> Self {
        Self {
            drives: Drives {
                boredom: 0.0,
                curiosity: 0.0,
                tiredness: 0.0,
                satisfaction: 0.0,
            },
            config,
            last_tick_ms: now_ms,
        }
    }

    /// Advance drives by the time elapsed since the previous tick.
    ///
    /// Saturating in both directions: drives clamp to `[0,1]` and a clock
    /// that moves backwards contributes zero elapsed time.
    pub fn tick(&mut self, now_ms: u64) {
        let dt = now_ms.saturating_sub(self.last_tick_ms) as f64 / 1000.0;
        self.last_tick_ms = now_ms;
        if dt <= 0.0 {
            return;
        }
        let r = self.config.rates;
        let d = &mut self.drives;
        d.boredom = clamp01(d.boredom + r.boredom_rate * dt);
        d.curiosity = clamp01(d.curiosity - r.curiosity_decay * dt);
        d.tiredness = clamp01(d.tiredness - r.tiredness_decay * dt);
        d.satisfaction = clamp01(d.satisfaction - r.satisfaction_decay * dt);
    }

    /// Reset the decay baseline without touching drive values.
    ///
    /// Called on engine start/restart so that wall time spent stopped never
    /// counts as elapsed decay time.
    pub fn rebase(&mut self, now_ms: u64) {
        self.last_tick_ms = now_ms;
    }

    /// User-activity stimulus: a conversation turn raises curiosity.
    pub fn record_activity(&mut self) {
        self.drives.curiosity = clamp01(self.drives.curiosity + self.config.curiosity_bump);
    }

    /// Cycle-completion feedback: quality replenishes satisfaction, the
    /// effort raises tiredness.
    pub fn absorb_cycle(&mut self, quality_score: f64) {
        let q = clamp01(quality_score);
        self.drives.satisfaction =
            clamp01(self.drives.satisfaction + self.config.satisfaction_gain * q);
        self.drives.tiredness = clamp01(self.drives.tiredness + self.config.tiredness_per_cycle);
    }

    /// Direct override of drive values. Rejects anything outside `[0,1]`
    /// before applying any field.
    pub fn apply_override(&mut self, update: &DriveOverride) -> Result<(), EngineError> {
        for (field, value) in [
            ("boredom", update.boredom),
            ("curiosity", update.curiosity),
            ("tiredness", update.tiredness),
            ("satisfaction", update.satisfaction),
        ] {
            if let Some(v) = value {
                if !(0.0..=1.0).contains(&v) || !v.is_finite() {
                    return Err(EngineError::InvalidValue {
                        field,
                        value: v,
                        expected: "0.0..=1.0",
                    });
                }
            }
        }
        let d = &mut self.drives;
        if let Some(v) = update.boredom {
            d.boredom = v;
        }
        if let Some(v) = update.curiosity {
            d.curiosity = v;
        }
        if let Some(v) = update.tiredness {
            d.tiredness = v;
        }
        if let Some(v) = update.satisfaction {
            d.satisfaction = v;
        }
        Ok(())
    }

    /// Reconfigure threshold and rates. Takes effect on the next tick; never
    /// rewrites accumulated drive values.
    pub fn apply_config(&mut self, update: &ConfigUpdate) -> Result<(), EngineError> {
        if let Some(t) = update.threshold {
            if !(t > 0.0) || !t.is_finite() {
                return Err(EngineError::InvalidValue {
                    field: "threshold",
                    value: t,
                    expected: "> 0.0",
                });
            }
        }
        for (field, value) in [
            ("boredom_rate", update.boredom_rate),
            ("curiosity_decay", update.curiosity_decay),
            ("tiredness_decay", update.tiredness_decay),
            ("satisfaction_decay", update.satisfaction_decay),
        ] {
            if let Some(v) = value {
                if v < 0.0 || !v.is_finite() {
                    return Err(EngineError::InvalidValue {
                        field,
                        value: v,
                        expected: ">= 0.0",
                    });
                }
            }
        }
        if let Some(t) = update.threshold {
            self.config.threshold = t;
        }
        let r = &mut self.config.rates;
        if let Some(v) = update.boredom_rate {
            r.boredom_rate = v;
        }
        if let Some(v) = update.curiosity_decay {
            r.curiosity_decay = v;
        }
        if let Some(v) = update.tiredness_decay {
            r.tiredness_decay = v;
        }
        if let Some(v) = update.satisfaction_decay {
            r.satisfaction_decay = v;
        }
        Ok(())
    }

    /// `boredom + curiosity + 0.5·satisfaction − tiredness`. May be negative;
    /// only the drives themselves are clamped.
    pub fn impetus(&self) -> f64 {
        let d = self.drives;
        d.boredom + d.curiosity + 0.5 * d.satisfaction - d.tiredness
    }

    pub fn ready(&self) -> bool {
        self.impetus() >= self.config.threshold
    }

    pub fn drives(&self) -> Drives {
        self.drives
    }

    pub fn config(&self) -> &DriveConfig {
        &self.config
    }

    pub fn threshold(&self) -> f64 {
        self.config.threshold
    }

    pub fn rates(&self) -> DriveRates {
        self.config.rates
    }
}
