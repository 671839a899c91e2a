//! Energy mode: a short, timed burst of chaos
//!
//! Activated from outside (a successful subscription). While active, drift,
//! jitter and buoyancy are scaled up and collisions burst far more eagerly,
//! up to a fixed number of bursts per activation.

use serde::{Deserialize, Serialize};

use crate::tuning::Tuning;

/// Energy mode lifecycle
#[derive(Debug, Clone, Copy, PartialEq, Serialize, Deserialize)]
pub enum EnergyPhase {
    Idle,
    /// Active until the given host time (ms)
    Active { until_ms: f64 },
}

/// Force multipliers in effect for one tick
#[derive(Debug, Clone, Copy, PartialEq)]
pub struct ForceScale {
    pub drift: f32,
    pub jitter: f32,
    pub buoyancy: f32,
    /// Extra random impulse magnitude (0 when idle)
    pub impulse: f32,
}

/// Process-wide energy mode state
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct EnergyMode {
    pub phase: EnergyPhase,
    /// Chaos-path bursts used in the current activation
    pub bursts_used: u32,
    duration_ms: f64,
    burst_cap: u32,
}

impl EnergyMode {
    pub fn new(tuning: &Tuning) -> Self {
        Self {
            phase: EnergyPhase::Idle,
            bursts_used: 0,
            duration_ms: tuning.energy_duration_ms,
            burst_cap: tuning.energy_burst_cap,
        }
    }

    /// Start (or restart) the window. Re-triggering resets the timer
    /// and the burst budget instead of stacking.
    pub fn activate(&mut self, now_ms: f64) {
        let until_ms = now_ms + self.duration_ms;
        match self.phase {
            EnergyPhase::Idle => log::info!("Energy mode on until {:.0} ms", until_ms),
            EnergyPhase::Active { .. } => log::info!("Energy mode re-armed until {:.0} ms", until_ms),
        }
        self.phase = EnergyPhase::Active { until_ms };
        self.bursts_used = 0;
    }

    /// Drop back to idle once the window has elapsed.
    /// Returns true on the tick it expires.
    pub fn refresh(&mut self, now_ms: f64) -> bool {
        if let EnergyPhase::Active { until_ms } = self.phase
            && now_ms >= until_ms
        {
            self.phase = EnergyPhase::Idle;
            log::info!("Energy mode expired ({} chaos bursts)", self.bursts_used);
            return true;
        }
        false
    }

    #[inline]
    pub fn is_active(&self) -> bool {
        matches!(self.phase, EnergyPhase::Active { .. })
    }

    /// Whether the chaos path still has budget
    #[inline]
    pub fn has_burst_budget(&self) -> bool {
        self.is_active() && self.bursts_used < self.burst_cap
    }

    /// Spend one chaos burst; false if idle or the cap is reached
    pub fn use_burst(&mut self) -> bool {
        if !self.has_burst_budget() {
            return false;
        }
        self.bursts_used += 1;
        true
    }

    /// Multipliers for the current phase
    pub fn force_scale(&self, tuning: &Tuning) -> ForceScale {
        if self.is_active() {
            ForceScale {
                drift: tuning.energy_drift_mult,
                jitter: tuning.energy_jitter_mult,
                buoyancy: tuning.energy_buoyancy_mult,
                impulse: tuning.energy_impulse,
            }
        } else {
            ForceScale {
                drift: 1.0,
                jitter: 1.0,
                buoyancy: 1.0,
                impulse: 0.0,
            }
        }
    }
}
