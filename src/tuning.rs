//! Data-driven simulation tuning
//!
//! Every number that shapes the "feel" of the field lives here. Defaults are
//! the tuned values; a JSON document can override any subset of them.

use serde::{Deserialize, Serialize};

use crate::error::{SimError, SimResult};

/// Tunable simulation constants
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(default)]
pub struct Tuning {
    // === Waves ===
    /// Fewest bubbles a wave can spawn
    pub min_bodies: u32,
    /// Most bubbles a wave can spawn
    pub max_bodies: u32,
    /// Delay between the last burst and the next wave (ms)
    pub wave_delay_ms: f64,

    // === Spawning ===
    /// Per-axis spawn jitter around the target position (px)
    pub spawn_jitter: f32,
    /// Per-axis initial velocity range (px/tick)
    pub initial_speed: f32,

    // === Forces (base, px/tick²) ===
    /// Amplitude of the sinusoidal drift
    pub drift_force: f32,
    /// Increment of the shared drift phase per tick
    pub drift_rate: f32,
    /// Brownian jitter range
    pub jitter_force: f32,
    /// Constant upward force
    pub buoyancy_force: f32,
    /// Extra random force while energy mode is on
    pub energy_impulse: f32,
    /// Outward push when a surface is inside the wall margin
    pub wall_push: f32,
    /// Distance from an edge that triggers wall repulsion (px)
    pub wall_margin: f32,
    /// Minimum outward velocity near a wall (px/tick)
    pub min_wall_speed: f32,
    /// Speed ceiling (px/tick)
    pub max_speed: f32,
    /// Body-body restitution
    pub restitution: f32,

    // === Energy mode ===
    /// Drift multiplier while active
    pub energy_drift_mult: f32,
    /// Jitter multiplier while active
    pub energy_jitter_mult: f32,
    /// Buoyancy multiplier while active
    pub energy_buoyancy_mult: f32,
    /// How long an activation lasts (ms)
    pub energy_duration_ms: f64,
    /// Max chaos-path bursts per activation
    pub energy_burst_cap: u32,

    // === Collision bursts ===
    /// Impact speed needed for a normal-mode burst
    pub burst_speed: f32,
    /// Chance a qualifying normal-mode impact bursts
    pub burst_chance: f64,
    /// Impact speed needed for an energy-mode burst
    pub energy_burst_speed: f32,
    /// Chance a qualifying energy-mode impact bursts
    pub energy_burst_chance: f64,
    /// Upper bound of the random burst stagger (ms)
    pub burst_stagger_ms: f64,
}

impl Default for Tuning {
    fn default() -> Self {
        Self {
            min_bodies: 5,
            max_bodies: 7,
            wave_delay_ms: 600.0,

            spawn_jitter: 4.0,
            initial_speed: 0.3,

            drift_force: 0.006,
            drift_rate: 0.008,
            jitter_force: 0.01,
            buoyancy_force: 0.0025,
            energy_impulse: 0.08,
            wall_push: 0.04,
            wall_margin: 26.0,
            min_wall_speed: 0.9,
            max_speed: 2.2,
            restitution: 0.9,

            energy_drift_mult: 2.0,
            energy_jitter_mult: 2.1,
            energy_buoyancy_mult: 1.6,
            energy_duration_ms: 2500.0,
            energy_burst_cap: 3,

            burst_speed: 0.9,
            burst_chance: 0.15,
            energy_burst_speed: 0.55,
            energy_burst_chance: 0.6,
            burst_stagger_ms: 40.0,
        }
    }
}

impl Tuning {
    /// Decode a (possibly partial) JSON document and validate it
    pub fn from_json(json: &str) -> SimResult<Self> {
        let tuning: Tuning = serde_json::from_str(json)?;
        tuning.validate()?;
        log::info!("Loaded tuning overrides");
        Ok(tuning)
    }

    /// Reject values that would break wave or physics invariants
    pub fn validate(&self) -> SimResult<()> {
        if self.min_bodies == 0 || self.min_bodies > self.max_bodies {
            return Err(SimError::InvalidTuning {
                field: "min_bodies",
                value: self.min_bodies as f64,
                reason: "must be in 1..=max_bodies",
            });
        }
        if !(self.max_speed.is_finite() && self.max_speed > 0.0) {
            return Err(SimError::InvalidTuning {
                field: "max_speed",
                value: self.max_speed as f64,
                reason: "must be finite and > 0",
            });
        }
        if self.min_wall_speed > self.max_speed {
            return Err(SimError::InvalidTuning {
                field: "min_wall_speed",
                value: self.min_wall_speed as f64,
                reason: "must not exceed max_speed",
            });
        }
        for (field, v) in [
            ("spawn_jitter", self.spawn_jitter),
            ("initial_speed", self.initial_speed),
            ("jitter_force", self.jitter_force),
            ("energy_impulse", self.energy_impulse),
        ] {
            if !(v.is_finite() && v >= 0.0) {
                return Err(SimError::InvalidTuning {
                    field,
                    value: v as f64,
                    reason: "must be finite and >= 0",
                });
            }
        }
        for (field, p) in [
            ("burst_chance", self.burst_chance),
            ("energy_burst_chance", self.energy_burst_chance),
        ] {
            if !(0.0..=1.0).contains(&p) {
                return Err(SimError::InvalidTuning {
                    field,
                    value: p,
                    reason: "must be a probability in [0, 1]",
                });
            }
        }
        if self.wave_delay_ms < 0.0 || self.energy_duration_ms < 0.0 || self.burst_stagger_ms < 0.0 {
            return Err(SimError::InvalidTuning {
                field: "wave_delay_ms",
                value: self.wave_delay_ms,
                reason: "durations must be >= 0",
            });
        }
        Ok(())
    }

    /// Load tuning from JSON, falling back to defaults on any error
    pub fn load_or_default(json: Option<&str>) -> Self {
        match json.map(Self::from_json) {
            Some(Ok(tuning)) => tuning,
            Some(Err(e)) => {
                log::warn!("Ignoring tuning overrides: {}", e);
                Self::default()
            }
            None => Self::default(),
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_defaults_are_valid() {
        assert!(Tuning::default().validate().is_ok());
    }

    #[test]
    fn test_partial_json_overrides_only_named_keys() {
        let tuning = Tuning::from_json(r#"{ "max_speed": 3.0 }"#).unwrap();
        assert_eq!(tuning.max_speed, 3.0);
        assert_eq!(tuning.wall_margin, 26.0);
        assert_eq!(tuning.burst_chance, 0.15);
    }

    #[test]
    fn test_rejects_inverted_body_range() {
        let err = Tuning::from_json(r#"{ "min_bodies": 9, "max_bodies": 7 }"#).unwrap_err();
        assert!(matches!(err, SimError::InvalidTuning { field: "min_bodies", .. }));
    }

    #[test]
    fn test_rejects_bad_probability() {
        let err = Tuning::from_json(r#"{ "burst_chance": 1.5 }"#).unwrap_err();
        assert!(matches!(err, SimError::InvalidTuning { field: "burst_chance", .. }));
    }

    #[test]
    fn test_rejects_negative_jitter() {
        let err = Tuning::from_json(r#"{ "spawn_jitter": -4.0 }"#).unwrap_err();
        assert!(matches!(err, SimError::InvalidTuning { field: "spawn_jitter", .. }));
    }

    #[test]
    fn test_load_or_default_falls_back() {
        assert_eq!(Tuning::load_or_default(Some("{ not json")), Tuning::default());
        assert_eq!(Tuning::load_or_default(None), Tuning::default());
    }
}
