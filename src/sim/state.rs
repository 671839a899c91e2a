//! Simulation state and core types
//!
//! The [`SimState`] owns everything that lives for one wave (bodies,
//! boundaries, burst counters) plus the process-wide energy mode.

use std::collections::BTreeSet;

use glam::Vec2;
use rand::SeedableRng;
use rand_pcg::Pcg32;
use serde::{Deserialize, Serialize};

use super::energy::EnergyMode;
use super::registry::Registry;
use super::wave::Wave;
use crate::Viewport;
use crate::tuning::Tuning;

/// Bubble size tier; radius is fixed for the body's lifetime
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default, Serialize, Deserialize)]
pub enum SizeTier {
    Small,
    #[default]
    Medium,
    Large,
}

impl SizeTier {
    pub const ALL: [SizeTier; 3] = [SizeTier::Small, SizeTier::Medium, SizeTier::Large];

    /// Collision radius in pixels
    pub fn radius(&self) -> f32 {
        match self {
            SizeTier::Small => 22.0,
            SizeTier::Medium => 32.0,
            SizeTier::Large => 44.0,
        }
    }
}

/// Where a body is in its burst lifecycle
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
pub enum BodyStatus {
    /// Floating, may be marked for bursting
    Active,
    /// Marked by the collision resolver, trigger not yet emitted
    BurstPending,
    /// Trigger emitted, waiting for the renderer to acknowledge
    Triggered,
    /// Burst acknowledged; out of the simulation for the rest of the wave
    Retired,
}

/// A dynamic bubble
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct Body {
    pub id: u32,
    pub tier: SizeTier,
    pub radius: f32,
    pub pos: Vec2,
    /// Velocity in px per tick
    pub vel: Vec2,
    /// Always cleared every tick; bubbles never rest
    pub asleep: bool,
    pub status: BodyStatus,
}

impl Body {
    pub fn new(id: u32, tier: SizeTier, pos: Vec2, vel: Vec2) -> Self {
        Self {
            id,
            tier,
            radius: tier.radius(),
            pos,
            vel,
            asleep: false,
            status: BodyStatus::Active,
        }
    }

    /// Still moving and colliding (everything but retired)
    #[inline]
    pub fn is_simulated(&self) -> bool {
        self.status != BodyStatus::Retired
    }

    /// Eligible to be marked for bursting
    #[inline]
    pub fn can_burst(&self) -> bool {
        self.status == BodyStatus::Active
    }

    #[inline]
    pub fn speed(&self) -> f32 {
        self.vel.length()
    }
}

/// Screen edge a boundary guards
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
pub enum Edge {
    Left,
    Right,
    Top,
    Bottom,
}

impl Edge {
    pub const ALL: [Edge; 4] = [Edge::Left, Edge::Right, Edge::Top, Edge::Bottom];
}

/// Why a body burst
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
pub enum BurstCause {
    /// Direct user tap
    Tap,
    /// Collision in normal mode
    Collision,
    /// Collision while energy mode was active
    Chaos,
}

/// Burst handed to the rendering layer
#[derive(Debug, Clone, Copy, PartialEq, Serialize, Deserialize)]
pub struct BurstTrigger {
    pub id: u32,
    pub radius: f32,
    pub tier: SizeTier,
    /// Sub-frame stagger before the visual burst starts
    pub delay_ms: f64,
    pub cause: BurstCause,
}

/// Complete simulation state (deterministic for a given seed and input)
#[derive(Debug, Clone)]
pub struct SimState {
    pub seed: u64,
    pub rng: Pcg32,
    pub tuning: Tuning,
    /// Viewport the current boundaries were built for
    pub viewport: Viewport,
    /// Bodies and boundaries of the current wave
    pub registry: Registry,
    pub wave: Wave,
    pub energy: EnergyMode,
    /// Shared drift phase, advanced every tick
    pub drift_t: f32,
    /// Simulation tick counter
    pub time_ticks: u64,
    /// Pairs that were touching at the end of the previous tick
    pub contacts: BTreeSet<(u32, u32)>,
    /// Bursts marked this tick that still need a trigger
    pub(super) pending: Vec<(u32, BurstCause)>,
    /// Next entity ID (never reused within a session)
    pub(super) next_id: u32,
}

impl SimState {
    /// Create a state with the given seed and spawn the first wave
    pub fn new(seed: u64, viewport: Viewport, tuning: Tuning) -> Self {
        let energy = EnergyMode::new(&tuning);
        let mut state = Self {
            seed,
            rng: Pcg32::seed_from_u64(seed),
            tuning,
            viewport,
            registry: Registry::default(),
            wave: Wave::new(0, 0),
            energy,
            drift_t: 0.0,
            time_ticks: 0,
            contacts: BTreeSet::new(),
            pending: Vec::new(),
            next_id: 1,
        };
        state.begin_wave(0);
        state
    }

    /// Look up a body of the current wave
    pub fn body(&self, id: u32) -> Option<&Body> {
        self.registry.get(id)
    }

    /// Bodies still taking part in the simulation
    pub fn live_bodies(&self) -> impl Iterator<Item = &Body> {
        self.registry.bodies.iter().filter(|b| b.is_simulated())
    }
}
