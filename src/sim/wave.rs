//! Wave/burst state machine
//!
//! Running → Draining (every bubble has burst, short delay) → Running again
//! with a freshly drawn wave.

use serde::{Deserialize, Serialize};

use super::registry::WaveLayout;
use super::state::{BodyStatus, BurstCause, BurstTrigger, SimState};

/// Current phase of the wave cycle
#[derive(Debug, Clone, Copy, PartialEq, Serialize, Deserialize)]
pub enum WavePhase {
    /// Bubbles are floating and accept bursts
    Running,
    /// All bubbles burst; next wave spawns at the given host time (ms)
    Draining { resume_at_ms: f64 },
}

/// One round of bubbles
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct Wave {
    /// Increases by one per wave across the session
    pub index: u32,
    /// Number of bubbles spawned for this wave
    pub target_bursts: u32,
    /// Acknowledged bursts so far (never exceeds `target_bursts`)
    pub completed_bursts: u32,
    pub phase: WavePhase,
}

impl Wave {
    pub fn new(index: u32, target_bursts: u32) -> Self {
        Self {
            index,
            target_bursts,
            completed_bursts: 0,
            phase: WavePhase::Running,
        }
    }

    #[inline]
    pub fn is_running(&self) -> bool {
        self.phase == WavePhase::Running
    }

    /// Count one burst. Returns true when this completes the wave.
    fn record_burst(&mut self, now_ms: f64, delay_ms: f64) -> bool {
        if !self.is_running() || self.completed_bursts >= self.target_bursts {
            return false;
        }
        self.completed_bursts += 1;
        if self.completed_bursts == self.target_bursts {
            self.phase = WavePhase::Draining {
                resume_at_ms: now_ms + delay_ms,
            };
            return true;
        }
        false
    }
}

impl SimState {
    /// Discard the current wave and spawn wave `index` from a fresh layout
    pub fn begin_wave(&mut self, index: u32) {
        let layout = WaveLayout::random(&mut self.rng, &self.tuning);
        self.begin_wave_with_layout(index, &layout);
    }

    /// Discard the current wave and spawn wave `index` from `layout`
    pub fn begin_wave_with_layout(&mut self, index: u32, layout: &WaveLayout) {
        self.registry.destroy_wave();
        self.contacts.clear();
        self.pending.clear();

        self.registry.create_wave(
            layout,
            self.viewport,
            &mut self.next_id,
            &self.tuning,
            &mut self.rng,
        );
        self.wave = Wave::new(index, layout.count() as u32);
        log::info!("Wave {} started with {} bubbles", index, layout.count());
    }

    /// Spawn the next wave once the draining delay has passed.
    /// Returns true if a new wave started.
    pub fn update_wave(&mut self, now_ms: f64) -> bool {
        match self.wave.phase {
            WavePhase::Draining { resume_at_ms } if now_ms >= resume_at_ms => {
                self.begin_wave(self.wave.index + 1);
                true
            }
            _ => false,
        }
    }

    /// The renderer has scheduled the burst animation for `id`.
    ///
    /// Counts the burst exactly once and retires the body. Only bodies that
    /// were marked for bursting count; floating bubbles, unknown ids, ids
    /// from earlier waves and repeated acknowledgments are ignored.
    pub fn acknowledge_burst(&mut self, id: u32, now_ms: f64) -> bool {
        if !self.wave.is_running() {
            return false;
        }
        let Some(body) = self.registry.get_mut(id) else {
            return false;
        };
        if !matches!(body.status, BodyStatus::Triggered | BodyStatus::BurstPending) {
            log::debug!("Ignoring acknowledgment for body {} ({:?})", id, body.status);
            return false;
        }
        body.status = BodyStatus::Retired;
        self.pending.retain(|(pending_id, _)| *pending_id != id);
        self.contacts.retain(|&(a, b)| a != id && b != id);

        let delay = self.tuning.wave_delay_ms;
        if self.wave.record_burst(now_ms, delay) {
            log::info!(
                "Wave {} cleared ({} bursts), next in {:.0} ms",
                self.wave.index,
                self.wave.completed_bursts,
                delay
            );
        } else {
            log::debug!(
                "Burst {} acknowledged ({}/{})",
                id,
                self.wave.completed_bursts,
                self.wave.target_bursts
            );
        }
        true
    }

    /// Direct user tap: burst an active bubble immediately
    pub fn tap(&mut self, id: u32) -> Option<BurstTrigger> {
        if !self.wave.is_running() {
            return None;
        }
        let body = self.registry.get_mut(id)?;
        if !body.can_burst() {
            return None;
        }
        body.status = BodyStatus::Triggered;
        Some(BurstTrigger {
            id,
            radius: body.radius,
            tier: body.tier,
            delay_ms: 0.0,
            cause: BurstCause::Tap,
        })
    }
}
