//! Fixed timestep simulation tick
//!
//! One call per rendered frame. Physics always advances by exactly one
//! `SIM_DT` step; host time is only used for the energy window, the wave
//! delay, and burst staggering.

use glam::Vec2;
use rand::Rng;
use serde::{Deserialize, Serialize};

use super::collision::{contain_bodies, detect_contacts, resolve_burst};
use super::forces::{apply_forces, clamp_speed, integrate};
use super::state::{BodyStatus, BurstTrigger, SimState, SizeTier};
use super::wave::WavePhase;
use crate::Viewport;

/// Host inputs for a single tick
#[derive(Debug, Clone, Copy)]
pub struct TickInput {
    /// Host wall-clock time (ms)
    pub now_ms: f64,
    /// Current drawable area
    pub viewport: Viewport,
}

/// Render-facing copy of one body's placement
#[derive(Debug, Clone, Copy, PartialEq, Serialize, Deserialize)]
pub struct BodyPosition {
    pub id: u32,
    pub x: f32,
    pub y: f32,
    pub radius: f32,
    pub tier: SizeTier,
}

/// Everything the rendering layer needs from one tick
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct TickResult {
    pub tick: u64,
    pub wave_index: u32,
    pub phase: WavePhase,
    pub energy_active: bool,
    /// True on the tick a new wave spawned
    pub wave_started: bool,
    /// Snapshot of every simulated body, in id order
    pub positions: Vec<BodyPosition>,
    /// Bodies newly marked for bursting this tick
    pub bursts: Vec<BurstTrigger>,
}

/// Advance the simulation by one fixed step
pub fn tick(state: &mut SimState, input: &TickInput) -> TickResult {
    state.time_ticks += 1;
    state.energy.refresh(input.now_ms);

    if input.viewport != state.viewport {
        log::info!(
            "Viewport {}x{} -> {}x{}, rebuilding walls",
            state.viewport.width,
            state.viewport.height,
            input.viewport.width,
            input.viewport.height
        );
        state.viewport = input.viewport;
        state.registry.rebuild_boundaries(input.viewport);
    }

    let wave_started = state.update_wave(input.now_ms);
    if !state.wave.is_running() {
        return result(state, wave_started, Vec::new());
    }

    // Forces, then integration
    state.drift_t += state.tuning.drift_rate;
    let scale = state.energy.force_scale(&state.tuning);
    let viewport = state.viewport;
    for body in state.registry.bodies.iter_mut().filter(|b| b.is_simulated()) {
        apply_forces(body, state.drift_t, scale, viewport, &state.tuning, &mut state.rng);
        integrate(body);
    }

    // Contacts on the integrated positions; walls get the last word
    let contacts = detect_contacts(
        &mut state.registry.bodies,
        &mut state.contacts,
        state.tuning.restitution,
    );
    contain_bodies(&mut state.registry.bodies, &state.registry.boundaries);

    let max_speed = state.tuning.max_speed;
    for body in state.registry.bodies.iter_mut() {
        body.vel = clamp_speed(body.vel, max_speed);
    }
    sanitize(state);

    for contact in &contacts {
        if let Some(marked) = resolve_burst(
            contact,
            &mut state.registry.bodies,
            &mut state.energy,
            &state.tuning,
            &mut state.rng,
        ) {
            state.pending.push(marked);
        }
    }

    let bursts = drain_pending(state);
    result(state, wave_started, bursts)
}

/// Replace non-finite positions/velocities with a safe resting state
fn sanitize(state: &mut SimState) {
    let center = state.viewport.center();
    for body in state.registry.bodies.iter_mut() {
        if !body.pos.is_finite() || !body.vel.is_finite() {
            log::warn!("Body {} went non-finite, resetting to centre", body.id);
            body.pos = center;
            body.vel = Vec2::ZERO;
        }
    }
}

/// Turn this tick's burst marks into staggered triggers
fn drain_pending(state: &mut SimState) -> Vec<BurstTrigger> {
    let stagger = state.tuning.burst_stagger_ms;
    let mut bursts = Vec::with_capacity(state.pending.len());
    for (id, cause) in std::mem::take(&mut state.pending) {
        let Some(body) = state.registry.get_mut(id) else {
            continue;
        };
        if body.status != BodyStatus::BurstPending {
            continue;
        }
        body.status = BodyStatus::Triggered;
        let (radius, tier) = (body.radius, body.tier);
        let delay_ms = if stagger > 0.0 {
            state.rng.random_range(0.0..=stagger)
        } else {
            0.0
        };
        bursts.push(BurstTrigger {
            id,
            radius,
            tier,
            delay_ms,
            cause,
        });
    }
    bursts
}

fn result(state: &SimState, wave_started: bool, bursts: Vec<BurstTrigger>) -> TickResult {
    TickResult {
        tick: state.time_ticks,
        wave_index: state.wave.index,
        phase: state.wave.phase,
        energy_active: state.energy.is_active(),
        wave_started,
        positions: snapshot(state),
        bursts,
    }
}

/// Copy out the placement of every simulated body
pub fn snapshot(state: &SimState) -> Vec<BodyPosition> {
    state
        .live_bodies()
        .map(|b| BodyPosition {
            id: b.id,
            x: b.pos.x,
            y: b.pos.y,
            radius: b.radius,
            tier: b.tier,
        })
        .collect()
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::consts::SIM_DT;
    use crate::sim::state::{Body, BurstCause};
    use crate::tuning::Tuning;
    use proptest::prelude::*;

    fn viewport() -> Viewport {
        Viewport::new(1024.0, 768.0).unwrap()
    }

    fn input(frame: u64) -> TickInput {
        TickInput {
            now_ms: frame as f64 * SIM_DT as f64 * 1000.0,
            viewport: viewport(),
        }
    }

    #[test]
    fn test_tick_publishes_all_bodies() {
        let mut state = SimState::new(5, viewport(), Tuning::default());
        let result = tick(&mut state, &input(1));
        assert_eq!(result.tick, 1);
        assert_eq!(result.positions.len(), state.registry.bodies.len());
        assert!(result.positions.windows(2).all(|w| w[0].id < w[1].id));
    }

    #[test]
    fn test_determinism() {
        let mut s1 = SimState::new(99_999, viewport(), Tuning::default());
        let mut s2 = SimState::new(99_999, viewport(), Tuning::default());
        for frame in 0..300 {
            let r1 = tick(&mut s1, &input(frame));
            let r2 = tick(&mut s2, &input(frame));
            assert_eq!(r1.positions, r2.positions);
            assert_eq!(r1.bursts, r2.bursts);
        }
    }

    #[test]
    fn test_bodies_stay_in_bounds() {
        let mut state = SimState::new(8, viewport(), Tuning::default());
        for frame in 0..2000 {
            tick(&mut state, &input(frame));
            for body in state.live_bodies() {
                assert!(body.pos.x >= -2.0 && body.pos.x <= viewport().width + 2.0);
                assert!(body.pos.y >= -2.0 && body.pos.y <= viewport().height + 2.0);
            }
        }
    }

    #[test]
    fn test_collision_burst_emitted_same_tick() {
        let mut tuning = Tuning::default();
        tuning.burst_chance = 1.0;
        let mut state = SimState::new(3, viewport(), tuning);

        // Two fast bubbles meeting head-on in open space
        let (a, b) = (state.registry.bodies[0].id, state.registry.bodies[1].id);
        for body in state.registry.bodies.iter_mut() {
            body.pos = Vec2::new(100.0 + body.id as f32 * 120.0, 600.0);
            body.vel = Vec2::ZERO;
        }
        state.registry.bodies[0].pos = Vec2::new(500.0, 380.0);
        state.registry.bodies[0].vel = Vec2::new(2.0, 0.0);
        let gap = state.registry.bodies[0].radius + state.registry.bodies[1].radius + 1.0;
        state.registry.bodies[1].pos = Vec2::new(500.0 + gap, 380.0);
        state.registry.bodies[1].vel = Vec2::new(-2.0, 0.0);

        let result = tick(&mut state, &input(1));
        let burst: Vec<u32> = result.bursts.iter().map(|t| t.id).collect();
        assert_eq!(burst.len(), 1);
        assert!(burst[0] == a || burst[0] == b);
        assert_eq!(result.bursts[0].cause, BurstCause::Collision);
        assert!((0.0..=40.0).contains(&result.bursts[0].delay_ms));
        assert_eq!(state.body(burst[0]).unwrap().status, BodyStatus::Triggered);

        // Still touching next tick: nothing new
        let result = tick(&mut state, &input(2));
        assert!(result.bursts.iter().all(|t| t.id != burst[0]));
    }

    #[test]
    fn test_energy_expires_during_ticks() {
        let mut state = SimState::new(4, viewport(), Tuning::default());
        state.energy.activate(0.0);
        assert!(tick(&mut state, &input(1)).energy_active);
        // 2.5 s at 60 Hz
        assert!(!tick(&mut state, &input(151)).energy_active);
    }

    #[test]
    fn test_chaos_bursts_capped_per_activation() {
        let mut state = SimState::new(6, viewport(), Tuning::default());
        state.energy.activate(0.0);
        let mut chaos = 0;
        for frame in 1..150 {
            let result = tick(&mut state, &input(frame));
            chaos += result.bursts.iter().filter(|t| t.cause == BurstCause::Chaos).count();
        }
        assert!(chaos <= 3);
    }

    #[test]
    fn test_nan_body_reset_to_center() {
        let mut state = SimState::new(2, viewport(), Tuning::default());
        state.registry.bodies[0].pos = Vec2::new(f32::NAN, 10.0);
        tick(&mut state, &input(1));
        let body: &Body = &state.registry.bodies[0];
        assert!(body.pos.is_finite());
    }

    #[test]
    fn test_draining_then_new_wave() {
        let mut state = SimState::new(10, viewport(), Tuning::default());
        let ids: Vec<u32> = state.registry.bodies.iter().map(|b| b.id).collect();
        for id in &ids {
            state.tap(*id);
            state.acknowledge_burst(*id, 1000.0);
        }
        let draining = tick(&mut state, &TickInput { now_ms: 1300.0, viewport: viewport() });
        assert!(draining.positions.is_empty());
        assert!(!draining.wave_started);

        let next = tick(&mut state, &TickInput { now_ms: 1600.0, viewport: viewport() });
        assert!(next.wave_started);
        assert_eq!(next.wave_index, 1);
        assert_eq!(next.phase, WavePhase::Running);
        assert!(!next.positions.is_empty());
    }

    #[test]
    fn test_viewport_change_rebuilds_walls() {
        let mut state = SimState::new(12, viewport(), Tuning::default());
        let small = Viewport::new(400.0, 300.0).unwrap();
        tick(&mut state, &TickInput { now_ms: 16.0, viewport: small });
        assert_eq!(state.viewport, small);
        assert_eq!(state.registry.boundaries.len(), 4);
        for body in state.live_bodies() {
            assert!(body.pos.x <= 402.0 && body.pos.y <= 302.0);
        }
    }

    proptest! {
        #![proptest_config(ProptestConfig::with_cases(24))]

        #[test]
        fn prop_speed_ceiling_holds(seed in any::<u64>(), energy in any::<bool>()) {
            let mut state = SimState::new(seed, viewport(), Tuning::default());
            if energy {
                state.energy.activate(0.0);
            }
            for frame in 0..240 {
                tick(&mut state, &input(frame));
                for body in state.live_bodies() {
                    prop_assert!(body.speed() <= 2.2 + 1e-4);
                }
            }
        }
    }
}
