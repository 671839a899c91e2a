//! Per-tick force model
//!
//! Forces are applied directly as velocity changes (px/tick²); every bubble
//! weighs the same. Order matters and is fixed: drift, jitter, buoyancy,
//! energy impulse, wall repulsion. The speed clamp runs after integration.

use glam::Vec2;
use rand::Rng;

use super::energy::ForceScale;
use super::state::Body;
use crate::Viewport;
use crate::tuning::Tuning;

/// Lazy per-body wandering, phase-shifted by id
#[inline]
pub fn drift(id: u32, t: f32, k: f32) -> Vec2 {
    let phase = id as f32;
    Vec2::new(
        (t + phase * 0.7).cos() * k,
        (0.8 * t + phase * 1.3).sin() * k * 0.7,
    )
}

/// Uniform random force in [-k, k] per axis
#[inline]
pub fn jitter<R: Rng>(rng: &mut R, k: f32) -> Vec2 {
    if k <= 0.0 {
        return Vec2::ZERO;
    }
    Vec2::new(rng.random_range(-k..=k), rng.random_range(-k..=k))
}

/// Outward push for every edge whose margin the body's surface is inside
pub fn wall_repulsion(body: &Body, viewport: Viewport, tuning: &Tuning) -> Vec2 {
    let m = tuning.wall_margin;
    let r = body.radius;
    let push = tuning.wall_push;
    let mut force = Vec2::ZERO;

    if body.pos.x - r < m {
        force.x += push;
    }
    if body.pos.x + r > viewport.width - m {
        force.x -= push;
    }
    if body.pos.y - r < m {
        force.y += push;
    }
    if body.pos.y + r > viewport.height - m {
        force.y -= push;
    }
    force
}

/// Floor the outward velocity near each wall so bubbles never stall there.
///
/// This only ever adds speed away from the wall; it does not reflect the
/// incoming component, so walls feel bouncy rather than conservative.
pub fn floor_wall_velocity(body: &mut Body, viewport: Viewport, tuning: &Tuning) {
    let m = tuning.wall_margin;
    let r = body.radius;
    let min = tuning.min_wall_speed;

    if body.pos.x - r < m {
        body.vel.x = body.vel.x.max(min);
    }
    if body.pos.x + r > viewport.width - m {
        body.vel.x = body.vel.x.min(-min);
    }
    if body.pos.y - r < m {
        body.vel.y = body.vel.y.max(min);
    }
    if body.pos.y + r > viewport.height - m {
        body.vel.y = body.vel.y.min(-min);
    }
}

/// Apply the full force stack to one body for one tick
pub fn apply_forces<R: Rng>(
    body: &mut Body,
    t: f32,
    scale: ForceScale,
    viewport: Viewport,
    tuning: &Tuning,
    rng: &mut R,
) {
    body.asleep = false;

    body.vel += drift(body.id, t, tuning.drift_force * scale.drift);
    body.vel += jitter(rng, tuning.jitter_force * scale.jitter);
    body.vel.y -= tuning.buoyancy_force * scale.buoyancy;
    if scale.impulse > 0.0 {
        body.vel += jitter(rng, scale.impulse);
    }

    body.vel += wall_repulsion(body, viewport, tuning);
    floor_wall_velocity(body, viewport, tuning);
}

/// Advance position by one fixed step (velocity is already per tick)
#[inline]
pub fn integrate(body: &mut Body) {
    body.pos += body.vel;
}

/// Rescale to `max` if faster, keeping direction
#[inline]
pub fn clamp_speed(vel: Vec2, max: f32) -> Vec2 {
    let speed = vel.length();
    if speed > max { vel * (max / speed) } else { vel }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::sim::energy::EnergyMode;
    use crate::sim::state::SizeTier;
    use proptest::prelude::*;
    use rand::SeedableRng;
    use rand_pcg::Pcg32;

    fn viewport() -> Viewport {
        Viewport::new(800.0, 600.0).unwrap()
    }

    fn idle_scale(tuning: &Tuning) -> ForceScale {
        EnergyMode::new(tuning).force_scale(tuning)
    }

    #[test]
    fn test_drift_formula() {
        let d = drift(3, 1.0, 2.0);
        assert!((d.x - (1.0f32 + 2.1).cos() * 2.0).abs() < 1e-6);
        assert!((d.y - (0.8f32 + 3.9).sin() * 1.4).abs() < 1e-6);
    }

    #[test]
    fn test_left_wall_repulsion() {
        let tuning = Tuning::default();
        let mut body = Body::new(1, SizeTier::Small, Vec2::new(30.0, 300.0), Vec2::new(-0.5, 0.0));
        let force = wall_repulsion(&body, viewport(), &tuning);
        assert!(force.x > 0.0);

        let mut rng = Pcg32::seed_from_u64(9);
        apply_forces(&mut body, 0.0, idle_scale(&tuning), viewport(), &tuning, &mut rng);
        assert!(body.vel.x >= 0.9);
    }

    #[test]
    fn test_right_and_bottom_walls_push_inward() {
        let tuning = Tuning::default();
        let mut body = Body::new(1, SizeTier::Large, Vec2::new(780.0, 590.0), Vec2::new(2.0, 2.0));
        let force = wall_repulsion(&body, viewport(), &tuning);
        assert!(force.x < 0.0 && force.y < 0.0);

        floor_wall_velocity(&mut body, viewport(), &tuning);
        assert!(body.vel.x <= -0.9);
        assert!(body.vel.y <= -0.9);
    }

    #[test]
    fn test_floor_keeps_faster_outbound_speed() {
        let tuning = Tuning::default();
        let mut body = Body::new(1, SizeTier::Small, Vec2::new(20.0, 300.0), Vec2::new(1.8, 0.0));
        floor_wall_velocity(&mut body, viewport(), &tuning);
        assert_eq!(body.vel.x, 1.8);
    }

    #[test]
    fn test_no_wall_force_in_open_space() {
        let tuning = Tuning::default();
        let body = Body::new(1, SizeTier::Medium, Vec2::new(400.0, 300.0), Vec2::ZERO);
        assert_eq!(wall_repulsion(&body, viewport(), &tuning), Vec2::ZERO);
    }

    #[test]
    fn test_buoyancy_lifts() {
        let mut tuning = Tuning::default();
        tuning.drift_force = 0.0;
        tuning.jitter_force = 0.0;
        let mut body = Body::new(1, SizeTier::Medium, Vec2::new(400.0, 300.0), Vec2::ZERO);
        let mut rng = Pcg32::seed_from_u64(1);
        apply_forces(&mut body, 0.0, idle_scale(&tuning), viewport(), &tuning, &mut rng);
        assert!(body.vel.y < 0.0);
        assert_eq!(body.vel.x, 0.0);
    }

    #[test]
    fn test_body_is_woken() {
        let tuning = Tuning::default();
        let mut body = Body::new(1, SizeTier::Medium, Vec2::new(400.0, 300.0), Vec2::ZERO);
        body.asleep = true;
        let mut rng = Pcg32::seed_from_u64(1);
        apply_forces(&mut body, 0.0, idle_scale(&tuning), viewport(), &tuning, &mut rng);
        assert!(!body.asleep);
    }

    #[test]
    fn test_clamp_preserves_direction() {
        let v = clamp_speed(Vec2::new(3.0, 4.0), 2.2);
        assert!((v.length() - 2.2).abs() < 1e-5);
        assert!((v.x / v.y - 0.75).abs() < 1e-5);
        assert_eq!(clamp_speed(Vec2::new(0.1, 0.1), 2.2), Vec2::new(0.1, 0.1));
    }

    proptest! {
        #[test]
        fn prop_clamp_never_exceeds_cap(x in -50.0f32..50.0, y in -50.0f32..50.0) {
            let v = clamp_speed(Vec2::new(x, y), 2.2);
            prop_assert!(v.length() <= 2.2 + 1e-4);
        }
    }
}
