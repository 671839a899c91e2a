//! Collision detection, response and burst resolution
//!
//! Bubbles are circles of equal weight. Each tick we separate overlapping
//! pairs, exchange their normal velocity, and report the pairs that *began*
//! touching this tick. Only those reach the burst resolver.

use std::collections::BTreeSet;

use glam::Vec2;
use rand::Rng;

use super::energy::EnergyMode;
use super::registry::Boundary;
use super::state::{Body, BodyStatus, BurstCause};
use crate::tuning::Tuning;

/// A body-body contact that started this tick
#[derive(Debug, Clone, Copy, PartialEq)]
pub struct Contact {
    /// Lower id of the pair
    pub a: u32,
    /// Higher id of the pair
    pub b: u32,
    /// Faster of the two speeds at the moment of contact
    pub impact_speed: f32,
}

/// Check whether two circles overlap or touch
#[inline]
pub fn circles_touch(a: &Body, b: &Body) -> bool {
    let r = a.radius + b.radius;
    a.pos.distance_squared(b.pos) <= r * r
}

/// Get two distinct elements of a slice mutably
fn pair_mut<T>(items: &mut [T], i: usize, j: usize) -> (&mut T, &mut T) {
    debug_assert!(i < j);
    let (head, tail) = items.split_at_mut(j);
    (&mut head[i], &mut tail[0])
}

/// Push two overlapping bodies apart and reflect their approach velocity
pub fn resolve_overlap(a: &mut Body, b: &mut Body, restitution: f32) {
    let delta = b.pos - a.pos;
    let dist = delta.length();
    let normal = if dist > f32::EPSILON { delta / dist } else { Vec2::X };

    let overlap = a.radius + b.radius - dist;
    if overlap > 0.0 {
        let correction = normal * (overlap * 0.5);
        a.pos -= correction;
        b.pos += correction;
    }

    // Equal weights: split the impulse evenly
    let approach = (b.vel - a.vel).dot(normal);
    if approach < 0.0 {
        let impulse = -(1.0 + restitution) * approach * 0.5;
        a.vel -= normal * impulse;
        b.vel += normal * impulse;
    }
}

/// Keep every simulated body inside the walls
pub fn contain_bodies(bodies: &mut [Body], boundaries: &[Boundary]) {
    for body in bodies.iter_mut().filter(|b| b.is_simulated()) {
        for wall in boundaries {
            wall.contain(body);
        }
    }
}

/// Find touching pairs, resolve them, and return the pairs that are new.
///
/// `touching` carries the previous tick's pairs in and this tick's pairs out.
/// Impact speed is sampled before the contact response changes velocities.
pub fn detect_contacts(
    bodies: &mut [Body],
    touching: &mut BTreeSet<(u32, u32)>,
    restitution: f32,
) -> Vec<Contact> {
    let mut now_touching = BTreeSet::new();
    let mut began = Vec::new();

    for i in 0..bodies.len() {
        for j in (i + 1)..bodies.len() {
            let (a, b) = pair_mut(bodies, i, j);
            if !a.is_simulated() || !b.is_simulated() || !circles_touch(a, b) {
                continue;
            }

            let key = if a.id < b.id { (a.id, b.id) } else { (b.id, a.id) };
            if !touching.contains(&key) {
                began.push(Contact {
                    a: key.0,
                    b: key.1,
                    impact_speed: a.speed().max(b.speed()),
                });
            }
            now_touching.insert(key);
            resolve_overlap(a, b, restitution);
        }
    }

    *touching = now_touching;
    began
}

/// Uniform choice between the two members of a pair
#[inline]
pub fn pick_one<R: Rng>(rng: &mut R, a: u32, b: u32) -> u32 {
    if rng.random_bool(0.5) { a } else { b }
}

/// Decide whether a new contact bursts one of its bodies.
///
/// Energy mode: faster than `energy_burst_speed`, budget left, then a
/// `energy_burst_chance` roll. Normal mode: faster than `burst_speed`, then a
/// `burst_chance` roll. The roll that passes then picks A or B uniformly; a
/// pick that is already pending or retired marks nothing.
/// Returns the marked body's id and cause.
pub fn resolve_burst<R: Rng>(
    contact: &Contact,
    bodies: &mut [Body],
    energy: &mut EnergyMode,
    tuning: &Tuning,
    rng: &mut R,
) -> Option<(u32, BurstCause)> {
    let eligible = |id: u32| bodies.iter().any(|b| b.id == id && b.can_burst());
    if !eligible(contact.a) && !eligible(contact.b) {
        return None;
    }

    let chaos = energy.is_active();
    let cause = if chaos {
        if contact.impact_speed <= tuning.energy_burst_speed
            || !energy.has_burst_budget()
            || !rng.random_bool(tuning.energy_burst_chance)
        {
            return None;
        }
        BurstCause::Chaos
    } else {
        if contact.impact_speed <= tuning.burst_speed || !rng.random_bool(tuning.burst_chance) {
            return None;
        }
        BurstCause::Collision
    };

    let id = pick_one(rng, contact.a, contact.b);
    if !eligible(id) {
        return None;
    }
    if chaos {
        energy.use_burst();
    }

    let body = bodies.iter_mut().find(|b| b.id == id)?;
    body.status = BodyStatus::BurstPending;
    log::debug!(
        "Body {} marked for burst ({:?}, impact {:.2})",
        id,
        cause,
        contact.impact_speed
    );
    Some((id, cause))
}
