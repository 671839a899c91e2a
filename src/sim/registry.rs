//! Body registry: the bubbles and walls of the current wave
//!
//! Bodies are only ever added by [`Registry::create_wave`] and only ever
//! removed by [`Registry::destroy_wave`].

use glam::Vec2;
use rand::Rng;
use serde::{Deserialize, Serialize};

use super::state::{Body, Edge, SizeTier};
use crate::Viewport;
use crate::consts::BOUNDARY_OFFSET;
use crate::tuning::Tuning;

/// Target position in percent of the viewport
#[derive(Debug, Clone, Copy, PartialEq, Serialize, Deserialize)]
pub struct TargetPosition {
    pub x_pct: f32,
    pub y_pct: f32,
}

/// Spawn plan for one wave
#[derive(Debug, Clone, Default)]
pub struct WaveLayout {
    pub targets: Vec<TargetPosition>,
    pub sizes: Vec<SizeTier>,
}

impl WaveLayout {
    /// Draw a fresh count, fresh targets and fresh size tiers
    pub fn random<R: Rng>(rng: &mut R, tuning: &Tuning) -> Self {
        let count = rng.random_range(tuning.min_bodies..=tuning.max_bodies) as usize;
        let targets = (0..count)
            .map(|_| TargetPosition {
                x_pct: rng.random_range(12.0..=88.0),
                y_pct: rng.random_range(15.0..=85.0),
            })
            .collect();
        let sizes = (0..count)
            .map(|_| SizeTier::ALL[rng.random_range(0..SizeTier::ALL.len())])
            .collect();
        Self { targets, sizes }
    }

    pub fn count(&self) -> usize {
        self.targets.len()
    }

    /// Size for a body index; missing entries default to medium
    pub fn size_at(&self, index: usize) -> SizeTier {
        self.sizes.get(index).copied().unwrap_or_default()
    }
}

/// A static, perfectly elastic wall just outside one screen edge.
/// Infinitely thin: `min == max` along the edge's normal axis.
#[derive(Debug, Clone, Copy, PartialEq, Serialize, Deserialize)]
pub struct Boundary {
    pub edge: Edge,
    pub min: Vec2,
    pub max: Vec2,
}

impl Boundary {
    pub fn new(edge: Edge, viewport: Viewport) -> Self {
        let (w, h, o) = (viewport.width, viewport.height, BOUNDARY_OFFSET);
        let (min, max) = match edge {
            Edge::Left => (Vec2::new(-o, -o), Vec2::new(-o, h + o)),
            Edge::Right => (Vec2::new(w + o, -o), Vec2::new(w + o, h + o)),
            Edge::Top => (Vec2::new(-o, -o), Vec2::new(w + o, -o)),
            Edge::Bottom => (Vec2::new(-o, h + o), Vec2::new(w + o, h + o)),
        };
        Self { edge, min, max }
    }

    /// Keep a body on the inside of this wall.
    ///
    /// Reflects the outward velocity component without loss and pushes the
    /// body back to touching distance. Returns true on contact.
    pub fn contain(&self, body: &mut Body) -> bool {
        let r = body.radius;
        match self.edge {
            Edge::Left if body.pos.x - r < self.min.x => {
                body.pos.x = self.min.x + r;
                body.vel.x = body.vel.x.abs();
                true
            }
            Edge::Right if body.pos.x + r > self.min.x => {
                body.pos.x = self.min.x - r;
                body.vel.x = -body.vel.x.abs();
                true
            }
            Edge::Top if body.pos.y - r < self.min.y => {
                body.pos.y = self.min.y + r;
                body.vel.y = body.vel.y.abs();
                true
            }
            Edge::Bottom if body.pos.y + r > self.min.y => {
                body.pos.y = self.min.y - r;
                body.vel.y = -body.vel.y.abs();
                true
            }
            _ => false,
        }
    }
}

/// Bodies and boundaries of one wave
#[derive(Debug, Clone, Default)]
pub struct Registry {
    /// Sorted by id for deterministic iteration
    pub bodies: Vec<Body>,
    pub boundaries: Vec<Boundary>,
}

impl Registry {
    /// Place one body per layout entry, plus the four walls.
    ///
    /// Each body starts at its target (converted to pixels), nudged by up to
    /// `spawn_jitter` px per axis, with a small random velocity.
    pub fn create_wave<R: Rng>(
        &mut self,
        layout: &WaveLayout,
        viewport: Viewport,
        next_id: &mut u32,
        tuning: &Tuning,
        rng: &mut R,
    ) -> &[Body] {
        if !self.bodies.is_empty() || !self.boundaries.is_empty() {
            self.destroy_wave();
        }

        let jitter = tuning.spawn_jitter;
        let speed = tuning.initial_speed;
        for (i, target) in layout.targets.iter().enumerate() {
            let base = viewport.percent_to_px(target.x_pct, target.y_pct);
            let nudge = Vec2::new(
                rng.random_range(-jitter..=jitter),
                rng.random_range(-jitter..=jitter),
            );
            let vel = Vec2::new(
                rng.random_range(-speed..=speed),
                rng.random_range(-speed..=speed),
            );
            let id = *next_id;
            *next_id += 1;
            self.bodies.push(Body::new(id, layout.size_at(i), base + nudge, vel));
        }

        self.rebuild_boundaries(viewport);
        &self.bodies
    }

    /// Discard every body and boundary
    pub fn destroy_wave(&mut self) {
        self.bodies.clear();
        self.boundaries.clear();
    }

    /// Recreate the walls for a new viewport and pull stray bodies inside
    pub fn rebuild_boundaries(&mut self, viewport: Viewport) {
        self.boundaries = Edge::ALL.iter().map(|&e| Boundary::new(e, viewport)).collect();
        for body in self.bodies.iter_mut().filter(|b| b.is_simulated()) {
            for wall in &self.boundaries {
                wall.contain(body);
            }
        }
    }

    pub fn get(&self, id: u32) -> Option<&Body> {
        self.bodies.iter().find(|b| b.id == id)
    }

    pub fn get_mut(&mut self, id: u32) -> Option<&mut Body> {
        self.bodies.iter_mut().find(|b| b.id == id)
    }

    pub fn is_empty(&self) -> bool {
        self.bodies.is_empty()
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use rand::SeedableRng;
    use rand_pcg::Pcg32;

    fn viewport() -> Viewport {
        Viewport::new(1000.0, 500.0).unwrap()
    }

    fn layout(n: usize) -> WaveLayout {
        WaveLayout {
            targets: (0..n)
                .map(|i| TargetPosition {
                    x_pct: 20.0 + i as f32 * 10.0,
                    y_pct: 50.0,
                })
                .collect(),
            sizes: vec![SizeTier::Small; n],
        }
    }

    #[test]
    fn test_create_wave_places_near_targets() {
        let mut rng = Pcg32::seed_from_u64(1);
        let mut next_id = 10;
        let mut reg = Registry::default();
        let tuning = Tuning::default();
        let bodies = reg.create_wave(&layout(5), viewport(), &mut next_id, &tuning, &mut rng);

        assert_eq!(bodies.len(), 5);
        for (i, body) in bodies.iter().enumerate() {
            let target = Vec2::new(200.0 + i as f32 * 100.0, 250.0);
            assert!((body.pos.x - target.x).abs() <= 4.0);
            assert!((body.pos.y - target.y).abs() <= 4.0);
            assert!(body.vel.x.abs() <= 0.3 && body.vel.y.abs() <= 0.3);
            assert_eq!(body.id, 10 + i as u32);
        }
        assert_eq!(next_id, 15);
        assert_eq!(reg.boundaries.len(), 4);
    }

    #[test]
    fn test_nan_target_defaults_to_center() {
        let mut rng = Pcg32::seed_from_u64(2);
        let mut next_id = 1;
        let mut reg = Registry::default();
        let mut tuning = Tuning::default();
        tuning.spawn_jitter = 0.0;
        let plan = WaveLayout {
            targets: vec![TargetPosition {
                x_pct: f32::NAN,
                y_pct: 30.0,
            }],
            sizes: vec![],
        };
        reg.create_wave(&plan, viewport(), &mut next_id, &tuning, &mut rng);
        assert_eq!(reg.bodies[0].pos, viewport().center());
        assert_eq!(reg.bodies[0].tier, SizeTier::Medium);
    }

    #[test]
    fn test_destroy_wave_clears_everything() {
        let mut rng = Pcg32::seed_from_u64(3);
        let mut next_id = 1;
        let mut reg = Registry::default();
        reg.create_wave(&layout(6), viewport(), &mut next_id, &Tuning::default(), &mut rng);
        reg.destroy_wave();
        assert!(reg.is_empty());
        assert!(reg.boundaries.is_empty());
    }

    #[test]
    fn test_random_layout_count_in_range() {
        let mut rng = Pcg32::seed_from_u64(4);
        let tuning = Tuning::default();
        for _ in 0..200 {
            let plan = WaveLayout::random(&mut rng, &tuning);
            assert!((5..=7).contains(&plan.count()));
            assert_eq!(plan.sizes.len(), plan.count());
        }
    }

    #[test]
    fn test_boundary_reflects_outward_velocity() {
        let wall = Boundary::new(Edge::Left, viewport());
        let mut body = Body::new(1, SizeTier::Small, Vec2::new(5.0, 100.0), Vec2::new(-1.5, 0.2));
        assert!(wall.contain(&mut body));
        assert_eq!(body.vel.x, 1.5);
        assert_eq!(body.vel.y, 0.2);
        assert!(body.pos.x - body.radius >= -BOUNDARY_OFFSET);
    }

    #[test]
    fn test_rebuild_boundaries_pulls_bodies_inside() {
        let mut rng = Pcg32::seed_from_u64(5);
        let mut next_id = 1;
        let mut reg = Registry::default();
        reg.create_wave(&layout(5), viewport(), &mut next_id, &Tuning::default(), &mut rng);
        let small = Viewport::new(300.0, 200.0).unwrap();
        reg.rebuild_boundaries(small);
        for body in &reg.bodies {
            assert!(body.pos.x + body.radius <= small.width + BOUNDARY_OFFSET + 0.001);
        }
    }
}
