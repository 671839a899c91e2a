//! Bubble Field - a decorative field of drifting, bursting bubbles
//!
//! Core modules:
//! - `sim`: Deterministic simulation (forces, collisions, waves, energy mode)
//! - `driver`: Frame driver with cancellation, bridging sim and host
//! - `tuning`: Data-driven feel constants
//! - `audio`: Procedural pop sounds (web only)

#[cfg(target_arch = "wasm32")]
pub mod audio;
pub mod driver;
pub mod error;
pub mod sim;
pub mod tuning;

pub use driver::{CancelToken, Driver, DriverSlot, FrameHost, FrameOutcome, NoSound, SoundHook};
pub use error::{SimError, SimResult};
pub use tuning::Tuning;

use glam::Vec2;
use serde::{Deserialize, Serialize};

/// Simulation configuration constants
pub mod consts {
    /// Fixed simulation timestep (one tick per rendered frame)
    pub const SIM_DT: f32 = 1.0 / 60.0;
    /// Seed used when the host does not supply one
    pub const DEFAULT_SEED: u64 = 0x0B0B_B1E5;
    /// Distance the static boundaries sit outside each screen edge
    pub const BOUNDARY_OFFSET: f32 = 1.0;
}

/// Drawable area reported by the host, in pixels
#[derive(Debug, Clone, Copy, PartialEq, Serialize, Deserialize)]
pub struct Viewport {
    pub width: f32,
    pub height: f32,
}

impl Viewport {
    /// Validated constructor: both sides must be finite and positive
    pub fn new(width: f32, height: f32) -> SimResult<Self> {
        if width.is_finite() && height.is_finite() && width > 0.0 && height > 0.0 {
            Ok(Self { width, height })
        } else {
            Err(SimError::InvalidViewport { width, height })
        }
    }

    /// Centre of the drawable area
    #[inline]
    pub fn center(&self) -> Vec2 {
        Vec2::new(self.width * 0.5, self.height * 0.5)
    }

    /// Convert percentage-of-viewport coordinates to pixels.
    /// A non-finite result falls back to the centre.
    pub fn percent_to_px(&self, x_pct: f32, y_pct: f32) -> Vec2 {
        let px = Vec2::new(self.width * x_pct / 100.0, self.height * y_pct / 100.0);
        if px.is_finite() { px } else { self.center() }
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_viewport_rejects_degenerate() {
        assert!(Viewport::new(0.0, 100.0).is_err());
        assert!(Viewport::new(f32::NAN, 100.0).is_err());
        assert!(Viewport::new(800.0, 600.0).is_ok());
    }

    #[test]
    fn test_percent_to_px_nan_defaults_to_center() {
        let vp = Viewport::new(800.0, 600.0).unwrap();
        assert_eq!(vp.percent_to_px(50.0, 25.0), Vec2::new(400.0, 150.0));
        assert_eq!(vp.percent_to_px(f32::NAN, 10.0), vp.center());
    }
}
