//! Deterministic simulation module
//!
//! All bubble logic lives here. This module must be pure and deterministic:
//! - Fixed timestep only
//! - Seeded RNG only
//! - Stable iteration order (by body ID)
//! - No rendering or platform dependencies

pub mod collision;
pub mod energy;
pub mod forces;
pub mod registry;
pub mod state;
pub mod tick;
pub mod wave;

pub use collision::{Contact, detect_contacts, pick_one, resolve_burst};
pub use energy::{EnergyMode, EnergyPhase, ForceScale};
pub use registry::{Boundary, Registry, TargetPosition, WaveLayout};
pub use state::{Body, BodyStatus, BurstCause, BurstTrigger, Edge, SimState, SizeTier};
pub use tick::{BodyPosition, TickInput, TickResult, snapshot, tick};
pub use wave::{Wave, WavePhase};
