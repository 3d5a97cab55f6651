//! Document models for local (per-device) and shared (cross-device) state.

mod local;
mod shared;

pub use local::*;
pub use shared::*;
