//! Domain layer for the CUET prep progress tracker: local and shared
//! document models, progression math, shared-document reconciliation, and
//! the reducer-driven application state machine.

pub mod domain;
pub mod merge;
pub mod progression;
pub mod reconcile;
pub mod scheduler;
pub mod state;

pub use domain::*;
pub use state::{reduce, AppAction, AppState};
