//! Application layer: the state controller binding reducer transitions to
//! persistence and remote pushes, and the periodic sync scheduler.

mod controller;
mod scheduler;

pub use controller::AppController;
pub use scheduler::SyncScheduler;
