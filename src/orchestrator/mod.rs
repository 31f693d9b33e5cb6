//! Application-level orchestration.
//!
//! This module owns request dispatch (one task per command, settlements
//! reported as events) and the headless session built on top of it. UI/CLI
//! layers call into this module and never talk to the backend directly.

mod controller;
mod session;

pub use controller::{bootstrap, run_controller, UiCommand};
pub use session::{RunReport, Session};
