//! Dashboard for the PolyPi runtime API.
//!
//! `dashboard` holds presentation-independent state, `orchestrator` dispatches
//! requests through an `api::Backend`, and `tui` / `cli` are the two front ends.

pub mod api;
pub mod cli;
pub mod dashboard;
pub mod logging;
pub mod model;
pub mod orchestrator;
mod text_summary;
#[cfg(feature = "tui")]
mod tui;
