//! Presentation-independent dashboard state.
//!
//! Only the owner of a `Dashboard` mutates it (the TUI thread, or a headless
//! session). Network work happens elsewhere and comes back as `DashEvent`s,
//! applied one at a time in the order they settled.

mod console;
mod init;
mod jobs;
mod registry;
mod status;

pub use console::{ConsoleSink, CONSOLE_PLACEHOLDER};
pub use init::{FormField, InitView, RuntimeForm};
pub use jobs::{JobRecord, JobRunController, RunRejected, RunTicket, NO_OUTPUT, RUNNING_LABEL, RUN_LABEL};
pub use registry::{JobElement, JobRegistry, TriggerHandle};
pub use status::{HealthView, StatusView, STATUS_LOADING};

use crate::api::TransportError;
use crate::model::{Health, JobDescriptor, JobVisualState, RunOutcome};
use serde_json::Value;

/// A settled request, reported back to the dashboard owner.
#[derive(Debug)]
pub enum DashEvent {
    HealthChecked(Result<Health, TransportError>),
    StatusLoaded(Result<Value, TransportError>),
    ProofsLoaded(Result<Vec<JobDescriptor>, TransportError>),
    RunSettled {
        ticket: RunTicket,
        outcome: RunOutcome,
    },
    InitApplied(Result<Value, TransportError>),
}

#[derive(Debug, Default)]
pub struct Dashboard {
    pub console: ConsoleSink,
    pub status: StatusView,
    pub health: HealthView,
    pub registry: JobRegistry,
    pub jobs: JobRunController,
    pub form: RuntimeForm,
    pub init: InitView,
}

impl Dashboard {
    /// Start a run from a trigger handle. The returned ticket must be
    /// dispatched; the run's settlement hands it back through `apply`.
    pub fn trigger(&mut self, handle: TriggerHandle) -> Result<RunTicket, RunRejected> {
        let result = self.jobs.begin(handle, &mut self.console);
        if let Err(e) = &result {
            tracing::debug!(proof = handle.id, reason = %e, "run rejected");
        }
        result
    }

    pub fn visual_state(&self, id: u32) -> JobVisualState {
        self.jobs.visual_state(id)
    }

    pub fn apply(&mut self, ev: DashEvent) {
        match ev {
            DashEvent::HealthChecked(result) => self.health.apply(result),
            DashEvent::StatusLoaded(result) => self.status.apply(result),
            DashEvent::ProofsLoaded(Ok(descriptors)) => {
                let generation = self.jobs.rebind(&descriptors);
                tracing::info!(count = descriptors.len(), generation, "job list rendered");
                self.registry.render(descriptors, generation);
            }
            DashEvent::ProofsLoaded(Err(e)) => {
                tracing::warn!(error = %e, "failed to load job list");
                self.jobs.rebind(&[]);
                self.registry.fail(&e);
            }
            DashEvent::RunSettled { ticket, outcome } => {
                let id = ticket.id();
                let state = self.jobs.settle(ticket, outcome, &mut self.console);
                tracing::info!(proof = id, ?state, "run settled");
            }
            DashEvent::InitApplied(result) => self.init.apply(&result),
        }
    }
}
