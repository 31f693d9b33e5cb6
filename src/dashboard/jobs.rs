//! Per-job run state machine.
//!
//! `begin` performs the Idle -> Running transition and hands out a `RunTicket`.
//! The ticket is not `Clone`, and `settle` takes it by value, so each run is
//! finalised exactly once whichever way its request settled.
//!
//! Exclusivity is keyed by job id, not by registry generation: a job whose
//! request is still in flight stays Running across reloads of the job list.

use super::console::ConsoleSink;
use super::registry::TriggerHandle;
use crate::model::{JobDescriptor, JobVisualState, RunOutcome};
use std::collections::{BTreeMap, BTreeSet};
use thiserror::Error;

pub const RUN_LABEL: &str = "Run";
pub const RUNNING_LABEL: &str = "Running…";
pub const NO_OUTPUT: &str = "(no output)";

#[derive(Debug, Clone, PartialEq, Eq)]
pub struct JobRecord {
    pub running: bool,
    pub done: bool,
    pub enabled: bool,
    pub label: &'static str,
}

impl Default for JobRecord {
    fn default() -> Self {
        Self {
            running: false,
            done: false,
            enabled: true,
            label: RUN_LABEL,
        }
    }
}

impl JobRecord {
    fn pinned() -> Self {
        Self {
            running: true,
            done: false,
            enabled: false,
            label: RUNNING_LABEL,
        }
    }

    pub fn visual_state(&self) -> JobVisualState {
        if self.running {
            JobVisualState::Running
        } else if self.done {
            JobVisualState::Done
        } else {
            JobVisualState::Idle
        }
    }
}

#[derive(Debug, Clone, Copy, PartialEq, Eq, Error)]
pub enum RunRejected {
    #[error("proof #{id} belongs to a job list that has since been reloaded")]
    Stale { id: u32 },
    #[error("proof #{id} is not in the job list")]
    Unknown { id: u32 },
    #[error("proof #{id} is already running")]
    AlreadyRunning { id: u32 },
}

/// Proof that a run was started; redeemed once by `JobRunController::settle`.
#[derive(Debug)]
pub struct RunTicket {
    id: u32,
    generation: u64,
}

impl RunTicket {
    pub fn id(&self) -> u32 {
        self.id
    }
}

#[derive(Debug, Default)]
pub struct JobRunController {
    generation: u64,
    records: BTreeMap<u32, JobRecord>,
    in_flight: BTreeSet<u32>,
}

impl JobRunController {
    /// Start a new generation with one record per descriptor. Jobs with a run
    /// still in flight start out Running; that run restores them when it settles.
    pub fn rebind(&mut self, descriptors: &[JobDescriptor]) -> u64 {
        self.generation += 1;
        self.records = descriptors
            .iter()
            .map(|d| {
                let record = if self.in_flight.contains(&d.id) {
                    JobRecord::pinned()
                } else {
                    JobRecord::default()
                };
                (d.id, record)
            })
            .collect();
        self.generation
    }

    pub fn generation(&self) -> u64 {
        self.generation
    }

    pub fn record(&self, id: u32) -> Option<&JobRecord> {
        self.records.get(&id)
    }

    pub fn visual_state(&self, id: u32) -> JobVisualState {
        self.records
            .get(&id)
            .map(JobRecord::visual_state)
            .unwrap_or(JobVisualState::Idle)
    }

    /// Runs begun but not yet settled, across all generations.
    pub fn in_flight(&self) -> usize {
        self.in_flight.len()
    }

    /// Idle -> Running. The in-flight set is checked and updated before any
    /// request exists, so a second activation of the same job is refused.
    pub fn begin(
        &mut self,
        handle: TriggerHandle,
        console: &mut ConsoleSink,
    ) -> Result<RunTicket, RunRejected> {
        let id = handle.id;
        if handle.generation != self.generation {
            return Err(RunRejected::Stale { id });
        }
        let record = self
            .records
            .get_mut(&id)
            .ok_or(RunRejected::Unknown { id })?;
        if record.running || !self.in_flight.insert(id) {
            return Err(RunRejected::AlreadyRunning { id });
        }

        record.running = true;
        record.done = false;
        record.enabled = false;
        record.label = RUNNING_LABEL;
        console.append(&format!("▶ Running proof #{id}…"));

        Ok(RunTicket {
            id,
            generation: self.generation,
        })
    }

    /// Running -> Done | Idle. A run begun before the last reload restores
    /// the current record for its id, if the reloaded list still has one.
    pub fn settle(
        &mut self,
        ticket: RunTicket,
        outcome: RunOutcome,
        console: &mut ConsoleSink,
    ) -> JobVisualState {
        let id = ticket.id;
        let succeeded = outcome.is_completed();
        match outcome {
            RunOutcome::Completed { output } => {
                let output = trim_output(&output);
                console.append(if output.is_empty() { NO_OUTPUT } else { output });
                console.append(&format!("✓ Proof #{id} complete."));
            }
            RunOutcome::Failed { error, output } => {
                console.append(&format!("✗ Error: {error}"));
                if let Some(output) = output.as_deref().map(trim_output) {
                    if !output.is_empty() {
                        console.append(output);
                    }
                }
            }
            RunOutcome::Transport { reason } => {
                console.append(&format!("✗ Request failed: {reason}"));
            }
        }

        self.in_flight.remove(&id);
        if ticket.generation != self.generation {
            tracing::debug!(
                proof = id,
                begun_in = ticket.generation,
                current = self.generation,
                "run settled after a job list reload"
            );
        }

        match self.records.get_mut(&id) {
            Some(record) => {
                record.running = false;
                record.enabled = true;
                record.label = RUN_LABEL;
                if succeeded {
                    record.done = true;
                }
                record.visual_state()
            }
            None => JobVisualState::Idle,
        }
    }
}

fn trim_output(output: &str) -> &str {
    output.trim_end_matches(['\r', '\n'])
}
