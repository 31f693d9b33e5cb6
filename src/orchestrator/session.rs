//! Headless driver for the dashboard.
//!
//! Owns a `Dashboard` and a controller task, and exposes the dashboard flows
//! as awaitable steps for the text and JSON modes.

use super::controller::{bootstrap, run_controller, UiCommand};
use crate::api::Backend;
use crate::dashboard::{Dashboard, DashEvent, RunRejected};
use crate::model::{JobVisualState, RunOutcome, RuntimeConfig};
use anyhow::{anyhow, Context, Result};
use std::sync::Arc;
use tokio::sync::mpsc::{self, UnboundedReceiver, UnboundedSender};
use tokio::task::JoinHandle;

/// What happened to one requested run.
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum RunReport {
    Rejected {
        id: u32,
        reason: RunRejected,
    },
    Settled {
        id: u32,
        outcome: RunOutcome,
        state: JobVisualState,
    },
}

impl RunReport {
    pub fn id(&self) -> u32 {
        match self {
            RunReport::Rejected { id, .. } | RunReport::Settled { id, .. } => *id,
        }
    }

    pub fn is_done(&self) -> bool {
        matches!(
            self,
            RunReport::Settled {
                state: JobVisualState::Done,
                ..
            }
        )
    }
}

pub struct Session {
    pub dashboard: Dashboard,
    cmd_tx: UnboundedSender<UiCommand>,
    event_rx: UnboundedReceiver<DashEvent>,
    controller: JoinHandle<Result<()>>,
}

impl Session {
    pub fn start<B: Backend>(backend: Arc<B>) -> Self {
        let (event_tx, event_rx) = mpsc::unbounded_channel::<DashEvent>();
        let (cmd_tx, cmd_rx) = mpsc::unbounded_channel::<UiCommand>();
        let controller = tokio::spawn(run_controller(backend, event_tx, cmd_rx));
        Self {
            dashboard: Dashboard::default(),
            cmd_tx,
            event_rx,
            controller,
        }
    }

    fn send(&self, cmd: UiCommand) -> Result<()> {
        self.cmd_tx
            .send(cmd)
            .map_err(|_| anyhow!("request controller has stopped"))
    }

    async fn next_event(&mut self) -> Result<DashEvent> {
        self.event_rx
            .recv()
            .await
            .ok_or_else(|| anyhow!("request controller has stopped"))
    }

    /// Load health, runtime status and the job list, waiting for all three.
    pub async fn bootstrap(&mut self) -> Result<()> {
        bootstrap(&self.cmd_tx);
        let (mut health, mut status, mut proofs) = (false, false, false);
        while !(health && status && proofs) {
            let ev = self.next_event().await?;
            match &ev {
                DashEvent::HealthChecked(_) => health = true,
                DashEvent::StatusLoaded(_) => status = true,
                DashEvent::ProofsLoaded(_) => proofs = true,
                _ => {}
            }
            self.dashboard.apply(ev);
        }
        Ok(())
    }

    /// Reinitialise the runtime. Returns whether the request itself got through;
    /// when it did, the refreshed status has been applied too.
    pub async fn apply_init(&mut self, cfg: RuntimeConfig) -> Result<bool> {
        self.dashboard.init.in_flight = true;
        self.send(UiCommand::ApplyInit(cfg))?;
        let succeeded = loop {
            let ev = self.next_event().await?;
            if let DashEvent::InitApplied(result) = &ev {
                let ok = result.is_ok();
                self.dashboard.apply(ev);
                break ok;
            }
            self.dashboard.apply(ev);
        };
        if succeeded {
            loop {
                let ev = self.next_event().await?;
                let is_status = matches!(ev, DashEvent::StatusLoaded(_));
                self.dashboard.apply(ev);
                if is_status {
                    break;
                }
            }
        }
        Ok(succeeded)
    }

    /// Trigger every id (concurrently) and wait until all accepted runs settle.
    /// Reports are in rejection order followed by settlement order.
    pub async fn run_jobs(&mut self, ids: &[u32]) -> Result<Vec<RunReport>> {
        let mut reports = Vec::new();
        let mut pending = 0usize;
        for &id in ids {
            let Some(handle) = self.dashboard.registry.trigger_for(id) else {
                reports.push(RunReport::Rejected {
                    id,
                    reason: RunRejected::Unknown { id },
                });
                continue;
            };
            match self.dashboard.trigger(handle) {
                Ok(ticket) => {
                    self.send(UiCommand::RunProof(ticket))?;
                    pending += 1;
                }
                Err(reason) => reports.push(RunReport::Rejected { id, reason }),
            }
        }

        while pending > 0 {
            let ev = self.next_event().await?;
            match ev {
                DashEvent::RunSettled { ticket, outcome } => {
                    let id = ticket.id();
                    self.dashboard.apply(DashEvent::RunSettled {
                        ticket,
                        outcome: outcome.clone(),
                    });
                    reports.push(RunReport::Settled {
                        id,
                        outcome,
                        state: self.dashboard.visual_state(id),
                    });
                    pending -= 1;
                }
                other => self.dashboard.apply(other),
            }
        }
        Ok(reports)
    }

    pub async fn shutdown(self) -> Result<()> {
        let _ = self.cmd_tx.send(UiCommand::Quit);
        self.controller
            .await
            .context("request controller task failed")?
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::api::mock::{MockBackend, Reply};
    use crate::model::RunResponse;
    use std::time::Duration;

    #[tokio::test]
    async fn runs_report_success_and_failure() {
        let backend = MockBackend::with_proofs(&[1, 2, 3]);
        backend.script_run(
            2,
            Duration::ZERO,
            Reply::Ok(RunResponse {
                output: Some("partial".into()),
                error: Some("boom".into()),
            }),
        );
        let mut session = Session::start(Arc::new(backend));
        session.bootstrap().await.unwrap();
        let reports = session.run_jobs(&[1, 2]).await.unwrap();

        assert_eq!(reports.len(), 2);
        let one = reports.iter().find(|r| r.id() == 1).unwrap();
        let two = reports.iter().find(|r| r.id() == 2).unwrap();
        assert!(one.is_done());
        assert!(!two.is_done());
        let console = session.dashboard.console.text().to_string();
        assert!(console.contains("✗ Error: boom"));
        assert!(console.contains("partial"));
        session.shutdown().await.unwrap();
    }

    #[tokio::test]
    async fn duplicate_and_unknown_ids_are_rejected() {
        let backend = Arc::new(MockBackend::with_proofs(&[1]));
        let mut session = Session::start(backend.clone());
        session.bootstrap().await.unwrap();
        let reports = session.run_jobs(&[1, 1, 42]).await.unwrap();

        assert!(reports.contains(&RunReport::Rejected {
            id: 1,
            reason: RunRejected::AlreadyRunning { id: 1 },
        }));
        assert!(reports.contains(&RunReport::Rejected {
            id: 42,
            reason: RunRejected::Unknown { id: 42 },
        }));
        assert_eq!(backend.run_calls(), vec![1]);
        session.shutdown().await.unwrap();
    }

    #[tokio::test]
    async fn init_applies_result_and_refreshed_status() {
        let backend = Arc::new(MockBackend::default());
        let mut session = Session::start(backend.clone());
        let ok = session
            .apply_init(RuntimeConfig::from_selection("python", "pure", ""))
            .await
            .unwrap();

        assert!(ok);
        assert!(session.dashboard.init.text().unwrap().contains("initialised"));
        assert_eq!(session.dashboard.status.refreshes(), 1);
        assert_eq!(backend.status_calls(), 1);
        session.shutdown().await.unwrap();
    }
}
