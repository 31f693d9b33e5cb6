//! Request controller.
//!
//! Receives commands from presentation layers, runs each request as its own
//! task, and reports every settlement back as a `DashEvent`.

use crate::api::Backend;
use crate::dashboard::{DashEvent, RunTicket};
use crate::model::{RunOutcome, RuntimeConfig};
use anyhow::Result;
use std::sync::Arc;
use tokio::sync::mpsc::{UnboundedReceiver, UnboundedSender};
use tokio::task::JoinSet;

/// Commands emitted by UI layers.
#[derive(Debug)]
pub enum UiCommand {
    CheckHealth,
    RefreshStatus,
    LoadProofs,
    RunProof(RunTicket),
    ApplyInit(RuntimeConfig),
    Quit,
}

/// Issue the initial status and job list requests.
pub fn bootstrap(cmd_tx: &UnboundedSender<UiCommand>) {
    for cmd in [
        UiCommand::CheckHealth,
        UiCommand::RefreshStatus,
        UiCommand::LoadProofs,
    ] {
        let _ = cmd_tx.send(cmd);
    }
}

/// Dispatch commands until `Quit` (or every sender is gone). Requests still
/// in flight at that point are aborted without settling.
pub async fn run_controller<B: Backend>(
    backend: Arc<B>,
    event_tx: UnboundedSender<DashEvent>,
    mut cmd_rx: UnboundedReceiver<UiCommand>,
) -> Result<()> {
    let mut tasks: JoinSet<()> = JoinSet::new();

    loop {
        tokio::select! {
            cmd = cmd_rx.recv() => {
                match cmd {
                    Some(UiCommand::Quit) | None => break,
                    Some(cmd) => dispatch(&backend, &event_tx, &mut tasks, cmd),
                }
            }
            Some(joined) = tasks.join_next(), if !tasks.is_empty() => {
                if let Err(e) = joined {
                    if e.is_panic() {
                        tracing::error!(error = %e, "request task panicked");
                    }
                }
            }
        }
    }

    if !tasks.is_empty() {
        tracing::info!(in_flight = tasks.len(), "dropping in-flight requests");
    }
    tasks.shutdown().await;
    Ok(())
}

fn dispatch<B: Backend>(
    backend: &Arc<B>,
    event_tx: &UnboundedSender<DashEvent>,
    tasks: &mut JoinSet<()>,
    cmd: UiCommand,
) {
    let backend = backend.clone();
    let tx = event_tx.clone();
    match cmd {
        UiCommand::CheckHealth => {
            tasks.spawn(async move {
                let _ = tx.send(DashEvent::HealthChecked(backend.health().await));
            });
        }
        UiCommand::RefreshStatus => {
            tasks.spawn(async move {
                refresh_status(backend.as_ref(), &tx).await;
            });
        }
        UiCommand::LoadProofs => {
            tasks.spawn(async move {
                let _ = tx.send(DashEvent::ProofsLoaded(backend.list_proofs().await));
            });
        }
        UiCommand::RunProof(ticket) => {
            tasks.spawn(async move {
                let id = ticket.id();
                tracing::info!(proof = id, "run dispatched");
                let outcome = match backend.run_proof(id).await {
                    Ok(resp) => resp.classify(),
                    Err(e) => {
                        tracing::warn!(proof = id, error = %e, "run request failed");
                        RunOutcome::Transport {
                            reason: e.to_string(),
                        }
                    }
                };
                let _ = tx.send(DashEvent::RunSettled { ticket, outcome });
            });
        }
        UiCommand::ApplyInit(cfg) => {
            tasks.spawn(async move {
                tracing::info!(mode = %cfg.mode, ide = %cfg.ide, target = ?cfg.target, "reinitialising runtime");
                let result = backend.init_runtime(&cfg).await;
                let succeeded = result.is_ok();
                if let Err(e) = &result {
                    tracing::warn!(error = %e, "init request failed");
                }
                let _ = tx.send(DashEvent::InitApplied(result));
                if succeeded {
                    refresh_status(backend.as_ref(), &tx).await;
                }
            });
        }
        UiCommand::Quit => {}
    }
}

async fn refresh_status<B: Backend>(backend: &B, tx: &UnboundedSender<DashEvent>) {
    let result = backend.runtime_status().await;
    if let Err(e) = &result {
        tracing::warn!(error = %e, "runtime status request failed");
    }
    let _ = tx.send(DashEvent::StatusLoaded(result));
}
