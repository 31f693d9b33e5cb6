//! Scripted in-memory `Backend` for controller and session tests.

use super::{Backend, TransportError};
use crate::model::{Health, JobDescriptor, RunResponse, RuntimeConfig};
use serde_json::{json, Value};
use std::collections::{HashMap, VecDeque};
use std::sync::Mutex;
use std::time::Duration;

#[derive(Debug, Clone)]
pub(crate) enum Reply<T> {
    Ok(T),
    Fail(String),
}

impl<T> Reply<T> {
    fn into_result(self) -> Result<T, TransportError> {
        match self {
            Reply::Ok(v) => Ok(v),
            Reply::Fail(msg) => Err(TransportError::status(503, &msg)),
        }
    }
}

#[derive(Debug)]
pub(crate) struct MockBackend {
    pub health: Mutex<Reply<Health>>,
    /// Consumed front to back, one per call; falls back to `default_status`.
    pub status: Mutex<VecDeque<(Duration, Reply<Value>)>>,
    pub default_status: Value,
    pub proofs: Mutex<Reply<Vec<JobDescriptor>>>,
    pub runs: Mutex<HashMap<u32, (Duration, Reply<RunResponse>)>>,
    pub init: Mutex<Reply<Value>>,
    pub run_calls: Mutex<Vec<u32>>,
    pub init_calls: Mutex<Vec<RuntimeConfig>>,
    pub status_calls: Mutex<usize>,
}

impl Default for MockBackend {
    fn default() -> Self {
        Self {
            health: Mutex::new(Reply::Ok(Health {
                status: "ok".into(),
                service: Some("polypi-pure-backend".into()),
            })),
            status: Mutex::new(VecDeque::new()),
            default_status: json!({"version": "2.0.0", "initialised": true, "mode": "python"}),
            proofs: Mutex::new(Reply::Ok(Vec::new())),
            runs: Mutex::new(HashMap::new()),
            init: Mutex::new(Reply::Ok(json!({"initialised": true}))),
            run_calls: Mutex::new(Vec::new()),
            init_calls: Mutex::new(Vec::new()),
            status_calls: Mutex::new(0),
        }
    }
}

impl MockBackend {
    pub fn with_proofs(ids: &[u32]) -> Self {
        let proofs = ids
            .iter()
            .map(|&id| JobDescriptor {
                id,
                name: format!("Proof {id}"),
                file: format!("proof_of_work_{id}.py"),
            })
            .collect();
        Self {
            proofs: Mutex::new(Reply::Ok(proofs)),
            ..Default::default()
        }
    }

    pub fn script_run(&self, id: u32, delay: Duration, reply: Reply<RunResponse>) {
        self.runs.lock().unwrap().insert(id, (delay, reply));
    }

    pub fn script_status(&self, delay: Duration, reply: Reply<Value>) {
        self.status.lock().unwrap().push_back((delay, reply));
    }

    pub fn run_calls(&self) -> Vec<u32> {
        self.run_calls.lock().unwrap().clone()
    }

    pub fn status_calls(&self) -> usize {
        *self.status_calls.lock().unwrap()
    }
}

impl Backend for MockBackend {
    async fn health(&self) -> Result<Health, TransportError> {
        let reply = self.health.lock().unwrap().clone();
        reply.into_result()
    }

    async fn runtime_status(&self) -> Result<Value, TransportError> {
        let scripted = {
            *self.status_calls.lock().unwrap() += 1;
            self.status.lock().unwrap().pop_front()
        };
        let (delay, reply) =
            scripted.unwrap_or((Duration::ZERO, Reply::Ok(self.default_status.clone())));
        tokio::time::sleep(delay).await;
        reply.into_result()
    }

    async fn list_proofs(&self) -> Result<Vec<JobDescriptor>, TransportError> {
        let reply = self.proofs.lock().unwrap().clone();
        reply.into_result()
    }

    async fn run_proof(&self, id: u32) -> Result<RunResponse, TransportError> {
        let scripted = {
            self.run_calls.lock().unwrap().push(id);
            self.runs.lock().unwrap().get(&id).cloned()
        };
        let (delay, reply) = scripted.unwrap_or((
            Duration::ZERO,
            Reply::Ok(RunResponse {
                output: Some(format!("proof {id} ok")),
                error: None,
            }),
        ));
        tokio::time::sleep(delay).await;
        reply.into_result()
    }

    async fn init_runtime(&self, cfg: &RuntimeConfig) -> Result<Value, TransportError> {
        let reply = {
            self.init_calls.lock().unwrap().push(cfg.clone());
            self.init.lock().unwrap().clone()
        };
        reply.into_result()
    }
}
