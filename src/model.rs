use serde::{Deserialize, Serialize};
use std::time::Duration;

/// Runtime modes accepted by the backend's init endpoint.
pub const MODES: &[&str] = &["python", "micropython"];
/// IDE flavours accepted by the backend's init endpoint.
pub const IDES: &[&str] = &["pure", "thonny"];
/// Board targets. The empty entry means "no target" and is sent as `null`.
pub const TARGETS: &[&str] = &[
    "", "rp2040", "generic", "esp32", "esp8266", "stm32", "avr", "nrf52",
];

#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct ClientConfig {
    pub base_url: String,
    pub user_agent: String,
    #[serde(default, with = "humantime_serde")]
    pub request_timeout: Option<Duration>,
}

/// A proof job as listed by `GET /api/proofs`.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct JobDescriptor {
    pub id: u32,
    pub name: String,
    pub file: String,
}

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum JobVisualState {
    Idle,
    Running,
    Done,
}

#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct RunRequest {
    pub proof: u32,
}

/// Body of `POST /api/proofs/run`.
#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize, Deserialize)]
pub struct RunResponse {
    #[serde(default)]
    pub output: Option<String>,
    #[serde(default)]
    pub error: Option<String>,
}

impl RunResponse {
    /// `error` decides failure; any accompanying output is carried along.
    pub fn classify(self) -> RunOutcome {
        match self.error {
            Some(error) => RunOutcome::Failed {
                error,
                output: self.output,
            },
            None => RunOutcome::Completed {
                output: self.output.unwrap_or_default(),
            },
        }
    }
}

/// How a single run settled.
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum RunOutcome {
    Completed { output: String },
    Failed { error: String, output: Option<String> },
    Transport { reason: String },
}

impl RunOutcome {
    pub fn is_completed(&self) -> bool {
        matches!(self, RunOutcome::Completed { .. })
    }
}

/// Selections sent to `POST /api/runtime/init`. Not retained after the request.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct RuntimeConfig {
    pub mode: String,
    pub ide: String,
    pub target: Option<String>,
}

impl RuntimeConfig {
    pub fn from_selection(mode: &str, ide: &str, target: &str) -> Self {
        let target = target.trim();
        Self {
            mode: mode.to_string(),
            ide: ide.to_string(),
            target: if target.is_empty() {
                None
            } else {
                Some(target.to_string())
            },
        }
    }
}

#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct Health {
    pub status: String,
    #[serde(default)]
    pub service: Option<String>,
}
