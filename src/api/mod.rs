//! Client side of the runtime API.
//!
//! `Backend` is the seam the controller talks through; `HttpBackend` is the
//! reqwest implementation used by the binary. Tests substitute an in-memory
//! backend.

mod error;
#[cfg(test)]
pub(crate) mod mock;

pub use error::TransportError;

use crate::model::{ClientConfig, Health, JobDescriptor, RunRequest, RunResponse, RuntimeConfig};
use anyhow::{Context, Result};
use reqwest::{Client, ClientBuilder, Response, Url};
use serde::de::DeserializeOwned;
use serde::Deserialize;
use serde_json::Value;
use std::future::Future;

pub trait Backend: Send + Sync + 'static {
    /// `GET /api/health`
    fn health(&self) -> impl Future<Output = Result<Health, TransportError>> + Send;

    /// `GET /api/runtime`. The status object is opaque to the dashboard.
    fn runtime_status(&self) -> impl Future<Output = Result<Value, TransportError>> + Send;

    /// `GET /api/proofs`
    fn list_proofs(
        &self,
    ) -> impl Future<Output = Result<Vec<JobDescriptor>, TransportError>> + Send;

    /// `POST /api/proofs/run` with `{"proof": id}`.
    fn run_proof(&self, id: u32)
        -> impl Future<Output = Result<RunResponse, TransportError>> + Send;

    /// `POST /api/runtime/init`. The raw response is returned whatever its status.
    fn init_runtime(
        &self,
        cfg: &RuntimeConfig,
    ) -> impl Future<Output = Result<Value, TransportError>> + Send;
}

/// Endpoint URLs, resolved once against the base URL.
#[derive(Debug, Clone)]
struct Endpoints {
    health: Url,
    runtime: Url,
    proofs: Url,
    run: Url,
    init: Url,
}

impl Endpoints {
    fn resolve(base: &Url) -> Result<Self> {
        let join = |path: &str| {
            base.join(path)
                .with_context(|| format!("resolve {path} against {base}"))
        };
        Ok(Self {
            health: join("api/health")?,
            runtime: join("api/runtime")?,
            proofs: join("api/proofs")?,
            run: join("api/proofs/run")?,
            init: join("api/runtime/init")?,
        })
    }
}

#[derive(Debug, Clone)]
pub struct HttpBackend {
    http: Client,
    base: Url,
    endpoints: Endpoints,
}

impl HttpBackend {
    pub fn new(cfg: &ClientConfig) -> Result<Self> {
        let mut base = cfg.base_url.trim().to_string();
        if !base.ends_with('/') {
            base.push('/');
        }
        let base = Url::parse(&base).with_context(|| format!("invalid base URL {base:?}"))?;
        if base.cannot_be_a_base() {
            anyhow::bail!("base URL {base} cannot have endpoint paths");
        }
        let endpoints = Endpoints::resolve(&base)?;

        let mut builder = ClientBuilder::new().user_agent(cfg.user_agent.clone());
        if let Some(timeout) = cfg.request_timeout {
            builder = builder.timeout(timeout);
        }
        let http = builder.build().context("build HTTP client")?;

        Ok(Self {
            http,
            base,
            endpoints,
        })
    }

    pub fn base_url(&self) -> &Url {
        &self.base
    }
}

/// Read the body and decode it as JSON, ignoring the HTTP status.
async fn decode_body<T: DeserializeOwned>(resp: Response) -> Result<(u16, T), TransportError> {
    let status = resp.status().as_u16();
    let body = resp.bytes().await?;
    let value = serde_json::from_slice(&body)
        .map_err(|source| TransportError::Decode { status, source })?;
    Ok((status, value))
}

/// Like `decode_body`, but a non-success status is a transport failure.
async fn decode_success<T: DeserializeOwned>(resp: Response) -> Result<T, TransportError> {
    let status = resp.status();
    if !status.is_success() {
        let body = resp.text().await?;
        return Err(TransportError::status(status.as_u16(), &body));
    }
    decode_body(resp).await.map(|(_, v)| v)
}

/// Run responses as the backend actually sends them. FastAPI's own errors
/// (404 for an unknown proof) carry `detail` instead of `error`.
#[derive(Debug, Deserialize)]
struct WireRunResponse {
    #[serde(default)]
    output: Option<String>,
    #[serde(default)]
    error: Option<String>,
    #[serde(default)]
    detail: Option<Value>,
}

impl WireRunResponse {
    fn into_response(self, status: u16) -> RunResponse {
        let failed = !(200..300).contains(&status);
        let error = match (self.error, failed) {
            (Some(e), _) => Some(e),
            (None, true) => Some(match self.detail {
                Some(Value::String(s)) => s,
                Some(other) => other.to_string(),
                None => format!("HTTP {status}"),
            }),
            (None, false) => None,
        };
        RunResponse {
            output: self.output,
            error,
        }
    }
}

impl Backend for HttpBackend {
    async fn health(&self) -> Result<Health, TransportError> {
        let resp = self.http.get(self.endpoints.health.clone()).send().await?;
        decode_success(resp).await
    }

    async fn runtime_status(&self) -> Result<Value, TransportError> {
        let resp = self.http.get(self.endpoints.runtime.clone()).send().await?;
        decode_body(resp).await.map(|(_, v)| v)
    }

    async fn list_proofs(&self) -> Result<Vec<JobDescriptor>, TransportError> {
        let resp = self.http.get(self.endpoints.proofs.clone()).send().await?;
        decode_success(resp).await
    }

    async fn run_proof(&self, id: u32) -> Result<RunResponse, TransportError> {
        let resp = self
            .http
            .post(self.endpoints.run.clone())
            .json(&RunRequest { proof: id })
            .send()
            .await?;
        let (status, wire) = decode_body::<WireRunResponse>(resp).await?;
        Ok(wire.into_response(status))
    }

    async fn init_runtime(&self, cfg: &RuntimeConfig) -> Result<Value, TransportError> {
        let resp = self
            .http
            .post(self.endpoints.init.clone())
            .json(cfg)
            .send()
            .await?;
        decode_body(resp).await.map(|(_, v)| v)
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    fn wire(json: &str) -> WireRunResponse {
        serde_json::from_str(json).unwrap()
    }

    #[test]
    fn server_error_with_error_field_keeps_output() {
        let resp = wire(r#"{"proof": 3, "error": "boom", "output": "partial"}"#).into_response(500);
        assert_eq!(resp.error.as_deref(), Some("boom"));
        assert_eq!(resp.output.as_deref(), Some("partial"));
    }

    #[test]
    fn not_found_detail_becomes_error() {
        let resp = wire(r#"{"detail": "Proof #9 not found."}"#).into_response(404);
        assert_eq!(resp.error.as_deref(), Some("Proof #9 not found."));
        assert_eq!(resp.output, None);
    }

    #[test]
    fn success_without_error_is_not_failed() {
        let resp = wire(r#"{"proof": 1, "output": "hi\n"}"#).into_response(200);
        assert_eq!(resp.error, None);
        assert_eq!(resp.output.as_deref(), Some("hi\n"));
    }

    #[test]
    fn bare_failure_status_is_reported() {
        let resp = wire("{}").into_response(503);
        assert_eq!(resp.error.as_deref(), Some("HTTP 503"));
    }

    fn config(base_url: &str) -> ClientConfig {
        ClientConfig {
            base_url: base_url.into(),
            user_agent: "test".into(),
            request_timeout: None,
        }
    }

    #[test]
    fn endpoints_resolve_under_the_base_path() {
        let backend = HttpBackend::new(&config("http://localhost:8000/prefix")).unwrap();
        let endpoints = &backend.endpoints;
        assert_eq!(endpoints.health.as_str(), "http://localhost:8000/prefix/api/health");
        assert_eq!(endpoints.proofs.as_str(), "http://localhost:8000/prefix/api/proofs");
        assert_eq!(
            endpoints.run.as_str(),
            "http://localhost:8000/prefix/api/proofs/run"
        );
        assert_eq!(
            endpoints.init.as_str(),
            "http://localhost:8000/prefix/api/runtime/init"
        );
    }

    #[test]
    fn unusable_base_urls_are_rejected_up_front() {
        assert!(HttpBackend::new(&config("not a url")).is_err());
        assert!(HttpBackend::new(&config("mailto:ops@example.com")).is_err());
    }
}
