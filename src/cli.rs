use crate::api::HttpBackend;
use crate::dashboard::HealthView;
use crate::logging::{self, LogTarget};
use crate::model::{ClientConfig, RunOutcome, RuntimeConfig};
use crate::orchestrator::{RunReport, Session};
use anyhow::{Context, Result};
use clap::Parser;
use serde_json::{json, Value};
use std::io::Write;
use std::sync::Arc;
use std::time::Duration;
use tokio::sync::mpsc;

/// Output line routing for stdout/stderr writer.
enum OutputLine {
    Stdout(String),
    Stderr(String),
}

/// Spawn a blocking writer for stdout/stderr to avoid blocking async tasks.
fn spawn_output_writer() -> (
    mpsc::UnboundedSender<OutputLine>,
    tokio::task::JoinHandle<()>,
) {
    let (tx, mut rx) = mpsc::unbounded_channel::<OutputLine>();
    let handle = tokio::task::spawn_blocking(move || {
        let stdout = std::io::stdout();
        let stderr = std::io::stderr();
        let mut out = std::io::LineWriter::new(stdout.lock());
        let mut err = std::io::LineWriter::new(stderr.lock());

        while let Some(line) = rx.blocking_recv() {
            match line {
                OutputLine::Stdout(msg) => {
                    let _ = writeln!(out, "{}", msg);
                }
                OutputLine::Stderr(msg) => {
                    let _ = writeln!(err, "{}", msg);
                }
            }
        }

        let _ = out.flush();
        let _ = err.flush();
    });
    (tx, handle)
}

#[derive(Debug, Parser, Clone)]
#[command(
    name = "polypi-dash",
    version,
    about = "Dashboard for the PolyPi runtime API: status, proof runs and console"
)]
pub struct Cli {
    /// Base URL of the backend service
    #[arg(long, default_value = "http://127.0.0.1:8000")]
    pub base_url: String,

    /// Print JSON and exit (no TUI)
    #[arg(long)]
    pub json: bool,

    /// Print a text summary and exit (no TUI)
    #[arg(long)]
    pub text: bool,

    /// Give up on a request after this long (e.g. 30s). Unset means wait indefinitely
    #[arg(long)]
    pub request_timeout: Option<humantime::Duration>,

    /// Run a proof by id; repeat to run several concurrently (implies --text unless --json)
    #[arg(long = "run", value_name = "ID")]
    pub run: Vec<u32>,

    /// Reinitialise the runtime with --mode/--ide/--target before running anything
    #[arg(long)]
    pub init: bool,

    /// Runtime mode sent with --init
    #[arg(long, default_value = "python")]
    pub mode: String,

    /// IDE flavour sent with --init
    #[arg(long, default_value = "pure")]
    pub ide: String,

    /// Board target sent with --init (empty for none)
    #[arg(long, default_value = "")]
    pub target: String,

    /// Log file for TUI mode (defaults to the user cache directory)
    #[arg(long)]
    pub log_file: Option<std::path::PathBuf>,
}

impl Cli {
    pub fn is_headless(&self) -> bool {
        self.json || self.text || self.init || !self.run.is_empty()
    }

    fn runtime_config(&self) -> RuntimeConfig {
        RuntimeConfig::from_selection(&self.mode, &self.ide, &self.target)
    }
}

/// Build a `ClientConfig` from CLI arguments.
pub fn build_config(args: &Cli) -> ClientConfig {
    ClientConfig {
        base_url: args.base_url.clone(),
        user_agent: format!("polypi-dash/{}", env!("CARGO_PKG_VERSION")),
        request_timeout: args.request_timeout.map(Duration::from),
    }
}

pub async fn run(args: Cli) -> Result<()> {
    if !args.is_headless() {
        #[cfg(feature = "tui")]
        {
            let log_path = args
                .log_file
                .clone()
                .unwrap_or_else(logging::default_log_path);
            logging::init(LogTarget::File(&log_path))?;
            return crate::tui::run(args).await;
        }
    }

    logging::init(LogTarget::Stderr)?;
    if args.json {
        return run_json(args).await;
    }
    run_text(args).await
}

/// Count runs that were requested but did not end in Done.
fn failed_runs(reports: &[RunReport]) -> usize {
    reports.iter().filter(|r| !r.is_done()).count()
}

async fn run_text(args: Cli) -> Result<()> {
    let backend = Arc::new(HttpBackend::new(&build_config(&args))?);
    let (out_tx, out_handle) = spawn_output_writer();
    let mut session = Session::start(backend);

    session.bootstrap().await?;
    let overview = crate::text_summary::build_overview(&session.dashboard);
    for line in overview.lines {
        let _ = out_tx.send(OutputLine::Stdout(line));
    }

    let mut init_failed = false;
    if args.init {
        let cfg = args.runtime_config();
        let _ = out_tx.send(OutputLine::Stderr(format!(
            "Reinitialising runtime: mode={} ide={} target={}",
            cfg.mode,
            cfg.ide,
            cfg.target.as_deref().unwrap_or("none")
        )));
        init_failed = !session.apply_init(cfg).await?;
        if let Some(text) = session.dashboard.init.text() {
            let _ = out_tx.send(OutputLine::Stdout("Init result:".to_string()));
            for line in text.lines() {
                let _ = out_tx.send(OutputLine::Stdout(format!("  {line}")));
            }
        }
        if !init_failed {
            let _ = out_tx.send(OutputLine::Stdout("Runtime status:".to_string()));
            for line in session.dashboard.status.text().lines() {
                let _ = out_tx.send(OutputLine::Stdout(format!("  {line}")));
            }
        }
    }

    let mut failures = 0;
    if !args.run.is_empty() {
        let reports = session.run_jobs(&args.run).await?;
        failures = failed_runs(&reports);
        let summary = crate::text_summary::build_run_summary(&session.dashboard, &reports);
        let _ = out_tx.send(OutputLine::Stdout("Console:".to_string()));
        for line in summary.lines {
            let _ = out_tx.send(OutputLine::Stdout(line));
        }
    }

    session.shutdown().await?;
    drop(out_tx);
    let _ = out_handle.await;

    if init_failed {
        anyhow::bail!("runtime initialisation request failed");
    }
    if failures > 0 {
        anyhow::bail!(
            "{failures} of {} requested run(s) did not complete",
            args.run.len()
        );
    }
    Ok(())
}

fn run_report_json(report: &RunReport) -> Value {
    match report {
        RunReport::Rejected { id, reason } => json!({
            "proof": id,
            "state": "rejected",
            "error": reason.to_string(),
        }),
        RunReport::Settled { id, outcome, state } => {
            let (output, error) = match outcome {
                RunOutcome::Completed { output } => (Some(output.clone()), None),
                RunOutcome::Failed { error, output } => (output.clone(), Some(error.clone())),
                RunOutcome::Transport { reason } => (None, Some(reason.clone())),
            };
            json!({
                "proof": id,
                "state": format!("{state:?}").to_lowercase(),
                "output": output,
                "error": error,
            })
        }
    }
}

async fn run_json(args: Cli) -> Result<()> {
    let backend = Arc::new(HttpBackend::new(&build_config(&args))?);
    let mut session = Session::start(backend);
    session.bootstrap().await?;

    let mut out = serde_json::Map::new();
    let dash = &session.dashboard;
    out.insert(
        "health".into(),
        match &dash.health {
            HealthView::Online(h) => serde_json::to_value(h)?,
            other => json!({ "status": other.label() }),
        },
    );
    out.insert(
        "runtime".into(),
        dash.status
            .value()
            .cloned()
            .unwrap_or_else(|| json!({ "error": dash.status.text() })),
    );
    let proofs: Vec<_> = dash
        .registry
        .elements()
        .iter()
        .map(|e| e.descriptor.clone())
        .collect();
    out.insert("proofs".into(), serde_json::to_value(proofs)?);
    if let Some(err) = dash.registry.error() {
        out.insert("proofs_error".into(), json!(err));
    }

    let mut init_failed = false;
    if args.init {
        init_failed = !session.apply_init(args.runtime_config()).await?;
        let init = &session.dashboard.init;
        out.insert(
            "init".into(),
            init.value()
                .cloned()
                .unwrap_or_else(|| json!({ "error": init.text() })),
        );
        if let Some(status) = session.dashboard.status.value() {
            out.insert("runtime".into(), status.clone());
        }
    }

    let mut failures = 0;
    if !args.run.is_empty() {
        let reports = session.run_jobs(&args.run).await?;
        failures = failed_runs(&reports);
        out.insert(
            "runs".into(),
            Value::Array(reports.iter().map(run_report_json).collect()),
        );
    }
    session.shutdown().await?;

    let text = serde_json::to_string_pretty(&Value::Object(out)).context("serialise output")?;
    println!("{text}");

    if init_failed {
        anyhow::bail!("runtime initialisation request failed");
    }
    if failures > 0 {
        anyhow::bail!(
            "{failures} of {} requested run(s) did not complete",
            args.run.len()
        );
    }
    Ok(())
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::dashboard::RunRejected;
    use crate::model::JobVisualState;

    #[test]
    fn run_flag_implies_headless() {
        let args = Cli::parse_from(["polypi-dash", "--run", "7", "--run", "2"]);
        assert!(args.is_headless());
        assert_eq!(args.run, vec![7, 2]);

        let args = Cli::parse_from(["polypi-dash"]);
        assert!(!args.is_headless());
    }

    #[test]
    fn config_carries_optional_timeout() {
        let args = Cli::parse_from(["polypi-dash", "--request-timeout", "30s"]);
        let cfg = build_config(&args);
        assert_eq!(cfg.request_timeout, Some(Duration::from_secs(30)));
        assert!(cfg.user_agent.starts_with("polypi-dash/"));

        let cfg = build_config(&Cli::parse_from(["polypi-dash"]));
        assert_eq!(cfg.request_timeout, None);
    }

    #[test]
    fn init_flags_normalise_empty_target() {
        let args = Cli::parse_from(["polypi-dash", "--init", "--mode", "micropython"]);
        let cfg = args.runtime_config();
        assert_eq!(cfg.mode, "micropython");
        assert_eq!(cfg.ide, "pure");
        assert_eq!(cfg.target, None);
    }

    #[test]
    fn run_reports_serialise_with_state() {
        let settled = run_report_json(&RunReport::Settled {
            id: 2,
            outcome: RunOutcome::Failed {
                error: "boom".into(),
                output: Some("partial".into()),
            },
            state: JobVisualState::Idle,
        });
        assert_eq!(
            settled,
            json!({"proof": 2, "state": "idle", "output": "partial", "error": "boom"})
        );

        let rejected = run_report_json(&RunReport::Rejected {
            id: 9,
            reason: RunRejected::Unknown { id: 9 },
        });
        assert_eq!(rejected["state"], "rejected");
    }
}
