//! Text summary builder for headless output.
//!
//! Formats the dashboard's regions as plain lines for text mode.

use crate::dashboard::{Dashboard, JobElement, RunRejected};
use crate::model::JobVisualState;
use crate::orchestrator::RunReport;

/// Pre-formatted lines for text output.
pub(crate) struct TextSummary {
    pub lines: Vec<String>,
}

fn state_tag(state: JobVisualState) -> &'static str {
    match state {
        JobVisualState::Idle => "",
        JobVisualState::Running => " [running]",
        JobVisualState::Done => " [done]",
    }
}

fn job_line(dash: &Dashboard, element: &JobElement) -> String {
    let d = &element.descriptor;
    format!(
        "  #{:<3} {:<20} {}{}",
        d.id,
        d.name,
        d.file,
        state_tag(dash.visual_state(d.id))
    )
}

/// Status, health and job list, as shown right after bootstrap.
pub(crate) fn build_overview(dash: &Dashboard) -> TextSummary {
    let mut lines = vec![format!("Backend: {}", dash.health.label())];

    lines.push("Runtime status:".to_string());
    lines.extend(dash.status.text().lines().map(|l| format!("  {l}")));

    match dash.registry.error() {
        Some(err) => lines.push(err.to_string()),
        None => {
            lines.push(format!("Proofs ({}):", dash.registry.elements().len()));
            for element in dash.registry.elements() {
                lines.push(job_line(dash, element));
            }
        }
    }

    TextSummary { lines }
}

/// Console contents followed by one line per requested run.
pub(crate) fn build_run_summary(dash: &Dashboard, reports: &[RunReport]) -> TextSummary {
    let mut lines: Vec<String> = dash.console.lines().map(str::to_string).collect();
    for report in reports {
        match report {
            RunReport::Rejected { id, reason } => {
                let why = match reason {
                    RunRejected::Unknown { .. } => "not in the job list",
                    RunRejected::AlreadyRunning { .. } => "already running",
                    RunRejected::Stale { .. } => "job list was reloaded",
                };
                lines.push(format!("Proof #{id}: skipped ({why})"));
            }
            RunReport::Settled { id, state, .. } => {
                let verdict = if *state == JobVisualState::Done {
                    "done"
                } else {
                    "failed"
                };
                lines.push(format!("Proof #{id}: {verdict}"));
            }
        }
    }
    TextSummary { lines }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::dashboard::DashEvent;
    use crate::model::{JobDescriptor, RunOutcome};

    #[test]
    fn overview_lists_jobs_with_state() {
        let mut dash = Dashboard::default();
        dash.apply(DashEvent::ProofsLoaded(Ok(vec![JobDescriptor {
            id: 1,
            name: "Hello World".into(),
            file: "proof_of_work_1_hello.py".into(),
        }])));
        let handle = dash.registry.trigger_for(1).unwrap();
        let ticket = dash.trigger(handle).unwrap();
        dash.apply(DashEvent::RunSettled {
            ticket,
            outcome: RunOutcome::Completed { output: "hi".into() },
        });

        let summary = build_overview(&dash);
        assert!(summary.lines.iter().any(|l| l == "Proofs (1):"));
        assert!(summary
            .lines
            .iter()
            .any(|l| l.contains("Hello World") && l.ends_with("[done]")));
    }

    #[test]
    fn run_summary_reports_each_run() {
        let dash = Dashboard::default();
        let reports = vec![
            RunReport::Rejected {
                id: 9,
                reason: RunRejected::Unknown { id: 9 },
            },
            RunReport::Settled {
                id: 1,
                outcome: RunOutcome::Transport {
                    reason: "refused".into(),
                },
                state: JobVisualState::Idle,
            },
        ];
        let summary = build_run_summary(&dash, &reports);
        assert!(summary.lines.contains(&"Proof #9: skipped (not in the job list)".to_string()));
        assert!(summary.lines.contains(&"Proof #1: failed".to_string()));
    }
}
