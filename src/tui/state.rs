use crate::dashboard::{DashEvent, Dashboard};
use crate::orchestrator::UiCommand;

pub const TAB_PROOFS: usize = 0;
pub const TAB_RUNTIME: usize = 1;
pub const TAB_HELP: usize = 2;
const TAB_COUNT: usize = 3;

/// Key intents after crossterm decoding.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum Action {
    NextTab,
    Help,
    Up,
    Down,
    Left,
    Right,
    Activate,
    RefreshStatus,
    ReloadProofs,
    ClearConsole,
    ScrollUp,
    ScrollDown,
}

pub struct TuiState {
    pub tab: usize,
    pub selected: usize,
    pub info: String,
    pub dashboard: Dashboard,
}

impl Default for TuiState {
    fn default() -> Self {
        Self {
            tab: TAB_PROOFS,
            selected: 0,
            info: "Loading…".into(),
            dashboard: Dashboard::default(),
        }
    }
}

impl TuiState {
    pub fn apply(&mut self, ev: DashEvent) {
        let proofs_loaded = matches!(ev, DashEvent::ProofsLoaded(_));
        self.dashboard.apply(ev);
        if proofs_loaded {
            let n = self.dashboard.registry.elements().len();
            self.selected = self.selected.min(n.saturating_sub(1));
            self.info = match self.dashboard.registry.error() {
                Some(_) => "Proof list unavailable (press l to retry)".into(),
                None => format!("{n} proof(s) loaded"),
            };
        }
    }

    /// Apply one key intent; returns the requests it should issue.
    pub fn handle(&mut self, action: Action) -> Vec<UiCommand> {
        match action {
            Action::NextTab => {
                self.tab = (self.tab + 1) % TAB_COUNT;
                vec![]
            }
            Action::Help => {
                self.tab = TAB_HELP;
                vec![]
            }
            Action::RefreshStatus => vec![UiCommand::CheckHealth, UiCommand::RefreshStatus],
            Action::ReloadProofs => {
                self.info = "Reloading proofs…".into();
                vec![UiCommand::LoadProofs]
            }
            Action::ClearConsole => {
                self.dashboard.console.clear();
                vec![]
            }
            Action::ScrollUp => {
                self.dashboard.console.scroll_up(5);
                vec![]
            }
            Action::ScrollDown => {
                self.dashboard.console.scroll_down(5);
                vec![]
            }
            Action::Up => {
                match self.tab {
                    TAB_PROOFS => self.selected = self.selected.saturating_sub(1),
                    TAB_RUNTIME => self.dashboard.form.focus_prev(),
                    _ => {}
                }
                vec![]
            }
            Action::Down => {
                match self.tab {
                    TAB_PROOFS => {
                        let n = self.dashboard.registry.elements().len();
                        if self.selected + 1 < n {
                            self.selected += 1;
                        }
                    }
                    TAB_RUNTIME => self.dashboard.form.focus_next(),
                    _ => {}
                }
                vec![]
            }
            Action::Left | Action::Right => {
                if self.tab == TAB_RUNTIME {
                    let step = if action == Action::Left { -1 } else { 1 };
                    self.dashboard.form.cycle(step);
                }
                vec![]
            }
            Action::Activate => match self.tab {
                TAB_PROOFS => self.run_selected(),
                TAB_RUNTIME => {
                    let cfg = self.dashboard.form.capture();
                    self.dashboard.init.in_flight = true;
                    self.info = "Reinitialising runtime…".into();
                    vec![UiCommand::ApplyInit(cfg)]
                }
                _ => vec![],
            },
        }
    }

    fn run_selected(&mut self) -> Vec<UiCommand> {
        let Some(handle) = self.dashboard.registry.trigger_at(self.selected) else {
            return vec![];
        };
        match self.dashboard.trigger(handle) {
            Ok(ticket) => {
                self.info = format!("Proof #{} started", ticket.id());
                vec![UiCommand::RunProof(ticket)]
            }
            Err(e) => {
                self.info = e.to_string();
                vec![]
            }
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::model::{JobDescriptor, JobVisualState, RunOutcome};

    fn loaded(ids: &[u32]) -> TuiState {
        let mut state = TuiState::default();
        state.apply(DashEvent::ProofsLoaded(Ok(ids
            .iter()
            .map(|&id| JobDescriptor {
                id,
                name: format!("Proof {id}"),
                file: format!("proof_of_work_{id}.py"),
            })
            .collect())));
        state
    }

    #[test]
    fn enter_runs_the_selected_proof_once() {
        let mut state = loaded(&[1, 2, 3]);
        state.handle(Action::Down);
        let cmds = state.handle(Action::Activate);
        assert!(matches!(cmds.as_slice(), [UiCommand::RunProof(t)] if t.id() == 2));
        assert_eq!(state.dashboard.visual_state(2), JobVisualState::Running);

        // Pressing enter again while it runs is refused.
        assert!(state.handle(Action::Activate).is_empty());
        assert!(state.info.contains("already running"));
    }

    #[test]
    fn selection_is_clamped_after_reload() {
        let mut state = loaded(&[1, 2, 3, 4]);
        for _ in 0..10 {
            state.handle(Action::Down);
        }
        assert_eq!(state.selected, 3);
        state.apply(DashEvent::ProofsLoaded(Ok(vec![JobDescriptor {
            id: 9,
            name: "Only".into(),
            file: "only.py".into(),
        }])));
        assert_eq!(state.selected, 0);
        assert_eq!(state.info, "1 proof(s) loaded");
    }

    #[test]
    fn runtime_tab_edits_form_and_applies() {
        let mut state = TuiState::default();
        state.handle(Action::NextTab);
        assert_eq!(state.tab, TAB_RUNTIME);
        state.handle(Action::Right);
        let cmds = state.handle(Action::Activate);
        match cmds.as_slice() {
            [UiCommand::ApplyInit(cfg)] => {
                assert_eq!(cfg.mode, "micropython");
                assert_eq!(cfg.target, None);
            }
            other => panic!("unexpected commands {other:?}"),
        }
        assert!(state.dashboard.init.in_flight);
    }

    #[test]
    fn clear_resets_console_after_runs() {
        let mut state = loaded(&[1]);
        let cmds = state.handle(Action::Activate);
        let Some(UiCommand::RunProof(ticket)) = cmds.into_iter().next() else {
            panic!("expected a run command");
        };
        state.apply(DashEvent::RunSettled {
            ticket,
            outcome: RunOutcome::Completed { output: "ok".into() },
        });
        state.handle(Action::ClearConsole);
        assert!(state.dashboard.console.is_placeholder());
    }
}
