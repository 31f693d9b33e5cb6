mod export;
mod help;
mod state;

use crate::api::HttpBackend;
use crate::cli::{build_config, Cli};
use crate::dashboard::{DashEvent, FormField, RUN_LABEL};
use crate::model::JobVisualState;
use crate::orchestrator::{self, UiCommand};
use anyhow::{Context, Result};
use crossterm::{
    event::{self, Event, KeyCode, KeyEventKind, KeyModifiers},
    execute,
    terminal::{disable_raw_mode, enable_raw_mode, EnterAlternateScreen, LeaveAlternateScreen},
};
use ratatui::{
    backend::CrosstermBackend,
    layout::{Constraint, Direction, Layout, Rect},
    style::{Color, Modifier, Style},
    text::{Line, Span},
    widgets::{Block, Borders, List, ListItem, ListState, Paragraph, Tabs, Wrap},
    Terminal,
};
use state::{Action, TuiState, TAB_HELP, TAB_PROOFS, TAB_RUNTIME};
use std::sync::Arc;
use std::{io, time::Duration, time::Instant};
use tokio::sync::mpsc;
use tokio::sync::mpsc::{UnboundedReceiver, UnboundedSender};

pub async fn run(args: Cli) -> Result<()> {
    // Unbounded channels avoid backpressure between the UI thread and the runtime.
    let (event_tx, event_rx) = mpsc::unbounded_channel::<DashEvent>();
    let (cmd_tx, cmd_rx) = mpsc::unbounded_channel::<UiCommand>();

    let backend = Arc::new(HttpBackend::new(&build_config(&args))?);
    let base_url = backend.base_url().to_string();
    orchestrator::bootstrap(&cmd_tx);

    // TUI runs in a dedicated thread to keep all blocking I/O out of the Tokio runtime.
    let ui_handle = std::thread::spawn(move || run_threaded(base_url, event_rx, cmd_tx));

    let res = orchestrator::run_controller(backend, event_tx, cmd_rx).await;

    let join_res = tokio::task::spawn_blocking(move || ui_handle.join()).await;
    if let Ok(joined) = join_res {
        match joined {
            Ok(Ok(())) => {}
            Ok(Err(e)) => return Err(e),
            Err(_) => return Err(anyhow::anyhow!("TUI thread panicked")),
        }
    }

    res
}

fn key_action(modifiers: KeyModifiers, code: KeyCode) -> Option<Action> {
    let action = match (modifiers, code) {
        (_, KeyCode::Tab) => Action::NextTab,
        (_, KeyCode::Char('?')) => Action::Help,
        (_, KeyCode::Up) | (_, KeyCode::Char('k')) => Action::Up,
        (_, KeyCode::Down) | (_, KeyCode::Char('j')) => Action::Down,
        (_, KeyCode::Left) => Action::Left,
        (_, KeyCode::Right) => Action::Right,
        (_, KeyCode::Enter) | (_, KeyCode::Char(' ')) => Action::Activate,
        (_, KeyCode::Char('r')) => Action::RefreshStatus,
        (_, KeyCode::Char('l')) => Action::ReloadProofs,
        (_, KeyCode::Char('c')) => Action::ClearConsole,
        (_, KeyCode::PageUp) => Action::ScrollUp,
        (_, KeyCode::PageDown) => Action::ScrollDown,
        _ => return None,
    };
    Some(action)
}

/// Run the TUI loop on a dedicated thread.
fn run_threaded(
    base_url: String,
    mut event_rx: UnboundedReceiver<DashEvent>,
    cmd_tx: UnboundedSender<UiCommand>,
) -> Result<()> {
    enable_raw_mode().context("enable raw mode")?;
    let mut stdout = io::stdout();
    execute!(stdout, EnterAlternateScreen).ok();

    let backend = CrosstermBackend::new(stdout);
    let mut terminal = Terminal::new(backend).context("create terminal")?;
    terminal.clear().ok();

    // TuiState is owned by the UI thread only; no cross-thread mutation.
    let mut state = TuiState::default();
    let tick_rate = Duration::from_millis(100);
    let mut last_tick = Instant::now();

    let res = loop {
        while let Ok(ev) = event_rx.try_recv() {
            state.apply(ev);
        }

        if last_tick.elapsed() >= tick_rate {
            terminal.draw(|f| draw(f.area(), f, &state, &base_url)).ok();
            last_tick = Instant::now();
        }

        // Poll input with a short timeout to avoid blocking the render loop.
        if event::poll(Duration::from_millis(10)).unwrap_or(false) {
            if let Ok(Event::Key(k)) = event::read() {
                if k.kind != KeyEventKind::Press {
                    continue;
                }
                match (k.modifiers, k.code) {
                    (_, KeyCode::Char('q')) | (KeyModifiers::CONTROL, KeyCode::Char('c')) => {
                        let _ = cmd_tx.send(UiCommand::Quit);
                        break Ok(());
                    }
                    (_, KeyCode::Char('s')) => {
                        match export::save_transcript(state.dashboard.console.text()) {
                            Ok(p) => state.info = format!("Saved console: {}", p.display()),
                            Err(e) => state.info = format!("Save failed: {e:#}"),
                        }
                    }
                    (_, KeyCode::Char('y')) => {
                        match export::copy_to_clipboard(state.dashboard.console.text()) {
                            Ok(_) => state.info = "✓ Console copied to clipboard".into(),
                            Err(e) => state.info = format!("Clipboard copy failed: {e:#}"),
                        }
                    }
                    (modifiers, code) => {
                        if let Some(action) = key_action(modifiers, code) {
                            for cmd in state.handle(action) {
                                let _ = cmd_tx.send(cmd);
                            }
                        }
                    }
                }
            }
        }
    };

    disable_raw_mode().ok();
    let mut stdout = io::stdout();
    execute!(stdout, LeaveAlternateScreen).ok();
    res
}

fn draw(area: Rect, f: &mut ratatui::Frame, state: &TuiState, base_url: &str) {
    let chunks = Layout::default()
        .direction(Direction::Vertical)
        .constraints(
            [
                Constraint::Length(3),
                Constraint::Min(0),
                Constraint::Length(3),
            ]
            .as_ref(),
        )
        .split(area);

    let title = format!(
        "polypi-dash · {base_url} · backend: {}",
        state.dashboard.health.label()
    );
    let tabs = Tabs::new(vec![
        Line::from("Proofs"),
        Line::from("Runtime"),
        Line::from("Help"),
    ])
    .select(state.tab)
    .block(Block::default().borders(Borders::ALL).title(title))
    .highlight_style(Style::default().fg(Color::Yellow));
    f.render_widget(tabs, chunks[0]);

    match state.tab {
        TAB_PROOFS => draw_proofs_tab(chunks[1], f, state),
        TAB_RUNTIME => draw_runtime_tab(chunks[1], f, state),
        TAB_HELP => help::draw_help(chunks[1], f),
        _ => {}
    }

    let in_flight = state.dashboard.jobs.in_flight();
    let footer = Paragraph::new(Line::from(vec![
        Span::styled(state.info.clone(), Style::default().fg(Color::Gray)),
        Span::raw("  "),
        Span::styled(
            if in_flight > 0 {
                format!("{in_flight} running  ")
            } else {
                String::new()
            },
            Style::default().fg(Color::Yellow),
        ),
        Span::styled("? help  q quit", Style::default().fg(Color::DarkGray)),
    ]))
    .block(Block::default().borders(Borders::ALL));
    f.render_widget(footer, chunks[2]);
}

fn draw_proofs_tab(area: Rect, f: &mut ratatui::Frame, state: &TuiState) {
    let cols = Layout::default()
        .direction(Direction::Horizontal)
        .constraints([Constraint::Percentage(45), Constraint::Percentage(55)].as_ref())
        .split(area);
    let left = Layout::default()
        .direction(Direction::Vertical)
        .constraints([Constraint::Percentage(50), Constraint::Percentage(50)].as_ref())
        .split(cols[0]);

    draw_proof_list(left[0], f, state);
    draw_status(left[1], f, state);
    draw_console(cols[1], f, state);
}

fn draw_proof_list(area: Rect, f: &mut ratatui::Frame, state: &TuiState) {
    let dash = &state.dashboard;
    let block = Block::default().borders(Borders::ALL).title("Proofs");

    if let Some(err) = dash.registry.error() {
        let p = Paragraph::new(err.to_string())
            .style(Style::default().fg(Color::Red))
            .wrap(Wrap { trim: false })
            .block(block);
        f.render_widget(p, area);
        return;
    }
    if dash.registry.is_loading() {
        f.render_widget(Paragraph::new("Loading proofs…").block(block), area);
        return;
    }

    let items: Vec<ListItem> = dash
        .registry
        .elements()
        .iter()
        .map(|element| {
            let d = &element.descriptor;
            let (marker, color) = match dash.visual_state(d.id) {
                JobVisualState::Idle => (" ", Color::White),
                JobVisualState::Running => ("…", Color::Yellow),
                JobVisualState::Done => ("✓", Color::Green),
            };
            let (label, enabled) = dash
                .jobs
                .record(d.id)
                .map(|r| (r.label, r.enabled))
                .unwrap_or((RUN_LABEL, true));
            let label_style = if enabled {
                Style::default().fg(Color::Magenta)
            } else {
                Style::default().fg(Color::DarkGray)
            };
            ListItem::new(Line::from(vec![
                Span::styled(format!("{marker} "), Style::default().fg(color)),
                Span::styled(format!("#{:<3}", d.id), Style::default().fg(Color::Gray)),
                Span::styled(format!("{:<16}", d.name), Style::default().fg(color)),
                Span::styled(format!("[{label}] "), label_style),
                Span::styled(d.file.clone(), Style::default().fg(Color::DarkGray)),
            ]))
        })
        .collect();

    let list = List::new(items)
        .block(block)
        .highlight_style(Style::default().add_modifier(Modifier::REVERSED));
    let mut list_state = ListState::default().with_selected(Some(state.selected));
    f.render_stateful_widget(list, area, &mut list_state);
}

fn draw_status(area: Rect, f: &mut ratatui::Frame, state: &TuiState) {
    let p = Paragraph::new(state.dashboard.status.text().to_string())
        .block(
            Block::default()
                .borders(Borders::ALL)
                .title("Runtime status (r to refresh)"),
        )
        .wrap(Wrap { trim: false });
    f.render_widget(p, area);
}

fn draw_console(area: Rect, f: &mut ratatui::Frame, state: &TuiState) {
    let console = &state.dashboard.console;
    let visible = area.height.saturating_sub(2) as usize;
    let total = console.line_count();
    let top = total.saturating_sub(visible + console.scroll_offset());

    let lines: Vec<Line> = console
        .lines()
        .map(|l| {
            let style = if l.starts_with('✗') {
                Style::default().fg(Color::Red)
            } else if l.starts_with('✓') {
                Style::default().fg(Color::Green)
            } else if l.starts_with('▶') {
                Style::default().fg(Color::Cyan)
            } else if console.is_placeholder() {
                Style::default().fg(Color::DarkGray)
            } else {
                Style::default()
            };
            Line::from(Span::styled(l.to_string(), style))
        })
        .collect();

    let title = if console.scroll_offset() > 0 {
        format!("Console (↑{})", console.scroll_offset())
    } else {
        "Console".to_string()
    };
    let p = Paragraph::new(lines)
        .block(Block::default().borders(Borders::ALL).title(title))
        .scroll((top.min(u16::MAX as usize) as u16, 0));
    f.render_widget(p, area);
}

fn draw_runtime_tab(area: Rect, f: &mut ratatui::Frame, state: &TuiState) {
    let cols = Layout::default()
        .direction(Direction::Horizontal)
        .constraints([Constraint::Percentage(40), Constraint::Percentage(60)].as_ref())
        .split(area);
    let left = Layout::default()
        .direction(Direction::Vertical)
        .constraints([Constraint::Length(7), Constraint::Min(0)].as_ref())
        .split(cols[0]);

    let form = &state.dashboard.form;
    let mut lines = Vec::new();
    for field in FormField::ALL {
        let focused = form.focused() == field;
        let value = match form.value(field) {
            "" => "(none)",
            v => v,
        };
        let value_style = if focused {
            Style::default().fg(Color::Yellow).add_modifier(Modifier::BOLD)
        } else {
            Style::default()
        };
        lines.push(Line::from(vec![
            Span::raw(if focused { "› " } else { "  " }),
            Span::styled(format!("{:<7}", field.label()), Style::default().fg(Color::Gray)),
            Span::styled(format!("◂ {value} ▸"), value_style),
        ]));
    }
    lines.push(Line::from(""));
    lines.push(Line::from(Span::styled(
        if state.dashboard.init.in_flight {
            "Reinitialising…"
        } else {
            "enter to apply"
        },
        Style::default().fg(Color::DarkGray),
    )));
    f.render_widget(
        Paragraph::new(lines).block(Block::default().borders(Borders::ALL).title("Reinitialise")),
        left[0],
    );

    draw_status(left[1], f, state);

    let result = state
        .dashboard
        .init
        .text()
        .unwrap_or("No reinitialisation yet.")
        .to_string();
    f.render_widget(
        Paragraph::new(result)
            .block(Block::default().borders(Borders::ALL).title("Init result"))
            .wrap(Wrap { trim: false }),
        cols[1],
    );
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn keys_map_to_actions() {
        assert_eq!(
            key_action(KeyModifiers::NONE, KeyCode::Enter),
            Some(Action::Activate)
        );
        assert_eq!(
            key_action(KeyModifiers::NONE, KeyCode::Char('j')),
            Some(Action::Down)
        );
        assert_eq!(
            key_action(KeyModifiers::NONE, KeyCode::Char('l')),
            Some(Action::ReloadProofs)
        );
        assert_eq!(
            key_action(KeyModifiers::NONE, KeyCode::Left),
            Some(Action::Left)
        );
        // Only the arrow keys change a form value; `l` is taken by reload.
        assert_eq!(key_action(KeyModifiers::NONE, KeyCode::Char('h')), None);
        assert_eq!(key_action(KeyModifiers::NONE, KeyCode::Char('z')), None);
    }
}
