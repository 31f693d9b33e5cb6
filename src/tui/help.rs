use ratatui::{
    layout::Rect,
    style::Color,
    style::Style,
    text::{Line, Span},
    widgets::{Block, Borders, Paragraph},
    Frame,
};

fn key_line(key: &'static str, pad: usize, what: &'static str) -> Line<'static> {
    Line::from(vec![
        Span::raw("  "),
        Span::styled(key, Style::default().fg(Color::Magenta)),
        Span::raw(" ".repeat(pad)),
        Span::raw(what),
    ])
}

pub fn draw_help(area: Rect, f: &mut Frame) {
    let p = Paragraph::new(vec![
        Line::from("Keybinds:"),
        Line::from(vec![
            Span::raw("  "),
            Span::styled("q", Style::default().fg(Color::Magenta)),
            Span::raw(" / "),
            Span::styled("Ctrl-C", Style::default().fg(Color::Magenta)),
            Span::raw("  Quit"),
        ]),
        key_line("tab", 9, "Switch tabs"),
        key_line("r", 11, "Refresh runtime status"),
        key_line("l", 11, "Reload proof list"),
        key_line("c", 11, "Clear console"),
        key_line("s", 11, "Save console transcript"),
        key_line("y", 11, "Copy console to clipboard"),
        key_line("PgUp/PgDn", 3, "Scroll console"),
        key_line("?", 11, "Show this help"),
        Line::from(""),
        Line::from("Proofs tab:"),
        Line::from(vec![
            Span::raw("  "),
            Span::styled("↑/↓", Style::default().fg(Color::Magenta)),
            Span::raw(" or "),
            Span::styled("j/k", Style::default().fg(Color::Magenta)),
            Span::raw("  Select proof"),
        ]),
        key_line("enter", 7, "Run selected proof"),
        Line::from(""),
        Line::from("Runtime tab:"),
        key_line("↑/↓", 9, "Select field"),
        key_line("←/→", 9, "Change value"),
        key_line("enter", 7, "Apply and reinitialise runtime"),
        Line::from(""),
        Line::from("Logs:"),
        Line::from(vec![
            Span::raw("  "),
            Span::styled(
                "--log-file, POLYPI_LOG=debug",
                Style::default().fg(Color::Cyan),
            ),
        ]),
    ])
    .block(Block::default().borders(Borders::ALL).title("Help"));
    f.render_widget(p, area);
}
