use ratatui::{
    layout::Rect,
    style::Color,
    style::Style,
    text::{Line, Span},
    widgets::{Block, Borders, Paragraph},
    Frame,
};

fn bind(key: &'static str, pad: usize, desc: &'static str) -> Line<'static> {
    Line::from(vec![
        Span::raw("  "),
        Span::styled(key, Style::default().fg(Color::Magenta)),
        Span::raw(" ".repeat(pad)),
        Span::raw(desc),
    ])
}

pub fn draw_help(area: Rect, f: &mut Frame, log_path: Option<&str>) {
    let mut lines = vec![
        Line::from("Login:"),
        bind("tab", 9, "Switch between name and email"),
        bind("enter", 7, "Register and open the session"),
        bind("esc", 9, "Quit"),
        Line::from(""),
        Line::from("Workspace:"),
        Line::from(vec![
            Span::raw("  "),
            Span::styled("q", Style::default().fg(Color::Magenta)),
            Span::raw(" / "),
            Span::styled("Ctrl-C", Style::default().fg(Color::Magenta)),
            Span::raw("  Quit"),
        ]),
        bind("a", 11, "Run audit on the current code"),
        bind("o", 11, "Optimize (after a clean audit)"),
        bind("y", 11, "Copy optimized code"),
        bind("s", 11, "Share report"),
        bind("r", 11, "Reload code from file"),
        bind("↑/↓", 9, "Scroll code"),
        bind("tab", 9, "Switch tabs"),
        bind("?", 11, "Show this help"),
        Line::from(""),
        Line::from(Span::styled(
            "Requests are disabled while one is running and during a quota cooldown.",
            Style::default().fg(Color::Gray),
        )),
    ];
    if let Some(path) = log_path {
        lines.push(Line::from(Span::styled(
            format!("Log file: {path}"),
            Style::default().fg(Color::Gray),
        )));
    }
    let p = Paragraph::new(lines).block(Block::default().borders(Borders::ALL).title("Help"));
    f.render_widget(p, area);
}
