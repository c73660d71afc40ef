mod help;
mod state;

use crate::config::Settings;
use crate::editor::CodeBuffer;
use crate::feedback::{CommandShare, SystemClipboard};
use crate::gateway::HttpGateway;
use crate::model::{
    AuditReport, RequestKind, ReportStatus, SessionState, WorkflowEvent,
};
use crate::workflow::{self, Collaborators, UiCommand};
use anyhow::{Context, Result};
use crossterm::{
    event::{self, Event, KeyCode, KeyEvent, KeyEventKind, KeyModifiers},
    execute,
    terminal::{disable_raw_mode, enable_raw_mode, EnterAlternateScreen, LeaveAlternateScreen},
};
use ratatui::{
    backend::CrosstermBackend,
    layout::{Constraint, Direction, Layout, Rect},
    style::{Color, Modifier, Style},
    text::{Line, Span},
    widgets::{Block, Borders, Paragraph, Tabs, Wrap},
    Terminal,
};
use state::{apply_event, key_hint, push_wrapped_status_kv, LoginField, UiState};
use std::sync::Arc;
use std::{io, time::Duration, time::Instant};
use tokio::sync::mpsc::{self, error::TryRecvError, UnboundedReceiver, UnboundedSender};

pub async fn run(settings: Settings, editor: CodeBuffer) -> Result<()> {
    // Unbounded channels avoid backpressure between the UI thread and the controller.
    let (event_tx, event_rx) = mpsc::unbounded_channel::<WorkflowEvent>();
    let (cmd_tx, cmd_rx) = mpsc::unbounded_channel::<UiCommand>();

    let gateway = HttpGateway::new(&settings)?;
    let page_ref = gateway.base_url().to_string();
    let deps = Collaborators {
        service: Arc::new(gateway),
        clipboard: Arc::new(SystemClipboard::new()),
        share: Arc::new(CommandShare::new(settings.share_command.clone())),
    };
    tracing::info!(base_url = %page_ref, "starting interactive session");

    // TUI runs in a dedicated thread to keep all blocking I/O out of the Tokio runtime.
    let ui_handle = std::thread::spawn(move || run_threaded(editor, event_rx, cmd_tx));

    let res = workflow::run_controller(deps, page_ref, event_tx, cmd_rx).await;

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

/// Run the TUI loop on a dedicated thread.
fn run_threaded(
    editor: CodeBuffer,
    mut event_rx: UnboundedReceiver<WorkflowEvent>,
    cmd_tx: UnboundedSender<UiCommand>,
) -> Result<()> {
    enable_raw_mode().context("enable raw mode")?;
    let mut stdout = io::stdout();
    execute!(stdout, EnterAlternateScreen).ok();

    let backend = CrosstermBackend::new(stdout);
    let mut terminal = Terminal::new(backend).context("create terminal")?;
    terminal.clear().ok();

    // UiState is owned by the UI thread only; the controller sees commands.
    let mut state = UiState::new(editor);
    if state.editor.path().is_none() {
        state.set_info("No --file given; audits will send the placeholder buffer.");
    }
    let log_path = crate::logging::log_file_path().map(|p| p.display().to_string());

    let tick_rate = Duration::from_millis(100);
    let mut last_tick = Instant::now();

    let res = loop {
        // Drain events without blocking to keep UI responsive.
        let mut controller_gone = false;
        loop {
            match event_rx.try_recv() {
                Ok(ev) => apply_event(&mut state, ev),
                Err(TryRecvError::Empty) => break,
                Err(TryRecvError::Disconnected) => {
                    controller_gone = true;
                    break;
                }
            }
        }
        if controller_gone {
            tracing::debug!("controller closed the event channel");
            break Ok(());
        }

        if last_tick.elapsed() >= tick_rate {
            terminal
                .draw(|f| draw(f.area(), f, &state, log_path.as_deref()))
                .ok();
            last_tick = Instant::now();
        }

        // Poll input with a short timeout to avoid blocking the render loop.
        if event::poll(Duration::from_millis(10)).unwrap_or(false) {
            if let Ok(Event::Key(k)) = event::read() {
                if k.kind != KeyEventKind::Press {
                    continue;
                }
                if handle_key(&mut state, &cmd_tx, k) {
                    let _ = cmd_tx.send(UiCommand::Quit);
                    break Ok(());
                }
            }
        }
    };

    disable_raw_mode().ok();
    let mut stdout = io::stdout();
    execute!(stdout, LeaveAlternateScreen).ok();
    res
}

/// Returns `true` when the user asked to quit.
fn handle_key(state: &mut UiState, cmd_tx: &UnboundedSender<UiCommand>, k: KeyEvent) -> bool {
    if k.modifiers == KeyModifiers::CONTROL && k.code == KeyCode::Char('c') {
        return true;
    }
    if state.snapshot.session != SessionState::LoggedIn {
        return handle_login_key(state, cmd_tx, k);
    }

    match k.code {
        KeyCode::Char('q') => return true,
        KeyCode::Tab => state.tab = (state.tab + 1) % 2,
        KeyCode::Char('?') => state.tab = 1,
        KeyCode::Char('a') => {
            if state.snapshot.accepts_requests() {
                let _ = cmd_tx.send(UiCommand::Audit(state.editor.text().to_string()));
            } else {
                state.set_info(blocked_reason(state));
            }
        }
        KeyCode::Char('o') => {
            if state.snapshot.can_optimize() {
                let _ = cmd_tx.send(UiCommand::Optimize(state.editor.text().to_string()));
            } else if state.snapshot.accepts_requests() {
                state.set_info("Optimize is available after a clean audit.");
            } else {
                state.set_info(blocked_reason(state));
            }
        }
        KeyCode::Char('y') => {
            if state.snapshot.optimization.is_some() {
                let _ = cmd_tx.send(UiCommand::CopyOptimized);
            } else {
                state.set_info("No optimized code to copy yet.");
            }
        }
        KeyCode::Char('s') => {
            if state.snapshot.report.is_some() {
                let _ = cmd_tx.send(UiCommand::ShareReport);
            } else {
                state.set_info("No report to share yet.");
            }
        }
        KeyCode::Char('r') => match state.editor.reload() {
            Ok(true) => {
                state.editor_scroll = 0;
                state.set_info("Code reloaded from disk");
            }
            Ok(false) => state.set_info("Code unchanged"),
            Err(e) => state.set_error(format!("Reload failed: {e:#}")),
        },
        KeyCode::Up | KeyCode::Char('k') => state.scroll_editor(-1),
        KeyCode::Down | KeyCode::Char('j') => state.scroll_editor(1),
        KeyCode::PageUp => state.scroll_editor(-20),
        KeyCode::PageDown => state.scroll_editor(20),
        _ => {}
    }
    false
}

fn handle_login_key(
    state: &mut UiState,
    cmd_tx: &UnboundedSender<UiCommand>,
    k: KeyEvent,
) -> bool {
    match k.code {
        KeyCode::Esc => return true,
        KeyCode::Tab | KeyCode::BackTab | KeyCode::Up | KeyCode::Down => {
            state.login.toggle_focus()
        }
        KeyCode::Backspace => state.login.backspace(),
        KeyCode::Enter => {
            if state.snapshot.session == SessionState::Authenticating {
                return false;
            }
            if let Some(identity) = state.login.submit() {
                state.set_info("Registering…");
                let _ = cmd_tx.send(UiCommand::SubmitLogin(identity));
            }
        }
        KeyCode::Char(c) => state.login.push(c),
        _ => {}
    }
    false
}

fn blocked_reason(state: &UiState) -> String {
    let snap = &state.snapshot;
    if snap.cooldown.active {
        format!("Cooling down, {}s left", snap.cooldown.remaining_seconds)
    } else if let Some(kind) = snap.in_flight.kind() {
        format!("{kind:?} already running…")
    } else {
        "Requests unavailable".to_string()
    }
}

fn draw(area: Rect, f: &mut ratatui::Frame, state: &UiState, log_path: Option<&str>) {
    let chunks = Layout::default()
        .direction(Direction::Vertical)
        .constraints(
            [
                Constraint::Length(3),
                Constraint::Min(0),
                Constraint::Length(4),
            ]
            .as_ref(),
        )
        .split(area);

    let title = match &state.snapshot.visitor {
        Some(v) => format!("Review-Bot · {}", v.name),
        None => "Review-Bot".to_string(),
    };
    let tabs = Tabs::new(vec![Line::from("Workspace"), Line::from("Help")])
        .select(state.tab)
        .block(Block::default().borders(Borders::ALL).title(title))
        .highlight_style(Style::default().fg(Color::Yellow));
    f.render_widget(tabs, chunks[0]);

    if state.tab == 1 {
        help::draw_help(chunks[1], f, log_path);
    } else if state.snapshot.session == SessionState::LoggedIn {
        draw_workspace(chunks[1], f, state);
    } else {
        draw_login(chunks[1], f, state);
    }

    draw_status(chunks[2], f, state);
}

fn draw_login(area: Rect, f: &mut ratatui::Frame, state: &UiState) {
    let rows = Layout::default()
        .direction(Direction::Vertical)
        .constraints(
            [
                Constraint::Percentage(25),
                Constraint::Length(9),
                Constraint::Min(0),
            ]
            .as_ref(),
        )
        .split(area);
    let cols = Layout::default()
        .direction(Direction::Horizontal)
        .constraints(
            [
                Constraint::Percentage(25),
                Constraint::Percentage(50),
                Constraint::Percentage(25),
            ]
            .as_ref(),
        )
        .split(rows[1]);

    let form = &state.login;
    let field = |label: &'static str, value: &str, focused: bool| {
        let marker = if focused { "▶ " } else { "  " };
        let style = if focused {
            Style::default().fg(Color::Yellow)
        } else {
            Style::default()
        };
        Line::from(vec![
            Span::styled(marker, style),
            Span::styled(format!("{label:<6}"), Style::default().fg(Color::Gray)),
            Span::styled(value.to_string(), style),
            Span::styled(if focused { "▏" } else { "" }, style),
        ])
    };

    let mut lines = vec![
        Line::from("Register to start reviewing code."),
        Line::from(""),
        field("Name", &form.name, form.focus == LoginField::Name),
        field("Email", &form.email, form.focus == LoginField::Email),
        Line::from(""),
    ];
    if state.snapshot.session == SessionState::Authenticating {
        lines.push(Line::from(Span::styled(
            "Authenticating…",
            Style::default().fg(Color::Cyan),
        )));
    } else if let Some(err) = &form.error {
        lines.push(Line::from(Span::styled(
            err.clone(),
            Style::default().fg(Color::Red),
        )));
    } else {
        lines.push(Line::from(Span::styled(
            "enter to submit · tab to switch field · esc to quit",
            Style::default().fg(Color::DarkGray),
        )));
    }

    let p = Paragraph::new(lines)
        .wrap(Wrap { trim: false })
        .block(Block::default().borders(Borders::ALL).title("Login"));
    f.render_widget(p, cols[1]);
}

fn draw_workspace(area: Rect, f: &mut ratatui::Frame, state: &UiState) {
    let cols = Layout::default()
        .direction(Direction::Horizontal)
        .constraints([Constraint::Percentage(55), Constraint::Percentage(45)].as_ref())
        .split(area);

    let editor_title = match state.editor.path() {
        Some(p) => format!("Code · {}", p.display()),
        None => "Code".to_string(),
    };
    let code = Paragraph::new(state.editor.text().to_string())
        .scroll((state.editor_scroll, 0))
        .block(Block::default().borders(Borders::ALL).title(editor_title));
    f.render_widget(code, cols[0]);

    let lines = report_lines(state, cols[1].width);
    let report = Paragraph::new(lines)
        .wrap(Wrap { trim: false })
        .block(Block::default().borders(Borders::ALL).title("Audit Report"));
    f.render_widget(report, cols[1]);
}

fn verdict_line(report: &AuditReport) -> Line<'static> {
    match (report.status(), report.is_synthetic()) {
        (ReportStatus::Clean, _) => Line::from(Span::styled(
            "✅ Code Clean",
            Style::default().fg(Color::Green).add_modifier(Modifier::BOLD),
        )),
        (ReportStatus::Flagged, true) => Line::from(Span::styled(
            "⏳ Quota Reached",
            Style::default().fg(Color::Yellow).add_modifier(Modifier::BOLD),
        )),
        (ReportStatus::Flagged, false) => Line::from(Span::styled(
            "❌ Bugs Found",
            Style::default().fg(Color::Red).add_modifier(Modifier::BOLD),
        )),
    }
}

fn report_lines(state: &UiState, width: u16) -> Vec<Line<'static>> {
    let snap = &state.snapshot;
    let mut out = Vec::new();

    match snap.in_flight.kind() {
        Some(RequestKind::Audit) => out.push(Line::from(Span::styled(
            "Analyzing…",
            Style::default().fg(Color::Cyan),
        ))),
        Some(RequestKind::Optimize) => out.push(Line::from(Span::styled(
            "Optimizing…",
            Style::default().fg(Color::Cyan),
        ))),
        None => {}
    }
    if snap.cooldown.active {
        out.push(Line::from(Span::styled(
            format!("Cooldown: {}s remaining", snap.cooldown.remaining_seconds),
            Style::default().fg(Color::Yellow),
        )));
    }

    let Some(report) = snap.report.as_ref() else {
        if out.is_empty() {
            out.push(Line::from(Span::styled(
                "Press 'a' to audit the code on the left.",
                Style::default().fg(Color::DarkGray),
            )));
        }
        return out;
    };

    out.push(verdict_line(report));
    if let Some(c) = report.complexity_estimate() {
        push_wrapped_status_kv(&mut out, "Complexity", c, width);
    }
    if let Some(h) = report.hint() {
        push_wrapped_status_kv(&mut out, "Hint", h, width);
    }
    if !report.issues().is_empty() {
        out.push(Line::from(""));
        for issue in report.issues() {
            out.push(Line::from(vec![
                Span::styled("• ", Style::default().fg(Color::Red)),
                Span::raw(issue.clone()),
            ]));
        }
    }

    if let Some(opt) = snap.optimization.as_ref() {
        out.push(Line::from(""));
        let title = if snap.copied {
            Span::styled("Optimized code ✓ Copied", Style::default().fg(Color::Green))
        } else {
            Span::styled("Optimized code", Style::default().fg(Color::Gray))
        };
        out.push(Line::from(title));
        for line in opt.rewritten_code.lines() {
            out.push(Line::from(Span::styled(
                line.to_string(),
                Style::default().fg(Color::Green),
            )));
        }
    }
    out
}

fn draw_status(area: Rect, f: &mut ratatui::Frame, state: &UiState) {
    let snap = &state.snapshot;
    let info_style = if state.info_is_error {
        Style::default().fg(Color::Red)
    } else {
        Style::default()
    };

    let hints: Vec<Span<'static>> = if snap.session == SessionState::LoggedIn {
        [
            key_hint("a", "audit", snap.accepts_requests()),
            key_hint("o", "optimize", snap.can_optimize()),
            key_hint("y", "copy", snap.optimization.is_some()),
            key_hint("s", "share", snap.report.is_some()),
            key_hint("r", "reload", state.editor.path().is_some()),
            key_hint("?", "help", true),
            key_hint("q", "quit", true),
        ]
        .into_iter()
        .flatten()
        .collect()
    } else {
        Vec::new()
    };

    let p = Paragraph::new(vec![
        Line::from(Span::styled(state.info.clone(), info_style)),
        Line::from(hints),
    ])
    .block(Block::default().borders(Borders::ALL).title("Status"));
    f.render_widget(p, area);
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::model::{OptimizationResult, VisitorIdentity, WorkflowSnapshot};

    fn logged_in_state() -> UiState {
        let mut state = UiState::new(CodeBuffer::default());
        state.snapshot = WorkflowSnapshot {
            session: SessionState::LoggedIn,
            visitor: Some(VisitorIdentity::new("Ada", "ada@x.com")),
            ..Default::default()
        };
        state
    }

    fn key(c: char) -> KeyEvent {
        KeyEvent::new(KeyCode::Char(c), KeyModifiers::NONE)
    }

    #[test]
    fn audit_key_sends_buffer_text() {
        let mut state = logged_in_state();
        let (tx, mut rx) = mpsc::unbounded_channel();
        assert!(!handle_key(&mut state, &tx, key('a')));
        match rx.try_recv() {
            Ok(UiCommand::Audit(code)) => assert_eq!(code, crate::editor::PLACEHOLDER),
            other => panic!("expected audit command, got {other:?}"),
        }
    }

    #[test]
    fn optimize_key_without_clean_report_sends_nothing() {
        let mut state = logged_in_state();
        let (tx, mut rx) = mpsc::unbounded_channel();
        handle_key(&mut state, &tx, key('o'));
        assert!(rx.try_recv().is_err());
        assert!(state.info.contains("clean audit"));
    }

    #[test]
    fn login_keys_build_identity() {
        let mut state = UiState::new(CodeBuffer::default());
        let (tx, mut rx) = mpsc::unbounded_channel();
        for c in "Ada".chars() {
            handle_key(&mut state, &tx, key(c));
        }
        handle_key(&mut state, &tx, KeyEvent::new(KeyCode::Tab, KeyModifiers::NONE));
        for c in "ada@x.com".chars() {
            handle_key(&mut state, &tx, key(c));
        }
        handle_key(&mut state, &tx, KeyEvent::new(KeyCode::Enter, KeyModifiers::NONE));
        match rx.try_recv() {
            Ok(UiCommand::SubmitLogin(v)) => {
                assert_eq!(v, VisitorIdentity::new("Ada", "ada@x.com"))
            }
            other => panic!("expected login, got {other:?}"),
        }
        // 'q' is text while logging in, not quit.
        assert!(!handle_key(&mut state, &tx, key('q')));
    }

    #[test]
    fn copied_flag_is_rendered() {
        let mut state = logged_in_state();
        state.snapshot.report = Some(AuditReport::clean("O(1)", "fine"));
        state.snapshot.optimization = Some(OptimizationResult {
            rewritten_code: "int main(){}".into(),
        });
        state.snapshot.copied = true;
        let text: Vec<String> = report_lines(&state, 60)
            .iter()
            .map(|l| l.spans.iter().map(|s| s.content.to_string()).collect())
            .collect();
        assert!(text.iter().any(|l| l.contains("✓ Copied")));
        assert!(text.iter().any(|l| l == "int main(){}"));
    }
}
