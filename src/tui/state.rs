use crate::editor::CodeBuffer;
use crate::model::{InfoEvent, VisitorIdentity, WorkflowEvent, WorkflowSnapshot};
use ratatui::{
    style::{Color, Style},
    text::{Line, Span},
};

#[derive(Debug, Clone, Copy, PartialEq, Eq, Default)]
pub enum LoginField {
    #[default]
    Name,
    Email,
}

/// Login gate input. Validation of the two fields happens here, before the
/// identity ever reaches the controller.
#[derive(Debug, Clone, Default)]
pub struct LoginForm {
    pub name: String,
    pub email: String,
    pub focus: LoginField,
    pub error: Option<String>,
}

impl LoginForm {
    pub fn toggle_focus(&mut self) {
        self.focus = match self.focus {
            LoginField::Name => LoginField::Email,
            LoginField::Email => LoginField::Name,
        };
    }

    fn focused_mut(&mut self) -> &mut String {
        match self.focus {
            LoginField::Name => &mut self.name,
            LoginField::Email => &mut self.email,
        }
    }

    pub fn push(&mut self, c: char) {
        self.focused_mut().push(c);
        self.error = None;
    }

    pub fn backspace(&mut self) {
        self.focused_mut().pop();
    }

    /// Return the identity if both fields are filled in.
    pub fn submit(&mut self) -> Option<VisitorIdentity> {
        let name = self.name.trim();
        let email = self.email.trim();
        if name.is_empty() || email.is_empty() {
            self.error = Some("Name and email are required".into());
            return None;
        }
        self.error = None;
        Some(VisitorIdentity::new(name, email))
    }
}

pub struct UiState {
    pub tab: usize,
    pub info: String,
    pub info_is_error: bool,
    pub snapshot: WorkflowSnapshot,
    pub login: LoginForm,
    pub editor: CodeBuffer,
    pub editor_scroll: u16,
}

impl UiState {
    pub fn new(editor: CodeBuffer) -> Self {
        Self {
            tab: 0,
            info: String::new(),
            info_is_error: false,
            snapshot: WorkflowSnapshot::default(),
            login: LoginForm::default(),
            editor,
            editor_scroll: 0,
        }
    }

    pub fn set_info(&mut self, msg: impl Into<String>) {
        self.info = msg.into();
        self.info_is_error = false;
    }

    pub fn set_error(&mut self, msg: impl Into<String>) {
        self.info = msg.into();
        self.info_is_error = true;
    }

    pub fn scroll_editor(&mut self, delta: i32) {
        let max = self.editor.line_count().saturating_sub(1) as i32;
        let next = (self.editor_scroll as i32 + delta).clamp(0, max.max(0));
        self.editor_scroll = next as u16;
    }
}

pub fn apply_event(state: &mut UiState, ev: WorkflowEvent) {
    match ev {
        WorkflowEvent::Snapshot(snapshot) => state.snapshot = *snapshot,
        WorkflowEvent::Info(info) => apply_info(state, &info),
    }
}

fn apply_info(state: &mut UiState, info: &InfoEvent) {
    if let InfoEvent::LoginFailed(reason) = info {
        state.login.error = Some(reason.clone());
    }
    if info.is_error() {
        state.set_error(info.to_message());
    } else {
        state.set_info(info.to_message());
    }
}

/// Key hint rendered dim when the action is currently unavailable.
pub fn key_hint(key: &'static str, label: &'static str, enabled: bool) -> Vec<Span<'static>> {
    let (key_style, label_style) = if enabled {
        (Style::default().fg(Color::Magenta), Style::default())
    } else {
        (
            Style::default().fg(Color::DarkGray),
            Style::default().fg(Color::DarkGray),
        )
    };
    vec![
        Span::styled(key, key_style),
        Span::styled(format!(" {label}  "), label_style),
    ]
}

pub fn push_wrapped_status_kv(
    out: &mut Vec<Line<'static>>,
    label: &str,
    value: &str,
    area_width: u16,
) {
    let value = value.trim();
    if value.is_empty() {
        return;
    }

    // Account for borders (2 chars on each side)
    let usable_width = area_width.saturating_sub(4).max(1);
    let label_text = format!("{label}:");
    let label_width = label_text.chars().count() as u16;

    let value_chars: Vec<char> = value.chars().collect();
    let mut remaining = value_chars.as_slice();
    let mut first = true;

    while !remaining.is_empty() {
        let line_width = if first {
            usable_width.saturating_sub(label_width + 1).max(1)
        } else {
            usable_width.saturating_sub(2).max(1)
        };

        let chars_to_take = (remaining.len() as u16).min(line_width) as usize;
        let (line_chars, rest) = remaining.split_at(chars_to_take);
        let line_text: String = line_chars.iter().collect();

        if first {
            out.push(Line::from(vec![
                Span::styled(label_text.clone(), Style::default().fg(Color::Gray)),
                Span::raw(" "),
                Span::raw(line_text),
            ]));
            first = false;
        } else {
            out.push(Line::from(vec![Span::raw("  "), Span::raw(line_text)]));
        }

        remaining = rest;
    }
}
