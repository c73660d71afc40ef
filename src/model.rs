use serde::{Deserialize, Serialize};

/// Number of seconds a quota signal locks out further requests.
pub const QUOTA_COOLDOWN_SECS: u32 = 60;

#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct VisitorIdentity {
    pub name: String,
    pub email: String,
}

impl VisitorIdentity {
    pub fn new(name: impl Into<String>, email: impl Into<String>) -> Self {
        Self {
            name: name.into(),
            email: email.into(),
        }
    }
}

#[derive(Debug, Clone, Copy, PartialEq, Eq, Default, Serialize, Deserialize)]
pub enum SessionState {
    #[default]
    LoggedOut,
    Authenticating,
    LoggedIn,
}

#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
pub enum ReportStatus {
    Clean,
    Flagged,
}

/// Where a report came from. Synthetic reports are built locally when the
/// service returned no verdict (quota exhaustion).
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
pub enum ReportOrigin {
    Remote,
    Synthetic,
}

#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(tag = "status")]
pub enum Verdict {
    Clean {
        complexity_estimate: String,
        hint: String,
    },
    Flagged {
        /// Never empty.
        issues: Vec<String>,
        #[serde(default, skip_serializing_if = "Option::is_none")]
        complexity_estimate: Option<String>,
        #[serde(default, skip_serializing_if = "Option::is_none")]
        hint: Option<String>,
    },
}

#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct AuditReport {
    #[serde(flatten)]
    pub verdict: Verdict,
    pub origin: ReportOrigin,
}

impl AuditReport {
    pub fn clean(complexity_estimate: impl Into<String>, hint: impl Into<String>) -> Self {
        Self {
            verdict: Verdict::Clean {
                complexity_estimate: complexity_estimate.into(),
                hint: hint.into(),
            },
            origin: ReportOrigin::Remote,
        }
    }

    /// Returns `None` when `issues` is empty; a flagged report always names
    /// at least one issue.
    pub fn flagged(
        issues: Vec<String>,
        complexity_estimate: Option<String>,
        hint: Option<String>,
    ) -> Option<Self> {
        if issues.is_empty() {
            return None;
        }
        Some(Self {
            verdict: Verdict::Flagged {
                issues,
                complexity_estimate,
                hint,
            },
            origin: ReportOrigin::Remote,
        })
    }

    /// Locally built stand-in shown while the quota cooldown runs.
    pub fn quota_reached(wait_secs: u32) -> Self {
        Self {
            verdict: Verdict::Flagged {
                issues: vec!["Quota Reached".to_string()],
                complexity_estimate: None,
                hint: Some(format!("Wait {wait_secs}s")),
            },
            origin: ReportOrigin::Synthetic,
        }
    }

    pub fn status(&self) -> ReportStatus {
        match self.verdict {
            Verdict::Clean { .. } => ReportStatus::Clean,
            Verdict::Flagged { .. } => ReportStatus::Flagged,
        }
    }

    pub fn complexity_estimate(&self) -> Option<&str> {
        match &self.verdict {
            Verdict::Clean {
                complexity_estimate,
                ..
            } => Some(complexity_estimate),
            Verdict::Flagged {
                complexity_estimate,
                ..
            } => complexity_estimate.as_deref(),
        }
    }

    pub fn hint(&self) -> Option<&str> {
        match &self.verdict {
            Verdict::Clean { hint, .. } => Some(hint),
            Verdict::Flagged { hint, .. } => hint.as_deref(),
        }
    }

    pub fn issues(&self) -> &[String] {
        match &self.verdict {
            Verdict::Clean { .. } => &[],
            Verdict::Flagged { issues, .. } => issues,
        }
    }

    pub fn is_synthetic(&self) -> bool {
        self.origin == ReportOrigin::Synthetic
    }

    /// A genuine clean verdict, the only state optimization is offered for.
    pub fn permits_optimize(&self) -> bool {
        self.origin == ReportOrigin::Remote && self.status() == ReportStatus::Clean
    }
}

#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct OptimizationResult {
    pub rewritten_code: String,
}

#[derive(Debug, Clone, Copy, PartialEq, Eq, Default, Serialize, Deserialize)]
pub struct CooldownState {
    pub active: bool,
    pub remaining_seconds: u32,
}

#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
pub enum RequestKind {
    Audit,
    Optimize,
}

/// The single outstanding remote request, tagged with its dispatch sequence.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default, Serialize, Deserialize)]
pub enum RequestInFlight {
    #[default]
    Idle,
    Pending { kind: RequestKind, seq: u64 },
}

impl RequestInFlight {
    pub fn kind(&self) -> Option<RequestKind> {
        match self {
            RequestInFlight::Idle => None,
            RequestInFlight::Pending { kind, .. } => Some(*kind),
        }
    }

    pub fn is_idle(&self) -> bool {
        matches!(self, RequestInFlight::Idle)
    }
}

/// Read-only view of controller state published to presentation layers.
#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize)]
pub struct WorkflowSnapshot {
    pub session: SessionState,
    pub visitor: Option<VisitorIdentity>,
    pub in_flight: RequestInFlight,
    pub cooldown: CooldownState,
    pub report: Option<AuditReport>,
    pub optimization: Option<OptimizationResult>,
    pub copied: bool,
}

impl WorkflowSnapshot {
    /// Whether a request-initiating command would currently be accepted.
    pub fn accepts_requests(&self) -> bool {
        self.session == SessionState::LoggedIn && self.in_flight.is_idle() && !self.cooldown.active
    }

    pub fn can_optimize(&self) -> bool {
        self.accepts_requests()
            && self
                .report
                .as_ref()
                .is_some_and(AuditReport::permits_optimize)
    }
}

#[derive(Debug, Clone, PartialEq, Eq)]
pub enum WorkflowEvent {
    // Box keeps the enum small; snapshots carry code and reports.
    Snapshot(Box<WorkflowSnapshot>),
    Info(InfoEvent),
}

/// Structured notices surfaced to the user by the controller.
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum InfoEvent {
    Message(String),
    LoggedIn { name: String },
    LoginFailed(String),
    AuditFailed(String),
    OptimizeFailed(String),
    QuotaReached { wait_secs: u32 },
    CooldownEnded,
    Copied,
    CopyFailed(String),
    Shared,
    ShareCopied,
    ShareFailed(String),
}

impl InfoEvent {
    /// Render a human-readable message for UI/CLI layers.
    pub fn to_message(&self) -> String {
        match self {
            InfoEvent::Message(msg) => msg.clone(),
            InfoEvent::LoggedIn { name } => format!("Welcome, {name}"),
            InfoEvent::LoginFailed(reason) => format!("Login failed: {reason}"),
            InfoEvent::AuditFailed(reason) => format!("Audit failed: {reason}"),
            InfoEvent::OptimizeFailed(reason) => format!("Optimize failed: {reason}"),
            InfoEvent::QuotaReached { wait_secs } => {
                format!("Quota reached, requests paused for {wait_secs}s")
            }
            InfoEvent::CooldownEnded => "Cooldown over, requests enabled".to_string(),
            InfoEvent::Copied => "✓ Copied optimized code".to_string(),
            InfoEvent::CopyFailed(reason) => format!("Clipboard copy failed: {reason}"),
            InfoEvent::Shared => "Report shared".to_string(),
            InfoEvent::ShareCopied => "✓ Report summary copied to clipboard".to_string(),
            InfoEvent::ShareFailed(reason) => format!("Unable to share report: {reason}"),
        }
    }

    pub fn is_error(&self) -> bool {
        matches!(
            self,
            InfoEvent::LoginFailed(_)
                | InfoEvent::AuditFailed(_)
                | InfoEvent::OptimizeFailed(_)
                | InfoEvent::CopyFailed(_)
                | InfoEvent::ShareFailed(_)
        )
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn quota_report_is_synthetic_and_flagged() {
        let r = AuditReport::quota_reached(QUOTA_COOLDOWN_SECS);
        assert_eq!(r.status(), ReportStatus::Flagged);
        assert_eq!(r.issues(), ["Quota Reached".to_string()]);
        assert_eq!(r.hint(), Some("Wait 60s"));
        assert!(r.is_synthetic());
        assert!(!r.permits_optimize());
    }

    #[test]
    fn flagged_requires_issues() {
        assert!(AuditReport::flagged(vec![], None, None).is_none());
        let r = AuditReport::flagged(vec!["off by one".into()], None, None).unwrap();
        assert!(!r.is_synthetic());
        assert!(!r.permits_optimize());
    }

    #[test]
    fn clean_report_exposes_estimate_and_hint() {
        let r = AuditReport::clean("O(1)", "fine");
        assert_eq!(r.complexity_estimate(), Some("O(1)"));
        assert_eq!(r.hint(), Some("fine"));
        assert!(r.issues().is_empty());
        assert!(r.permits_optimize());
    }

    #[test]
    fn snapshot_gate_requires_login_idle_and_no_cooldown() {
        let mut snap = WorkflowSnapshot {
            session: SessionState::LoggedIn,
            ..Default::default()
        };
        assert!(snap.accepts_requests());
        assert!(!snap.can_optimize());

        snap.report = Some(AuditReport::clean("O(n)", "ok"));
        assert!(snap.can_optimize());

        snap.cooldown = CooldownState {
            active: true,
            remaining_seconds: 3,
        };
        assert!(!snap.accepts_requests());
    }
}
