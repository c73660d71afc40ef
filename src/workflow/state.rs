//! Workflow state and its transition function.
//!
//! All state lives in `WorkflowState` and changes only through
//! [`WorkflowState::apply`]. Transitions never perform I/O; they return the
//! effects the controller must carry out, and completions come back in as
//! further actions.

use crate::cooldown::{CooldownTimer, Tick};
use crate::error::GatewayError;
use crate::feedback::{EphemeralFeedback, SharePayload, COPY_FEEDBACK_WINDOW};
use crate::gateway::{AuditOutcome, OptimizeOutcome};
use crate::model::{
    AuditReport, InfoEvent, OptimizationResult, RequestInFlight, RequestKind, SessionState,
    VisitorIdentity, WorkflowSnapshot, QUOTA_COOLDOWN_SECS,
};
use crate::session::SessionController;
use crate::summary;
use std::time::Duration;

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum ClipboardPurpose {
    OptimizedCode,
    ShareFallback,
}

/// Inputs to the state machine: user requests and completions of effects.
#[derive(Debug)]
pub enum Action {
    SubmitLogin(VisitorIdentity),
    LoginResolved(Result<(), GatewayError>),
    RequestAudit(String),
    AuditResolved { seq: u64, outcome: AuditOutcome },
    RequestOptimize(String),
    OptimizeResolved { seq: u64, outcome: OptimizeOutcome },
    CooldownTick,
    CopyOptimized,
    ShareReport,
    ClipboardResolved {
        purpose: ClipboardPurpose,
        result: Result<(), String>,
    },
    ShareResolved {
        payload: SharePayload,
        result: Result<(), String>,
    },
    FeedbackExpired { generation: u64 },
}

/// Work the controller performs on behalf of a transition.
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum Effect {
    Register(VisitorIdentity),
    Audit { seq: u64, code: String },
    Optimize { seq: u64, code: String },
    /// Start (or restart) the one-second cooldown ticker.
    StartCooldownTicker,
    StopCooldownTicker,
    WriteClipboard {
        purpose: ClipboardPurpose,
        text: String,
    },
    Share(SharePayload),
    /// Replace any pending feedback reset with one for `generation`.
    ScheduleFeedbackReset { generation: u64, after: Duration },
    Notify(InfoEvent),
}

#[derive(Debug, Clone)]
pub struct WorkflowState {
    session: SessionController,
    in_flight: RequestInFlight,
    cooldown: CooldownTimer,
    report: Option<AuditReport>,
    optimization: Option<OptimizationResult>,
    feedback: EphemeralFeedback,
    last_seq: u64,
    native_share: bool,
    page_ref: String,
}

impl WorkflowState {
    pub fn new(native_share: bool, page_ref: impl Into<String>) -> Self {
        Self {
            session: SessionController::default(),
            in_flight: RequestInFlight::Idle,
            cooldown: CooldownTimer::default(),
            report: None,
            optimization: None,
            feedback: EphemeralFeedback::default(),
            last_seq: 0,
            native_share,
            page_ref: page_ref.into(),
        }
    }

    pub fn snapshot(&self) -> WorkflowSnapshot {
        WorkflowSnapshot {
            session: self.session.state(),
            visitor: self.session.visitor().cloned(),
            in_flight: self.in_flight,
            cooldown: self.cooldown.state(),
            report: self.report.clone(),
            optimization: self.optimization.clone(),
            copied: self.feedback.copied(),
        }
    }

    /// The gate every request-initiating action must pass.
    fn accepts_requests(&self) -> bool {
        self.session.is_logged_in() && self.in_flight.is_idle() && !self.cooldown.is_active()
    }

    fn dispatch(&mut self, kind: RequestKind) -> u64 {
        self.last_seq += 1;
        self.in_flight = RequestInFlight::Pending {
            kind,
            seq: self.last_seq,
        };
        self.last_seq
    }

    /// Clear the in-flight slot if `seq` is the outstanding request of `kind`.
    fn settle(&mut self, kind: RequestKind, seq: u64) -> bool {
        if self.in_flight != (RequestInFlight::Pending { kind, seq }) {
            tracing::debug!(?kind, seq, in_flight = ?self.in_flight, "discarding stale completion");
            return false;
        }
        self.in_flight = RequestInFlight::Idle;
        true
    }

    fn enter_cooldown(&mut self, effects: &mut Vec<Effect>) {
        self.cooldown.start(QUOTA_COOLDOWN_SECS);
        effects.push(Effect::StartCooldownTicker);
        effects.push(Effect::Notify(InfoEvent::QuotaReached {
            wait_secs: QUOTA_COOLDOWN_SECS,
        }));
    }

    pub fn apply(&mut self, action: Action) -> Vec<Effect> {
        let mut effects = Vec::new();
        match action {
            Action::SubmitLogin(identity) => {
                if self.session.begin(identity.clone()) {
                    tracing::info!(name = %identity.name, "registering visitor");
                    effects.push(Effect::Register(identity));
                } else {
                    tracing::debug!(state = ?self.session.state(), "login ignored");
                }
            }
            Action::LoginResolved(outcome) => {
                if self.session.state() != SessionState::Authenticating {
                    tracing::debug!("registration outcome with no pending login");
                    return effects;
                }
                match self.session.complete(outcome) {
                    Ok(()) => {
                        let name = self
                            .session
                            .visitor()
                            .map(|v| v.name.clone())
                            .unwrap_or_default();
                        tracing::info!(%name, "session open");
                        effects.push(Effect::Notify(InfoEvent::LoggedIn { name }));
                    }
                    Err(e) => {
                        tracing::warn!(error = %e, "registration failed");
                        effects.push(Effect::Notify(InfoEvent::LoginFailed(e.to_string())));
                    }
                }
            }
            Action::RequestAudit(code) => {
                if !self.accepts_requests() {
                    tracing::debug!(
                        in_flight = ?self.in_flight,
                        cooldown = ?self.cooldown.state(),
                        "audit ignored"
                    );
                    return effects;
                }
                let seq = self.dispatch(RequestKind::Audit);
                // Rewritten code belongs to the previous audit.
                self.optimization = None;
                tracing::info!(seq, bytes = code.len(), "audit dispatched");
                effects.push(Effect::Audit { seq, code });
            }
            Action::AuditResolved { seq, outcome } => {
                if !self.settle(RequestKind::Audit, seq) {
                    return effects;
                }
                match outcome {
                    Ok(report) => {
                        tracing::info!(seq, status = ?report.status(), "audit completed");
                        self.report = Some(report);
                    }
                    Err(e) if e.is_quota() => {
                        tracing::warn!(seq, "audit hit quota");
                        self.report = Some(AuditReport::quota_reached(QUOTA_COOLDOWN_SECS));
                        self.enter_cooldown(&mut effects);
                    }
                    Err(e) => {
                        tracing::warn!(seq, error = %e, "audit failed");
                        self.report = None;
                        effects.push(Effect::Notify(InfoEvent::AuditFailed(e.to_string())));
                    }
                }
            }
            Action::RequestOptimize(code) => {
                let eligible = self
                    .report
                    .as_ref()
                    .is_some_and(AuditReport::permits_optimize);
                if !self.accepts_requests() || !eligible {
                    tracing::debug!(in_flight = ?self.in_flight, eligible, "optimize ignored");
                    return effects;
                }
                let seq = self.dispatch(RequestKind::Optimize);
                tracing::info!(seq, bytes = code.len(), "optimize dispatched");
                effects.push(Effect::Optimize { seq, code });
            }
            Action::OptimizeResolved { seq, outcome } => {
                if !self.settle(RequestKind::Optimize, seq) {
                    return effects;
                }
                match outcome {
                    Ok(result) => {
                        tracing::info!(seq, "optimize completed");
                        self.optimization = Some(result);
                    }
                    Err(e) if e.is_quota() => {
                        tracing::warn!(seq, "optimize hit quota");
                        self.enter_cooldown(&mut effects);
                    }
                    Err(e) => {
                        tracing::warn!(seq, error = %e, "optimize failed");
                        effects.push(Effect::Notify(InfoEvent::OptimizeFailed(e.to_string())));
                    }
                }
            }
            Action::CooldownTick => match self.cooldown.tick() {
                Tick::Idle => {}
                Tick::Running { remaining } => {
                    tracing::trace!(remaining, "cooldown tick");
                }
                Tick::Expired => {
                    tracing::info!("cooldown expired");
                    effects.push(Effect::StopCooldownTicker);
                    effects.push(Effect::Notify(InfoEvent::CooldownEnded));
                }
            },
            Action::CopyOptimized => {
                if let Some(opt) = &self.optimization {
                    effects.push(Effect::WriteClipboard {
                        purpose: ClipboardPurpose::OptimizedCode,
                        text: opt.rewritten_code.clone(),
                    });
                }
            }
            Action::ShareReport => {
                let Some(report) = &self.report else {
                    return effects;
                };
                let payload = summary::share_payload(report, &self.page_ref);
                if self.native_share {
                    effects.push(Effect::Share(payload));
                } else {
                    effects.push(Effect::WriteClipboard {
                        purpose: ClipboardPurpose::ShareFallback,
                        text: payload.clipboard_text(),
                    });
                }
            }
            Action::ShareResolved { payload, result } => match result {
                Ok(()) => effects.push(Effect::Notify(InfoEvent::Shared)),
                Err(e) => {
                    tracing::debug!(error = %e, "native share failed, falling back to clipboard");
                    effects.push(Effect::WriteClipboard {
                        purpose: ClipboardPurpose::ShareFallback,
                        text: payload.clipboard_text(),
                    });
                }
            },
            Action::ClipboardResolved { purpose, result } => match (purpose, result) {
                (ClipboardPurpose::OptimizedCode, Ok(())) => {
                    let generation = self.feedback.mark_copied();
                    effects.push(Effect::ScheduleFeedbackReset {
                        generation,
                        after: COPY_FEEDBACK_WINDOW,
                    });
                    effects.push(Effect::Notify(InfoEvent::Copied));
                }
                (ClipboardPurpose::OptimizedCode, Err(e)) => {
                    tracing::warn!(error = %e, "copy failed");
                    effects.push(Effect::Notify(InfoEvent::CopyFailed(e)));
                }
                (ClipboardPurpose::ShareFallback, Ok(())) => {
                    effects.push(Effect::Notify(InfoEvent::ShareCopied));
                }
                (ClipboardPurpose::ShareFallback, Err(e)) => {
                    tracing::warn!(error = %e, "share fallback failed");
                    effects.push(Effect::Notify(InfoEvent::ShareFailed(e)));
                }
            },
            Action::FeedbackExpired { generation } => {
                self.feedback.expire(generation);
            }
        }
        effects
    }
}
