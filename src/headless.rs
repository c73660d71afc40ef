//! Non-interactive runs (`--json` / `--text`).
//!
//! Drives the same controller the TUI uses: register, audit, then optionally
//! optimize, and print the outcome once.

use crate::config::Settings;
use crate::feedback::{CommandShare, NoClipboard};
use crate::gateway::{HttpGateway, ReviewService};
use crate::model::{
    AuditReport, InfoEvent, OptimizationResult, SessionState, VisitorIdentity, WorkflowEvent,
    WorkflowSnapshot, QUOTA_COOLDOWN_SECS,
};
use crate::summary::build_text_summary;
use crate::workflow::{run_controller, Collaborators, UiCommand};
use anyhow::{bail, Context, Result};
use serde::Serialize;
use std::io::Write;
use std::sync::Arc;
use time::format_description::well_known::Rfc3339;
use time::OffsetDateTime;
use tokio::sync::mpsc::{self, UnboundedReceiver, UnboundedSender};

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum OutputFormat {
    Json,
    Text,
}

pub struct HeadlessRequest {
    pub visitor: VisitorIdentity,
    pub code: String,
    pub optimize: bool,
}

/// Everything a headless run prints.
#[derive(Debug, Serialize)]
pub struct HeadlessReport {
    pub generated_at: String,
    pub base_url: String,
    pub visitor: VisitorIdentity,
    pub report: AuditReport,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub optimization: Option<OptimizationResult>,
    #[serde(skip_serializing_if = "Vec::is_empty")]
    pub notices: Vec<String>,
    #[serde(skip)]
    quota_reached: bool,
}

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
        let mut out = std::io::LineWriter::new(std::io::stdout().lock());
        let mut err = std::io::LineWriter::new(std::io::stderr().lock());
        while let Some(line) = rx.blocking_recv() {
            match line {
                OutputLine::Stdout(msg) => {
                    let _ = writeln!(out, "{msg}");
                }
                OutputLine::Stderr(msg) => {
                    let _ = writeln!(err, "{msg}");
                }
            }
        }
        let _ = out.flush();
        let _ = err.flush();
    });
    (tx, handle)
}

pub async fn run(
    settings: Settings,
    request: HeadlessRequest,
    format: OutputFormat,
) -> Result<()> {
    let gateway = Arc::new(HttpGateway::new(&settings)?);
    let base_url = gateway.base_url().to_string();

    let outcome = tokio::select! {
        res = drive(gateway, base_url, request) => res?,
        _ = tokio::signal::ctrl_c() => bail!("interrupted"),
    };

    let (tx, handle) = spawn_output_writer();
    match format {
        OutputFormat::Json => {
            let _ = tx.send(OutputLine::Stdout(serde_json::to_string_pretty(&outcome)?));
        }
        OutputFormat::Text => {
            let summary = build_text_summary(&outcome.report, outcome.optimization.as_ref());
            for line in summary.lines {
                let _ = tx.send(OutputLine::Stdout(line));
            }
            for notice in &outcome.notices {
                let _ = tx.send(OutputLine::Stderr(notice.clone()));
            }
        }
    }
    drop(tx);
    let _ = handle.await;

    if outcome.quota_reached {
        bail!("quota reached, retry in {QUOTA_COOLDOWN_SECS}s");
    }
    Ok(())
}

/// Run one register → audit → optimize pass against `service`.
async fn drive<S: ReviewService>(
    service: Arc<S>,
    base_url: String,
    request: HeadlessRequest,
) -> Result<HeadlessReport> {
    let (event_tx, mut event_rx) = mpsc::unbounded_channel::<WorkflowEvent>();
    let (cmd_tx, cmd_rx) = mpsc::unbounded_channel::<UiCommand>();
    let deps = Collaborators {
        service,
        clipboard: Arc::new(NoClipboard),
        share: Arc::new(CommandShare::new(None)),
    };
    let controller = tokio::spawn(run_controller(deps, base_url.clone(), event_tx, cmd_rx));

    let result = session(&cmd_tx, &mut event_rx, base_url, request).await;

    let _ = cmd_tx.send(UiCommand::Quit);
    controller.await.context("controller task failed")??;
    result
}

async fn session(
    cmd_tx: &UnboundedSender<UiCommand>,
    event_rx: &mut UnboundedReceiver<WorkflowEvent>,
    base_url: String,
    request: HeadlessRequest,
) -> Result<HeadlessReport> {
    let mut notices = Vec::new();

    send(cmd_tx, UiCommand::SubmitLogin(request.visitor.clone()))?;
    wait_for_login(event_rx).await?;

    send(cmd_tx, UiCommand::Audit(request.code.clone()))?;
    let mut snapshot = settle(event_rx, &mut notices).await?;
    if let Some(reason) = notices.iter().find_map(|n| match n {
        InfoEvent::AuditFailed(reason) => Some(reason.clone()),
        _ => None,
    }) {
        bail!("audit failed: {reason}");
    }

    if request.optimize {
        if snapshot.can_optimize() {
            send(cmd_tx, UiCommand::Optimize(request.code))?;
            snapshot = settle(event_rx, &mut notices).await?;
            if let Some(reason) = notices.iter().find_map(|n| match n {
                InfoEvent::OptimizeFailed(reason) => Some(reason.clone()),
                _ => None,
            }) {
                bail!("optimize failed: {reason}");
            }
        } else {
            notices.push(InfoEvent::Message(
                "optimize skipped: the audit did not come back clean".into(),
            ));
        }
    }

    let Some(report) = snapshot.report else {
        bail!("audit finished without a report");
    };
    let quota_reached = notices
        .iter()
        .any(|n| matches!(n, InfoEvent::QuotaReached { .. }));

    Ok(HeadlessReport {
        generated_at: OffsetDateTime::now_utc()
            .format(&Rfc3339)
            .unwrap_or_default(),
        base_url,
        visitor: request.visitor,
        report,
        optimization: snapshot.optimization,
        notices: notices.iter().map(InfoEvent::to_message).collect(),
        quota_reached,
    })
}

fn send(cmd_tx: &UnboundedSender<UiCommand>, cmd: UiCommand) -> Result<()> {
    cmd_tx
        .send(cmd)
        .map_err(|_| anyhow::anyhow!("controller stopped unexpectedly"))
}

async fn wait_for_login(event_rx: &mut UnboundedReceiver<WorkflowEvent>) -> Result<()> {
    while let Some(ev) = event_rx.recv().await {
        match ev {
            WorkflowEvent::Snapshot(snap) if snap.session == SessionState::LoggedIn => {
                return Ok(())
            }
            WorkflowEvent::Info(InfoEvent::LoginFailed(reason)) => {
                bail!("login failed: {reason}")
            }
            _ => {}
        }
    }
    bail!("controller stopped before login completed")
}

/// Wait until the request just sent has been dispatched and resolved.
async fn settle(
    event_rx: &mut UnboundedReceiver<WorkflowEvent>,
    notices: &mut Vec<InfoEvent>,
) -> Result<WorkflowSnapshot> {
    let mut dispatched = false;
    while let Some(ev) = event_rx.recv().await {
        match ev {
            WorkflowEvent::Info(info) => notices.push(info),
            WorkflowEvent::Snapshot(snap) => {
                if !snap.in_flight.is_idle() {
                    dispatched = true;
                } else if dispatched {
                    return Ok(*snap);
                }
            }
        }
    }
    bail!("controller stopped before the request resolved")
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::error::GatewayError;
    use crate::gateway::testing::ScriptedService;
    use crate::model::ReportStatus;

    fn request(optimize: bool) -> HeadlessRequest {
        HeadlessRequest {
            visitor: VisitorIdentity::new("Ada", "ada@x.com"),
            code: "int main(){}".into(),
            optimize,
        }
    }

    #[tokio::test]
    async fn clean_audit_then_optimize() {
        let service = Arc::new(ScriptedService::default());
        let out = drive(service.clone(), "http://svc".into(), request(true))
            .await
            .unwrap();

        assert_eq!(out.report.status(), ReportStatus::Clean);
        assert_eq!(
            out.optimization.unwrap().rewritten_code,
            "// optimized\nint main(){}"
        );
        assert!(!out.quota_reached);
        assert_eq!(service.registered(), vec![VisitorIdentity::new("Ada", "ada@x.com")]);
        assert_eq!(service.audited(), vec!["int main(){}".to_string()]);
    }

    #[tokio::test]
    async fn flagged_audit_skips_optimize() {
        let service = Arc::new(ScriptedService::default());
        service.push_audit(Ok(AuditReport::flagged(vec!["leak".into()], None, None).unwrap()));
        let out = drive(service.clone(), "http://svc".into(), request(true))
            .await
            .unwrap();

        assert_eq!(out.report.issues(), ["leak".to_string()]);
        assert!(out.optimization.is_none());
        assert!(service.optimized().is_empty());
        assert!(out.notices.iter().any(|n| n.contains("optimize skipped")));
    }

    #[tokio::test(start_paused = true)]
    async fn quota_yields_synthetic_report() {
        let service = Arc::new(ScriptedService::default());
        service.push_audit(Err(GatewayError::QuotaExceeded));
        let out = drive(service, "http://svc".into(), request(false))
            .await
            .unwrap();

        assert!(out.report.is_synthetic());
        assert_eq!(out.report.hint(), Some("Wait 60s"));
        assert!(out.quota_reached);
    }

    #[tokio::test]
    async fn login_failure_is_an_error() {
        let service = Arc::new(ScriptedService::default());
        service.push_register(Err(GatewayError::Transport("connection refused".into())));
        let err = drive(service.clone(), "http://svc".into(), request(false))
            .await
            .unwrap_err();

        assert!(err.to_string().contains("login failed"));
        assert!(service.audited().is_empty());
    }

    #[tokio::test]
    async fn server_failure_on_audit_is_an_error() {
        let service = Arc::new(ScriptedService::default());
        service.push_audit(Err(GatewayError::Server {
            status: Some(500),
            detail: "boom".into(),
        }));
        let err = drive(service, "http://svc".into(), request(false))
            .await
            .unwrap_err();
        assert!(err.to_string().contains("audit failed"));
    }

    #[test]
    fn json_output_omits_internal_flag() {
        let out = HeadlessReport {
            generated_at: "2026-01-01T00:00:00Z".into(),
            base_url: "http://svc".into(),
            visitor: VisitorIdentity::new("Ada", "ada@x.com"),
            report: AuditReport::clean("O(1)", "fine"),
            optimization: None,
            notices: vec![],
            quota_reached: false,
        };
        let v: serde_json::Value = serde_json::to_value(&out).unwrap();
        assert!(v.get("quota_reached").is_none());
        assert!(v.get("optimization").is_none());
        assert_eq!(v["visitor"]["name"], "Ada");
    }
}
