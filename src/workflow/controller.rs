//! Workflow driver.
//!
//! Owns the `WorkflowState`, turns UI commands into actions, carries out the
//! resulting effects and feeds their completions back in. Every state change
//! happens on this one loop; spawned tasks only ever send completions.

use super::state::{Action, Effect, WorkflowState};
use crate::feedback::{Clipboard, ShareTarget};
use crate::gateway::ReviewService;
use crate::model::{VisitorIdentity, WorkflowEvent, WorkflowSnapshot};
use anyhow::Result;
use std::pin::Pin;
use std::sync::Arc;
use tokio::sync::mpsc::{self, UnboundedReceiver, UnboundedSender};
use tokio::time::{Duration, Instant, Interval, Sleep};

const TICK: Duration = Duration::from_secs(1);

/// Commands emitted by UI layers.
#[derive(Debug, Clone)]
pub(crate) enum UiCommand {
    SubmitLogin(VisitorIdentity),
    Audit(String),
    Optimize(String),
    CopyOptimized,
    ShareReport,
    Quit,
}

/// External collaborators the controller drives.
pub(crate) struct Collaborators<S, C, H> {
    pub service: Arc<S>,
    pub clipboard: Arc<C>,
    pub share: Arc<H>,
}

enum Wake {
    Command(Option<UiCommand>),
    Completed(Action),
    CooldownTick,
    FeedbackDue(u64),
}

/// The only timers the controller runs. Starting either one drops its
/// predecessor, so a replaced ticker or reset can never fire.
#[derive(Default)]
struct Timers {
    ticker: Option<Interval>,
    feedback_reset: Option<(u64, Pin<Box<Sleep>>)>,
}

struct Dispatcher<S, C, H> {
    deps: Collaborators<S, C, H>,
    event_tx: UnboundedSender<WorkflowEvent>,
    done_tx: UnboundedSender<Action>,
}

impl<S, C, H> Dispatcher<S, C, H>
where
    S: ReviewService,
    C: Clipboard,
    H: ShareTarget,
{
    fn execute(&self, effect: Effect, timers: &mut Timers) {
        match effect {
            Effect::Register(identity) => {
                let service = self.deps.service.clone();
                let tx = self.done_tx.clone();
                tokio::spawn(async move {
                    let outcome = service.register(&identity).await;
                    let _ = tx.send(Action::LoginResolved(outcome));
                });
            }
            Effect::Audit { seq, code } => {
                let service = self.deps.service.clone();
                let tx = self.done_tx.clone();
                tokio::spawn(async move {
                    let outcome = service.audit(&code).await;
                    let _ = tx.send(Action::AuditResolved { seq, outcome });
                });
            }
            Effect::Optimize { seq, code } => {
                let service = self.deps.service.clone();
                let tx = self.done_tx.clone();
                tokio::spawn(async move {
                    let outcome = service.optimize(&code).await;
                    let _ = tx.send(Action::OptimizeResolved { seq, outcome });
                });
            }
            Effect::StartCooldownTicker => {
                timers.ticker = Some(tokio::time::interval_at(Instant::now() + TICK, TICK));
            }
            Effect::StopCooldownTicker => {
                timers.ticker = None;
            }
            Effect::WriteClipboard { purpose, text } => {
                let clipboard = self.deps.clipboard.clone();
                let tx = self.done_tx.clone();
                tokio::spawn(async move {
                    let result = clipboard.write_text(text).await.map_err(|e| format!("{e:#}"));
                    let _ = tx.send(Action::ClipboardResolved { purpose, result });
                });
            }
            Effect::Share(payload) => {
                let share = self.deps.share.clone();
                let tx = self.done_tx.clone();
                tokio::spawn(async move {
                    let result = share
                        .share(payload.clone())
                        .await
                        .map_err(|e| format!("{e:#}"));
                    let _ = tx.send(Action::ShareResolved { payload, result });
                });
            }
            Effect::ScheduleFeedbackReset { generation, after } => {
                timers.feedback_reset = Some((generation, Box::pin(tokio::time::sleep(after))));
            }
            Effect::Notify(info) => {
                let _ = self.event_tx.send(WorkflowEvent::Info(info));
            }
        }
    }
}

fn to_action(cmd: UiCommand) -> Option<Action> {
    Some(match cmd {
        UiCommand::SubmitLogin(identity) => Action::SubmitLogin(identity),
        UiCommand::Audit(code) => Action::RequestAudit(code),
        UiCommand::Optimize(code) => Action::RequestOptimize(code),
        UiCommand::CopyOptimized => Action::CopyOptimized,
        UiCommand::ShareReport => Action::ShareReport,
        UiCommand::Quit => return None,
    })
}

/// Run the workflow until the UI quits or drops its command sender.
///
/// `page_ref` is the reference attached to shared reports.
pub(crate) async fn run_controller<S, C, H>(
    deps: Collaborators<S, C, H>,
    page_ref: String,
    event_tx: UnboundedSender<WorkflowEvent>,
    mut cmd_rx: UnboundedReceiver<UiCommand>,
) -> Result<()>
where
    S: ReviewService,
    C: Clipboard,
    H: ShareTarget,
{
    let mut state = WorkflowState::new(deps.share.is_available(), page_ref);
    let (done_tx, mut done_rx) = mpsc::unbounded_channel::<Action>();
    let dispatcher = Dispatcher {
        deps,
        event_tx,
        done_tx,
    };
    let mut timers = Timers::default();

    let mut published: WorkflowSnapshot = state.snapshot();
    let _ = dispatcher
        .event_tx
        .send(WorkflowEvent::Snapshot(Box::new(published.clone())));

    loop {
        let Timers {
            ticker,
            feedback_reset,
        } = &mut timers;
        let wake = tokio::select! {
            // Commands queued before a completion are handled first, so a
            // request made while another is outstanding always meets the guard.
            biased;
            cmd = cmd_rx.recv() => Wake::Command(cmd),
            Some(action) = done_rx.recv() => Wake::Completed(action),
            _ = async {
                match ticker.as_mut() {
                    Some(t) => { t.tick().await; }
                    None => futures::future::pending::<()>().await,
                }
            } => Wake::CooldownTick,
            generation = async {
                match feedback_reset.as_mut() {
                    Some((generation, sleep)) => {
                        sleep.as_mut().await;
                        *generation
                    }
                    None => futures::future::pending().await,
                }
            } => Wake::FeedbackDue(generation),
        };

        let action = match wake {
            Wake::Command(cmd) => match cmd.and_then(to_action) {
                Some(action) => action,
                None => {
                    tracing::info!("controller shutting down");
                    break;
                }
            },
            Wake::Completed(action) => action,
            Wake::CooldownTick => Action::CooldownTick,
            Wake::FeedbackDue(generation) => {
                timers.feedback_reset = None;
                Action::FeedbackExpired { generation }
            }
        };

        for effect in state.apply(action) {
            dispatcher.execute(effect, &mut timers);
        }

        let snapshot = state.snapshot();
        if snapshot != published {
            published = snapshot;
            if dispatcher
                .event_tx
                .send(WorkflowEvent::Snapshot(Box::new(published.clone())))
                .is_err()
            {
                tracing::debug!("event receiver gone");
                break;
            }
        }
    }

    Ok(())
}
