//! Copy/share acknowledgements and the platform capabilities behind them.

use anyhow::{Context, Result};
use std::future::Future;
use std::time::Duration;
use tokio::io::AsyncWriteExt;

/// How long the "copied" acknowledgement stays visible.
pub const COPY_FEEDBACK_WINDOW: Duration = Duration::from_secs(2);

/// Self-expiring "copied" flag. Every successful copy opens a new generation;
/// only the expiry for the latest generation clears the flag.
#[derive(Debug, Clone, Default)]
pub struct EphemeralFeedback {
    copied: bool,
    generation: u64,
}

impl EphemeralFeedback {
    pub fn copied(&self) -> bool {
        self.copied
    }

    /// Set the flag and return the generation whose expiry will clear it.
    pub fn mark_copied(&mut self) -> u64 {
        self.generation += 1;
        self.copied = true;
        self.generation
    }

    /// Clear the flag if `generation` is still the latest. Returns whether
    /// anything changed.
    pub fn expire(&mut self, generation: u64) -> bool {
        if self.copied && generation == self.generation {
            self.copied = false;
            return true;
        }
        false
    }
}

/// What a share action hands to the platform.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct SharePayload {
    pub title: String,
    pub text: String,
    pub url: String,
}

impl SharePayload {
    /// Text used when falling back to the clipboard.
    pub fn clipboard_text(&self) -> String {
        format!("{}\n{}", self.text, self.url)
    }
}

pub trait Clipboard: Send + Sync + 'static {
    fn write_text(&self, text: String) -> impl Future<Output = Result<()>> + Send;
}

/// Native share capability. Callers check `is_available` before using it.
pub trait ShareTarget: Send + Sync + 'static {
    fn is_available(&self) -> bool;

    fn share(&self, payload: SharePayload) -> impl Future<Output = Result<()>> + Send;
}

/// Clipboard for environments without one (headless runs).
#[derive(Debug, Clone, Copy, Default)]
pub struct NoClipboard;

impl Clipboard for NoClipboard {
    async fn write_text(&self, _text: String) -> Result<()> {
        Err(anyhow::anyhow!("no clipboard available"))
    }
}

/// Shares by piping the text into a user-configured program
/// (e.g. `wl-copy`, `xclip -selection clipboard`, a notifier script).
#[derive(Debug, Clone, Default)]
pub struct CommandShare {
    command: Option<String>,
}

impl CommandShare {
    pub fn new(command: Option<String>) -> Self {
        Self { command }
    }
}

impl ShareTarget for CommandShare {
    fn is_available(&self) -> bool {
        self.command.is_some()
    }

    async fn share(&self, payload: SharePayload) -> Result<()> {
        let command = self
            .command
            .as_deref()
            .ok_or_else(|| anyhow::anyhow!("no share command configured"))?;
        let mut parts = command.split_whitespace();
        let program = parts
            .next()
            .ok_or_else(|| anyhow::anyhow!("share command is empty"))?;

        let mut child = tokio::process::Command::new(program)
            .args(parts)
            .stdin(std::process::Stdio::piped())
            .stdout(std::process::Stdio::null())
            .stderr(std::process::Stdio::null())
            .spawn()
            .with_context(|| format!("spawn share command {program:?}"))?;
        if let Some(mut stdin) = child.stdin.take() {
            stdin
                .write_all(payload.clipboard_text().as_bytes())
                .await
                .context("write share text")?;
        }
        let status = child.wait().await.context("wait for share command")?;
        if !status.success() {
            return Err(anyhow::anyhow!("share command exited with {status}"));
        }
        Ok(())
    }
}

#[cfg(feature = "tui")]
pub use system::SystemClipboard;

#[cfg(feature = "tui")]
mod system {
    use super::Clipboard;
    use anyhow::Result;
    use std::sync::mpsc as std_mpsc;
    use tokio::sync::oneshot;

    type Job = (String, oneshot::Sender<Result<(), String>>);

    pub(super) trait Backend {
        fn set_text(&mut self, text: String) -> Result<(), String>;
    }

    impl Backend for arboard::Clipboard {
        fn set_text(&mut self, text: String) -> Result<(), String> {
            arboard::Clipboard::set_text(self, text).map_err(|e| e.to_string())
        }
    }

    /// Process writes sequentially on a dedicated thread. The instance that
    /// made the last successful write is held until the next job replaces
    /// it, so clipboard managers on Linux can still read the contents after
    /// the caller has been answered.
    pub(super) fn spawn_worker<B, F>(open: F) -> std_mpsc::Sender<Job>
    where
        B: Backend + 'static,
        F: Fn() -> Result<B, String> + Send + 'static,
    {
        let (tx, rx) = std_mpsc::channel::<Job>();
        std::thread::spawn(move || {
            let mut held: Option<B> = None;
            for (text, reply) in rx {
                let written = open().and_then(|mut backend| {
                    backend.set_text(text)?;
                    Ok(backend)
                });
                match written {
                    Ok(backend) => {
                        held = Some(backend);
                        let _ = reply.send(Ok(()));
                    }
                    Err(e) => {
                        let _ = reply.send(Err(e));
                    }
                }
            }
            drop(held);
        });
        tx
    }

    /// arboard-backed clipboard.
    pub struct SystemClipboard {
        jobs: std_mpsc::Sender<Job>,
    }

    impl SystemClipboard {
        pub fn new() -> Self {
            Self {
                jobs: spawn_worker(|| arboard::Clipboard::new().map_err(|e| e.to_string())),
            }
        }
    }

    impl Default for SystemClipboard {
        fn default() -> Self {
            Self::new()
        }
    }

    impl Clipboard for SystemClipboard {
        async fn write_text(&self, text: String) -> Result<()> {
            let (reply_tx, reply_rx) = oneshot::channel();
            self.jobs
                .send((text, reply_tx))
                .map_err(|_| anyhow::anyhow!("clipboard manager channel closed"))?;
            reply_rx
                .await
                .map_err(|_| anyhow::anyhow!("clipboard manager stopped"))?
                .map_err(|e| anyhow::anyhow!(e))
        }
    }

    #[cfg(test)]
    mod tests {
        use super::*;
        use std::sync::atomic::{AtomicUsize, Ordering};
        use std::sync::{Arc, Mutex};
        use std::time::Duration;

        struct FakeBackend {
            writes: Arc<Mutex<Vec<String>>>,
            dropped: Arc<AtomicUsize>,
        }

        impl Backend for FakeBackend {
            fn set_text(&mut self, text: String) -> Result<(), String> {
                self.writes.lock().unwrap().push(text);
                Ok(())
            }
        }

        impl Drop for FakeBackend {
            fn drop(&mut self) {
                self.dropped.fetch_add(1, Ordering::SeqCst);
            }
        }

        #[tokio::test]
        async fn writes_answer_at_once_and_hold_only_the_latest_instance() {
            let writes = Arc::new(Mutex::new(Vec::new()));
            let dropped = Arc::new(AtomicUsize::new(0));
            let (w, d) = (writes.clone(), dropped.clone());
            let clipboard = SystemClipboard {
                jobs: spawn_worker(move || {
                    Ok(FakeBackend {
                        writes: w.clone(),
                        dropped: d.clone(),
                    })
                }),
            };

            let both = async {
                clipboard.write_text("first".into()).await?;
                clipboard.write_text("second".into()).await
            };
            tokio::time::timeout(Duration::from_millis(500), both)
                .await
                .expect("clipboard writes queued behind each other")
                .unwrap();

            assert_eq!(*writes.lock().unwrap(), vec!["first", "second"]);
            assert_eq!(dropped.load(Ordering::SeqCst), 1);
        }

        #[tokio::test]
        async fn open_failure_is_reported() {
            let clipboard = SystemClipboard {
                jobs: spawn_worker(|| Err::<FakeBackend, _>("no display".to_string())),
            };
            let err = clipboard.write_text("x".into()).await.unwrap_err();
            assert_eq!(err.to_string(), "no display");
        }
    }
}

#[cfg(test)]
pub(crate) mod testing {
    use super::*;
    use std::sync::Mutex;

    #[derive(Default)]
    pub(crate) struct RecordingClipboard {
        pub(crate) writes: Mutex<Vec<String>>,
        pub(crate) fail: bool,
        /// Time each write takes before it resolves.
        pub(crate) latency: Duration,
    }

    impl Clipboard for RecordingClipboard {
        async fn write_text(&self, text: String) -> Result<()> {
            if !self.latency.is_zero() {
                tokio::time::sleep(self.latency).await;
            }
            self.writes.lock().unwrap().push(text);
            if self.fail {
                Err(anyhow::anyhow!("clipboard denied"))
            } else {
                Ok(())
            }
        }
    }

    /// Share target with a fixed capability and outcome.
    #[derive(Default)]
    pub(crate) struct FakeShare {
        pub(crate) available: bool,
        pub(crate) fail: bool,
        pub(crate) shared: Mutex<Vec<SharePayload>>,
    }

    impl ShareTarget for FakeShare {
        fn is_available(&self) -> bool {
            self.available
        }

        async fn share(&self, payload: SharePayload) -> Result<()> {
            self.shared.lock().unwrap().push(payload);
            if self.fail {
                Err(anyhow::anyhow!("share sheet dismissed"))
            } else {
                Ok(())
            }
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn only_latest_generation_expires() {
        let mut fb = EphemeralFeedback::default();
        let first = fb.mark_copied();
        let second = fb.mark_copied();
        assert!(!fb.expire(first));
        assert!(fb.copied());
        assert!(fb.expire(second));
        assert!(!fb.copied());
        assert!(!fb.expire(second));
    }

    #[test]
    fn command_share_reports_capability() {
        assert!(!CommandShare::new(None).is_available());
        assert!(CommandShare::new(Some("cat".into())).is_available());
    }

    #[cfg(unix)]
    #[tokio::test]
    async fn command_share_pipes_text_and_checks_status() {
        let payload = SharePayload {
            title: "t".into(),
            text: "Status: Clean".into(),
            url: "http://localhost:8000".into(),
        };
        assert!(CommandShare::new(Some("cat".into()))
            .share(payload.clone())
            .await
            .is_ok());
        assert!(CommandShare::new(Some("false".into()))
            .share(payload)
            .await
            .is_err());
    }

    #[tokio::test]
    async fn no_clipboard_always_fails() {
        assert!(NoClipboard.write_text("x".into()).await.is_err());
    }
}
