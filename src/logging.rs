//! Tracing subscriber setup.
//!
//! The TUI owns the terminal, so interactive runs log to a file; headless runs
//! log to stderr.

use std::fs::{self, OpenOptions};
use std::path::PathBuf;
use std::sync::Mutex;
use tracing_subscriber::{fmt, prelude::*, EnvFilter};

fn env_filter(default: &str) -> EnvFilter {
    EnvFilter::try_from_default_env()
        .or_else(|_| EnvFilter::try_new(default))
        .unwrap_or_else(|_| EnvFilter::new("warn"))
}

pub fn log_file_path() -> Option<PathBuf> {
    dirs::data_local_dir().map(|d| d.join("review-bot").join("review-bot.log"))
}

/// Log to the data-dir log file. If it cannot be opened, logging stays off
/// rather than writing over the TUI.
pub fn init_for_tui() {
    let file = log_file_path().and_then(|path| {
        if let Some(parent) = path.parent() {
            fs::create_dir_all(parent).ok()?;
        }
        let file = OpenOptions::new().create(true).append(true).open(&path).ok()?;
        Some((path, file))
    });

    match file {
        Some((path, file)) => {
            let _ = tracing_subscriber::registry()
                .with(fmt::layer().with_ansi(false).with_writer(Mutex::new(file)))
                .with(env_filter("info"))
                .try_init();
            tracing::info!(path = %path.display(), "logging initialized");
        }
        None => {
            let _ = tracing_subscriber::registry().with(env_filter("off")).try_init();
        }
    }
}

pub fn init_for_headless() {
    let _ = tracing_subscriber::registry()
        .with(fmt::layer().with_writer(std::io::stderr))
        .with(env_filter("warn"))
        .try_init();
}
