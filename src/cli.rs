use crate::config::{self, Overrides, Settings};
use crate::editor::CodeBuffer;
use crate::headless::{HeadlessRequest, OutputFormat};
use crate::model::VisitorIdentity;
use anyhow::{Context, Result};
use clap::Parser;
use std::path::PathBuf;
use std::time::Duration;

#[derive(Debug, Parser, Clone)]
#[command(
    name = "review-bot",
    version,
    about = "Audit and optimize C++/Java code with the Review-Bot service"
)]
pub struct Cli {
    /// Base URL of the Review-Bot API
    #[arg(long, env = "REVIEW_BOT_API_URL")]
    pub base_url: Option<String>,

    /// Per-request timeout (e.g. 30s)
    #[arg(long)]
    pub request_timeout: Option<humantime::Duration>,

    /// Program that receives shared report text on stdin
    #[arg(long)]
    pub share_command: Option<String>,

    /// Config file (defaults to <config dir>/review-bot/config.toml)
    #[arg(long)]
    pub config: Option<PathBuf>,

    /// Print JSON result and exit (no TUI)
    #[arg(long, conflicts_with = "text")]
    pub json: bool,

    /// Print text summary and exit (no TUI)
    #[arg(long)]
    pub text: bool,

    /// Visitor name used to register (headless modes)
    #[arg(long)]
    pub name: Option<String>,

    /// Visitor email used to register (headless modes)
    #[arg(long)]
    pub email: Option<String>,

    /// Source file to review; `-` reads stdin
    #[arg(long, short)]
    pub file: Option<PathBuf>,

    /// Request an optimized rewrite when the audit comes back clean (headless modes)
    #[arg(long)]
    pub optimize: bool,
}

impl Cli {
    pub fn is_headless(&self) -> bool {
        self.json || self.text
    }

    fn overrides(&self) -> Overrides {
        Overrides {
            base_url: self.base_url.clone(),
            request_timeout: self.request_timeout.map(Duration::from),
            share_command: self.share_command.clone(),
        }
    }
}

/// Resolve settings from flags/env, the config file and defaults.
pub fn resolve_settings(args: &Cli) -> Result<Settings> {
    let file = config::load_file(args.config.as_deref())?;
    let settings = Settings::resolve(args.overrides(), file)?;
    tracing::debug!(?settings, "settings resolved");
    Ok(settings)
}

fn load_code(args: &Cli) -> Result<CodeBuffer> {
    match args.file.as_deref() {
        Some(path) => CodeBuffer::open(path),
        None => Ok(CodeBuffer::default()),
    }
}

pub async fn run(args: Cli) -> Result<()> {
    let settings = resolve_settings(&args)?;

    if !args.is_headless() {
        #[cfg(feature = "tui")]
        {
            let editor = load_code(&args)?;
            return crate::tui::run(settings, editor).await;
        }
        #[cfg(not(feature = "tui"))]
        {
            // Fallback when built without TUI support.
            return run_headless(args, settings, OutputFormat::Text).await;
        }
    }

    let format = if args.json {
        OutputFormat::Json
    } else {
        OutputFormat::Text
    };
    run_headless(args, settings, format).await
}

async fn run_headless(args: Cli, settings: Settings, format: OutputFormat) -> Result<()> {
    let name = non_empty(args.name.as_deref()).context("--name is required without the TUI")?;
    let email = non_empty(args.email.as_deref()).context("--email is required without the TUI")?;
    if args.file.is_none() {
        anyhow::bail!("--file is required without the TUI (use - for stdin)");
    }
    let code = load_code(&args)?;
    let request = HeadlessRequest {
        visitor: VisitorIdentity::new(name, email),
        code: code.text().to_string(),
        optimize: args.optimize,
    };
    crate::headless::run(settings, request, format).await
}

fn non_empty(value: Option<&str>) -> Option<&str> {
    value.map(str::trim).filter(|v| !v.is_empty())
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn parses_headless_flags() {
        let cli = Cli::parse_from([
            "review-bot",
            "--json",
            "--name",
            "Ada",
            "--email",
            "ada@x.com",
            "--file",
            "-",
            "--optimize",
            "--request-timeout",
            "5s",
        ]);
        assert!(cli.is_headless());
        assert!(cli.optimize);
        assert_eq!(cli.file.as_deref(), Some(std::path::Path::new("-")));
        assert_eq!(
            cli.overrides().request_timeout,
            Some(Duration::from_secs(5))
        );
    }

    #[test]
    fn json_and_text_conflict() {
        assert!(Cli::try_parse_from(["review-bot", "--json", "--text"]).is_err());
    }

    #[test]
    fn explicit_config_file_feeds_settings() {
        let dir = tempfile::tempdir().unwrap();
        let path = dir.path().join("config.toml");
        std::fs::write(&path, "base_url = \"https://file.example/\"\n").unwrap();
        let mut cli = Cli::parse_from([
            "review-bot",
            "--config",
            path.to_str().unwrap(),
            "--share-command",
            "wl-copy",
        ]);
        // The env var may be set on the host running the tests.
        cli.base_url = None;
        let s = resolve_settings(&cli).unwrap();
        assert_eq!(s.base_url, "https://file.example");
        assert_eq!(s.share_command.as_deref(), Some("wl-copy"));
    }

    #[tokio::test]
    async fn headless_requires_identity() {
        let cli = Cli::parse_from(["review-bot", "--text", "--file", "-"]);
        let err = run_headless(cli, Settings::default(), OutputFormat::Text)
            .await
            .unwrap_err();
        assert!(err.to_string().contains("--name"));
    }
}
