mod cli;
mod config;
mod cooldown;
mod editor;
mod error;
mod feedback;
mod gateway;
mod headless;
mod logging;
mod model;
mod session;
mod summary;
#[cfg(feature = "tui")]
mod tui;
mod workflow;

use anyhow::Result;
use clap::Parser;

#[tokio::main]
async fn main() -> Result<()> {
    let args = cli::Cli::parse();
    let is_non_tui = args.is_headless() || cfg!(not(feature = "tui"));

    if is_non_tui {
        logging::init_for_headless();
    } else {
        logging::init_for_tui();
    }

    match cli::run(args).await {
        Ok(()) => {
            // Explicitly exit with code 0 on success, especially for non-TUI modes
            if is_non_tui {
                std::process::exit(0);
            }
            Ok(())
        }
        Err(e) => {
            if is_non_tui {
                eprintln!("error: {e:#}");
                std::process::exit(1);
            }
            Err(e)
        }
    }
}
