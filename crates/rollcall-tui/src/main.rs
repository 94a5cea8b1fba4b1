//! `rollcall-tui`: terminal dashboard for the rollcall attendance service.
//!
//! One list screen per collection (Instructors, Emails, RFID readers,
//! RFID tags, Backups), each driven by a `rollcall_core::ListController`.
//! Screens are navigable via number keys (1-5) or Tab.
//!
//! Logs go to a file under the platform data directory so the terminal
//! is never written to behind ratatui's back.

mod action;
mod app;
mod component;
mod event;
mod screen;
mod screens;
mod session;
mod theme;
mod tui;
mod widgets;

use std::path::PathBuf;

use clap::Parser;
use color_eyre::eyre::{Result, WrapErr};
use tracing::info;
use tracing_appender::non_blocking::WorkerGuard;
use tracing_subscriber::{EnvFilter, fmt, layer::SubscriberExt, util::SubscriberInitExt};

use crate::app::App;
use crate::session::Session;

/// Terminal dashboard for school attendance administration.
#[derive(Parser, Debug)]
#[command(name = "rollcall-tui", version, about)]
pub struct Cli {
    /// Config profile to use
    #[arg(short = 'p', long, env = "ROLLCALL_PROFILE")]
    profile: Option<String>,

    /// Service URL, overriding the profile (e.g. https://school.example/api/)
    #[arg(short = 's', long, env = "ROLLCALL_SERVER")]
    server: Option<String>,

    /// API token, overriding the profile
    #[arg(long, env = "ROLLCALL_TOKEN", hide_env_values = true)]
    token: Option<String>,

    /// Accept invalid TLS certificates
    #[arg(short = 'k', long, env = "ROLLCALL_INSECURE")]
    insecure: bool,

    /// Log file path (defaults to rollcall-tui.log in the data directory)
    #[arg(long)]
    log_file: Option<PathBuf>,

    /// Increase log verbosity (-v info, -vv debug, -vvv trace)
    #[arg(short, long, action = clap::ArgAction::Count)]
    verbose: u8,
}

/// File-only tracing. Returns the guard that flushes the writer on drop.
fn setup_tracing(cli: &Cli) -> WorkerGuard {
    let log_level = match cli.verbose {
        0 => "warn",
        1 => "info",
        2 => "debug",
        _ => "trace",
    };

    let filter = EnvFilter::try_from_default_env().unwrap_or_else(|_| {
        EnvFilter::new(format!("rollcall_tui={log_level},rollcall_core={log_level}"))
    });

    let log_file = cli
        .log_file
        .clone()
        .unwrap_or_else(|| rollcall_config::log_dir().join("rollcall-tui.log"));
    let log_dir = log_file
        .parent()
        .map_or_else(rollcall_config::log_dir, std::path::Path::to_path_buf);
    let log_filename = log_file
        .file_name()
        .unwrap_or(std::ffi::OsStr::new("rollcall-tui.log"));

    let file_appender = tracing_appender::rolling::never(log_dir, log_filename);
    let (non_blocking, guard) = tracing_appender::non_blocking(file_appender);

    tracing_subscriber::registry()
        .with(filter)
        .with(
            fmt::layer()
                .with_writer(non_blocking)
                .with_ansi(false)
                .with_target(true)
                .with_thread_ids(true),
        )
        .init();

    guard
}

#[tokio::main]
async fn main() -> Result<()> {
    let cli = Cli::parse();

    // Hooks first so a panic during setup still restores the terminal.
    tui::install_hooks()?;

    let _log_guard = setup_tracing(&cli);

    // Resolve before touching the terminal: config errors print normally.
    let session = Session::connect(&cli).wrap_err("could not set up the service connection")?;
    info!(server = %session.server(), "starting rollcall-tui");

    let mut app = App::new(&session);
    app.run().await?;

    Ok(())
}
