//! Tour Buddy CLI - plan trips, packing lists, expenses and memories from
//! the terminal.

mod app;
mod commands;
mod resources;

use std::io;
use std::path::PathBuf;

use anyhow::{bail, Result};
use tracing::{info, warn};
use tracing_appender::non_blocking::WorkerGuard;
use tracing_subscriber::{fmt, prelude::*, EnvFilter};

use tourbuddy_core::config::Config;
use tourbuddy_core::{Memory, PackingItem};

use app::App;

/// Prefix for daily log files in the cache directory
const LOG_FILE_PREFIX: &str = "tourbuddy.log";

const USAGE: &str = "\
Usage: tourbuddy <command> [args]

Account:
  login                         Sign in with email and password
  signup                        Create an account
  logout                        Sign out and forget the stored password

Records (action defaults to list):
  trips    [list|add|edit <id>|delete <id>]   --name <text> --date <YYYY-MM-DD HH:MM>
  packing  [list|add|edit <id>|delete <id>]   --item <text>
  expenses [list|add|edit <id>|delete <id>|summary]   --category <text> --amount <number>
  memories [list|add|edit <id>|delete <id>]   --uri <path> --note <text>

Travel:
  reminders                     Show upcoming trip reminders
  destinations [popular|beaches|mountains|historical]
  weather <city>                Link to a weather search for a city
  nearby <attractions|restaurants|parks> <lat> <lon>
";

/// Initialize the tracing subscriber for logging.
///
/// Logs go to stderr, filtered by `RUST_LOG` (default `warn`). With
/// `log_to_file` set, a daily rolling file in `log_dir` is written too; the
/// returned guard must live until exit so buffered lines are flushed.
fn init_tracing(log_dir: Option<PathBuf>) -> Option<WorkerGuard> {
    let filter = EnvFilter::try_from_default_env()
        .unwrap_or_else(|_| EnvFilter::new("warn"));

    let (file_layer, guard) = match log_dir {
        Some(dir) => {
            let appender = tracing_appender::rolling::daily(dir, LOG_FILE_PREFIX);
            let (writer, guard) = tracing_appender::non_blocking(appender);
            let layer = fmt::layer().with_ansi(false).with_writer(writer);
            (Some(layer), Some(guard))
        }
        None => (None, None),
    };

    tracing_subscriber::registry()
        .with(fmt::layer().with_writer(io::stderr))
        .with(file_layer)
        .with(filter)
        .init();
    guard
}

#[tokio::main]
async fn main() -> Result<()> {
    // Load .env file if present (silently ignore if not found)
    let _ = dotenvy::dotenv();

    let config = Config::load();
    let log_dir = config
        .as_ref()
        .ok()
        .filter(|c| c.log_to_file)
        .and_then(|c| c.cache_dir().ok());
    let _log_guard = init_tracing(log_dir);
    info!("Tour Buddy starting");

    let args: Vec<String> = std::env::args().skip(1).collect();
    let Some(command) = args.first().map(String::as_str) else {
        print!("{}", USAGE);
        return Ok(());
    };
    if matches!(command, "help" | "--help" | "-h") {
        print!("{}", USAGE);
        return Ok(());
    }

    let config = config.unwrap_or_else(|e| {
        warn!(error = %e, "Failed to load config, using defaults");
        Config::default()
    });
    let mut app = App::new(config);
    app.announce_due_reminders().await;

    let rest = &args[1..];
    let result = match command {
        "login" => app.login_interactive().await,
        "signup" => app.signup_interactive().await,
        "logout" => app.logout(),
        "trips" => commands::run_trips(&mut app, rest).await,
        "packing" => commands::run_records::<PackingItem>(&mut app, rest).await,
        "expenses" => commands::run_expenses(&mut app, rest).await,
        "memories" => commands::run_records::<Memory>(&mut app, rest).await,
        "reminders" => commands::show_reminders(&app).await,
        "destinations" => commands::show_destinations(&app, rest).await,
        "weather" => commands::show_weather(rest),
        "nearby" => commands::show_nearby(rest),
        other => {
            eprint!("{}", USAGE);
            bail!("Unknown command: {}", other)
        }
    };

    info!("Tour Buddy shutting down");
    result
}

