//! Registrar - a terminal client for academic records management.
//!
//! Students, faculty and administrators browse and edit the records their
//! role allows through a keyboard-driven interface backed by the REST API.

mod app;
mod ui;

use std::io::{self, Write};
use std::path::Path;
use std::time::{Duration, Instant};

use anyhow::{Context, Result};
use crossterm::{
    event::{self, DisableMouseCapture, EnableMouseCapture, Event, KeyCode, KeyModifiers},
    execute,
    terminal::{disable_raw_mode, enable_raw_mode, EnterAlternateScreen, LeaveAlternateScreen},
};
use ratatui::{backend::CrosstermBackend, Terminal};
use tracing::{debug, info, warn};
use tracing_appender::non_blocking::WorkerGuard;
use tracing_subscriber::{fmt, prelude::*, EnvFilter};

use registrar_core::{Config, Registrar, SessionStore};

use app::{App, AppState};
use ui::input::handle_input;
use ui::render::render;

// ============================================================================
// Constants
// ============================================================================

/// Timeout for polling terminal events (in milliseconds)
const EVENT_POLL_TIMEOUT_MS: u64 = 100;

/// Log file name prefix inside the cache directory
const LOG_FILE_PREFIX: &str = "registrar.log";

/// Command-line mode
enum Command {
    Tui { reset_token: Option<String> },
    Login,
    Logout,
    WhoAmI,
}

fn parse_args(args: &[String]) -> Result<Command> {
    match args.get(1).map(String::as_str) {
        None => Ok(Command::Tui { reset_token: None }),
        Some("--login") => Ok(Command::Login),
        Some("--logout") => Ok(Command::Logout),
        Some("--whoami") => Ok(Command::WhoAmI),
        Some("--reset-token") => {
            let token = args
                .get(2)
                .filter(|t| !t.is_empty())
                .context("--reset-token needs the token from the reset link")?;
            Ok(Command::Tui {
                reset_token: Some(token.clone()),
            })
        }
        Some(other) => anyhow::bail!(
            "Unknown argument '{}'. Usage: registrar [--login | --logout | --whoami | --reset-token TOKEN]",
            other
        ),
    }
}

/// Initialize the tracing subscriber, writing to a daily log file since the
/// terminal belongs to the UI.
fn init_tracing(log_dir: &Path) -> WorkerGuard {
    // Use RUST_LOG env var to control log level (e.g., RUST_LOG=registrar_core=debug)
    let filter = EnvFilter::try_from_default_env().unwrap_or_else(|_| EnvFilter::new("warn"));

    let file_appender = tracing_appender::rolling::daily(log_dir, LOG_FILE_PREFIX);
    let (writer, guard) = tracing_appender::non_blocking(file_appender);

    tracing_subscriber::registry()
        .with(fmt::layer().with_writer(writer).with_ansi(false))
        .with(filter)
        .init();

    guard
}

#[tokio::main]
async fn main() -> Result<()> {
    // Load .env file if present (silently ignore if not found)
    let _ = dotenvy::dotenv();

    let args: Vec<String> = std::env::args().collect();
    let command = parse_args(&args)?;

    let config = Config::load()?;
    let cache_dir = config.cache_dir()?;
    std::fs::create_dir_all(&cache_dir)
        .with_context(|| format!("Failed to create {}", cache_dir.display()))?;

    let _log_guard = init_tracing(&cache_dir);
    info!("Registrar starting");

    let session = SessionStore::persistent(&cache_dir);
    match session.load() {
        Ok(restored) => debug!(restored, "Session loaded"),
        Err(e) => warn!(error = %e, "Failed to load session"),
    }
    let registrar = Registrar::new(&config, session)?;

    match command {
        Command::Login => login_interactive(config, &registrar).await,
        Command::Logout => {
            registrar.logout();
            println!("Signed out.");
            Ok(())
        }
        Command::WhoAmI => {
            whoami(&registrar);
            Ok(())
        }
        Command::Tui { reset_token } => run_tui(App::new(config, registrar, reset_token)).await,
    }
}

async fn run_tui(mut app: App) -> Result<()> {
    // Setup terminal
    enable_raw_mode()?;
    let mut stdout = io::stdout();
    execute!(stdout, EnterAlternateScreen, EnableMouseCapture)?;
    let backend = CrosstermBackend::new(stdout);
    let mut terminal = Terminal::new(backend)?;

    app.start().await;

    // Main loop
    let result = run_app(&mut terminal, &mut app).await;

    // Restore terminal
    disable_raw_mode()?;
    execute!(
        terminal.backend_mut(),
        LeaveAlternateScreen,
        DisableMouseCapture
    )?;
    terminal.show_cursor()?;

    if let Err(e) = result {
        eprintln!("Error: {}", e);
    }

    info!("Registrar shutting down");
    Ok(())
}

async fn run_app(
    terminal: &mut Terminal<CrosstermBackend<io::Stdout>>,
    app: &mut App,
) -> Result<()> {
    loop {
        terminal.draw(|f| render(f, app))?;

        // Poll for events with timeout so cache updates get drawn
        if event::poll(Duration::from_millis(EVENT_POLL_TIMEOUT_MS))? {
            if let Event::Key(key) = event::read()? {
                // Ctrl+C to quit
                if key.code == KeyCode::Char('c') && key.modifiers.contains(KeyModifiers::CONTROL) {
                    return Ok(());
                }

                if handle_input(app, key).await? {
                    return Ok(());
                }
            }
        }

        app.tick(Instant::now());

        if matches!(app.state, AppState::Quitting) {
            return Ok(());
        }
    }
}

// ============================================================================
// Command-line modes
// ============================================================================

/// Interactive login for `--login`.
async fn login_interactive(mut config: Config, registrar: &Registrar) -> Result<()> {
    println!("\n=== Registrar Login ===\n");

    let user_id = match std::env::var("REGISTRAR_USER_ID") {
        Ok(id) if !id.trim().is_empty() => id,
        _ => prompt_user_id(config.last_user_id.as_deref())?,
    };
    let password = match std::env::var("REGISTRAR_PASSWORD") {
        Ok(pw) if !pw.is_empty() => pw,
        _ => rpassword::prompt_password("Password: ")?,
    };

    println!("\nAuthenticating...");
    let outcome = registrar
        .auth()
        .login(&user_id, &password)
        .await
        .map_err(|e| {
            if e.is_unauthenticated() {
                anyhow::anyhow!("Invalid user ID or password")
            } else {
                anyhow::anyhow!(e.user_message())
            }
        })?;

    config.last_user_id = Some(user_id);
    config.save()?;

    println!(
        "Signed in as {} ({}).",
        outcome.user.user_id,
        outcome.user.role.display_name()
    );
    if outcome.needs_password_change {
        println!("A password change is required; run `registrar` to set a new one.");
    }
    Ok(())
}

fn prompt_user_id(last: Option<&str>) -> Result<String> {
    match last {
        Some(last) => print!("User ID [{}]: ", last),
        None => print!("User ID: "),
    }
    io::stdout().flush()?;

    let mut input = String::new();
    io::stdin().read_line(&mut input)?;
    let input = input.trim();

    match (input.is_empty(), last) {
        (true, Some(last)) => Ok(last.to_string()),
        (true, None) => anyhow::bail!("A user ID is required"),
        (false, _) => Ok(input.to_string()),
    }
}

fn whoami(registrar: &Registrar) {
    match registrar.session().current_user() {
        Some(user) => {
            let expires = user
                .expires_at()
                .map(|at| at.with_timezone(&chrono::Local).format("%Y-%m-%d %H:%M").to_string())
                .unwrap_or_else(|| "unknown".to_string());
            println!("{} ({}), session expires {}", user.user_id, user.role.display_name(), expires);
        }
        None => println!("Not signed in. Run `registrar --login`."),
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    fn args(list: &[&str]) -> Vec<String> {
        list.iter().map(|s| s.to_string()).collect()
    }

    #[test]
    fn test_parse_args() {
        assert!(matches!(
            parse_args(&args(&["registrar"])).unwrap(),
            Command::Tui { reset_token: None }
        ));
        assert!(matches!(parse_args(&args(&["registrar", "--login"])).unwrap(), Command::Login));
        assert!(matches!(parse_args(&args(&["registrar", "--logout"])).unwrap(), Command::Logout));
        assert!(matches!(parse_args(&args(&["registrar", "--whoami"])).unwrap(), Command::WhoAmI));
        match parse_args(&args(&["registrar", "--reset-token", "abc"])).unwrap() {
            Command::Tui { reset_token } => assert_eq!(reset_token.as_deref(), Some("abc")),
            _ => panic!("expected the TUI"),
        }
    }

    #[test]
    fn test_parse_args_rejects_unknown_and_missing_values() {
        assert!(parse_args(&args(&["registrar", "--nope"])).is_err());
        assert!(parse_args(&args(&["registrar", "--reset-token"])).is_err());
    }
}
