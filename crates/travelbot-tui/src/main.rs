use std::fs::{File, OpenOptions};
use std::path::Path;
use std::sync::{Arc, Mutex};

use anyhow::Result;
use tracing_subscriber::EnvFilter;
use travelbot_core::{CompletionClient, Config, GeminiBackend, SessionController};

mod app;
mod handler;
mod tui;
mod ui;

use app::App;
use tui::{EventHandler, Tui};

/// Environment variable holding the tracing filter.
const LOG_ENV: &str = "TRAVELBOT_LOG";

#[tokio::main]
async fn main() -> Result<()> {
    if let Err(e) = init_logging() {
        eprintln!("travelbot: logging disabled: {:#}", e);
    }

    let config = Config::load().unwrap_or_else(|e| {
        tracing::warn!(error = %e, "could not read config, using defaults");
        Config::new()
    });

    let api_url = config.resolve_api_url()?;
    let backend = GeminiBackend::with_timeout(&api_url, config.request_timeout())?;
    let session = SessionController::with_config(CompletionClient::new(Arc::new(backend)), &config);
    let mut app = App::new(session, config.thinking_delay());

    tracing::info!(policy = ?config.failure_policy, "starting TravelBot");

    tui::install_panic_hook();
    let mut terminal = tui::init()?;
    let result = run(&mut terminal, &mut app).await;
    tui::restore()?;

    result
}

async fn run(terminal: &mut Tui, app: &mut App) -> Result<()> {
    let mut events = EventHandler::new();

    while !app.should_quit {
        terminal.draw(|frame| ui::render(app, frame))?;

        match events.next().await {
            Some(event) => handler::handle_event(app, event).await?,
            None => break,
        }
    }

    Ok(())
}

/// Logs go to `<config_dir>/travelbot/travelbot.log`; the terminal belongs to the UI.
/// On failure the app runs without a subscriber.
fn init_logging() -> Result<()> {
    let file = open_log_file(&Config::config_dir()?)?;

    let env_filter = EnvFilter::try_from_env(LOG_ENV).unwrap_or_else(|_| EnvFilter::new("info"));

    tracing_subscriber::fmt()
        .with_env_filter(env_filter)
        .with_ansi(false)
        .with_writer(Mutex::new(file))
        .try_init()
        .map_err(anyhow::Error::msg)?;

    Ok(())
}

fn open_log_file(dir: &Path) -> Result<File> {
    std::fs::create_dir_all(dir)?;
    let file = OpenOptions::new()
        .create(true)
        .append(true)
        .open(dir.join("travelbot.log"))?;
    Ok(file)
}

#[cfg(test)]
mod tests {
    use super::*;
    use tempfile::tempdir;

    #[test]
    fn test_log_file_is_created_in_config_dir() {
        let dir = tempdir().unwrap();
        let nested = dir.path().join("travelbot");
        open_log_file(&nested).unwrap();
        assert!(nested.join("travelbot.log").exists());
    }

    #[test]
    fn test_unwritable_log_dir_is_an_error_not_a_panic() {
        let dir = tempdir().unwrap();
        let blocker = dir.path().join("travelbot");
        std::fs::write(&blocker, "not a directory").unwrap();
        assert!(open_log_file(&blocker).is_err());
    }
}
