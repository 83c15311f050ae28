use std::fs::{self, OpenOptions};
use std::path::{Path, PathBuf};
use std::sync::Mutex;

use anyhow::{anyhow, Result};
use clap::Parser;
use finchat_core::{ChatClient, Config};
use tracing_subscriber::EnvFilter;

mod app;
mod handler;
mod tui;
mod ui;

use app::App;
use tui::{EventHandler, Tui};

#[derive(Parser)]
#[command(name = "finchat")]
#[command(version, about = "Terminal chat client for the finance chatbot API")]
struct Cli {
    /// Backend base URL (overrides config file and FINCHAT_BACKEND_URL)
    #[arg(short, long)]
    backend_url: Option<String>,

    /// Path to the config file
    #[arg(short, long)]
    config: Option<PathBuf>,

    /// Where to write the log (the terminal is taken by the UI)
    #[arg(long)]
    log_file: Option<PathBuf>,

    /// Write the effective settings back to the config file before starting
    #[arg(long)]
    save_config: bool,
}

#[tokio::main]
async fn main() -> Result<()> {
    let cli = Cli::parse();

    let log_file = match cli.log_file {
        Some(path) => path,
        None => default_log_path()?,
    };
    init_logging(&log_file)?;

    let mut config = match &cli.config {
        Some(path) => Config::load_from(path)?,
        None => Config::load()?,
    };
    config.apply_env();
    config.override_backend(cli.backend_url);

    if cli.save_config {
        match &cli.config {
            Some(path) => config.save_to(path)?,
            None => config.save()?,
        }
        tracing::info!("config saved");
    }
    tracing::info!(backend = %config.backend_url, "starting finchat");

    tui::install_panic_hook();
    let mut terminal = tui::init()?;

    let mut events = EventHandler::new();
    let mut app = App::new(ChatClient::from_config(&config), events.sender());
    app.check_backend();

    let result = run(&mut terminal, &mut app, &mut events).await;

    tui::restore()?;
    result
}

async fn run(terminal: &mut Tui, app: &mut App, events: &mut EventHandler) -> Result<()> {
    while !app.should_quit {
        terminal.draw(|frame| ui::render(app, frame))?;

        match events.next().await {
            Some(event) => handler::handle_event(app, event),
            None => break,
        }
    }
    tracing::info!(messages = app.state.messages().len(), "session ended");
    Ok(())
}

fn default_log_path() -> Result<PathBuf> {
    let data_dir = dirs::data_local_dir()
        .ok_or_else(|| anyhow!("Could not determine data directory"))?;

    Ok(data_dir.join("finchat").join("finchat.log"))
}

fn init_logging(path: &Path) -> Result<()> {
    if let Some(parent) = path.parent() {
        fs::create_dir_all(parent)?;
    }
    let file = OpenOptions::new().create(true).append(true).open(path)?;

    tracing_subscriber::fmt()
        .with_env_filter(
            EnvFilter::try_from_default_env()
                .unwrap_or_else(|_| EnvFilter::new("finchat_core=info,finchat_tui=info")),
        )
        .with_writer(Mutex::new(file))
        .with_ansi(false)
        .init();

    Ok(())
}
