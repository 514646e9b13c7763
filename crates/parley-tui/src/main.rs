use std::fs::OpenOptions;
use std::path::{Path, PathBuf};
use std::sync::Mutex;

use anyhow::{Context, Result};
use clap::{Parser, ValueEnum};
use parley_core::{Config, Provider};
use tracing::{info, warn};
use tracing_subscriber::{layer::SubscriberExt, util::SubscriberInitExt, EnvFilter};

mod app;
mod handler;
mod tui;
mod ui;

use app::{App, Screen};
use tui::EventHandler;

#[derive(Clone, Copy, ValueEnum)]
enum ProviderArg {
    Ollama,
    Openai,
}

impl From<ProviderArg> for Provider {
    fn from(arg: ProviderArg) -> Self {
        match arg {
            ProviderArg::Ollama => Provider::Ollama,
            ProviderArg::Openai => Provider::OpenAI,
        }
    }
}

#[derive(Clone, Copy, ValueEnum)]
enum ScreenArg {
    Chat,
    Summarize,
}

#[derive(Parser)]
#[command(name = "parley")]
#[command(version, about = "Terminal chat and JSON summarizer backed by a local language model")]
struct Cli {
    /// Engine provider (defaults to the configured one)
    #[arg(short, long, value_enum)]
    provider: Option<ProviderArg>,

    /// Model to load
    #[arg(short, long)]
    model: Option<String>,

    /// Screen to open first
    #[arg(short, long, value_enum, default_value = "chat")]
    screen: ScreenArg,

    /// Base URL of the engine server
    #[arg(long)]
    base_url: Option<String>,

    /// Log file (the terminal belongs to the UI)
    #[arg(long)]
    log_file: Option<PathBuf>,

    /// Write the resolved provider, model and URL back to the config file
    #[arg(long)]
    save_config: bool,
}

fn default_log_path() -> PathBuf {
    dirs::cache_dir()
        .unwrap_or_else(std::env::temp_dir)
        .join("parley")
        .join("parley.log")
}

fn init_logging(path: &Path) -> Result<()> {
    if let Some(parent) = path.parent() {
        std::fs::create_dir_all(parent)?;
    }
    let file = OpenOptions::new()
        .create(true)
        .append(true)
        .open(path)
        .with_context(|| format!("Failed to open log file {:?}", path))?;

    tracing_subscriber::registry()
        .with(
            EnvFilter::try_from_default_env()
                .unwrap_or_else(|_| "parley=info,parley_core=info".into()),
        )
        .with(
            tracing_subscriber::fmt::layer()
                .with_ansi(false)
                .with_writer(Mutex::new(file)),
        )
        .init();
    Ok(())
}

#[tokio::main]
async fn main() -> Result<()> {
    let cli = Cli::parse();

    let log_path = cli.log_file.clone().unwrap_or_else(default_log_path);
    init_logging(&log_path)?;

    // Load config, then let flags override it
    let mut config = Config::load().unwrap_or_else(|e| {
        warn!(error = %e, "ignoring unreadable config");
        Config::new()
    });
    if let Some(provider) = cli.provider {
        config.provider = Some(Provider::from(provider).as_str().to_string());
    }
    if let Some(model) = cli.model {
        config.default_model = Some(model);
    }
    let provider = config.provider();
    if let Some(url) = cli.base_url {
        match provider {
            Provider::Ollama => config.ollama_url = Some(url),
            Provider::OpenAI => config.openai_base_url = Some(url),
        }
    }

    if cli.save_config {
        config.save()?;
        info!(path = ?Config::get_config_path()?, "saved config");
    }

    let backend = provider.backend(&config)?;
    let model = config.model().to_string();
    info!(provider = provider.as_str(), model = %model, "starting parley");

    let mut terminal = tui::init()?;
    tui::install_panic_hook();

    let mut events = EventHandler::new();
    let mut app = App::new(provider, model, backend, events.sender());
    app.show(match cli.screen {
        ScreenArg::Chat => Screen::Chat,
        ScreenArg::Summarize => Screen::Summarize,
    });

    let result = run(&mut terminal, &mut app, &mut events).await;

    tui::restore()?;
    result
}

async fn run(terminal: &mut tui::Tui, app: &mut App, events: &mut EventHandler) -> Result<()> {
    while !app.should_quit {
        terminal.draw(|frame| ui::render(app, frame))?;

        match events.next().await {
            Some(event) => handler::handle_event(app, event)?,
            None => break,
        }
    }
    Ok(())
}
