use std::fs::{self, OpenOptions};
use std::path::PathBuf;
use std::sync::{Arc, Mutex};

use anyhow::{Context, Result};
use clap::Parser;
use tracing::{info, warn};
use tracing_subscriber::EnvFilter;

mod app;
mod config;
mod download;
mod error;
mod gemini;
mod generator;
mod handler;
mod preview;
mod request;
mod session;
mod style;
mod tui;
mod ui;

use app::App;
use config::Config;
use gemini::GeminiClient;
use generator::Generator;
use style::{parse_style, AvatarStyle};

#[derive(Parser)]
#[command(name = "avatar-forge", version)]
#[command(about = "Generate AI avatars in your terminal with Gemini image models")]
struct Cli {
    /// Gemini model to use
    #[arg(short, long)]
    model: Option<String>,
    /// Directory saved avatars are written to
    #[arg(short, long)]
    output_dir: Option<PathBuf>,
    /// Initial art style (e.g. anime, cyberpunk, pixel-art)
    #[arg(short, long, value_parser = parse_style)]
    style: Option<AvatarStyle>,
    /// Initial number of images (1-4)
    #[arg(short = 'n', long, value_parser = clap::value_parser!(u8).range(1..=4))]
    count: Option<u8>,
    /// Persist the options above as defaults in the config file
    #[arg(long)]
    save_defaults: bool,
}

#[tokio::main]
async fn main() -> Result<()> {
    let cli = Cli::parse();
    init_logging();

    let mut config = Config::load().unwrap_or_else(|e| {
        warn!(error = %e, "could not read config, using defaults");
        Config::new()
    });
    apply_overrides(&mut config, &cli);
    if cli.save_defaults {
        config.save().context("Could not save config")?;
    }

    let api_key = config.resolve_api_key().context(
        "No Gemini API key found. Set GEMINI_API_KEY (or API_KEY), or add \"api_key\" to the config file.",
    )?;
    let client = GeminiClient::new(&api_key, config.model()).with_base_url(config.base_url());

    info!(model = config.model(), "starting");

    tui::install_panic_hook();
    let mut terminal = tui::init()?;
    let mut events = tui::EventHandler::new();
    let mut app = App::new(&config, Generator::new(Arc::new(client)), events.sender());

    let result = run(&mut terminal, &mut app, &mut events).await;
    tui::restore()?;
    result
}

async fn run(terminal: &mut tui::Tui, app: &mut App, events: &mut tui::EventHandler) -> Result<()> {
    while !app.should_quit {
        terminal.draw(|frame| ui::render(app, frame))?;
        match events.next().await {
            Some(event) => handler::handle_event(app, event)?,
            None => break,
        }
    }
    Ok(())
}

fn apply_overrides(config: &mut Config, cli: &Cli) {
    if let Some(model) = &cli.model {
        config.model = Some(model.clone());
    }
    if let Some(dir) = &cli.output_dir {
        config.output_dir = Some(dir.clone());
    }
    if let Some(style) = cli.style {
        config.default_style = Some(style.as_str().to_string());
    }
    if let Some(count) = cli.count {
        config.default_count = Some(count);
    }
}

/// Log to a file; the terminal belongs to the UI.
fn init_logging() {
    let Some(path) = Config::log_path() else { return };
    if let Some(parent) = path.parent() {
        if fs::create_dir_all(parent).is_err() {
            return;
        }
    }
    let Ok(file) = OpenOptions::new().create(true).append(true).open(&path) else {
        return;
    };

    let filter = EnvFilter::try_from_default_env().unwrap_or_else(|_| EnvFilter::new("info"));
    let _ = tracing_subscriber::fmt()
        .with_env_filter(filter)
        .with_writer(Mutex::new(file))
        .with_ansi(false)
        .try_init();
}
