use std::fs;
use std::path::{Path, PathBuf};
use std::sync::Arc;

use anyhow::{anyhow, Result};
use clap::Parser;
use tracing::{info, warn};
use tracing_subscriber::EnvFilter;

mod app;
mod assistant;
mod boot;
mod command;
mod config;
mod dispatcher;
mod engine;
mod format;
mod handler;
mod history;
mod markup;
mod output;
mod prefs;
mod sound;
mod surface;
mod tui;
mod ui;

use app::App;
use assistant::{OpenAiAssistants, QueryPipeline};
use config::Config;
use dispatcher::Dispatcher;
use output::Output;
use prefs::{FileStore, Preferences};
use sound::KeyClick;
use surface::SharedSurface;
use tui::EventHandler;

#[derive(Parser)]
#[command(name = "ai-terminal")]
#[command(about = "Retro terminal front end for a hosted AI assistant")]
#[command(version)]
struct Args {
    /// Path to the config file
    #[arg(short, long)]
    config: Option<PathBuf>,

    /// Directory for saved history, settings and the log file
    #[arg(long)]
    data_dir: Option<PathBuf>,

    /// Skip the boot animation
    #[arg(long)]
    skip_boot: bool,

    /// Write the effective config file (without env overrides) and exit
    #[arg(long)]
    write_config: bool,
}

fn data_dir(args: &Args) -> Result<PathBuf> {
    match &args.data_dir {
        Some(dir) => Ok(dir.clone()),
        None => Ok(dirs::data_dir()
            .ok_or_else(|| anyhow!("Could not determine data directory"))?
            .join("ai-terminal")),
    }
}

fn init_logging(dir: &Path) -> Result<()> {
    fs::create_dir_all(dir)?;
    let log_file = fs::File::create(dir.join("ai-terminal.log"))?;

    // The terminal owns stdout/stderr, so logs go to a file
    let filter = EnvFilter::try_from_env("AI_TERMINAL_LOG").unwrap_or_else(|_| EnvFilter::new("info"));
    tracing_subscriber::fmt()
        .with_env_filter(filter)
        .with_writer(log_file)
        .with_ansi(false)
        .init();
    Ok(())
}

#[tokio::main]
async fn main() -> Result<()> {
    let args = Args::parse();

    let mut config = Config::load(args.config.as_deref())?;
    if args.write_config {
        config.save(args.config.as_deref())?;
        println!("Config written");
        return Ok(());
    }
    config.apply_env();

    let data_dir = data_dir(&args)?;
    init_logging(&data_dir)?;
    info!(version = env!("CARGO_PKG_VERSION"), "starting");

    let prefs = Preferences::new(FileStore::open(data_dir.join("storage.json"))?);

    let api = OpenAiAssistants::new(
        config.api_key.as_deref().unwrap_or_default(),
        config.assistant_id.as_deref().unwrap_or_default(),
        &config.base_url,
    );
    let pipeline = QueryPipeline::new(api, config.poll_settings());

    let surface = SharedSurface::new();
    let output = Output::new(surface.clone(), Arc::new(KeyClick::spawn()));
    let dispatcher = Dispatcher::new(pipeline, prefs, output, boot::BOOT_SCRIPT, &config.prompt);

    tui::install_panic_hook();
    let mut terminal = tui::init()?;
    let mut events = EventHandler::new(tui::FRAME_RATE);

    let (keys, engine) = engine::spawn(dispatcher, !args.skip_boot);
    let mut app = App::new(surface, keys, &config.prompt);

    let result = run(&mut terminal, &mut app, &mut events).await;

    tui::restore()?;
    engine.abort();
    if let Err(e) = &result {
        warn!("terminal loop ended with error: {}", e);
    }
    info!("exiting");
    result
}

async fn run(terminal: &mut tui::Tui, app: &mut App, events: &mut EventHandler) -> Result<()> {
    while !app.should_quit {
        terminal.draw(|frame| ui::render(app, frame))?;

        match events.next().await {
            Some(event) => handler::handle_event(app, event),
            None => break,
        }
    }
    Ok(())
}
