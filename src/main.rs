mod app;
mod config;
mod constants;
mod debounce;
mod error;
mod filter;
mod input;
mod session;
mod theme;
mod ui;
mod youtube;

use anyhow::{Context, Result};
use clap::{CommandFactory, Parser};
use directories::ProjectDirs;
use ratatui::{
  DefaultTerminal,
  crossterm::event::{self, Event, KeyEventKind},
};
use std::time::Instant;
use tracing::{info, warn};
use tracing_appender::non_blocking::WorkerGuard;
use tracing_subscriber::{EnvFilter, layer::SubscriberExt, util::SubscriberInitExt};

use app::App;
use config::Config;
use constants::constants;
use youtube::PlaylistApi;

// --- CLI ---

#[derive(Parser, Debug)]
#[command(author, version = env!("CARGO_PKG_VERSION"), about, long_about = None)]
struct Args {
  /// Playlist URL to load on startup (e.g. https://www.youtube.com/playlist?list=...)
  url: Option<String>,

  /// YouTube Data API key (falls back to `api_key` in prefs.toml)
  #[arg(long, env = "YOUTUBE_API_KEY", hide_env_values = true)]
  api_key: Option<String>,

  /// Print shell completions and exit
  #[arg(long, value_name = "SHELL")]
  completions: Option<clap_complete::Shell>,
}

// --- Logging ---

/// Log to a daily-rolling file: stdout belongs to the terminal UI.
fn init_logging() -> Option<WorkerGuard> {
  let dirs = ProjectDirs::from("", "", "ypl")?;
  let log_dir = dirs.data_local_dir().join("logs");
  std::fs::create_dir_all(&log_dir).ok()?;

  let (writer, guard) = tracing_appender::non_blocking(tracing_appender::rolling::daily(&log_dir, "ypl.log"));
  tracing_subscriber::registry()
    .with(EnvFilter::try_from_default_env().unwrap_or_else(|_| "ypl=info".into()))
    .with(tracing_subscriber::fmt::layer().with_writer(writer).with_ansi(false))
    .init();
  Some(guard)
}

// --- Main ---

#[tokio::main]
async fn main() -> Result<()> {
  let args = Args::parse();

  if let Some(shell) = args.completions {
    clap_complete::generate(shell, &mut Args::command(), "ypl", &mut std::io::stdout());
    return Ok(());
  }

  let _log_guard = init_logging();
  info!(version = env!("CARGO_PKG_VERSION"), "starting");

  let config = Config::load();
  let api_key = args.api_key.clone().or_else(|| config.api_key.clone()).unwrap_or_default();
  if api_key.is_empty() {
    warn!("no API key configured; requests will be rejected by the API");
  }
  let base_url = config.api_base_url.clone().unwrap_or_else(|| constants().api_base_url.clone());
  let api = PlaylistApi::new(base_url, api_key);

  let default_hook = std::panic::take_hook();
  std::panic::set_hook(Box::new(move |info| {
    ratatui::restore();
    default_hook(info);
  }));

  let mut terminal = ratatui::init();
  let result = run(&mut terminal, App::new(api, config), args.url.as_deref());
  ratatui::restore();
  result
}

fn run(terminal: &mut DefaultTerminal, mut app: App, initial_url: Option<&str>) -> Result<()> {
  if let Some(url) = initial_url.filter(|u| u.contains("youtube.com/playlist")) {
    app.prefill_url(url);
  }

  loop {
    app.tick(Instant::now());

    terminal.draw(|frame| ui::ui(frame, &mut app)).context("Failed to draw frame")?;

    if event::poll(app.next_deadline(Instant::now())).context("Failed to poll terminal events")? {
      match event::read().context("Failed to read terminal event")? {
        Event::Key(key) if key.kind == KeyEventKind::Press => {
          input::handle_key_event(&mut app, key, Instant::now());
        }
        _ => {}
      }
    }

    if app.should_quit {
      break;
    }
  }

  info!("exiting");
  Ok(())
}
