mod app;
mod backend;
mod catalog;
mod config;
mod constants;
mod download;
mod filter;
mod handoff;
mod history;
mod input;
mod notify;
mod player;
mod preview;
mod selection;
mod state;
mod theme;
mod timers;
mod ui;

use anyhow::{Context, Result};
use clap::{CommandFactory, Parser};
use clap_complete::Shell;
use ratatui::{
  DefaultTerminal,
  crossterm::event::{self, Event, KeyEventKind},
};
use std::sync::Arc;
use std::time::Duration;
use tracing::info;
use tracing_appender::non_blocking::WorkerGuard;
use tracing_subscriber::EnvFilter;

use app::{App, Settings};
use backend::{ContentType, HttpBackend};
use config::Config;
use handoff::HandoffMode;

// --- CLI ---

#[derive(Parser, Debug)]
#[command(author, version = env!("CARGO_PKG_VERSION"), about, long_about = None)]
struct Args {
  /// Backend base URL (overrides the config file)
  #[arg(short, long)]
  base_url: Option<String>,

  /// Which channel tab to fetch
  #[arg(short, long, value_enum)]
  content_type: Option<ContentType>,

  /// How downloads are handed off: 'browser' or 'direct'
  #[arg(long, value_enum)]
  handoff: Option<HandoffMode>,

  /// Log filter, e.g. 'debug' or 'tube_snatch=trace' (RUST_LOG wins when set)
  #[arg(long, default_value = "info")]
  log_level: String,

  /// Print shell completions and exit
  #[arg(long, value_name = "SHELL")]
  completions: Option<Shell>,
}

// --- Logging ---

/// Log to a file in the data directory; the terminal belongs to the UI.
fn init_logging(level: &str) -> Result<WorkerGuard> {
  let dir = config::data_dir();
  std::fs::create_dir_all(&dir).with_context(|| format!("Failed to create {}", dir.display()))?;
  let appender = tracing_appender::rolling::never(&dir, "tube-snatch.log");
  let (writer, guard) = tracing_appender::non_blocking(appender);
  let filter = EnvFilter::try_from_default_env().unwrap_or_else(|_| EnvFilter::new(level));
  tracing_subscriber::fmt().with_env_filter(filter).with_writer(writer).with_ansi(false).init();
  Ok(guard)
}

// --- Main ---

#[tokio::main]
async fn main() -> Result<()> {
  let args = Args::parse();

  if let Some(shell) = args.completions {
    let mut cmd = Args::command();
    let name = cmd.get_name().to_string();
    clap_complete::generate(shell, &mut cmd, name, &mut std::io::stdout());
    return Ok(());
  }

  let _log_guard = init_logging(&args.log_level)?;

  let mut config = Config::load();
  if let Some(url) = args.base_url {
    config.base_url = Some(url);
  }
  if let Some(content_type) = args.content_type {
    config.content_type = Some(content_type);
  }
  if let Some(handoff) = args.handoff {
    config.handoff = Some(handoff);
  }

  let settings = Settings::from_config(&config);
  let handoff = config.handoff.unwrap_or_default();
  info!(base_url = %settings.base_url, handoff = handoff.label(), "starting");
  let backend = Arc::new(HttpBackend::new(&settings.base_url, handoff, config.downloads_dir()));

  let default_hook = std::panic::take_hook();
  std::panic::set_hook(Box::new(move |info| {
    ratatui::restore();
    default_hook(info);
  }));

  let mut terminal = ratatui::init();
  let result = run(&mut terminal, settings, backend).await;
  ratatui::restore();
  result
}

async fn run(terminal: &mut DefaultTerminal, settings: Settings, backend: Arc<HttpBackend>) -> Result<()> {
  let mut app = App::new(settings, backend);
  app.trigger_connectivity();
  app.trigger_stored();

  loop {
    app.check_pending().await?;

    terminal.draw(|frame| ui::ui(frame, &mut app))?;

    if event::poll(Duration::from_millis(100))? {
      match event::read()? {
        Event::Key(key) if key.kind == KeyEventKind::Press => {
          input::handle_key_event(&mut app, key).await?;
        }
        _ => {}
      }
    }

    if app.should_quit {
      break;
    }
  }

  app.shutdown().await?;
  info!("exiting");
  Ok(())
}

#[cfg(test)]
mod tests {
  use super::*;

  #[test]
  fn cli_is_well_formed() {
    Args::command().debug_assert();
  }

  #[test]
  fn parses_overrides() {
    let args = Args::parse_from(["tube-snatch", "--base-url", "http://h:1", "--content-type", "streams", "--handoff", "direct"]);
    assert_eq!(args.base_url.as_deref(), Some("http://h:1"));
    assert_eq!(args.content_type, Some(ContentType::Streams));
    assert_eq!(args.handoff, Some(HandoffMode::Direct));
    assert_eq!(args.log_level, "info");
  }
}
