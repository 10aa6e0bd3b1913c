//! CLI host for the arrival display engine.
//!
//! Stands in for the UI layer: it wires terminal input and timers to the
//! controller's entry points and prints slot updates.

mod terminal;

use crate::terminal::TerminalSink;
use anyhow::{Context, Result};
use clap::{Parser, Subcommand};
use my_stop::{
    aggregate::Aggregator,
    clock::{Clock, SystemClock},
    config::Config,
    display::{DisplayController, SurfaceId},
    fetch::{BasicClient, HttpFeedClient},
    format::render_slot,
    runtime::{Command, run},
    source::{Source, SourceId, SourceResult},
};
use std::ffi::OsStr;
use std::path::{Path, PathBuf};
use std::sync::Arc;
use std::time::Duration;
use tokio::io::{AsyncBufReadExt, BufReader};
use tokio::sync::mpsc;
use tracing::{info, warn};
use tracing_appender::non_blocking::WorkerGuard;
use tracing_subscriber::{
    EnvFilter, Layer,
    fmt::{self, format::FmtSpan},
    layer::SubscriberExt,
    util::SubscriberInitExt,
};

#[derive(Parser)]
#[command(name = "my_stop")]
#[command(about = "Real-time transit arrivals for your stop", long_about = None)]
struct Cli {
    /// JSON config file (defaults to $MY_STOP_CONFIG, then the built-in layout)
    #[arg(short, long, global = true)]
    config: Option<PathBuf>,

    /// Transport timeout for each feed request, in seconds
    #[arg(long, global = true, default_value_t = 30)]
    timeout: u64,

    /// Maximum number of concurrent feed requests
    #[arg(long, global = true, default_value_t = 4)]
    concurrency: usize,

    #[command(subcommand)]
    command: Commands,
}

#[derive(Subcommand)]
enum Commands {
    /// List configured sources
    Sources,
    /// Fetch sources once and print their arrivals
    Arrivals {
        /// Source ids to fetch (default: all)
        #[arg(short, long = "source", value_name = "ID")]
        sources: Vec<String>,

        /// Print parsed records as JSON instead of display text
        #[arg(long, default_value_t = false)]
        json: bool,
    },
    /// Show a surface and refresh it periodically until Ctrl+C
    Watch {
        #[arg(short, long, default_value = "widget")]
        surface: String,

        /// Refresh interval in seconds
        #[arg(short, long, default_value_t = 60)]
        interval: u64,
    },
    /// Read `toggle`, `refresh` and `select` commands from stdin
    Interactive,
}

#[tokio::main]
async fn main() -> Result<()> {
    dotenvy::dotenv().ok();
    let _file_guard = init_tracing()?;

    let cli = Cli::parse();
    let config = load_config(cli.config)?;
    let clock: Arc<dyn Clock> = Arc::new(SystemClock);
    let client = BasicClient::with_timeout(Duration::from_secs(cli.timeout))
        .context("failed to build HTTP client")?;
    let aggregator =
        Aggregator::new(HttpFeedClient::new(client), clock.clone()).with_concurrency(cli.concurrency);

    match cli.command {
        Commands::Sources => {
            for source in &config.sources {
                info!(
                    source = %source.id,
                    url = %source.url,
                    fields = ?source.display_fields,
                    "Source"
                );
            }
            info!(total = config.sources.len(), "Source list");
        }
        Commands::Arrivals { sources, json } => {
            let selected = select_sources(&config, &sources)?;
            let results = aggregator.fetch_all(&selected).await;
            let now = clock.now();

            for source in &selected {
                let Some(result) = results.get(&source.id) else {
                    continue;
                };
                println!("== {}", source.id);
                match (json, result) {
                    (true, SourceResult::Success(records)) => {
                        println!("{}", serde_json::to_string_pretty(records)?);
                    }
                    _ => println!("{}", render_slot(result, None, source.display_fields, now).text),
                }
            }
        }
        Commands::Watch { surface, interval } => {
            let surface = SurfaceId::new(surface);
            if config.surfaces.iter().all(|s| s.id != surface) {
                anyhow::bail!("unknown surface '{surface}'");
            }

            let controller = DisplayController::new(&config, TerminalSink, clock)?;
            let (tx, rx) = mpsc::channel(16);
            tx.send(Command::Toggle(surface.clone())).await?;

            let ticker = tokio::spawn(async move {
                let mut ticks = tokio::time::interval(Duration::from_secs(interval.max(1)));
                ticks.tick().await;
                let ctrl_c = tokio::signal::ctrl_c();
                tokio::pin!(ctrl_c);

                loop {
                    tokio::select! {
                        _ = ticks.tick() => {
                            if tx.send(Command::Refresh(surface.clone())).await.is_err() {
                                break;
                            }
                        }
                        _ = &mut ctrl_c => {
                            info!("Interrupted, shutting down");
                            break;
                        }
                    }
                }
            });

            run(controller, aggregator, rx).await;
            ticker.await?;
        }
        Commands::Interactive => {
            let controller = DisplayController::new(&config, TerminalSink, clock)?;
            let (tx, rx) = mpsc::channel(16);

            let reader = tokio::spawn(async move {
                let mut lines = BufReader::new(tokio::io::stdin()).lines();
                while let Ok(Some(line)) = lines.next_line().await {
                    let line = line.trim();
                    if line.is_empty() {
                        continue;
                    }
                    if line == "quit" {
                        break;
                    }
                    match Command::parse(line) {
                        Some(command) => {
                            if tx.send(command).await.is_err() {
                                break;
                            }
                        }
                        None => warn!(line, "Unrecognized command"),
                    }
                }
            });

            run(controller, aggregator, rx).await;
            reader.await?;
        }
    }

    Ok(())
}

/// Colored stderr logs plus a JSON daily-rolling log file.
fn init_tracing() -> Result<WorkerGuard> {
    let log_file_path =
        std::env::var("LOG_FILE_PATH").unwrap_or_else(|_| "logs/my_stop.log".to_string());
    let log_dir = Path::new(&log_file_path)
        .parent()
        .unwrap_or(Path::new("logs"));
    let log_file_name = Path::new(&log_file_path)
        .file_name()
        .unwrap_or(OsStr::new("my_stop.log"));

    let file_appender = tracing_appender::rolling::daily(log_dir, log_file_name);
    let (non_blocking_file, guard) = tracing_appender::non_blocking(file_appender);

    let stderr_layer = fmt::layer()
        .with_target(true)
        .with_span_events(FmtSpan::CLOSE)
        .with_ansi(true)
        .with_writer(std::io::stderr)
        .with_filter(EnvFilter::from_env("RUST_LOG").add_directive("info".parse()?));

    let json_layer = fmt::layer()
        .json()
        .with_current_span(true)
        .with_span_list(true)
        .with_writer(non_blocking_file)
        .with_filter(EnvFilter::from_env("RUST_LOG_JSON").add_directive("debug".parse()?));

    tracing_subscriber::registry()
        .with(stderr_layer)
        .with(json_layer)
        .init();

    Ok(guard)
}

fn load_config(path: Option<PathBuf>) -> Result<Config> {
    match path.or_else(|| std::env::var_os("MY_STOP_CONFIG").map(PathBuf::from)) {
        Some(path) => {
            let config = Config::load(&path)?;
            info!(path = %path.display(), "Config loaded");
            Ok(config)
        }
        None => Ok(Config::default()),
    }
}

fn select_sources(config: &Config, ids: &[String]) -> Result<Vec<Source>> {
    if ids.is_empty() {
        return Ok(config.sources.clone());
    }

    ids.iter()
        .map(|id| {
            config
                .source(&SourceId::new(id.as_str()))
                .cloned()
                .with_context(|| format!("unknown source '{id}'"))
        })
        .collect()
}
