// ghostgraph - live network traffic graph
// Attack-aware host topology with a force-directed terminal layout

mod app;
mod error;
mod graph;
mod theme;
mod traffic;
mod ui;

use anyhow::{Context, Result};
use app::config::{DEFAULT_BATCH_INTERVAL_MS, DEFAULT_FRAME_MS};
use app::event::{handle_key_event, handle_mouse_event};
use app::{AppConfig, AppState, RefreshConfig};
use clap::Parser;
use crossterm::{
    event::{self, DisableMouseCapture, EnableMouseCapture, Event, KeyEventKind},
    execute,
    terminal::{disable_raw_mode, enable_raw_mode, EnterAlternateScreen, LeaveAlternateScreen},
};
use graph::layout::LayoutConfig;
use graph::{GraphConfig, DEFAULT_WINDOW_SIZE};
use ratatui::{backend::CrosstermBackend, Terminal};
use std::fs::File;
use std::io;
use std::path::{Path, PathBuf};
use std::sync::Mutex;
use std::time::Instant;
use tracing::{info, warn};
use traffic::aggregator::DEFAULT_LOG_CAPACITY;
use traffic::source::{FallbackSource, HttpSource, SyntheticSource, DEFAULT_API_URL};
use traffic::worker::FetchWorker;
use traffic::{SubnetPlan, DEFAULT_GATEWAY, DEFAULT_LOCAL_PREFIX};

/// Live network traffic graph in the terminal.
#[derive(Debug, Parser)]
#[command(name = "ghostgraph", version)]
#[command(about = "Visualize live network traffic as an attack-aware force-directed graph")]
struct Cli {
    /// Base URL of the monitoring backend.
    #[arg(long, default_value = DEFAULT_API_URL)]
    api_url: String,

    /// Skip the backend and generate synthetic traffic.
    #[arg(long, default_value_t = false)]
    offline: bool,

    /// Seed for layout jitter and synthetic traffic.
    #[arg(long, default_value_t = 7)]
    seed: u64,

    /// Start with monitoring paused.
    #[arg(long, default_value_t = false)]
    paused: bool,

    /// Interval between traffic batch fetches (milliseconds).
    #[arg(long, default_value_t = DEFAULT_BATCH_INTERVAL_MS)]
    batch_interval_ms: u64,

    /// Interval between simulation steps and redraws (milliseconds).
    #[arg(long, default_value_t = DEFAULT_FRAME_MS)]
    frame_ms: u64,

    /// Number of most recent events that form the graph.
    #[arg(long, default_value_t = DEFAULT_WINDOW_SIZE)]
    window: usize,

    /// Capacity of the recent-event log.
    #[arg(long, default_value_t = DEFAULT_LOG_CAPACITY)]
    log_capacity: usize,

    /// Gateway address; all traffic leaving the local subnet routes through it.
    #[arg(long, default_value = DEFAULT_GATEWAY)]
    gateway: String,

    /// Address prefix of the local subnet.
    #[arg(long, default_value = DEFAULT_LOCAL_PREFIX)]
    local_prefix: String,

    /// Write logs to this file (RUST_LOG controls the level).
    #[arg(long)]
    log_file: Option<PathBuf>,
}

impl Cli {
    fn plan(&self) -> SubnetPlan {
        SubnetPlan::new(self.gateway.clone(), self.local_prefix.clone())
    }

    fn app_config(&self) -> AppConfig {
        AppConfig {
            refresh: RefreshConfig {
                batch_interval_ms: self.batch_interval_ms,
                frame_ms: self.frame_ms,
            },
            graph: GraphConfig {
                plan: self.plan(),
                window_size: self.window,
                ..GraphConfig::default()
            },
            layout: LayoutConfig::default(),
            log_capacity: self.log_capacity,
            start_monitoring: !self.paused,
            seed: self.seed,
        }
    }
}

/// Install a file-backed subscriber; the terminal belongs to the UI
fn init_logging(path: &Path) -> Result<()> {
    let file = File::create(path)
        .with_context(|| format!("failed to create log file {}", path.display()))?;
    tracing_subscriber::fmt()
        .with_env_filter(
            tracing_subscriber::EnvFilter::try_from_default_env()
                .unwrap_or_else(|_| tracing_subscriber::EnvFilter::new("info")),
        )
        .with_writer(Mutex::new(file))
        .with_ansi(false)
        .init();
    Ok(())
}

fn spawn_worker(cli: &Cli) -> Result<FetchWorker> {
    let synthetic = SyntheticSource::new(cli.seed, cli.plan());
    let worker = if cli.offline {
        info!("Offline mode, using synthetic traffic");
        FetchWorker::spawn(synthetic)
    } else {
        match HttpSource::new(cli.api_url.clone()) {
            Ok(http) => {
                info!(url = %cli.api_url, "Using monitoring backend");
                FetchWorker::spawn(FallbackSource::new(http, synthetic))
            }
            Err(e) => {
                warn!(error = %e, "HTTP client unavailable, using synthetic traffic");
                FetchWorker::spawn(synthetic)
            }
        }
    };
    worker.context("failed to start fetch worker")
}

fn main() -> Result<()> {
    let cli = Cli::parse();
    if let Some(path) = &cli.log_file {
        init_logging(path)?;
    }

    let config = cli.app_config();
    config.validate().context("invalid configuration")?;
    let worker = spawn_worker(&cli)?;
    let app = AppState::new(config, Some(worker));

    // Setup terminal
    enable_raw_mode()?;
    let mut stdout = io::stdout();
    execute!(stdout, EnterAlternateScreen, EnableMouseCapture)?;
    let backend = CrosstermBackend::new(stdout);
    let mut terminal = Terminal::new(backend)?;

    // Run app
    let res = run_app(&mut terminal, app);

    // Restore terminal
    disable_raw_mode()?;
    execute!(
        terminal.backend_mut(),
        LeaveAlternateScreen,
        DisableMouseCapture
    )?;
    terminal.show_cursor()?;

    if let Err(err) = res {
        println!("Error: {:?}", err);
    }
    Ok(())
}

fn run_app<B: ratatui::backend::Backend>(
    terminal: &mut Terminal<B>,
    mut app: AppState,
) -> Result<()> {
    let frame = app.config.refresh.frame_interval();
    loop {
        let started = Instant::now();
        app.on_tick();
        terminal.draw(|f| ui::draw(f, &mut app))?;

        if !app.running {
            info!("Shutting down");
            return Ok(());
        }

        if event::poll(frame.saturating_sub(started.elapsed()))? {
            match event::read()? {
                Event::Key(key) if key.kind == KeyEventKind::Press => {
                    handle_key_event(&mut app, key.code);
                }
                Event::Mouse(mouse) => handle_mouse_event(&mut app, mouse),
                _ => {}
            }
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_cli_defaults_produce_valid_config() {
        let cli = Cli::parse_from(["ghostgraph"]);
        let config = cli.app_config();
        assert!(config.validate().is_ok());
        assert!(config.start_monitoring);
        assert_eq!(config.graph.window_size, 200);
        assert_eq!(config.log_capacity, 500);
        assert_eq!(config.graph.plan.gateway, "192.168.1.1");
    }

    #[test]
    fn test_cli_flags_flow_into_config() {
        let cli = Cli::parse_from([
            "ghostgraph",
            "--paused",
            "--window",
            "50",
            "--gateway",
            "10.0.0.1",
            "--local-prefix",
            "10.0.",
            "--batch-interval-ms",
            "250",
        ]);
        let config = cli.app_config();
        assert!(!config.start_monitoring);
        assert_eq!(config.graph.window_size, 50);
        assert_eq!(config.graph.plan, SubnetPlan::new("10.0.0.1", "10.0."));
        assert_eq!(config.refresh.batch_interval_ms, 250);
    }

    #[test]
    fn test_window_beyond_log_is_rejected() {
        let cli = Cli::parse_from(["ghostgraph", "--window", "900"]);
        assert!(cli.app_config().validate().is_err());
    }
}
