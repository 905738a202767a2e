use std::collections::HashMap;
use std::io;
use std::sync::Arc;
use std::time::Duration;

use anyhow::Result;
use clap::Parser;
use crossterm::event::{DisableMouseCapture, EnableMouseCapture};
use crossterm::execute;
use crossterm::terminal::{
    EnterAlternateScreen, LeaveAlternateScreen, disable_raw_mode, enable_raw_mode,
};
use dtop::*;
use ratatui::Terminal;
use ratatui::backend::CrosstermBackend;
use tokio::sync::mpsc;
use tracing_subscriber::EnvFilter;
use tracing_subscriber::fmt::time::FormatTime;

use dtop::models::{AppEvent, QuitReason};

/// All producers share one bounded channel; on full they await rather than
/// drop.
const EVENT_CHANNEL_CAPACITY: usize = 1024;
/// How long exiting gives producer tasks to observe the closed channel.
const SHUTDOWN_GRACE: Duration = Duration::from_millis(200);

/// Timestamps for the debug log file. Local wall-clock time with the UTC
/// offset, so entries line up with what the engine hosts report.
struct LogTimestamp;

impl FormatTime for LogTimestamp {
    fn format_time(&self, w: &mut tracing_subscriber::fmt::format::Writer<'_>) -> std::fmt::Result {
        write!(w, "{}", chrono::Local::now().format("%Y-%m-%d %H:%M:%S%.3f %:z"))
    }
}

#[derive(Parser, Debug)]
#[command(name = "dtop", version, about = "Terminal dashboard for containers across Docker hosts")]
struct Args {
    /// Engine endpoint to watch: "local", "tcp://host[:port]", or
    /// "ssh://[user@]host[:port]". Repeatable; overrides config-file hosts.
    #[arg(short = 'H', long = "host")]
    host: Vec<String>,
}

#[tokio::main]
async fn main() -> Result<()> {
    let args = Args::parse();
    init_logging()?;
    tracing::info!("{} {} starting", version::NAME, version::VERSION);

    let (config, config_path) = config::AppConfig::load()?;
    if let Some(path) = &config_path {
        tracing::info!("loaded config from {}", path.display());
    }
    let specs = config::resolve_hosts(config, &args.host)?;
    let configured_hosts = specs.len();

    let (tx, mut rx) = mpsc::channel::<AppEvent>(EVENT_CHANNEL_CAPACITY);

    let mut hosts = HashMap::new();
    let mut watchers = Vec::new();
    for spec in &specs {
        match docker_repo::DockerHost::connect(spec) {
            Ok(host) => {
                hosts.insert(host.host_id.clone(), host.clone());
                watchers.push(tokio::spawn(docker_repo::watch_host(host, tx.clone())));
            }
            Err(e) => {
                eprintln!("Cannot set up host '{}': {}", spec.raw, e);
            }
        }
    }
    anyhow::ensure!(
        !hosts.is_empty(),
        "no usable hosts; check --host values and the config file"
    );

    {
        let tx = tx.clone();
        std::thread::spawn(move || ui::keyboard_worker(tx));
    }

    let mut app = ui::App::new(hosts, tx, configured_hosts);

    let mut terminal = setup_terminal()?;
    let result = ui::run(&mut terminal, &mut rx, &mut app).await;
    restore_terminal(&mut terminal)?;

    // Drop the receiver so producers see a closed channel, then give them a
    // moment before the process exits.
    drop(rx);
    for handle in &watchers {
        handle.abort();
    }
    tokio::time::sleep(SHUTDOWN_GRACE).await;

    match result? {
        QuitReason::Interrupt => std::process::exit(130),
        QuitReason::Key => Ok(()),
    }
}

/// The TUI owns stdout, so verbose logging goes to a file and only when
/// DEBUG is set. RUST_LOG overrides the default filter.
fn init_logging() -> Result<()> {
    if std::env::var("DEBUG").is_err() {
        return Ok(());
    }
    let file = std::fs::File::create("dtop.log")?;
    let filter = EnvFilter::try_from_default_env().unwrap_or_else(|_| EnvFilter::new("debug"));
    tracing_subscriber::fmt()
        .with_timer(LogTimestamp)
        .with_env_filter(filter)
        .with_writer(Arc::new(file))
        .with_ansi(false)
        .init();
    Ok(())
}

fn setup_terminal() -> Result<Terminal<CrosstermBackend<io::Stdout>>> {
    enable_raw_mode()?;
    let mut stdout = io::stdout();
    execute!(stdout, EnterAlternateScreen, EnableMouseCapture)?;
    let backend = CrosstermBackend::new(stdout);
    Ok(Terminal::new(backend)?)
}

fn restore_terminal(terminal: &mut Terminal<CrosstermBackend<io::Stdout>>) -> Result<()> {
    disable_raw_mode()?;
    execute!(
        terminal.backend_mut(),
        LeaveAlternateScreen,
        DisableMouseCapture
    )?;
    terminal.show_cursor()?;
    Ok(())
}
