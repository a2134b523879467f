//! Offload demo - runs the same busy loop two ways on a single-threaded caller.
//!
//! ```text
//! main() -> load config -> init_tracing() -> heartbeat task
//!                                  |
//!             +--------------------+--------------------+
//!             v                                         v
//!   blocking: unit.execute() inline          offload: Dispatcher::run(unit)
//!   (heartbeat starves)                      (heartbeat keeps ticking)
//!             |                                         |
//!             +---------------> RunReport <-------------+
//! ```
//!
//! The caller runs on a `current_thread` runtime, so the heartbeat only
//! advances when the caller yields. Blocking mode never yields until the loop
//! is done; offload mode awaits the dispatch handle and keeps the caller free.

mod report;
mod work;

use std::io;
use std::path::PathBuf;
use std::process::ExitCode;
use std::sync::Arc;
use std::sync::atomic::{AtomicU64, Ordering};
use std::time::{Duration, Instant};

use anyhow::{Context, Result};
use clap::{Parser, Subcommand};
use tokio::task::JoinHandle;
use tokio::time::{self, MissedTickBehavior};
use tracing_subscriber::{EnvFilter, fmt, prelude::*};

use offload_config::{DemoConfig, OffloadConfig};
use offload_engine::{Dispatcher, Interrupt, Outcome, WorkUnit};

use crate::report::{RunMode, RunReport};

#[derive(Debug, Parser)]
#[command(name = "offload", version, about)]
struct Cli {
    /// Config file to read instead of ~/.offload/config.toml.
    #[arg(long, global = true, value_name = "PATH")]
    config: Option<PathBuf>,

    /// Print the report as JSON.
    #[arg(long, global = true)]
    json: bool,

    #[command(subcommand)]
    mode: Mode,
}

#[derive(Debug, Subcommand)]
enum Mode {
    /// Run the busy loop on the caller's thread.
    Blocking {
        /// Millions of iterations to sum.
        #[arg(long)]
        cycles: Option<u64>,
    },
    /// Dispatch the busy loop to an isolated worker.
    Offload {
        /// Millions of iterations to sum.
        #[arg(long)]
        cycles: Option<u64>,

        /// Cancel the dispatch after this many milliseconds.
        #[arg(long, value_name = "MS")]
        cancel_after_ms: Option<u64>,
    },
}

fn init_tracing(config: Option<&OffloadConfig>) {
    let configured = config.and_then(OffloadConfig::log_filter);
    let env_filter = EnvFilter::try_from_default_env()
        .or_else(|_| EnvFilter::try_new(configured.unwrap_or("info")))
        .unwrap_or_else(|_| EnvFilter::new("info"));

    // stdout carries the report; logs go to stderr.
    tracing_subscriber::registry()
        .with(fmt::layer().with_writer(io::stderr))
        .with(env_filter)
        .init();
}

fn load_config(path: Option<&PathBuf>) -> Result<Option<OffloadConfig>> {
    match path {
        Some(path) => OffloadConfig::load_from(path)
            .with_context(|| format!("loading config from {}", path.display())),
        None => OffloadConfig::load().context("loading config"),
    }
}

struct Heartbeat {
    ticks: Arc<AtomicU64>,
    task: JoinHandle<()>,
}

impl Heartbeat {
    fn start(period: Duration) -> Self {
        let ticks = Arc::new(AtomicU64::new(0));
        let counter = Arc::clone(&ticks);
        let task = tokio::spawn(async move {
            let mut interval = time::interval(period);
            interval.set_missed_tick_behavior(MissedTickBehavior::Skip);
            loop {
                interval.tick().await;
                let n = counter.fetch_add(1, Ordering::Relaxed) + 1;
                tracing::trace!(tick = n, "Heartbeat");
            }
        });
        Self { ticks, task }
    }

    fn stop(self) -> u64 {
        self.task.abort();
        self.ticks.load(Ordering::Relaxed)
    }
}

fn elapsed_ms(started: Instant) -> u64 {
    started.elapsed().as_millis() as u64
}

fn run_blocking(demo: DemoConfig, cycles: u64) -> RunReport {
    let heartbeat = Heartbeat::start(Duration::from_millis(demo.heartbeat_ms));
    let unit = WorkUnit::interruptible(work::busy_sum, cycles);

    tracing::info!(cycles, "Running busy loop on the caller's thread");
    let started = Instant::now();
    let outcome = Outcome::from(unit.execute(&Interrupt::never()));
    let elapsed_ms = elapsed_ms(started);

    RunReport {
        mode: RunMode::Blocking,
        cycles,
        elapsed_ms,
        heartbeats: heartbeat.stop(),
        heartbeat_ms: demo.heartbeat_ms,
        dispatch_id: None,
        state: None,
        cancel_requested: false,
        outcome,
    }
}

async fn run_offload(
    config: &OffloadConfig,
    cycles: u64,
    cancel_after: Option<Duration>,
) -> Result<RunReport> {
    let demo = config.demo();
    let dispatcher = Dispatcher::from_config(&config.dispatcher());
    let heartbeat = Heartbeat::start(Duration::from_millis(demo.heartbeat_ms));

    let started = Instant::now();
    let mut handle = dispatcher
        .run(WorkUnit::interruptible(work::busy_sum, cycles))
        .context("dispatching busy loop")?;
    let canceller = handle.cancel_handle();
    tracing::info!(dispatch_id = %handle.id(), cycles, "Busy loop dispatched");

    let cancel_timer = async {
        match cancel_after {
            Some(delay) => time::sleep(delay).await,
            None => std::future::pending().await,
        }
    };

    let first = tokio::select! {
        outcome = &mut handle => Some(outcome),
        () = cancel_timer => None,
    };
    let cancel_requested = first.is_none();
    let outcome = match first {
        Some(outcome) => outcome,
        None => {
            canceller.cancel();
            handle.await
        }
    };
    let elapsed_ms = elapsed_ms(started);

    Ok(RunReport {
        mode: RunMode::Offload,
        cycles,
        elapsed_ms,
        heartbeats: heartbeat.stop(),
        heartbeat_ms: demo.heartbeat_ms,
        dispatch_id: Some(canceller.id()),
        state: Some(canceller.state()),
        cancel_requested,
        outcome,
    })
}

fn print_report(report: &RunReport, json: bool) -> Result<()> {
    if json {
        let rendered = serde_json::to_string_pretty(report).context("serializing report")?;
        println!("{rendered}");
    } else {
        println!("{}", report.render_text());
    }
    Ok(())
}

async fn run(cli: Cli) -> Result<bool> {
    let loaded = load_config(cli.config.as_ref())?;
    init_tracing(loaded.as_ref());
    let path = cli.config.clone().or_else(OffloadConfig::path);
    match (&loaded, path) {
        (Some(_), Some(path)) => tracing::debug!(path = %path.display(), "Config loaded"),
        _ => tracing::debug!("No config file, using defaults"),
    }
    let config = loaded.unwrap_or_default();
    let demo = config.demo();

    let report = match cli.mode {
        Mode::Blocking { cycles } => run_blocking(demo, cycles.unwrap_or(demo.cycles)),
        Mode::Offload {
            cycles,
            cancel_after_ms,
        } => {
            run_offload(
                &config,
                cycles.unwrap_or(demo.cycles),
                cancel_after_ms.map(Duration::from_millis),
            )
            .await?
        }
    };

    print_report(&report, cli.json)?;
    Ok(report.succeeded())
}

#[tokio::main(flavor = "current_thread")]
async fn main() -> ExitCode {
    let cli = Cli::parse();
    match run(cli).await {
        Ok(true) => ExitCode::SUCCESS,
        Ok(false) => ExitCode::FAILURE,
        Err(err) => {
            eprintln!("offload: {err:#}");
            ExitCode::from(2)
        }
    }
}
