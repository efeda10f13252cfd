//! # vhagar: backend inspection CLI
//!
//! Usage:
//!   vhagar task -t es            # render one task as a table
//!   vhagar task -t all -r        # send every task's report to the webhook
//!   vhagar task -t nacos -i 30   # re-run every 30 seconds
//!   vhagar cron                  # run configured cron jobs forever
//!   vhagar list                  # show registered tasks

use std::net::SocketAddr;
use std::path::{Path, PathBuf};
use std::sync::Arc;
use std::time::Duration;

use anyhow::Result;
use clap::{Parser, Subcommand};
use tracing_subscriber::EnvFilter;
use vhagar_core::{Metrics, VhagarConfig};
use vhagar_notify::{Jittered, Notifier, Notify, WecomWebhook};
use vhagar_task::{CronDriver, Dispatcher, Output, Registry, RunMode, RunOutcome};

#[derive(Parser)]
#[command(name = "vhagar", version, about = "🐉 vhagar: backend inspection and reporting")]
struct Cli {
    /// Config file
    #[arg(short, long, global = true, default_value = VhagarConfig::DEFAULT_PATH)]
    config: PathBuf,

    /// Verbose logging
    #[arg(short, long, global = true)]
    verbose: bool,

    #[command(subcommand)]
    command: Command,
}

#[derive(Subcommand)]
enum Command {
    /// Run a task (or all of them) now
    Task {
        /// Task name, or "all"
        #[arg(short = 't', long, default_value = "all")]
        task: String,

        /// Send a webhook report instead of printing tables
        #[arg(short, long)]
        report: bool,

        /// Output file that receives a copy of the tables
        #[arg(short = 'w', long)]
        write: Option<PathBuf>,

        /// Repeat every N seconds until interrupted
        #[arg(short, long)]
        interval: Option<u64>,
    },
    /// Run the configured cron jobs until stopped
    Cron,
    /// List registered tasks
    List,
}

#[tokio::main]
async fn main() -> Result<()> {
    let cli = Cli::parse();

    let filter = if cli.verbose { "debug" } else { "info" };
    tracing_subscriber::fmt()
        .with_env_filter(EnvFilter::try_from_default_env().unwrap_or_else(|_| EnvFilter::new(filter)))
        .with_target(false)
        .init();

    let config = VhagarConfig::load(&cli.config)?;
    let metrics = Metrics::new();
    let client = vhagar_core::http::build_client(&config.http, None)?;

    let mut registry = Registry::new();
    vhagar_inspect::register_builtin(&mut registry, &config, client);
    let registry = Arc::new(registry);

    match cli.command {
        Command::List => {
            for name in registry.names() {
                println!("{name}");
            }
            Ok(())
        }
        Command::Task {
            task,
            report,
            write,
            interval,
        } => {
            let output_path = write.unwrap_or_else(|| PathBuf::from(&config.global.output_file));
            let mode = if report { RunMode::Report } else { RunMode::Table };
            let dispatcher = build_dispatcher(&config, registry, &output_path, mode, metrics)?;
            let result = run_task_command(&dispatcher, &task, mode, interval).await;
            dispatcher.output().close();
            result
        }
        Command::Cron => {
            let output_path = PathBuf::from(&config.global.output_file);
            let dispatcher = Arc::new(build_dispatcher(
                &config,
                registry,
                &output_path,
                RunMode::Report,
                metrics.clone(),
            )?);

            if config.metric.enabled {
                let addr = SocketAddr::from(([0, 0, 0, 0], config.metric.port));
                vhagar_task::server::spawn_metrics_server(addr, metrics).await?;
            }

            let driver = CronDriver::new(dispatcher.clone(), &config.cron)?
                .hold_when_idle(config.metric.enabled);
            tokio::select! {
                _ = driver.run() => {}
                _ = tokio::signal::ctrl_c() => tracing::info!("👋 interrupted, stopping cron driver"),
            }
            dispatcher.output().close();
            Ok(())
        }
    }
}

/// Wire output, notifier and metrics around the registry.
fn build_dispatcher(
    config: &VhagarConfig,
    registry: Arc<Registry>,
    output_path: &Path,
    mode: RunMode,
    metrics: Arc<Metrics>,
) -> Result<Dispatcher> {
    let sink = Arc::new(WecomWebhook::from_config(&config.notify, &config.http)?);
    let notifier = Notifier::from_config(sink, &config.notify).with_metrics(metrics.clone());
    let notifier: Arc<dyn Notify> = match mode {
        RunMode::Report => Arc::new(Jittered::random(
            notifier,
            Duration::from_secs(config.notify.jitter_max_secs),
        )),
        RunMode::Table => Arc::new(notifier),
    };

    let output = Output::global(output_path);
    Ok(Dispatcher::new(registry, output, notifier, config.global.project.clone()).with_metrics(metrics))
}

async fn run_task_command(
    dispatcher: &Dispatcher,
    task: &str,
    mode: RunMode,
    interval: Option<u64>,
) -> Result<()> {
    let Some(secs) = interval.filter(|s| *s > 0) else {
        run_once(dispatcher, task, mode).await?;
        return Ok(());
    };

    let mut ticker = tokio::time::interval(Duration::from_secs(secs));
    loop {
        tokio::select! {
            _ = ticker.tick() => {
                // Each round replaces the previous one in the output file.
                dispatcher.output().clear()?;
                run_once(dispatcher, task, mode).await?;
            }
            _ = tokio::signal::ctrl_c() => {
                tracing::info!("👋 interrupted");
                return Ok(());
            }
        }
    }
}

async fn run_once(dispatcher: &Dispatcher, task: &str, mode: RunMode) -> Result<Vec<RunOutcome>> {
    let outcomes = if task == "all" {
        dispatcher.run_all(mode).await
    } else {
        vec![dispatcher.run(task, mode).await?]
    };
    let failed = outcomes.iter().filter(|o| !o.is_success()).count();
    if failed > 0 {
        tracing::warn!("⚠️ {failed} of {} task(s) reported problems", outcomes.len());
    }
    Ok(outcomes)
}
