use std::sync::Arc;
use std::time::Duration;

use anyhow::{Context, Result};
use clap::{Parser, Subcommand};
use sqlx::postgres::PgPoolOptions;
use tracing::{info, warn};
use tracing_subscriber::EnvFilter;
use uuid::Uuid;

use embercast_core::{AppConfig, ServerDeps};
use embercast_domains::momentum::activities::{enqueue_momentum_tasks, run_momentum_cycle};
use embercast_domains::publishing::activities::rollback_duplicates;
use embercast_domains::publishing::adapters::build_platform_registry;
use embercast_domains::scheduling::activities::{autopilot_tick, requeue_due_entries};

mod worker;

#[derive(Parser)]
#[command(name = "embercast-server", about = "Embercast content momentum and publishing service")]
struct Cli {
    #[command(subcommand)]
    command: Option<Command>,
}

#[derive(Subcommand)]
enum Command {
    /// Run the full service: workers, autopilot, momentum and requeue timers.
    Run,
    /// Run one momentum cycle for a tenant and exit.
    Momentum {
        #[arg(long)]
        tenant: Uuid,
    },
    /// Find duplicate successful publishes for a tenant and roll back all
    /// but the earliest of each group.
    RollbackDuplicates {
        #[arg(long)]
        tenant: Uuid,
    },
}

#[tokio::main]
async fn main() -> Result<()> {
    tracing_subscriber::fmt()
        .with_env_filter(
            EnvFilter::try_from_default_env().unwrap_or_else(|_| EnvFilter::new("info")),
        )
        .json()
        .init();

    info!("Starting embercast-server");

    let cli = Cli::parse();
    let config = AppConfig::from_env()?;

    // Separate pools so a slow worker cannot starve the timers.
    let ops_pool = PgPoolOptions::new()
        .max_connections(10)
        .connect(&config.database_url)
        .await
        .context("Failed to connect ops pool")?;
    let worker_pool = PgPoolOptions::new()
        .max_connections(8)
        .connect(&config.database_url)
        .await
        .context("Failed to connect worker pool")?;

    sqlx::migrate!("../../migrations")
        .run(&ops_pool)
        .await
        .context("Failed to run migrations")?;
    info!("Migrations up to date");

    let http_client = reqwest::Client::builder()
        .timeout(Duration::from_secs(config.platform_timeout_secs))
        .build()
        .context("Failed to build HTTP client")?;

    let platforms = Arc::new(build_platform_registry(&config, &http_client));
    if platforms.is_empty() {
        warn!("No platform clients configured; publish tasks will fail as configuration errors");
    }

    let ops_deps = ServerDeps::new(ops_pool, http_client.clone(), platforms.clone(), config.clone());
    let worker_deps = ServerDeps::new(worker_pool, http_client, platforms, config.clone());

    match cli.command.unwrap_or(Command::Run) {
        Command::Run => run_service(ops_deps, worker_deps).await,
        Command::Momentum { tenant } => {
            let stats = run_momentum_cycle(&ops_deps, tenant).await?;
            println!("{stats:#?}");
            Ok(())
        }
        Command::RollbackDuplicates { tenant } => {
            let report = rollback_duplicates(&ops_deps, tenant)
                .await
                .map_err(|e| anyhow::anyhow!(e.body().to_string()))?;
            println!("{}", serde_json::to_string_pretty(&report)?);
            Ok(())
        }
    }
}

async fn run_service(ops_deps: ServerDeps, worker_deps: ServerDeps) -> Result<()> {
    let config = ops_deps.config.clone();

    let (shutdown_tx, shutdown_rx) = tokio::sync::watch::channel(false);
    let mut workers = Vec::with_capacity(config.worker_concurrency);
    for i in 0..config.worker_concurrency {
        let deps = worker_deps.clone();
        let worker_id = format!("{}-worker-{}", hostname(), i);
        let shutdown = shutdown_rx.clone();
        workers.push(tokio::spawn(async move {
            worker::run_worker(deps, worker_id, shutdown).await;
        }));
    }

    spawn_ticker("autopilot", config.autopilot_interval_secs, ops_deps.clone(), |deps| async move {
        autopilot_tick(&deps).await.map(|_| ())
    });
    spawn_ticker("momentum", config.momentum_interval_secs, ops_deps.clone(), |deps| async move {
        enqueue_momentum_tasks(&deps).await.map(|_| ())
    });
    spawn_ticker("requeue", config.requeue_interval_secs, ops_deps.clone(), |deps| async move {
        requeue_due_entries(&deps).await.map(|_| ())
    });

    info!(
        workers = config.worker_concurrency,
        autopilot_secs = config.autopilot_interval_secs,
        momentum_secs = config.momentum_interval_secs,
        requeue_secs = config.requeue_interval_secs,
        "Service running"
    );

    tokio::signal::ctrl_c().await?;
    info!("Shutdown signal received, draining workers");

    // Workers finish any in-flight task before exiting; tickers are
    // idempotent and simply stop with the process.
    shutdown_tx.send(true).ok();
    for worker in workers {
        worker.await.ok();
    }
    info!("Workers drained, exiting");
    Ok(())
}

fn spawn_ticker<F, Fut>(name: &'static str, interval_secs: u64, deps: ServerDeps, tick: F)
where
    F: Fn(ServerDeps) -> Fut + Send + 'static,
    Fut: std::future::Future<Output = Result<()>> + Send,
{
    tokio::spawn(async move {
        let mut interval = tokio::time::interval(Duration::from_secs(interval_secs));
        interval.set_missed_tick_behavior(tokio::time::MissedTickBehavior::Skip);
        loop {
            interval.tick().await;
            if let Err(e) = tick(deps.clone()).await {
                warn!(ticker = name, error = %e, "Ticker iteration failed");
            }
        }
    });
}

fn hostname() -> String {
    std::env::var("HOSTNAME").unwrap_or_else(|_| format!("embercast-{}", std::process::id()))
}
