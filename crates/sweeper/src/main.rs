//! podsweep - cluster housekeeping daemon.
//!
//! Periodically scans pods across namespaces, deletes pods whose containers
//! are stuck (crash loops, image pull failures, error exits) so their
//! owning controllers recreate them, verifies recovery within a
//! cluster-size-derived budget, and pushes webhook notifications.

mod cluster;
mod config;
mod cycle;
mod health;
mod remediate;
mod report;
mod scanner;
mod verify;

use std::collections::HashSet;
use std::sync::Arc;
use std::time::Duration;

use anyhow::{Context, Result};
use clap::{Parser, Subcommand};
use notify::Notifier;
use tokio_util::sync::CancellationToken;
use tracing::{info, warn};
use tracing_subscriber::{fmt, prelude::*, EnvFilter};

use crate::cluster::{ClusterGateway, KubeGateway};
use crate::config::SweepConfig;
use crate::cycle::Orchestrator;

/// Cluster housekeeping daemon - deletes stuck pods and verifies recovery
#[derive(Parser)]
#[command(name = "podsweep")]
#[command(about = "Cluster housekeeping daemon - deletes stuck pods and verifies recovery")]
#[command(version)]
struct Cli {
    #[command(subcommand)]
    command: Commands,

    /// Namespaces to exclude from sweeping (comma-separated)
    #[arg(
        long,
        global = true,
        env = "EXCLUDED_NAMESPACES",
        value_delimiter = ',',
        default_value = "kube-system"
    )]
    exclude_namespace: Vec<String>,

    /// Page size for pod listing
    #[arg(long, global = true, env = "POD_PAGE_SIZE", default_value = "500")]
    page_size: u32,
}

#[derive(Subcommand)]
enum Commands {
    /// Run the sweep loop (the daemon's normal mode)
    Run {
        /// Seconds between cycle starts
        #[arg(long, env = "RUN_INTERVAL_SECONDS", default_value = "600")]
        interval: u64,

        /// Run a single cycle and exit
        #[arg(long)]
        once: bool,
    },
    /// Scan for unhealthy pods and print them, without deleting anything
    Scan {
        /// Emit the worklist as JSON instead of text
        #[arg(long)]
        json: bool,
    },
}

#[tokio::main]
async fn main() -> Result<()> {
    let cli = Cli::parse();

    let filter = EnvFilter::try_from_default_env().unwrap_or_else(|_| EnvFilter::new("info"));
    tracing_subscriber::registry()
        .with(fmt::layer())
        .with(filter)
        .init();

    let config = build_config(&cli);
    let gateway = KubeGateway::connect(config.page_size)
        .await
        .context("Failed to initialize Kubernetes client")?;

    match cli.command {
        Commands::Run { interval: _, once } => {
            let notifier = Notifier::from_env();
            let cancel = CancellationToken::new();

            let signal_cancel = cancel.clone();
            tokio::spawn(async move {
                if tokio::signal::ctrl_c().await.is_ok() {
                    info!("Received termination signal");
                    signal_cancel.cancel();
                }
            });

            let orchestrator =
                Orchestrator::new(Arc::new(gateway), notifier, config, cancel);

            if once {
                let summary = orchestrator.run_cycle(1).await?;
                info!(
                    unhealthy = summary.unhealthy,
                    deleted = summary.deleted,
                    recovered = summary.recovered,
                    "Single sweep cycle complete"
                );
            } else {
                orchestrator.run().await;
            }
        }
        Commands::Scan { json } => {
            let namespaces = gateway
                .list_namespaces()
                .await
                .context("Failed to list namespaces")?;
            let worklist = scanner::scan(&gateway, &namespaces, &config).await;

            if json {
                println!("{}", serde_json::to_string_pretty(&worklist)?);
            } else if worklist.is_empty() {
                println!("No unhealthy pods found");
            } else {
                println!("Unhealthy pods ({}):", worklist.len());
                for verdict in &worklist {
                    println!("  - {} ({})", verdict.pod, verdict.phase);
                    for reason in &verdict.reasons {
                        println!("      {reason}");
                    }
                }
            }
        }
    }

    Ok(())
}

/// Build the immutable sweep configuration from CLI arguments.
fn build_config(cli: &Cli) -> SweepConfig {
    let excluded_namespaces: HashSet<String> = cli
        .exclude_namespace
        .iter()
        .map(|ns| ns.trim().to_string())
        .filter(|ns| !ns.is_empty())
        .collect();

    if excluded_namespaces.is_empty() {
        warn!("No namespaces excluded; system namespaces will be swept");
    }

    let run_interval = match cli.command {
        Commands::Run { interval, .. } => Duration::from_secs(interval),
        Commands::Scan { .. } => Duration::from_secs(config::DEFAULT_RUN_INTERVAL_SECS),
    };

    SweepConfig {
        excluded_namespaces,
        run_interval,
        page_size: cli.page_size,
        ..SweepConfig::default()
    }
}
