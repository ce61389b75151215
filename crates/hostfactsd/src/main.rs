//! hostfacts agent - gathers cluster facts and reports them to the collector.

use anyhow::{Context, Result};
use clap::{Parser, Subcommand};
use hostfacts_common::{FsReader, GathererRegistry, SystemExecutor};
use hostfactsd::collector::{self, CollectorClient};
use hostfactsd::config::Config;
use hostfactsd::facts_service::{self, FactsGatheringRequest, FACTS_DISCOVERY_TYPE};
use hostfactsd::logging;
use std::path::PathBuf;
use std::sync::Arc;
use std::time::Duration;
use tracing::{info, warn};

#[derive(Parser)]
#[command(name = "hostfactsd")]
#[command(about = "hostfacts agent - cluster facts gathering", long_about = None)]
#[command(version)]
struct Cli {
    /// Config file (default: /etc/hostfacts/config.toml)
    #[arg(long, global = true)]
    config: Option<PathBuf>,

    /// Log level used when RUST_LOG is not set
    #[arg(long, global = true)]
    log_level: Option<String>,

    /// Collector base URL
    #[arg(long, global = true)]
    server_url: Option<String>,

    #[command(subcommand)]
    command: Commands,
}

#[derive(Subcommand)]
enum Commands {
    /// Gather facts for the requests in a JSON file and print them
    Gather {
        /// JSON file with {execution_id?, group_id?, facts_requests: [...]}
        #[arg(long)]
        requests: PathBuf,

        /// Also publish the gathered facts to the collector
        #[arg(long)]
        publish: bool,
    },

    /// List registered gatherers
    Gatherers,

    /// Send a single heartbeat
    Heartbeat,

    /// Send heartbeats until interrupted
    Run,
}

#[tokio::main]
async fn main() -> Result<()> {
    let cli = Cli::parse();

    let mut config = Config::load(cli.config.as_deref())?;
    if let Some(level) = cli.log_level {
        config.logging.level = level;
    }
    if let Some(url) = cli.server_url {
        config.collector.server_url = url;
    }

    logging::init(&config.logging.level)?;

    let registry = GathererRegistry::with_defaults(
        Arc::new(SystemExecutor),
        Arc::new(FsReader),
        &config.gatherers.options(),
    );

    match cli.command {
        Commands::Gatherers => {
            for name in registry.names() {
                println!("{}", name);
            }
        }
        Commands::Gather { requests, publish } => {
            let content = std::fs::read_to_string(&requests)
                .with_context(|| format!("Failed to read requests file {}", requests.display()))?;
            let request: FactsGatheringRequest = serde_json::from_str(&content)
                .with_context(|| format!("Invalid requests file {}", requests.display()))?;

            let agent_id = collector::read_agent_id(&config.agent.machine_id_path)?;
            let gathered = facts_service::gather_facts(
                &registry,
                request,
                &agent_id.to_string(),
                Duration::from_secs(config.agent.gather_timeout_secs),
            )
            .await;

            println!("{}", serde_json::to_string_pretty(&gathered)?);

            if publish {
                config.validate()?;
                let client = CollectorClient::new(&config.collector, agent_id)?;
                client.publish(FACTS_DISCOVERY_TYPE, &gathered).await?;
            }
        }
        Commands::Heartbeat => {
            let client = connect(&config)?;
            client.heartbeat().await?;
            info!("Heartbeat sent");
        }
        Commands::Run => run(&config).await?,
    }

    Ok(())
}

fn connect(config: &Config) -> Result<CollectorClient> {
    config.validate()?;
    let agent_id = collector::read_agent_id(&config.agent.machine_id_path)?;
    Ok(CollectorClient::new(&config.collector, agent_id)?)
}

async fn run(config: &Config) -> Result<()> {
    let client = connect(config)?;

    info!(
        "hostfactsd v{} starting on {} as agent {}",
        env!("CARGO_PKG_VERSION"),
        config.instance_name(),
        client.agent_id()
    );

    let mut ticker = tokio::time::interval(Duration::from_secs(config.agent.discovery_period_secs.max(1)));

    loop {
        tokio::select! {
            _ = ticker.tick() => {
                if let Err(e) = client.heartbeat().await {
                    warn!("Heartbeat failed: {}", e);
                }
            }
            _ = tokio::signal::ctrl_c() => {
                info!("Shutting down gracefully");
                return Ok(());
            }
        }
    }
}
