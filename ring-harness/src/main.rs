//! ringtest binary entry point.
//!
//! ## Usage
//!
//! ```bash
//! # run the full catalog against a gateway
//! ringtest localhost:15000
//!
//! # enumerate scenario names
//! ringtest localhost:15000 list
//!
//! # run a subset
//! ringtest localhost:15000 ring_small get_stream
//! ```
//!
//! Exit code 0 iff every executed scenario passed; 1 on the first failure.

use anyhow::Result;
use clap::Parser;
use std::path::PathBuf;
use tracing_subscriber::EnvFilter;

use ring_gateway::{GatewayClient, GatewayConfig};
use ringtest_harness::cluster::{Cluster, ClusterConfig};
use ringtest_harness::config::HarnessConfig;
use ringtest_harness::runner::Runner;
use ringtest_harness::scenarios;

/// Chaos/integration harness for the replicated key/value ring.
#[derive(Parser, Debug)]
#[command(name = "ringtest")]
#[command(version, about, long_about = None)]
struct Cli {
    /// Monitoring gateway host, e.g. localhost:15000
    host: String,

    /// `list` to enumerate scenario names; otherwise the scenarios to run.
    /// Empty runs the full catalog.
    scenarios: Vec<String>,

    /// Node launcher executable (overrides config)
    #[arg(long)]
    launcher: Option<PathBuf>,

    /// Working-directory root for node state (overrides config)
    #[arg(long)]
    work_root: Option<PathBuf>,

    /// Path to a ringtest.toml config file
    #[arg(long)]
    config: Option<PathBuf>,
}

#[tokio::main]
async fn main() -> Result<()> {
    tracing_subscriber::fmt()
        .with_env_filter(
            EnvFilter::try_from_default_env().unwrap_or_else(|_| EnvFilter::new("info")),
        )
        .init();

    let cli = Cli::parse();

    if cli.scenarios.first().map(String::as_str) == Some("list") {
        for scenario in scenarios::catalog() {
            println!("{:<24} {}", scenario.name, scenario.summary);
        }
        return Ok(());
    }

    let mut config = match &cli.config {
        Some(path) => HarnessConfig::load(path)?,
        None => HarnessConfig::default(),
    };
    if let Some(launcher) = cli.launcher {
        config.launcher = launcher;
    }
    if let Some(work_root) = cli.work_root {
        config.work_root = Some(work_root);
    }

    let gateway = GatewayClient::new(GatewayConfig::for_host(&cli.host));
    let cluster = Cluster::new(ClusterConfig::from_harness(&config));
    let mut runner = Runner::new(gateway, cluster);

    let passed = runner.run(&cli.scenarios).await?;
    if !passed {
        std::process::exit(1);
    }
    Ok(())
}
