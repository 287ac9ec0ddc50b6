use std::path::PathBuf;
use std::process::ExitCode;
use std::time::Duration;

use anyhow::Context;
use clap::{Parser, Subcommand};

use optimon_common::{init_tracing, write_collection, write_discovery};
use optimon_netconf::client::NetconfClient;
use optimon_netconf::config::NetconfCollectorConfig;
use optimon_netconf::error::NetconfError;
use optimon_netconf::pipeline::{collect_metrics, discover_instances};

/// NETCONF collector for optical transport devices.
#[derive(Parser, Debug)]
#[command(name = "optimon-netconf")]
#[command(about = "Discover instances and collect metrics via NETCONF", long_about = None)]
struct Cli {
    #[command(subcommand)]
    command: Command,

    /// Path to the configuration file (JSON5 format).
    #[arg(short, long, default_value = "netconf.json5")]
    config: PathBuf,

    /// Enable debug diagnostics on stderr.
    #[arg(long)]
    debug: bool,
}

#[derive(Subcommand, Debug, Clone, Copy)]
enum Command {
    /// Emit one discovery line per instance found on the device.
    Discover,
    /// Emit one collection line per metric sample.
    Collect,
}

fn main() -> ExitCode {
    let cli = Cli::parse();

    match run(&cli) {
        Ok(()) => ExitCode::SUCCESS,
        Err(e) => {
            eprintln!("ERROR: {:#}", e);
            ExitCode::FAILURE
        }
    }
}

fn run(cli: &Cli) -> anyhow::Result<()> {
    let mut config = NetconfCollectorConfig::load(&cli.config)
        .with_context(|| format!("Failed to load config from {:?}", cli.config))?;

    if cli.debug {
        config.logging.level = "debug".to_string();
    }
    init_tracing(&config.logging).context("Failed to initialize tracing")?;

    config.validate().context("Invalid configuration")?;

    let reply = fetch(&config)?;

    let doc = roxmltree::Document::parse(&reply)
        .map_err(|e| NetconfError::Protocol(format!("Unparseable response: {e}")))?;

    match cli.command {
        Command::Discover => {
            let instances = discover_instances(&doc, &config);
            tracing::info!(instances = instances.len(), "Discovery complete");
            write_discovery(&mut std::io::stdout().lock(), &instances)?;
        }
        Command::Collect => {
            let samples = collect_metrics(&doc, &config);
            tracing::info!(samples = samples.len(), "Collection complete");
            write_collection(&mut std::io::stdout().lock(), &samples)?;
        }
    }

    Ok(())
}

/// Connect, run the single per-cycle query, and tear the session down.
fn fetch(config: &NetconfCollectorConfig) -> Result<String, NetconfError> {
    let timeout = Duration::from_secs(config.device.timeout_secs);

    let mut client = NetconfClient::connect(
        &config.device.host,
        config.device.port,
        &config.device.username,
        &config.device.password,
        timeout,
    )?;

    let reply = client.get(&config.filter)?;
    client.close()?;

    Ok(reply)
}
