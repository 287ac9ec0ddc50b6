use std::path::PathBuf;
use std::process::ExitCode;

use anyhow::Context;
use clap::Parser;

use optimon_common::{init_tracing, write_discovery};
use optimon_snmp::config::SnmpCollectorConfig;
use optimon_snmp::run_discovery;
use optimon_snmp::walker::SnmpWalker;

/// SNMP alarm discovery for optical transport devices.
#[derive(Parser, Debug)]
#[command(name = "optimon-snmp")]
#[command(about = "Discover alarm instances from a device's SNMP alarm table", long_about = None)]
struct Args {
    /// Path to the configuration file (JSON5 format).
    #[arg(short, long, default_value = "snmp.json5")]
    config: PathBuf,

    /// Enable debug diagnostics on stderr.
    #[arg(long)]
    debug: bool,
}

fn main() -> ExitCode {
    let args = Args::parse();

    match run(&args) {
        Ok(()) => ExitCode::SUCCESS,
        Err(e) => {
            // Fatal connectivity/config failure: message on stderr, exit 1,
            // so the scheduler sees a broken device link rather than an
            // empty result.
            eprintln!("ERROR: {:#}", e);
            ExitCode::FAILURE
        }
    }
}

fn run(args: &Args) -> anyhow::Result<()> {
    let mut config = SnmpCollectorConfig::load(&args.config)
        .with_context(|| format!("Failed to load config from {:?}", args.config))?;

    if args.debug {
        config.logging.level = "debug".to_string();
    }
    init_tracing(&config.logging).context("Failed to initialize tracing")?;

    config.validate().context("Invalid configuration")?;

    tracing::debug!(
        device = %config.device.address,
        rules = config.rules.len(),
        "Starting alarm discovery"
    );

    let mut walker = SnmpWalker::new(config.device.clone());
    let instances = run_discovery(&config, &mut walker)?;

    // Zero instances is a legitimate outcome: the platform clears all
    // previously discovered alarms for the device.
    write_discovery(&mut std::io::stdout().lock(), &instances)?;

    Ok(())
}
