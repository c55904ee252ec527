//! STROBE acquisition command line
//!
//! # Usage
//!
//! ```bash
//! # List serial ports, FTDI adapters first
//! strobe-acquire --list-ports
//!
//! # Read 100 samples from a device and print them as JSON lines
//! strobe-acquire --port /dev/ttyUSB0 --samples 100 --json
//!
//! # Run without hardware
//! strobe-acquire --synthetic
//! ```

use clap::Parser;
use std::path::PathBuf;
use std::process::ExitCode;
use std::sync::Arc;
use strobe_core::acquisition::{AcquisitionEngine, SampleChannel, SampleReceiver};
use strobe_core::config::{ConfigLoader, SystemConfig};
use strobe_core::hal::{scan_ports, PortScan, SerialConnector};
use strobe_core::{DecodedSample, SyntheticSource};
use tracing::{error, info, warn};
use tracing_subscriber::layer::SubscriberExt;
use tracing_subscriber::util::SubscriberInitExt;
use tracing_subscriber::EnvFilter;

type CliResult<T> = Result<T, Box<dyn std::error::Error>>;

/// Capacitive arena acquisition
#[derive(Parser, Debug)]
#[command(name = "strobe-acquire")]
#[command(author, version, about = "Acquire capacitance samples from a STROBE device", long_about = None)]
struct Cli {
    /// List available serial ports and exit
    #[arg(long)]
    list_ports: bool,

    /// Serial port, either a device path or "<device> - <description>"
    #[arg(short, long, env = "STROBE_PORT")]
    port: Option<String>,

    /// Generate synthetic samples instead of reading hardware
    #[arg(long, conflicts_with = "port")]
    synthetic: bool,

    /// Extra configuration file, applied after the standard search paths
    #[arg(short, long)]
    config: Option<PathBuf>,

    /// Number of samples to print before stopping
    #[arg(short = 'n', long, default_value = "10")]
    samples: u64,

    /// Print one JSON object per sample
    #[arg(long)]
    json: bool,
}

fn main() -> ExitCode {
    tracing_subscriber::registry()
        .with(EnvFilter::try_from_default_env().unwrap_or_else(|_| "strobe_core=info".into()))
        .with(tracing_subscriber::fmt::layer().with_writer(std::io::stderr))
        .init();

    let cli = Cli::parse();

    match run(cli) {
        Ok(()) => ExitCode::SUCCESS,
        Err(e) => {
            error!("{}", e);
            ExitCode::FAILURE
        }
    }
}

fn run(cli: Cli) -> CliResult<()> {
    if cli.list_ports {
        print_ports(&scan_ports()?);
        return Ok(());
    }

    let config = load_config(cli.config.as_ref())?;
    let (sender, receiver) = SampleChannel::unbounded();

    let handle = if cli.synthetic {
        info!("starting synthetic source");
        SyntheticSource::new(config.link.channel_count, config.synthetic.clone(), sender).start()?
    } else {
        let port = match cli.port {
            Some(port) => port,
            None => first_ftdi_port()?,
        };
        info!(port = %port, "starting acquisition");
        AcquisitionEngine::connect(
            SerialConnector,
            &port,
            Arc::new(config.link.clone()),
            config.engine.clone(),
            sender,
        )?
        .start()?
    };

    let printed = print_samples(&receiver, cli.samples, cli.json)?;
    handle.shutdown()?;
    info!(samples = printed, "done");
    Ok(())
}

fn load_config(extra: Option<&PathBuf>) -> CliResult<SystemConfig> {
    let mut loader = ConfigLoader::new();
    if let Some(path) = extra {
        if !path.exists() {
            return Err(format!("configuration file not found: {}", path.display()).into());
        }
        loader = loader.add_path(path);
    }
    Ok(loader.load()?)
}

fn first_ftdi_port() -> CliResult<String> {
    let scan = scan_ports()?;
    match scan.ftdi.first() {
        Some(port) => {
            info!(port = %port.display_name(), "auto-selected FTDI port");
            Ok(port.display_name())
        }
        None => Err("no FTDI serial port found; pass --port or --synthetic".into()),
    }
}

fn print_ports(scan: &PortScan) {
    if scan.all.is_empty() {
        println!("No serial ports found");
        return;
    }

    for port in &scan.ftdi {
        println!("* {}", port.display_name());
    }
    for port in scan.all.iter().filter(|p| !p.is_ftdi()) {
        println!("  {}", port.display_name());
    }
}

fn print_samples(receiver: &SampleReceiver, count: u64, json: bool) -> CliResult<u64> {
    let mut printed = 0;

    while printed < count {
        let Some(sample) = receiver.recv() else {
            warn!("producer exited before all samples were received");
            break;
        };

        if json {
            println!("{}", serde_json::to_string(&sample)?);
        } else {
            println!("{}", format_sample(&sample));
        }
        printed += 1;
    }

    Ok(printed)
}

fn format_sample(sample: &DecodedSample) -> String {
    let arenas: Vec<String> = sample
        .left
        .iter()
        .zip(&sample.right)
        .map(|(l, r)| format!("{}/{}", l, r))
        .collect();
    format!("#{} {}", sample.sequence, arenas.join(" "))
}
