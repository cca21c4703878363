//! Service bootstrap: command line, configuration and device construction

use std::path::PathBuf;
use std::time::Duration;

use clap::Parser;
use errors::KilnResult;
use kiln_protocol::{SerialLink, SimulatedController};
use tracing::info;

use crate::config::{DeviceMode, KilnConfig};
use crate::device::{DeltaDriver, DeviceHandle, RemoteKiln};

/// Round trip of the simulated serial line
const SIMULATED_LATENCY: Duration = Duration::from_millis(20);

/// Command-line arguments for kilnsrv
#[derive(Parser, Debug, Clone, Default)]
#[command(
    name = "kilnsrv",
    version = env!("CARGO_PKG_VERSION"),
    about = "Kiln Controller Service",
    long_about = None
)]
pub struct Args {
    /// Configuration file (yaml, toml or json)
    #[arg(short = 'c', long)]
    pub config: Option<PathBuf>,

    /// Log level (trace, debug, info, warn, error)
    #[arg(short = 'l', long)]
    pub log_level: Option<String>,

    /// Run against the in-process simulated controller
    #[arg(long)]
    pub simulate: bool,

    /// Serial device path, e.g. /dev/ttyUSB0
    #[arg(short = 'p', long)]
    pub port: Option<String>,

    /// Validation mode - only validate configuration without starting service
    #[arg(long)]
    pub validate: bool,
}

/// Load the configuration and apply command-line overrides
pub fn load_config(args: &Args) -> KilnResult<KilnConfig> {
    let mut config = KilnConfig::load(args.config.as_deref())?;
    apply_args(&mut config, args);
    config.validate()?;
    Ok(config)
}

pub fn apply_args(config: &mut KilnConfig, args: &Args) {
    if let Some(level) = &args.log_level {
        config.logging.level = level.clone();
    }
    if args.simulate {
        config.device.mode = DeviceMode::Simulated;
    }
    if let Some(port) = &args.port {
        config.serial.port = port.clone();
    }
}

/// Build the device handle for the configured mode
pub fn build_device(config: &KilnConfig) -> KilnResult<DeviceHandle> {
    let slave = config.serial.slave_id;
    match config.device.mode {
        DeviceMode::Serial => {
            let link = SerialLink::open(&config.serial)?;
            info!("Device: serial {} slave {}", config.serial.port, slave);
            Ok(DeviceHandle::blocking(DeltaDriver::new(link, slave)))
        },
        DeviceMode::Simulated => {
            let sim = SimulatedController::new(slave)
                .with_latency(SIMULATED_LATENCY)
                .with_drift();
            info!("Device: simulated controller, slave {}", slave);
            Ok(DeviceHandle::blocking(DeltaDriver::new(sim, slave)))
        },
        DeviceMode::Remote => {
            let remote = RemoteKiln::new(&config.remote.base_url, config.remote.timeout())?;
            info!("Device: remote {}", remote.ops_url());
            Ok(DeviceHandle::new(remote))
        },
    }
}
