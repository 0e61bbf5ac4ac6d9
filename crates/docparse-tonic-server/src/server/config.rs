//! CLI surface and validated server configuration.

use anyhow::bail;
use clap::{Parser, ValueEnum};
use core::fmt;
use core::time::Duration;
use std::path::PathBuf;

/// Accelerator kind backing the worker slots.
#[derive(Debug, Clone, Copy, PartialEq, Eq, ValueEnum)]
pub enum Accelerator {
    Cuda,
    Cpu,
    Tpu,
}

impl fmt::Display for Accelerator {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            Accelerator::Cuda => write!(f, "cuda"),
            Accelerator::Cpu => write!(f, "cpu"),
            Accelerator::Tpu => write!(f, "tpu"),
        }
    }
}

/// Identity of the device a worker slot is bound to.
///
/// Assigned once at slot construction and immutable for the slot's
/// lifetime. The binding is handed to the engine loader before any
/// device-sensing work may happen; it is never communicated through
/// process-wide state.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct DeviceBinding {
    pub device_id: usize,
    pub accelerator: Accelerator,
}

impl fmt::Display for DeviceBinding {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "{}:{}", self.accelerator, self.device_id)
    }
}

#[derive(Parser, Debug)]
#[command(name = "docparse-tonic-server")]
#[command(version)]
#[command(about = "GPU-bound document parsing tier")]
pub struct CliArgs {
    /// Directory that receives per-job parse output
    #[arg(long, env = "DOCPARSE_OUTPUT_DIR", default_value = "part_0")]
    pub output_dir: PathBuf,

    /// Accelerator kind to bind worker slots to
    #[arg(long, value_enum, env = "DOCPARSE_ACCELERATOR", default_value_t = Accelerator::Cuda)]
    pub accelerator: Accelerator,

    /// Number of devices to use
    #[arg(long, env = "DOCPARSE_DEVICES", default_value_t = 2)]
    pub devices: usize,

    /// Number of worker slots per device
    #[arg(long, env = "DOCPARSE_WORKERS_PER_DEVICE", default_value_t = 4)]
    pub workers_per_device: usize,

    /// Per-request deadline in seconds; omit to disable
    #[arg(long, env = "DOCPARSE_REQUEST_TIMEOUT_SECS")]
    pub request_timeout_secs: Option<u64>,

    /// Port number for the server
    #[arg(long, env = "DOCPARSE_PORT", default_value_t = 8000)]
    pub port: u16,

    /// Seconds to wait for in-flight requests to drain at shutdown
    #[arg(long, env = "DOCPARSE_SHUTDOWN_TIMEOUT_SECS", default_value_t = 3)]
    pub shutdown_timeout_secs: u64,
}

/// Validated runtime configuration for the processing tier.
#[derive(Debug, Clone)]
pub struct ServerConfig {
    pub server_addr: String,
    pub output_dir: PathBuf,
    pub accelerator: Accelerator,
    pub devices: usize,
    pub workers_per_device: usize,
    /// Best-effort request deadline. Expiry answers the client with a
    /// timeout error without interrupting the underlying device work.
    pub request_timeout: Option<Duration>,
    pub shutdown_timeout_secs: u64,
}

impl ServerConfig {
    /// Total number of (device, worker-index) slots.
    pub fn num_slots(&self) -> usize {
        self.devices * self.workers_per_device
    }
}

impl TryFrom<CliArgs> for ServerConfig {
    type Error = anyhow::Error;

    fn try_from(args: CliArgs) -> Result<Self, Self::Error> {
        if args.devices == 0 {
            bail!("--devices must be at least 1");
        }
        if args.workers_per_device == 0 {
            bail!("--workers-per-device must be at least 1");
        }

        Ok(Self {
            server_addr: format!("0.0.0.0:{}", args.port),
            output_dir: args.output_dir,
            accelerator: args.accelerator,
            devices: args.devices,
            workers_per_device: args.workers_per_device,
            request_timeout: args.request_timeout_secs.map(Duration::from_secs),
            shutdown_timeout_secs: args.shutdown_timeout_secs,
        })
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    fn args() -> CliArgs {
        CliArgs::parse_from(["docparse-tonic-server"])
    }

    #[test]
    fn defaults_map_onto_config() {
        let config = ServerConfig::try_from(args()).unwrap();
        assert_eq!(config.server_addr, "0.0.0.0:8000");
        assert_eq!(config.accelerator, Accelerator::Cuda);
        assert_eq!(config.num_slots(), 8);
        assert!(config.request_timeout.is_none());
    }

    #[test]
    fn zero_devices_is_rejected() {
        let mut cli = args();
        cli.devices = 0;
        assert!(ServerConfig::try_from(cli).is_err());
    }

    #[test]
    fn zero_workers_per_device_is_rejected() {
        let mut cli = args();
        cli.workers_per_device = 0;
        assert!(ServerConfig::try_from(cli).is_err());
    }
}
