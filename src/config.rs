//! Configuration for the bridge daemon
//!
//! Loads configuration from a TOML file with the minimal parameters
//! needed to run the serial session loop and the datagram uplink.

use crate::error::Result;
use crate::protocol::checksum::ChecksumMode;
use crate::protocol::constants::{
    DEFAULT_CHUNK_PACING_MS, DEFAULT_LINE_TIMEOUT_MS, DEFAULT_MAX_CHUNK_BYTES,
};
use serde::{Deserialize, Serialize};
use std::fs;
use std::path::Path;

/// Top-level application configuration
#[derive(Debug, Clone, Deserialize, Serialize)]
pub struct AppConfig {
    pub hardware: HardwareConfig,
    pub session: SessionSettings,
    pub uplink: UplinkConfig,
    pub logging: LoggingConfig,
}

/// Hardware configuration (serial port)
#[derive(Debug, Clone, Deserialize, Serialize)]
pub struct HardwareConfig {
    /// Acquisition board serial port
    pub port: String,
    /// Baud rate
    pub baud: u32,
}

/// Session loop settings
#[derive(Debug, Clone, Deserialize, Serialize)]
pub struct SessionSettings {
    /// CRC variant the board firmware was built with
    pub checksum_mode: ChecksumMode,
    /// Per-expected-line deadline in milliseconds
    pub line_timeout_ms: u64,
    /// Pause between successful sessions in milliseconds
    pub poll_interval_ms: u64,
    /// Back-off after a fatal session failure before retrying from Wake
    pub retry_backoff_ms: u64,
}

/// Datagram uplink configuration
#[derive(Debug, Clone, Deserialize, Serialize)]
pub struct UplinkConfig {
    /// Relay destination, `ip:port`
    pub relay_address: String,
    /// Largest payload slice per datagram
    pub max_chunk_bytes: usize,
    /// Delay between consecutive chunk sends in milliseconds
    pub chunk_pacing_ms: u64,
}

/// Logging configuration
#[derive(Debug, Clone, Deserialize, Serialize)]
pub struct LoggingConfig {
    /// Log level (trace, debug, info, warn, error)
    pub level: String,
    /// Log output (stdout, stderr, or file path)
    pub output: String,
}

impl AppConfig {
    /// Load configuration from TOML file
    pub fn from_file<P: AsRef<Path>>(path: P) -> Result<Self> {
        let contents = fs::read_to_string(path)?;
        let config: AppConfig = toml::from_str(&contents)?;
        Ok(config)
    }

    /// Default configuration, suitable for testing and development
    pub fn defaults() -> Self {
        Self {
            hardware: HardwareConfig {
                port: "/dev/ttyUSB0".to_string(),
                baud: 115_200,
            },
            session: SessionSettings {
                checksum_mode: ChecksumMode::Modbus,
                line_timeout_ms: DEFAULT_LINE_TIMEOUT_MS,
                poll_interval_ms: 60_000,
                retry_backoff_ms: 5_000,
            },
            uplink: UplinkConfig {
                relay_address: "192.168.1.50:9000".to_string(),
                max_chunk_bytes: DEFAULT_MAX_CHUNK_BYTES,
                chunk_pacing_ms: DEFAULT_CHUNK_PACING_MS,
            },
            logging: LoggingConfig {
                level: "info".to_string(),
                output: "stdout".to_string(),
            },
        }
    }

    /// Save configuration to TOML file
    pub fn to_file<P: AsRef<Path>>(&self, path: P) -> Result<()> {
        let contents = toml::to_string_pretty(self)?;
        fs::write(path, contents)?;
        Ok(())
    }
}

impl Default for AppConfig {
    fn default() -> Self {
        Self::defaults()
    }
}
