//! SetuBridge - serial-to-UDP telemetry bridge
//!
//! Wakes an STM-class sensor acquisition board over a half-duplex
//! serial line, pulls a checksummed batch of fixed-layout binary
//! records, aggregates them into a JSON payload, and delivers that
//! payload to a network relay as (possibly chunked) UDP datagrams.

pub mod config;
pub mod error;
pub mod protocol;
pub mod transport;
pub mod uplink;

// Re-export commonly used types
pub use config::AppConfig;
pub use error::{Error, Result};
