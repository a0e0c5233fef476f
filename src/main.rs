//! SetuBridge - serial-to-UDP telemetry bridge daemon
//!
//! Runs acquisition sessions against the sensor board on a fixed
//! cadence and hands each session's JSON payload to the datagram
//! uplink. Retry policy lives here: the protocol core never retries on
//! its own, so a fatal framing failure backs off and re-invokes the
//! whole session from the wake byte.

use setu_bridge::config::AppConfig;
use setu_bridge::error::{Error, Result};
use setu_bridge::protocol::{Session, SessionConfig};
use setu_bridge::transport::SerialTransport;
use setu_bridge::uplink::{ChunkedSender, UdpSink};
use std::env;
use std::net::SocketAddr;
use std::sync::atomic::{AtomicBool, Ordering};
use std::sync::Arc;
use std::time::Duration;

/// Parse config path from command line arguments.
///
/// Supports:
/// - `setu-bridge <path>` (positional)
/// - `setu-bridge --config <path>` (flag-based)
/// - `setu-bridge -c <path>` (short flag)
///
/// Defaults to `/etc/setu-bridge.toml` if not specified.
fn parse_config_path() -> String {
    let args: Vec<String> = env::args().collect();

    // Look for --config or -c flag
    for i in 1..args.len() {
        if (args[i] == "--config" || args[i] == "-c") && i + 1 < args.len() {
            return args[i + 1].clone();
        }
    }

    // Fall back to first positional argument (if it doesn't start with -)
    if args.len() > 1 && !args[1].starts_with('-') {
        return args[1].clone();
    }

    // Default path
    "/etc/setu-bridge.toml".to_string()
}

fn main() -> Result<()> {
    // Initialize logger
    env_logger::Builder::from_env(env_logger::Env::default().default_filter_or("info")).init();

    log::info!("SetuBridge v{} starting...", env!("CARGO_PKG_VERSION"));

    let config_path = parse_config_path();
    log::info!("Using config: {}", config_path);
    let config = AppConfig::from_file(&config_path)?;

    let relay: SocketAddr = config
        .uplink
        .relay_address
        .parse()
        .map_err(|e| Error::InvalidParameter(format!("relay_address: {}", e)))?;

    // Set up shutdown signal handler
    let running = Arc::new(AtomicBool::new(true));
    let r = Arc::clone(&running);

    ctrlc::set_handler(move || {
        log::info!("Received shutdown signal");
        r.store(false, Ordering::Relaxed);
    })
    .map_err(|e| Error::Other(format!("Error setting Ctrl-C handler: {}", e)))?;

    // Serial side: the acquisition board
    let mut serial = SerialTransport::open(&config.hardware.port, config.hardware.baud)?;
    let session = Session::new(SessionConfig {
        checksum_mode: config.session.checksum_mode,
        line_timeout: Duration::from_millis(config.session.line_timeout_ms),
    });

    // Network side: the relay
    let sink = UdpSink::new()?;
    let mut uplink = ChunkedSender::new(
        sink,
        config.uplink.max_chunk_bytes,
        Duration::from_millis(config.uplink.chunk_pacing_ms),
    );
    log::info!("Uplink to {} ({}B chunks)", relay, config.uplink.max_chunk_bytes);

    let poll_interval = Duration::from_millis(config.session.poll_interval_ms);
    let retry_backoff = Duration::from_millis(config.session.retry_backoff_ms);

    log::info!("SetuBridge running. Press Ctrl-C to stop.");

    while running.load(Ordering::Relaxed) {
        match session.run(&mut serial) {
            Ok(result) => {
                log::info!(
                    "Batch collected: {} accepted, {} rejected, max_ts={}",
                    result.accepted,
                    result.rejected,
                    result.max_timestamp
                );

                if let Err(e) = uplink.send(relay, result.json.as_bytes()) {
                    // Delivery is best-effort; the next session produces
                    // a fresh payload, so this batch is simply lost.
                    log::error!("Uplink delivery failed: {}", e);
                }

                sleep_while_running(&running, poll_interval);
            }
            Err(e) => {
                log::warn!("Session failed ({}), retrying from wake", e);
                sleep_while_running(&running, retry_backoff);
            }
        }
    }

    log::info!("SetuBridge stopped");
    Ok(())
}

/// Sleep in short slices so Ctrl-C stays responsive
fn sleep_while_running(running: &AtomicBool, total: Duration) {
    let slice = Duration::from_millis(100);
    let mut remaining = total;
    while running.load(Ordering::Relaxed) && !remaining.is_zero() {
        let step = remaining.min(slice);
        std::thread::sleep(step);
        remaining -= step;
    }
}
