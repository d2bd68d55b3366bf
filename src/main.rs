//! # Wheel Bridge
//!
//! Turn a repurposed racing wheel and pedal set into a HID gamepad.
//!
//! This application samples the wheel, runs the calibrated signal pipeline and
//! writes one gamepad report per tick, while serving the operator console.

use anyhow::{Context, Result};
use std::io::{self, Write};
use std::time::Instant;
use tokio::time::{interval, MissedTickBehavior};
use tracing::info;

use wheel_bridge::bridge::{Bridge, BridgeOptions, TickOutcome};
use wheel_bridge::calibration::store::{CalibrationStore, FileStorage};
use wheel_bridge::config::{Config, ConsoleKind};
use wheel_bridge::console::link::{ConsoleLink, DEFAULT_DEVICE_PATHS};
use wheel_bridge::hid::report::JsonlReportSink;
use wheel_bridge::hid::rotating::RotatingFile;
use wheel_bridge::input::{IdleSource, InputSource, ReplaySource};

/// Configuration file used when none is given on the command line
const DEFAULT_CONFIG_PATH: &str = "config/default.toml";

/// Number of reports between status log messages
const LOG_INTERVAL_REPORTS: u64 = 6000;

/// Main entry point for Wheel Bridge
///
/// # Control Flow
///
/// 1. **Initialization**
///    - Set up logging on a non-blocking stderr writer (stdout may be the console)
///    - Load configuration (first argument, or `config/default.toml`)
///    - Open storage, input source, report output and console
///    - Load stored calibration and apply the axis ranges
///
/// 2. **Main Loop**
///    - Tick the bridge at the configured interval
///    - Log status every 6000 reports
///    - Handle Ctrl+C for graceful shutdown
///
/// # Errors
///
/// Returns error if:
/// - Configuration cannot be read or is invalid
/// - The replay file or report file cannot be opened
/// - The serial console cannot be opened
/// - Stored calibration cannot be read
///
/// # Examples
///
/// ```bash
/// cargo run --release -- config/default.toml
/// ```
#[tokio::main(flavor = "current_thread")]
async fn main() -> Result<()> {
    // Initialize logging
    let (log_writer, _log_guard) = tracing_appender::non_blocking(io::stderr());
    tracing_subscriber::fmt()
        .with_writer(log_writer)
        .with_env_filter(
            tracing_subscriber::EnvFilter::from_default_env()
                .add_directive(tracing::Level::INFO.into())
        )
        .init();

    info!("Wheel Bridge v{} starting...", env!("CARGO_PKG_VERSION"));

    let config_path = std::env::args().nth(1).unwrap_or_else(|| DEFAULT_CONFIG_PATH.to_string());
    let config = Config::load_or_default(&config_path)
        .with_context(|| format!("loading configuration from {}", config_path))?;

    let store = CalibrationStore::new(FileStorage::new(&config.storage.path, config.storage.size));
    info!("Calibration storage: {}", config.storage.path);

    let source: Box<dyn InputSource> = match config.inputs.replay_path() {
        Some(path) => Box::new(
            ReplaySource::load(&path).with_context(|| format!("loading replay {}", path.display()))?,
        ),
        None => {
            info!("No replay configured, wheel stays idle");
            Box::new(IdleSource::default())
        }
    };

    let report_writer: Box<dyn Write> = if config.report.enabled {
        let file = RotatingFile::open(
            &config.report.path,
            config.report.max_records_per_file,
            config.report.max_files_to_keep,
        )
        .with_context(|| format!("opening report output {}", config.report.path))?;
        info!(
            "Writing reports to {} ({} per file, {} files kept)",
            config.report.path, config.report.max_records_per_file, config.report.max_files_to_keep
        );
        Box::new(file)
    } else {
        info!("Report output disabled");
        Box::new(io::sink())
    };

    let console = match config.console.kind {
        ConsoleKind::Stdio => ConsoleLink::stdio()?,
        ConsoleKind::Serial if config.console.port.is_empty() => {
            ConsoleLink::open_serial(DEFAULT_DEVICE_PATHS, config.console.baud_rate)?
        }
        ConsoleKind::Serial => ConsoleLink::open_serial(&[config.console.port.as_str()], config.console.baud_rate)?,
    };
    info!("Operator console on {}", console.description());

    let options = BridgeOptions {
        stages: config.pipeline.stages(),
        analog_threshold: config.inputs.analog_threshold,
        timeouts: config.calibration.timeouts(),
    };
    let mut bridge = Bridge::new(source, JsonlReportSink::new(report_writer), console, store, options);
    bridge.start().context("loading stored calibration")?;

    let mut tick_interval = interval(config.control.tick_interval());
    tick_interval.set_missed_tick_behavior(MissedTickBehavior::Skip);

    info!("Starting control loop every {} ms", config.control.tick_interval_ms);
    info!("Press Ctrl+C to exit");

    let mut last_log_count: u64 = 0;

    // Main control loop
    loop {
        tokio::select! {
            _ = tick_interval.tick() => {
                if let TickOutcome::SessionEnded(outcome) = bridge.tick(Instant::now()) {
                    info!("Back to normal mode after calibration ({:?})", outcome);
                }

                let sent = bridge.sink().reports_sent();
                if sent - last_log_count >= LOG_INTERVAL_REPORTS {
                    info!("Sent {} reports", sent);
                    last_log_count = sent;
                }
            }

            // Handle Ctrl+C for graceful shutdown
            _ = tokio::signal::ctrl_c() => {
                info!("Received Ctrl+C, shutting down...");
                info!("Total reports sent: {}", bridge.sink().reports_sent());
                break;
            }
        }
    }

    Ok(())
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_default_config_path() {
        assert_eq!(DEFAULT_CONFIG_PATH, "config/default.toml");
    }

    #[test]
    fn test_log_interval_constant() {
        assert_eq!(LOG_INTERVAL_REPORTS, 6000);

        // At the default 10 ms tick, 6000 reports = 1 minute
        let seconds = LOG_INTERVAL_REPORTS as f64 * 10.0 / 1000.0;
        assert_eq!(seconds, 60.0);
    }

    #[test]
    fn test_bundled_config_is_valid() {
        let path = concat!(env!("CARGO_MANIFEST_DIR"), "/config/default.toml");
        let config = Config::load(path).unwrap();
        assert_eq!(config, Config::default());
    }
}
