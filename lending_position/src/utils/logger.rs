use anyhow::{Context, Result};
use tracing_appender::rolling::{RollingFileAppender, Rotation};
use tracing_subscriber::filter::EnvFilter;
use tracing_subscriber::fmt::Layer as FmtLayer;
use tracing_subscriber::layer::SubscriberExt;
use tracing_subscriber::util::SubscriberInitExt;
use tracing_subscriber::Layer;

/// Setup logger configuration for the lending position service
///
/// If LOG_INSIDE_FILE=true:
/// - Console output for all log levels
/// - A combined log file under LOG_DIRECTORY (default `.logs`)
/// - A separate file for warnings and above (failed reads, degraded positions)
///
/// If LOG_INSIDE_FILE=false (default):
/// - Only console output for all log levels
///
/// Files rotate daily
pub fn setup_logger() -> Result<()> {
    let log_inside_file: bool = std::env::var("LOG_INSIDE_FILE")
        .unwrap_or("false".to_string())
        .parse()
        .unwrap_or(false);
    let log_directory = std::env::var("LOG_DIRECTORY").unwrap_or(".logs".to_string());

    // Set default log level to INFO if RUST_LOG is not set
    let env_filter = EnvFilter::try_from_default_env().unwrap_or_else(|_| EnvFilter::new("info"));

    let console_layer = FmtLayer::new()
        .with_line_number(false)
        .with_target(false)
        .with_thread_ids(false);

    let registry = tracing_subscriber::registry()
        .with(env_filter)
        .with(console_layer);

    if !log_inside_file {
        registry
            .try_init()
            .context("Failed to install console subscriber")?;
        return Ok(());
    }

    let combined_appender = RollingFileAppender::builder()
        .rotation(Rotation::DAILY)
        .filename_prefix("lending")
        .filename_suffix("log")
        .build(&log_directory)
        .context("Failed to create combined logs appender")?;

    let warn_appender = RollingFileAppender::builder()
        .rotation(Rotation::DAILY)
        .filename_prefix("lending-warn")
        .filename_suffix("log")
        .build(&log_directory)
        .context("Failed to create warnings appender")?;

    let combined_layer = FmtLayer::new()
        .with_writer(combined_appender)
        .with_ansi(false)
        .with_thread_ids(false);

    let warn_layer = FmtLayer::new()
        .with_writer(warn_appender)
        .with_ansi(false)
        .with_thread_ids(false)
        .with_filter(EnvFilter::new("warn"));

    registry
        .with(combined_layer)
        .with(warn_layer)
        .try_init()
        .context("Failed to install file subscriber")?;

    Ok(())
}
