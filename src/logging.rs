//! Logger bootstrap for the CLI.
//!
//! Diagnostics go to stderr so stdout stays clean for summaries. With a log
//! directory, records also go to size-rotated files and only warnings and
//! errors are echoed to stderr.

use std::path::Path;

use flexi_logger::{Cleanup, Criterion, Duplicate, FileSpec, Logger, LoggerHandle, Naming};
use log::info;

use crate::error::{Error, Result};

const LOG_FILE_BASENAME: &str = "entity_timeline";
const MAX_LOG_FILE_SIZE_BYTES: u64 = 10 * 1024 * 1024;
const MAX_LOG_FILES: usize = 5;

/// Start the logger. `RUST_LOG` takes precedence over `level`.
///
/// The returned handle must stay alive for the rest of the process.
pub fn init_logging(level: &str, log_dir: Option<&Path>) -> Result<LoggerHandle> {
    let level = normalize_level(level)?;

    let logger = Logger::try_with_env_or_str(level)
        .map_err(|e| Error::config(format!("invalid log level `{level}`: {e}")))?;

    let logger = match log_dir {
        Some(dir) => {
            std::fs::create_dir_all(dir)?;
            logger
                .log_to_file(
                    FileSpec::default()
                        .directory(dir)
                        .basename(LOG_FILE_BASENAME),
                )
                .rotate(
                    Criterion::Size(MAX_LOG_FILE_SIZE_BYTES),
                    Naming::Numbers,
                    Cleanup::KeepLogFiles(MAX_LOG_FILES),
                )
                .append()
                .duplicate_to_stderr(Duplicate::Warn)
                .format_for_files(flexi_logger::detailed_format)
        }
        None => logger.log_to_stderr(),
    };

    let handle = logger
        .format_for_stderr(flexi_logger::default_format)
        .start()
        .map_err(|e| Error::config(format!("failed to start logger: {e}")))?;

    info!(
        "event=app_start level={} log_dir={} version={}",
        level,
        log_dir
            .map(|d| d.display().to_string())
            .unwrap_or_else(|| "-".to_string()),
        env!("CARGO_PKG_VERSION")
    );
    Ok(handle)
}

fn normalize_level(level: &str) -> Result<&'static str> {
    match level.trim().to_ascii_lowercase().as_str() {
        "trace" => Ok("trace"),
        "debug" => Ok("debug"),
        "info" => Ok("info"),
        "warn" | "warning" => Ok("warn"),
        "error" => Ok("error"),
        "off" => Ok("off"),
        other => Err(Error::config(format!(
            "unsupported log level `{other}`; expected trace|debug|info|warn|error|off"
        ))),
    }
}
