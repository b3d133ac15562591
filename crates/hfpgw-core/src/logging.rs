//! File logging
//!
//! stdout carries the bridge protocol, so diagnostics go to a daily log
//! file under the platform data directory.

use std::path::{Path, PathBuf};

use tracing_appender::rolling::{RollingFileAppender, Rotation};
use tracing_subscriber::{fmt, prelude::*, EnvFilter};

use crate::error::{Error, Result};

/// Environment variable holding the filter directives
pub const LOG_ENV: &str = "HFPGW_LOG";

/// Directives used when [`LOG_ENV`] is unset or does not parse
pub const DEFAULT_DIRECTIVES: &str = "hfpgw=info,hfpgw_app=info,hfpgw_modem=info,warn";

const LOG_FILE_PREFIX: &str = "hfpgw.log";

/// `<data dir>/hfpgw/logs`, or `./hfpgw/logs` without a data directory
pub fn log_directory() -> PathBuf {
    dirs::data_local_dir()
        .unwrap_or_else(|| PathBuf::from("."))
        .join("hfpgw")
        .join("logs")
}

fn filter_from(directives: Option<&str>) -> EnvFilter {
    directives
        .and_then(|d| EnvFilter::try_new(d).ok())
        .unwrap_or_else(|| EnvFilter::new(DEFAULT_DIRECTIVES))
}

/// Install the global subscriber and return the directory it writes to.
///
/// ```bash
/// HFPGW_LOG=debug hfpgw
/// HFPGW_LOG=hfpgw_app=trace hfpgw
/// ```
pub fn init() -> Result<PathBuf> {
    let dir = log_directory();
    install(&dir)?;
    Ok(dir)
}

fn install(dir: &Path) -> Result<()> {
    std::fs::create_dir_all(dir)?;

    let appender = RollingFileAppender::new(Rotation::DAILY, dir, LOG_FILE_PREFIX);
    let directives = std::env::var(LOG_ENV).ok();
    let timer = fmt::time::ChronoLocal::new("%Y-%m-%d %H:%M:%S%.3f".to_string());

    tracing_subscriber::registry()
        .with(filter_from(directives.as_deref()))
        .with(
            fmt::layer()
                .with_writer(appender)
                .with_ansi(false)
                .with_file(true)
                .with_line_number(true)
                .with_timer(timer),
        )
        .try_init()
        .map_err(|e| Error::config(format!("logging already installed: {}", e)))
}
