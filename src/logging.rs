use std::fs::{self, OpenOptions};
use std::sync::Mutex;

use anyhow::{Context, Result};
use tracing_subscriber::{fmt, prelude::*, EnvFilter};

use crate::config::LogConfig;

pub const LOG_ENV: &str = "POSTFEED_LOG";

/// Routes `tracing` output to the configured log file. The terminal belongs
/// to the UI, so nothing is ever written to stdout or stderr.
pub fn init(cfg: &LogConfig) -> Result<()> {
    let Some(path) = cfg.file.as_ref() else {
        return Ok(());
    };

    if let Some(parent) = path.parent() {
        fs::create_dir_all(parent)
            .with_context(|| format!("logging: create directory {}", parent.display()))?;
    }
    let file = OpenOptions::new()
        .create(true)
        .append(true)
        .open(path)
        .with_context(|| format!("logging: open {}", path.display()))?;

    let filter = EnvFilter::try_from_env(LOG_ENV).unwrap_or_else(|_| filter_for(&cfg.level));

    tracing_subscriber::registry()
        .with(filter)
        .with(
            fmt::layer()
                .with_writer(Mutex::new(file))
                .with_ansi(false)
                .with_target(false),
        )
        .try_init()
        .context("logging: install subscriber")?;

    tracing::debug!(path = %path.display(), "logging initialised");
    Ok(())
}

fn filter_for(level: &str) -> EnvFilter {
    let directive = if level.contains('=') {
        level.to_string()
    } else {
        format!("post_feed={}", level)
    };
    EnvFilter::try_new(directive).unwrap_or_else(|_| EnvFilter::new("post_feed=warn"))
}
