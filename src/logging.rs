//! Tracing subscriber setup.
//!
//! The terminal UI owns the screen, so it logs to a file in the data dir.
//! CLI commands log to stderr. Level priority: `DOKKAN_CHECKLIST_LOG`, then
//! `RUST_LOG`, then the `-v`/`-q` flags.

use anyhow::{Context, Result};
use std::{fs, path::Path, sync::Mutex};
use time::macros::format_description;
use tracing::Level;
use tracing_subscriber::{fmt, fmt::time::UtcTime, prelude::*, EnvFilter};

const LOG_ENV: &str = "DOKKAN_CHECKLIST_LOG";

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum Verbosity {
    Quiet,
    Normal,
    Verbose,
}

impl Verbosity {
    pub fn from_flags(verbose: bool, quiet: bool) -> Self {
        if verbose {
            Self::Verbose
        } else if quiet {
            Self::Quiet
        } else {
            Self::Normal
        }
    }

    fn stderr_level(self) -> Level {
        match self {
            Self::Quiet => Level::ERROR,
            Self::Normal => Level::WARN,
            Self::Verbose => Level::DEBUG,
        }
    }

    // The log file is only read after the fact, so it keeps more by default.
    fn file_level(self) -> Level {
        match self {
            Self::Quiet => Level::WARN,
            Self::Normal => Level::INFO,
            Self::Verbose => Level::DEBUG,
        }
    }
}

pub fn init_stderr(verbosity: Verbosity) -> Result<()> {
    let layer = fmt::layer()
        .with_writer(std::io::stderr)
        .with_target(false)
        .without_time()
        .compact();
    tracing_subscriber::registry()
        .with(build_env_filter(verbosity.stderr_level()))
        .with(layer)
        .try_init()
        .context("install stderr logger")
}

pub fn init_file(path: &Path, verbosity: Verbosity) -> Result<()> {
    if let Some(parent) = path.parent() {
        fs::create_dir_all(parent).context("create log dir")?;
    }
    let file = fs::OpenOptions::new()
        .create(true)
        .append(true)
        .open(path)
        .context("open log file")?;
    let timer = UtcTime::new(format_description!(
        "[year]-[month]-[day] [hour]:[minute]:[second]"
    ));
    let layer = fmt::layer()
        .with_writer(Mutex::new(file))
        .with_ansi(false)
        .with_target(false)
        .with_timer(timer);
    tracing_subscriber::registry()
        .with(build_env_filter(verbosity.file_level()))
        .with(layer)
        .try_init()
        .context("install file logger")
}

fn build_env_filter(fallback: Level) -> EnvFilter {
    if let Ok(directives) = std::env::var(LOG_ENV) {
        if let Ok(filter) = EnvFilter::try_new(&directives) {
            return filter;
        }
    }
    if let Ok(filter) = EnvFilter::try_from_default_env() {
        return filter;
    }
    EnvFilter::new(fallback.as_str())
}
