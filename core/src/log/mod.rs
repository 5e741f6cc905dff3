//! Tracing bootstrap for the viewer.
//!
//! Events go to two sinks: a rolling file under the platform data directory and stderr. Records
//! emitted through the `log` crate (e.g. by dependencies) are forwarded into `tracing`. Call
//! [`init`] once at startup; repeated calls hand back the handle from the first one.

use std::ffi::OsStr;
use std::fs;
use std::path::{Path, PathBuf};
use std::sync::OnceLock;
use std::time::SystemTime;

use anyhow::{Context, Result, anyhow};
use tracing_appender::rolling::Rotation;
use tracing_subscriber::prelude::*;
use tracing_subscriber::{EnvFilter, filter::LevelFilter, util::SubscriberInitExt};

/// Environment variables consulted, in order, for a filter directive.
pub const FILTER_ENV_VARS: [&str; 2] = ["COMIC_VIEWER_LOG", "RUST_LOG"];

static LOG_HANDLE: OnceLock<LogHandle> = OnceLock::new();

pub use tracing_subscriber::filter::LevelFilter as LogLevel;

/// How often the file sink starts a new file.
#[derive(Debug, Clone, Copy, Eq, PartialEq)]
pub enum LogRolling {
    Hourly,
    Daily,
    Never,
}

impl LogRolling {
    fn rotation(self) -> Rotation {
        match self {
            LogRolling::Hourly => Rotation::HOURLY,
            LogRolling::Daily => Rotation::DAILY,
            LogRolling::Never => Rotation::NEVER,
        }
    }
}

#[derive(Debug, Clone)]
pub struct LogConfig {
    /// Directory holding the rolled files.
    pub directory: PathBuf,
    /// File name prefix; files end in `.log`.
    pub file_prefix: String,
    /// Rolled files to keep. `None` keeps everything.
    pub retention: Option<usize>,
    pub file_level: LevelFilter,
    pub console_level: LevelFilter,
    /// Forward `log` records into `tracing`.
    pub capture_log: bool,
    /// Filter directive such as `viewer_core=debug`. Falls back to [`FILTER_ENV_VARS`].
    pub env_filter: Option<String>,
    pub rolling: LogRolling,
}

impl Default for LogConfig {
    fn default() -> Self {
        Self {
            directory: default_log_directory(),
            file_prefix: "viewer".to_string(),
            retention: Some(7),
            file_level: LevelFilter::DEBUG,
            console_level: if cfg!(debug_assertions) {
                LevelFilter::INFO
            } else {
                LevelFilter::WARN
            },
            capture_log: true,
            env_filter: directive_from_env(),
            rolling: LogRolling::Daily,
        }
    }
}

impl LogConfig {
    pub fn with_directory<P: Into<PathBuf>>(mut self, path: P) -> Self {
        self.directory = path.into();
        self
    }

    pub fn with_prefix<S: Into<String>>(mut self, prefix: S) -> Self {
        self.file_prefix = prefix.into();
        self
    }

    pub fn with_filter<S: Into<String>>(mut self, directive: S) -> Self {
        self.env_filter = Some(directive.into());
        self
    }
}

/// Keeps the background file writer alive for the life of the process.
#[derive(Debug)]
pub struct LogHandle {
    _guard: tracing_appender::non_blocking::WorkerGuard,
    directory: PathBuf,
    file_prefix: String,
}

impl LogHandle {
    pub fn directory(&self) -> &Path {
        &self.directory
    }

    pub fn file_prefix(&self) -> &str {
        &self.file_prefix
    }
}

/// Install the global subscriber. The first call wins; later configurations are ignored.
pub fn init(config: LogConfig) -> Result<&'static LogHandle> {
    if let Some(handle) = LOG_HANDLE.get() {
        return Ok(handle);
    }

    let handle = install(config)?;
    let _ = LOG_HANDLE.set(handle);
    LOG_HANDLE.get().ok_or_else(|| anyhow!("log handle missing after initialisation"))
}

fn install(config: LogConfig) -> Result<LogHandle> {
    if config.capture_log {
        let max = config.file_level.max(config.console_level);
        let _ = tracing_log::LogTracer::builder().with_max_level(to_log_level(max)).init();
    }

    fs::create_dir_all(&config.directory)
        .with_context(|| format!("creating log directory at {}", config.directory.display()))?;

    if let Some(keep) = config.retention.filter(|keep| *keep > 0) {
        prune_old_logs(&config.directory, &config.file_prefix, keep)
            .context("pruning old log files")?;
    }

    let appender = tracing_appender::rolling::Builder::new()
        .rotation(config.rolling.rotation())
        .filename_prefix(&config.file_prefix)
        .filename_suffix("log")
        .build(&config.directory)
        .context("creating rolling log appender")?;
    let (file_writer, guard) = tracing_appender::non_blocking(appender);

    let directive = config
        .env_filter
        .or_else(directive_from_env)
        .unwrap_or_else(|| if cfg!(debug_assertions) { "debug" } else { "info" }.to_string());
    let env_filter = EnvFilter::try_new(&directive)
        .with_context(|| format!("parsing log filter {directive:?}"))?;

    let file_layer = tracing_subscriber::fmt::layer()
        .with_ansi(false)
        .with_writer(file_writer)
        .with_target(true)
        .with_file(true)
        .with_line_number(true)
        .with_filter(config.file_level);

    let console_layer = tracing_subscriber::fmt::layer()
        .with_writer(std::io::stderr)
        .with_filter(config.console_level);

    tracing_subscriber::registry()
        .with(env_filter)
        .with(file_layer)
        .with(console_layer)
        .try_init()
        .map_err(|err| anyhow!(err))?;

    tracing::debug!(
        target: "viewer::log",
        directory = %config.directory.display(),
        "logging ready"
    );
    Ok(LogHandle { _guard: guard, directory: config.directory, file_prefix: config.file_prefix })
}

fn directive_from_env() -> Option<String> {
    FILTER_ENV_VARS
        .iter()
        .find_map(|var| std::env::var(var).ok())
        .filter(|directive| !directive.trim().is_empty())
}

fn to_log_level(level: LevelFilter) -> log::LevelFilter {
    match level {
        LevelFilter::OFF => log::LevelFilter::Off,
        LevelFilter::ERROR => log::LevelFilter::Error,
        LevelFilter::WARN => log::LevelFilter::Warn,
        LevelFilter::INFO => log::LevelFilter::Info,
        LevelFilter::DEBUG => log::LevelFilter::Debug,
        _ => log::LevelFilter::Trace,
    }
}

fn prune_old_logs(dir: &Path, prefix: &str, keep: usize) -> Result<()> {
    let mut files: Vec<(PathBuf, SystemTime)> = fs::read_dir(dir)
        .with_context(|| format!("reading log directory at {}", dir.display()))?
        .filter_map(|entry| entry.ok())
        .filter_map(|entry| {
            let meta = entry.metadata().ok()?;
            let path = entry.path();
            if !meta.is_file() || !has_prefix(&path, prefix) {
                return None;
            }
            Some((path, meta.modified().unwrap_or(SystemTime::UNIX_EPOCH)))
        })
        .collect();

    if files.len() <= keep {
        return Ok(());
    }

    files.sort_by_key(|(_, modified)| *modified);
    let excess = files.len() - keep;
    for (path, _) in files.into_iter().take(excess) {
        let _ = fs::remove_file(&path);
    }
    Ok(())
}

fn has_prefix(path: &Path, prefix: &str) -> bool {
    path.file_name().and_then(OsStr::to_str).is_some_and(|name| name.starts_with(prefix))
}

fn default_log_directory() -> PathBuf {
    match directories::ProjectDirs::from("com", "ComicViewer", "comic-viewer") {
        Some(dirs) => dirs.data_dir().join("logs"),
        None => std::env::temp_dir().join("comic-viewer-logs"),
    }
}
