//! Logging setup for viewlines tools.
//!
//! Logs always go to a file. Stderr logging is added when `VIEWLINES_LOG` or
//! `RUST_LOG` is set, and in debug builds.
//!
//! ## Environment Variables
//!
//! 1. **`VIEWLINES_LOG`** (highest priority). A bare level such as `debug`
//!    applies to the viewlines crates only; anything with filter syntax is used
//!    as-is.
//! 2. **`RUST_LOG`**, used verbatim.
//! 3. **Default**: `warn` globally, `info` for viewlines crates.
//!
//! ## Log File Location
//!
//! Default: `<data_local_dir>/viewlines/logs/viewlines-<pid>.log`
//! - macOS: `~/Library/Application Support/viewlines/logs/viewlines-12345.log`
//! - Linux: `~/.local/share/viewlines/logs/viewlines-12345.log`
//!
//! Override with [`LogConfig::log_file`]. A path with an extension names the
//! file, anything else names the directory.

use std::{
    env,
    path::{Path, PathBuf},
};
use tracing_appender::non_blocking::WorkerGuard;
use tracing_subscriber::{
    fmt, layer::SubscriberExt, util::SubscriberInitExt, EnvFilter, Layer, Registry,
};

pub type BoxError = Box<dyn std::error::Error + Send + Sync>;

const CRATES: &[&str] = &["viewlines", "viewlines_bin", "viewlines_log"];

/// Returned from [`init`]. Dropping it flushes and stops the file writer.
pub struct LogGuard {
    _file_guard: WorkerGuard,
    pub log_file: PathBuf,
}

#[derive(Debug, Clone, Default)]
pub struct LogConfig {
    pub log_file: Option<PathBuf>,
}

/// Initialize logging.
///
/// Fails if a global subscriber is already installed.
pub fn init(config: LogConfig) -> Result<LogGuard, BoxError> {
    let (log_dir, filename) = resolve_log_path(config.log_file);
    std::fs::create_dir_all(&log_dir)?;

    let file_appender = tracing_appender::rolling::never(&log_dir, &filename);
    let (non_blocking_file, file_guard) = tracing_appender::non_blocking(file_appender);

    let file_layer = fmt::layer()
        .with_writer(non_blocking_file)
        .with_ansi(false)
        .with_filter(file_filter());

    let stderr_enabled = env_configured() || cfg!(debug_assertions);
    let stderr_layer =
        stderr_enabled.then(|| fmt::layer().with_writer(std::io::stderr).with_filter(filter()));

    Registry::default()
        .with(file_layer)
        .with(stderr_layer)
        .try_init()?;

    Ok(LogGuard {
        _file_guard: file_guard,
        log_file: log_dir.join(filename),
    })
}

/// Initialize logging for tests.
///
/// Writes through the test harness's captured output. Safe to call from every
/// test, only the first call installs a subscriber.
pub fn test() {
    let _ = fmt()
        .with_env_filter(filter())
        .with_test_writer()
        .try_init();
}

fn env_configured() -> bool {
    env::var("VIEWLINES_LOG").is_ok() || env::var("RUST_LOG").is_ok()
}

fn resolve_log_path(override_path: Option<PathBuf>) -> (PathBuf, String) {
    let filename = format!("viewlines-{}.log", std::process::id());

    match override_path {
        Some(path) if path.extension().is_some() => {
            let dir = path
                .parent()
                .filter(|parent| !parent.as_os_str().is_empty())
                .unwrap_or_else(|| Path::new("."))
                .to_path_buf();
            let name = path
                .file_name()
                .map_or(filename, |name| name.to_string_lossy().into_owned());
            (dir, name)
        },
        Some(dir) => (dir, filename),
        None => {
            let dir = dirs::data_local_dir()
                .unwrap_or_else(|| PathBuf::from("."))
                .join("viewlines")
                .join("logs");
            (dir, filename)
        },
    }
}

/// The file only records warnings unless the environment asks for more.
fn file_filter() -> EnvFilter {
    if env_configured() {
        filter()
    } else {
        EnvFilter::new("warn")
    }
}

/// [`EnvFilter`] following `VIEWLINES_LOG` > `RUST_LOG` > defaults.
fn filter() -> EnvFilter {
    if let Ok(directives) = env::var("VIEWLINES_LOG") {
        return EnvFilter::new(expand(&directives));
    }
    if let Ok(rust_log) = env::var("RUST_LOG") {
        return EnvFilter::new(rust_log);
    }
    EnvFilter::new(expand("info"))
}

/// Expand a bare level into per-crate directives.
///
/// `debug` becomes `warn,viewlines=debug,viewlines_bin=debug,...`. Values with
/// filter syntax pass through unchanged.
fn expand(directives: &str) -> String {
    if directives.contains(['=', ':', ',']) {
        return directives.to_string();
    }
    let crates: Vec<String> = CRATES
        .iter()
        .map(|name| format!("{name}={directives}"))
        .collect();
    format!("warn,{}", crates.join(","))
}
