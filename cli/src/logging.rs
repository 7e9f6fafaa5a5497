//! Tracing setup for the `skylog` binary
//!
//! Logs go to <data_dir>/skylog/logs/skylog.log (or platform equivalent),
//! next to the request traffic log written by the `llm` crate.

use config::PathManager;
use std::fs::File;
use std::path::PathBuf;
use tracing_appender::non_blocking::WorkerGuard;
use tracing_subscriber::{EnvFilter, Layer, filter::LevelFilter, fmt, prelude::*};

const DEFAULT_FILTER: &str = "info,skylog_core=debug,llm=debug";

fn env_filter() -> EnvFilter {
    EnvFilter::try_from_default_env().unwrap_or_else(|_| EnvFilter::new(DEFAULT_FILTER))
}

/// Install the global subscriber. With `trace_to_stderr`, every event is also
/// mirrored to stderr. Hold the returned guard until exit so buffered lines are flushed.
pub fn init_logging(trace_to_stderr: bool) -> Option<WorkerGuard> {
    let Some((file, path)) = open_log_file() else {
        init_stderr_logging(trace_to_stderr);
        return None;
    };

    let (non_blocking, guard) = tracing_appender::non_blocking(file);
    let file_layer = fmt::layer()
        .with_writer(non_blocking)
        .with_ansi(false)
        .with_target(true)
        .with_file(true)
        .with_line_number(true)
        .with_filter(env_filter());
    let trace_layer = trace_to_stderr.then(|| {
        fmt::layer()
            .with_writer(std::io::stderr)
            .with_target(true)
            .with_filter(LevelFilter::TRACE)
    });

    match tracing_subscriber::registry()
        .with(file_layer)
        .with(trace_layer)
        .try_init()
    {
        Ok(()) => tracing::info!("Logging initialized, writing to {:?}", path),
        Err(e) => eprintln!("[skylog] Failed to set tracing subscriber: {}", e),
    }
    Some(guard)
}

fn open_log_file() -> Option<(File, PathBuf)> {
    let path = PathManager::log_file_path()?;
    if let Some(parent) = path.parent() {
        if let Err(e) = std::fs::create_dir_all(parent) {
            eprintln!("[skylog] Failed to create log directory {:?}: {}", parent, e);
            return None;
        }
    }

    match std::fs::OpenOptions::new().create(true).append(true).open(&path) {
        Ok(file) => Some((file, path)),
        Err(e) => {
            eprintln!("[skylog] Failed to open log file {:?}: {}", path, e);
            None
        }
    }
}

fn init_stderr_logging(trace: bool) {
    let filter = if trace {
        EnvFilter::new("trace")
    } else {
        env_filter()
    };

    let subscriber = tracing_subscriber::registry().with(
        fmt::layer()
            .with_writer(std::io::stderr)
            .with_ansi(true)
            .with_target(true)
            .with_filter(filter),
    );

    let _ = subscriber.try_init();
}
