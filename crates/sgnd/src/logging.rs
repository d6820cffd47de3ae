//! Tracing setup: human-readable stderr for operators plus an
//! append-only JSONL file sink under `<data-dir>/logs` for audit
//! trails of accept/drop/verify decisions (spec §6/§7).

use std::path::Path;

use tracing_appender::non_blocking::WorkerGuard;
use tracing_subscriber::fmt::writer::MakeWriterExt;
use tracing_subscriber::{EnvFilter, fmt, prelude::*};

/// Must be held for the process lifetime: dropping it stops the
/// background flush thread for the JSONL appender.
pub struct LoggingGuard {
    _file_guard: WorkerGuard,
}

pub fn init(logs_dir: &Path) -> anyhow::Result<LoggingGuard> {
    std::fs::create_dir_all(logs_dir)?;

    let file_appender = tracing_appender::rolling::daily(logs_dir, "daemon.jsonl");
    let (non_blocking, file_guard) = tracing_appender::non_blocking(file_appender);

    let env_filter = EnvFilter::try_from_default_env().unwrap_or_else(|_| EnvFilter::new("info"));

    let stderr_layer = fmt::layer().with_writer(std::io::stderr.with_max_level(tracing::Level::TRACE));
    let file_layer = fmt::layer().json().with_writer(non_blocking);

    tracing_subscriber::registry()
        .with(env_filter)
        .with(stderr_layer)
        .with(file_layer)
        .init();

    Ok(LoggingGuard {
        _file_guard: file_guard,
    })
}
