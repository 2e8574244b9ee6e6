//! Log output for the CLI: stderr, plus a daily-rolling file when configured

use anyhow::Context;
use kiosksearch_common::init_tracing;
use kiosksearch_config::TelemetryConfig;
use tracing_appender::non_blocking::WorkerGuard;
use tracing_appender::rolling::{RollingFileAppender, Rotation};
use tracing_subscriber::fmt::writer::MakeWriterExt;

const LOG_FILE_PREFIX: &str = "kiosksearch";

/// Flushes the non-blocking writers when dropped
pub struct LogGuards {
    _guards: Vec<WorkerGuard>,
}

/// Install the global subscriber described by `telemetry`
pub fn init(telemetry: &TelemetryConfig) -> anyhow::Result<LogGuards> {
    let (stderr_writer, stderr_guard) = tracing_appender::non_blocking(std::io::stderr());
    let mut guards = vec![stderr_guard];

    if let Some(log_dir) = &telemetry.log_dir {
        std::fs::create_dir_all(log_dir)
            .with_context(|| format!("Failed to create log directory '{}'", log_dir.display()))?;

        let appender = RollingFileAppender::builder()
            .rotation(Rotation::DAILY)
            .filename_prefix(LOG_FILE_PREFIX)
            .filename_suffix("log")
            .build(log_dir)
            .context("Failed to open rolling log file")?;
        let (file_writer, file_guard) = tracing_appender::non_blocking(appender);
        guards.push(file_guard);

        init_tracing(
            &telemetry.tracing_level,
            telemetry.json_logs,
            file_writer.and(stderr_writer),
        )?;
    } else {
        init_tracing(&telemetry.tracing_level, telemetry.json_logs, stderr_writer)?;
    }

    Ok(LogGuards { _guards: guards })
}
