use std::fmt;
use std::path::Path;

use fieldlog_core::{Clock, SystemClock};
use tracing_appender::non_blocking::WorkerGuard;
use tracing_appender::rolling::{RollingFileAppender, Rotation};
use tracing_subscriber::fmt::format::Writer;
use tracing_subscriber::fmt::time::FormatTime;
use tracing_subscriber::prelude::*;
use tracing_subscriber::{EnvFilter, fmt as tfmt};

/// Log timestamps in the ledger's civil time rather than UTC.
struct LedgerTime(SystemClock);

impl FormatTime for LedgerTime {
    fn format_time(&self, w: &mut Writer<'_>) -> fmt::Result {
        write!(w, "{}", self.0.datetime_str())
    }
}

/// Log to stdout and to `<log_dir>/fieldlog.log`. Keep the guard alive for
/// the life of the process so buffered file lines are flushed.
pub fn init(log_dir: &Path) -> anyhow::Result<WorkerGuard> {
    std::fs::create_dir_all(log_dir)?;
    let file_appender = RollingFileAppender::builder()
        .rotation(Rotation::NEVER)
        .filename_prefix("fieldlog")
        .filename_suffix("log")
        .build(log_dir)?;
    let (non_blocking, guard) = tracing_appender::non_blocking(file_appender);

    let filter = EnvFilter::try_from_default_env().unwrap_or_else(|_| EnvFilter::new("info"));

    tracing_subscriber::registry()
        .with(filter)
        .with(
            tfmt::layer()
                .with_writer(std::io::stdout)
                .with_timer(LedgerTime(SystemClock::default()))
                .with_target(false),
        )
        .with(
            tfmt::layer()
                .with_writer(non_blocking)
                .with_timer(LedgerTime(SystemClock::default()))
                .with_ansi(false),
        )
        .init();

    Ok(guard)
}
