use std::{path::PathBuf, sync::LazyLock};

use anyhow::Result;
use tracing::level_filters::LevelFilter;
use tracing_appender::rolling::Rotation;
use tracing_subscriber::{
    fmt::{format::FmtSpan, writer::MakeWriterExt},
    EnvFilter,
};

const MAX_LOG_FILES: usize = 5;

/// Where logs go and how verbose they are.
#[derive(Debug, Clone)]
pub struct LogSettings {
    pub dir: PathBuf,
    pub file_prefix: String,
    /// Falls back to `RUST_LOG`, then to info.
    pub level: Option<LevelFilter>,
    /// Standard output is shared with the command output, so it's opt in.
    pub echo_to_stdout: bool,
}

/// Only this crate logs at the requested level. Dependencies (the http client mostly) report
/// warnings.
fn filter_directives(level: Option<LevelFilter>) -> String {
    let level = level
        .map(|v| v.to_string())
        .unwrap_or_else(|| std::env::var("RUST_LOG").unwrap_or_else(|_| "info".into()));
    format!("warn,{}={level}", env!("CARGO_PKG_NAME").replace('-', "_"))
}

/// Logs into daily rotated files.
pub fn enable_logging(settings: &LogSettings) -> Result<()> {
    let appender = tracing_appender::rolling::Builder::new()
        .rotation(Rotation::DAILY)
        .max_log_files(MAX_LOG_FILES)
        .filename_prefix(&settings.file_prefix)
        .build(&settings.dir)?;

    let echo = settings.echo_to_stdout;
    let stdout = std::io::stdout.with_filter(move |_| echo);

    tracing_subscriber::fmt()
        .with_env_filter(EnvFilter::new(filter_directives(settings.level)))
        .with_span_events(FmtSpan::CLOSE)
        .with_writer(stdout.and(appender))
        .pretty()
        .init();
    Ok(())
}

pub static TEST_LOGGING: LazyLock<()> = LazyLock::new(|| {
    tracing_subscriber::fmt()
        .with_max_level(LevelFilter::TRACE)
        .with_test_writer()
        .pretty()
        .init()
});

#[cfg(test)]
mod tests {
    use tracing::level_filters::LevelFilter;

    use super::filter_directives;

    #[test]
    fn test_explicit_level_applies_to_this_crate_only() {
        assert_eq!(
            filter_directives(Some(LevelFilter::TRACE)),
            "warn,timesheet=trace"
        );
    }
}
