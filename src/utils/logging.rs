use std::{
    path::{Path, PathBuf},
    sync::LazyLock,
};

use anyhow::{anyhow, Result};
use tracing::level_filters::LevelFilter;
use tracing_appender::rolling::Rotation;
use tracing_subscriber::{
    fmt::{format::FmtSpan, writer::MakeWriterExt},
    EnvFilter,
};

pub const CLI_PREFIX: &str = "cli";
pub const SHORT_PREFIX: &str = "short";

/// Log files kept around, older ones are pruned on rotation.
const KEPT_LOG_FILES: usize = 5;

/// Installs the global subscriber. Logs always go to a daily rolling file in
/// `application_data_path/logs`, stdout only gets them when `show_std` is set.
pub fn enable_logging(
    prefix: &str,
    application_data_path: &Path,
    log_level: Option<LevelFilter>,
    show_std: bool,
) -> Result<()> {
    let appender = tracing_appender::rolling::Builder::new()
        .rotation(Rotation::DAILY)
        .max_log_files(KEPT_LOG_FILES)
        .filename_prefix(prefix)
        .build(log_directory(application_data_path)?)?;

    let stdout = std::io::stdout.with_filter(move |_| show_std);

    tracing_subscriber::fmt()
        .with_env_filter(EnvFilter::new(filter_directive(
            log_level,
            std::env::var("RUST_LOG").ok(),
        )))
        .with_span_events(FmtSpan::CLOSE)
        .with_writer(stdout.and(appender))
        .pretty()
        .try_init()
        .map_err(|e| anyhow!("{e}"))?;
    Ok(())
}

/// Pruning old files reads the directory, so it has to exist before the appender is built.
fn log_directory(application_data_path: &Path) -> Result<PathBuf> {
    let path = application_data_path.join("logs");
    std::fs::create_dir_all(&path)?;
    Ok(path)
}

/// Only this crate's events pass. An explicit level beats `RUST_LOG`, which beats `info`.
fn filter_directive(log_level: Option<LevelFilter>, rust_log: Option<String>) -> String {
    let level = log_level
        .map(|v| v.to_string())
        .or(rust_log)
        .unwrap_or_else(|| "info".into());
    format!("{}={level}", env!("CARGO_PKG_NAME").replace('-', "_"))
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
    use tempfile::tempdir;
    use tracing::level_filters::LevelFilter;

    use super::{filter_directive, log_directory};

    #[test]
    fn test_log_directory_is_created() {
        let dir = tempdir().unwrap();
        let path = log_directory(&dir.path().join("state")).unwrap();
        assert!(path.is_dir());
        assert!(path.ends_with("state/logs"));
        // Existing directories are fine.
        assert_eq!(log_directory(&dir.path().join("state")).unwrap(), path);
    }

    #[test]
    fn test_filter_directive_precedence() {
        assert_eq!(filter_directive(None, None), "trckr=info");
        assert_eq!(filter_directive(None, Some("warn".into())), "trckr=warn");
        assert_eq!(
            filter_directive(Some(LevelFilter::TRACE), Some("warn".into())),
            "trckr=trace"
        );
    }
}
