//! Logging to stdout and to a daily-rotated file in the log directory.

use std::path::Path;

use tracing::warn;
use tracing_appender::non_blocking::WorkerGuard;
use tracing_appender::rolling::{RollingFileAppender, Rotation};
use tracing_subscriber::prelude::*;

const LOG_FILE_PREFIX: &str = "limpehsays";
const LOG_FILE_SUFFIX: &str = "log";
/// Log files kept on disk, the current one included.
pub const MAX_LOG_FILES: usize = 3;

/// Rolling appender writing `<dir>/limpehsays.<date>.log`; older files beyond
/// `MAX_LOG_FILES` are deleted on rotation.
pub fn file_appender(dir: &Path) -> Result<RollingFileAppender, String> {
    std::fs::create_dir_all(dir).map_err(|e| format!("{}: {e}", dir.display()))?;

    RollingFileAppender::builder()
        .rotation(Rotation::DAILY)
        .filename_prefix(LOG_FILE_PREFIX)
        .filename_suffix(LOG_FILE_SUFFIX)
        .max_log_files(MAX_LOG_FILES)
        .build(dir)
        .map_err(|e| format!("{}: {e}", dir.display()))
}

/// Install the global subscriber. Falls back to stdout only if the log directory is unusable.
///
/// The returned guard must be held for as long as file logging should flush.
pub fn init(log_dir: Option<&Path>) -> Option<WorkerGuard> {
    let mut file_error = None;
    let appender = log_dir.and_then(|dir| file_appender(dir).map_err(|e| file_error = Some(e)).ok());

    let (file_layer, guard) = match appender {
        Some(appender) => {
            let (non_blocking, guard) = tracing_appender::non_blocking(appender);
            let layer = tracing_subscriber::fmt::layer()
                .with_writer(non_blocking)
                .with_ansi(false)
                .with_filter(env_filter());
            (Some(layer), Some(guard))
        }
        None => (None, None),
    };

    tracing_subscriber::registry()
        .with(
            tracing_subscriber::fmt::layer()
                .with_writer(std::io::stdout)
                .with_filter(env_filter()),
        )
        .with(file_layer)
        .init();

    if let Some(e) = file_error {
        warn!("Could not set up file logging, using stdout only ({e})");
    }
    guard
}

fn env_filter() -> tracing_subscriber::EnvFilter {
    tracing_subscriber::EnvFilter::from_default_env().add_directive(tracing::Level::INFO.into())
}

#[cfg(test)]
mod tests {
    use super::*;
    use std::io::Write;

    fn log_files(dir: &Path) -> Vec<String> {
        std::fs::read_dir(dir)
            .unwrap()
            .map(|entry| entry.unwrap().file_name().to_string_lossy().into_owned())
            .collect()
    }

    #[test]
    fn test_appender_writes_dated_file() {
        let dir = tempfile::tempdir().unwrap();
        let mut appender = file_appender(dir.path()).expect("should build appender");

        appender.write_all(b"hello from the bot\n").unwrap();
        appender.flush().unwrap();

        let files = log_files(dir.path());
        assert_eq!(files.len(), 1, "files: {files:?}");
        let name = &files[0];
        assert!(name.starts_with("limpehsays."), "got {name}");
        assert!(name.ends_with(".log"), "got {name}");

        let content = std::fs::read_to_string(dir.path().join(name)).unwrap();
        assert_eq!(content, "hello from the bot\n");
    }

    #[test]
    fn test_appender_creates_missing_dir() {
        let dir = tempfile::tempdir().unwrap();
        let nested = dir.path().join("logs").join("bot");

        let mut appender = file_appender(&nested).expect("should create directory");
        appender.write_all(b"x\n").unwrap();
        appender.flush().unwrap();

        assert_eq!(log_files(&nested).len(), 1);
    }

    #[test]
    fn test_appender_rejects_unusable_dir() {
        let dir = tempfile::tempdir().unwrap();
        let file = dir.path().join("not_a_dir");
        std::fs::write(&file, b"").unwrap();

        let err = file_appender(&file).err().expect("a file is not a log directory");
        assert!(err.contains("not_a_dir"));
    }
}
