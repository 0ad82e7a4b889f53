//! File-based logging bootstrap for the `lift` binary. Library code only
//! uses the `log` facade; starting a backend is the host's call.

use std::path::{Path, PathBuf};

use flexi_logger::{Cleanup, Criterion, FileSpec, Logger, LoggerHandle, Naming, WriteMode};
use once_cell::sync::OnceCell;

const LOG_FILE_BASENAME: &str = "liftlog";
const MAX_LOG_FILE_SIZE_BYTES: u64 = 5 * 1024 * 1024;
const MAX_LOG_FILES: usize = 3;

static LOGGER: OnceCell<(PathBuf, LoggerHandle)> = OnceCell::new();

/// Starts rolling file logs under `log_dir`. Idempotent for the same
/// directory; a second call with a different directory is rejected rather
/// than silently splitting the log stream.
pub fn init(level: &str, log_dir: &Path) -> Result<(), String> {
    let (active_dir, _) = LOGGER.get_or_try_init(|| {
        std::fs::create_dir_all(log_dir)
            .map_err(|err| format!("failed to create log directory {}: {err}", log_dir.display()))?;
        let handle = Logger::try_with_str(level)
            .map_err(|err| format!("invalid log level {level}: {err}"))?
            .log_to_file(
                FileSpec::default()
                    .directory(log_dir)
                    .basename(LOG_FILE_BASENAME),
            )
            .rotate(
                Criterion::Size(MAX_LOG_FILE_SIZE_BYTES),
                Naming::Numbers,
                Cleanup::KeepLogFiles(MAX_LOG_FILES),
            )
            .write_mode(WriteMode::BufferAndFlush)
            .append()
            .start()
            .map_err(|err| format!("failed to start logger: {err}"))?;
        Ok::<_, String>((log_dir.to_path_buf(), handle))
    })?;

    if active_dir != log_dir {
        return Err(format!(
            "logging already writes to {}; refusing to switch to {}",
            active_dir.display(),
            log_dir.display()
        ));
    }
    Ok(())
}
