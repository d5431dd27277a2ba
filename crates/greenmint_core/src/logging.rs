//! Process-wide file logging for the ledger.
//!
//! # Responsibility
//! - Start the rolling file logger at most once per process.
//! - Capture panics as sanitized `event=panic_captured` lines.
//!
//! # Invariants
//! - Same `level + log_dir` twice is a no-op; any other change is rejected.
//! - Setup never panics.
//! - Lines are `event=... module=... status=...` key/value records carrying
//!   metadata only. Names, emails and reasons never reach the log.

use crate::config::LedgerConfig;
use flexi_logger::{Cleanup, Criterion, FileSpec, Logger, LoggerHandle, Naming, WriteMode};
use log::{error, info};
use once_cell::sync::OnceCell;
use std::path::{Path, PathBuf};

const LOG_BASENAME: &str = "greenmint";
const ROTATE_AT_BYTES: u64 = 10 * 1024 * 1024;
const KEEP_ROTATED: usize = 5;
const PANIC_PAYLOAD_LIMIT: usize = 160;
const LEVELS: [&str; 5] = ["trace", "debug", "info", "warn", "error"];

static ACTIVE: OnceCell<ActiveLogger> = OnceCell::new();
static PANIC_HOOK: OnceCell<()> = OnceCell::new();

/// Normalized logger settings; two calls agree when these are equal.
#[derive(Debug, Clone, PartialEq, Eq)]
struct LogSettings {
    level: &'static str,
    dir: PathBuf,
}

impl LogSettings {
    fn parse(level: &str, log_dir: &str) -> Result<Self, String> {
        Ok(Self {
            level: normalize_level(level)?,
            dir: normalize_log_dir(log_dir)?,
        })
    }

    /// Errors when `requested` would reconfigure the running logger.
    fn check_compatible(&self, requested: &LogSettings) -> Result<(), String> {
        if self.dir != requested.dir {
            return Err(format!(
                "logging already initialized at `{}`; refusing to switch to `{}`",
                self.dir.display(),
                requested.dir.display()
            ));
        }
        if self.level != requested.level {
            return Err(format!(
                "logging already initialized with level `{}`; refusing to switch to `{}`",
                self.level, requested.level
            ));
        }
        Ok(())
    }
}

struct ActiveLogger {
    settings: LogSettings,
    _handle: LoggerHandle,
}

/// Starts file logging at `level` under the absolute directory `log_dir`.
///
/// # Errors
/// - Unsupported level, or an empty / relative directory.
/// - The directory cannot be created or the backend fails to start.
/// - Logging is already running with a different level or directory.
pub fn init_logging(level: &str, log_dir: &str) -> Result<(), String> {
    let requested = LogSettings::parse(level, log_dir)?;

    if let Some(active) = ACTIVE.get() {
        return active.settings.check_compatible(&requested);
    }

    let active = ACTIVE.get_or_try_init(|| start_file_logger(requested.clone()))?;
    // A racing caller may have won `get_or_try_init` with other settings.
    active.settings.check_compatible(&requested)
}

/// Starts logging from a loaded config.
///
/// Returns `Ok(false)` without touching the logger when `log_dir` is unset.
pub fn init_logging_from_config(config: &LedgerConfig) -> Result<bool, String> {
    let Some(log_dir) = config.log_dir.as_deref() else {
        return Ok(false);
    };
    let log_dir = log_dir
        .to_str()
        .ok_or_else(|| format!("log_dir is not valid UTF-8: `{}`", log_dir.display()))?;
    init_logging(&config.log_level, log_dir)?;
    Ok(true)
}

/// `(level, log_dir)` of the running logger, `None` before init.
pub fn logging_status() -> Option<(&'static str, PathBuf)> {
    ACTIVE
        .get()
        .map(|active| (active.settings.level, active.settings.dir.clone()))
}

/// `debug` for debug builds, `info` for release builds.
pub fn default_log_level() -> &'static str {
    if cfg!(debug_assertions) {
        "debug"
    } else {
        "info"
    }
}

fn start_file_logger(settings: LogSettings) -> Result<ActiveLogger, String> {
    std::fs::create_dir_all(&settings.dir).map_err(|err| {
        format!(
            "failed to create log directory `{}`: {err}",
            settings.dir.display()
        )
    })?;

    let handle = Logger::try_with_str(settings.level)
        .map_err(|err| format!("invalid log level `{}`: {err}", settings.level))?
        .log_to_file(
            FileSpec::default()
                .directory(settings.dir.as_path())
                .basename(LOG_BASENAME),
        )
        .rotate(
            Criterion::Size(ROTATE_AT_BYTES),
            Naming::Numbers,
            Cleanup::KeepLogFiles(KEEP_ROTATED),
        )
        .write_mode(WriteMode::BufferAndFlush)
        .append()
        .format_for_files(flexi_logger::detailed_format)
        .start()
        .map_err(|err| format!("failed to start logger: {err}"))?;

    install_panic_hook();
    info!(
        "event=logging_init module=core status=ok level={} os={} debug_build={} version={}",
        settings.level,
        std::env::consts::OS,
        cfg!(debug_assertions),
        env!("CARGO_PKG_VERSION")
    );

    Ok(ActiveLogger {
        settings,
        _handle: handle,
    })
}

fn normalize_level(level: &str) -> Result<&'static str, String> {
    let lowered = level.trim().to_ascii_lowercase();
    let wanted = if lowered == "warning" { "warn" } else { lowered.as_str() };
    LEVELS
        .iter()
        .copied()
        .find(|known| *known == wanted)
        .ok_or_else(|| {
            format!(
                "unsupported log level `{lowered}`; expected {}",
                LEVELS.join("|")
            )
        })
}

fn normalize_log_dir(log_dir: &str) -> Result<PathBuf, String> {
    let trimmed = log_dir.trim();
    if trimmed.is_empty() {
        return Err("log_dir cannot be empty".to_string());
    }
    let path = Path::new(trimmed);
    if !path.is_absolute() {
        return Err(format!("log_dir must be an absolute path, got `{trimmed}`"));
    }
    Ok(path.to_path_buf())
}

fn install_panic_hook() {
    if PANIC_HOOK.set(()).is_err() {
        return;
    }

    let previous = std::panic::take_hook();
    std::panic::set_hook(Box::new(move |info| {
        let location = info
            .location()
            .map(|loc| format!("{}:{}", loc.file(), loc.line()))
            .unwrap_or_else(|| "unknown".to_string());
        let payload = info
            .payload()
            .downcast_ref::<&str>()
            .map(|message| (*message).to_string())
            .or_else(|| info.payload().downcast_ref::<String>().cloned())
            .unwrap_or_else(|| "non-string panic payload".to_string());
        // Payloads may echo user input.
        error!(
            "event=panic_captured module=core status=error location={} payload={}",
            location,
            single_line(&payload, PANIC_PAYLOAD_LIMIT)
        );
        previous(info);
    }));
}

/// Flattens line breaks and caps `value` at `max_chars`, marking the cut.
fn single_line(value: &str, max_chars: usize) -> String {
    let flat = value.replace(['\n', '\r'], " ");
    if flat.chars().count() <= max_chars {
        return flat;
    }
    let mut cut = flat.chars().take(max_chars).collect::<String>();
    cut.push_str("...");
    cut
}

#[cfg(test)]
mod tests {
    use super::{
        init_logging, init_logging_from_config, logging_status, normalize_level,
        normalize_log_dir, single_line, LogSettings,
    };
    use crate::config::LedgerConfig;
    use std::path::PathBuf;

    fn scratch_dir(label: &str) -> PathBuf {
        tempfile::Builder::new()
            .prefix(&format!("greenmint-logging-{label}-"))
            .tempdir()
            .expect("temp dir")
            .into_path()
    }

    #[test]
    fn levels_are_case_insensitive_and_accept_warning() {
        assert_eq!(normalize_level("INFO"), Ok("info"));
        assert_eq!(normalize_level(" warning "), Ok("warn"));
        let err = normalize_level("verbose").expect_err("unknown level");
        assert!(err.contains("trace|debug|info|warn|error"));
    }

    #[test]
    fn relative_log_dir_is_rejected() {
        let err = normalize_log_dir("logs/dev").expect_err("relative paths must be rejected");
        assert!(err.contains("absolute"));
        assert!(normalize_log_dir("   ").is_err());
    }

    #[test]
    fn settings_compatibility_checks_dir_before_level() {
        let base = LogSettings::parse("info", "/var/log/greenmint").expect("settings");
        let other_level = LogSettings::parse("debug", "/var/log/greenmint").expect("settings");
        let other_dir = LogSettings::parse("debug", "/tmp/greenmint").expect("settings");

        assert!(base.check_compatible(&base.clone()).is_ok());
        assert!(base
            .check_compatible(&other_level)
            .expect_err("level change")
            .contains("with level"));
        assert!(base
            .check_compatible(&other_dir)
            .expect_err("dir change")
            .contains("initialized at"));
    }

    #[test]
    fn config_without_log_dir_leaves_logging_off() {
        let config = LedgerConfig {
            log_dir: None,
            ..LedgerConfig::default()
        };
        assert!(!init_logging_from_config(&config).expect("unset dir is not an error"));
    }

    #[test]
    fn single_line_flattens_and_truncates() {
        assert_eq!(single_line("a\nb", 8), "a b");
        let cut = single_line("line1\nline2\rline3", 8);
        assert_eq!(cut, "line1 li...");
    }

    #[test]
    fn init_logging_is_idempotent_for_same_config_and_rejects_conflicts() {
        let log_dir = scratch_dir("idempotent");
        let log_dir_str = log_dir.to_str().expect("utf-8 temp dir").to_string();
        let second_dir = scratch_dir("different");
        let second_dir_str = second_dir.to_str().expect("utf-8 temp dir").to_string();

        init_logging("info", &log_dir_str).expect("first init should succeed");
        init_logging("INFO", &log_dir_str).expect("same config should be idempotent");

        let level_error =
            init_logging("debug", &log_dir_str).expect_err("level conflict should fail");
        assert!(level_error.contains("refusing to switch"));

        let dir_error =
            init_logging("info", &second_dir_str).expect_err("directory conflict should fail");
        assert!(dir_error.contains("refusing to switch"));

        let (active_level, active_dir) = logging_status().expect("logging should be active");
        assert_eq!(active_level, "info");
        assert_eq!(active_dir, log_dir);
    }
}
