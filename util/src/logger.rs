//! Logger setup for the line and drive executables
//!
//! Records go to the terminal, filtered at the level the executable asks for, and to the session
//! log file, which always keeps debug records.

// ---------------------------------------------------------------------------
// IMPORTS
// ---------------------------------------------------------------------------

// External imports
use colored::{ColoredString, Colorize};
use fern::{Dispatch, FormatCallback};
use log::{self, info, Record};
use std::fmt;
use thiserror::Error;

// Internal imports
use crate::session;

// Re-exports
pub use log::LevelFilter;

// ---------------------------------------------------------------------------
// CONSTANTS
// ---------------------------------------------------------------------------

/// Least verbose level written to the session log file.
pub const FILE_LEVEL: LevelFilter = LevelFilter::Debug;

/// Crate prefix removed from record targets
const LIB_TARGET_PREFIX: &str = "line_lib::";

// ---------------------------------------------------------------------------
// ENUMERATIONS
// ---------------------------------------------------------------------------

/// Errors associated with initialising the logger.
#[derive(Debug, Error)]
pub enum LoggerInitError {
    #[error("Expected a terminal log level of at least `INFO`, found `{0}`")]
    InvalidMinLogLevel(log::LevelFilter),

    #[error("Error initialising the log file: {0}")]
    LogFileInitError(std::io::Error),

    #[error("An error occured while setting up the logger: {0}")]
    FernInitError(log::SetLoggerError),
}

// ---------------------------------------------------------------------------
// PUBLIC FUNCTIONS
// ---------------------------------------------------------------------------

/// Initialise the logger for this execution.
///
/// `min_level` applies to the terminal only and must let `INFO` through. The session log file
/// gets everything down to [`FILE_LEVEL`], or `min_level` if that is more verbose.
///
/// Must only be called once per process, fern refuses a second global logger.
pub fn logger_init(
    min_level: LevelFilter,
    session: &session::Session,
) -> Result<(), LoggerInitError> {
    if min_level < log::Level::Info {
        return Err(LoggerInitError::InvalidMinLogLevel(min_level));
    }

    let file_level = min_level.max(FILE_LEVEL);

    let log_file =
        fern::log_file(session.log_file_path.clone()).map_err(LoggerInitError::LogFileInitError)?;

    Dispatch::new()
        .format(format_record)
        .level(file_level)
        .chain(Dispatch::new().level(min_level).chain(std::io::stdout()))
        .chain(Dispatch::new().level(file_level).chain(log_file))
        .apply()
        .map_err(LoggerInitError::FernInitError)?;

    info!("Logging initialised");
    info!("    Session epoch: {}", session::get_epoch());
    info!("    Terminal level: {:?}, file level: {:?}", min_level, file_level);
    info!("    Log file path: {:?}", session.log_file_path);

    Ok(())
}

// ---------------------------------------------------------------------------
// PRIVATE FUNCTIONS
// ---------------------------------------------------------------------------

/// Format a record as `[elapsed LVL] target: message`, the target only shown below `INFO`.
fn format_record(out: FormatCallback, message: &fmt::Arguments, record: &Record) {
    if record.level() > log::Level::Info {
        out.finish(format_args!(
            "[{:10.6} {}] {}: {}",
            session::get_elapsed_seconds(),
            level_to_str(record.level()),
            short_target(record.target()),
            message
        ))
    } else {
        out.finish(format_args!(
            "[{:10.6} {}] {}",
            session::get_elapsed_seconds(),
            level_to_str(record.level()),
            message
        ))
    }
}

/// Record target without the line library crate prefix.
fn short_target(target: &str) -> &str {
    target.strip_prefix(LIB_TARGET_PREFIX).unwrap_or(target)
}

/// Get the string representation of a log level
fn level_to_str(level: log::Level) -> ColoredString {
    match level {
        log::Level::Trace => "TRC".dimmed().italic(),
        log::Level::Debug => "DBG".dimmed(),
        log::Level::Info => "INF".normal(),
        log::Level::Warn => "WRN".yellow(),
        log::Level::Error => "ERR".red().bold(),
    }
}

#[cfg(test)]
mod test {
    use super::*;

    #[test]
    fn test_short_target() {
        assert_eq!(short_target("line_lib::optim::state"), "optim::state");
        assert_eq!(short_target("line_lib::pursuit"), "pursuit");
        assert_eq!(short_target("drive_test"), "drive_test");
        assert_eq!(short_target("util::session"), "util::session");
    }

    #[test]
    fn test_file_level() {
        // The file never drops below debug, but follows a more verbose terminal
        assert_eq!(LevelFilter::Info.max(FILE_LEVEL), LevelFilter::Debug);
        assert_eq!(LevelFilter::Trace.max(FILE_LEVEL), LevelFilter::Trace);
    }
}
