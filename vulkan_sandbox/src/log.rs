//! Logging for the Vulkan sandbox
//!
//! This module provides a small logging system with:
//! - Customizable logger via Logger trait
//! - Severity levels (Trace, Debug, Info, Warn, Error)
//! - Colored console output by default
//! - An explicit `Log` context handed to every component at construction
//! - File and line information for detailed ERROR logs
//!
//! There is no global logger. Components receive a `Log` (usually derived with
//! `Log::with_source`) and log through the `sandbox_*!` macros.

use colored::*;
use std::fmt;
use std::sync::Arc;
use std::time::SystemTime;
use chrono::{DateTime, Local};

/// Logger trait for custom logging implementations
///
/// Implement this trait to create custom loggers (file logging, capture in tests, etc.)
///
/// # Example
///
/// ```no_run
/// use vulkan_sandbox::sandbox::log::{Logger, LogEntry};
///
/// struct FileLogger {
///     file: std::fs::File,
/// }
///
/// impl Logger for FileLogger {
///     fn log(&self, entry: &LogEntry) {
///         // Write to file...
///     }
/// }
/// ```
pub trait Logger: Send + Sync {
    /// Log an entry
    fn log(&self, entry: &LogEntry);
}

/// Log entry containing all information about a log message
#[derive(Debug, Clone)]
pub struct LogEntry {
    /// Severity level
    pub severity: LogSeverity,

    /// Timestamp when the log was created
    pub timestamp: SystemTime,

    /// Source component (e.g., "sandbox::frame", "sandbox::vulkan")
    pub source: String,

    /// Log message
    pub message: String,

    /// Source file (only for detailed ERROR logs)
    pub file: Option<&'static str>,

    /// Source line (only for detailed ERROR logs)
    pub line: Option<u32>,
}

/// Log severity levels
#[derive(Debug, Clone, Copy, PartialEq, Eq, PartialOrd, Ord, Hash)]
pub enum LogSeverity {
    /// Very verbose information (per-frame events)
    Trace,

    /// Development/debugging information
    Debug,

    /// Important informational messages
    Info,

    /// Warning messages (potential issues)
    Warn,

    /// Error messages (with file:line details)
    Error,
}

impl LogSeverity {
    /// Fixed-width label used by the console logger
    pub fn label(&self) -> &'static str {
        match self {
            LogSeverity::Trace => "TRACE",
            LogSeverity::Debug => "DEBUG",
            LogSeverity::Info => "INFO ",
            LogSeverity::Warn => "WARN ",
            LogSeverity::Error => "ERROR",
        }
    }
}

/// Default logger implementation using colored console output
///
/// Colors:
/// - Trace: bright black
/// - Debug: cyan
/// - Info: green
/// - Warn: yellow
/// - Error: red + bold
///
/// Format:
/// - Normal: `[timestamp] [SEVERITY] [source] message`
/// - Error: `[timestamp] [ERROR] [source] message (file:line)`
///
/// Warnings and errors go to stderr, everything else to stdout.
pub struct DefaultLogger;

impl DefaultLogger {
    fn format_line(entry: &LogEntry) -> String {
        // Format timestamp as YYYY-MM-DD HH:MM:SS.mmm
        let datetime: DateTime<Local> = entry.timestamp.into();
        let timestamp = datetime.format("%Y-%m-%d %H:%M:%S%.3f").to_string();

        let severity_str = match entry.severity {
            LogSeverity::Trace => entry.severity.label().bright_black(),
            LogSeverity::Debug => entry.severity.label().cyan(),
            LogSeverity::Info => entry.severity.label().green(),
            LogSeverity::Warn => entry.severity.label().yellow(),
            LogSeverity::Error => entry.severity.label().red().bold(),
        };

        let source = entry.source.bright_blue();

        if let (Some(file), Some(line)) = (entry.file, entry.line) {
            format!(
                "[{}] [{}] [{}] {} ({}:{})",
                timestamp, severity_str, source, entry.message, file, line
            )
        } else {
            format!("[{}] [{}] [{}] {}", timestamp, severity_str, source, entry.message)
        }
    }
}

impl Logger for DefaultLogger {
    fn log(&self, entry: &LogEntry) {
        let line = Self::format_line(entry);
        if entry.severity >= LogSeverity::Warn {
            eprintln!("{}", line);
        } else {
            println!("{}", line);
        }
    }
}

/// Logger that drops every entry
pub struct NullLogger;

impl Logger for NullLogger {
    fn log(&self, _entry: &LogEntry) {}
}

/// Logging context passed to each component
///
/// Bundles the logger sink, the source name stamped on each entry and the
/// minimum severity that reaches the sink. Cloning is cheap.
#[derive(Clone)]
pub struct Log {
    logger: Arc<dyn Logger>,
    source: Arc<str>,
    min_severity: LogSeverity,
}

impl Log {
    /// Create a logging context
    ///
    /// # Arguments
    ///
    /// * `logger` - Sink receiving the entries
    /// * `source` - Source name stamped on every entry
    /// * `min_severity` - Entries below this severity are discarded
    pub fn new(logger: Arc<dyn Logger>, source: &str, min_severity: LogSeverity) -> Self {
        Self {
            logger,
            source: Arc::from(source),
            min_severity,
        }
    }

    /// Colored console logging context
    pub fn console(source: &str, min_severity: LogSeverity) -> Self {
        Self::new(Arc::new(DefaultLogger), source, min_severity)
    }

    /// Context that discards everything
    pub fn disabled() -> Self {
        Self::new(Arc::new(NullLogger), "", LogSeverity::Error)
    }

    /// Same sink and threshold, different source name
    pub fn with_source(&self, source: &str) -> Self {
        Self {
            logger: Arc::clone(&self.logger),
            source: Arc::from(source),
            min_severity: self.min_severity,
        }
    }

    /// Source name of this context
    pub fn source(&self) -> &str {
        &self.source
    }

    /// Minimum severity forwarded to the sink
    pub fn min_severity(&self) -> LogSeverity {
        self.min_severity
    }

    /// Whether an entry of this severity would reach the sink
    pub fn enabled(&self, severity: LogSeverity) -> bool {
        severity >= self.min_severity
    }

    /// Log a message
    pub fn log(&self, severity: LogSeverity, message: String) {
        self.dispatch(severity, message, None, None);
    }

    /// Log a message with file:line information
    pub fn log_detailed(&self, severity: LogSeverity, message: String, file: &'static str, line: u32) {
        self.dispatch(severity, message, Some(file), Some(line));
    }

    fn dispatch(&self, severity: LogSeverity, message: String, file: Option<&'static str>, line: Option<u32>) {
        if !self.enabled(severity) {
            return;
        }

        let entry = LogEntry {
            severity,
            timestamp: SystemTime::now(),
            source: self.source.to_string(),
            message,
            file,
            line,
        };

        self.logger.log(&entry);
    }
}

impl fmt::Debug for Log {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("Log")
            .field("source", &self.source)
            .field("min_severity", &self.min_severity)
            .finish()
    }
}

// ===== LOGGING MACROS =====

/// Log a TRACE message (very verbose, typically disabled)
///
/// # Example
///
/// ```no_run
/// # let log = vulkan_sandbox::sandbox::log::Log::disabled();
/// vulkan_sandbox::sandbox_trace!(log, "Acquired image {}", 2);
/// ```
#[macro_export]
macro_rules! sandbox_trace {
    ($log:expr, $($arg:tt)*) => {
        $log.log($crate::log::LogSeverity::Trace, format!($($arg)*))
    };
}

/// Log a DEBUG message (development information)
#[macro_export]
macro_rules! sandbox_debug {
    ($log:expr, $($arg:tt)*) => {
        $log.log($crate::log::LogSeverity::Debug, format!($($arg)*))
    };
}

/// Log an INFO message (important events)
///
/// # Example
///
/// ```no_run
/// # let log = vulkan_sandbox::sandbox::log::Log::disabled();
/// vulkan_sandbox::sandbox_info!(log, "Selected physical device '{}'", "GPU");
/// ```
#[macro_export]
macro_rules! sandbox_info {
    ($log:expr, $($arg:tt)*) => {
        $log.log($crate::log::LogSeverity::Info, format!($($arg)*))
    };
}

/// Log a WARN message (potential issues)
#[macro_export]
macro_rules! sandbox_warn {
    ($log:expr, $($arg:tt)*) => {
        $log.log($crate::log::LogSeverity::Warn, format!($($arg)*))
    };
}

/// Log an ERROR message with file:line information
#[macro_export]
macro_rules! sandbox_error {
    ($log:expr, $($arg:tt)*) => {
        $log.log_detailed(
            $crate::log::LogSeverity::Error,
            format!($($arg)*),
            file!(),
            line!()
        )
    };
}

/// Log an ERROR message and evaluate to `Error::DriverError` with the same text
///
/// # Example
///
/// ```no_run
/// # let log = vulkan_sandbox::sandbox::log::Log::disabled();
/// let err = vulkan_sandbox::sandbox_err!(log, "Failed to submit: {:?}", -4);
/// ```
#[macro_export]
macro_rules! sandbox_err {
    ($log:expr, $($arg:tt)*) => {{
        let message = format!($($arg)*);
        $log.log_detailed(
            $crate::log::LogSeverity::Error,
            message.clone(),
            file!(),
            line!()
        );
        $crate::Error::DriverError(message)
    }};
}

/// Log an ERROR message and return `Err(Error::DriverError)` from the enclosing function
#[macro_export]
macro_rules! sandbox_bail {
    ($log:expr, $($arg:tt)*) => {
        return Err($crate::sandbox_err!($log, $($arg)*))
    };
}

#[cfg(test)]
#[path = "log_tests.rs"]
mod tests;
