//! Logging utilities with colored output and watch-mode status display.
//!
//! This module provides:
//! - `log!` / `debug!` / `trace!` / `warn!` / `error!` macros for formatted
//!   terminal output with colored prefixes, gated by a global [`LogLevel`]
//! - `WatchStatus` for the single-block rebuild status in watch mode
//!
//! # Example
//!
//! ```ignore
//! log!("compile"; "compiling {} themes", count);
//! debug!("watch"; "changed: {}", path.display());
//! trace!("start"; "rebuild request dropped");
//! ```

use crossterm::{
    cursor, execute,
    terminal::{Clear, ClearType},
};
use owo_colors::OwoColorize;
use parking_lot::Mutex;
use std::{
    io::{Write, stderr, stdout},
    str::FromStr,
    sync::LazyLock,
    sync::atomic::{AtomicU8, Ordering},
};

// ============================================================================
// Log Level
// ============================================================================

/// Verbosity threshold, lowest to highest.
#[derive(Debug, Clone, Copy, PartialEq, Eq, PartialOrd, Ord)]
#[repr(u8)]
pub enum LogLevel {
    Silent = 0,
    Error = 1,
    Warn = 2,
    Info = 3,
    Verbose = 4,
    Silly = 5,
}

impl LogLevel {
    const fn from_u8(value: u8) -> Self {
        match value {
            0 => Self::Silent,
            1 => Self::Error,
            2 => Self::Warn,
            3 => Self::Info,
            4 => Self::Verbose,
            _ => Self::Silly,
        }
    }
}

impl FromStr for LogLevel {
    type Err = String;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        match s.trim().to_ascii_lowercase().as_str() {
            "silent" | "off" => Ok(Self::Silent),
            "error" => Ok(Self::Error),
            "warn" | "warning" => Ok(Self::Warn),
            "info" => Ok(Self::Info),
            "verbose" | "debug" => Ok(Self::Verbose),
            "silly" | "trace" => Ok(Self::Silly),
            other => Err(format!("unknown log level `{other}`")),
        }
    }
}

/// Global log level (set from CLI flags or `LOG_LEVEL`)
static LEVEL: AtomicU8 = AtomicU8::new(LogLevel::Info as u8);

/// Set the log level globally
pub fn set_level(level: LogLevel) {
    LEVEL.store(level as u8, Ordering::SeqCst);
}

/// Current global log level
pub fn level() -> LogLevel {
    LogLevel::from_u8(LEVEL.load(Ordering::SeqCst))
}

/// Check whether messages at `level` should be printed
#[inline]
pub fn enabled(level: LogLevel) -> bool {
    level != LogLevel::Silent && level <= self::level()
}

/// Resolve the effective level: `--log-level` > `--verbose` > `LOG_LEVEL` > info.
pub fn init(explicit: Option<LogLevel>, verbose: bool) {
    let from_env = std::env::var("LOG_LEVEL")
        .ok()
        .and_then(|value| value.parse::<LogLevel>().ok());

    let level = explicit
        .or(verbose.then_some(LogLevel::Verbose))
        .or(from_env)
        .unwrap_or(LogLevel::Info);
    set_level(level);
}

// ============================================================================
// Log Macros
// ============================================================================

/// Log a message with a colored module prefix (info level)
///
/// # Usage
/// ```ignore
/// log!("module"; "message with {} formatting", args);
/// ```
#[macro_export]
macro_rules! log {
    ($module:expr; $($arg:tt)*) => {{
        if $crate::logger::enabled($crate::logger::LogLevel::Info) {
            $crate::logger::log($module, &format!($($arg)*))
        }
    }};
}

/// Log a debug message (only shown at verbose level)
#[macro_export]
macro_rules! debug {
    ($module:expr; $($arg:tt)*) => {{
        if $crate::logger::enabled($crate::logger::LogLevel::Verbose) {
            $crate::logger::log($module, &format!($($arg)*))
        }
    }};
}

/// Log a trace message (only shown at silly level)
#[macro_export]
macro_rules! trace {
    ($module:expr; $($arg:tt)*) => {{
        if $crate::logger::enabled($crate::logger::LogLevel::Silly) {
            $crate::logger::log($module, &format!($($arg)*))
        }
    }};
}

/// Log a warning to stderr
#[macro_export]
macro_rules! warn {
    ($module:expr; $($arg:tt)*) => {{
        if $crate::logger::enabled($crate::logger::LogLevel::Warn) {
            $crate::logger::log_stderr($module, "warning", &format!($($arg)*))
        }
    }};
}

/// Log an error to stderr
#[macro_export]
macro_rules! error {
    ($module:expr; $($arg:tt)*) => {{
        if $crate::logger::enabled($crate::logger::LogLevel::Error) {
            $crate::logger::log_stderr($module, "error", &format!($($arg)*))
        }
    }};
}

// ============================================================================
// Helper Functions
// ============================================================================

/// Log a message with a colored module prefix to stdout
#[inline]
pub fn log(module: &str, message: &str) {
    let module_lower = module.to_ascii_lowercase();
    let prefix = colorize_prefix(module, &module_lower);
    status_detach();

    let mut stdout = stdout().lock();
    writeln!(stdout, "{prefix} {message}").ok();
    stdout.flush().ok();
}

/// Log a message to stderr with a severity-colored prefix
#[inline]
pub fn log_stderr(module: &str, severity: &str, message: &str) {
    let prefix = colorize_prefix(module, severity);
    status_detach();

    let mut stderr = stderr().lock();
    writeln!(stderr, "{prefix} {message}").ok();
    stderr.flush().ok();
}

/// Apply color to a module prefix based on module type
#[inline]
fn colorize_prefix(module: &str, kind: &str) -> String {
    let prefix = format!("[{module}]");
    match kind {
        "start" => prefix.bright_blue().bold().to_string(),
        "watch" => prefix.bright_green().bold().to_string(),
        "error" => prefix.bright_red().bold().to_string(),
        "warning" => prefix.yellow().bold().to_string(),
        _ => prefix.bright_yellow().bold().to_string(),
    }
}

// ============================================================================
// Watch Status (single-block status with overwrite)
// ============================================================================

/// Get current time formatted as HH:MM:SS (UTC)
fn now() -> String {
    use std::time::SystemTime;
    let secs = SystemTime::now()
        .duration_since(SystemTime::UNIX_EPOCH)
        .map(|d| d.as_secs())
        .unwrap_or(0);
    let hours = (secs / 3600) % 24;
    let minutes = (secs / 60) % 60;
    let seconds = secs % 60;
    format!("{hours:02}:{minutes:02}:{seconds:02}")
}

/// Status display for watch mode
///
/// Each rebuild result replaces the previous one, keeping the terminal
/// clean across many rebuilds.
///
/// # Example
///
/// ```ignore
/// let mut status = WatchStatus::new();
/// status.success("rebuilt in 42ms");
/// status.error("rebuild failed", "theme `dark.json`: invalid color");
/// ```
pub struct WatchStatus {
    /// Lines of previous output to clear
    last_lines: usize,
}

/// Global watch status display.
static WATCH_STATUS: LazyLock<Mutex<WatchStatus>> =
    LazyLock::new(|| Mutex::new(WatchStatus::new()));

impl WatchStatus {
    /// Create a new watch status display.
    pub const fn new() -> Self {
        Self { last_lines: 0 }
    }

    /// Display success message (✓ prefix, green).
    pub fn success(&mut self, message: &str) {
        self.display(format!("{}", "✓".green()), message);
    }

    /// Display error message (✗ prefix, red) with optional detail.
    pub fn error(&mut self, summary: &str, detail: &str) {
        let message = compose(summary, detail);
        self.display(format!("{}", "✗".red()), &message);
    }

    fn display(&mut self, symbol: String, message: &str) {
        if !enabled(LogLevel::Info) {
            return;
        }

        let mut stdout = stdout().lock();

        if self.last_lines > 0 {
            #[allow(clippy::cast_possible_truncation)]
            let lines = self.last_lines as u16;
            execute!(stdout, cursor::MoveUp(lines)).ok();
            execute!(stdout, Clear(ClearType::FromCursorDown)).ok();
        }

        let timestamp = format!("[{}]", now()).dimmed().to_string();
        writeln!(stdout, "{timestamp} {symbol} {message}").ok();
        stdout.flush().ok();

        self.last_lines = line_count(message);
    }

    /// Forget the tracked block so the next status does not overwrite
    /// regular log lines printed in between.
    pub fn detach(&mut self) {
        self.last_lines = 0;
    }
}

/// Join a summary and an optional detail block.
fn compose(summary: &str, detail: &str) -> String {
    if detail.is_empty() {
        summary.to_string()
    } else {
        format!("{summary}\n{detail}")
    }
}

/// Number of terminal lines a status message occupies.
fn line_count(message: &str) -> usize {
    message.matches('\n').count() + 1
}

/// Global watch status: success
pub fn status_success(message: &str) {
    WATCH_STATUS.lock().success(message);
}

/// Global watch status: error
pub fn status_error(summary: &str, detail: &str) {
    WATCH_STATUS.lock().error(summary, detail);
}

/// Global watch status: stop overwriting the last block
pub fn status_detach() {
    WATCH_STATUS.lock().detach();
}

// ============================================================================
// Tests
// ============================================================================
