//! Logging context and rotating log files.
//!
//! Key items:
//!   LogLevel            - Error < Info < Debug
//!   LogContext          - owned by the front-end, passed by reference
//!   Rotation            - time-bucketed file naming + retention pruning
//!
//! Nothing here installs a global subscriber: each context owns a
//! `tracing::Dispatch` and emits through it explicitly.

use std::cell::RefCell;
use std::ffi::OsString;
use std::fs::{self, File, OpenOptions};
use std::io;
use std::path::PathBuf;

use anyhow::{Context, Result};
use chrono::{DateTime, Local, TimeZone};
use tracing::Dispatch;
use tracing_appender::non_blocking::{NonBlocking, WorkerGuard};
use tracing_subscriber::filter::LevelFilter;
use tracing_subscriber::{fmt, prelude::*};

/// Overrides the directory rotating logs are written to.
pub const LOG_DIR_ENV: &str = "FLEX_CONFIRM_MAIL_HOST_LOG_DIR";
pub const LOG_PREFIX: &str = "com.clear_code.flexible_confirm_mail_we_host.log.";
const LOG_SUFFIX: &str = ".txt";
const TIMESTAMP_FORMAT: &str = "%Y%m%d%H%M";

#[derive(Copy, Clone, Debug, Eq, PartialEq, Ord, PartialOrd)]
pub enum LogLevel {
    Error = 0,
    Info = 1,
    Debug = 2,
}

impl LogLevel {
    /// Highest level emitted for the request's `logging`/`debug` switches.
    pub fn from_flags(logging: bool, debug: bool) -> Option<LogLevel> {
        match (logging, debug) {
            (false, _) => None,
            (true, false) => Some(LogLevel::Info),
            (true, true) => Some(LogLevel::Debug),
        }
    }

    fn filter(self) -> LevelFilter {
        match self {
            LogLevel::Error => LevelFilter::ERROR,
            LogLevel::Info => LevelFilter::INFO,
            LogLevel::Debug => LevelFilter::DEBUG,
        }
    }
}

/// Log directory: the override when set and non-empty, else the OS temp dir.
pub fn log_dir_from(override_dir: Option<OsString>) -> PathBuf {
    override_dir
        .filter(|dir| !dir.is_empty())
        .map(PathBuf::from)
        .unwrap_or_else(std::env::temp_dir)
}

/* ---- Rotation ---- */

/// Rotating log file settings.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct Rotation {
    pub dir: PathBuf,
    /// Length of one log file period, in hours (at least 1).
    pub interval_hours: i64,
    /// Files kept after pruning; `None` keeps everything.
    pub retained: Option<usize>,
}

impl Rotation {
    pub fn new(dir: PathBuf, interval_hours: i64, retained: i64) -> Self {
        Self {
            dir,
            interval_hours: interval_hours.max(1),
            retained: usize::try_from(retained).ok().filter(|n| *n > 0),
        }
    }

    /// File name for the period containing `now`.
    pub fn file_name(&self, now: DateTime<Local>) -> String {
        let period = self.interval_hours * 3600;
        let start = now.timestamp() - now.timestamp().rem_euclid(period);
        let start = Local.timestamp_opt(start, 0).single().unwrap_or(now);
        format!("{LOG_PREFIX}{}{LOG_SUFFIX}", start.format(TIMESTAMP_FORMAT))
    }

    /// Open (append) the current period's file, then prune old periods.
    pub fn open(&self, now: DateTime<Local>) -> Result<File> {
        fs::create_dir_all(&self.dir)
            .with_context(|| format!("failed to create log directory {}", self.dir.display()))?;
        let path = self.dir.join(self.file_name(now));
        let file = OpenOptions::new()
            .create(true)
            .append(true)
            .open(&path)
            .with_context(|| format!("failed to open log file {}", path.display()))?;
        self.prune()
            .with_context(|| format!("failed to prune logs in {}", self.dir.display()))?;
        Ok(file)
    }

    /// Delete the oldest log files beyond the retention count.
    fn prune(&self) -> io::Result<()> {
        let Some(retained) = self.retained else {
            return Ok(());
        };
        let mut names: Vec<String> = fs::read_dir(&self.dir)?
            .filter_map(|entry| entry.ok())
            .filter(|entry| entry.path().is_file())
            .filter_map(|entry| entry.file_name().into_string().ok())
            .filter(|name| name.starts_with(LOG_PREFIX) && name.ends_with(LOG_SUFFIX))
            .collect();
        // Timestamps are fixed width, so name order is age order.
        names.sort_unstable_by(|a, b| b.cmp(a));
        for stale in names.iter().skip(retained) {
            fs::remove_file(self.dir.join(stale))?;
        }
        Ok(())
    }
}

/* ---- Context ---- */

/// Per-process logging state.
///
/// Every message is kept in an in-memory history; messages at or below the
/// configured level are also emitted to stderr and, when configured, to the
/// rotating log file. Dropping the context flushes the file writer.
pub struct LogContext {
    max_level: Option<LogLevel>,
    dispatch: Option<Dispatch>,
    history: RefCell<Vec<String>>,
    _file_guard: Option<WorkerGuard>,
}

impl LogContext {
    /// No sinks at all; messages only reach the history.
    pub fn silent() -> Self {
        Self {
            max_level: None,
            dispatch: None,
            history: RefCell::new(Vec::new()),
            _file_guard: None,
        }
    }

    /// Stderr only. Errors are always emitted; `max_level` widens the rest.
    pub fn stderr(max_level: Option<LogLevel>) -> Self {
        let level = max_level.unwrap_or(LogLevel::Error);
        Self {
            max_level: Some(level),
            dispatch: Some(build_dispatch(level, None)),
            history: RefCell::new(Vec::new()),
            _file_guard: None,
        }
    }

    /// Stderr plus the rotating file. Falls back to stderr only when the file
    /// cannot be opened.
    pub fn rotating(level: LogLevel, rotation: &Rotation) -> Self {
        match rotation.open(Local::now()) {
            Ok(file) => {
                let (writer, guard) = tracing_appender::non_blocking(file);
                Self {
                    max_level: Some(level),
                    dispatch: Some(build_dispatch(level, Some(writer))),
                    history: RefCell::new(Vec::new()),
                    _file_guard: Some(guard),
                }
            }
            Err(err) => {
                let ctx = Self::stderr(Some(level));
                ctx.error(format!("{err:#}"));
                ctx
            }
        }
    }

    pub fn is_enabled(&self, level: LogLevel) -> bool {
        self.max_level.is_some_and(|max| level <= max)
    }

    pub fn log(&self, level: LogLevel, msg: impl AsRef<str>) {
        let msg = msg.as_ref();
        self.history.borrow_mut().push(msg.to_string());
        if !self.is_enabled(level) {
            return;
        }
        let Some(dispatch) = &self.dispatch else {
            return;
        };
        tracing::dispatcher::with_default(dispatch, || match level {
            LogLevel::Error => tracing::error!("{msg}"),
            LogLevel::Info => tracing::info!("{msg}"),
            LogLevel::Debug => tracing::debug!("{msg}"),
        });
    }

    pub fn error(&self, msg: impl AsRef<str>) {
        self.log(LogLevel::Error, msg);
    }
    pub fn info(&self, msg: impl AsRef<str>) {
        self.log(LogLevel::Info, msg);
    }
    pub fn debug(&self, msg: impl AsRef<str>) {
        self.log(LogLevel::Debug, msg);
    }

    /// Every message logged so far, emitted or not.
    pub fn history(&self) -> Vec<String> {
        self.history.borrow().clone()
    }
}

fn build_dispatch(level: LogLevel, file: Option<NonBlocking>) -> Dispatch {
    let stderr_layer = fmt::layer().with_writer(io::stderr).with_target(false);
    let file_layer = file.map(|writer| {
        fmt::layer()
            .with_writer(writer)
            .with_ansi(false)
            .with_target(false)
    });
    let subscriber = tracing_subscriber::registry()
        .with(level.filter())
        .with(stderr_layer)
        .with(file_layer);
    Dispatch::new(subscriber)
}
