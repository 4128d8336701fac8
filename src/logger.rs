//! Session log for the editor and the CLI.
//!
//! One file per session, truncated on [`init`]:
//!
//!   Windows:  `%APPDATA%\BentoStudio\bento.log`
//!   Linux:    `$XDG_DATA_HOME/BentoStudio/bento.log`  (or `~/.local/share/…`)
//!   macOS:    `~/Library/Application Support/BentoStudio/bento.log`
//!
//! Call sites use `log_info!` / `log_warn!` / `log_err!`. Nothing is formatted
//! or written until a session has been opened, so library users and tests
//! never touch the filesystem.

use std::fmt;
use std::fs::{self, File, OpenOptions};
use std::io::Write;
use std::path::{Path, PathBuf};
use std::sync::{Mutex, OnceLock};
use std::time::{SystemTime, UNIX_EPOCH};

#[derive(Clone, Copy, Debug, PartialEq, Eq)]
pub enum Level {
    Info,
    Warn,
    Error,
    Panic,
}

impl fmt::Display for Level {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(match self {
            Level::Info => "INFO",
            Level::Warn => "WARN",
            Level::Error => "ERROR",
            Level::Panic => "PANIC",
        })
    }
}

struct Session {
    path: PathBuf,
    file: Mutex<File>,
}

static SESSION: OnceLock<Session> = OnceLock::new();

/// Path of the open session log, if any.
pub fn log_path() -> Option<&'static Path> {
    SESSION.get().map(|s| s.path.as_path())
}

pub fn is_active() -> bool {
    SESSION.get().is_some()
}

/// Append one entry. Write errors are dropped.
pub fn log(level: Level, args: fmt::Arguments<'_>) {
    let Some(session) = SESSION.get() else { return };
    if let Ok(mut file) = session.file.lock() {
        let _ = writeln!(file, "{}", format_entry(level, unix_millis(), args));
    }
}

#[macro_export]
macro_rules! log_info {
    ($($arg:tt)*) => {
        $crate::logger::log($crate::logger::Level::Info, format_args!($($arg)*))
    };
}

#[macro_export]
macro_rules! log_warn {
    ($($arg:tt)*) => {
        $crate::logger::log($crate::logger::Level::Warn, format_args!($($arg)*))
    };
}

#[macro_export]
macro_rules! log_err {
    ($($arg:tt)*) => {
        $crate::logger::log($crate::logger::Level::Error, format_args!($($arg)*))
    };
}

/// `[HH:MM:SS.mmm] [LEVEL] message`, time of day in UTC.
fn format_entry(level: Level, millis: u64, args: fmt::Arguments<'_>) -> String {
    let secs = millis / 1000;
    format!(
        "[{:02}:{:02}:{:02}.{:03}] [{}] {}",
        (secs % 86_400) / 3600,
        (secs % 3600) / 60,
        secs % 60,
        millis % 1000,
        level,
        args
    )
}

fn unix_millis() -> u64 {
    SystemTime::now()
        .duration_since(UNIX_EPOCH)
        .map_or(0, |d| d.as_millis() as u64)
}

/// Open the session log at the platform default location.
pub fn init() {
    init_at(&data_dir().join("BentoStudio").join("bento.log"));
}

/// Open the session log at `path`, truncating it, and mirror panics into it.
/// Later calls in the same process are ignored.
pub fn init_at(path: &Path) {
    if is_active() {
        return;
    }
    if let Some(dir) = path.parent() {
        let _ = fs::create_dir_all(dir);
    }
    let file = match OpenOptions::new()
        .create(true)
        .write(true)
        .truncate(true)
        .open(path)
    {
        Ok(f) => f,
        Err(e) => {
            eprintln!("[logger] cannot open {}: {}", path.display(), e);
            return;
        }
    };
    if SESSION
        .set(Session {
            path: path.to_path_buf(),
            file: Mutex::new(file),
        })
        .is_err()
    {
        return;
    }

    log(
        Level::Info,
        format_args!(
            "session started (unix {}s), bento {}",
            unix_millis() / 1000,
            env!("CARGO_PKG_VERSION")
        ),
    );

    let prev = std::panic::take_hook();
    std::panic::set_hook(Box::new(move |info| {
        log(Level::Panic, format_args!("{}", info));
        prev(info);
    }));
}

/// Platform data directory (without the app sub-folder).
pub(crate) fn data_dir() -> PathBuf {
    let env = |key: &str| std::env::var_os(key).map(PathBuf::from);

    #[cfg(target_os = "windows")]
    if let Some(appdata) = env("APPDATA") {
        return appdata;
    }
    #[cfg(target_os = "macos")]
    if let Some(home) = env("HOME") {
        return home.join("Library").join("Application Support");
    }

    env("XDG_DATA_HOME")
        .or_else(|| env("HOME").map(|h| h.join(".local").join("share")))
        .unwrap_or_else(|| PathBuf::from("."))
}
