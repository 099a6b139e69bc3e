//! JSON line-delimited logging.
//!
//! Each record is one line `{"ts":..,"level":..,"event":..,"data":{..}}`
//! appended to a process-wide log file. Nothing is written until a caller
//! picks a destination with [`set_log_path`] (or `NdlConfig::apply_logging`).
//! Logging never fails a computation: the `info`/`warn` helpers report write
//! errors on stderr and carry on.

use std::fs::{self, OpenOptions};
use std::io::{self, Write};
use std::path::{Path, PathBuf};
use std::sync::{Mutex, OnceLock};
use std::time::{SystemTime, UNIX_EPOCH};

use serde::Serialize;

/// Destination `NdlConfig` picks when `[logging]` names no path.
pub const DEFAULT_LOG_PATH: &str = "logs/ndl_core.jsonl";

static DESTINATION: OnceLock<Mutex<Option<PathBuf>>> = OnceLock::new();

fn destination() -> &'static Mutex<Option<PathBuf>> {
    DESTINATION.get_or_init(|| Mutex::new(None))
}

/// Serializes tests that point the process-wide logger at their own file.
#[cfg(test)]
pub(crate) fn test_destination_lock() -> std::sync::MutexGuard<'static, ()> {
    static LOCK: Mutex<()> = Mutex::new(());
    LOCK.lock().unwrap_or_else(|poisoned| poisoned.into_inner())
}

#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize)]
#[serde(rename_all = "lowercase")]
pub enum Level {
    Info,
    Warn,
}

#[derive(Serialize)]
struct LogRecord<'a, T: Serialize> {
    ts: f64,
    level: Level,
    event: &'a str,
    data: &'a T,
}

/// Sends all subsequent records to `path`.
pub fn set_log_path(path: impl AsRef<Path>) {
    let mut guard = destination()
        .lock()
        .unwrap_or_else(|poisoned| poisoned.into_inner());
    *guard = Some(path.as_ref().to_path_buf());
}

/// Drops all subsequent records.
pub fn disable() {
    let mut guard = destination()
        .lock()
        .unwrap_or_else(|poisoned| poisoned.into_inner());
    *guard = None;
}

pub fn log_path() -> Option<PathBuf> {
    destination()
        .lock()
        .unwrap_or_else(|poisoned| poisoned.into_inner())
        .clone()
}

/// Appends one record to the log file, creating parent directories on demand.
pub fn log_event<T: Serialize>(level: Level, event: &str, data: &T) -> io::Result<()> {
    let guard = destination()
        .lock()
        .unwrap_or_else(|poisoned| poisoned.into_inner());
    let Some(path) = guard.as_ref() else {
        return Ok(());
    };

    let ts = SystemTime::now()
        .duration_since(UNIX_EPOCH)
        .map(|elapsed| elapsed.as_secs_f64())
        .unwrap_or(0.0);
    let record = LogRecord {
        ts,
        level,
        event,
        data,
    };
    let mut line = serde_json::to_string(&record).map_err(io::Error::other)?;
    line.push('\n');

    if let Some(parent) = path.parent() {
        if !parent.as_os_str().is_empty() {
            fs::create_dir_all(parent)?;
        }
    }
    let mut file = OpenOptions::new().create(true).append(true).open(path)?;
    file.write_all(line.as_bytes())
}

pub fn info<T: Serialize>(event: &str, data: &T) {
    if let Err(err) = log_event(Level::Info, event, data) {
        eprintln!("failed to log {event}: {err}");
    }
}

/// Logs a warning and echoes it on stderr.
pub fn warn<T: Serialize>(event: &str, data: &T) {
    match serde_json::to_string(data) {
        Ok(json) => eprintln!("warning: {event} {json}"),
        Err(_) => eprintln!("warning: {event}"),
    }
    if let Err(err) = log_event(Level::Warn, event, data) {
        eprintln!("failed to log {event}: {err}");
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use serde_json::{json, Value};

    #[test]
    fn nothing_is_written_until_a_destination_is_set() {
        let _guard = test_destination_lock();
        disable();
        assert_eq!(log_path(), None);
        log_event(Level::Info, "logging_selftest", &json!({})).unwrap();
    }

    #[test]
    fn writes_one_json_record_per_line() {
        let _guard = test_destination_lock();
        let dir = tempfile::tempdir().unwrap();
        let path = dir.path().join("nested").join("run.jsonl");
        set_log_path(&path);

        log_event(Level::Warn, "logging_selftest", &json!({ "trial": 7 })).unwrap();

        let contents = fs::read_to_string(&path).unwrap();
        let record: Value = contents
            .lines()
            .map(|line| serde_json::from_str::<Value>(line).unwrap())
            .find(|record| record["event"] == "logging_selftest")
            .expect("self-test record present");
        assert_eq!(record["level"], "warn");
        assert_eq!(record["data"]["trial"], 7);
        assert!(record["ts"].as_f64().unwrap() > 0.0);

        disable();
    }
}
