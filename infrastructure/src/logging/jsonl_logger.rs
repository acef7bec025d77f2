//! JSONL audit log for tool executions and resource events.
//!
//! Each [`ExecutionEvent`] is serialized as a single JSON line with a
//! `type` field and `timestamp`, appended to the file via a buffered writer.

use argos_application::ports::execution_logger::{ExecutionEvent, ExecutionLogger};
use std::fs::{File, OpenOptions};
use std::io::{BufWriter, Write};
use std::path::{Path, PathBuf};
use std::sync::Mutex;
use tracing::warn;

/// JSONL execution logger that writes one JSON object per line.
///
/// Thread-safe via `Mutex<BufWriter<File>>`. Appends to an existing log so
/// restarts keep the history. Flushes on `Drop`.
pub struct JsonlExecutionLogger {
    writer: Mutex<BufWriter<File>>,
    path: PathBuf,
}

impl JsonlExecutionLogger {
    /// Open (or create) the log at the given path.
    ///
    /// Creates parent directories as needed. Returns `None` if the file
    /// cannot be opened.
    pub fn new(path: impl AsRef<Path>) -> Option<Self> {
        let path = path.as_ref();

        if let Some(parent) = path.parent()
            && let Err(e) = std::fs::create_dir_all(parent)
        {
            warn!(
                "Could not create execution log directory {}: {}",
                parent.display(),
                e
            );
            return None;
        }

        let file = match OpenOptions::new().create(true).append(true).open(path) {
            Ok(f) => f,
            Err(e) => {
                warn!("Could not open execution log file {}: {}", path.display(), e);
                return None;
            }
        };

        Some(Self {
            writer: Mutex::new(BufWriter::new(file)),
            path: path.to_path_buf(),
        })
    }

    pub fn path(&self) -> &Path {
        &self.path
    }
}

impl ExecutionLogger for JsonlExecutionLogger {
    fn log(&self, event: ExecutionEvent) {
        let timestamp = chrono::Utc::now().to_rfc3339_opts(chrono::SecondsFormat::Millis, true);

        let record = if let serde_json::Value::Object(mut map) = event.payload {
            map.insert(
                "type".to_string(),
                serde_json::Value::String(event.event_type.to_string()),
            );
            map.insert("timestamp".to_string(), serde_json::Value::String(timestamp));
            serde_json::Value::Object(map)
        } else {
            serde_json::json!({
                "type": event.event_type,
                "timestamp": timestamp,
                "data": event.payload,
            })
        };

        let Ok(line) = serde_json::to_string(&record) else {
            return;
        };

        let mut writer = self.writer.lock().unwrap_or_else(|e| e.into_inner());
        let _ = writeln!(writer, "{}", line);
        // Flush every record; the log must survive a crash
        let _ = writer.flush();
    }
}

impl Drop for JsonlExecutionLogger {
    fn drop(&mut self) {
        let mut writer = self.writer.lock().unwrap_or_else(|e| e.into_inner());
        let _ = writer.flush();
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use std::fs;

    fn records(path: &Path) -> Vec<serde_json::Value> {
        fs::read_to_string(path)
            .unwrap()
            .lines()
            .map(|line| serde_json::from_str(line).unwrap())
            .collect()
    }

    #[test]
    fn test_writes_one_record_per_event() {
        let dir = tempfile::tempdir().unwrap();
        let path = dir.path().join("audit").join("executions.jsonl");
        let logger = JsonlExecutionLogger::new(&path).unwrap();

        logger.log(ExecutionEvent::new(
            "tool_execution",
            serde_json::json!({"tool": "geo.distance", "status": "success", "duration_ms": 3}),
        ));
        logger.log(ExecutionEvent::new(
            "resource_event",
            serde_json::json!({"event": "acquired", "device": "hackrf", "owner": "sweep"}),
        ));
        drop(logger);

        let lines = records(&path);
        assert_eq!(lines.len(), 2);
        assert_eq!(lines[0]["type"], "tool_execution");
        assert_eq!(lines[0]["tool"], "geo.distance");
        assert!(lines[0]["timestamp"].as_str().unwrap().ends_with('Z'));
        assert_eq!(lines[1]["type"], "resource_event");
        assert_eq!(lines[1]["owner"], "sweep");
    }

    #[test]
    fn test_non_object_payload_is_wrapped() {
        let dir = tempfile::tempdir().unwrap();
        let path = dir.path().join("wrapped.jsonl");
        let logger = JsonlExecutionLogger::new(&path).unwrap();

        logger.log(ExecutionEvent::new("note", serde_json::json!("just a string")));
        drop(logger);

        let lines = records(&path);
        assert_eq!(lines[0]["type"], "note");
        assert_eq!(lines[0]["data"], "just a string");
    }

    #[test]
    fn test_reopening_appends() {
        let dir = tempfile::tempdir().unwrap();
        let path = dir.path().join("append.jsonl");

        for n in 0..2 {
            let logger = JsonlExecutionLogger::new(&path).unwrap();
            logger.log(ExecutionEvent::new("run", serde_json::json!({ "n": n })));
        }

        let lines = records(&path);
        assert_eq!(lines.len(), 2);
        assert_eq!(lines[1]["n"], 1);
    }

    #[test]
    fn test_unopenable_path_is_none() {
        let dir = tempfile::tempdir().unwrap();
        let blocker = dir.path().join("file");
        fs::write(&blocker, "").unwrap();

        assert!(JsonlExecutionLogger::new(blocker.join("nested.jsonl")).is_none());
    }
}
