//! §4.9 — append-only JSONL operation log. Every CLI command writes one
//! entry to `logs/operations.log`; audit outcomes additionally land in
//! `logs/audit.log`.

pub mod query;

use std::sync::Mutex;

use anyhow::{Context, Result};
use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};
use serde_json::Value;

pub use query::{Filter, filter_entries};

#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum Status {
    Ok,
    Error,
    Warning,
}

#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct OperationEntry {
    pub time: DateTime<Utc>,
    pub cmd: String,
    pub status: Status,
    pub duration_ms: u64,
    #[serde(default)]
    pub detail: Value,
}

#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct AuditLogEntry {
    pub time: DateTime<Utc>,
    pub scanned: usize,
    pub failed_skills: Vec<String>,
    pub findings_by_severity: std::collections::HashMap<crate::audit::Severity, usize>,
}

const OPERATIONS_LOG: &str = "operations.log";
const AUDIT_LOG: &str = "audit.log";

/// Serializes concurrent appends within this process; inter-process
/// safety is explicitly out of scope (§5).
static APPEND_LOCK: Mutex<()> = Mutex::new(());

fn append_line(file_name: &str, line: &str) -> Result<()> {
    use std::io::Write;
    let _guard = APPEND_LOCK.lock().unwrap();
    let dir = crate::config::paths::logs_dir();
    std::fs::create_dir_all(&dir).with_context(|| format!("creating {}", dir.display()))?;
    let path = dir.join(file_name);
    let mut file = std::fs::OpenOptions::new()
        .create(true)
        .append(true)
        .open(&path)
        .with_context(|| format!("opening {}", path.display()))?;
    writeln!(file, "{line}").with_context(|| format!("appending to {}", path.display()))
}

pub fn record_operation(entry: &OperationEntry) -> Result<()> {
    let line = serde_json::to_string(entry).context("serializing operation log entry")?;
    append_line(OPERATIONS_LOG, &line)
}

pub fn record_audit(entry: &AuditLogEntry) -> Result<()> {
    let line = serde_json::to_string(entry).context("serializing audit log entry")?;
    append_line(AUDIT_LOG, &line)
}

pub fn read_operations() -> Result<Vec<OperationEntry>> {
    let path = crate::config::paths::logs_dir().join(OPERATIONS_LOG);
    if !path.exists() {
        return Ok(Vec::new());
    }
    let text = std::fs::read_to_string(&path).with_context(|| format!("reading {}", path.display()))?;
    text.lines()
        .filter(|l| !l.trim().is_empty())
        .map(|l| serde_json::from_str(l).with_context(|| format!("parsing operation log line: {l}")))
        .collect()
}

/// Helper for timing a command and recording its outcome in one call.
pub fn record_timed<T>(cmd: &str, f: impl FnOnce() -> Result<T>) -> Result<T> {
    let start = std::time::Instant::now();
    let result = f();
    let duration_ms = start.elapsed().as_millis() as u64;
    let (status, detail) = match &result {
        Ok(_) => (Status::Ok, Value::Null),
        Err(e) => (Status::Error, Value::String(e.to_string())),
    };
    let _ = record_operation(&OperationEntry {
        time: crate::oplog::now(),
        cmd: cmd.to_string(),
        status,
        duration_ms,
        detail,
    });
    result
}

/// `Utc::now()` wrapped so call sites read naturally; not memoized,
/// this is the one place in the crate that touches wall-clock time for
/// logging purposes.
fn now() -> DateTime<Utc> {
    Utc::now()
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn append_and_read_round_trips() {
        let tmp = tempfile::tempdir().unwrap();
        unsafe {
            std::env::set_var("XDG_DATA_HOME", tmp.path());
        }
        record_operation(&OperationEntry {
            time: Utc::now(),
            cmd: "sync".to_string(),
            status: Status::Ok,
            duration_ms: 12,
            detail: serde_json::json!({"targets": ["claude-code"]}),
        })
        .unwrap();
        let entries = read_operations().unwrap();
        assert_eq!(entries.len(), 1);
        assert_eq!(entries[0].cmd, "sync");
        unsafe {
            std::env::remove_var("XDG_DATA_HOME");
        }
    }
}
