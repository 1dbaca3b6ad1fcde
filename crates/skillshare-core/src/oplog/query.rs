//! Pure filtering over already-loaded log entries, so the CLI's `log`
//! command stays a thin adapter: load, filter, print.

use anyhow::{Context, Result};
use chrono::{DateTime, Duration, Utc};

use super::{OperationEntry, Status};
use crate::error::SkillshareError;

#[derive(Debug, Clone, Default)]
pub struct Filter {
    pub cmd: Option<String>,
    pub status: Option<Status>,
    pub since: Option<String>,
    pub tail: Option<usize>,
}

/// Parse `--since`: either a duration shorthand (`1h`, `30m`, `2d`) or an
/// ISO 8601 date/datetime. Invalid input is `InvalidTimeFormat`.
fn parse_since(input: &str) -> Result<DateTime<Utc>> {
    if let Some(cutoff) = parse_duration_shorthand(input) {
        return Ok(Utc::now() - cutoff);
    }
    if let Ok(dt) = DateTime::parse_from_rfc3339(input) {
        return Ok(dt.with_timezone(&Utc));
    }
    if let Ok(date) = chrono::NaiveDate::parse_from_str(input, "%Y-%m-%d") {
        let dt = date.and_hms_opt(0, 0, 0).unwrap();
        return Ok(DateTime::from_naive_utc_and_offset(dt, Utc));
    }
    Err(SkillshareError::InvalidTimeFormat { input: input.to_string() }.into())
}

fn parse_duration_shorthand(input: &str) -> Option<Duration> {
    let (digits, unit) = input.split_at(input.len().checked_sub(1)?);
    let n: i64 = digits.parse().ok()?;
    match unit {
        "s" => Some(Duration::seconds(n)),
        "m" => Some(Duration::minutes(n)),
        "h" => Some(Duration::hours(n)),
        "d" => Some(Duration::days(n)),
        _ => None,
    }
}

pub fn filter_entries(entries: Vec<OperationEntry>, filter: &Filter) -> Result<Vec<OperationEntry>> {
    let since_cutoff = filter.since.as_deref().map(parse_since).transpose().with_context(|| {
        format!("parsing --since value {:?}", filter.since.as_deref().unwrap_or_default())
    })?;

    let mut filtered: Vec<OperationEntry> = entries
        .into_iter()
        .filter(|e| filter.cmd.as_deref().map(|c| c == e.cmd).unwrap_or(true))
        .filter(|e| filter.status.map(|s| s == e.status).unwrap_or(true))
        .filter(|e| since_cutoff.map(|cutoff| e.time >= cutoff).unwrap_or(true))
        .collect();

    if let Some(tail) = filter.tail {
        let start = filtered.len().saturating_sub(tail);
        filtered = filtered.split_off(start);
    }

    Ok(filtered)
}

#[cfg(test)]
mod tests {
    use super::*;
    use serde_json::Value;

    fn entry(cmd: &str, status: Status, time: DateTime<Utc>) -> OperationEntry {
        OperationEntry {
            time,
            cmd: cmd.to_string(),
            status,
            duration_ms: 1,
            detail: Value::Null,
        }
    }

    #[test]
    fn filters_by_cmd_and_status() {
        let entries = vec![
            entry("sync", Status::Ok, Utc::now()),
            entry("install", Status::Error, Utc::now()),
        ];
        let filter = Filter {
            cmd: Some("sync".to_string()),
            ..Default::default()
        };
        let result = filter_entries(entries, &filter).unwrap();
        assert_eq!(result.len(), 1);
        assert_eq!(result[0].cmd, "sync");
    }

    #[test]
    fn invalid_since_errors() {
        let filter = Filter {
            since: Some("not-a-time".to_string()),
            ..Default::default()
        };
        let err = filter_entries(vec![], &filter).unwrap_err();
        assert!(err.to_string().contains("parsing --since"));
    }

    #[test]
    fn tail_keeps_only_last_n() {
        let entries: Vec<_> = (0..5).map(|i| entry(&format!("cmd{i}"), Status::Ok, Utc::now())).collect();
        let filter = Filter { tail: Some(2), ..Default::default() };
        let result = filter_entries(entries, &filter).unwrap();
        assert_eq!(result.len(), 2);
        assert_eq!(result[0].cmd, "cmd3");
        assert_eq!(result[1].cmd, "cmd4");
    }
}
