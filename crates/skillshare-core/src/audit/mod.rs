//! §4.7 — scans proposed skill content for injection/exfiltration
//! patterns and gates acceptance on a severity threshold.

pub mod rules;
pub mod scanner;

use serde::{Deserialize, Serialize};

pub use scanner::{AuditReport, scan_tree};

#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, PartialOrd, Ord, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum Severity {
    Low,
    Medium,
    High,
    Critical,
}

impl std::fmt::Display for Severity {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        let s = match self {
            Severity::Low => "low",
            Severity::Medium => "medium",
            Severity::High => "high",
            Severity::Critical => "critical",
        };
        write!(f, "{s}")
    }
}

impl std::str::FromStr for Severity {
    type Err = anyhow::Error;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        match s.to_ascii_lowercase().as_str() {
            "low" | "l" => Ok(Severity::Low),
            "medium" | "m" => Ok(Severity::Medium),
            "high" | "h" => Ok(Severity::High),
            "critical" | "c" => Ok(Severity::Critical),
            other => anyhow::bail!("unknown audit severity {other:?}"),
        }
    }
}

#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct Finding {
    pub skill: String,
    pub severity: Severity,
    pub pattern: String,
    pub location: String,
    pub snippet: String,
}
