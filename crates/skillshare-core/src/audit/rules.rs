//! Concrete pattern table — implementation-defined per §9's open
//! question, but must classify prompt-injection and
//! credential-exfiltration phrasing at `critical`.

use super::Severity;

pub struct Rule {
    pub name: &'static str,
    pub needle: &'static str,
    pub severity: Severity,
}

pub const RULES: &[Rule] = &[
    Rule {
        name: "prompt-injection-ignore-instructions",
        needle: "ignore all previous instructions",
        severity: Severity::Critical,
    },
    Rule {
        name: "prompt-injection-disregard-system",
        needle: "disregard the system prompt",
        severity: Severity::Critical,
    },
    Rule {
        name: "prompt-injection-new-instructions",
        needle: "your new instructions are",
        severity: Severity::Critical,
    },
    Rule {
        name: "credential-exfiltration-env",
        needle: "send the contents of .env",
        severity: Severity::Critical,
    },
    Rule {
        name: "credential-exfiltration-generic",
        needle: "exfiltrate",
        severity: Severity::Critical,
    },
    Rule {
        name: "credential-exfiltration-curl-pipe",
        needle: "curl",
        severity: Severity::High,
    },
    Rule {
        name: "credential-exfiltration-secrets",
        needle: "extract secrets",
        severity: Severity::Critical,
    },
    Rule {
        name: "suspicious-base64-pipe",
        needle: "| base64",
        severity: Severity::Medium,
    },
    Rule {
        name: "suspicious-reverse-shell",
        needle: "/bin/sh -i",
        severity: Severity::High,
    },
    Rule {
        name: "suspicious-network-exfil",
        needle: "wget http",
        severity: Severity::Low,
    },
];

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn rules_table_is_non_empty_and_has_critical_entries() {
        assert!(RULES.iter().any(|r| r.severity == Severity::Critical));
        assert!(!RULES.is_empty());
    }
}
