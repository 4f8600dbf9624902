use std::{
    fs::OpenOptions,
    io::Write,
    path::{Path, PathBuf},
};

use chrono::Utc;
use serde::Serialize;
use serde_json::Value;

use crate::{errors::Error, formatting::truncate_chars, Result};

// ============== Timestamp Helpers ==============

/// RFC3339 timestamp in UTC (for logs and persisted rows).
pub fn iso_timestamp_utc() -> String {
    Utc::now().to_rfc3339()
}

// ============== Audit Logging ==============

const AUDIT_MAX_TEXT: usize = 500;

/// One line of the interaction log.
#[derive(Clone, Debug, Default, Serialize)]
pub struct AuditEvent {
    pub timestamp: String,
    pub event: String,

    #[serde(skip_serializing_if = "Option::is_none")]
    pub user_id: Option<i64>,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub username: Option<String>,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub chat_id: Option<i64>,

    #[serde(skip_serializing_if = "Option::is_none")]
    pub message_type: Option<String>,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub content: Option<String>,

    #[serde(skip_serializing_if = "Option::is_none")]
    pub authorized: Option<bool>,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub reason: Option<String>,

    #[serde(skip_serializing_if = "Option::is_none")]
    pub error: Option<String>,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub context: Option<String>,

    #[serde(skip_serializing_if = "Option::is_none")]
    pub retry_after: Option<f64>,
}

impl AuditEvent {
    fn base(event: &str, user_id: i64, username: &str) -> Self {
        Self {
            timestamp: iso_timestamp_utc(),
            event: event.to_string(),
            user_id: Some(user_id),
            username: Some(username.to_string()),
            ..Self::default()
        }
    }

    /// Inbound command, text or button press.
    pub fn message(
        user_id: i64,
        username: &str,
        chat_id: i64,
        message_type: &str,
        content: &str,
    ) -> Self {
        Self {
            chat_id: Some(chat_id),
            message_type: Some(message_type.to_string()),
            content: Some(content.to_string()),
            ..Self::base("message", user_id, username)
        }
    }

    pub fn access(user_id: i64, username: &str, authorized: bool, reason: Option<&str>) -> Self {
        Self {
            authorized: Some(authorized),
            reason: reason.map(|s| s.to_string()),
            ..Self::base("access", user_id, username)
        }
    }

    pub fn error(user_id: i64, username: &str, error: &str, context: Option<&str>) -> Self {
        Self {
            error: Some(error.to_string()),
            context: context.map(|s| s.to_string()),
            ..Self::base("error", user_id, username)
        }
    }

    pub fn rate_limit(user_id: i64, username: &str, retry_after: f64) -> Self {
        Self {
            retry_after: Some(retry_after),
            ..Self::base("rate_limit", user_id, username)
        }
    }

    /// Bot added to (or removed from) a group.
    pub fn membership(chat_id: i64, title: &str, status: &str) -> Self {
        Self {
            timestamp: iso_timestamp_utc(),
            event: "membership".to_string(),
            chat_id: Some(chat_id),
            content: Some(title.to_string()),
            reason: Some(status.to_string()),
            ..Self::default()
        }
    }
}

#[derive(Clone, Debug)]
pub struct AuditLogger {
    path: PathBuf,
    json: bool,
}

impl AuditLogger {
    pub fn new(path: impl Into<PathBuf>, json: bool) -> Self {
        Self {
            path: path.into(),
            json,
        }
    }

    pub fn path(&self) -> &Path {
        &self.path
    }

    pub fn write(&self, mut event: AuditEvent) -> Result<()> {
        if let Some(s) = &event.content {
            event.content = Some(truncate_chars(s, AUDIT_MAX_TEXT));
        }

        let mut file = OpenOptions::new()
            .create(true)
            .append(true)
            .open(&self.path)?;

        let line = if self.json {
            serde_json::to_string(&event)?
        } else {
            plain_line(&event)?
        };
        writeln!(file, "{line}")?;
        Ok(())
    }

    /// Write and log failures instead of returning them.
    pub fn record(&self, event: AuditEvent) {
        if let Err(e) = self.write(event) {
            tracing::warn!(path = %self.path.display(), "audit write failed: {e}");
        }
    }
}

/// `timestamp event key=value ...`, one line per event, skipped fields omitted.
fn plain_line(event: &AuditEvent) -> Result<String> {
    let value = serde_json::to_value(event)?;
    let Value::Object(fields) = value else {
        return Err(Error::External("audit event is not a JSON object".to_string()));
    };

    let mut line = format!("{} {}", event.timestamp, event.event);
    for (key, v) in fields
        .iter()
        .filter(|(k, _)| !matches!(k.as_str(), "timestamp" | "event"))
    {
        let shown = match v {
            Value::String(s) => format!("{s:?}"),
            other => other.to_string(),
        };
        line.push_str(&format!(" {key}={shown}"));
    }
    Ok(line)
}

#[cfg(test)]
mod tests {
    use super::*;

    fn tmp_file(prefix: &str) -> PathBuf {
        let ts = std::time::SystemTime::now()
            .duration_since(std::time::UNIX_EPOCH)
            .map(|d| d.as_nanos())
            .unwrap_or(0);
        let pid = std::process::id();
        std::env::temp_dir().join(format!("{prefix}-{pid}-{ts}.log"))
    }

    #[test]
    fn json_lines_truncate_content() {
        let log = AuditLogger::new(tmp_file("hnb-audit-json"), true);
        let content = "x".repeat(AUDIT_MAX_TEXT + 1);
        log.write(AuditEvent::message(1, "@u", -5, "text", &content))
            .unwrap();

        let written = std::fs::read_to_string(log.path()).unwrap();
        let v: serde_json::Value = serde_json::from_str(written.trim()).unwrap();
        assert_eq!(v["event"], "message");
        assert_eq!(v["chat_id"], -5);
        assert!(v["content"].as_str().unwrap().ends_with("..."));
        assert!(v.get("error").is_none());
    }

    #[test]
    fn plain_text_lists_fields() {
        let log = AuditLogger::new(tmp_file("hnb-audit-text"), false);
        log.write(AuditEvent::access(9, "@x", false, Some("banned")))
            .unwrap();
        log.record(AuditEvent::rate_limit(9, "@x", 1.5));

        let written = std::fs::read_to_string(log.path()).unwrap();
        let lines: Vec<&str> = written.lines().collect();
        assert_eq!(lines.len(), 2);
        assert!(lines[0].contains(" access "));
        assert!(lines[0].contains("authorized=false"));
        assert!(lines[0].contains("reason=\"banned\""));
        assert!(lines[1].contains(" retry_after=1.5"));
    }
}
