//! Out-of-process room liveness probes.
//!
//! A probe asks "does this room exist, and how busy is it?". The concrete
//! [`ProcessProbe`] runs a one-shot helper process that prints a single JSON
//! document on stdout:
//!
//! ```text
//! {"room": "abc", "title": "...", "users": 3, "files": 12, "disabled": false}
//! {"type": "RuntimeError", "message": "Room returned 404"}
//! ```

use std::process::Stdio;
use std::time::Duration;

use async_trait::async_trait;
use parrot_core::config::DiscoveryConfig;
use parrot_core::{ParrotError, Result};
use serde::Deserialize;
use serde_json::Value;
use thiserror::Error;

use crate::store::{AliveState, RoomStats};

/// Successful probe output.
#[derive(Debug, Clone, Default, PartialEq, Eq)]
pub struct ProbeReport {
    /// Canonical id; absent means "same as requested".
    pub room: Option<String>,
    pub title: String,
    pub users: i64,
    pub files: i64,
    pub disabled: bool,
}

impl ProbeReport {
    pub fn canonical_id<'a>(&'a self, requested: &'a str) -> &'a str {
        match self.room.as_deref() {
            Some(room) if !room.is_empty() => room,
            _ => requested,
        }
    }

    pub fn stats(&self) -> RoomStats {
        RoomStats {
            title: self.title.clone(),
            users: self.users.max(0),
            files: self.files.max(0),
        }
    }
}

#[derive(Debug, Error)]
pub enum ProbeError {
    #[error("probe timed out after {0:?}")]
    Timeout(Duration),

    #[error("failed to run probe: {0}")]
    Spawn(String),

    #[error("probe exited with {code:?}: {stderr}")]
    Exited { code: Option<i32>, stderr: String },

    #[error("{kind}: {message}")]
    Remote { kind: String, message: String },

    #[error("malformed probe output: {0}")]
    Malformed(String),
}

impl ProbeError {
    /// The room does not exist any more.
    pub fn is_not_found(&self) -> bool {
        match self {
            ProbeError::Remote { kind, message } => kind.contains("404") || message.contains("404"),
            ProbeError::Exited { stderr, .. } => stderr.contains("404"),
            _ => false,
        }
    }
}

pub type ProbeResult = std::result::Result<ProbeReport, ProbeError>;

/// What a probe result means for the directory row.
pub fn classify(result: &ProbeResult) -> AliveState {
    match result {
        Ok(report) if report.disabled => AliveState::Dead,
        Ok(_) => AliveState::Alive,
        Err(e) if e.is_not_found() => AliveState::Dead,
        Err(_) => AliveState::Unknown,
    }
}

#[async_trait]
pub trait LivenessProbe: Send + Sync {
    async fn probe(&self, room: &str) -> ProbeResult;
}

/// A report object as printed. `title`, `users` and `files` are only
/// optional for disabled rooms.
#[derive(Deserialize)]
struct RawReport {
    #[serde(default)]
    room: Option<String>,
    title: Option<String>,
    users: Option<i64>,
    files: Option<i64>,
    #[serde(default)]
    disabled: bool,
}

impl RawReport {
    fn into_report(self) -> Option<ProbeReport> {
        if self.disabled {
            return Some(ProbeReport {
                room: self.room,
                title: self.title.unwrap_or_default(),
                users: self.users.unwrap_or(0),
                files: self.files.unwrap_or(0),
                disabled: true,
            });
        }
        Some(ProbeReport {
            room: self.room,
            title: self.title?,
            users: self.users?,
            files: self.files?,
            disabled: false,
        })
    }
}

/// Positional form: `[title, users, files]` or `[title, users, files, disabled]`.
#[derive(Deserialize)]
#[serde(untagged)]
enum LegacyReply {
    Full((String, i64, i64, Option<bool>)),
    Short((String, i64, i64)),
}

impl From<LegacyReply> for ProbeReport {
    fn from(reply: LegacyReply) -> Self {
        let (title, users, files, disabled) = match reply {
            LegacyReply::Full((title, users, files, disabled)) => (title, users, files, disabled.unwrap_or(false)),
            LegacyReply::Short((title, users, files)) => (title, users, files, false),
        };
        ProbeReport {
            room: None,
            title,
            users,
            files,
            disabled,
        }
    }
}

fn text_field(map: &serde_json::Map<String, Value>, key: &str) -> String {
    match map.get(key) {
        Some(Value::String(s)) => s.clone(),
        Some(Value::Null) | None => String::new(),
        Some(other) => other.to_string(),
    }
}

/// Interpret a finished probe process.
///
/// Any object carrying `type` or `message` is a failure, whatever the exit
/// status. A non-zero exit is never a report.
pub fn parse_output(success: bool, code: Option<i32>, stdout: &str, stderr: &str) -> ProbeResult {
    let body = stdout.trim();
    let parsed = serde_json::from_str::<Value>(body);

    if let Ok(Value::Object(map)) = &parsed
        && (map.contains_key("type") || map.contains_key("message"))
    {
        return Err(ProbeError::Remote {
            kind: text_field(map, "type"),
            message: text_field(map, "message"),
        });
    }
    if !success {
        return Err(ProbeError::Exited {
            code,
            stderr: stderr.trim().to_string(),
        });
    }

    let malformed = |e: serde_json::Error| ProbeError::Malformed(format!("{e}: {body:.80}"));
    let value = parsed.map_err(malformed)?;
    if value.is_object() {
        let raw: RawReport = serde_json::from_value(value).map_err(malformed)?;
        raw.into_report()
            .ok_or_else(|| ProbeError::Malformed(format!("incomplete report: {body:.80}")))
    } else if value.is_array() {
        let legacy: LegacyReply = serde_json::from_value(value).map_err(malformed)?;
        Ok(legacy.into())
    } else {
        Err(ProbeError::Malformed(format!("unexpected output: {body:.80}")))
    }
}

/// Runs `<command...> <room>` with a hard timeout.
#[derive(Debug, Clone)]
pub struct ProcessProbe {
    program: String,
    args: Vec<String>,
    timeout: Duration,
}

impl ProcessProbe {
    pub fn new(command: &[String], timeout: Duration) -> Result<Self> {
        let (program, args) = command
            .split_first()
            .ok_or_else(|| ParrotError::Config("probe command is empty".into()))?;
        Ok(Self {
            program: program.clone(),
            args: args.to_vec(),
            timeout,
        })
    }

    pub fn from_config(config: &DiscoveryConfig) -> Result<Self> {
        Self::new(
            &config.probe_command,
            Duration::from_secs(config.probe_timeout_secs),
        )
    }
}

#[async_trait]
impl LivenessProbe for ProcessProbe {
    async fn probe(&self, room: &str) -> ProbeResult {
        let output = tokio::process::Command::new(&self.program)
            .args(&self.args)
            .arg(room)
            .stdin(Stdio::null())
            .stdout(Stdio::piped())
            .stderr(Stdio::piped())
            .kill_on_drop(true)
            .output();

        let output = match tokio::time::timeout(self.timeout, output).await {
            Ok(Ok(output)) => output,
            Ok(Err(e)) => return Err(ProbeError::Spawn(format!("{}: {e}", self.program))),
            Err(_) => return Err(ProbeError::Timeout(self.timeout)),
        };

        let result = parse_output(
            output.status.success(),
            output.status.code(),
            &String::from_utf8_lossy(&output.stdout),
            &String::from_utf8_lossy(&output.stderr),
        );
        tracing::debug!("🔎 probe {room}: {:?}", classify(&result));
        result
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_parse_report() {
        let out = r#"{"room": "Canon", "title": "t", "users": 3, "files": 12, "disabled": false}"#;
        let report = parse_output(true, Some(0), out, "").unwrap();
        assert_eq!(report.canonical_id("alias"), "Canon");
        assert_eq!(report.stats().files, 12);
        assert_eq!(classify(&Ok(report)), AliveState::Alive);
    }

    #[test]
    fn test_parse_report_without_room_uses_requested_id() {
        let report = parse_output(true, Some(0), r#"{"title": "x", "users": 1, "files": 0}"#, "").unwrap();
        assert_eq!(report.canonical_id("abc"), "abc");
        assert_eq!(report.users, 1);
    }

    #[test]
    fn test_parse_legacy_list() {
        let report = parse_output(true, Some(0), r#"["title", 4, 9, null]"#, "").unwrap();
        assert_eq!((report.users, report.files, report.disabled), (4, 9, false));

        let report = parse_output(true, Some(0), r#"["title", 4, 9]"#, "").unwrap();
        assert_eq!((report.title.as_str(), report.users, report.files), ("title", 4, 9));

        let report = parse_output(true, Some(0), r#"["", 0, 0, true]"#, "").unwrap();
        assert_eq!(classify(&Ok(report)), AliveState::Dead);
    }

    #[test]
    fn test_incomplete_objects_are_not_reports() {
        for out in ["{}", r#"{"title": "x", "users": 1}"#, r#"{"error": "boom"}"#] {
            let result = parse_output(true, Some(0), out, "");
            assert!(matches!(result, Err(ProbeError::Malformed(_))), "{out}");
            assert_eq!(classify(&result), AliveState::Unknown);
        }
    }

    #[test]
    fn test_crash_printing_json_is_transient() {
        let result = parse_output(false, Some(1), r#"{"error": "Traceback (most recent call last)"}"#, "");
        assert!(matches!(result, Err(ProbeError::Exited { code: Some(1), .. })));
        assert_eq!(classify(&result), AliveState::Unknown);
    }

    #[test]
    fn test_nonzero_exit_with_report_is_not_alive() {
        let out = r#"{"title": "t", "users": 3, "files": 1}"#;
        let result = parse_output(false, Some(2), out, "");
        assert!(matches!(result, Err(ProbeError::Exited { .. })));
        assert_eq!(classify(&result), AliveState::Unknown);
    }

    #[test]
    fn test_failure_without_message_still_classified() {
        let result = parse_output(false, Some(1), r#"{"type": "HTTPError 404"}"#, "");
        assert!(matches!(result, Err(ProbeError::Remote { .. })));
        assert_eq!(classify(&result), AliveState::Dead);

        let result = parse_output(true, Some(0), r#"{"message": "rate limited"}"#, "");
        assert_eq!(classify(&result), AliveState::Unknown);
    }

    #[test]
    fn test_disabled_is_dead() {
        let result = parse_output(true, Some(0), r#"{"title": "", "disabled": true}"#, "");
        assert_eq!(classify(&result), AliveState::Dead);
    }

    #[test]
    fn test_remote_404_is_dead() {
        let out = r#"{"type": "RuntimeError", "message": "Room returned 404"}"#;
        let result = parse_output(false, Some(1), out, "");
        assert!(matches!(result, Err(ProbeError::Remote { .. })));
        assert_eq!(classify(&result), AliveState::Dead);
    }

    #[test]
    fn test_other_failures_are_transient() {
        let out = r#"{"type": "ConnectionError", "message": "reset by peer"}"#;
        assert_eq!(classify(&parse_output(false, Some(1), out, "")), AliveState::Unknown);
        assert_eq!(classify(&parse_output(true, Some(0), "garbage", "")), AliveState::Unknown);
        assert_eq!(
            classify(&Err(ProbeError::Timeout(Duration::from_secs(3)))),
            AliveState::Unknown
        );
    }

    #[test]
    fn test_crash_with_404_on_stderr_is_dead() {
        let result = parse_output(false, Some(1), "", "HTTPError: 404 Not Found");
        assert!(matches!(result, Err(ProbeError::Exited { .. })));
        assert_eq!(classify(&result), AliveState::Dead);
    }

    #[test]
    fn test_empty_command_rejected() {
        assert!(ProcessProbe::new(&[], Duration::from_secs(1)).is_err());
    }

    #[cfg(unix)]
    #[tokio::test]
    async fn test_process_probe_passes_room_argument() {
        let cmd = vec![
            "sh".to_string(),
            "-c".to_string(),
            r#"printf '{"room":"%s","title":"t","users":2,"files":5}' "$1""#.to_string(),
            "probe".to_string(),
        ];
        let probe = ProcessProbe::new(&cmd, Duration::from_secs(5)).unwrap();
        let report = probe.probe("abc").await.unwrap();
        assert_eq!(report.canonical_id("x"), "abc");
        assert_eq!(report.files, 5);
    }

    #[cfg(unix)]
    #[tokio::test]
    async fn test_process_probe_times_out() {
        let cmd = vec!["sh".to_string(), "-c".to_string(), "sleep 5".to_string()];
        let probe = ProcessProbe::new(&cmd, Duration::from_millis(100)).unwrap();
        let result = probe.probe("abc").await;
        assert!(matches!(result, Err(ProbeError::Timeout(_))));
    }

    #[tokio::test]
    async fn test_process_probe_missing_binary() {
        let cmd = vec!["parrot-no-such-probe-binary".to_string()];
        let probe = ProcessProbe::new(&cmd, Duration::from_secs(1)).unwrap();
        let result = probe.probe("abc").await;
        assert!(matches!(result, Err(ProbeError::Spawn(_))));
        assert_eq!(classify(&result), AliveState::Unknown);
    }
}
