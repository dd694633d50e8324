use std::fmt;
use std::str::FromStr;

use serde::Deserialize;

/// Opaque identifier of a capture task.
///
/// Either supplied by the caller or generated at `start()`; never recycled
/// implicitly.
#[derive(Debug, Clone, PartialEq, Eq, Hash, PartialOrd, Ord)]
pub struct TaskId(String);

impl TaskId {
    pub fn new(id: impl Into<String>) -> Self {
        Self(id.into())
    }

    /// `{room}_{quality}_{8 hex chars}`.
    pub fn generate(room_id: &str, quality_label: &str) -> Self {
        let suffix = uuid::Uuid::new_v4().simple().to_string();
        Self(format!("{room_id}_{quality_label}_{}", &suffix[..8]))
    }

    pub fn as_str(&self) -> &str {
        &self.0
    }
}

impl fmt::Display for TaskId {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(&self.0)
    }
}

impl From<&str> for TaskId {
    fn from(s: &str) -> Self {
        Self(s.to_string())
    }
}

/// Lifecycle status of a task.
///
/// `Recording` is the only non-terminal state; no transition leaves a
/// terminal one.
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum TaskStatus {
    Recording,
    Completed,
    Stopped,
    Failed(FailureReason),
}

impl TaskStatus {
    pub fn is_terminal(&self) -> bool {
        !matches!(self, TaskStatus::Recording)
    }

    pub fn label(&self) -> &'static str {
        match self {
            TaskStatus::Recording => "recording",
            TaskStatus::Completed => "completed",
            TaskStatus::Stopped => "stopped",
            TaskStatus::Failed(_) => "failed",
        }
    }
}

impl fmt::Display for TaskStatus {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.label())
    }
}

/// Why a capture process died on its own.
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum FailureReason {
    /// Upstream denied access (expired or signed URL rejected).
    Forbidden,
    /// Connection refused or the server answered with an error.
    StreamUnavailable,
    /// The room or resource does not exist.
    NotFound,
    /// Malformed or truncated media.
    InvalidStream,
    /// Output path missing or not writable.
    PathError,
    /// Nothing recognisable; carries the exit code and a truncated excerpt.
    Unknown { exit_code: i32, excerpt: String },
}

impl fmt::Display for FailureReason {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            FailureReason::Forbidden => {
                write!(f, "stream URL expired (403 Forbidden); resolve the room again")
            }
            FailureReason::StreamUnavailable => write!(
                f,
                "cannot connect to the stream; the room may be closed or the network is down"
            ),
            FailureReason::NotFound => write!(f, "room does not exist; check the room address"),
            FailureReason::InvalidStream => {
                write!(f, "stream is invalid or has ended; recording interrupted")
            }
            FailureReason::PathError => {
                write!(f, "output path is invalid or not writable")
            }
            FailureReason::Unknown { exit_code, excerpt } => {
                write!(f, "capture exited abnormally (exit code {exit_code})\n{excerpt}...")
            }
        }
    }
}

/// Result of classifying a process exit.
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum Classification {
    Completed,
    Stopped,
    Failure(FailureReason),
}

impl Classification {
    pub fn into_status(self) -> TaskStatus {
        match self {
            Classification::Completed => TaskStatus::Completed,
            Classification::Stopped => TaskStatus::Stopped,
            Classification::Failure(reason) => TaskStatus::Failed(reason),
        }
    }
}

/// What the watcher observed when the capture process terminated.
///
/// `exit_code` is `-1` when the process was killed by a signal.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct ExitReport {
    pub exit_code: i32,
    pub diagnostics: String,
}

impl ExitReport {
    pub fn new(exit_code: i32, diagnostics: impl Into<String>) -> Self {
        Self {
            exit_code,
            diagnostics: diagnostics.into(),
        }
    }
}

/// How a non-zero exit with no diagnostic output is classified.
///
/// - `Stopped` (default): treated as a benign, likely user-induced stop.
/// - `Failed`: reported as `FailureReason::Unknown` so the caller decides.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum SilentExitBehaviour {
    Stopped,
    Failed,
}

impl Default for SilentExitBehaviour {
    fn default() -> Self {
        SilentExitBehaviour::Stopped
    }
}

impl FromStr for SilentExitBehaviour {
    type Err = String;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        match s.trim().to_lowercase().as_str() {
            "stopped" => Ok(SilentExitBehaviour::Stopped),
            "failed" => Ok(SilentExitBehaviour::Failed),
            other => Err(format!(
                "invalid silent_exit: {other} (expected \"stopped\" or \"failed\")"
            )),
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn generated_ids_carry_room_and_quality() {
        let id = TaskId::generate("7788", "hd");
        let parts: Vec<&str> = id.as_str().split('_').collect();
        assert_eq!(parts.len(), 3);
        assert_eq!(parts[0], "7788");
        assert_eq!(parts[1], "hd");
        assert_eq!(parts[2].len(), 8);
        assert!(parts[2].chars().all(|c| c.is_ascii_hexdigit()));
    }

    #[test]
    fn generated_ids_are_fresh() {
        let a = TaskId::generate("1", "q");
        let b = TaskId::generate("1", "q");
        assert_ne!(a, b);
    }

    #[test]
    fn only_recording_is_non_terminal() {
        assert!(!TaskStatus::Recording.is_terminal());
        assert!(TaskStatus::Completed.is_terminal());
        assert!(TaskStatus::Stopped.is_terminal());
        assert!(TaskStatus::Failed(FailureReason::Forbidden).is_terminal());
    }

    #[test]
    fn unknown_failure_message_shows_code_and_excerpt() {
        let reason = FailureReason::Unknown {
            exit_code: 8,
            excerpt: "boom".to_string(),
        };
        let msg = reason.to_string();
        assert!(msg.contains("exit code 8"));
        assert!(msg.contains("boom..."));
    }

    #[test]
    fn silent_exit_parses_case_insensitively() {
        assert_eq!(
            "Failed".parse::<SilentExitBehaviour>(),
            Ok(SilentExitBehaviour::Failed)
        );
        assert!("maybe".parse::<SilentExitBehaviour>().is_err());
    }
}
