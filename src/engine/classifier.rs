// src/engine/classifier.rs

//! Exit classification.
//!
//! [`classify`] is a pure function of the exit report, the task's
//! `stopped_by_user` flag and the [`ClassifierPolicy`]. Rules are evaluated
//! in a fixed order and the first match wins:
//!
//! 1. user stop flag set -> `Stopped`
//! 2. exit code `0` -> `Completed`
//! 3. empty diagnostics -> `Stopped` (or `Unknown` failure under
//!    [`SilentExitBehaviour::Failed`])
//! 4. version banner only, short -> `Stopped`
//! 5. known failure signatures, in table order
//! 6. anything else -> `Failure(Unknown)` with a truncated excerpt

use crate::types::{Classification, ExitReport, FailureReason, SilentExitBehaviour};

/// Diagnostics containing the banner and shorter than this are start-up noise.
pub const BANNER_LIMIT: usize = 500;

/// Maximum number of characters of diagnostics kept in `Unknown` failures.
pub const EXCERPT_LIMIT: usize = 300;

const BANNER_MARKER: &str = "ffmpeg version";

/// Failure signatures, scanned in order.
const SIGNATURES: &[(&[&str], Signature)] = &[
    (&["403 Forbidden"], Signature::Forbidden),
    (
        &["Connection refused", "Server returned"],
        Signature::StreamUnavailable,
    ),
    (&["404 Not Found"], Signature::NotFound),
    (
        &["Invalid data found", "moov atom not found"],
        Signature::InvalidStream,
    ),
    (&["No such file or directory"], Signature::PathError),
];

#[derive(Debug, Clone, Copy)]
enum Signature {
    Forbidden,
    StreamUnavailable,
    NotFound,
    InvalidStream,
    PathError,
}

impl From<Signature> for FailureReason {
    fn from(sig: Signature) -> Self {
        match sig {
            Signature::Forbidden => FailureReason::Forbidden,
            Signature::StreamUnavailable => FailureReason::StreamUnavailable,
            Signature::NotFound => FailureReason::NotFound,
            Signature::InvalidStream => FailureReason::InvalidStream,
            Signature::PathError => FailureReason::PathError,
        }
    }
}

/// Tunables for the heuristic rules.
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq)]
pub struct ClassifierPolicy {
    pub silent_exit: SilentExitBehaviour,
}

pub fn classify(
    report: &ExitReport,
    stopped_by_user: bool,
    policy: ClassifierPolicy,
) -> Classification {
    if stopped_by_user {
        return Classification::Stopped;
    }

    if report.exit_code == 0 {
        return Classification::Completed;
    }

    let text = report.diagnostics.as_str();
    let trimmed = text.trim();

    if trimmed.is_empty() {
        return match policy.silent_exit {
            SilentExitBehaviour::Stopped => Classification::Stopped,
            SilentExitBehaviour::Failed => Classification::Failure(FailureReason::Unknown {
                exit_code: report.exit_code,
                excerpt: String::new(),
            }),
        };
    }

    if is_banner_only(trimmed) {
        return Classification::Stopped;
    }

    for (needles, sig) in SIGNATURES {
        if needles.iter().any(|n| text.contains(n)) {
            return Classification::Failure((*sig).into());
        }
    }

    Classification::Failure(FailureReason::Unknown {
        exit_code: report.exit_code,
        excerpt: excerpt(text),
    })
}

fn is_banner_only(trimmed: &str) -> bool {
    trimmed.contains(BANNER_MARKER) && trimmed.chars().count() < BANNER_LIMIT
}

fn excerpt(text: &str) -> String {
    text.chars().take(EXCERPT_LIMIT).collect()
}
