//! Per-device result of an update run

use std::fmt;

use serde::Serialize;

use crate::models::version::Version;

/// Terminal result of one device's orchestration
#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
#[serde(tag = "outcome", content = "detail", rename_all = "snake_case")]
pub enum OrchestrationOutcome {
    /// Installed content is the same or newer
    Skipped { current: Version, candidate: Version },

    /// Installed versions could not be read, device skipped
    VersionCheckFailed(String),

    /// Package could not be uploaded
    UploadFailed(String),

    /// Install requested, completion not awaited
    InstallStarted,

    /// Install job (and any chained job) finished
    InstallSucceeded,

    /// Install request, polling or the job itself failed
    InstallFailed(String),

    /// Install job did not finish before the deadline
    InstallTimedOut(String),

    /// Waiting was aborted by the operator after the upload
    Cancelled(String),

    /// Run was cancelled before this device was contacted
    NotStarted(String),
}

impl OrchestrationOutcome {
    pub fn is_success(&self) -> bool {
        matches!(
            self,
            OrchestrationOutcome::Skipped { .. }
                | OrchestrationOutcome::InstallStarted
                | OrchestrationOutcome::InstallSucceeded
        )
    }

    /// True when the package reached the device
    pub fn uploaded(&self) -> bool {
        matches!(
            self,
            OrchestrationOutcome::InstallStarted
                | OrchestrationOutcome::InstallSucceeded
                | OrchestrationOutcome::InstallFailed(_)
                | OrchestrationOutcome::InstallTimedOut(_)
                | OrchestrationOutcome::Cancelled(_)
        )
    }
}

impl fmt::Display for OrchestrationOutcome {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            OrchestrationOutcome::Skipped { current, candidate } => {
                write!(f, "skipped (installed {} >= {})", current, candidate)
            }
            OrchestrationOutcome::VersionCheckFailed(e) => write!(f, "version check failed: {}", e),
            OrchestrationOutcome::UploadFailed(e) => write!(f, "upload failed: {}", e),
            OrchestrationOutcome::InstallStarted => f.write_str("install started"),
            OrchestrationOutcome::InstallSucceeded => f.write_str("install succeeded"),
            OrchestrationOutcome::InstallFailed(e) => write!(f, "install failed: {}", e),
            OrchestrationOutcome::InstallTimedOut(e) => write!(f, "install timed out: {}", e),
            OrchestrationOutcome::Cancelled(e) => write!(f, "cancelled: {}", e),
            OrchestrationOutcome::NotStarted(e) => write!(f, "not started: {}", e),
        }
    }
}
