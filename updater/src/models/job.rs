//! Device job status

use std::fmt;

use serde::{Deserialize, Serialize};

/// State of a device job as reported by `show jobs id`
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub enum JobState {
    /// `ACT` / `RUNNING`
    Running,

    /// `PEND`
    Pending,

    /// `FIN` / `FINISHED`
    Finished,

    /// Anything else, kept verbatim
    Other(String),
}

impl JobState {
    pub fn parse(raw: &str) -> Self {
        match raw.trim() {
            "ACT" | "RUNNING" => JobState::Running,
            "PEND" | "PENDING" => JobState::Pending,
            "FIN" | "FINISHED" => JobState::Finished,
            other => JobState::Other(other.to_string()),
        }
    }

    pub fn is_finished(&self) -> bool {
        matches!(self, JobState::Finished)
    }
}

impl fmt::Display for JobState {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            JobState::Running => f.write_str("RUNNING"),
            JobState::Pending => f.write_str("PENDING"),
            JobState::Finished => f.write_str("FINISHED"),
            JobState::Other(s) => f.write_str(s),
        }
    }
}

/// Status and progress of one job
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct JobStatus {
    pub state: JobState,

    /// Percent complete, 0..=100
    pub progress: u8,

    /// `OK` / `FAIL` once the job has finished, if the device reports it
    pub result: Option<String>,

    /// Free-text details attached to the job
    pub details: Option<String>,
}

impl JobStatus {
    /// True when the device says the job finished but did not succeed
    pub fn is_failed(&self) -> bool {
        self.state.is_finished()
            && self
                .result
                .as_deref()
                .is_some_and(|r| r.eq_ignore_ascii_case("FAIL"))
    }
}

impl fmt::Display for JobStatus {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "{} {}%", self.state, self.progress)
    }
}
