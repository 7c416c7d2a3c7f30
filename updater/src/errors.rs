//! Error types for the update pusher

use thiserror::Error;

/// A device response did not have the expected shape
#[derive(Error, Debug, Clone, PartialEq, Eq)]
pub enum ParseError {
    #[error("Malformed XML: {0}")]
    MalformedXml(String),

    #[error("Missing element <{0}> in device response")]
    MissingElement(&'static str),

    #[error("Invalid value for <{element}>: {value:?}")]
    InvalidValue { element: &'static str, value: String },

    #[error("Device returned an error: {0}")]
    DeviceError(String),
}

/// An update file name does not follow the `a-b-c-<major>-<minor>` convention
#[derive(Error, Debug, Clone, PartialEq, Eq)]
#[error("Malformed update file name {name:?}: expected at least 5 dash-separated components, found {found}")]
pub struct FileNameError {
    pub name: String,
    pub found: usize,
}

/// Failure talking to a device over HTTPS
#[derive(Error, Debug)]
pub enum TransportError {
    #[error("HTTP error: {0}")]
    Http(#[from] reqwest::Error),

    #[error("Unexpected HTTP status {status}: {body}")]
    Status { status: u16, body: String },

    #[error("Invalid device URL: {0}")]
    Url(#[from] url::ParseError),

    #[error("{0}")]
    Other(String),
}

/// Failure during upload or version refresh
#[derive(Error, Debug)]
pub enum UploadError {
    #[error("Transport failure on {device}: {source}")]
    Transport {
        device: String,
        #[source]
        source: TransportError,
    },

    #[error("Unexpected response from {device}: {source}")]
    Parse {
        device: String,
        #[source]
        source: ParseError,
    },

    #[error("Unable to read package file {path}: {source}")]
    Io {
        path: String,
        #[source]
        source: std::io::Error,
    },
}

/// Failure while starting or waiting for an install job
#[derive(Error, Debug)]
pub enum InstallError {
    #[error("Install request for {file} failed on {device}: {reason}")]
    Request {
        device: String,
        file: String,
        reason: String,
    },

    #[error("Polling job {job_id} on {device} failed ({command}): {reason}{}", raw_suffix(.raw))]
    Poll {
        device: String,
        job_id: String,
        command: String,
        reason: String,
        raw: Option<String>,
    },

    #[error("Job {job_id} on {device} finished with result {result}: {details}")]
    JobFailed {
        device: String,
        job_id: String,
        result: String,
        details: String,
    },

    #[error("Timed out after {waited_secs}s waiting for job {job_id} on {device} (last state: {last_state})")]
    TimedOut {
        device: String,
        job_id: String,
        waited_secs: u64,
        last_state: String,
    },

    #[error("Waiting for job {job_id} on {device} was cancelled")]
    Cancelled { device: String, job_id: String },

    #[error("Install state error on {device}: {reason}")]
    State { device: String, reason: String },
}

fn raw_suffix(raw: &Option<String>) -> String {
    match raw {
        Some(raw) => format!(" [response: {}]", raw.trim()),
        None => String::new(),
    }
}

/// Top level error for the binary and collaborators
#[derive(Error, Debug)]
pub enum UpdaterError {
    #[error("IO error: {0}")]
    IoError(#[from] std::io::Error),

    #[error("JSON error: {0}")]
    JsonError(#[from] serde_json::Error),

    #[error("Transport error: {0}")]
    TransportError(#[from] TransportError),

    #[error("Configuration error: {0}")]
    ConfigError(String),

    #[error("Discovery error: {0}")]
    DiscoveryError(String),

    #[error("Email error: {0}")]
    EmailError(String),
}
