//! Install job driver
//!
//! Sends the install request, then polls the resulting job until it finishes.
//! Some installs enqueue a second job when the first one finishes (content
//! activation after a signature install); that job is polled against the same
//! deadline. There is never a third job.

use std::time::Duration;

use serde::Serialize;
use tokio::time::{sleep, Instant};
use tokio_util::sync::CancellationToken;
use tracing::{debug, info, info_span, warn, Instrument};

use crate::errors::InstallError;
use crate::models::device::Device;
use crate::models::version::UpdateFile;
use crate::parse::response::{ensure_success, find_job_id, find_job_status, find_next_job_id};
use crate::xapi::client::DeviceApi;
use crate::xapi::command::{install_request, show_job};

/// Install driver settings
#[derive(Debug, Clone)]
pub struct InstallOptions {
    /// Wait for the install job (and any chained job) to finish
    pub wait: bool,

    /// Delay before each job status query
    pub poll_interval: Duration,

    /// Overall deadline, measured from the install request
    pub wait_timeout: Duration,
}

impl Default for InstallOptions {
    fn default() -> Self {
        Self {
            wait: false,
            poll_interval: Duration::from_secs(5),
            wait_timeout: Duration::from_secs(600),
        }
    }
}

/// Install state
#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
#[serde(rename_all = "snake_case")]
pub enum InstallState {
    /// Nothing sent yet
    Idle,

    /// Install request accepted by the device
    Requested,

    /// Waiting for the install job
    PollingPrimary,

    /// Waiting for the job chained after the install job
    PollingSecondary,

    /// Request accepted, completion not awaited
    Started,

    /// All jobs finished
    Succeeded,

    /// Request, polling or the job failed
    Failed,

    /// Deadline passed while polling
    TimedOut,

    /// Polling aborted by the operator
    Cancelled,
}

impl InstallState {
    pub fn is_terminal(&self) -> bool {
        matches!(
            self,
            InstallState::Started
                | InstallState::Succeeded
                | InstallState::Failed
                | InstallState::TimedOut
                | InstallState::Cancelled
        )
    }
}

/// Install event
#[derive(Debug, Clone)]
pub enum InstallEvent {
    /// Device accepted the install request
    Request,

    /// Caller does not wait for completion
    Detach,

    /// Start polling the install job
    Track,

    /// Install job finished and enqueued a follow-up job
    Chain,

    /// Job being polled finished with nothing left to wait for
    Finish,

    /// Request, transport, parse or job failure
    Fail(String),

    /// Deadline passed
    Timeout,

    /// Operator cancelled
    Cancel,
}

/// Install FSM
#[derive(Debug, Clone)]
pub struct InstallFsm {
    state: InstallState,
    error: Option<String>,
}

impl InstallFsm {
    /// Create a new FSM in idle state
    pub fn new() -> Self {
        Self {
            state: InstallState::Idle,
            error: None,
        }
    }

    /// Get current state
    pub fn state(&self) -> &InstallState {
        &self.state
    }

    /// Get error message if any
    pub fn error(&self) -> Option<&str> {
        self.error.as_deref()
    }

    /// Process an event and transition state
    pub fn process(&mut self, event: InstallEvent) -> Result<(), String> {
        let polling = matches!(
            self.state,
            InstallState::PollingPrimary | InstallState::PollingSecondary
        );

        let new_state = match (&self.state, &event) {
            (InstallState::Idle, InstallEvent::Request) => InstallState::Requested,

            (InstallState::Requested, InstallEvent::Detach) => InstallState::Started,
            (InstallState::Requested, InstallEvent::Track) => InstallState::PollingPrimary,

            (InstallState::PollingPrimary, InstallEvent::Chain) => InstallState::PollingSecondary,
            (_, InstallEvent::Finish) if polling => InstallState::Succeeded,
            (_, InstallEvent::Timeout) if polling => InstallState::TimedOut,
            (_, InstallEvent::Cancel) if polling => InstallState::Cancelled,

            (state, InstallEvent::Fail(err)) if !state.is_terminal() => {
                self.error = Some(err.clone());
                InstallState::Failed
            }

            // Invalid transitions
            (state, event) => {
                return Err(format!("Invalid transition: {:?} -> {:?}", state, event));
            }
        };

        self.state = new_state;
        Ok(())
    }
}

impl Default for InstallFsm {
    fn default() -> Self {
        Self::new()
    }
}

/// Drives one install on one device
pub struct InstallDriver<'a, A: ?Sized> {
    api: &'a A,
    device: &'a Device,
    options: &'a InstallOptions,
    cancel: CancellationToken,
    fsm: InstallFsm,
    jobs: Vec<String>,
    status_queries: u32,
}

impl<'a, A> InstallDriver<'a, A>
where
    A: DeviceApi + ?Sized,
{
    pub fn new(
        api: &'a A,
        device: &'a Device,
        options: &'a InstallOptions,
        cancel: CancellationToken,
    ) -> Self {
        Self {
            api,
            device,
            options,
            cancel,
            fsm: InstallFsm::new(),
            jobs: Vec::new(),
            status_queries: 0,
        }
    }

    /// Get current state
    pub fn state(&self) -> &InstallState {
        self.fsm.state()
    }

    /// Ids of the jobs polled so far, primary first
    pub fn jobs(&self) -> &[String] {
        &self.jobs
    }

    /// Number of `show jobs` queries sent
    pub fn status_queries(&self) -> u32 {
        self.status_queries
    }

    /// Request the install and, if configured, wait for it to finish
    ///
    /// Returns the terminal state on success: `Started` when not waiting,
    /// `Succeeded` otherwise.
    pub async fn run(&mut self, file: &UpdateFile) -> Result<InstallState, InstallError> {
        let requested_at = Instant::now();
        let deadline = requested_at + self.options.wait_timeout;

        info!("Starting install of {} on {}", file, self.device.name);
        let request = install_request(self.device.package.category(), file.name());
        let raw = match self.api.op(&request).await {
            Ok(raw) => raw,
            Err(e) => {
                let err = self.request_error(file, e.to_string());
                return Err(self.fail(err));
            }
        };
        if let Err(e) = ensure_success(&raw) {
            let err = self.request_error(file, e.to_string());
            return Err(self.fail(err));
        }
        self.transition(InstallEvent::Request)?;

        if !self.options.wait {
            self.transition(InstallEvent::Detach)?;
            info!("Install of {} started on {}, not waiting", file, self.device.name);
            return Ok(self.state().clone());
        }

        let job_id = match find_job_id(&raw) {
            Ok(id) => id,
            Err(e) => {
                let err = self.request_error(file, e.to_string());
                return Err(self.fail(err));
            }
        };
        self.transition(InstallEvent::Track)?;
        info!(
            "Waiting for install job {} on {} (max {}s)",
            job_id,
            self.device.name,
            self.options.wait_timeout.as_secs()
        );

        let finished = self
            .poll_until_finished(&job_id, requested_at, deadline)
            .instrument(info_span!("job", job_id = %job_id))
            .await?;

        let next_job = match find_next_job_id(&finished) {
            Ok(next) => next,
            Err(e) => {
                let err = self.poll_error(&job_id, e.to_string(), Some(finished));
                return Err(self.fail(err));
            }
        };

        if let Some(next_id) = next_job {
            self.transition(InstallEvent::Chain)?;
            info!(
                "Job {} on {} enqueued job {}, waiting for it",
                job_id, self.device.name, next_id
            );
            self.poll_until_finished(&next_id, requested_at, deadline)
                .instrument(info_span!("job", job_id = %next_id))
                .await?;
        }

        self.transition(InstallEvent::Finish)?;
        info!("Install of {} completed on {}", file, self.device.name);
        Ok(self.state().clone())
    }

    /// Poll one job until it finishes; returns the final raw response
    async fn poll_until_finished(
        &mut self,
        job_id: &str,
        requested_at: Instant,
        deadline: Instant,
    ) -> Result<String, InstallError> {
        self.jobs.push(job_id.to_string());
        let command = show_job(job_id);
        let mut last_state = "not polled yet".to_string();

        loop {
            if Instant::now() > deadline {
                let err = InstallError::TimedOut {
                    device: self.device.name.clone(),
                    job_id: job_id.to_string(),
                    waited_secs: requested_at.elapsed().as_secs(),
                    last_state,
                };
                return Err(self.fail(err));
            }

            let cancelled = tokio::select! {
                biased;
                _ = self.cancel.cancelled() => true,
                _ = sleep(self.options.poll_interval) => false,
            };
            if cancelled {
                let err = InstallError::Cancelled {
                    device: self.device.name.clone(),
                    job_id: job_id.to_string(),
                };
                return Err(self.fail(err));
            }

            self.status_queries += 1;
            let raw = match self.api.op_cli(&command).await {
                Ok(raw) => raw,
                Err(e) => {
                    let err = self.poll_error(job_id, e.to_string(), None);
                    return Err(self.fail(err));
                }
            };

            let status = match find_job_status(&raw) {
                Ok(status) => status,
                Err(e) => {
                    let err = self.poll_error(job_id, e.to_string(), Some(raw));
                    return Err(self.fail(err));
                }
            };

            debug!(
                "Job {} on {}: {} ({} queries so far)",
                job_id, self.device.name, status, self.status_queries
            );
            last_state = status.to_string();

            if status.is_failed() {
                let err = InstallError::JobFailed {
                    device: self.device.name.clone(),
                    job_id: job_id.to_string(),
                    result: status.result.clone().unwrap_or_default(),
                    details: status.details.clone().unwrap_or_default(),
                };
                return Err(self.fail(err));
            }

            if status.state.is_finished() {
                info!("Job {} completed on {}", job_id, self.device.name);
                return Ok(raw);
            }
        }
    }

    fn transition(&mut self, event: InstallEvent) -> Result<(), InstallError> {
        self.fsm
            .process(event)
            .map_err(|reason| InstallError::State {
                device: self.device.name.clone(),
                reason,
            })
    }

    /// Record the failure in the FSM and hand the error back
    fn fail(&mut self, err: InstallError) -> InstallError {
        let event = match &err {
            InstallError::TimedOut { .. } => InstallEvent::Timeout,
            InstallError::Cancelled { .. } => InstallEvent::Cancel,
            other => InstallEvent::Fail(other.to_string()),
        };
        if let Err(e) = self.fsm.process(event) {
            warn!("{}", e);
        }
        if let Some(reason) = self.fsm.error() {
            debug!("Install on {} marked failed: {}", self.device.name, reason);
        }
        err
    }

    fn request_error(&self, file: &UpdateFile, reason: String) -> InstallError {
        InstallError::Request {
            device: self.device.name.clone(),
            file: file.name().to_string(),
            reason,
        }
    }

    fn poll_error(&self, job_id: &str, reason: String, raw: Option<String>) -> InstallError {
        InstallError::Poll {
            device: self.device.name.clone(),
            job_id: job_id.to_string(),
            command: show_job(job_id),
            reason,
            raw,
        }
    }
}

/// Request the install of `file` on `device`, waiting if `options.wait` is set
pub async fn install<A>(
    api: &A,
    device: &Device,
    file: &UpdateFile,
    options: &InstallOptions,
    cancel: CancellationToken,
) -> Result<InstallState, InstallError>
where
    A: DeviceApi + ?Sized,
{
    InstallDriver::new(api, device, options, cancel).run(file).await
}
