//! Per-device update pipeline and the multi-device run
//!
//! version check -> gate -> upload -> install. Every failure ends as an
//! [`OrchestrationOutcome`]; one device never stops the others.

use std::path::Path;

use futures::stream::{self, StreamExt};
use serde::Serialize;
use tokio_util::sync::CancellationToken;
use tracing::{error, info, info_span, warn, Instrument};

use crate::errors::{FileNameError, InstallError, TransportError};
use crate::models::device::Device;
use crate::models::outcome::OrchestrationOutcome;
use crate::models::version::UpdateFile;
use crate::update::gate::is_newer;
use crate::update::install::{install, InstallOptions, InstallState};
use crate::update::refresh::refresh;
use crate::update::upload::upload;
use crate::xapi::client::DeviceApi;

/// Run-wide settings
#[derive(Debug, Clone)]
pub struct OrchestratorOptions {
    /// Install driver settings
    pub install: InstallOptions,

    /// Devices processed at the same time, 1 for strictly sequential
    pub max_concurrent_devices: usize,
}

impl Default for OrchestratorOptions {
    fn default() -> Self {
        Self {
            install: InstallOptions::default(),
            max_concurrent_devices: 1,
        }
    }
}

/// Outcome of one device, with what the report needs to describe it
#[derive(Debug, Clone, Serialize)]
pub struct DeviceReport {
    pub device: String,
    pub hostname: String,
    pub file: String,
    pub outcome: OrchestrationOutcome,
}

/// Run the whole pipeline for one device
pub async fn process_device<A>(
    api: &A,
    device: &mut Device,
    file: &UpdateFile,
    path: &Path,
    options: &InstallOptions,
    cancel: CancellationToken,
) -> OrchestrationOutcome
where
    A: DeviceApi + ?Sized,
{
    if cancel.is_cancelled() {
        return OrchestrationOutcome::NotStarted(
            "run cancelled before the device was processed".to_string(),
        );
    }

    if let Err(e) = refresh(api, device).await {
        error!("Unable to check current content versions on {}: {}", device.name, e);
        return OrchestrationOutcome::VersionCheckFailed(e.to_string());
    }

    let current = device.current_version().cloned().unwrap_or_default();
    if !is_newer(file.version(), &current) {
        info!(
            "Installed {} version {} on {} is the same or newer than {}, skipping",
            device.package,
            current,
            device.name,
            file.version()
        );
        return OrchestrationOutcome::Skipped {
            current,
            candidate: file.version().clone(),
        };
    }

    if let Err(e) = upload(api, device, file, path).await {
        error!("Error while uploading {} to {}: {}", file, device.hostname, e);
        return OrchestrationOutcome::UploadFailed(e.to_string());
    }

    match install(api, device, file, options, cancel).await {
        Ok(InstallState::Started) => OrchestrationOutcome::InstallStarted,
        Ok(_) => OrchestrationOutcome::InstallSucceeded,
        Err(e @ InstallError::TimedOut { .. }) => {
            error!("{}", e);
            OrchestrationOutcome::InstallTimedOut(e.to_string())
        }
        Err(e @ InstallError::Cancelled { .. }) => {
            warn!("{}", e);
            OrchestrationOutcome::Cancelled(e.to_string())
        }
        Err(e) => {
            error!("{}", e);
            OrchestrationOutcome::InstallFailed(e.to_string())
        }
    }
}

/// Push `file_name` from `package_dir` to every device, in order
///
/// The file name is validated before any device is contacted. `connect`
/// builds the API client for each device.
pub async fn run_all<A, F>(
    devices: Vec<Device>,
    file_name: &str,
    package_dir: &Path,
    options: &OrchestratorOptions,
    connect: F,
    cancel: CancellationToken,
) -> Result<Vec<DeviceReport>, FileNameError>
where
    A: DeviceApi,
    F: Fn(&Device) -> Result<A, TransportError>,
{
    let file = UpdateFile::parse(file_name)?;
    let path = package_dir.join(file.name());
    let file = &file;
    let path = path.as_path();
    let connect = &connect;

    info!(
        "Pushing {} to {} device(s), {} at a time",
        file,
        devices.len(),
        options.max_concurrent_devices.max(1)
    );

    let reports = stream::iter(devices)
        .map(|mut device| {
            let cancel = cancel.clone();
            let span = info_span!("device", name = %device.name, host = %device.hostname);
            async move {
                let outcome = match connect(&device) {
                    Ok(api) => {
                        process_device(&api, &mut device, file, path, &options.install, cancel)
                            .await
                    }
                    Err(e) => {
                        error!("Unable to create API client for {}: {}", device.name, e);
                        OrchestrationOutcome::VersionCheckFailed(e.to_string())
                    }
                };

                DeviceReport {
                    device: device.name,
                    hostname: device.hostname,
                    file: file.name().to_string(),
                    outcome,
                }
            }
            .instrument(span)
        })
        .buffered(options.max_concurrent_devices.max(1))
        .collect::<Vec<_>>()
        .await;

    Ok(reports)
}
