//! Installed version check

use tracing::{debug, info};

use crate::errors::UploadError;
use crate::models::device::Device;
use crate::parse::response::find_content_versions;
use crate::xapi::client::DeviceApi;
use crate::xapi::command::show_system_info;

/// Query `show system info` and update the device's version cache
///
/// The cache is left untouched when the query or the parse fails.
pub async fn refresh<A>(api: &A, device: &mut Device) -> Result<(), UploadError>
where
    A: DeviceApi + ?Sized,
{
    debug!("Checking installed content versions on {}", device.name);

    let raw = api
        .op_cli(show_system_info())
        .await
        .map_err(|source| UploadError::Transport {
            device: device.name.clone(),
            source,
        })?;

    let versions = find_content_versions(&raw).map_err(|source| UploadError::Parse {
        device: device.name.clone(),
        source,
    })?;

    info!(
        "{} runs app {} threat {} antivirus {} wildfire {}",
        device.name, versions.app, versions.threat, versions.antivirus, versions.wildfire
    );
    device.set_installed(versions);
    Ok(())
}
