//! Package upload to the device import endpoint

use std::path::Path;

use tracing::{debug, info};

use crate::errors::UploadError;
use crate::models::device::Device;
use crate::models::version::UpdateFile;
use crate::parse::response::ensure_success;
use crate::utils::sha256_hash;
use crate::xapi::client::DeviceApi;

/// Upload the package at `path` to the device
///
/// The version gate must have been consulted already; this does not compare
/// versions again.
pub async fn upload<A>(
    api: &A,
    device: &Device,
    file: &UpdateFile,
    path: &Path,
) -> Result<(), UploadError>
where
    A: DeviceApi + ?Sized,
{
    let contents = tokio::fs::read(path).await.map_err(|source| UploadError::Io {
        path: path.display().to_string(),
        source,
    })?;

    debug!(
        "Uploading {} ({} bytes, sha256 {}) to {}",
        file,
        contents.len(),
        sha256_hash(&contents),
        device.name
    );

    let raw = api
        .import(device.package.category(), file.name(), contents)
        .await
        .map_err(|source| UploadError::Transport {
            device: device.name.clone(),
            source,
        })?;

    ensure_success(&raw).map_err(|source| UploadError::Parse {
        device: device.name.clone(),
        source,
    })?;

    info!("{} uploaded to {} ({})", file, device.name, device.hostname);
    Ok(())
}
