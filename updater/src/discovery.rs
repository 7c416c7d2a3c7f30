//! Selection of the newest downloaded package

use std::path::Path;

use tracing::debug;

use crate::errors::UpdaterError;
use crate::filesys::dir::Dir;
use crate::models::package::PackageKind;

/// Name of the newest file in the kind's package directory under `base_dir`
///
/// Newest means latest creation time (modification time where creation time
/// is not available). Ties go to the lexicographically greatest name.
pub async fn find_newest_file(base_dir: &Path, kind: PackageKind) -> Result<String, UpdaterError> {
    let dir = Dir::new(base_dir).subdir(kind.directory());
    if !dir.exists().await {
        return Err(UpdaterError::DiscoveryError(format!(
            "Package directory {} does not exist",
            dir.path().display()
        )));
    }

    let newest = dir
        .list_files()
        .await?
        .into_iter()
        .max_by(|a, b| a.created.cmp(&b.created).then_with(|| a.path.cmp(&b.path)))
        .ok_or_else(|| {
            UpdaterError::DiscoveryError(format!(
                "No {} packages found in {}",
                kind,
                dir.path().display()
            ))
        })?;

    let name = newest
        .path
        .file_name()
        .and_then(|n| n.to_str())
        .map(str::to_string)
        .ok_or_else(|| {
            UpdaterError::DiscoveryError(format!("Unusable file name {}", newest.path.display()))
        })?;

    debug!("Newest {} package is {}", kind, name);
    Ok(name)
}
