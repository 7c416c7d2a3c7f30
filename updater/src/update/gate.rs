//! Upload decision based on installed and candidate versions

use crate::errors::FileNameError;
use crate::models::version::{UpdateFile, Version};

/// Decide whether `install_file` should be pushed over `current`
///
/// Nothing installed (major `"0"`) always uploads. Otherwise the concatenated
/// major/minor strings are compared lexicographically and an equal or newer
/// installed version skips the upload. The file name is validated first in
/// every case.
pub fn should_upload(install_file: &str, current: &Version) -> Result<bool, FileNameError> {
    let candidate = UpdateFile::parse(install_file)?;
    Ok(is_newer(candidate.version(), current))
}

/// Same decision for an already parsed file
pub fn is_newer(candidate: &Version, current: &Version) -> bool {
    if current.is_absent() {
        return true;
    }
    // Known defect: string ordering, so "9" sorts after "10".
    current.ordering_key() < candidate.ordering_key()
}
