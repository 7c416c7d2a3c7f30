//! Content versions and update file names

use std::fmt;

use serde::{Deserialize, Serialize};

use crate::errors::FileNameError;

/// Installed or candidate content version, e.g. `8367-6135`
///
/// Both components are kept as the strings the device reports. A major of
/// `"0"` means nothing of that kind is installed.
#[derive(Debug, Clone, PartialEq, Eq, Hash, Serialize, Deserialize)]
pub struct Version {
    pub major: String,
    pub minor: String,
}

impl Version {
    pub fn new(major: impl Into<String>, minor: impl Into<String>) -> Self {
        Self {
            major: major.into(),
            minor: minor.into(),
        }
    }

    /// Sentinel for "nothing installed"
    pub fn absent() -> Self {
        Self::new("0", "")
    }

    /// Parse a device version string (`"8367-6135"`, `"0"`)
    pub fn parse(raw: &str) -> Self {
        let raw = raw.trim();
        if raw.is_empty() {
            return Self::absent();
        }
        let mut parts = raw.split('-');
        let major = parts.next().unwrap_or("0").to_string();
        let minor = parts.next().unwrap_or("").to_string();
        Self { major, minor }
    }

    pub fn is_absent(&self) -> bool {
        self.major == "0"
    }

    /// Major and minor concatenated, the key used for ordering
    ///
    /// Known defect: ordering is lexicographic on this string, so `9-0`
    /// sorts after `10-0`. Kept until the comparison rule is confirmed.
    pub fn ordering_key(&self) -> String {
        format!("{}{}", self.major, self.minor)
    }
}

impl Default for Version {
    fn default() -> Self {
        Self::absent()
    }
}

impl fmt::Display for Version {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        if self.minor.is_empty() {
            write!(f, "{}", self.major)
        } else {
            write!(f, "{}-{}", self.major, self.minor)
        }
    }
}

/// Name of a package file, e.g. `panupv2-all-contents-8367-6135`
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct UpdateFile {
    name: String,
    version: Version,
}

impl UpdateFile {
    const MAJOR_INDEX: usize = 3;
    const MINOR_INDEX: usize = 4;

    /// Validate a file name and extract the version it carries
    pub fn parse(name: &str) -> Result<Self, FileNameError> {
        let parts: Vec<&str> = name.split('-').collect();
        if parts.len() <= Self::MINOR_INDEX {
            return Err(FileNameError {
                name: name.to_string(),
                found: parts.len(),
            });
        }

        Ok(Self {
            name: name.to_string(),
            version: Version::new(parts[Self::MAJOR_INDEX], parts[Self::MINOR_INDEX]),
        })
    }

    pub fn name(&self) -> &str {
        &self.name
    }

    pub fn version(&self) -> &Version {
        &self.version
    }
}

impl fmt::Display for UpdateFile {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(&self.name)
    }
}
