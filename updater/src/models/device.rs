//! Managed device and its cached content versions

use std::time::Duration;

use secrecy::SecretString;

use crate::models::package::{PackageKind, VersionField};
use crate::models::version::Version;

/// Content versions last reported by a device
#[derive(Debug, Clone, Default, PartialEq, Eq)]
pub struct InstalledVersions {
    pub app: Version,
    pub threat: Version,
    pub antivirus: Version,
    pub wildfire: Version,
}

impl InstalledVersions {
    pub fn get(&self, field: VersionField) -> &Version {
        match field {
            VersionField::App => &self.app,
            VersionField::Threat => &self.threat,
            VersionField::Antivirus => &self.antivirus,
            VersionField::Wildfire => &self.wildfire,
        }
    }
}

/// A firewall or management node receiving updates
#[derive(Debug, Clone)]
pub struct Device {
    /// Hostname or address used to reach the XML API
    pub hostname: String,

    /// Display name used in logs and reports
    pub name: String,

    /// API key
    pub api_key: SecretString,

    /// Per-request timeout
    pub timeout: Duration,

    /// Verify the device's TLS certificate
    pub verify_tls: bool,

    /// Kind of package pushed in this run
    pub package: PackageKind,

    installed: Option<InstalledVersions>,
}

impl Device {
    /// Create a new device handle with an empty version cache
    pub fn new(
        hostname: impl Into<String>,
        name: impl Into<String>,
        api_key: SecretString,
        timeout: Duration,
        package: PackageKind,
    ) -> Self {
        Self {
            hostname: hostname.into(),
            name: name.into(),
            api_key,
            timeout,
            verify_tls: true,
            package,
            installed: None,
        }
    }

    /// Accept self-signed device certificates when `verify` is false
    pub fn with_tls_verification(mut self, verify: bool) -> Self {
        self.verify_tls = verify;
        self
    }

    /// Versions from the last successful version check
    pub fn installed(&self) -> Option<&InstalledVersions> {
        self.installed.as_ref()
    }

    /// Installed version of the content this device's package replaces
    ///
    /// `None` until a version check has succeeded.
    pub fn current_version(&self) -> Option<&Version> {
        self.installed
            .as_ref()
            .map(|v| v.get(self.package.version_field()))
    }

    pub(crate) fn set_installed(&mut self, versions: InstalledVersions) {
        self.installed = Some(versions);
    }
}
