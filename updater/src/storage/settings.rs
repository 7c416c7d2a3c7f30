//! Settings file management

use std::path::PathBuf;
use std::time::Duration;

use secrecy::SecretString;
use serde::{Deserialize, Deserializer};

use crate::errors::UpdaterError;
use crate::filesys::file::File;
use crate::logs::LogLevel;
use crate::models::device::Device;
use crate::models::package::PackageKind;
use crate::update::install::InstallOptions;
use crate::update::orchestrator::OrchestratorOptions;

/// Tool settings
#[derive(Debug, Clone, Deserialize)]
pub struct Settings {
    /// XML API key shared by all devices
    #[serde(deserialize_with = "deserialize_secret")]
    pub api_key: SecretString,

    /// Log level
    #[serde(default)]
    pub log_level: LogLevel,

    /// Also write logs to this file
    #[serde(default)]
    pub log_file: Option<PathBuf>,

    /// Per-request timeout in seconds
    #[serde(default = "default_request_timeout")]
    pub request_timeout_secs: u64,

    /// Maximum time to wait for install jobs, in seconds
    #[serde(default = "default_wait_timeout")]
    pub wait_timeout_secs: u64,

    /// Delay between job status queries, in seconds
    #[serde(default = "default_poll_interval")]
    pub poll_interval_secs: u64,

    /// Verify device TLS certificates. Set to false only for devices with
    /// self-signed certificates.
    #[serde(default = "default_true")]
    pub verify_tls: bool,

    /// Devices updated at the same time
    #[serde(default = "default_concurrency")]
    pub max_concurrent_devices: usize,

    /// Directory holding the per-kind package directories
    #[serde(default = "default_packages_dir")]
    pub packages_dir: PathBuf,

    /// Devices to update, in order
    #[serde(default)]
    pub devices: Vec<DeviceSettings>,

    /// Report delivery
    #[serde(default)]
    pub email: Option<EmailSettings>,
}

fn default_true() -> bool {
    true
}

fn default_request_timeout() -> u64 {
    300
}

fn default_wait_timeout() -> u64 {
    600
}

fn default_poll_interval() -> u64 {
    5
}

fn default_concurrency() -> usize {
    1
}

fn default_packages_dir() -> PathBuf {
    PathBuf::from(".")
}

fn deserialize_secret<'de, D>(deserializer: D) -> Result<SecretString, D::Error>
where
    D: Deserializer<'de>,
{
    String::deserialize(deserializer).map(SecretString::from)
}

fn deserialize_optional_secret<'de, D>(deserializer: D) -> Result<Option<SecretString>, D::Error>
where
    D: Deserializer<'de>,
{
    Ok(Option::<String>::deserialize(deserializer)?.map(SecretString::from))
}

/// One managed device
#[derive(Debug, Clone, Deserialize)]
pub struct DeviceSettings {
    /// Hostname or IP address
    pub hostname: String,

    /// Display name, defaults to the hostname
    #[serde(default)]
    pub name: Option<String>,

    /// Overrides the global `verify_tls`
    #[serde(default)]
    pub verify_tls: Option<bool>,
}

/// SMTP settings for the run report
#[derive(Debug, Clone, Deserialize)]
pub struct EmailSettings {
    pub smtp_host: String,

    #[serde(default = "default_smtp_port")]
    pub smtp_port: u16,

    pub sender: String,

    pub receivers: Vec<String>,

    #[serde(default)]
    pub username: Option<String>,

    #[serde(default, deserialize_with = "deserialize_optional_secret")]
    pub password: Option<SecretString>,
}

fn default_smtp_port() -> u16 {
    587
}

impl Settings {
    /// Read and validate the settings file
    pub async fn load(file: &File) -> Result<Self, UpdaterError> {
        if !file.exists().await {
            return Err(UpdaterError::ConfigError(format!(
                "Settings file {} not found",
                file.path().display()
            )));
        }
        let settings: Settings = file.read_json().await?;
        settings.validate()?;
        Ok(settings)
    }

    /// Check the values serde cannot
    pub fn validate(&self) -> Result<(), UpdaterError> {
        use secrecy::ExposeSecret;

        if self.api_key.expose_secret().trim().is_empty() {
            return Err(UpdaterError::ConfigError("No API key configured".to_string()));
        }
        if self.devices.is_empty() {
            return Err(UpdaterError::ConfigError("No devices configured".to_string()));
        }
        if let Some(device) = self.devices.iter().find(|d| d.hostname.trim().is_empty()) {
            return Err(UpdaterError::ConfigError(format!(
                "Device {:?} has an empty hostname",
                device.name
            )));
        }
        if self.poll_interval_secs == 0 {
            return Err(UpdaterError::ConfigError(
                "poll_interval_secs must be at least 1".to_string(),
            ));
        }
        if let Some(email) = &self.email {
            if email.receivers.is_empty() {
                return Err(UpdaterError::ConfigError(
                    "Email settings have no receivers".to_string(),
                ));
            }
        }
        Ok(())
    }

    /// Device handles for a run pushing `package`
    pub fn devices(&self, package: PackageKind) -> Vec<Device> {
        self.devices
            .iter()
            .map(|d| {
                Device::new(
                    d.hostname.clone(),
                    d.name.clone().unwrap_or_else(|| d.hostname.clone()),
                    self.api_key.clone(),
                    Duration::from_secs(self.request_timeout_secs),
                    package,
                )
                .with_tls_verification(d.verify_tls.unwrap_or(self.verify_tls))
            })
            .collect()
    }

    /// Orchestrator options; `wait` comes from the command line
    pub fn orchestrator_options(&self, wait: bool) -> OrchestratorOptions {
        OrchestratorOptions {
            install: InstallOptions {
                wait,
                poll_interval: Duration::from_secs(self.poll_interval_secs),
                wait_timeout: Duration::from_secs(self.wait_timeout_secs),
            },
            max_concurrent_devices: self.max_concurrent_devices.max(1),
        }
    }
}
