//! Package kinds and their wire-level categories

use std::fmt;

use clap::ValueEnum;
use serde::{Deserialize, Serialize};

/// Kind of dynamic update content
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize, ValueEnum)]
#[serde(rename_all = "lowercase")]
pub enum PackageKind {
    /// Application signatures only
    #[value(name = "app")]
    App,

    /// Application and threat signatures
    #[value(name = "appthreat")]
    AppThreat,

    /// Antivirus signatures
    #[value(name = "antivirus")]
    Antivirus,

    /// WildFire signatures (panupv2 packages)
    #[value(name = "wildfire2")]
    #[serde(rename = "wildfire2")]
    Wildfire,

    /// WildFire signatures (legacy panup packages)
    #[value(name = "wildfire")]
    #[serde(rename = "wildfire")]
    WildfireLegacy,

    /// WF-500 appliance content
    #[value(name = "wf500")]
    #[serde(rename = "wf500")]
    WildfireMetadata500,
}

/// Which installed-version field a package kind is compared against
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum VersionField {
    App,
    Threat,
    Antivirus,
    Wildfire,
}

impl PackageKind {
    pub const ALL: [PackageKind; 6] = [
        PackageKind::App,
        PackageKind::AppThreat,
        PackageKind::Antivirus,
        PackageKind::Wildfire,
        PackageKind::WildfireLegacy,
        PackageKind::WildfireMetadata500,
    ];

    /// Category used by the import endpoint and the install request
    pub fn category(&self) -> &'static str {
        match self {
            PackageKind::App | PackageKind::AppThreat => "content",
            PackageKind::Antivirus => "anti-virus",
            PackageKind::Wildfire | PackageKind::WildfireLegacy => "wildfire",
            PackageKind::WildfireMetadata500 => "wf-content",
        }
    }

    /// Installed version this kind of package replaces
    pub fn version_field(&self) -> VersionField {
        match self {
            PackageKind::App | PackageKind::AppThreat => VersionField::App,
            PackageKind::Antivirus => VersionField::Antivirus,
            PackageKind::Wildfire
            | PackageKind::WildfireLegacy
            | PackageKind::WildfireMetadata500 => VersionField::Wildfire,
        }
    }

    /// Local directory holding downloaded packages of this kind
    pub fn directory(&self) -> &'static str {
        match self {
            PackageKind::App => "panupv2-all-apps",
            PackageKind::AppThreat => "panupv2-all-contents",
            PackageKind::Antivirus => "panup-all-antivirus",
            PackageKind::Wildfire => "panupv2-all-wildfire",
            PackageKind::WildfireLegacy => "panup-all-wildfire",
            PackageKind::WildfireMetadata500 => "panup-all-wfmeta",
        }
    }

    /// Name used on the command line and in settings
    pub fn name(&self) -> &'static str {
        match self {
            PackageKind::App => "app",
            PackageKind::AppThreat => "appthreat",
            PackageKind::Antivirus => "antivirus",
            PackageKind::Wildfire => "wildfire2",
            PackageKind::WildfireLegacy => "wildfire",
            PackageKind::WildfireMetadata500 => "wf500",
        }
    }
}

impl fmt::Display for PackageKind {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.name())
    }
}
