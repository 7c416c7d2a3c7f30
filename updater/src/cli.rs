//! Command line arguments

use std::path::PathBuf;

use clap::Parser;

use crate::logs::LogLevel;
use crate::models::package::PackageKind;

#[derive(Parser, Debug)]
#[command(
    name = "dynupd",
    about = "Upload and install dynamic updates on Palo Alto Networks devices",
    disable_version_flag = true
)]
pub struct Cli {
    /// Content type to install
    #[arg(short = 't', long = "type", value_enum, required_unless_present = "version")]
    pub package: Option<PackageKind>,

    /// Wait for install jobs to complete and report their status
    #[arg(short = 'w', long)]
    pub wait: bool,

    /// Email the status report to the configured receivers
    #[arg(short = 'e', long)]
    pub email: bool,

    /// Print status lines to the terminal
    #[arg(short = 'v', long)]
    pub verbose: bool,

    /// Log level (trace, debug, info, warning, error); overrides the settings file
    #[arg(short = 'l', long)]
    pub loglevel: Option<LogLevel>,

    /// Settings file
    #[arg(short = 'c', long, default_value = "settings.json")]
    pub config: PathBuf,

    /// Package file name to push instead of the newest one found on disk
    #[arg(short = 'f', long)]
    pub file: Option<String>,

    /// Log in JSON format
    #[arg(long)]
    pub json_logs: bool,

    /// Print version information and exit
    #[arg(long)]
    pub version: bool,
}
