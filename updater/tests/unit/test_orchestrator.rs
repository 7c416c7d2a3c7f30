//! Per-device pipeline and multi-device run

use std::path::PathBuf;
use std::sync::atomic::{AtomicUsize, Ordering};
use std::time::Duration;

use tokio_util::sync::CancellationToken;

use dynupd::errors::TransportError;
use dynupd::models::outcome::OrchestrationOutcome;
use dynupd::models::package::PackageKind;
use dynupd::models::version::{UpdateFile, Version};
use dynupd::update::install::InstallOptions;
use dynupd::report::status_lines;
use dynupd::update::orchestrator::{process_device, run_all, OrchestratorOptions};

use crate::mock::{device, job, ScriptedDevice, ERROR_ENVELOPE};

const PACKAGE: &str = "pkg-region-0-8367-6135";

/// Directory holding a small package named [`PACKAGE`]
async fn package_dir() -> PathBuf {
    let dir = std::env::temp_dir().join(format!("dynupd-orchestrator-{}", uuid::Uuid::new_v4()));
    tokio::fs::create_dir_all(&dir).await.unwrap();
    tokio::fs::write(dir.join(PACKAGE), b"package contents").await.unwrap();
    dir
}

fn options(wait: bool) -> InstallOptions {
    InstallOptions {
        wait,
        poll_interval: Duration::from_millis(10),
        wait_timeout: Duration::from_secs(30),
    }
}

#[tokio::test]
async fn test_newer_package_is_uploaded_and_installed() {
    let dir = package_dir().await;
    let api = ScriptedDevice::new("8366-9999").with_jobs(vec![
        job("812", "ACT", 20, "PEND", None),
        job("812", "FIN", 100, "OK", Some("813")),
        job("813", "ACT", 50, "PEND", None),
        job("813", "FIN", 100, "OK", None),
    ]);
    let mut device = device("10.0.0.1", PackageKind::App);
    let file = UpdateFile::parse(PACKAGE).unwrap();

    let outcome = process_device(
        &api,
        &mut device,
        &file,
        &dir.join(PACKAGE),
        &options(true),
        CancellationToken::new(),
    )
    .await;

    assert_eq!(outcome, OrchestrationOutcome::InstallSucceeded);
    assert_eq!(device.current_version(), Some(&Version::new("8366", "9999")));

    let calls = api.calls();
    assert_eq!(calls[0], "system");
    assert_eq!(calls[1], format!("import content {} 16", PACKAGE));
    assert!(calls[2].starts_with("install"));
    assert_eq!(api.count("job"), 4);
    assert!(calls[4].contains("<id>812</id>"));
    assert!(calls[5].contains("<id>813</id>"));

    tokio::fs::remove_dir_all(&dir).await.unwrap();
}

#[tokio::test]
async fn test_same_version_is_skipped() {
    let dir = package_dir().await;
    let api = ScriptedDevice::new("8367-6135");
    let mut device = device("10.0.0.1", PackageKind::AppThreat);
    let file = UpdateFile::parse(PACKAGE).unwrap();

    let outcome = process_device(
        &api,
        &mut device,
        &file,
        &dir.join(PACKAGE),
        &options(true),
        CancellationToken::new(),
    )
    .await;

    assert_eq!(
        outcome,
        OrchestrationOutcome::Skipped {
            current: Version::new("8367", "6135"),
            candidate: Version::new("8367", "6135"),
        }
    );
    assert_eq!(api.calls(), vec!["system".to_string()]);

    tokio::fs::remove_dir_all(&dir).await.unwrap();
}

#[tokio::test]
async fn test_missing_package_file_fails_upload() {
    let api = ScriptedDevice::new("0");
    let mut device = device("10.0.0.1", PackageKind::Antivirus);
    let file = UpdateFile::parse(PACKAGE).unwrap();
    let path = std::env::temp_dir().join(format!("dynupd-missing-{}", uuid::Uuid::new_v4()));

    let outcome = process_device(
        &api,
        &mut device,
        &file,
        &path,
        &options(false),
        CancellationToken::new(),
    )
    .await;

    assert!(matches!(outcome, OrchestrationOutcome::UploadFailed(_)));
    assert_eq!(api.count("import"), 0);
    assert_eq!(api.count("install"), 0);
}

#[tokio::test]
async fn test_failed_job_is_reported() {
    let dir = package_dir().await;
    let api = ScriptedDevice::new("0").with_jobs(vec![job("812", "FIN", 100, "FAIL", None)]);
    let mut device = device("10.0.0.1", PackageKind::AppThreat);
    let file = UpdateFile::parse(PACKAGE).unwrap();

    let outcome = process_device(
        &api,
        &mut device,
        &file,
        &dir.join(PACKAGE),
        &options(true),
        CancellationToken::new(),
    )
    .await;

    match outcome {
        OrchestrationOutcome::InstallFailed(reason) => assert!(reason.contains("812")),
        other => panic!("expected install failure, got {:?}", other),
    }

    tokio::fs::remove_dir_all(&dir).await.unwrap();
}

#[tokio::test]
async fn test_malformed_file_name_contacts_no_device() {
    let connects = AtomicUsize::new(0);
    let devices = vec![device("10.0.0.1", PackageKind::AppThreat)];

    let result = run_all(
        devices,
        "bad-name",
        &std::env::temp_dir(),
        &OrchestratorOptions::default(),
        |_| {
            connects.fetch_add(1, Ordering::SeqCst);
            Ok::<_, TransportError>(ScriptedDevice::new("0"))
        },
        CancellationToken::new(),
    )
    .await;

    assert!(result.is_err());
    assert_eq!(connects.load(Ordering::SeqCst), 0);
}

#[tokio::test]
async fn test_one_device_failure_does_not_stop_the_run() {
    let dir = package_dir().await;
    let devices = vec![
        device("10.0.0.1", PackageKind::AppThreat),
        device("10.0.0.2", PackageKind::AppThreat),
        device("10.0.0.3", PackageKind::AppThreat),
    ];

    let reports = run_all(
        devices,
        PACKAGE,
        &dir,
        &OrchestratorOptions {
            install: options(false),
            max_concurrent_devices: 2,
        },
        |device| match device.hostname.as_str() {
            "10.0.0.1" => Ok(ScriptedDevice::unreachable()),
            "10.0.0.3" => Err(TransportError::Other("no route".to_string())),
            _ => Ok(ScriptedDevice::new("8366-9999")),
        },
        CancellationToken::new(),
    )
    .await
    .unwrap();

    assert_eq!(reports.len(), 3);
    assert_eq!(reports[0].device, "fw-10.0.0.1");
    assert!(matches!(reports[0].outcome, OrchestrationOutcome::VersionCheckFailed(_)));
    assert_eq!(reports[1].device, "fw-10.0.0.2");
    assert_eq!(reports[1].outcome, OrchestrationOutcome::InstallStarted);
    assert_eq!(reports[1].file, PACKAGE);
    assert!(matches!(reports[2].outcome, OrchestrationOutcome::VersionCheckFailed(_)));

    tokio::fs::remove_dir_all(&dir).await.unwrap();
}

#[tokio::test]
async fn test_cancelled_run_skips_remaining_devices() {
    let cancel = CancellationToken::new();
    cancel.cancel();

    let reports = run_all(
        vec![device("10.0.0.1", PackageKind::App)],
        PACKAGE,
        &std::env::temp_dir(),
        &OrchestratorOptions::default(),
        |_| Ok::<_, TransportError>(ScriptedDevice::new("0")),
        cancel,
    )
    .await
    .unwrap();

    assert!(matches!(reports[0].outcome, OrchestrationOutcome::NotStarted(_)));

    let lines = status_lines(&reports);
    assert_eq!(lines.len(), 1);
    assert!(lines[0].starts_with("CANCELLED: Skipping 10.0.0.1"));
    assert!(lines.iter().all(|l| !l.contains("Upload of")));
}

#[tokio::test]
async fn test_import_transport_failure() {
    let dir = package_dir().await;
    let api = ScriptedDevice::new("0").with_import_response(None);
    let mut device = device("10.0.0.1", PackageKind::AppThreat);
    let file = UpdateFile::parse(PACKAGE).unwrap();

    let outcome = process_device(
        &api,
        &mut device,
        &file,
        &dir.join(PACKAGE),
        &options(true),
        CancellationToken::new(),
    )
    .await;

    match outcome {
        OrchestrationOutcome::UploadFailed(reason) => assert!(reason.contains("500")),
        other => panic!("expected upload failure, got {:?}", other),
    }
    assert_eq!(api.count("import"), 1);
    assert_eq!(api.count("install"), 0);

    tokio::fs::remove_dir_all(&dir).await.unwrap();
}

#[tokio::test]
async fn test_import_rejected_by_device() {
    let dir = package_dir().await;
    let api = ScriptedDevice::new("0").with_import_response(Some(ERROR_ENVELOPE));
    let mut device = device("10.0.0.1", PackageKind::Antivirus);
    let file = UpdateFile::parse(PACKAGE).unwrap();

    let outcome = process_device(
        &api,
        &mut device,
        &file,
        &dir.join(PACKAGE),
        &options(false),
        CancellationToken::new(),
    )
    .await;

    match outcome {
        OrchestrationOutcome::UploadFailed(reason) => assert!(reason.contains("Invalid file")),
        other => panic!("expected upload failure, got {:?}", other),
    }
    assert_eq!(api.count("install"), 0);

    tokio::fs::remove_dir_all(&dir).await.unwrap();
}

