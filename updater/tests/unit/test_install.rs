//! Install driver tests against a scripted device

use std::time::Duration;

use tokio_test::assert_ok;
use tokio_util::sync::CancellationToken;

use dynupd::errors::{InstallError, TransportError};
use dynupd::models::package::PackageKind;
use dynupd::models::version::UpdateFile;
use dynupd::update::install::{InstallDriver, InstallOptions, InstallState};

use crate::mock::{device, job, ScriptedDevice, ERROR_ENVELOPE};

fn waiting(poll_secs: u64, timeout_secs: u64) -> InstallOptions {
    InstallOptions {
        wait: true,
        poll_interval: Duration::from_secs(poll_secs),
        wait_timeout: Duration::from_secs(timeout_secs),
    }
}

fn package() -> UpdateFile {
    UpdateFile::parse("panupv2-all-contents-8367-6135").unwrap()
}

#[tokio::test(start_paused = true)]
async fn test_primary_then_secondary_job() {
    let api = ScriptedDevice::new("8366-9999").with_jobs(vec![
        job("812", "ACT", 10, "PEND", None),
        job("812", "ACT", 60, "PEND", None),
        job("812", "FIN", 100, "OK", Some("813")),
        job("813", "ACT", 40, "PEND", None),
        job("813", "FIN", 100, "OK", None),
    ]);
    let device = device("10.0.0.1", PackageKind::AppThreat);
    let options = waiting(5, 600);

    let mut driver = InstallDriver::new(&api, &device, &options, CancellationToken::new());
    let state = assert_ok!(driver.run(&package()).await);

    assert_eq!(state, InstallState::Succeeded);
    assert_eq!(driver.state(), &InstallState::Succeeded);
    assert_eq!(driver.jobs(), &["812".to_string(), "813".to_string()]);
    assert_eq!(driver.status_queries(), 5);

    let calls = api.calls();
    assert!(calls[0].starts_with("install"));
    assert!(calls[0].contains("<content>"));
    assert!(calls[3].contains("<id>812</id>"));
    assert!(calls[4].contains("<id>813</id>"));
    assert!(calls[5].contains("<id>813</id>"));
}

#[tokio::test(start_paused = true)]
async fn test_secondary_nextjob_is_not_followed() {
    let api = ScriptedDevice::new("0").with_jobs(vec![
        job("812", "FIN", 100, "OK", Some("813")),
        job("813", "FIN", 100, "OK", Some("814")),
    ]);
    let device = device("10.0.0.1", PackageKind::Antivirus);
    let options = waiting(5, 600);

    let mut driver = InstallDriver::new(&api, &device, &options, CancellationToken::new());
    assert_eq!(driver.run(&package()).await.unwrap(), InstallState::Succeeded);
    assert_eq!(driver.jobs().len(), 2);
    assert_eq!(api.count("job"), 2);
}

#[tokio::test(start_paused = true)]
async fn test_wait_timeout_bounds_polling() {
    // the job never finishes
    let api = ScriptedDevice::new("8366-9999");
    let device = device("10.0.0.1", PackageKind::AppThreat);
    let options = waiting(5, 8);

    let mut driver = InstallDriver::new(&api, &device, &options, CancellationToken::new());
    let err = driver.run(&package()).await.unwrap_err();

    match err {
        InstallError::TimedOut { job_id, last_state, .. } => {
            assert_eq!(job_id, "812");
            assert_eq!(last_state, "RUNNING 50%");
        }
        other => panic!("expected timeout, got {:?}", other),
    }
    assert_eq!(driver.state(), &InstallState::TimedOut);
    assert_eq!(driver.status_queries(), 2);
}

#[tokio::test(start_paused = true)]
async fn test_cancel_stops_polling() {
    let api = ScriptedDevice::new("8366-9999");
    let device = device("10.0.0.1", PackageKind::AppThreat);
    let options = waiting(5, 600);
    let cancel = CancellationToken::new();

    let trigger = cancel.clone();
    tokio::spawn(async move {
        tokio::time::sleep(Duration::from_secs(12)).await;
        trigger.cancel();
    });

    let mut driver = InstallDriver::new(&api, &device, &options, cancel);
    let err = driver.run(&package()).await.unwrap_err();

    assert!(matches!(err, InstallError::Cancelled { .. }));
    assert_eq!(driver.state(), &InstallState::Cancelled);
    assert_eq!(driver.status_queries(), 2);
}

#[tokio::test]
async fn test_no_wait_returns_after_request() {
    let api = ScriptedDevice::new("8366-9999");
    let device = device("10.0.0.1", PackageKind::AppThreat);
    let options = InstallOptions::default();

    let mut driver = InstallDriver::new(&api, &device, &options, CancellationToken::new());
    assert_eq!(driver.run(&package()).await.unwrap(), InstallState::Started);
    assert_eq!(driver.status_queries(), 0);
    assert_eq!(api.calls().len(), 1);
}

#[tokio::test(start_paused = true)]
async fn test_failed_job_result() {
    let api = ScriptedDevice::new("8366-9999").with_jobs(vec![
        job("812", "ACT", 30, "PEND", None),
        job("812", "FIN", 100, "FAIL", None),
    ]);
    let device = device("10.0.0.1", PackageKind::AppThreat);
    let options = waiting(5, 600);

    let mut driver = InstallDriver::new(&api, &device, &options, CancellationToken::new());
    let err = driver.run(&package()).await.unwrap_err();

    match err {
        InstallError::JobFailed { job_id, result, details, .. } => {
            assert_eq!(job_id, "812");
            assert_eq!(result, "FAIL");
            assert_eq!(details, "step");
        }
        other => panic!("expected job failure, got {:?}", other),
    }
    assert_eq!(driver.state(), &InstallState::Failed);
}

#[tokio::test(start_paused = true)]
async fn test_poll_transport_error_aborts() {
    let api = ScriptedDevice::new("8366-9999").with_job_results(vec![
        Ok(job("812", "ACT", 10, "PEND", None)),
        Err(TransportError::Status {
            status: 502,
            body: "Bad Gateway".to_string(),
        }),
    ]);
    let device = device("10.0.0.1", PackageKind::AppThreat);
    let options = waiting(5, 600);

    let mut driver = InstallDriver::new(&api, &device, &options, CancellationToken::new());
    let err = driver.run(&package()).await.unwrap_err();

    match err {
        InstallError::Poll { device, job_id, command, reason, raw } => {
            assert_eq!(device, "fw-10.0.0.1");
            assert_eq!(job_id, "812");
            assert_eq!(command, r#"show jobs id "812""#);
            assert!(reason.contains("502"));
            assert!(raw.is_none());
        }
        other => panic!("expected poll error, got {:?}", other),
    }
    assert_eq!(driver.state(), &InstallState::Failed);
    assert_eq!(driver.status_queries(), 2);
}

#[tokio::test(start_paused = true)]
async fn test_malformed_job_response_aborts_with_raw_body() {
    let api = ScriptedDevice::new("8366-9999").with_jobs(vec!["<response><result>".to_string()]);
    let device = device("10.0.0.1", PackageKind::AppThreat);
    let options = waiting(5, 600);

    let mut driver = InstallDriver::new(&api, &device, &options, CancellationToken::new());
    let err = driver.run(&package()).await.unwrap_err();

    match err {
        InstallError::Poll { job_id, command, raw, .. } => {
            assert_eq!(job_id, "812");
            assert_eq!(command, r#"show jobs id "812""#);
            assert_eq!(raw.as_deref(), Some("<response><result>"));
        }
        other => panic!("expected poll error, got {:?}", other),
    }
    assert_eq!(driver.state(), &InstallState::Failed);
    assert_eq!(driver.status_queries(), 1);
}

#[tokio::test]
async fn test_rejected_install_request() {
    let api = ScriptedDevice::new("8366-9999").with_install_response(ERROR_ENVELOPE);
    let device = device("10.0.0.1", PackageKind::AppThreat);
    let options = waiting(5, 600);

    let mut driver = InstallDriver::new(&api, &device, &options, CancellationToken::new());
    let err = driver.run(&package()).await.unwrap_err();

    match err {
        InstallError::Request { file, reason, .. } => {
            assert_eq!(file, "panupv2-all-contents-8367-6135");
            assert!(reason.contains("Invalid file"));
        }
        other => panic!("expected request error, got {:?}", other),
    }
    assert_eq!(driver.state(), &InstallState::Failed);
    assert_eq!(driver.status_queries(), 0);
    assert_eq!(api.count("job"), 0);
}
