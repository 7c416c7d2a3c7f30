//! dynupd - Entry Point
//!
//! Pushes the newest downloaded content package to every configured device
//! and reports the outcome per device.

use std::process::ExitCode;

use anyhow::Context;
use chrono::Utc;
use clap::Parser;
use futures::stream::{self, StreamExt};
use tokio_util::sync::CancellationToken;
use tracing::{error, info, warn};

use dynupd::cli::Cli;
use dynupd::discovery::find_newest_file;
use dynupd::filesys::file::File;
use dynupd::logs::{init_logging, LogOptions};
use dynupd::report::email::send_report;
use dynupd::report::{all_succeeded, colorize, email_body, status_lines};
use dynupd::shutdown::watch_signals;
use dynupd::storage::settings::Settings;
use dynupd::update::orchestrator::run_all;
use dynupd::utils::{generate_run_id, version_info};
use dynupd::xapi::client::XapiClient;

#[tokio::main]
async fn main() -> ExitCode {
    let cli = Cli::parse();

    if cli.version {
        match serde_json::to_string_pretty(&version_info()) {
            Ok(version) => println!("{}", version),
            Err(e) => eprintln!("{}", e),
        }
        return ExitCode::SUCCESS;
    }

    match run(cli).await {
        Ok(true) => ExitCode::SUCCESS,
        Ok(false) => ExitCode::from(2),
        Err(e) => {
            error!("{:#}", e);
            eprintln!("[ERROR] {:#}", e);
            ExitCode::FAILURE
        }
    }
}

/// Returns whether every device ended without a failure
async fn run(cli: Cli) -> anyhow::Result<bool> {
    let package = cli.package.context("--type is required")?;

    let settings = Settings::load(&File::new(&cli.config))
        .await
        .with_context(|| format!("Unable to load settings from {}", cli.config.display()))?;

    let log_options = LogOptions {
        log_level: cli.loglevel.clone().unwrap_or_else(|| settings.log_level.clone()),
        log_file: settings.log_file.clone(),
        json_format: cli.json_logs,
        ..Default::default()
    };
    let _log_guard = init_logging(log_options).context("Failed to initialize logging")?;

    let run_id = generate_run_id();
    let started_at = Utc::now();
    info!(
        run_id = %run_id,
        "dynupd {} started, pushing {} content",
        version_info().version,
        package
    );

    let file_name = match cli.file.clone() {
        Some(name) => name,
        None => find_newest_file(&settings.packages_dir, package)
            .await
            .context("Unable to find a package to install")?,
    };
    let package_dir = settings.packages_dir.join(package.directory());

    let cancel = CancellationToken::new();
    tokio::spawn(cancel_on_signal(cancel.clone()));

    let reports = run_all(
        settings.devices(package),
        &file_name,
        &package_dir,
        &settings.orchestrator_options(cli.wait),
        XapiClient::new,
        cancel,
    )
    .await?;

    let lines = status_lines(&reports);
    for line in &lines {
        info!("{}", line);
        if cli.verbose {
            println!("{}", colorize(line));
        }
    }

    if cli.email {
        match &settings.email {
            Some(email) => {
                if let Err(e) = send_report(email, email_body(&run_id, started_at, &lines)).await {
                    error!("Unable to send report email: {}", e);
                }
            }
            None => warn!("--email given but the settings file has no email section"),
        }
    }

    Ok(all_succeeded(&reports))
}

/// Cancel the run on SIGINT/SIGTERM; exit on a second signal
async fn cancel_on_signal(cancel: CancellationToken) {
    let ctrl_c = stream::unfold((), |_| async {
        tokio::signal::ctrl_c().await.ok().map(|_| ("Ctrl+C", ()))
    });

    #[cfg(unix)]
    let signals = {
        use tokio::signal::unix::{signal, SignalKind};
        match signal(SignalKind::terminate()) {
            Ok(sigterm) => {
                let sigterm = stream::unfold(sigterm, |mut s| async move {
                    s.recv().await.map(|_| ("SIGTERM", s))
                });
                stream::select(ctrl_c, sigterm).boxed()
            }
            Err(e) => {
                warn!("Unable to listen for SIGTERM: {}", e);
                ctrl_c.boxed()
            }
        }
    };

    #[cfg(not(unix))]
    let signals = ctrl_c.boxed();

    if watch_signals(signals, cancel).await {
        std::process::exit(130);
    }
}
