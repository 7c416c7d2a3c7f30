//! Report delivery over SMTP

use lettre::message::header::ContentType;
use lettre::message::Mailbox;
use lettre::transport::smtp::authentication::Credentials;
use lettre::{AsyncSmtpTransport, AsyncTransport, Message, Tokio1Executor};
use secrecy::ExposeSecret;
use tracing::info;

use crate::errors::UpdaterError;
use crate::storage::settings::EmailSettings;

pub const SUBJECT: &str = "Pan Firewall Update - report";

fn mailbox(address: &str) -> Result<Mailbox, UpdaterError> {
    address
        .parse()
        .map_err(|e| UpdaterError::EmailError(format!("Invalid address {:?}: {}", address, e)))
}

/// Build the report message for all configured receivers
pub fn build_message(settings: &EmailSettings, body: String) -> Result<Message, UpdaterError> {
    let mut builder = Message::builder()
        .from(mailbox(&settings.sender)?)
        .subject(SUBJECT)
        .header(ContentType::TEXT_PLAIN);

    for receiver in &settings.receivers {
        builder = builder.to(mailbox(receiver)?);
    }

    builder
        .body(body)
        .map_err(|e| UpdaterError::EmailError(e.to_string()))
}

/// Send the report using STARTTLS, authenticating when credentials are set
pub async fn send_report(settings: &EmailSettings, body: String) -> Result<(), UpdaterError> {
    let message = build_message(settings, body)?;

    let mut transport = AsyncSmtpTransport::<Tokio1Executor>::starttls_relay(&settings.smtp_host)
        .map_err(|e| UpdaterError::EmailError(e.to_string()))?
        .port(settings.smtp_port);

    if let (Some(username), Some(password)) = (&settings.username, &settings.password) {
        transport = transport.credentials(Credentials::new(
            username.clone(),
            password.expose_secret().to_string(),
        ));
    }

    transport
        .build()
        .send(message)
        .await
        .map_err(|e| UpdaterError::EmailError(e.to_string()))?;

    info!(
        "Report emailed to {} receiver(s) via {}",
        settings.receivers.len(),
        settings.smtp_host
    );
    Ok(())
}
