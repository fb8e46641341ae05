//! One-shot backup: dump the whole collection with `mongodump` and email
//! the gzip archive as an attachment. Invoked with `--backup`, entirely
//! outside the request-serving path. No retries; every failure propagates
//! to the operator unmodified.

use chrono::Utc;
use lettre::message::header::ContentType;
use lettre::message::Attachment;
use lettre::transport::smtp::authentication::Credentials;
use lettre::{AsyncSmtpTransport, AsyncTransport, Message, Tokio1Executor};
use tokio::process::Command;

use crate::config::SmtpConfig;
use crate::store::StoreConfig;

#[derive(Debug, thiserror::Error)]
pub enum BackupError {
    #[error("failed to run mongodump: {0}")]
    Spawn(#[from] std::io::Error),

    #[error("mongodump exited with an error: {0}")]
    Dump(String),

    #[error("invalid mail address: {0}")]
    Address(#[from] lettre::address::AddressError),

    #[error("failed to build backup message: {0}")]
    Message(#[from] lettre::error::Error),

    #[error("smtp delivery failed: {0}")]
    Smtp(#[from] lettre::transport::smtp::Error),
}

/// Capture a full compressed dump of the configured collection.
pub async fn snapshot(store: &StoreConfig) -> Result<Vec<u8>, BackupError> {
    let mut command = Command::new("mongodump");
    command
        .arg(format!("-h{}:{}", store.host, store.port))
        .arg(format!("-d{}", store.database))
        .arg(format!("-c{}", store.collection));
    if let (Some(user), Some(password)) = (&store.user, &store.password) {
        command
            .arg(format!("-u{}", user))
            .arg(format!("-p{}", password));
    }
    let output = command.args(["--gzip", "--archive"]).output().await?;
    if !output.status.success() {
        return Err(BackupError::Dump(
            String::from_utf8_lossy(&output.stderr).into_owned(),
        ));
    }
    Ok(output.stdout)
}

/// Deliver the archive over an authenticated STARTTLS mail session.
/// Subject carries the current date; the attachment is named `database`.
pub async fn send(smtp: &SmtpConfig, archive: Vec<u8>) -> Result<(), BackupError> {
    let attachment = Attachment::new("database".to_string()).body(
        archive,
        ContentType::parse("application/octet-stream").expect("static content type"),
    );
    let message = Message::builder()
        .from(smtp.sender.parse()?)
        .to(smtp.subscriber.parse()?)
        .subject(format!("My Metadata Backup-{}", Utc::now().format("%Y%m%d")))
        .singlepart(attachment)?;

    let mailer = AsyncSmtpTransport::<Tokio1Executor>::starttls_relay(&smtp.host)?
        .port(smtp.port)
        .credentials(Credentials::new(
            smtp.sender.clone(),
            smtp.password.clone(),
        ))
        .build();
    mailer.send(message).await?;
    Ok(())
}

/// Snapshot then send.
pub async fn run(store: &StoreConfig, smtp: &SmtpConfig) -> Result<(), BackupError> {
    let archive = snapshot(store).await?;
    tracing::info!(bytes = archive.len(), "collection snapshot captured");
    send(smtp, archive).await?;
    tracing::info!(to = %smtp.subscriber, "metadata backup delivered");
    Ok(())
}
