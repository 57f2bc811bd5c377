//! Delivery of the finished digest as a mail attachment.
//!
//! Mail transport is entirely the job of an external mail command; the
//! [`Mailx`] backend only hands it the attachment, subject and recipient.

use std::ffi::{OsStr, OsString};
use std::path::{Path, PathBuf};

use async_trait::async_trait;
use thiserror::Error;

use crate::util::command::{self, CommandError};

#[derive(Debug, Error)]
pub enum MailError {
    #[error("Delivery failed: {0}")]
    Command(#[from] CommandError),

    #[error("Document to send does not exist: {}", .0.display())]
    MissingDocument(PathBuf),
}

impl MailError {
    /// Exit code of the external tool, when it ran and failed.
    pub fn exit_code(&self) -> Option<i32> {
        match self {
            MailError::Command(e) => e.exit_code(),
            MailError::MissingDocument(_) => None,
        }
    }
}

/// Sends a document as an attachment with an empty message body.
#[async_trait]
pub trait Mailer: Send + Sync {
    async fn send(&self, document: &Path, recipient: &str, subject: &str)
        -> Result<(), MailError>;
}

/// Mail backend driving a `mailx`-compatible command.
///
/// Invoked as `mailx -a <document> -s <subject> <recipient>` with an empty stdin,
/// which mailx sends as an empty body.
#[derive(Debug, Clone)]
pub struct Mailx {
    program: OsString,
}

impl Mailx {
    pub fn new(program: impl AsRef<OsStr>) -> Self {
        Self {
            program: program.as_ref().to_owned(),
        }
    }

    fn command_args(document: &Path, recipient: &str, subject: &str) -> Vec<OsString> {
        vec![
            "-a".into(),
            document.as_os_str().to_owned(),
            "-s".into(),
            subject.into(),
            recipient.into(),
        ]
    }
}

impl Default for Mailx {
    fn default() -> Self {
        Self::new("mailx")
    }
}

#[async_trait]
impl Mailer for Mailx {
    async fn send(
        &self,
        document: &Path,
        recipient: &str,
        subject: &str,
    ) -> Result<(), MailError> {
        if !tokio::fs::try_exists(document).await.unwrap_or(false) {
            return Err(MailError::MissingDocument(document.to_path_buf()));
        }

        tracing::info!(
            document = %document.display(),
            recipient = %recipient,
            "Sending '{}' to {}...",
            document.display(),
            recipient
        );
        command::run(
            &self.program,
            Self::command_args(document, recipient, subject),
        )
        .await?;
        Ok(())
    }
}
