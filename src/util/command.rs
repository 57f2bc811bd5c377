//! Async execution of the external tools the digest relies on.
//!
//! Both the bundling tool and the mail tool are run the same way: arguments
//! are passed verbatim (no shell), stdin is closed, and stdout/stderr are
//! inherited so the operator sees whatever the tool prints.

use std::ffi::{OsStr, OsString};
use std::process::{ExitStatus, Stdio};

use thiserror::Error;
use tokio::process::Command;

/// Errors raised while running an external tool.
#[derive(Debug, Error)]
pub enum CommandError {
    /// The program could not be started (not installed, not executable, ...).
    #[error("Failed to start '{program}': {source}")]
    Spawn {
        program: String,
        #[source]
        source: std::io::Error,
    },
    /// The program ran but reported failure.
    #[error("'{program}' exited with {status}")]
    Failed { program: String, status: ExitStatus },
}

impl CommandError {
    /// Exit code the tool reported, if it exited normally.
    ///
    /// `None` for spawn failures and for tools killed by a signal.
    pub fn exit_code(&self) -> Option<i32> {
        match self {
            CommandError::Spawn { .. } => None,
            CommandError::Failed { status, .. } => status.code(),
        }
    }
}

/// Runs `program` with `args` and waits for it to finish.
///
/// Succeeds only if the process exits with status zero.
pub async fn run<I, S>(program: &OsStr, args: I) -> Result<(), CommandError>
where
    I: IntoIterator<Item = S>,
    S: AsRef<OsStr>,
{
    let name = program.to_string_lossy().into_owned();
    let args: Vec<OsString> = args.into_iter().map(|a| a.as_ref().to_owned()).collect();

    tracing::debug!(program = %name, args = ?args, "Running external command");

    let status = Command::new(program)
        .args(&args)
        .stdin(Stdio::null())
        .stdout(Stdio::inherit())
        .stderr(Stdio::inherit())
        .status()
        .await
        .map_err(|source| CommandError::Spawn {
            program: name.clone(),
            source,
        })?;

    if !status.success() {
        return Err(CommandError::Failed {
            program: name,
            status,
        });
    }

    Ok(())
}
