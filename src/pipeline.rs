//! One run of the digest: load subscriptions, fetch recent links, build the
//! digest, mail it.
//!
//! ```text
//! Start → Loaded → Fetching(1..N) → Built | Skipped → Delivered | Failed → End
//! ```
//!
//! A feed that fails to fetch only costs its own links. An empty link set
//! ends the run successfully with [`Outcome::Skipped`]. A failing bundling or
//! mail tool is fatal; delivery is never attempted after a failed build, and a
//! built document is never removed after a failed delivery.

use std::path::PathBuf;

use chrono::{DateTime, Duration, Local, NaiveDate, Utc};
use thiserror::Error;

use crate::delivery::{MailError, Mailer};
use crate::digest::{self, DigestError, DigestGenerator, Document, LinkSet};
use crate::feed::{self, OpmlError};

/// Fully resolved settings for one run (flags merged over the config file).
#[derive(Debug, Clone)]
pub struct Settings {
    pub opml: PathBuf,
    pub email: String,
    pub period_days: u32,
    pub output_dir: PathBuf,
    pub title: String,
    pub file_prefix: String,
    pub fetch_concurrency: usize,
    /// Fetch and report links, but neither build nor send anything.
    pub dry_run: bool,
}

impl Settings {
    /// Earliest publish time (exclusive) for an entry to count as recent.
    pub fn cutoff(&self, now: DateTime<Utc>) -> DateTime<Utc> {
        now - Duration::days(i64::from(self.period_days))
    }

    /// Where today's digest is written.
    pub fn output_file(&self, today: NaiveDate) -> PathBuf {
        digest::output_path(&self.output_dir, &self.file_prefix, today)
    }
}

/// Fatal errors; anything not listed here is logged and the run continues.
#[derive(Debug, Error)]
pub enum RunError {
    #[error("Failed to load subscriptions from {}: {source}", path.display())]
    Subscription {
        path: PathBuf,
        #[source]
        source: OpmlError,
    },

    #[error(transparent)]
    Digest(#[from] DigestError),

    /// The digest was built but could not be sent; it is left on disk.
    #[error("{source} (digest kept at {})", document.display())]
    Delivery {
        document: PathBuf,
        #[source]
        source: MailError,
    },
}

impl RunError {
    /// Exit code to leave the process with.
    ///
    /// External tool failures pass their own exit code through; everything
    /// else is 1.
    pub fn exit_code(&self) -> i32 {
        let tool_code = match self {
            RunError::Digest(e) => e.exit_code(),
            RunError::Delivery { source, .. } => source.exit_code(),
            RunError::Subscription { .. } => None,
        };
        tool_code.filter(|code| *code != 0).unwrap_or(1)
    }
}

/// How a successful run ended.
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum Outcome {
    /// No entry in any feed was recent enough; nothing was built or sent.
    Skipped { feeds: usize, failed: usize },
    /// Dry run: the links that would have gone into the digest.
    DryRun { links: Vec<String>, failed: usize },
    /// The digest was built and mailed.
    Delivered { document: Document, failed: usize },
}

/// Executes one run with the given collaborators.
///
/// `now` fixes both the cutoff and the calendar date used in the file name.
pub async fn run<G, M>(
    settings: &Settings,
    client: &reqwest::Client,
    generator: &G,
    mailer: &M,
    now: DateTime<Local>,
) -> Result<Outcome, RunError>
where
    G: DigestGenerator + ?Sized,
    M: Mailer + ?Sized,
{
    let feeds = feed::parse(&settings.opml)
        .await
        .map_err(|source| RunError::Subscription {
            path: settings.opml.clone(),
            source,
        })?;
    tracing::info!(feeds = feeds.len(), "Found {} feeds.", feeds.len());

    let cutoff = settings.cutoff(now.with_timezone(&Utc));
    tracing::debug!(%cutoff, period_days = settings.period_days, "Selecting entries newer than cutoff");

    let results = feed::fetch_all(client, &feeds, cutoff, settings.fetch_concurrency).await;
    let failed = results.iter().filter(|r| r.result.is_err()).count();
    if failed > 0 {
        tracing::warn!(failed = failed, total = results.len(), "Some feeds could not be fetched");
    }

    let links = LinkSet::from_results(&results);
    tracing::info!(links = links.len(), "Collected unique article links");

    if settings.dry_run {
        return Ok(Outcome::DryRun {
            links: links.to_vec(),
            failed,
        });
    }

    let output = settings.output_file(now.date_naive());
    let Some(document) = digest::build_digest(generator, &links, &settings.title, &output).await?
    else {
        return Ok(Outcome::Skipped {
            feeds: feeds.len(),
            failed,
        });
    };

    mailer
        .send(&document.path, &settings.email, &settings.title)
        .await
        .map_err(|source| RunError::Delivery {
            document: document.path.clone(),
            source,
        })?;
    tracing::info!(document = %document.path.display(), recipient = %settings.email, "Digest delivered");

    Ok(Outcome::Delivered { document, failed })
}
