//! Digest building: the deduplicated link set and the external bundling tool.
//!
//! The bundling itself (fetching every article, extracting readable content,
//! assembling one HTML file with a table of contents) is delegated to an
//! external program behind the [`DigestGenerator`] trait. [`Percollate`] is
//! the production backend.

use std::collections::BTreeSet;
use std::ffi::{OsStr, OsString};
use std::path::{Path, PathBuf};

use async_trait::async_trait;
use chrono::NaiveDate;
use thiserror::Error;

use crate::feed::FetchResult;
use crate::util::command::{self, CommandError};

#[derive(Debug, Error)]
pub enum DigestError {
    #[error("Digest generation failed: {0}")]
    Command(#[from] CommandError),

    /// The tool reported success but left no file behind.
    #[error("Digest tool did not produce {}", .0.display())]
    MissingOutput(PathBuf),

    /// The output directory could not be created, or a stale digest could
    /// not be removed from it.
    #[error("Failed to prepare digest output {}: {source}", path.display())]
    Output {
        path: PathBuf,
        #[source]
        source: std::io::Error,
    },
}

impl DigestError {
    /// Exit code of the external tool, when it ran and failed.
    pub fn exit_code(&self) -> Option<i32> {
        match self {
            DigestError::Command(e) => e.exit_code(),
            DigestError::MissingOutput(_) | DigestError::Output { .. } => None,
        }
    }
}

/// Deduplicated article links collected across all feeds.
///
/// Backed by a `BTreeSet`, so iteration is lexicographic and the digest
/// input is the same for the same set of links.
#[derive(Debug, Clone, Default, PartialEq, Eq)]
pub struct LinkSet {
    links: BTreeSet<String>,
}

impl LinkSet {
    /// Collects the links of every successful fetch; failed feeds contribute nothing.
    pub fn from_results(results: &[FetchResult]) -> Self {
        results
            .iter()
            .filter_map(|r| r.result.as_ref().ok())
            .flatten()
            .cloned()
            .collect()
    }

    pub fn len(&self) -> usize {
        self.links.len()
    }

    pub fn is_empty(&self) -> bool {
        self.links.is_empty()
    }

    pub fn to_vec(&self) -> Vec<String> {
        self.links.iter().cloned().collect()
    }
}

impl FromIterator<String> for LinkSet {
    fn from_iter<I: IntoIterator<Item = String>>(iter: I) -> Self {
        Self {
            links: iter.into_iter().collect(),
        }
    }
}

/// A digest file that has been written to disk.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct Document {
    pub path: PathBuf,
    /// Number of links the digest was built from.
    pub articles: usize,
}

/// Builds the digest output path: `<dir>/<prefix>_<YYYY-MM-DD>.html`.
pub fn output_path(dir: &Path, prefix: &str, date: NaiveDate) -> PathBuf {
    dir.join(format!("{}_{}.html", prefix, date.format("%Y-%m-%d")))
}

/// Something that turns a list of article links into one HTML document.
#[async_trait]
pub trait DigestGenerator: Send + Sync {
    /// Writes the digest for `links` to `output`.
    ///
    /// `links` is never empty; [`build_digest`] skips the call instead.
    async fn generate(
        &self,
        links: &[String],
        title: &str,
        output: &Path,
    ) -> Result<Document, DigestError>;
}

/// Runs `generator` over the link set, or reports that there is nothing to build.
///
/// Returns `Ok(None)` without touching the generator (and without creating
/// any file or directory) when `links` is empty. Otherwise the directory of
/// `output` is created first if it does not exist.
pub async fn build_digest<G>(
    generator: &G,
    links: &LinkSet,
    title: &str,
    output: &Path,
) -> Result<Option<Document>, DigestError>
where
    G: DigestGenerator + ?Sized,
{
    if links.is_empty() {
        tracing::info!("No articles found in the selected time period.");
        return Ok(None);
    }

    if let Some(dir) = output.parent().filter(|d| !d.as_os_str().is_empty()) {
        tokio::fs::create_dir_all(dir)
            .await
            .map_err(|source| DigestError::Output {
                path: dir.to_path_buf(),
                source,
            })?;
    }

    tracing::info!(
        articles = links.len(),
        output = %output.display(),
        "Generating HTML digest with {} articles...",
        links.len()
    );
    let document = generator.generate(&links.to_vec(), title, output).await?;
    Ok(Some(document))
}

/// Digest backend driving the `percollate` command-line tool.
///
/// Invoked as `percollate html --toc --title <title> -o <output> <link>...`.
#[derive(Debug, Clone)]
pub struct Percollate {
    program: OsString,
}

impl Percollate {
    pub fn new(program: impl AsRef<OsStr>) -> Self {
        Self {
            program: program.as_ref().to_owned(),
        }
    }

    fn command_args(links: &[String], title: &str, output: &Path) -> Vec<OsString> {
        let mut args: Vec<OsString> = vec![
            "html".into(),
            "--toc".into(),
            "--title".into(),
            title.into(),
            "-o".into(),
            output.as_os_str().to_owned(),
        ];
        args.extend(links.iter().map(OsString::from));
        args
    }
}

impl Default for Percollate {
    fn default() -> Self {
        Self::new("percollate")
    }
}

#[async_trait]
impl DigestGenerator for Percollate {
    async fn generate(
        &self,
        links: &[String],
        title: &str,
        output: &Path,
    ) -> Result<Document, DigestError> {
        // A digest left over from an earlier run today must not pass for this one.
        match tokio::fs::remove_file(output).await {
            Ok(()) => tracing::debug!(output = %output.display(), "Removed stale digest"),
            Err(e) if e.kind() == std::io::ErrorKind::NotFound => {}
            Err(source) => {
                return Err(DigestError::Output {
                    path: output.to_path_buf(),
                    source,
                })
            }
        }

        command::run(&self.program, Self::command_args(links, title, output)).await?;

        if !tokio::fs::try_exists(output).await.unwrap_or(false) {
            return Err(DigestError::MissingOutput(output.to_path_buf()));
        }

        Ok(Document {
            path: output.to_path_buf(),
            articles: links.len(),
        })
    }
}
