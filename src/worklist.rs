//! The persisted list of scan targets.
//!
//! One token per line (see [`crate::target::WorkItem`] for the syntax). The
//! scan removes an entry once none of its addresses turned out to host a
//! server, so the file shrinks run over run until only territory worth
//! revisiting remains. The file is re-read for every mutation to tolerate
//! manual edits between operations.

use std::path::{Path, PathBuf};

use anyhow::Context;
use itertools::Itertools;
use log::{debug, warn};
use tokio::fs;

use crate::target::WorkItem;

/// File-backed, ordered list of work-item tokens.
#[derive(Debug)]
pub struct WorkList {
    path: PathBuf,
}

impl WorkList {
    /// Creates a handle for the target file at `path`.
    pub fn new(path: impl Into<PathBuf>) -> Self {
        Self { path: path.into() }
    }

    /// Path of the backing file.
    #[must_use]
    pub fn path(&self) -> &Path {
        &self.path
    }

    /// Reads the tokens awaiting a scan: blank lines dropped, duplicates
    /// collapsed, smaller entries first so quick wins land early.
    ///
    /// Tokens that do not parse still come back (sorted as size 1); the
    /// scanner reports them and leaves them in place.
    pub async fn load(&self) -> anyhow::Result<Vec<String>> {
        let content = fs::read_to_string(&self.path)
            .await
            .with_context(|| format!("could not read target file {}", self.path.display()))?;

        let mut tokens: Vec<String> = content
            .lines()
            .map(str::trim)
            .filter(|l| !l.is_empty())
            .map(str::to_owned)
            .unique()
            .collect();
        tokens.sort_by_key(|t| t.parse::<WorkItem>().map_or(1, |item| item.size()));

        Ok(tokens)
    }

    /// Housekeeping pass: rewrites the file deduplicated and sorted by entry
    /// size. A failure leaves the file as it was.
    pub async fn tidy(&self) {
        let tokens = match self.load().await {
            Ok(tokens) => tokens,
            Err(e) => {
                debug!("nothing to tidy: {e:#}");
                return;
            }
        };

        let mut content = tokens.iter().join("\n");
        if !content.is_empty() {
            content.push('\n');
        }
        if let Err(e) = fs::write(&self.path, content).await {
            warn!("failed to tidy {}: {e}", self.path.display());
        }
    }

    /// Removes every line whose trimmed text equals `token` exactly,
    /// preserving the order of everything else.
    pub async fn remove(&self, token: &str) {
        let content = match fs::read_to_string(&self.path).await {
            Ok(content) => content,
            Err(e) => {
                warn!(
                    "could not prune '{token}' from {}: {e}",
                    self.path.display()
                );
                return;
            }
        };

        let mut kept = content
            .lines()
            .filter(|line| line.trim() != token)
            .join("\n");
        if !kept.is_empty() {
            kept.push('\n');
        }

        match fs::write(&self.path, kept).await {
            Ok(()) => debug!("pruned '{token}' from {}", self.path.display()),
            Err(e) => warn!(
                "could not prune '{token}' from {}: {e}",
                self.path.display()
            ),
        }
    }
}
