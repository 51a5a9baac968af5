//! Artifact store for one run.
//!
//! Every file a run produces lands in a single output directory. Names are
//! write-once: asking for the same name twice is an error, so a run can never
//! silently overwrite its own evidence.

use crate::driver::ConsoleMessage;
use crate::result::{PagecheckError, PagecheckResult};
use crate::verdict::Verdict;
use std::collections::HashSet;
use std::path::{Path, PathBuf};

/// Diagnostic screenshot captured on failure
pub const ERROR_SCREENSHOT: &str = "error.png";
/// Failure text written when the diagnostic screenshot itself fails
pub const ERROR_TEXT: &str = "error.txt";
/// Relayed browser console output
pub const CONSOLE_LOG: &str = "console.log";
/// Machine-readable verdict
pub const VERDICT_JSON: &str = "verdict.json";

/// Turn a free-form name into a file-name-safe slug.
///
/// ASCII alphanumerics are lowercased, every other run of characters becomes a
/// single `_`.
#[must_use]
pub fn slug(name: &str) -> String {
    let mut out = String::with_capacity(name.len());
    for c in name.chars() {
        if c.is_ascii_alphanumeric() {
            out.push(c.to_ascii_lowercase());
        } else if !out.is_empty() && !out.ends_with('_') {
            out.push('_');
        }
    }
    let trimmed = out.trim_end_matches('_');
    if trimmed.is_empty() {
        "artifact".to_string()
    } else {
        trimmed.to_string()
    }
}

/// File name of the `ordinal`-th screenshot of a run (1-based)
#[must_use]
pub fn screenshot_name(ordinal: usize, name: &str) -> String {
    format!("{ordinal:02}_{}.png", slug(name))
}

/// Write-once artifact directory
#[derive(Debug)]
pub struct ArtifactStore {
    root: PathBuf,
    written: HashSet<String>,
    paths: Vec<PathBuf>,
    screenshots: usize,
}

impl ArtifactStore {
    /// Create a store rooted at `root`; the directory is created on first write
    #[must_use]
    pub fn new(root: impl Into<PathBuf>) -> Self {
        Self {
            root: root.into(),
            written: HashSet::new(),
            paths: Vec::new(),
            screenshots: 0,
        }
    }

    /// Output directory
    #[must_use]
    pub fn root(&self) -> &Path {
        &self.root
    }

    /// Paths written so far, in write order
    #[must_use]
    pub fn paths(&self) -> &[PathBuf] {
        &self.paths
    }

    /// Whether a name has already been written
    #[must_use]
    pub fn contains(&self, name: &str) -> bool {
        self.written.contains(name)
    }

    /// Write `bytes` under `name`.
    ///
    /// # Errors
    ///
    /// Returns [`PagecheckError::ArtifactError`] when the name was already
    /// written in this run or is not a plain file name, and I/O errors from
    /// the filesystem.
    pub async fn write(&mut self, name: &str, bytes: &[u8]) -> PagecheckResult<PathBuf> {
        let reject = |message: &str| PagecheckError::ArtifactError {
            name: name.to_string(),
            message: message.to_string(),
        };
        if name.is_empty() || name.contains(['/', '\\']) || name == "." || name == ".." {
            return Err(reject("not a plain file name"));
        }
        if self.written.contains(name) {
            return Err(reject("already written in this run"));
        }

        tokio::fs::create_dir_all(&self.root).await?;
        let path = self.root.join(name);
        tokio::fs::write(&path, bytes).await?;
        tracing::debug!(path = %path.display(), bytes = bytes.len(), "artifact written");

        self.written.insert(name.to_string());
        self.paths.push(path.clone());
        Ok(path)
    }

    /// Save a requested screenshot as `{nn}_{slug}.png`, numbered in
    /// capture order.
    ///
    /// # Errors
    ///
    /// See [`ArtifactStore::write`].
    pub async fn save_screenshot(&mut self, name: &str, png: &[u8]) -> PagecheckResult<PathBuf> {
        let path = self
            .write(&screenshot_name(self.screenshots + 1, name), png)
            .await?;
        self.screenshots += 1;
        Ok(path)
    }

    /// Number of requested screenshots saved so far
    #[must_use]
    pub const fn screenshot_count(&self) -> usize {
        self.screenshots
    }

    /// Save the diagnostic screenshot of a failure.
    ///
    /// # Errors
    ///
    /// See [`ArtifactStore::write`].
    pub async fn save_error_screenshot(&mut self, png: &[u8]) -> PagecheckResult<PathBuf> {
        self.write(ERROR_SCREENSHOT, png).await
    }

    /// Save the failure message when no diagnostic screenshot could be taken.
    ///
    /// # Errors
    ///
    /// See [`ArtifactStore::write`].
    pub async fn save_error_text(&mut self, message: &str) -> PagecheckResult<PathBuf> {
        let mut text = message.to_string();
        text.push('\n');
        self.write(ERROR_TEXT, text.as_bytes()).await
    }

    /// Save relayed console messages, one `[level] text` line each.
    ///
    /// # Errors
    ///
    /// See [`ArtifactStore::write`].
    pub async fn save_console(&mut self, messages: &[ConsoleMessage]) -> PagecheckResult<PathBuf> {
        let text: String = messages
            .iter()
            .map(|m| format!("[{}] {}\n", m.level, m.text))
            .collect();
        self.write(CONSOLE_LOG, text.as_bytes()).await
    }

    /// Save the verdict as pretty-printed JSON.
    ///
    /// # Errors
    ///
    /// See [`ArtifactStore::write`]; also fails if serialization fails.
    pub async fn save_verdict(&mut self, verdict: &Verdict) -> PagecheckResult<PathBuf> {
        let json = serde_json::to_vec_pretty(verdict)?;
        self.write(VERDICT_JSON, &json).await
    }
}
