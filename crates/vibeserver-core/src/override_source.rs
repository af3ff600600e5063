//! Override fragment appended to every prompt.
//!
//! The fragment lives in a plain-text file that operators can edit while the
//! server runs, so [`FileOverride`] reads it again on every call. A missing
//! file means "no override". Any other read failure is logged and treated
//! the same way.

use std::io::ErrorKind;
use std::path::{Path, PathBuf};

use async_trait::async_trait;
use tracing::{debug, warn};

/// Source of the optional prompt override fragment.
#[async_trait]
pub trait OverrideSource: Send + Sync {
    /// Load the current fragment, or `None` when there is nothing to append.
    async fn load(&self) -> Option<String>;
}

/// Reads the override from a file on every call.
#[derive(Debug, Clone)]
pub struct FileOverride {
    path: PathBuf,
}

impl FileOverride {
    /// `path` is resolved against the process working directory at read time.
    pub fn new(path: impl Into<PathBuf>) -> Self {
        Self { path: path.into() }
    }

    pub fn path(&self) -> &Path {
        &self.path
    }
}

#[async_trait]
impl OverrideSource for FileOverride {
    async fn load(&self) -> Option<String> {
        match tokio::fs::read_to_string(&self.path).await {
            Ok(raw) => {
                let fragment = strip_comment_lines(&raw);
                if fragment.trim().is_empty() {
                    None
                } else {
                    debug!(
                        "Loaded prompt override from {} ({} bytes)",
                        self.path.display(),
                        fragment.len()
                    );
                    Some(fragment)
                }
            }
            Err(e) if e.kind() == ErrorKind::NotFound => None,
            Err(e) => {
                warn!(
                    "Failed to read prompt override {}: {e}; continuing without it",
                    self.path.display()
                );
                None
            }
        }
    }
}

/// Fixed override content, used by tests and embedders.
#[derive(Debug, Clone, Default)]
pub struct StaticOverride(pub Option<String>);

#[async_trait]
impl OverrideSource for StaticOverride {
    async fn load(&self) -> Option<String> {
        self.0.clone()
    }
}

/// No override at all.
#[derive(Debug, Clone, Copy, Default)]
pub struct NoOverride;

#[async_trait]
impl OverrideSource for NoOverride {
    async fn load(&self) -> Option<String> {
        None
    }
}

/// Drop `#` comment lines and unescape `\#` at the start of a line.
///
/// Leading whitespace before the marker is allowed and, for escaped lines,
/// preserved.
pub fn strip_comment_lines(raw: &str) -> String {
    raw.lines()
        .filter_map(|line| {
            let trimmed = line.trim_start();
            let indent = &line[..line.len() - trimmed.len()];

            if trimmed.starts_with('#') {
                None
            } else if let Some(rest) = trimmed.strip_prefix("\\#") {
                Some(format!("{indent}#{rest}"))
            } else {
                Some(line.to_string())
            }
        })
        .collect::<Vec<_>>()
        .join("\n")
}
