//! Per-request workspaces: one uniquely named temp directory per conversion.
//!
//! A [`Workspace`] wraps a [`tempfile::TempDir`], so the directory is removed
//! when the value is dropped even if the request future is cancelled or a
//! stage panics. The normal path calls [`Workspace::destroy`] explicitly so a
//! removal failure can be logged instead of silently ignored.
//!
//! Directory names look like `scorm-pdf-converter-1718035200123-a1B2c3`: the
//! kind, a millisecond timestamp, and a random suffix from `tempfile`. The
//! random suffix keeps names distinct for requests that arrive within the same
//! millisecond.

use crate::error::ScormError;
use crate::request::SourceKind;
use chrono::{DateTime, Utc};
use std::path::{Path, PathBuf};
use tempfile::TempDir;
use tracing::{debug, warn};

/// Filename the converter is told to write its archive to.
pub const OUTPUT_FILENAME: &str = "output.zip";

/// Creates workspaces under a fixed root directory.
///
/// Holds only the root path; concurrent requests share nothing else.
#[derive(Debug, Clone)]
pub struct WorkspaceManager {
    root: PathBuf,
}

impl WorkspaceManager {
    pub fn new(root: impl Into<PathBuf>) -> Self {
        Self { root: root.into() }
    }

    /// Allocate a fresh workspace for one `kind` conversion.
    ///
    /// # Errors
    /// [`ScormError::WorkspaceCreation`] when the directory cannot be created
    /// (missing root, permissions, disk exhaustion).
    pub fn create(&self, kind: SourceKind) -> Result<Workspace, ScormError> {
        let created_at = Utc::now();
        let prefix = format!(
            "scorm-{}-converter-{}-",
            kind.slug(),
            created_at.timestamp_millis()
        );

        let dir = tempfile::Builder::new()
            .prefix(&prefix)
            .tempdir_in(&self.root)
            .map_err(|source| ScormError::WorkspaceCreation {
                root: self.root.clone(),
                source,
            })?;

        debug!("Created workspace: {}", dir.path().display());
        Ok(Workspace { dir, created_at })
    }
}

/// An isolated, request-scoped directory holding one conversion's files.
#[derive(Debug)]
pub struct Workspace {
    dir: TempDir,
    created_at: DateTime<Utc>,
}

impl Workspace {
    pub fn path(&self) -> &Path {
        self.dir.path()
    }

    /// Where the staged document for `kind` lives.
    pub fn input_path(&self, kind: SourceKind) -> PathBuf {
        self.dir.path().join(kind.input_filename())
    }

    /// Where the converter must leave its archive.
    pub fn output_path(&self) -> PathBuf {
        self.dir.path().join(OUTPUT_FILENAME)
    }

    /// Recursively remove the workspace.
    ///
    /// Best-effort: a failure is logged and otherwise ignored so it can never
    /// replace the conversion result already computed.
    pub fn destroy(self) {
        let path = self.dir.path().to_path_buf();
        let lifetime_ms = (Utc::now() - self.created_at).num_milliseconds();
        match self.dir.close() {
            Ok(()) => debug!(
                "Removed workspace {} after {}ms",
                path.display(),
                lifetime_ms
            ),
            Err(e) => warn!("Failed to remove workspace {}: {}", path.display(), e),
        }
    }
}
