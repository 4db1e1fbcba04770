//! Result validation: decide whether a finished converter run produced a package.
//!
//! Decision order:
//!
//! 1. launch failure — already returned by [`crate::pipeline::invoke`] as
//!    `LaunchError` / `TimeoutError`, so a [`ConverterRun`] always has a status
//! 2. unsuccessful exit status → `ConverterError`
//! 3. exit zero but no regular file at the declared output path → `MissingArtifact`
//! 4. otherwise the artifact is handed on to packaging
//!
//! Step 3 applies even when the converter claims success: a converter that
//! exits zero without writing its archive has broken its contract.

use crate::error::{CapturedOutput, ScormError};
use crate::pipeline::invoke::ConverterRun;
use std::path::{Path, PathBuf};
use tracing::{debug, warn};

/// A converter archive known to exist, with the diagnostics of the run that
/// produced it.
#[derive(Debug, Clone)]
pub struct Artifact {
    pub path: PathBuf,
    pub output: CapturedOutput,
    pub converter_duration_ms: u64,
}

/// Classify `run` against the output path the converter was given.
pub async fn validate(expected_output: &Path, run: ConverterRun) -> Result<Artifact, ScormError> {
    if !run.success() {
        warn!("Converter failed with {}", run.status);
        return Err(ScormError::ConverterFailed {
            status: run.status.to_string(),
            output: run.output,
        });
    }

    let is_file = tokio::fs::metadata(expected_output)
        .await
        .map(|m| m.is_file())
        .unwrap_or(false);
    if !is_file {
        warn!(
            "Converter exited successfully but did not create {}",
            expected_output.display()
        );
        return Err(ScormError::MissingArtifact {
            path: expected_output.to_path_buf(),
            output: run.output,
        });
    }

    debug!("Artifact present: {}", expected_output.display());
    Ok(Artifact {
        path: expected_output.to_path_buf(),
        output: run.output,
        converter_duration_ms: run.duration_ms,
    })
}
