//! Error types for the doc2scorm library.
//!
//! Every way a conversion can fail is a variant of [`ScormError`]. Each
//! variant belongs to exactly one [`FailureKind`], the machine-readable
//! classification that travels to HTTP callers in the `kind` field of an
//! error body:
//!
//! | Kind | Meaning | HTTP |
//! |------|---------|------|
//! | `ValidationError` | bad JSON, missing field, bad encoding, oversized document | 400 |
//! | `ResourceError`   | workspace could not be created or written | 500 |
//! | `LaunchError`     | the converter process could not be started | 500 |
//! | `ConverterError`  | the converter ran but exited unsuccessfully | 500 |
//! | `MissingArtifact` | the converter exited zero but left no archive | 500 |
//! | `PackagingError`  | the archive could not be read back | 500 |
//! | `TimeoutError`    | the converter exceeded its wall-clock budget | 500 |
//!
//! `MethodNotAllowed` only exists at the HTTP boundary and never appears as a
//! `ScormError`.
//!
//! Variants raised after the converter has run keep its captured
//! [`CapturedOutput`] so callers can show the converter's own diagnostics.

use serde::{Deserialize, Serialize};
use std::fmt;
use std::path::PathBuf;
use thiserror::Error;

/// Longest stderr tail quoted in a [`ScormError::ConverterFailed`] message.
const STDERR_EXCERPT_CHARS: usize = 500;

/// All errors returned by the doc2scorm library.
#[derive(Debug, Error)]
pub enum ScormError {
    // ── Request validation ────────────────────────────────────────────────
    /// The request body is not usable (bad JSON, missing field, …).
    #[error("{reason}")]
    InvalidRequest { reason: String },

    /// `fileContent` is not valid base64.
    #[error("File content is not valid base64: {detail}")]
    InvalidEncoding { detail: String },

    /// `fileContent` decoded to zero bytes.
    #[error("File content is empty")]
    EmptyDocument,

    /// The decoded document exceeds the configured size limit.
    #[error("File too large: {size} bytes (max {limit} bytes)")]
    DocumentTooLarge { size: usize, limit: usize },

    /// `fileType` names a kind we have no converter for.
    #[error("Unsupported file type: '{file_type}' (expected html, htm or pdf)")]
    UnsupportedFileType { file_type: String },

    /// A local input document (CLI / `convert_to_file`) could not be read.
    #[error("Cannot read input document '{path}': {source}")]
    InputReadFailed {
        path: PathBuf,
        #[source]
        source: std::io::Error,
    },

    /// `scormVersion` is neither `1.2` nor `2004`.
    #[error("Unsupported SCORM version: '{version}' (expected 1.2 or 2004)")]
    UnsupportedScormVersion { version: String },

    // ── Workspace / staging ───────────────────────────────────────────────
    /// The per-request workspace directory could not be created.
    #[error("Failed to create workspace under '{root}': {source}")]
    WorkspaceCreation {
        root: PathBuf,
        #[source]
        source: std::io::Error,
    },

    /// The decoded document could not be written into the workspace.
    #[error("Failed to stage input document at '{path}': {source}")]
    StagingFailed {
        path: PathBuf,
        #[source]
        source: std::io::Error,
    },

    /// The converter was about to run but its input file is gone.
    #[error("Converter input '{path}' does not exist; refusing to launch")]
    InputMissing { path: PathBuf },

    // ── Converter process ─────────────────────────────────────────────────
    /// The OS refused to start the converter (not found, not executable, …).
    #[error("Failed to launch converter '{program}': {source}\nCheck the converter command configuration.")]
    LaunchFailed {
        program: String,
        #[source]
        source: std::io::Error,
    },

    /// The converter ran and exited unsuccessfully.
    #[error("Converter exited with {status}: {}", stderr_excerpt(.output))]
    ConverterFailed {
        status: String,
        output: CapturedOutput,
    },

    /// The converter did not finish within the configured timeout and was killed.
    /// `output` holds whatever it had written before that.
    #[error("Converter timed out after {secs}s and was terminated")]
    Timeout { secs: u64, output: CapturedOutput },

    /// The converter reported success but the declared archive is absent.
    #[error("Output file not created: '{path}'")]
    MissingArtifact {
        path: PathBuf,
        output: CapturedOutput,
    },

    // ── Output ────────────────────────────────────────────────────────────
    /// The archive exists but could not be read back.
    #[error("Failed to read SCORM package '{path}': {source}")]
    PackagingFailed {
        path: PathBuf,
        #[source]
        source: std::io::Error,
        output: CapturedOutput,
    },

    /// Could not write the archive to its final destination (CLI / `convert_to_file`).
    #[error("Failed to write output file '{path}': {source}")]
    OutputWriteFailed {
        path: PathBuf,
        #[source]
        source: std::io::Error,
    },

    // ── Config errors ─────────────────────────────────────────────────────
    /// Builder validation failed.
    #[error("Invalid configuration: {0}")]
    InvalidConfig(String),
}

impl ScormError {
    /// The machine-readable classification of this error.
    pub fn kind(&self) -> FailureKind {
        match self {
            ScormError::InvalidRequest { .. }
            | ScormError::InvalidEncoding { .. }
            | ScormError::EmptyDocument
            | ScormError::DocumentTooLarge { .. }
            | ScormError::UnsupportedFileType { .. }
            | ScormError::InputReadFailed { .. }
            | ScormError::UnsupportedScormVersion { .. } => FailureKind::ValidationError,
            ScormError::WorkspaceCreation { .. }
            | ScormError::StagingFailed { .. }
            | ScormError::InputMissing { .. }
            | ScormError::OutputWriteFailed { .. }
            | ScormError::InvalidConfig(_) => FailureKind::ResourceError,
            ScormError::LaunchFailed { .. } => FailureKind::LaunchError,
            ScormError::ConverterFailed { .. } => FailureKind::ConverterError,
            ScormError::Timeout { .. } => FailureKind::TimeoutError,
            ScormError::MissingArtifact { .. } => FailureKind::MissingArtifact,
            ScormError::PackagingFailed { .. } => FailureKind::PackagingError,
        }
    }

    /// Converter stdout/stderr captured before the failure, if the converter ran.
    pub fn captured_output(&self) -> Option<&CapturedOutput> {
        match self {
            ScormError::ConverterFailed { output, .. }
            | ScormError::Timeout { output, .. }
            | ScormError::MissingArtifact { output, .. }
            | ScormError::PackagingFailed { output, .. } => Some(output),
            _ => None,
        }
    }

    /// `true` when the caller sent something unusable (HTTP 400).
    pub fn is_client_error(&self) -> bool {
        self.kind() == FailureKind::ValidationError
    }
}

/// Broad failure classification, serialised verbatim into error responses.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
pub enum FailureKind {
    MethodNotAllowed,
    ValidationError,
    ResourceError,
    LaunchError,
    ConverterError,
    MissingArtifact,
    PackagingError,
    TimeoutError,
}

impl FailureKind {
    pub fn as_str(&self) -> &'static str {
        match self {
            FailureKind::MethodNotAllowed => "MethodNotAllowed",
            FailureKind::ValidationError => "ValidationError",
            FailureKind::ResourceError => "ResourceError",
            FailureKind::LaunchError => "LaunchError",
            FailureKind::ConverterError => "ConverterError",
            FailureKind::MissingArtifact => "MissingArtifact",
            FailureKind::PackagingError => "PackagingError",
            FailureKind::TimeoutError => "TimeoutError",
        }
    }
}

impl fmt::Display for FailureKind {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.as_str())
    }
}

/// Standard output and standard error of one converter run, decoded lossily.
#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize, Deserialize)]
pub struct CapturedOutput {
    pub stdout: String,
    pub stderr: String,
}

/// Tail of the converter's stderr, trimmed, for one-line error messages.
fn stderr_excerpt(output: &CapturedOutput) -> String {
    let trimmed = output.stderr.trim();
    if trimmed.is_empty() {
        return "<no stderr>".to_string();
    }
    let count = trimmed.chars().count();
    if count <= STDERR_EXCERPT_CHARS {
        return trimmed.to_string();
    }
    let tail: String = trimmed.chars().skip(count - STDERR_EXCERPT_CHARS).collect();
    format!("\u{2026}{tail}")
}

#[cfg(test)]
mod tests {
    use super::*;

    fn output(stdout: &str, stderr: &str) -> CapturedOutput {
        CapturedOutput {
            stdout: stdout.into(),
            stderr: stderr.into(),
        }
    }

    #[test]
    fn converter_failed_display_quotes_stderr() {
        let e = ScormError::ConverterFailed {
            status: "exit status: 2".into(),
            output: output("", "Traceback: boom\n"),
        };
        let msg = e.to_string();
        assert!(msg.contains("exit status: 2"), "got: {msg}");
        assert!(msg.contains("Traceback: boom"), "got: {msg}");
    }

    #[test]
    fn converter_failed_display_without_stderr() {
        let e = ScormError::ConverterFailed {
            status: "exit status: 1".into(),
            output: CapturedOutput::default(),
        };
        assert!(e.to_string().contains("<no stderr>"));
    }

    #[test]
    fn long_stderr_is_truncated_to_its_tail() {
        let long = format!("{}END", "x".repeat(2000));
        let excerpt = stderr_excerpt(&output("", &long));
        assert!(excerpt.ends_with("END"));
        assert_eq!(excerpt.chars().count(), STDERR_EXCERPT_CHARS + 1);
    }

    #[test]
    fn kinds_are_classified() {
        assert_eq!(ScormError::EmptyDocument.kind(), FailureKind::ValidationError);
        assert_eq!(
            ScormError::Timeout {
                secs: 5,
                output: CapturedOutput::default(),
            }
            .kind(),
            FailureKind::TimeoutError
        );
        assert_eq!(
            ScormError::MissingArtifact {
                path: "/tmp/x/output.zip".into(),
                output: CapturedOutput::default(),
            }
            .kind(),
            FailureKind::MissingArtifact
        );
        assert_eq!(
            ScormError::LaunchFailed {
                program: "nope".into(),
                source: std::io::Error::from(std::io::ErrorKind::NotFound),
            }
            .kind(),
            FailureKind::LaunchError
        );
    }

    #[test]
    fn captured_output_only_after_converter_ran() {
        let ran = ScormError::MissingArtifact {
            path: "/tmp/x/output.zip".into(),
            output: output("wrote nothing", ""),
        };
        assert_eq!(ran.captured_output().unwrap().stdout, "wrote nothing");
        let timed_out = ScormError::Timeout {
            secs: 1,
            output: output("page 1 of 40", ""),
        };
        assert_eq!(timed_out.captured_output().unwrap().stdout, "page 1 of 40");
        assert!(ScormError::InputMissing {
            path: "/tmp/x/input.pdf".into(),
        }
        .captured_output()
        .is_none());
    }

    #[test]
    fn failure_kind_serialises_as_name() {
        let json = serde_json::to_string(&FailureKind::ConverterError).unwrap();
        assert_eq!(json, "\"ConverterError\"");
        assert_eq!(FailureKind::MissingArtifact.to_string(), "MissingArtifact");
    }

    #[test]
    fn too_large_display() {
        let e = ScormError::DocumentTooLarge {
            size: 11,
            limit: 10,
        };
        assert!(e.is_client_error());
        assert!(e.to_string().contains("max 10 bytes"));
    }
}
