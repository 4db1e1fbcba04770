//! Response packaging: archive file → base64 content + safe download filename.

use crate::error::ScormError;
use crate::output::ScormPackage;
use crate::pipeline::validate::Artifact;
use base64::{engine::general_purpose::STANDARD, Engine as _};
use once_cell::sync::Lazy;
use regex::Regex;
use tracing::debug;

/// Suffix appended to every derived filename.
pub const PACKAGE_SUFFIX: &str = "_scorm.zip";

static RE_UNSAFE_CHAR: Lazy<Regex> = Lazy::new(|| Regex::new(r"[^A-Za-z0-9]").unwrap());

/// Replace every character outside `[A-Za-z0-9]` with `_`, one for one.
///
/// Idempotent: sanitising an already sanitised title is a no-op.
pub fn sanitize_title(title: &str) -> String {
    RE_UNSAFE_CHAR.replace_all(title, "_").into_owned()
}

/// `"My Course: 2024!"` → `"My_Course__2024__scorm.zip"`.
pub fn safe_filename(title: &str) -> String {
    format!("{}{}", sanitize_title(title), PACKAGE_SUFFIX)
}

/// Read the artifact and encode it for transport.
///
/// # Errors
/// [`ScormError::PackagingFailed`] when the archive cannot be read; the
/// converter's captured output is carried along.
pub async fn package(artifact: Artifact, title: &str) -> Result<ScormPackage, ScormError> {
    let bytes = match tokio::fs::read(&artifact.path).await {
        Ok(b) => b,
        Err(source) => {
            return Err(ScormError::PackagingFailed {
                path: artifact.path,
                source,
                output: artifact.output,
            })
        }
    };

    let content = STANDARD.encode(&bytes);
    let filename = safe_filename(title);
    debug!(
        "Packaged {} ({} bytes → {} base64 chars)",
        filename,
        bytes.len(),
        content.len()
    );

    Ok(ScormPackage {
        filename,
        content,
        size_bytes: bytes.len(),
    })
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::error::{CapturedOutput, FailureKind};
    use tempfile::TempDir;

    fn artifact(path: std::path::PathBuf) -> Artifact {
        Artifact {
            path,
            output: CapturedOutput {
                stdout: "done\n".into(),
                stderr: String::new(),
            },
            converter_duration_ms: 1,
        }
    }

    #[test]
    fn filename_examples() {
        assert_eq!(safe_filename("My Course: 2024!"), "My_Course__2024__scorm.zip");
        assert_eq!(safe_filename("Demo"), "Demo_scorm.zip");
        assert_eq!(safe_filename("../../etc/passwd"), "______etc_passwd_scorm.zip");
        assert_eq!(safe_filename("a\r\nb"), "a__b_scorm.zip");
        assert_eq!(safe_filename(""), "_scorm.zip");
    }

    #[test]
    fn non_ascii_characters_become_one_underscore_each() {
        assert_eq!(sanitize_title("Курс 1"), "_____1");
        assert_eq!(sanitize_title("café"), "caf_");
    }

    #[test]
    fn sanitize_is_idempotent() {
        for title in ["My Course: 2024!", "Курс з PDF", "plain", "a/b\\c"] {
            let once = sanitize_title(title);
            assert_eq!(sanitize_title(&once), once);
        }
    }

    #[tokio::test]
    async fn round_trip_is_byte_identical() {
        let dir = TempDir::new().unwrap();
        let path = dir.path().join("output.zip");
        let original: Vec<u8> = (0u8..=255).cycle().take(4096).collect();
        std::fs::write(&path, &original).unwrap();

        let pkg = package(artifact(path), "Round Trip").await.unwrap();
        assert_eq!(pkg.filename, "Round_Trip_scorm.zip");
        assert_eq!(pkg.size_bytes, original.len());
        assert_eq!(STANDARD.decode(&pkg.content).unwrap(), original);
    }

    #[tokio::test]
    async fn unreadable_artifact_is_packaging_error() {
        let dir = TempDir::new().unwrap();
        let err = package(artifact(dir.path().join("gone.zip")), "Demo")
            .await
            .unwrap_err();
        assert_eq!(err.kind(), FailureKind::PackagingError);
        assert_eq!(err.captured_output().unwrap().stdout, "done\n");
    }
}
