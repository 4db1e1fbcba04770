//! Conversion entry points: run the full pipeline for one request.
//!
//! [`convert`] is what the HTTP handlers call: it returns the archive as a
//! base64 [`ScormPackage`]. [`convert_to_file`] serves the CLI: it reads a
//! local document and moves the archive to a destination path instead of
//! encoding it.
//!
//! Both share [`run_in_workspace`], which owns the workspace for the whole
//! run and destroys it on every exit path before the result is returned.

use crate::config::ConverterConfig;
use crate::error::ScormError;
use crate::output::{ConversionOutput, ConversionStats, ScormPackage};
use crate::pipeline::invoke::{self, ConverterInvocation};
use crate::pipeline::validate::{self, Artifact};
use crate::pipeline::workspace::{Workspace, WorkspaceManager};
use crate::pipeline::{package, stage};
use crate::request::{ConversionRequest, SourceKind};
use std::future::Future;
use std::path::Path;
use std::time::Instant;
use tracing::{debug, info, warn};

/// Convert one document to a SCORM package.
///
/// # Errors
/// Every failure after request validation: `ResourceError`, `LaunchError`,
/// `ConverterError`, `MissingArtifact`, `TimeoutError`, `PackagingError`.
/// The workspace is gone by the time this returns, whatever the outcome.
pub async fn convert(
    request: &ConversionRequest,
    config: &ConverterConfig,
) -> Result<ConversionOutput, ScormError> {
    let total_start = Instant::now();
    info!(
        "Starting {} conversion: '{}' ({} bytes, SCORM {})",
        request.source_kind,
        request.title,
        request.document.len(),
        request.scorm_version
    );

    let (package, converter_duration_ms) = run_in_workspace(request, config, |artifact| async move {
        let converter_ms = artifact.converter_duration_ms;
        let package = package::package(artifact, &request.title).await?;
        Ok::<(ScormPackage, u64), ScormError>((package, converter_ms))
    })
    .await?;

    let stats = ConversionStats {
        document_bytes: request.document.len(),
        archive_bytes: package.size_bytes,
        converter_duration_ms,
        total_duration_ms: total_start.elapsed().as_millis() as u64,
    };
    info!(
        "Conversion complete: {} ({} bytes) in {}ms",
        package.filename, stats.archive_bytes, stats.total_duration_ms
    );

    Ok(ConversionOutput {
        source_kind: request.source_kind,
        scorm_version: request.scorm_version,
        package,
        stats,
    })
}

/// Convert a local document and write the archive to `output_path`.
///
/// `kind` is inferred from the input's extension when `None`; `title` falls
/// back to the kind's placeholder. Uses atomic write (temp file + rename) so a
/// failed run never leaves a partial archive behind.
pub async fn convert_to_file(
    input_path: impl AsRef<Path>,
    output_path: impl AsRef<Path>,
    title: Option<&str>,
    kind: Option<SourceKind>,
    config: &ConverterConfig,
) -> Result<ConversionStats, ScormError> {
    let total_start = Instant::now();
    let input_path = input_path.as_ref();
    let output_path = output_path.as_ref();

    let kind = match kind {
        Some(k) => k,
        None => SourceKind::from_path(input_path)?,
    };
    let document = tokio::fs::read(input_path)
        .await
        .map_err(|source| ScormError::InputReadFailed {
            path: input_path.to_path_buf(),
            source,
        })?;
    if document.len() > config.max_document_bytes {
        return Err(ScormError::DocumentTooLarge {
            size: document.len(),
            limit: config.max_document_bytes,
        });
    }
    let request = ConversionRequest::new(document, title, kind, config.default_scorm_version)?;

    let (archive_bytes, converter_duration_ms) =
        run_in_workspace(&request, config, |artifact| async move {
            let converter_ms = artifact.converter_duration_ms;
            let bytes = move_artifact(&artifact, output_path).await?;
            Ok::<(u64, u64), ScormError>((bytes, converter_ms))
        })
        .await?;

    Ok(ConversionStats {
        document_bytes: request.document.len(),
        archive_bytes: archive_bytes as usize,
        converter_duration_ms,
        total_duration_ms: total_start.elapsed().as_millis() as u64,
    })
}

// ── Internal helpers ─────────────────────────────────────────────────────

/// Create a workspace, stage, invoke, validate, hand the artifact to
/// `finish`, then destroy the workspace whatever happened.
async fn run_in_workspace<T, F, Fut>(
    request: &ConversionRequest,
    config: &ConverterConfig,
    finish: F,
) -> Result<T, ScormError>
where
    F: FnOnce(Artifact) -> Fut,
    Fut: Future<Output = Result<T, ScormError>>,
{
    let workspace = WorkspaceManager::new(&config.temp_root).create(request.source_kind)?;
    if let Some(ref cb) = config.progress_callback {
        cb.on_workspace_created(workspace.path());
    }

    let result = match produce_artifact(request, config, &workspace).await {
        Ok(artifact) => finish(artifact).await,
        Err(e) => Err(e),
    };

    workspace.destroy();

    if let Some(ref cb) = config.progress_callback {
        let message = result.as_ref().err().map(ToString::to_string);
        cb.on_conversion_complete(request.source_kind, message.as_deref());
    }
    if let Err(ref e) = result {
        warn!("{} conversion failed ({}): {}", request.source_kind, e.kind(), e);
    }
    result
}

/// Stages 2–4: stage the document, run the converter, validate its output.
async fn produce_artifact(
    request: &ConversionRequest,
    config: &ConverterConfig,
    workspace: &Workspace,
) -> Result<Artifact, ScormError> {
    let input_path = stage::stage(workspace, &request.document, request.source_kind).await?;
    let output_path = workspace.output_path();

    let invocation = ConverterInvocation::new(
        config.converter_for(request.source_kind),
        request,
        &input_path,
        &output_path,
        config.extract_images,
    );

    if let Some(ref cb) = config.progress_callback {
        cb.on_converter_start(request.source_kind, &request.title);
    }
    let run = invoke::invoke(&invocation, config.timeout()).await;
    if let Some(ref cb) = config.progress_callback {
        match &run {
            Ok(r) => cb.on_converter_exit(r.success(), r.duration_ms),
            Err(_) => cb.on_converter_exit(false, 0),
        }
    }

    validate::validate(invocation.output_path(), run?).await
}

/// Copy the artifact next to `dest` and rename it into place.
async fn move_artifact(artifact: &Artifact, dest: &Path) -> Result<u64, ScormError> {
    let write_err = |source: std::io::Error| ScormError::OutputWriteFailed {
        path: dest.to_path_buf(),
        source,
    };

    if let Some(parent) = dest.parent().filter(|p| !p.as_os_str().is_empty()) {
        tokio::fs::create_dir_all(parent).await.map_err(write_err)?;
    }

    let tmp_path = dest.with_extension("zip.tmp");
    let bytes = tokio::fs::copy(&artifact.path, &tmp_path)
        .await
        .map_err(write_err)?;
    if let Err(e) = tokio::fs::rename(&tmp_path, dest).await {
        let _ = tokio::fs::remove_file(&tmp_path).await;
        return Err(write_err(e));
    }

    debug!("Wrote {} bytes to {}", bytes, dest.display());
    Ok(bytes)
}
