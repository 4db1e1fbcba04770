//! Payload staging: base64 document → file on disk inside the workspace.
//!
//! Decoding happens before the workspace exists, so a malformed payload is
//! rejected as a `ValidationError` without touching the filesystem. Writing
//! happens afterwards and always targets the kind's fixed input filename.

use crate::error::ScormError;
use crate::pipeline::workspace::Workspace;
use crate::request::SourceKind;
use base64::{engine::general_purpose::STANDARD, Engine as _};
use std::path::PathBuf;
use tracing::debug;

/// Decode the transport-encoded document.
///
/// Accepts standard base64, optionally wrapped in a `data:<mime>;base64,`
/// prefix and/or broken into lines (MIME style). The decoded size must be
/// between 1 and `max_bytes`.
pub fn decode_document(encoded: &str, max_bytes: usize) -> Result<Vec<u8>, ScormError> {
    let payload = strip_data_url(encoded.trim());

    let compact: String;
    let payload = if payload.contains(|c: char| c.is_ascii_whitespace()) {
        compact = payload
            .chars()
            .filter(|c| !c.is_ascii_whitespace())
            .collect();
        compact.as_str()
    } else {
        payload
    };

    // n base64 characters decode to at most 3n/4 bytes (minus padding);
    // reject oversized payloads before allocating for them.
    let padding = payload.bytes().rev().take_while(|&b| b == b'=').count();
    let upper_bound = (payload.len() / 4 * 3).saturating_sub(padding.min(2));
    if upper_bound > max_bytes {
        return Err(ScormError::DocumentTooLarge {
            size: upper_bound,
            limit: max_bytes,
        });
    }

    let bytes = STANDARD
        .decode(payload)
        .map_err(|e| ScormError::InvalidEncoding {
            detail: e.to_string(),
        })?;

    if bytes.is_empty() {
        return Err(ScormError::EmptyDocument);
    }
    if bytes.len() > max_bytes {
        return Err(ScormError::DocumentTooLarge {
            size: bytes.len(),
            limit: max_bytes,
        });
    }
    Ok(bytes)
}

/// `data:application/pdf;base64,JVBER…` → `JVBER…`
fn strip_data_url(s: &str) -> &str {
    if s.starts_with("data:") {
        if let Some((_, rest)) = s.split_once(";base64,") {
            return rest;
        }
    }
    s
}

/// Write `document` into `workspace` under the input filename for `kind`.
///
/// # Returns
/// The path of the staged file.
pub async fn stage(
    workspace: &Workspace,
    document: &[u8],
    kind: SourceKind,
) -> Result<PathBuf, ScormError> {
    let path = workspace.input_path(kind);
    tokio::fs::write(&path, document)
        .await
        .map_err(|source| ScormError::StagingFailed {
            path: path.clone(),
            source,
        })?;
    debug!("Staged {} bytes at {}", document.len(), path.display());
    Ok(path)
}
