//! Results returned by the conversion entry points.

use crate::request::{ScormVersion, SourceKind};
use serde::{Deserialize, Serialize};

/// A SCORM archive encoded for transport.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct ScormPackage {
    /// Download filename derived from the course title, e.g. `Demo_scorm.zip`.
    pub filename: String,
    /// The archive bytes, standard base64.
    pub content: String,
    /// Size of the decoded archive.
    pub size_bytes: usize,
}

/// Timing and size figures for one conversion.
#[derive(Debug, Clone, Default, Serialize, Deserialize)]
pub struct ConversionStats {
    pub document_bytes: usize,
    pub archive_bytes: usize,
    pub converter_duration_ms: u64,
    pub total_duration_ms: u64,
}

/// Result of a successful [`crate::convert::convert`] call.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct ConversionOutput {
    pub source_kind: SourceKind,
    pub scorm_version: ScormVersion,
    pub package: ScormPackage,
    pub stats: ConversionStats,
}
