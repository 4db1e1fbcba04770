//! The validated, in-memory form of one conversion request.
//!
//! A [`ConversionRequest`] is built once from the inbound message and lives
//! only for one pipeline run. The two source kinds the service supports share
//! a single pipeline; everything that differs between them (input filename,
//! converter command, extra flags, placeholder title) hangs off [`SourceKind`].

use crate::error::ScormError;
use serde::{Deserialize, Serialize};
use std::fmt;
use std::path::Path;
use std::str::FromStr;

/// The kind of document being converted.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum SourceKind {
    Html,
    Pdf,
}

impl SourceKind {
    /// Fixed filename the document is staged under inside the workspace.
    pub fn input_filename(&self) -> &'static str {
        match self {
            SourceKind::Html => "input.html",
            SourceKind::Pdf => "input.pdf",
        }
    }

    /// Course title used when the request carries none.
    pub fn default_title(&self) -> &'static str {
        match self {
            SourceKind::Html => "SCORM Course from HTML",
            SourceKind::Pdf => "SCORM Course from PDF",
        }
    }

    /// Lower-case slug used in workspace names and log lines.
    pub fn slug(&self) -> &'static str {
        match self {
            SourceKind::Html => "html",
            SourceKind::Pdf => "pdf",
        }
    }

    /// Human label ("HTML", "PDF").
    pub fn label(&self) -> &'static str {
        match self {
            SourceKind::Html => "HTML",
            SourceKind::Pdf => "PDF",
        }
    }

    /// Map a `fileType` value (`html`, `htm`, `pdf`, any case) to a kind.
    pub fn from_file_type(file_type: &str) -> Result<Self, ScormError> {
        match file_type.trim().to_ascii_lowercase().as_str() {
            "html" | "htm" => Ok(SourceKind::Html),
            "pdf" => Ok(SourceKind::Pdf),
            _ => Err(ScormError::UnsupportedFileType {
                file_type: file_type.to_string(),
            }),
        }
    }

    /// Infer the kind from a file extension.
    pub fn from_path(path: &Path) -> Result<Self, ScormError> {
        let ext = path
            .extension()
            .and_then(|e| e.to_str())
            .unwrap_or_default();
        Self::from_file_type(ext)
    }
}

impl fmt::Display for SourceKind {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.label())
    }
}

/// SCORM edition the converter is asked to target.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Default, Serialize, Deserialize)]
pub enum ScormVersion {
    #[serde(rename = "1.2")]
    Scorm12,
    /// SCORM 2004 (default).
    #[default]
    #[serde(rename = "2004")]
    Scorm2004,
}

impl ScormVersion {
    /// Value passed to the converter's `--scorm-version` flag.
    pub fn as_arg(&self) -> &'static str {
        match self {
            ScormVersion::Scorm12 => "1.2",
            ScormVersion::Scorm2004 => "2004",
        }
    }
}

impl FromStr for ScormVersion {
    type Err = ScormError;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        match s.trim() {
            "1.2" | "12" => Ok(ScormVersion::Scorm12),
            "2004" => Ok(ScormVersion::Scorm2004),
            other => Err(ScormError::UnsupportedScormVersion {
                version: other.to_string(),
            }),
        }
    }
}

impl fmt::Display for ScormVersion {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.as_arg())
    }
}

/// A decoded, validated conversion request.
#[derive(Debug, Clone)]
pub struct ConversionRequest {
    /// Raw document bytes (never empty).
    pub document: Vec<u8>,
    /// Course title (never blank).
    pub title: String,
    pub source_kind: SourceKind,
    pub scorm_version: ScormVersion,
}

impl ConversionRequest {
    /// Build a request, applying the kind-specific placeholder title when
    /// `title` is absent or blank. Any other title is kept byte for byte.
    ///
    /// # Errors
    /// [`ScormError::EmptyDocument`] when `document` is empty.
    pub fn new(
        document: Vec<u8>,
        title: Option<&str>,
        source_kind: SourceKind,
        scorm_version: ScormVersion,
    ) -> Result<Self, ScormError> {
        if document.is_empty() {
            return Err(ScormError::EmptyDocument);
        }
        let title = match title {
            Some(t) if !t.trim().is_empty() => t.to_string(),
            _ => source_kind.default_title().to_string(),
        };
        Ok(Self {
            document,
            title,
            source_kind,
            scorm_version,
        })
    }
}
