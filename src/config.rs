//! Configuration types for document-to-SCORM conversion.
//!
//! All pipeline behaviour is controlled through [`ConverterConfig`], built via
//! its [`ConverterConfigBuilder`]. The config is read-only once built and is
//! shared between concurrent requests behind an `Arc`.

use crate::error::ScormError;
use crate::progress::ProgressCallback;
use crate::request::{ScormVersion, SourceKind};
use serde::{Deserialize, Serialize};
use std::fmt;
use std::path::PathBuf;
use std::time::Duration;

/// Default HTML converter command line.
pub const DEFAULT_HTML_CONVERTER: &str = "python3 scorm_converter/html_converter.py";

/// Default PDF converter command line.
///
/// That script extracts images unless given `--no-images` and rejects
/// `--extract-images`; run it with `extract_images(false)`
/// (`--no-extract-images` on the CLI).
pub const DEFAULT_PDF_CONVERTER: &str = "python3 api/scripts/pdf_converter.py";

/// Largest decoded document accepted by default (10 MiB).
pub const DEFAULT_MAX_DOCUMENT_BYTES: usize = 10 * 1024 * 1024;

/// An external converter: the program plus any fixed leading arguments
/// (typically an interpreter and a script path).
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct ConverterCommand {
    pub program: String,
    pub args: Vec<String>,
}

impl ConverterCommand {
    pub fn new(program: impl Into<String>) -> Self {
        Self {
            program: program.into(),
            args: Vec::new(),
        }
    }

    /// Append a fixed leading argument.
    pub fn arg(mut self, arg: impl Into<String>) -> Self {
        self.args.push(arg.into());
        self
    }

    /// Split an operator-supplied command line (`python3 "my dir/conv.py"`)
    /// into program and leading arguments using POSIX shell quoting rules.
    ///
    /// The split happens once, at configuration time. Request data never
    /// passes through here.
    pub fn parse(command_line: &str) -> Result<Self, ScormError> {
        let mut words = shell_words::split(command_line).map_err(|e| {
            ScormError::InvalidConfig(format!("Cannot parse converter command '{command_line}': {e}"))
        })?;
        if words.is_empty() {
            return Err(ScormError::InvalidConfig(
                "Converter command must not be empty".into(),
            ));
        }
        let program = words.remove(0);
        Ok(Self {
            program,
            args: words,
        })
    }
}

impl fmt::Display for ConverterCommand {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        let mut words = vec![self.program.as_str()];
        words.extend(self.args.iter().map(String::as_str));
        f.write_str(&shell_words::join(words))
    }
}

/// Configuration for the conversion pipeline.
///
/// # Example
/// ```rust
/// use doc2scorm::{ConverterCommand, ConverterConfig};
///
/// let config = ConverterConfig::builder()
///     .pdf_converter(ConverterCommand::new("python3").arg("tools/pdf_converter.py"))
///     .timeout_secs(60)
///     .build()
///     .unwrap();
/// assert_eq!(config.timeout_secs, 60);
/// ```
#[derive(Clone)]
pub struct ConverterConfig {
    /// Converter used for HTML sources.
    pub html_converter: ConverterCommand,

    /// Converter used for PDF sources.
    pub pdf_converter: ConverterCommand,

    /// Directory under which per-request workspaces are created.
    /// Default: the platform temp directory.
    pub temp_root: PathBuf,

    /// Wall-clock limit for one converter run in seconds; `0` disables it.
    /// Default: 120.
    pub timeout_secs: u64,

    /// Largest decoded document accepted. Default: 10 MiB.
    pub max_document_bytes: usize,

    /// SCORM version used when a request does not name one. Default: 2004.
    pub default_scorm_version: ScormVersion,

    /// Pass `--extract-images` to the PDF converter. Default: true.
    pub extract_images: bool,

    /// Optional stage-event observer.
    pub progress_callback: Option<ProgressCallback>,
}

impl Default for ConverterConfig {
    fn default() -> Self {
        Self {
            html_converter: ConverterCommand::parse(DEFAULT_HTML_CONVERTER)
                .unwrap_or_else(|_| ConverterCommand::new("python3")),
            pdf_converter: ConverterCommand::parse(DEFAULT_PDF_CONVERTER)
                .unwrap_or_else(|_| ConverterCommand::new("python3")),
            temp_root: std::env::temp_dir(),
            timeout_secs: 120,
            max_document_bytes: DEFAULT_MAX_DOCUMENT_BYTES,
            default_scorm_version: ScormVersion::default(),
            extract_images: true,
            progress_callback: None,
        }
    }
}

impl fmt::Debug for ConverterConfig {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("ConverterConfig")
            .field("html_converter", &self.html_converter)
            .field("pdf_converter", &self.pdf_converter)
            .field("temp_root", &self.temp_root)
            .field("timeout_secs", &self.timeout_secs)
            .field("max_document_bytes", &self.max_document_bytes)
            .field("default_scorm_version", &self.default_scorm_version)
            .field("extract_images", &self.extract_images)
            .field(
                "progress_callback",
                &self
                    .progress_callback
                    .as_ref()
                    .map(|_| "<dyn ConversionProgressCallback>"),
            )
            .finish()
    }
}

impl ConverterConfig {
    /// Create a new builder for `ConverterConfig`.
    pub fn builder() -> ConverterConfigBuilder {
        ConverterConfigBuilder {
            config: Self::default(),
        }
    }

    /// The converter responsible for `kind`.
    pub fn converter_for(&self, kind: SourceKind) -> &ConverterCommand {
        match kind {
            SourceKind::Html => &self.html_converter,
            SourceKind::Pdf => &self.pdf_converter,
        }
    }

    /// The converter timeout, or `None` when unbounded.
    pub fn timeout(&self) -> Option<Duration> {
        (self.timeout_secs > 0).then(|| Duration::from_secs(self.timeout_secs))
    }

    /// Largest HTTP body that can carry a maximum-size document:
    /// base64 expansion (4/3) plus 64 KiB for the JSON envelope.
    pub fn max_request_body_bytes(&self) -> usize {
        self.max_document_bytes
            .saturating_add(2)
            .saturating_div(3)
            .saturating_mul(4)
            .saturating_add(64 * 1024)
    }
}

/// Builder for [`ConverterConfig`].
#[derive(Debug)]
pub struct ConverterConfigBuilder {
    config: ConverterConfig,
}

impl ConverterConfigBuilder {
    pub fn html_converter(mut self, command: ConverterCommand) -> Self {
        self.config.html_converter = command;
        self
    }

    pub fn pdf_converter(mut self, command: ConverterCommand) -> Self {
        self.config.pdf_converter = command;
        self
    }

    /// Use the same converter for every source kind.
    pub fn converter(self, command: ConverterCommand) -> Self {
        self.html_converter(command.clone()).pdf_converter(command)
    }

    pub fn temp_root(mut self, root: impl Into<PathBuf>) -> Self {
        self.config.temp_root = root.into();
        self
    }

    pub fn timeout_secs(mut self, secs: u64) -> Self {
        self.config.timeout_secs = secs;
        self
    }

    pub fn max_document_bytes(mut self, n: usize) -> Self {
        self.config.max_document_bytes = n;
        self
    }

    pub fn default_scorm_version(mut self, version: ScormVersion) -> Self {
        self.config.default_scorm_version = version;
        self
    }

    pub fn extract_images(mut self, v: bool) -> Self {
        self.config.extract_images = v;
        self
    }

    pub fn progress_callback(mut self, cb: ProgressCallback) -> Self {
        self.config.progress_callback = Some(cb);
        self
    }

    /// Build the configuration, validating constraints.
    pub fn build(self) -> Result<ConverterConfig, ScormError> {
        let c = &self.config;
        for (kind, cmd) in [
            (SourceKind::Html, &c.html_converter),
            (SourceKind::Pdf, &c.pdf_converter),
        ] {
            if cmd.program.trim().is_empty() {
                return Err(ScormError::InvalidConfig(format!(
                    "{kind} converter program must not be empty"
                )));
            }
        }
        if c.max_document_bytes == 0 {
            return Err(ScormError::InvalidConfig(
                "Maximum document size must be ≥ 1 byte".into(),
            ));
        }
        if c.temp_root.as_os_str().is_empty() {
            return Err(ScormError::InvalidConfig(
                "Temp root must not be empty".into(),
            ));
        }
        Ok(self.config)
    }
}
