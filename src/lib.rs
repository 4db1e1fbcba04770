//! # doc2scorm
//!
//! Turn HTML or PDF documents into SCORM e-learning packages by driving an
//! external converter program.
//!
//! The crate does not build SCORM archives itself. It owns everything around
//! the converter: request validation, a private scratch directory per
//! conversion, a safe argument vector, exit-status and artifact checks, the
//! base64 response, and unconditional cleanup.
//!
//! ## Pipeline Overview
//!
//! ```text
//! POST { fileContent, title, scormVersion }
//!  │
//!  ├─ 1. Decode     base64 → bytes (400 on bad input, no workspace yet)
//!  ├─ 2. Workspace  unique temp dir: scorm-<kind>-converter-<ms>-XXXXXX
//!  ├─ 3. Stage      write input.html / input.pdf
//!  ├─ 4. Invoke     <converter> input --output output.zip --title … (no shell)
//!  ├─ 5. Validate   exit status, then archive presence
//!  ├─ 6. Package    base64 content + <Title>_scorm.zip
//!  └─ 7. Cleanup    workspace removed on every path
//! ```
//!
//! ## Quick Start
//!
//! ```rust,no_run
//! use doc2scorm::{convert, ConversionRequest, ConverterCommand, ConverterConfig, ScormVersion, SourceKind};
//!
//! #[tokio::main]
//! async fn main() -> Result<(), Box<dyn std::error::Error>> {
//!     let config = ConverterConfig::builder()
//!         .html_converter(ConverterCommand::parse("python3 scorm_converter/html_converter.py")?)
//!         .build()?;
//!     let html = std::fs::read("lesson.html")?;
//!     let request = ConversionRequest::new(html, Some("Lesson 1"), SourceKind::Html, ScormVersion::Scorm2004)?;
//!     let output = convert(&request, &config).await?;
//!     println!("{} ({} bytes)", output.package.filename, output.package.size_bytes);
//!     Ok(())
//! }
//! ```
//!
//! ## Feature Flags
//!
//! | Feature | Default | Description |
//! |---------|---------|-------------|
//! | `cli`   | on      | Enables the `doc2scorm` binary (clap + anyhow + tracing-subscriber + indicatif) |
//!
//! The HTTP service lives in [`api`] and is always available; the binary's
//! `serve` subcommand only binds it to a socket.

// ── Modules ──────────────────────────────────────────────────────────────

pub mod api;
pub mod config;
pub mod convert;
pub mod error;
pub mod output;
pub mod pipeline;
pub mod progress;
pub mod request;

// ── Re-exports ───────────────────────────────────────────────────────────

pub use config::{ConverterCommand, ConverterConfig, ConverterConfigBuilder};
pub use convert::{convert, convert_to_file};
pub use error::{CapturedOutput, FailureKind, ScormError};
pub use output::{ConversionOutput, ConversionStats, ScormPackage};
pub use pipeline::package::safe_filename;
pub use progress::{ConversionProgressCallback, NoopProgressCallback, ProgressCallback};
pub use request::{ConversionRequest, ScormVersion, SourceKind};
