//! Pipeline stages for document-to-SCORM conversion.
//!
//! Each submodule implements exactly one step; [`crate::convert`] composes
//! them.
//!
//! ## Data Flow
//!
//! ```text
//! workspace ──▶ stage ──▶ invoke ──▶ validate ──▶ package ──▶ workspace
//! (create)     (write)   (child)    (classify)   (base64)    (destroy)
//! ```
//!
//! 1. [`workspace`] — allocate a uniquely named per-request temp directory
//! 2. [`stage`]     — decode the base64 payload, write it as `input.<ext>`
//! 3. [`invoke`]    — run the external converter with a discrete argv,
//!    capture stdout/stderr/exit status, enforce the timeout
//! 4. [`validate`]  — classify exit failures and missing archives
//! 5. [`package`]   — read the archive, base64 it, derive a safe filename

pub mod invoke;
pub mod package;
pub mod stage;
pub mod validate;
pub mod workspace;
