//! Converter invocation: run the external converter as a child process.
//!
//! The converter is an opaque program with a fixed CLI contract:
//!
//! ```text
//! <program> [leading args…] <input> --output <output> --title <title>
//!           --scorm-version <1.2|2004> [--extract-images]
//! ```
//!
//! Arguments are handed to the OS as a vector through
//! [`tokio::process::Command::args`]; no shell ever sees them, so a title like
//! `"x; rm -rf ~"` arrives at the converter as one literal argument.
//!
//! This stage captures exit status, stdout and stderr verbatim and leaves
//! their interpretation to [`crate::pipeline::validate`]. The only failures it
//! reports itself are the ones where no exit status exists: the process could
//! not be launched, or it ran past the timeout and was killed.

use crate::config::ConverterCommand;
use crate::error::{CapturedOutput, ScormError};
use crate::request::{ConversionRequest, SourceKind};
use std::ffi::{OsStr, OsString};
use std::path::{Path, PathBuf};
use std::process::{ExitStatus, Stdio};
use std::sync::{Arc, Mutex, PoisonError};
use std::time::{Duration, Instant};
use tokio::io::{AsyncRead, AsyncReadExt};
use tokio::process::Command;
use tokio::task::JoinHandle;
use tracing::{debug, info, warn};

/// A fully resolved converter command line for one request.
#[derive(Debug, Clone)]
pub struct ConverterInvocation {
    program: String,
    args: Vec<OsString>,
    input_path: PathBuf,
    output_path: PathBuf,
}

impl ConverterInvocation {
    /// Build the argument vector for `request`.
    ///
    /// The vector depends only on the configured command, the workspace paths,
    /// and the request's kind, title and SCORM version.
    pub fn new(
        command: &ConverterCommand,
        request: &ConversionRequest,
        input_path: &Path,
        output_path: &Path,
        extract_images: bool,
    ) -> Self {
        let mut args: Vec<OsString> = command.args.iter().map(OsString::from).collect();
        args.push(input_path.as_os_str().to_owned());
        args.push("--output".into());
        args.push(output_path.as_os_str().to_owned());
        args.push("--title".into());
        args.push(OsString::from(&request.title));
        args.push("--scorm-version".into());
        args.push(request.scorm_version.as_arg().into());
        args.extend(kind_flags(request.source_kind, extract_images).map(OsString::from));

        Self {
            program: command.program.clone(),
            args,
            input_path: input_path.to_path_buf(),
            output_path: output_path.to_path_buf(),
        }
    }

    pub fn program(&self) -> &str {
        &self.program
    }

    pub fn args(&self) -> &[OsString] {
        &self.args
    }

    pub fn input_path(&self) -> &Path {
        &self.input_path
    }

    pub fn output_path(&self) -> &Path {
        &self.output_path
    }

    /// The command line rendered for log output only.
    pub fn display_command(&self) -> String {
        let mut words = vec![self.program.clone()];
        words.extend(self.args.iter().map(|a| a.to_string_lossy().into_owned()));
        shell_words::join(words)
    }
}

/// Extra flags that only apply to one source kind.
fn kind_flags(kind: SourceKind, extract_images: bool) -> impl Iterator<Item = &'static str> {
    let flags: &'static [&'static str] = match kind {
        SourceKind::Pdf if extract_images => &["--extract-images"],
        SourceKind::Pdf | SourceKind::Html => &[],
    };
    flags.iter().copied()
}

/// Everything observed about one finished converter process.
#[derive(Debug, Clone)]
pub struct ConverterRun {
    pub status: ExitStatus,
    pub output: CapturedOutput,
    pub duration_ms: u64,
}

impl ConverterRun {
    pub fn success(&self) -> bool {
        self.status.success()
    }
}

/// Run the converter to completion.
///
/// # Errors
/// - [`ScormError::InputMissing`] — the staged input is gone; nothing is launched
/// - [`ScormError::LaunchFailed`] — the OS could not start the program
/// - [`ScormError::Timeout`] — `timeout` elapsed; the child has been killed and
///   the output it produced so far is attached
///
/// A non-zero exit status is **not** an error here; it is returned in
/// [`ConverterRun::status`].
pub async fn invoke(
    invocation: &ConverterInvocation,
    timeout: Option<Duration>,
) -> Result<ConverterRun, ScormError> {
    if !tokio::fs::try_exists(invocation.input_path())
        .await
        .unwrap_or(false)
    {
        return Err(ScormError::InputMissing {
            path: invocation.input_path().to_path_buf(),
        });
    }

    info!("Running converter: {}", invocation.display_command());

    let mut cmd = Command::new(OsStr::new(invocation.program()));
    cmd.args(invocation.args())
        .stdin(Stdio::null())
        .stdout(Stdio::piped())
        .stderr(Stdio::piped())
        .kill_on_drop(true);

    let start = Instant::now();
    let mut child = cmd.spawn().map_err(|source| ScormError::LaunchFailed {
        program: invocation.program().to_string(),
        source,
    })?;

    let mut stdout = PipeCapture::start(child.stdout.take());
    let mut stderr = PipeCapture::start(child.stderr.take());

    let completion = async {
        let status = child.wait().await;
        stdout.drain().await;
        stderr.drain().await;
        status
    };
    let finished = match timeout {
        Some(limit) => tokio::time::timeout(limit, completion).await.ok(),
        None => Some(completion.await),
    };

    let Some(waited) = finished else {
        let limit = timeout.unwrap_or_default();
        if let Err(e) = child.kill().await {
            warn!("Failed to kill converter '{}': {}", invocation.program(), e);
        }
        // Grandchildren may keep the pipes open; take what has arrived so far.
        let _ = tokio::time::timeout(DRAIN_GRACE, async {
            stdout.drain().await;
            stderr.drain().await;
        })
        .await;
        warn!(
            "Converter '{}' exceeded {}ms; killed",
            invocation.program(),
            limit.as_millis()
        );
        return Err(ScormError::Timeout {
            secs: limit.as_secs(),
            output: CapturedOutput {
                stdout: stdout.finish(),
                stderr: stderr.finish(),
            },
        });
    };

    let status = waited.map_err(|source| ScormError::LaunchFailed {
        program: invocation.program().to_string(),
        source,
    })?;
    let duration_ms = start.elapsed().as_millis() as u64;

    let captured = CapturedOutput {
        stdout: stdout.finish(),
        stderr: stderr.finish(),
    };
    debug!("Converter stdout: {}", captured.stdout.trim_end());
    if !captured.stderr.is_empty() {
        debug!("Converter stderr: {}", captured.stderr.trim_end());
    }
    info!("Converter finished with {} in {}ms", status, duration_ms);

    Ok(ConverterRun {
        status,
        output: captured,
        duration_ms,
    })
}

/// How long to keep reading a killed converter's pipes.
const DRAIN_GRACE: Duration = Duration::from_millis(500);

/// Accumulates one child pipe in the background so partial output survives a
/// timeout.
struct PipeCapture {
    buf: Arc<Mutex<Vec<u8>>>,
    reader: Option<JoinHandle<()>>,
}

impl PipeCapture {
    fn start<R>(pipe: Option<R>) -> Self
    where
        R: AsyncRead + Unpin + Send + 'static,
    {
        let buf = Arc::new(Mutex::new(Vec::new()));
        let reader = pipe.map(|mut pipe| {
            let buf = Arc::clone(&buf);
            tokio::spawn(async move {
                let mut chunk = [0u8; 8192];
                loop {
                    match pipe.read(&mut chunk).await {
                        Ok(0) | Err(_) => break,
                        Ok(n) => buf
                            .lock()
                            .unwrap_or_else(PoisonError::into_inner)
                            .extend_from_slice(&chunk[..n]),
                    }
                }
            })
        });
        Self { buf, reader }
    }

    /// Wait until the pipe reaches EOF.
    async fn drain(&mut self) {
        if let Some(reader) = self.reader.as_mut() {
            let _ = reader.await;
            self.reader = None;
        }
    }

    /// Stop reading and decode what was captured (lossy UTF-8).
    fn finish(&mut self) -> String {
        if let Some(reader) = self.reader.take() {
            reader.abort();
        }
        let bytes = self.buf.lock().unwrap_or_else(PoisonError::into_inner);
        String::from_utf8_lossy(&bytes).into_owned()
    }
}
