//! CLI binary for doc2scorm.
//!
//! A thin shim over the library crate: `serve` binds the HTTP service,
//! `convert` runs one local document through the same pipeline.

use anyhow::{Context, Result};
use clap::{Args, Parser, Subcommand};
use doc2scorm::config::{DEFAULT_HTML_CONVERTER, DEFAULT_MAX_DOCUMENT_BYTES, DEFAULT_PDF_CONVERTER};
use doc2scorm::{
    api, convert_to_file, safe_filename, ConversionProgressCallback, ConverterCommand,
    ConverterConfig, ProgressCallback, ScormVersion, SourceKind,
};
use indicatif::{ProgressBar, ProgressStyle};
use std::io;
use std::path::{Path, PathBuf};
use std::sync::Arc;
use std::time::Duration;
use tracing_subscriber::EnvFilter;

// ── ANSI colour helpers (no extra deps) ──────────────────────────────────────

fn green(s: &str) -> String {
    format!("\x1b[32m{s}\x1b[0m")
}
fn red(s: &str) -> String {
    format!("\x1b[31m{s}\x1b[0m")
}
fn dim(s: &str) -> String {
    format!("\x1b[2m{s}\x1b[0m")
}
fn bold(s: &str) -> String {
    format!("\x1b[1m{s}\x1b[0m")
}

// ── CLI progress callback using indicatif ────────────────────────────────────

/// Terminal spinner that follows one conversion through its stages.
struct CliProgressCallback {
    bar: ProgressBar,
}

impl CliProgressCallback {
    fn new() -> Arc<Self> {
        let bar = ProgressBar::new_spinner();
        let style = ProgressStyle::with_template("{spinner:.cyan} {prefix:.bold}  {msg}  {elapsed:.dim}")
            .unwrap_or_else(|_| ProgressStyle::default_spinner())
            .tick_strings(&["⠋", "⠙", "⠹", "⠸", "⠼", "⠴", "⠦", "⠧", "⠇", "⠏", "⠿"]);
        bar.set_style(style);
        bar.set_prefix("Preparing");
        bar.set_message("Staging document…");
        bar.enable_steady_tick(Duration::from_millis(80));
        Arc::new(Self { bar })
    }
}

impl ConversionProgressCallback for CliProgressCallback {
    fn on_workspace_created(&self, path: &Path) {
        self.bar
            .println(format!("  {} workspace {}", dim("·"), dim(&path.display().to_string())));
    }

    fn on_converter_start(&self, kind: SourceKind, title: &str) {
        self.bar.set_prefix("Converting");
        self.bar.set_message(format!("{kind} → SCORM  '{title}'"));
    }

    fn on_converter_exit(&self, success: bool, duration_ms: u64) {
        let mark = if success { green("✓") } else { red("✗") };
        self.bar.println(format!(
            "  {} converter finished  {}",
            mark,
            dim(&format!("{:.1}s", duration_ms as f64 / 1000.0))
        ));
        self.bar.set_prefix("Packaging");
        self.bar.set_message("Checking archive…");
    }

    fn on_conversion_complete(&self, _kind: SourceKind, error: Option<&str>) {
        self.bar.finish_and_clear();
        if let Some(msg) = error {
            eprintln!("{} {}", red("✘"), msg);
        }
    }
}

const AFTER_HELP: &str = r#"EXAMPLES:
  # Run the HTTP service
  doc2scorm serve --bind 127.0.0.1:8080

  # Convert a local HTML page
  doc2scorm convert lesson.html --title "Lesson 1"

  # Convert a PDF to SCORM 1.2 with a custom converter
  doc2scorm convert --scorm-version 1.2 \
      --pdf-converter "/opt/venv/bin/python /opt/scorm/pdf_converter.py" \
      handbook.pdf -o handbook.zip

HTTP API:
  POST /convert-html   { "fileContent": "<base64>", "title": "…", "scormVersion": "2004" }
  POST /convert-pdf    same body
  POST /convert        same body plus "fileType": "html" | "htm" | "pdf"
  GET  /health

CONVERTER CONTRACT:
  <converter> <input> --output <output.zip> --title <title> --scorm-version <1.2|2004> [--extract-images]
  Exit zero and write exactly one archive at <output.zip>.
"#;

/// Convert HTML and PDF documents to SCORM packages.
#[derive(Parser, Debug)]
#[command(
    name = "doc2scorm",
    version,
    about = "Convert HTML and PDF documents to SCORM packages",
    arg_required_else_help = true,
    color = clap::ColorChoice::Auto,
    after_long_help = AFTER_HELP
)]
struct Cli {
    #[command(subcommand)]
    command: Command,

    /// Enable DEBUG-level tracing logs.
    #[arg(short, long, global = true, env = "DOC2SCORM_VERBOSE")]
    verbose: bool,

    /// Suppress all output except errors.
    #[arg(short, long, global = true, env = "DOC2SCORM_QUIET")]
    quiet: bool,
}

#[derive(Subcommand, Debug)]
enum Command {
    /// Run the HTTP conversion service.
    Serve {
        /// Address to listen on.
        #[arg(long, env = "DOC2SCORM_BIND_ADDR", default_value = "0.0.0.0:8080")]
        bind: String,

        #[command(flatten)]
        converter: ConverterArgs,
    },

    /// Convert one local document.
    Convert {
        /// HTML or PDF file to convert.
        input: PathBuf,

        /// Where to write the archive. Default: `<Title>_scorm.zip` in the
        /// current directory.
        #[arg(short, long)]
        output: Option<PathBuf>,

        /// Course title.
        #[arg(long)]
        title: Option<String>,

        /// Source kind. Inferred from the input extension when omitted.
        #[arg(long, value_enum)]
        kind: Option<KindArg>,

        /// Print conversion statistics as JSON on stdout.
        #[arg(long)]
        json: bool,

        /// Disable the progress spinner.
        #[arg(long, env = "DOC2SCORM_NO_PROGRESS")]
        no_progress: bool,

        #[command(flatten)]
        converter: ConverterArgs,
    },
}

/// Options shared by `serve` and `convert`.
#[derive(Args, Debug)]
struct ConverterArgs {
    /// HTML converter command line (program plus leading arguments).
    #[arg(long, env = "DOC2SCORM_HTML_CONVERTER", default_value = DEFAULT_HTML_CONVERTER)]
    html_converter: String,

    /// PDF converter command line (program plus leading arguments).
    #[arg(long, env = "DOC2SCORM_PDF_CONVERTER", default_value = DEFAULT_PDF_CONVERTER)]
    pdf_converter: String,

    /// Directory under which per-request workspaces are created.
    #[arg(long, env = "DOC2SCORM_TEMP_ROOT")]
    temp_root: Option<PathBuf>,

    /// Converter timeout in seconds (0 disables).
    #[arg(long, env = "DOC2SCORM_TIMEOUT", default_value_t = 120)]
    timeout: u64,

    /// Largest accepted document, in bytes after base64 decoding.
    #[arg(long, env = "DOC2SCORM_MAX_DOCUMENT_BYTES", default_value_t = DEFAULT_MAX_DOCUMENT_BYTES)]
    max_document_bytes: usize,

    /// SCORM version used when a request does not name one.
    #[arg(long, env = "DOC2SCORM_SCORM_VERSION", value_enum, default_value = "2004")]
    scorm_version: ScormVersionArg,

    /// Do not pass --extract-images to the PDF converter.
    #[arg(long, env = "DOC2SCORM_NO_EXTRACT_IMAGES")]
    no_extract_images: bool,
}

#[derive(clap::ValueEnum, Clone, Copy, Debug)]
enum ScormVersionArg {
    #[value(name = "1.2")]
    V12,
    #[value(name = "2004")]
    V2004,
}

impl From<ScormVersionArg> for ScormVersion {
    fn from(v: ScormVersionArg) -> Self {
        match v {
            ScormVersionArg::V12 => ScormVersion::Scorm12,
            ScormVersionArg::V2004 => ScormVersion::Scorm2004,
        }
    }
}

#[derive(clap::ValueEnum, Clone, Copy, Debug)]
enum KindArg {
    Html,
    Pdf,
}

impl From<KindArg> for SourceKind {
    fn from(v: KindArg) -> Self {
        match v {
            KindArg::Html => SourceKind::Html,
            KindArg::Pdf => SourceKind::Pdf,
        }
    }
}

#[tokio::main]
async fn main() -> Result<()> {
    let cli = Cli::parse();

    // ── Logging setup ────────────────────────────────────────────────────
    // The spinner replaces INFO logs for an interactive `convert`.
    let show_progress = match &cli.command {
        Command::Convert {
            json, no_progress, ..
        } => !cli.quiet && !*no_progress && !*json,
        Command::Serve { .. } => false,
    };
    let filter = if cli.verbose {
        "debug"
    } else if cli.quiet || show_progress {
        "error"
    } else {
        "info"
    };

    tracing_subscriber::fmt()
        .with_env_filter(
            EnvFilter::try_from_default_env().unwrap_or_else(|_| EnvFilter::new(filter)),
        )
        .with_writer(io::stderr)
        .init();

    match cli.command {
        Command::Serve { bind, converter } => {
            let config = build_config(&converter, None)?;
            tracing::info!(
                "HTML converter: {}  PDF converter: {}  temp root: {}",
                config.html_converter,
                config.pdf_converter,
                config.temp_root.display()
            );
            let listener = tokio::net::TcpListener::bind(&bind)
                .await
                .with_context(|| format!("Failed to bind to {bind}"))?;
            api::serve(listener, Arc::new(config))
                .await
                .context("Server error")?;
        }

        Command::Convert {
            input,
            output,
            title,
            kind,
            json,
            converter,
            ..
        } => {
            let kind = match kind {
                Some(k) => SourceKind::from(k),
                None => SourceKind::from_path(&input)
                    .context("Cannot infer the document kind; pass --kind")?,
            };
            let output_path = output.unwrap_or_else(|| {
                let effective = title
                    .as_deref()
                    .filter(|t| !t.trim().is_empty())
                    .unwrap_or(kind.default_title());
                PathBuf::from(safe_filename(effective))
            });

            let progress_cb: Option<ProgressCallback> = if show_progress {
                Some(CliProgressCallback::new() as Arc<dyn ConversionProgressCallback>)
            } else {
                None
            };
            let config = build_config(&converter, progress_cb)?;

            let stats = convert_to_file(&input, &output_path, title.as_deref(), Some(kind), &config)
                .await
                .context("Conversion failed")?;

            if json {
                println!(
                    "{}",
                    serde_json::to_string_pretty(&stats).context("Failed to serialise stats")?
                );
            } else if !cli.quiet {
                eprintln!(
                    "{}  {} bytes  {}ms  →  {}",
                    green("✔"),
                    stats.archive_bytes,
                    stats.total_duration_ms,
                    bold(&output_path.display().to_string()),
                );
            }
        }
    }

    Ok(())
}

/// Map CLI args to `ConverterConfig`.
fn build_config(args: &ConverterArgs, progress: Option<ProgressCallback>) -> Result<ConverterConfig> {
    let html = ConverterCommand::parse(&args.html_converter).context("Invalid --html-converter")?;
    let pdf = ConverterCommand::parse(&args.pdf_converter).context("Invalid --pdf-converter")?;

    let mut builder = ConverterConfig::builder()
        .html_converter(html)
        .pdf_converter(pdf)
        .timeout_secs(args.timeout)
        .max_document_bytes(args.max_document_bytes)
        .default_scorm_version(args.scorm_version.into())
        .extract_images(!args.no_extract_images);

    if let Some(ref root) = args.temp_root {
        builder = builder.temp_root(root.clone());
    }
    if let Some(cb) = progress {
        builder = builder.progress_callback(cb);
    }

    builder.build().context("Invalid configuration")
}
