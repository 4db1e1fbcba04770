//! End-to-end tests for the doc2scorm HTTP service.
//!
//! Each test starts the real axum router on an ephemeral port with a stub
//! converter (a POSIX `sh` script) and a private temp root, then drives it
//! over HTTP with reqwest.
//!
//! Run with:
//!   cargo test --test e2e -- --nocapture

#![cfg(unix)]

use base64::{engine::general_purpose::STANDARD, Engine as _};
use doc2scorm::{api, ConverterCommand, ConverterConfig};
use serde_json::{json, Value};
use std::path::Path;
use std::sync::Arc;
use tempfile::TempDir;
use tracing_subscriber::EnvFilter;

// ── Stub converters ──────────────────────────────────────────────────────────

/// Writes a fixed 10-byte archive to the path following `--output`.
const WRITES_ARCHIVE: &str = r#"out=""
while [ $# -gt 0 ]; do
  if [ "$1" = "--output" ]; then out="$2"; fi
  shift
done
printf '0123456789' > "$out""#;

/// Writes the number of workspaces present under the temp root as the archive.
const COUNTS_WORKSPACES: &str = r#"out=""
while [ $# -gt 0 ]; do
  if [ "$1" = "--output" ]; then out="$2"; fi
  shift
done
ls -1 "$(dirname "$(dirname "$out")")" | wc -l | tr -d ' ' > "$out""#;

/// Writes the received title, verbatim, as the archive.
const ECHOES_TITLE: &str = r#"out=""; title=""
while [ $# -gt 0 ]; do
  case "$1" in
    --output) out="$2"; shift ;;
    --title) title="$2"; shift ;;
  esac
  shift
done
printf '%s' "$title" > "$out""#;

/// Writes every argument after the input path, one per line.
const ECHOES_ARGS: &str = r#"out=""
for a in "$@"; do
  if [ "$prev" = "--output" ]; then out="$a"; fi
  prev="$a"
done
shift
printf '%s\n' "$@" > "$out""#;

const FAILS: &str = "echo 'converting' ; echo 'Traceback: invalid markup' >&2 ; exit 3";

const FORGETS_ARCHIVE: &str = "echo 'all good'";

// ── Test helpers ─────────────────────────────────────────────────────────────

struct TestServer {
    base: String,
    root: TempDir,
    client: reqwest::Client,
}

impl TestServer {
    async fn start(script: &str) -> Self {
        let _ = tracing_subscriber::fmt()
            .with_env_filter(EnvFilter::from_default_env())
            .with_test_writer()
            .try_init();

        let root = TempDir::new().unwrap();
        let config = ConverterConfig::builder()
            .converter(
                ConverterCommand::new("sh")
                    .arg("-c")
                    .arg(script)
                    .arg("stub-converter"),
            )
            .temp_root(root.path())
            .timeout_secs(30)
            .build()
            .unwrap();

        let listener = tokio::net::TcpListener::bind("127.0.0.1:0").await.unwrap();
        let addr = listener.local_addr().unwrap();
        let app = api::create_router(Arc::new(config));
        tokio::spawn(async move {
            axum::serve(listener, app).await.unwrap();
        });

        Self {
            base: format!("http://{addr}"),
            root,
            client: reqwest::Client::new(),
        }
    }

    fn url(&self, path: &str) -> String {
        format!("{}{}", self.base, path)
    }

    async fn post_json(&self, path: &str, body: Value) -> (u16, Value) {
        let resp = self.client.post(self.url(path)).json(&body).send().await.unwrap();
        let status = resp.status().as_u16();
        (status, resp.json().await.unwrap())
    }

    fn workspaces(&self) -> usize {
        count_entries(self.root.path())
    }
}

fn count_entries(dir: &Path) -> usize {
    std::fs::read_dir(dir).unwrap().count()
}

fn html_body(title: &str) -> Value {
    json!({
        "fileContent": STANDARD.encode("<!DOCTYPE html><html><body><h1>Demo</h1></body></html>"),
        "title": title,
    })
}

// ── Success path ─────────────────────────────────────────────────────────────

#[tokio::test]
async fn html_conversion_returns_package() {
    let server = TestServer::start(WRITES_ARCHIVE).await;
    let resp = server
        .client
        .post(server.url("/convert-html"))
        .json(&html_body("Demo"))
        .send()
        .await
        .unwrap();

    assert_eq!(resp.status().as_u16(), 200);
    let content_type = resp.headers()["content-type"].to_str().unwrap().to_string();
    assert!(content_type.starts_with("application/json"), "{content_type}");

    let body: Value = resp.json().await.unwrap();
    assert_eq!(body["filename"], "Demo_scorm.zip");
    assert_eq!(body["message"], "HTML successfully converted to SCORM package");
    let content = STANDARD.decode(body["content"].as_str().unwrap()).unwrap();
    assert_eq!(content, b"0123456789");
    assert_eq!(server.workspaces(), 0);
}

#[tokio::test]
async fn pdf_conversion_uses_default_title() {
    let server = TestServer::start(WRITES_ARCHIVE).await;
    let (status, body) = server
        .post_json(
            "/convert-pdf",
            json!({ "fileContent": STANDARD.encode("%PDF-1.4\n%%EOF") }),
        )
        .await;
    assert_eq!(status, 200);
    assert_eq!(body["filename"], "SCORM_Course_from_PDF_scorm.zip");
    assert_eq!(body["message"], "PDF successfully converted to SCORM package");
}

#[tokio::test]
async fn generic_route_dispatches_on_file_type() {
    let server = TestServer::start(ECHOES_ARGS).await;
    let (status, body) = server
        .post_json(
            "/convert",
            json!({
                "fileContent": STANDARD.encode("%PDF-1.4"),
                "fileType": "PDF",
                "title": "Handbook",
                "scormVersion": "1.2",
            }),
        )
        .await;
    assert_eq!(status, 200);
    let args = String::from_utf8(STANDARD.decode(body["content"].as_str().unwrap()).unwrap()).unwrap();
    let args: Vec<&str> = args.lines().collect();
    assert_eq!(args[0], "--output");
    assert!(args[1].ends_with("output.zip"));
    assert_eq!(&args[2..], ["--title", "Handbook", "--scorm-version", "1.2", "--extract-images"]);
}

#[tokio::test]
async fn exactly_one_workspace_during_processing() {
    let server = TestServer::start(COUNTS_WORKSPACES).await;
    let (status, body) = server.post_json("/convert-html", html_body("Count")).await;
    assert_eq!(status, 200);
    let content = STANDARD.decode(body["content"].as_str().unwrap()).unwrap();
    assert_eq!(content, b"1\n");
    assert_eq!(server.workspaces(), 0);
}

#[tokio::test]
async fn hostile_title_reaches_converter_as_one_argument() {
    let server = TestServer::start(ECHOES_TITLE).await;
    let title = "x\"; touch pwned; echo \"$(id) `id` | & > /tmp/y";
    let (status, body) = server.post_json("/convert-html", html_body(title)).await;
    assert_eq!(status, 200);
    let received = STANDARD.decode(body["content"].as_str().unwrap()).unwrap();
    assert_eq!(String::from_utf8(received).unwrap(), title);
    let filename = body["filename"].as_str().unwrap();
    assert!(filename.ends_with("_scorm.zip"));
    assert!(filename.trim_end_matches("_scorm.zip").chars().all(|c| c.is_ascii_alphanumeric() || c == '_'));
    assert!(!Path::new("pwned").exists());
}

#[tokio::test]
async fn concurrent_requests_are_isolated() {
    let server = Arc::new(TestServer::start(ECHOES_TITLE).await);
    let mut handles = Vec::new();
    for i in 0..8 {
        let server = server.clone();
        handles.push(tokio::spawn(async move {
            let title = format!("Course {i}");
            let (status, body) = server.post_json("/convert-html", html_body(&title)).await;
            assert_eq!(status, 200);
            let received = STANDARD.decode(body["content"].as_str().unwrap()).unwrap();
            assert_eq!(String::from_utf8(received).unwrap(), title);
        }));
    }
    for h in handles {
        h.await.unwrap();
    }
    assert_eq!(server.workspaces(), 0);
}

// ── Rejections before any workspace ──────────────────────────────────────────

#[tokio::test]
async fn non_post_is_405_without_workspace() {
    let server = TestServer::start(WRITES_ARCHIVE).await;
    for path in ["/convert-html", "/convert-pdf", "/convert"] {
        let resp = server.client.get(server.url(path)).send().await.unwrap();
        assert_eq!(resp.status().as_u16(), 405, "{path}");
        let body: Value = resp.json().await.unwrap();
        assert_eq!(body["error"], "Method Not Allowed");
    }
    let resp = server.client.put(server.url("/convert-html")).send().await.unwrap();
    assert_eq!(resp.status().as_u16(), 405);
    assert_eq!(server.workspaces(), 0);
}

#[tokio::test]
async fn invalid_json_is_400_without_workspace() {
    let server = TestServer::start(WRITES_ARCHIVE).await;
    let resp = server
        .client
        .post(server.url("/convert-html"))
        .header("content-type", "application/json")
        .body("{ not json")
        .send()
        .await
        .unwrap();
    assert_eq!(resp.status().as_u16(), 400);
    let body: Value = resp.json().await.unwrap();
    assert_eq!(body["error"], "Invalid JSON body");
    assert_eq!(body["kind"], "ValidationError");
    assert_eq!(server.workspaces(), 0);
}

#[tokio::test]
async fn missing_file_content_is_400_without_workspace() {
    let server = TestServer::start(WRITES_ARCHIVE).await;
    let (status, body) = server.post_json("/convert-pdf", json!({ "title": "x" })).await;
    assert_eq!(status, 400);
    assert_eq!(body["error"], "No file content provided");
    assert_eq!(server.workspaces(), 0);
}

#[tokio::test]
async fn invalid_base64_is_400_without_workspace() {
    let server = TestServer::start(WRITES_ARCHIVE).await;
    let (status, body) = server
        .post_json("/convert-html", json!({ "fileContent": "%%% not base64 %%%" }))
        .await;
    assert_eq!(status, 400);
    assert_eq!(body["kind"], "ValidationError");
    assert_eq!(server.workspaces(), 0);
}

#[tokio::test]
async fn unknown_file_type_is_400() {
    let server = TestServer::start(WRITES_ARCHIVE).await;
    let (status, body) = server
        .post_json(
            "/convert",
            json!({ "fileContent": STANDARD.encode("x"), "fileType": "docx" }),
        )
        .await;
    assert_eq!(status, 400);
    assert!(body["error"].as_str().unwrap().contains("docx"));
}

// ── Converter failures ───────────────────────────────────────────────────────

#[tokio::test]
async fn converter_failure_is_500_with_stderr() {
    let server = TestServer::start(FAILS).await;
    let (status, body) = server.post_json("/convert-html", html_body("Broken")).await;
    assert_eq!(status, 500);
    assert_eq!(body["error"], "Execution error");
    assert_eq!(body["kind"], "ConverterError");
    assert_eq!(body["stdout"], "converting\n");
    assert_eq!(body["stderr"], "Traceback: invalid markup\n");
    assert!(body["details"].as_str().unwrap().contains("invalid markup"));
    assert!(body.get("content").is_none());
    assert_eq!(server.workspaces(), 0);
}

#[tokio::test]
async fn zero_exit_without_archive_is_missing_artifact() {
    let server = TestServer::start(FORGETS_ARCHIVE).await;
    let (status, body) = server.post_json("/convert-html", html_body("Lazy")).await;
    assert_eq!(status, 500);
    assert_eq!(body["error"], "Output file not created");
    assert_eq!(body["kind"], "MissingArtifact");
    assert_eq!(body["stdout"], "all good\n");
    assert_eq!(server.workspaces(), 0);
}

// ── Health ───────────────────────────────────────────────────────────────────

#[tokio::test]
async fn health_check() {
    let server = TestServer::start(WRITES_ARCHIVE).await;
    let resp = server.client.get(server.url("/health")).send().await.unwrap();
    assert_eq!(resp.status().as_u16(), 200);
    assert_eq!(resp.text().await.unwrap(), "OK");
}
