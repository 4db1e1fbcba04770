//! Conversion API Handlers
//!
//! `POST /convert-html`, `POST /convert-pdf` and `POST /convert`.
//!
//! Body parsing and base64 decoding happen here, before the pipeline is
//! entered, so a malformed request never touches the filesystem.

use axum::{
    body::Bytes,
    extract::{rejection::BytesRejection, State},
    Json,
};
use serde::{Deserialize, Serialize};
use std::sync::Arc;

use crate::api::error::{ApiError, ApiResult};
use crate::config::ConverterConfig;
use crate::convert::convert;
use crate::pipeline::stage::decode_document;
use crate::request::{ConversionRequest, ScormVersion, SourceKind};

/// Inbound JSON body. Every field is optional at the serde level so that a
/// missing `fileContent` gets its own message instead of a generic parse error.
#[derive(Debug, Default, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct ConvertPayload {
    #[serde(default, alias = "file_content")]
    pub file_content: Option<String>,
    #[serde(default)]
    pub title: Option<String>,
    /// `"1.2"` / `"2004"`; bare JSON numbers are accepted too.
    #[serde(default, alias = "scorm_version")]
    pub scorm_version: Option<serde_json::Value>,
    /// Only read by `POST /convert`.
    #[serde(default, alias = "file_type")]
    pub file_type: Option<String>,
}

/// Successful conversion response.
#[derive(Debug, Serialize, Deserialize)]
pub struct ConvertResponse {
    pub message: String,
    pub filename: String,
    pub content: String,
}

/// POST /convert-html
pub async fn convert_html(
    State(config): State<Arc<ConverterConfig>>,
    body: Result<Bytes, BytesRejection>,
) -> ApiResult<Json<ConvertResponse>> {
    let payload = parse_payload(body)?;
    run(&config, payload, SourceKind::Html).await
}

/// POST /convert-pdf
pub async fn convert_pdf(
    State(config): State<Arc<ConverterConfig>>,
    body: Result<Bytes, BytesRejection>,
) -> ApiResult<Json<ConvertResponse>> {
    let payload = parse_payload(body)?;
    run(&config, payload, SourceKind::Pdf).await
}

/// POST /convert
/// Kind chosen by the `fileType` field.
pub async fn convert_any(
    State(config): State<Arc<ConverterConfig>>,
    body: Result<Bytes, BytesRejection>,
) -> ApiResult<Json<ConvertResponse>> {
    let payload = parse_payload(body)?;
    let kind = SourceKind::from_file_type(payload.file_type.as_deref().unwrap_or_default())?;
    run(&config, payload, kind).await
}

/// Any non-POST method on a conversion route.
pub async fn method_not_allowed() -> ApiError {
    ApiError::MethodNotAllowed
}

async fn run(
    config: &ConverterConfig,
    payload: ConvertPayload,
    kind: SourceKind,
) -> ApiResult<Json<ConvertResponse>> {
    let request = build_request(config, payload, kind)?;
    tracing::info!("Converting {} to SCORM: '{}'", kind, request.title);

    let output = convert(&request, config).await?;

    Ok(Json(ConvertResponse {
        message: format!("{} successfully converted to SCORM package", kind.label()),
        filename: output.package.filename,
        content: output.package.content,
    }))
}

fn parse_payload(body: Result<Bytes, BytesRejection>) -> ApiResult<ConvertPayload> {
    let body = body.map_err(|rejection| {
        ApiError::invalid_request(format!("Request body rejected: {}", rejection.body_text()))
    })?;
    serde_json::from_slice(&body).map_err(|e| {
        tracing::debug!("Unparseable request body: {}", e);
        ApiError::invalid_request("Invalid JSON body")
    })
}

/// Validate the payload and decode the document. No side effects.
fn build_request(
    config: &ConverterConfig,
    payload: ConvertPayload,
    kind: SourceKind,
) -> ApiResult<ConversionRequest> {
    let encoded = payload
        .file_content
        .as_deref()
        .filter(|c| !c.trim().is_empty())
        .ok_or_else(|| ApiError::invalid_request("No file content provided"))?;

    let scorm_version = match payload.scorm_version {
        None | Some(serde_json::Value::Null) => config.default_scorm_version,
        Some(serde_json::Value::String(s)) if s.trim().is_empty() => config.default_scorm_version,
        Some(serde_json::Value::String(s)) => s.parse::<ScormVersion>()?,
        Some(other) => other.to_string().parse::<ScormVersion>()?,
    };

    let document = decode_document(encoded, config.max_document_bytes)?;
    Ok(ConversionRequest::new(
        document,
        payload.title.as_deref(),
        kind,
        scorm_version,
    )?)
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::error::FailureKind;
    use base64::{engine::general_purpose::STANDARD, Engine as _};

    fn config() -> ConverterConfig {
        ConverterConfig::builder().build().unwrap()
    }

    fn parse(json: &str) -> ApiResult<ConvertPayload> {
        parse_payload(Ok(Bytes::from(json.to_owned())))
    }

    fn message(err: ApiError) -> String {
        serde_json::to_value(err.body()).unwrap()["error"]
            .as_str()
            .unwrap()
            .to_string()
    }

    #[test]
    fn unparseable_body_is_invalid_json() {
        for body in ["{not json", "", "[1,2]", "null"] {
            let err = parse(body).unwrap_err();
            assert_eq!(err.kind(), FailureKind::ValidationError);
            assert_eq!(message(err), "Invalid JSON body");
        }
    }

    #[test]
    fn missing_or_blank_content_is_rejected() {
        for body in [r#"{"title":"x"}"#, r#"{"fileContent":""}"#, r#"{"fileContent":"  "}"#] {
            let payload = parse(body).unwrap();
            let err = build_request(&config(), payload, SourceKind::Html).unwrap_err();
            assert_eq!(message(err), "No file content provided");
        }
    }

    #[test]
    fn camel_and_snake_case_fields() {
        let encoded = STANDARD.encode("<html></html>");
        let camel = parse(&format!(
            r#"{{"fileContent":"{encoded}","scormVersion":"1.2","fileType":"htm"}}"#
        ))
        .unwrap();
        let snake = parse(&format!(
            r#"{{"file_content":"{encoded}","scorm_version":"1.2","file_type":"htm"}}"#
        ))
        .unwrap();
        for payload in [camel, snake] {
            assert_eq!(payload.file_type.as_deref(), Some("htm"));
            let req = build_request(&config(), payload, SourceKind::Html).unwrap();
            assert_eq!(req.scorm_version, ScormVersion::Scorm12);
        }
    }

    #[test]
    fn numeric_scorm_version_is_accepted() {
        let encoded = STANDARD.encode("%PDF-1.4");
        let payload = parse(&format!(r#"{{"fileContent":"{encoded}","scormVersion":2004}}"#)).unwrap();
        let req = build_request(&config(), payload, SourceKind::Pdf).unwrap();
        assert_eq!(req.scorm_version, ScormVersion::Scorm2004);
        assert_eq!(req.title, "SCORM Course from PDF");
    }

    #[test]
    fn unknown_scorm_version_is_rejected() {
        let encoded = STANDARD.encode("<p>");
        let payload = parse(&format!(r#"{{"fileContent":"{encoded}","scormVersion":"3"}}"#)).unwrap();
        let err = build_request(&config(), payload, SourceKind::Html).unwrap_err();
        assert_eq!(err.kind(), FailureKind::ValidationError);
    }

    #[test]
    fn bad_base64_is_rejected() {
        let payload = parse(r#"{"fileContent":"***not base64***"}"#).unwrap();
        let err = build_request(&config(), payload, SourceKind::Html).unwrap_err();
        assert_eq!(err.kind(), FailureKind::ValidationError);
    }

    #[test]
    fn title_is_forwarded_verbatim() {
        let encoded = STANDARD.encode("<p>");
        let payload = parse(&format!(
            r#"{{"fileContent":"{encoded}","title":"  x; rm -rf / ; $(id)  "}}"#
        ))
        .unwrap();
        let req = build_request(&config(), payload, SourceKind::Html).unwrap();
        assert_eq!(req.title, "  x; rm -rf / ; $(id)  ");
    }
}
