//! Client for the remote text-extraction endpoint.
//!
//! `POST {base}/extract?lang={code}` with the page image in a multipart field
//! named `image`. Success is `{"status": "success", "text": ...}`; failures
//! carry an optional `{"error": ...}` body. HTTP 429 means the daily quota
//! is spent and is reported separately so runs can halt on it.

use std::time::Duration;

use async_trait::async_trait;
use reqwest::multipart::{Form, Part};
use reqwest::StatusCode;
use serde::Deserialize;
use thiserror::Error;
use tracing::{debug, warn};

use crate::config::Settings;
use crate::models::{OcrLanguage, PageImage};

/// Errors from a single extraction call.
#[derive(Debug, Error)]
pub enum ExtractError {
    /// HTTP 429: the service quota is exhausted.
    #[error("{message}")]
    QuotaExceeded { message: String },

    /// Any other non-success HTTP status.
    #[error("{message}")]
    Failed { status: u16, message: String },

    /// 2xx response without a success payload.
    #[error("Unexpected OCR response")]
    UnexpectedResponse,

    #[error("OCR request timed out after {0}s")]
    Timeout(u64),

    #[error("OCR request failed: {0}")]
    Request(String),
}

impl ExtractError {
    pub fn is_quota(&self) -> bool {
        matches!(self, Self::QuotaExceeded { .. })
    }

    /// HTTP status of the failed response, if there was one.
    pub fn status(&self) -> Option<u16> {
        match self {
            Self::QuotaExceeded { .. } => Some(StatusCode::TOO_MANY_REQUESTS.as_u16()),
            Self::Failed { status, .. } => Some(*status),
            _ => None,
        }
    }
}

/// Something that turns a page image into text.
#[async_trait]
pub trait TextExtractor: Send + Sync {
    async fn extract(&self, image: &PageImage, lang: OcrLanguage) -> Result<String, ExtractError>;
}

#[derive(Debug, Default, Deserialize)]
struct ExtractResponse {
    status: Option<String>,
    text: Option<String>,
    error: Option<String>,
}

/// HTTP client for the extraction service.
#[derive(Debug, Clone)]
pub struct HttpOcrClient {
    client: reqwest::Client,
    base: String,
    timeout: Duration,
}

impl HttpOcrClient {
    pub fn new(base: &str, timeout: Duration) -> Result<Self, ExtractError> {
        let client = reqwest::Client::builder()
            .timeout(timeout)
            .user_agent(concat!("bookocr/", env!("CARGO_PKG_VERSION")))
            .build()
            .map_err(|e| ExtractError::Request(e.to_string()))?;

        Ok(Self {
            client,
            base: base.trim().trim_end_matches('/').to_string(),
            timeout,
        })
    }

    pub fn from_settings(settings: &Settings) -> Result<Self, ExtractError> {
        Self::new(&settings.api_base, settings.request_timeout())
    }

    pub fn base_url(&self) -> &str {
        &self.base
    }

    fn endpoint(&self, path: &str) -> String {
        format!("{}/{}", self.base, path)
    }

    fn map_send_error(&self, e: reqwest::Error) -> ExtractError {
        if e.is_timeout() {
            ExtractError::Timeout(self.timeout.as_secs())
        } else {
            ExtractError::Request(e.to_string())
        }
    }

    /// Check `GET {base}/healthz`.
    pub async fn health(&self) -> Result<(), ExtractError> {
        let response = self
            .client
            .get(self.endpoint("healthz"))
            .send()
            .await
            .map_err(|e| self.map_send_error(e))?;

        let status = response.status();
        if status.is_success() {
            Ok(())
        } else {
            Err(ExtractError::Failed {
                status: status.as_u16(),
                message: format!("Health check failed with {}", status.as_u16()),
            })
        }
    }
}

#[async_trait]
impl TextExtractor for HttpOcrClient {
    async fn extract(&self, image: &PageImage, lang: OcrLanguage) -> Result<String, ExtractError> {
        let part = Part::bytes(image.bytes.clone())
            .file_name("page.png")
            .mime_str(&image.mime_type)
            .map_err(|e| ExtractError::Request(e.to_string()))?;
        let form = Form::new().part("image", part);

        debug!(
            "POST {} lang={} ({} bytes)",
            self.endpoint("extract"),
            lang,
            image.bytes.len()
        );

        let response = self
            .client
            .post(self.endpoint("extract"))
            .query(&[("lang", lang.as_str())])
            .multipart(form)
            .send()
            .await
            .map_err(|e| self.map_send_error(e))?;

        let status = response.status();
        let body = response.bytes().await.map_err(|e| self.map_send_error(e))?;
        let payload: Option<ExtractResponse> = serde_json::from_slice(&body).ok();

        interpret_response(status, payload)
    }
}

fn interpret_response(
    status: StatusCode,
    payload: Option<ExtractResponse>,
) -> Result<String, ExtractError> {
    if !status.is_success() {
        let message = payload
            .and_then(|p| p.error)
            .filter(|e| !e.is_empty())
            .unwrap_or_else(|| format!("OCR failed with {}", status.as_u16()));

        if status == StatusCode::TOO_MANY_REQUESTS {
            warn!("OCR quota exceeded: {}", message);
            return Err(ExtractError::QuotaExceeded { message });
        }
        return Err(ExtractError::Failed {
            status: status.as_u16(),
            message,
        });
    }

    match payload {
        Some(p) if p.status.as_deref() == Some("success") => Ok(p.text.unwrap_or_default()),
        _ => Err(ExtractError::UnexpectedResponse),
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    fn payload(json: &str) -> Option<ExtractResponse> {
        serde_json::from_str(json).ok()
    }

    #[test]
    fn test_success_payload() {
        let text = interpret_response(
            StatusCode::OK,
            payload(r#"{"status":"success","text":"నమస్కారం"}"#),
        )
        .unwrap();
        assert_eq!(text, "నమస్కారం");
    }

    #[test]
    fn test_success_without_text_is_empty() {
        let text = interpret_response(StatusCode::OK, payload(r#"{"status":"success"}"#)).unwrap();
        assert_eq!(text, "");
    }

    #[test]
    fn test_ok_status_without_success_marker() {
        let err = interpret_response(StatusCode::OK, payload(r#"{"text":"x"}"#)).unwrap_err();
        assert!(matches!(err, ExtractError::UnexpectedResponse));
        let err = interpret_response(StatusCode::OK, None).unwrap_err();
        assert_eq!(err.to_string(), "Unexpected OCR response");
    }

    #[test]
    fn test_error_body_message() {
        let err = interpret_response(
            StatusCode::BAD_REQUEST,
            payload(r#"{"error":"Unsupported OCR language. Allowed: tel, kan, hin, eng."}"#),
        )
        .unwrap_err();
        assert_eq!(err.status(), Some(400));
        assert!(!err.is_quota());
        assert_eq!(
            err.to_string(),
            "Unsupported OCR language. Allowed: tel, kan, hin, eng."
        );
    }

    #[test]
    fn test_fallback_message_without_body() {
        let err = interpret_response(StatusCode::BAD_GATEWAY, None).unwrap_err();
        assert_eq!(err.to_string(), "OCR failed with 502");
    }

    #[test]
    fn test_quota() {
        let err = interpret_response(
            StatusCode::TOO_MANY_REQUESTS,
            payload(r#"{"error":"Daily quota exceeded. Please try again tomorrow."}"#),
        )
        .unwrap_err();
        assert!(err.is_quota());
        assert_eq!(err.status(), Some(429));
        assert_eq!(
            err.to_string(),
            "Daily quota exceeded. Please try again tomorrow."
        );
    }

    #[test]
    fn test_base_url_trailing_slash() {
        let client = HttpOcrClient::new("http://localhost:8000/ ", Duration::from_secs(5)).unwrap();
        assert_eq!(client.base_url(), "http://localhost:8000");
        assert_eq!(client.endpoint("extract"), "http://localhost:8000/extract");
    }
}
