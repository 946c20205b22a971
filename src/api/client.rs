//! HTTP client for the classification service.
//!
//! Status policy shared by every call:
//! - 2xx: decode the body; a body that doesn't decode is a network error
//! - 4xx: application error carrying the server's `detail`
//! - 5xx: opaque server error, body ignored, endpoint fallback text
//!
//! Each call is a single attempt. Retrying is the caller's decision.

use super::types::{
    DigitalTwinState, ErrorBody, HealthStatus, PredictionHistoryPage, PredictionResponse,
};
use super::PredictionApi;
use crate::config::ApiConfig;
use crate::error::{ScanError, FALLBACK_PROCESSING_MESSAGE, INVALID_RESPONSE_MESSAGE};
use crate::validate::ImagePayload;
use reqwest::multipart::{Form, Part};
use serde::de::DeserializeOwned;

/// Multipart field the service reads the image from.
pub const UPLOAD_FIELD: &str = "file";

const PREDICT_UNREACHABLE: &str =
    "Failed to analyze image. Please check your internet connection and try again.";
const HISTORY_UNREACHABLE: &str = "An error occurred while fetching predictions";
const SERVICE_UNREACHABLE: &str = "Could not reach the classification service";

/// Messages used when a reply carries no usable text of its own.
struct Fallbacks {
    /// 4xx without a `detail`.
    application: &'static str,
    /// Any 5xx.
    server: &'static str,
}

const PREDICT_FALLBACKS: Fallbacks = Fallbacks {
    application: "Failed to process image",
    server: FALLBACK_PROCESSING_MESSAGE,
};
const HISTORY_FALLBACKS: Fallbacks = Fallbacks {
    application: "Failed to fetch predictions",
    server: HISTORY_UNREACHABLE,
};
const PING_FALLBACKS: Fallbacks = Fallbacks {
    application: "Health check failed",
    server: "Health check failed",
};
const TWIN_FALLBACKS: Fallbacks = Fallbacks {
    application: "Failed to fetch digital twin data",
    server: "Failed to fetch digital twin data",
};

/// reqwest-backed client for `/predict`, `/predictions`, `/ping`, `/digital-twin`.
#[derive(Debug, Clone)]
pub struct PredictionClient {
    http: reqwest::Client,
    config: ApiConfig,
}

impl PredictionClient {
    pub fn new(config: ApiConfig) -> Result<Self, ScanError> {
        let mut builder = reqwest::Client::builder();
        if let Some(timeout) = config.request_timeout {
            builder = builder.timeout(timeout);
        }
        let http = builder.build().map_err(|e| {
            log::error!("[API] Failed to build HTTP client: {}", e);
            ScanError::network(SERVICE_UNREACHABLE)
        })?;
        Ok(Self { http, config })
    }

    pub fn config(&self) -> &ApiConfig {
        &self.config
    }

    /// `GET /ping`.
    pub async fn ping(&self) -> Result<HealthStatus, ScanError> {
        let url = self.config.endpoint("ping");
        let response = self
            .http
            .get(&url)
            .send()
            .await
            .map_err(|e| unreachable_error(&url, e, SERVICE_UNREACHABLE))?;
        decode(response, &PING_FALLBACKS).await
    }

    /// `GET /digital-twin`.
    pub async fn digital_twin(&self) -> Result<DigitalTwinState, ScanError> {
        let url = self.config.endpoint("digital-twin");
        let response = self
            .http
            .get(&url)
            .send()
            .await
            .map_err(|e| unreachable_error(&url, e, SERVICE_UNREACHABLE))?;
        decode(response, &TWIN_FALLBACKS).await
    }
}

#[async_trait::async_trait]
impl PredictionApi for PredictionClient {
    async fn submit(&self, image: &ImagePayload) -> Result<PredictionResponse, ScanError> {
        let url = self.config.endpoint("predict");
        let part = Part::bytes(image.bytes.to_vec())
            .file_name(image.file_name.clone())
            .mime_str(&image.mime_type)
            .map_err(|e| {
                log::error!("[PREDICT] Bad MIME type '{}': {}", image.mime_type, e);
                ScanError::network(PREDICT_FALLBACKS.application)
            })?;
        let form = Form::new().part(UPLOAD_FIELD, part);

        log::info!(
            "[PREDICT] Uploading {} ({} bytes, {})",
            image.file_name,
            image.len(),
            image.mime_type
        );
        let start = std::time::Instant::now();

        let response = self
            .http
            .post(&url)
            .multipart(form)
            .send()
            .await
            .map_err(|e| unreachable_error(&url, e, PREDICT_UNREACHABLE))?;

        log::info!(
            "[PREDICT] {} in {}ms",
            response.status(),
            start.elapsed().as_millis()
        );
        decode(response, &PREDICT_FALLBACKS).await
    }

    async fn fetch_history(
        &self,
        page: u32,
        page_size: u32,
    ) -> Result<PredictionHistoryPage, ScanError> {
        let url = self.config.endpoint("predictions");
        let start = std::time::Instant::now();

        let response = self
            .http
            .get(&url)
            .query(&[("page", page), ("page_size", page_size)])
            .send()
            .await
            .map_err(|e| unreachable_error(&url, e, HISTORY_UNREACHABLE))?;

        log::info!(
            "[HISTORY] page={} page_size={} → {} in {}ms",
            page,
            page_size,
            response.status(),
            start.elapsed().as_millis()
        );
        decode(response, &HISTORY_FALLBACKS).await
    }
}

fn unreachable_error(url: &str, e: reqwest::Error, message: &str) -> ScanError {
    if e.is_timeout() {
        log::error!("[API] Request to {} timed out: {}", url, e);
    } else {
        log::error!("[API] Request to {} failed: {}", url, e);
    }
    ScanError::network(message)
}

/// Apply the status policy and decode a success body.
async fn decode<T: DeserializeOwned>(
    response: reqwest::Response,
    fallbacks: &Fallbacks,
) -> Result<T, ScanError> {
    let status = response.status();
    if status.is_server_error() {
        log::error!("[API] Server returned {}", status);
        return Err(ScanError::server(status.as_u16(), fallbacks.server));
    }

    let body = response.bytes().await.map_err(|e| {
        log::error!("[API] Failed to read response body: {}", e);
        ScanError::network(INVALID_RESPONSE_MESSAGE)
    })?;

    if status.is_success() {
        return serde_json::from_slice::<T>(&body).map_err(|e| {
            log::warn!(
                "[API] Failed to parse response: {} — raw: {}",
                e,
                String::from_utf8_lossy(&body[..body.len().min(200)])
            );
            ScanError::network(INVALID_RESPONSE_MESSAGE)
        });
    }

    let detail = serde_json::from_slice::<ErrorBody>(&body)
        .ok()
        .and_then(|b| b.detail_text())
        .unwrap_or_else(|| fallbacks.application.to_string());
    log::warn!("[API] Application error {}: {}", status, detail);
    Err(ScanError::Application {
        status: status.as_u16(),
        detail,
    })
}
