//! Wire types for the classification service.
//!
//! Field names follow the service's snake_case JSON. Anything beyond
//! `class` + `confidence` is optional so older deployments still parse.

use serde::{Deserialize, Serialize};
use std::collections::HashMap;

/// Body of a `POST /predict` success.
///
/// `class` and `confidence` are optional here on purpose: a 200 without
/// them is a malformed response, which the interpreter rejects.
#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
pub struct PredictionResponse {
    #[serde(default)]
    pub class: Option<String>,
    #[serde(default)]
    pub confidence: Option<f64>,
    #[serde(default)]
    pub class_confidences: Option<HashMap<String, f64>>,
    #[serde(default)]
    pub status: Option<String>,
    #[serde(default)]
    pub details: Option<PredictionDetails>,
}

#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
pub struct PredictionDetails {
    #[serde(default)]
    pub file_name: Option<String>,
    #[serde(default)]
    pub file_size: Option<u64>,
    #[serde(default)]
    pub input_shape: Vec<i64>,
    #[serde(default)]
    pub prediction_shape: Vec<i64>,
}

/// Structured 4xx body.
#[derive(Debug, Clone, Deserialize)]
pub struct ErrorBody {
    pub detail: Option<serde_json::Value>,
}

impl ErrorBody {
    /// The `detail` as display text. FastAPI validation errors send an
    /// array of objects rather than a string.
    pub fn detail_text(&self) -> Option<String> {
        match self.detail.as_ref()? {
            serde_json::Value::String(s) if !s.is_empty() => Some(s.clone()),
            serde_json::Value::Null => None,
            serde_json::Value::String(_) => None,
            other => Some(other.to_string()),
        }
    }
}

/// One page of `GET /predictions`.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct PredictionHistoryPage {
    pub data: Vec<PredictionRecord>,
    pub pagination: Pagination,
}

#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
pub struct Pagination {
    pub page: u32,
    pub page_size: u32,
    pub total: u64,
    pub pages: u64,
}

/// A stored server-side prediction.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct PredictionRecord {
    pub predicted_class: String,
    pub confidence: f64,
    #[serde(default)]
    pub class_confidences: Option<HashMap<String, f64>>,
    pub file_metadata: FileMetadata,
    pub processing_details: ProcessingDetails,
    #[serde(default)]
    pub timestamp: Option<String>,
}

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct FileMetadata {
    pub filename: String,
    pub size: u64,
}

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct ProcessingDetails {
    pub input_shape: Vec<i64>,
    #[serde(default)]
    pub prediction_shape: Vec<i64>,
}

/// `GET /ping`.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct HealthStatus {
    pub status: String,
    pub model_loaded: bool,
    #[serde(default)]
    pub model_info: Option<ModelInfo>,
}

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct ModelInfo {
    #[serde(default)]
    pub input_shape: Option<Vec<Option<i64>>>,
    #[serde(default)]
    pub class_names: Vec<String>,
    #[serde(default)]
    pub mixed_precision: Option<String>,
}

/// `GET /digital-twin`: latest prediction mapped to a disease level.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct DigitalTwinState {
    pub plant_id: String,
    pub disease_type: String,
    pub disease_level: f64,
    pub timestamp: String,
}
