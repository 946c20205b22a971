//! Classification service domain — public API.
//!
//! - types.rs  — wire types for predict, history, ping, digital twin
//! - client.rs — reqwest client and the shared status-code policy
//!
//! The workflow talks to the service through `PredictionApi` so tests
//! and alternative transports can be injected.

pub mod client;
pub mod types;

pub use client::PredictionClient;
pub use types::{
    DigitalTwinState, HealthStatus, Pagination, PredictionHistoryPage, PredictionRecord,
    PredictionResponse,
};

use crate::error::ScanError;
use crate::validate::ImagePayload;

/// Upload and history capability of the classification service.
///
/// Single attempt, single in-flight per call. Callers must not issue
/// overlapping requests for the same logical action.
#[async_trait::async_trait]
pub trait PredictionApi: Send + Sync {
    /// `POST /predict` with the image under the `file` field.
    async fn submit(&self, image: &ImagePayload) -> Result<PredictionResponse, ScanError>;

    /// `GET /predictions?page=&page_size=`.
    async fn fetch_history(
        &self,
        page: u32,
        page_size: u32,
    ) -> Result<PredictionHistoryPage, ScanError>;
}
