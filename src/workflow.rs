//! Upload-and-predict state machine shared by every front-end.
//!
//! ```text
//! Idle → Validating → Rejected → Idle
//!                   → Submitting → Displaying | ErrorDisplayed
//! ErrorDisplayed → (retry) → Submitting
//! Displaying | ErrorDisplayed → (clear) → Idle
//! ```
//!
//! Validating and Rejected are instantaneous and only show up in logs
//! and notifications. A submission runs detached from the workflow
//! (`Submission::send`) so the front-end can keep handling input while it
//! is in flight. Each submission carries the generation it was started
//! in; clearing or selecting again bumps the generation and the late
//! completion is dropped in `complete`. The HTTP request itself is not
//! cancelled.

use crate::api::{PredictionApi, PredictionResponse};
use crate::error::{ScanError, ValidationError};
use crate::history::{ScanHistoryStore, ScanRecord};
use crate::interpret::{interpret, Interpretation};
use crate::location::{LocationEnricher, LocationStatus};
use crate::validate::{ImagePayload, ImageSelection};
use std::sync::Arc;

#[derive(Debug, Clone, PartialEq)]
pub enum ScanState {
    Idle,
    Submitting,
    Displaying(Interpretation),
    ErrorDisplayed(ScanError),
}

impl ScanState {
    fn label(&self) -> &'static str {
        match self {
            ScanState::Idle => "Idle",
            ScanState::Submitting => "Submitting",
            ScanState::Displaying(_) => "Displaying",
            ScanState::ErrorDisplayed(_) => "ErrorDisplayed",
        }
    }
}

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum NotificationKind {
    Info,
    Warning,
    Error,
}

/// Transient banner text. Drained by the front-end.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct Notification {
    pub kind: NotificationKind,
    pub message: String,
}

/// One upload, ready to run outside the workflow.
pub struct Submission {
    pub generation: u64,
    pub payload: ImagePayload,
    api: Arc<dyn PredictionApi>,
    location: Option<LocationEnricher>,
}

/// Result of `Submission::send`, handed back to `complete`.
#[derive(Debug, Clone)]
pub struct SubmissionOutcome {
    pub generation: u64,
    pub location: LocationStatus,
    pub response: Result<PredictionResponse, ScanError>,
}

impl Submission {
    /// Location first (best-effort), then the upload.
    pub async fn send(self) -> SubmissionOutcome {
        let location = match &self.location {
            Some(enricher) => enricher.status().await,
            None => LocationStatus::Absent,
        };
        let response = self.api.submit(&self.payload).await;
        SubmissionOutcome {
            generation: self.generation,
            location,
            response,
        }
    }
}

pub struct ScanWorkflow {
    api: Arc<dyn PredictionApi>,
    location: Option<LocationEnricher>,
    history: Option<Arc<ScanHistoryStore>>,
    state: ScanState,
    selection: Option<ImageSelection>,
    payload: Option<ImagePayload>,
    location_status: LocationStatus,
    last_record_id: Option<String>,
    generation: u64,
    notifications: Vec<Notification>,
}

impl ScanWorkflow {
    pub fn new(api: Arc<dyn PredictionApi>) -> Self {
        Self {
            api,
            location: None,
            history: None,
            state: ScanState::Idle,
            selection: None,
            payload: None,
            location_status: LocationStatus::Absent,
            last_record_id: None,
            generation: 0,
            notifications: Vec::new(),
        }
    }

    /// Geotag scans before upload.
    pub fn with_location(mut self, enricher: LocationEnricher) -> Self {
        self.location = Some(enricher);
        self
    }

    /// Record successful scans here.
    pub fn with_history(mut self, store: Arc<ScanHistoryStore>) -> Self {
        self.history = Some(store);
        self
    }

    pub fn state(&self) -> &ScanState {
        &self.state
    }

    pub fn selection(&self) -> Option<&ImageSelection> {
        self.selection.as_ref()
    }

    pub fn location_status(&self) -> &LocationStatus {
        &self.location_status
    }

    /// Id of the record added for the current result, if any.
    pub fn last_record_id(&self) -> Option<&str> {
        self.last_record_id.as_deref()
    }

    pub fn generation(&self) -> u64 {
        self.generation
    }

    /// A retry control is shown only for submission errors.
    pub fn can_retry(&self) -> bool {
        matches!(&self.state, ScanState::ErrorDisplayed(e) if e.is_retryable())
            && self.payload.is_some()
    }

    pub fn take_notifications(&mut self) -> Vec<Notification> {
        std::mem::take(&mut self.notifications)
    }

    /// Validate a new selection and start uploading it.
    ///
    /// The previous selection (and its loaded bytes) is released first.
    /// On rejection nothing is sent and the workflow is back to Idle.
    pub async fn accept(&mut self, selection: ImageSelection) -> Result<Submission, ScanError> {
        self.release_selection();
        log::info!("[WORKFLOW] → Validating {}", selection.uri);

        if let Err(reason) = selection.validate() {
            return Err(self.reject(reason));
        }

        let payload = match selection.load().await {
            Ok(payload) => payload,
            Err(e) => {
                let err = ScanError::network(e.to_string());
                self.notify(NotificationKind::Error, err.message());
                self.transition(ScanState::Idle);
                return Err(err);
            }
        };

        self.selection = Some(selection);
        self.payload = Some(payload.clone());
        Ok(self.begin(payload))
    }

    /// Re-send the identical payload after a submission error.
    ///
    /// `None` unless the workflow is showing a retryable error, which also
    /// covers duplicate triggers while a submission is in flight.
    pub fn retry(&mut self) -> Option<Submission> {
        if !self.can_retry() {
            log::info!("[WORKFLOW] Retry ignored in {}", self.state.label());
            return None;
        }
        let payload = self.payload.clone()?;
        log::info!("[WORKFLOW] Retrying {}", payload.file_name);
        Some(self.begin(payload))
    }

    /// Apply a finished submission. Returns `false` for stale completions.
    pub fn complete(&mut self, outcome: SubmissionOutcome) -> bool {
        if outcome.generation != self.generation || self.state != ScanState::Submitting {
            log::info!(
                "[WORKFLOW] Dropping stale completion (gen {} vs current {})",
                outcome.generation,
                self.generation
            );
            return false;
        }

        if let LocationStatus::Failed(e) = &outcome.location {
            self.notify(NotificationKind::Info, format!("Location unavailable: {}", e));
        }
        self.location_status = outcome.location;

        match outcome.response.and_then(interpret) {
            Ok(interpretation) => {
                if let Some(advisory) = &interpretation.advisory {
                    self.notify(NotificationKind::Warning, advisory.message.clone());
                }
                self.record(&interpretation);
                self.transition(ScanState::Displaying(interpretation));
            }
            Err(e) => {
                log::error!("[WORKFLOW] Submission failed ({}): {}", e.kind(), e);
                self.notify(NotificationKind::Error, e.message());
                self.transition(ScanState::ErrorDisplayed(e));
            }
        }
        true
    }

    /// Drop the selection and any result. In-flight completions become stale.
    pub fn clear(&mut self) {
        self.release_selection();
        self.transition(ScanState::Idle);
    }

    /// `accept` + `send` + `complete` in one call.
    pub async fn submit(&mut self, selection: ImageSelection) -> &ScanState {
        if let Ok(submission) = self.accept(selection).await {
            let outcome = submission.send().await;
            self.complete(outcome);
        }
        &self.state
    }

    /// `retry` + `send` + `complete` in one call.
    pub async fn retry_now(&mut self) -> &ScanState {
        if let Some(submission) = self.retry() {
            let outcome = submission.send().await;
            self.complete(outcome);
        }
        &self.state
    }

    fn begin(&mut self, payload: ImagePayload) -> Submission {
        self.generation += 1;
        self.last_record_id = None;
        self.location_status = LocationStatus::Absent;
        self.transition(ScanState::Submitting);
        Submission {
            generation: self.generation,
            payload,
            api: Arc::clone(&self.api),
            location: self.location.clone(),
        }
    }

    fn reject(&mut self, reason: ValidationError) -> ScanError {
        log::warn!("[WORKFLOW] Rejected: {}", reason);
        let err = ScanError::Validation(reason);
        self.notify(NotificationKind::Error, err.message());
        self.transition(ScanState::Idle);
        err
    }

    fn record(&mut self, interpretation: &Interpretation) {
        let (Some(store), Some(selection)) = (&self.history, &self.selection) else {
            return;
        };
        let record = ScanRecord::new(
            selection.uri.clone(),
            interpretation,
            self.location_status.sample(),
        );
        self.last_record_id = Some(record.id.clone());
        store.add(record);
    }

    fn release_selection(&mut self) {
        self.generation += 1;
        if let Some(old) = self.selection.take() {
            log::info!("[WORKFLOW] Released {}", old.uri);
        }
        self.payload = None;
        self.last_record_id = None;
        self.location_status = LocationStatus::Absent;
    }

    fn transition(&mut self, next: ScanState) {
        if self.state.label() != next.label() {
            log::info!("[WORKFLOW] {} → {}", self.state.label(), next.label());
        }
        self.state = next;
    }

    fn notify(&mut self, kind: NotificationKind, message: impl Into<String>) {
        self.notifications.push(Notification {
            kind,
            message: message.into(),
        });
    }
}
