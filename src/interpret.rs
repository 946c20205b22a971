//! Turns a raw `/predict` body into a display-ready result.
//!
//! Thresholds are fixed so banding is reproducible across front-ends.

use crate::api::types::PredictionResponse;
use crate::error::{ScanError, INVALID_RESPONSE_MESSAGE};
use serde::{Deserialize, Serialize};
use std::collections::HashMap;

/// Below this, a low-confidence advisory accompanies the result.
pub const LOW_CONFIDENCE_THRESHOLD: f64 = 0.40;
/// At or above this, the result is banded favorable.
pub const FAVORABLE_THRESHOLD: f64 = 0.70;
/// At or above this (and below favorable), the result is banded caution.
pub const CAUTION_THRESHOLD: f64 = 0.40;

pub const LOW_CONFIDENCE_ADVISORY: &str =
    "Low confidence prediction. Please try with a clearer image.";

/// Classes the service is known to emit.
pub const KNOWN_CLASSES: [&str; 3] = ["Early Blight", "Late Blight", "Healthy"];

/// A successful classification. Immutable once built.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct PredictionResult {
    pub predicted_class: String,
    /// Fraction in [0, 1].
    pub confidence: f64,
}

#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum ConfidenceBand {
    Favorable,
    Caution,
    Unfavorable,
}

impl ConfidenceBand {
    pub fn for_confidence(confidence: f64) -> Self {
        if confidence >= FAVORABLE_THRESHOLD {
            ConfidenceBand::Favorable
        } else if confidence >= CAUTION_THRESHOLD {
            ConfidenceBand::Caution
        } else {
            ConfidenceBand::Unfavorable
        }
    }

    /// Display color, matching the web dashboard.
    pub fn color(self) -> &'static str {
        match self {
            ConfidenceBand::Favorable => "green",
            ConfidenceBand::Caution => "orange",
            ConfidenceBand::Unfavorable => "red",
        }
    }
}

/// Non-blocking warning shown next to a still-valid result.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct Advisory {
    pub message: String,
}

/// Result plus everything the presentation layer derives from it.
#[derive(Debug, Clone, PartialEq)]
pub struct Interpretation {
    pub result: PredictionResult,
    pub band: ConfidenceBand,
    pub advisory: Option<Advisory>,
    pub class_confidences: Option<HashMap<String, f64>>,
}

impl Interpretation {
    /// e.g. "85.00%".
    pub fn confidence_display(&self) -> String {
        format!("{}%", format_percentage(self.result.confidence))
    }

    pub fn is_known_class(&self) -> bool {
        KNOWN_CLASSES.contains(&self.result.predicted_class.as_str())
    }
}

/// Map a 2xx body to an `Interpretation`.
///
/// A body without a non-empty `class`, or without a finite `confidence`
/// in [0, 1], is malformed and becomes a network error rather than a
/// zero-confidence result.
pub fn interpret(response: PredictionResponse) -> Result<Interpretation, ScanError> {
    let predicted_class = match response.class {
        Some(c) if !c.trim().is_empty() => c,
        _ => {
            log::warn!("[INTERPRET] Response missing class");
            return Err(ScanError::network(INVALID_RESPONSE_MESSAGE));
        }
    };
    let confidence = match response.confidence {
        Some(c) if c.is_finite() && (0.0..=1.0).contains(&c) => c,
        other => {
            log::warn!("[INTERPRET] Response confidence unusable: {:?}", other);
            return Err(ScanError::network(INVALID_RESPONSE_MESSAGE));
        }
    };

    let band = ConfidenceBand::for_confidence(confidence);
    let advisory = (confidence < LOW_CONFIDENCE_THRESHOLD).then(|| Advisory {
        message: LOW_CONFIDENCE_ADVISORY.to_string(),
    });

    log::info!(
        "[INTERPRET] {} at {}% ({:?}{})",
        predicted_class,
        format_percentage(confidence),
        band,
        if advisory.is_some() { ", low confidence" } else { "" }
    );

    Ok(Interpretation {
        result: PredictionResult {
            predicted_class,
            confidence,
        },
        band,
        advisory,
        class_confidences: response.class_confidences,
    })
}

/// Fraction → percentage with two decimals, no sign: 0.85 → "85.00".
pub fn format_percentage(confidence: f64) -> String {
    format!("{:.2}", confidence * 100.0)
}

/// Human file size with 1024-based units: 2048 → "2 KB", 1536 → "1.5 KB".
pub fn format_file_size(bytes: u64) -> String {
    const UNITS: [&str; 4] = ["Bytes", "KB", "MB", "GB"];
    if bytes == 0 {
        return "0 Bytes".to_string();
    }
    let mut value = bytes as f64;
    let mut unit = 0;
    while value >= 1024.0 && unit < UNITS.len() - 1 {
        value /= 1024.0;
        unit += 1;
    }
    let fixed = format!("{:.2}", value);
    let trimmed = fixed.trim_end_matches('0').trim_end_matches('.');
    format!("{} {}", trimmed, UNITS[unit])
}
