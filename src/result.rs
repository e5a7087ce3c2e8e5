use serde::Serialize;

use crate::confidence::passes_gate;
use crate::ocr::Rect;

/// One horizontal band of a strip-assembled capture.
#[derive(Debug, Clone, PartialEq, Serialize)]
pub struct StripResult {
    /// 0-based, top to bottom.
    pub index: usize,
    pub text: String,
    pub value: Option<f64>,
    pub bounding_box: Rect,
}

/// A trusted reading. Only built through [`ExtractionResult::accept`], so
/// `confidence` is always at or above the gate.
#[derive(Debug, Clone, PartialEq, Serialize)]
#[non_exhaustive]
pub struct ExtractionResult {
    /// mg/dL.
    pub value: f64,
    /// The text span the value was read from.
    pub raw_text: String,
    pub confidence: f64,
    pub bounding_box: Option<Rect>,
    /// Per-strip diagnostics, present only in strip mode.
    pub strip_results: Option<Vec<StripResult>>,
}

impl ExtractionResult {
    /// `None` unless the value is a positive number and `confidence` clears the gate.
    pub fn accept(
        value: f64,
        raw_text: impl Into<String>,
        confidence: f64,
        bounding_box: Option<Rect>,
    ) -> Option<Self> {
        if !(value.is_finite() && value > 0.0) || !passes_gate(confidence) {
            return None;
        }
        Some(ExtractionResult {
            value,
            raw_text: raw_text.into(),
            confidence,
            bounding_box,
            strip_results: None,
        })
    }

    pub fn with_strip_results(mut self, strips: Vec<StripResult>) -> Self {
        self.strip_results = Some(strips);
        self
    }
}
