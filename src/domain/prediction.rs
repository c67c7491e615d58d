// ============================================================
// Layer 3 — Prediction Domain Type
// ============================================================
// Maps the network's single logit to one of two fixed labels.
//
//   logit ──sigmoid──▶ p ∈ (0,1)
//
//   p >= 0.5  →  "Melanocytic (Risk)"   confidence = p
//   p <  0.5  →  "Other (Benign)"       confidence = 1 - p
//
// The boundary is inclusive on the high-risk side: a logit of
// exactly 0 gives p = 0.5 and is reported as Melanocytic.

use std::fmt;

/// Probability at (or above) which a lesion is placed in the
/// melanocytic group.
pub const DECISION_THRESHOLD: f64 = 0.5;

/// The two output classes of the binary head.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum Label {
    /// Melanoma and nevus lesions (class 1 during training)
    Melanocytic,
    /// Everything else (class 0 during training)
    Other,
}

impl Label {
    pub const fn as_str(self) -> &'static str {
        match self {
            Label::Melanocytic => "Melanocytic (Risk)",
            Label::Other       => "Other (Benign)",
        }
    }
}

impl fmt::Display for Label {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.as_str())
    }
}

/// Logistic sigmoid computed in f64.
pub fn sigmoid(logit: f64) -> f64 {
    1.0 / (1.0 + (-logit).exp())
}

/// Outcome of classifying a single image.
#[derive(Debug, Clone, Copy, PartialEq)]
pub struct Prediction {
    pub label: Label,
    /// Probability of the predicted label, always in [0.5, 1.0]
    pub confidence: f64,
    /// Sigmoid of the logit, unrounded
    pub raw_probability: f64,
}

impl Prediction {
    pub fn from_logit(logit: f32) -> Self {
        Self::from_probability(sigmoid(f64::from(logit)))
    }

    pub fn from_probability(p: f64) -> Self {
        if p >= DECISION_THRESHOLD {
            Self { label: Label::Melanocytic, confidence: p, raw_probability: p }
        } else {
            Self { label: Label::Other, confidence: 1.0 - p, raw_probability: p }
        }
    }

    pub fn confidence_percent(&self) -> f64 {
        self.confidence * 100.0
    }

    /// Confidence as shown to clients, e.g. `"87.25%"`.
    pub fn formatted_confidence(&self) -> String {
        format!("{:.2}%", self.confidence_percent())
    }
}
