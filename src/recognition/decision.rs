use super::{Recognition, RecognitionResponse};

pub const DEFAULT_MIN_CONFIDENCE: f64 = 0.4;

/// Mutually exclusive rendering path for a recognition response.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum Branch {
    Error,
    LowConfidence,
    Confirmed,
}

/// Classifies a parsed response. Precedence: server error, then low
/// confidence (flagged by the server or below the threshold), then confirmed.
pub fn classify(response: &RecognitionResponse) -> Branch {
    if response.error_text().is_some() {
        return Branch::Error;
    }

    if response.low_confidence == Some(true) || response.probability() < response.threshold() {
        return Branch::LowConfidence;
    }

    Branch::Confirmed
}

pub fn classify_recognition(recognition: &Recognition) -> Branch {
    match recognition {
        Recognition::Parsed(response) => classify(response),
        Recognition::Malformed(_) => Branch::Error,
    }
}
