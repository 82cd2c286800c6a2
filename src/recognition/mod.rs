//! Recognition responses: validated parsing, branch classification, and
//! rendering.

pub mod advice;
pub mod decision;
pub mod render;

use serde::{Deserialize, Serialize};
use serde_json::{Map, Value};

pub use decision::{classify, classify_recognition, Branch, DEFAULT_MIN_CONFIDENCE};
pub use render::{render_recognition, Rendered, ResultAction, ResultView};

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct Alternative {
    pub name: String,
    #[serde(default)]
    pub probability: f64,
}

#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
pub struct Nutrition {
    #[serde(default)]
    pub items: Vec<Map<String, Value>>,
}

/// The `/predict` payload.
///
/// `min_confidence` stays an untyped value: anything that is not a finite
/// number in `[0, 1]` is replaced by the default threshold instead of failing
/// the parse.
#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
pub struct RecognitionResponse {
    #[serde(default)]
    pub error: Option<String>,
    #[serde(default)]
    pub food_name: Option<String>,
    #[serde(default)]
    pub probability: Option<f64>,
    #[serde(default)]
    pub low_confidence: Option<bool>,
    #[serde(default)]
    pub min_confidence: Option<Value>,
    #[serde(default)]
    pub alternatives: Option<Vec<Alternative>>,
    #[serde(default)]
    pub nutrition: Option<Nutrition>,
    #[serde(default)]
    pub ai_answer: Option<String>,
    #[serde(default)]
    pub message: Option<String>,
}

impl RecognitionResponse {
    /// Non-empty server error text, if any.
    pub fn error_text(&self) -> Option<&str> {
        self.error.as_deref().filter(|e| !e.is_empty())
    }

    /// Match probability; absent or non-finite values count as 0.
    pub fn probability(&self) -> f64 {
        match self.probability {
            Some(p) if p.is_finite() => p,
            _ => 0.0,
        }
    }

    /// Confidence threshold, falling back to [`DEFAULT_MIN_CONFIDENCE`].
    pub fn threshold(&self) -> f64 {
        self.min_confidence
            .as_ref()
            .and_then(Value::as_f64)
            .filter(|t| t.is_finite() && (0.0..=1.0).contains(t))
            .unwrap_or(DEFAULT_MIN_CONFIDENCE)
    }

    pub fn alternatives(&self) -> &[Alternative] {
        self.alternatives.as_deref().unwrap_or(&[])
    }

    /// Key/value pairs of the first nutrition item, in server order.
    pub fn first_nutrition_item(&self) -> Option<&Map<String, Value>> {
        self.nutrition.as_ref()?.items.first()
    }
}

/// A `/predict` body after schema validation.
#[derive(Debug, Clone, PartialEq)]
pub enum Recognition {
    Parsed(RecognitionResponse),
    /// Valid JSON that does not match the response schema.
    Malformed(String),
}

impl Recognition {
    pub fn from_value(value: Value) -> Self {
        if !value.is_object() {
            return Recognition::Malformed("expected a JSON object".to_string());
        }

        let response = match serde_json::from_value::<RecognitionResponse>(value) {
            Ok(response) => response,
            Err(e) => return Recognition::Malformed(e.to_string()),
        };

        if let Some(p) = response.probability {
            if !(0.0..=1.0).contains(&p) {
                return Recognition::Malformed(format!("probability {} outside [0, 1]", p));
            }
        }

        Recognition::Parsed(response)
    }

    pub fn from_json(body: &str) -> Result<Self, serde_json::Error> {
        serde_json::from_str::<Value>(body).map(Self::from_value)
    }
}
