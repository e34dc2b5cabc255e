use serde::{Deserialize, Serialize};
use serde_json::{Map, Value};
use uuid::Uuid;

/// Output of one job/candidate scoring run.
///
/// `score` is usually a number but older saved results carry it as a string,
/// so it stays a raw JSON value. The per-section breakdown (degree,
/// experience, ...) is kept verbatim in `details`.
#[derive(Debug, Clone, Serialize, Deserialize, PartialEq, Default)]
pub struct ScoreResult {
    #[serde(default)]
    pub score: Value,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub summary_comment: Option<String>,
    #[serde(flatten)]
    pub details: Map<String, Value>,
}

impl ScoreResult {
    pub fn from_score(score: impl Into<Value>) -> Self {
        Self {
            score: score.into(),
            ..Default::default()
        }
    }

    /// Numeric score; strings are parsed, anything else is not a score.
    pub fn numeric(&self) -> Option<f64> {
        let value = match &self.score {
            Value::Number(n) => n.as_f64(),
            Value::String(s) => s.trim().parse::<f64>().ok(),
            _ => None,
        };
        value.filter(|v| !v.is_nan())
    }

    /// Score as it is displayed and substring-searched.
    pub fn score_text(&self) -> String {
        match &self.score {
            Value::Null => String::new(),
            Value::String(s) => s.clone(),
            Value::Number(n) => match n.as_f64() {
                Some(f) if n.is_f64() => f.to_string(),
                _ => n.to_string(),
            },
            other => other.to_string(),
        }
    }

    pub fn summary(&self) -> &str {
        self.summary_comment.as_deref().unwrap_or("")
    }
}

/// A persisted score result row, as listed per job by the backend.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct ScoreAnalysis {
    #[serde(default)]
    pub job_id: Option<Uuid>,
    pub candidate_file_name: String,
    /// Serialized [`ScoreResult`].
    pub score_result: String,
    #[serde(default)]
    pub created_at: Option<String>,
}

/// Body of the score computation call.
#[derive(Debug, Clone, Serialize)]
pub struct ScoreRequest {
    pub job: Value,
    pub candidate: Value,
}
