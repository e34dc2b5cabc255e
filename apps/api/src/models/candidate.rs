use serde::{Deserialize, Serialize};
use serde_json::Value;

/// The backend's stored analysis of one uploaded CV.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct CandidateAnalysis {
    /// Backend identifier. Usually a UUID string, occasionally an integer.
    #[serde(default)]
    pub id: Value,
    #[serde(default)]
    pub file_name: Option<String>,
    #[serde(default)]
    pub analysis_result: Option<String>,
    #[serde(default)]
    pub created_at: Option<String>,
}

impl CandidateAnalysis {
    /// The backend id when it is an integer (or an integer-valued string).
    pub fn backend_id(&self) -> Option<i64> {
        match &self.id {
            Value::Number(n) => n.as_i64(),
            Value::String(s) => s.trim().parse().ok(),
            _ => None,
        }
    }

    /// The serialized analysis blob, if the backend returned a non-empty one.
    pub fn blob(&self) -> Option<&str> {
        self.analysis_result
            .as_deref()
            .map(str::trim)
            .filter(|raw| !raw.is_empty())
    }
}

#[derive(Debug, Clone, Serialize, Deserialize, PartialEq)]
pub struct UploadedCv {
    pub file_name: String,
}
