use chrono::NaiveDate;
use serde::{Deserialize, Serialize};
use uuid::Uuid;

/// A job posting as returned by the recruiting backend.
///
/// `files` holds the serialized candidate file list; decode it with
/// [`crate::jobs::files::JobFileList`]. `analysis_result` is the serialized
/// requirement analysis the backend produced for the posting.
#[derive(Debug, Clone, Serialize, Deserialize, PartialEq)]
pub struct Job {
    pub id: Uuid,
    pub title: String,
    #[serde(default)]
    pub description: Option<String>,
    #[serde(default)]
    pub files: Option<String>,
    #[serde(default)]
    pub analysis_result: Option<String>,
    #[serde(default)]
    pub owner_id: Option<Uuid>,
    #[serde(default)]
    pub created_at: Option<String>,
}

/// Body for job create/update calls.
#[derive(Debug, Clone, Serialize, Deserialize, PartialEq, Default)]
pub struct JobPayload {
    pub title: String,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub description: Option<String>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub files: Option<String>,
}

impl JobPayload {
    /// Payload that rewrites only the file list of an existing job.
    pub fn with_files(job: &Job, files: String) -> Self {
        Self {
            title: job.title.clone(),
            description: job.description.clone(),
            files: Some(files),
        }
    }
}

#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct JobsPage {
    pub data: Vec<Job>,
    pub count: u64,
}

/// Search + paging parameters forwarded to the backend job listing.
#[derive(Debug, Clone, Default, PartialEq)]
pub struct JobListQuery {
    pub skip: u32,
    pub limit: u32,
    pub title: Option<String>,
    pub description: Option<String>,
    pub created_at: Option<NaiveDate>,
}

/// Body of the backend's job requirement analysis call.
///
/// `files` is the serialized file list; the backend expects `"[]"` rather
/// than a missing field when nothing is attached.
#[derive(Debug, Clone, Serialize, Deserialize, PartialEq)]
pub struct JobAnalysisRequest {
    pub id: Uuid,
    pub title: String,
    #[serde(default)]
    pub description: Option<String>,
    #[serde(default)]
    pub owner_id: Option<Uuid>,
    pub files: String,
}

impl From<&Job> for JobAnalysisRequest {
    fn from(job: &Job) -> Self {
        Self {
            id: job.id,
            title: job.title.clone(),
            description: job.description.clone(),
            owner_id: job.owner_id,
            files: job.files.clone().unwrap_or_else(|| "[]".to_string()),
        }
    }
}
