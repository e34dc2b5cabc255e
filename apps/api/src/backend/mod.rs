//! Boundary to the recruiting backend that owns jobs, CV analyses and scores.
//!
//! Every other module talks to the backend through [`RecruitingBackend`].
//! `AppState` carries it as `Arc<dyn RecruitingBackend>`; production wires in
//! [`http::HttpBackend`], tests swap in the in-memory fake.

use async_trait::async_trait;
use bytes::Bytes;
use serde_json::Value;
use thiserror::Error;
use uuid::Uuid;

use crate::models::candidate::{CandidateAnalysis, UploadedCv};
use crate::models::job::{Job, JobAnalysisRequest, JobListQuery, JobPayload, JobsPage};
use crate::models::score::{ScoreAnalysis, ScoreRequest, ScoreResult};

pub mod http;

#[cfg(test)]
pub mod fake;

#[derive(Debug, Error)]
pub enum BackendError {
    #[error("HTTP error: {0}")]
    Http(#[from] reqwest::Error),

    #[error("Backend error (status {status}): {message}")]
    Api { status: u16, message: String },

    #[error("Not found: {0}")]
    NotFound(String),

    #[error("JSON parse error: {0}")]
    Parse(#[from] serde_json::Error),

    #[error("Invalid backend URL: {0}")]
    InvalidUrl(String),
}

#[async_trait]
pub trait RecruitingBackend: Send + Sync {
    async fn list_jobs(&self, query: &JobListQuery) -> Result<JobsPage, BackendError>;

    async fn get_job(&self, id: Uuid) -> Result<Job, BackendError>;

    async fn create_job(&self, payload: &JobPayload) -> Result<Job, BackendError>;

    async fn update_job(&self, id: Uuid, payload: &JobPayload) -> Result<Job, BackendError>;

    async fn delete_job(&self, id: Uuid) -> Result<(), BackendError>;

    /// Runs the requirement analysis of a posting. The backend stores the
    /// result on the job and also returns it.
    async fn analyse_job(&self, request: &JobAnalysisRequest) -> Result<Value, BackendError>;

    /// `Ok(None)` when the backend has no analysis for this file.
    async fn get_candidate_analysis(
        &self,
        file_name: &str,
    ) -> Result<Option<CandidateAnalysis>, BackendError>;

    async fn get_score_analyses(&self, job_id: Uuid) -> Result<Vec<ScoreAnalysis>, BackendError>;

    async fn compute_score(&self, request: &ScoreRequest) -> Result<ScoreResult, BackendError>;

    async fn save_score_analysis(
        &self,
        job_id: Uuid,
        candidate_file_name: &str,
        result: &ScoreResult,
    ) -> Result<(), BackendError>;

    /// Stores and analyses a CV, returning the name it is stored under.
    async fn upload_candidate_cv(
        &self,
        file_name: &str,
        content: Bytes,
    ) -> Result<UploadedCv, BackendError>;
}
