//! Axum route handlers for job postings and CV uploads.

use axum::{
    extract::{Multipart, Path, Query, State},
    http::StatusCode,
    Json,
};
use bytes::Bytes;
use chrono::NaiveDate;
use futures::stream::{self, StreamExt};
use serde::{Deserialize, Serialize};
use tracing::{info, warn};
use uuid::Uuid;

use crate::errors::AppError;
use crate::jobs::files::JobFileList;
use crate::jobs::summary::{top_candidates, TopCandidate};
use crate::models::job::{Job, JobAnalysisRequest, JobListQuery, JobPayload};
use crate::models::page::PageParams;
use crate::state::AppState;

pub const MAX_TITLE_LEN: usize = 255;
pub const MAX_DESCRIPTION_LEN: usize = 10_000;
/// The backend stores the serialized file list in a bounded column.
pub const MAX_FILES_LEN: usize = 1_000;

// ────────────────────────────────────────────────────────────────────────────
// Request / Response types
// ────────────────────────────────────────────────────────────────────────────

#[derive(Debug, Default, Deserialize)]
pub struct JobListParams {
    pub title: Option<String>,
    pub description: Option<String>,
    pub created_date: Option<NaiveDate>,
    pub page: Option<u32>,
    pub per_page: Option<u32>,
}

#[derive(Debug, Serialize)]
pub struct JobListResponse {
    pub data: Vec<JobDetailResponse>,
    pub count: u64,
    pub page: u32,
    pub per_page: u32,
}

#[derive(Debug, Deserialize)]
pub struct JobRequest {
    pub title: String,
    #[serde(default)]
    pub description: Option<String>,
    #[serde(default)]
    pub files: Vec<String>,
}

/// A job with its file list already decoded.
#[derive(Debug, Serialize)]
pub struct JobDetailResponse {
    #[serde(flatten)]
    pub job: Job,
    pub candidate_files: Vec<String>,
    /// Only filled in by the job list.
    #[serde(skip_serializing_if = "Option::is_none")]
    pub top_candidates: Option<Vec<TopCandidate>>,
}

impl From<Job> for JobDetailResponse {
    fn from(job: Job) -> Self {
        let candidate_files = JobFileList::decode(job.files.as_deref()).names().to_vec();
        Self {
            job,
            candidate_files,
            top_candidates: None,
        }
    }
}

/// Outcome of the requirement analysis triggered by a job save.
#[derive(Debug, Clone, PartialEq, Serialize)]
#[serde(tag = "status", rename_all = "snake_case")]
pub enum JobAnalysisStatus {
    Completed,
    Failed { message: String },
}

/// Response of job create/update: the saved job plus how its analysis went.
#[derive(Debug, Serialize)]
pub struct JobSavedResponse {
    #[serde(flatten)]
    pub detail: JobDetailResponse,
    pub analysis: JobAnalysisStatus,
}

#[derive(Debug, Deserialize)]
pub struct DeleteJobsRequest {
    pub ids: Vec<Uuid>,
}

#[derive(Debug, Serialize)]
pub struct DeleteJobsResponse {
    pub deleted: usize,
}

#[derive(Debug, Serialize)]
pub struct UploadResponse {
    pub file_name: String,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub job: Option<JobDetailResponse>,
}

// ────────────────────────────────────────────────────────────────────────────
// Validation
// ────────────────────────────────────────────────────────────────────────────

fn non_blank(value: Option<String>) -> Option<String> {
    value
        .map(|v| v.trim().to_string())
        .filter(|v| !v.is_empty())
}

fn encode_files(files: &JobFileList) -> Result<String, AppError> {
    let encoded = files.encode();
    if encoded.chars().count() > MAX_FILES_LEN {
        return Err(AppError::Validation(format!(
            "Too many candidate files for one job ({} attached)",
            files.len()
        )));
    }
    Ok(encoded)
}

/// Checks a create/update body against the backend's column limits.
fn validate_job_request(request: JobRequest) -> Result<JobPayload, AppError> {
    let title = request.title.trim().to_string();
    if title.is_empty() {
        return Err(AppError::Validation("title cannot be empty".to_string()));
    }
    if title.chars().count() > MAX_TITLE_LEN {
        return Err(AppError::Validation(format!(
            "title cannot exceed {MAX_TITLE_LEN} characters"
        )));
    }

    let description = non_blank(request.description);
    if description
        .as_ref()
        .is_some_and(|d| d.chars().count() > MAX_DESCRIPTION_LEN)
    {
        return Err(AppError::Validation(format!(
            "description cannot exceed {MAX_DESCRIPTION_LEN} characters"
        )));
    }

    let mut files = JobFileList::default();
    for name in request.files {
        let name = name.trim().to_string();
        if !name.is_empty() {
            files.push(name);
        }
    }

    Ok(JobPayload {
        title,
        description,
        files: Some(encode_files(&files)?),
    })
}

/// Runs the requirement analysis for a freshly saved job.
///
/// The save stands even when the analysis fails; the failure is reported in
/// the response instead.
async fn analyse_saved_job(state: &AppState, mut job: Job) -> JobSavedResponse {
    let analysis = match state
        .backend
        .analyse_job(&JobAnalysisRequest::from(&job))
        .await
    {
        Ok(result) => {
            job.analysis_result = Some(result.to_string());
            JobAnalysisStatus::Completed
        }
        Err(e) => {
            warn!("Job {} saved but its analysis failed: {}", job.id, e);
            JobAnalysisStatus::Failed {
                message: e.to_string(),
            }
        }
    };

    JobSavedResponse {
        detail: job.into(),
        analysis,
    }
}

// ────────────────────────────────────────────────────────────────────────────
// Handlers
// ────────────────────────────────────────────────────────────────────────────

/// GET /api/v1/jobs
pub async fn handle_list_jobs(
    State(state): State<AppState>,
    Query(params): Query<JobListParams>,
) -> Result<Json<JobListResponse>, AppError> {
    let page = PageParams {
        page: params.page,
        per_page: params.per_page,
    }
    .resolve();

    let query = JobListQuery {
        skip: page.skip(),
        limit: page.per_page,
        title: non_blank(params.title),
        description: non_blank(params.description),
        created_at: params.created_date,
    };
    let jobs = state.backend.list_jobs(&query).await?;

    let concurrency = state.config.lookup_concurrency;
    let data: Vec<JobDetailResponse> = stream::iter(jobs.data)
        .map(|job| {
            let backend = state.backend.clone();
            async move {
                let top = top_candidates(backend, job.id, concurrency).await;
                JobDetailResponse {
                    top_candidates: Some(top),
                    ..JobDetailResponse::from(job)
                }
            }
        })
        .buffered(concurrency.max(1))
        .collect()
        .await;

    Ok(Json(JobListResponse {
        data,
        count: jobs.count,
        page: page.page,
        per_page: page.per_page,
    }))
}

/// GET /api/v1/jobs/:id
pub async fn handle_get_job(
    State(state): State<AppState>,
    Path(job_id): Path<Uuid>,
) -> Result<Json<JobDetailResponse>, AppError> {
    let job = state.backend.get_job(job_id).await?;
    Ok(Json(job.into()))
}

/// POST /api/v1/jobs
///
/// Saves the job, then runs its requirement analysis.
pub async fn handle_create_job(
    State(state): State<AppState>,
    Json(request): Json<JobRequest>,
) -> Result<(StatusCode, Json<JobSavedResponse>), AppError> {
    let payload = validate_job_request(request)?;
    let job = state.backend.create_job(&payload).await?;
    info!("Created job {} ({})", job.id, job.title);

    let saved = analyse_saved_job(&state, job).await;
    Ok((StatusCode::CREATED, Json(saved)))
}

/// PUT /api/v1/jobs/:id
///
/// Editing a job invalidates any analysis run against the old posting, and
/// re-runs the requirement analysis.
pub async fn handle_update_job(
    State(state): State<AppState>,
    Path(job_id): Path<Uuid>,
    Json(request): Json<JobRequest>,
) -> Result<Json<JobSavedResponse>, AppError> {
    let payload = validate_job_request(request)?;
    let job = state.backend.update_job(job_id, &payload).await?;
    state.boards.board(job_id).await.clear_scores().await;
    info!("Updated job {}", job_id);

    Ok(Json(analyse_saved_job(&state, job).await))
}

/// DELETE /api/v1/jobs/:id
pub async fn handle_delete_job(
    State(state): State<AppState>,
    Path(job_id): Path<Uuid>,
) -> Result<StatusCode, AppError> {
    state.backend.delete_job(job_id).await?;
    let had_board = state.boards.remove(job_id).await;
    info!("Deleted job {} (board dropped: {})", job_id, had_board);

    Ok(StatusCode::NO_CONTENT)
}

/// POST /api/v1/jobs/delete
///
/// Deletes every listed job concurrently. Jobs that were deleted stay
/// deleted when others fail; the first failure is returned.
pub async fn handle_delete_jobs(
    State(state): State<AppState>,
    Json(request): Json<DeleteJobsRequest>,
) -> Result<Json<DeleteJobsResponse>, AppError> {
    if request.ids.is_empty() {
        return Err(AppError::Validation("ids cannot be empty".to_string()));
    }

    let outcomes: Vec<(Uuid, Result<(), AppError>)> = stream::iter(request.ids)
        .map(|job_id| {
            let backend = state.backend.clone();
            async move { (job_id, backend.delete_job(job_id).await.map_err(AppError::from)) }
        })
        .buffer_unordered(state.config.lookup_concurrency.max(1))
        .collect()
        .await;

    let mut deleted = 0;
    let mut first_error = None;
    for (job_id, outcome) in outcomes {
        match outcome {
            Ok(()) => {
                state.boards.remove(job_id).await;
                deleted += 1;
            }
            Err(e) => {
                warn!("Failed to delete job {}: {}", job_id, e);
                if first_error.is_none() {
                    first_error = Some(e);
                }
            }
        }
    }
    info!("Bulk delete removed {} jobs", deleted);

    match first_error {
        Some(e) => Err(e),
        None => Ok(Json(DeleteJobsResponse { deleted })),
    }
}

/// POST /api/v1/candidates/upload
///
/// Multipart form: `file` (required) and `job_id` (optional). With a job id
/// the stored filename is appended to that job's file list.
pub async fn handle_upload_cv(
    State(state): State<AppState>,
    mut multipart: Multipart,
) -> Result<Json<UploadResponse>, AppError> {
    let mut upload: Option<(String, Bytes)> = None;
    let mut job_id: Option<Uuid> = None;

    while let Some(field) = multipart
        .next_field()
        .await
        .map_err(|e| AppError::Validation(format!("Invalid multipart body: {e}")))?
    {
        let name = field.name().map(str::to_string);
        match name.as_deref() {
            Some("file") => {
                let file_name = field
                    .file_name()
                    .map(str::to_string)
                    .filter(|n| !n.trim().is_empty())
                    .ok_or_else(|| AppError::Validation("file has no filename".to_string()))?;
                let content = field
                    .bytes()
                    .await
                    .map_err(|e| AppError::Validation(format!("Failed to read file: {e}")))?;
                upload = Some((file_name, content));
            }
            Some("job_id") => {
                let raw = field
                    .text()
                    .await
                    .map_err(|e| AppError::Validation(format!("Failed to read job_id: {e}")))?;
                if !raw.trim().is_empty() {
                    let id = raw.trim().parse::<Uuid>().map_err(|_| {
                        AppError::Validation(format!("job_id '{raw}' is not a valid id"))
                    })?;
                    job_id = Some(id);
                }
            }
            _ => {}
        }
    }

    let (file_name, content) =
        upload.ok_or_else(|| AppError::Validation("file is required".to_string()))?;
    if content.is_empty() {
        return Err(AppError::Validation(format!("{file_name} is empty")));
    }

    // Resolve the job first so an unknown id fails before anything is stored.
    let job = match job_id {
        Some(id) => Some(state.backend.get_job(id).await?),
        None => None,
    };

    let uploaded = state
        .backend
        .upload_candidate_cv(&file_name, content)
        .await?;
    info!("Uploaded CV {} as {}", file_name, uploaded.file_name);

    let job = match job {
        Some(job) => {
            let mut files = JobFileList::decode(job.files.as_deref());
            files.push(uploaded.file_name.clone());
            let payload = JobPayload::with_files(&job, encode_files(&files)?);
            let updated = state.backend.update_job(job.id, &payload).await?;
            info!("Attached {} to job {}", uploaded.file_name, job.id);
            Some(updated.into())
        }
        None => None,
    };

    Ok(Json(UploadResponse {
        file_name: uploaded.file_name,
        job,
    }))
}
