//! Axum route handlers for a job's candidate board.

use axum::{
    extract::{Path, Query, State},
    Json,
};
use serde::{Deserialize, Serialize};
use tracing::info;
use uuid::Uuid;

use crate::candidates::board::{remaining_files, CandidateView, ScoreOrigin};
use crate::candidates::filter::CandidateSearch;
use crate::candidates::rebuild::rebuild_board;
use crate::candidates::reconcile::CandidateId;
use crate::candidates::scoring::{run_batch_scoring, save_batch_scores};
use crate::errors::AppError;
use crate::jobs::files::JobFileList;
use crate::models::job::JobPayload;
use crate::models::page::{Page, PageParams};
use crate::state::AppState;

// ────────────────────────────────────────────────────────────────────────────
// Request / Response types
// ────────────────────────────────────────────────────────────────────────────

/// Query string of the candidate table: the six search boxes plus paging.
#[derive(Debug, Default, Deserialize)]
pub struct CandidateQuery {
    #[serde(default)]
    pub name: String,
    #[serde(default)]
    pub contact: String,
    #[serde(default)]
    pub cv: String,
    #[serde(default)]
    pub created: String,
    #[serde(default)]
    pub score: String,
    #[serde(default)]
    pub summary: String,
    pub page: Option<u32>,
    pub per_page: Option<u32>,
}

impl CandidateQuery {
    fn split(self) -> (CandidateSearch, Page) {
        let page = PageParams {
            page: self.page,
            per_page: self.per_page,
        }
        .resolve();
        let search = CandidateSearch {
            name: self.name,
            contact: self.contact,
            cv: self.cv,
            created: self.created,
            score: self.score,
            summary: self.summary,
        };
        (search, page)
    }
}

#[derive(Debug, Deserialize)]
pub struct DeleteCandidatesRequest {
    pub ids: Vec<CandidateId>,
}

#[derive(Debug, Serialize)]
pub struct SaveAnalysisResponse {
    pub job_id: Uuid,
    pub saved: usize,
}

// ────────────────────────────────────────────────────────────────────────────
// Handlers
// ────────────────────────────────────────────────────────────────────────────

/// GET /api/v1/jobs/:id/candidates
///
/// Rebuilds the board from the job's current file list, then ranks, filters
/// and pages it.
pub async fn handle_get_candidates(
    State(state): State<AppState>,
    Path(job_id): Path<Uuid>,
    Query(query): Query<CandidateQuery>,
) -> Result<Json<CandidateView>, AppError> {
    let job = state.backend.get_job(job_id).await?;
    let board = state.boards.board(job_id).await;
    let snapshot =
        rebuild_board(state.backend.clone(), &board, &job, &state.reconcile_options()).await;

    let (search, page) = query.split();
    Ok(Json(snapshot.view(&search, page)))
}

/// POST /api/v1/jobs/:id/analysis/run
///
/// Scores every attached file against the job. The scores are transient
/// until saved.
pub async fn handle_run_analysis(
    State(state): State<AppState>,
    Path(job_id): Path<Uuid>,
) -> Result<Json<CandidateView>, AppError> {
    let job = state.backend.get_job(job_id).await?;
    let files = JobFileList::decode(job.files.as_deref());
    if files.is_empty() {
        return Err(AppError::Validation(
            "Job has no candidate files to analyse".to_string(),
        ));
    }

    let options = state.reconcile_options();
    let scores = run_batch_scoring(
        state.backend.clone(),
        &job,
        files.names(),
        options.concurrency,
    )
    .await;

    let board = state.boards.board(job_id).await;
    board.set_transient_scores(scores).await;
    let snapshot = rebuild_board(state.backend.clone(), &board, &job, &options).await;

    Ok(Json(
        snapshot.view(&CandidateSearch::default(), PageParams::default().resolve()),
    ))
}

/// POST /api/v1/jobs/:id/analysis/save
///
/// Persists the scores of the last unsaved run.
pub async fn handle_save_analysis(
    State(state): State<AppState>,
    Path(job_id): Path<Uuid>,
) -> Result<Json<SaveAnalysisResponse>, AppError> {
    let board = state.boards.board(job_id).await;
    let snapshot = board.snapshot().await;
    if snapshot.score_origin != ScoreOrigin::Transient || snapshot.scores.is_empty() {
        return Err(AppError::Validation(
            "No unsaved analysis results for this job".to_string(),
        ));
    }

    let saved = save_batch_scores(
        state.backend.clone(),
        job_id,
        &snapshot.scores,
        state.config.lookup_concurrency,
    )
    .await?;
    board.mark_scores_saved().await;

    Ok(Json(SaveAnalysisResponse { job_id, saved }))
}

/// POST /api/v1/jobs/:id/candidates/delete
pub async fn handle_delete_candidates(
    State(state): State<AppState>,
    Path(job_id): Path<Uuid>,
    Json(request): Json<DeleteCandidatesRequest>,
) -> Result<Json<CandidateView>, AppError> {
    if request.ids.is_empty() {
        return Err(AppError::Validation("ids cannot be empty".to_string()));
    }
    delete_candidates(&state, job_id, &request.ids).await.map(Json)
}

/// DELETE /api/v1/jobs/:id/candidates/:candidate
///
/// `candidate` is `b:<backend id>` or `p:<position>`.
pub async fn handle_delete_candidate(
    State(state): State<AppState>,
    Path((job_id, candidate)): Path<(Uuid, String)>,
) -> Result<Json<CandidateView>, AppError> {
    let id: CandidateId = candidate.parse().map_err(AppError::Validation)?;
    delete_candidates(&state, job_id, &[id]).await.map(Json)
}

/// Removes candidates from the job's file list and persists the rest.
///
/// Ids are resolved against the records this call reconciles from the job it
/// just fetched, not against the board's published snapshot.
async fn delete_candidates(
    state: &AppState,
    job_id: Uuid,
    ids: &[CandidateId],
) -> Result<CandidateView, AppError> {
    let job = state.backend.get_job(job_id).await?;
    let board = state.boards.board(job_id).await;
    let options = state.reconcile_options();
    let current = rebuild_board(state.backend.clone(), &board, &job, &options).await;

    let remaining = remaining_files(&current.records, ids).map_err(|unknown| {
        let unknown: Vec<String> = unknown.iter().map(CandidateId::to_string).collect();
        AppError::NotFound(format!("Candidates not found: {}", unknown.join(", ")))
    })?;

    let payload = JobPayload::with_files(&job, JobFileList::new(remaining).encode());
    let updated = state.backend.update_job(job_id, &payload).await?;
    info!("Removed {} candidates from job {}", ids.len(), job_id);

    let snapshot = rebuild_board(state.backend.clone(), &board, &updated, &options).await;
    Ok(snapshot.view(&CandidateSearch::default(), PageParams::default().resolve()))
}
