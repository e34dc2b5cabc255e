use std::sync::Arc;

use tracing::{info, warn};
use uuid::Uuid;

use crate::backend::RecruitingBackend;
use crate::candidates::board::{BoardSnapshot, CandidateBoard};
use crate::candidates::ranking::{score_map_from_analyses, ScoreMap};
use crate::candidates::reconcile::{reconcile_candidates, ReconcileOptions};
use crate::jobs::files::JobFileList;
use crate::models::job::Job;

/// Rebuilds a job's board from its current file list and saved scores.
///
/// Lookups and the saved-score fetch run concurrently. The result is only
/// published if no newer rebuild of the same board started in the meantime.
/// Either way the returned snapshot holds the records this call reconciled,
/// so callers can act on the file list they fetched.
pub async fn rebuild_board(
    backend: Arc<dyn RecruitingBackend>,
    board: &CandidateBoard,
    job: &Job,
    options: &ReconcileOptions,
) -> BoardSnapshot {
    let token = board.begin_build();
    let files = JobFileList::decode(job.files.as_deref());

    let lookup = |file: String| {
        let backend = backend.clone();
        async move { backend.get_candidate_analysis(&file).await }
    };

    let (records, saved) = tokio::join!(
        reconcile_candidates(files.names(), lookup, options),
        load_saved_scores(backend.as_ref(), job.id),
    );

    let count = records.len();
    match board.publish(token, records.clone(), saved.clone()).await {
        Some(published) => {
            info!(
                "Rebuilt candidate board for job {} ({} candidates, generation {})",
                job.id,
                count,
                token.generation()
            );
            published
        }
        None => board
            .snapshot()
            .await
            .with_build(token.generation(), records, saved),
    }
}

async fn load_saved_scores(backend: &dyn RecruitingBackend, job_id: Uuid) -> Option<ScoreMap> {
    match backend.get_score_analyses(job_id).await {
        Ok(analyses) => Some(score_map_from_analyses(&analyses)),
        Err(e) => {
            warn!("Failed to load saved scores for job {}: {}", job_id, e);
            None
        }
    }
}
