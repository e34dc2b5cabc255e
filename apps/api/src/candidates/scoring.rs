//! Batch scoring and batch persistence of score results.
//!
//! Both are a fan-out of one backend call per candidate followed by a join.
//! Scoring tolerates per-candidate failures (the candidate is simply left
//! unscored); saving does not, since a partial save must be visible to the
//! user.

use std::sync::Arc;

use futures::stream::{self, StreamExt};
use serde_json::{json, Value};
use tracing::{info, warn};
use uuid::Uuid;

use crate::backend::{BackendError, RecruitingBackend};
use crate::candidates::ranking::ScoreMap;
use crate::errors::AppError;
use crate::models::job::Job;
use crate::models::score::{ScoreRequest, ScoreResult};

/// The job-side input of a score request: the posting's parsed requirement
/// analysis, or `{}` when there is none.
pub fn job_blob(job: &Job) -> Value {
    match job.analysis_result.as_deref().map(str::trim) {
        Some(raw) if !raw.is_empty() => serde_json::from_str(raw).unwrap_or_else(|e| {
            warn!("Job {} analysis_result is not valid JSON: {}", job.id, e);
            json!({})
        }),
        _ => json!({}),
    }
}

/// Scores every file against the job. Files without a usable analysis, or
/// whose scoring call fails, are absent from the result.
pub async fn run_batch_scoring(
    backend: Arc<dyn RecruitingBackend>,
    job: &Job,
    files: &[String],
    concurrency: usize,
) -> ScoreMap {
    let job_blob = job_blob(job);

    let outcomes: Vec<(String, Option<ScoreResult>)> = stream::iter(files.to_vec())
        .map(|file| {
            let backend = backend.clone();
            let job_blob = job_blob.clone();
            async move {
                let score = score_one(backend.as_ref(), job_blob, &file).await;
                (file, score)
            }
        })
        .buffered(concurrency.max(1))
        .collect()
        .await;

    let scores: ScoreMap = outcomes
        .into_iter()
        .filter_map(|(file, score)| score.map(|s| (file, s)))
        .collect();

    info!(
        "Scored {}/{} candidates for job {}",
        scores.len(),
        files.len(),
        job.id
    );
    scores
}

async fn score_one(
    backend: &dyn RecruitingBackend,
    job_blob: Value,
    file: &str,
) -> Option<ScoreResult> {
    let analysis = match backend.get_candidate_analysis(file).await {
        Ok(Some(analysis)) => analysis,
        Ok(None) => return None,
        Err(e) => {
            warn!("Failed to fetch analysis for {} before scoring: {}", file, e);
            return None;
        }
    };

    let candidate: Value = match analysis.blob().map(serde_json::from_str::<Value>) {
        Some(Ok(candidate)) => candidate,
        Some(Err(e)) => {
            warn!("Analysis for {} is not valid JSON, not scoring: {}", file, e);
            return None;
        }
        None => return None,
    };

    let request = ScoreRequest {
        job: job_blob,
        candidate,
    };
    match backend.compute_score(&request).await {
        Ok(score) => Some(score),
        Err(e) => {
            warn!("Failed to score {}: {}", file, e);
            None
        }
    }
}

/// Persists every score, waiting for all calls before reporting.
///
/// Returns the number saved; any failure fails the whole operation.
pub async fn save_batch_scores(
    backend: Arc<dyn RecruitingBackend>,
    job_id: Uuid,
    scores: &ScoreMap,
    concurrency: usize,
) -> Result<usize, AppError> {
    let results: Vec<(String, Result<(), BackendError>)> = stream::iter(scores.clone())
        .map(|(file, score)| {
            let backend = backend.clone();
            async move {
                let saved = backend.save_score_analysis(job_id, &file, &score).await;
                (file, saved)
            }
        })
        .buffer_unordered(concurrency.max(1))
        .collect()
        .await;

    let total = results.len();
    let mut first_error = None;
    let mut failed = 0;
    for (file, result) in results {
        if let Err(e) = result {
            warn!("Failed to save score for {}: {}", file, e);
            failed += 1;
            first_error.get_or_insert(e);
        }
    }

    match first_error {
        Some(e) => {
            warn!("{}/{} score saves failed for job {}", failed, total, job_id);
            Err(e.into())
        }
        None => {
            info!("Saved {} score results for job {}", total, job_id);
            Ok(total)
        }
    }
}
