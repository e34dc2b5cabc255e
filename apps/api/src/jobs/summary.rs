//! Best-scored candidates shown next to each job in the job list.

use std::sync::Arc;

use futures::stream::{self, StreamExt};
use serde::Serialize;
use serde_json::Value;
use tracing::{debug, warn};
use uuid::Uuid;

use crate::backend::RecruitingBackend;
use crate::candidates::extraction::extract_contact;
use crate::models::score::{ScoreAnalysis, ScoreResult};

pub const TOP_CANDIDATES: usize = 3;

#[derive(Debug, Clone, PartialEq, Serialize)]
pub struct TopCandidate {
    pub name: String,
    pub score: f64,
}

/// A saved score row joined with the name from its candidate's analysis.
#[derive(Debug, Clone, PartialEq)]
struct ScoredRow {
    name: String,
    score: f64,
    created_at: Option<String>,
}

/// The job's best saved scores, one entry per candidate name.
///
/// Never fails: a failed score listing gives an empty list, and rows whose
/// analysis cannot be fetched or read are left out.
pub async fn top_candidates(
    backend: Arc<dyn RecruitingBackend>,
    job_id: Uuid,
    concurrency: usize,
) -> Vec<TopCandidate> {
    let analyses = match backend.get_score_analyses(job_id).await {
        Ok(analyses) => analyses,
        Err(e) => {
            warn!("Failed to load score analyses for job {}: {}", job_id, e);
            return Vec::new();
        }
    };

    let rows: Vec<Option<ScoredRow>> = stream::iter(analyses)
        .map(|analysis| {
            let backend = backend.clone();
            async move { scored_row(backend.as_ref(), analysis).await }
        })
        .buffered(concurrency.max(1))
        .collect()
        .await;

    select_top(rows.into_iter().flatten().collect())
}

async fn scored_row(backend: &dyn RecruitingBackend, analysis: ScoreAnalysis) -> Option<ScoredRow> {
    let file = &analysis.candidate_file_name;
    let result: ScoreResult = match serde_json::from_str(&analysis.score_result) {
        Ok(result) => result,
        Err(e) => {
            warn!("Skipping unparseable score result for {}: {}", file, e);
            return None;
        }
    };

    let candidate = match backend.get_candidate_analysis(file).await {
        Ok(Some(candidate)) => candidate,
        Ok(None) => {
            debug!("No analysis stored for scored file {}", file);
            return None;
        }
        Err(e) => {
            warn!("Failed to fetch analysis for {}: {}", file, e);
            return None;
        }
    };
    let blob: Value = serde_json::from_str(candidate.blob()?).ok()?;

    Some(ScoredRow {
        name: extract_contact(&blob).name,
        score: result.numeric().unwrap_or(0.0),
        created_at: analysis.created_at,
    })
}

/// Keeps the most recent row per name, then the highest scores first.
///
/// A row replaces an earlier one only when it is strictly newer; rows
/// without a timestamp count as oldest. Equal scores keep listing order.
fn select_top(rows: Vec<ScoredRow>) -> Vec<TopCandidate> {
    let mut latest: Vec<ScoredRow> = Vec::new();
    for row in rows {
        match latest.iter_mut().find(|kept| kept.name == row.name) {
            Some(kept) => {
                if row.created_at > kept.created_at {
                    *kept = row;
                }
            }
            None => latest.push(row),
        }
    }

    latest.sort_by(|a, b| b.score.total_cmp(&a.score));
    latest
        .into_iter()
        .take(TOP_CANDIDATES)
        .map(|row| TopCandidate {
            name: row.name,
            score: row.score,
        })
        .collect()
}
