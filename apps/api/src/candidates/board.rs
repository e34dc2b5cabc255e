//! Per-job candidate board: the owned view model behind the job-editing
//! screen.
//!
//! A board is replaced wholesale on every rebuild. Rebuilds are not
//! cancelled when a newer one starts; instead each takes a generation token
//! from [`CandidateBoard::begin_build`], and only the holder of the newest
//! token may publish. A slow, older rebuild that finishes last is dropped.

use std::collections::HashMap;
use std::sync::atomic::{AtomicU64, Ordering};
use std::sync::Arc;

use serde::Serialize;
use tokio::sync::RwLock;
use tracing::debug;
use uuid::Uuid;

use crate::candidates::filter::{filter_candidates, CandidateSearch};
use crate::candidates::ranking::{rank_candidates, ScoreMap};
use crate::candidates::reconcile::{CandidateId, CandidateRecord};
use crate::models::page::Page;
use crate::models::score::ScoreResult;

/// Where the board's scores came from.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default, Serialize)]
#[serde(rename_all = "snake_case")]
pub enum ScoreOrigin {
    /// No analysis run yet; ranking is the identity.
    #[default]
    None,
    /// Loaded from previously saved score analyses.
    Saved,
    /// Produced by a batch run and not saved yet.
    Transient,
}

#[derive(Debug, Clone, Copy, PartialEq, Eq, PartialOrd, Ord)]
pub struct BuildToken(u64);

impl BuildToken {
    pub fn generation(self) -> u64 {
        self.0
    }
}

#[derive(Debug, Clone, Default)]
pub struct BoardSnapshot {
    /// Generation of the build that produced `records`; 0 = never built.
    pub generation: u64,
    /// File-list order.
    pub records: Vec<CandidateRecord>,
    pub scores: ScoreMap,
    pub score_origin: ScoreOrigin,
}

/// One table row: the candidate plus its score, if any.
#[derive(Debug, Clone, Serialize)]
pub struct CandidateRow {
    #[serde(flatten)]
    pub record: CandidateRecord,
    pub score_result: Option<ScoreResult>,
}

#[derive(Debug, Clone, Serialize)]
pub struct CandidateView {
    pub generation: u64,
    pub analysis_run: bool,
    pub score_origin: ScoreOrigin,
    /// Candidates matching the search, before paging.
    pub total: usize,
    pub page: u32,
    pub per_page: u32,
    pub candidates: Vec<CandidateRow>,
}

impl BoardSnapshot {
    /// The snapshot a build produces on top of this one.
    ///
    /// `saved_scores` is the freshly fetched set of persisted scores, or
    /// `None` when it could not be fetched. Transient scores from an unsaved
    /// batch run are never overwritten by it.
    pub fn with_build(
        &self,
        generation: u64,
        records: Vec<CandidateRecord>,
        saved_scores: Option<ScoreMap>,
    ) -> BoardSnapshot {
        let (scores, score_origin) = match saved_scores {
            Some(saved) if self.score_origin != ScoreOrigin::Transient => {
                let origin = if saved.is_empty() {
                    ScoreOrigin::None
                } else {
                    ScoreOrigin::Saved
                };
                (saved, origin)
            }
            _ => (self.scores.clone(), self.score_origin),
        };

        BoardSnapshot {
            generation,
            records,
            scores,
            score_origin,
        }
    }

    pub fn is_built(&self) -> bool {
        self.generation > 0
    }

    pub fn analysis_run(&self) -> bool {
        self.score_origin != ScoreOrigin::None
    }

    /// Rank, then filter, then page.
    pub fn view(&self, search: &CandidateSearch, page: Page) -> CandidateView {
        let ranked = rank_candidates(&self.records, &self.scores, self.analysis_run());
        let matching = filter_candidates(&ranked, &self.scores, search);
        let total = matching.len();

        let candidates = page
            .apply(matching)
            .into_iter()
            .map(|record| CandidateRow {
                score_result: self.scores.get(&record.cv_filename).cloned(),
                record,
            })
            .collect();

        CandidateView {
            generation: self.generation,
            analysis_run: self.analysis_run(),
            score_origin: self.score_origin,
            total,
            page: page.page,
            per_page: page.per_page,
            candidates,
        }
    }
}

#[derive(Debug)]
pub struct CandidateBoard {
    job_id: Uuid,
    issued: AtomicU64,
    snapshot: RwLock<BoardSnapshot>,
}

impl CandidateBoard {
    pub fn new(job_id: Uuid) -> Self {
        Self {
            job_id,
            issued: AtomicU64::new(0),
            snapshot: RwLock::new(BoardSnapshot::default()),
        }
    }

    /// Starts a rebuild. Supersedes every token issued before it.
    pub fn begin_build(&self) -> BuildToken {
        BuildToken(self.issued.fetch_add(1, Ordering::SeqCst) + 1)
    }

    /// Publishes a rebuild's records if `token` is still the newest, and
    /// returns the published snapshot. `None` when a newer build has started.
    pub async fn publish(
        &self,
        token: BuildToken,
        records: Vec<CandidateRecord>,
        saved_scores: Option<ScoreMap>,
    ) -> Option<BoardSnapshot> {
        let mut snapshot = self.snapshot.write().await;

        let newest = self.issued.load(Ordering::SeqCst);
        if token.0 != newest || token.0 <= snapshot.generation {
            debug!(
                "Discarding stale build {} for job {} (newest {})",
                token.0, self.job_id, newest
            );
            return None;
        }

        *snapshot = snapshot.with_build(token.0, records, saved_scores);
        debug!(
            "Published build {} for job {} ({} candidates)",
            token.0,
            self.job_id,
            snapshot.records.len()
        );
        Some(snapshot.clone())
    }

    pub async fn snapshot(&self) -> BoardSnapshot {
        self.snapshot.read().await.clone()
    }

    /// Installs the result of a batch scoring run.
    pub async fn set_transient_scores(&self, scores: ScoreMap) {
        let mut snapshot = self.snapshot.write().await;
        snapshot.scores = scores;
        snapshot.score_origin = ScoreOrigin::Transient;
    }

    /// Marks transient scores as persisted.
    pub async fn mark_scores_saved(&self) {
        let mut snapshot = self.snapshot.write().await;
        if snapshot.score_origin == ScoreOrigin::Transient {
            snapshot.score_origin = ScoreOrigin::Saved;
        }
    }

    /// Forgets all scores, e.g. once the job is edited.
    pub async fn clear_scores(&self) {
        let mut snapshot = self.snapshot.write().await;
        snapshot.scores.clear();
        snapshot.score_origin = ScoreOrigin::None;
    }
}

/// Boards keyed by job id, created on first use.
#[derive(Debug, Default)]
pub struct BoardRegistry {
    boards: RwLock<HashMap<Uuid, Arc<CandidateBoard>>>,
}

impl BoardRegistry {
    pub fn new() -> Self {
        Self::default()
    }

    pub async fn board(&self, job_id: Uuid) -> Arc<CandidateBoard> {
        if let Some(board) = self.boards.read().await.get(&job_id) {
            return board.clone();
        }

        self.boards
            .write()
            .await
            .entry(job_id)
            .or_insert_with(|| Arc::new(CandidateBoard::new(job_id)))
            .clone()
    }

    /// Drops a job's board. Returns whether one existed.
    pub async fn remove(&self, job_id: Uuid) -> bool {
        self.boards.write().await.remove(&job_id).is_some()
    }
}

/// Splits the remaining filenames from the records being removed.
///
/// Returns the ids that matched nothing as the error.
pub fn remaining_files(
    records: &[CandidateRecord],
    remove: &[CandidateId],
) -> Result<Vec<String>, Vec<CandidateId>> {
    let unknown: Vec<CandidateId> = remove
        .iter()
        .filter(|id| !records.iter().any(|r| r.id == **id))
        .copied()
        .collect();
    if !unknown.is_empty() {
        return Err(unknown);
    }

    Ok(records
        .iter()
        .filter(|r| !remove.contains(&r.id))
        .map(|r| r.cv_filename.clone())
        .collect())
}
