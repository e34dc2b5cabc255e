use std::collections::BTreeMap;

use tracing::warn;

use crate::candidates::reconcile::CandidateRecord;
use crate::models::score::{ScoreAnalysis, ScoreResult};

/// Score results keyed by candidate CV filename.
pub type ScoreMap = BTreeMap<String, ScoreResult>;

/// Collects persisted score rows into a map. Rows whose payload does not
/// parse are skipped; when a file was scored more than once the most
/// recently created row wins.
pub fn score_map_from_analyses(analyses: &[ScoreAnalysis]) -> ScoreMap {
    let mut ordered: Vec<&ScoreAnalysis> = analyses.iter().collect();
    // ISO timestamps order lexically; rows without one count as oldest
    ordered.sort_by(|a, b| a.created_at.cmp(&b.created_at));

    let mut scores = ScoreMap::new();
    for analysis in ordered {
        match serde_json::from_str::<ScoreResult>(&analysis.score_result) {
            Ok(result) => {
                scores.insert(analysis.candidate_file_name.clone(), result);
            }
            Err(e) => warn!(
                "Skipping unparseable score result for {}: {}",
                analysis.candidate_file_name, e
            ),
        }
    }
    scores
}

/// Sort key: the numeric score, `-inf` when missing or unparseable.
pub fn rank_key(scores: &ScoreMap, cv_filename: &str) -> f64 {
    scores
        .get(cv_filename)
        .and_then(ScoreResult::numeric)
        .unwrap_or(f64::NEG_INFINITY)
}

/// Orders candidates by descending score.
///
/// Identity unless an analysis has been run and produced at least one score.
/// The sort is stable, so unscored candidates keep their file-list order at
/// the bottom.
pub fn rank_candidates(
    records: &[CandidateRecord],
    scores: &ScoreMap,
    analysis_run: bool,
) -> Vec<CandidateRecord> {
    let mut ranked = records.to_vec();
    if !analysis_run || scores.is_empty() {
        return ranked;
    }

    ranked.sort_by(|a, b| {
        rank_key(scores, &b.cv_filename).total_cmp(&rank_key(scores, &a.cv_filename))
    });
    ranked
}
