//! In-memory [`RecruitingBackend`] for tests.

use std::collections::{HashMap, HashSet};
use std::time::Duration;

use async_trait::async_trait;
use bytes::Bytes;
use serde_json::Value;
use tokio::sync::Mutex;
use uuid::Uuid;

use crate::backend::{BackendError, RecruitingBackend};
use crate::models::candidate::{CandidateAnalysis, UploadedCv};
use crate::models::job::{Job, JobAnalysisRequest, JobListQuery, JobPayload, JobsPage};
use crate::models::score::{ScoreAnalysis, ScoreRequest, ScoreResult};

#[derive(Default)]
struct FakeState {
    jobs: Vec<Job>,
    analyses: HashMap<String, CandidateAnalysis>,
    /// Score returned by `compute_score`, keyed by the candidate's file.
    scores: HashMap<String, f64>,
    saved: Vec<(Uuid, String, ScoreResult)>,
    delays: HashMap<String, Duration>,
    failing_lookups: HashSet<String>,
    failing_scores: HashSet<String>,
    failing_saves: HashSet<String>,
    failing_score_listing: bool,
    failing_job_analysis: bool,
    uploads: Vec<String>,
}

#[derive(Default)]
pub struct FakeBackend {
    state: Mutex<FakeState>,
}

fn api_error(message: &str) -> BackendError {
    BackendError::Api {
        status: 500,
        message: message.to_string(),
    }
}

impl FakeBackend {
    pub fn new() -> Self {
        Self::default()
    }

    pub async fn insert_job(&self, title: &str, files: &[&str]) -> Job {
        let job = Job {
            id: Uuid::new_v4(),
            title: title.to_string(),
            description: Some(format!("{title} description")),
            files: Some(serde_json::to_string(files).unwrap()),
            analysis_result: None,
            owner_id: None,
            created_at: Some("2024-03-01T09:00:00".to_string()),
        };
        self.state.lock().await.jobs.push(job.clone());
        job
    }

    pub async fn job(&self, id: Uuid) -> Option<Job> {
        self.state
            .lock()
            .await
            .jobs
            .iter()
            .find(|j| j.id == id)
            .cloned()
    }

    /// Stores an analysis under the next integer backend id.
    pub async fn add_analysis(&self, file: &str, blob: Value) {
        let mut state = self.state.lock().await;
        let id = state.analyses.len() as i64 + 1;
        state.analyses.insert(
            file.to_string(),
            CandidateAnalysis {
                id: Value::from(id),
                file_name: Some(file.to_string()),
                analysis_result: Some(blob.to_string()),
                created_at: Some("2024-03-05T10:00:00".to_string()),
            },
        );
    }

    pub async fn set_score(&self, file: &str, score: f64) {
        self.state.lock().await.scores.insert(file.to_string(), score);
    }

    pub async fn delay_lookup(&self, file: &str, delay: Duration) {
        self.state.lock().await.delays.insert(file.to_string(), delay);
    }

    pub async fn fail_lookup_for(&self, file: &str) {
        self.state.lock().await.failing_lookups.insert(file.to_string());
    }

    pub async fn fail_scoring_for(&self, file: &str) {
        self.state.lock().await.failing_scores.insert(file.to_string());
    }

    pub async fn fail_saving_for(&self, file: &str) {
        self.state.lock().await.failing_saves.insert(file.to_string());
    }

    pub async fn fail_score_listing(&self) {
        self.state.lock().await.failing_score_listing = true;
    }

    pub async fn fail_job_analysis(&self) {
        self.state.lock().await.failing_job_analysis = true;
    }

    pub async fn saved_scores(&self, job_id: Uuid) -> Vec<(String, ScoreResult)> {
        self.state
            .lock()
            .await
            .saved
            .iter()
            .filter(|(id, _, _)| *id == job_id)
            .map(|(_, file, score)| (file.clone(), score.clone()))
            .collect()
    }

    pub async fn uploads(&self) -> Vec<String> {
        self.state.lock().await.uploads.clone()
    }
}

#[async_trait]
impl RecruitingBackend for FakeBackend {
    async fn list_jobs(&self, query: &JobListQuery) -> Result<JobsPage, BackendError> {
        let state = self.state.lock().await;
        let matches = |field: Option<&str>, needle: &Option<String>| match needle {
            Some(n) => field
                .map(|f| f.to_lowercase().contains(&n.to_lowercase()))
                .unwrap_or(false),
            None => true,
        };

        let mut jobs: Vec<Job> = state
            .jobs
            .iter()
            .filter(|j| matches(Some(j.title.as_str()), &query.title))
            .filter(|j| matches(j.description.as_deref(), &query.description))
            .cloned()
            .collect();
        jobs.sort_by(|a, b| b.created_at.cmp(&a.created_at));

        Ok(JobsPage {
            count: jobs.len() as u64,
            data: jobs
                .into_iter()
                .skip(query.skip as usize)
                .take(query.limit as usize)
                .collect(),
        })
    }

    async fn get_job(&self, id: Uuid) -> Result<Job, BackendError> {
        self.job(id)
            .await
            .ok_or_else(|| BackendError::NotFound(format!("job {id}")))
    }

    async fn create_job(&self, payload: &JobPayload) -> Result<Job, BackendError> {
        let job = Job {
            id: Uuid::new_v4(),
            title: payload.title.clone(),
            description: payload.description.clone(),
            files: payload.files.clone(),
            analysis_result: None,
            owner_id: None,
            created_at: Some("2024-04-01T12:00:00".to_string()),
        };
        self.state.lock().await.jobs.push(job.clone());
        Ok(job)
    }

    async fn update_job(&self, id: Uuid, payload: &JobPayload) -> Result<Job, BackendError> {
        let mut state = self.state.lock().await;
        let job = state
            .jobs
            .iter_mut()
            .find(|j| j.id == id)
            .ok_or_else(|| BackendError::NotFound(format!("job {id}")))?;
        job.title = payload.title.clone();
        if payload.description.is_some() {
            job.description = payload.description.clone();
        }
        if payload.files.is_some() {
            job.files = payload.files.clone();
        }
        Ok(job.clone())
    }

    async fn delete_job(&self, id: Uuid) -> Result<(), BackendError> {
        let mut state = self.state.lock().await;
        let before = state.jobs.len();
        state.jobs.retain(|j| j.id != id);
        if state.jobs.len() == before {
            return Err(BackendError::NotFound(format!("job {id}")));
        }
        Ok(())
    }

    async fn analyse_job(&self, request: &JobAnalysisRequest) -> Result<Value, BackendError> {
        let mut state = self.state.lock().await;
        if state.failing_job_analysis {
            return Err(api_error("job analysis failed"));
        }
        let job = state
            .jobs
            .iter_mut()
            .find(|j| j.id == request.id)
            .ok_or_else(|| BackendError::NotFound(format!("job {}", request.id)))?;

        let analysis = serde_json::json!({
            "job_title": request.title,
            "required_skills": ["Rust"],
        });
        job.analysis_result = Some(analysis.to_string());
        Ok(analysis)
    }

    async fn get_candidate_analysis(
        &self,
        file_name: &str,
    ) -> Result<Option<CandidateAnalysis>, BackendError> {
        let (delay, failing, analysis) = {
            let state = self.state.lock().await;
            (
                state.delays.get(file_name).copied(),
                state.failing_lookups.contains(file_name),
                state.analyses.get(file_name).cloned(),
            )
        };

        if let Some(delay) = delay {
            tokio::time::sleep(delay).await;
        }
        if failing {
            return Err(api_error("lookup failed"));
        }
        Ok(analysis)
    }

    async fn get_score_analyses(&self, job_id: Uuid) -> Result<Vec<ScoreAnalysis>, BackendError> {
        let state = self.state.lock().await;
        if state.failing_score_listing {
            return Err(api_error("score listing failed"));
        }

        let rows = state
            .saved
            .iter()
            .enumerate()
            .filter(|(_, (id, _, _))| *id == job_id)
            .map(|(n, (id, file, score))| -> Result<ScoreAnalysis, BackendError> {
                Ok(ScoreAnalysis {
                    job_id: Some(*id),
                    candidate_file_name: file.clone(),
                    score_result: serde_json::to_string(score)?,
                    created_at: Some(format!("2024-05-01T00:00:{:02}", n % 60)),
                })
            })
            .collect();
        rows
    }

    async fn compute_score(&self, request: &ScoreRequest) -> Result<ScoreResult, BackendError> {
        let state = self.state.lock().await;
        let file = state
            .analyses
            .iter()
            .find(|(_, analysis)| {
                analysis
                    .blob()
                    .and_then(|raw| serde_json::from_str::<Value>(raw).ok())
                    .as_ref()
                    == Some(&request.candidate)
            })
            .map(|(file, _)| file.clone())
            .ok_or_else(|| api_error("unknown candidate"))?;

        if state.failing_scores.contains(&file) {
            return Err(api_error("scoring failed"));
        }

        let score = state.scores.get(&file).copied().unwrap_or(0.0);
        Ok(ScoreResult {
            summary_comment: Some(format!("Assessment of {file}")),
            ..ScoreResult::from_score(score)
        })
    }

    async fn save_score_analysis(
        &self,
        job_id: Uuid,
        candidate_file_name: &str,
        result: &ScoreResult,
    ) -> Result<(), BackendError> {
        let mut state = self.state.lock().await;
        if state.failing_saves.contains(candidate_file_name) {
            return Err(api_error("save failed"));
        }
        state
            .saved
            .push((job_id, candidate_file_name.to_string(), result.clone()));
        Ok(())
    }

    async fn upload_candidate_cv(
        &self,
        file_name: &str,
        _content: Bytes,
    ) -> Result<UploadedCv, BackendError> {
        let stored = format!("20240501_{file_name}");
        self.state.lock().await.uploads.push(stored.clone());
        Ok(UploadedCv { file_name: stored })
    }
}
