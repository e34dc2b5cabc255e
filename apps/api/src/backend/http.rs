use std::time::Duration;

use async_trait::async_trait;
use bytes::Bytes;
use reqwest::{multipart, Client, Method, RequestBuilder, Response, StatusCode, Url};
use serde::de::DeserializeOwned;
use serde_json::Value;
use tracing::{debug, warn};
use uuid::Uuid;

use crate::backend::{BackendError, RecruitingBackend};
use crate::config::Config;
use crate::models::candidate::{CandidateAnalysis, UploadedCv};
use crate::models::job::{Job, JobAnalysisRequest, JobListQuery, JobPayload, JobsPage};
use crate::models::score::{ScoreAnalysis, ScoreRequest, ScoreResult};

/// reqwest client for the recruiting backend REST API.
///
/// No call is retried: a failed mutation is reported to the caller, who
/// decides whether to try again.
#[derive(Clone)]
pub struct HttpBackend {
    client: Client,
    base_url: Url,
    token: Option<String>,
}

impl HttpBackend {
    pub fn new(
        base_url: &str,
        token: Option<String>,
        timeout: Duration,
    ) -> Result<Self, BackendError> {
        let parsed = Url::parse(base_url)
            .map_err(|e| BackendError::InvalidUrl(format!("{base_url}: {e}")))?;
        if parsed.cannot_be_a_base() {
            return Err(BackendError::InvalidUrl(base_url.to_string()));
        }

        Ok(Self {
            client: Client::builder().timeout(timeout).build()?,
            base_url: parsed,
            token,
        })
    }

    pub fn from_config(config: &Config) -> Result<Self, BackendError> {
        Self::new(
            &config.backend_api_url,
            config.backend_api_token.clone(),
            Duration::from_secs(config.backend_timeout_secs),
        )
    }

    /// Appends percent-encoded path segments to the base URL.
    fn url(&self, segments: &[&str]) -> Url {
        let mut url = self.base_url.clone();
        if let Ok(mut path) = url.path_segments_mut() {
            path.pop_if_empty().extend(segments);
        }
        url
    }

    fn request(&self, method: Method, url: Url) -> RequestBuilder {
        let builder = self.client.request(method, url);
        match &self.token {
            Some(token) => builder.bearer_auth(token),
            None => builder,
        }
    }

    async fn send(&self, builder: RequestBuilder, what: &str) -> Result<Response, BackendError> {
        let response = builder.send().await?;
        let status = response.status();

        if status == StatusCode::NOT_FOUND {
            return Err(BackendError::NotFound(what.to_string()));
        }

        if !status.is_success() {
            let body = response.text().await.unwrap_or_default();
            // FastAPI-style errors carry the message under "detail"
            let message = serde_json::from_str::<Value>(&body)
                .ok()
                .and_then(|v| v.get("detail").map(detail_message))
                .unwrap_or(body);
            warn!("Backend returned {} for {}: {}", status, what, message);
            return Err(BackendError::Api {
                status: status.as_u16(),
                message,
            });
        }

        debug!("Backend call succeeded: {} ({})", what, status);
        Ok(response)
    }

    async fn send_json<T: DeserializeOwned>(
        &self,
        builder: RequestBuilder,
        what: &str,
    ) -> Result<T, BackendError> {
        let response = self.send(builder, what).await?;
        let body = response.bytes().await?;
        Ok(serde_json::from_slice(&body)?)
    }
}

fn detail_message(detail: &Value) -> String {
    match detail {
        Value::String(s) => s.clone(),
        other => other.to_string(),
    }
}

#[async_trait]
impl RecruitingBackend for HttpBackend {
    async fn list_jobs(&self, query: &JobListQuery) -> Result<JobsPage, BackendError> {
        let mut params: Vec<(&str, String)> = vec![
            ("skip", query.skip.to_string()),
            ("limit", query.limit.to_string()),
        ];
        if let Some(title) = &query.title {
            params.push(("title", title.clone()));
        }
        if let Some(description) = &query.description {
            params.push(("description", description.clone()));
        }
        if let Some(created_at) = query.created_at {
            params.push(("created_at", created_at.format("%Y-%m-%d").to_string()));
        }

        let builder = self
            .request(Method::GET, self.url(&["jobs", ""]))
            .query(&params);
        self.send_json(builder, "job list").await
    }

    async fn get_job(&self, id: Uuid) -> Result<Job, BackendError> {
        let builder = self.request(Method::GET, self.url(&["jobs", &id.to_string()]));
        self.send_json(builder, &format!("job {id}")).await
    }

    async fn create_job(&self, payload: &JobPayload) -> Result<Job, BackendError> {
        let builder = self
            .request(Method::POST, self.url(&["jobs", ""]))
            .json(payload);
        self.send_json(builder, "job create").await
    }

    async fn update_job(&self, id: Uuid, payload: &JobPayload) -> Result<Job, BackendError> {
        let builder = self
            .request(Method::PUT, self.url(&["jobs", &id.to_string()]))
            .json(payload);
        self.send_json(builder, &format!("job {id}")).await
    }

    async fn delete_job(&self, id: Uuid) -> Result<(), BackendError> {
        let builder = self.request(Method::DELETE, self.url(&["jobs", &id.to_string()]));
        self.send(builder, &format!("job {id}")).await?;
        Ok(())
    }

    async fn analyse_job(&self, request: &JobAnalysisRequest) -> Result<Value, BackendError> {
        let builder = self
            .request(Method::POST, self.url(&["job", "analyse_job"]))
            .json(request);
        self.send_json(builder, &format!("job analysis {}", request.id))
            .await
    }

    async fn get_candidate_analysis(
        &self,
        file_name: &str,
    ) -> Result<Option<CandidateAnalysis>, BackendError> {
        let builder = self.request(
            Method::GET,
            self.url(&["candidate", "analysis_result", file_name]),
        );
        match self
            .send_json(builder, &format!("candidate analysis {file_name}"))
            .await
        {
            Ok(analysis) => Ok(Some(analysis)),
            Err(BackendError::NotFound(_)) => Ok(None),
            Err(e) => Err(e),
        }
    }

    async fn get_score_analyses(&self, job_id: Uuid) -> Result<Vec<ScoreAnalysis>, BackendError> {
        let builder = self.request(
            Method::GET,
            self.url(&["score", "score_analysis", &job_id.to_string()]),
        );
        self.send_json(builder, &format!("score analyses for job {job_id}"))
            .await
    }

    async fn compute_score(&self, request: &ScoreRequest) -> Result<ScoreResult, BackendError> {
        let builder = self
            .request(Method::POST, self.url(&["score", "score_analyse"]))
            .json(request);
        self.send_json(builder, "score computation").await
    }

    async fn save_score_analysis(
        &self,
        job_id: Uuid,
        candidate_file_name: &str,
        result: &ScoreResult,
    ) -> Result<(), BackendError> {
        let builder = self
            .request(Method::POST, self.url(&["score", "save_score_analysis"]))
            .query(&[
                ("job_id", job_id.to_string()),
                ("candidate_file_name", candidate_file_name.to_string()),
            ])
            .json(result);
        self.send(builder, &format!("score save for {candidate_file_name}"))
            .await?;
        Ok(())
    }

    async fn upload_candidate_cv(
        &self,
        file_name: &str,
        content: Bytes,
    ) -> Result<UploadedCv, BackendError> {
        let part = multipart::Part::bytes(content.to_vec()).file_name(file_name.to_string());
        let form = multipart::Form::new().part("file", part);
        let builder = self
            .request(Method::POST, self.url(&["candidate", "analyse_candidate"]))
            .multipart(form);

        // The analyse endpoint answers with the analysis itself; the stored
        // name is only present on newer backends. Lookups also resolve by the
        // original upload name, so that is the fallback.
        let body: Value = self
            .send_json(builder, &format!("CV upload {file_name}"))
            .await?;
        let stored = body
            .get("file_name")
            .and_then(Value::as_str)
            .filter(|name| !name.trim().is_empty())
            .unwrap_or(file_name);

        Ok(UploadedCv {
            file_name: stored.to_string(),
        })
    }
}
