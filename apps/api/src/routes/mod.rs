pub mod health;

use axum::{
    routing::{delete, get, post},
    Router,
};

use crate::candidates::handlers as candidates;
use crate::jobs::handlers as jobs;
use crate::state::AppState;

pub fn build_router(state: AppState) -> Router {
    Router::new()
        .route("/health", get(health::health_handler))
        // Jobs API
        .route(
            "/api/v1/jobs",
            get(jobs::handle_list_jobs).post(jobs::handle_create_job),
        )
        .route("/api/v1/jobs/delete", post(jobs::handle_delete_jobs))
        .route(
            "/api/v1/jobs/:id",
            get(jobs::handle_get_job)
                .put(jobs::handle_update_job)
                .delete(jobs::handle_delete_job),
        )
        // Candidate board
        .route(
            "/api/v1/jobs/:id/candidates",
            get(candidates::handle_get_candidates),
        )
        .route(
            "/api/v1/jobs/:id/candidates/delete",
            post(candidates::handle_delete_candidates),
        )
        .route(
            "/api/v1/jobs/:id/candidates/:candidate",
            delete(candidates::handle_delete_candidate),
        )
        .route(
            "/api/v1/jobs/:id/analysis/run",
            post(candidates::handle_run_analysis),
        )
        .route(
            "/api/v1/jobs/:id/analysis/save",
            post(candidates::handle_save_analysis),
        )
        // Uploads
        .route("/api/v1/candidates/upload", post(jobs::handle_upload_cv))
        .with_state(state)
}

#[cfg(test)]
mod tests {
    use crate::backend::RecruitingBackend;
    use std::sync::Arc;

    use axum::{
        body::Body,
        http::{header, Method, Request, StatusCode},
        response::Response,
    };
    use serde_json::{json, Value};
    use tower::ServiceExt;
    use uuid::Uuid;

    use super::*;
    use crate::backend::fake::FakeBackend;
    use crate::config::Config;
    use crate::models::job::Job;
    use crate::models::score::ScoreResult;

    fn app(fake: &Arc<FakeBackend>) -> Router {
        build_router(AppState::new(fake.clone(), Config::default()))
    }

    async fn call(app: &Router, method: Method, uri: &str, body: Option<Value>) -> Response {
        let builder = Request::builder().method(method).uri(uri);
        let request = match body {
            Some(body) => builder
                .header(header::CONTENT_TYPE, "application/json")
                .body(Body::from(body.to_string()))
                .unwrap(),
            None => builder.body(Body::empty()).unwrap(),
        };
        app.clone().oneshot(request).await.unwrap()
    }

    async fn body_json(response: Response) -> Value {
        let bytes = axum::body::to_bytes(response.into_body(), usize::MAX)
            .await
            .unwrap();
        serde_json::from_slice(&bytes).unwrap()
    }

    fn files_of(view: &Value) -> Vec<String> {
        view["candidates"]
            .as_array()
            .unwrap()
            .iter()
            .map(|row| row["cv_filename"].as_str().unwrap().to_string())
            .collect()
    }

    /// A job with three files; a and c are analysed and scored, b is not.
    async fn seeded_job(fake: &FakeBackend) -> Job {
        let job = fake
            .insert_job("Rust Engineer", &["a.pdf", "b.pdf", "c.pdf"])
            .await;
        fake.add_analysis(
            "a.pdf",
            json!({"personal_info": {"name": "Ada", "email": "ada@mail.io", "phone": "555-0101"}}),
        )
        .await;
        fake.add_analysis("c.pdf", json!({"candidate_name": "Cleo", "email": "cleo@mail.io"}))
            .await;
        fake.set_score("a.pdf", 6.0).await;
        fake.set_score("c.pdf", 9.0).await;
        job
    }

    #[tokio::test]
    async fn test_health() {
        let fake = Arc::new(FakeBackend::new());
        let response = call(&app(&fake), Method::GET, "/health", None).await;
        assert_eq!(response.status(), StatusCode::OK);
        assert_eq!(body_json(response).await["status"], "ok");
    }

    #[tokio::test]
    async fn test_candidates_follow_file_order_with_placeholders() {
        let fake = Arc::new(FakeBackend::new());
        let job = seeded_job(&fake).await;

        let response = call(
            &app(&fake),
            Method::GET,
            &format!("/api/v1/jobs/{}/candidates", job.id),
            None,
        )
        .await;
        assert_eq!(response.status(), StatusCode::OK);

        let view = body_json(response).await;
        assert_eq!(view["total"], 3);
        assert_eq!(view["analysis_run"], false);
        assert_eq!(files_of(&view), vec!["a.pdf", "b.pdf", "c.pdf"]);

        let rows = view["candidates"].as_array().unwrap();
        assert_eq!(rows[0]["name"], "Ada");
        assert_eq!(rows[0]["id"], json!({"kind": "backend", "value": 1}));
        assert_eq!(rows[1]["name"], "Unnamed Candidate");
        assert_eq!(rows[1]["id"], json!({"kind": "positional", "value": 2}));
        assert_eq!(rows[1]["created_at"], "N/A");
        assert_eq!(rows[2]["email"], "cleo@mail.io");
        assert_eq!(rows[2]["phone"], "N/A");
    }

    #[tokio::test]
    async fn test_unknown_job_is_404() {
        let fake = Arc::new(FakeBackend::new());
        let response = call(
            &app(&fake),
            Method::GET,
            &format!("/api/v1/jobs/{}/candidates", Uuid::new_v4()),
            None,
        )
        .await;
        assert_eq!(response.status(), StatusCode::NOT_FOUND);
        assert_eq!(body_json(response).await["error"]["code"], "NOT_FOUND");
    }

    #[tokio::test]
    async fn test_run_rank_filter_and_save_analysis() {
        let fake = Arc::new(FakeBackend::new());
        let job = seeded_job(&fake).await;
        let app = app(&fake);

        let response = call(
            &app,
            Method::POST,
            &format!("/api/v1/jobs/{}/analysis/run", job.id),
            None,
        )
        .await;
        assert_eq!(response.status(), StatusCode::OK);
        let view = body_json(response).await;
        assert_eq!(view["analysis_run"], true);
        assert_eq!(view["score_origin"], "transient");
        assert_eq!(files_of(&view), vec!["c.pdf", "a.pdf", "b.pdf"]);
        assert_eq!(view["candidates"][0]["score_result"]["score"], json!(9.0));
        assert_eq!(view["candidates"][2]["score_result"], Value::Null);

        let response = call(
            &app,
            Method::GET,
            &format!("/api/v1/jobs/{}/candidates?score=%3C7&summary=assessment", job.id),
            None,
        )
        .await;
        let view = body_json(response).await;
        assert_eq!(files_of(&view), vec!["a.pdf"]);

        let response = call(
            &app,
            Method::POST,
            &format!("/api/v1/jobs/{}/analysis/save", job.id),
            None,
        )
        .await;
        assert_eq!(response.status(), StatusCode::OK);
        assert_eq!(body_json(response).await["saved"], 2);
        assert_eq!(fake.saved_scores(job.id).await.len(), 2);

        // a fresh board picks the saved scores back up
        let fresh = build_router(AppState::new(fake.clone(), Config::default()));
        let response = call(
            &fresh,
            Method::GET,
            &format!("/api/v1/jobs/{}/candidates", job.id),
            None,
        )
        .await;
        let view = body_json(response).await;
        assert_eq!(view["score_origin"], "saved");
        assert_eq!(files_of(&view), vec!["c.pdf", "a.pdf", "b.pdf"]);
    }

    #[tokio::test]
    async fn test_save_failure_is_reported() {
        let fake = Arc::new(FakeBackend::new());
        let job = seeded_job(&fake).await;
        fake.fail_saving_for("c.pdf").await;
        let app = app(&fake);

        call(
            &app,
            Method::POST,
            &format!("/api/v1/jobs/{}/analysis/run", job.id),
            None,
        )
        .await;
        let response = call(
            &app,
            Method::POST,
            &format!("/api/v1/jobs/{}/analysis/save", job.id),
            None,
        )
        .await;
        assert_eq!(response.status(), StatusCode::BAD_GATEWAY);
        assert_eq!(body_json(response).await["error"]["code"], "BACKEND_ERROR");
    }

    #[tokio::test]
    async fn test_save_without_run_is_rejected() {
        let fake = Arc::new(FakeBackend::new());
        let job = seeded_job(&fake).await;
        let response = call(
            &app(&fake),
            Method::POST,
            &format!("/api/v1/jobs/{}/analysis/save", job.id),
            None,
        )
        .await;
        assert_eq!(response.status(), StatusCode::BAD_REQUEST);
    }

    #[tokio::test]
    async fn test_run_analysis_without_files_is_rejected() {
        let fake = Arc::new(FakeBackend::new());
        let job = fake.insert_job("Empty", &[]).await;
        let response = call(
            &app(&fake),
            Method::POST,
            &format!("/api/v1/jobs/{}/analysis/run", job.id),
            None,
        )
        .await;
        assert_eq!(response.status(), StatusCode::BAD_REQUEST);
        assert_eq!(body_json(response).await["error"]["code"], "VALIDATION_ERROR");
    }

    #[tokio::test]
    async fn test_editing_job_clears_analysis() {
        let fake = Arc::new(FakeBackend::new());
        let job = seeded_job(&fake).await;
        let app = app(&fake);

        call(
            &app,
            Method::POST,
            &format!("/api/v1/jobs/{}/analysis/run", job.id),
            None,
        )
        .await;
        let response = call(
            &app,
            Method::PUT,
            &format!("/api/v1/jobs/{}", job.id),
            Some(json!({"title": "Senior Rust Engineer", "files": ["a.pdf", "b.pdf", "c.pdf"]})),
        )
        .await;
        assert_eq!(response.status(), StatusCode::OK);
        assert_eq!(body_json(response).await["title"], "Senior Rust Engineer");

        let response = call(
            &app,
            Method::GET,
            &format!("/api/v1/jobs/{}/candidates", job.id),
            None,
        )
        .await;
        let view = body_json(response).await;
        assert_eq!(view["analysis_run"], false);
        assert_eq!(files_of(&view), vec!["a.pdf", "b.pdf", "c.pdf"]);
    }

    #[tokio::test]
    async fn test_delete_candidates_persists_remaining_files() {
        let fake = Arc::new(FakeBackend::new());
        let job = seeded_job(&fake).await;
        let app = app(&fake);

        let response = call(
            &app,
            Method::DELETE,
            &format!("/api/v1/jobs/{}/candidates/p:2", job.id),
            None,
        )
        .await;
        assert_eq!(response.status(), StatusCode::OK);
        assert_eq!(files_of(&body_json(response).await), vec!["a.pdf", "c.pdf"]);
        assert_eq!(
            fake.job(job.id).await.unwrap().files.as_deref(),
            Some(r#"["a.pdf","c.pdf"]"#)
        );

        let response = call(
            &app,
            Method::POST,
            &format!("/api/v1/jobs/{}/candidates/delete", job.id),
            Some(json!({"ids": [{"kind": "backend", "value": 1}]})),
        )
        .await;
        assert_eq!(response.status(), StatusCode::OK);
        assert_eq!(files_of(&body_json(response).await), vec!["c.pdf"]);
    }

    #[tokio::test]
    async fn test_delete_unknown_or_malformed_candidate() {
        let fake = Arc::new(FakeBackend::new());
        let job = seeded_job(&fake).await;
        let app = app(&fake);

        let response = call(
            &app,
            Method::DELETE,
            &format!("/api/v1/jobs/{}/candidates/b:99", job.id),
            None,
        )
        .await;
        assert_eq!(response.status(), StatusCode::NOT_FOUND);
        assert_eq!(
            fake.job(job.id).await.unwrap().files.as_deref(),
            Some(r#"["a.pdf","b.pdf","c.pdf"]"#)
        );

        let response = call(
            &app,
            Method::DELETE,
            &format!("/api/v1/jobs/{}/candidates/42", job.id),
            None,
        )
        .await;
        assert_eq!(response.status(), StatusCode::BAD_REQUEST);
    }

    #[tokio::test]
    async fn test_create_list_and_delete_jobs() {
        let fake = Arc::new(FakeBackend::new());
        let app = app(&fake);

        let response = call(
            &app,
            Method::POST,
            "/api/v1/jobs",
            Some(json!({"title": "Data Analyst", "description": "SQL", "files": ["r1.pdf"]})),
        )
        .await;
        assert_eq!(response.status(), StatusCode::CREATED);
        let created = body_json(response).await;
        assert_eq!(created["candidate_files"], json!(["r1.pdf"]));

        fake.insert_job("Rust Engineer", &[]).await;
        let response = call(&app, Method::GET, "/api/v1/jobs?title=analyst&per_page=5", None).await;
        let listing = body_json(response).await;
        assert_eq!(listing["count"], 1);
        assert_eq!(listing["per_page"], 5);
        assert_eq!(listing["data"][0]["title"], "Data Analyst");

        let id = created["id"].as_str().unwrap();
        let response = call(&app, Method::DELETE, &format!("/api/v1/jobs/{id}"), None).await;
        assert_eq!(response.status(), StatusCode::NO_CONTENT);
        let response = call(&app, Method::GET, &format!("/api/v1/jobs/{id}"), None).await;
        assert_eq!(response.status(), StatusCode::NOT_FOUND);
    }

    #[tokio::test]
    async fn test_saving_job_runs_its_analysis() {
        let fake = Arc::new(FakeBackend::new());
        let app = app(&fake);

        let response = call(
            &app,
            Method::POST,
            "/api/v1/jobs",
            Some(json!({"title": "Data Analyst", "files": ["r1.pdf"]})),
        )
        .await;
        assert_eq!(response.status(), StatusCode::CREATED);
        let created = body_json(response).await;
        assert_eq!(created["analysis"], json!({"status": "completed"}));
        assert!(created["analysis_result"].as_str().unwrap().contains("Data Analyst"));

        let id: Uuid = created["id"].as_str().unwrap().parse().unwrap();
        let stored = fake.job(id).await.unwrap().analysis_result.unwrap();
        assert!(stored.contains("Data Analyst"));

        let response = call(
            &app,
            Method::PUT,
            &format!("/api/v1/jobs/{id}"),
            Some(json!({"title": "Lead Analyst"})),
        )
        .await;
        assert_eq!(response.status(), StatusCode::OK);
        let stored = fake.job(id).await.unwrap().analysis_result.unwrap();
        assert!(stored.contains("Lead Analyst"));
    }

    #[tokio::test]
    async fn test_failed_job_analysis_keeps_the_save() {
        let fake = Arc::new(FakeBackend::new());
        fake.fail_job_analysis().await;

        let response = call(
            &app(&fake),
            Method::POST,
            "/api/v1/jobs",
            Some(json!({"title": "Data Analyst"})),
        )
        .await;
        assert_eq!(response.status(), StatusCode::CREATED);
        let created = body_json(response).await;
        assert_eq!(created["analysis"]["status"], "failed");
        assert!(created["analysis"]["message"]
            .as_str()
            .unwrap()
            .contains("job analysis failed"));

        let id: Uuid = created["id"].as_str().unwrap().parse().unwrap();
        assert_eq!(fake.job(id).await.unwrap().title, "Data Analyst");
    }

    #[tokio::test]
    async fn test_job_list_shows_top_candidates() {
        let fake = Arc::new(FakeBackend::new());
        let job = seeded_job(&fake).await;
        for (file, score) in [("a.pdf", 6.0), ("c.pdf", 9.0)] {
            fake.save_score_analysis(job.id, file, &ScoreResult::from_score(score))
                .await
                .unwrap();
        }

        let response = call(&app(&fake), Method::GET, "/api/v1/jobs", None).await;
        assert_eq!(response.status(), StatusCode::OK);
        let listing = body_json(response).await;
        assert_eq!(
            listing["data"][0]["top_candidates"],
            json!([{"name": "Cleo", "score": 9.0}, {"name": "Ada", "score": 6.0}])
        );

        // single-job reads do not carry the summary
        let response = call(
            &app(&fake),
            Method::GET,
            &format!("/api/v1/jobs/{}", job.id),
            None,
        )
        .await;
        assert!(body_json(response).await.get("top_candidates").is_none());
    }

    #[tokio::test]
    async fn test_bulk_delete_jobs() {
        let fake = Arc::new(FakeBackend::new());
        let first = fake.insert_job("Data Analyst", &[]).await;
        let second = fake.insert_job("Rust Engineer", &[]).await;
        let kept = fake.insert_job("Designer", &[]).await;
        let app = app(&fake);

        let response = call(
            &app,
            Method::POST,
            "/api/v1/jobs/delete",
            Some(json!({"ids": [first.id, second.id]})),
        )
        .await;
        assert_eq!(response.status(), StatusCode::OK);
        assert_eq!(body_json(response).await["deleted"], 2);
        assert!(fake.job(first.id).await.is_none());
        assert!(fake.job(second.id).await.is_none());
        assert!(fake.job(kept.id).await.is_some());

        // the known job is still deleted when another id is unknown
        let response = call(
            &app,
            Method::POST,
            "/api/v1/jobs/delete",
            Some(json!({"ids": [kept.id, Uuid::new_v4()]})),
        )
        .await;
        assert_eq!(response.status(), StatusCode::NOT_FOUND);
        assert!(fake.job(kept.id).await.is_none());

        let response = call(&app, Method::POST, "/api/v1/jobs/delete", Some(json!({"ids": []}))).await;
        assert_eq!(response.status(), StatusCode::BAD_REQUEST);
    }

    #[tokio::test]
    async fn test_create_job_requires_title() {
        let fake = Arc::new(FakeBackend::new());
        let response = call(
            &app(&fake),
            Method::POST,
            "/api/v1/jobs",
            Some(json!({"title": "  "})),
        )
        .await;
        assert_eq!(response.status(), StatusCode::BAD_REQUEST);
    }

    #[tokio::test]
    async fn test_upload_attaches_to_job() {
        let fake = Arc::new(FakeBackend::new());
        let job = fake.insert_job("Rust Engineer", &["a.pdf"]).await;

        let boundary = "recruiter-test-boundary";
        let body = format!(
            "--{b}\r\nContent-Disposition: form-data; name=\"job_id\"\r\n\r\n{id}\r\n\
             --{b}\r\nContent-Disposition: form-data; name=\"file\"; filename=\"cv.pdf\"\r\n\
             Content-Type: application/pdf\r\n\r\n%PDF-1.4 test\r\n--{b}--\r\n",
            b = boundary,
            id = job.id
        );
        let request = Request::builder()
            .method(Method::POST)
            .uri("/api/v1/candidates/upload")
            .header(
                header::CONTENT_TYPE,
                format!("multipart/form-data; boundary={boundary}"),
            )
            .body(Body::from(body))
            .unwrap();

        let response = app(&fake).oneshot(request).await.unwrap();
        assert_eq!(response.status(), StatusCode::OK);
        let uploaded = body_json(response).await;
        assert_eq!(uploaded["file_name"], "20240501_cv.pdf");
        assert_eq!(
            uploaded["job"]["candidate_files"],
            json!(["a.pdf", "20240501_cv.pdf"])
        );
        assert_eq!(fake.uploads().await, vec!["20240501_cv.pdf".to_string()]);
    }
}
