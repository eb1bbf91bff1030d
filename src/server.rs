//! HTTP trigger and health endpoints.

use std::collections::BTreeMap;
use std::sync::Arc;

use anyhow::{Context, Result};
use axum::extract::State;
use axum::routing::get;
use axum::{Json, Router};
use serde::Serialize;
use tracing::{error, info};

use crate::models::{RunSummary, Source};
use crate::pipeline::JobRunner;

pub struct AppState {
    pub runner: Arc<JobRunner>,
}

#[derive(Serialize)]
pub struct SchedulerInfo {
    pub cron: String,
    pub timezone: String,
}

#[derive(Serialize)]
pub struct HealthResponse {
    pub status: &'static str,
    pub version: &'static str,
    pub scrapers: BTreeMap<&'static str, bool>,
    pub scheduler: SchedulerInfo,
}

/// Outcome of a triggered run. Always served with HTTP 200.
#[derive(Serialize)]
#[serde(tag = "status", rename_all = "lowercase")]
pub enum RunResponse {
    Ok { sources: RunSummary },
    Error { message: String },
}

pub fn build_router(state: Arc<AppState>) -> Router {
    Router::new()
        .route("/health", get(health))
        .route("/run-scraper", get(run_scraper))
        .with_state(state)
}

pub async fn serve(state: Arc<AppState>, bind: &str) -> Result<()> {
    let listener = tokio::net::TcpListener::bind(bind)
        .await
        .with_context(|| format!("Failed to bind {}", bind))?;
    info!("🌐 Listening on http://{}", bind);
    axum::serve(listener, build_router(state))
        .await
        .context("HTTP server failed")
}

pub async fn health(State(state): State<Arc<AppState>>) -> Json<HealthResponse> {
    let config = state.runner.config();
    let scrapers = Source::ALL
        .iter()
        .map(|source| (source.key(), config.is_scraper_enabled(*source)))
        .collect();
    Json(HealthResponse {
        status: "healthy",
        version: env!("CARGO_PKG_VERSION"),
        scrapers,
        scheduler: SchedulerInfo {
            cron: config.scheduler.cron.clone(),
            timezone: config.scheduler.timezone.clone(),
        },
    })
}

/// The run is spawned so it finishes even if the client disconnects.
pub async fn run_scraper(State(state): State<Arc<AppState>>) -> Json<RunResponse> {
    info!("🌐 Run triggered over HTTP");
    let runner = state.runner.clone();
    let handle = tokio::spawn(async move {
        let outcome = runner.run().await;
        match &outcome {
            Ok(summary) => info!(
                "🌐 Triggered run finished: {} scraped, {} added",
                summary.total_scraped, summary.total_added
            ),
            Err(e) => error!("❌ Triggered run failed: {}", e),
        }
        outcome
    });

    match handle.await {
        Ok(Ok(sources)) => Json(RunResponse::Ok { sources }),
        Ok(Err(e)) => Json(RunResponse::Error { message: e.to_string() }),
        Err(e) => {
            error!("❌ Triggered run task failed: {}", e);
            Json(RunResponse::Error { message: e.to_string() })
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::config::Config;
    use crate::models::JobCandidate;
    use crate::scrapers::ScraperTrait;
    use crate::store::memory::MemoryStore;
    use async_trait::async_trait;
    use axum::body::Body;
    use axum::http::{Request, StatusCode};
    use http_body_util::BodyExt;
    use serde_json::Value;
    use std::time::Duration;
    use tower::ServiceExt;

    struct OneJob;

    #[async_trait]
    impl ScraperTrait for OneJob {
        async fn scrape(&self) -> anyhow::Result<Vec<JobCandidate>> {
            Ok(vec![JobCandidate::new(Source::Linkedin, "Product Manager Intern")
                .with_company("Acme")
                .with_url("https://acme.com/jobs/1")])
        }

        fn source(&self) -> Source {
            Source::Linkedin
        }
    }

    struct Crashes;

    #[async_trait]
    impl ScraperTrait for Crashes {
        async fn scrape(&self) -> anyhow::Result<Vec<JobCandidate>> {
            panic!("boom")
        }

        fn source(&self) -> Source {
            Source::Cms
        }
    }

    struct SlowJob;

    #[async_trait]
    impl ScraperTrait for SlowJob {
        async fn scrape(&self) -> anyhow::Result<Vec<JobCandidate>> {
            tokio::time::sleep(Duration::from_millis(100)).await;
            OneJob.scrape().await
        }

        fn source(&self) -> Source {
            Source::Linkedin
        }
    }

    fn app_with_store(scrapers: Vec<Arc<dyn ScraperTrait>>, store: Arc<MemoryStore>) -> Router {
        let runner = JobRunner::new(Arc::new(Config::default()), scrapers, store);
        build_router(Arc::new(AppState {
            runner: Arc::new(runner),
        }))
    }

    fn app(scrapers: Vec<Arc<dyn ScraperTrait>>) -> Router {
        app_with_store(scrapers, Arc::new(MemoryStore::default()))
    }

    async fn get_json(app: Router, uri: &str) -> (StatusCode, Value) {
        let response = app
            .oneshot(Request::builder().uri(uri).body(Body::empty()).unwrap())
            .await
            .unwrap();
        let status = response.status();
        let bytes = response.into_body().collect().await.unwrap().to_bytes();
        (status, serde_json::from_slice(&bytes).unwrap())
    }

    #[tokio::test]
    async fn test_health() {
        let (status, body) = get_json(app(Vec::new()), "/health").await;
        assert_eq!(status, StatusCode::OK);
        assert_eq!(body["status"], "healthy");
        assert_eq!(body["scrapers"]["linkedin"], true);
        assert_eq!(body["scheduler"]["cron"], "0 9 * * *");
        assert_eq!(body["scheduler"]["timezone"], "America/New_York");
    }

    #[tokio::test]
    async fn test_run_scraper_returns_summary() {
        let (status, body) = get_json(app(vec![Arc::new(OneJob) as Arc<dyn ScraperTrait>]), "/run-scraper").await;
        assert_eq!(status, StatusCode::OK);
        assert_eq!(body["status"], "ok");
        assert_eq!(body["sources"]["linkedin_jobs"], 1);
        assert_eq!(body["sources"]["cms_jobs"], 0);
        assert_eq!(body["sources"]["total_scraped"], 1);
        assert_eq!(body["sources"]["total_added"], 1);
    }

    #[tokio::test]
    async fn test_run_scraper_reports_errors_with_200() {
        let (status, body) = get_json(app(vec![Arc::new(Crashes) as Arc<dyn ScraperTrait>]), "/run-scraper").await;
        assert_eq!(status, StatusCode::OK);
        assert_eq!(body["status"], "error");
        assert!(body["message"].as_str().unwrap().contains("crashed"));
    }

    #[tokio::test]
    async fn test_triggered_run_survives_client_disconnect() {
        let store = Arc::new(MemoryStore::default());
        let app = app_with_store(vec![Arc::new(SlowJob) as Arc<dyn ScraperTrait>], store.clone());

        let request = app.oneshot(Request::builder().uri("/run-scraper").body(Body::empty()).unwrap());
        // Dropping the request future mid-run is what a disconnect does.
        assert!(tokio::time::timeout(Duration::from_millis(20), request).await.is_err());

        for _ in 0..100 {
            if !store.records().is_empty() {
                break;
            }
            tokio::time::sleep(Duration::from_millis(20)).await;
        }
        assert_eq!(store.records().len(), 1);
    }
}
