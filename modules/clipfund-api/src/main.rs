use std::sync::Arc;

use anyhow::Result;
use axum::{
    routing::{get, post},
    Router,
};
use sqlx::postgres::PgPoolOptions;
use tracing::info;
use tracing_subscriber::EnvFilter;

use clipfund_common::AppConfig;
use clipfund_engine::{
    FfmpegExtractor, HttpVideoFetcher, PipelineWorker, SubmissionPipeline,
};
use clipfund_payouts::TransferOrchestrator;
use clipfund_store::PgStore;
use deepgram_client::DeepgramClient;
use openai_client::OpenAiClient;
use stripe_client::StripeClient;

mod rest;

pub struct AppState {
    pub store: Arc<PgStore>,
    pub worker: PipelineWorker,
    pub orchestrator: TransferOrchestrator,
}

#[tokio::main]
async fn main() -> Result<()> {
    tracing_subscriber::fmt()
        .with_env_filter(EnvFilter::from_default_env().add_directive("clipfund=info".parse()?))
        .init();

    let config = AppConfig::from_env()?;

    let pool = PgPoolOptions::new()
        .max_connections(10)
        .connect(&config.database_url)
        .await?;
    let store = Arc::new(PgStore::new(pool));
    store.migrate().await?;

    let fetcher = Arc::new(HttpVideoFetcher::new(
        &config.storage_base_url,
        &config.storage_bucket,
        config.storage_service_key.as_deref(),
    ));
    let transcriber = Arc::new(DeepgramClient::new(&config.deepgram_api_key));
    let evaluator = Arc::new(OpenAiClient::new(&config.openai_api_key));
    let processor = Arc::new(StripeClient::new(&config.stripe_secret_key));

    let pipeline = Arc::new(SubmissionPipeline::new(
        fetcher,
        Arc::new(FfmpegExtractor::new()),
        transcriber,
        evaluator,
        store.clone(),
        store.clone(),
    ));
    let worker = PipelineWorker::new(pipeline, config.max_concurrent_pipelines);
    let orchestrator = TransferOrchestrator::new(store.clone(), processor);

    let state = Arc::new(AppState {
        store,
        worker,
        orchestrator,
    });

    let app = Router::new()
        // Health check
        .route("/", get(|| async { "ok" }))
        // Submission intake (fire-and-forget into the pipeline)
        .route("/api/submissions", post(rest::api_create_submission))
        // Payout dispatch + confirmation
        .route("/api/payouts/{submission_id}", post(rest::api_process_payout))
        .route(
            "/api/payouts/{submission_id}/confirm",
            post(rest::api_confirm_payout),
        )
        .with_state(state)
        .layer(
            tower_http::cors::CorsLayer::new()
                .allow_origin(tower_http::cors::Any)
                .allow_methods(tower_http::cors::Any)
                .allow_headers(tower_http::cors::Any),
        );

    let addr = format!("{}:{}", config.api_host, config.api_port);
    info!("clipfund API listening on {addr}");
    let listener = tokio::net::TcpListener::bind(&addr).await?;
    axum::serve(listener, app).await?;

    Ok(())
}
