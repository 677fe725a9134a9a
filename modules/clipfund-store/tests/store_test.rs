//! Postgres-backed store tests. Ignored by default; run against a live
//! database with:
//!
//!   DATABASE_URL=postgres://... cargo test -p clipfund-store -- --ignored

use sqlx::postgres::PgPoolOptions;
use sqlx::PgPool;
use uuid::Uuid;

use clipfund_common::{SubmissionStatus, Verdict};
use clipfund_engine::traits::SubmissionStore;
use clipfund_store::PgStore;

async fn connect() -> (PgStore, PgPool) {
    let url = std::env::var("DATABASE_URL").expect("DATABASE_URL must be set");
    let pool = PgPoolOptions::new()
        .max_connections(2)
        .connect(&url)
        .await
        .expect("connect to test database");
    let store = PgStore::new(pool.clone());
    store.migrate().await.expect("run migrations");
    (store, pool)
}

async fn seed_submission(pool: &PgPool, status: &str) -> Uuid {
    let brand_id = Uuid::new_v4();
    sqlx::query(
        "INSERT INTO brands (id, payment_verified, auto_approval_enabled) VALUES ($1, true, true)",
    )
    .bind(brand_id)
    .execute(pool)
    .await
    .unwrap();

    let creator_id = Uuid::new_v4();
    sqlx::query("INSERT INTO creators (id) VALUES ($1)")
        .bind(creator_id)
        .execute(pool)
        .await
        .unwrap();

    let campaign_id = Uuid::new_v4();
    sqlx::query(
        "INSERT INTO campaigns (id, brand_id, title, budget_pool, rpm) \
         VALUES ($1, $2, 'test campaign', 100, 0.65)",
    )
    .bind(campaign_id)
    .bind(brand_id)
    .execute(pool)
    .await
    .unwrap();

    let submission_id = Uuid::new_v4();
    sqlx::query(
        "INSERT INTO submissions (id, campaign_id, creator_id, video_url, status) \
         VALUES ($1, $2, $3, 'https://cdn.example.com/v.mp4', $4)",
    )
    .bind(submission_id)
    .bind(campaign_id)
    .bind(creator_id)
    .bind(status)
    .execute(pool)
    .await
    .unwrap();

    submission_id
}

#[tokio::test]
#[ignore = "requires a Postgres database via DATABASE_URL"]
async fn moderation_write_lands_on_pending_submissions() {
    let (store, pool) = connect().await;
    let submission_id = seed_submission(&pool, "pending").await;

    let verdict = Verdict {
        approved: true,
        reason: "on brief".into(),
        confidence: 0.9,
    };
    store
        .save_moderated(submission_id, SubmissionStatus::Approved, &verdict, "the transcript")
        .await
        .unwrap();

    let (status, transcription): (String, Option<String>) =
        sqlx::query_as("SELECT status, transcription FROM submissions WHERE id = $1")
            .bind(submission_id)
            .fetch_one(&pool)
            .await
            .unwrap();
    assert_eq!(status, "approved");
    assert_eq!(transcription.as_deref(), Some("the transcript"));
}

#[tokio::test]
#[ignore = "requires a Postgres database via DATABASE_URL"]
async fn moderation_write_falls_back_to_transcription_when_status_moved() {
    let (store, pool) = connect().await;
    // Status already moved off pending, as if a reviewer acted concurrently.
    let submission_id = seed_submission(&pool, "approved").await;

    let verdict = Verdict {
        approved: false,
        reason: "off brief".into(),
        confidence: 0.95,
    };
    store
        .save_moderated(submission_id, SubmissionStatus::Rejected, &verdict, "the transcript")
        .await
        .unwrap();

    let (status, transcription, moderation): (String, Option<String>, Option<serde_json::Value>) =
        sqlx::query_as(
            "SELECT status, transcription, auto_moderation_result \
             FROM submissions WHERE id = $1",
        )
        .bind(submission_id)
        .fetch_one(&pool)
        .await
        .unwrap();

    // The stale verdict must not overwrite the concurrent decision, but the
    // transcription still lands.
    assert_eq!(status, "approved");
    assert_eq!(transcription.as_deref(), Some("the transcript"));
    assert!(moderation.is_none());
}
