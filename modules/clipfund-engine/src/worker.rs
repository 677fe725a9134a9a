//! Bounded-concurrency launcher for detached pipeline runs.
//!
//! The create-submission request hands off here and returns immediately;
//! a semaphore caps how many pipelines run at once so a burst of uploads
//! cannot spawn an unbounded task pile.

use std::sync::Arc;

use tokio::sync::Semaphore;
use tracing::{info, warn};
use uuid::Uuid;

use clipfund_common::VideoSource;

use crate::pipeline::SubmissionPipeline;

pub struct PipelineWorker {
    pipeline: Arc<SubmissionPipeline>,
    permits: Arc<Semaphore>,
}

impl PipelineWorker {
    pub fn new(pipeline: Arc<SubmissionPipeline>, max_concurrent: usize) -> Self {
        Self {
            pipeline,
            permits: Arc::new(Semaphore::new(max_concurrent)),
        }
    }

    /// Fire-and-forget: spawns the pipeline for one submission. The task
    /// waits for a permit, runs to completion, and releases it; there is no
    /// caller-side cancellation.
    pub fn spawn(&self, submission_id: Uuid, source: VideoSource) {
        let pipeline = self.pipeline.clone();
        let permits = self.permits.clone();

        tokio::spawn(async move {
            let _permit = match permits.acquire_owned().await {
                Ok(p) => p,
                Err(_) => {
                    warn!(submission_id = %submission_id, "Worker semaphore closed");
                    return;
                }
            };
            info!(submission_id = %submission_id, "Pipeline started");
            pipeline.process(submission_id, source).await;
        });
    }
}
