//! Submission processing: the ingestion → transcription → moderation
//! pipeline and its collaborator seams.

pub mod adapters;
pub mod audio;
pub mod fetch;
pub mod pipeline;
pub mod temp;
pub mod traits;
pub mod worker;

pub use audio::FfmpegExtractor;
pub use fetch::HttpVideoFetcher;
pub use pipeline::SubmissionPipeline;
pub use temp::SubmissionWorkspace;
pub use traits::{
    AudioExtractor, EvaluationInput, Evaluator, NotificationSink, SubmissionStore, Transcriber,
    VideoFetcher,
};
pub use worker::PipelineWorker;
