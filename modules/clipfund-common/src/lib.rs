//! Shared domain types, error taxonomy, money helpers, and business policy
//! constants for the clipfund submission/payout engine.

pub mod config;
pub mod error;
pub mod money;
pub mod policy;
pub mod types;

pub use config::AppConfig;
pub use error::{EngineError, EngineResult, PayoutError, PayoutResult};
pub use money::{round2, to_cents};
pub use types::{
    Brand, Campaign, Creator, ModerationOutcome, NotificationKind, PayoutStatus, Submission,
    SubmissionContext, SubmissionStatus, Transaction, TransactionStatus, Verdict, VideoSource,
};
