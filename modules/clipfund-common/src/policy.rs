//! Business policy constants. These are product decisions, not incidental
//! literals; tests pin them and the allocator/pipeline reference them by name.

/// Evaluation verdicts below this confidence are treated as inconclusive and
/// take no moderation action.
pub const AUTO_MODERATION_CONFIDENCE_THRESHOLD: f64 = 0.80;

/// Service fee charged to the brand on top of creator + referrer payments.
pub const SERVICE_FEE_RATE: f64 = 0.20;

/// A campaign whose remaining budget drops below this is flagged
/// `has_insufficient_budget`.
pub const LOW_BUDGET_THRESHOLD: f64 = 10.0;

/// Minimum capped creator payment for a single submission to be dispatchable.
pub const MIN_SUBMISSION_PAYOUT: f64 = 10.0;

/// Minimum pending+approved earnings across all of a creator's submissions
/// before any transfer is attempted.
pub const MIN_AGGREGATE_EARNINGS: f64 = 25.0;
