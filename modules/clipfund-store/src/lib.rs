//! Postgres persistence for the submission/payout engine.

mod rows;
mod store;

pub use store::PgStore;
