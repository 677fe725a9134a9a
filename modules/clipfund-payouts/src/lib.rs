//! Payout allocation and transfer orchestration.
//!
//! `allocator` is the pure capping/fee arithmetic; `transfer` sequences the
//! processor calls and persistence around it. Collaborators come in through
//! the traits in `traits`, so the whole crate tests without a network.

pub mod allocator;
pub mod stripe;
pub mod traits;
pub mod transfer;

pub use allocator::{allocate, is_payable, Allocation};
pub use traits::{
    NewTransaction, PaymentIntentHandle, PaymentProcessor, PayoutContext, PayoutStore,
};
pub use transfer::{PayoutReceipt, TransferOrchestrator};
