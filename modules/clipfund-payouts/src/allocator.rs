//! Payout Allocator — pure calculation, no I/O.
//!
//! Turns approved views into a capped, fee-adjusted split between creator
//! and referrer against the campaign's remaining budget. Every monetary
//! value is rounded to cents at each step; the creator is prioritized over
//! the referrer when the budget cannot cover both.

use clipfund_common::money::round2;
use clipfund_common::policy::{
    LOW_BUDGET_THRESHOLD, MIN_AGGREGATE_EARNINGS, MIN_SUBMISSION_PAYOUT, SERVICE_FEE_RATE,
};

/// Result of allocating one submission's payout.
#[derive(Debug, Clone, PartialEq)]
pub struct Allocation {
    pub creator_payment: f64,
    pub referrer_payment: f64,
    /// 20% surcharge on creator + referrer, billed to the brand on top —
    /// never deducted from the campaign budget.
    pub service_fee: f64,
    pub total_cost: f64,
    pub new_remaining_budget: f64,
    pub has_insufficient_budget: bool,
}

impl Allocation {
    /// The amount actually deducted from the campaign pool.
    pub fn budget_debit(&self) -> f64 {
        round2(self.creator_payment + self.referrer_payment)
    }
}

/// Compute creator/referrer payments, service fee, and budget deduction.
///
/// `referrer_eligible` means a referrer exists and has an active transfer
/// destination; without it no referrer payment is ever considered.
pub fn allocate(
    views: i64,
    rpm: f64,
    referral_bonus_rate: f64,
    remaining_budget: f64,
    referrer_eligible: bool,
) -> Allocation {
    let initial_creator = round2(views as f64 * rpm / 1000.0);
    let initial_referrer = if referrer_eligible {
        round2(views as f64 * referral_bonus_rate / 1000.0)
    } else {
        0.0
    };

    // Budget capping: creator first, referrer gets what is left.
    let (creator_payment, referrer_payment) = if remaining_budget <= 0.0 {
        (0.0, 0.0)
    } else if remaining_budget <= initial_creator {
        (remaining_budget, 0.0)
    } else {
        (
            initial_creator,
            round2(initial_referrer.min(remaining_budget - initial_creator)),
        )
    };

    let service_fee = round2(SERVICE_FEE_RATE * (creator_payment + referrer_payment));
    let total_cost = round2(creator_payment + referrer_payment + service_fee);
    let new_remaining_budget = round2(remaining_budget - (creator_payment + referrer_payment));

    Allocation {
        creator_payment,
        referrer_payment,
        service_fee,
        total_cost,
        new_remaining_budget,
        has_insufficient_budget: new_remaining_budget < LOW_BUDGET_THRESHOLD,
    }
}

/// Eligibility gate applied before any transfer is attempted: the capped
/// creator payment must clear the per-submission minimum AND the creator's
/// pending+approved earnings across all submissions must clear the
/// aggregate minimum.
pub fn is_payable(creator_payment: f64, aggregate_earnings: f64) -> bool {
    creator_payment >= MIN_SUBMISSION_PAYOUT && aggregate_earnings >= MIN_AGGREGATE_EARNINGS
}

#[cfg(test)]
mod tests {
    use super::*;
    use rand::Rng;

    #[test]
    fn uncapped_allocation_with_referrer() {
        let alloc = allocate(72153, 0.65, 0.65, 100.00, true);
        assert_eq!(alloc.creator_payment, 46.90);
        assert_eq!(alloc.referrer_payment, 46.90);
        assert_eq!(alloc.service_fee, 18.76);
        assert_eq!(alloc.total_cost, 112.56);
        assert_eq!(alloc.new_remaining_budget, 6.20);
        assert!(alloc.has_insufficient_budget);
    }

    #[test]
    fn creator_takes_priority_when_budget_caps() {
        let alloc = allocate(72153, 0.65, 0.65, 44.19, true);
        assert_eq!(alloc.creator_payment, 44.19);
        assert_eq!(alloc.referrer_payment, 0.00);
        assert_eq!(alloc.service_fee, 8.84);
        assert_eq!(alloc.total_cost, 53.03);
        assert_eq!(alloc.new_remaining_budget, 0.00);
        assert!(alloc.has_insufficient_budget);
    }

    #[test]
    fn zero_views_pays_nothing() {
        let alloc = allocate(0, 0.65, 0.65, 100.0, true);
        assert_eq!(alloc.creator_payment, 0.0);
        assert_eq!(alloc.referrer_payment, 0.0);
        assert_eq!(alloc.service_fee, 0.0);
        assert_eq!(alloc.total_cost, 0.0);
        assert_eq!(alloc.new_remaining_budget, 100.0);
    }

    #[test]
    fn zero_rpm_pays_nothing() {
        let alloc = allocate(50_000, 0.0, 0.0, 100.0, true);
        assert_eq!(alloc.creator_payment, 0.0);
        assert_eq!(alloc.referrer_payment, 0.0);
        assert_eq!(alloc.total_cost, 0.0);
    }

    #[test]
    fn exhausted_budget_pays_nothing() {
        let alloc = allocate(72153, 0.65, 0.65, 0.0, true);
        assert_eq!(alloc.creator_payment, 0.0);
        assert_eq!(alloc.referrer_payment, 0.0);
        assert_eq!(alloc.new_remaining_budget, 0.0);
    }

    #[test]
    fn ineligible_referrer_gets_nothing() {
        let alloc = allocate(72153, 0.65, 0.65, 1000.0, false);
        assert_eq!(alloc.creator_payment, 46.90);
        assert_eq!(alloc.referrer_payment, 0.0);
        assert_eq!(alloc.service_fee, round2(0.20 * 46.90));
    }

    #[test]
    fn referrer_capped_to_leftover_budget() {
        // Budget covers the creator fully and the referrer partially.
        let alloc = allocate(72153, 0.65, 0.65, 60.0, true);
        assert_eq!(alloc.creator_payment, 46.90);
        assert_eq!(alloc.referrer_payment, 13.10);
        assert_eq!(alloc.new_remaining_budget, 0.0);
    }

    #[test]
    fn eligibility_gate_boundaries() {
        assert!(!is_payable(9.99, 25.0));
        assert!(!is_payable(10.0, 24.99));
        assert!(is_payable(10.0, 25.0));
        assert!(is_payable(100.0, 100.0));
    }

    #[test]
    fn fee_and_total_identities_hold_for_random_inputs() {
        let mut rng = rand::rng();
        for _ in 0..2000 {
            let views: i64 = rng.random_range(0..5_000_000);
            let rpm: f64 = rng.random_range(0.0..5.0);
            let bonus: f64 = rng.random_range(0.0..2.0);
            let budget: f64 = round2(rng.random_range(0.0..50_000.0));
            let eligible = rng.random_bool(0.5);

            let alloc = allocate(views, rpm, bonus, budget, eligible);

            assert_eq!(
                alloc.service_fee,
                round2(SERVICE_FEE_RATE * (alloc.creator_payment + alloc.referrer_payment)),
            );
            assert_eq!(
                alloc.total_cost,
                round2(alloc.creator_payment + alloc.referrer_payment + alloc.service_fee),
            );
            // The pool is never overdrawn and the fee never touches it.
            assert!(alloc.budget_debit() <= budget + 1e-9);
            assert!(alloc.new_remaining_budget >= -1e-9);
            if !eligible {
                assert_eq!(alloc.referrer_payment, 0.0);
            }
        }
    }
}
