use crate::models::allocation::Allocation;
use crate::models::bucket::{Bucket, BucketSet};

/// Splits a profit figure across buckets proportionally.
///
/// Pure business logic — no I/O, no rounding, no stored state. The same
/// inputs always produce the same output, so callers can recompute freely.
///
/// The engine itself does not check that percentages sum to 100; that is
/// the caller-side gate (`can_allocate`). Given an off-balance set it
/// simply computes each share independently.
pub struct AllocationService;

impl AllocationService {
    pub fn new() -> Self {
        Self
    }

    /// Compute `profit × percentage / 100` for every bucket, in input order.
    ///
    /// Non-finite or negative profit is treated as 0. Amounts stay
    /// unrounded — rounding to cents happens only at export time, so
    /// rounding error never compounds across buckets.
    #[must_use]
    pub fn allocate(&self, profit_amount: f64, buckets: &[Bucket]) -> Vec<Allocation> {
        let profit = if profit_amount.is_finite() && profit_amount >= 0.0 {
            profit_amount
        } else {
            0.0
        };

        buckets
            .iter()
            .map(|bucket| Allocation {
                bucket_name: bucket.name.clone(),
                percentage: bucket.percentage,
                amount: profit * bucket.percentage / 100.0,
                account: bucket.account.clone(),
            })
            .collect()
    }

    /// The UI gate for allocation: percentages must total exactly 100
    /// (strict equality, not rounded) and the profit input must be
    /// non-empty. An input of "0" passes the gate; an empty field does not.
    #[must_use]
    pub fn can_allocate(&self, buckets: &BucketSet, profit_input: &str) -> bool {
        buckets.total_percentage() == 100.0 && !profit_input.trim().is_empty()
    }
}

impl Default for AllocationService {
    fn default() -> Self {
        Self::new()
    }
}
