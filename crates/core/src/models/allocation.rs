use serde::{Deserialize, Serialize};

/// The computed dollar amount for one bucket given a profit figure.
///
/// Derived data — never persisted. Recomputed each time from
/// profit amount × bucket percentage. Amounts are kept unrounded;
/// rounding to cents happens only at export time, so per-bucket
/// rounding error never compounds.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct Allocation {
    /// Bucket name at the time of calculation
    pub bucket_name: String,

    /// Bucket percentage at the time of calculation
    pub percentage: f64,

    /// profit × percentage / 100, unrounded
    pub amount: f64,

    /// Destination account for the journal debit line
    pub account: String,
}

/// Sum of all allocation amounts (includes zero-amount entries).
#[must_use]
pub fn total_allocated(allocations: &[Allocation]) -> f64 {
    allocations.iter().map(|a| a.amount).sum()
}
