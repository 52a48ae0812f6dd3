use chrono::Utc;
use serde::{Deserialize, Serialize};

/// A named, percentage-weighted destination for allocated profit.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct Bucket {
    /// Unique within a set — derived from creation time, see `BucketSet::add`
    pub id: u64,

    /// Display name (e.g., "Taxes", "Your Bonus")
    pub name: String,

    /// Share of the profit, 0–100. Individual values are not validated;
    /// only the set total is gated before allocation.
    pub percentage: f64,

    /// Destination account as it appears in the accounting software
    pub account: String,

    /// Display tag used by frontends to pick a color scheme
    pub color_tag: String,
}

impl Bucket {
    pub fn new(
        id: u64,
        name: impl Into<String>,
        percentage: f64,
        account: impl Into<String>,
        color_tag: impl Into<String>,
    ) -> Self {
        Self {
            id,
            name: name.into(),
            percentage,
            account: account.into(),
            color_tag: color_tag.into(),
        }
    }
}

/// The ordered collection of a user's buckets. Insertion order is
/// significant — allocations and exports preserve it.
///
/// Owned by exactly one identity; created with a default four-bucket
/// split on first sign-in.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct BucketSet {
    buckets: Vec<Bucket>,
}

impl BucketSet {
    /// Create an empty set (allowed — it allocates to nothing).
    pub fn empty() -> Self {
        Self { buckets: Vec::new() }
    }

    /// Build a set from existing buckets, preserving their order.
    pub fn from_buckets(buckets: Vec<Bucket>) -> Self {
        Self { buckets }
    }

    /// The default split every new identity starts with:
    /// 40% bonus, 25% taxes, 15% savings, 20% reinvestment.
    pub fn default_set() -> Self {
        Self {
            buckets: vec![
                Bucket::new(1, "Your Bonus", 40.0, "Owner Draw", "from-pink-500 to-rose-500"),
                Bucket::new(2, "Taxes", 25.0, "Tax Savings Account", "from-blue-500 to-cyan-500"),
                Bucket::new(3, "Savings", 15.0, "Business Savings", "from-purple-500 to-violet-500"),
                Bucket::new(4, "Reinvestment", 20.0, "Operating Account", "from-orange-500 to-amber-500"),
            ],
        }
    }

    /// Append a new placeholder bucket (0%, "New Bucket") and return its id.
    ///
    /// Ids come from the current time in milliseconds, bumped past the
    /// highest existing id so two adds in the same millisecond stay distinct.
    pub fn add(&mut self) -> u64 {
        let now_millis = Utc::now().timestamp_millis().max(0) as u64;
        let floor = self.buckets.iter().map(|b| b.id).max().unwrap_or(0);
        let id = now_millis.max(floor + 1);
        self.buckets.push(Bucket::new(
            id,
            "New Bucket",
            0.0,
            "Account Name",
            "from-gray-500 to-gray-600",
        ));
        id
    }

    /// Remove exactly one bucket by id. Returns `true` if one was removed.
    /// No minimum count is enforced — an empty set is valid.
    pub fn delete(&mut self, id: u64) -> bool {
        let before = self.buckets.len();
        self.buckets.retain(|b| b.id != id);
        self.buckets.len() < before
    }

    /// Rename the targeted bucket. Returns `false` if the id is unknown.
    pub fn rename(&mut self, id: u64, name: impl Into<String>) -> bool {
        match self.find_mut(id) {
            Some(b) => {
                b.name = name.into();
                true
            }
            None => false,
        }
    }

    /// Set a bucket's percentage from raw user input.
    /// Text that doesn't parse as a number coerces to 0.
    pub fn set_percentage_input(&mut self, id: u64, input: &str) -> bool {
        let pct = input.trim().parse::<f64>().unwrap_or(0.0);
        self.set_percentage(id, pct)
    }

    /// Set a bucket's percentage directly.
    pub fn set_percentage(&mut self, id: u64, percentage: f64) -> bool {
        match self.find_mut(id) {
            Some(b) => {
                b.percentage = percentage;
                true
            }
            None => false,
        }
    }

    /// Change the destination account of the targeted bucket.
    pub fn set_account(&mut self, id: u64, account: impl Into<String>) -> bool {
        match self.find_mut(id) {
            Some(b) => {
                b.account = account.into();
                true
            }
            None => false,
        }
    }

    /// Change the display color tag of the targeted bucket.
    pub fn set_color_tag(&mut self, id: u64, color_tag: impl Into<String>) -> bool {
        match self.find_mut(id) {
            Some(b) => {
                b.color_tag = color_tag.into();
                true
            }
            None => false,
        }
    }

    /// Sum of all bucket percentages. The allocation gate requires this
    /// to equal exactly 100.0 (strict equality, not rounded).
    #[must_use]
    pub fn total_percentage(&self) -> f64 {
        self.buckets.iter().map(|b| b.percentage).sum()
    }

    /// Buckets in insertion order.
    #[must_use]
    pub fn buckets(&self) -> &[Bucket] {
        &self.buckets
    }

    #[must_use]
    pub fn get(&self, id: u64) -> Option<&Bucket> {
        self.buckets.iter().find(|b| b.id == id)
    }

    #[must_use]
    pub fn len(&self) -> usize {
        self.buckets.len()
    }

    #[must_use]
    pub fn is_empty(&self) -> bool {
        self.buckets.is_empty()
    }

    fn find_mut(&mut self, id: u64) -> Option<&mut Bucket> {
        self.buckets.iter_mut().find(|b| b.id == id)
    }
}

impl Default for BucketSet {
    fn default() -> Self {
        Self::default_set()
    }
}
