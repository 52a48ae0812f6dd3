use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};

use super::bucket::BucketSet;

/// The persisted record for one identity: their bucket configuration
/// plus the last save time. One record per identity, keyed by email,
/// upsert (create-or-replace) semantics, last-write-wins.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct Profile {
    /// Email address — the primary key
    pub identity: String,

    pub buckets: BucketSet,

    pub updated_at: DateTime<Utc>,
}

impl Profile {
    pub fn new(identity: impl Into<String>, buckets: BucketSet) -> Self {
        Self {
            identity: identity.into(),
            buckets,
            updated_at: Utc::now(),
        }
    }

    /// A brand-new profile with the default bucket split, created lazily
    /// on an identity's first successful verification.
    pub fn with_defaults(identity: impl Into<String>) -> Self {
        Self::new(identity, BucketSet::default_set())
    }
}
