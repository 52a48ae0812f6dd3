use chrono::{DateTime, Duration, Utc};
use serde::{Deserialize, Serialize};

/// How long a one-time code stays valid after issue.
pub const CODE_TTL_MINUTES: i64 = 15;

/// A short-lived, single-use numeric credential proving control of an
/// email address.
///
/// At most one outstanding code exists per identity — issuing a new one
/// overwrites any prior pending code. Consumed (deleted from the store)
/// on successful verification or on expiry detection.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct OneTimeCode {
    /// The email address this code was issued for
    pub identity: String,

    /// 6-digit numeric code, stored as a string to preserve leading zeros
    pub code: String,

    pub issued_at: DateTime<Utc>,

    /// issued_at + 15 minutes
    pub expires_at: DateTime<Utc>,
}

impl OneTimeCode {
    pub fn new(identity: impl Into<String>, code: impl Into<String>, issued_at: DateTime<Utc>) -> Self {
        Self {
            identity: identity.into(),
            code: code.into(),
            issued_at,
            expires_at: issued_at + Duration::minutes(CODE_TTL_MINUTES),
        }
    }

    /// Expiry is checked lazily at verification time, never by a timer.
    #[must_use]
    pub fn is_expired(&self, now: DateTime<Utc>) -> bool {
        now > self.expires_at
    }
}
