use serde::{Deserialize, Serialize};

use super::allocation::Allocation;
use super::bucket::BucketSet;

/// The passwordless sign-in state machine.
///
/// `AwaitingEmail → CodeSent → Authenticated`, with `AwaitingEmail`
/// reachable again from `CodeSent` (user restarts) or from a failed or
/// expired verification. A `CodeMismatch` keeps the machine in
/// `CodeSent` so the user can retry within the expiry window.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub enum AuthState {
    /// No sign-in attempt in flight
    AwaitingEmail,
    /// A code was issued and handed to the delivery channel
    CodeSent { email: String },
    /// Verification succeeded; the session is bound to this identity
    Authenticated { identity: String },
}

impl AuthState {
    #[must_use]
    pub fn is_authenticated(&self) -> bool {
        matches!(self, AuthState::Authenticated { .. })
    }

    /// The identity this state is bound to, if authenticated.
    #[must_use]
    pub fn identity(&self) -> Option<&str> {
        match self {
            AuthState::Authenticated { identity } => Some(identity),
            _ => None,
        }
    }
}

/// Ephemeral working state, alive only while authenticated.
///
/// Holds the live (possibly unsaved) bucket configuration, the raw profit
/// input, free-text notes, and the last computed allocations. Destroyed on
/// sign-out; unsaved allocation work is discarded, but the bucket set is
/// persisted first.
#[derive(Debug, Clone)]
pub struct Session {
    pub identity: String,

    pub buckets: BucketSet,

    /// Raw profit input as typed. Kept as text because the allocation gate
    /// distinguishes "empty" from "parses to 0".
    pub profit_input: String,

    /// Free-text memo attached to exports
    pub notes: String,

    /// Last computed allocation result (derived, never persisted)
    pub allocations: Vec<Allocation>,
}

impl Session {
    pub fn new(identity: impl Into<String>, buckets: BucketSet) -> Self {
        Self {
            identity: identity.into(),
            buckets,
            profit_input: String::new(),
            notes: String::new(),
            allocations: Vec::new(),
        }
    }

    /// The profit amount as a number; missing or invalid input is 0.
    #[must_use]
    pub fn profit_amount(&self) -> f64 {
        let parsed = self.profit_input.trim().parse::<f64>().unwrap_or(0.0);
        if parsed.is_finite() && parsed >= 0.0 {
            parsed
        } else {
            0.0
        }
    }
}
