use async_trait::async_trait;

use crate::errors::CoreError;
use crate::models::code::OneTimeCode;
use crate::models::profile::Profile;

/// Persistence seam for per-identity profiles.
///
/// One record per identity, upsert (create-or-replace) semantics,
/// last-write-wins. The local demo backend and the remote row-per-user
/// table both implement this — the rest of the codebase never knows
/// which one it is talking to.
#[cfg_attr(target_arch = "wasm32", async_trait(?Send))]
#[cfg_attr(not(target_arch = "wasm32"), async_trait)]
pub trait ProfileStore: Send + Sync {
    /// Human-readable backend name (for logs/errors).
    fn name(&self) -> &str;

    /// Fetch the profile for an identity, or `None` if it doesn't exist yet.
    async fn get(&self, identity: &str) -> Result<Option<Profile>, CoreError>;

    /// Create or replace the record for `profile.identity`.
    async fn upsert(&self, profile: &Profile) -> Result<(), CoreError>;
}

/// Persistence seam for pending one-time codes.
///
/// Keyed by identity; `put` overwrites any outstanding code for the same
/// identity (last-write-wins, never merged or queued).
#[cfg_attr(target_arch = "wasm32", async_trait(?Send))]
#[cfg_attr(not(target_arch = "wasm32"), async_trait)]
pub trait CodeStore: Send + Sync {
    /// Store a pending code, replacing any prior one for the same identity.
    async fn put(&self, code: OneTimeCode) -> Result<(), CoreError>;

    /// Fetch the pending code for an identity, if any.
    async fn get(&self, identity: &str) -> Result<Option<OneTimeCode>, CoreError>;

    /// Delete the pending code for an identity. Deleting a missing code is not an error.
    async fn delete(&self, identity: &str) -> Result<(), CoreError>;
}

/// Out-of-band channel that gets the code to the user (email transport,
/// console echo in demos, a capture buffer in tests).
///
/// Authentication correctness never depends on delivery succeeding —
/// a failed send is logged and the code stays verifiable.
#[cfg_attr(target_arch = "wasm32", async_trait(?Send))]
#[cfg_attr(not(target_arch = "wasm32"), async_trait)]
pub trait CodeDelivery: Send + Sync {
    async fn send(&self, identity: &str, code: &str) -> Result<(), CoreError>;
}

/// External auth/session provider (e.g., a hosted auth service that
/// remembers the signed-in user across page loads). The core only reads
/// the current identity from it; it never implements the transport.
///
/// This is a pull-only seam. Providers that push session-change events
/// keep their subscription on the frontend side: register the listener
/// there and call [`ProfitPlanner::resume`] when an identity appears
/// and [`ProfitPlanner::sign_out`] when it goes away. Both are safe to
/// call mid-session — any live session is persisted before it is
/// replaced or dropped.
///
/// [`ProfitPlanner::resume`]: crate::ProfitPlanner::resume
/// [`ProfitPlanner::sign_out`]: crate::ProfitPlanner::sign_out
#[cfg_attr(target_arch = "wasm32", async_trait(?Send))]
#[cfg_attr(not(target_arch = "wasm32"), async_trait)]
pub trait SessionProvider: Send + Sync {
    /// The identity of the currently signed-in user, if any.
    async fn current_identity(&self) -> Result<Option<String>, CoreError>;
}
