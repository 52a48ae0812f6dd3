use thiserror::Error;

/// Unified error type for the entire profit-plan-core library.
/// Every public fallible function returns `Result<T, CoreError>`.
#[derive(Debug, Error)]
pub enum CoreError {
    // ── Authentication ──────────────────────────────────────────────
    #[error("'{0}' is not a valid email address")]
    InvalidEmail(String),

    #[error("No pending code for {identity} — request a new one")]
    NoPendingCode { identity: String },

    #[error("This code has expired — request a new one")]
    CodeExpired,

    #[error("Invalid code — check it and try again")]
    CodeMismatch,

    #[error("Not signed in")]
    NotAuthenticated,

    // ── Persistence ─────────────────────────────────────────────────
    #[error("Failed to load profile: {0}")]
    ProfileLoadFailed(String),

    #[error("Failed to save profile: {0}")]
    ProfileSaveFailed(String),

    // ── Export ──────────────────────────────────────────────────────
    #[error("Nothing to export — calculate allocations first")]
    ExportPreconditionFailed,

    // ── Serialization ───────────────────────────────────────────────
    #[error("Serialization error: {0}")]
    Serialization(String),

    #[error("Deserialization error: {0}")]
    Deserialization(String),

    // ── API / Network ───────────────────────────────────────────────
    #[error("API error ({provider}): {message}")]
    Api {
        provider: String,
        message: String,
    },

    #[error("Network error: {0}")]
    Network(String),

    // ── Randomness ──────────────────────────────────────────────────
    #[error("Random source unavailable: {0}")]
    RandomSource(String),
}

// ── Conversion helpers (From impls) ─────────────────────────────────

impl From<serde_json::Error> for CoreError {
    fn from(e: serde_json::Error) -> Self {
        CoreError::Deserialization(e.to_string())
    }
}

impl From<reqwest::Error> for CoreError {
    fn from(e: reqwest::Error) -> Self {
        // Sanitize error message: strip query parameters from URLs so auth
        // tokens passed in queries never end up in surfaced errors.
        let msg = e.to_string();
        let sanitized = if let Some(idx) = msg.find('?') {
            format!("{}?<query redacted>", &msg[..idx])
        } else {
            msg
        };
        CoreError::Network(sanitized)
    }
}

impl From<getrandom::Error> for CoreError {
    fn from(e: getrandom::Error) -> Self {
        CoreError::RandomSource(e.to_string())
    }
}
