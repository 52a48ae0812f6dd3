use chrono::{DateTime, Utc};

use crate::errors::CoreError;
use crate::models::code::OneTimeCode;
use crate::storage::traits::{CodeDelivery, CodeStore};

/// Issues and verifies one-time codes against an injected code store.
///
/// Stateless — the sign-in state machine itself lives in the facade;
/// this service owns code generation, the expiry/single-use rules, and
/// magic-link parsing. `now` is always passed in explicitly so callers
/// (and tests) control the clock.
pub struct AuthService;

impl AuthService {
    pub fn new() -> Self {
        Self
    }

    /// Generate a 6-digit code for `email`, store it (replacing any
    /// outstanding code for that identity), and hand it to the delivery
    /// channel.
    ///
    /// Delivery failure is logged but never fatal — the code is already
    /// stored and stays verifiable through any other channel.
    pub async fn issue_code(
        &self,
        codes: &dyn CodeStore,
        delivery: &dyn CodeDelivery,
        email: &str,
        now: DateTime<Utc>,
    ) -> Result<(), CoreError> {
        let email = email.trim();
        if !email.contains('@') {
            return Err(CoreError::InvalidEmail(email.to_string()));
        }

        let code = generate_code()?;
        codes.put(OneTimeCode::new(email, code.clone(), now)).await?;

        if let Err(e) = delivery.send(email, &code).await {
            log::warn!("code delivery to {email} failed: {e}");
        }

        Ok(())
    }

    /// Check `submitted` against the pending code for `email`.
    ///
    /// - No pending code → `NoPendingCode`
    /// - Past expiry → `CodeExpired`, and the stale code is deleted
    /// - Wrong code → `CodeMismatch`, pending code kept so the user can
    ///   retry within the expiry window
    /// - Match → pending code deleted (one-time use), `Ok`
    pub async fn verify_code(
        &self,
        codes: &dyn CodeStore,
        email: &str,
        submitted: &str,
        now: DateTime<Utc>,
    ) -> Result<(), CoreError> {
        let email = email.trim();

        let pending = codes.get(email).await?.ok_or_else(|| CoreError::NoPendingCode {
            identity: email.to_string(),
        })?;

        if pending.is_expired(now) {
            codes.delete(email).await?;
            return Err(CoreError::CodeExpired);
        }

        if pending.code != submitted.trim() {
            return Err(CoreError::CodeMismatch);
        }

        codes.delete(email).await?;
        Ok(())
    }
}

impl Default for AuthService {
    fn default() -> Self {
        Self::new()
    }
}

/// Email and code lifted from a magic-link URL.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct MagicLinkParams {
    pub email: String,
    pub code: String,
}

/// Pull `email` and `code` out of a query string
/// (`?code=123456&email=you%40example.com`, with or without the `?`).
///
/// Returns `None` unless both parameters are present — a page load
/// without them is just a normal visit, not a failed verification.
#[must_use]
pub fn parse_magic_link(query: &str) -> Option<MagicLinkParams> {
    let query = query.strip_prefix('?').unwrap_or(query);

    let mut email = None;
    let mut code = None;

    for pair in query.split('&') {
        let Some((key, value)) = pair.split_once('=') else {
            continue;
        };
        match key {
            "email" => email = Some(percent_decode(value)),
            "code" => code = Some(percent_decode(value)),
            _ => {}
        }
    }

    Some(MagicLinkParams {
        email: email?,
        code: code?,
    })
}

/// Minimal percent-decoding for query values ('+' means space).
/// Malformed escapes pass through untouched.
fn percent_decode(value: &str) -> String {
    let bytes = value.as_bytes();
    let mut out = Vec::with_capacity(bytes.len());
    let mut i = 0;
    while i < bytes.len() {
        match bytes[i] {
            b'+' => {
                out.push(b' ');
                i += 1;
            }
            b'%' if i + 2 < bytes.len() => {
                let hex = std::str::from_utf8(&bytes[i + 1..i + 3]).ok();
                match hex.and_then(|h| u8::from_str_radix(h, 16).ok()) {
                    Some(byte) => {
                        out.push(byte);
                        i += 3;
                    }
                    None => {
                        out.push(b'%');
                        i += 1;
                    }
                }
            }
            b => {
                out.push(b);
                i += 1;
            }
        }
    }
    String::from_utf8_lossy(&out).into_owned()
}

/// Generate a uniformly distributed 6-digit code (100000–999999).
///
/// Uses the OS/browser entropy source via `getrandom`, with rejection
/// sampling to avoid modulo bias.
fn generate_code() -> Result<String, CoreError> {
    const RANGE: u32 = 900_000;
    // Largest multiple of RANGE that fits in u32 — values above it are
    // rejected to keep the distribution uniform.
    const ZONE: u32 = (u32::MAX / RANGE) * RANGE;

    loop {
        let mut buf = [0u8; 4];
        getrandom::getrandom(&mut buf)?;
        let sample = u32::from_le_bytes(buf);
        if sample < ZONE {
            return Ok((100_000 + sample % RANGE).to_string());
        }
    }
}
