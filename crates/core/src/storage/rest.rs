use async_trait::async_trait;
use reqwest::Client;
#[cfg(not(target_arch = "wasm32"))]
use std::time::Duration;

use crate::errors::CoreError;
use crate::models::profile::Profile;

use super::traits::ProfileStore;

/// Remote profile backend: one row per identity in a REST-exposed table
/// (e.g., a hosted Postgres behind an auth provider).
///
/// - `GET  {base_url}/profiles/{identity}` → `Profile` JSON, 404 if absent
/// - `PUT  {base_url}/profiles/{identity}` ← `Profile` JSON (upsert)
///
/// An optional bearer token is attached to every request. Load failures
/// are surfaced as errors here; the facade degrades them to the default
/// bucket set rather than blocking sign-in.
pub struct RestProfileStore {
    client: Client,
    base_url: String,
    bearer_token: Option<String>,
}

impl RestProfileStore {
    pub fn new(base_url: impl Into<String>, bearer_token: Option<String>) -> Self {
        let builder = Client::builder();
        #[cfg(not(target_arch = "wasm32"))]
        let builder = builder.timeout(Duration::from_secs(30));
        Self {
            client: builder.build().unwrap_or_else(|_| Client::new()),
            base_url: base_url.into().trim_end_matches('/').to_string(),
            bearer_token,
        }
    }

    fn profile_url(&self, identity: &str) -> String {
        format!("{}/profiles/{}", self.base_url, encode_path_segment(identity))
    }

    fn with_auth(&self, req: reqwest::RequestBuilder) -> reqwest::RequestBuilder {
        match &self.bearer_token {
            Some(token) => req.bearer_auth(token),
            None => req,
        }
    }
}

#[cfg_attr(target_arch = "wasm32", async_trait(?Send))]
#[cfg_attr(not(target_arch = "wasm32"), async_trait)]
impl ProfileStore for RestProfileStore {
    fn name(&self) -> &str {
        "Rest"
    }

    async fn get(&self, identity: &str) -> Result<Option<Profile>, CoreError> {
        let url = self.profile_url(identity);
        let resp = self.with_auth(self.client.get(&url)).send().await?;

        if resp.status() == reqwest::StatusCode::NOT_FOUND {
            return Ok(None);
        }
        if !resp.status().is_success() {
            return Err(CoreError::ProfileLoadFailed(format!(
                "server returned {} for {identity}",
                resp.status()
            )));
        }

        let profile: Profile = resp.json().await.map_err(|e| {
            CoreError::ProfileLoadFailed(format!("malformed profile record: {e}"))
        })?;
        Ok(Some(profile))
    }

    async fn upsert(&self, profile: &Profile) -> Result<(), CoreError> {
        let url = self.profile_url(&profile.identity);
        let resp = self
            .with_auth(self.client.put(&url))
            .json(profile)
            .send()
            .await?;

        if !resp.status().is_success() {
            return Err(CoreError::ProfileSaveFailed(format!(
                "server returned {} for {}",
                resp.status(),
                profile.identity
            )));
        }
        Ok(())
    }
}

/// Percent-encode a value for use as a single URL path segment.
/// Emails land in the path, so '@' and friends must be escaped.
fn encode_path_segment(value: &str) -> String {
    let mut out = String::with_capacity(value.len());
    for byte in value.bytes() {
        match byte {
            b'a'..=b'z' | b'A'..=b'Z' | b'0'..=b'9' | b'-' | b'.' | b'_' | b'~' => {
                out.push(byte as char);
            }
            _ => out.push_str(&format!("%{byte:02X}")),
        }
    }
    out
}
