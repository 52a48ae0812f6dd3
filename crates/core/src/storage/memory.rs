use std::collections::HashMap;
use std::sync::Mutex;

use async_trait::async_trait;

use crate::errors::CoreError;
use crate::models::code::OneTimeCode;
use crate::models::profile::Profile;

use super::traits::{CodeDelivery, CodeStore, ProfileStore};

/// In-memory profile store — the "local-only" backend.
///
/// Scoped to the instance, never process-global, so each test or demo run
/// gets its own isolated world. Share one instance (behind `Arc`) across
/// facade instances to simulate sign-out/sign-in round trips.
#[derive(Debug, Default)]
pub struct InMemoryProfileStore {
    records: Mutex<HashMap<String, Profile>>,
}

impl InMemoryProfileStore {
    pub fn new() -> Self {
        Self::default()
    }

    /// Number of stored profiles (test/demo introspection).
    #[must_use]
    pub fn len(&self) -> usize {
        self.records.lock().map(|r| r.len()).unwrap_or(0)
    }

    #[must_use]
    pub fn is_empty(&self) -> bool {
        self.len() == 0
    }
}

#[cfg_attr(target_arch = "wasm32", async_trait(?Send))]
#[cfg_attr(not(target_arch = "wasm32"), async_trait)]
impl ProfileStore for InMemoryProfileStore {
    fn name(&self) -> &str {
        "InMemory"
    }

    async fn get(&self, identity: &str) -> Result<Option<Profile>, CoreError> {
        let records = self
            .records
            .lock()
            .map_err(|e| CoreError::ProfileLoadFailed(e.to_string()))?;
        Ok(records.get(identity).cloned())
    }

    async fn upsert(&self, profile: &Profile) -> Result<(), CoreError> {
        let mut records = self
            .records
            .lock()
            .map_err(|e| CoreError::ProfileSaveFailed(e.to_string()))?;
        records.insert(profile.identity.clone(), profile.clone());
        Ok(())
    }
}

/// In-memory pending-code store. One outstanding code per identity;
/// `put` overwrites (last-write-wins).
#[derive(Debug, Default)]
pub struct InMemoryCodeStore {
    pending: Mutex<HashMap<String, OneTimeCode>>,
}

impl InMemoryCodeStore {
    pub fn new() -> Self {
        Self::default()
    }
}

#[cfg_attr(target_arch = "wasm32", async_trait(?Send))]
#[cfg_attr(not(target_arch = "wasm32"), async_trait)]
impl CodeStore for InMemoryCodeStore {
    async fn put(&self, code: OneTimeCode) -> Result<(), CoreError> {
        let mut pending = self.pending.lock().map_err(poisoned_code_store)?;
        pending.insert(code.identity.clone(), code);
        Ok(())
    }

    async fn get(&self, identity: &str) -> Result<Option<OneTimeCode>, CoreError> {
        let pending = self.pending.lock().map_err(poisoned_code_store)?;
        Ok(pending.get(identity).cloned())
    }

    async fn delete(&self, identity: &str) -> Result<(), CoreError> {
        let mut pending = self.pending.lock().map_err(poisoned_code_store)?;
        pending.remove(identity);
        Ok(())
    }
}

fn poisoned_code_store<T>(e: std::sync::PoisonError<T>) -> CoreError {
    CoreError::Api {
        provider: "InMemoryCodeStore".into(),
        message: e.to_string(),
    }
}

/// Delivery channel that drops codes on the floor. Useful when the
/// frontend surfaces codes some other way (demo alert, console).
#[derive(Debug, Default)]
pub struct NoopDelivery;

impl NoopDelivery {
    pub fn new() -> Self {
        Self
    }
}

#[cfg_attr(target_arch = "wasm32", async_trait(?Send))]
#[cfg_attr(not(target_arch = "wasm32"), async_trait)]
impl CodeDelivery for NoopDelivery {
    async fn send(&self, _identity: &str, _code: &str) -> Result<(), CoreError> {
        Ok(())
    }
}

/// Delivery channel that records the most recent (identity, code) pair.
/// This is how demos and tests get at the code without a real mailbox.
#[derive(Debug, Default)]
pub struct CapturingDelivery {
    last: Mutex<Option<(String, String)>>,
}

impl CapturingDelivery {
    pub fn new() -> Self {
        Self::default()
    }

    /// The last delivered (identity, code) pair, if any.
    #[must_use]
    pub fn last_sent(&self) -> Option<(String, String)> {
        self.last.lock().ok().and_then(|l| l.clone())
    }

    /// Convenience: the last delivered code, regardless of identity.
    #[must_use]
    pub fn last_code(&self) -> Option<String> {
        self.last_sent().map(|(_, code)| code)
    }
}

#[cfg_attr(target_arch = "wasm32", async_trait(?Send))]
#[cfg_attr(not(target_arch = "wasm32"), async_trait)]
impl CodeDelivery for CapturingDelivery {
    async fn send(&self, identity: &str, code: &str) -> Result<(), CoreError> {
        let mut last = self
            .last
            .lock()
            .map_err(|e| CoreError::Api {
                provider: "CapturingDelivery".into(),
                message: e.to_string(),
            })?;
        *last = Some((identity.to_string(), code.to_string()));
        Ok(())
    }
}
