pub mod errors;
pub mod models;
pub mod services;
pub mod storage;

use std::sync::Arc;

use chrono::Utc;

use models::{
    allocation::Allocation,
    bucket::{Bucket, BucketSet},
    profile::Profile,
    session::{AuthState, Session},
};
use services::{
    allocation_service::AllocationService,
    auth_service::{self, AuthService},
    export_service::{ExportFile, ExportService},
};
use storage::memory::{InMemoryCodeStore, InMemoryProfileStore, NoopDelivery};
use storage::traits::{CodeDelivery, CodeStore, ProfileStore, SessionProvider};

use errors::CoreError;

/// Main entry point for the Profit Plan Allocator core library.
///
/// Owns the sign-in state machine, the live session, and the injected
/// persistence/delivery backends. Frontends drive it and render whatever
/// `state()` says; no rendering concern lives here.
#[must_use]
pub struct ProfitPlanner {
    state: AuthState,
    session: Option<Session>,
    profiles: Arc<dyn ProfileStore>,
    codes: Arc<dyn CodeStore>,
    delivery: Arc<dyn CodeDelivery>,
    allocation_service: AllocationService,
    export_service: ExportService,
    auth_service: AuthService,
    /// Tracks whether the bucket set was edited since the last save/load.
    dirty: bool,
}

impl std::fmt::Debug for ProfitPlanner {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("ProfitPlanner")
            .field("state", &self.state)
            .field("buckets", &self.session.as_ref().map(|s| s.buckets.len()))
            .field("profile_store", &self.profiles.name())
            .field("dirty", &self.dirty)
            .finish()
    }
}

impl ProfitPlanner {
    /// Build a planner on top of explicit backends. Share the same store
    /// instances across planners to simulate multiple page loads against
    /// one world.
    pub fn new(
        profiles: Arc<dyn ProfileStore>,
        codes: Arc<dyn CodeStore>,
        delivery: Arc<dyn CodeDelivery>,
    ) -> Self {
        Self {
            state: AuthState::AwaitingEmail,
            session: None,
            profiles,
            codes,
            delivery,
            allocation_service: AllocationService::new(),
            export_service: ExportService::new(),
            auth_service: AuthService::new(),
            dirty: false,
        }
    }

    /// A planner with in-memory stores and no delivery channel — the
    /// local-only demo configuration.
    pub fn new_local() -> Self {
        Self::new(
            Arc::new(InMemoryProfileStore::new()),
            Arc::new(InMemoryCodeStore::new()),
            Arc::new(NoopDelivery::new()),
        )
    }

    // ── Authentication ──────────────────────────────────────────────

    /// Current position in the sign-in state machine.
    #[must_use]
    pub fn state(&self) -> &AuthState {
        &self.state
    }

    /// The signed-in identity, if any.
    #[must_use]
    pub fn current_identity(&self) -> Option<&str> {
        self.state.identity()
    }

    /// Issue a one-time code for `email` and move to `CodeSent`.
    ///
    /// A repeat request for the same identity overwrites the previous
    /// code (last-write-wins). Rejects addresses without an `@`.
    pub async fn request_code(&mut self, email: &str) -> Result<(), CoreError> {
        let email = email.trim().to_string();
        self.auth_service
            .issue_code(self.codes.as_ref(), self.delivery.as_ref(), &email, Utc::now())
            .await?;
        self.retire_session().await;
        self.state = AuthState::CodeSent { email };
        Ok(())
    }

    /// Verify a submitted code and, on success, sign in.
    ///
    /// The profile load is awaited before the state flips to
    /// `Authenticated`; a missing or failing load falls back to the
    /// default bucket set instead of blocking sign-in. A first-time
    /// identity gets its default profile persisted immediately.
    pub async fn verify_code(&mut self, email: &str, submitted: &str) -> Result<(), CoreError> {
        let email = email.trim().to_string();

        match self
            .auth_service
            .verify_code(self.codes.as_ref(), &email, submitted, Utc::now())
            .await
        {
            Ok(()) => {
                // Retire any live session first so its unsaved bucket edits
                // are persisted before the identity switches.
                self.retire_session().await;
                let buckets = self.load_or_create_buckets(&email).await;
                self.session = Some(Session::new(email.clone(), buckets));
                self.state = AuthState::Authenticated { identity: email };
                self.dirty = false;
                Ok(())
            }
            Err(e @ CoreError::NoPendingCode { .. }) | Err(e @ CoreError::CodeExpired) => {
                self.retire_session().await;
                self.state = AuthState::AwaitingEmail;
                Err(e)
            }
            Err(e @ CoreError::CodeMismatch) => {
                // Pending code survives a mismatch; the user retries from CodeSent.
                self.retire_session().await;
                self.state = AuthState::CodeSent { email };
                Err(e)
            }
            Err(e) => Err(e),
        }
    }

    /// Handle a magic-link page load: if the query string carries both
    /// `email` and `code`, run the normal verification with them.
    ///
    /// Returns `Ok(false)` when the query has no link parameters — that's
    /// an ordinary visit, not a failed sign-in.
    pub async fn verify_magic_link(&mut self, query: &str) -> Result<bool, CoreError> {
        let Some(params) = auth_service::parse_magic_link(query) else {
            return Ok(false);
        };
        self.verify_code(&params.email, &params.code).await?;
        Ok(true)
    }

    /// Ask an external auth/session provider whether a user is already
    /// signed in, and adopt that identity if so.
    pub async fn resume(&mut self, provider: &dyn SessionProvider) -> Result<bool, CoreError> {
        let Some(identity) = provider.current_identity().await? else {
            return Ok(false);
        };
        self.retire_session().await;
        let buckets = self.load_or_create_buckets(&identity).await;
        self.session = Some(Session::new(identity.clone(), buckets));
        self.state = AuthState::Authenticated { identity };
        self.dirty = false;
        Ok(true)
    }

    /// Sign out: persist the session's bucket set first, then drop all
    /// session state. Unsaved allocation work (profit input, notes,
    /// computed allocations) is discarded by design.
    ///
    /// If the save fails the session is kept so the user can retry.
    pub async fn sign_out(&mut self) -> Result<(), CoreError> {
        if let Some(session) = &self.session {
            let profile = Profile::new(session.identity.clone(), session.buckets.clone());
            self.profiles.upsert(&profile).await?;
        }
        self.session = None;
        self.state = AuthState::AwaitingEmail;
        self.dirty = false;
        Ok(())
    }

    // ── Bucket Configuration ────────────────────────────────────────

    /// Buckets of the live session, in insertion order.
    pub fn buckets(&self) -> Result<&[Bucket], CoreError> {
        Ok(self.session()?.buckets.buckets())
    }

    /// Append a new placeholder bucket and return its id.
    pub fn add_bucket(&mut self) -> Result<u64, CoreError> {
        let id = self.session_mut()?.buckets.add();
        self.dirty = true;
        Ok(id)
    }

    /// Remove exactly one bucket. Removing the last one is allowed —
    /// an empty set just allocates to nothing.
    pub fn delete_bucket(&mut self, id: u64) -> Result<bool, CoreError> {
        let removed = self.session_mut()?.buckets.delete(id);
        if removed {
            self.dirty = true;
        }
        Ok(removed)
    }

    pub fn rename_bucket(&mut self, id: u64, name: impl Into<String>) -> Result<bool, CoreError> {
        let changed = self.session_mut()?.buckets.rename(id, name);
        if changed {
            self.dirty = true;
        }
        Ok(changed)
    }

    /// Set a bucket's percentage from raw text; invalid input coerces to 0.
    pub fn set_bucket_percentage_input(&mut self, id: u64, input: &str) -> Result<bool, CoreError> {
        let changed = self.session_mut()?.buckets.set_percentage_input(id, input);
        if changed {
            self.dirty = true;
        }
        Ok(changed)
    }

    pub fn set_bucket_percentage(&mut self, id: u64, percentage: f64) -> Result<bool, CoreError> {
        let changed = self.session_mut()?.buckets.set_percentage(id, percentage);
        if changed {
            self.dirty = true;
        }
        Ok(changed)
    }

    pub fn set_bucket_account(&mut self, id: u64, account: impl Into<String>) -> Result<bool, CoreError> {
        let changed = self.session_mut()?.buckets.set_account(id, account);
        if changed {
            self.dirty = true;
        }
        Ok(changed)
    }

    pub fn set_bucket_color_tag(&mut self, id: u64, color_tag: impl Into<String>) -> Result<bool, CoreError> {
        let changed = self.session_mut()?.buckets.set_color_tag(id, color_tag);
        if changed {
            self.dirty = true;
        }
        Ok(changed)
    }

    /// Sum of all bucket percentages.
    pub fn total_percentage(&self) -> Result<f64, CoreError> {
        Ok(self.session()?.buckets.total_percentage())
    }

    /// Persist the current bucket configuration for the signed-in
    /// identity (explicit save, as opposed to the implicit one on
    /// sign-out).
    pub async fn save_buckets(&mut self) -> Result<(), CoreError> {
        let session = self.session.as_ref().ok_or(CoreError::NotAuthenticated)?;
        let profile = Profile::new(session.identity.clone(), session.buckets.clone());
        self.profiles.upsert(&profile).await?;
        self.dirty = false;
        Ok(())
    }

    /// Returns `true` if bucket edits haven't been saved yet.
    #[must_use]
    pub fn has_unsaved_changes(&self) -> bool {
        self.dirty
    }

    // ── Profit & Notes ──────────────────────────────────────────────

    /// Record the raw profit input as typed. Not parsed until allocation;
    /// previously computed allocations go stale until recalculated.
    pub fn set_profit_input(&mut self, input: impl Into<String>) -> Result<(), CoreError> {
        self.session_mut()?.profit_input = input.into();
        Ok(())
    }

    pub fn profit_input(&self) -> Result<&str, CoreError> {
        Ok(&self.session()?.profit_input)
    }

    /// The profit input as a number; missing or invalid text is 0.
    pub fn profit_amount(&self) -> Result<f64, CoreError> {
        Ok(self.session()?.profit_amount())
    }

    /// Free-text memo attached to both exports.
    pub fn set_notes(&mut self, notes: impl Into<String>) -> Result<(), CoreError> {
        self.session_mut()?.notes = notes.into();
        Ok(())
    }

    pub fn notes(&self) -> Result<&str, CoreError> {
        Ok(&self.session()?.notes)
    }

    // ── Allocation ──────────────────────────────────────────────────

    /// Whether the calculate button should be live: percentages total
    /// exactly 100 and the profit field is non-empty.
    #[must_use]
    pub fn can_allocate(&self) -> bool {
        match &self.session {
            Some(s) => self.allocation_service.can_allocate(&s.buckets, &s.profit_input),
            None => false,
        }
    }

    /// Split the profit across the buckets and keep the result on the
    /// session. Recomputable at will; the engine itself never gates on
    /// the percentage total — that's `can_allocate`'s job.
    pub fn calculate_allocations(&mut self) -> Result<&[Allocation], CoreError> {
        let session = self.session.as_mut().ok_or(CoreError::NotAuthenticated)?;
        session.allocations = self
            .allocation_service
            .allocate(session.profit_amount(), session.buckets.buckets());
        Ok(&session.allocations)
    }

    /// The last computed allocation result.
    pub fn allocations(&self) -> Result<&[Allocation], CoreError> {
        Ok(&self.session()?.allocations)
    }

    // ── Export ──────────────────────────────────────────────────────

    /// Render the journal-entry CSV for today's date.
    /// Fails with `ExportPreconditionFailed` until allocations exist.
    pub fn export_journal_csv(&self) -> Result<ExportFile, CoreError> {
        let session = self.session()?;
        self.export_service.journal_entry_csv(
            &session.allocations,
            &session.notes,
            Utc::now().date_naive(),
        )
    }

    /// Render the plaintext report for today's date.
    /// Fails with `ExportPreconditionFailed` until allocations exist.
    pub fn export_report(&self) -> Result<ExportFile, CoreError> {
        let session = self.session()?;
        self.export_service.detailed_report(
            &session.allocations,
            session.profit_amount(),
            &session.identity,
            &session.notes,
            Utc::now().date_naive(),
        )
    }

    // ── Internal ────────────────────────────────────────────────────

    fn session(&self) -> Result<&Session, CoreError> {
        self.session.as_ref().ok_or(CoreError::NotAuthenticated)
    }

    /// Persist and drop the live session, if any. Runs on every
    /// transition out of `Authenticated` so the state machine and the
    /// session can never disagree. Save failures are logged, not
    /// surfaced: the caller triggered a sign-in transition, not a save.
    async fn retire_session(&mut self) {
        if let Some(session) = self.session.take() {
            let profile = Profile::new(session.identity.clone(), session.buckets);
            if let Err(e) = self.profiles.upsert(&profile).await {
                log::warn!(
                    "could not persist buckets for {} while retiring the session: {e}",
                    profile.identity
                );
            }
        }
        self.dirty = false;
    }

    fn session_mut(&mut self) -> Result<&mut Session, CoreError> {
        self.session.as_mut().ok_or(CoreError::NotAuthenticated)
    }

    /// Load the stored bucket set for `identity`, creating and persisting
    /// a default profile on first sign-in. Any load failure degrades to
    /// the default set rather than blocking authentication.
    async fn load_or_create_buckets(&self, identity: &str) -> BucketSet {
        match self.profiles.get(identity).await {
            Ok(Some(profile)) => profile.buckets,
            Ok(None) => {
                let profile = Profile::with_defaults(identity);
                if let Err(e) = self.profiles.upsert(&profile).await {
                    log::warn!("could not persist new profile for {identity}: {e}");
                }
                profile.buckets
            }
            Err(e) => {
                log::warn!("profile load for {identity} failed, using defaults: {e}");
                BucketSet::default_set()
            }
        }
    }
}
