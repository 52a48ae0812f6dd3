// ═══════════════════════════════════════════════════════════════════
// Auth Tests — one-time code lifecycle, state machine transitions,
// magic links, sign-out persistence, ProfitPlanner facade flow
// ═══════════════════════════════════════════════════════════════════

use std::sync::Arc;

use chrono::{Duration, Utc};

use profit_plan_core::errors::CoreError;
use profit_plan_core::models::profile::Profile;
use profit_plan_core::models::session::AuthState;
use profit_plan_core::services::auth_service::{parse_magic_link, AuthService};
use profit_plan_core::storage::memory::{
    CapturingDelivery, InMemoryCodeStore, InMemoryProfileStore,
};
use profit_plan_core::storage::traits::{CodeStore, ProfileStore, SessionProvider};
use profit_plan_core::ProfitPlanner;

/// A shared world: one profile store, one code store, one capture buffer.
struct World {
    profiles: Arc<InMemoryProfileStore>,
    codes: Arc<InMemoryCodeStore>,
    delivery: Arc<CapturingDelivery>,
}

impl World {
    fn new() -> Self {
        Self {
            profiles: Arc::new(InMemoryProfileStore::new()),
            codes: Arc::new(InMemoryCodeStore::new()),
            delivery: Arc::new(CapturingDelivery::new()),
        }
    }

    fn planner(&self) -> ProfitPlanner {
        ProfitPlanner::new(
            self.profiles.clone(),
            self.codes.clone(),
            self.delivery.clone(),
        )
    }
}

async fn sign_in(planner: &mut ProfitPlanner, world: &World, email: &str) {
    planner.request_code(email).await.unwrap();
    let code = world.delivery.last_code().unwrap();
    planner.verify_code(email, &code).await.unwrap();
}

// ── Code issue ──────────────────────────────────────────────────────

#[tokio::test]
async fn request_code_rejects_email_without_at_sign() {
    let world = World::new();
    let mut planner = world.planner();

    let err = planner.request_code("not-an-email").await.unwrap_err();
    assert!(matches!(err, CoreError::InvalidEmail(_)));
    assert_eq!(*planner.state(), AuthState::AwaitingEmail);
}

#[tokio::test]
async fn request_code_transitions_to_code_sent() {
    let world = World::new();
    let mut planner = world.planner();

    planner.request_code("me@example.com").await.unwrap();
    assert_eq!(
        *planner.state(),
        AuthState::CodeSent { email: "me@example.com".into() }
    );
}

#[tokio::test]
async fn issued_code_is_six_decimal_digits() {
    let world = World::new();
    let mut planner = world.planner();

    for _ in 0..20 {
        planner.request_code("me@example.com").await.unwrap();
        let code = world.delivery.last_code().unwrap();
        assert_eq!(code.len(), 6);
        assert!(code.chars().all(|c| c.is_ascii_digit()));
        assert!(code.parse::<u32>().unwrap() >= 100_000);
    }
}

#[tokio::test]
async fn delivery_failure_is_not_fatal() {
    struct FailingDelivery;

    #[async_trait::async_trait]
    impl profit_plan_core::storage::traits::CodeDelivery for FailingDelivery {
        async fn send(&self, _identity: &str, _code: &str) -> Result<(), CoreError> {
            Err(CoreError::Network("smtp down".into()))
        }
    }

    let codes = Arc::new(InMemoryCodeStore::new());
    let mut planner = ProfitPlanner::new(
        Arc::new(InMemoryProfileStore::new()),
        codes.clone(),
        Arc::new(FailingDelivery),
    );

    planner.request_code("me@example.com").await.unwrap();
    assert!(planner.state().clone() == AuthState::CodeSent { email: "me@example.com".into() });
    // The code is stored and verifiable even though delivery failed
    assert!(codes.get("me@example.com").await.unwrap().is_some());
}

// ── Code verification ───────────────────────────────────────────────

#[tokio::test]
async fn correct_code_authenticates_and_creates_default_profile() {
    let world = World::new();
    let mut planner = world.planner();

    sign_in(&mut planner, &world, "new@example.com").await;

    assert_eq!(
        *planner.state(),
        AuthState::Authenticated { identity: "new@example.com".into() }
    );
    let names: Vec<&str> = planner
        .buckets()
        .unwrap()
        .iter()
        .map(|b| b.name.as_str())
        .collect();
    assert_eq!(names, ["Your Bonus", "Taxes", "Savings", "Reinvestment"]);

    // First sign-in persisted the default profile
    let stored = world.profiles.get("new@example.com").await.unwrap().unwrap();
    assert_eq!(stored.buckets.total_percentage(), 100.0);
}

#[tokio::test]
async fn verify_without_pending_code_fails_and_resets() {
    let world = World::new();
    let mut planner = world.planner();

    let err = planner.verify_code("me@example.com", "123456").await.unwrap_err();
    assert!(matches!(err, CoreError::NoPendingCode { .. }));
    assert_eq!(*planner.state(), AuthState::AwaitingEmail);
}

#[tokio::test]
async fn wrong_code_keeps_pending_code_for_retry() {
    let world = World::new();
    let mut planner = world.planner();

    planner.request_code("me@example.com").await.unwrap();
    let code = world.delivery.last_code().unwrap();
    let wrong = if code == "111111" { "222222" } else { "111111" };

    let err = planner.verify_code("me@example.com", wrong).await.unwrap_err();
    assert!(matches!(err, CoreError::CodeMismatch));
    assert_eq!(
        *planner.state(),
        AuthState::CodeSent { email: "me@example.com".into() }
    );

    // Retry with the right code still works
    planner.verify_code("me@example.com", &code).await.unwrap();
    assert!(planner.state().is_authenticated());
}

#[tokio::test]
async fn used_code_cannot_verify_twice() {
    let world = World::new();
    let mut planner = world.planner();
    sign_in(&mut planner, &world, "me@example.com").await;

    let code = world.delivery.last_code().unwrap();
    let mut second = world.planner();
    let err = second.verify_code("me@example.com", &code).await.unwrap_err();
    assert!(matches!(err, CoreError::NoPendingCode { .. }));
}

#[tokio::test]
async fn new_request_invalidates_previous_code() {
    let world = World::new();
    let mut planner = world.planner();

    planner.request_code("me@example.com").await.unwrap();
    let old_code = world.delivery.last_code().unwrap();

    planner.request_code("me@example.com").await.unwrap();
    let new_code = world.delivery.last_code().unwrap();

    if old_code != new_code {
        let err = planner.verify_code("me@example.com", &old_code).await.unwrap_err();
        assert!(matches!(err, CoreError::CodeMismatch));
    }
    planner.verify_code("me@example.com", &new_code).await.unwrap();
    assert!(planner.state().is_authenticated());
}

#[tokio::test]
async fn expired_code_fails_and_is_deleted() {
    let codes = InMemoryCodeStore::new();
    let delivery = CapturingDelivery::new();
    let service = AuthService::new();

    let issued_at = Utc::now();
    service
        .issue_code(&codes, &delivery, "me@example.com", issued_at)
        .await
        .unwrap();
    let code = delivery.last_code().unwrap();

    // 16 minutes later — one past the 15-minute window
    let later = issued_at + Duration::minutes(16);
    let err = service
        .verify_code(&codes, "me@example.com", &code, later)
        .await
        .unwrap_err();
    assert!(matches!(err, CoreError::CodeExpired));

    // Expiry detection consumed the pending record
    assert!(codes.get("me@example.com").await.unwrap().is_none());
}

#[tokio::test]
async fn code_at_exact_expiry_boundary_still_verifies() {
    let codes = InMemoryCodeStore::new();
    let delivery = CapturingDelivery::new();
    let service = AuthService::new();

    let issued_at = Utc::now();
    service
        .issue_code(&codes, &delivery, "me@example.com", issued_at)
        .await
        .unwrap();
    let code = delivery.last_code().unwrap();

    let boundary = issued_at + Duration::minutes(15);
    service
        .verify_code(&codes, "me@example.com", &code, boundary)
        .await
        .unwrap();
}

// ── Magic links ─────────────────────────────────────────────────────

#[test]
fn parse_magic_link_decodes_email() {
    let params = parse_magic_link("?code=123456&email=me%40example.com").unwrap();
    assert_eq!(params.email, "me@example.com");
    assert_eq!(params.code, "123456");
}

#[test]
fn parse_magic_link_requires_both_params() {
    assert!(parse_magic_link("code=123456").is_none());
    assert!(parse_magic_link("email=me%40example.com").is_none());
    assert!(parse_magic_link("").is_none());
    assert!(parse_magic_link("utm_source=email").is_none());
}

#[tokio::test]
async fn magic_link_signs_in_with_the_usual_contract() {
    let world = World::new();
    let mut planner = world.planner();

    planner.request_code("me@example.com").await.unwrap();
    let code = world.delivery.last_code().unwrap();

    let query = format!("?code={code}&email=me%40example.com");
    let handled = planner.verify_magic_link(&query).await.unwrap();
    assert!(handled);
    assert!(planner.state().is_authenticated());
}

#[tokio::test]
async fn plain_page_load_is_not_a_sign_in_attempt() {
    let world = World::new();
    let mut planner = world.planner();

    let handled = planner.verify_magic_link("?tab=settings").await.unwrap();
    assert!(!handled);
    assert_eq!(*planner.state(), AuthState::AwaitingEmail);
}

// ── Sign-out & persistence round trip ───────────────────────────────

#[tokio::test]
async fn sign_out_persists_buckets_and_clears_session() {
    let world = World::new();
    let mut planner = world.planner();
    sign_in(&mut planner, &world, "me@example.com").await;

    let id = planner.add_bucket().unwrap();
    planner.rename_bucket(id, "Emergency Fund").unwrap();
    planner.set_profit_input("5000").unwrap();
    planner.sign_out().await.unwrap();

    assert_eq!(*planner.state(), AuthState::AwaitingEmail);
    assert!(planner.buckets().is_err());

    // A fresh planner over the same stores sees the saved configuration
    let mut second = world.planner();
    sign_in(&mut second, &world, "me@example.com").await;
    let names: Vec<&str> = second
        .buckets()
        .unwrap()
        .iter()
        .map(|b| b.name.as_str())
        .collect();
    assert!(names.contains(&"Emergency Fund"));
    // ...but not the unsaved allocation work
    assert_eq!(second.profit_input().unwrap(), "");
}

#[tokio::test]
async fn resume_adopts_identity_from_session_provider() {
    struct FixedSession(Option<String>);

    #[async_trait::async_trait]
    impl SessionProvider for FixedSession {
        async fn current_identity(&self) -> Result<Option<String>, CoreError> {
            Ok(self.0.clone())
        }
    }

    let world = World::new();
    let mut planner = world.planner();

    let resumed = planner
        .resume(&FixedSession(Some("back@example.com".into())))
        .await
        .unwrap();
    assert!(resumed);
    assert_eq!(planner.current_identity(), Some("back@example.com"));

    let mut other = world.planner();
    assert!(!other.resume(&FixedSession(None)).await.unwrap());
    assert_eq!(*other.state(), AuthState::AwaitingEmail);
}

// ── Session retirement ──────────────────────────────────────────────

#[tokio::test]
async fn failed_verify_while_signed_in_drops_the_session() {
    let world = World::new();
    let mut planner = world.planner();
    sign_in(&mut planner, &world, "me@example.com").await;

    let err = planner
        .verify_code("other@example.com", "000000")
        .await
        .unwrap_err();
    assert!(matches!(err, CoreError::NoPendingCode { .. }));
    assert_eq!(*planner.state(), AuthState::AwaitingEmail);

    // Once the state machine leaves Authenticated, no session data
    // stays reachable
    assert!(planner.buckets().is_err());
    assert!(planner.calculate_allocations().is_err());
    assert!(planner.export_journal_csv().is_err());
}

#[tokio::test]
async fn requesting_a_code_while_signed_in_saves_bucket_edits() {
    let world = World::new();
    let mut planner = world.planner();
    sign_in(&mut planner, &world, "me@example.com").await;

    let id = planner.add_bucket().unwrap();
    planner.rename_bucket(id, "Emergency Fund").unwrap();

    planner.request_code("me@example.com").await.unwrap();
    assert_eq!(
        *planner.state(),
        AuthState::CodeSent { email: "me@example.com".into() }
    );
    assert!(planner.buckets().is_err());
    assert!(!planner.has_unsaved_changes());

    // The edits made it to the store before the session went away
    let stored = world.profiles.get("me@example.com").await.unwrap().unwrap();
    assert!(stored.buckets.buckets().iter().any(|b| b.name == "Emergency Fund"));

    // ...and the next sign-in sees them again
    let code = world.delivery.last_code().unwrap();
    planner.verify_code("me@example.com", &code).await.unwrap();
    assert!(planner.buckets().unwrap().iter().any(|b| b.name == "Emergency Fund"));
}

#[tokio::test]
async fn signing_in_as_someone_else_saves_the_previous_identity() {
    let world = World::new();
    let mut planner = world.planner();
    sign_in(&mut planner, &world, "first@example.com").await;

    let id = planner.add_bucket().unwrap();
    planner.rename_bucket(id, "Charity").unwrap();

    // Issue a code for the second identity directly against the shared
    // store, so the planner stays signed in as the first one
    AuthService::new()
        .issue_code(
            world.codes.as_ref(),
            world.delivery.as_ref(),
            "second@example.com",
            Utc::now(),
        )
        .await
        .unwrap();
    let code = world.delivery.last_code().unwrap();

    planner.verify_code("second@example.com", &code).await.unwrap();
    assert_eq!(planner.current_identity(), Some("second@example.com"));

    // The second identity starts from the defaults, not the first one's set
    assert_eq!(planner.buckets().unwrap().len(), 4);

    // The first identity's edits were persisted on the way out
    let stored = world.profiles.get("first@example.com").await.unwrap().unwrap();
    assert!(stored.buckets.buckets().iter().any(|b| b.name == "Charity"));
}

#[tokio::test]
async fn profile_store_failure_still_signs_in_with_defaults() {
    struct BrokenStore;

    #[async_trait::async_trait]
    impl profit_plan_core::storage::traits::ProfileStore for BrokenStore {
        fn name(&self) -> &str {
            "Broken"
        }

        async fn get(&self, _identity: &str) -> Result<Option<Profile>, CoreError> {
            Err(CoreError::ProfileLoadFailed("backend offline".into()))
        }

        async fn upsert(&self, _profile: &Profile) -> Result<(), CoreError> {
            Err(CoreError::ProfileSaveFailed("backend offline".into()))
        }
    }

    let delivery = Arc::new(CapturingDelivery::new());
    let mut planner = ProfitPlanner::new(
        Arc::new(BrokenStore),
        Arc::new(InMemoryCodeStore::new()),
        delivery.clone(),
    );

    planner.request_code("me@example.com").await.unwrap();
    let code = delivery.last_code().unwrap();
    planner.verify_code("me@example.com", &code).await.unwrap();

    assert!(planner.state().is_authenticated());
    let names: Vec<&str> = planner
        .buckets()
        .unwrap()
        .iter()
        .map(|b| b.name.as_str())
        .collect();
    assert_eq!(names, ["Your Bonus", "Taxes", "Savings", "Reinvestment"]);
    assert_eq!(planner.total_percentage().unwrap(), 100.0);
}

// ── Facade end-to-end ───────────────────────────────────────────────

#[tokio::test]
async fn full_flow_from_sign_in_to_export() {
    let world = World::new();
    let mut planner = world.planner();
    sign_in(&mut planner, &world, "owner@shop.com").await;

    planner.set_profit_input("5000").unwrap();
    planner.set_notes("Q1 profit split").unwrap();
    assert!(planner.can_allocate());

    let allocations = planner.calculate_allocations().unwrap().to_vec();
    assert_eq!(allocations.len(), 4);
    assert!((allocations[0].amount - 2000.0).abs() < 1e-9);

    let csv = planner.export_journal_csv().unwrap();
    assert!(csv.contents.contains("Operating Account,,5000.00"));
    assert!(csv.contents.contains("\"Q1 profit split - Taxes\""));

    let report = planner.export_report().unwrap();
    assert!(report.contents.contains("User: owner@shop.com"));
    assert!(report.contents.contains("Notes: Q1 profit split"));
}

#[tokio::test]
async fn export_before_calculation_fails_cleanly() {
    let world = World::new();
    let mut planner = world.planner();
    sign_in(&mut planner, &world, "owner@shop.com").await;

    let err = planner.export_journal_csv().unwrap_err();
    assert!(matches!(err, CoreError::ExportPreconditionFailed));
    let err = planner.export_report().unwrap_err();
    assert!(matches!(err, CoreError::ExportPreconditionFailed));
}

#[tokio::test]
async fn local_planner_starts_awaiting_email() {
    let mut planner = ProfitPlanner::new_local();
    assert_eq!(*planner.state(), AuthState::AwaitingEmail);

    let err = planner.request_code("nope").await.unwrap_err();
    assert!(matches!(err, CoreError::InvalidEmail(_)));

    planner.request_code("me@example.com").await.unwrap();
    assert_eq!(
        *planner.state(),
        AuthState::CodeSent { email: "me@example.com".into() }
    );
}
