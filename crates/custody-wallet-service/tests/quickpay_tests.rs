//! Quick-pay policy engine tests
//!
//! Covers limit enforcement, daily reset, allow-list checks, cancellation
//! and serialization of concurrent evaluations.

use chrono::{Duration as ChronoDuration, TimeZone, Utc};
use custody_storage::{
    AuthError, AuthGateway, DailySpent, MemoryStore, MockAuthMechanism, SecureStore,
};
use custody_wallet_service::{
    Clock, Decision, DenialReason, ManualClock, PolicyUpdate, QuickPayEngine, QuickPayPolicy,
};
use proptest::prelude::*;
use std::sync::Arc;
use std::time::Duration;

const POLICY_KEY: &str = "custody_wallet_test_quickpay";

struct Harness {
    engine: Arc<QuickPayEngine>,
    store: Arc<MemoryStore>,
    mechanism: Arc<MockAuthMechanism>,
    clock: Arc<ManualClock>,
}

impl Harness {
    async fn new(mechanism: MockAuthMechanism, update: PolicyUpdate) -> Self {
        let store = Arc::new(MemoryStore::new());
        Self::with_store(store, mechanism, update).await
    }

    async fn with_store(
        store: Arc<MemoryStore>,
        mechanism: MockAuthMechanism,
        update: PolicyUpdate,
    ) -> Self {
        let mechanism = Arc::new(mechanism);
        let gateway = Arc::new(
            AuthGateway::resolve(mechanism.clone(), None, Duration::from_secs(30)).await,
        );
        let clock = Arc::new(ManualClock::new(
            Utc.with_ymd_and_hms(2026, 6, 15, 9, 30, 0).unwrap(),
        ));
        let engine = QuickPayEngine::load(
            store.clone(),
            POLICY_KEY.to_string(),
            gateway,
            clock.clone(),
        )
        .await
        .unwrap();
        engine
            .update_policy(update.enabled(true).idle_timeout_ms(0))
            .await
            .unwrap();

        Self {
            engine: Arc::new(engine),
            store,
            mechanism,
            clock,
        }
    }

    async fn stored_policy(&self) -> QuickPayPolicy {
        let raw = self.store.get(POLICY_KEY).await.unwrap().unwrap();
        QuickPayPolicy::from_json(&raw).unwrap()
    }
}

// =============================================================================
// Limits
// =============================================================================

#[tokio::test]
async fn test_per_tx_limit() {
    let h = Harness::new(
        MockAuthMechanism::new(),
        PolicyUpdate::new().per_tx_limit(10_000_000),
    )
    .await;

    assert_eq!(
        h.engine.evaluate(15_000_000, None).await.unwrap(),
        Decision::RequireFullAuth(DenialReason::PerTxLimitExceeded)
    );
    assert_eq!(h.mechanism.prompt_count(), 0);

    assert_eq!(
        h.engine.evaluate(5_000_000, None).await.unwrap(),
        Decision::QuickApprove
    );
    assert_eq!(h.mechanism.prompt_count(), 1);
}

#[tokio::test]
async fn test_per_tx_limit_is_inclusive() {
    let h = Harness::new(MockAuthMechanism::new(), PolicyUpdate::new().per_tx_limit(100)).await;
    assert!(h.engine.evaluate(100, None).await.unwrap().is_quick_approve());
}

#[tokio::test]
async fn test_daily_cap() {
    let h = Harness::new(
        MockAuthMechanism::new(),
        PolicyUpdate::new()
            .per_tx_limit(10_000_000)
            .daily_cap(20_000_000),
    )
    .await;

    assert!(h.engine.evaluate(5_000_000, None).await.unwrap().is_quick_approve());
    assert_eq!(
        h.engine.evaluate(16_000_000, None).await.unwrap(),
        Decision::RequireFullAuth(DenialReason::PerTxLimitExceeded)
    );

    // Raise the per-tx limit so only the cap applies: 5M + 16M = 21M > 20M
    h.engine
        .update_policy(PolicyUpdate::new().per_tx_limit(0))
        .await
        .unwrap();
    assert_eq!(
        h.engine.evaluate(16_000_000, None).await.unwrap(),
        Decision::RequireFullAuth(DenialReason::DailyCapExceeded)
    );

    // Exactly reaching the cap is allowed
    assert!(h.engine.evaluate(15_000_000, None).await.unwrap().is_quick_approve());
    assert_eq!(h.engine.remaining_daily_allowance().await, Some(0));
    assert_eq!(h.stored_policy().await.daily_spent.amount, 20_000_000);
}

#[tokio::test]
async fn test_unlimited_when_zero() {
    let h = Harness::new(MockAuthMechanism::new(), PolicyUpdate::new()).await;
    assert!(h.engine.evaluate(u64::MAX / 2, None).await.unwrap().is_quick_approve());
    assert_eq!(h.engine.remaining_daily_allowance().await, None);
}

// =============================================================================
// Daily Reset
// =============================================================================

#[tokio::test]
async fn test_daily_reset_from_yesterday() {
    let store = Arc::new(MemoryStore::new());
    let today = Utc.with_ymd_and_hms(2026, 6, 15, 0, 0, 0).unwrap().date_naive();
    let yesterday = today - ChronoDuration::days(1);

    let seeded = QuickPayPolicy {
        enabled: true,
        daily_cap: 6_000_000,
        daily_spent: DailySpent {
            date: yesterday,
            amount: 5_000_000,
        },
        ..Default::default()
    };
    store.set(POLICY_KEY, &seeded.to_json().unwrap()).await.unwrap();

    let h = Harness::with_store(store, MockAuthMechanism::new(), PolicyUpdate::new()).await;
    assert_eq!(h.clock.today(), today);

    // Without the reset, 5M + 5M would exceed the 6M cap
    assert!(h.engine.evaluate(5_000_000, None).await.unwrap().is_quick_approve());

    let stored = h.stored_policy().await;
    assert_eq!(stored.daily_spent.date, today);
    assert_eq!(stored.daily_spent.amount, 5_000_000);
}

#[tokio::test]
async fn test_reset_applies_even_when_denied_later() {
    let h = Harness::new(MockAuthMechanism::new(), PolicyUpdate::new().per_tx_limit(10)).await;
    assert!(h.engine.evaluate(10, None).await.unwrap().is_quick_approve());

    h.clock.advance_days(1);
    assert_eq!(
        h.engine.evaluate(11, None).await.unwrap(),
        Decision::RequireFullAuth(DenialReason::PerTxLimitExceeded)
    );
    let stored = h.stored_policy().await;
    assert_eq!(stored.daily_spent.date, h.clock.today());
    assert_eq!(stored.daily_spent.amount, 0);
}

#[tokio::test]
async fn test_spend_accumulates_within_day() {
    let h = Harness::new(MockAuthMechanism::new(), PolicyUpdate::new().daily_cap(1_000)).await;
    for _ in 0..4 {
        assert!(h.engine.evaluate(250, None).await.unwrap().is_quick_approve());
        h.clock.advance_ms(60_000);
    }
    assert_eq!(
        h.engine.evaluate(1, None).await.unwrap(),
        Decision::RequireFullAuth(DenialReason::DailyCapExceeded)
    );
}

// =============================================================================
// Allow-list
// =============================================================================

#[tokio::test]
async fn test_whitelist() {
    let h = Harness::new(
        MockAuthMechanism::new(),
        PolicyUpdate::new().whitelist(["addrA"]),
    )
    .await;

    assert_eq!(
        h.engine.evaluate(1_000_000, Some("addrB")).await.unwrap(),
        Decision::RequireFullAuth(DenialReason::RecipientNotWhitelisted)
    );
    assert_eq!(
        h.engine.evaluate(1_000_000, Some("addrA")).await.unwrap(),
        Decision::QuickApprove
    );
    // No recipient supplied: the allow-list does not apply
    assert!(h.engine.evaluate(1_000_000, None).await.unwrap().is_quick_approve());
}

#[tokio::test]
async fn test_whitelist_checked_before_limits() {
    let h = Harness::new(
        MockAuthMechanism::new(),
        PolicyUpdate::new().whitelist(["addrA"]).per_tx_limit(1),
    )
    .await;
    assert_eq!(
        h.engine.evaluate(5, Some("addrB")).await.unwrap(),
        Decision::RequireFullAuth(DenialReason::RecipientNotWhitelisted)
    );
}

// =============================================================================
// Authentication Outcomes
// =============================================================================

#[tokio::test]
async fn test_cancellation_leaves_spend_untouched() {
    let h = Harness::new(MockAuthMechanism::new(), PolicyUpdate::new().daily_cap(10_000)).await;
    assert!(h.engine.evaluate(1_000, None).await.unwrap().is_quick_approve());
    let before = h.stored_policy().await;

    h.mechanism.push_outcome(Err(AuthError::Cancelled));
    assert_eq!(
        h.engine.evaluate(2_000, None).await.unwrap(),
        Decision::RequireFullAuth(DenialReason::BiometricFailed)
    );

    assert_eq!(h.stored_policy().await, before);
    assert_eq!(h.engine.policy().await.daily_spent.amount, 1_000);
}

#[tokio::test]
async fn test_hardware_fault_is_biometric_failure() {
    let h = Harness::new(
        MockAuthMechanism::new().with_default(Err(AuthError::HardwareFault("sensor".into()))),
        PolicyUpdate::new(),
    )
    .await;
    assert_eq!(
        h.engine.evaluate(1, None).await.unwrap(),
        Decision::RequireFullAuth(DenialReason::BiometricFailed)
    );
    assert_eq!(h.engine.policy().await.daily_spent.amount, 0);
}

#[tokio::test(start_paused = true)]
async fn test_prompt_timeout_behaves_like_cancel() {
    let h = Harness::new(
        MockAuthMechanism::new().with_delay(Duration::from_secs(300)),
        PolicyUpdate::new(),
    )
    .await;
    assert_eq!(
        h.engine.evaluate(1, None).await.unwrap(),
        Decision::RequireFullAuth(DenialReason::BiometricFailed)
    );
    assert_eq!(h.engine.policy().await.daily_spent.amount, 0);
}

#[tokio::test]
async fn test_failed_prompt_does_not_open_session() {
    let h = Harness::new(MockAuthMechanism::new(), PolicyUpdate::new()).await;
    h.engine
        .update_policy(PolicyUpdate::new().idle_timeout_ms(60_000))
        .await
        .unwrap();

    h.mechanism.push_outcome(Err(AuthError::Cancelled));
    h.engine.evaluate(1, None).await.unwrap();
    assert_eq!(h.engine.session().last_auth_at_ms, 0);

    h.engine.evaluate(1, None).await.unwrap();
    assert_eq!(h.engine.session().last_auth_at_ms, h.clock.now_ms());
}

// =============================================================================
// Policy State
// =============================================================================

#[tokio::test]
async fn test_update_policy_merges() {
    let h = Harness::new(
        MockAuthMechanism::new(),
        PolicyUpdate::new().per_tx_limit(10).daily_cap(100),
    )
    .await;

    let updated = h
        .engine
        .update_policy(PolicyUpdate::new().hold_to_confirm(false))
        .await
        .unwrap();
    assert_eq!(updated.per_tx_limit, 10);
    assert_eq!(updated.daily_cap, 100);
    assert!(!updated.hold_to_confirm);
    assert!(!h.engine.hold_to_confirm().await);
    assert_eq!(h.stored_policy().await, updated);
}

#[tokio::test]
async fn test_enable_disable_persist() {
    let h = Harness::new(MockAuthMechanism::new(), PolicyUpdate::new()).await;
    h.engine.disable().await.unwrap();
    assert!(!h.engine.is_enabled().await);
    assert!(!h.stored_policy().await.enabled);

    h.engine.enable().await.unwrap();
    assert!(h.stored_policy().await.enabled);
}

#[tokio::test]
async fn test_concurrent_evaluations_are_serialized() {
    let h = Harness::new(
        MockAuthMechanism::new().with_delay(Duration::from_millis(5)),
        PolicyUpdate::new().daily_cap(20_000_000),
    )
    .await;

    let mut handles = Vec::new();
    for _ in 0..10 {
        let engine = h.engine.clone();
        handles.push(tokio::spawn(async move {
            engine.evaluate(3_000_000, None).await.unwrap()
        }));
    }

    let mut approved = 0;
    for handle in handles {
        if handle.await.unwrap().is_quick_approve() {
            approved += 1;
        }
    }

    assert_eq!(approved, 6);
    assert_eq!(h.stored_policy().await.daily_spent.amount, 18_000_000);
}

// =============================================================================
// Properties
// =============================================================================

proptest! {
    #![proptest_config(ProptestConfig::with_cases(64))]

    #[test]
    fn prop_quick_pay_never_exceeds_limits(
        per_tx in 0u64..5_000,
        cap in 0u64..20_000,
        amounts in prop::collection::vec(0u64..8_000, 1..20),
    ) {
        let rt = tokio::runtime::Builder::new_current_thread()
            .enable_all()
            .build()
            .unwrap();

        rt.block_on(async {
            let h = Harness::new(
                MockAuthMechanism::new(),
                PolicyUpdate::new().per_tx_limit(per_tx).daily_cap(cap),
            )
            .await;

            let mut expected = 0u64;
            for amount in amounts {
                let decision = h.engine.evaluate(amount, None).await.unwrap();
                if decision.is_quick_approve() {
                    assert!(per_tx == 0 || amount <= per_tx);
                    expected += amount;
                }
            }

            let spent = h.engine.policy().await.daily_spent.amount;
            assert_eq!(spent, expected);
            assert!(cap == 0 || spent <= cap);
        });
    }
}
