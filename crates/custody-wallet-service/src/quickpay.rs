//! Quick-pay policy engine
//!
//! Decides per outgoing payment whether a lightweight authentication prompt
//! is enough or the caller must run full authentication and explicit
//! confirmation.
//!
//! Every operation takes the engine lock for its whole duration, including
//! the authentication prompt, so rapid concurrent requests cannot both spend
//! against the same remaining allowance. The policy is persisted after every
//! mutation; a failed write leaves the in-memory policy unchanged.

use crate::clock::Clock;
use crate::{Error, Result};
use custody_storage::{
    load_json, save_json, AuthGateway, PolicyUpdate, QuickPayPolicy, SecureStore,
};
use std::fmt;
use std::sync::Arc;
use tokio::sync::Mutex;
use tracing::{debug, info, warn};

const QUICK_PAY_REASON: &str = "Confirm payment";

/// Outcome of evaluating a payment
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum Decision {
    /// Lightweight authentication passed; the payment may proceed
    QuickApprove,
    /// Caller must run full authentication plus explicit confirmation
    RequireFullAuth(DenialReason),
}

impl Decision {
    /// Check if the fast path was granted
    pub fn is_quick_approve(&self) -> bool {
        matches!(self, Decision::QuickApprove)
    }

    /// Reason the fast path was denied
    pub fn denial_reason(&self) -> Option<DenialReason> {
        match self {
            Decision::QuickApprove => None,
            Decision::RequireFullAuth(reason) => Some(*reason),
        }
    }
}

/// Why the fast path was denied
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum DenialReason {
    /// Quick pay is turned off
    PolicyDisabled,
    /// Recipient is not on the allow-list
    RecipientNotWhitelisted,
    /// Amount exceeds the per-payment limit
    PerTxLimitExceeded,
    /// Amount would push today's total over the daily cap
    DailyCapExceeded,
    /// Lightweight prompt was cancelled, timed out or failed
    BiometricFailed,
}

impl DenialReason {
    /// Get user-friendly message
    pub fn user_message(&self) -> &'static str {
        match self {
            DenialReason::PolicyDisabled => "Quick pay is turned off.",
            DenialReason::RecipientNotWhitelisted => {
                "This recipient is not on your quick pay list."
            }
            DenialReason::PerTxLimitExceeded => "This amount is above your quick pay limit.",
            DenialReason::DailyCapExceeded => "This payment would exceed your daily quick pay limit.",
            DenialReason::BiometricFailed => "Quick authentication did not complete.",
        }
    }
}

impl fmt::Display for DenialReason {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            DenialReason::PolicyDisabled => write!(f, "PolicyDisabled"),
            DenialReason::RecipientNotWhitelisted => write!(f, "RecipientNotWhitelisted"),
            DenialReason::PerTxLimitExceeded => write!(f, "PerTxLimitExceeded"),
            DenialReason::DailyCapExceeded => write!(f, "DailyCapExceeded"),
            DenialReason::BiometricFailed => write!(f, "BiometricFailed"),
        }
    }
}

/// In-memory authentication session (never persisted)
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq)]
pub struct AuthSession {
    /// Time of the last successful authentication, 0 if none
    pub last_auth_at_ms: u64,
}

impl AuthSession {
    /// Check if a prior authentication can be reused at `now_ms`
    pub fn is_fresh(&self, now_ms: u64, idle_timeout_ms: u64) -> bool {
        self.last_auth_at_ms != 0
            && now_ms >= self.last_auth_at_ms
            && now_ms - self.last_auth_at_ms < idle_timeout_ms
    }

    /// Record a successful authentication
    pub fn record(&mut self, now_ms: u64) {
        self.last_auth_at_ms = now_ms;
    }

    /// Forget the last authentication
    pub fn clear(&mut self) {
        self.last_auth_at_ms = 0;
    }
}

/// Quick-pay policy engine for one wallet
pub struct QuickPayEngine {
    store: Arc<dyn SecureStore>,
    key: String,
    gateway: Arc<AuthGateway>,
    clock: Arc<dyn Clock>,
    policy: Mutex<QuickPayPolicy>,
    session: parking_lot::Mutex<AuthSession>,
}

#[allow(dead_code)]
fn _assert_quick_pay_engine_send_sync() {
    fn assert_send_sync<T: Send + Sync>() {}
    assert_send_sync::<QuickPayEngine>();
}

impl QuickPayEngine {
    /// Load the persisted policy (or defaults) stored under `key`
    pub async fn load(
        store: Arc<dyn SecureStore>,
        key: String,
        gateway: Arc<AuthGateway>,
        clock: Arc<dyn Clock>,
    ) -> Result<Self> {
        let policy = load_json::<QuickPayPolicy>(store.as_ref(), &key)
            .await?
            .unwrap_or_default();
        debug!("Loaded quick pay policy (enabled={})", policy.enabled);

        Ok(Self {
            store,
            key,
            gateway,
            clock,
            policy: Mutex::new(policy),
            session: parking_lot::Mutex::new(AuthSession::default()),
        })
    }

    /// Evaluate an outgoing payment
    ///
    /// `RequireFullAuth` is a normal outcome, not an error. Spend is only
    /// recorded on `QuickApprove`.
    pub async fn evaluate(&self, amount: u64, recipient: Option<&str>) -> Result<Decision> {
        let mut policy = self.policy.lock().await;

        if !policy.enabled {
            return Ok(deny(DenialReason::PolicyDisabled));
        }

        let today = self.clock.today();
        if policy.daily_spent.date != today {
            let mut next = policy.clone();
            next.roll_over(today);
            self.persist(&next).await?;
            *policy = next;
            debug!("Daily quick pay counter reset for {}", today);
        }

        if let Some(recipient) = recipient {
            if !policy.allows_recipient(recipient) {
                return Ok(deny(DenialReason::RecipientNotWhitelisted));
            }
        }

        if policy.per_tx_limit != 0 && amount > policy.per_tx_limit {
            return Ok(deny(DenialReason::PerTxLimitExceeded));
        }

        let new_total = policy.daily_spent.amount.checked_add(amount);
        if policy.daily_cap != 0 && new_total.map_or(true, |total| total > policy.daily_cap) {
            warn!("Quick pay daily cap reached");
            return Ok(deny(DenialReason::DailyCapExceeded));
        }
        let new_total = new_total.ok_or(Error::AmountOverflow)?;

        let now_ms = self.clock.now_ms();
        if self.session.lock().is_fresh(now_ms, policy.idle_timeout_ms) {
            debug!("Reusing recent authentication");
        } else {
            if let Err(e) = self.gateway.prompt(QUICK_PAY_REASON).await {
                if e.is_expected_user_action() {
                    debug!("Quick pay prompt cancelled");
                } else {
                    warn!("Quick pay prompt failed: {}", e);
                }
                return Ok(deny(DenialReason::BiometricFailed));
            }
            self.session.lock().record(self.clock.now_ms());
        }

        let mut next = policy.clone();
        next.daily_spent.amount = new_total;
        self.persist(&next).await?;
        *policy = next;

        info!("Quick pay approved");
        Ok(Decision::QuickApprove)
    }

    /// Merge a partial update and persist
    pub async fn update_policy(&self, update: PolicyUpdate) -> Result<QuickPayPolicy> {
        let mut policy = self.policy.lock().await;
        let mut next = policy.clone();
        next.apply(update);
        self.persist(&next).await?;
        *policy = next.clone();

        info!(
            "Quick pay policy updated (enabled={}, whitelist={})",
            next.enabled,
            next.whitelist.len()
        );
        Ok(next)
    }

    /// Turn the fast path on
    pub async fn enable(&self) -> Result<()> {
        self.update_policy(PolicyUpdate::new().enabled(true)).await?;
        Ok(())
    }

    /// Turn the fast path off
    pub async fn disable(&self) -> Result<()> {
        self.update_policy(PolicyUpdate::new().enabled(false)).await?;
        Ok(())
    }

    /// Check if the fast path is on
    pub async fn is_enabled(&self) -> bool {
        self.policy.lock().await.enabled
    }

    /// Whether the caller should require a hold gesture on quick approvals
    pub async fn hold_to_confirm(&self) -> bool {
        self.policy.lock().await.hold_to_confirm
    }

    /// Snapshot of the current policy
    pub async fn policy(&self) -> QuickPayPolicy {
        self.policy.lock().await.clone()
    }

    /// Remaining quick-pay allowance today (`None` = unlimited)
    pub async fn remaining_daily_allowance(&self) -> Option<u64> {
        let today = self.clock.today();
        self.policy.lock().await.remaining_daily_allowance(today)
    }

    /// Add a recipient to the allow-list
    pub async fn add_to_whitelist(&self, address: &str) -> Result<bool> {
        self.mutate(|policy| policy.add_to_whitelist(address)).await
    }

    /// Remove a recipient from the allow-list
    pub async fn remove_from_whitelist(&self, address: &str) -> Result<bool> {
        self.mutate(|policy| policy.remove_from_whitelist(address)).await
    }

    /// Count a payment approved through the full path toward today's total
    ///
    /// The daily cap is not enforced here; the user has fully authenticated.
    pub async fn record_full_auth_payment(&self, amount: u64) -> Result<()> {
        let today = self.clock.today();
        let mut policy = self.policy.lock().await;
        let mut next = policy.clone();
        next.roll_over(today);
        next.daily_spent.amount = next
            .daily_spent
            .amount
            .checked_add(amount)
            .ok_or(Error::AmountOverflow)?;
        self.persist(&next).await?;
        *policy = next;
        debug!("Recorded full-auth payment toward daily total");
        Ok(())
    }

    /// Current session
    pub fn session(&self) -> AuthSession {
        *self.session.lock()
    }

    /// Record an authentication performed elsewhere (e.g. a full unlock)
    pub fn note_authenticated(&self) {
        self.session.lock().record(self.clock.now_ms());
    }

    /// Forget the last authentication so the next payment prompts again
    pub fn invalidate_session(&self) {
        self.session.lock().clear();
        debug!("Quick pay session invalidated");
    }

    /// Drop persisted state and return to defaults
    pub async fn reset(&self) -> Result<()> {
        let mut policy = self.policy.lock().await;
        self.store.delete(&self.key).await?;
        *policy = QuickPayPolicy::default();
        self.invalidate_session();
        Ok(())
    }

    async fn mutate<T>(&self, f: impl FnOnce(&mut QuickPayPolicy) -> T) -> Result<T> {
        let mut policy = self.policy.lock().await;
        let mut next = policy.clone();
        let out = f(&mut next);
        if next != *policy {
            self.persist(&next).await?;
            *policy = next;
        }
        Ok(out)
    }

    async fn persist(&self, policy: &QuickPayPolicy) -> Result<()> {
        save_json(self.store.as_ref(), &self.key, policy).await?;
        Ok(())
    }
}

fn deny(reason: DenialReason) -> Decision {
    debug!("Quick pay denied: {}", reason);
    Decision::RequireFullAuth(reason)
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::clock::ManualClock;
    use chrono::{TimeZone, Utc};
    use custody_storage::{MemoryStore, MockAuthMechanism};
    use std::time::Duration;

    struct Fixture {
        engine: QuickPayEngine,
        store: Arc<MemoryStore>,
        mechanism: Arc<MockAuthMechanism>,
        clock: Arc<ManualClock>,
    }

    async fn fixture(update: PolicyUpdate) -> Fixture {
        let store = Arc::new(MemoryStore::new());
        let mechanism = Arc::new(MockAuthMechanism::new());
        let gateway = Arc::new(
            AuthGateway::resolve(mechanism.clone(), None, Duration::from_secs(30)).await,
        );
        let clock = Arc::new(ManualClock::new(
            Utc.with_ymd_and_hms(2026, 3, 1, 12, 0, 0).unwrap(),
        ));
        let engine = QuickPayEngine::load(store.clone(), "policy".to_string(), gateway, clock.clone())
            .await
            .unwrap();
        engine
            .update_policy(update.enabled(true).idle_timeout_ms(0))
            .await
            .unwrap();
        Fixture {
            engine,
            store,
            mechanism,
            clock,
        }
    }

    #[test]
    fn test_session_freshness() {
        let mut session = AuthSession::default();
        assert!(!session.is_fresh(1_000, 60_000));
        session.record(1_000);
        assert!(session.is_fresh(30_000, 60_000));
        assert!(!session.is_fresh(61_000, 60_000));
        assert!(!session.is_fresh(2_000, 0));
        session.clear();
        assert!(!session.is_fresh(1_000, 60_000));
    }

    #[tokio::test]
    async fn test_disabled_policy_denies_without_prompt() {
        let f = fixture(PolicyUpdate::new()).await;
        f.engine.disable().await.unwrap();

        let decision = f.engine.evaluate(1, None).await.unwrap();
        assert_eq!(decision, Decision::RequireFullAuth(DenialReason::PolicyDisabled));
        assert_eq!(f.mechanism.prompt_count(), 0);
    }

    #[tokio::test]
    async fn test_approval_persists_spend() {
        let f = fixture(PolicyUpdate::new()).await;
        assert!(f.engine.evaluate(700, None).await.unwrap().is_quick_approve());

        let raw = f.store.get("policy").await.unwrap().unwrap();
        let stored = QuickPayPolicy::from_json(&raw).unwrap();
        assert_eq!(stored.daily_spent.amount, 700);
        assert_eq!(stored.daily_spent.date, f.clock.today());
    }

    #[tokio::test]
    async fn test_unlimited_overflow_is_error() {
        let f = fixture(PolicyUpdate::new()).await;
        f.engine.evaluate(u64::MAX, None).await.unwrap();
        assert!(matches!(
            f.engine.evaluate(1, None).await,
            Err(Error::AmountOverflow)
        ));
    }

    #[tokio::test]
    async fn test_capped_overflow_is_cap_denial() {
        let f = fixture(PolicyUpdate::new().daily_cap(u64::MAX)).await;
        f.engine.evaluate(u64::MAX, None).await.unwrap();
        assert_eq!(
            f.engine.evaluate(1, None).await.unwrap(),
            Decision::RequireFullAuth(DenialReason::DailyCapExceeded)
        );
    }

    #[tokio::test]
    async fn test_idle_reuse_skips_prompt() {
        let f = fixture(PolicyUpdate::new()).await;
        f.engine
            .update_policy(PolicyUpdate::new().idle_timeout_ms(60_000))
            .await
            .unwrap();

        f.engine.evaluate(1, None).await.unwrap();
        f.clock.advance_ms(10_000);
        f.engine.evaluate(1, None).await.unwrap();
        assert_eq!(f.mechanism.prompt_count(), 1);

        f.clock.advance_ms(60_000);
        f.engine.evaluate(1, None).await.unwrap();
        assert_eq!(f.mechanism.prompt_count(), 2);

        f.engine.invalidate_session();
        f.engine.evaluate(1, None).await.unwrap();
        assert_eq!(f.mechanism.prompt_count(), 3);
    }

    #[tokio::test]
    async fn test_idle_reuse_still_enforces_limits() {
        let f = fixture(PolicyUpdate::new().per_tx_limit(10)).await;
        f.engine
            .update_policy(PolicyUpdate::new().idle_timeout_ms(60_000))
            .await
            .unwrap();
        f.engine.note_authenticated();

        assert_eq!(
            f.engine.evaluate(11, None).await.unwrap(),
            Decision::RequireFullAuth(DenialReason::PerTxLimitExceeded)
        );
        assert!(f.engine.evaluate(10, None).await.unwrap().is_quick_approve());
        assert_eq!(f.mechanism.prompt_count(), 0);
    }

    #[tokio::test]
    async fn test_record_full_auth_payment() {
        let f = fixture(PolicyUpdate::new().daily_cap(100)).await;
        f.engine.record_full_auth_payment(150).await.unwrap();
        assert_eq!(f.engine.remaining_daily_allowance().await, Some(0));
        assert_eq!(
            f.engine.evaluate(1, None).await.unwrap(),
            Decision::RequireFullAuth(DenialReason::DailyCapExceeded)
        );
    }

    #[tokio::test]
    async fn test_whitelist_helpers_persist() {
        let f = fixture(PolicyUpdate::new()).await;
        assert!(f.engine.add_to_whitelist(" addrA ").await.unwrap());
        assert!(!f.engine.add_to_whitelist("addrA").await.unwrap());

        let raw = f.store.get("policy").await.unwrap().unwrap();
        assert!(QuickPayPolicy::from_json(&raw).unwrap().whitelist.contains("addrA"));

        assert!(f.engine.remove_from_whitelist("addrA").await.unwrap());
        assert!(f.engine.policy().await.whitelist.is_empty());
    }

    #[tokio::test]
    async fn test_reload_sees_persisted_policy() {
        let f = fixture(PolicyUpdate::new().per_tx_limit(42)).await;
        let gateway = Arc::new(AuthGateway::unavailable());
        let reloaded = QuickPayEngine::load(f.store.clone(), "policy".to_string(), gateway, f.clock.clone())
            .await
            .unwrap();

        assert!(reloaded.is_enabled().await);
        assert_eq!(reloaded.policy().await.per_tx_limit, 42);
        assert_eq!(reloaded.session(), AuthSession::default());
    }

    #[tokio::test]
    async fn test_reset_restores_defaults() {
        let f = fixture(PolicyUpdate::new().per_tx_limit(42)).await;
        f.engine.reset().await.unwrap();
        assert_eq!(f.engine.policy().await, QuickPayPolicy::default());
        assert!(f.store.get("policy").await.unwrap().is_none());
    }

    #[test]
    fn test_denial_messages() {
        assert!(DenialReason::DailyCapExceeded.user_message().contains("daily"));
        assert_eq!(DenialReason::BiometricFailed.to_string(), "BiometricFailed");
        assert_eq!(
            Decision::RequireFullAuth(DenialReason::PolicyDisabled).denial_reason(),
            Some(DenialReason::PolicyDisabled)
        );
        assert_eq!(Decision::QuickApprove.denial_reason(), None);
    }
}
