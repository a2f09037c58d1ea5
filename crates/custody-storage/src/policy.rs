//! Quick-pay policy model
//!
//! The persisted policy document. Amounts are in the chain's smallest unit and
//! are stored as decimal strings; a limit of `0` means unlimited.

use crate::Result;
use chrono::NaiveDate;
use serde::{Deserialize, Serialize};
use std::collections::BTreeSet;

/// Default idle window in which a recent authentication is reused
pub const DEFAULT_IDLE_TIMEOUT_MS: u64 = 30_000;

/// Spend counter for one UTC day
#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize, Deserialize)]
pub struct DailySpent {
    /// UTC date the amount applies to
    pub date: NaiveDate,
    /// Amount approved through quick pay on `date`
    #[serde(with = "amount_string")]
    pub amount: u64,
}

/// Persisted quick-pay policy
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase", default)]
pub struct QuickPayPolicy {
    /// Fast path enabled
    pub enabled: bool,
    /// Per-payment limit (0 = unlimited)
    #[serde(with = "amount_string")]
    pub per_tx_limit: u64,
    /// Daily cap (0 = unlimited)
    #[serde(with = "amount_string")]
    pub daily_cap: u64,
    /// Today's spend counter
    pub daily_spent: DailySpent,
    /// Allowed recipients (empty = any)
    pub whitelist: BTreeSet<String>,
    /// Caller should require a hold gesture on quick approvals
    pub hold_to_confirm: bool,
    /// Idle reuse window in milliseconds
    pub idle_timeout_ms: u64,
}

impl Default for QuickPayPolicy {
    fn default() -> Self {
        Self {
            enabled: false,
            per_tx_limit: 0,
            daily_cap: 0,
            daily_spent: DailySpent::default(),
            whitelist: BTreeSet::new(),
            hold_to_confirm: true,
            idle_timeout_ms: DEFAULT_IDLE_TIMEOUT_MS,
        }
    }
}

impl QuickPayPolicy {
    /// Parse from stored JSON
    pub fn from_json(raw: &str) -> Result<Self> {
        Ok(serde_json::from_str(raw)?)
    }

    /// Serialize for storage
    pub fn to_json(&self) -> Result<String> {
        Ok(serde_json::to_string(self)?)
    }

    /// Reset the spend counter if it belongs to another day
    ///
    /// Returns `true` if the counter was reset.
    pub fn roll_over(&mut self, today: NaiveDate) -> bool {
        if self.daily_spent.date == today {
            return false;
        }
        self.daily_spent = DailySpent {
            date: today,
            amount: 0,
        };
        true
    }

    /// Spend counter for `today`, treating another day's counter as zero
    pub fn spent_on(&self, today: NaiveDate) -> u64 {
        if self.daily_spent.date == today {
            self.daily_spent.amount
        } else {
            0
        }
    }

    /// Remaining quick-pay allowance for `today` (`None` = unlimited)
    pub fn remaining_daily_allowance(&self, today: NaiveDate) -> Option<u64> {
        if self.daily_cap == 0 {
            return None;
        }
        Some(self.daily_cap.saturating_sub(self.spent_on(today)))
    }

    /// Check a recipient against the allow-list
    ///
    /// An empty list allows everyone.
    pub fn allows_recipient(&self, recipient: &str) -> bool {
        self.whitelist.is_empty() || self.whitelist.contains(recipient.trim())
    }

    /// Add a recipient; returns `false` if blank or already present
    pub fn add_to_whitelist(&mut self, address: &str) -> bool {
        let address = address.trim();
        if address.is_empty() {
            return false;
        }
        self.whitelist.insert(address.to_string())
    }

    /// Remove a recipient; returns `true` if it was present
    pub fn remove_from_whitelist(&mut self, address: &str) -> bool {
        self.whitelist.remove(address.trim())
    }

    /// Merge an update; unset fields keep their value
    pub fn apply(&mut self, update: PolicyUpdate) {
        if let Some(enabled) = update.enabled {
            self.enabled = enabled;
        }
        if let Some(limit) = update.per_tx_limit {
            self.per_tx_limit = limit;
        }
        if let Some(cap) = update.daily_cap {
            self.daily_cap = cap;
        }
        if let Some(addresses) = update.whitelist {
            self.whitelist.clear();
            for address in addresses {
                self.add_to_whitelist(&address);
            }
        }
        if let Some(hold) = update.hold_to_confirm {
            self.hold_to_confirm = hold;
        }
        if let Some(timeout) = update.idle_timeout_ms {
            self.idle_timeout_ms = timeout;
        }
    }
}

/// Partial policy update
#[derive(Debug, Clone, Default, PartialEq, Eq)]
pub struct PolicyUpdate {
    /// Enable or disable the fast path
    pub enabled: Option<bool>,
    /// Per-payment limit
    pub per_tx_limit: Option<u64>,
    /// Daily cap
    pub daily_cap: Option<u64>,
    /// Replacement allow-list
    pub whitelist: Option<Vec<String>>,
    /// Hold-to-confirm flag
    pub hold_to_confirm: Option<bool>,
    /// Idle reuse window
    pub idle_timeout_ms: Option<u64>,
}

impl PolicyUpdate {
    /// Empty update
    pub fn new() -> Self {
        Self::default()
    }

    /// Set enabled flag
    pub fn enabled(mut self, enabled: bool) -> Self {
        self.enabled = Some(enabled);
        self
    }

    /// Set per-payment limit
    pub fn per_tx_limit(mut self, limit: u64) -> Self {
        self.per_tx_limit = Some(limit);
        self
    }

    /// Set daily cap
    pub fn daily_cap(mut self, cap: u64) -> Self {
        self.daily_cap = Some(cap);
        self
    }

    /// Replace the allow-list
    pub fn whitelist<I, S>(mut self, addresses: I) -> Self
    where
        I: IntoIterator<Item = S>,
        S: Into<String>,
    {
        self.whitelist = Some(addresses.into_iter().map(Into::into).collect());
        self
    }

    /// Set hold-to-confirm
    pub fn hold_to_confirm(mut self, hold: bool) -> Self {
        self.hold_to_confirm = Some(hold);
        self
    }

    /// Set idle reuse window
    pub fn idle_timeout_ms(mut self, timeout: u64) -> Self {
        self.idle_timeout_ms = Some(timeout);
        self
    }

    /// Check if nothing is set
    pub fn is_empty(&self) -> bool {
        *self == Self::default()
    }
}

/// u64 amounts as decimal strings
pub mod amount_string {
    use serde::{Deserialize, Deserializer, Serializer};

    /// Serialize as a decimal string
    pub fn serialize<S: Serializer>(amount: &u64, serializer: S) -> Result<S::Ok, S::Error> {
        serializer.serialize_str(&amount.to_string())
    }

    /// Deserialize from a decimal string
    pub fn deserialize<'de, D: Deserializer<'de>>(deserializer: D) -> Result<u64, D::Error> {
        let s = String::deserialize(deserializer)?;
        s.trim().parse::<u64>().map_err(serde::de::Error::custom)
    }
}
