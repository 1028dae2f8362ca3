// SPDX-FileCopyrightText: 2026 Voxa Contributors
// SPDX-License-Identifier: MIT OR Apache-2.0

//! Wallet document model.
//!
//! One wallet per account at `accounts/{aid}/bank/balance`. Balances are
//! integer vexels and are mutated only through atomic increments so
//! concurrent turns compose.

use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};
use serde_json::Value;
use std::sync::Arc;
use voxa_core::{CallCtx, DocumentStore, VoxaError};

/// An account's vexel wallet.
#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
pub struct Wallet {
    /// Top-up balance.
    #[serde(default)]
    pub balance: i64,

    /// Subscription balance, re-granted monthly.
    #[serde(default)]
    pub subscription_balance: i64,

    #[serde(default)]
    pub subscription_sku: Option<String>,

    #[serde(default)]
    pub subscription_start_date: Option<DateTime<Utc>>,

    /// SKU queued to take effect at the next grant.
    #[serde(default)]
    pub pending_sku: Option<String>,

    /// Set once the first-time device bonus has been claimed.
    #[serde(default)]
    pub first_time_bonus: bool,

    /// Subscription period (months since start) of the last grant.
    #[serde(default)]
    pub last_grant_period: Option<u32>,
}

impl Wallet {
    pub fn total(&self) -> i64 {
        self.balance + self.subscription_balance
    }
}

/// `accounts/{aid}/bank/balance`
pub fn wallet_path(account_id: &str) -> String {
    format!("accounts/{account_id}/bank/balance")
}

/// Loads a wallet, defaulting to an empty one when absent.
pub async fn load_wallet(
    docs: &Arc<dyn DocumentStore>,
    ctx: &CallCtx,
    account_id: &str,
) -> Result<Wallet, VoxaError> {
    match docs.get(ctx, &wallet_path(account_id)).await? {
        Some(doc) => decode_wallet(account_id, doc),
        None => Ok(Wallet::default()),
    }
}

pub(crate) fn decode_wallet(account_id: &str, doc: Value) -> Result<Wallet, VoxaError> {
    serde_json::from_value(doc)
        .map_err(|e| VoxaError::Consistency(format!("malformed wallet for {account_id}: {e}")))
}
