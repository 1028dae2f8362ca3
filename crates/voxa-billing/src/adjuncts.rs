// SPDX-FileCopyrightText: 2026 Voxa Contributors
// SPDX-License-Identifier: MIT OR Apache-2.0

//! Wallet adjuncts: gift-card redemption, the first-time device bonus,
//! and the monthly subscription grant.

use std::collections::BTreeMap;
use std::sync::Arc;

use chrono::{DateTime, Datelike, Utc};
use serde::{Deserialize, Serialize};
use serde_json::json;
use voxa_core::{CallCtx, DocumentStore, FieldOp, VoxaError};

use crate::wallet::{load_wallet, wallet_path};

/// Bonus for a device on the curated white-list.
pub const WHITELIST_BONUS: i64 = 1_000;

/// Bonus for a device matching a factory MAC prefix.
pub const FACTORY_BONUS: i64 = 500;

/// A single-use gift card document at `giftcards/{code}`.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct GiftCard {
    pub amount: i64,
    pub expires_at: DateTime<Utc>,
    #[serde(default)]
    pub redeemed_by: Option<String>,
}

/// Wallet adjunct operations.
pub struct WalletAdjuncts {
    docs: Arc<dyn DocumentStore>,
    /// Subscription SKU → monthly vexel grant.
    sku_grants: BTreeMap<String, i64>,
}

impl WalletAdjuncts {
    pub fn new(docs: Arc<dyn DocumentStore>, sku_grants: BTreeMap<String, i64>) -> Self {
        Self { docs, sku_grants }
    }

    /// Redeems a gift card onto the account's top-up balance.
    ///
    /// A card redeems exactly once; an expired card fails `Unprocessable`.
    pub async fn redeem_gift_card(
        &self,
        ctx: &CallCtx,
        account_id: &str,
        code: &str,
    ) -> Result<i64, VoxaError> {
        let path = format!("giftcards/{code}");
        let doc = self
            .docs
            .get(ctx, &path)
            .await?
            .ok_or_else(|| VoxaError::NotFound(format!("gift card {code}")))?;
        let card: GiftCard = serde_json::from_value(doc)
            .map_err(|e| VoxaError::Consistency(format!("malformed gift card {code}: {e}")))?;

        if card.redeemed_by.is_some() {
            return Err(VoxaError::AlreadyExists(format!("gift card {code} already redeemed")));
        }
        if Utc::now() > card.expires_at {
            return Err(VoxaError::Unprocessable(format!("gift card {code} expired")));
        }

        self.docs
            .update(
                ctx,
                &path,
                vec![("redeemed_by".to_string(), FieldOp::Set(json!(account_id)))],
            )
            .await?;
        self.docs
            .update(
                ctx,
                &wallet_path(account_id),
                vec![("balance".to_string(), FieldOp::Increment(card.amount))],
            )
            .await?;

        tracing::info!(account_id, code, amount = card.amount, "gift card redeemed");
        Ok(card.amount)
    }

    /// Grants the one-time bonus for a newly registered device.
    ///
    /// White-listed MACs earn the larger bonus; MACs matching a factory
    /// prefix earn the smaller one. Each MAC claims once globally and each
    /// account claims once (`first_time_bonus`).
    pub async fn first_time_device_bonus(
        &self,
        ctx: &CallCtx,
        account_id: &str,
        mac: &str,
    ) -> Result<i64, VoxaError> {
        let wallet = load_wallet(&self.docs, ctx, account_id).await?;
        if wallet.first_time_bonus {
            return Err(VoxaError::AlreadyExists(format!(
                "account {account_id} already claimed the device bonus"
            )));
        }

        let claimed = self.string_list(ctx, "registry/devices/claimed", "macs").await?;
        if claimed.iter().any(|m| m == mac) {
            return Err(VoxaError::AlreadyExists(format!("device {mac} already claimed")));
        }

        let whitelist = self.string_list(ctx, "registry/devices/whitelist", "macs").await?;
        let factory = self.string_list(ctx, "registry/devices/factory", "prefixes").await?;

        let amount = if whitelist.iter().any(|m| m.eq_ignore_ascii_case(mac)) {
            WHITELIST_BONUS
        } else if factory
            .iter()
            .any(|p| mac.to_ascii_lowercase().starts_with(&p.to_ascii_lowercase()))
        {
            FACTORY_BONUS
        } else {
            return Err(VoxaError::Unprocessable(format!("device {mac} is not eligible")));
        };

        self.docs
            .update(
                ctx,
                "registry/devices/claimed",
                vec![("macs".to_string(), FieldOp::ArrayUnion(vec![json!(mac)]))],
            )
            .await?;
        self.docs
            .update(
                ctx,
                &wallet_path(account_id),
                vec![
                    ("balance".to_string(), FieldOp::Increment(amount)),
                    ("first_time_bonus".to_string(), FieldOp::Set(json!(true))),
                ],
            )
            .await?;

        tracing::info!(account_id, mac, amount, "first-time device bonus granted");
        Ok(amount)
    }

    /// Re-grants the subscription balance when a new monthly period since
    /// `subscription_start_date` has begun. Idempotent within a period.
    pub async fn apply_subscription_grant(
        &self,
        ctx: &CallCtx,
        account_id: &str,
    ) -> Result<Option<i64>, VoxaError> {
        let wallet = load_wallet(&self.docs, ctx, account_id).await?;
        let (Some(sku), Some(start)) = (&wallet.subscription_sku, wallet.subscription_start_date)
        else {
            return Ok(None);
        };
        let Some(&grant) = self.sku_grants.get(sku) else {
            return Err(VoxaError::Config(format!("unknown subscription sku {sku}")));
        };

        let period = months_between(start, Utc::now());
        if wallet.last_grant_period == Some(period) {
            return Ok(None);
        }

        self.docs
            .update(
                ctx,
                &wallet_path(account_id),
                vec![
                    ("subscription_balance".to_string(), FieldOp::Set(json!(grant))),
                    ("last_grant_period".to_string(), FieldOp::Set(json!(period))),
                ],
            )
            .await?;

        tracing::info!(account_id, sku, grant, period, "subscription grant applied");
        Ok(Some(grant))
    }

    async fn string_list(
        &self,
        ctx: &CallCtx,
        path: &str,
        field: &str,
    ) -> Result<Vec<String>, VoxaError> {
        let Some(doc) = self.docs.get(ctx, path).await? else {
            return Ok(Vec::new());
        };
        Ok(doc
            .get(field)
            .and_then(|v| v.as_array())
            .map(|a| {
                a.iter()
                    .filter_map(|v| v.as_str().map(str::to_string))
                    .collect()
            })
            .unwrap_or_default())
    }
}

/// Whole months elapsed from `start` to `now`.
fn months_between(start: DateTime<Utc>, now: DateTime<Utc>) -> u32 {
    if now <= start {
        return 0;
    }
    let mut months =
        (now.year() - start.year()) * 12 + (now.month() as i32 - start.month() as i32);
    if now.day() < start.day() {
        months -= 1;
    }
    months.max(0) as u32
}

#[cfg(test)]
mod tests {
    use super::*;
    use chrono::{Duration, TimeZone};
    use voxa_store::SqliteDocumentStore;

    async fn adjuncts() -> (WalletAdjuncts, Arc<SqliteDocumentStore>) {
        let docs = Arc::new(SqliteDocumentStore::open(":memory:").await.unwrap());
        let adjuncts = WalletAdjuncts::new(
            docs.clone(),
            BTreeMap::from([("sub-monthly-1".to_string(), 12_000)]),
        );
        (adjuncts, docs)
    }

    #[test]
    fn months_between_respects_the_day_of_month() {
        let start = Utc.with_ymd_and_hms(2026, 1, 15, 0, 0, 0).unwrap();
        assert_eq!(months_between(start, Utc.with_ymd_and_hms(2026, 2, 14, 0, 0, 0).unwrap()), 0);
        assert_eq!(months_between(start, Utc.with_ymd_and_hms(2026, 2, 15, 0, 0, 0).unwrap()), 1);
        assert_eq!(months_between(start, Utc.with_ymd_and_hms(2026, 7, 20, 0, 0, 0).unwrap()), 6);
        assert_eq!(months_between(start, start - Duration::days(3)), 0);
    }

    #[tokio::test]
    async fn gift_card_redeems_exactly_once() {
        let (adjuncts, docs) = adjuncts().await;
        let ctx = CallCtx::unbounded();
        docs.set(
            &ctx,
            "giftcards/CARD1",
            json!({"amount": 2500, "expires_at": Utc::now() + Duration::days(30)}),
        )
        .await
        .unwrap();

        let amount = adjuncts.redeem_gift_card(&ctx, "a1", "CARD1").await.unwrap();
        assert_eq!(amount, 2500);
        let wallet = load_wallet(&(docs.clone() as Arc<dyn DocumentStore>), &ctx, "a1")
            .await
            .unwrap();
        assert_eq!(wallet.balance, 2500);

        let err = adjuncts.redeem_gift_card(&ctx, "a2", "CARD1").await.unwrap_err();
        assert!(matches!(err, VoxaError::AlreadyExists(_)));
    }

    #[tokio::test]
    async fn expired_gift_card_is_unprocessable() {
        let (adjuncts, docs) = adjuncts().await;
        let ctx = CallCtx::unbounded();
        docs.set(
            &ctx,
            "giftcards/OLD",
            json!({"amount": 100, "expires_at": Utc::now() - Duration::days(1)}),
        )
        .await
        .unwrap();
        let err = adjuncts.redeem_gift_card(&ctx, "a1", "OLD").await.unwrap_err();
        assert!(matches!(err, VoxaError::Unprocessable(_)));
    }

    #[tokio::test]
    async fn device_bonus_distinguishes_whitelist_from_factory() {
        let (adjuncts, docs) = adjuncts().await;
        let ctx = CallCtx::unbounded();
        docs.set(&ctx, "registry/devices/whitelist", json!({"macs": ["AA:BB:CC:00:00:01"]}))
            .await
            .unwrap();
        docs.set(&ctx, "registry/devices/factory", json!({"prefixes": ["dd:ee"]}))
            .await
            .unwrap();

        let a = adjuncts
            .first_time_device_bonus(&ctx, "a1", "AA:BB:CC:00:00:01")
            .await
            .unwrap();
        assert_eq!(a, WHITELIST_BONUS);

        let b = adjuncts
            .first_time_device_bonus(&ctx, "a2", "DD:EE:01:02:03:04")
            .await
            .unwrap();
        assert_eq!(b, FACTORY_BONUS);

        let err = adjuncts
            .first_time_device_bonus(&ctx, "a3", "00:11:22:33:44:55")
            .await
            .unwrap_err();
        assert!(matches!(err, VoxaError::Unprocessable(_)));
    }

    #[tokio::test]
    async fn device_bonus_claims_once_per_account_and_mac() {
        let (adjuncts, docs) = adjuncts().await;
        let ctx = CallCtx::unbounded();
        docs.set(&ctx, "registry/devices/whitelist", json!({"macs": ["AA:AA", "BB:BB"]}))
            .await
            .unwrap();

        adjuncts.first_time_device_bonus(&ctx, "a1", "AA:AA").await.unwrap();

        // Same account, different device.
        let err = adjuncts.first_time_device_bonus(&ctx, "a1", "BB:BB").await.unwrap_err();
        assert!(matches!(err, VoxaError::AlreadyExists(_)));

        // Different account, same device.
        let err = adjuncts.first_time_device_bonus(&ctx, "a2", "AA:AA").await.unwrap_err();
        assert!(matches!(err, VoxaError::AlreadyExists(_)));
    }

    #[tokio::test]
    async fn subscription_grant_resets_once_per_period() {
        let (adjuncts, docs) = adjuncts().await;
        let ctx = CallCtx::unbounded();
        docs.set(
            &ctx,
            wallet_path("a1").as_str(),
            json!({
                "balance": 0,
                "subscription_balance": 37,
                "subscription_sku": "sub-monthly-1",
                "subscription_start_date": Utc::now() - Duration::days(45)
            }),
        )
        .await
        .unwrap();

        let granted = adjuncts.apply_subscription_grant(&ctx, "a1").await.unwrap();
        assert_eq!(granted, Some(12_000));
        let wallet = load_wallet(&(docs.clone() as Arc<dyn DocumentStore>), &ctx, "a1")
            .await
            .unwrap();
        assert_eq!(wallet.subscription_balance, 12_000);

        // Second call in the same period is a no-op.
        let again = adjuncts.apply_subscription_grant(&ctx, "a1").await.unwrap();
        assert_eq!(again, None);
    }

    #[tokio::test]
    async fn no_subscription_means_no_grant() {
        let (adjuncts, _docs) = adjuncts().await;
        let ctx = CallCtx::unbounded();
        assert_eq!(adjuncts.apply_subscription_grant(&ctx, "a1").await.unwrap(), None);
    }
}
