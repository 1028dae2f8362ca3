// SPDX-FileCopyrightText: 2026 Voxa Contributors
// SPDX-License-Identifier: MIT OR Apache-2.0

//! The per-turn billing gate.
//!
//! Admission runs before a turn is admitted; deduction runs after a
//! successful response. Deduction drains the subscription bucket first
//! when it covers the whole cost, then the top-up bucket, and otherwise
//! splits: subscription to zero, remainder from the top-up balance clamped
//! at zero. Both writes are atomic increments.

use std::collections::BTreeMap;
use std::sync::Arc;

use voxa_core::{CallCtx, DocumentStore, EmailTransport, FieldOp, VoxaError};
use voxa_notify::render_low_balance_email;
use voxa_registry::{Account, Localization};

use crate::wallet::{Wallet, load_wallet, wallet_path};

/// The tier that is never charged or gated.
pub const TIER_FREE: &str = "tier-free";

/// How one deduction was split across the two buckets.
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq)]
pub struct Deduction {
    pub cost: i64,
    pub from_subscription: i64,
    pub from_balance: i64,
}

/// Billing gate over the wallet documents.
pub struct BillingGate {
    docs: Arc<dyn DocumentStore>,
    /// Tier name → vexel cost per turn.
    costs: BTreeMap<String, i64>,
    /// Tier name → descending balance thresholds for low-balance email.
    thresholds: BTreeMap<String, Vec<i64>>,
    email: Option<Arc<dyn EmailTransport>>,
}

impl BillingGate {
    pub fn new(
        docs: Arc<dyn DocumentStore>,
        costs: BTreeMap<String, i64>,
        thresholds: BTreeMap<String, Vec<i64>>,
        email: Option<Arc<dyn EmailTransport>>,
    ) -> Self {
        Self { docs, costs, thresholds, email }
    }

    /// Cost of one turn at `tier`; unknown tiers are free.
    pub fn tier_cost(&self, tier: &str) -> i64 {
        self.costs.get(tier).copied().unwrap_or(0)
    }

    /// Pre-turn admission check.
    ///
    /// Skipped for `disable_bank` accounts and the free tier; otherwise
    /// the wallet must hold at least one vexel across both buckets.
    pub async fn admit(
        &self,
        ctx: &CallCtx,
        account: &Account,
        tier: &str,
    ) -> Result<(), VoxaError> {
        if account.disable_bank || tier == TIER_FREE {
            return Ok(());
        }
        let wallet = load_wallet(&self.docs, ctx, &account.id).await?;
        if wallet.total() < 1 {
            return Err(VoxaError::PaymentRequired(format!(
                "wallet empty for tier {tier}"
            )));
        }
        Ok(())
    }

    /// Post-response deduction.
    ///
    /// Returns the split actually applied. Emits a low-balance email for
    /// each configured threshold the total crossed downward, exactly once
    /// per crossing.
    pub async fn deduct(
        &self,
        ctx: &CallCtx,
        account: &Account,
        tier: &str,
        email_recipients: &[String],
        localization: &Localization,
    ) -> Result<Deduction, VoxaError> {
        if account.disable_bank || tier == TIER_FREE {
            return Ok(Deduction::default());
        }
        let cost = self.tier_cost(tier);
        if cost == 0 {
            return Ok(Deduction::default());
        }

        let wallet = load_wallet(&self.docs, ctx, &account.id).await?;
        if wallet.total() == 0 {
            return Err(VoxaError::PaymentRequired(format!(
                "cannot charge {cost} vexels for tier {tier}"
            )));
        }

        let split = split_deduction(&wallet, cost);
        let mut ops = Vec::new();
        if split.from_subscription != 0 {
            ops.push((
                "subscription_balance".to_string(),
                FieldOp::Increment(-split.from_subscription),
            ));
        }
        if split.from_balance != 0 {
            ops.push(("balance".to_string(), FieldOp::Increment(-split.from_balance)));
        }
        self.docs
            .update(ctx, &wallet_path(&account.id), ops)
            .await?;

        tracing::debug!(
            account_id = %account.id,
            tier,
            cost,
            from_subscription = split.from_subscription,
            from_balance = split.from_balance,
            "turn charged"
        );

        let before = wallet.total();
        let after = before - split.from_subscription - split.from_balance;
        self.maybe_send_low_balance(tier, before, after, email_recipients, localization)
            .await;

        Ok(split)
    }

    /// Sends one email per threshold crossed downward by this deduction.
    async fn maybe_send_low_balance(
        &self,
        tier: &str,
        before: i64,
        after: i64,
        recipients: &[String],
        localization: &Localization,
    ) {
        let Some(transport) = &self.email else { return };
        if recipients.is_empty() {
            return;
        }
        let Some(thresholds) = self.thresholds.get(tier) else { return };

        for &threshold in thresholds {
            if before >= threshold && after < threshold {
                let mut message = render_low_balance_email(after, localization);
                message.to = recipients.to_vec();
                if let Err(e) = transport.send(message).await {
                    tracing::warn!(error = %e, threshold, "low-balance email failed (non-fatal)");
                } else {
                    tracing::info!(threshold, after, "low-balance email sent");
                }
            }
        }
    }
}

/// The deduction ladder: subscription wholly, else balance wholly, else
/// zero the subscription and clamp the remainder from the balance.
fn split_deduction(wallet: &Wallet, cost: i64) -> Deduction {
    if wallet.subscription_balance >= cost {
        Deduction { cost, from_subscription: cost, from_balance: 0 }
    } else if wallet.balance >= cost {
        Deduction { cost, from_subscription: 0, from_balance: cost }
    } else {
        let from_subscription = wallet.subscription_balance.max(0);
        let remainder = cost - from_subscription;
        let from_balance = remainder.min(wallet.balance.max(0));
        Deduction { cost, from_subscription, from_balance }
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use serde_json::json;
    use std::sync::Mutex;
    use voxa_core::EmailMessage;
    use voxa_registry::builtin_en_us;
    use voxa_store::SqliteDocumentStore;

    struct CapturingTransport {
        sent: Mutex<Vec<EmailMessage>>,
    }

    #[async_trait::async_trait]
    impl EmailTransport for CapturingTransport {
        async fn send(&self, message: EmailMessage) -> Result<(), VoxaError> {
            self.sent.lock().unwrap().push(message);
            Ok(())
        }
    }

    fn account(id: &str) -> Account {
        Account { id: id.to_string(), active: true, ..Account::default() }
    }

    fn costs() -> BTreeMap<String, i64> {
        BTreeMap::from([
            (TIER_FREE.to_string(), 0),
            ("tier-conversation-1".to_string(), 100),
        ])
    }

    async fn gate_with_email() -> (BillingGate, Arc<SqliteDocumentStore>, Arc<CapturingTransport>) {
        let docs = Arc::new(SqliteDocumentStore::open(":memory:").await.unwrap());
        let transport = Arc::new(CapturingTransport { sent: Mutex::new(Vec::new()) });
        let gate = BillingGate::new(
            docs.clone(),
            costs(),
            BTreeMap::from([("tier-conversation-1".to_string(), vec![20_500, 10_500])]),
            Some(transport.clone()),
        );
        (gate, docs, transport)
    }

    async fn set_wallet(docs: &Arc<SqliteDocumentStore>, aid: &str, balance: i64, sub: i64) {
        let ctx = CallCtx::unbounded();
        docs.set(
            &ctx,
            &wallet_path(aid),
            json!({"balance": balance, "subscription_balance": sub}),
        )
        .await
        .unwrap();
    }

    async fn wallet_of(docs: &Arc<SqliteDocumentStore>, aid: &str) -> Wallet {
        let ctx = CallCtx::unbounded();
        load_wallet(&(docs.clone() as Arc<dyn DocumentStore>), &ctx, aid)
            .await
            .unwrap()
    }

    #[test]
    fn split_prefers_whole_subscription() {
        let w = Wallet { balance: 500, subscription_balance: 300, ..Wallet::default() };
        let d = split_deduction(&w, 100);
        assert_eq!((d.from_subscription, d.from_balance), (100, 0));
    }

    #[test]
    fn split_falls_back_to_whole_balance() {
        let w = Wallet { balance: 500, subscription_balance: 50, ..Wallet::default() };
        let d = split_deduction(&w, 100);
        assert_eq!((d.from_subscription, d.from_balance), (0, 100));
    }

    #[test]
    fn split_zeroes_subscription_then_clamps_balance() {
        // Scenario S5: cost 150 against {balance 100, sub 80} -> {30, 0}.
        let w = Wallet { balance: 100, subscription_balance: 80, ..Wallet::default() };
        let d = split_deduction(&w, 150);
        assert_eq!((d.from_subscription, d.from_balance), (80, 70));

        // Not even enough in both: clamp at zero.
        let poor = Wallet { balance: 10, subscription_balance: 5, ..Wallet::default() };
        let d = split_deduction(&poor, 150);
        assert_eq!((d.from_subscription, d.from_balance), (5, 10));
    }

    #[tokio::test]
    async fn admit_skips_free_tier_and_disabled_bank() {
        let (gate, _docs, _t) = gate_with_email().await;
        let ctx = CallCtx::unbounded();
        // No wallet document exists, yet both admissions pass.
        gate.admit(&ctx, &account("a1"), TIER_FREE).await.unwrap();
        let mut dev = account("a2");
        dev.disable_bank = true;
        gate.admit(&ctx, &dev, "tier-conversation-1").await.unwrap();
    }

    #[tokio::test]
    async fn admit_requires_a_vexel() {
        let (gate, docs, _t) = gate_with_email().await;
        let ctx = CallCtx::unbounded();
        let err = gate
            .admit(&ctx, &account("a1"), "tier-conversation-1")
            .await
            .unwrap_err();
        assert!(matches!(err, VoxaError::PaymentRequired(_)));

        set_wallet(&docs, "a1", 1, 0).await;
        gate.admit(&ctx, &account("a1"), "tier-conversation-1")
            .await
            .unwrap();
    }

    #[tokio::test]
    async fn deduct_split_matches_scenario_s5() {
        let (_gate, docs, _t) = gate_with_email().await;
        let ctx = CallCtx::unbounded();
        let gate = BillingGate::new(
            docs.clone(),
            BTreeMap::from([("tier-conversation-1".to_string(), 150)]),
            BTreeMap::new(),
            None,
        );
        set_wallet(&docs, "a1", 100, 80).await;
        let d = gate
            .deduct(&ctx, &account("a1"), "tier-conversation-1", &[], &builtin_en_us())
            .await
            .unwrap();
        assert_eq!((d.from_subscription, d.from_balance), (80, 70));

        let w = wallet_of(&docs, "a1").await;
        assert_eq!((w.balance, w.subscription_balance), (30, 0));
    }

    #[tokio::test]
    async fn deduct_is_exact_for_the_tier_cost() {
        let (gate, docs, _t) = gate_with_email().await;
        let ctx = CallCtx::unbounded();
        set_wallet(&docs, "a1", 1_000, 0).await;
        let before = wallet_of(&docs, "a1").await.total();
        gate.deduct(&ctx, &account("a1"), "tier-conversation-1", &[], &builtin_en_us())
            .await
            .unwrap();
        let after = wallet_of(&docs, "a1").await.total();
        assert_eq!(before - after, 100);
    }

    #[tokio::test]
    async fn deduct_with_empty_wallet_is_payment_required() {
        let (gate, docs, _t) = gate_with_email().await;
        let ctx = CallCtx::unbounded();
        set_wallet(&docs, "a1", 0, 0).await;
        let err = gate
            .deduct(&ctx, &account("a1"), "tier-conversation-1", &[], &builtin_en_us())
            .await
            .unwrap_err();
        assert!(matches!(err, VoxaError::PaymentRequired(_)));
    }

    #[tokio::test]
    async fn low_balance_email_fires_once_per_crossing() {
        let (gate, docs, transport) = gate_with_email().await;
        let ctx = CallCtx::unbounded();
        let recipients = vec!["parent@example.com".to_string()];
        set_wallet(&docs, "a1", 10_550, 0).await;

        // 10550 -> 10450 crosses 10500.
        gate.deduct(&ctx, &account("a1"), "tier-conversation-1", &recipients, &builtin_en_us())
            .await
            .unwrap();
        assert_eq!(transport.sent.lock().unwrap().len(), 1);

        // 10450 -> 10350 crosses nothing.
        gate.deduct(&ctx, &account("a1"), "tier-conversation-1", &recipients, &builtin_en_us())
            .await
            .unwrap();
        assert_eq!(transport.sent.lock().unwrap().len(), 1);
    }

    #[tokio::test]
    async fn free_tier_deduction_touches_nothing() {
        let (gate, docs, _t) = gate_with_email().await;
        let ctx = CallCtx::unbounded();
        set_wallet(&docs, "a1", 500, 0).await;
        let d = gate
            .deduct(&ctx, &account("a1"), TIER_FREE, &[], &builtin_en_us())
            .await
            .unwrap();
        assert_eq!(d, Deduction::default());
        assert_eq!(wallet_of(&docs, "a1").await.balance, 500);
    }
}
