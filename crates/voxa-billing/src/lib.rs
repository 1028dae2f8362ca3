// SPDX-FileCopyrightText: 2026 Voxa Contributors
// SPDX-License-Identifier: MIT OR Apache-2.0

//! Billing for the Voxa backend: the per-turn gate over the vexel wallet
//! plus gift cards, device bonuses, and subscription grants.

pub mod adjuncts;
pub mod gate;
pub mod wallet;

pub use adjuncts::{FACTORY_BONUS, GiftCard, WHITELIST_BONUS, WalletAdjuncts};
pub use gate::{BillingGate, Deduction, TIER_FREE};
pub use wallet::{Wallet, load_wallet, wallet_path};
