// SPDX-FileCopyrightText: 2026 Voxa Contributors
// SPDX-License-Identifier: MIT OR Apache-2.0

//! Outbound email transport trait.

use async_trait::async_trait;

use crate::error::VoxaError;

/// A rendered email ready to ship.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct EmailMessage {
    pub to: Vec<String>,
    pub subject: String,
    /// HTML body.
    pub body: String,
}

/// Delivers rendered messages; implementations own addressing the sender.
#[async_trait]
pub trait EmailTransport: Send + Sync {
    async fn send(&self, message: EmailMessage) -> Result<(), VoxaError>;
}
