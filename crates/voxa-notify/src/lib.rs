// SPDX-FileCopyrightText: 2026 Voxa Contributors
// SPDX-License-Identifier: MIT OR Apache-2.0

//! Notification sink and outbound email for the Voxa backend.

pub mod email;
pub mod sink;

pub use email::{SmtpEmailTransport, render_low_balance_email, render_moderation_email};
pub use sink::{ModerationPayload, Notification, NotificationSink};
