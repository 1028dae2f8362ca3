// SPDX-FileCopyrightText: 2026 Voxa Contributors
// SPDX-License-Identifier: MIT OR Apache-2.0

//! Outbound email: an SMTP transport and the fixed HTML templates for
//! moderation and low-balance mail.
//!
//! Delivery failures are surfaced as errors but callers treat them as
//! non-fatal for the turn.

use async_trait::async_trait;
use chrono::{DateTime, Utc};
use lettre::message::header::ContentType;
use lettre::transport::smtp::authentication::Credentials;
use lettre::{AsyncSmtpTransport, AsyncTransport, Message, Tokio1Executor};
use voxa_core::{EmailMessage, EmailTransport, VoxaError};
use voxa_registry::{Localization, section};

/// SMTP transport over lettre's tokio executor.
pub struct SmtpEmailTransport {
    mailer: AsyncSmtpTransport<Tokio1Executor>,
    from: String,
}

impl SmtpEmailTransport {
    pub fn new(
        host: &str,
        username: Option<&str>,
        password: Option<&str>,
        from: &str,
    ) -> Result<Self, VoxaError> {
        let mut builder = AsyncSmtpTransport::<Tokio1Executor>::relay(host)
            .map_err(|e| VoxaError::Config(format!("smtp relay {host}: {e}")))?;
        if let (Some(user), Some(pass)) = (username, password) {
            builder = builder.credentials(Credentials::new(user.to_string(), pass.to_string()));
        }
        Ok(Self {
            mailer: builder.build(),
            from: from.to_string(),
        })
    }
}

#[async_trait]
impl EmailTransport for SmtpEmailTransport {
    async fn send(&self, message: EmailMessage) -> Result<(), VoxaError> {
        for recipient in &message.to {
            let email = Message::builder()
                .from(self.from.parse().map_err(|e| {
                    VoxaError::Config(format!("from address {}: {e}", self.from))
                })?)
                .to(recipient.parse().map_err(|e| {
                    VoxaError::bad_request("email", format!("recipient {recipient}: {e}"))
                })?)
                .subject(&message.subject)
                .header(ContentType::TEXT_HTML)
                .body(message.body.clone())
                .map_err(|e| VoxaError::Internal(format!("build email: {e}")))?;

            self.mailer.send(email).await.map_err(|e| {
                VoxaError::connection(format!("smtp send to {recipient}: {e}"))
            })?;
        }
        tracing::info!(recipients = message.to.len(), "email shipped");
        Ok(())
    }
}

/// Minimal HTML escaping for user-controlled strings in templates.
fn escape(s: &str) -> String {
    s.replace('&', "&amp;")
        .replace('<', "&lt;")
        .replace('>', "&gt;")
        .replace('"', "&quot;")
}

/// Renders the moderation notice email.
pub fn render_moderation_email(
    profile_name: &str,
    character_name: &str,
    reasons: &[String],
    user_text: &str,
    at: DateTime<Utc>,
    localization: &Localization,
) -> EmailMessage {
    let subject = localization
        .get_or_builtin(section::EMAIL, "moderation_subject")
        .replace("{profile}", profile_name);
    let title = localization.get_or_builtin(section::EMAIL, "moderation_title");
    let intro = localization
        .get_or_builtin(section::EMAIL, "moderation_intro")
        .replace("{profile}", &escape(profile_name))
        .replace("{character}", &escape(character_name));
    let quote_label = localization.get_or_builtin(section::EMAIL, "moderation_quote_label");

    let reason_items: String = reasons
        .iter()
        .map(|r| format!("<li>{}</li>", escape(r)))
        .collect();

    let body = format!(
        "<html><body>\
         <h2>{title}</h2>\
         <p>{intro}</p>\
         <ul>{reason_items}</ul>\
         <p>{quote_label}</p>\
         <blockquote>{quote}</blockquote>\
         <p><small>{profile} &middot; {character} &middot; {time}</small></p>\
         </body></html>",
        title = escape(&title),
        intro = intro,
        reason_items = reason_items,
        quote_label = escape(&quote_label),
        quote = escape(user_text),
        profile = escape(profile_name),
        character = escape(character_name),
        time = at.to_rfc3339(),
    );

    EmailMessage {
        to: Vec::new(),
        subject,
        body,
    }
}

/// Renders the low-balance notice email.
pub fn render_low_balance_email(balance: i64, localization: &Localization) -> EmailMessage {
    let subject = localization.get_or_builtin(section::EMAIL, "low_balance_subject");
    let body_text = localization
        .get_or_builtin(section::EMAIL, "low_balance_body")
        .replace("{balance}", &balance.to_string());
    EmailMessage {
        to: Vec::new(),
        subject,
        body: format!("<html><body><p>{}</p></body></html>", escape(&body_text)),
    }
}
