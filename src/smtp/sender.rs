// Copyright (c) 2025 TexasFortress.AI
// This Source Code Form is subject to the terms of the Mozilla Public
// License, v. 2.0. If a copy of the MPL was not distributed with this
// file, You can obtain one at http://mozilla.org/MPL/2.0/.

use std::time::Duration;

use base64::{engine::general_purpose::STANDARD as BASE64, Engine as _};
use lettre::message::header::ContentType;
use lettre::message::{Attachment, Mailbox, MultiPart, SinglePart};
use lettre::transport::smtp::authentication::Credentials;
use lettre::{AsyncSmtpTransport, AsyncTransport, Message, Tokio1Executor};
use log::{debug, info, warn};
use uuid::Uuid;

use super::envelope::{DeliveryReceipt, OutgoingEnvelope};
use super::SmtpError;
use crate::accounts::Account;

/// Port on which SMTP servers expect TLS from the first byte.
const IMPLICIT_TLS_PORT: u16 = 465;

fn parse_mailbox(value: &str) -> Result<Mailbox, SmtpError> {
    value
        .parse()
        .map_err(|e| SmtpError::InvalidAddress(format!("{}: {}", value, e)))
}

/// `<id>` form for Message-ID style headers.
fn angle_bracketed(id: &str) -> String {
    let trimmed = id.trim();
    if trimmed.starts_with('<') {
        trimmed.to_string()
    } else {
        format!("<{}>", trimmed)
    }
}

fn message_id_for(from: &Mailbox) -> String {
    format!("<{}@{}>", Uuid::new_v4(), from.email.domain())
}

/// Builds the RFC 5322 message. Pure: no network.
pub fn build_message(account: &Account, envelope: &OutgoingEnvelope) -> Result<(Message, String), SmtpError> {
    let from = parse_mailbox(envelope.from.as_deref().unwrap_or_else(|| account.sender()))?;
    let message_id = message_id_for(&from);

    let mut builder = Message::builder()
        .from(from)
        .subject(envelope.subject.as_str())
        .message_id(Some(message_id.clone()));

    for to in &envelope.to {
        builder = builder.to(parse_mailbox(to)?);
    }
    for cc in &envelope.cc {
        builder = builder.cc(parse_mailbox(cc)?);
    }
    for bcc in &envelope.bcc {
        builder = builder.bcc(parse_mailbox(bcc)?);
    }
    if let Some(parent) = envelope.in_reply_to.as_deref().filter(|id| !id.trim().is_empty()) {
        builder = builder.in_reply_to(angle_bracketed(parent));
    }
    if !envelope.references.is_empty() {
        let references: Vec<String> = envelope.references.iter().map(|r| angle_bracketed(r)).collect();
        builder = builder.references(references.join(" "));
    }

    let text_part = || SinglePart::plain(envelope.body.clone());
    let message = match (&envelope.body_html, envelope.attachments.is_empty()) {
        (None, true) => builder.singlepart(text_part())?,
        (Some(html), true) => {
            builder.multipart(MultiPart::alternative_plain_html(envelope.body.clone(), html.clone()))?
        }
        (html, false) => {
            let mut mixed = match html {
                Some(html) => MultiPart::mixed().multipart(MultiPart::alternative_plain_html(
                    envelope.body.clone(),
                    html.clone(),
                )),
                None => MultiPart::mixed().singlepart(text_part()),
            };
            for attachment in &envelope.attachments {
                let content = BASE64.decode(attachment.content.trim()).map_err(|e| {
                    SmtpError::InvalidAttachment(format!("{}: {}", attachment.filename, e))
                })?;
                let content_type = ContentType::parse(&attachment.content_type).map_err(|e| {
                    SmtpError::InvalidAttachment(format!("{}: {}", attachment.filename, e))
                })?;
                mixed = mixed.singlepart(Attachment::new(attachment.filename.clone()).body(content, content_type));
            }
            builder.multipart(mixed)?
        }
    };

    Ok((message, message_id))
}

/// Sends through the account's SMTP endpoint, one connection per message.
pub struct SmtpSender {
    connect_timeout: Duration,
    operation_timeout: Duration,
}

impl SmtpSender {
    pub fn new(connect_timeout: Duration, operation_timeout: Duration) -> Self {
        Self {
            connect_timeout,
            operation_timeout,
        }
    }

    fn transport(&self, account: &Account) -> Result<AsyncSmtpTransport<Tokio1Executor>, SmtpError> {
        let host = account
            .smtp_host
            .as_deref()
            .ok_or_else(|| SmtpError::NotConfigured(account.id.clone()))?;
        let port = account.smtp_port.unwrap_or(crate::accounts::model::DEFAULT_SUBMISSION_PORT);
        let creds = Credentials::new(account.username.clone(), account.secret.expose().to_string());

        let builder = if !account.smtp_tls {
            warn!("SMTP for account {} runs without TLS", account.id);
            AsyncSmtpTransport::<Tokio1Executor>::builder_dangerous(host)
        } else if port == IMPLICIT_TLS_PORT {
            AsyncSmtpTransport::<Tokio1Executor>::relay(host)?
        } else {
            AsyncSmtpTransport::<Tokio1Executor>::starttls_relay(host)?
        };

        Ok(builder
            .port(port)
            .credentials(creds)
            .timeout(Some(self.connect_timeout))
            .build())
    }

    pub async fn send(&self, account: &Account, envelope: &OutgoingEnvelope) -> Result<DeliveryReceipt, SmtpError> {
        let (message, message_id) = build_message(account, envelope)?;
        let recipients: Vec<String> = message.envelope().to().iter().map(|a| a.to_string()).collect();
        let mailer = self.transport(account)?;

        debug!(
            "Sending {} to {} recipient(s) via {:?}",
            message_id,
            recipients.len(),
            account.smtp_host
        );
        let response = tokio::time::timeout(self.operation_timeout, mailer.send(message))
            .await
            .map_err(|_| SmtpError::Timeout(format!("sending via {:?}", account.smtp_host)))??;

        let server_response = format!(
            "{} {}",
            response.code(),
            response.message().collect::<Vec<_>>().join(" ")
        );
        info!("SMTP accepted {} for account {}", message_id, account.id);

        Ok(DeliveryReceipt {
            status: "accepted".to_string(),
            message_id: message_id.trim_matches(|c| c == '<' || c == '>').to_string(),
            recipients,
            server_response,
        })
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::accounts::NewAccount;
    use crate::smtp::envelope::OutgoingAttachment;

    fn account() -> Account {
        NewAccount {
            imap_host: "imap.example.com".to_string(),
            imap_port: Some(993),
            smtp_host: Some("smtp.example.com".to_string()),
            username: "a@example.com".to_string(),
            secret: "x".to_string(),
            ..Default::default()
        }
        .into_account("acct-1".to_string(), chrono::Utc::now())
    }

    fn formatted(message: &Message) -> String {
        String::from_utf8(message.formatted()).unwrap()
    }

    #[test]
    fn test_plain_message_headers() {
        let envelope = OutgoingEnvelope {
            to: vec!["Bob <bob@example.com>".to_string()],
            bcc: vec!["hidden@example.com".to_string()],
            subject: "Hello".to_string(),
            body: "Hi Bob".to_string(),
            ..Default::default()
        };
        let (message, message_id) = build_message(&account(), &envelope).unwrap();
        let text = formatted(&message);

        assert!(text.contains("From: a@example.com"));
        assert!(text.contains("To: \"Bob\" <bob@example.com>") || text.contains("To: Bob <bob@example.com>"));
        assert!(text.contains("Subject: Hello"));
        assert!(text.contains(&format!("Message-ID: {}", message_id)));
        assert!(!text.contains("hidden@example.com"));
        assert_eq!(message.envelope().to().len(), 2);
    }

    #[test]
    fn test_reply_headers() {
        let envelope = OutgoingEnvelope {
            to: vec!["bob@example.com".to_string()],
            subject: "Re: Hello".to_string(),
            in_reply_to: Some("orig@example.com".to_string()),
            references: vec!["root@example.com".to_string(), "<orig@example.com>".to_string()],
            ..Default::default()
        };
        let (message, _) = build_message(&account(), &envelope).unwrap();
        let text = formatted(&message);

        assert!(text.contains("In-Reply-To: <orig@example.com>"));
        assert!(text.contains("References: <root@example.com> <orig@example.com>"));
    }

    #[test]
    fn test_sender_override_and_attachment() {
        let envelope = OutgoingEnvelope {
            to: vec!["bob@example.com".to_string()],
            from: Some("Team <team@example.org>".to_string()),
            subject: "Report".to_string(),
            body: "Attached.".to_string(),
            attachments: vec![OutgoingAttachment {
                filename: "report.txt".to_string(),
                content_type: "text/plain".to_string(),
                content: BASE64.encode(b"quarterly numbers"),
            }],
            ..Default::default()
        };
        let (message, message_id) = build_message(&account(), &envelope).unwrap();
        let text = formatted(&message);

        assert!(message_id.ends_with("@example.org>"));
        assert!(text.contains("team@example.org"));
        assert!(text.contains("multipart/mixed"));
        assert!(text.contains("report.txt"));
    }

    #[test]
    fn test_missing_smtp_host() {
        let mut account = account();
        account.smtp_host = None;
        let sender = SmtpSender::new(Duration::from_secs(1), Duration::from_secs(1));
        assert!(matches!(sender.transport(&account), Err(SmtpError::NotConfigured(_))));
    }
}
