// Copyright (c) 2025 TexasFortress.AI
// This Source Code Form is subject to the terms of the Mozilla Public
// License, v. 2.0. If a copy of the MPL was not distributed with this
// file, You can obtain one at http://mozilla.org/MPL/2.0/.

use serde::{Deserialize, Serialize};
use validator::Validate;

use crate::api::validation::validators;

/// A message to hand to the account's SMTP server.
#[derive(Debug, Clone, Default, Serialize, Deserialize, Validate)]
pub struct OutgoingEnvelope {
    #[serde(default)]
    #[validate(
        length(min = 1, message = "at least one recipient is required"),
        custom(function = "validators::validate_address_list")
    )]
    pub to: Vec<String>,

    #[serde(default)]
    #[validate(custom(function = "validators::validate_address_list"))]
    pub cc: Vec<String>,

    #[serde(default)]
    #[validate(custom(function = "validators::validate_address_list"))]
    pub bcc: Vec<String>,

    /// Overrides the account's sender address.
    #[serde(default)]
    #[validate(custom(function = "validators::validate_mailbox"))]
    pub from: Option<String>,

    #[serde(default)]
    #[validate(length(max = 998))]
    pub subject: String,

    #[serde(default)]
    pub body: String,

    #[serde(default)]
    pub body_html: Option<String>,

    #[serde(default)]
    #[validate(custom(function = "validators::validate_attachments"))]
    pub attachments: Vec<OutgoingAttachment>,

    #[serde(default)]
    pub in_reply_to: Option<String>,

    #[serde(default)]
    pub references: Vec<String>,
}

#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct OutgoingAttachment {
    pub filename: String,
    #[serde(default = "default_attachment_type")]
    pub content_type: String,
    /// Standard base64.
    pub content: String,
}

fn default_attachment_type() -> String {
    "application/octet-stream".to_string()
}

/// Returned once the SMTP server accepted the message. Acceptance is not
/// delivery.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct DeliveryReceipt {
    pub status: String,
    pub message_id: String,
    pub recipients: Vec<String>,
    pub server_response: String,
}

#[cfg(test)]
mod tests {
    use super::*;

    fn envelope() -> OutgoingEnvelope {
        OutgoingEnvelope {
            to: vec!["bob@example.com".to_string()],
            subject: "Hello".to_string(),
            body: "Hi Bob".to_string(),
            ..Default::default()
        }
    }

    #[test]
    fn test_valid_envelope() {
        assert!(envelope().validate().is_ok());
    }

    #[test]
    fn test_missing_recipients() {
        let mut env = envelope();
        env.to.clear();
        let errors = env.validate().unwrap_err();
        assert!(errors.field_errors().contains_key("to"));
    }

    #[test]
    fn test_malformed_addresses() {
        let mut env = envelope();
        env.cc = vec!["not an address".to_string()];
        env.from = Some("missing-at-sign".to_string());
        let errors = env.validate().unwrap_err();
        let fields = errors.field_errors();
        assert!(fields.contains_key("cc"));
        assert!(fields.contains_key("from"));
    }

    #[test]
    fn test_attachment_must_be_base64() {
        let mut env = envelope();
        env.attachments = vec![OutgoingAttachment {
            filename: "notes.txt".to_string(),
            content_type: "text/plain".to_string(),
            content: "%%%".to_string(),
        }];
        assert!(env.validate().unwrap_err().field_errors().contains_key("attachments"));
    }

    #[test]
    fn test_missing_fields_deserialize_to_defaults() {
        let env: OutgoingEnvelope = serde_json::from_value(serde_json::json!({
            "subject": "No one to send to"
        }))
        .unwrap();
        assert!(env.to.is_empty());
        assert!(env.validate().is_err());
    }
}
