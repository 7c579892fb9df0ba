// Copyright (c) 2025 TexasFortress.AI
// This Source Code Form is subject to the terms of the Mozilla Public
// License, v. 2.0. If a copy of the MPL was not distributed with this
// file, You can obtain one at http://mozilla.org/MPL/2.0/.

//! Reply and forward envelopes built from a fetched message.

use serde::{Deserialize, Serialize};
use validator::Validate;

use crate::accounts::Account;
use crate::api::validation::validators;
use crate::imap::{EmailAddress, Message};
use crate::smtp::{OutgoingAttachment, OutgoingEnvelope};

const REPLY_PREFIX: &str = "Re: ";
const FORWARD_PREFIX: &str = "Fwd: ";

#[derive(Debug, Clone, Default, Serialize, Deserialize, Validate)]
pub struct ReplyRequest {
    #[serde(default)]
    pub body: String,
    #[serde(default)]
    pub body_html: Option<String>,
    /// Also address the original `To` and `Cc` recipients.
    #[serde(default)]
    pub reply_all: bool,
    #[serde(default)]
    #[validate(custom(function = "validators::validate_address_list"))]
    pub cc: Vec<String>,
    #[serde(default)]
    #[validate(custom(function = "validators::validate_address_list"))]
    pub bcc: Vec<String>,
    #[serde(default)]
    #[validate(custom(function = "validators::validate_mailbox"))]
    pub from: Option<String>,
    #[serde(default)]
    #[validate(custom(function = "validators::validate_attachments"))]
    pub attachments: Vec<OutgoingAttachment>,
}

#[derive(Debug, Clone, Default, Serialize, Deserialize, Validate)]
pub struct ForwardRequest {
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
    /// Note placed above the forwarded message.
    #[serde(default)]
    pub body: String,
    #[serde(default)]
    #[validate(custom(function = "validators::validate_mailbox"))]
    pub from: Option<String>,
}

/// Adds `prefix` unless the subject already carries it (or, for forwards,
/// the short `Fw:` form).
pub fn prefixed_subject(prefix: &str, subject: Option<&str>) -> String {
    let subject = subject.unwrap_or("").trim();
    let lower = subject.to_lowercase();
    let marker = prefix.trim().to_lowercase();
    let already = lower.starts_with(&marker) || (marker == "fwd:" && lower.starts_with("fw:"));
    if already {
        subject.to_string()
    } else {
        format!("{}{}", prefix, subject)
    }
}

fn is_own_address(account: &Account, address: &str) -> bool {
    address.eq_ignore_ascii_case(account.sender()) || address.eq_ignore_ascii_case(&account.username)
}

fn push_unique(list: &mut Vec<String>, seen: &mut Vec<String>, address: &EmailAddress) {
    let key = address.address.to_lowercase();
    if !seen.contains(&key) {
        seen.push(key);
        list.push(address.to_string());
    }
}

fn describe(addresses: &[EmailAddress]) -> String {
    addresses.iter().map(|a| a.to_string()).collect::<Vec<_>>().join(", ")
}

fn original_text(original: &Message) -> &str {
    original.body_text.as_deref().unwrap_or("")
}

fn quoted(original: &Message) -> String {
    let author = original
        .from
        .first()
        .map(|a| a.to_string())
        .unwrap_or_else(|| "unknown sender".to_string());
    let header = match original.date {
        Some(date) => format!("On {}, {} wrote:", date.format("%a, %d %b %Y %H:%M UTC"), author),
        None => format!("{} wrote:", author),
    };
    let body: Vec<String> = original_text(original)
        .lines()
        .map(|line| if line.is_empty() { ">".to_string() } else { format!("> {}", line) })
        .collect();
    format!("{}\n{}", header, body.join("\n"))
}

/// Reply to `Reply-To` (or `From`), threading headers set, original quoted.
pub fn compose_reply(account: &Account, original: &Message, request: ReplyRequest) -> OutgoingEnvelope {
    let mut seen: Vec<String> = vec![account.sender().to_lowercase(), account.username.to_lowercase()];
    let mut to: Vec<String> = Vec::new();
    let mut cc: Vec<String> = Vec::new();

    let primary = if original.reply_to.is_empty() {
        &original.from
    } else {
        &original.reply_to
    };
    for address in primary.iter().filter(|a| !is_own_address(account, &a.address)) {
        push_unique(&mut to, &mut seen, address);
    }

    // Replying to a message this account sent goes back to its recipients.
    if to.is_empty() {
        for address in original.to.iter().filter(|a| !is_own_address(account, &a.address)) {
            push_unique(&mut to, &mut seen, address);
        }
    }

    if request.reply_all {
        for address in original.to.iter().chain(original.cc.iter()) {
            push_unique(&mut cc, &mut seen, address);
        }
    }
    cc.extend(request.cc);

    let mut references = original.references.clone();
    if let Some(id) = &original.message_id {
        if !references.contains(id) {
            references.push(id.clone());
        }
    }

    let body = if request.body.is_empty() {
        quoted(original)
    } else {
        format!("{}\n\n{}", request.body, quoted(original))
    };

    OutgoingEnvelope {
        to,
        cc,
        bcc: request.bcc,
        from: request.from,
        subject: prefixed_subject(REPLY_PREFIX, original.subject.as_deref()),
        body,
        body_html: request.body_html,
        attachments: request.attachments,
        in_reply_to: original.message_id.clone(),
        references,
    }
}

/// Forward with the original rendered as an inline block.
pub fn compose_forward(original: &Message, request: ForwardRequest) -> OutgoingEnvelope {
    let mut block = vec!["---------- Forwarded message ---------".to_string()];
    block.push(format!("From: {}", describe(&original.from)));
    if let Some(date) = original.date {
        block.push(format!("Date: {}", date.to_rfc2822()));
    }
    block.push(format!("Subject: {}", original.subject.as_deref().unwrap_or("")));
    block.push(format!("To: {}", describe(&original.to)));
    if !original.cc.is_empty() {
        block.push(format!("Cc: {}", describe(&original.cc)));
    }
    let forwarded = format!("{}\n\n{}", block.join("\n"), original_text(original));

    let body = if request.body.is_empty() {
        forwarded
    } else {
        format!("{}\n\n{}", request.body, forwarded)
    };

    OutgoingEnvelope {
        to: request.to,
        cc: request.cc,
        bcc: request.bcc,
        from: request.from,
        subject: prefixed_subject(FORWARD_PREFIX, original.subject.as_deref()),
        body,
        ..Default::default()
    }
}
