// Copyright (c) 2025 TexasFortress.AI
// This Source Code Form is subject to the terms of the Mozilla Public
// License, v. 2.0. If a copy of the MPL was not distributed with this
// file, You can obtain one at http://mozilla.org/MPL/2.0/.

//! Turns raw RFC 822 bytes from a `UID FETCH` into a [`Message`].

use chrono::{DateTime, Utc};
use mail_parser::{Addr, HeaderValue, MimeHeaders};

use crate::imap::types::{AttachmentInfo, EmailAddress, Message};

/// Fetch attributes requested for every message. `BODY.PEEK[]` leaves the
/// `\Seen` flag untouched.
pub const FETCH_QUERY: &str = "(UID FLAGS INTERNALDATE RFC822.SIZE BODY.PEEK[])";

/// Parts of a fetch response that do not come from the message body.
#[derive(Debug, Clone, Default)]
pub struct FetchMeta {
    pub uid: u32,
    pub flags: Vec<String>,
    pub size: Option<u32>,
    pub internal_date: Option<DateTime<Utc>>,
}

pub fn parse_message(folder: &str, meta: FetchMeta, raw: &[u8]) -> Message {
    let seen = meta.flags.iter().any(|f| f.eq_ignore_ascii_case("\\Seen"));
    let mut message = Message {
        uid: meta.uid,
        folder: folder.to_string(),
        message_id: None,
        in_reply_to: None,
        references: Vec::new(),
        subject: None,
        from: Vec::new(),
        to: Vec::new(),
        cc: Vec::new(),
        reply_to: Vec::new(),
        date: meta.internal_date,
        flags: meta.flags,
        seen,
        size: meta.size,
        body_text: None,
        body_html: None,
        attachments: Vec::new(),
    };

    let Some(parsed) = mail_parser::Message::parse(raw) else {
        log::warn!("Could not parse message UID {} in {}", meta.uid, folder);
        return message;
    };

    message.message_id = parsed.message_id().map(str::to_string);
    message.in_reply_to = text_values(parsed.in_reply_to()).into_iter().next();
    message.references = text_values(parsed.references());
    message.subject = parsed.subject().map(str::to_string);
    message.from = addresses(parsed.from());
    message.to = addresses(parsed.to());
    message.cc = addresses(parsed.cc());
    message.reply_to = addresses(parsed.reply_to());
    if let Some(date) = parsed
        .date()
        .and_then(|d| DateTime::<Utc>::from_timestamp(d.to_timestamp(), 0))
    {
        message.date = Some(date);
    }
    message.body_text = parsed.body_text(0).map(|b| b.into_owned());
    message.body_html = parsed.body_html(0).map(|b| b.into_owned());
    message.attachments = parsed
        .attachments()
        .map(|part| AttachmentInfo {
            filename: part.attachment_name().map(str::to_string),
            content_type: part
                .content_type()
                .map(|ct| match ct.subtype() {
                    Some(sub) => format!("{}/{}", ct.c_type, sub),
                    None => ct.c_type.to_string(),
                })
                .unwrap_or_else(|| "application/octet-stream".to_string()),
            size: part.contents().len(),
        })
        .collect();

    message
}

fn to_address(addr: &Addr<'_>) -> Option<EmailAddress> {
    let address = addr.address.as_deref()?.trim();
    if address.is_empty() {
        return None;
    }
    Some(EmailAddress {
        name: addr.name.as_deref().map(str::to_string),
        address: address.to_string(),
    })
}

fn addresses(value: &HeaderValue<'_>) -> Vec<EmailAddress> {
    match value {
        HeaderValue::Address(addr) => to_address(addr).into_iter().collect(),
        HeaderValue::AddressList(list) => list.iter().filter_map(to_address).collect(),
        HeaderValue::Group(group) => group.addresses.iter().filter_map(to_address).collect(),
        HeaderValue::GroupList(groups) => groups
            .iter()
            .flat_map(|g| g.addresses.iter())
            .filter_map(to_address)
            .collect(),
        _ => Vec::new(),
    }
}

fn text_values(value: &HeaderValue<'_>) -> Vec<String> {
    match value {
        HeaderValue::Text(text) => vec![text.to_string()],
        HeaderValue::TextList(list) => list.iter().map(|t| t.to_string()).collect(),
        _ => Vec::new(),
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    const RAW: &str = "From: Alice Example <alice@example.com>\r\n\
To: a@example.com, Bob <bob@example.com>\r\n\
Cc: carol@example.com\r\n\
Reply-To: replies@example.com\r\n\
Subject: =?utf-8?q?Caf=C3=A9_plans?=\r\n\
Date: Tue, 01 Oct 2024 09:30:00 +0000\r\n\
Message-ID: <msg-2@example.com>\r\n\
In-Reply-To: <msg-1@example.com>\r\n\
References: <msg-0@example.com> <msg-1@example.com>\r\n\
MIME-Version: 1.0\r\n\
Content-Type: multipart/mixed; boundary=\"b1\"\r\n\
\r\n\
--b1\r\n\
Content-Type: text/plain; charset=utf-8\r\n\
\r\n\
See you at noon.\r\n\
--b1\r\n\
Content-Type: application/pdf; name=\"agenda.pdf\"\r\n\
Content-Disposition: attachment; filename=\"agenda.pdf\"\r\n\
Content-Transfer-Encoding: base64\r\n\
\r\n\
SGVsbG8=\r\n\
--b1--\r\n";

    fn meta(flags: &[&str]) -> FetchMeta {
        FetchMeta {
            uid: 42,
            flags: flags.iter().map(|f| f.to_string()).collect(),
            size: Some(RAW.len() as u32),
            internal_date: None,
        }
    }

    #[test]
    fn test_parse_headers_and_body() {
        let message = parse_message("INBOX", meta(&["\\Seen"]), RAW.as_bytes());

        assert_eq!(message.uid, 42);
        assert_eq!(message.folder, "INBOX");
        assert!(message.seen);
        assert_eq!(message.subject.as_deref(), Some("Café plans"));
        assert_eq!(message.from[0].address, "alice@example.com");
        assert_eq!(message.from[0].name.as_deref(), Some("Alice Example"));
        assert_eq!(message.to.len(), 2);
        assert_eq!(message.cc[0].address, "carol@example.com");
        assert_eq!(message.reply_to[0].address, "replies@example.com");
        assert_eq!(message.message_id.as_deref(), Some("msg-2@example.com"));
        assert_eq!(message.in_reply_to.as_deref(), Some("msg-1@example.com"));
        assert_eq!(message.references.len(), 2);
        assert_eq!(
            message.date.map(|d| d.to_rfc3339()),
            Some("2024-10-01T09:30:00+00:00".to_string())
        );
        assert!(message.body_text.unwrap().contains("See you at noon."));
    }

    #[test]
    fn test_attachment_metadata() {
        let message = parse_message("INBOX", meta(&[]), RAW.as_bytes());
        assert!(!message.seen);
        assert_eq!(message.attachments.len(), 1);
        let attachment = &message.attachments[0];
        assert_eq!(attachment.filename.as_deref(), Some("agenda.pdf"));
        assert_eq!(attachment.content_type, "application/pdf");
        assert_eq!(attachment.size, 5);
    }

    #[test]
    fn test_unparseable_body_keeps_fetch_data() {
        let mut fetch = meta(&["\\Flagged"]);
        fetch.internal_date = DateTime::<Utc>::from_timestamp(1_700_000_000, 0);
        let message = parse_message("Archive", fetch, b"");

        assert_eq!(message.uid, 42);
        assert_eq!(message.flags, vec!["\\Flagged".to_string()]);
        assert!(message.date.is_some());
        assert!(message.subject.is_none());
    }
}
