// Copyright (c) 2025 TexasFortress.AI
// This Source Code Form is subject to the terms of the Mozilla Public
// License, v. 2.0. If a copy of the MPL was not distributed with this
// file, You can obtain one at http://mozilla.org/MPL/2.0/.

//! Page assembly over a UID plan, fetching lazily in fixed-size batches.

use async_trait::async_trait;
use log::debug;
use serde::{Deserialize, Serialize};

use super::filter::{MessageFilter, PageRequest};
use super::MailError;
use crate::imap::Message;

/// Anything that can turn a slice of UIDs into messages.
#[async_trait]
pub trait BatchSource: Send {
    async fn fetch_batch(&mut self, uids: &[u32]) -> Result<Vec<Message>, MailError>;
}

#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct MessagePage {
    pub messages: Vec<Message>,
    pub offset: usize,
    pub limit: usize,
    /// UIDs returned by the server-side search, before exact filtering.
    pub candidates: usize,
    /// Some UIDs in the plan were not examined because the page filled up.
    pub has_more: bool,
}

/// Walks `plan` batch by batch, applying the exact filter, skipping `offset`
/// matches and stopping as soon as `limit` matches are collected.
pub async fn collect_page<S: BatchSource + ?Sized>(
    source: &mut S,
    plan: &[u32],
    batch_size: usize,
    filter: &MessageFilter,
    page: &PageRequest,
) -> Result<MessagePage, MailError> {
    let batch_size = batch_size.max(1);
    let mut messages = Vec::with_capacity(page.limit.min(plan.len()));
    let mut skipped = 0usize;
    let mut examined = 0usize;
    let mut batches = 0usize;

    'batches: for chunk in plan.chunks(batch_size) {
        if page.limit == 0 {
            break;
        }
        batches += 1;
        let fetched = source.fetch_batch(chunk).await?;
        for (position, message) in fetched.into_iter().enumerate() {
            if !filter.matches(&message) {
                continue;
            }
            if skipped < page.offset {
                skipped += 1;
                continue;
            }
            messages.push(message);
            if messages.len() == page.limit {
                examined += position + 1;
                break 'batches;
            }
        }
        examined += chunk.len();
    }

    debug!(
        "Collected {} message(s) from {} batch(es) over {} candidate UIDs",
        messages.len(),
        batches,
        plan.len()
    );

    Ok(MessagePage {
        has_more: messages.len() == page.limit && examined < plan.len(),
        messages,
        offset: page.offset,
        limit: page.limit,
        candidates: plan.len(),
    })
}
