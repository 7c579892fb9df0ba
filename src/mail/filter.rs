// Copyright (c) 2025 TexasFortress.AI
// This Source Code Form is subject to the terms of the Mozilla Public
// License, v. 2.0. If a copy of the MPL was not distributed with this
// file, You can obtain one at http://mozilla.org/MPL/2.0/.

use chrono::{DateTime, Duration, NaiveDate, NaiveTime, Utc};
use serde::{Deserialize, Serialize};

use crate::imap::Message;

#[derive(Debug, Clone, Copy, Default, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum SortOrder {
    /// Server-native UID order.
    #[default]
    Asc,
    Desc,
}

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct PageRequest {
    pub offset: usize,
    pub limit: usize,
    pub order: SortOrder,
}

impl Default for PageRequest {
    fn default() -> Self {
        Self {
            offset: 0,
            limit: 50,
            order: SortOrder::Asc,
        }
    }
}

/// Selects messages in one folder. Both date bounds are inclusive.
#[derive(Debug, Clone, Default, PartialEq, Eq)]
pub struct MessageFilter {
    pub folder: String,
    pub since: Option<DateTime<Utc>>,
    pub until: Option<DateTime<Utc>>,
    pub unread: Option<bool>,
    pub from: Option<String>,
    pub subject: Option<String>,
}

/// Which end of a day a bare `YYYY-MM-DD` stands for.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum DayBound {
    Start,
    End,
}

/// Parses RFC 3339 or a bare date.
pub fn parse_date_bound(value: &str, bound: DayBound) -> Result<DateTime<Utc>, String> {
    let value = value.trim();
    if let Ok(dt) = DateTime::parse_from_rfc3339(value) {
        return Ok(dt.with_timezone(&Utc));
    }
    let date = NaiveDate::parse_from_str(value, "%Y-%m-%d")
        .map_err(|_| format!("'{}' is not an RFC 3339 timestamp or YYYY-MM-DD date", value))?;
    let time = match bound {
        DayBound::Start => NaiveTime::MIN,
        DayBound::End => NaiveTime::from_hms_milli_opt(23, 59, 59, 999).unwrap_or(NaiveTime::MIN),
    };
    Ok(date.and_time(time).and_utc())
}

fn imap_date(dt: DateTime<Utc>) -> String {
    dt.format("%d-%b-%Y").to_string()
}

/// Quoted IMAP string, or `None` when the value cannot be sent as one.
fn imap_quoted(value: &str) -> Option<String> {
    if !value.is_ascii() || value.contains(['\r', '\n']) {
        return None;
    }
    Some(format!("\"{}\"", value.replace('\\', "\\\\").replace('"', "\\\"")))
}

fn contains_ci(haystack: &str, needle: &str) -> bool {
    haystack.to_lowercase().contains(&needle.to_lowercase())
}

impl MessageFilter {
    pub fn folder(folder: impl Into<String>) -> Self {
        Self {
            folder: folder.into(),
            ..Default::default()
        }
    }

    pub fn check_range(&self) -> Result<(), String> {
        match (self.since, self.until) {
            (Some(since), Some(until)) if since > until => {
                Err("'since' must not be later than 'until'".to_string())
            }
            _ => Ok(()),
        }
    }

    /// Server-side `UID SEARCH` criteria.
    ///
    /// `SENTSINCE`/`SENTBEFORE` only have day granularity and ignore time
    /// zones, so the date window is widened here and narrowed exactly by
    /// [`MessageFilter::matches`]. Text criteria the server cannot take as a
    /// quoted ASCII string are left to the client-side check.
    pub fn imap_query(&self) -> String {
        let mut criteria: Vec<String> = Vec::new();

        // A bound at the edge of the representable range cannot be widened;
        // the criterion is dropped and `matches` still applies it.
        if let Some(since) = self.since.and_then(|d| d.checked_sub_signed(Duration::days(1))) {
            criteria.push(format!("SENTSINCE {}", imap_date(since)));
        }
        if let Some(until) = self.until.and_then(|d| d.checked_add_signed(Duration::days(2))) {
            criteria.push(format!("SENTBEFORE {}", imap_date(until)));
        }
        match self.unread {
            Some(true) => criteria.push("UNSEEN".to_string()),
            Some(false) => criteria.push("SEEN".to_string()),
            None => {}
        }
        if let Some(quoted) = self.from.as_deref().and_then(imap_quoted) {
            criteria.push(format!("FROM {}", quoted));
        }
        if let Some(quoted) = self.subject.as_deref().and_then(imap_quoted) {
            criteria.push(format!("SUBJECT {}", quoted));
        }

        if criteria.is_empty() {
            "ALL".to_string()
        } else {
            criteria.join(" ")
        }
    }

    /// Exact check on a fetched message. Messages without a date never match
    /// a date range.
    pub fn matches(&self, message: &Message) -> bool {
        if self.since.is_some() || self.until.is_some() {
            let Some(date) = message.date else {
                return false;
            };
            if self.since.is_some_and(|since| date < since) {
                return false;
            }
            if self.until.is_some_and(|until| date > until) {
                return false;
            }
        }

        if let Some(unread) = self.unread {
            if message.seen == unread {
                return false;
            }
        }

        if let Some(needle) = self.from.as_deref() {
            let hit = message.from.iter().any(|addr| {
                contains_ci(&addr.address, needle)
                    || addr.name.as_deref().is_some_and(|n| contains_ci(n, needle))
            });
            if !hit {
                return false;
            }
        }

        if let Some(needle) = self.subject.as_deref() {
            if !message.subject.as_deref().is_some_and(|s| contains_ci(s, needle)) {
                return false;
            }
        }

        true
    }
}
