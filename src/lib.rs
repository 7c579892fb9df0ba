// Copyright (c) 2025 TexasFortress.AI
// This Source Code Form is subject to the terms of the Mozilla Public
// License, v. 2.0. If a copy of the MPL was not distributed with this
// file, You can obtain one at http://mozilla.org/MPL/2.0/.

//! Library core for mailgate: an authenticated REST front end for IMAP and
//! SMTP mailboxes.

// The OpenAPI schema document is one large `json!` literal.
#![recursion_limit = "256"]

pub mod accounts;
pub mod api;
pub mod auth;
pub mod config;
pub mod imap;
pub mod mail;
pub mod smtp;
pub mod utils;

pub mod prelude {
    pub use crate::accounts::{Account, AccountStore, AccountView, NewAccount};
    pub use crate::api::{AppState, ApiError};
    pub use crate::auth::{AuthGate, Principal};
    pub use crate::config::Settings;
    pub use crate::imap::{Folder, ImapError, Message};
    pub use crate::mail::{MailClient, MailError, MessageFilter, PageRequest, RemoteMailClient};
    pub use crate::smtp::{DeliveryReceipt, OutgoingEnvelope};
}
