// Copyright (c) 2025 TexasFortress.AI
// This Source Code Form is subject to the terms of the Mozilla Public
// License, v. 2.0. If a copy of the MPL was not distributed with this
// file, You can obtain one at http://mozilla.org/MPL/2.0/.

//! Outgoing mail over SMTP via lettre.

pub mod envelope;
pub mod sender;

use thiserror::Error;

pub use envelope::{DeliveryReceipt, OutgoingAttachment, OutgoingEnvelope};
pub use sender::{build_message, SmtpSender};

#[derive(Error, Debug)]
pub enum SmtpError {
    #[error("Account {0} has no SMTP server configured")]
    NotConfigured(String),

    #[error("Invalid address: {0}")]
    InvalidAddress(String),

    #[error("Invalid attachment: {0}")]
    InvalidAttachment(String),

    #[error("Email building error: {0}")]
    Build(#[from] lettre::error::Error),

    #[error("Email sending error: {0}")]
    Transport(#[from] lettre::transport::smtp::Error),

    #[error("Operation timed out: {0}")]
    Timeout(String),
}
