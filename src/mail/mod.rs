// Copyright (c) 2025 TexasFortress.AI
// This Source Code Form is subject to the terms of the Mozilla Public
// License, v. 2.0. If a copy of the MPL was not distributed with this
// file, You can obtain one at http://mozilla.org/MPL/2.0/.

//! Mailbox operations against an account's IMAP and SMTP servers.
//!
//! Every call is one connect / act / disconnect cycle. There is no pooling
//! and nothing is retried.

pub mod compose;
pub mod cursor;
pub mod filter;

use std::future::Future;

use async_trait::async_trait;
use log::{debug, info};
use serde::{Deserialize, Serialize};
use thiserror::Error;
use tokio::time::timeout;
use validator::{Validate, ValidationErrors};

use crate::accounts::Account;
use crate::config::MailSettings;
use crate::imap::{Folder, ImapConnection, ImapError, Message};
use crate::smtp::{DeliveryReceipt, OutgoingEnvelope, SmtpError, SmtpSender};

pub use compose::{compose_forward, compose_reply, prefixed_subject, ForwardRequest, ReplyRequest};
pub use cursor::{collect_page, BatchSource, MessagePage};
pub use filter::{parse_date_bound, DayBound, MessageFilter, PageRequest, SortOrder};

#[derive(Error, Debug)]
pub enum MailError {
    #[error("Invalid request: {0}")]
    Validation(#[from] ValidationErrors),

    #[error(transparent)]
    Imap(#[from] ImapError),

    #[error(transparent)]
    Smtp(#[from] SmtpError),
}

/// Arguments to `LIST`.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct FolderQuery {
    #[serde(default)]
    pub reference: String,
    #[serde(default = "default_pattern")]
    pub pattern: String,
}

fn default_pattern() -> String {
    "*".to_string()
}

impl Default for FolderQuery {
    fn default() -> Self {
        Self {
            reference: String::new(),
            pattern: default_pattern(),
        }
    }
}

#[async_trait]
pub trait MailClient: Send + Sync {
    async fn list_folders(&self, account: &Account, query: &FolderQuery) -> Result<Vec<Folder>, MailError>;

    async fn fetch_messages(
        &self,
        account: &Account,
        filter: &MessageFilter,
        page: &PageRequest,
    ) -> Result<MessagePage, MailError>;

    async fn fetch_message(&self, account: &Account, folder: &str, uid: u32) -> Result<Message, MailError>;

    /// Validates the envelope before any connection is opened.
    async fn send_message(&self, account: &Account, envelope: &OutgoingEnvelope) -> Result<DeliveryReceipt, MailError>;

    async fn create_folder(&self, account: &Account, name: &str) -> Result<(), MailError>;

    async fn rename_folder(&self, account: &Account, from: &str, to: &str) -> Result<(), MailError>;

    async fn delete_folder(&self, account: &Account, name: &str) -> Result<(), MailError>;

    async fn delete_message(&self, account: &Account, folder: &str, uid: u32) -> Result<(), MailError>;

    async fn move_message(&self, account: &Account, folder: &str, uid: u32, destination: &str)
        -> Result<(), MailError>;
}

/// Fetches batches from a folder already opened on `conn`.
struct ImapBatchSource<'a> {
    conn: &'a mut ImapConnection,
    folder: &'a str,
}

#[async_trait]
impl BatchSource for ImapBatchSource<'_> {
    async fn fetch_batch(&mut self, uids: &[u32]) -> Result<Vec<Message>, MailError> {
        Ok(self.conn.fetch_uids(self.folder, uids).await?)
    }
}

/// [`MailClient`] that talks to real servers.
pub struct RemoteMailClient {
    settings: MailSettings,
    smtp: SmtpSender,
}

impl RemoteMailClient {
    pub fn new(settings: MailSettings) -> Self {
        let smtp = SmtpSender::new(settings.connect_timeout(), settings.operation_timeout());
        Self { settings, smtp }
    }

    async fn connect(&self, account: &Account) -> Result<ImapConnection, MailError> {
        Ok(ImapConnection::connect(account, self.settings.connect_timeout()).await?)
    }

    async fn bounded<T, F>(&self, operation: &str, fut: F) -> Result<T, MailError>
    where
        F: Future<Output = Result<T, MailError>>,
    {
        match timeout(self.settings.operation_timeout(), fut).await {
            Ok(result) => result,
            Err(_) => Err(ImapError::Timeout(operation.to_string()).into()),
        }
    }
}

#[async_trait]
impl MailClient for RemoteMailClient {
    async fn list_folders(&self, account: &Account, query: &FolderQuery) -> Result<Vec<Folder>, MailError> {
        let mut conn = self.connect(account).await?;
        let result = self
            .bounded("list folders", async {
                conn.list_folders(&query.reference, &query.pattern)
                    .await
                    .map_err(MailError::from)
            })
            .await;
        conn.finish(result).await
    }

    async fn fetch_messages(
        &self,
        account: &Account,
        filter: &MessageFilter,
        page: &PageRequest,
    ) -> Result<MessagePage, MailError> {
        let batch_size = self.settings.fetch_batch_size;
        let mut conn = self.connect(account).await?;
        let result = self
            .bounded("fetch messages", async {
                conn.open_folder(&filter.folder, true).await?;
                let mut plan = conn.search_uids(&filter.imap_query()).await?;
                if page.order == SortOrder::Desc {
                    plan.reverse();
                }
                debug!("Search in {} matched {} UID(s)", filter.folder, plan.len());
                let mut source = ImapBatchSource {
                    conn: &mut conn,
                    folder: &filter.folder,
                };
                collect_page(&mut source, &plan, batch_size, filter, page).await
            })
            .await;
        conn.finish(result).await
    }

    async fn fetch_message(&self, account: &Account, folder: &str, uid: u32) -> Result<Message, MailError> {
        let mut conn = self.connect(account).await?;
        let result = self
            .bounded("fetch message", async {
                conn.open_folder(folder, true).await?;
                let message = conn.fetch_uids(folder, &[uid]).await?.into_iter().next();
                message.ok_or_else(|| {
                    MailError::from(ImapError::MessageNotFound {
                        folder: folder.to_string(),
                        uid,
                    })
                })
            })
            .await;
        conn.finish(result).await
    }

    async fn send_message(&self, account: &Account, envelope: &OutgoingEnvelope) -> Result<DeliveryReceipt, MailError> {
        envelope.validate()?;
        let receipt = self.smtp.send(account, envelope).await?;
        info!(
            "Message {} accepted for {} recipient(s)",
            receipt.message_id,
            receipt.recipients.len()
        );
        Ok(receipt)
    }

    async fn create_folder(&self, account: &Account, name: &str) -> Result<(), MailError> {
        let mut conn = self.connect(account).await?;
        let result = self
            .bounded("create folder", async { conn.create_folder(name).await.map_err(MailError::from) })
            .await;
        conn.finish(result).await
    }

    async fn rename_folder(&self, account: &Account, from: &str, to: &str) -> Result<(), MailError> {
        let mut conn = self.connect(account).await?;
        let result = self
            .bounded("rename folder", async { conn.rename_folder(from, to).await.map_err(MailError::from) })
            .await;
        conn.finish(result).await
    }

    async fn delete_folder(&self, account: &Account, name: &str) -> Result<(), MailError> {
        let mut conn = self.connect(account).await?;
        let result = self
            .bounded("delete folder", async { conn.delete_folder(name).await.map_err(MailError::from) })
            .await;
        conn.finish(result).await
    }

    async fn delete_message(&self, account: &Account, folder: &str, uid: u32) -> Result<(), MailError> {
        let mut conn = self.connect(account).await?;
        let result = self
            .bounded("delete message", async {
                conn.open_folder(folder, false).await?;
                conn.ensure_uid(folder, uid).await?;
                conn.delete_uid(uid).await.map_err(MailError::from)
            })
            .await;
        conn.finish(result).await
    }

    async fn move_message(
        &self,
        account: &Account,
        folder: &str,
        uid: u32,
        destination: &str,
    ) -> Result<(), MailError> {
        let mut conn = self.connect(account).await?;
        let result = self
            .bounded("move message", async {
                conn.open_folder(folder, false).await?;
                conn.ensure_uid(folder, uid).await?;
                conn.move_uid(uid, destination).await.map_err(MailError::from)
            })
            .await;
        conn.finish(result).await
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::accounts::NewAccount;
    use std::time::{Duration, Instant};

    fn unreachable_account() -> Account {
        NewAccount {
            imap_host: "127.0.0.1".to_string(),
            imap_port: Some(1),
            smtp_host: Some("127.0.0.1".to_string()),
            smtp_port: Some(1),
            username: "a@example.com".to_string(),
            secret: "x".to_string(),
            ..Default::default()
        }
        .into_account("acct".to_string(), chrono::Utc::now())
    }

    fn client() -> RemoteMailClient {
        RemoteMailClient::new(crate::config::test_settings().mail)
    }

    #[tokio::test]
    async fn test_send_without_recipients_fails_before_connecting() {
        let envelope = OutgoingEnvelope {
            subject: "No recipients".to_string(),
            body: "Hello".to_string(),
            ..Default::default()
        };

        let started = Instant::now();
        let err = client().send_message(&unreachable_account(), &envelope).await.unwrap_err();
        assert!(matches!(err, MailError::Validation(_)));
        assert!(started.elapsed() < Duration::from_secs(1));
    }

    #[tokio::test]
    async fn test_refused_connection_is_a_connection_error() {
        let err = client()
            .list_folders(&unreachable_account(), &FolderQuery::default())
            .await
            .unwrap_err();
        assert!(matches!(err, MailError::Imap(ImapError::Connection(_))));
    }

    #[test]
    fn test_folder_query_defaults() {
        let query: FolderQuery = serde_json::from_value(serde_json::json!({})).unwrap();
        assert_eq!(query, FolderQuery::default());
        assert_eq!(query.pattern, "*");
    }
}
