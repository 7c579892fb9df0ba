// Copyright (c) 2025 TexasFortress.AI
// This Source Code Form is subject to the terms of the Mozilla Public
// License, v. 2.0. If a copy of the MPL was not distributed with this
// file, You can obtain one at http://mozilla.org/MPL/2.0/.

use std::path::{Path, PathBuf};
use std::sync::Arc;

use chrono::Utc;
use log::{debug, info, warn};
use serde::{Deserialize, Serialize};
use thiserror::Error;
use tokio::fs as async_fs;
use tokio::io::AsyncWriteExt;
use tokio::sync::RwLock;
use uuid::Uuid;
use validator::{Validate, ValidationErrors};

use super::model::{Account, AccountPatch, NewAccount};
use crate::config::BootstrapAccount;

#[derive(Error, Debug)]
pub enum AccountStoreError {
    #[error("Invalid account: {0}")]
    Validation(#[from] ValidationErrors),
    #[error("Account not found: {0}")]
    NotFound(String),
    #[error("IO error: {0}")]
    IoError(#[from] std::io::Error),
    #[error("Serialization error: {0}")]
    SerializationError(#[from] serde_json::Error),
}

/// On-disk layout of the accounts file.
#[derive(Debug, Clone, Serialize, Deserialize)]
struct AccountsFile {
    #[serde(default = "default_version")]
    version: String,
    #[serde(default)]
    accounts: Vec<Account>,
}

fn default_version() -> String {
    "1.0".to_string()
}

/// Registry of configured mailboxes.
///
/// Cloning is cheap and every clone shares the same list. All mutations take
/// the write lock for the whole operation, including the file write, so two
/// concurrent updates can never interleave.
#[derive(Clone)]
pub struct AccountStore {
    accounts: Arc<RwLock<Vec<Account>>>,
    storage_path: Option<PathBuf>,
}

impl AccountStore {
    /// Store that lives only as long as the process.
    pub fn in_memory() -> Self {
        Self {
            accounts: Arc::new(RwLock::new(Vec::new())),
            storage_path: None,
        }
    }

    /// Store backed by a JSON file. A missing file starts an empty store; it
    /// is created on the first mutation.
    pub async fn open<P: AsRef<Path>>(path: P) -> Result<Self, AccountStoreError> {
        let path = path.as_ref().to_path_buf();
        let accounts = if async_fs::try_exists(&path).await? {
            let contents = async_fs::read_to_string(&path).await?;
            let file: AccountsFile = serde_json::from_str(&contents)?;
            info!("Loaded {} accounts from {:?}", file.accounts.len(), path);
            file.accounts
        } else {
            info!("No accounts file at {:?}, starting empty", path);
            Vec::new()
        };

        Ok(Self {
            accounts: Arc::new(RwLock::new(accounts)),
            storage_path: Some(path),
        })
    }

    /// Validates and stores a new account under a fresh id.
    pub async fn add(&self, input: NewAccount) -> Result<Account, AccountStoreError> {
        input.validate()?;

        let account = input.into_account(Uuid::new_v4().to_string(), Utc::now());
        let mut accounts = self.accounts.write().await;
        accounts.push(account.clone());
        if let Err(e) = self.persist(&accounts).await {
            accounts.pop();
            return Err(e);
        }

        info!("Added account {} ({})", account.id, account.imap_host);
        Ok(account)
    }

    /// Accounts in insertion order.
    pub async fn list(&self) -> Vec<Account> {
        self.accounts.read().await.clone()
    }

    pub async fn get(&self, id: &str) -> Result<Account, AccountStoreError> {
        self.accounts
            .read()
            .await
            .iter()
            .find(|a| a.id == id)
            .cloned()
            .ok_or_else(|| AccountStoreError::NotFound(id.to_string()))
    }

    /// Applies a partial update. The merged account is validated as a whole.
    pub async fn update(&self, id: &str, patch: AccountPatch) -> Result<Account, AccountStoreError> {
        let mut accounts = self.accounts.write().await;
        let index = accounts
            .iter()
            .position(|a| a.id == id)
            .ok_or_else(|| AccountStoreError::NotFound(id.to_string()))?;

        let previous = accounts[index].clone();
        let merged = patch.merge_into(&previous);
        merged.validate()?;

        let mut updated = merged.into_account(previous.id.clone(), Utc::now());
        updated.created_at = previous.created_at;
        accounts[index] = updated.clone();

        if let Err(e) = self.persist(&accounts).await {
            accounts[index] = previous;
            return Err(e);
        }

        info!("Updated account {}", id);
        Ok(updated)
    }

    /// Deletes an account and returns its id.
    pub async fn remove(&self, id: &str) -> Result<String, AccountStoreError> {
        let mut accounts = self.accounts.write().await;
        let index = accounts
            .iter()
            .position(|a| a.id == id)
            .ok_or_else(|| AccountStoreError::NotFound(id.to_string()))?;

        let removed = accounts.remove(index);
        if let Err(e) = self.persist(&accounts).await {
            accounts.insert(index, removed);
            return Err(e);
        }

        info!("Removed account {}", id);
        Ok(removed.id)
    }

    /// Seeds one account from start-up configuration when the store is empty.
    /// Returns the seeded account, if any.
    pub async fn seed(&self, bootstrap: &BootstrapAccount) -> Result<Option<Account>, AccountStoreError> {
        if !bootstrap.is_configured() {
            return Ok(None);
        }
        if !self.accounts.read().await.is_empty() {
            debug!("Account store not empty, skipping bootstrap account");
            return Ok(None);
        }

        let input = NewAccount {
            imap_host: bootstrap.imap_host.clone().unwrap_or_default(),
            imap_port: Some(bootstrap.imap_port.unwrap_or(super::model::DEFAULT_IMAPS_PORT)),
            imap_tls: true,
            smtp_host: bootstrap.smtp_host.clone(),
            smtp_port: bootstrap.smtp_port,
            smtp_tls: true,
            username: bootstrap.username.clone().unwrap_or_default(),
            secret: bootstrap.secret.clone().unwrap_or_default(),
            ..Default::default()
        };

        match self.add(input).await {
            Ok(account) => Ok(Some(account)),
            Err(AccountStoreError::Validation(e)) => {
                warn!("Ignoring invalid bootstrap account: {}", e);
                Ok(None)
            }
            Err(e) => Err(e),
        }
    }

    /// Atomic write: temp file, restrictive permissions, rename.
    async fn persist(&self, accounts: &[Account]) -> Result<(), AccountStoreError> {
        let Some(path) = &self.storage_path else {
            return Ok(());
        };

        let file = AccountsFile {
            version: default_version(),
            accounts: accounts.to_vec(),
        };
        let json = serde_json::to_string_pretty(&file)?;

        if let Some(parent) = path.parent().filter(|p| !p.as_os_str().is_empty()) {
            async_fs::create_dir_all(parent).await?;
        }

        let temp_path = path.with_extension("tmp");
        let mut temp = create_private(&temp_path).await?;
        temp.write_all(json.as_bytes()).await?;
        temp.sync_all().await?;
        drop(temp);

        async_fs::rename(&temp_path, path).await?;
        debug!("Saved {} accounts to {:?}", accounts.len(), path);
        Ok(())
    }
}

/// Creates `path` afresh, readable by the owner only from the first byte.
async fn create_private(path: &Path) -> std::io::Result<async_fs::File> {
    match async_fs::remove_file(path).await {
        Err(e) if e.kind() != std::io::ErrorKind::NotFound => return Err(e),
        _ => {}
    }

    let mut options = async_fs::OpenOptions::new();
    options.write(true).create_new(true);
    #[cfg(unix)]
    options.mode(0o600);
    options.open(path).await
}
