// Copyright (c) 2025 TexasFortress.AI
// This Source Code Form is subject to the terms of the Mozilla Public
// License, v. 2.0. If a copy of the MPL was not distributed with this
// file, You can obtain one at http://mozilla.org/MPL/2.0/.

use config::{Environment, File};
use log::warn;
use serde::{Deserialize, Serialize};
use std::env;
use std::time::Duration;
use thiserror::Error;

#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct ServerConfig {
    pub host: String,
    pub port: u16,
    /// Allowed CORS origins. Empty disables the CORS layer.
    #[serde(default)]
    pub cors_origins: Vec<String>,
    /// Worker threads; `None` lets actix pick one per core.
    #[serde(default)]
    pub workers: Option<usize>,
}

/// Operator credentials and token policy for the auth gate.
#[derive(Clone, Serialize, Deserialize)]
pub struct AuthSettings {
    pub username: String,
    pub password: String,
    pub signing_secret: String,
    pub token_ttl_secs: u64,
}

impl std::fmt::Debug for AuthSettings {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("AuthSettings")
            .field("username", &self.username)
            .field("password", &"[redacted]")
            .field("signing_secret", &"[redacted]")
            .field("token_ttl_secs", &self.token_ttl_secs)
            .finish()
    }
}

#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct MailSettings {
    pub connect_timeout_secs: u64,
    pub operation_timeout_secs: u64,
    pub fetch_batch_size: usize,
    pub max_page_size: usize,
}

impl MailSettings {
    pub fn connect_timeout(&self) -> Duration {
        Duration::from_secs(self.connect_timeout_secs)
    }

    pub fn operation_timeout(&self) -> Duration {
        Duration::from_secs(self.operation_timeout_secs)
    }
}

#[derive(Debug, Clone, Default, Serialize, Deserialize)]
pub struct AccountsConfig {
    /// JSON file backing the account store. In-memory only when unset.
    #[serde(default)]
    pub storage_path: Option<String>,
}

/// Seed account created at start-up when the store is empty.
#[derive(Clone, Default, Serialize, Deserialize)]
pub struct BootstrapAccount {
    #[serde(default)]
    pub imap_host: Option<String>,
    #[serde(default)]
    pub imap_port: Option<u16>,
    #[serde(default)]
    pub smtp_host: Option<String>,
    #[serde(default)]
    pub smtp_port: Option<u16>,
    #[serde(default)]
    pub username: Option<String>,
    #[serde(default)]
    pub secret: Option<String>,
}

impl std::fmt::Debug for BootstrapAccount {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("BootstrapAccount")
            .field("imap_host", &self.imap_host)
            .field("imap_port", &self.imap_port)
            .field("smtp_host", &self.smtp_host)
            .field("smtp_port", &self.smtp_port)
            .field("username", &self.username)
            .field("secret", &self.secret.as_ref().map(|_| "[redacted]"))
            .finish()
    }
}

impl BootstrapAccount {
    pub fn is_configured(&self) -> bool {
        self.imap_host.as_deref().is_some_and(|h| !h.is_empty())
            && self.username.as_deref().is_some_and(|u| !u.is_empty())
            && self.secret.as_deref().is_some_and(|s| !s.is_empty())
    }
}

#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct LogConfig {
    pub level: String,
}

#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct Settings {
    pub server: ServerConfig,
    pub auth: AuthSettings,
    pub mail: MailSettings,
    #[serde(default)]
    pub accounts: AccountsConfig,
    #[serde(default)]
    pub bootstrap: BootstrapAccount,
    pub log: LogConfig,
}

/// Well-known variables read without the `MAILGATE` prefix.
const DIRECT_ENV_VARS: &[(&str, &str)] = &[
    ("REST_HOST", "server.host"),
    ("REST_PORT", "server.port"),
    ("MAILGATE_API_USER", "auth.username"),
    ("MAILGATE_API_PASSWORD", "auth.password"),
    ("JWT_SECRET", "auth.signing_secret"),
    ("ACCOUNTS_FILE", "accounts.storage_path"),
    ("IMAP_SERVER", "bootstrap.imap_host"),
    ("IMAP_PORT", "bootstrap.imap_port"),
    ("IMAP_USERNAME", "bootstrap.username"),
    ("IMAP_PASSWORD", "bootstrap.secret"),
    ("SMTP_SERVER", "bootstrap.smtp_host"),
    ("SMTP_PORT", "bootstrap.smtp_port"),
];

const PORT_ENV_VARS: &[&str] = &["REST_PORT", "IMAP_PORT", "SMTP_PORT"];

impl Settings {
    pub fn new(config_path: Option<&str>) -> Result<Self, SettingsError> {
        let mut config_builder = config::Config::builder()
            .set_default("server.host", "127.0.0.1")?
            .set_default("server.port", 8080)?
            .set_default("auth.username", "admin")?
            .set_default("auth.password", "")?
            .set_default("auth.signing_secret", "")?
            .set_default("auth.token_ttl_secs", 3600)?
            .set_default("mail.connect_timeout_secs", 30)?
            .set_default("mail.operation_timeout_secs", 120)?
            .set_default("mail.fetch_batch_size", 10)?
            .set_default("mail.max_page_size", 100)?
            .set_default("log.level", "info")?;

        if let Some(path) = config_path {
            config_builder = config_builder.add_source(File::with_name(path));
        }

        // e.g. `MAILGATE_SERVER__PORT=9000` overrides `server.port`
        config_builder = config_builder.add_source(
            Environment::with_prefix("MAILGATE")
                .prefix_separator("_")
                .separator("__")
                .ignore_empty(true),
        );

        for (env_var, key) in DIRECT_ENV_VARS {
            let Ok(value) = env::var(env_var) else {
                continue;
            };
            if value.is_empty() {
                continue;
            }
            if PORT_ENV_VARS.contains(env_var) {
                match value.parse::<u16>() {
                    Ok(port) => config_builder = config_builder.set_override(*key, i64::from(port))?,
                    Err(_) => warn!("Invalid port value in {}: {}", env_var, value),
                }
            } else {
                config_builder = config_builder.set_override(*key, value)?;
            }
        }

        let settings: Settings = config_builder.build()?.try_deserialize()?;
        settings.validate()?;
        Ok(settings)
    }

    /// Rejects configurations the server cannot run safely with.
    pub fn validate(&self) -> Result<(), SettingsError> {
        if self.auth.signing_secret.trim().is_empty() {
            return Err(SettingsError::Invalid(
                "auth.signing_secret must be set (JWT_SECRET)".to_string(),
            ));
        }
        if self.auth.password.is_empty() {
            return Err(SettingsError::Invalid(
                "auth.password must be set (MAILGATE_API_PASSWORD)".to_string(),
            ));
        }
        if self.auth.token_ttl_secs == 0 {
            return Err(SettingsError::Invalid("auth.token_ttl_secs must be positive".to_string()));
        }
        if self.mail.fetch_batch_size == 0 || self.mail.max_page_size == 0 {
            return Err(SettingsError::Invalid(
                "mail.fetch_batch_size and mail.max_page_size must be positive".to_string(),
            ));
        }
        Ok(())
    }
}

#[derive(Error, Debug)]
pub enum SettingsError {
    #[error("Failed to load or parse configuration: {0}")]
    LoadError(#[from] config::ConfigError),
    #[error("Invalid configuration: {0}")]
    Invalid(String),
}

#[cfg(test)]
pub(crate) fn test_settings() -> Settings {
    Settings {
        server: ServerConfig {
            host: "127.0.0.1".to_string(),
            port: 8080,
            cors_origins: vec![],
            workers: None,
        },
        auth: AuthSettings {
            username: "operator".to_string(),
            password: "hunter2".to_string(),
            signing_secret: "test-signing-secret-0123456789abcdef".to_string(),
            token_ttl_secs: 3600,
        },
        mail: MailSettings {
            connect_timeout_secs: 5,
            operation_timeout_secs: 10,
            fetch_batch_size: 10,
            max_page_size: 100,
        },
        accounts: AccountsConfig::default(),
        bootstrap: BootstrapAccount::default(),
        log: LogConfig { level: "info".to_string() },
    }
}
