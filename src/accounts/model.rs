// Copyright (c) 2025 TexasFortress.AI
// This Source Code Form is subject to the terms of the Mozilla Public
// License, v. 2.0. If a copy of the MPL was not distributed with this
// file, You can obtain one at http://mozilla.org/MPL/2.0/.

use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};
use validator::{Validate, ValidationError};

use crate::api::validation::validators;

pub const DEFAULT_IMAPS_PORT: u16 = 993;
pub const DEFAULT_SUBMISSION_PORT: u16 = 587;

/// A credential that is accepted on input but never echoed back.
///
/// It serialises only so the account file can persist it; API responses use
/// [`AccountView`], which has no secret field at all.
#[derive(Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(transparent)]
pub struct Secret(String);

impl Secret {
    pub fn new(value: impl Into<String>) -> Self {
        Self(value.into())
    }

    pub fn expose(&self) -> &str {
        &self.0
    }
}

impl std::fmt::Debug for Secret {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.write_str("[redacted]")
    }
}

/// Stored mailbox configuration.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct Account {
    pub id: String,
    pub label: String,
    pub imap_host: String,
    pub imap_port: u16,
    pub imap_tls: bool,
    #[serde(default)]
    pub smtp_host: Option<String>,
    #[serde(default)]
    pub smtp_port: Option<u16>,
    #[serde(default = "default_true")]
    pub smtp_tls: bool,
    pub username: String,
    pub secret: Secret,
    #[serde(default)]
    pub sender_address: Option<String>,
    pub created_at: DateTime<Utc>,
    pub updated_at: DateTime<Utc>,
}

impl Account {
    /// Address used in `From:` when the envelope does not override it.
    pub fn sender(&self) -> &str {
        self.sender_address.as_deref().unwrap_or(&self.username)
    }

    pub fn view(&self) -> AccountView {
        AccountView::from(self)
    }

    fn from_new(id: String, input: NewAccount, now: DateTime<Utc>) -> Self {
        let smtp_host = input.smtp_host.filter(|h| !h.trim().is_empty());
        let smtp_port = smtp_host
            .as_ref()
            .map(|_| input.smtp_port.unwrap_or(DEFAULT_SUBMISSION_PORT));
        let username = input.username.trim().to_string();
        let label = input
            .label
            .map(|l| l.trim().to_string())
            .filter(|l| !l.is_empty())
            .unwrap_or_else(|| username.clone());

        Self {
            id,
            label,
            imap_host: input.imap_host.trim().to_string(),
            imap_port: input.imap_port.unwrap_or(DEFAULT_IMAPS_PORT),
            imap_tls: input.imap_tls,
            smtp_host,
            smtp_port,
            smtp_tls: input.smtp_tls,
            username,
            secret: Secret::new(input.secret),
            sender_address: input.sender_address.filter(|s| !s.trim().is_empty()),
            created_at: now,
            updated_at: now,
        }
    }
}

/// Public projection of an [`Account`]. Carries no credential.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct AccountView {
    pub id: String,
    pub label: String,
    pub imap_host: String,
    pub imap_port: u16,
    pub imap_tls: bool,
    pub smtp_host: Option<String>,
    pub smtp_port: Option<u16>,
    pub smtp_tls: bool,
    pub username: String,
    pub sender_address: Option<String>,
    pub created_at: DateTime<Utc>,
    pub updated_at: DateTime<Utc>,
}

impl From<&Account> for AccountView {
    fn from(account: &Account) -> Self {
        Self {
            id: account.id.clone(),
            label: account.label.clone(),
            imap_host: account.imap_host.clone(),
            imap_port: account.imap_port,
            imap_tls: account.imap_tls,
            smtp_host: account.smtp_host.clone(),
            smtp_port: account.smtp_port,
            smtp_tls: account.smtp_tls,
            username: account.username.clone(),
            sender_address: account.sender_address.clone(),
            created_at: account.created_at,
            updated_at: account.updated_at,
        }
    }
}

fn default_true() -> bool {
    true
}

/// Account creation request.
///
/// Every field has a serde default so that a missing field surfaces as a
/// field-level validation error rather than an opaque parse failure.
#[derive(Clone, Default, Deserialize, Validate)]
#[validate(schema(function = "validate_smtp_endpoint", skip_on_field_errors = false))]
pub struct NewAccount {
    #[serde(default)]
    #[validate(length(max = 100))]
    pub label: Option<String>,

    #[serde(default, alias = "host")]
    #[validate(custom(function = "validators::validate_host"))]
    pub imap_host: String,

    #[serde(default, alias = "port")]
    #[validate(required, range(min = 1))]
    pub imap_port: Option<u16>,

    #[serde(default = "default_true")]
    pub imap_tls: bool,

    #[serde(default)]
    #[validate(custom(function = "validators::validate_host"))]
    pub smtp_host: Option<String>,

    #[serde(default)]
    #[validate(range(min = 1))]
    pub smtp_port: Option<u16>,

    #[serde(default = "default_true")]
    pub smtp_tls: bool,

    #[serde(default, alias = "user")]
    #[validate(custom(function = "validators::validate_username"))]
    pub username: String,

    #[serde(default, alias = "password")]
    #[validate(length(min = 1, message = "secret is required"))]
    pub secret: String,

    #[serde(default)]
    #[validate(email)]
    pub sender_address: Option<String>,
}

impl std::fmt::Debug for NewAccount {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("NewAccount")
            .field("label", &self.label)
            .field("imap_host", &self.imap_host)
            .field("imap_port", &self.imap_port)
            .field("smtp_host", &self.smtp_host)
            .field("username", &self.username)
            .field("secret", &"[redacted]")
            .finish()
    }
}

impl NewAccount {
    pub(crate) fn into_account(self, id: String, now: DateTime<Utc>) -> Account {
        Account::from_new(id, self, now)
    }
}

fn validate_smtp_endpoint(input: &NewAccount) -> Result<(), ValidationError> {
    let has_host = input.smtp_host.as_deref().is_some_and(|h| !h.trim().is_empty());
    if input.smtp_port.is_some() && !has_host {
        let mut err = ValidationError::new("smtp_port_without_host");
        err.message = Some("smtp_port was given without smtp_host".into());
        return Err(err);
    }
    Ok(())
}

/// Partial update. Absent fields keep their stored value; `smtp_host: ""`
/// removes the SMTP endpoint.
#[derive(Clone, Default, Deserialize)]
pub struct AccountPatch {
    #[serde(default)]
    pub label: Option<String>,
    #[serde(default, alias = "host")]
    pub imap_host: Option<String>,
    #[serde(default, alias = "port")]
    pub imap_port: Option<u16>,
    #[serde(default)]
    pub imap_tls: Option<bool>,
    #[serde(default)]
    pub smtp_host: Option<String>,
    #[serde(default)]
    pub smtp_port: Option<u16>,
    #[serde(default)]
    pub smtp_tls: Option<bool>,
    #[serde(default, alias = "user")]
    pub username: Option<String>,
    #[serde(default, alias = "password")]
    pub secret: Option<String>,
    #[serde(default)]
    pub sender_address: Option<String>,
}

impl std::fmt::Debug for AccountPatch {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("AccountPatch")
            .field("label", &self.label)
            .field("imap_host", &self.imap_host)
            .field("imap_port", &self.imap_port)
            .field("smtp_host", &self.smtp_host)
            .field("username", &self.username)
            .field("secret", &self.secret.as_ref().map(|_| "[redacted]"))
            .finish()
    }
}

impl AccountPatch {
    /// Rebuilds a full creation request from the stored account plus this
    /// patch, so the merged result goes through the same validation.
    pub(crate) fn merge_into(self, current: &Account) -> NewAccount {
        let smtp_host = match self.smtp_host {
            Some(host) if host.trim().is_empty() => None,
            Some(host) => Some(host),
            None => current.smtp_host.clone(),
        };
        let smtp_port = if smtp_host.is_some() {
            self.smtp_port.or(current.smtp_port)
        } else {
            self.smtp_port
        };
        let sender_address = match self.sender_address {
            Some(addr) if addr.trim().is_empty() => None,
            Some(addr) => Some(addr),
            None => current.sender_address.clone(),
        };

        NewAccount {
            label: Some(self.label.unwrap_or_else(|| current.label.clone())),
            imap_host: self.imap_host.unwrap_or_else(|| current.imap_host.clone()),
            imap_port: Some(self.imap_port.unwrap_or(current.imap_port)),
            imap_tls: self.imap_tls.unwrap_or(current.imap_tls),
            smtp_host,
            smtp_port,
            smtp_tls: self.smtp_tls.unwrap_or(current.smtp_tls),
            username: self.username.unwrap_or_else(|| current.username.clone()),
            secret: self
                .secret
                .unwrap_or_else(|| current.secret.expose().to_string()),
            sender_address,
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    fn scenario_input() -> NewAccount {
        serde_json::from_value(serde_json::json!({
            "host": "imap.example.com",
            "port": 993,
            "user": "a@example.com",
            "secret": "x"
        }))
        .unwrap()
    }

    #[test]
    fn test_aliases_and_defaults() {
        let input = scenario_input();
        assert!(input.validate().is_ok());

        let account = input.into_account("id-1".to_string(), Utc::now());
        assert_eq!(account.imap_host, "imap.example.com");
        assert_eq!(account.imap_port, 993);
        assert_eq!(account.username, "a@example.com");
        assert_eq!(account.label, "a@example.com");
        assert!(account.imap_tls);
        assert_eq!(account.smtp_port, None);
    }

    #[test]
    fn test_view_has_no_secret() {
        let account = scenario_input().into_account("id-1".to_string(), Utc::now());
        let json = serde_json::to_value(account.view()).unwrap();
        let obj = json.as_object().unwrap();
        assert!(!obj.contains_key("secret"));
        assert!(!json.to_string().contains("\"x\""));
    }

    #[test]
    fn test_secret_debug_is_redacted() {
        let account = scenario_input().into_account("id-1".to_string(), Utc::now());
        assert!(!format!("{:?}", account).contains("secret: \"x\""));
        assert_eq!(format!("{:?}", account.secret), "[redacted]");
    }

    #[test]
    fn test_missing_required_fields() {
        let input: NewAccount = serde_json::from_value(serde_json::json!({})).unwrap();
        let errors = input.validate().unwrap_err();
        let fields = errors.field_errors();
        assert!(fields.contains_key("imap_host"));
        assert!(fields.contains_key("imap_port"));
        assert!(fields.contains_key("username"));
        assert!(fields.contains_key("secret"));
    }

    #[test]
    fn test_blank_username_rejected() {
        let mut input = scenario_input();
        input.username = "   ".to_string();
        let errors = input.validate().unwrap_err();
        assert!(errors.field_errors().contains_key("username"));

        input.username = "  a@example.com ".to_string();
        assert!(input.validate().is_ok());
    }

    #[test]
    fn test_malformed_host_and_port() {
        let mut input = scenario_input();
        input.imap_host = "imap example.com".to_string();
        input.imap_port = Some(0);
        let errors = input.validate().unwrap_err();
        let fields = errors.field_errors();
        assert!(fields.contains_key("imap_host"));
        assert!(fields.contains_key("imap_port"));
    }

    #[test]
    fn test_smtp_port_requires_host() {
        let mut input = scenario_input();
        input.smtp_port = Some(587);
        assert!(input.validate().is_err());

        input.smtp_host = Some("smtp.example.com".to_string());
        assert!(input.validate().is_ok());
    }

    #[test]
    fn test_smtp_port_defaults_when_host_given() {
        let mut input = scenario_input();
        input.smtp_host = Some("smtp.example.com".to_string());
        let account = input.into_account("id".to_string(), Utc::now());
        assert_eq!(account.smtp_port, Some(DEFAULT_SUBMISSION_PORT));
    }

    #[test]
    fn test_patch_merge_keeps_unspecified_fields() {
        let mut input = scenario_input();
        input.smtp_host = Some("smtp.example.com".to_string());
        let account = input.into_account("id".to_string(), Utc::now());

        let patch = AccountPatch {
            label: Some("Work".to_string()),
            smtp_host: Some(String::new()),
            ..Default::default()
        };
        let merged = patch.merge_into(&account);
        assert_eq!(merged.label.as_deref(), Some("Work"));
        assert_eq!(merged.imap_host, "imap.example.com");
        assert_eq!(merged.secret, "x");
        assert_eq!(merged.smtp_host, None);
        assert_eq!(merged.smtp_port, None);
        assert!(merged.validate().is_ok());
    }
}
