// Copyright (c) 2025 TexasFortress.AI
// This Source Code Form is subject to the terms of the Mozilla Public
// License, v. 2.0. If a copy of the MPL was not distributed with this
// file, You can obtain one at http://mozilla.org/MPL/2.0/.

//! Bearer token issuance and validation.
//!
//! Tokens are HS256 JWTs signed with the configured secret. A single operator
//! credential pair from configuration is the only principal.

use chrono::{DateTime, Utc};
use jsonwebtoken::errors::ErrorKind;
use jsonwebtoken::{decode, encode, Algorithm, DecodingKey, EncodingKey, Header, Validation};
use log::{debug, info, warn};
use serde::{Deserialize, Serialize};
use sha2::{Digest, Sha256};
use thiserror::Error;
use uuid::Uuid;

use crate::config::AuthSettings;

#[derive(Error, Debug, Clone, PartialEq, Eq)]
pub enum AuthError {
    #[error("Invalid username or password")]
    InvalidCredentials,
    #[error("Missing bearer token")]
    MissingToken,
    #[error("Token expired")]
    Expired,
    #[error("Invalid token: {0}")]
    InvalidToken(String),
    #[error("Failed to sign token: {0}")]
    Signing(String),
}

/// JWT claims.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct Claims {
    pub sub: String,
    pub iat: i64,
    pub exp: i64,
    pub jti: String,
}

/// Body of `POST /api/v1/auth/token`.
#[derive(Clone, Default, Deserialize)]
pub struct Credentials {
    #[serde(default)]
    pub username: String,
    #[serde(default)]
    pub password: String,
}

impl std::fmt::Debug for Credentials {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("Credentials")
            .field("username", &self.username)
            .field("password", &"[redacted]")
            .finish()
    }
}

#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct IssuedToken {
    pub access_token: String,
    pub token_type: String,
    pub expires_in: u64,
    pub expires_at: DateTime<Utc>,
}

/// The authenticated identity attached to a request.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct Principal {
    pub subject: String,
    pub expires_at: DateTime<Utc>,
}

fn digest(value: &str) -> [u8; 32] {
    Sha256::digest(value.as_bytes()).into()
}

pub struct AuthGate {
    username: String,
    username_digest: [u8; 32],
    password_digest: [u8; 32],
    encoding_key: EncodingKey,
    decoding_key: DecodingKey,
    ttl_secs: u64,
}

impl AuthGate {
    pub fn new(settings: &AuthSettings) -> Self {
        Self {
            username: settings.username.clone(),
            username_digest: digest(&settings.username),
            password_digest: digest(&settings.password),
            encoding_key: EncodingKey::from_secret(settings.signing_secret.as_bytes()),
            decoding_key: DecodingKey::from_secret(settings.signing_secret.as_bytes()),
            ttl_secs: settings.token_ttl_secs,
        }
    }

    /// Exchanges the operator credentials for a token.
    pub fn issue_token(&self, credentials: &Credentials) -> Result<IssuedToken, AuthError> {
        // Evaluate both so a wrong username costs the same as a wrong password.
        let user_ok = digest(&credentials.username) == self.username_digest;
        let pass_ok = digest(&credentials.password) == self.password_digest;
        if !(user_ok & pass_ok) {
            warn!("Rejected token request for user '{}'", credentials.username);
            return Err(AuthError::InvalidCredentials);
        }

        let now = Utc::now();
        let expires_at = now + chrono::Duration::seconds(self.ttl_secs as i64);
        let claims = Claims {
            sub: self.username.clone(),
            iat: now.timestamp(),
            exp: expires_at.timestamp(),
            jti: Uuid::new_v4().to_string(),
        };
        let token = self.sign(&claims)?;

        info!("Issued token {} for '{}', valid {}s", claims.jti, claims.sub, self.ttl_secs);
        Ok(IssuedToken {
            access_token: token,
            token_type: "Bearer".to_string(),
            expires_in: self.ttl_secs,
            expires_at,
        })
    }

    fn sign(&self, claims: &Claims) -> Result<String, AuthError> {
        encode(&Header::new(Algorithm::HS256), claims, &self.encoding_key)
            .map_err(|e| AuthError::Signing(e.to_string()))
    }

    /// Checks signature and expiry (no leeway).
    pub fn validate(&self, token: &str) -> Result<Principal, AuthError> {
        if token.trim().is_empty() {
            return Err(AuthError::MissingToken);
        }

        let mut validation = Validation::new(Algorithm::HS256);
        validation.leeway = 0;
        validation.set_required_spec_claims(&["exp", "iat", "sub"]);

        let data = decode::<Claims>(token, &self.decoding_key, &validation).map_err(|e| {
            debug!("Token rejected: {}", e);
            match e.kind() {
                ErrorKind::ExpiredSignature => AuthError::Expired,
                _ => AuthError::InvalidToken(e.to_string()),
            }
        })?;

        if data.claims.sub != self.username {
            return Err(AuthError::InvalidToken("unknown subject".to_string()));
        }

        let expires_at = DateTime::<Utc>::from_timestamp(data.claims.exp, 0)
            .ok_or_else(|| AuthError::InvalidToken("exp out of range".to_string()))?;
        Ok(Principal {
            subject: data.claims.sub,
            expires_at,
        })
    }
}

/// Pulls the token out of an `Authorization: Bearer <token>` header value.
pub fn bearer_token(header: Option<&str>) -> Result<&str, AuthError> {
    let value = header.ok_or(AuthError::MissingToken)?.trim();
    let (scheme, token) = value.split_once(' ').ok_or(AuthError::MissingToken)?;
    if !scheme.eq_ignore_ascii_case("Bearer") || token.trim().is_empty() {
        return Err(AuthError::MissingToken);
    }
    Ok(token.trim())
}
