// Copyright (c) 2025 TexasFortress.AI
// This Source Code Form is subject to the terms of the Mozilla Public
// License, v. 2.0. If a copy of the MPL was not distributed with this
// file, You can obtain one at http://mozilla.org/MPL/2.0/.

//! Error handling for the REST API.
//!
//! Every layer's error converts into [`ApiError`], which renders the
//! standard JSON error body with a stable code and HTTP status.

use actix_web::{
    error::{JsonPayloadError, PathError, QueryPayloadError, ResponseError},
    http::StatusCode,
    HttpRequest, HttpResponse,
};
use serde::{Deserialize, Serialize};
use thiserror::Error;

use crate::{
    accounts::AccountStoreError,
    auth::AuthError,
    imap::ImapError,
    mail::MailError,
    smtp::SmtpError,
};

/// Standardized error response format
#[derive(Debug, Serialize, Deserialize)]
pub struct ErrorResponse {
    /// Error code for programmatic handling
    pub code: String,
    /// Human-readable error message
    pub message: String,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub details: Option<ErrorDetails>,
    pub timestamp: chrono::DateTime<chrono::Utc>,
}

#[derive(Debug, Serialize, Deserialize)]
pub struct ErrorDetails {
    #[serde(skip_serializing_if = "Option::is_none")]
    pub validation_errors: Option<Vec<ValidationError>>,
    /// Suggested actions to resolve the error
    #[serde(skip_serializing_if = "Option::is_none")]
    pub suggestions: Option<Vec<String>>,
}

/// Field-specific validation error
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct ValidationError {
    pub field: String,
    pub message: String,
    /// Validation constraint that failed (e.g., "required", "length")
    #[serde(skip_serializing_if = "Option::is_none")]
    pub constraint: Option<String>,
}

#[derive(Debug, Error)]
pub enum ApiError {
    // === 401 ===
    #[error("Authentication failed: {reason}")]
    Authentication { reason: String },

    // === 400 ===
    #[error("Validation failed: {message}")]
    ValidationFailed {
        message: String,
        errors: Vec<ValidationError>,
    },

    #[error("Invalid request: {message}")]
    BadRequest { message: String },

    // === 404 ===
    #[error("Not found: {resource}")]
    NotFound { resource: String },

    // === 502, 504 ===
    #[error("Mail server error: {message}")]
    Connection { message: String },

    #[error("Mail server timed out: {operation}")]
    GatewayTimeout { operation: String },

    // === 500 ===
    #[error("Internal server error: {message}")]
    InternalError { message: String },
}

impl ApiError {
    pub fn code(&self) -> &'static str {
        match self {
            ApiError::Authentication { .. } => "AUTHENTICATION_ERROR",
            ApiError::ValidationFailed { .. } | ApiError::BadRequest { .. } => "VALIDATION_ERROR",
            ApiError::NotFound { .. } => "NOT_FOUND",
            ApiError::Connection { .. } => "CONNECTION_ERROR",
            ApiError::GatewayTimeout { .. } => "GATEWAY_TIMEOUT",
            ApiError::InternalError { .. } => "INTERNAL_ERROR",
        }
    }

    pub fn suggestions(&self) -> Option<Vec<String>> {
        match self {
            ApiError::Authentication { .. } => Some(vec![
                "Obtain a token from POST /api/v1/auth/token".to_string(),
                "Send it as 'Authorization: Bearer <token>'".to_string(),
            ]),
            ApiError::ValidationFailed { .. } => Some(vec![
                "Review the validation errors for each field".to_string(),
            ]),
            ApiError::Connection { .. } => Some(vec![
                "Check the account's server settings and credentials".to_string(),
            ]),
            _ => None,
        }
    }

    pub fn bad_request(message: impl Into<String>) -> Self {
        ApiError::BadRequest { message: message.into() }
    }

    /// A single-field validation failure.
    pub fn invalid_field(field: &str, message: impl Into<String>) -> Self {
        let message = message.into();
        ApiError::ValidationFailed {
            message: message.clone(),
            errors: vec![ValidationError {
                field: field.to_string(),
                message,
                constraint: None,
            }],
        }
    }
}

impl ResponseError for ApiError {
    fn status_code(&self) -> StatusCode {
        match self {
            ApiError::Authentication { .. } => StatusCode::UNAUTHORIZED,
            ApiError::ValidationFailed { .. } | ApiError::BadRequest { .. } => StatusCode::BAD_REQUEST,
            ApiError::NotFound { .. } => StatusCode::NOT_FOUND,
            ApiError::Connection { .. } => StatusCode::BAD_GATEWAY,
            ApiError::GatewayTimeout { .. } => StatusCode::GATEWAY_TIMEOUT,
            ApiError::InternalError { .. } => StatusCode::INTERNAL_SERVER_ERROR,
        }
    }

    fn error_response(&self) -> HttpResponse {
        let status = self.status_code();

        match status.as_u16() {
            400..=499 => log::warn!("Client error: {} ({})", self, status),
            500..=599 => log::error!("Server error: {} ({})", self, status),
            _ => log::info!("API response: {} ({})", self, status),
        }

        let details = ErrorDetails {
            validation_errors: match self {
                ApiError::ValidationFailed { errors, .. } => Some(errors.to_vec()),
                _ => None,
            },
            suggestions: self.suggestions(),
        };

        let error_response = ErrorResponse {
            code: self.code().to_string(),
            message: self.to_string(),
            details: if details.validation_errors.is_some() || details.suggestions.is_some() {
                Some(details)
            } else {
                None
            },
            timestamp: chrono::Utc::now(),
        };

        HttpResponse::build(status).json(error_response)
    }
}

// === Type Conversions ===

impl From<validator::ValidationErrors> for ApiError {
    fn from(errors: validator::ValidationErrors) -> Self {
        let mut validation_errors: Vec<ValidationError> = errors
            .field_errors()
            .iter()
            .flat_map(|(field, field_errors)| {
                field_errors.iter().map(|e| ValidationError {
                    field: field.to_string(),
                    message: e
                        .message
                        .as_ref()
                        .map(|m| m.to_string())
                        .unwrap_or_else(|| e.code.to_string()),
                    constraint: Some(e.code.to_string()),
                })
            })
            .collect();
        validation_errors.sort_by(|a, b| a.field.cmp(&b.field));

        ApiError::ValidationFailed {
            message: "Request validation failed".to_string(),
            errors: validation_errors,
        }
    }
}

impl From<AccountStoreError> for ApiError {
    fn from(err: AccountStoreError) -> Self {
        match err {
            AccountStoreError::Validation(errors) => errors.into(),
            AccountStoreError::NotFound(id) => ApiError::NotFound {
                resource: format!("account '{}'", id),
            },
            other => ApiError::InternalError { message: other.to_string() },
        }
    }
}

impl From<AuthError> for ApiError {
    fn from(err: AuthError) -> Self {
        match err {
            AuthError::Signing(message) => ApiError::InternalError { message },
            other => ApiError::Authentication { reason: other.to_string() },
        }
    }
}

impl From<ImapError> for ApiError {
    fn from(err: ImapError) -> Self {
        match err {
            ImapError::FolderNotFound(folder) => ApiError::NotFound {
                resource: format!("folder '{}'", folder),
            },
            ImapError::MessageNotFound { folder, uid } => ApiError::NotFound {
                resource: format!("message {} in '{}'", uid, folder),
            },
            ImapError::Timeout(operation) => ApiError::GatewayTimeout { operation },
            // Remote login failures are a connection problem, never a 401:
            // the caller's own token was valid.
            other => ApiError::Connection { message: other.to_string() },
        }
    }
}

impl From<SmtpError> for ApiError {
    fn from(err: SmtpError) -> Self {
        match err {
            SmtpError::NotConfigured(_) | SmtpError::InvalidAddress(_) | SmtpError::InvalidAttachment(_) => {
                ApiError::bad_request(err.to_string())
            }
            SmtpError::Build(e) => ApiError::bad_request(e.to_string()),
            SmtpError::Timeout(operation) => ApiError::GatewayTimeout { operation },
            SmtpError::Transport(e) => ApiError::Connection { message: e.to_string() },
        }
    }
}

impl From<MailError> for ApiError {
    fn from(err: MailError) -> Self {
        match err {
            MailError::Validation(errors) => errors.into(),
            MailError::Imap(e) => e.into(),
            MailError::Smtp(e) => e.into(),
        }
    }
}

// === Extractor error handlers ===

pub fn json_error_handler(err: JsonPayloadError, _req: &HttpRequest) -> actix_web::Error {
    ApiError::bad_request(format!("Malformed JSON body: {}", err)).into()
}

pub fn query_error_handler(err: QueryPayloadError, _req: &HttpRequest) -> actix_web::Error {
    ApiError::bad_request(format!("Malformed query string: {}", err)).into()
}

pub fn path_error_handler(err: PathError, _req: &HttpRequest) -> actix_web::Error {
    ApiError::bad_request(format!("Malformed path parameter: {}", err)).into()
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_status_codes() {
        assert_eq!(
            ApiError::Authentication { reason: "x".to_string() }.status_code(),
            StatusCode::UNAUTHORIZED
        );
        assert_eq!(ApiError::bad_request("x").status_code(), StatusCode::BAD_REQUEST);
        assert_eq!(
            ApiError::Connection { message: "x".to_string() }.status_code(),
            StatusCode::BAD_GATEWAY
        );
        assert_eq!(
            ApiError::GatewayTimeout { operation: "x".to_string() }.status_code(),
            StatusCode::GATEWAY_TIMEOUT
        );
    }

    #[test]
    fn test_imap_error_mapping() {
        let err: ApiError = ImapError::FolderNotFound("Archive".to_string()).into();
        assert_eq!(err.code(), "NOT_FOUND");

        let err: ApiError = ImapError::Auth("bad login".to_string()).into();
        assert_eq!(err.code(), "CONNECTION_ERROR");

        let err: ApiError = MailError::Imap(ImapError::Timeout("fetch".to_string())).into();
        assert_eq!(err.code(), "GATEWAY_TIMEOUT");
    }

    #[test]
    fn test_auth_error_mapping() {
        let err: ApiError = AuthError::Expired.into();
        assert_eq!(err.status_code(), StatusCode::UNAUTHORIZED);
        assert_eq!(err.code(), "AUTHENTICATION_ERROR");

        let err: ApiError = AuthError::Signing("boom".to_string()).into();
        assert_eq!(err.code(), "INTERNAL_ERROR");
    }

    #[test]
    fn test_store_error_mapping() {
        let err: ApiError = AccountStoreError::NotFound("nope".to_string()).into();
        assert_eq!(err.status_code(), StatusCode::NOT_FOUND);
    }

    #[test]
    fn test_validation_error_conversion() {
        use validator::Validate;

        #[derive(Validate)]
        struct TestStruct {
            #[validate(length(min = 1))]
            field: String,
        }

        let test = TestStruct { field: "".to_string() };
        let api_error: ApiError = test.validate().unwrap_err().into();
        match api_error {
            ApiError::ValidationFailed { errors, .. } => {
                assert_eq!(errors.len(), 1);
                assert_eq!(errors[0].field, "field");
                assert_eq!(errors[0].constraint.as_deref(), Some("length"));
            }
            other => panic!("Expected ValidationFailed, got {:?}", other),
        }
    }
}
