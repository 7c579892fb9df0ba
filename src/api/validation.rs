// Copyright (c) 2025 TexasFortress.AI
// This Source Code Form is subject to the terms of the Mozilla Public
// License, v. 2.0. If a copy of the MPL was not distributed with this
// file, You can obtain one at http://mozilla.org/MPL/2.0/.

//! Request validation for REST API payloads, query strings and path segments.

use actix_web::{web::Json, HttpRequest};
use serde::{Deserialize, Serialize};
use validator::Validate;

use crate::api::errors::ApiError;
use crate::mail::{parse_date_bound, DayBound, MessageFilter, PageRequest, SortOrder};

/// Maximum folder name length
const MAX_FOLDER_NAME_LENGTH: usize = 255;

/// Maximum decoded attachment size in bytes (25MB)
const MAX_ATTACHMENT_SIZE: usize = 25 * 1024 * 1024;

const DEFAULT_PAGE_SIZE: usize = 50;

/// Custom validation functions
pub mod validators {
    use super::*;
    use lazy_static::lazy_static;
    use regex::Regex;
    use validator::ValidationError;

    use crate::smtp::OutgoingAttachment;

    lazy_static! {
        /// RFC 1123 host name, or a dotted IPv4 address.
        static ref HOST_REGEX: Regex = Regex::new(
            r"^(?i:[a-z0-9](?:[a-z0-9-]{0,61}[a-z0-9])?)(?:\.(?i:[a-z0-9](?:[a-z0-9-]{0,61}[a-z0-9])?))*$"
        )
        .expect("host regex is valid");
    }

    fn error(code: &'static str, message: impl Into<String>) -> ValidationError {
        let message: String = message.into();
        let mut err = ValidationError::new(code);
        err.message = Some(message.into());
        err
    }

    pub fn validate_host(host: &str) -> Result<(), ValidationError> {
        let host = host.trim();
        if host.is_empty() {
            return Err(error("required", "host is required"));
        }
        if host.len() > 253 || !HOST_REGEX.is_match(host) {
            return Err(error("invalid_host", format!("'{}' is not a valid host name", host)));
        }
        Ok(())
    }

    /// One RFC 5322 mailbox, e.g. `Alice <alice@example.com>`.
    pub fn validate_mailbox(value: &str) -> Result<(), ValidationError> {
        value
            .parse::<lettre::message::Mailbox>()
            .map(|_| ())
            .map_err(|_| error("invalid_address", format!("'{}' is not a valid email address", value)))
    }

    pub fn validate_address_list(values: &[String]) -> Result<(), ValidationError> {
        values.iter().try_for_each(|value| validate_mailbox(value))
    }

    pub fn validate_attachments(attachments: &[OutgoingAttachment]) -> Result<(), ValidationError> {
        use base64::Engine;

        for attachment in attachments {
            if attachment.filename.trim().is_empty() {
                return Err(error("attachment_filename", "attachment filename is required"));
            }
            if attachment.content_type.parse::<lettre::message::header::ContentType>().is_err() {
                return Err(error(
                    "attachment_content_type",
                    format!("'{}' is not a valid content type", attachment.content_type),
                ));
            }
            match base64::engine::general_purpose::STANDARD.decode(attachment.content.trim()) {
                Ok(decoded) if decoded.len() > MAX_ATTACHMENT_SIZE => {
                    return Err(error(
                        "attachment_too_large",
                        format!("'{}' exceeds {} bytes", attachment.filename, MAX_ATTACHMENT_SIZE),
                    ));
                }
                Ok(_) => {}
                Err(_) => {
                    return Err(error(
                        "invalid_base64",
                        format!("'{}' content is not valid base64", attachment.filename),
                    ));
                }
            }
        }
        Ok(())
    }

    /// Login name as it will be stored, i.e. after trimming.
    pub fn validate_username(username: &str) -> Result<(), ValidationError> {
        let username = username.trim();
        if username.is_empty() {
            return Err(error("required", "username is required"));
        }
        if username.len() > 320 {
            return Err(error("username_too_long", "username is too long"));
        }
        Ok(())
    }

    pub fn validate_folder_name(name: &str) -> Result<(), ValidationError> {
        if name.trim().is_empty() {
            return Err(error("folder_name_empty", "folder name is required"));
        }
        if name.len() > MAX_FOLDER_NAME_LENGTH {
            return Err(error("folder_name_too_long", "folder name is too long"));
        }
        if name.chars().any(|c| c.is_control()) {
            return Err(error("invalid_folder_name_characters", "folder name contains control characters"));
        }
        Ok(())
    }
}

// === Validated Request Structures ===

#[derive(Debug, Deserialize, Serialize, Validate)]
pub struct CreateFolderRequest {
    #[serde(default)]
    #[validate(custom(function = "validators::validate_folder_name"))]
    pub name: String,
}

/// Body of a folder rename; `name` is the new full name.
#[derive(Debug, Deserialize, Serialize, Validate)]
pub struct RenameFolderRequest {
    #[serde(default)]
    #[validate(custom(function = "validators::validate_folder_name"))]
    pub name: String,
}

#[derive(Debug, Deserialize, Serialize, Validate)]
pub struct MoveMessageRequest {
    #[serde(default, alias = "to_folder")]
    #[validate(custom(function = "validators::validate_folder_name"))]
    pub destination: String,
}

/// Query string of the message listing endpoint.
#[derive(Debug, Default, Deserialize)]
pub struct MessageQuery {
    pub since: Option<String>,
    pub until: Option<String>,
    pub unread: Option<bool>,
    pub from: Option<String>,
    pub subject: Option<String>,
    pub limit: Option<usize>,
    pub offset: Option<usize>,
    pub order: Option<SortOrder>,
}

fn non_empty(value: Option<String>) -> Option<String> {
    value.map(|v| v.trim().to_string()).filter(|v| !v.is_empty())
}

impl MessageQuery {
    pub fn into_filter(self, folder: String, max_page_size: usize) -> Result<(MessageFilter, PageRequest), ApiError> {
        let since = match non_empty(self.since) {
            Some(value) => Some(parse_date_bound(&value, DayBound::Start).map_err(|e| ApiError::invalid_field("since", e))?),
            None => None,
        };
        let until = match non_empty(self.until) {
            Some(value) => Some(parse_date_bound(&value, DayBound::End).map_err(|e| ApiError::invalid_field("until", e))?),
            None => None,
        };

        let filter = MessageFilter {
            folder,
            since,
            until,
            unread: self.unread,
            from: non_empty(self.from),
            subject: non_empty(self.subject),
        };
        filter.check_range().map_err(|e| ApiError::invalid_field("since", e))?;

        let limit = self.limit.unwrap_or(DEFAULT_PAGE_SIZE.min(max_page_size));
        if limit == 0 || limit > max_page_size {
            return Err(ApiError::invalid_field(
                "limit",
                format!("limit must be between 1 and {}", max_page_size),
            ));
        }

        let page = PageRequest {
            offset: self.offset.unwrap_or(0),
            limit,
            order: self.order.unwrap_or_default(),
        };
        Ok((filter, page))
    }
}

// === Helpers ===

/// Validate request payload using the Validate trait
pub fn validate_payload<T>(payload: Json<T>) -> Result<T, ApiError>
where
    T: Validate,
{
    let inner = payload.into_inner();
    inner.validate()?;
    Ok(inner)
}

/// Decodes a percent-encoded path segment.
///
/// Reads the raw match so that an encoded `/` (`%2F`) inside a folder name is
/// decoded exactly once.
pub fn decoded_path_segment(req: &HttpRequest, name: &str) -> Result<String, ApiError> {
    let raw = req
        .match_info()
        .get(name)
        .ok_or_else(|| ApiError::bad_request(format!("Missing path parameter '{}'", name)))?;
    let decoded = urlencoding::decode(raw)
        .map_err(|_| ApiError::bad_request(format!("Path parameter '{}' is not valid UTF-8", name)))?
        .into_owned();
    validators::validate_folder_name(&decoded).map_err(|e| {
        let message = e.message.map(|m| m.to_string()).unwrap_or_else(|| e.code.to_string());
        ApiError::invalid_field(name, message)
    })?;
    Ok(decoded)
}
