// Copyright (c) 2025 TexasFortress.AI
// This Source Code Form is subject to the terms of the Mozilla Public
// License, v. 2.0. If a copy of the MPL was not distributed with this
// file, You can obtain one at http://mozilla.org/MPL/2.0/.

//! REST API implementation using Actix Web.

pub mod auth;
pub mod errors;
pub mod openapi_docs;
pub mod rest;
pub mod validation;

pub use errors::ApiError;
pub use rest::{configure_rest_service, AppState};
