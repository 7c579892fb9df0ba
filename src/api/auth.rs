// Copyright (c) 2025 TexasFortress.AI
// This Source Code Form is subject to the terms of the Mozilla Public
// License, v. 2.0. If a copy of the MPL was not distributed with this
// file, You can obtain one at http://mozilla.org/MPL/2.0/.

//! Bearer token middleware for the protected `/api/v1` routes.

use std::future::{ready, Ready};

use actix_web::{
    body::{EitherBody, MessageBody},
    dev::{Payload, ServiceRequest, ServiceResponse},
    http::header::AUTHORIZATION,
    web, Error as ActixError, FromRequest, HttpMessage, HttpRequest, ResponseError,
};
use actix_web_lab::middleware::Next;
use log::{debug, warn};

use crate::api::errors::ApiError;
use crate::api::rest::AppState;
use crate::auth::{bearer_token, AuthError, Principal};

fn authenticate(req: &ServiceRequest) -> Result<Principal, ApiError> {
    let state = req
        .app_data::<web::Data<AppState>>()
        .ok_or_else(|| ApiError::InternalError {
            message: "application state is not configured".to_string(),
        })?;

    let header = req.headers().get(AUTHORIZATION).map(|value| value.to_str());
    let header = match header {
        Some(Ok(value)) => Some(value),
        Some(Err(_)) => return Err(AuthError::MissingToken.into()),
        None => None,
    };

    let token = bearer_token(header)?;
    Ok(state.auth.validate(token)?)
}

/// Validates `Authorization: Bearer <token>` and stores the [`Principal`] in
/// the request extensions. Rejected requests never reach a handler.
pub async fn require_bearer<B: MessageBody>(
    req: ServiceRequest,
    next: Next<B>,
) -> Result<ServiceResponse<EitherBody<B>>, ActixError> {
    match authenticate(&req) {
        Ok(principal) => {
            debug!("Authenticated '{}' for {} {}", principal.subject, req.method(), req.path());
            req.extensions_mut().insert(principal);
            next.call(req).await.map(ServiceResponse::map_into_left_body)
        }
        Err(err) => {
            warn!("Rejected {} {}: {}", req.method(), req.path(), err);
            let response = err.error_response();
            Ok(req.into_response(response).map_into_right_body())
        }
    }
}

impl FromRequest for Principal {
    type Error = ApiError;
    type Future = Ready<Result<Self, Self::Error>>;

    fn from_request(req: &HttpRequest, _payload: &mut Payload) -> Self::Future {
        let principal = req.extensions().get::<Principal>().cloned();
        ready(principal.ok_or_else(|| AuthError::MissingToken.into()))
    }
}
