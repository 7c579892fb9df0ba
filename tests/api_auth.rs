// Copyright (c) 2025 TexasFortress.AI
// This Source Code Form is subject to the terms of the Mozilla Public
// License, v. 2.0. If a copy of the MPL was not distributed with this
// file, You can obtain one at http://mozilla.org/MPL/2.0/.

mod common;

use std::sync::Arc;

use actix_web::{http::Method, http::StatusCode, test};
use chrono::{Duration, Utc};
use jsonwebtoken::{encode, EncodingKey, Header};
use serde_json::{json, Value};

use common::{bearer, state, test_app, token, FakeMailClient, OPERATOR, PASSWORD, SIGNING_SECRET};
use mailgate::auth::Claims;

fn signed(secret: &str, exp_offset: Duration) -> String {
    let now = Utc::now();
    let claims = Claims {
        sub: OPERATOR.to_string(),
        iat: (now - Duration::hours(2)).timestamp(),
        exp: (now + exp_offset).timestamp(),
        jti: "test".to_string(),
    };
    encode(&Header::default(), &claims, &EncodingKey::from_secret(secret.as_bytes())).unwrap()
}

/// Every protected route, with a body where the route takes one.
fn protected_routes(account_id: &str) -> Vec<(Method, String, Option<Value>)> {
    let base = format!("/api/v1/accounts/{}", account_id);
    let message = format!("{}/folders/INBOX/messages/7", base);
    vec![
        (Method::GET, "/api/v1/accounts".to_string(), None),
        (
            Method::POST,
            "/api/v1/accounts".to_string(),
            Some(json!({ "imap_host": "imap.example.com", "imap_port": 993, "username": "a", "secret": "x" })),
        ),
        (Method::GET, base.clone(), None),
        (Method::PUT, base.clone(), Some(json!({ "label": "x" }))),
        (Method::DELETE, base.clone(), None),
        (Method::GET, format!("{}/folders", base), None),
        (Method::POST, format!("{}/folders", base), Some(json!({ "name": "Archive" }))),
        (Method::PUT, format!("{}/folders/INBOX", base), Some(json!({ "name": "Old" }))),
        (Method::DELETE, format!("{}/folders/Archive", base), None),
        (Method::GET, format!("{}/folders/INBOX/messages", base), None),
        (Method::GET, message.clone(), None),
        (Method::DELETE, message.clone(), None),
        (Method::POST, format!("{}/move", message), Some(json!({ "destination": "Archive" }))),
        (Method::POST, format!("{}/reply", message), Some(json!({ "body": "ok" }))),
        (Method::POST, format!("{}/forward", message), Some(json!({ "to": ["b@example.com"] }))),
        (
            Method::POST,
            format!("{}/messages/send", base),
            Some(json!({ "to": ["b@example.com"], "subject": "Hi", "body": "Hello" })),
        ),
    ]
}

#[actix_web::test]
async fn test_issue_token() {
    let state = state(Arc::new(FakeMailClient::default()));
    let app = test::init_service(test_app(state.clone())).await;

    let req = test::TestRequest::post()
        .uri("/api/v1/auth/token")
        .set_json(json!({ "username": OPERATOR, "password": PASSWORD }))
        .to_request();
    let resp = test::call_service(&app, req).await;
    assert_eq!(resp.status(), StatusCode::OK);

    let body: Value = test::read_body_json(resp).await;
    assert_eq!(body["token_type"], "Bearer");
    assert_eq!(body["expires_in"], 3600);
    let access_token = body["access_token"].as_str().unwrap();
    assert_eq!(state.auth.validate(access_token).unwrap().subject, OPERATOR);
}

#[actix_web::test]
async fn test_wrong_credentials_are_rejected() {
    let state = state(Arc::new(FakeMailClient::default()));
    let app = test::init_service(test_app(state)).await;

    for payload in [
        json!({ "username": OPERATOR, "password": "wrong" }),
        json!({ "username": "root", "password": PASSWORD }),
        json!({}),
    ] {
        let req = test::TestRequest::post()
            .uri("/api/v1/auth/token")
            .set_json(&payload)
            .to_request();
        let resp = test::call_service(&app, req).await;
        assert_eq!(resp.status(), StatusCode::UNAUTHORIZED);
        let body: Value = test::read_body_json(resp).await;
        assert_eq!(body["code"], "AUTHENTICATION_ERROR");
    }
}

#[actix_web::test]
async fn test_protected_routes_require_token_and_never_touch_mail() {
    let mail = Arc::new(FakeMailClient::default());
    let state = state(mail.clone());
    let account = common::add_account(&state).await;
    let expired = signed(SIGNING_SECRET, Duration::seconds(-10));
    let foreign = signed("some-other-secret", Duration::hours(1));
    let app = test::init_service(test_app(state)).await;

    let headers: Vec<Option<String>> = vec![
        None,
        Some("Bearer".to_string()),
        Some("Basic b3BlcmF0b3I6aHVudGVyMg==".to_string()),
        Some("Bearer not-a-jwt".to_string()),
        Some(format!("Bearer {}", expired)),
        Some(format!("Bearer {}", foreign)),
    ];

    for (method, uri, body) in protected_routes(&account.id) {
        for header in &headers {
            let mut req = test::TestRequest::default().method(method.clone()).uri(&uri);
            if let Some(value) = header {
                req = req.insert_header(("Authorization", value.as_str()));
            }
            if let Some(body) = &body {
                req = req.set_json(body);
            }
            let resp = test::call_service(&app, req.to_request()).await;
            assert_eq!(
                resp.status(),
                StatusCode::UNAUTHORIZED,
                "{} {} with {:?}",
                method,
                uri,
                header
            );
            let body: Value = test::read_body_json(resp).await;
            assert_eq!(body["code"], "AUTHENTICATION_ERROR");
        }
    }

    assert_eq!(mail.calls(), 0);
}

#[actix_web::test]
async fn test_tampered_token_is_rejected() {
    let state = state(Arc::new(FakeMailClient::default()));
    let valid = token(&state);
    let app = test::init_service(test_app(state)).await;

    let (head, signature) = valid.rsplit_once('.').unwrap();
    let flipped = if signature.starts_with('A') { "B" } else { "A" };
    let tampered = format!("{}.{}{}", head, flipped, &signature[1..]);

    let req = test::TestRequest::get()
        .uri("/api/v1/accounts")
        .insert_header(bearer(&tampered))
        .to_request();
    let resp = test::call_service(&app, req).await;
    assert_eq!(resp.status(), StatusCode::UNAUTHORIZED);

    let req = test::TestRequest::get()
        .uri("/api/v1/accounts")
        .insert_header(bearer(&valid))
        .to_request();
    let resp = test::call_service(&app, req).await;
    assert_eq!(resp.status(), StatusCode::OK);
}

#[actix_web::test]
async fn test_public_routes() {
    let state = state(Arc::new(FakeMailClient::default()));
    let app = test::init_service(test_app(state)).await;

    let req = test::TestRequest::get().uri("/health").to_request();
    let body: Value = test::call_and_read_body_json(&app, req).await;
    assert_eq!(body["status"], "ok");

    let req = test::TestRequest::get().uri("/api-docs/openapi.json").to_request();
    let body: Value = test::call_and_read_body_json(&app, req).await;
    assert_eq!(body["openapi"], "3.0.3");

    for uri in ["/docs", "/redoc"] {
        let req = test::TestRequest::get().uri(uri).to_request();
        let resp = test::call_service(&app, req).await;
        assert_eq!(resp.status(), StatusCode::OK, "{}", uri);
    }
}
