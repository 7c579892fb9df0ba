// Copyright (c) 2025 TexasFortress.AI
// This Source Code Form is subject to the terms of the Mozilla Public
// License, v. 2.0. If a copy of the MPL was not distributed with this
// file, You can obtain one at http://mozilla.org/MPL/2.0/.

//! OpenAPI description of the REST API, plus Swagger UI and ReDoc pages.

use actix_web::{web, HttpResponse};
use serde_json::{json, Value};

fn schema_ref(name: &str) -> Value {
    json!({ "$ref": format!("#/components/schemas/{}", name) })
}

fn json_content(schema: Value) -> Value {
    json!({ "application/json": { "schema": schema } })
}

fn body(name: &str) -> Value {
    json!({ "required": true, "content": json_content(schema_ref(name)) })
}

fn ok(description: &str, schema: Option<Value>) -> Value {
    match schema {
        Some(schema) => json!({ "description": description, "content": json_content(schema) }),
        None => json!({ "description": description }),
    }
}

fn error(description: &str) -> Value {
    ok(description, Some(schema_ref("ErrorResponse")))
}

/// Response map for a protected operation: the given successes plus the
/// error statuses every protected route can produce.
fn protected(mut responses: Value, mail: bool) -> Value {
    responses["400"] = error("Validation error");
    responses["401"] = error("Missing, invalid or expired bearer token");
    responses["404"] = error("Unknown account, folder or message");
    if mail {
        responses["502"] = error("Mail server connection or login failed");
        responses["504"] = error("Mail server timed out");
    }
    responses
}

fn path_param(name: &str, kind: &str, description: &str) -> Value {
    json!({
        "name": name,
        "in": "path",
        "required": true,
        "schema": { "type": kind },
        "description": description,
    })
}

fn query_param(name: &str, schema: Value, description: &str) -> Value {
    json!({ "name": name, "in": "query", "required": false, "schema": schema, "description": description })
}

fn account_id() -> Value {
    path_param("id", "string", "Account identifier")
}

fn folder() -> Value {
    path_param("folder", "string", "Percent-encoded folder name, e.g. %5BGmail%5D%2FSent%20Mail")
}

fn uid() -> Value {
    path_param("uid", "integer", "Message UID")
}

fn operation(tag: &str, id: &str, summary: &str, parameters: Vec<Value>, responses: Value) -> Value {
    json!({
        "tags": [tag],
        "operationId": id,
        "summary": summary,
        "parameters": parameters,
        "responses": responses,
    })
}

fn with_body(mut op: Value, schema: &str) -> Value {
    op["requestBody"] = body(schema);
    op
}

fn paths() -> Value {
    json!({
        "/health": {
            "get": {
                "tags": ["system"],
                "operationId": "health",
                "summary": "Liveness check",
                "security": [],
                "responses": { "200": ok("Service is running", None) }
            }
        },
        "/api/v1/auth/token": {
            "post": {
                "tags": ["auth"],
                "operationId": "issueToken",
                "summary": "Exchange operator credentials for a bearer token",
                "security": [],
                "requestBody": body("TokenRequest"),
                "responses": {
                    "200": ok("Token issued", Some(schema_ref("TokenResponse"))),
                    "400": error("Malformed body"),
                    "401": error("Invalid credentials")
                }
            }
        },
        "/api/v1/accounts": {
            "get": operation("accounts", "listAccounts", "List accounts", vec![],
                protected(json!({ "200": ok("Accounts", Some(schema_ref("AccountList"))) }), false)),
            "post": with_body(operation("accounts", "addAccount", "Add an account", vec![],
                protected(json!({ "201": ok("Account created", Some(schema_ref("Account"))) }), false)), "NewAccount")
        },
        "/api/v1/accounts/{id}": {
            "get": operation("accounts", "getAccount", "Get an account", vec![account_id()],
                protected(json!({ "200": ok("Account", Some(schema_ref("Account"))) }), false)),
            "put": with_body(operation("accounts", "updateAccount", "Update an account", vec![account_id()],
                protected(json!({ "200": ok("Account updated", Some(schema_ref("Account"))) }), false)), "AccountPatch"),
            "delete": operation("accounts", "removeAccount", "Remove an account", vec![account_id()],
                protected(json!({ "200": ok("Removed account id", None) }), false))
        },
        "/api/v1/accounts/{id}/folders": {
            "get": operation("folders", "listFolders", "List folders", vec![
                    account_id(),
                    query_param("reference", json!({ "type": "string", "default": "" }), "LIST reference name"),
                    query_param("pattern", json!({ "type": "string", "default": "*" }), "LIST mailbox pattern"),
                ],
                protected(json!({ "200": ok("Folders", Some(schema_ref("FolderList"))) }), true)),
            "post": with_body(operation("folders", "createFolder", "Create a folder", vec![account_id()],
                protected(json!({ "201": ok("Folder created", None) }), true)), "FolderName")
        },
        "/api/v1/accounts/{id}/folders/{folder}": {
            "put": with_body(operation("folders", "renameFolder", "Rename a folder", vec![account_id(), folder()],
                protected(json!({ "200": ok("Folder renamed", None) }), true)), "FolderName"),
            "delete": operation("folders", "deleteFolder", "Delete a folder", vec![account_id(), folder()],
                protected(json!({ "204": ok("Folder deleted", None) }), true))
        },
        "/api/v1/accounts/{id}/folders/{folder}/messages": {
            "get": operation("messages", "listMessages", "Fetch and filter messages", vec![
                    account_id(),
                    folder(),
                    query_param("since", json!({ "type": "string" }), "Inclusive lower bound, RFC 3339 or YYYY-MM-DD"),
                    query_param("until", json!({ "type": "string" }), "Inclusive upper bound; a bare date covers the whole day"),
                    query_param("unread", json!({ "type": "boolean" }), "Only unread (true) or read (false) messages"),
                    query_param("from", json!({ "type": "string" }), "Case-insensitive sender substring"),
                    query_param("subject", json!({ "type": "string" }), "Case-insensitive subject substring"),
                    query_param("limit", json!({ "type": "integer", "default": 50, "maximum": 100 }), "Page size"),
                    query_param("offset", json!({ "type": "integer", "default": 0 }), "Matches to skip"),
                    query_param("order", json!({ "type": "string", "enum": ["asc", "desc"], "default": "asc" }), "UID order"),
                ],
                protected(json!({ "200": ok("A page of messages", Some(schema_ref("MessagePage"))) }), true))
        },
        "/api/v1/accounts/{id}/folders/{folder}/messages/{uid}": {
            "get": operation("messages", "getMessage", "Fetch one message", vec![account_id(), folder(), uid()],
                protected(json!({ "200": ok("Message", Some(schema_ref("Message"))) }), true)),
            "delete": operation("messages", "deleteMessage", "Delete a message", vec![account_id(), folder(), uid()],
                protected(json!({ "204": ok("Message deleted", None) }), true))
        },
        "/api/v1/accounts/{id}/folders/{folder}/messages/{uid}/move": {
            "post": with_body(operation("messages", "moveMessage", "Move a message", vec![account_id(), folder(), uid()],
                protected(json!({ "200": ok("Message moved", None) }), true)), "MoveRequest")
        },
        "/api/v1/accounts/{id}/folders/{folder}/messages/{uid}/reply": {
            "post": with_body(operation("messages", "replyToMessage", "Reply to a message", vec![account_id(), folder(), uid()],
                protected(json!({ "202": ok("Reply accepted by the SMTP server", Some(schema_ref("DeliveryReceipt"))) }), true)), "ReplyRequest")
        },
        "/api/v1/accounts/{id}/folders/{folder}/messages/{uid}/forward": {
            "post": with_body(operation("messages", "forwardMessage", "Forward a message", vec![account_id(), folder(), uid()],
                protected(json!({ "202": ok("Forward accepted by the SMTP server", Some(schema_ref("DeliveryReceipt"))) }), true)), "ForwardRequest")
        },
        "/api/v1/accounts/{id}/messages/send": {
            "post": with_body(operation("messages", "sendMessage", "Send a message", vec![account_id()],
                protected(json!({ "202": ok("Message accepted by the SMTP server", Some(schema_ref("DeliveryReceipt"))) }), true)), "OutgoingEnvelope")
        }
    })
}

fn address_list() -> Value {
    json!({ "type": "array", "items": { "type": "string" } })
}

fn schemas() -> Value {
    json!({
        "ErrorResponse": {
            "type": "object",
            "required": ["code", "message", "timestamp"],
            "properties": {
                "code": {
                    "type": "string",
                    "enum": ["AUTHENTICATION_ERROR", "VALIDATION_ERROR", "NOT_FOUND", "CONNECTION_ERROR", "GATEWAY_TIMEOUT", "INTERNAL_ERROR"]
                },
                "message": { "type": "string" },
                "details": {
                    "type": "object",
                    "properties": {
                        "validation_errors": {
                            "type": "array",
                            "items": {
                                "type": "object",
                                "properties": {
                                    "field": { "type": "string" },
                                    "message": { "type": "string" },
                                    "constraint": { "type": "string" }
                                }
                            }
                        },
                        "suggestions": { "type": "array", "items": { "type": "string" } }
                    }
                },
                "timestamp": { "type": "string", "format": "date-time" }
            }
        },
        "TokenRequest": {
            "type": "object",
            "required": ["username", "password"],
            "properties": {
                "username": { "type": "string" },
                "password": { "type": "string", "format": "password" }
            }
        },
        "TokenResponse": {
            "type": "object",
            "properties": {
                "access_token": { "type": "string" },
                "token_type": { "type": "string", "example": "Bearer" },
                "expires_in": { "type": "integer" },
                "expires_at": { "type": "string", "format": "date-time" }
            }
        },
        "NewAccount": {
            "type": "object",
            "required": ["imap_host", "imap_port", "username", "secret"],
            "properties": {
                "label": { "type": "string" },
                "imap_host": { "type": "string" },
                "imap_port": { "type": "integer", "minimum": 1, "maximum": 65535 },
                "imap_tls": { "type": "boolean", "default": true },
                "smtp_host": { "type": "string" },
                "smtp_port": { "type": "integer", "minimum": 1, "maximum": 65535, "default": 587 },
                "smtp_tls": { "type": "boolean", "default": true },
                "username": { "type": "string" },
                "secret": { "type": "string", "format": "password", "writeOnly": true },
                "sender_address": { "type": "string", "format": "email" }
            }
        },
        "AccountPatch": {
            "type": "object",
            "description": "Any subset of NewAccount fields. An empty smtp_host removes the SMTP endpoint."
        },
        "Account": {
            "type": "object",
            "description": "Account without its secret.",
            "properties": {
                "id": { "type": "string", "format": "uuid" },
                "label": { "type": "string" },
                "imap_host": { "type": "string" },
                "imap_port": { "type": "integer" },
                "imap_tls": { "type": "boolean" },
                "smtp_host": { "type": "string", "nullable": true },
                "smtp_port": { "type": "integer", "nullable": true },
                "smtp_tls": { "type": "boolean" },
                "username": { "type": "string" },
                "sender_address": { "type": "string", "nullable": true },
                "created_at": { "type": "string", "format": "date-time" },
                "updated_at": { "type": "string", "format": "date-time" }
            }
        },
        "AccountList": {
            "type": "object",
            "properties": {
                "total": { "type": "integer" },
                "accounts": { "type": "array", "items": schema_ref("Account") }
            }
        },
        "Folder": {
            "type": "object",
            "properties": {
                "name": { "type": "string" },
                "delimiter": { "type": "string", "nullable": true },
                "attributes": { "type": "array", "items": { "type": "string" } }
            }
        },
        "FolderList": {
            "type": "object",
            "properties": {
                "total": { "type": "integer" },
                "folders": { "type": "array", "items": schema_ref("Folder") }
            }
        },
        "FolderName": {
            "type": "object",
            "required": ["name"],
            "properties": { "name": { "type": "string" } }
        },
        "MoveRequest": {
            "type": "object",
            "required": ["destination"],
            "properties": { "destination": { "type": "string" } }
        },
        "EmailAddress": {
            "type": "object",
            "properties": {
                "name": { "type": "string" },
                "address": { "type": "string" }
            }
        },
        "Message": {
            "type": "object",
            "properties": {
                "uid": { "type": "integer" },
                "folder": { "type": "string" },
                "message_id": { "type": "string", "nullable": true },
                "in_reply_to": { "type": "string", "nullable": true },
                "references": { "type": "array", "items": { "type": "string" } },
                "subject": { "type": "string", "nullable": true },
                "from": { "type": "array", "items": schema_ref("EmailAddress") },
                "to": { "type": "array", "items": schema_ref("EmailAddress") },
                "cc": { "type": "array", "items": schema_ref("EmailAddress") },
                "reply_to": { "type": "array", "items": schema_ref("EmailAddress") },
                "date": { "type": "string", "format": "date-time", "nullable": true },
                "flags": { "type": "array", "items": { "type": "string" } },
                "seen": { "type": "boolean" },
                "size": { "type": "integer", "nullable": true },
                "body_text": { "type": "string", "nullable": true },
                "body_html": { "type": "string", "nullable": true },
                "attachments": {
                    "type": "array",
                    "items": {
                        "type": "object",
                        "properties": {
                            "filename": { "type": "string", "nullable": true },
                            "content_type": { "type": "string" },
                            "size": { "type": "integer" }
                        }
                    }
                }
            }
        },
        "MessagePage": {
            "type": "object",
            "properties": {
                "folder": { "type": "string" },
                "order": { "type": "string", "enum": ["asc", "desc"] },
                "offset": { "type": "integer" },
                "limit": { "type": "integer" },
                "has_more": { "type": "boolean" },
                "candidates": { "type": "integer" },
                "messages": { "type": "array", "items": schema_ref("Message") }
            }
        },
        "Attachment": {
            "type": "object",
            "required": ["filename", "content"],
            "properties": {
                "filename": { "type": "string" },
                "content_type": { "type": "string", "default": "application/octet-stream" },
                "content": { "type": "string", "format": "byte" }
            }
        },
        "OutgoingEnvelope": {
            "type": "object",
            "required": ["to"],
            "properties": {
                "to": { "type": "array", "items": { "type": "string" }, "minItems": 1 },
                "cc": address_list(),
                "bcc": address_list(),
                "from": { "type": "string" },
                "subject": { "type": "string" },
                "body": { "type": "string" },
                "body_html": { "type": "string" },
                "attachments": { "type": "array", "items": schema_ref("Attachment") },
                "in_reply_to": { "type": "string" },
                "references": { "type": "array", "items": { "type": "string" } }
            }
        },
        "ReplyRequest": {
            "type": "object",
            "properties": {
                "body": { "type": "string" },
                "body_html": { "type": "string" },
                "reply_all": { "type": "boolean", "default": false },
                "cc": address_list(),
                "bcc": address_list(),
                "from": { "type": "string" },
                "attachments": { "type": "array", "items": schema_ref("Attachment") }
            }
        },
        "ForwardRequest": {
            "type": "object",
            "required": ["to"],
            "properties": {
                "to": { "type": "array", "items": { "type": "string" }, "minItems": 1 },
                "cc": address_list(),
                "bcc": address_list(),
                "body": { "type": "string" },
                "from": { "type": "string" }
            }
        },
        "DeliveryReceipt": {
            "type": "object",
            "properties": {
                "status": { "type": "string", "example": "accepted" },
                "message_id": { "type": "string" },
                "recipients": { "type": "array", "items": { "type": "string" } },
                "server_response": { "type": "string" }
            }
        }
    })
}

/// Generate the OpenAPI specification in JSON format
pub fn generate_openapi_spec() -> Value {
    json!({
        "openapi": "3.0.3",
        "info": {
            "title": "mailgate API",
            "description": "Account management and mailbox operations over IMAP and SMTP",
            "version": env!("CARGO_PKG_VERSION"),
            "license": {
                "name": "MPL-2.0",
                "url": "http://mozilla.org/MPL/2.0/"
            }
        },
        "security": [{ "BearerAuth": [] }],
        "tags": [
            { "name": "auth", "description": "Token issuance" },
            { "name": "accounts", "description": "Configured mailbox accounts" },
            { "name": "folders", "description": "Folder management" },
            { "name": "messages", "description": "Fetch, send, reply, forward, move and delete" },
            { "name": "system", "description": "Service health" }
        ],
        "paths": paths(),
        "components": {
            "schemas": schemas(),
            "securitySchemes": {
                "BearerAuth": {
                    "type": "http",
                    "scheme": "bearer",
                    "bearerFormat": "JWT"
                }
            }
        }
    })
}

/// Handler to serve the OpenAPI JSON specification
pub async fn serve_openapi_spec() -> HttpResponse {
    HttpResponse::Ok().json(generate_openapi_spec())
}

/// Configure OpenAPI documentation endpoints
pub fn configure_openapi(cfg: &mut web::ServiceConfig) {
    cfg.route("/api-docs/openapi.json", web::get().to(serve_openapi_spec))
        .route("/docs", web::get().to(serve_swagger_ui))
        .route("/redoc", web::get().to(serve_redoc));
}

async fn serve_swagger_ui() -> HttpResponse {
    let html = r#"<!DOCTYPE html>
<html lang="en">
<head>
    <meta charset="UTF-8">
    <title>mailgate API</title>
    <link rel="stylesheet" type="text/css" href="https://cdn.jsdelivr.net/npm/swagger-ui-dist@5/swagger-ui.css" />
</head>
<body>
    <div id="swagger-ui"></div>
    <script src="https://cdn.jsdelivr.net/npm/swagger-ui-dist@5/swagger-ui-bundle.js"></script>
    <script>
        window.onload = function() {
            window.ui = SwaggerUIBundle({
                url: "/api-docs/openapi.json",
                dom_id: '#swagger-ui',
                deepLinking: true,
                presets: [SwaggerUIBundle.presets.apis]
            });
        };
    </script>
</body>
</html>"#;

    HttpResponse::Ok()
        .content_type("text/html; charset=utf-8")
        .body(html)
}

async fn serve_redoc() -> HttpResponse {
    let html = r#"<!DOCTYPE html>
<html lang="en">
<head>
    <meta charset="UTF-8">
    <title>mailgate API</title>
</head>
<body>
    <redoc spec-url="/api-docs/openapi.json"></redoc>
    <script src="https://cdn.jsdelivr.net/npm/redoc@2/bundles/redoc.standalone.js"></script>
</body>
</html>"#;

    HttpResponse::Ok()
        .content_type("text/html; charset=utf-8")
        .body(html)
}
