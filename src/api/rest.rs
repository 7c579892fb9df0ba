// Copyright (c) 2025 TexasFortress.AI
// This Source Code Form is subject to the terms of the Mozilla Public
// License, v. 2.0. If a copy of the MPL was not distributed with this
// file, You can obtain one at http://mozilla.org/MPL/2.0/.

use actix_web::{
    delete, get, post, put,
    web::{self, Data, Json, Path, Query},
    HttpRequest, HttpResponse,
};
use actix_web_lab::middleware::from_fn as mw_from_fn;
use log::info;
use serde::Deserialize;
use std::sync::Arc;

use crate::{
    accounts::{Account, AccountPatch, AccountStore, AccountView, NewAccount},
    api::{
        auth::require_bearer,
        errors::{json_error_handler, path_error_handler, query_error_handler, ApiError},
        validation::{
            decoded_path_segment, validate_payload, CreateFolderRequest, MessageQuery, MoveMessageRequest,
            RenameFolderRequest,
        },
    },
    auth::{AuthGate, Credentials, Principal},
    config::Settings,
    mail::{compose_forward, compose_reply, FolderQuery, ForwardRequest, MailClient, ReplyRequest},
    smtp::OutgoingEnvelope,
};

#[derive(Clone)]
pub struct AppState {
    pub settings: Arc<Settings>,
    pub accounts: AccountStore,
    pub auth: Arc<AuthGate>,
    pub mail: Arc<dyn MailClient>,
}

impl AppState {
    pub fn new(settings: Settings, accounts: AccountStore, mail: Arc<dyn MailClient>) -> Self {
        let auth = Arc::new(AuthGate::new(&settings.auth));
        Self {
            settings: Arc::new(settings),
            accounts,
            auth,
            mail,
        }
    }

    async fn account(&self, id: &str) -> Result<Account, ApiError> {
        Ok(self.accounts.get(id).await?)
    }
}

// --- Route Configuration ---

pub fn configure_rest_service(cfg: &mut web::ServiceConfig) {
    cfg.app_data(web::JsonConfig::default().error_handler(json_error_handler))
        .app_data(web::QueryConfig::default().error_handler(query_error_handler))
        .app_data(web::PathConfig::default().error_handler(path_error_handler))
        .service(health)
        // Public; registered ahead of the protected scope so it matches first.
        .service(issue_token)
        .service(
            web::scope("/api/v1")
                .wrap(mw_from_fn(require_bearer))
                // Accounts
                .service(list_accounts)
                .service(add_account)
                .service(get_account)
                .service(update_account)
                .service(remove_account)
                // Folders
                .service(list_folders)
                .service(create_folder)
                .service(rename_folder)
                .service(delete_folder)
                // Messages
                .service(list_messages)
                .service(get_message)
                .service(delete_message)
                .service(move_message)
                .service(reply_to_message)
                .service(forward_message)
                .service(send_message),
        );
}

#[derive(Deserialize)]
struct AccountPath {
    id: String,
}

#[derive(Deserialize)]
struct MessagePath {
    id: String,
    uid: u32,
}

// --- Route Handlers ---

#[get("/health")]
async fn health() -> HttpResponse {
    HttpResponse::Ok().json(serde_json::json!({
        "status": "ok",
        "version": env!("CARGO_PKG_VERSION"),
    }))
}

#[post("/api/v1/auth/token")]
async fn issue_token(state: Data<AppState>, payload: Json<Credentials>) -> Result<HttpResponse, ApiError> {
    let token = state.auth.issue_token(&payload)?;
    Ok(HttpResponse::Ok().json(token))
}

// === Accounts ===

#[get("/accounts")]
async fn list_accounts(state: Data<AppState>) -> Result<HttpResponse, ApiError> {
    let accounts: Vec<AccountView> = state.accounts.list().await.iter().map(Account::view).collect();
    Ok(HttpResponse::Ok().json(serde_json::json!({
        "total": accounts.len(),
        "accounts": accounts,
    })))
}

#[post("/accounts")]
async fn add_account(
    state: Data<AppState>,
    principal: Principal,
    payload: Json<NewAccount>,
) -> Result<HttpResponse, ApiError> {
    let account = state.accounts.add(payload.into_inner()).await?;
    info!("'{}' added account {} ({})", principal.subject, account.id, account.imap_host);
    Ok(HttpResponse::Created()
        .insert_header(("Location", format!("/api/v1/accounts/{}", account.id)))
        .json(account.view()))
}

#[get("/accounts/{id}")]
async fn get_account(state: Data<AppState>, path: Path<AccountPath>) -> Result<HttpResponse, ApiError> {
    let account = state.account(&path.id).await?;
    Ok(HttpResponse::Ok().json(account.view()))
}

#[put("/accounts/{id}")]
async fn update_account(
    state: Data<AppState>,
    path: Path<AccountPath>,
    payload: Json<AccountPatch>,
) -> Result<HttpResponse, ApiError> {
    let account = state.accounts.update(&path.id, payload.into_inner()).await?;
    Ok(HttpResponse::Ok().json(account.view()))
}

#[delete("/accounts/{id}")]
async fn remove_account(
    state: Data<AppState>,
    principal: Principal,
    path: Path<AccountPath>,
) -> Result<HttpResponse, ApiError> {
    let id = state.accounts.remove(&path.id).await?;
    info!("'{}' removed account {}", principal.subject, id);
    Ok(HttpResponse::Ok().json(serde_json::json!({
        "id": id,
        "removed": true,
    })))
}

// === Folders ===

#[get("/accounts/{id}/folders")]
async fn list_folders(
    state: Data<AppState>,
    path: Path<AccountPath>,
    query: Query<FolderQuery>,
) -> Result<HttpResponse, ApiError> {
    let account = state.account(&path.id).await?;
    let folders = state.mail.list_folders(&account, &query).await?;
    Ok(HttpResponse::Ok().json(serde_json::json!({
        "total": folders.len(),
        "folders": folders,
    })))
}

#[post("/accounts/{id}/folders")]
async fn create_folder(
    state: Data<AppState>,
    path: Path<AccountPath>,
    payload: Json<CreateFolderRequest>,
) -> Result<HttpResponse, ApiError> {
    let request = validate_payload(payload)?;
    let account = state.account(&path.id).await?;
    state.mail.create_folder(&account, &request.name).await?;
    Ok(HttpResponse::Created()
        .insert_header((
            "Location",
            format!(
                "/api/v1/accounts/{}/folders/{}",
                account.id,
                urlencoding::encode(&request.name)
            ),
        ))
        .json(serde_json::json!({ "name": request.name })))
}

#[put("/accounts/{id}/folders/{folder}")]
async fn rename_folder(
    state: Data<AppState>,
    req: HttpRequest,
    path: Path<AccountPath>,
    payload: Json<RenameFolderRequest>,
) -> Result<HttpResponse, ApiError> {
    let folder = decoded_path_segment(&req, "folder")?;
    let request = validate_payload(payload)?;
    let account = state.account(&path.id).await?;
    state.mail.rename_folder(&account, &folder, &request.name).await?;
    Ok(HttpResponse::Ok().json(serde_json::json!({
        "name": request.name,
        "previous_name": folder,
    })))
}

#[delete("/accounts/{id}/folders/{folder}")]
async fn delete_folder(
    state: Data<AppState>,
    req: HttpRequest,
    path: Path<AccountPath>,
) -> Result<HttpResponse, ApiError> {
    let folder = decoded_path_segment(&req, "folder")?;
    let account = state.account(&path.id).await?;
    state.mail.delete_folder(&account, &folder).await?;
    Ok(HttpResponse::NoContent().finish())
}

// === Messages ===

#[get("/accounts/{id}/folders/{folder}/messages")]
async fn list_messages(
    state: Data<AppState>,
    req: HttpRequest,
    path: Path<AccountPath>,
    query: Query<MessageQuery>,
) -> Result<HttpResponse, ApiError> {
    let folder = decoded_path_segment(&req, "folder")?;
    let (filter, page) = query
        .into_inner()
        .into_filter(folder, state.settings.mail.max_page_size)?;
    let account = state.account(&path.id).await?;

    let result = state.mail.fetch_messages(&account, &filter, &page).await?;
    Ok(HttpResponse::Ok().json(serde_json::json!({
        "folder": filter.folder,
        "order": page.order,
        "offset": result.offset,
        "limit": result.limit,
        "has_more": result.has_more,
        "candidates": result.candidates,
        "messages": result.messages,
    })))
}

#[get("/accounts/{id}/folders/{folder}/messages/{uid}")]
async fn get_message(
    state: Data<AppState>,
    req: HttpRequest,
    path: Path<MessagePath>,
) -> Result<HttpResponse, ApiError> {
    let folder = decoded_path_segment(&req, "folder")?;
    let account = state.account(&path.id).await?;
    let message = state.mail.fetch_message(&account, &folder, path.uid).await?;
    Ok(HttpResponse::Ok().json(message))
}

#[delete("/accounts/{id}/folders/{folder}/messages/{uid}")]
async fn delete_message(
    state: Data<AppState>,
    req: HttpRequest,
    path: Path<MessagePath>,
) -> Result<HttpResponse, ApiError> {
    let folder = decoded_path_segment(&req, "folder")?;
    let account = state.account(&path.id).await?;
    state.mail.delete_message(&account, &folder, path.uid).await?;
    Ok(HttpResponse::NoContent().finish())
}

#[post("/accounts/{id}/folders/{folder}/messages/{uid}/move")]
async fn move_message(
    state: Data<AppState>,
    req: HttpRequest,
    path: Path<MessagePath>,
    payload: Json<MoveMessageRequest>,
) -> Result<HttpResponse, ApiError> {
    let folder = decoded_path_segment(&req, "folder")?;
    let request = validate_payload(payload)?;
    let account = state.account(&path.id).await?;
    state
        .mail
        .move_message(&account, &folder, path.uid, &request.destination)
        .await?;
    Ok(HttpResponse::Ok().json(serde_json::json!({
        "uid": path.uid,
        "from": folder,
        "to": request.destination,
    })))
}

#[post("/accounts/{id}/folders/{folder}/messages/{uid}/reply")]
async fn reply_to_message(
    state: Data<AppState>,
    req: HttpRequest,
    path: Path<MessagePath>,
    payload: Json<ReplyRequest>,
) -> Result<HttpResponse, ApiError> {
    let folder = decoded_path_segment(&req, "folder")?;
    let request = validate_payload(payload)?;
    let account = state.account(&path.id).await?;

    let original = state.mail.fetch_message(&account, &folder, path.uid).await?;
    let envelope = compose_reply(&account, &original, request);
    let receipt = state.mail.send_message(&account, &envelope).await?;
    Ok(HttpResponse::Accepted().json(receipt))
}

#[post("/accounts/{id}/folders/{folder}/messages/{uid}/forward")]
async fn forward_message(
    state: Data<AppState>,
    req: HttpRequest,
    path: Path<MessagePath>,
    payload: Json<ForwardRequest>,
) -> Result<HttpResponse, ApiError> {
    let folder = decoded_path_segment(&req, "folder")?;
    let request = validate_payload(payload)?;
    let account = state.account(&path.id).await?;

    let original = state.mail.fetch_message(&account, &folder, path.uid).await?;
    let envelope = compose_forward(&original, request);
    let receipt = state.mail.send_message(&account, &envelope).await?;
    Ok(HttpResponse::Accepted().json(receipt))
}

#[post("/accounts/{id}/messages/send")]
async fn send_message(
    state: Data<AppState>,
    path: Path<AccountPath>,
    payload: Json<OutgoingEnvelope>,
) -> Result<HttpResponse, ApiError> {
    let envelope = validate_payload(payload)?;
    let account = state.account(&path.id).await?;
    let receipt = state.mail.send_message(&account, &envelope).await?;
    Ok(HttpResponse::Accepted().json(receipt))
}
