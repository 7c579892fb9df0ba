// Copyright (c) 2025 TexasFortress.AI
// This Source Code Form is subject to the terms of the Mozilla Public
// License, v. 2.0. If a copy of the MPL was not distributed with this
// file, You can obtain one at http://mozilla.org/MPL/2.0/.

#![allow(dead_code)]

use std::sync::atomic::{AtomicUsize, Ordering};
use std::sync::{Arc, Mutex};

use actix_web::{
    dev::{ServiceFactory, ServiceRequest, ServiceResponse},
    web, App, Error,
};
use async_trait::async_trait;

use mailgate::{
    accounts::{Account, AccountStore, NewAccount},
    api::{configure_rest_service, openapi_docs::configure_openapi, AppState},
    auth::Credentials,
    config::{
        AccountsConfig, AuthSettings, BootstrapAccount, LogConfig, MailSettings, ServerConfig, Settings,
    },
    imap::{EmailAddress, Folder, ImapError, Message},
    mail::{FolderQuery, MailClient, MailError, MessageFilter, MessagePage, PageRequest},
    smtp::{DeliveryReceipt, OutgoingEnvelope},
};

pub const OPERATOR: &str = "operator";
pub const PASSWORD: &str = "hunter2";
pub const SIGNING_SECRET: &str = "integration-signing-secret-0123456789";

pub fn settings() -> Settings {
    Settings {
        server: ServerConfig {
            host: "127.0.0.1".to_string(),
            port: 8080,
            cors_origins: vec![],
            workers: None,
        },
        auth: AuthSettings {
            username: OPERATOR.to_string(),
            password: PASSWORD.to_string(),
            signing_secret: SIGNING_SECRET.to_string(),
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
        log: LogConfig {
            level: "debug".to_string(),
        },
    }
}

/// In-memory [`MailClient`] that records what the API asked of it.
#[derive(Default)]
pub struct FakeMailClient {
    calls: AtomicUsize,
    pub messages: Vec<Message>,
    pub last_filter: Mutex<Option<MessageFilter>>,
    pub last_page: Mutex<Option<PageRequest>>,
    pub last_folder: Mutex<Option<String>>,
    pub sent: Mutex<Vec<OutgoingEnvelope>>,
}

impl FakeMailClient {
    pub fn with_messages(messages: Vec<Message>) -> Self {
        Self {
            messages,
            ..Default::default()
        }
    }

    pub fn calls(&self) -> usize {
        self.calls.load(Ordering::SeqCst)
    }

    fn record(&self, folder: Option<&str>) {
        self.calls.fetch_add(1, Ordering::SeqCst);
        if let Some(folder) = folder {
            *self.last_folder.lock().unwrap() = Some(folder.to_string());
        }
    }
}

#[async_trait]
impl MailClient for FakeMailClient {
    async fn list_folders(&self, _account: &Account, _query: &FolderQuery) -> Result<Vec<Folder>, MailError> {
        self.record(None);
        Ok(vec![Folder {
            name: "INBOX".to_string(),
            delimiter: Some("/".to_string()),
            attributes: vec![],
        }])
    }

    async fn fetch_messages(
        &self,
        _account: &Account,
        filter: &MessageFilter,
        page: &PageRequest,
    ) -> Result<MessagePage, MailError> {
        self.record(Some(&filter.folder));
        *self.last_filter.lock().unwrap() = Some(filter.clone());
        *self.last_page.lock().unwrap() = Some(*page);

        let matching: Vec<Message> = self.messages.iter().filter(|m| filter.matches(m)).cloned().collect();
        let candidates = matching.len();
        let messages: Vec<Message> = matching.into_iter().skip(page.offset).take(page.limit).collect();
        Ok(MessagePage {
            has_more: page.offset + messages.len() < candidates,
            messages,
            offset: page.offset,
            limit: page.limit,
            candidates,
        })
    }

    async fn fetch_message(&self, _account: &Account, folder: &str, uid: u32) -> Result<Message, MailError> {
        self.record(Some(folder));
        self.messages.iter().find(|m| m.uid == uid).cloned().ok_or_else(|| {
            MailError::Imap(ImapError::MessageNotFound {
                folder: folder.to_string(),
                uid,
            })
        })
    }

    async fn send_message(&self, account: &Account, envelope: &OutgoingEnvelope) -> Result<DeliveryReceipt, MailError> {
        self.record(None);
        self.sent.lock().unwrap().push(envelope.clone());
        let recipients = envelope
            .to
            .iter()
            .chain(envelope.cc.iter())
            .chain(envelope.bcc.iter())
            .cloned()
            .collect();
        Ok(DeliveryReceipt {
            status: "accepted".to_string(),
            message_id: format!("fake-{}@{}", self.calls(), account.imap_host),
            recipients,
            server_response: "250 OK".to_string(),
        })
    }

    async fn create_folder(&self, _account: &Account, name: &str) -> Result<(), MailError> {
        self.record(Some(name));
        Ok(())
    }

    async fn rename_folder(&self, _account: &Account, from: &str, _to: &str) -> Result<(), MailError> {
        self.record(Some(from));
        Ok(())
    }

    async fn delete_folder(&self, _account: &Account, name: &str) -> Result<(), MailError> {
        self.record(Some(name));
        if name == "Missing" {
            return Err(ImapError::FolderNotFound(name.to_string()).into());
        }
        Ok(())
    }

    async fn delete_message(&self, _account: &Account, folder: &str, _uid: u32) -> Result<(), MailError> {
        self.record(Some(folder));
        Ok(())
    }

    async fn move_message(
        &self,
        _account: &Account,
        folder: &str,
        _uid: u32,
        _destination: &str,
    ) -> Result<(), MailError> {
        self.record(Some(folder));
        Ok(())
    }
}

pub fn state(mail: Arc<FakeMailClient>) -> web::Data<AppState> {
    web::Data::new(AppState::new(settings(), AccountStore::in_memory(), mail))
}

/// The full application as the server mounts it.
pub fn test_app(
    state: web::Data<AppState>,
) -> App<
    impl ServiceFactory<
        ServiceRequest,
        Config = (),
        Response = ServiceResponse,
        Error = Error,
        InitError = (),
    >,
> {
    App::new()
        .app_data(state)
        .configure(configure_openapi)
        .configure(configure_rest_service)
}

pub fn token(state: &AppState) -> String {
    state
        .auth
        .issue_token(&Credentials {
            username: OPERATOR.to_string(),
            password: PASSWORD.to_string(),
        })
        .expect("operator credentials are valid")
        .access_token
}

pub fn bearer(token: &str) -> (&'static str, String) {
    ("Authorization", format!("Bearer {}", token))
}

pub async fn add_account(state: &AppState) -> Account {
    state
        .accounts
        .add(NewAccount {
            imap_host: "imap.example.com".to_string(),
            imap_port: Some(993),
            smtp_host: Some("smtp.example.com".to_string()),
            username: "a@example.com".to_string(),
            secret: "x".to_string(),
            ..Default::default()
        })
        .await
        .expect("account is valid")
}

pub fn message(uid: u32, subject: &str, from: &str) -> Message {
    Message {
        uid,
        folder: "INBOX".to_string(),
        message_id: Some(format!("m{}@example.com", uid)),
        in_reply_to: None,
        references: vec![],
        subject: Some(subject.to_string()),
        from: vec![EmailAddress::new(from)],
        to: vec![EmailAddress::new("a@example.com")],
        cc: vec![],
        reply_to: vec![],
        date: None,
        flags: vec![],
        seen: false,
        size: Some(512),
        body_text: Some("Noon?".to_string()),
        body_html: None,
        attachments: vec![],
    }
}
