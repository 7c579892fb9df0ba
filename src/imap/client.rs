// Copyright (c) 2025 TexasFortress.AI
// This Source Code Form is subject to the terms of the Mozilla Public
// License, v. 2.0. If a copy of the MPL was not distributed with this
// file, You can obtain one at http://mozilla.org/MPL/2.0/.

use std::collections::HashMap;
use std::fmt::Debug;
use std::sync::Arc;
use std::time::Duration;

use async_imap::types::{Fetch, Flag, Name, NameAttribute};
use async_imap::{Client as AsyncImapClient, Session as AsyncImapSession};
use chrono::Utc;
use futures_util::io::{AsyncRead, AsyncWrite};
use futures_util::TryStreamExt;
use log::{debug, info, warn};
use rustls_pki_types::ServerName as PkiServerName;
use rustls::{ClientConfig, RootCertStore};
use tokio::net::TcpStream;
use tokio::time::timeout;
use tokio_rustls::TlsConnector;
use tokio_util::compat::TokioAsyncReadCompatExt;

use crate::accounts::Account;
use crate::imap::error::ImapError;
use crate::imap::message::{parse_message, FetchMeta, FETCH_QUERY};
use crate::imap::types::{Folder, Message};
use crate::utils::{decode_mailbox_name, encode_mailbox_name};

const LOGOUT_TIMEOUT: Duration = Duration::from_secs(5);

/// Any byte stream async-imap can drive: TLS or plain TCP.
pub trait ImapStream: AsyncRead + AsyncWrite + Unpin + Send + Debug {}

impl<T> ImapStream for T where T: AsyncRead + AsyncWrite + Unpin + Send + Debug {}

type BoxedStream = Box<dyn ImapStream>;
type UnderlyingImapSession = AsyncImapSession<BoxedStream>;

fn tls_connector() -> Result<TlsConnector, ImapError> {
    let mut root_cert_store = RootCertStore::empty();
    let certs = rustls_native_certs::load_native_certs()
        .map_err(|e| ImapError::Tls(format!("Failed to load native certificates: {}", e)))?;
    let (added, ignored) = root_cert_store.add_parsable_certificates(certs);
    debug!("Loaded {} native certs, ignored {}.", added, ignored);
    if root_cert_store.is_empty() {
        warn!("Root certificate store is empty after loading native certs.");
    }

    let config = ClientConfig::builder_with_provider(Arc::new(
        rustls::crypto::aws_lc_rs::default_provider(),
    ))
    .with_safe_default_protocol_versions()
    .map_err(|e| ImapError::Tls(e.to_string()))?
    .with_root_certificates(root_cert_store)
    .with_no_client_auth();

    Ok(TlsConnector::from(Arc::new(config)))
}

/// TCP connect plus optional TLS handshake.
async fn open_stream(host: &str, port: u16, use_tls: bool) -> Result<BoxedStream, ImapError> {
    debug!("Attempting TCP connection to {}:{}...", host, port);
    let tcp_stream = TcpStream::connect((host, port)).await?;

    if !use_tls {
        debug!("TCP connected, TLS disabled for {}", host);
        return Ok(Box::new(tcp_stream.compat()));
    }

    let server_name = PkiServerName::try_from(host.to_string())
        .map_err(|_| ImapError::Connection(format!("Invalid server name format: {}", host)))?;
    debug!("TCP connected. Performing TLS handshake...");
    let tls_stream = tls_connector()?
        .connect(server_name, tcp_stream)
        .await
        .map_err(|e| ImapError::Tls(e.to_string()))?;
    debug!("TLS handshake successful.");
    Ok(Box::new(tls_stream.compat()))
}

async fn perform_imap_login(
    stream: BoxedStream,
    username: &str,
    password: &str,
) -> Result<UnderlyingImapSession, ImapError> {
    let client = AsyncImapClient::new(stream);
    debug!("IMAP client created. Attempting login for user '{}'...", username);

    match client.login(username, password).await {
        Ok(session) => {
            info!("IMAP login successful for user: {}", username);
            Ok(session)
        }
        Err((async_imap::error::Error::No(msg), _client)) => {
            warn!("IMAP login rejected for user {}: {}", username, msg);
            Err(ImapError::Auth(msg))
        }
        Err((e, _client)) => {
            warn!("IMAP login failed for user {}: {}", username, e);
            Err(ImapError::from(e))
        }
    }
}

fn flag_label(flag: &Flag<'_>) -> String {
    match flag {
        Flag::Seen => "\\Seen".to_string(),
        Flag::Answered => "\\Answered".to_string(),
        Flag::Flagged => "\\Flagged".to_string(),
        Flag::Deleted => "\\Deleted".to_string(),
        Flag::Draft => "\\Draft".to_string(),
        Flag::Recent => "\\Recent".to_string(),
        Flag::MayCreate => "\\*".to_string(),
        Flag::Custom(value) => value.to_string(),
    }
}

/// `NoSelect` becomes `\NoSelect`; extension attributes keep their raw text.
fn attribute_label(attribute: &NameAttribute<'_>) -> String {
    let raw = format!("{:?}", attribute);
    match raw.split_once('(') {
        Some((_, inner)) => inner
            .trim_end_matches(')')
            .trim_matches('"')
            .replace("\\\\", "\\"),
        None => format!("\\{}", raw),
    }
}

fn folder_from_name(name: &Name) -> Folder {
    Folder {
        name: decode_mailbox_name(name.name()),
        delimiter: name.delimiter().map(str::to_string),
        attributes: name.attributes().iter().map(attribute_label).collect(),
    }
}

fn uid_set(uids: &[u32]) -> String {
    uids.iter().map(u32::to_string).collect::<Vec<_>>().join(",")
}

/// One logged-in IMAP session, owned by a single operation.
///
/// Call [`ImapConnection::finish`] with the operation's result to log out on
/// success. Dropping the value without `finish` closes the socket.
pub struct ImapConnection {
    session: UnderlyingImapSession,
}

impl ImapConnection {
    /// Connects and logs in. Both steps together are bounded by
    /// `connect_timeout`.
    pub async fn connect(account: &Account, connect_timeout: Duration) -> Result<Self, ImapError> {
        info!(
            "Connecting to IMAP {}:{} for account {}",
            account.imap_host, account.imap_port, account.id
        );
        let attempt = async {
            let stream = open_stream(&account.imap_host, account.imap_port, account.imap_tls).await?;
            perform_imap_login(stream, &account.username, account.secret.expose()).await
        };

        match timeout(connect_timeout, attempt).await {
            Ok(Ok(session)) => Ok(Self { session }),
            Ok(Err(e)) => Err(e),
            Err(_) => {
                warn!(
                    "IMAP connect to {}:{} timed out after {:?}",
                    account.imap_host, account.imap_port, connect_timeout
                );
                Err(ImapError::Timeout(format!(
                    "connecting to {}:{}",
                    account.imap_host, account.imap_port
                )))
            }
        }
    }

    /// Logs out if the operation succeeded, then hands the result back.
    pub async fn finish<T, E>(mut self, result: Result<T, E>) -> Result<T, E> {
        if result.is_ok() {
            match timeout(LOGOUT_TIMEOUT, self.session.logout()).await {
                Ok(Ok(())) => debug!("IMAP logout complete"),
                Ok(Err(e)) => debug!("IMAP logout failed: {}", e),
                Err(_) => debug!("IMAP logout timed out"),
            }
        }
        result
    }

    pub async fn list_folders(&mut self, reference: &str, pattern: &str) -> Result<Vec<Folder>, ImapError> {
        let names: Vec<Name> = self
            .session
            .list(Some(reference), Some(pattern))
            .await?
            .try_collect()
            .await?;
        Ok(names.iter().map(folder_from_name).collect())
    }

    /// Opens a folder. Read-only opens use `EXAMINE` so nothing changes on
    /// the server.
    pub async fn open_folder(&mut self, folder: &str, read_only: bool) -> Result<(), ImapError> {
        let encoded = encode_mailbox_name(folder);
        let result = if read_only {
            self.session.examine(&encoded).await
        } else {
            self.session.select(&encoded).await
        };
        match result {
            Ok(mailbox) => {
                debug!("Opened {} ({} messages)", folder, mailbox.exists);
                Ok(())
            }
            Err(async_imap::error::Error::No(msg)) => {
                debug!("Server refused to open {}: {}", folder, msg);
                Err(ImapError::FolderNotFound(folder.to_string()))
            }
            Err(e) => Err(e.into()),
        }
    }

    /// `UID SEARCH` in the open folder, ascending.
    pub async fn search_uids(&mut self, query: &str) -> Result<Vec<u32>, ImapError> {
        debug!("UID SEARCH {}", query);
        let mut uids: Vec<u32> = self.session.uid_search(query).await?.into_iter().collect();
        uids.sort_unstable();
        Ok(uids)
    }

    /// Fetches full messages for `uids`, returned in the order requested.
    /// UIDs the server no longer has are skipped.
    pub async fn fetch_uids(&mut self, folder: &str, uids: &[u32]) -> Result<Vec<Message>, ImapError> {
        if uids.is_empty() {
            return Ok(Vec::new());
        }
        let fetches: Vec<Fetch> = self
            .session
            .uid_fetch(uid_set(uids), FETCH_QUERY)
            .await?
            .try_collect()
            .await?;

        let mut by_uid: HashMap<u32, Message> = HashMap::with_capacity(fetches.len());
        for fetch in &fetches {
            let Some(uid) = fetch.uid else {
                continue;
            };
            let meta = FetchMeta {
                uid,
                flags: fetch.flags().map(|f| flag_label(&f)).collect(),
                size: fetch.size,
                internal_date: fetch.internal_date().map(|d| d.with_timezone(&Utc)),
            };
            by_uid.insert(uid, parse_message(folder, meta, fetch.body().unwrap_or_default()));
        }

        Ok(uids.iter().filter_map(|uid| by_uid.remove(uid)).collect())
    }

    pub async fn ensure_uid(&mut self, folder: &str, uid: u32) -> Result<(), ImapError> {
        let found = self.search_uids(&format!("UID {}", uid)).await?;
        if found.contains(&uid) {
            Ok(())
        } else {
            Err(ImapError::MessageNotFound {
                folder: folder.to_string(),
                uid,
            })
        }
    }

    pub async fn create_folder(&mut self, name: &str) -> Result<(), ImapError> {
        self.session.create(encode_mailbox_name(name)).await?;
        Ok(())
    }

    pub async fn rename_folder(&mut self, from: &str, to: &str) -> Result<(), ImapError> {
        self.session
            .rename(encode_mailbox_name(from), encode_mailbox_name(to))
            .await
            .map_err(|e| missing_folder(e, from))
    }

    pub async fn delete_folder(&mut self, name: &str) -> Result<(), ImapError> {
        self.session
            .delete(encode_mailbox_name(name))
            .await
            .map_err(|e| missing_folder(e, name))
    }

    /// Flags one message `\Deleted` and expunges it. Without UIDPLUS the
    /// whole folder is expunged, taking any other `\Deleted` messages along.
    pub async fn delete_uid(&mut self, uid: u32) -> Result<(), ImapError> {
        self.session
            .uid_store(uid.to_string(), "+FLAGS.SILENT (\\Deleted)")
            .await?
            .try_collect::<Vec<_>>()
            .await?;

        if self.has_capability("UIDPLUS").await? {
            self.session
                .uid_expunge(uid.to_string())
                .await?
                .try_collect::<Vec<_>>()
                .await?;
            Ok(())
        } else {
            debug!("Server lacks UIDPLUS, expunging the whole folder for UID {}", uid);
            self.expunge().await
        }
    }

    pub async fn expunge(&mut self) -> Result<(), ImapError> {
        self.session.expunge().await?.try_collect::<Vec<_>>().await?;
        Ok(())
    }

    async fn has_capability(&mut self, name: &str) -> Result<bool, ImapError> {
        let capabilities = self.session.capabilities().await?;
        Ok(capabilities.has_str(name))
    }

    pub async fn supports_move(&mut self) -> Result<bool, ImapError> {
        self.has_capability("MOVE").await
    }

    /// Moves one message out of the open folder, with `UID MOVE` when the
    /// server has it and copy + delete + expunge otherwise.
    pub async fn move_uid(&mut self, uid: u32, destination: &str) -> Result<(), ImapError> {
        let target = encode_mailbox_name(destination);
        if self.supports_move().await? {
            self.session
                .uid_mv(uid.to_string(), &target)
                .await
                .map_err(|e| missing_folder(e, destination))
        } else {
            debug!("Server lacks MOVE, falling back to COPY for UID {}", uid);
            self.session
                .uid_copy(uid.to_string(), &target)
                .await
                .map_err(|e| missing_folder(e, destination))?;
            self.delete_uid(uid).await
        }
    }
}

fn missing_folder(err: async_imap::error::Error, folder: &str) -> ImapError {
    match err {
        async_imap::error::Error::No(_) => ImapError::FolderNotFound(folder.to_string()),
        other => other.into(),
    }
}
