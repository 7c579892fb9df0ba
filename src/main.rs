// Copyright (c) 2025 TexasFortress.AI
// This Source Code Form is subject to the terms of the Mozilla Public
// License, v. 2.0. If a copy of the MPL was not distributed with this
// file, You can obtain one at http://mozilla.org/MPL/2.0/.

use std::io::{Error as IoError, ErrorKind};
use std::sync::Arc;

use actix_cors::Cors;
use actix_web::{
    http::header,
    middleware::{Condition, Logger},
    web::Data,
    App, HttpServer,
};
use clap::Parser;
use env_logger::Env;
use log::{info, warn};

use mailgate::{
    accounts::AccountStore,
    api::{configure_rest_service, openapi_docs::configure_openapi, AppState},
    config::Settings,
    mail::{MailClient, RemoteMailClient},
};

#[derive(Parser)]
#[command(name = "mailgate-server", about = "REST gateway for IMAP and SMTP mailboxes")]
struct Cli {
    /// TOML configuration file
    #[arg(long, env = "MAILGATE_CONFIG")]
    config: Option<String>,

    /// Overrides server.host
    #[arg(long)]
    host: Option<String>,

    /// Overrides server.port
    #[arg(long)]
    port: Option<u16>,
}

fn startup_error(context: &str, err: impl std::fmt::Display) -> IoError {
    IoError::new(ErrorKind::Other, format!("{}: {}", context, err))
}

fn build_cors(origins: &[String]) -> Cors {
    let mut cors = Cors::default()
        .allowed_methods(vec!["GET", "POST", "PUT", "DELETE", "OPTIONS"])
        .allowed_headers(vec![
            header::CONTENT_TYPE,
            header::AUTHORIZATION,
            header::ACCEPT,
            header::ORIGIN,
        ])
        .max_age(3600);

    for origin in origins {
        cors = cors.allowed_origin(origin);
    }

    cors
}

#[actix_web::main]
async fn main() -> std::io::Result<()> {
    if std::env::var("ENVIRONMENT").as_deref() != Ok("production") {
        dotenvy::dotenv().ok();
    }

    let cli = Cli::parse();

    let mut settings = Settings::new(cli.config.as_deref()).map_err(|e| startup_error("Invalid configuration", e))?;
    if let Some(host) = cli.host {
        settings.server.host = host;
    }
    if let Some(port) = cli.port {
        settings.server.port = port;
    }

    env_logger::Builder::from_env(Env::default().default_filter_or(settings.log.level.as_str())).init();

    let accounts = match settings.accounts.storage_path.as_deref() {
        Some(path) => {
            info!("Loading accounts from {}", path);
            AccountStore::open(path)
                .await
                .map_err(|e| startup_error("Failed to load account store", e))?
        }
        None => {
            warn!("No accounts.storage_path configured; accounts are kept in memory only");
            AccountStore::in_memory()
        }
    };

    if let Some(account) = accounts
        .seed(&settings.bootstrap)
        .await
        .map_err(|e| startup_error("Failed to seed bootstrap account", e))?
    {
        info!("Seeded account {} for {}", account.id, account.username);
    }

    let bind_address = format!("{}:{}", settings.server.host, settings.server.port);
    let workers = settings.server.workers;
    let cors_origins = settings.server.cors_origins.clone();

    let mail: Arc<dyn MailClient> = Arc::new(RemoteMailClient::new(settings.mail.clone()));
    let app_state = Data::new(AppState::new(settings, accounts, mail));

    info!("Starting mailgate {} at http://{}", env!("CARGO_PKG_VERSION"), bind_address);

    let mut server = HttpServer::new(move || {
        App::new()
            .wrap(Logger::default())
            .wrap(Condition::new(!cors_origins.is_empty(), build_cors(&cors_origins)))
            .app_data(app_state.clone())
            .configure(configure_openapi)
            .configure(configure_rest_service)
    });
    if let Some(workers) = workers {
        server = server.workers(workers);
    }

    server.bind(bind_address)?.run().await
}
