// SPDX-License-Identifier: AGPL-3.0-or-later
//
// Copyright (C) 2026 Relational Network

use std::{net::SocketAddr, sync::Arc, time::Duration};

use axum_server::{tls_rustls::RustlsConfig, Handle};
use listing_server::{
    api::router,
    config::{AppConfig, LogFormat, CREDENTIALS_DB_FILE},
    notify::{HttpRelayNotifier, LogNotifier, Notifier},
    state::AppState,
    storage::{
        CredentialStore, ListingStore, MemoryCredentialStore, NotificationStore,
        RedbCredentialStore,
    },
    telemetry::init_tracing,
};
use tracing::{info, warn};

const SHUTDOWN_GRACE: Duration = Duration::from_secs(10);

#[tokio::main]
async fn main() -> Result<(), Box<dyn std::error::Error + Send + Sync>> {
    init_tracing(LogFormat::from_env())?;
    let config = AppConfig::from_env()?;
    info!(
        environment = ?config.environment,
        log_format = ?config.log_format,
        "configuration loaded"
    );

    // Install the ring crypto provider for rustls before any TLS setup.
    if rustls::crypto::ring::default_provider()
        .install_default()
        .is_err()
    {
        warn!("rustls crypto provider already installed");
    }

    let (credentials, listings, notifications): (Arc<dyn CredentialStore>, _, _) =
        match &config.data_dir {
            Some(dir) => {
                std::fs::create_dir_all(dir)?;
                let path = dir.join(CREDENTIALS_DB_FILE);
                info!(path = %path.display(), "opening credential database");
                let store = RedbCredentialStore::open(&path)?;
                let db = store.database();
                (
                    Arc::new(store),
                    ListingStore::persistent(Arc::clone(&db)).await?,
                    NotificationStore::persistent(db).await?,
                )
            }
            None => {
                warn!("DATA_DIR unset; accounts and listings are kept in memory and lost on restart");
                (
                    Arc::new(MemoryCredentialStore::new()),
                    ListingStore::new(),
                    NotificationStore::new(),
                )
            }
        };

    let notifier: Arc<dyn Notifier> = match &config.email_relay_url {
        Some(url) => Arc::new(HttpRelayNotifier::new(
            url.clone(),
            config.email_from.clone(),
            config.email_timeout,
        )?),
        None => {
            info!("EMAIL_RELAY_URL unset; emails are logged, not sent");
            Arc::new(LogNotifier)
        }
    };

    let addr = config.bind_addr;
    let tls = config.tls.clone();
    let state = AppState::new(config, credentials, notifier)
        .with_content_stores(listings, notifications);
    let app = router(state).into_make_service_with_connect_info::<SocketAddr>();

    let handle: Handle<SocketAddr> = Handle::new();
    tokio::spawn(shutdown_signal(handle.clone()));

    match tls {
        Some(paths) => {
            let tls_config = RustlsConfig::from_pem_file(&paths.cert, &paths.key).await?;
            info!("Listing server listening on https://{addr} (docs at /docs)");
            axum_server::bind_rustls(addr, tls_config)
                .handle(handle)
                .serve(app)
                .await?;
        }
        None => {
            info!("Listing server listening on http://{addr} (docs at /docs)");
            axum_server::bind(addr).handle(handle).serve(app).await?;
        }
    }

    info!("server stopped");
    Ok(())
}

async fn shutdown_signal(handle: Handle<SocketAddr>) {
    let ctrl_c = async {
        if let Err(e) = tokio::signal::ctrl_c().await {
            warn!(error = %e, "failed to listen for ctrl-c");
            std::future::pending::<()>().await;
        }
    };

    #[cfg(unix)]
    let terminate = async {
        match tokio::signal::unix::signal(tokio::signal::unix::SignalKind::terminate()) {
            Ok(mut signal) => {
                signal.recv().await;
            }
            Err(e) => {
                warn!(error = %e, "failed to listen for SIGTERM");
                std::future::pending::<()>().await;
            }
        }
    };

    #[cfg(not(unix))]
    let terminate = std::future::pending::<()>();

    tokio::select! {
        _ = ctrl_c => {},
        _ = terminate => {},
    }

    info!("shutdown signal received, draining connections");
    handle.graceful_shutdown(Some(SHUTDOWN_GRACE));
}
