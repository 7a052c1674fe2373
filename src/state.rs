// SPDX-License-Identifier: AGPL-3.0-or-later
//
// Copyright (C) 2026 Relational Network

use std::sync::Arc;

use crate::{
    auth::{
        rate_limit::{FixedWindowLimiter, LruAttemptStore, RateLimiter},
        session::CookiePolicy,
        TokenService,
    },
    config::AppConfig,
    notify::{LogNotifier, Notifier},
    storage::{CredentialStore, ListingStore, MemoryCredentialStore, NotificationStore},
    verification::VerificationWorkflow,
};

#[derive(Clone)]
pub struct AppState {
    pub config: Arc<AppConfig>,
    pub credentials: Arc<dyn CredentialStore>,
    pub listings: Arc<ListingStore>,
    pub notifications: Arc<NotificationStore>,
    pub tokens: Arc<TokenService>,
    pub verification: Arc<VerificationWorkflow>,
    pub login_limiter: Arc<dyn RateLimiter>,
}

impl AppState {
    pub fn new(
        config: AppConfig,
        credentials: Arc<dyn CredentialStore>,
        notifier: Arc<dyn Notifier>,
    ) -> Self {
        let lifetime = chrono::Duration::seconds(
            i64::try_from(config.token_lifetime.as_secs()).unwrap_or(i64::MAX / 1_000),
        );
        let tokens = TokenService::new(&config.jwt_secret, lifetime);
        let verification =
            VerificationWorkflow::new(credentials.clone(), notifier, config.email_timeout);
        let login_limiter = FixedWindowLimiter::new(
            LruAttemptStore::default(),
            config.login_max_attempts,
            config.login_window,
        );

        Self {
            config: Arc::new(config),
            credentials,
            listings: Arc::new(ListingStore::new()),
            notifications: Arc::new(NotificationStore::new()),
            tokens: Arc::new(tokens),
            verification: Arc::new(verification),
            login_limiter: Arc::new(login_limiter),
        }
    }

    /// Replace the in-memory listing and notification stores, typically
    /// with persistent ones.
    pub fn with_content_stores(
        mut self,
        listings: ListingStore,
        notifications: NotificationStore,
    ) -> Self {
        self.listings = Arc::new(listings);
        self.notifications = Arc::new(notifications);
        self
    }

    pub fn cookie_policy(&self) -> CookiePolicy {
        CookiePolicy {
            secure: self.config.is_production(),
            max_age_secs: self.tokens.lifetime().num_seconds(),
        }
    }
}

impl Default for AppState {
    fn default() -> Self {
        Self::new(
            AppConfig::default(),
            Arc::new(MemoryCredentialStore::new()),
            Arc::new(LogNotifier),
        )
    }
}
