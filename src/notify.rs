// SPDX-License-Identifier: AGPL-3.0-or-later
//
// Copyright (C) 2026 Relational Network

//! Outbound email.
//!
//! | Notifier | When |
//! |----------|------|
//! | [`LogNotifier`] | `EMAIL_RELAY_URL` unset (development) |
//! | [`HttpRelayNotifier`] | `EMAIL_RELAY_URL` set; POSTs JSON to the relay |
//!
//! Delivery is best effort. Callers bound each send with a timeout and
//! only log failures.

use std::time::Duration;

use async_trait::async_trait;
use reqwest::Client;
use serde::Serialize;
use tracing::{debug, info};
use url::Url;

#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
pub struct EmailMessage {
    pub to: String,
    pub subject: String,
    pub html: String,
}

#[derive(Debug, thiserror::Error)]
pub enum NotifyError {
    #[error("failed to build HTTP client: {0}")]
    Client(String),

    #[error("relay request failed: {0}")]
    Request(#[from] reqwest::Error),

    #[error("relay rejected message with status {0}")]
    Rejected(u16),
}

#[async_trait]
pub trait Notifier: Send + Sync {
    async fn send(&self, message: &EmailMessage) -> Result<(), NotifyError>;
}

/// Development notifier. Logs the message instead of sending it.
#[derive(Clone, Debug)]
pub struct LogNotifier;

#[async_trait]
impl Notifier for LogNotifier {
    async fn send(&self, message: &EmailMessage) -> Result<(), NotifyError> {
        info!(to = %message.to, subject = %message.subject, "email send stub");
        debug!(html = %message.html, "email body");
        Ok(())
    }
}

#[derive(Serialize)]
struct RelayPayload<'a> {
    from: &'a str,
    to: &'a str,
    subject: &'a str,
    html: &'a str,
}

/// Hands messages to an HTTP mail relay.
pub struct HttpRelayNotifier {
    http: Client,
    endpoint: Url,
    from: String,
}

impl HttpRelayNotifier {
    pub fn new(endpoint: Url, from: String, timeout: Duration) -> Result<Self, NotifyError> {
        let http = Client::builder()
            .timeout(timeout)
            .build()
            .map_err(|e| NotifyError::Client(e.to_string()))?;
        Ok(Self {
            http,
            endpoint,
            from,
        })
    }
}

#[async_trait]
impl Notifier for HttpRelayNotifier {
    async fn send(&self, message: &EmailMessage) -> Result<(), NotifyError> {
        let payload = RelayPayload {
            from: &self.from,
            to: &message.to,
            subject: &message.subject,
            html: &message.html,
        };
        let response = self
            .http
            .post(self.endpoint.clone())
            .json(&payload)
            .send()
            .await?;
        if !response.status().is_success() {
            return Err(NotifyError::Rejected(response.status().as_u16()));
        }
        debug!(to = %message.to, "email handed to relay");
        Ok(())
    }
}

// =============================================================================
// Templates
// =============================================================================

pub fn verification_email(to: &str, code: &str, valid_minutes: i64) -> EmailMessage {
    EmailMessage {
        to: to.to_string(),
        subject: "Your verification code".to_string(),
        html: format!(
            "<p>Your verification code is <b>{code}</b>.</p>\
             <p>It expires in {valid_minutes} minutes.</p>"
        ),
    }
}

pub fn login_verification_email(to: &str, code: &str, valid_minutes: i64) -> EmailMessage {
    EmailMessage {
        subject: "Verify your email".to_string(),
        ..verification_email(to, code, valid_minutes)
    }
}

pub fn password_reset_email(to: &str, code: &str, valid_minutes: i64) -> EmailMessage {
    EmailMessage {
        to: to.to_string(),
        subject: "Password Reset Code".to_string(),
        html: format!(
            "<p>Use <b>{code}</b> to reset your password.</p>\
             <p>It expires in {valid_minutes} minutes. If you did not ask for this, ignore this email.</p>"
        ),
    }
}
