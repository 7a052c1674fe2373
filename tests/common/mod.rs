// SPDX-License-Identifier: AGPL-3.0-or-later
//
// Copyright (C) 2026 Relational Network

#![allow(dead_code)]

use std::sync::Arc;

use async_trait::async_trait;
use axum::{
    body::Body,
    http::{header, HeaderMap, Method, Request, StatusCode},
    Router,
};
use http_body_util::BodyExt;
use listing_server::{
    api::router,
    config::AppConfig,
    notify::{EmailMessage, Notifier, NotifyError},
    state::AppState,
    storage::MemoryCredentialStore,
};
use serde_json::{json, Value};
use tokio::sync::Mutex;
use tower::ServiceExt;

/// Keeps every message so tests can read the codes.
#[derive(Default)]
pub struct RecordingNotifier {
    sent: Mutex<Vec<EmailMessage>>,
}

#[async_trait]
impl Notifier for RecordingNotifier {
    async fn send(&self, message: &EmailMessage) -> Result<(), NotifyError> {
        self.sent.lock().await.push(message.clone());
        Ok(())
    }
}

impl RecordingNotifier {
    /// Code from the most recent message sent to `email`.
    pub async fn last_code(&self, email: &str) -> String {
        let sent = self.sent.lock().await;
        let message = sent
            .iter()
            .rev()
            .find(|m| m.to == email)
            .unwrap_or_else(|| panic!("no email sent to {email}"));
        message
            .html
            .split("<b>")
            .nth(1)
            .and_then(|rest| rest.split("</b>").next())
            .unwrap()
            .to_string()
    }

    pub async fn count_to(&self, email: &str) -> usize {
        self.sent.lock().await.iter().filter(|m| m.to == email).count()
    }
}

pub struct TestApp {
    pub router: Router,
    pub state: AppState,
    pub mail: Arc<RecordingNotifier>,
}

pub struct Reply {
    pub status: StatusCode,
    pub headers: HeaderMap,
    pub body: Value,
}

impl Reply {
    /// `authentication=<token>` pair from `Set-Cookie`.
    pub fn session_cookie(&self) -> String {
        let raw = self
            .headers
            .get(header::SET_COOKIE)
            .expect("set-cookie header")
            .to_str()
            .unwrap();
        raw.split(';').next().unwrap().trim().to_string()
    }
}

impl TestApp {
    pub fn new() -> Self {
        Self::with_config(AppConfig {
            trust_proxy_headers: true,
            ..AppConfig::default()
        })
    }

    pub fn with_config(config: AppConfig) -> Self {
        let mail = Arc::new(RecordingNotifier::default());
        let state = AppState::new(config, Arc::new(MemoryCredentialStore::new()), mail.clone());
        Self {
            router: router(state.clone()),
            state,
            mail,
        }
    }

    pub async fn request(
        &self,
        method: Method,
        uri: &str,
        body: Option<Value>,
        cookies: &[&str],
        headers: &[(&str, &str)],
    ) -> Reply {
        let mut builder = Request::builder().method(method).uri(uri);
        for cookie in cookies {
            builder = builder.header(header::COOKIE, *cookie);
        }
        for (name, value) in headers {
            builder = builder.header(*name, *value);
        }
        let body = match body {
            Some(value) => {
                builder = builder.header(header::CONTENT_TYPE, "application/json");
                Body::from(value.to_string())
            }
            None => Body::empty(),
        };

        let response = self
            .router
            .clone()
            .oneshot(builder.body(body).unwrap())
            .await
            .unwrap();
        let status = response.status();
        let headers = response.headers().clone();
        let bytes = response.into_body().collect().await.unwrap().to_bytes();
        let body = if bytes.is_empty() {
            Value::Null
        } else {
            serde_json::from_slice(&bytes).unwrap_or(Value::Null)
        };
        Reply {
            status,
            headers,
            body,
        }
    }

    pub async fn post(&self, uri: &str, body: Value, cookies: &[&str]) -> Reply {
        self.request(Method::POST, uri, Some(body), cookies, &[]).await
    }

    pub async fn put(&self, uri: &str, body: Value, cookies: &[&str]) -> Reply {
        self.request(Method::PUT, uri, Some(body), cookies, &[]).await
    }

    pub async fn get(&self, uri: &str, cookies: &[&str]) -> Reply {
        self.request(Method::GET, uri, None, cookies, &[]).await
    }

    /// Register, verify and log in. Returns the session cookie pair.
    /// `group` is the route prefix: `auth`, `propertyProvider` or `admin`.
    pub async fn signed_in(&self, group: &str, username: &str) -> String {
        let email = format!("{username}@example.com");
        let registered = self
            .post(
                &format!("/api/{group}/register"),
                json!({
                    "username": username,
                    "email": email,
                    "password": "Secret#1",
                    "firstname": "Test",
                    "lastname": "Person",
                }),
                &[],
            )
            .await;
        assert_eq!(registered.status, StatusCode::CREATED, "{}", registered.body);

        let code = self.mail.last_code(&email).await;
        let verified = self
            .post(
                &format!("/api/{group}/verify"),
                json!({ "email": email, "otp": code }),
                &[],
            )
            .await;
        assert_eq!(verified.status, StatusCode::OK, "{}", verified.body);

        self.login(group, &email, "Secret#1").await.session_cookie()
    }

    pub async fn login(&self, group: &str, email: &str, password: &str) -> Reply {
        self.post(
            &format!("/api/{group}/login"),
            json!({ "email": email, "password": password }),
            &[],
        )
        .await
    }

    /// Id of the principal behind `cookie` as seen by `group`.
    pub async fn whoami(&self, group: &str, cookie: &str) -> String {
        let reply = self.get(&format!("/api/{group}/user"), &[cookie]).await;
        assert_eq!(reply.status, StatusCode::OK, "{}", reply.body);
        reply.body["data"]["user"]["id"].as_str().unwrap().to_string()
    }
}
