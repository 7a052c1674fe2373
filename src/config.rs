// SPDX-License-Identifier: AGPL-3.0-or-later
//
// Copyright (C) 2026 Relational Network

//! # Runtime Configuration
//!
//! Configuration is read from the environment once at startup.
//!
//! ## Environment Variables
//!
//! | Variable | Description | Default |
//! |----------|-------------|---------|
//! | `HOST` | Server bind address | `0.0.0.0` |
//! | `PORT` | Server bind port | `8080` |
//! | `APP_ENV` | `production` or `development` | `development` |
//! | `JWT_SECRET` | HS256 signing secret, at least 32 bytes | Required in production |
//! | `JWT_EXPIRATION_SECS` | Token lifetime | `86400` |
//! | `DATA_DIR` | Directory for the redb credential database | unset (in-memory) |
//! | `EMAIL_RELAY_URL` | HTTP mail relay endpoint | unset (log only) |
//! | `EMAIL_FROM` | Sender address | `no-reply@localhost` |
//! | `EMAIL_TIMEOUT_MS` | Per-message delivery bound | `5000` |
//! | `LOGIN_RATE_LIMIT_MAX` | Login attempts per window | `5` |
//! | `LOGIN_RATE_LIMIT_WINDOW_SECS` | Login window | `900` |
//! | `TRUST_PROXY_HEADERS` | Key throttling on `X-Forwarded-For` | `false` |
//! | `CORS_ORIGIN` | Browser origin allowed to send cookies | unset (permissive, no credentials) |
//! | `TLS_CERT_PATH` / `TLS_KEY_PATH` | PEM files; both set enables HTTPS | unset |
//! | `LOG_FORMAT` | Logging format (`json` or `pretty`) | `pretty` |
//! | `RUST_LOG` | Log level filter | `info,tower_http=debug` |

use std::{net::SocketAddr, path::PathBuf, time::Duration};

use rand::{distr::Alphanumeric, Rng};
use tracing::warn;
use url::Url;

pub const HOST_ENV: &str = "HOST";
pub const PORT_ENV: &str = "PORT";
pub const APP_ENV_ENV: &str = "APP_ENV";
pub const JWT_SECRET_ENV: &str = "JWT_SECRET";
pub const JWT_EXPIRATION_ENV: &str = "JWT_EXPIRATION_SECS";
/// Directory holding `credentials.redb`. Unset keeps everything in memory.
pub const DATA_DIR_ENV: &str = "DATA_DIR";
pub const EMAIL_RELAY_URL_ENV: &str = "EMAIL_RELAY_URL";
pub const EMAIL_FROM_ENV: &str = "EMAIL_FROM";
pub const EMAIL_TIMEOUT_ENV: &str = "EMAIL_TIMEOUT_MS";
pub const LOGIN_RATE_LIMIT_MAX_ENV: &str = "LOGIN_RATE_LIMIT_MAX";
pub const LOGIN_RATE_LIMIT_WINDOW_ENV: &str = "LOGIN_RATE_LIMIT_WINDOW_SECS";
pub const TRUST_PROXY_HEADERS_ENV: &str = "TRUST_PROXY_HEADERS";
pub const CORS_ORIGIN_ENV: &str = "CORS_ORIGIN";
pub const TLS_CERT_PATH_ENV: &str = "TLS_CERT_PATH";
pub const TLS_KEY_PATH_ENV: &str = "TLS_KEY_PATH";
pub const LOG_FORMAT_ENV: &str = "LOG_FORMAT";

/// File name of the credential database inside `DATA_DIR`.
pub const CREDENTIALS_DB_FILE: &str = "credentials.redb";

const MIN_SECRET_LEN: usize = 32;

#[derive(Debug, thiserror::Error, PartialEq, Eq)]
pub enum ConfigError {
    #[error("{0} is required in production")]
    Missing(&'static str),

    #[error("{name} has an invalid value: {reason}")]
    Invalid { name: &'static str, reason: String },
}

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum Environment {
    Development,
    Production,
}

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum LogFormat {
    Json,
    Pretty,
}

impl LogFormat {
    fn parse(raw: Option<&str>) -> Self {
        match raw.map(str::trim) {
            Some("json") => LogFormat::Json,
            _ => LogFormat::Pretty,
        }
    }

    /// Read only `LOG_FORMAT`, so logging can start before the rest of the
    /// configuration is parsed.
    pub fn from_env() -> Self {
        Self::parse(std::env::var(LOG_FORMAT_ENV).ok().as_deref())
    }
}

#[derive(Debug, Clone, PartialEq, Eq)]
pub struct TlsPaths {
    pub cert: PathBuf,
    pub key: PathBuf,
}

#[derive(Clone)]
pub struct AppConfig {
    pub bind_addr: SocketAddr,
    pub environment: Environment,
    pub jwt_secret: Vec<u8>,
    pub token_lifetime: Duration,
    pub data_dir: Option<PathBuf>,
    pub email_relay_url: Option<Url>,
    pub email_from: String,
    pub email_timeout: Duration,
    pub login_max_attempts: u32,
    pub login_window: Duration,
    pub trust_proxy_headers: bool,
    pub cors_origin: Option<Url>,
    pub tls: Option<TlsPaths>,
    pub log_format: LogFormat,
}

impl std::fmt::Debug for AppConfig {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("AppConfig")
            .field("bind_addr", &self.bind_addr)
            .field("environment", &self.environment)
            .field("jwt_secret", &"<redacted>")
            .field("token_lifetime", &self.token_lifetime)
            .field("data_dir", &self.data_dir)
            .field("email_relay_url", &self.email_relay_url)
            .field("login_max_attempts", &self.login_max_attempts)
            .field("login_window", &self.login_window)
            .field("tls", &self.tls)
            .finish_non_exhaustive()
    }
}

impl Default for AppConfig {
    /// Development defaults with a random signing secret.
    fn default() -> Self {
        Self {
            bind_addr: SocketAddr::from(([0, 0, 0, 0], 8080)),
            environment: Environment::Development,
            jwt_secret: random_secret(),
            token_lifetime: Duration::from_secs(86_400),
            data_dir: None,
            email_relay_url: None,
            email_from: "no-reply@localhost".to_string(),
            email_timeout: Duration::from_millis(5_000),
            login_max_attempts: 5,
            login_window: Duration::from_secs(900),
            trust_proxy_headers: false,
            cors_origin: None,
            tls: None,
            log_format: LogFormat::Pretty,
        }
    }
}

impl AppConfig {
    pub fn from_env() -> Result<Self, ConfigError> {
        Self::from_lookup(|name| std::env::var(name).ok())
    }

    /// Build from an arbitrary variable source.
    pub fn from_lookup(lookup: impl Fn(&str) -> Option<String>) -> Result<Self, ConfigError> {
        let get = |name: &str| lookup(name).filter(|v| !v.trim().is_empty());
        let defaults = Self::default();

        let environment = match get(APP_ENV_ENV).as_deref() {
            None | Some("development") | Some("dev") | Some("local") => Environment::Development,
            Some("production") | Some("prod") => Environment::Production,
            Some(other) => {
                return Err(ConfigError::Invalid {
                    name: APP_ENV_ENV,
                    reason: format!("unknown environment '{other}'"),
                })
            }
        };

        let host = get(HOST_ENV).unwrap_or_else(|| "0.0.0.0".to_string());
        let port: u16 = parse_or(get(PORT_ENV), PORT_ENV, 8080)?;
        let bind_addr = format!("{host}:{port}")
            .parse()
            .map_err(|e| ConfigError::Invalid {
                name: HOST_ENV,
                reason: format!("{e}"),
            })?;

        let jwt_secret = match get(JWT_SECRET_ENV) {
            Some(secret) if secret.len() >= MIN_SECRET_LEN => secret.into_bytes(),
            Some(_) if environment == Environment::Production => {
                return Err(ConfigError::Invalid {
                    name: JWT_SECRET_ENV,
                    reason: format!("must be at least {MIN_SECRET_LEN} bytes"),
                })
            }
            None if environment == Environment::Production => {
                return Err(ConfigError::Missing(JWT_SECRET_ENV))
            }
            Some(_) | None => {
                warn!("{JWT_SECRET_ENV} unset or too short; using a random per-process secret");
                defaults.jwt_secret
            }
        };

        let token_lifetime = Duration::from_secs(parse_or(
            get(JWT_EXPIRATION_ENV),
            JWT_EXPIRATION_ENV,
            86_400u64,
        )?);
        if token_lifetime.is_zero() {
            return Err(ConfigError::Invalid {
                name: JWT_EXPIRATION_ENV,
                reason: "must be positive".into(),
            });
        }

        let email_relay_url = get(EMAIL_RELAY_URL_ENV)
            .map(|raw| Url::parse(&raw))
            .transpose()
            .map_err(|e| ConfigError::Invalid {
                name: EMAIL_RELAY_URL_ENV,
                reason: e.to_string(),
            })?;

        let cors_origin = get(CORS_ORIGIN_ENV)
            .map(|raw| Url::parse(&raw))
            .transpose()
            .map_err(|e| ConfigError::Invalid {
                name: CORS_ORIGIN_ENV,
                reason: e.to_string(),
            })?;

        let tls = match (get(TLS_CERT_PATH_ENV), get(TLS_KEY_PATH_ENV)) {
            (Some(cert), Some(key)) => Some(TlsPaths {
                cert: cert.into(),
                key: key.into(),
            }),
            (None, None) => None,
            _ => {
                return Err(ConfigError::Invalid {
                    name: TLS_CERT_PATH_ENV,
                    reason: format!("{TLS_CERT_PATH_ENV} and {TLS_KEY_PATH_ENV} must be set together"),
                })
            }
        };

        let log_format = LogFormat::parse(get(LOG_FORMAT_ENV).as_deref());

        Ok(Self {
            bind_addr,
            environment,
            jwt_secret,
            token_lifetime,
            data_dir: get(DATA_DIR_ENV).map(PathBuf::from),
            email_relay_url,
            email_from: get(EMAIL_FROM_ENV).unwrap_or(defaults.email_from),
            email_timeout: Duration::from_millis(parse_or(
                get(EMAIL_TIMEOUT_ENV),
                EMAIL_TIMEOUT_ENV,
                5_000u64,
            )?),
            login_max_attempts: parse_or(get(LOGIN_RATE_LIMIT_MAX_ENV), LOGIN_RATE_LIMIT_MAX_ENV, 5)?,
            login_window: Duration::from_secs(parse_or(
                get(LOGIN_RATE_LIMIT_WINDOW_ENV),
                LOGIN_RATE_LIMIT_WINDOW_ENV,
                900u64,
            )?),
            trust_proxy_headers: parse_or(get(TRUST_PROXY_HEADERS_ENV), TRUST_PROXY_HEADERS_ENV, false)?,
            cors_origin,
            tls,
            log_format,
        })
    }

    pub fn is_production(&self) -> bool {
        self.environment == Environment::Production
    }
}

fn parse_or<T>(raw: Option<String>, name: &'static str, default: T) -> Result<T, ConfigError>
where
    T: std::str::FromStr,
    T::Err: std::fmt::Display,
{
    match raw {
        Some(value) => value.trim().parse().map_err(|e: T::Err| ConfigError::Invalid {
            name,
            reason: e.to_string(),
        }),
        None => Ok(default),
    }
}

fn random_secret() -> Vec<u8> {
    rand::rng()
        .sample_iter(Alphanumeric)
        .take(64)
        .collect()
}
