// SPDX-License-Identifier: AGPL-3.0-or-later
//
// Copyright (C) 2026 Relational Network

//! Session credential transport.
//!
//! A token reaches the server either in the `authentication` cookie or as
//! `Authorization: Bearer <token>`. Cookies are issued `HttpOnly` and
//! `SameSite=Strict`, and `Secure` outside development.

use axum::http::{
    header::{AUTHORIZATION, COOKIE},
    HeaderMap, HeaderValue,
};
use cookie::{time, Cookie, SameSite};

pub const SESSION_COOKIE: &str = "authentication";

/// Cookie attributes derived from configuration.
#[derive(Debug, Clone, Copy)]
pub struct CookiePolicy {
    pub secure: bool,
    pub max_age_secs: i64,
}

impl CookiePolicy {
    fn base(&self, value: String) -> Cookie<'static> {
        let mut cookie = Cookie::new(SESSION_COOKIE, value);
        cookie.set_http_only(true);
        cookie.set_secure(self.secure);
        cookie.set_same_site(SameSite::Strict);
        cookie.set_path("/");
        cookie
    }

    /// `Set-Cookie` value carrying a fresh session token.
    pub fn session_cookie(&self, token: &str) -> Option<HeaderValue> {
        let mut cookie = self.base(token.to_owned());
        cookie.set_max_age(time::Duration::seconds(self.max_age_secs));
        HeaderValue::from_str(&cookie.to_string()).ok()
    }

    /// `Set-Cookie` value that clears the session cookie.
    pub fn clearing_cookie(&self) -> Option<HeaderValue> {
        let mut cookie = self.base(String::new());
        cookie.make_removal();
        HeaderValue::from_str(&cookie.to_string()).ok()
    }
}

/// Every candidate token on the request, cookies first, in header order.
///
/// Several `authentication` cookies can arrive at once (one per account
/// kind the browser logged into); the resolver tries each.
pub fn credential_candidates(headers: &HeaderMap) -> Vec<String> {
    let mut candidates: Vec<String> = headers
        .get_all(COOKIE)
        .iter()
        .filter_map(|value| value.to_str().ok())
        .flat_map(|header| header.split(';'))
        .filter_map(|pair| Cookie::parse(pair.trim()).ok())
        .filter(|cookie| cookie.name() == SESSION_COOKIE && !cookie.value().is_empty())
        .map(|cookie| cookie.value().to_owned())
        .collect();

    let bearer = headers
        .get(AUTHORIZATION)
        .and_then(|value| value.to_str().ok())
        .and_then(|value| value.strip_prefix("Bearer "))
        .map(str::trim)
        .filter(|token| !token.is_empty());
    if let Some(token) = bearer {
        candidates.push(token.to_owned());
    }

    candidates
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn collects_every_session_cookie_then_bearer() {
        let mut headers = HeaderMap::new();
        headers.insert(
            COOKIE,
            HeaderValue::from_static("theme=dark; authentication=aaa; authentication=bbb"),
        );
        headers.insert(AUTHORIZATION, HeaderValue::from_static("Bearer ccc"));

        assert_eq!(credential_candidates(&headers), vec!["aaa", "bbb", "ccc"]);
    }

    #[test]
    fn ignores_other_schemes_and_empty_values() {
        let mut headers = HeaderMap::new();
        headers.insert(COOKIE, HeaderValue::from_static("authentication="));
        headers.insert(AUTHORIZATION, HeaderValue::from_static("Basic dXNlcjpwYXNz"));

        assert!(credential_candidates(&headers).is_empty());
    }

    #[test]
    fn session_cookie_has_strict_attributes() {
        let policy = CookiePolicy {
            secure: true,
            max_age_secs: 86_400,
        };
        let value = policy.session_cookie("tok").unwrap();
        let text = value.to_str().unwrap();
        assert!(text.starts_with("authentication=tok"));
        assert!(text.contains("HttpOnly"));
        assert!(text.contains("SameSite=Strict"));
        assert!(text.contains("Secure"));
        assert!(text.contains("Max-Age=86400"));
    }

    #[test]
    fn development_cookie_is_not_secure() {
        let policy = CookiePolicy {
            secure: false,
            max_age_secs: 60,
        };
        let text = policy.session_cookie("tok").unwrap();
        assert!(!text.to_str().unwrap().contains("Secure"));
    }

    #[test]
    fn clearing_cookie_expires_immediately() {
        let policy = CookiePolicy {
            secure: false,
            max_age_secs: 60,
        };
        let value = policy.clearing_cookie().unwrap();
        let text = value.to_str().unwrap();
        assert!(text.starts_with("authentication=;"));
        assert!(text.contains("Max-Age=0"));
    }
}
