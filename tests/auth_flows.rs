// SPDX-License-Identifier: AGPL-3.0-or-later
//
// Copyright (C) 2026 Relational Network

mod common;

use axum::http::{header, Method, StatusCode};
use common::TestApp;
use serde_json::json;

#[tokio::test]
async fn register_verify_login_and_replay() {
    let app = TestApp::new();

    let registered = app
        .post(
            "/api/auth/register",
            json!({ "username": "alice", "email": "Alice@X.com", "password": "Secret#1" }),
            &[],
        )
        .await;
    assert_eq!(registered.status, StatusCode::CREATED);
    assert_eq!(registered.body["success"], true);
    assert_eq!(registered.body["data"]["email"], "alice@x.com");
    assert!(registered.body["data"]["expiresAt"].is_string());
    let first_code = app.mail.last_code("alice@x.com").await;

    // Login before verifying: no token, a fresh code instead.
    let early = app.login("auth", "alice@x.com", "Secret#1").await;
    assert_eq!(early.status, StatusCode::FORBIDDEN);
    assert!(early.headers.get(header::SET_COOKIE).is_none());
    assert_eq!(early.body["data"]["email"], "alice@x.com");
    let second_code = app.mail.last_code("alice@x.com").await;
    assert_ne!(first_code, second_code);
    assert_eq!(app.mail.count_to("alice@x.com").await, 2);

    // The superseded code no longer works.
    let stale = app
        .post(
            "/api/auth/verify",
            json!({ "email": "alice@x.com", "otp": first_code }),
            &[],
        )
        .await;
    assert_eq!(stale.status, StatusCode::BAD_REQUEST);

    let verified = app
        .post(
            "/api/auth/verify",
            json!({ "email": "alice@x.com", "otp": second_code }),
            &[],
        )
        .await;
    assert_eq!(verified.status, StatusCode::OK);
    assert_eq!(verified.body["message"], "Email verified successfully.");

    let replay = app
        .post(
            "/api/auth/verify",
            json!({ "email": "alice@x.com", "otp": second_code }),
            &[],
        )
        .await;
    assert_eq!(replay.status, StatusCode::BAD_REQUEST);
    assert_eq!(replay.body["success"], false);

    let login = app.login("auth", "alice@x.com", "Secret#1").await;
    assert_eq!(login.status, StatusCode::OK);
    let set_cookie = login.headers[header::SET_COOKIE].to_str().unwrap().to_string();
    assert!(set_cookie.starts_with("authentication="));
    assert!(set_cookie.contains("HttpOnly"));
    assert!(set_cookie.contains("SameSite=Strict"));
    assert!(set_cookie.contains("Max-Age=86400"));

    let me = app.get("/api/auth/user", &[login.session_cookie().as_str()]).await;
    assert_eq!(me.status, StatusCode::OK);
    assert_eq!(me.body["data"]["user"]["username"], "alice");
    assert!(me.body["data"]["user"].get("secretHash").is_none());
}

#[tokio::test]
async fn verify_with_unknown_email_is_generic() {
    let app = TestApp::new();
    let reply = app
        .post(
            "/api/auth/verify",
            json!({ "email": "ghost@example.com", "otp": "12345" }),
            &[],
        )
        .await;
    assert_eq!(reply.status, StatusCode::BAD_REQUEST);
    assert_eq!(reply.body["message"], "Invalid or expired OTP.");
}

#[tokio::test]
async fn validation_errors_list_fields() {
    let app = TestApp::new();
    let reply = app
        .post(
            "/api/propertyProvider/register",
            json!({ "username": "ab", "email": "nope", "password": "123" }),
            &[],
        )
        .await;
    assert_eq!(reply.status, StatusCode::BAD_REQUEST);
    let fields: Vec<&str> = reply.body["errors"]
        .as_array()
        .unwrap()
        .iter()
        .map(|e| e["field"].as_str().unwrap())
        .collect();
    assert!(fields.contains(&"username"));
    assert!(fields.contains(&"email"));
    assert!(fields.contains(&"password"));
    assert!(fields.contains(&"firstname"));
}

#[tokio::test]
async fn malformed_json_uses_error_envelope() {
    let app = TestApp::new();
    let reply = app
        .request(
            Method::POST,
            "/api/auth/login",
            None,
            &[],
            &[("content-type", "application/json")],
        )
        .await;
    assert_eq!(reply.status, StatusCode::BAD_REQUEST);
    assert_eq!(reply.body["success"], false);
}

#[tokio::test]
async fn same_email_registers_once_per_kind() {
    let app = TestApp::new();
    let body = json!({
        "username": "shared",
        "email": "shared@example.com",
        "password": "Secret#1",
        "firstname": "Sha",
        "lastname": "Red",
    });
    assert_eq!(
        app.post("/api/auth/register", body.clone(), &[]).await.status,
        StatusCode::CREATED
    );
    assert_eq!(
        app.post("/api/propertyProvider/register", body.clone(), &[]).await.status,
        StatusCode::CREATED
    );
    let again = app.post("/api/auth/register", body, &[]).await;
    assert_eq!(again.status, StatusCode::CONFLICT);
    assert_eq!(again.body["success"], false);
}

#[tokio::test]
async fn sixth_login_attempt_is_throttled_per_address() {
    let app = TestApp::new();
    let attempt = |ip: &'static str| {
        let app = &app;
        async move {
            app.request(
                Method::POST,
                "/api/auth/login",
                Some(json!({ "email": "nobody@example.com", "password": "wrong-pass" })),
                &[],
                &[("x-forwarded-for", ip)],
            )
            .await
        }
    };

    for _ in 0..5 {
        assert_eq!(attempt("203.0.113.7").await.status, StatusCode::UNAUTHORIZED);
    }
    let limited = attempt("203.0.113.7").await;
    assert_eq!(limited.status, StatusCode::TOO_MANY_REQUESTS);
    let retry_after: u64 = limited.headers[header::RETRY_AFTER]
        .to_str()
        .unwrap()
        .parse()
        .unwrap();
    assert!(retry_after > 0 && retry_after <= 900);
    assert!(limited.body["message"]
        .as_str()
        .unwrap()
        .starts_with("Too many login attempts."));

    assert_eq!(attempt("198.51.100.1").await.status, StatusCode::UNAUTHORIZED);

    // Other endpoints are not throttled.
    let verify = app
        .request(
            Method::POST,
            "/api/auth/verify",
            Some(json!({ "email": "nobody@example.com", "otp": "12345" })),
            &[],
            &[("x-forwarded-for", "203.0.113.7")],
        )
        .await;
    assert_eq!(verify.status, StatusCode::BAD_REQUEST);
}

#[tokio::test]
async fn end_user_wins_when_both_cookies_are_present() {
    let app = TestApp::new();
    let user = app.signed_in("auth", "ursula").await;
    let provider = app.signed_in("propertyProvider", "pete").await;
    let user_id = app.whoami("auth", &user).await;
    let provider_id = app.whoami("propertyProvider", &provider).await;

    let listing = app
        .post(
            "/api/listings",
            json!({
                "title": "Garden flat",
                "description": "Two bedrooms near the park",
                "location": "Abuja",
                "price": 950000,
            }),
            &[provider.as_str()],
        )
        .await;
    assert_eq!(listing.status, StatusCode::CREATED);
    let listing_id = listing.body["data"]["id"].as_str().unwrap().to_string();

    // Provider cookie first in header order; the end user still wins.
    let combined = format!("{provider}; {user}");
    let liked = app
        .post(&format!("/api/listings/{listing_id}/like"), json!({}), &[combined.as_str()])
        .await;
    assert_eq!(liked.status, StatusCode::OK);

    // The same end user toggles it back off, proving the like was theirs.
    let unliked = app
        .post(&format!("/api/listings/{listing_id}/like"), json!({}), &[user.as_str()])
        .await;
    assert_eq!(unliked.body["data"]["liked"], false);
    assert_eq!(unliked.body["data"]["likes"], 0);

    assert_ne!(user_id, provider_id);
}

#[tokio::test]
async fn deleted_principal_token_stops_working() {
    let app = TestApp::new();
    let cookie = app.signed_in("auth", "dora").await;
    let id = app.whoami("auth", &cookie).await;

    let deleted = app
        .request(
            Method::DELETE,
            &format!("/api/auth/delete/{}", id.to_uppercase()),
            None,
            &[cookie.as_str()],
            &[],
        )
        .await;
    assert_eq!(deleted.status, StatusCode::OK);

    let me = app.get("/api/auth/user", &[cookie.as_str()]).await;
    assert_eq!(me.status, StatusCode::UNAUTHORIZED);
    assert_eq!(me.body["message"], "unauthorized, please log in");

    let login = app.login("auth", "dora@example.com", "Secret#1").await;
    assert_eq!(login.status, StatusCode::UNAUTHORIZED);
}

#[tokio::test]
async fn other_user_cannot_delete_account() {
    let app = TestApp::new();
    let alice = app.signed_in("auth", "alice").await;
    let bob = app.signed_in("auth", "bobby").await;
    let alice_id = app.whoami("auth", &alice).await;

    let reply = app
        .request(
            Method::DELETE,
            &format!("/api/auth/delete/{alice_id}"),
            None,
            &[bob.as_str()],
            &[],
        )
        .await;
    assert_eq!(reply.status, StatusCode::FORBIDDEN);
}

#[tokio::test]
async fn admin_bans_provider_and_provider_is_locked_out() {
    let app = TestApp::new();
    let admin = app.signed_in("admin", "root").await;
    let provider = app.signed_in("propertyProvider", "shady").await;
    let provider_id = app.whoami("propertyProvider", &provider).await;

    let banned = app
        .request(
            Method::PATCH,
            &format!("/api/admin/ban-propertyProvider/{provider_id}"),
            Some(json!({ "reason": "fake listings" })),
            &[admin.as_str()],
            &[],
        )
        .await;
    assert_eq!(banned.status, StatusCode::OK, "{}", banned.body);
    assert_eq!(banned.body["data"]["ban"]["reason"], "fake listings");

    // Existing session no longer resolves.
    let me = app.get("/api/propertyProvider/user", &[provider.as_str()]).await;
    assert_eq!(me.status, StatusCode::UNAUTHORIZED);

    let login = app.login("propertyProvider", "shady@example.com", "Secret#1").await;
    assert_eq!(login.status, StatusCode::FORBIDDEN);

    let unbanned = app
        .request(
            Method::PATCH,
            &format!("/api/admin/unban-propertyProvider/{provider_id}"),
            None,
            &[admin.as_str()],
            &[],
        )
        .await;
    assert_eq!(unbanned.status, StatusCode::OK);
    let login = app.login("propertyProvider", "shady@example.com", "Secret#1").await;
    assert_eq!(login.status, StatusCode::OK);
}

#[tokio::test]
async fn admin_endpoints_reject_other_kinds() {
    let app = TestApp::new();
    let user = app.signed_in("auth", "curious").await;
    let reply = app.get("/api/admin/users", &[user.as_str()]).await;
    assert_eq!(reply.status, StatusCode::FORBIDDEN);
    let provider = app.signed_in("propertyProvider", "nosy").await;
    let reply = app.get("/api/admin/users", &[provider.as_str()]).await;
    assert_eq!(reply.status, StatusCode::FORBIDDEN);
    let reply = app.get("/api/admin/users", &[]).await;
    assert_eq!(reply.status, StatusCode::UNAUTHORIZED);

    let admin = app.signed_in("admin", "root").await;
    let reply = app.get("/api/admin/users", &[admin.as_str()]).await;
    assert_eq!(reply.status, StatusCode::OK);
    assert_eq!(reply.body["data"].as_array().unwrap().len(), 1);
}

#[tokio::test]
async fn second_admin_needs_an_admin_caller() {
    let app = TestApp::new();
    let admin = app.signed_in("admin", "root").await;
    let body = json!({ "username": "deputy", "email": "deputy@example.com", "password": "Secret#1" });

    let anonymous = app.post("/api/admin/register", body.clone(), &[]).await;
    assert_eq!(anonymous.status, StatusCode::UNAUTHORIZED);
    let user = app.signed_in("auth", "climber").await;
    let by_user = app.post("/api/admin/register", body.clone(), &[user.as_str()]).await;
    assert_eq!(by_user.status, StatusCode::FORBIDDEN);

    let by_admin = app.post("/api/admin/register", body, &[admin.as_str()]).await;
    assert_eq!(by_admin.status, StatusCode::CREATED);
}

#[tokio::test]
async fn password_reset_replaces_secret() {
    let app = TestApp::new();
    app.signed_in("propertyProvider", "resetme").await;

    let forgot = app
        .post(
            "/api/propertyProvider/forgot-password",
            json!({ "email": "resetme@example.com" }),
            &[],
        )
        .await;
    assert_eq!(forgot.status, StatusCode::OK);
    let unknown = app
        .post(
            "/api/propertyProvider/forgot-password",
            json!({ "email": "nobody@example.com" }),
            &[],
        )
        .await;
    assert_eq!(unknown.status, StatusCode::OK);
    assert_eq!(unknown.body["message"], forgot.body["message"]);

    let code = app.mail.last_code("resetme@example.com").await;
    let reset = app
        .post(
            "/api/propertyProvider/reset-password",
            json!({ "email": "resetme@example.com", "otp": code, "newPassword": "Better#2" }),
            &[],
        )
        .await;
    assert_eq!(reset.status, StatusCode::OK);

    let old = app.login("propertyProvider", "resetme@example.com", "Secret#1").await;
    assert_eq!(old.status, StatusCode::UNAUTHORIZED);
    let new = app.login("propertyProvider", "resetme@example.com", "Better#2").await;
    assert_eq!(new.status, StatusCode::OK);
}

#[tokio::test]
async fn logout_clears_cookie() {
    let app = TestApp::new();
    let reply = app.post("/api/auth/logout", json!({}), &[]).await;
    assert_eq!(reply.status, StatusCode::OK);
    let cookie = reply.headers[header::SET_COOKIE].to_str().unwrap();
    assert!(cookie.starts_with("authentication=;"));
    assert!(cookie.contains("Max-Age=0"));
}

#[tokio::test]
async fn bearer_header_is_accepted() {
    let app = TestApp::new();
    let cookie = app.signed_in("auth", "bearer").await;
    let bearer = format!("Bearer {}", cookie.trim_start_matches("authentication="));
    let reply = app
        .request(
            Method::GET,
            "/api/auth/user",
            None,
            &[],
            &[("authorization", bearer.as_str())],
        )
        .await;
    assert_eq!(reply.status, StatusCode::OK);
}

#[tokio::test]
async fn health_reports_ok() {
    let app = TestApp::new();
    let reply = app.get("/health", &[]).await;
    assert_eq!(reply.status, StatusCode::OK);
    assert_eq!(reply.body["status"], "ok");
}
