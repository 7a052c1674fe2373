// SPDX-License-Identifier: AGPL-3.0-or-later
//
// Copyright (C) 2026 Relational Network

mod common;

use axum::http::StatusCode;
use common::TestApp;
use serde_json::json;

#[tokio::test]
async fn user_updates_own_profile_only() {
    let app = TestApp::new();
    let alice = app.signed_in("auth", "alice").await;
    let bob = app.signed_in("auth", "bob").await;
    let alice_id = app.whoami("auth", &alice).await;
    let path = format!("/api/auth/users/{alice_id}");

    let by_bob = app.put(&path, json!({ "username": "mallory" }), &[bob.as_str()]).await;
    assert_eq!(by_bob.status, StatusCode::FORBIDDEN);

    let anonymous = app.put(&path, json!({ "username": "mallory" }), &[]).await;
    assert_eq!(anonymous.status, StatusCode::UNAUTHORIZED);

    let own = app
        .put(
            &path,
            json!({ "username": "alice_b", "profilePhoto": "https://cdn.example.com/alice.jpg" }),
            &[alice.as_str()],
        )
        .await;
    assert_eq!(own.status, StatusCode::OK, "{}", own.body);
    assert_eq!(own.body["message"], "User updated successfully");
    assert_eq!(own.body["data"]["user"]["username"], "alice_b");
    assert_eq!(own.body["data"]["user"]["profilePhoto"], "https://cdn.example.com/alice.jpg");

    let me = app.get("/api/auth/user", &[alice.as_str()]).await;
    assert_eq!(me.body["data"]["user"]["username"], "alice_b");

    let taken = app.put(&path, json!({ "username": "bob" }), &[alice.as_str()]).await;
    assert_eq!(taken.status, StatusCode::CONFLICT);

    let empty = app.put(&path, json!({}), &[alice.as_str()]).await;
    assert_eq!(empty.status, StatusCode::BAD_REQUEST);

    let bio = app.put(&path, json!({ "bio": "hi there" }), &[alice.as_str()]).await;
    assert_eq!(bio.status, StatusCode::BAD_REQUEST);
    assert_eq!(bio.body["errors"][0]["field"], "bio");
}

#[tokio::test]
async fn admin_may_update_provider_and_password_change_takes_effect() {
    let app = TestApp::new();
    let acme = app.signed_in("propertyProvider", "acme").await;
    let admin = app.signed_in("admin", "root").await;
    let acme_id = app.whoami("propertyProvider", &acme).await;
    let path = format!("/api/propertyProvider/propertyProviders/{acme_id}");

    let by_admin = app
        .put(
            &path,
            json!({ "bio": "Serviced apartments in Ikoyi", "firstname": "Adaeze" }),
            &[admin.as_str()],
        )
        .await;
    assert_eq!(by_admin.status, StatusCode::OK, "{}", by_admin.body);
    assert_eq!(by_admin.body["message"], "Property provider updated successfully");
    assert_eq!(by_admin.body["data"]["user"]["bio"], "Serviced apartments in Ikoyi");
    assert_eq!(by_admin.body["data"]["user"]["firstname"], "Adaeze");

    let bad_photo = app
        .put(&path, json!({ "profilePhoto": "ftp://files/acme.png" }), &[acme.as_str()])
        .await;
    assert_eq!(bad_photo.status, StatusCode::BAD_REQUEST);

    let new_secret = app
        .put(&path, json!({ "password": "Changed#9" }), &[acme.as_str()])
        .await;
    assert_eq!(new_secret.status, StatusCode::OK);
    assert!(new_secret.body["data"]["user"].get("secretHash").is_none());

    let old = app.login("propertyProvider", "acme@example.com", "Secret#1").await;
    assert_eq!(old.status, StatusCode::UNAUTHORIZED);
    let fresh = app.login("propertyProvider", "acme@example.com", "Changed#9").await;
    assert_eq!(fresh.status, StatusCode::OK);
}

#[tokio::test]
async fn provider_cannot_update_user_through_user_route() {
    let app = TestApp::new();
    let user = app.signed_in("auth", "tenant").await;
    let provider = app.signed_in("propertyProvider", "landlord").await;
    let user_id = app.whoami("auth", &user).await;

    let reply = app
        .put(
            &format!("/api/auth/users/{user_id}"),
            json!({ "username": "renamed" }),
            &[provider.as_str()],
        )
        .await;
    assert_eq!(reply.status, StatusCode::FORBIDDEN);
}
