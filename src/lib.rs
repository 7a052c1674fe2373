// SPDX-License-Identifier: AGPL-3.0-or-later
//
// Copyright (C) 2026 Relational Network

//! Listing Server - Property Listing Backend
//!
//! Accounts for end users, property providers and administrators, each in
//! its own credential namespace, plus a thin listings API on top.
//!
//! ## Modules
//!
//! - `api` - HTTP API handlers (Axum) and OpenAPI document
//! - `auth` - Tokens, principal resolution, guards and login throttling
//! - `accounts` - Registration, login, verification and reset flows
//! - `verification` - One-time codes for email verification and reset
//! - `notify` - Outbound email
//! - `storage` - Credential store (memory or redb) and listing store

pub mod accounts;
pub mod api;
pub mod auth;
pub mod config;
pub mod error;
pub mod models;
pub mod notify;
pub mod state;
pub mod storage;
pub mod telemetry;
pub mod validation;
pub mod verification;
