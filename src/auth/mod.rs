// SPDX-License-Identifier: AGPL-3.0-or-later
//
// Copyright (C) 2026 Relational Network

//! # Authentication Module
//!
//! Session auth for the three account kinds (end users, property
//! providers, administrators).
//!
//! ## Auth Flow
//!
//! 1. Principal registers, receives a one-time code by email, verifies
//! 2. Login checks the secret and sets the `authentication` cookie
//!    (the token is also accepted as `Authorization: Bearer <token>`)
//! 3. On each request the server:
//!    - verifies the HS256 signature and expiry
//!    - reloads the principal and rejects deleted, banned or unverified ones
//!    - applies the endpoint's kind filter and guards
//!
//! ## Security
//!
//! - Secrets are Argon2id hashed on the blocking pool
//! - Every credential failure is reported as the same 401
//! - Login is throttled per source address and endpoint

pub mod claims;
pub mod error;
pub mod extractor;
pub mod guard;
pub mod password;
pub mod rate_limit;
pub mod resolver;
pub mod roles;
pub mod session;
pub mod token;

pub use claims::{ResolvedPrincipal, TokenClaims};
pub use error::AuthError;
pub use extractor::{AdminOnly, Auth, ProviderAuth, ScopedAuth, UserOrProvider};
pub use roles::Role;
pub use token::TokenService;
