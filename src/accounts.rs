// SPDX-License-Identifier: AGPL-3.0-or-later
//
// Copyright (C) 2026 Relational Network

//! Account operations shared by the three principal kinds.
//!
//! Handlers stay thin; everything that touches secrets, codes or tokens
//! runs here. Errors are already [`ApiError`]s so handlers can `?` them.

use chrono::Utc;
use tracing::{info, warn};
use uuid::Uuid;

use crate::{
    auth::{
        guard::{normalize_id, require_self_or_admin},
        password::{hash_secret, verify_decoy, verify_secret},
        token::IssuedToken,
        AuthError, ResolvedPrincipal,
    },
    error::ApiError,
    models::{
        ForgotPasswordRequest, LoginRequest, RegisterRequest, ResetPasswordRequest,
        UpdateAccountRequest, VerifyRequest, DEFAULT_COUNTRY,
    },
    state::AppState,
    storage::{
        principals::normalize_email, NewPrincipal, PrincipalKind, PrincipalRecord, ProfileUpdate,
    },
    validation::Checks,
    verification::{CodeNotice, IssuedCode},
};

pub const INVALID_CREDENTIALS: &str = "we could not validate your credentials, please try again";
pub const BANNED_MESSAGE: &str = "your account has been banned, contact support";
pub const UNVERIFIED_MESSAGE: &str =
    "Email not verified. A new OTP has been sent to your email.";
pub const RESET_REQUESTED_MESSAGE: &str =
    "If an account with that email exists, a password reset code has been sent.";

const USERNAME_LEN: (usize, usize) = (3, 30);
const SECRET_LEN: (usize, usize) = (6, 32);
const NAME_LEN: (usize, usize) = (2, 50);
const BIO_MAX: usize = 500;

/// Result of a login attempt that did not fail outright.
#[derive(Debug)]
pub enum LoginOutcome {
    Authenticated {
        record: PrincipalRecord,
        token: IssuedToken,
    },
    /// Email not verified yet; a fresh code was sent instead of a token.
    VerificationRequired(IssuedCode),
}

fn validate_registration(kind: PrincipalKind, req: &RegisterRequest) -> Result<(), ApiError> {
    let mut checks = Checks::new();
    checks
        .length("username", &req.username, USERNAME_LEN.0, USERNAME_LEN.1)
        .email("email", &req.email)
        .secret_length("password", &req.password, SECRET_LEN.0, SECRET_LEN.1);

    match kind {
        PrincipalKind::PropertyProvider => {
            checks
                .required("firstname", req.firstname.as_deref())
                .required("lastname", req.lastname.as_deref());
            for (field, value) in [("firstname", &req.firstname), ("lastname", &req.lastname)] {
                if let Some(value) = value.as_deref().filter(|v| !v.trim().is_empty()) {
                    checks.length(field, value, NAME_LEN.0, NAME_LEN.1);
                }
            }
        }
        PrincipalKind::EndUser => {
            for (field, value) in [("firstname", &req.firstname), ("lastname", &req.lastname)] {
                if let Some(value) = value.as_deref().filter(|v| !v.trim().is_empty()) {
                    checks.length(field, value, NAME_LEN.0, NAME_LEN.1);
                }
            }
        }
        PrincipalKind::Administrator => {}
    }

    checks.finish().map_err(ApiError::validation)
}

fn non_blank(value: Option<String>) -> Option<String> {
    value
        .map(|v| v.trim().to_string())
        .filter(|v| !v.is_empty())
}

/// Whether at least one administrator exists that has not been deleted.
pub async fn live_admin_exists(state: &AppState) -> Result<bool, ApiError> {
    Ok(state
        .credentials
        .list(PrincipalKind::Administrator)
        .await?
        .iter()
        .any(|admin| !admin.is_deleted))
}

/// Create an unverified principal and send its first verification code.
pub async fn register(
    state: &AppState,
    kind: PrincipalKind,
    req: RegisterRequest,
) -> Result<(PrincipalRecord, IssuedCode), ApiError> {
    validate_registration(kind, &req)?;

    let secret_hash = hash_secret(&req.password).await?;
    let (first_name, last_name) = match kind {
        PrincipalKind::Administrator => (None, None),
        _ => (non_blank(req.firstname), non_blank(req.lastname)),
    };
    let input = NewPrincipal {
        username: req.username,
        email: req.email,
        first_name,
        last_name,
        country: non_blank(req.country).unwrap_or_else(|| DEFAULT_COUNTRY.to_string()),
    };

    let record = state
        .credentials
        .insert(PrincipalRecord::new(kind, input, secret_hash, Utc::now()))
        .await?;
    info!(%kind, id = %record.id, "principal registered");

    let issued = state
        .verification
        .issue_code(&record, CodeNotice::Registration)
        .await?;
    Ok((record, issued))
}

/// Check credentials and either sign a token or re-send a verification
/// code.
///
/// Unknown email, deleted account and wrong password all produce the same
/// 401, and all three pay for one Argon2 verification. Ban and
/// verification state are only revealed after the password matched.
pub async fn login(
    state: &AppState,
    kind: PrincipalKind,
    req: LoginRequest,
) -> Result<LoginOutcome, ApiError> {
    Checks::new()
        .email("email", &req.email)
        .required("password", Some(req.password.as_str()))
        .finish()
        .map_err(ApiError::validation)?;

    let email = normalize_email(&req.email);
    let record = match state.credentials.find_by_email(kind, &email).await? {
        Some(record) if !record.is_deleted => record,
        _ => {
            verify_decoy(&req.password).await?;
            warn!(%kind, "login for unknown or deleted account");
            return Err(ApiError::unauthenticated(INVALID_CREDENTIALS));
        }
    };

    if !verify_secret(&req.password, &record.secret_hash).await? {
        warn!(%kind, id = %record.id, "login with wrong password");
        return Err(ApiError::unauthenticated(INVALID_CREDENTIALS));
    }

    if record.is_banned() {
        warn!(%kind, id = %record.id, "login refused for banned account");
        return Err(ApiError::forbidden(BANNED_MESSAGE));
    }

    if !record.is_email_verified {
        let issued = state
            .verification
            .issue_code(&record, CodeNotice::LoginReminder)
            .await?;
        info!(%kind, id = %record.id, "login before verification, code re-sent");
        return Ok(LoginOutcome::VerificationRequired(issued));
    }

    let token = state.tokens.issue(&record)?;
    info!(%kind, id = %record.id, "login succeeded");
    Ok(LoginOutcome::Authenticated { record, token })
}

pub async fn verify_email(
    state: &AppState,
    kind: PrincipalKind,
    req: VerifyRequest,
) -> Result<PrincipalRecord, ApiError> {
    Checks::new()
        .email("email", &req.email)
        .required("otp", Some(req.otp.as_str()))
        .finish()
        .map_err(ApiError::validation)?;

    Ok(state
        .verification
        .verify_email(kind, &req.email, &req.otp)
        .await?)
}

/// Send a reset code if the account exists. The caller always answers
/// with the same generic message.
pub async fn forgot_password(
    state: &AppState,
    kind: PrincipalKind,
    req: ForgotPasswordRequest,
) -> Result<(), ApiError> {
    Checks::new()
        .email("email", &req.email)
        .finish()
        .map_err(ApiError::validation)?;

    let email = normalize_email(&req.email);
    match state.credentials.find_by_email(kind, &email).await? {
        Some(record) if !record.is_deleted => {
            state
                .verification
                .issue_code(&record, CodeNotice::PasswordReset)
                .await?;
        }
        _ => info!(%kind, "password reset requested for unknown account"),
    }
    Ok(())
}

pub async fn reset_password(
    state: &AppState,
    kind: PrincipalKind,
    req: ResetPasswordRequest,
) -> Result<PrincipalRecord, ApiError> {
    Checks::new()
        .email("email", &req.email)
        .required("otp", Some(req.otp.as_str()))
        .secret_length("newPassword", &req.new_password, SECRET_LEN.0, SECRET_LEN.1)
        .finish()
        .map_err(ApiError::validation)?;

    let record = state
        .verification
        .reset_secret(kind, &req.email, &req.otp, &req.new_password)
        .await?;
    info!(%kind, id = %record.id, "password reset");
    Ok(record)
}

/// The principal itself or any admin may act on an account of `kind`.
fn authorize_account(
    caller: &ResolvedPrincipal,
    kind: PrincipalKind,
    raw_id: &str,
) -> Result<Uuid, ApiError> {
    if caller.kind != kind && !caller.is_admin() {
        return Err(AuthError::Forbidden.into());
    }
    require_self_or_admin(caller, raw_id)?;
    Uuid::parse_str(&normalize_id(raw_id))
        .map_err(|_| ApiError::not_found(format!("{kind} not found")))
}

/// Soft delete a principal of `kind`. Allowed for the principal itself or
/// any admin.
pub async fn soft_delete(
    state: &AppState,
    caller: &ResolvedPrincipal,
    kind: PrincipalKind,
    raw_id: &str,
) -> Result<PrincipalRecord, ApiError> {
    let id = authorize_account(caller, kind, raw_id)?;
    let record = state.credentials.soft_delete(kind, id, Utc::now()).await?;
    info!(%kind, %id, by = %caller.id, "principal soft deleted");
    Ok(record)
}

fn validate_update(kind: PrincipalKind, req: &UpdateAccountRequest) -> Result<(), ApiError> {
    let mut checks = Checks::new();
    if let Some(username) = &req.username {
        checks.length("username", username, USERNAME_LEN.0, USERNAME_LEN.1);
    }

    let profile_fields = [
        ("firstname", &req.firstname, NAME_LEN),
        ("lastname", &req.lastname, NAME_LEN),
        ("bio", &req.bio, (1, BIO_MAX)),
    ];
    for (field, value, (min, max)) in profile_fields {
        let Some(value) = value else { continue };
        if kind == PrincipalKind::PropertyProvider {
            checks.length(field, value, min, max);
        } else {
            checks.check(field, false, &format!("\"{field}\" is not allowed"));
        }
    }

    if let Some(photo) = &req.profile_photo {
        checks.web_uri("profilePhoto", photo);
    }
    if let Some(password) = &req.password {
        checks.secret_length("password", password, SECRET_LEN.0, SECRET_LEN.1);
    }

    let empty = req.username.is_none()
        && req.firstname.is_none()
        && req.lastname.is_none()
        && req.bio.is_none()
        && req.profile_photo.is_none()
        && req.password.is_none();
    checks.check("value", !empty, "at least one field must be provided");

    checks.finish().map_err(ApiError::validation)
}

/// Update profile fields of a principal of `kind`. Allowed for the
/// principal itself or any admin. A new password is hashed once here and
/// stored as-is.
pub async fn update_profile(
    state: &AppState,
    caller: &ResolvedPrincipal,
    kind: PrincipalKind,
    raw_id: &str,
    req: UpdateAccountRequest,
) -> Result<PrincipalRecord, ApiError> {
    let id = authorize_account(caller, kind, raw_id)?;
    validate_update(kind, &req)?;

    let secret_hash = match req.password.as_deref() {
        Some(password) => Some(hash_secret(password).await?),
        None => None,
    };
    let trimmed = |value: Option<String>| value.map(|v| v.trim().to_string());
    let update = ProfileUpdate {
        username: trimmed(req.username),
        first_name: trimmed(req.firstname),
        last_name: trimmed(req.lastname),
        bio: trimmed(req.bio),
        profile_photo: trimmed(req.profile_photo),
        secret_hash,
    };
    let changed_secret = update.secret_hash.is_some();

    let record = state.credentials.update_profile(kind, id, update).await?;
    info!(%kind, %id, by = %caller.id, changed_secret, "principal updated");
    Ok(record)
}
