// SPDX-License-Identifier: AGPL-3.0-or-later
//
// Copyright (C) 2026 Relational Network

//! Request field validation.

use std::sync::LazyLock;

use regex::Regex;
use serde::Serialize;
use url::Url;

static EMAIL_RE: LazyLock<Option<Regex>> =
    LazyLock::new(|| Regex::new(r"^[^@\s]+@[^@\s]+\.[^@\s]+$").ok());

#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
pub struct FieldError {
    pub field: String,
    pub message: String,
}

impl FieldError {
    pub fn new(field: &str, message: impl Into<String>) -> Self {
        Self {
            field: field.to_string(),
            message: message.into(),
        }
    }
}

pub fn valid_email(email: &str) -> bool {
    EMAIL_RE
        .as_ref()
        .is_some_and(|re| re.is_match(email.trim()))
}

/// Collects field errors; an empty collector means the input is valid.
#[derive(Debug, Default)]
pub struct Checks {
    errors: Vec<FieldError>,
}

impl Checks {
    pub fn new() -> Self {
        Self::default()
    }

    /// Character length of the trimmed value must be within `min..=max`.
    pub fn length(&mut self, field: &str, value: &str, min: usize, max: usize) -> &mut Self {
        let len = value.trim().chars().count();
        if len == 0 {
            self.errors
                .push(FieldError::new(field, format!("\"{field}\" is required")));
        } else if len < min {
            self.errors.push(FieldError::new(
                field,
                format!("\"{field}\" length must be at least {min} characters long"),
            ));
        } else if len > max {
            self.errors.push(FieldError::new(
                field,
                format!("\"{field}\" length must be less than or equal to {max} characters long"),
            ));
        }
        self
    }

    /// Like [`Checks::length`] but without trimming, for secrets.
    pub fn secret_length(&mut self, field: &str, value: &str, min: usize, max: usize) -> &mut Self {
        let len = value.chars().count();
        if len < min || len > max {
            self.errors.push(FieldError::new(
                field,
                format!("\"{field}\" must be between {min} and {max} characters long"),
            ));
        }
        self
    }

    pub fn required(&mut self, field: &str, value: Option<&str>) -> &mut Self {
        if value.is_none_or(|v| v.trim().is_empty()) {
            self.errors
                .push(FieldError::new(field, format!("\"{field}\" is required")));
        }
        self
    }

    pub fn email(&mut self, field: &str, value: &str) -> &mut Self {
        if !valid_email(value) {
            self.errors.push(FieldError::new(
                field,
                format!("\"{field}\" must be a valid email"),
            ));
        }
        self
    }

    /// Absolute `http` or `https` URI.
    pub fn web_uri(&mut self, field: &str, value: &str) -> &mut Self {
        let ok = Url::parse(value.trim())
            .is_ok_and(|url| matches!(url.scheme(), "http" | "https") && url.has_host());
        if !ok {
            self.errors.push(FieldError::new(
                field,
                format!("\"{field}\" must be a valid uri"),
            ));
        }
        self
    }

    pub fn check(&mut self, field: &str, ok: bool, message: &str) -> &mut Self {
        if !ok {
            self.errors.push(FieldError::new(field, message));
        }
        self
    }

    pub fn finish(&mut self) -> Result<(), Vec<FieldError>> {
        if self.errors.is_empty() {
            Ok(())
        } else {
            Err(std::mem::take(&mut self.errors))
        }
    }
}
