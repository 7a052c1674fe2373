// SPDX-License-Identifier: AGPL-3.0-or-later
//
// Copyright (C) 2026 Relational Network

//! One-time code workflow for email verification and password reset.
//!
//! Codes are five decimal digits, valid for ten minutes, and single use.
//! Issuing a code replaces whatever code was pending for the same purpose.
//! Every rejection (unknown email, wrong code, expired code, code already
//! used) surfaces as the same [`VerificationError::InvalidOrExpiredCode`].

use std::{sync::Arc, time::Duration};

use chrono::{DateTime, Utc};
use rand::Rng;
use tracing::{debug, info, warn};

use crate::{
    auth::password::{hash_secret, PasswordError},
    notify::{self, EmailMessage, Notifier},
    storage::{
        principals::normalize_email, CodeEffect, CodePurpose, CredentialStore, PendingCode,
        PrincipalKind, PrincipalRecord, StorageError,
    },
};

pub const CODE_TTL_MINUTES: i64 = 10;

#[derive(Debug, thiserror::Error)]
pub enum VerificationError {
    #[error("invalid or expired code")]
    InvalidOrExpiredCode,

    #[error(transparent)]
    Storage(#[from] StorageError),

    #[error(transparent)]
    Password(#[from] PasswordError),
}

/// Which email accompanies a new code.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum CodeNotice {
    /// Right after registration.
    Registration,
    /// Login attempted before the email was verified.
    LoginReminder,
    PasswordReset,
}

impl CodeNotice {
    pub fn purpose(&self) -> CodePurpose {
        match self {
            CodeNotice::Registration | CodeNotice::LoginReminder => CodePurpose::EmailVerification,
            CodeNotice::PasswordReset => CodePurpose::PasswordReset,
        }
    }

    fn message(&self, to: &str, code: &str) -> EmailMessage {
        match self {
            CodeNotice::Registration => notify::verification_email(to, code, CODE_TTL_MINUTES),
            CodeNotice::LoginReminder => notify::login_verification_email(to, code, CODE_TTL_MINUTES),
            CodeNotice::PasswordReset => notify::password_reset_email(to, code, CODE_TTL_MINUTES),
        }
    }
}

/// Where a code was sent and until when it is valid.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct IssuedCode {
    pub email: String,
    pub expires_at: DateTime<Utc>,
}

pub struct VerificationWorkflow {
    store: Arc<dyn CredentialStore>,
    notifier: Arc<dyn Notifier>,
    delivery_timeout: Duration,
}

impl VerificationWorkflow {
    pub fn new(
        store: Arc<dyn CredentialStore>,
        notifier: Arc<dyn Notifier>,
        delivery_timeout: Duration,
    ) -> Self {
        Self {
            store,
            notifier,
            delivery_timeout,
        }
    }

    /// Generate, store and send a fresh code for `record`.
    pub async fn issue_code(
        &self,
        record: &PrincipalRecord,
        notice: CodeNotice,
    ) -> Result<IssuedCode, VerificationError> {
        self.issue_code_at(record, notice, Utc::now()).await
    }

    pub async fn issue_code_at(
        &self,
        record: &PrincipalRecord,
        notice: CodeNotice,
        now: DateTime<Utc>,
    ) -> Result<IssuedCode, VerificationError> {
        let purpose = notice.purpose();
        let previous = record.pending_code(purpose).map(|p| p.code.as_str());
        let code = generate_code(previous);
        let expires_at = now + chrono::Duration::minutes(CODE_TTL_MINUTES);

        self.store
            .set_code(
                record.kind,
                record.id,
                purpose,
                PendingCode {
                    code: code.clone(),
                    expires_at,
                },
            )
            .await?;
        debug!(kind = %record.kind, id = %record.id, ?purpose, "code issued");

        self.deliver(record, notice.message(&record.email, &code)).await;

        Ok(IssuedCode {
            email: record.email.clone(),
            expires_at,
        })
    }

    /// Consume an email verification code and mark the email verified.
    pub async fn verify_email(
        &self,
        kind: PrincipalKind,
        email: &str,
        code: &str,
    ) -> Result<PrincipalRecord, VerificationError> {
        self.consume(kind, email, code, Utc::now(), CodeEffect::MarkEmailVerified)
            .await
    }

    /// Consume a reset code and replace the stored secret.
    ///
    /// The new secret is hashed before the code is touched, so a hashing
    /// failure leaves the code usable.
    pub async fn reset_secret(
        &self,
        kind: PrincipalKind,
        email: &str,
        code: &str,
        new_secret: &str,
    ) -> Result<PrincipalRecord, VerificationError> {
        let hash = hash_secret(new_secret).await?;
        self.consume(kind, email, code, Utc::now(), CodeEffect::ReplaceSecret(hash))
            .await
    }

    pub async fn consume(
        &self,
        kind: PrincipalKind,
        email: &str,
        code: &str,
        now: DateTime<Utc>,
        effect: CodeEffect,
    ) -> Result<PrincipalRecord, VerificationError> {
        let email = normalize_email(email);
        let purpose = effect.purpose();
        match self
            .store
            .consume_code(kind, &email, code, now, effect)
            .await?
        {
            Some(record) => {
                info!(%kind, id = %record.id, ?purpose, "code consumed");
                Ok(record)
            }
            None => {
                debug!(%kind, ?purpose, "code rejected");
                Err(VerificationError::InvalidOrExpiredCode)
            }
        }
    }

    /// Failures are logged against the principal id; the address stays out
    /// of the logs.
    async fn deliver(&self, record: &PrincipalRecord, message: EmailMessage) {
        match tokio::time::timeout(self.delivery_timeout, self.notifier.send(&message)).await {
            Ok(Ok(())) => {}
            Ok(Err(e)) => warn!(
                kind = %record.kind,
                principal = %record.id,
                error = %e,
                "email delivery failed"
            ),
            Err(_) => warn!(
                kind = %record.kind,
                principal = %record.id,
                timeout_ms = self.delivery_timeout.as_millis() as u64,
                "email delivery timed out"
            ),
        }
    }
}

/// Five-digit code, distinct from `previous` when one is given.
fn generate_code(previous: Option<&str>) -> String {
    let mut rng = rand::rng();
    loop {
        let code = rng.random_range(10_000..=99_999u32).to_string();
        if previous != Some(code.as_str()) {
            return code;
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::auth::password::verify_secret;
    use crate::notify::NotifyError;
    use crate::storage::{principals::test_support::record, MemoryCredentialStore};
    use async_trait::async_trait;
    use tokio::sync::Mutex;

    #[derive(Default)]
    struct CapturingNotifier {
        sent: Mutex<Vec<EmailMessage>>,
    }

    #[async_trait]
    impl Notifier for CapturingNotifier {
        async fn send(&self, message: &EmailMessage) -> Result<(), NotifyError> {
            self.sent.lock().await.push(message.clone());
            Ok(())
        }
    }

    struct HangingNotifier;

    #[async_trait]
    impl Notifier for HangingNotifier {
        async fn send(&self, _message: &EmailMessage) -> Result<(), NotifyError> {
            std::future::pending::<()>().await;
            Ok(())
        }
    }

    struct FailingNotifier;

    #[async_trait]
    impl Notifier for FailingNotifier {
        async fn send(&self, _message: &EmailMessage) -> Result<(), NotifyError> {
            Err(NotifyError::Rejected(503))
        }
    }

    /// Shared buffer the fmt layer writes into.
    #[derive(Clone, Default)]
    struct LogCapture(Arc<std::sync::Mutex<Vec<u8>>>);

    impl std::io::Write for LogCapture {
        fn write(&mut self, buf: &[u8]) -> std::io::Result<usize> {
            self.0.lock().unwrap().extend_from_slice(buf);
            Ok(buf.len())
        }

        fn flush(&mut self) -> std::io::Result<()> {
            Ok(())
        }
    }

    impl<'a> tracing_subscriber::fmt::MakeWriter<'a> for LogCapture {
        type Writer = LogCapture;

        fn make_writer(&'a self) -> Self::Writer {
            self.clone()
        }
    }

    async fn setup(
        notifier: Arc<dyn Notifier>,
    ) -> (VerificationWorkflow, Arc<MemoryCredentialStore>, PrincipalRecord) {
        let store = Arc::new(MemoryCredentialStore::new());
        let rec = store
            .insert(record(PrincipalKind::EndUser, "alice", "alice@example.com"))
            .await
            .unwrap();
        let workflow = VerificationWorkflow::new(store.clone(), notifier, Duration::from_millis(100));
        (workflow, store, rec)
    }

    fn code_in(message: &EmailMessage) -> String {
        message
            .html
            .split("<b>")
            .nth(1)
            .and_then(|rest| rest.split("</b>").next())
            .unwrap()
            .to_string()
    }

    #[test]
    fn codes_are_five_digits_and_differ_from_previous() {
        for _ in 0..200 {
            let code = generate_code(Some("12345"));
            assert_eq!(code.len(), 5);
            assert!(code.chars().all(|c| c.is_ascii_digit()));
            assert_ne!(code, "12345");
        }
    }

    #[tokio::test]
    async fn issued_code_verifies_email_once() {
        let notifier = Arc::new(CapturingNotifier::default());
        let (workflow, store, rec) = setup(notifier.clone()).await;

        let issued = workflow.issue_code(&rec, CodeNotice::Registration).await.unwrap();
        assert_eq!(issued.email, "alice@example.com");

        let sent = notifier.sent.lock().await.clone();
        assert_eq!(sent.len(), 1);
        assert_eq!(sent[0].subject, "Your verification code");
        let code = code_in(&sent[0]);

        let verified = workflow
            .verify_email(PrincipalKind::EndUser, " Alice@Example.com ", &code)
            .await
            .unwrap();
        assert!(verified.is_email_verified);

        let again = workflow
            .verify_email(PrincipalKind::EndUser, "alice@example.com", &code)
            .await;
        assert!(matches!(again, Err(VerificationError::InvalidOrExpiredCode)));

        let stored = store.get(PrincipalKind::EndUser, rec.id).await.unwrap().unwrap();
        assert!(stored.email_code.is_none());
    }

    #[tokio::test]
    async fn reissue_invalidates_previous_code() {
        let notifier = Arc::new(CapturingNotifier::default());
        let (workflow, store, rec) = setup(notifier.clone()).await;

        workflow.issue_code(&rec, CodeNotice::Registration).await.unwrap();
        let first = code_in(&notifier.sent.lock().await[0]);

        let current = store.get(PrincipalKind::EndUser, rec.id).await.unwrap().unwrap();
        workflow.issue_code(&current, CodeNotice::LoginReminder).await.unwrap();
        let second = code_in(&notifier.sent.lock().await[1]);
        assert_ne!(first, second);

        assert!(workflow
            .verify_email(PrincipalKind::EndUser, "alice@example.com", &first)
            .await
            .is_err());
        assert!(workflow
            .verify_email(PrincipalKind::EndUser, "alice@example.com", &second)
            .await
            .is_ok());
    }

    #[tokio::test]
    async fn expired_code_is_rejected() {
        let notifier = Arc::new(CapturingNotifier::default());
        let (workflow, _store, rec) = setup(notifier.clone()).await;

        let issued = workflow.issue_code(&rec, CodeNotice::Registration).await.unwrap();
        let code = code_in(&notifier.sent.lock().await[0]);

        let result = workflow
            .consume(
                PrincipalKind::EndUser,
                "alice@example.com",
                &code,
                issued.expires_at,
                CodeEffect::MarkEmailVerified,
            )
            .await;
        assert!(matches!(result, Err(VerificationError::InvalidOrExpiredCode)));
    }

    #[tokio::test]
    async fn reset_replaces_secret() {
        let notifier = Arc::new(CapturingNotifier::default());
        let (workflow, _store, rec) = setup(notifier.clone()).await;

        workflow.issue_code(&rec, CodeNotice::PasswordReset).await.unwrap();
        let code = code_in(&notifier.sent.lock().await[0]);

        let updated = workflow
            .reset_secret(PrincipalKind::EndUser, "alice@example.com", &code, "Secret#2")
            .await
            .unwrap();
        assert!(verify_secret("Secret#2", &updated.secret_hash).await.unwrap());
    }

    #[tokio::test]
    async fn unknown_email_looks_like_bad_code() {
        let notifier = Arc::new(CapturingNotifier::default());
        let (workflow, _store, _rec) = setup(notifier).await;
        let result = workflow
            .verify_email(PrincipalKind::EndUser, "nobody@example.com", "12345")
            .await;
        assert!(matches!(result, Err(VerificationError::InvalidOrExpiredCode)));
    }

    #[tokio::test]
    async fn hanging_notifier_does_not_block_issue() {
        let (workflow, _store, rec) = setup(Arc::new(HangingNotifier)).await;
        let issued = tokio::time::timeout(
            Duration::from_secs(2),
            workflow.issue_code(&rec, CodeNotice::Registration),
        )
        .await
        .expect("issue_code should finish after the delivery timeout");
        assert!(issued.is_ok());
    }

    #[tokio::test]
    async fn failed_delivery_logs_principal_not_address() {
        let capture = LogCapture::default();
        let subscriber = tracing_subscriber::fmt()
            .with_writer(capture.clone())
            .with_ansi(false)
            .with_max_level(tracing::Level::WARN)
            .finish();
        let _guard = tracing::subscriber::set_default(subscriber);

        let (workflow, _store, rec) = setup(Arc::new(FailingNotifier)).await;
        assert!(workflow.issue_code(&rec, CodeNotice::Registration).await.is_ok());

        let logged = String::from_utf8(capture.0.lock().unwrap().clone()).unwrap();
        assert!(logged.contains("email delivery failed"), "{logged}");
        assert!(logged.contains(&rec.id.to_string()));
        assert!(!logged.contains("alice@example.com"));
    }
}
