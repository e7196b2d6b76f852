//! Account flows behind a single asynchronous interface.
//!
//! Only a mock implementation exists; it answers after a fixed delay using
//! hard-coded trigger values so front ends can exercise both paths.

use std::time::Duration;

use async_trait::async_trait;
use tracing::debug;

use crate::{
    error::{AuthError, StorageError},
    storage::{KeyValueStore, SESSION_KEY},
};

#[derive(Debug, Clone, PartialEq, Eq)]
pub enum AuthRequest {
    Login { account: String, password: String },
    SignUp { account: String, password: String },
    VerifyCode { email: String, code: String },
    ChangePassword { account: String, password: String },
}

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct AuthOk {
    pub code: u16,
}

impl AuthOk {
    pub const SUCCESS: u16 = 200;
    pub const CODE_VERIFIED: u16 = 3004;
}

#[async_trait]
pub trait Authenticator: Send + Sync + std::fmt::Debug {
    async fn submit(&self, request: AuthRequest) -> Result<AuthOk, AuthError>;
}

#[derive(Debug, Clone)]
pub struct MockAuthenticator {
    delay: Duration,
}

impl MockAuthenticator {
    /// Account that the mock treats as registered-elsewhere.
    pub const TAKEN_ACCOUNT: &'static str = "123@qq.com";
    /// Password (and verification code) the mock always rejects.
    pub const REJECTED_SECRET: &'static str = "123";

    pub fn new(delay: Duration) -> Self {
        Self { delay }
    }
}

impl Default for MockAuthenticator {
    fn default() -> Self {
        Self::new(Duration::from_secs(2))
    }
}

#[async_trait]
impl Authenticator for MockAuthenticator {
    async fn submit(&self, request: AuthRequest) -> Result<AuthOk, AuthError> {
        tokio::time::sleep(self.delay).await;
        debug!(?request, "mock auth answered");

        match request {
            AuthRequest::Login { password, .. } if password == Self::REJECTED_SECRET => {
                Err(AuthError::wrong_password())
            }
            AuthRequest::Login { account, .. } if account == Self::TAKEN_ACCOUNT => {
                Err(AuthError::account_not_found())
            }
            AuthRequest::SignUp { account, .. } if account == Self::TAKEN_ACCOUNT => {
                Err(AuthError::account_exists())
            }
            AuthRequest::VerifyCode { code, .. } if code == Self::REJECTED_SECRET => {
                Err(AuthError::wrong_code())
            }
            AuthRequest::VerifyCode { .. } => Ok(AuthOk {
                code: AuthOk::CODE_VERIFIED,
            }),
            AuthRequest::Login { .. }
            | AuthRequest::SignUp { .. }
            | AuthRequest::ChangePassword { .. } => Ok(AuthOk {
                code: AuthOk::SUCCESS,
            }),
        }
    }
}

/// Whether a session marker is present in storage.
pub fn is_logged_in(storage: &dyn KeyValueStore) -> Result<bool, StorageError> {
    Ok(storage
        .get(SESSION_KEY)?
        .is_some_and(|user| !user.is_empty()))
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::storage::MemoryStore;

    fn login(account: &str, password: &str) -> AuthRequest {
        AuthRequest::Login {
            account: account.into(),
            password: password.into(),
        }
    }

    #[tokio::test(start_paused = true)]
    async fn mock_waits_before_answering() {
        let auth = MockAuthenticator::default();
        let started = tokio::time::Instant::now();

        let ok = auth.submit(login("me@example.com", "secret")).await;

        assert_eq!(ok, Ok(AuthOk { code: 200 }));
        assert!(started.elapsed() >= Duration::from_secs(2));
    }

    #[tokio::test]
    async fn mock_error_codes() {
        let auth = MockAuthenticator::new(Duration::ZERO);

        let err = auth.submit(login("me@example.com", "123")).await.unwrap_err();
        assert_eq!(err.code, AuthError::WRONG_PASSWORD);

        let err = auth.submit(login("123@qq.com", "secret")).await.unwrap_err();
        assert_eq!(err.code, AuthError::ACCOUNT_NOT_FOUND);

        let err = auth
            .submit(AuthRequest::SignUp {
                account: "123@qq.com".into(),
                password: "secret".into(),
            })
            .await
            .unwrap_err();
        assert_eq!(err.code, AuthError::ACCOUNT_EXISTS);

        let err = auth
            .submit(AuthRequest::VerifyCode {
                email: "me@example.com".into(),
                code: "123".into(),
            })
            .await
            .unwrap_err();
        assert_eq!(err.code, AuthError::WRONG_CODE);

        let ok = auth
            .submit(AuthRequest::VerifyCode {
                email: "me@example.com".into(),
                code: "482913".into(),
            })
            .await
            .expect("code accepted");
        assert_eq!(ok.code, AuthOk::CODE_VERIFIED);
    }

    #[test]
    fn session_marker_decides_login_state() {
        let storage = MemoryStore::new();
        assert!(!is_logged_in(&storage).expect("read"));

        storage.set(SESSION_KEY, "arcturus").expect("write");
        assert!(is_logged_in(&storage).expect("read"));
    }
}
