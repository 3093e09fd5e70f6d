// Authentication Provider Port

use crate::domain::Identity;
use crate::error::DispatchError;
use async_trait::async_trait;
use std::collections::HashMap;

/// Credential name/value pairs as sent by the client
pub type Credentials = HashMap<String, String>;

#[derive(Debug, Clone, Default)]
pub struct AuthRequest {
    pub credentials: Credentials,
    pub client_address: String,
}

/// Outcome of one authentication attempt
#[derive(Debug)]
pub struct AuthResponse {
    pub success: bool,
    pub identity: Option<Identity>,
    pub error_message: Option<String>,
    /// Provider-specific error to surface instead of the generic one
    pub error: Option<DispatchError>,
}

impl AuthResponse {
    pub fn granted(identity: Identity) -> Self {
        Self {
            success: true,
            identity: Some(identity),
            error_message: None,
            error: None,
        }
    }

    pub fn denied(message: impl Into<String>) -> Self {
        Self {
            success: false,
            identity: None,
            error_message: Some(message.into()),
            error: None,
        }
    }

    pub fn failed(error: DispatchError) -> Self {
        Self {
            success: false,
            identity: None,
            error_message: Some(error.to_string()),
            error: Some(error),
        }
    }
}

/// Authentication Provider trait
///
/// Only the protocol step lives in the core; the algorithm is up to the
/// implementation.
#[async_trait]
pub trait AuthenticationProvider: Send + Sync {
    async fn authenticate(&self, request: AuthRequest) -> AuthResponse;
}

/// Accepts everyone with an anonymous identity.
#[derive(Debug, Default, Clone, Copy)]
pub struct NullAuthenticationProvider;

#[async_trait]
impl AuthenticationProvider for NullAuthenticationProvider {
    async fn authenticate(&self, _request: AuthRequest) -> AuthResponse {
        AuthResponse::granted(Identity::anonymous())
    }
}

// ============================================================================
// Mock Implementations for Testing
// ============================================================================

pub mod mocks {
    use super::*;
    use std::sync::atomic::{AtomicUsize, Ordering};

    /// Checks `username` / `password` against a fixed table.
    pub struct StaticCredentialsProvider {
        users: HashMap<String, String>,
        calls: AtomicUsize,
    }

    impl StaticCredentialsProvider {
        pub fn new<I, U, P>(users: I) -> Self
        where
            I: IntoIterator<Item = (U, P)>,
            U: Into<String>,
            P: Into<String>,
        {
            Self {
                users: users
                    .into_iter()
                    .map(|(u, p)| (u.into(), p.into()))
                    .collect(),
                calls: AtomicUsize::new(0),
            }
        }

        pub fn call_count(&self) -> usize {
            self.calls.load(Ordering::SeqCst)
        }
    }

    #[async_trait]
    impl AuthenticationProvider for StaticCredentialsProvider {
        async fn authenticate(&self, request: AuthRequest) -> AuthResponse {
            self.calls.fetch_add(1, Ordering::SeqCst);
            let user = request.credentials.get("username");
            let password = request.credentials.get("password");
            match (user, password) {
                (Some(user), Some(password)) if self.users.get(user) == Some(password) => {
                    AuthResponse::granted(Identity::authenticated(user.clone(), "static"))
                }
                (Some(_), Some(_)) => AuthResponse::denied("invalid user name or password"),
                _ => AuthResponse::failed(DispatchError::Security(
                    "credentials must contain username and password".to_string(),
                )),
            }
        }
    }
}
