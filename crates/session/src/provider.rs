//! External identity provider boundary.
//!
//! The provider owns credentials and tokens. This crate only sees the
//! resulting identity (opaque id + email) and the auth-state change stream.

use async_trait::async_trait;
use serde::{Deserialize, Serialize};
use thiserror::Error;
use tokio::sync::mpsc;

use rxoffice_core::ExternalId;

/// Identity as reported by the provider.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct ExternalIdentity {
    pub id: ExternalId,
    pub email: String,
}

impl ExternalIdentity {
    pub fn new(id: impl Into<ExternalId>, email: impl Into<String>) -> Self {
        Self {
            id: id.into(),
            email: email.into(),
        }
    }
}

/// Why the provider fired a change notification.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum AuthChangeKind {
    InitialSession,
    SignedIn,
    SignedOut,
    TokenRefreshed,
    UserUpdated,
}

/// One auth-state change: the new identity, or `None` when signed out.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct AuthStateChange {
    pub kind: AuthChangeKind,
    pub identity: Option<ExternalIdentity>,
}

impl AuthStateChange {
    pub fn signed_in(identity: ExternalIdentity) -> Self {
        Self {
            kind: AuthChangeKind::SignedIn,
            identity: Some(identity),
        }
    }

    pub fn signed_out() -> Self {
        Self {
            kind: AuthChangeKind::SignedOut,
            identity: None,
        }
    }
}

/// Receiving end of `on_auth_state_change`; dropping it unsubscribes.
pub type AuthSubscription = mpsc::UnboundedReceiver<AuthStateChange>;

/// Errors surfaced verbatim from the provider.
#[derive(Debug, Error, Clone, PartialEq, Eq)]
pub enum AuthProviderError {
    #[error("invalid login credentials")]
    InvalidCredentials,

    #[error("an account for '{0}' already exists")]
    AccountExists(String),

    #[error("password rejected: {0}")]
    WeakPassword(String),

    #[error("identity provider unreachable: {0}")]
    Transport(String),

    #[error("identity provider error: {0}")]
    Provider(String),
}

#[async_trait]
pub trait IdentityProvider: Send + Sync {
    /// Existing session, if the provider has one (e.g. a stored token).
    async fn get_session(&self) -> Result<Option<ExternalIdentity>, AuthProviderError>;

    /// Subscribe to auth-state changes.
    ///
    /// Handlers must not call back into the provider from the delivery path;
    /// the session manager defers that work to a separate task.
    fn on_auth_state_change(&self) -> AuthSubscription;

    async fn sign_in_with_password(
        &self,
        email: &str,
        password: &str,
    ) -> Result<ExternalIdentity, AuthProviderError>;

    async fn sign_up(
        &self,
        email: &str,
        password: &str,
        metadata: serde_json::Value,
    ) -> Result<ExternalIdentity, AuthProviderError>;

    async fn sign_out(&self) -> Result<(), AuthProviderError>;
}
