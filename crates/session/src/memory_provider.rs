//! In-memory identity provider for tests/dev.

use std::collections::HashMap;
use std::sync::atomic::{AtomicBool, AtomicUsize, Ordering};
use std::sync::{Mutex, PoisonError};

use async_trait::async_trait;
use tokio::sync::mpsc;

use rxoffice_auth::normalize_email;
use rxoffice_core::ExternalId;

use crate::provider::{
    AuthStateChange, AuthSubscription, AuthProviderError, ExternalIdentity, IdentityProvider,
};

const MIN_PASSWORD_LEN: usize = 6;

#[derive(Debug, Clone)]
struct Account {
    id: ExternalId,
    password: String,
    metadata: serde_json::Value,
}

/// Provider double holding accounts and the current session in memory.
///
/// - No IO
/// - Change notifications fan out to every live subscriber
/// - Sign-out failure can be injected to exercise best-effort logout
#[derive(Debug, Default)]
pub struct InMemoryIdentityProvider {
    accounts: Mutex<HashMap<String, Account>>,
    current: Mutex<Option<ExternalIdentity>>,
    subscribers: Mutex<Vec<mpsc::UnboundedSender<AuthStateChange>>>,
    fail_sign_out: AtomicBool,
    sign_out_calls: AtomicUsize,
}

impl InMemoryIdentityProvider {
    pub fn new() -> Self {
        Self::default()
    }

    /// Create an account with a generated id.
    pub fn register(&self, email: &str, password: &str) -> ExternalIdentity {
        self.register_with_id(ExternalId::generate(), email, password)
    }

    pub fn register_with_id(
        &self,
        id: impl Into<ExternalId>,
        email: &str,
        password: &str,
    ) -> ExternalIdentity {
        let email = normalize_email(email);
        let id = id.into();
        lock(&self.accounts).insert(
            email.clone(),
            Account {
                id: id.clone(),
                password: password.to_string(),
                metadata: serde_json::Value::Null,
            },
        );
        ExternalIdentity { id, email }
    }

    /// Pretend a session was restored from storage (no notification).
    pub fn set_session(&self, identity: Option<ExternalIdentity>) {
        *lock(&self.current) = identity;
    }

    /// Push an arbitrary change to subscribers, as a provider refresh would.
    pub fn emit(&self, change: AuthStateChange) {
        let mut subs = lock(&self.subscribers);
        // Drop any dead subscribers while publishing.
        subs.retain(|tx| tx.send(change.clone()).is_ok());
    }

    pub fn fail_sign_out(&self, fail: bool) {
        self.fail_sign_out.store(fail, Ordering::SeqCst);
    }

    pub fn sign_out_calls(&self) -> usize {
        self.sign_out_calls.load(Ordering::SeqCst)
    }

    pub fn metadata(&self, email: &str) -> Option<serde_json::Value> {
        lock(&self.accounts)
            .get(&normalize_email(email))
            .map(|a| a.metadata.clone())
    }

    fn start_session(&self, identity: ExternalIdentity) {
        *lock(&self.current) = Some(identity.clone());
        self.emit(AuthStateChange::signed_in(identity));
    }
}

fn lock<T>(m: &Mutex<T>) -> std::sync::MutexGuard<'_, T> {
    m.lock().unwrap_or_else(PoisonError::into_inner)
}

#[async_trait]
impl IdentityProvider for InMemoryIdentityProvider {
    async fn get_session(&self) -> Result<Option<ExternalIdentity>, AuthProviderError> {
        Ok(lock(&self.current).clone())
    }

    fn on_auth_state_change(&self) -> AuthSubscription {
        let (tx, rx) = mpsc::unbounded_channel();
        lock(&self.subscribers).push(tx);
        rx
    }

    async fn sign_in_with_password(
        &self,
        email: &str,
        password: &str,
    ) -> Result<ExternalIdentity, AuthProviderError> {
        let email = normalize_email(email);
        let account = lock(&self.accounts)
            .get(&email)
            .cloned()
            .ok_or(AuthProviderError::InvalidCredentials)?;

        if account.password != password {
            return Err(AuthProviderError::InvalidCredentials);
        }

        let identity = ExternalIdentity { id: account.id, email };
        self.start_session(identity.clone());
        Ok(identity)
    }

    async fn sign_up(
        &self,
        email: &str,
        password: &str,
        metadata: serde_json::Value,
    ) -> Result<ExternalIdentity, AuthProviderError> {
        let email = normalize_email(email);
        if password.len() < MIN_PASSWORD_LEN {
            return Err(AuthProviderError::WeakPassword(format!(
                "must be at least {MIN_PASSWORD_LEN} characters"
            )));
        }

        let identity = {
            let mut accounts = lock(&self.accounts);
            if accounts.contains_key(&email) {
                return Err(AuthProviderError::AccountExists(email));
            }
            let id = ExternalId::generate();
            accounts.insert(
                email.clone(),
                Account {
                    id: id.clone(),
                    password: password.to_string(),
                    metadata,
                },
            );
            ExternalIdentity { id, email }
        };

        self.start_session(identity.clone());
        Ok(identity)
    }

    async fn sign_out(&self) -> Result<(), AuthProviderError> {
        self.sign_out_calls.fetch_add(1, Ordering::SeqCst);
        if self.fail_sign_out.load(Ordering::SeqCst) {
            return Err(AuthProviderError::Transport("sign-out request failed".to_string()));
        }

        let was_signed_in = lock(&self.current).take().is_some();
        if was_signed_in {
            self.emit(AuthStateChange::signed_out());
        }
        Ok(())
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[tokio::test]
    async fn sign_in_checks_password_and_notifies() {
        let provider = InMemoryIdentityProvider::new();
        let registered = provider.register_with_id("ext-1", "Phil@Pharmacy.test", "secret1");
        let mut events = provider.on_auth_state_change();

        assert_eq!(
            provider.sign_in_with_password("phil@pharmacy.test", "wrong").await,
            Err(AuthProviderError::InvalidCredentials)
        );

        let identity = provider
            .sign_in_with_password("phil@pharmacy.test", "secret1")
            .await
            .unwrap();
        assert_eq!(identity, registered);
        assert_eq!(events.recv().await, Some(AuthStateChange::signed_in(identity.clone())));
        assert_eq!(provider.get_session().await.unwrap(), Some(identity));
    }

    #[tokio::test]
    async fn duplicate_and_weak_signups_are_rejected() {
        let provider = InMemoryIdentityProvider::new();
        provider.register("taken@pharmacy.test", "secret1");

        let err = provider
            .sign_up("taken@pharmacy.test", "secret1", serde_json::Value::Null)
            .await
            .unwrap_err();
        assert!(matches!(err, AuthProviderError::AccountExists(_)));

        let err = provider
            .sign_up("new@pharmacy.test", "123", serde_json::Value::Null)
            .await
            .unwrap_err();
        assert!(matches!(err, AuthProviderError::WeakPassword(_)));
    }

    #[tokio::test]
    async fn dropped_subscribers_are_pruned() {
        let provider = InMemoryIdentityProvider::new();
        let rx = provider.on_auth_state_change();
        drop(rx);

        provider.emit(AuthStateChange::signed_out());
        assert!(lock(&provider.subscribers).is_empty());
    }

    #[tokio::test]
    async fn injected_sign_out_failure_keeps_session() {
        let provider = InMemoryIdentityProvider::new();
        let identity = provider.register("a@pharmacy.test", "secret1");
        provider.set_session(Some(identity.clone()));
        provider.fail_sign_out(true);

        assert!(provider.sign_out().await.is_err());
        assert_eq!(provider.sign_out_calls(), 1);
        assert_eq!(provider.get_session().await.unwrap(), Some(identity));
    }
}
