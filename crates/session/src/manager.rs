//! Session manager: provider events in, observable [`SessionState`] out.
//!
//! Provider notifications are consumed by a pump task that only records the
//! new identity and queues a resolution job. Resolution (local lookups,
//! stamping `last_login`, any provider call on failure) runs on a separate
//! worker, never inside the provider's delivery path.
//!
//! Every state transition bumps an epoch. A resolution job carries the epoch
//! it was queued under and is discarded if the session moved on meanwhile.

use std::collections::HashSet;
use std::sync::{Arc, Mutex, PoisonError, Weak};

use chrono::Utc;
use serde_json::json;
use thiserror::Error;
use tokio::sync::{mpsc, watch};
use tokio::task::JoinHandle;
use tracing::{debug, info, warn};

use rxoffice_auth::{
    explain_permission, normalize_email, Action, AuthorizationExplanation, Module, NewUser,
    PermissionGrid, Role, User,
};
use rxoffice_core::{DomainError, UserId};
use rxoffice_infra::{AccessControl, FlagStore};

use crate::config::SessionConfig;
use crate::notify::{Notification, Notifier};
use crate::provider::{AuthProviderError, AuthStateChange, ExternalIdentity, IdentityProvider};
use crate::resolve::{resolve_local_user, Resolution};
use crate::state::{SessionEnd, SessionState};

/// Sign-up form contents beyond the credentials.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct SignupProfile {
    pub name: String,
    /// Falls back to the configured default signup role.
    pub role: Option<Role>,
}

impl SignupProfile {
    pub fn new(name: impl Into<String>) -> Self {
        Self { name: name.into(), role: None }
    }

    pub fn with_role(mut self, role: Role) -> Self {
        self.role = Some(role);
        self
    }
}

#[derive(Debug, Error)]
pub enum SignupError {
    #[error(transparent)]
    Provider(#[from] AuthProviderError),

    #[error("invalid profile: {0}")]
    Profile(#[from] DomainError),
}

#[derive(Debug)]
struct ResolveJob {
    identity: ExternalIdentity,
    epoch: u64,
}

/// Background tasks spawned by [`SessionManager::start`].
///
/// The worker stops once the manager is dropped; the pump stops on the
/// first provider event after that.
#[derive(Debug)]
pub struct SessionTasks {
    handles: Vec<JoinHandle<()>>,
}

impl SessionTasks {
    pub fn abort(&self) {
        for handle in &self.handles {
            handle.abort();
        }
    }
}

pub struct SessionManager {
    provider: Arc<dyn IdentityProvider>,
    access: Arc<AccessControl>,
    flags: Arc<dyn FlagStore>,
    notifier: Arc<dyn Notifier>,
    config: SessionConfig,
    state: watch::Sender<SessionState>,
    jobs: mpsc::UnboundedSender<ResolveJob>,
    job_rx: Mutex<Option<mpsc::UnboundedReceiver<ResolveJob>>>,
    pending_signups: Mutex<HashSet<String>>,
}

impl SessionManager {
    pub fn new(
        provider: Arc<dyn IdentityProvider>,
        access: Arc<AccessControl>,
        flags: Arc<dyn FlagStore>,
        notifier: Arc<dyn Notifier>,
        config: SessionConfig,
    ) -> Arc<Self> {
        let (state, _) = watch::channel(SessionState::initializing());
        let (jobs, job_rx) = mpsc::unbounded_channel();

        Arc::new(Self {
            provider,
            access,
            flags,
            notifier,
            config,
            state,
            jobs,
            job_rx: Mutex::new(Some(job_rx)),
            pending_signups: Mutex::new(HashSet::new()),
        })
    }

    pub fn config(&self) -> &SessionConfig {
        &self.config
    }

    pub fn access(&self) -> &Arc<AccessControl> {
        &self.access
    }

    pub fn subscribe(&self) -> watch::Receiver<SessionState> {
        self.state.subscribe()
    }

    pub fn snapshot(&self) -> SessionState {
        self.state.borrow().clone()
    }

    pub fn is_authenticated(&self) -> bool {
        self.state.borrow().is_authenticated()
    }

    pub fn is_loading(&self) -> bool {
        self.state.borrow().is_loading
    }

    pub fn current_user(&self) -> Option<User> {
        self.state.borrow().local_user.clone()
    }

    // ─────────────────────────────────────────────────────────────────────────
    // Lifecycle
    // ─────────────────────────────────────────────────────────────────────────

    /// Subscribe to the provider, spawn the pump and resolution worker, then
    /// restore any existing provider session.
    pub async fn start(self: &Arc<Self>) -> SessionTasks {
        let mut handles = Vec::with_capacity(2);

        let mut events = self.provider.on_auth_state_change();
        let weak: Weak<Self> = Arc::downgrade(self);
        handles.push(tokio::spawn(async move {
            while let Some(change) = events.recv().await {
                let Some(manager) = weak.upgrade() else { break };
                manager.handle_auth_event(change);
            }
            debug!("auth event pump stopped");
        }));

        let job_rx = self.job_rx.lock().unwrap_or_else(PoisonError::into_inner).take();
        match job_rx {
            Some(mut rx) => {
                let weak: Weak<Self> = Arc::downgrade(self);
                handles.push(tokio::spawn(async move {
                    while let Some(job) = rx.recv().await {
                        let Some(manager) = weak.upgrade() else { break };
                        manager.resolve(job).await;
                    }
                    debug!("session resolution worker stopped");
                }));
            }
            None => warn!("session manager started twice; resolution worker already running"),
        }

        self.restore().await;
        SessionTasks { handles }
    }

    async fn restore(&self) {
        match self.provider.get_session().await {
            Ok(Some(identity)) => {
                info!(external_id = %identity.id, "restoring provider session");
                self.begin_resolution(identity);
            }
            Ok(None) => self.settle_without_session(),
            Err(e) => {
                warn!(error = %e, "could not read provider session; starting signed out");
                self.settle_without_session();
            }
        }
    }

    fn settle_without_session(&self) {
        // An event may already have started a resolution; leave it alone.
        let settled = self.state.send_if_modified(|s| {
            if s.external.is_some() || !s.is_loading {
                return false;
            }
            *s = SessionState::signed_out(s.epoch + 1, None);
            true
        });
        if settled {
            self.clear_flags();
        }
    }

    /// Apply one provider notification.
    ///
    /// A present identity moves the session to loading and queues resolution.
    /// An absent identity tears the session down at once.
    pub fn handle_auth_event(&self, change: AuthStateChange) {
        debug!(kind = ?change.kind, "auth state change");
        match change.identity {
            Some(identity) => self.begin_resolution(identity),
            None => self.teardown_if_active(SessionEnd::SignedOut),
        }
    }

    fn begin_resolution(&self, identity: ExternalIdentity) {
        let mut epoch = 0;
        self.state.send_modify(|s| {
            epoch = s.epoch + 1;
            *s = SessionState::resolving(epoch, identity.clone());
        });

        if self.jobs.send(ResolveJob { identity, epoch }).is_err() {
            warn!("session resolution worker is gone; identity left unresolved");
        }
    }

    async fn resolve(&self, job: ResolveJob) {
        let current_epoch = self.state.borrow().epoch;
        if current_epoch != job.epoch {
            debug!(job_epoch = job.epoch, current_epoch, "discarding stale resolution");
            return;
        }

        if self.is_signup_pending(&job.identity.email) {
            debug!(external_id = %job.identity.id, "resolution held until the signup record exists");
            return;
        }

        match resolve_local_user(&*self.access, &job.identity) {
            Some(resolution) => self.apply_resolution(job, resolution),
            None => self.fail_resolution(job).await,
        }
    }

    fn apply_resolution(&self, job: ResolveJob, resolution: Resolution) {
        if resolution.is_fallback() {
            warn!(
                external_id = %job.identity.id,
                user_id = %resolution.user().id,
                "no local user for identity; acting as first administrator"
            );
        }

        let user = resolution.into_user().with_last_login(Utc::now());
        let permissions = self.effective_grid(&user);

        let applied = self.state.send_if_modified(|s| {
            if s.epoch != job.epoch {
                return false;
            }
            *s = SessionState::authenticated(job.epoch, job.identity.clone(), user.clone(), permissions.clone());
            true
        });

        if !applied {
            debug!(job_epoch = job.epoch, "session moved on during resolution");
            return;
        }

        if let Err(e) = self.access.update_user(user.clone()) {
            warn!(user_id = %user.id, error = %e, "could not record last login");
        }
        self.set_flag(&self.config.authenticated_flag_key, "true");
        self.set_flag(&self.config.current_user_key, user.id.as_str());
        if self.ended_since(job.epoch) {
            // Torn down while the flags were being written.
            self.clear_flags();
            return;
        }
        info!(user_id = %user.id, role = %user.role, "session authenticated");
    }

    async fn fail_resolution(&self, job: ResolveJob) {
        warn!(
            external_id = %job.identity.id,
            "identity matches no local user and no administrator exists"
        );

        // Local teardown first so the provider's own sign-out event finds
        // nothing left to do.
        let applied = self.state.send_if_modified(|s| {
            if s.epoch != job.epoch {
                return false;
            }
            *s = SessionState::signed_out(s.epoch + 1, Some(SessionEnd::ResolutionFailed));
            true
        });
        if !applied {
            return;
        }

        self.clear_flags();
        self.notifier.notify(Notification::error(
            "Access denied",
            "No matching staff account was found for this login.",
        ));

        if let Err(e) = self.provider.sign_out().await {
            warn!(error = %e, "provider sign-out after failed resolution did not complete");
        }
    }

    fn teardown(&self, end: SessionEnd) {
        self.state
            .send_modify(|s| *s = SessionState::signed_out(s.epoch + 1, Some(end)));
        self.clear_flags();
    }

    fn teardown_if_active(&self, end: SessionEnd) {
        let changed = self.state.send_if_modified(|s| {
            if s.external.is_none() && !s.is_loading {
                return false;
            }
            *s = SessionState::signed_out(s.epoch + 1, Some(end));
            true
        });
        if changed {
            self.clear_flags();
            info!(?end, "session ended");
        }
    }

    // ─────────────────────────────────────────────────────────────────────────
    // Operations
    // ─────────────────────────────────────────────────────────────────────────

    /// Sign in with email and password.
    ///
    /// Session state changes through the provider's notification, not here.
    /// The durable authenticated flag is skipped when that notification has
    /// already ended the session (failed resolution) before this returns.
    pub async fn login(&self, email: &str, password: &str) -> Result<(), AuthProviderError> {
        let before = self.state.borrow().epoch;
        match self.provider.sign_in_with_password(email, password).await {
            Ok(identity) => {
                if !self.ended_since(before) {
                    self.set_flag(&self.config.authenticated_flag_key, "true");
                    if self.ended_since(before) {
                        self.clear_flags();
                    }
                }
                info!(external_id = %identity.id, "signed in");
                self.notifier.notify(Notification::success("Signed in"));
                Ok(())
            }
            Err(e) => {
                warn!(error = %e, "sign-in failed");
                self.notifier.notify(Notification::error("Sign-in failed", e.to_string()));
                Err(e)
            }
        }
    }

    /// Register with the provider and create the matching local user.
    ///
    /// The local record takes the provider's id, so the following resolution
    /// links them by id.
    pub async fn signup(
        &self,
        email: &str,
        password: &str,
        profile: SignupProfile,
    ) -> Result<User, SignupError> {
        let role = profile.role.unwrap_or(self.config.default_signup_role);
        let draft = NewUser::new(profile.name.clone(), email, role);
        if let Err(e) = draft.validate() {
            self.notifier.notify(Notification::error("Sign-up failed", e.to_string()));
            return Err(e.into());
        }

        let key = normalize_email(email);
        self.pending_signups_guard().insert(key.clone());

        let metadata = json!({ "name": profile.name.trim(), "role": role });
        let identity = match self.provider.sign_up(email, password, metadata).await {
            Ok(identity) => identity,
            Err(e) => {
                self.pending_signups_guard().remove(&key);
                warn!(error = %e, "sign-up rejected by provider");
                self.notifier.notify(Notification::error("Sign-up failed", e.to_string()));
                return Err(e.into());
            }
        };

        let created = self
            .access
            .add_user(draft.with_id(UserId::from_external(&identity.id)));
        self.pending_signups_guard().remove(&key);
        self.resume_if_held(&identity);

        match created {
            Ok(user) => {
                info!(user_id = %user.id, role = %user.role, "account created");
                self.notifier.notify(Notification::success("Account created"));
                Ok(user)
            }
            Err(e) => {
                warn!(error = %e, "could not create local user after sign-up");
                self.notifier.notify(Notification::error("Sign-up failed", e.to_string()));
                Err(e.into())
            }
        }
    }

    /// Sign out of the provider (best effort) and tear down locally.
    pub async fn logout(&self) {
        if let Err(e) = self.provider.sign_out().await {
            warn!(error = %e, "provider sign-out failed; clearing local session anyway");
        }
        self.teardown(SessionEnd::SignedOut);
        info!("signed out");
        self.notifier.notify(Notification::info("Signed out"));
    }

    /// Reload the local user and effective grid after an admin edit.
    ///
    /// A user deleted meanwhile ends the session.
    pub async fn refresh(&self) {
        let current = self.state.borrow().clone();
        let Some(user) = current.local_user else {
            return;
        };

        let Some(fresh) = self.access.get_user_by_id(&user.id) else {
            warn!(user_id = %user.id, "signed-in user no longer exists");
            let applied = self.state.send_if_modified(|s| {
                if s.epoch != current.epoch {
                    return false;
                }
                *s = SessionState::signed_out(s.epoch + 1, Some(SessionEnd::ResolutionFailed));
                true
            });
            if applied {
                self.clear_flags();
                if let Err(e) = self.provider.sign_out().await {
                    warn!(error = %e, "provider sign-out after user removal did not complete");
                }
            }
            return;
        };

        let permissions = self.effective_grid(&fresh);
        self.state.send_if_modified(|s| {
            if s.epoch != current.epoch {
                return false;
            }
            s.local_user = Some(fresh.clone());
            s.permissions = permissions.clone();
            true
        });
    }

    /// Permission check for the signed-in user; false when signed out.
    pub fn has_permission(&self, module: Module, action: Action) -> bool {
        let user = self.current_user();
        self.access.has_permission(user.as_ref(), module, action)
    }

    pub fn has_permission_named(&self, module: &str, action: &str) -> bool {
        let user = self.current_user();
        self.access.has_permission_named(user.as_ref(), module, action)
    }

    pub fn explain(&self, module: &str, action: &str) -> AuthorizationExplanation {
        let user = self.current_user();
        explain_permission(user.as_ref(), module, action, &*self.access)
    }

    // ─────────────────────────────────────────────────────────────────────────
    // Helpers
    // ─────────────────────────────────────────────────────────────────────────

    fn ended_since(&self, epoch: u64) -> bool {
        let s = self.state.borrow();
        s.ended.is_some() && s.epoch > epoch
    }

    /// Grid published with the session; administrators always see a full grid.
    fn effective_grid(&self, user: &User) -> Option<PermissionGrid> {
        if user.is_administrator() {
            return Some(PermissionGrid::allow_all());
        }
        self.access.get_user_permissions(&user.id)
    }

    fn pending_signups_guard(&self) -> std::sync::MutexGuard<'_, HashSet<String>> {
        self.pending_signups.lock().unwrap_or_else(PoisonError::into_inner)
    }

    fn is_signup_pending(&self, email: &str) -> bool {
        self.pending_signups_guard().contains(&normalize_email(email))
    }

    /// Re-queue a resolution that was held back while the signup completed.
    fn resume_if_held(&self, identity: &ExternalIdentity) {
        let held = {
            let s = self.state.borrow();
            s.is_loading && s.local_user.is_none() && s.external.as_ref() == Some(identity)
        };
        if held {
            self.begin_resolution(identity.clone());
        }
    }

    fn set_flag(&self, key: &str, value: &str) {
        if let Err(e) = self.flags.set(key, value) {
            warn!(key, error = %e, "could not persist session flag");
        }
    }

    fn clear_flags(&self) {
        for key in [&self.config.authenticated_flag_key, &self.config.current_user_key] {
            if let Err(e) = self.flags.remove(key) {
                warn!(key = %key, error = %e, "could not clear session flag");
            }
        }
    }
}
