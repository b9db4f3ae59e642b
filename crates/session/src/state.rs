use rxoffice_auth::{PermissionGrid, User};

use crate::provider::ExternalIdentity;

/// Why an authenticated session ended.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum SessionEnd {
    /// Explicit logout or provider sign-out.
    SignedOut,
    /// The provider identity matched no local user and no administrator exists.
    ResolutionFailed,
}

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum SessionPhase {
    Loading,
    Unauthenticated,
    Authenticated,
}

/// Observable session state.
///
/// # Invariants
/// - `local_user` is set only while `external` is set.
/// - `permissions` is the effective grid of `local_user`.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct SessionState {
    pub external: Option<ExternalIdentity>,
    pub local_user: Option<User>,
    pub permissions: Option<PermissionGrid>,
    pub is_loading: bool,
    pub ended: Option<SessionEnd>,
    pub(crate) epoch: u64,
}

impl SessionState {
    pub(crate) fn initializing() -> Self {
        Self {
            external: None,
            local_user: None,
            permissions: None,
            is_loading: true,
            ended: None,
            epoch: 0,
        }
    }

    pub(crate) fn signed_out(epoch: u64, ended: Option<SessionEnd>) -> Self {
        Self {
            is_loading: false,
            ended,
            epoch,
            ..Self::initializing()
        }
    }

    pub(crate) fn resolving(epoch: u64, identity: ExternalIdentity) -> Self {
        Self {
            external: Some(identity),
            epoch,
            ..Self::initializing()
        }
    }

    pub(crate) fn authenticated(
        epoch: u64,
        identity: ExternalIdentity,
        user: User,
        permissions: Option<PermissionGrid>,
    ) -> Self {
        Self {
            external: Some(identity),
            local_user: Some(user),
            permissions,
            is_loading: false,
            ended: None,
            epoch,
        }
    }

    pub fn is_authenticated(&self) -> bool {
        self.external.is_some() && self.local_user.is_some()
    }

    pub fn phase(&self) -> SessionPhase {
        if self.is_loading {
            SessionPhase::Loading
        } else if self.is_authenticated() {
            SessionPhase::Authenticated
        } else {
            SessionPhase::Unauthenticated
        }
    }
}
