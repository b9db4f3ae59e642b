//! Provider identity -> local user.

use rxoffice_auth::{PermissionGrid, User};
use rxoffice_core::UserId;
use rxoffice_infra::{AccessControl, RecordStore};

use crate::provider::ExternalIdentity;

/// How a provider identity was linked to a local user.
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum Resolution {
    ById(User),
    ByEmail(User),
    /// No match; acting as the first administrator.
    AdministratorFallback(User),
}

impl Resolution {
    pub fn user(&self) -> &User {
        match self {
            Resolution::ById(u) | Resolution::ByEmail(u) | Resolution::AdministratorFallback(u) => u,
        }
    }

    pub fn into_user(self) -> User {
        match self {
            Resolution::ById(u) | Resolution::ByEmail(u) | Resolution::AdministratorFallback(u) => u,
        }
    }

    pub fn is_fallback(&self) -> bool {
        matches!(self, Resolution::AdministratorFallback(_))
    }
}

/// Match by id, then by email, then fall back to the first administrator.
///
/// `None` means nothing matched and the directory has no administrator.
pub fn resolve_local_user<U, O>(
    access: &AccessControl<U, O>,
    identity: &ExternalIdentity,
) -> Option<Resolution>
where
    U: RecordStore<UserId, User>,
    O: RecordStore<UserId, PermissionGrid>,
{
    if let Some(user) = access.get_user_by_id(&UserId::from_external(&identity.id)) {
        return Some(Resolution::ById(user));
    }

    if let Some(user) = access.get_user_by_email(&identity.email) {
        return Some(Resolution::ByEmail(user));
    }

    access.first_administrator().map(Resolution::AdministratorFallback)
}
