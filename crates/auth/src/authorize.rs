use std::sync::Arc;

use serde::Serialize;
use thiserror::Error;

use rxoffice_core::UserId;

use crate::permissions::{Action, Module, PermissionGrid};
use crate::{Role, User};

/// Where effective grids come from.
///
/// Implemented by the override store container in `rxoffice-infra`; the
/// resolver itself holds no state.
pub trait PermissionSource: Send + Sync {
    /// Effective grid for a user: override if set, else role default.
    /// `None` when the user does not exist.
    fn user_permissions(&self, user_id: &UserId) -> Option<PermissionGrid>;

    /// Whether the effective grid is a per-user override.
    fn has_override(&self, _user_id: &UserId) -> bool {
        false
    }
}

impl<S> PermissionSource for Arc<S>
where
    S: PermissionSource + ?Sized,
{
    fn user_permissions(&self, user_id: &UserId) -> Option<PermissionGrid> {
        (**self).user_permissions(user_id)
    }

    fn has_override(&self, user_id: &UserId) -> bool {
        (**self).has_override(user_id)
    }
}

#[derive(Debug, Error, Clone, PartialEq, Eq)]
pub enum AuthzError {
    #[error("not authenticated")]
    Unauthenticated,

    #[error("forbidden: missing permission '{module}.{action}'")]
    Forbidden { module: String, action: String },
}

/// UI-side authorization contract.
///
/// Implement this on actions (buttons, dialogs, routes) that need a
/// permission; check with [`authorize_action`] before performing them.
pub trait GuardedAction {
    fn required_permission(&self) -> (Module, Action);
}

/// Decide whether `user` may perform `action` on `module`.
///
/// - No user: deny.
/// - Administrator: allow, whatever any override says.
/// - Otherwise: look up the effective grid; unknown user denies.
pub fn has_permission<S>(user: Option<&User>, module: Module, action: Action, source: &S) -> bool
where
    S: PermissionSource + ?Sized,
{
    let Some(user) = user else {
        return false;
    };

    if user.role == Role::Administrator {
        return true;
    }

    source
        .user_permissions(&user.id)
        .is_some_and(|grid| grid.allows(module, action))
}

/// String-keyed variant for callers holding raw module/action names.
///
/// Unknown names deny; this never panics and never allows by default.
pub fn has_permission_named<S>(user: Option<&User>, module: &str, action: &str, source: &S) -> bool
where
    S: PermissionSource + ?Sized,
{
    let (Ok(module), Ok(action)) = (module.parse::<Module>(), action.parse::<Action>()) else {
        tracing::debug!(module, action, "permission check on unknown key denied");
        return false;
    };
    has_permission(user, module, action, source)
}

/// `Result` form of [`has_permission`] for `?` call sites.
pub fn authorize<S>(user: Option<&User>, module: Module, action: Action, source: &S) -> Result<(), AuthzError>
where
    S: PermissionSource + ?Sized,
{
    if user.is_none() {
        return Err(AuthzError::Unauthenticated);
    }

    if has_permission(user, module, action, source) {
        Ok(())
    } else {
        Err(AuthzError::Forbidden {
            module: module.to_string(),
            action: action.to_string(),
        })
    }
}

pub fn authorize_action<A, S>(user: Option<&User>, guarded: &A, source: &S) -> Result<(), AuthzError>
where
    A: GuardedAction + ?Sized,
    S: PermissionSource + ?Sized,
{
    let (module, action) = guarded.required_permission();
    authorize(user, module, action, source)
}

// ─────────────────────────────────────────────────────────────────────────────
// Authorization Explanation (Audit Trail)
// ─────────────────────────────────────────────────────────────────────────────

/// What decided the outcome.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize)]
#[serde(rename_all = "snake_case")]
pub enum DecisionSource {
    Unauthenticated,
    AdministratorBypass,
    Override,
    RoleDefault,
    UnknownUser,
    UnknownKey,
}

/// Detailed explanation of an authorization decision.
///
/// Answers "why is this button disabled for me?" on the permissions screen.
#[derive(Debug, Clone, Serialize)]
pub struct AuthorizationExplanation {
    pub module: String,
    pub action: String,
    pub granted: bool,
    pub source: DecisionSource,
    pub reason: String,
    pub user_id: Option<UserId>,
    pub role: Option<Role>,
}

/// Explain the decision [`has_permission_named`] would make.
pub fn explain_permission<S>(
    user: Option<&User>,
    module: &str,
    action: &str,
    source: &S,
) -> AuthorizationExplanation
where
    S: PermissionSource + ?Sized,
{
    let base = |granted: bool, source: DecisionSource, reason: String| AuthorizationExplanation {
        module: module.to_string(),
        action: action.to_string(),
        granted,
        source,
        reason,
        user_id: user.map(|u| u.id.clone()),
        role: user.map(|u| u.role),
    };

    let Some(user) = user else {
        return base(false, DecisionSource::Unauthenticated, "no signed-in user".to_string());
    };

    if user.role == Role::Administrator {
        return base(
            true,
            DecisionSource::AdministratorBypass,
            "Administrator has every permission regardless of overrides".to_string(),
        );
    }

    let (Ok(parsed_module), Ok(parsed_action)) = (module.parse::<Module>(), action.parse::<Action>()) else {
        return base(
            false,
            DecisionSource::UnknownKey,
            format!("'{module}.{action}' is not a known permission; denied"),
        );
    };

    let Some(grid) = source.user_permissions(&user.id) else {
        return base(
            false,
            DecisionSource::UnknownUser,
            format!("user {} is not in the directory", user.id),
        );
    };

    let granted = grid.allows(parsed_module, parsed_action);
    let verdict = if granted { "grants" } else { "denies" };

    if source.has_override(&user.id) {
        base(
            granted,
            DecisionSource::Override,
            format!("custom permissions for user {} {verdict} '{module}.{action}'", user.id),
        )
    } else {
        base(
            granted,
            DecisionSource::RoleDefault,
            format!("default permissions for role {} {verdict} '{module}.{action}'", user.role),
        )
    }
}
