//! `rxoffice-auth`: role-based access control for the back office.
//!
//! Pure decision logic: roles, the permission vocabulary, the default role
//! matrix and the resolver. Storage lives in `rxoffice-infra`, sessions in
//! `rxoffice-session`.

pub mod authorize;
pub mod matrix;
pub mod permissions;
pub mod roles;
pub mod user;

pub use authorize::{
    authorize, authorize_action, explain_permission, has_permission, has_permission_named,
    AuthorizationExplanation, AuthzError, DecisionSource, GuardedAction, PermissionSource,
};
pub use matrix::{available_roles, role_permissions, role_permissions_by_name, RbacRegistry, RoleDefinition};
pub use permissions::{Action, ActionSet, GridError, Module, PermissionGrid};
pub use roles::{Role, UnknownRole};
pub use user::{normalize_email, NewUser, User, UserStatus};
