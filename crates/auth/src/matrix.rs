//! Default role -> permission matrix.
//!
//! The matrix is fixed at compile time. Per-user deviations live in the
//! override store, never here.

use std::sync::LazyLock;

use serde::Serialize;

use crate::permissions::{ActionSet, Module, PermissionGrid};
use crate::Role;

static ADMINISTRATOR: PermissionGrid = PermissionGrid::allow_all();

// Non-admin grids start from `deny_all`: anything not granted below is closed.
static PHARMACIST: LazyLock<PermissionGrid> = LazyLock::new(|| {
    PermissionGrid::deny_all()
        .with_module(Module::Inventory, ActionSet::VIEW_ADD_EDIT)
        .with_module(Module::Sales, ActionSet::VIEW_ADD_EDIT)
        .with_module(Module::Purchases, ActionSet::VIEW_ADD_EDIT)
        .with_module(Module::Customers, ActionSet::VIEW_ADD_EDIT)
        .with_module(Module::Prescriptions, ActionSet::ALL)
        .with_module(Module::Returns, ActionSet::VIEW_ADD_EDIT)
        .with_module(Module::Reports, ActionSet::VIEW)
        .with_module(Module::Settings, ActionSet::VIEW)
});

static PHARMACY_TECHNICIAN: LazyLock<PermissionGrid> = LazyLock::new(|| {
    PermissionGrid::deny_all()
        .with_module(Module::Inventory, ActionSet::VIEW_ADD_EDIT)
        .with_module(Module::Sales, ActionSet::VIEW_ADD)
        .with_module(Module::Purchases, ActionSet::VIEW_ADD)
        .with_module(Module::Customers, ActionSet::VIEW_ADD_EDIT)
        .with_module(Module::Prescriptions, ActionSet::VIEW_ADD)
        .with_module(Module::Returns, ActionSet::VIEW_ADD)
});

static CASHIER: LazyLock<PermissionGrid> = LazyLock::new(|| {
    PermissionGrid::deny_all()
        .with_module(Module::Inventory, ActionSet::VIEW)
        .with_module(Module::Sales, ActionSet::VIEW_ADD)
        .with_module(Module::Customers, ActionSet::VIEW_ADD)
        .with_module(Module::Prescriptions, ActionSet::VIEW)
        .with_module(Module::Returns, ActionSet::VIEW_ADD)
});

/// Default grid for a built-in role.
///
/// The returned grid is shared; clone it before editing.
pub fn role_permissions(role: Role) -> &'static PermissionGrid {
    match role {
        Role::Administrator => &ADMINISTRATOR,
        Role::Pharmacist => &*PHARMACIST,
        Role::PharmacyTechnician => &*PHARMACY_TECHNICIAN,
        Role::Cashier => &*CASHIER,
    }
}

/// Default grid looked up by role name; `None` for an unknown role.
pub fn role_permissions_by_name(name: &str) -> Option<PermissionGrid> {
    let role: Role = name.parse().ok()?;
    Some(role_permissions(role).clone())
}

/// Roles that exist in the matrix, whether or not any user holds them.
pub fn available_roles() -> Vec<Role> {
    Role::ALL.to_vec()
}

// ─────────────────────────────────────────────────────────────────────────────
// Registry (read-only role screen)
// ─────────────────────────────────────────────────────────────────────────────

/// Role definition with its default grid (for audit/display).
#[derive(Debug, Clone, Serialize)]
pub struct RoleDefinition {
    pub role: Role,
    pub description: &'static str,
    pub permissions: PermissionGrid,
}

/// Every built-in role with its description and default grid.
#[derive(Debug, Clone, Serialize)]
pub struct RbacRegistry {
    pub roles: Vec<RoleDefinition>,
}

impl RbacRegistry {
    pub fn builtin() -> Self {
        let roles = Role::ALL
            .into_iter()
            .map(|role| RoleDefinition {
                role,
                description: role_description(role),
                permissions: role_permissions(role).clone(),
            })
            .collect();

        Self { roles }
    }

    pub fn get(&self, role: Role) -> Option<&RoleDefinition> {
        self.roles.iter().find(|d| d.role == role)
    }
}

fn role_description(role: Role) -> &'static str {
    match role {
        Role::Administrator => "Full access to every module, including user management",
        Role::Pharmacist => "Dispensing, prescriptions and stock control; read-only reports",
        Role::PharmacyTechnician => "Stock handling and prescription intake under supervision",
        Role::Cashier => "Point-of-sale, customer lookup and returns intake",
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::permissions::Action;

    #[test]
    fn administrator_default_allows_everything() {
        let grid = role_permissions(Role::Administrator);
        for module in Module::ALL {
            assert_eq!(grid.actions(module), ActionSet::ALL);
        }
    }

    #[test]
    fn cashier_cannot_edit_inventory() {
        let grid = role_permissions(Role::Cashier);
        assert!(grid.allows(Module::Inventory, Action::View));
        assert!(!grid.allows(Module::Inventory, Action::Edit));
    }

    #[test]
    fn pharmacist_can_add_sales_but_not_manage_users() {
        let grid = role_permissions(Role::Pharmacist);
        assert!(grid.allows(Module::Sales, Action::Add));
        assert_eq!(grid.actions(Module::Users), ActionSet::NONE);
    }

    #[test]
    fn lookup_by_name_is_total_over_known_names_only() {
        assert_eq!(
            role_permissions_by_name("Pharmacy Technician").as_ref(),
            Some(role_permissions(Role::PharmacyTechnician))
        );
        assert_eq!(role_permissions_by_name("Owner"), None);
    }

    #[test]
    fn registry_lists_every_role() {
        let registry = RbacRegistry::builtin();
        assert_eq!(registry.roles.len(), Role::ALL.len());
        let cashier = registry.get(Role::Cashier).unwrap();
        assert_eq!(&cashier.permissions, role_permissions(Role::Cashier));
        assert_eq!(available_roles(), Role::ALL.to_vec());
    }
}
