//! The access-control container: user directory + override store.
//!
//! One instance is shared (via `Arc`) by the session manager and every page
//! that edits users or checks permissions. Tests build a fresh one each.

use std::sync::{Mutex, PoisonError};

use serde::{Deserialize, Serialize};

use rxoffice_auth::{
    has_permission, has_permission_named, role_permissions, Action, Module, NewUser,
    PermissionGrid, PermissionSource, Role, User,
};
use rxoffice_core::{DomainResult, UserId};

use crate::directory::UserDirectory;
use crate::overrides::OverrideStore;
use crate::store::{InMemoryRecordStore, RecordStore};

/// Serializable image of the directory and override store.
#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize, Deserialize)]
pub struct AccessSnapshot {
    pub users: Vec<User>,
    #[serde(default)]
    pub overrides: Vec<(UserId, PermissionGrid)>,
}

/// Directory and overrides behind one interface.
///
/// # Invariants
/// - No override references a user id absent from the directory.
/// - Compound mutations (delete + cascade, restore) are serialized.
pub struct AccessControl<
    U = InMemoryRecordStore<UserId, User>,
    O = InMemoryRecordStore<UserId, PermissionGrid>,
> {
    users: UserDirectory<U>,
    overrides: OverrideStore<O>,
    writes: Mutex<()>,
}

impl AccessControl {
    pub fn in_memory() -> Self {
        Self::new(InMemoryRecordStore::new(), InMemoryRecordStore::new())
    }
}

impl Default for AccessControl {
    fn default() -> Self {
        Self::in_memory()
    }
}

impl<U, O> AccessControl<U, O>
where
    U: RecordStore<UserId, User>,
    O: RecordStore<UserId, PermissionGrid>,
{
    pub fn new(users: U, overrides: O) -> Self {
        Self {
            users: UserDirectory::new(users),
            overrides: OverrideStore::new(overrides),
            writes: Mutex::new(()),
        }
    }

    fn write_guard(&self) -> std::sync::MutexGuard<'_, ()> {
        self.writes.lock().unwrap_or_else(PoisonError::into_inner)
    }

    // ─────────────────────────────────────────────────────────────────────────
    // User directory
    // ─────────────────────────────────────────────────────────────────────────

    /// Validate and insert a user, assigning an id when absent.
    ///
    /// Reusing an existing id replaces that record. Any override left for the
    /// id is dropped so a new record never inherits stale custom permissions.
    pub fn add_user(&self, new_user: NewUser) -> DomainResult<User> {
        let user = new_user.into_user()?;
        let _guard = self.write_guard();

        self.overrides.clear(&user.id);
        self.users.put(user.clone());
        tracing::debug!(user_id = %user.id, role = %user.role, "user added");
        Ok(user)
    }

    /// Full replace by id. A missing id is a silent no-op (`Ok(false)`).
    pub fn update_user(&self, user: User) -> DomainResult<bool> {
        let user = user.normalized()?;
        let _guard = self.write_guard();

        let id = user.id.clone();
        let replaced = self.users.replace(user);
        if replaced {
            tracing::debug!(user_id = %id, "user updated");
        } else {
            tracing::debug!(user_id = %id, "update ignored: no such user");
        }
        Ok(replaced)
    }

    /// Remove a user and its override. Idempotent.
    pub fn delete_user(&self, id: &UserId) -> bool {
        let _guard = self.write_guard();

        let had_override = self.overrides.clear(id);
        let removed = self.users.remove(id).is_some();
        if removed {
            tracing::debug!(user_id = %id, had_override, "user deleted");
        }
        removed
    }

    pub fn get_user_by_id(&self, id: &UserId) -> Option<User> {
        self.users.get(id)
    }

    pub fn get_user_by_email(&self, email: &str) -> Option<User> {
        self.users.get_by_email(email)
    }

    pub fn get_users_by_role(&self, role: Role) -> Vec<User> {
        self.users.by_role(role)
    }

    pub fn list_users(&self) -> Vec<User> {
        self.users.list()
    }

    pub fn first_administrator(&self) -> Option<User> {
        self.users.first_administrator()
    }

    /// Roles from the permission matrix, including roles nobody holds.
    pub fn available_roles(&self) -> Vec<Role> {
        rxoffice_auth::available_roles()
    }

    // ─────────────────────────────────────────────────────────────────────────
    // Overrides
    // ─────────────────────────────────────────────────────────────────────────

    /// Effective grid: override if set, else role default; `None` for an
    /// unknown user.
    pub fn get_user_permissions(&self, id: &UserId) -> Option<PermissionGrid> {
        let user = self.users.get(id)?;
        Some(
            self.overrides
                .get(id)
                .unwrap_or_else(|| role_permissions(user.role).clone()),
        )
    }

    /// Store or replace a user's override.
    ///
    /// Ignored (returns `false`) when the user does not exist, so an override
    /// can never outlive or predate its user.
    pub fn set_user_permissions(&self, id: &UserId, grid: PermissionGrid) -> bool {
        let _guard = self.write_guard();

        if !self.users.contains(id) {
            tracing::warn!(user_id = %id, "override ignored: no such user");
            return false;
        }
        self.overrides.set(id.clone(), grid);
        tracing::debug!(user_id = %id, "permission override set");
        true
    }

    /// Drop a user's override; lookups fall back to the role default.
    pub fn clear_user_permissions(&self, id: &UserId) -> bool {
        let _guard = self.write_guard();
        let cleared = self.overrides.clear(id);
        if cleared {
            tracing::debug!(user_id = %id, "permission override cleared");
        }
        cleared
    }

    pub fn has_override(&self, id: &UserId) -> bool {
        self.overrides.contains(id)
    }

    // ─────────────────────────────────────────────────────────────────────────
    // Resolver shortcuts
    // ─────────────────────────────────────────────────────────────────────────

    pub fn has_permission(&self, user: Option<&User>, module: Module, action: Action) -> bool {
        has_permission(user, module, action, self)
    }

    pub fn has_permission_named(&self, user: Option<&User>, module: &str, action: &str) -> bool {
        has_permission_named(user, module, action, self)
    }

    // ─────────────────────────────────────────────────────────────────────────
    // Snapshots
    // ─────────────────────────────────────────────────────────────────────────

    pub fn snapshot(&self) -> AccessSnapshot {
        let _guard = self.write_guard();
        AccessSnapshot {
            users: self.users.list(),
            overrides: self.overrides.list(),
        }
    }

    /// Replace all state with a snapshot.
    ///
    /// Overrides whose user is missing from the snapshot are dropped; the
    /// number dropped is returned.
    pub fn restore(&self, snapshot: AccessSnapshot) -> usize {
        let _guard = self.write_guard();

        self.overrides.clear_all();
        self.users.clear();
        for user in snapshot.users {
            self.users.put(user);
        }

        let mut dropped = 0;
        for (id, grid) in snapshot.overrides {
            if self.users.contains(&id) {
                self.overrides.set(id, grid);
            } else {
                dropped += 1;
            }
        }

        if dropped > 0 {
            tracing::warn!(dropped, "restore dropped overrides for unknown users");
        }
        dropped
    }
}

impl<U, O> PermissionSource for AccessControl<U, O>
where
    U: RecordStore<UserId, User>,
    O: RecordStore<UserId, PermissionGrid>,
{
    fn user_permissions(&self, user_id: &UserId) -> Option<PermissionGrid> {
        self.get_user_permissions(user_id)
    }

    fn has_override(&self, user_id: &UserId) -> bool {
        self.overrides.contains(user_id)
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use rxoffice_auth::ActionSet;

    fn seeded() -> AccessControl {
        let access = AccessControl::in_memory();
        access
            .add_user(NewUser::new("Ada Admin", "admin@pharmacy.test", Role::Administrator).with_id("1"))
            .unwrap();
        access
            .add_user(NewUser::new("Phil Pharmacist", "phil@pharmacy.test", Role::Pharmacist).with_id("2"))
            .unwrap();
        access
            .add_user(NewUser::new("Cass Cashier", "cass@pharmacy.test", Role::Cashier).with_id("3"))
            .unwrap();
        access
            .add_user(NewUser::new("Tess Tech", "tess@pharmacy.test", Role::PharmacyTechnician).with_id("5"))
            .unwrap();
        access
    }

    fn id(s: &str) -> UserId {
        UserId::new(s)
    }

    #[test]
    fn add_user_validates_and_assigns_id() {
        let access = AccessControl::in_memory();
        let stored = access
            .add_user(NewUser::new("New Hire", "new@pharmacy.test", Role::Cashier))
            .unwrap();
        assert_eq!(access.get_user_by_id(&stored.id), Some(stored));

        assert!(access.add_user(NewUser::new("", "x@pharmacy.test", Role::Cashier)).is_err());
        assert!(access.list_users().len() == 1);
    }

    #[test]
    fn update_missing_user_is_a_noop() {
        let access = seeded();
        let mut ghost = access.get_user_by_id(&id("2")).unwrap();
        ghost.id = id("99");

        assert_eq!(access.update_user(ghost), Ok(false));
        assert!(access.get_user_by_id(&id("99")).is_none());
        assert_eq!(access.list_users().len(), 4);
    }

    #[test]
    fn update_replaces_the_whole_record() {
        let access = seeded();
        let mut user = access.get_user_by_id(&id("3")).unwrap();
        user.role = Role::PharmacyTechnician;
        user.email = "CASS@Pharmacy.test".to_string();

        assert_eq!(access.update_user(user), Ok(true));
        let stored = access.get_user_by_id(&id("3")).unwrap();
        assert_eq!(stored.role, Role::PharmacyTechnician);
        assert_eq!(stored.email, "cass@pharmacy.test");
    }

    #[test]
    fn scenario_a_cashier_cannot_edit_inventory() {
        let access = seeded();
        let cashier = access.get_user_by_id(&id("3")).unwrap();
        assert!(!access.has_permission(Some(&cashier), Module::Inventory, Action::Edit));
        assert!(access.has_permission(Some(&cashier), Module::Inventory, Action::View));
    }

    #[test]
    fn scenario_b_override_beats_role_default() {
        let access = seeded();
        let pharmacist = access.get_user_by_id(&id("2")).unwrap();
        assert!(access.has_permission(Some(&pharmacist), Module::Sales, Action::Add));

        let grid = role_permissions(Role::Pharmacist)
            .clone()
            .with_module(Module::Sales, ActionSet::VIEW);
        assert!(access.set_user_permissions(&pharmacist.id, grid.clone()));

        assert!(!access.has_permission(Some(&pharmacist), Module::Sales, Action::Add));
        assert_eq!(access.get_user_permissions(&pharmacist.id), Some(grid));
    }

    #[test]
    fn scenario_c_deleted_user_has_no_permissions() {
        let access = seeded();
        access.set_user_permissions(&id("5"), PermissionGrid::allow_all());

        assert!(access.delete_user(&id("5")));
        assert_eq!(access.get_user_permissions(&id("5")), None);
        assert!(!access.has_override(&id("5")));
        assert!(!access.delete_user(&id("5")));
    }

    #[test]
    fn unknown_module_fails_closed() {
        let access = seeded();
        let tech = access.get_user_by_id(&id("5")).unwrap();
        assert!(!access.has_permission_named(Some(&tech), "nonexistent-module", "view"));
    }

    #[test]
    fn override_for_unknown_user_is_ignored() {
        let access = seeded();
        assert!(!access.set_user_permissions(&id("77"), PermissionGrid::allow_all()));

        access
            .add_user(NewUser::new("Late Hire", "late@pharmacy.test", Role::Cashier).with_id("77"))
            .unwrap();
        assert_eq!(
            access.get_user_permissions(&id("77")).as_ref(),
            Some(role_permissions(Role::Cashier))
        );
    }

    #[test]
    fn roles_come_from_the_matrix() {
        let access = AccessControl::in_memory();
        assert_eq!(access.available_roles(), Role::ALL.to_vec());
        assert!(access.get_users_by_role(Role::Pharmacist).is_empty());
    }

    #[test]
    fn snapshot_restore_drops_orphaned_overrides() {
        let access = seeded();
        access.set_user_permissions(&id("2"), PermissionGrid::deny_all());

        let mut snapshot = access.snapshot();
        assert_eq!(snapshot.overrides.len(), 1);
        snapshot.overrides.push((id("404"), PermissionGrid::allow_all()));

        let fresh = AccessControl::in_memory();
        assert_eq!(fresh.restore(snapshot), 1);
        assert_eq!(fresh.list_users().len(), 4);
        assert_eq!(fresh.get_user_permissions(&id("2")), Some(PermissionGrid::deny_all()));
        assert!(!fresh.has_override(&id("404")));
    }

    mod properties {
        use super::*;
        use proptest::prelude::*;

        fn action_set() -> impl Strategy<Value = ActionSet> {
            any::<[bool; 4]>().prop_map(|[view, add, edit, delete]| ActionSet { view, add, edit, delete })
        }

        fn grid() -> impl Strategy<Value = PermissionGrid> {
            prop::collection::vec(action_set(), Module::COUNT).prop_map(|sets| {
                Module::ALL
                    .into_iter()
                    .zip(sets)
                    .fold(PermissionGrid::deny_all(), |g, (m, s)| g.with_module(m, s))
            })
        }

        fn non_admin_role() -> impl Strategy<Value = Role> {
            prop_oneof![
                Just(Role::Pharmacist),
                Just(Role::PharmacyTechnician),
                Just(Role::Cashier),
            ]
        }

        fn module() -> impl Strategy<Value = Module> {
            prop::sample::select(Module::ALL.to_vec())
        }

        fn action() -> impl Strategy<Value = Action> {
            prop::sample::select(Action::ALL.to_vec())
        }

        proptest! {
            #![proptest_config(ProptestConfig {
                cases: 128,
                ..ProptestConfig::default()
            })]

            /// Administrator is allowed everything, whatever the override says.
            #[test]
            fn administrator_bypasses_overrides(g in grid(), m in module(), a in action()) {
                let access = seeded();
                let admin = access.get_user_by_id(&id("1")).unwrap();
                access.set_user_permissions(&admin.id, g);

                prop_assert!(access.has_permission(Some(&admin), m, a));
            }

            /// An override is returned exactly, never merged with the role default.
            #[test]
            fn override_is_returned_verbatim(role in non_admin_role(), g in grid(), m in module(), a in action()) {
                let access = AccessControl::in_memory();
                let user = access
                    .add_user(NewUser::new("Prop User", "prop@pharmacy.test", role))
                    .unwrap();

                access.set_user_permissions(&user.id, g.clone());

                prop_assert_eq!(access.get_user_permissions(&user.id), Some(g.clone()));
                prop_assert_eq!(access.has_permission(Some(&user), m, a), g.allows(m, a));
            }

            /// Clearing an override restores the role default exactly.
            #[test]
            fn clear_reverts_to_role_default(role in non_admin_role(), g in grid()) {
                let access = AccessControl::in_memory();
                let user = access
                    .add_user(NewUser::new("Prop User", "prop@pharmacy.test", role))
                    .unwrap();

                access.set_user_permissions(&user.id, g);
                access.clear_user_permissions(&user.id);

                let effective = access.get_user_permissions(&user.id);
                prop_assert_eq!(effective.as_ref(), Some(role_permissions(role)));
            }

            /// A re-added id never sees the deleted user's override.
            #[test]
            fn delete_cascades_to_override(old in non_admin_role(), new in non_admin_role(), g in grid()) {
                let access = AccessControl::in_memory();
                let first = access
                    .add_user(NewUser::new("First", "first@pharmacy.test", old).with_id("42"))
                    .unwrap();
                access.set_user_permissions(&first.id, g);
                access.delete_user(&first.id);

                access
                    .add_user(NewUser::new("Second", "second@pharmacy.test", new).with_id("42"))
                    .unwrap();

                prop_assert!(!access.has_override(&id("42")));
                let effective = access.get_user_permissions(&id("42"));
                prop_assert_eq!(effective.as_ref(), Some(role_permissions(new)));
            }
        }
    }
}
