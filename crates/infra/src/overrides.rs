//! Per-user permission overrides.

use rxoffice_auth::PermissionGrid;
use rxoffice_core::UserId;

use crate::store::RecordStore;

/// Custom grids keyed by user id.
///
/// An override replaces the role default wholesale; there is no per-module
/// merge. Existence of the owning user is enforced by [`crate::AccessControl`].
pub struct OverrideStore<S> {
    store: S,
}

impl<S> OverrideStore<S>
where
    S: RecordStore<UserId, PermissionGrid>,
{
    pub fn new(store: S) -> Self {
        Self { store }
    }

    pub fn get(&self, id: &UserId) -> Option<PermissionGrid> {
        self.store.get(id)
    }

    pub fn contains(&self, id: &UserId) -> bool {
        self.store.contains(id)
    }

    pub fn set(&self, id: UserId, grid: PermissionGrid) {
        self.store.upsert(id, grid);
    }

    /// Remove the override; returns whether one existed.
    pub fn clear(&self, id: &UserId) -> bool {
        self.store.remove(id).is_some()
    }

    pub fn list(&self) -> Vec<(UserId, PermissionGrid)> {
        let mut entries = self.store.list();
        entries.sort_by(|a, b| a.0.cmp(&b.0));
        entries
    }

    pub fn clear_all(&self) {
        self.store.clear()
    }
}
