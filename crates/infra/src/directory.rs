//! User directory: the local staff records keyed by id.

use rxoffice_auth::{normalize_email, Role, User};
use rxoffice_core::UserId;

use crate::store::RecordStore;

/// Directory of local user records.
///
/// Thin query layer over a [`RecordStore`]; validation and override cleanup
/// happen in [`crate::AccessControl`], which owns both stores.
pub struct UserDirectory<S> {
    store: S,
}

impl<S> UserDirectory<S>
where
    S: RecordStore<UserId, User>,
{
    pub fn new(store: S) -> Self {
        Self { store }
    }

    /// Insert or replace a record; returns the previous one.
    pub fn put(&self, user: User) -> Option<User> {
        self.store.put(user)
    }

    /// Replace an existing record; `false` (and no write) when the id is absent.
    pub fn replace(&self, user: User) -> bool {
        if !self.store.contains(&user.id) {
            return false;
        }
        self.store.put(user);
        true
    }

    pub fn remove(&self, id: &UserId) -> Option<User> {
        self.store.remove(id)
    }

    pub fn get(&self, id: &UserId) -> Option<User> {
        self.store.get(id)
    }

    pub fn contains(&self, id: &UserId) -> bool {
        self.store.contains(id)
    }

    /// All users, ordered by id.
    pub fn list(&self) -> Vec<User> {
        let mut users: Vec<User> = self.store.list().into_iter().map(|(_, u)| u).collect();
        users.sort_by(|a, b| a.id.cmp(&b.id));
        users
    }

    /// Get a user by email (linear scan, normalized comparison).
    pub fn get_by_email(&self, email: &str) -> Option<User> {
        let normalized = normalize_email(email);
        self.list().into_iter().find(|u| u.email == normalized)
    }

    pub fn by_role(&self, role: Role) -> Vec<User> {
        self.list().into_iter().filter(|u| u.role == role).collect()
    }

    /// First Administrator in id order.
    pub fn first_administrator(&self) -> Option<User> {
        self.list().into_iter().find(User::is_administrator)
    }

    pub fn clear(&self) {
        self.store.clear()
    }
}
