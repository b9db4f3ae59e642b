//! Local user records (the back office's own staff profiles).
//!
//! These are distinct from the identity provider's accounts; the session
//! layer links the two by id or email.

use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};

use rxoffice_core::{DomainError, DomainResult, Entity, UserId};

use crate::Role;

// ─────────────────────────────────────────────────────────────────────────────
// User Status
// ─────────────────────────────────────────────────────────────────────────────

/// Account status shown in the staff list.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize, Default)]
#[serde(rename_all = "lowercase")]
pub enum UserStatus {
    #[default]
    Active,
    Inactive,
}

impl core::fmt::Display for UserStatus {
    fn fmt(&self, f: &mut core::fmt::Formatter<'_>) -> core::fmt::Result {
        match self {
            UserStatus::Active => write!(f, "active"),
            UserStatus::Inactive => write!(f, "inactive"),
        }
    }
}

// ─────────────────────────────────────────────────────────────────────────────
// User
// ─────────────────────────────────────────────────────────────────────────────

/// Stored user record.
///
/// # Invariants
/// - `id` is unique within a directory and never changes.
/// - `email` is trimmed and lowercased.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct User {
    pub id: UserId,
    pub name: String,
    pub email: String,
    pub role: Role,
    #[serde(default)]
    pub status: UserStatus,
    #[serde(default)]
    pub last_login: Option<DateTime<Utc>>,
}

impl Entity for User {
    type Id = UserId;

    fn id(&self) -> &Self::Id {
        &self.id
    }
}

impl User {
    pub fn is_administrator(&self) -> bool {
        self.role.is_administrator()
    }

    /// Check the same rules as [`NewUser::validate`] and normalize the email.
    pub fn normalized(mut self) -> DomainResult<Self> {
        validate_profile(&self.name, &self.email)?;
        self.name = self.name.trim().to_string();
        self.email = normalize_email(&self.email);
        Ok(self)
    }

    /// Same record with `last_login` set.
    pub fn with_last_login(mut self, at: DateTime<Utc>) -> Self {
        self.last_login = Some(at);
        self
    }
}

/// Input for adding a user; `id` is assigned when absent.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct NewUser {
    #[serde(default)]
    pub id: Option<UserId>,
    pub name: String,
    pub email: String,
    pub role: Role,
    #[serde(default)]
    pub status: UserStatus,
}

impl NewUser {
    pub fn new(name: impl Into<String>, email: impl Into<String>, role: Role) -> Self {
        Self {
            id: None,
            name: name.into(),
            email: email.into(),
            role,
            status: UserStatus::Active,
        }
    }

    pub fn with_id(mut self, id: impl Into<UserId>) -> Self {
        self.id = Some(id.into());
        self
    }

    pub fn with_status(mut self, status: UserStatus) -> Self {
        self.status = status;
        self
    }

    pub fn validate(&self) -> DomainResult<()> {
        validate_profile(&self.name, &self.email)
    }

    /// Validate and build the stored record, generating an id if needed.
    pub fn into_user(self) -> DomainResult<User> {
        self.validate()?;
        Ok(User {
            id: self.id.unwrap_or_else(UserId::generate),
            name: self.name.trim().to_string(),
            email: normalize_email(&self.email),
            role: self.role,
            status: self.status,
            last_login: None,
        })
    }
}

/// Emails compare trimmed and case-insensitively.
pub fn normalize_email(email: &str) -> String {
    email.trim().to_lowercase()
}

fn validate_profile(name: &str, email: &str) -> DomainResult<()> {
    if name.trim().is_empty() {
        return Err(DomainError::validation("name cannot be empty"));
    }

    if email.trim().is_empty() || !email.contains('@') {
        return Err(DomainError::validation("invalid email format"));
    }

    Ok(())
}

// ─────────────────────────────────────────────────────────────────────────────
// Tests
// ─────────────────────────────────────────────────────────────────────────────

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn into_user_assigns_id_and_normalizes() {
        let user = NewUser::new("  Alice Smith ", " Alice@Example.COM ", Role::Pharmacist)
            .into_user()
            .unwrap();

        assert!(!user.id.as_str().is_empty());
        assert_eq!(user.name, "Alice Smith");
        assert_eq!(user.email, "alice@example.com");
        assert_eq!(user.status, UserStatus::Active);
        assert_eq!(user.last_login, None);
    }

    #[test]
    fn into_user_keeps_supplied_id() {
        let user = NewUser::new("Bob", "bob@example.com", Role::Cashier)
            .with_id("5")
            .into_user()
            .unwrap();
        assert_eq!(user.id, UserId::new("5"));
    }

    #[test]
    fn blank_name_is_rejected() {
        let err = NewUser::new("   ", "carol@example.com", Role::Cashier)
            .into_user()
            .unwrap_err();
        assert!(err.to_string().contains("name"));
    }

    #[test]
    fn malformed_email_is_rejected() {
        assert!(NewUser::new("Dave", "", Role::Cashier).validate().is_err());
        assert!(NewUser::new("Dave", "dave.example.com", Role::Cashier).validate().is_err());
    }

    #[test]
    fn wire_format_uses_camel_case() {
        let user = NewUser::new("Eve", "eve@example.com", Role::PharmacyTechnician)
            .with_id("9")
            .into_user()
            .unwrap();
        let value = serde_json::to_value(&user).unwrap();

        assert_eq!(value["role"], "Pharmacy Technician");
        assert_eq!(value["status"], "active");
        assert!(value.get("lastLogin").is_some());
    }
}
