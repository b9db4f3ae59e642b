use core::str::FromStr;

use serde::{Deserialize, Serialize};
use thiserror::Error;

/// Built-in staff role.
///
/// The set is closed: roles are not user-creatable, and every role has an
/// entry in the permission matrix (see [`crate::matrix`]).
#[derive(Debug, Copy, Clone, PartialEq, Eq, PartialOrd, Ord, Hash, Serialize, Deserialize)]
pub enum Role {
    Administrator,
    Pharmacist,
    #[serde(rename = "Pharmacy Technician")]
    PharmacyTechnician,
    Cashier,
}

#[derive(Debug, Error, Clone, PartialEq, Eq)]
#[error("unknown role '{0}'")]
pub struct UnknownRole(pub String);

impl Role {
    /// Every built-in role, in display order.
    pub const ALL: [Role; 4] = [
        Role::Administrator,
        Role::Pharmacist,
        Role::PharmacyTechnician,
        Role::Cashier,
    ];

    pub fn as_str(&self) -> &'static str {
        match self {
            Role::Administrator => "Administrator",
            Role::Pharmacist => "Pharmacist",
            Role::PharmacyTechnician => "Pharmacy Technician",
            Role::Cashier => "Cashier",
        }
    }

    pub fn is_administrator(&self) -> bool {
        matches!(self, Role::Administrator)
    }
}

impl core::fmt::Display for Role {
    fn fmt(&self, f: &mut core::fmt::Formatter<'_>) -> core::fmt::Result {
        f.write_str(self.as_str())
    }
}

impl FromStr for Role {
    type Err = UnknownRole;

    /// Accepts display names case-insensitively, plus `snake_case` and
    /// `kebab-case` spellings ("pharmacy_technician").
    fn from_str(s: &str) -> Result<Self, Self::Err> {
        let normalized: String = s
            .trim()
            .chars()
            .map(|c| if c == '_' || c == '-' { ' ' } else { c.to_ascii_lowercase() })
            .collect();

        Role::ALL
            .into_iter()
            .find(|role| role.as_str().to_ascii_lowercase() == normalized)
            .ok_or_else(|| UnknownRole(s.to_string()))
    }
}
