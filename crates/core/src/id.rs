//! Strongly-typed identifiers used across the domain.
//!
//! Identifiers are opaque strings: local user ids come from fixtures ("1",
//! "5") or are generated, and external ids are whatever the identity provider
//! hands out. Both are compared byte-for-byte.

use core::str::FromStr;
use serde::{Deserialize, Serialize};
use uuid::Uuid;

use crate::error::DomainError;

/// Identifier of a local user record.
#[derive(Debug, Clone, PartialEq, Eq, PartialOrd, Ord, Hash, Serialize, Deserialize)]
#[serde(transparent)]
pub struct UserId(String);

/// Identifier assigned by the external identity provider.
#[derive(Debug, Clone, PartialEq, Eq, PartialOrd, Ord, Hash, Serialize, Deserialize)]
#[serde(transparent)]
pub struct ExternalId(String);

macro_rules! impl_string_newtype {
    ($t:ty, $name:literal) => {
        impl $t {
            /// Wrap an existing identifier without validation.
            ///
            /// Prefer [`FromStr`] for untrusted input; it rejects blank values.
            pub fn new(value: impl Into<String>) -> Self {
                Self(value.into())
            }

            /// Generate a fresh time-ordered identifier (UUIDv7).
            pub fn generate() -> Self {
                Self(Uuid::now_v7().to_string())
            }

            pub fn as_str(&self) -> &str {
                &self.0
            }
        }

        impl core::fmt::Display for $t {
            fn fmt(&self, f: &mut core::fmt::Formatter<'_>) -> core::fmt::Result {
                f.write_str(&self.0)
            }
        }

        impl From<&str> for $t {
            fn from(value: &str) -> Self {
                Self(value.to_string())
            }
        }

        impl From<String> for $t {
            fn from(value: String) -> Self {
                Self(value)
            }
        }

        impl From<$t> for String {
            fn from(value: $t) -> Self {
                value.0
            }
        }

        impl FromStr for $t {
            type Err = DomainError;

            fn from_str(s: &str) -> Result<Self, Self::Err> {
                let trimmed = s.trim();
                if trimmed.is_empty() {
                    return Err(DomainError::invalid_id(format!("{}: empty", $name)));
                }
                Ok(Self(trimmed.to_string()))
            }
        }
    };
}

impl_string_newtype!(UserId, "UserId");
impl_string_newtype!(ExternalId, "ExternalId");

impl UserId {
    /// A local id that mirrors an external identity (used when signup links
    /// the two records).
    pub fn from_external(id: &ExternalId) -> Self {
        Self(id.0.clone())
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn generated_ids_are_unique() {
        let a = UserId::generate();
        let b = UserId::generate();
        assert_ne!(a, b);
    }

    #[test]
    fn parse_rejects_blank() {
        assert!("   ".parse::<UserId>().is_err());
        assert_eq!("  42 ".parse::<UserId>().unwrap(), UserId::new("42"));
    }

    #[test]
    fn local_id_mirrors_external_id_exactly() {
        let local = UserId::from_external(&ExternalId::new("ext-99"));
        assert_eq!(local, UserId::new("ext-99"));
        assert_ne!(local, UserId::new("EXT-99"));
    }

    #[test]
    fn serializes_transparently() {
        let json = serde_json::to_string(&UserId::new("7")).unwrap();
        assert_eq!(json, "\"7\"");
    }
}
