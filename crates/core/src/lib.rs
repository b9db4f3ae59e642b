//! `rxoffice-core`: shared building blocks for the back-office access core.
//!
//! This crate contains **pure domain** primitives (no IO, no async).

pub mod entity;
pub mod error;
pub mod id;

pub use entity::Entity;
pub use error::{DomainError, DomainResult};
pub use id::{ExternalId, UserId};
