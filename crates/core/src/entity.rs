//! Entity trait: records identified by a stable key rather than by value.

/// Anything stored in a keyed directory.
///
/// Two entities with the same id are the same record, whatever their other
/// fields say; replacement in a store is keyed on [`Entity::id`].
pub trait Entity {
    type Id: Clone + Eq + core::hash::Hash + core::fmt::Debug;

    fn id(&self) -> &Self::Id;
}
