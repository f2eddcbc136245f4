//! Identifiers for catalog entities and reasoning sessions.
//!
//! Entity IDs are dense and assigned in load order, so they double as
//! positions into the catalog's frame table and as the tie-break order
//! when hypotheses are ranked.

use std::fmt;

use serde::{Deserialize, Serialize};
use uuid::Uuid;

/// Identifier of one catalog entity.
///
/// # Examples
///
/// ```
/// use autoguess::EntityId;
///
/// let id = EntityId::from_index(3);
/// assert_eq!(id.index(), 3);
/// assert_eq!(id.to_string(), "#3");
/// ```
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, PartialOrd, Ord, Serialize, Deserialize)]
#[serde(transparent)]
pub struct EntityId(u32);

impl EntityId {
    /// Creates an entity ID from its load position.
    #[must_use]
    pub const fn new(raw: u32) -> Self {
        Self(raw)
    }

    /// Creates an entity ID from a `usize` position.
    ///
    /// Catalog sizes are bounded well below `u32::MAX`; positions beyond it saturate.
    #[must_use]
    pub fn from_index(index: usize) -> Self {
        Self(u32::try_from(index).unwrap_or(u32::MAX))
    }

    /// Returns the load position of this entity.
    #[must_use]
    pub const fn index(self) -> usize {
        self.0 as usize
    }

    /// Returns the raw value.
    #[must_use]
    pub const fn raw(self) -> u32 {
        self.0
    }
}

impl fmt::Display for EntityId {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "#{}", self.0)
    }
}

impl From<u32> for EntityId {
    fn from(raw: u32) -> Self {
        Self(raw)
    }
}

/// Globally unique identifier of a reasoning session.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(transparent)]
pub struct SessionId(Uuid);

impl SessionId {
    /// Creates a new random session ID.
    #[must_use]
    pub fn new() -> Self {
        Self(Uuid::new_v4())
    }

    /// Returns the underlying UUID.
    #[must_use]
    pub const fn as_uuid(&self) -> &Uuid {
        &self.0
    }
}

impl Default for SessionId {
    fn default() -> Self {
        Self::new()
    }
}

impl fmt::Display for SessionId {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "{}", self.0)
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_entity_id_round_trips_index() {
        let id = EntityId::from_index(17);
        assert_eq!(id.index(), 17);
        assert_eq!(id.raw(), 17);
        assert_eq!(EntityId::from(17u32), id);
    }

    #[test]
    fn test_entity_id_orders_by_load_position() {
        assert!(EntityId::new(1) < EntityId::new(2));
    }

    #[test]
    fn test_entity_id_display() {
        assert_eq!(format!("{}", EntityId::new(5)), "#5");
    }

    #[test]
    fn test_session_id_creation() {
        let a = SessionId::new();
        let b = SessionId::new();
        assert_ne!(a, b);
        assert!(format!("{a}").contains('-'));
        assert!(!a.as_uuid().is_nil());
    }

    #[test]
    fn test_entity_id_serializes_transparently() {
        let json = serde_json::to_string(&EntityId::new(9)).unwrap();
        assert_eq!(json, "9");
    }
}
