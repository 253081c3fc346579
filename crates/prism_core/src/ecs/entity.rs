//! # Entity Identity
//!
//! Entities are lightweight identifiers consisting of:
//! - A slot index into the entity index
//! - A generation counter for safe reuse
//!
//! Deleting an entity bumps its slot generation before the slot is recycled,
//! so a stale id never resolves to the slot's next occupant.

use std::fmt;

use super::archetype::TableId;

/// Opaque entity identifier.
///
/// - Lower 32 bits: slot index
/// - Upper 32 bits: generation
#[derive(Clone, Copy, Debug, PartialEq, Eq, Hash, PartialOrd, Ord)]
#[repr(transparent)]
pub struct Entity(u64);

impl Entity {
    /// Null/invalid entity.
    pub const NULL: Self = Self(u64::MAX);

    /// Creates an id from slot index and generation.
    #[inline]
    #[must_use]
    pub const fn new(index: u32, generation: u32) -> Self {
        Self(((generation as u64) << 32) | (index as u64))
    }

    /// Slot index.
    #[inline]
    #[must_use]
    #[allow(clippy::cast_possible_truncation)]
    pub const fn index(self) -> u32 {
        self.0 as u32
    }

    /// Generation of the slot when this id was issued.
    #[inline]
    #[must_use]
    pub const fn generation(self) -> u32 {
        (self.0 >> 32) as u32
    }

    /// Raw 64-bit value.
    #[inline]
    #[must_use]
    pub const fn to_bits(self) -> u64 {
        self.0
    }

    /// Checks if this is the null id.
    #[inline]
    #[must_use]
    pub const fn is_null(self) -> bool {
        self.0 == u64::MAX
    }
}

impl Default for Entity {
    fn default() -> Self {
        Self::NULL
    }
}

impl fmt::Display for Entity {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "{}v{}", self.index(), self.generation())
    }
}

/// Where an entity's row currently lives.
#[derive(Clone, Copy, Debug, PartialEq, Eq, Hash)]
pub struct EntityLocation {
    /// Owning table.
    pub table: TableId,
    /// Row within the table.
    pub row: usize,
}

#[derive(Clone, Copy, Debug)]
struct Slot {
    generation: u32,
    location: Option<EntityLocation>,
}

/// Entity id allocator and `Entity -> EntityLocation` map.
#[derive(Debug, Default)]
pub(crate) struct EntityIndex {
    slots: Vec<Slot>,
    free: Vec<u32>,
    alive: usize,
}

impl EntityIndex {
    /// Issues a new id placed at `location`, reusing a freed slot when possible.
    pub(crate) fn allocate(&mut self, location: EntityLocation) -> Entity {
        self.alive += 1;
        if let Some(index) = self.free.pop() {
            let slot = &mut self.slots[index as usize];
            slot.location = Some(location);
            return Entity::new(index, slot.generation);
        }
        // u32::MAX slots is NULL territory; the store never gets near it
        #[allow(clippy::cast_possible_truncation)]
        let index = self.slots.len() as u32;
        self.slots.push(Slot {
            generation: 0,
            location: Some(location),
        });
        Entity::new(index, 0)
    }

    /// Current location of a live id.
    pub(crate) fn get(&self, entity: Entity) -> Option<EntityLocation> {
        let slot = self.slots.get(entity.index() as usize)?;
        if slot.generation == entity.generation() {
            slot.location
        } else {
            None
        }
    }

    /// Moves a live id to a new row.
    pub(crate) fn set(&mut self, entity: Entity, location: EntityLocation) {
        if let Some(slot) = self.slots.get_mut(entity.index() as usize) {
            if slot.generation == entity.generation() && slot.location.is_some() {
                slot.location = Some(location);
            }
        }
    }

    /// Retires an id. Returns its last location, or `None` if it was not live.
    pub(crate) fn free(&mut self, entity: Entity) -> Option<EntityLocation> {
        let slot = self.slots.get_mut(entity.index() as usize)?;
        if slot.generation != entity.generation() {
            return None;
        }
        let location = slot.location.take()?;
        slot.generation = slot.generation.wrapping_add(1);
        self.free.push(entity.index());
        self.alive -= 1;
        Some(location)
    }

    /// Number of live ids.
    pub(crate) fn len(&self) -> usize {
        self.alive
    }

    /// Every live id with its location.
    pub(crate) fn iter(&self) -> impl Iterator<Item = (Entity, EntityLocation)> + '_ {
        self.slots.iter().enumerate().filter_map(|(i, slot)| {
            #[allow(clippy::cast_possible_truncation)]
            let entity = Entity::new(i as u32, slot.generation);
            slot.location.map(|loc| (entity, loc))
        })
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    fn at(row: usize) -> EntityLocation {
        EntityLocation {
            table: TableId::new(0),
            row,
        }
    }

    #[test]
    fn test_entity_id_roundtrip() {
        let id = Entity::new(12345, 67890);
        assert_eq!(id.index(), 12345);
        assert_eq!(id.generation(), 67890);
        assert_eq!(id.to_string(), "12345v67890");
        assert_eq!(id.to_bits(), (67890u64 << 32) | 12345);
    }

    #[test]
    fn test_null() {
        assert!(Entity::default().is_null());
        assert!(!Entity::new(0, 0).is_null());
    }

    #[test]
    fn test_stale_id_does_not_resolve_after_reuse() {
        let mut index = EntityIndex::default();
        let a = index.allocate(at(0));
        assert_eq!(index.free(a), Some(at(0)));
        let b = index.allocate(at(3));

        assert_eq!(a.index(), b.index());
        assert_ne!(a, b);
        assert_eq!(index.get(a), None);
        assert_eq!(index.get(b), Some(at(3)));
        assert_eq!(index.free(a), None);
        assert_eq!(index.len(), 1);
    }

    #[test]
    fn test_set_moves_live_ids_only() {
        let mut index = EntityIndex::default();
        let a = index.allocate(at(5));
        index.set(a, at(1));
        assert_eq!(index.get(a), Some(at(1)));

        index.free(a);
        index.set(a, at(2));
        assert_eq!(index.iter().count(), 0);
    }
}
