//! # Resource Registry
//!
//! Singleton values keyed by their Rust type: the device handle, the active
//! viewport, lighting parameters, derived buffers. One instance lives inside
//! each [`Store`](crate::Store).
//!
//! A missing resource is a normal state (the device may not be up yet), so
//! every accessor returns `Option` and consumers skip their work on `None`.

use std::any::{type_name, Any, TypeId};
use std::collections::HashMap;
use std::fmt;

/// Blanket trait for anything that can be stored as a resource.
pub trait Resource: Any + Send + Sync {}

impl<T> Resource for T where T: Any + Send + Sync {}

struct Entry {
    name: &'static str,
    value: Box<dyn Any + Send + Sync>,
}

/// Type-keyed singleton map.
#[derive(Default)]
pub struct Resources {
    storage: HashMap<TypeId, Entry>,
}

impl Resources {
    /// Returns `true` if type `T` exists in the store.
    #[must_use]
    pub fn contains<T: Resource>(&self) -> bool {
        self.storage.contains_key(&TypeId::of::<T>())
    }

    /// Inserts `value`, returning the previous value of the same type.
    pub fn insert<T: Resource>(&mut self, value: T) -> Option<T> {
        let previous = self.storage.insert(
            TypeId::of::<T>(),
            Entry {
                name: type_name::<T>(),
                value: Box::new(value),
            },
        );
        previous.and_then(|e| e.value.downcast::<T>().ok()).map(|b| *b)
    }

    /// Removes the type `T` from this store if it exists.
    pub fn remove<T: Resource>(&mut self) -> Option<T> {
        self.storage
            .remove(&TypeId::of::<T>())
            .and_then(|e| e.value.downcast::<T>().ok())
            .map(|b| *b)
    }

    /// Shared reference to the `T` resource, if present.
    #[must_use]
    pub fn get<T: Resource>(&self) -> Option<&T> {
        self.storage
            .get(&TypeId::of::<T>())
            .and_then(|e| e.value.downcast_ref::<T>())
    }

    /// Mutable reference to the `T` resource, if present.
    pub fn get_mut<T: Resource>(&mut self) -> Option<&mut T> {
        self.storage
            .get_mut(&TypeId::of::<T>())
            .and_then(|e| e.value.downcast_mut::<T>())
    }

    /// Returns the `T` resource, inserting `f()` first if it is absent.
    pub fn get_mut_or_insert_with<T: Resource, F: FnOnce() -> T>(&mut self, f: F) -> Option<&mut T> {
        self.storage
            .entry(TypeId::of::<T>())
            .or_insert_with(|| Entry {
                name: type_name::<T>(),
                value: Box::new(f()),
            })
            .value
            .downcast_mut::<T>()
    }

    /// Number of stored resources.
    #[must_use]
    pub fn len(&self) -> usize {
        self.storage.len()
    }

    /// Checks if no resource is stored.
    #[must_use]
    pub fn is_empty(&self) -> bool {
        self.storage.is_empty()
    }
}

impl fmt::Debug for Resources {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_set()
            .entries(self.storage.values().map(|e| e.name))
            .finish()
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[derive(Debug, PartialEq)]
    struct Ambient(f32);

    #[test]
    fn test_simple_read_write() {
        let mut resources = Resources::default();
        assert!(resources.get::<Ambient>().is_none());

        assert_eq!(resources.insert(Ambient(0.1)), None);
        assert_eq!(resources.insert(Ambient(0.2)), Some(Ambient(0.1)));
        resources.get_mut::<Ambient>().unwrap().0 = 0.3;
        assert_eq!(resources.get::<Ambient>(), Some(&Ambient(0.3)));

        assert_eq!(resources.remove::<Ambient>(), Some(Ambient(0.3)));
        assert!(!resources.contains::<Ambient>());
    }

    #[test]
    fn test_types_are_distinct_keys() {
        let mut resources = Resources::default();
        resources.insert(1u32);
        resources.insert(2u64);
        assert_eq!(resources.get::<u32>(), Some(&1));
        assert_eq!(resources.get::<u64>(), Some(&2));
        assert_eq!(resources.len(), 2);
    }

    #[test]
    fn test_get_mut_or_insert_with() {
        let mut resources = Resources::default();
        *resources.get_mut_or_insert_with(Vec::<u8>::new).unwrap() = vec![1];
        resources.get_mut_or_insert_with(Vec::<u8>::new).unwrap().push(2);
        assert_eq!(resources.get::<Vec<u8>>(), Some(&vec![1, 2]));
    }
}
