//! Sparse component records used for insert, update and read.

use std::any::Any;
use std::sync::Arc;

use crate::schema::Value;

use super::component::{ComponentValue, ObjectValue};

/// Named component values, in insertion order.
///
/// Used as the full record passed to `Store::insert`, as the sparse
/// [`Patch`] passed to `Store::update`, and as the snapshot returned by
/// `Store::read`. Setting a name twice keeps the last value.
#[derive(Clone, Debug, Default, PartialEq)]
pub struct Record {
    values: Vec<(String, ComponentValue)>,
}

/// Sparse `(component, value)` set applied by `Store::update`.
pub type Patch = Record;

impl Record {
    /// Empty record.
    #[must_use]
    pub fn new() -> Self {
        Self::default()
    }

    /// Sets a typed component.
    #[must_use]
    pub fn with(self, component: impl Into<String>, value: impl Into<Value>) -> Self {
        self.with_value(component, ComponentValue::Data(value.into()))
    }

    /// Sets an object component.
    #[must_use]
    pub fn with_object<T: Any + Send + Sync>(self, component: impl Into<String>, object: Arc<T>) -> Self {
        let object: ObjectValue = object;
        self.with_value(component, ComponentValue::Object(object))
    }

    /// Sets any component value.
    #[must_use]
    pub fn with_value(mut self, component: impl Into<String>, value: ComponentValue) -> Self {
        self.set(component, value);
        self
    }

    /// Sets a component value in place.
    pub fn set(&mut self, component: impl Into<String>, value: ComponentValue) {
        let component = component.into();
        match self.values.iter_mut().find(|(n, _)| *n == component) {
            Some((_, slot)) => *slot = value,
            None => self.values.push((component, value)),
        }
    }

    /// Value of a component.
    #[must_use]
    pub fn get(&self, component: &str) -> Option<&ComponentValue> {
        self.values
            .iter()
            .find(|(n, _)| n == component)
            .map(|(_, v)| v)
    }

    /// Flat value of a typed component.
    #[must_use]
    pub fn data(&self, component: &str) -> Option<&Value> {
        self.get(component).and_then(ComponentValue::as_data)
    }

    /// Object of an object component, downcast to `T`.
    #[must_use]
    pub fn object<T: Any + Send + Sync>(&self, component: &str) -> Option<Arc<T>> {
        self.get(component).and_then(ComponentValue::downcast::<T>)
    }

    /// Component names and values in insertion order.
    pub fn iter(&self) -> impl Iterator<Item = (&str, &ComponentValue)> {
        self.values.iter().map(|(n, v)| (n.as_str(), v))
    }

    /// Number of components set.
    #[must_use]
    pub fn len(&self) -> usize {
        self.values.len()
    }

    /// Checks if nothing is set.
    #[must_use]
    pub fn is_empty(&self) -> bool {
        self.values.is_empty()
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_last_write_wins() {
        let record = Record::new()
            .with("position", [1.0f32, 2.0, 3.0])
            .with("position", [4.0f32, 5.0, 6.0]);
        assert_eq!(record.len(), 1);
        assert_eq!(record.data("position"), Some(&Value::from([4.0f32, 5.0, 6.0])));
    }

    #[test]
    fn test_object_roundtrip() {
        let record = Record::new().with_object("name", Arc::new(String::from("axis")));
        assert_eq!(record.object::<String>("name").as_deref().map(String::as_str), Some("axis"));
        assert!(record.data("name").is_none());
    }
}
