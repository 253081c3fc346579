//! # Component Definitions
//!
//! Components are registered once by name. A component is either:
//! - **Typed**: described by a [`Schema`] and stored as flat fixed-stride bytes
//! - **Object**: an opaque shared value (`Arc<dyn Any>`) such as a voxel volume,
//!   stored by reference

use std::any::Any;
use std::collections::HashMap;
use std::fmt;
use std::sync::Arc;

use crate::error::{StoreError, StoreResult};
use crate::schema::{Schema, Value};

/// Shared, type-erased value held by an object component.
pub type ObjectValue = Arc<dyn Any + Send + Sync>;

/// Dense id of a registered component.
#[derive(Clone, Copy, Debug, PartialEq, Eq, Hash, PartialOrd, Ord)]
pub struct ComponentId(u32);

impl ComponentId {
    /// Raw id.
    #[inline]
    #[must_use]
    pub const fn index(self) -> usize {
        self.0 as usize
    }
}

/// Storage kind of a component.
#[derive(Clone, Debug, PartialEq, Eq)]
pub enum ComponentKind {
    /// Flat records described by a schema.
    Typed(Arc<Schema>),
    /// Opaque shared objects.
    Object,
}

/// A component value: flat data or a shared object.
#[derive(Clone)]
pub enum ComponentValue {
    /// Value of a typed component.
    Data(Value),
    /// Value of an object component.
    Object(ObjectValue),
}

impl ComponentValue {
    /// The flat value, if this is one.
    #[must_use]
    pub const fn as_data(&self) -> Option<&Value> {
        match self {
            Self::Data(v) => Some(v),
            Self::Object(_) => None,
        }
    }

    /// The object downcast to `T`, if this is an object of that type.
    #[must_use]
    pub fn downcast<T: Any + Send + Sync>(&self) -> Option<Arc<T>> {
        match self {
            Self::Object(o) => Arc::clone(o).downcast::<T>().ok(),
            Self::Data(_) => None,
        }
    }
}

impl fmt::Debug for ComponentValue {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            Self::Data(v) => f.debug_tuple("Data").field(v).finish(),
            Self::Object(o) => write!(f, "Object({:p})", Arc::as_ptr(o)),
        }
    }
}

/// Objects compare by identity.
impl PartialEq for ComponentValue {
    fn eq(&self, other: &Self) -> bool {
        match (self, other) {
            (Self::Data(a), Self::Data(b)) => a == b,
            (Self::Object(a), Self::Object(b)) => Arc::ptr_eq(a, b),
            _ => false,
        }
    }
}

impl From<Value> for ComponentValue {
    fn from(v: Value) -> Self {
        Self::Data(v)
    }
}

impl From<ObjectValue> for ComponentValue {
    fn from(o: ObjectValue) -> Self {
        Self::Object(o)
    }
}

/// Registration record of one component.
#[derive(Clone, Debug)]
pub struct ComponentDef {
    /// Unique component name.
    pub name: String,
    /// Storage kind.
    pub kind: ComponentKind,
    /// Value used when an insert omits this component.
    pub default: Option<ComponentValue>,
}

impl ComponentDef {
    /// Flat component described by `schema`.
    #[must_use]
    pub fn typed(name: impl Into<String>, schema: Arc<Schema>) -> Self {
        Self {
            name: name.into(),
            kind: ComponentKind::Typed(schema),
            default: None,
        }
    }

    /// Opaque object component.
    #[must_use]
    pub fn object(name: impl Into<String>) -> Self {
        Self {
            name: name.into(),
            kind: ComponentKind::Object,
            default: None,
        }
    }

    /// Sets the value used when an insert omits this component.
    #[must_use]
    pub fn with_default(mut self, value: impl Into<ComponentValue>) -> Self {
        self.default = Some(value.into());
        self
    }

    /// Schema of a typed component.
    #[must_use]
    pub fn schema(&self) -> Option<&Arc<Schema>> {
        match &self.kind {
            ComponentKind::Typed(s) => Some(s),
            ComponentKind::Object => None,
        }
    }

    /// Checks that `value` can be stored in this component.
    ///
    /// # Errors
    ///
    /// Returns [`StoreError::KindMismatch`] for a value of the wrong kind and a
    /// layout error for flat data of the wrong shape.
    pub fn check(&self, value: &ComponentValue) -> StoreResult<()> {
        match (&self.kind, value) {
            (ComponentKind::Typed(schema), ComponentValue::Data(v)) => Ok(schema.check(v)?),
            (ComponentKind::Object, ComponentValue::Object(_)) => Ok(()),
            _ => Err(StoreError::KindMismatch(self.name.clone())),
        }
    }
}

/// Name-indexed component registry.
#[derive(Debug, Default)]
pub(crate) struct ComponentRegistry {
    defs: Vec<ComponentDef>,
    by_name: HashMap<String, ComponentId>,
}

impl ComponentRegistry {
    pub(crate) fn register(&mut self, def: ComponentDef) -> StoreResult<ComponentId> {
        if self.by_name.contains_key(&def.name) {
            return Err(StoreError::DuplicateComponent(def.name));
        }
        if let Some(default) = &def.default {
            def.check(default)?;
        }
        #[allow(clippy::cast_possible_truncation)]
        let id = ComponentId(self.defs.len() as u32);
        self.by_name.insert(def.name.clone(), id);
        self.defs.push(def);
        Ok(id)
    }

    pub(crate) fn id(&self, name: &str) -> StoreResult<ComponentId> {
        self.by_name
            .get(name)
            .copied()
            .ok_or_else(|| StoreError::UnknownComponent(name.to_owned()))
    }

    pub(crate) fn get(&self, id: ComponentId) -> &ComponentDef {
        &self.defs[id.index()]
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::schema::{FieldType, LayoutRules};

    fn vec3() -> Arc<Schema> {
        Schema::value("vec3", LayoutRules::Packed, FieldType::vec3f()).unwrap()
    }

    #[test]
    fn test_duplicate_name_is_rejected() {
        let mut registry = ComponentRegistry::default();
        registry.register(ComponentDef::typed("position", vec3())).unwrap();
        let err = registry.register(ComponentDef::object("position")).unwrap_err();
        assert_eq!(err, StoreError::DuplicateComponent("position".into()));
    }

    #[test]
    fn test_default_must_match_schema() {
        let mut registry = ComponentRegistry::default();
        let bad = ComponentDef::typed("position", vec3()).with_default(Value::from(1.0f32));
        assert!(matches!(registry.register(bad), Err(StoreError::Layout(_))));
    }

    #[test]
    fn test_kind_mismatch() {
        let def = ComponentDef::object("voxels");
        let err = def.check(&Value::from([0.0f32; 3]).into()).unwrap_err();
        assert_eq!(err, StoreError::KindMismatch("voxels".into()));
    }

    #[test]
    fn test_object_values_compare_by_identity() {
        let a: ObjectValue = Arc::new(7u32);
        let b: ObjectValue = Arc::new(7u32);
        assert_eq!(ComponentValue::from(Arc::clone(&a)), ComponentValue::from(a.clone()));
        assert_ne!(ComponentValue::from(a), ComponentValue::from(b));
    }

    #[test]
    fn test_downcast() {
        let value = ComponentValue::from(Arc::new(String::from("volume")) as ObjectValue);
        assert_eq!(value.downcast::<String>().as_deref().map(String::as_str), Some("volume"));
        assert!(value.downcast::<u32>().is_none());
    }
}
