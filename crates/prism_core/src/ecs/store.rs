//! # Store
//!
//! The central container: component registry, archetype tables, the entity
//! index and the resource registry.
//!
//! ```text
//! Store
//! ├── components: name -> ComponentDef
//! ├── archetypes: name -> component set -> TableId
//! ├── tables:     [Table; n]   (one per distinct component set)
//! ├── entities:   Entity -> (TableId, row)
//! └── resources:  type -> singleton
//! ```
//!
//! Every mutation validates its whole input before the first byte is written,
//! so a rejected insert or update leaves the store untouched.

use std::any::Any;
use std::collections::HashMap;
use std::sync::Arc;

use crate::config::StoreConfig;
use crate::error::{StoreError, StoreResult};
use crate::resources::Resources;

use super::archetype::{ArchetypeSignature, Table, TableId};
use super::component::{ComponentDef, ComponentId, ComponentKind, ComponentRegistry, ComponentValue};
use super::entity::{Entity, EntityIndex, EntityLocation};
use super::record::{Patch, Record};
use super::storage::{Column, ObjectColumn, TypedColumn};

/// Handle of a registered archetype.
#[derive(Clone, Copy, Debug, PartialEq, Eq, Hash)]
pub struct ArchetypeId(u32);

impl ArchetypeId {
    /// Raw index.
    #[inline]
    #[must_use]
    pub const fn index(self) -> usize {
        self.0 as usize
    }
}

/// A named component set and the table that stores it.
#[derive(Clone, Debug)]
pub struct ArchetypeDef {
    /// Archetype name.
    pub name: String,
    /// Components in declaration order.
    pub components: Vec<ComponentId>,
    /// Sorted component set.
    pub signature: ArchetypeSignature,
    /// Backing table, shared by archetypes with equal component sets.
    pub table: TableId,
}

/// Lazy iterator over the tables matching a component set.
///
/// Clone it to restart; iterating has no effect on the tables.
#[derive(Clone, Debug)]
pub struct Tables<'a> {
    tables: std::slice::Iter<'a, Table>,
    /// `None` when the query named an unknown component.
    required: Option<ArchetypeSignature>,
}

impl<'a> Iterator for Tables<'a> {
    type Item = &'a Table;

    fn next(&mut self) -> Option<Self::Item> {
        let required = self.required.as_ref()?;
        self.tables
            .by_ref()
            .find(|table| table.signature().is_superset_of(required))
    }
}

/// Entity-component store.
#[derive(Debug)]
pub struct Store {
    config: StoreConfig,
    components: ComponentRegistry,
    archetypes: Vec<ArchetypeDef>,
    archetype_names: HashMap<String, ArchetypeId>,
    tables: Vec<Table>,
    table_index: HashMap<ArchetypeSignature, TableId>,
    entities: EntityIndex,
    resources: Resources,
}

impl Default for Store {
    fn default() -> Self {
        Self::new(StoreConfig::default())
    }
}

impl Store {
    /// Creates an empty store.
    #[must_use]
    pub fn new(config: StoreConfig) -> Self {
        Self {
            config,
            components: ComponentRegistry::default(),
            archetypes: Vec::new(),
            archetype_names: HashMap::new(),
            tables: Vec::new(),
            table_index: HashMap::new(),
            entities: EntityIndex::default(),
            resources: Resources::default(),
        }
    }

    /// Sizing policy applied to new tables.
    #[must_use]
    pub const fn config(&self) -> &StoreConfig {
        &self.config
    }

    // =========================================================================
    // Registration
    // =========================================================================

    /// Registers a component.
    ///
    /// # Errors
    ///
    /// Returns [`StoreError::DuplicateComponent`] for a repeated name, or an
    /// error if the default value does not fit the component.
    pub fn register_component(&mut self, def: ComponentDef) -> StoreResult<ComponentId> {
        let name = def.name.clone();
        let id = self.components.register(def)?;
        tracing::debug!(component = %name, "registered component");
        Ok(id)
    }

    /// Id of a registered component.
    ///
    /// # Errors
    ///
    /// Returns [`StoreError::UnknownComponent`].
    pub fn component_id(&self, name: &str) -> StoreResult<ComponentId> {
        self.components.id(name)
    }

    /// Definition of a registered component.
    #[must_use]
    pub fn component(&self, name: &str) -> Option<&ComponentDef> {
        self.components.id(name).ok().map(|id| self.components.get(id))
    }

    /// Registers an archetype over previously registered components.
    ///
    /// Archetypes with equal component sets share one table.
    ///
    /// # Errors
    ///
    /// Returns [`StoreError::EmptyArchetype`], [`StoreError::DuplicateArchetype`]
    /// or [`StoreError::UnknownComponent`].
    pub fn register_archetype(&mut self, name: &str, components: &[&str]) -> StoreResult<ArchetypeId> {
        if components.is_empty() {
            return Err(StoreError::EmptyArchetype(name.to_owned()));
        }
        if self.archetype_names.contains_key(name) {
            return Err(StoreError::DuplicateArchetype(name.to_owned()));
        }
        let mut declared = Vec::with_capacity(components.len());
        for component in components {
            let id = self.components.id(component)?;
            if !declared.contains(&id) {
                declared.push(id);
            }
        }
        let signature = ArchetypeSignature::new(declared.clone());

        let table = match self.table_index.get(&signature) {
            Some(table) => *table,
            None => self.create_table(name, &signature),
        };

        #[allow(clippy::cast_possible_truncation)]
        let id = ArchetypeId(self.archetypes.len() as u32);
        self.archetypes.push(ArchetypeDef {
            name: name.to_owned(),
            components: declared,
            signature,
            table,
        });
        self.archetype_names.insert(name.to_owned(), id);
        tracing::debug!(archetype = name, %table, "registered archetype");
        Ok(id)
    }

    fn create_table(&mut self, name: &str, signature: &ArchetypeSignature) -> TableId {
        #[allow(clippy::cast_possible_truncation)]
        let id = TableId::new(self.tables.len() as u32);
        let columns = signature
            .components()
            .iter()
            .map(|c| {
                let def = self.components.get(*c);
                let column = match &def.kind {
                    ComponentKind::Typed(schema) => Column::Typed(TypedColumn::with_capacity(
                        Arc::clone(schema),
                        self.config.initial_capacity,
                        self.config.growth_factor,
                    )),
                    ComponentKind::Object => Column::Object(ObjectColumn::new()),
                };
                (def.name.clone(), column)
            })
            .collect();
        self.tables
            .push(Table::new(id, name.to_owned(), signature.clone(), columns));
        self.table_index.insert(signature.clone(), id);
        id
    }

    /// Archetype id by name.
    #[must_use]
    pub fn archetype(&self, name: &str) -> Option<ArchetypeId> {
        self.archetype_names.get(name).copied()
    }

    /// Archetype definition.
    #[must_use]
    pub fn archetype_def(&self, id: ArchetypeId) -> Option<&ArchetypeDef> {
        self.archetypes.get(id.index())
    }

    // =========================================================================
    // Mutation
    // =========================================================================

    /// Inserts one entity into an archetype.
    ///
    /// Components missing from `record` take their registered default.
    ///
    /// # Errors
    ///
    /// - [`StoreError::UnknownArchetype`]
    /// - [`StoreError::ComponentNotInArchetype`] if `record` names a foreign component
    /// - [`StoreError::MissingComponent`] if a component without default is absent
    /// - a kind or layout error if a value does not fit its component
    pub fn insert(&mut self, archetype: ArchetypeId, record: Record) -> StoreResult<Entity> {
        let def = self
            .archetypes
            .get(archetype.index())
            .ok_or(StoreError::UnknownArchetype(archetype.0))?;

        for (name, _) in record.iter() {
            let id = self.components.id(name)?;
            if !def.signature.contains(id) {
                return Err(StoreError::ComponentNotInArchetype {
                    archetype: def.name.clone(),
                    component: name.to_owned(),
                });
            }
        }

        let mut values = Vec::with_capacity(def.signature.len());
        for component in def.signature.components() {
            let cdef = self.components.get(*component);
            let value = match record.get(&cdef.name).or(cdef.default.as_ref()) {
                Some(value) => value,
                None => {
                    return Err(StoreError::MissingComponent {
                        archetype: def.name.clone(),
                        component: cdef.name.clone(),
                    })
                }
            };
            cdef.check(value)?;
            values.push(value.clone());
        }

        let table_id = def.table;
        let table = &mut self.tables[table_id.index()];
        let location = EntityLocation {
            table: table_id,
            row: table.len(),
        };
        let entity = self.entities.allocate(location);
        if let Err(e) = table.push_row(entity, &values) {
            self.entities.free(entity);
            return Err(e);
        }
        tracing::trace!(%entity, table = %table_id, row = location.row, "inserted entity");
        Ok(entity)
    }

    /// Writes the components named in `patch` into the entity's row.
    ///
    /// The whole patch is validated first; nothing is written if any entry is
    /// rejected. Components outside the entity's archetype are rejected rather
    /// than migrating the entity to another table.
    ///
    /// # Errors
    ///
    /// - [`StoreError::EntityNotFound`]
    /// - [`StoreError::ComponentNotInArchetype`]
    /// - a kind or layout error if a value does not fit its component
    pub fn update(&mut self, entity: Entity, patch: Patch) -> StoreResult<()> {
        let location = self
            .entities
            .get(entity)
            .ok_or(StoreError::EntityNotFound(entity))?;
        let table = &self.tables[location.table.index()];

        let mut writes = Vec::with_capacity(patch.len());
        for (name, value) in patch.iter() {
            let id = self.components.id(name)?;
            let column = table
                .column_index(id)
                .ok_or_else(|| StoreError::ComponentNotInArchetype {
                    archetype: table.name().to_owned(),
                    component: name.to_owned(),
                })?;
            self.components.get(id).check(value)?;
            writes.push((column, value));
        }

        let table = &mut self.tables[location.table.index()];
        for (column, value) in writes {
            table.write(location.row, column, value)?;
        }
        Ok(())
    }

    /// Snapshot of an entity's components in the archetype's declared order.
    ///
    /// Returns `None` if the entity is unknown or lives in a different table
    /// than `archetype`.
    #[must_use]
    pub fn read(&self, entity: Entity, archetype: ArchetypeId) -> Option<Record> {
        let location = self.entities.get(entity)?;
        let def = self.archetypes.get(archetype.index())?;
        if def.table != location.table {
            return None;
        }
        let table = &self.tables[location.table.index()];
        let mut record = Record::new();
        for component in &def.components {
            let column = table.column_index(*component)?;
            let value = table.read(location.row, column).ok()?;
            record.set(self.components.get(*component).name.clone(), value);
        }
        Some(record)
    }

    /// Removes an entity.
    ///
    /// The table's last row moves into the freed row and its entity is
    /// re-pointed; the removed id never resolves again.
    ///
    /// # Errors
    ///
    /// Returns [`StoreError::EntityNotFound`].
    pub fn delete(&mut self, entity: Entity) -> StoreResult<()> {
        let location = self
            .entities
            .get(entity)
            .ok_or(StoreError::EntityNotFound(entity))?;
        let moved = self.tables[location.table.index()].swap_remove(location.row)?;
        if let Some(moved) = moved {
            self.entities.set(moved, location);
        }
        self.entities.free(entity);
        tracing::trace!(%entity, table = %location.table, row = location.row, "deleted entity");
        Ok(())
    }

    // =========================================================================
    // Lookup
    // =========================================================================

    /// One component of an entity.
    ///
    /// # Errors
    ///
    /// [`StoreError::EntityNotFound`], [`StoreError::UnknownComponent`] or
    /// [`StoreError::ComponentNotInArchetype`].
    pub fn get(&self, entity: Entity, component: &str) -> StoreResult<ComponentValue> {
        let location = self
            .entities
            .get(entity)
            .ok_or(StoreError::EntityNotFound(entity))?;
        let id = self.components.id(component)?;
        let table = &self.tables[location.table.index()];
        let column = table
            .column_index(id)
            .ok_or_else(|| StoreError::ComponentNotInArchetype {
                archetype: table.name().to_owned(),
                component: component.to_owned(),
            })?;
        table.read(location.row, column)
    }

    /// An object component of an entity, downcast to `T`.
    #[must_use]
    pub fn get_object<T: Any + Send + Sync>(&self, entity: Entity, component: &str) -> Option<Arc<T>> {
        self.get(entity, component).ok()?.downcast::<T>()
    }

    /// Checks if `entity` is live.
    #[must_use]
    pub fn contains(&self, entity: Entity) -> bool {
        self.entities.get(entity).is_some()
    }

    /// Current table and row of a live entity.
    #[must_use]
    pub fn location(&self, entity: Entity) -> Option<EntityLocation> {
        self.entities.get(entity)
    }

    /// Number of live entities.
    #[must_use]
    pub fn len(&self) -> usize {
        self.entities.len()
    }

    /// Checks if no entity is live.
    #[must_use]
    pub fn is_empty(&self) -> bool {
        self.entities.len() == 0
    }

    /// Every table whose component set contains all of `components`, in
    /// creation order.
    ///
    /// An unknown component name matches no table.
    #[must_use]
    pub fn query_archetypes(&self, components: &[&str]) -> Tables<'_> {
        let required = components
            .iter()
            .map(|c| self.components.id(c).ok())
            .collect::<Option<Vec<_>>>()
            .map(ArchetypeSignature::new);
        Tables {
            tables: self.tables.iter(),
            required,
        }
    }

    /// Table by id.
    #[must_use]
    pub fn table(&self, id: TableId) -> Option<&Table> {
        self.tables.get(id.index())
    }

    /// Table backing an archetype.
    #[must_use]
    pub fn archetype_table(&self, archetype: ArchetypeId) -> Option<&Table> {
        let def = self.archetypes.get(archetype.index())?;
        self.tables.get(def.table.index())
    }

    /// All tables in creation order.
    #[must_use]
    pub fn tables(&self) -> &[Table] {
        &self.tables
    }

    /// Singleton resources.
    #[must_use]
    pub const fn resources(&self) -> &Resources {
        &self.resources
    }

    /// Singleton resources, mutably.
    pub fn resources_mut(&mut self) -> &mut Resources {
        &mut self.resources
    }

    /// Checks the row invariant of every table and that the entity index
    /// agrees with every table's entity column.
    #[must_use]
    pub fn check_invariants(&self) -> bool {
        if !self.tables.iter().all(Table::check_invariants) {
            return false;
        }
        let rows: usize = self.tables.iter().map(Table::len).sum();
        if rows != self.entities.len() {
            return false;
        }
        self.entities.iter().all(|(entity, location)| {
            self.tables
                .get(location.table.index())
                .and_then(|t| t.entities().get(location.row))
                == Some(&entity)
        })
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::schema::{FieldType, LayoutRules, Schema, Value};

    fn store() -> (Store, ArchetypeId) {
        let mut store = Store::default();
        let vec3 = Schema::value("vec3", LayoutRules::Packed, FieldType::vec3f()).unwrap();
        let vec4 = Schema::value("vec4", LayoutRules::Packed, FieldType::vec4f()).unwrap();
        store.register_component(ComponentDef::typed("position", vec3)).unwrap();
        store
            .register_component(
                ComponentDef::typed("color", vec4).with_default(Value::from([1.0f32, 1.0, 1.0, 1.0])),
            )
            .unwrap();
        store.register_component(ComponentDef::object("tag")).unwrap();
        let particle = store.register_archetype("Particle", &["position", "color"]).unwrap();
        (store, particle)
    }

    #[test]
    fn test_insert_uses_defaults() {
        let (mut store, particle) = store();
        let e = store
            .insert(particle, Record::new().with("position", [1.0f32, 2.0, 3.0]))
            .unwrap();
        let record = store.read(e, particle).unwrap();
        assert_eq!(record.data("color"), Some(&Value::from([1.0f32; 4])));
        assert_eq!(record.iter().map(|(n, _)| n).collect::<Vec<_>>(), vec!["position", "color"]);
    }

    #[test]
    fn test_unvalidated_growth_factor_still_inserts() {
        let mut store = Store::new(StoreConfig {
            initial_capacity: 16,
            growth_factor: 1 << 62,
        });
        let vec3 = Schema::value("vec3", LayoutRules::Packed, FieldType::vec3f()).unwrap();
        store.register_component(ComponentDef::typed("position", vec3)).unwrap();
        let point = store.register_archetype("Point", &["position"]).unwrap();

        let mut last = None;
        for i in 0..17u8 {
            let record = Record::new().with("position", [f32::from(i); 3]);
            last = Some(store.insert(point, record).unwrap());
        }
        assert_eq!(store.len(), 17);
        assert!(store.check_invariants());
        let record = store.read(last.unwrap(), point).unwrap();
        assert_eq!(record.data("position"), Some(&Value::from([16.0f32; 3])));
    }

    #[test]
    fn test_insert_missing_required() {
        let (mut store, particle) = store();
        let err = store.insert(particle, Record::new()).unwrap_err();
        assert!(matches!(err, StoreError::MissingComponent { ref component, .. } if component == "position"));
        assert!(store.is_empty());
        assert!(store.check_invariants());
    }

    #[test]
    fn test_insert_rejects_foreign_component() {
        let (mut store, particle) = store();
        let record = Record::new()
            .with("position", [0.0f32; 3])
            .with_object("tag", Arc::new(1u8));
        assert!(matches!(
            store.insert(particle, record),
            Err(StoreError::ComponentNotInArchetype { .. })
        ));
    }

    #[test]
    fn test_update_is_atomic() {
        let (mut store, particle) = store();
        let e = store.insert(particle, Record::new().with("position", [0.0f32; 3])).unwrap();
        let patch = Patch::new()
            .with("position", [5.0f32, 5.0, 5.0])
            .with("color", [1.0f32, 2.0]);
        assert!(store.update(e, patch).is_err());
        assert_eq!(
            store.get(e, "position").unwrap().as_data(),
            Some(&Value::from([0.0f32; 3]))
        );
    }

    #[test]
    fn test_update_rejects_cross_archetype() {
        let (mut store, particle) = store();
        let e = store.insert(particle, Record::new().with("position", [0.0f32; 3])).unwrap();
        let err = store
            .update(e, Patch::new().with_object("tag", Arc::new(0u8)))
            .unwrap_err();
        assert!(matches!(err, StoreError::ComponentNotInArchetype { .. }));
    }

    #[test]
    fn test_unknown_entity() {
        let (mut store, particle) = store();
        let e = store.insert(particle, Record::new().with("position", [0.0f32; 3])).unwrap();
        store.delete(e).unwrap();
        assert_eq!(store.delete(e), Err(StoreError::EntityNotFound(e)));
        assert_eq!(store.update(e, Patch::new()), Err(StoreError::EntityNotFound(e)));
        assert!(store.read(e, particle).is_none());
    }

    #[test]
    fn test_read_with_wrong_archetype_is_absent() {
        let (mut store, particle) = store();
        let tagged = store.register_archetype("Tagged", &["tag"]).unwrap();
        let e = store.insert(particle, Record::new().with("position", [0.0f32; 3])).unwrap();
        assert!(store.read(e, tagged).is_none());
    }

    #[test]
    fn test_equal_component_sets_share_a_table() {
        let (mut store, particle) = store();
        let alias = store.register_archetype("Point", &["color", "position"]).unwrap();
        assert_eq!(
            store.archetype_def(particle).unwrap().table,
            store.archetype_def(alias).unwrap().table
        );
        assert_eq!(store.tables().len(), 1);
    }

    #[test]
    fn test_registration_errors() {
        let (mut store, _) = store();
        assert_eq!(
            store.register_archetype("Particle", &["position"]),
            Err(StoreError::DuplicateArchetype("Particle".into()))
        );
        assert_eq!(
            store.register_archetype("Empty", &[]),
            Err(StoreError::EmptyArchetype("Empty".into()))
        );
        assert_eq!(
            store.register_archetype("Ghost", &["mass"]),
            Err(StoreError::UnknownComponent("mass".into()))
        );
    }

    #[test]
    fn test_query_unknown_component_matches_nothing() {
        let (store, _) = store();
        assert_eq!(store.query_archetypes(&["mass"]).count(), 0);
        assert_eq!(store.query_archetypes(&[]).count(), 1);
    }

    #[test]
    fn test_get_object() {
        let (mut store, _) = store();
        let tagged = store.register_archetype("Tagged", &["tag"]).unwrap();
        let e = store
            .insert(tagged, Record::new().with_object("tag", Arc::new(String::from("x"))))
            .unwrap();
        assert_eq!(store.get_object::<String>(e, "tag").as_deref().map(String::as_str), Some("x"));
        assert!(store.get_object::<u32>(e, "tag").is_none());
    }
}
