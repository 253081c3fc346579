//! # Archetype Tables
//!
//! Entities with the same component set are stored together:
//!
//! ```text
//! Table {position, color}:
//! entities: [E0, E1, E2]
//! position: [P0, P1, P2]   <- TypedColumn, one flat buffer
//! color:    [C0, C1, C2]   <- TypedColumn, one flat buffer
//! ```
//!
//! Every column always has exactly as many rows as the entity column.
//! Deletion is a swap-remove across all columns at once.

use std::fmt;

use crate::error::{StoreError, StoreResult};

use super::component::{ComponentId, ComponentValue};
use super::entity::Entity;
use super::storage::{Column, ObjectColumn, TypedColumn};

/// Sorted, de-duplicated component set identifying a table.
#[derive(Clone, Debug, PartialEq, Eq, Hash)]
pub struct ArchetypeSignature {
    components: Vec<ComponentId>,
}

impl ArchetypeSignature {
    /// Creates a signature from component ids in any order.
    #[must_use]
    pub fn new(mut components: Vec<ComponentId>) -> Self {
        components.sort_unstable();
        components.dedup();
        Self { components }
    }

    /// Component ids in ascending order.
    #[must_use]
    pub fn components(&self) -> &[ComponentId] {
        &self.components
    }

    /// Checks if this signature contains `component`.
    #[must_use]
    pub fn contains(&self, component: ComponentId) -> bool {
        self.components.binary_search(&component).is_ok()
    }

    /// Checks if every component of `other` is in this signature.
    #[must_use]
    pub fn is_superset_of(&self, other: &Self) -> bool {
        other.components.iter().all(|c| self.contains(*c))
    }

    /// Returns the number of component types.
    #[must_use]
    pub fn len(&self) -> usize {
        self.components.len()
    }

    /// Checks if empty.
    #[must_use]
    pub fn is_empty(&self) -> bool {
        self.components.is_empty()
    }
}

/// Index of a table in the store, in creation order.
#[derive(Clone, Copy, Debug, PartialEq, Eq, Hash, PartialOrd, Ord)]
pub struct TableId(u32);

impl TableId {
    pub(crate) const fn new(index: u32) -> Self {
        Self(index)
    }

    /// Raw index.
    #[inline]
    #[must_use]
    pub const fn index(self) -> usize {
        self.0 as usize
    }
}

impl fmt::Display for TableId {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "table#{}", self.0)
    }
}

/// Columnar storage for one archetype.
#[derive(Debug)]
pub struct Table {
    id: TableId,
    name: String,
    signature: ArchetypeSignature,
    /// Parallel to `signature.components()`.
    names: Vec<String>,
    columns: Vec<Column>,
    entities: Vec<Entity>,
}

impl Table {
    /// Creates an empty table. `columns` pairs each component (in signature
    /// order) with its name and empty column.
    pub(crate) fn new(
        id: TableId,
        name: String,
        signature: ArchetypeSignature,
        columns: Vec<(String, Column)>,
    ) -> Self {
        let (names, columns) = columns.into_iter().unzip();
        Self {
            id,
            name,
            signature,
            names,
            columns,
            entities: Vec::new(),
        }
    }

    /// Table id.
    #[must_use]
    pub const fn id(&self) -> TableId {
        self.id
    }

    /// Name of the first archetype registered for this component set.
    #[must_use]
    pub fn name(&self) -> &str {
        &self.name
    }

    /// Component set.
    #[must_use]
    pub const fn signature(&self) -> &ArchetypeSignature {
        &self.signature
    }

    /// Row count.
    #[inline]
    #[must_use]
    pub fn len(&self) -> usize {
        self.entities.len()
    }

    /// Checks if the table has no rows.
    #[inline]
    #[must_use]
    pub fn is_empty(&self) -> bool {
        self.entities.is_empty()
    }

    /// Entity id of every row, in row order.
    #[must_use]
    pub fn entities(&self) -> &[Entity] {
        &self.entities
    }

    /// Component names in signature order.
    pub fn component_names(&self) -> impl Iterator<Item = &str> {
        self.names.iter().map(String::as_str)
    }

    /// Column position of a component.
    #[must_use]
    pub fn column_index(&self, component: ComponentId) -> Option<usize> {
        self.signature.components.binary_search(&component).ok()
    }

    /// Column of a component by name.
    #[must_use]
    pub fn column(&self, name: &str) -> Option<&Column> {
        let i = self.names.iter().position(|n| n == name)?;
        self.columns.get(i)
    }

    /// Typed column of a component by name.
    #[must_use]
    pub fn typed_column(&self, name: &str) -> Option<&TypedColumn> {
        self.column(name).and_then(Column::as_typed)
    }

    /// Object column of a component by name.
    #[must_use]
    pub fn object_column(&self, name: &str) -> Option<&ObjectColumn> {
        self.column(name).and_then(Column::as_object)
    }

    /// Columns in signature order.
    #[must_use]
    pub fn columns(&self) -> &[Column] {
        &self.columns
    }

    /// Appends one row. `values` is in signature order and already validated.
    pub(crate) fn push_row(&mut self, entity: Entity, values: &[ComponentValue]) -> StoreResult<usize> {
        debug_assert_eq!(values.len(), self.columns.len());
        // every column must have room before any of them takes the row
        for column in &mut self.columns {
            column.reserve_row()?;
        }
        for (column, value) in self.columns.iter_mut().zip(values) {
            column.push(value)?;
        }
        self.entities.push(entity);
        Ok(self.entities.len() - 1)
    }

    /// Overwrites one cell.
    pub(crate) fn write(&mut self, row: usize, column: usize, value: &ComponentValue) -> StoreResult<()> {
        let len = self.columns.len();
        self.columns
            .get_mut(column)
            .ok_or(StoreError::RowOutOfBounds { row: column, len })?
            .set(row, value)
    }

    /// Reads one cell.
    pub(crate) fn read(&self, row: usize, column: usize) -> StoreResult<ComponentValue> {
        let len = self.columns.len();
        self.columns
            .get(column)
            .ok_or(StoreError::RowOutOfBounds { row: column, len })?
            .get(row)
    }

    /// Swap-removes `row` from every column.
    ///
    /// Returns the entity that now occupies `row`, if the removed row was not last.
    pub(crate) fn swap_remove(&mut self, row: usize) -> StoreResult<Option<Entity>> {
        if row >= self.entities.len() {
            return Err(StoreError::RowOutOfBounds {
                row,
                len: self.entities.len(),
            });
        }
        for column in &mut self.columns {
            column.swap_remove(row)?;
        }
        self.entities.swap_remove(row);
        Ok(self.entities.get(row).copied())
    }

    /// Checks that every column has exactly one row per entity.
    #[must_use]
    pub fn check_invariants(&self) -> bool {
        self.columns.iter().all(|c| c.len() == self.entities.len())
    }
}

#[cfg(test)]
mod tests {
    use std::sync::Arc;

    use super::*;
    use crate::schema::{FieldType, LayoutRules, Schema, Value};

    fn ids(raw: &[u32]) -> Vec<ComponentId> {
        let mut registry = crate::ecs::component::ComponentRegistry::default();
        let schema = Schema::value("f", LayoutRules::Packed, FieldType::vec3f()).unwrap();
        let all: Vec<_> = (0..4)
            .map(|i| {
                registry
                    .register(crate::ecs::ComponentDef::typed(format!("c{i}"), Arc::clone(&schema)))
                    .unwrap()
            })
            .collect();
        raw.iter().map(|i| all[*i as usize]).collect()
    }

    fn table() -> Table {
        let schema = Schema::value("vec3", LayoutRules::Packed, FieldType::vec3f()).unwrap();
        Table::new(
            TableId::new(0),
            "Point".into(),
            ArchetypeSignature::new(ids(&[0])),
            vec![("position".into(), Column::Typed(TypedColumn::new(schema)))],
        )
    }

    #[test]
    fn test_signature_is_order_independent() {
        assert_eq!(
            ArchetypeSignature::new(ids(&[2, 0, 1, 0])),
            ArchetypeSignature::new(ids(&[0, 1, 2]))
        );
    }

    #[test]
    fn test_superset() {
        let big = ArchetypeSignature::new(ids(&[0, 1, 2]));
        assert!(big.is_superset_of(&ArchetypeSignature::new(ids(&[2, 0]))));
        assert!(big.is_superset_of(&ArchetypeSignature::new(Vec::new())));
        assert!(!big.is_superset_of(&ArchetypeSignature::new(ids(&[3]))));
    }

    #[test]
    fn test_swap_remove_reports_moved_entity() {
        let mut table = table();
        for i in 0..3u32 {
            let v = ComponentValue::Data(Value::from([i as f32; 3]));
            table.push_row(Entity::new(i, 0), &[v]).unwrap();
        }

        assert_eq!(table.swap_remove(0).unwrap(), Some(Entity::new(2, 0)));
        assert_eq!(table.entities(), &[Entity::new(2, 0), Entity::new(1, 0)]);
        assert_eq!(table.swap_remove(1).unwrap(), None);
        assert!(table.check_invariants());
        assert!(table.swap_remove(4).is_err());
    }

    #[test]
    fn test_column_lookup_by_name() {
        let table = table();
        assert!(table.typed_column("position").is_some());
        assert!(table.object_column("position").is_none());
        assert!(table.column("color").is_none());
    }
}
