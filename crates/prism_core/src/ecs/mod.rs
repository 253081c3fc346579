//! # Entity Component Store
//!
//! Archetype-based columnar storage.
//!
//! ## Design Philosophy
//!
//! - One table per distinct component set
//! - Typed components live in flat fixed-stride byte columns
//! - Entity ids are slot indices with generation counters
//! - Swap-remove deletion, with the moved row's id re-pointed

mod archetype;
mod component;
mod entity;
mod record;
mod storage;
mod store;

pub use archetype::{ArchetypeSignature, Table, TableId};
pub use component::{ComponentDef, ComponentId, ComponentKind, ComponentValue, ObjectValue};
pub use entity::{Entity, EntityLocation};
pub use record::{Patch, Record};
pub use storage::{Column, ObjectColumn, TypedColumn, MAX_COLUMN_BYTES, MAX_GROWTH_FACTOR};
pub use store::{ArchetypeDef, ArchetypeId, Store, Tables};
