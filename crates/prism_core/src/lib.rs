//! # PRISM Core Store
//!
//! Columnar entity-component store backing the PRISM renderer:
//! - Every component type is described by an immutable [`Schema`] with a
//!   fixed byte [`Layout`]
//! - Entities with the same component set share one archetype [`Table`]
//! - Each component lives in a flat, fixed-stride [`TypedColumn`], ready for
//!   bulk copy into GPU buffers
//! - A phased [`Scheduler`] runs systems against the [`Store`] once per frame
//!
//! ## Architecture Rules
//!
//! 1. **No per-field boxing** - typed component data is encoded into flat bytes
//! 2. **Stable identity** - an [`Entity`] survives swap-removes of other rows
//! 3. **Explicit change detection** - [`ChangeToken`]s, never timestamps
//! 4. **Absence is not an error** - missing resources mean "skip this frame"
//!
//! ## Example
//!
//! ```rust
//! use prism_core::{ComponentDef, FieldType, LayoutRules, Record, Schema, ScalarType, Store};
//!
//! let mut store = Store::default();
//! let vec3 = Schema::value("vec3", LayoutRules::Packed, FieldType::vector(ScalarType::F32, 3)).unwrap();
//! store.register_component(ComponentDef::typed("position", vec3)).unwrap();
//! let points = store.register_archetype("Point", &["position"]).unwrap();
//!
//! let id = store.insert(points, Record::new().with("position", [1.0f32, 2.0, 3.0])).unwrap();
//! assert!(store.read(id, points).is_some());
//! ```

#![deny(unsafe_code)]
#![warn(clippy::pedantic)]
#![deny(clippy::perf)]
#![allow(clippy::module_name_repetitions)]

pub mod config;
pub mod ecs;
pub mod error;
pub mod resources;
pub mod scheduler;
pub mod schema;
pub mod token;

pub use config::{CoreConfig, SchedulerConfig, StoreConfig};
pub use ecs::{
    ArchetypeDef, ArchetypeId, ArchetypeSignature, Column, ComponentDef, ComponentId,
    ComponentKind, ComponentValue, Entity, EntityLocation, ObjectColumn, ObjectValue, Patch,
    Record, Store, Table, TableId, Tables, TypedColumn, MAX_COLUMN_BYTES, MAX_GROWTH_FACTOR,
};
pub use error::{
    ConfigError, ConfigResult, LayoutError, LayoutResult, SchedulerError, SchedulerResult,
    StoreError, StoreResult, SystemError,
};
pub use resources::{Resource, Resources};
pub use scheduler::{FnSystem, FrameContext, FrameReport, Scheduler, System, SystemFailure};
pub use schema::{
    FieldDef, FieldLayout, FieldType, Layout, LayoutRules, RecordView, Scalar, ScalarType,
    Schema, Value,
};
pub use token::ChangeToken;
