//! # Store Error Types
//!
//! Error taxonomy for the store:
//! - **Construction errors** ([`LayoutError`], most [`StoreError`] variants) are
//!   fatal at setup time and abort table/column creation.
//! - **Lookup errors** ([`StoreError::EntityNotFound`]) are recoverable by the caller.
//! - **Resource absence** is not an error at all; systems skip the frame.

use thiserror::Error;

use crate::ecs::Entity;

/// Errors produced while computing a layout or encoding a value against it.
#[derive(Error, Debug, Clone, PartialEq, Eq)]
pub enum LayoutError {
    /// The field type cannot be represented under the requested layout rules.
    #[error("unsupported type {ty} for field `{field}` under {rules} layout rules")]
    UnsupportedType {
        /// Field name.
        field: String,
        /// Rendered field type.
        ty: String,
        /// Rendered layout rules.
        rules: &'static str,
    },

    /// A struct schema with no fields has no representable stride.
    #[error("schema `{0}` has no fields")]
    EmptySchema(String),

    /// Two fields of one schema share a name.
    #[error("schema `{schema}` declares field `{field}` twice")]
    DuplicateField {
        /// Schema name.
        schema: String,
        /// Offending field name.
        field: String,
    },

    /// The computed stride does not fit in 32 bits.
    #[error("schema `{0}` produces a stride that overflows")]
    StrideOverflow(String),

    /// A value does not match the shape of the field it is encoded into.
    #[error("value for field `{field}` does not match {expected}")]
    ValueMismatch {
        /// Field name.
        field: String,
        /// Rendered expected field type.
        expected: String,
    },

    /// The byte region is smaller than one record.
    #[error("byte region of {actual} bytes is smaller than stride {stride}")]
    ShortBuffer {
        /// Required bytes.
        stride: usize,
        /// Bytes supplied.
        actual: usize,
    },
}

/// Result type for layout operations.
pub type LayoutResult<T> = Result<T, LayoutError>;

/// Errors produced by columns, tables and the store.
#[derive(Error, Debug, Clone, PartialEq, Eq)]
pub enum StoreError {
    /// Layout or encoding failure.
    #[error(transparent)]
    Layout(#[from] LayoutError),

    /// Row index past the logical length of a column or table.
    #[error("row {row} out of bounds for length {len}")]
    RowOutOfBounds {
        /// Requested row.
        row: usize,
        /// Logical length.
        len: usize,
    },

    /// A plain-data read or write with a type whose size exceeds the stride.
    #[error("type of {size} bytes does not fit stride {stride}")]
    PodSizeMismatch {
        /// `size_of` the requested type.
        size: usize,
        /// Column stride.
        stride: usize,
    },

    /// Growing a column would exceed the addressable byte size.
    #[error("column `{schema}` cannot hold {rows} rows of {stride} bytes")]
    CapacityOverflow {
        /// Schema name of the column.
        schema: String,
        /// Rows requested.
        rows: usize,
        /// Column stride.
        stride: usize,
    },

    /// A component name was registered twice.
    #[error("component `{0}` is already registered")]
    DuplicateComponent(String),

    /// An archetype name was registered twice.
    #[error("archetype `{0}` is already registered")]
    DuplicateArchetype(String),

    /// An archetype must name at least one component.
    #[error("archetype `{0}` has no components")]
    EmptyArchetype(String),

    /// No component with this name exists.
    #[error("unknown component `{0}`")]
    UnknownComponent(String),

    /// No archetype with this id exists.
    #[error("unknown archetype {0}")]
    UnknownArchetype(u32),

    /// Insert did not supply a component that has no default.
    #[error("archetype `{archetype}` requires component `{component}`")]
    MissingComponent {
        /// Archetype name.
        archetype: String,
        /// Missing component name.
        component: String,
    },

    /// A record names a component outside the entity's archetype.
    #[error("component `{component}` is not part of archetype `{archetype}`")]
    ComponentNotInArchetype {
        /// Archetype (or table) name.
        archetype: String,
        /// Offending component name.
        component: String,
    },

    /// A typed component received an object value or vice versa.
    #[error("component `{0}` received a value of the wrong kind")]
    KindMismatch(String),

    /// The entity id does not resolve (never existed or already deleted).
    #[error("entity {0} not found")]
    EntityNotFound(Entity),
}

/// Result type for store operations.
pub type StoreResult<T> = Result<T, StoreError>;

/// Errors produced while building or mutating a schedule.
#[derive(Error, Debug, Clone, PartialEq, Eq)]
pub enum SchedulerError {
    /// The named phase does not exist.
    #[error("unknown phase `{0}`")]
    UnknownPhase(String),

    /// Phase names must be unique.
    #[error("phase `{0}` declared twice")]
    DuplicatePhase(String),

    /// System names must be unique across all phases.
    #[error("system `{0}` is already registered")]
    DuplicateSystem(String),

    /// No system with this name is registered.
    #[error("unknown system `{0}`")]
    UnknownSystem(String),
}

/// Result type for scheduler operations.
pub type SchedulerResult<T> = Result<T, SchedulerError>;

/// Failure reported by a running system.
///
/// The scheduler logs it and moves on to the next system.
#[derive(Error, Debug)]
pub enum SystemError {
    /// A store operation failed.
    #[error(transparent)]
    Store(#[from] StoreError),

    /// Any other failure (device, encoding, ...).
    #[error("{0}")]
    Other(Box<dyn std::error::Error + Send + Sync + 'static>),
}

impl SystemError {
    /// Wraps an arbitrary error.
    pub fn other<E>(error: E) -> Self
    where
        E: std::error::Error + Send + Sync + 'static,
    {
        Self::Other(Box::new(error))
    }
}

/// Errors produced while loading configuration.
#[derive(Error, Debug)]
pub enum ConfigError {
    /// The file could not be read.
    #[error("failed to read config: {0}")]
    Io(#[from] std::io::Error),

    /// The file is not valid TOML for the expected shape.
    #[error("failed to parse config: {0}")]
    Parse(#[from] toml::de::Error),

    /// The values parsed but violate a constraint.
    #[error("invalid config: {0}")]
    Invalid(String),
}

/// Result type for config loading.
pub type ConfigResult<T> = Result<T, ConfigError>;
