//! # Component Schemas
//!
//! A [`Schema`] is the immutable structural description of one component type:
//! either a single value (`vec3<f32>`) or a struct of named fields
//! (`{ view_projection: mat4x4<f32>, light_direction: vec3<f32>, ... }`).
//!
//! Building a schema computes its [`Layout`] exactly once. The schema is then
//! shared behind an [`Arc`] by every column that stores records of that type,
//! so every such column has the same stride.
//!
//! ```text
//! Schema "scene_uniforms" (Gpu rules):
//! | view_projection (64) | light_direction (12) | ambient (4) | light_color (12) | pad (4) |
//! 0                      64                     76            80                 92        96
//! ```

mod layout;
mod value;

use std::collections::HashSet;
use std::fmt;
use std::sync::Arc;

use serde::{Deserialize, Serialize};

use crate::error::{LayoutError, LayoutResult};

pub use layout::{FieldLayout, Layout};
pub use value::{RecordView, Scalar, Value};

/// Primitive scalar types a field can be built from.
#[derive(Clone, Copy, Debug, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum ScalarType {
    /// Unsigned 8-bit integer.
    U8,
    /// Signed 8-bit integer.
    I8,
    /// Unsigned 16-bit integer.
    U16,
    /// Signed 16-bit integer.
    I16,
    /// Unsigned 32-bit integer.
    U32,
    /// Signed 32-bit integer.
    I32,
    /// 32-bit float.
    F32,
    /// 64-bit float.
    F64,
}

impl ScalarType {
    /// Size in bytes.
    #[inline]
    #[must_use]
    pub const fn size(self) -> usize {
        match self {
            Self::U8 | Self::I8 => 1,
            Self::U16 | Self::I16 => 2,
            Self::U32 | Self::I32 | Self::F32 => 4,
            Self::F64 => 8,
        }
    }

    /// Short type name (`f32`, `u8`, ...).
    #[must_use]
    pub const fn name(self) -> &'static str {
        match self {
            Self::U8 => "u8",
            Self::I8 => "i8",
            Self::U16 => "u16",
            Self::I16 => "i16",
            Self::U32 => "u32",
            Self::I32 => "i32",
            Self::F32 => "f32",
            Self::F64 => "f64",
        }
    }
}

/// Shape of one field: scalar, fixed-length vector, or column-major matrix.
#[derive(Clone, Copy, Debug, PartialEq, Eq, Hash, Serialize, Deserialize)]
pub enum FieldType {
    /// A single scalar.
    Scalar(ScalarType),
    /// `len` scalars (2..=4).
    Vector {
        /// Element type.
        scalar: ScalarType,
        /// Element count.
        len: u8,
    },
    /// `columns` column vectors of `rows` scalars each (both 2..=4).
    Matrix {
        /// Element type.
        scalar: ScalarType,
        /// Column count.
        columns: u8,
        /// Row count (elements per column).
        rows: u8,
    },
}

impl FieldType {
    /// Scalar field.
    #[must_use]
    pub const fn scalar(scalar: ScalarType) -> Self {
        Self::Scalar(scalar)
    }

    /// Vector field.
    #[must_use]
    pub const fn vector(scalar: ScalarType, len: u8) -> Self {
        Self::Vector { scalar, len }
    }

    /// Matrix field.
    #[must_use]
    pub const fn matrix(scalar: ScalarType, columns: u8, rows: u8) -> Self {
        Self::Matrix {
            scalar,
            columns,
            rows,
        }
    }

    /// `vec3<f32>`.
    #[must_use]
    pub const fn vec3f() -> Self {
        Self::vector(ScalarType::F32, 3)
    }

    /// `vec4<f32>`.
    #[must_use]
    pub const fn vec4f() -> Self {
        Self::vector(ScalarType::F32, 4)
    }

    /// `mat4x4<f32>`.
    #[must_use]
    pub const fn mat4f() -> Self {
        Self::matrix(ScalarType::F32, 4, 4)
    }

    /// Element type.
    #[must_use]
    pub const fn element(self) -> ScalarType {
        match self {
            Self::Scalar(s) | Self::Vector { scalar: s, .. } | Self::Matrix { scalar: s, .. } => s,
        }
    }

    /// Number of scalars in one value of this type.
    #[must_use]
    pub const fn scalar_count(self) -> usize {
        match self {
            Self::Scalar(_) => 1,
            Self::Vector { len, .. } => len as usize,
            Self::Matrix { columns, rows, .. } => columns as usize * rows as usize,
        }
    }
}

impl fmt::Display for FieldType {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match *self {
            Self::Scalar(s) => f.write_str(s.name()),
            Self::Vector { scalar, len } => write!(f, "vec{len}<{}>", scalar.name()),
            Self::Matrix {
                scalar,
                columns,
                rows,
            } => write!(f, "mat{columns}x{rows}<{}>", scalar.name()),
        }
    }
}

/// Alignment rules used to place fields.
#[derive(Clone, Copy, Debug, Default, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum LayoutRules {
    /// Every field aligned to its element size; vectors and matrices are tight.
    /// Used for vertex data.
    #[default]
    Packed,
    /// WGSL host-shareable rules: 32-bit elements only, `vec3`/`vec4` aligned
    /// to 16 bytes, matrix columns padded to their vector alignment.
    /// Used for uniform and storage buffers.
    Gpu,
}

impl LayoutRules {
    /// Rules name used in error messages.
    #[must_use]
    pub const fn name(self) -> &'static str {
        match self {
            Self::Packed => "packed",
            Self::Gpu => "gpu",
        }
    }
}

/// One named field of a schema.
#[derive(Clone, Debug, PartialEq, Eq, Hash, Serialize, Deserialize)]
pub struct FieldDef {
    /// Field name, unique within the schema.
    pub name: String,
    /// Field shape.
    pub ty: FieldType,
}

impl FieldDef {
    /// Creates a field definition.
    #[must_use]
    pub fn new(name: impl Into<String>, ty: FieldType) -> Self {
        Self {
            name: name.into(),
            ty,
        }
    }
}

/// Immutable, named record description with its computed layout.
#[derive(Debug, PartialEq, Eq)]
pub struct Schema {
    name: String,
    rules: LayoutRules,
    fields: Vec<FieldDef>,
    /// Single-value schemas encode/decode a bare value instead of a struct.
    single: bool,
    layout: Layout,
}

impl Schema {
    /// Builds a single-value schema (`position: vec3<f32>`).
    ///
    /// # Errors
    ///
    /// Returns a [`LayoutError`] if the type is unsupported under `rules`.
    pub fn value(name: impl Into<String>, rules: LayoutRules, ty: FieldType) -> LayoutResult<Arc<Self>> {
        let name = name.into();
        let fields = vec![FieldDef::new(name.clone(), ty)];
        Self::build(name, rules, fields, true)
    }

    /// Builds a struct schema from ordered fields.
    ///
    /// # Errors
    ///
    /// Returns a [`LayoutError`] if the field list is empty, repeats a name,
    /// contains an unsupported type, or the stride overflows.
    pub fn structure(
        name: impl Into<String>,
        rules: LayoutRules,
        fields: Vec<FieldDef>,
    ) -> LayoutResult<Arc<Self>> {
        Self::build(name.into(), rules, fields, false)
    }

    fn build(name: String, rules: LayoutRules, fields: Vec<FieldDef>, single: bool) -> LayoutResult<Arc<Self>> {
        if fields.is_empty() {
            return Err(LayoutError::EmptySchema(name));
        }
        let mut seen = HashSet::with_capacity(fields.len());
        for field in &fields {
            if !seen.insert(field.name.as_str()) {
                return Err(LayoutError::DuplicateField {
                    schema: name.clone(),
                    field: field.name.clone(),
                });
            }
        }
        let layout = Layout::compute(&name, rules, &fields)?;
        tracing::trace!(schema = %name, stride = layout.stride(), "computed layout");
        Ok(Arc::new(Self {
            name,
            rules,
            fields,
            single,
            layout,
        }))
    }

    /// Schema name.
    #[must_use]
    pub fn name(&self) -> &str {
        &self.name
    }

    /// Layout rules the schema was built with.
    #[must_use]
    pub const fn rules(&self) -> LayoutRules {
        self.rules
    }

    /// Fields in declaration order. A single-value schema has one field named
    /// after the schema.
    #[must_use]
    pub fn fields(&self) -> &[FieldDef] {
        &self.fields
    }

    /// True for schemas built with [`Schema::value`].
    #[must_use]
    pub const fn is_single_value(&self) -> bool {
        self.single
    }

    /// Computed layout.
    #[must_use]
    pub const fn layout(&self) -> &Layout {
        &self.layout
    }

    /// Bytes per record.
    #[inline]
    #[must_use]
    pub const fn stride(&self) -> usize {
        self.layout.stride()
    }

    /// Index of a field by name.
    #[must_use]
    pub fn field_index(&self, name: &str) -> Option<usize> {
        self.fields.iter().position(|f| f.name == name)
    }

    /// Checks that `value` has this schema's shape without writing anything.
    ///
    /// # Errors
    ///
    /// Returns [`LayoutError::ValueMismatch`] naming the first offending field.
    pub fn check(&self, value: &Value) -> LayoutResult<()> {
        if self.single {
            return value::check_field(&self.fields[0], value);
        }
        match value {
            Value::Struct(values) if values.len() == self.fields.len() => {
                for (field, v) in self.fields.iter().zip(values) {
                    value::check_field(field, v)?;
                }
                Ok(())
            }
            _ => Err(LayoutError::ValueMismatch {
                field: self.name.clone(),
                expected: format!("struct of {} fields", self.fields.len()),
            }),
        }
    }

    /// Encodes one record into the first `stride` bytes of `out`.
    ///
    /// The value is checked before any byte is written, so a failed encode
    /// leaves `out` untouched. Padding bytes are zeroed.
    ///
    /// # Errors
    ///
    /// Returns [`LayoutError::ShortBuffer`] or [`LayoutError::ValueMismatch`].
    pub fn encode(&self, value: &Value, out: &mut [u8]) -> LayoutResult<()> {
        let stride = self.stride();
        if out.len() < stride {
            return Err(LayoutError::ShortBuffer {
                stride,
                actual: out.len(),
            });
        }
        self.check(value)?;
        let out = &mut out[..stride];
        out.fill(0);
        if self.single {
            value::write_field(&self.fields[0].ty, &self.layout.fields()[0], value, out);
        } else if let Value::Struct(values) = value {
            for ((field, slot), v) in self.fields.iter().zip(self.layout.fields()).zip(values) {
                value::write_field(&field.ty, slot, v, out);
            }
        }
        Ok(())
    }

    /// Decodes one record from the first `stride` bytes of `bytes`.
    ///
    /// # Errors
    ///
    /// Returns [`LayoutError::ShortBuffer`] if `bytes` is shorter than a record.
    pub fn decode(&self, bytes: &[u8]) -> LayoutResult<Value> {
        let stride = self.stride();
        if bytes.len() < stride {
            return Err(LayoutError::ShortBuffer {
                stride,
                actual: bytes.len(),
            });
        }
        if self.single {
            return Ok(value::read_field(&self.fields[0].ty, &self.layout.fields()[0], bytes));
        }
        Ok(Value::Struct(
            self.fields
                .iter()
                .zip(self.layout.fields())
                .map(|(field, slot)| value::read_field(&field.ty, slot, bytes))
                .collect(),
        ))
    }

    /// The value an all-zero record decodes to.
    #[must_use]
    pub fn zeroed(&self) -> Value {
        let zeros = vec![0u8; self.stride()];
        // decode only fails on short input
        self.decode(&zeros).unwrap_or(Value::Struct(Vec::new()))
    }

    /// Field-level reader over an encoded record; never allocates.
    ///
    /// # Errors
    ///
    /// Returns [`LayoutError::ShortBuffer`] if `bytes` is shorter than a record.
    pub fn view<'a>(&'a self, bytes: &'a [u8]) -> LayoutResult<RecordView<'a>> {
        if bytes.len() < self.stride() {
            return Err(LayoutError::ShortBuffer {
                stride: self.stride(),
                actual: bytes.len(),
            });
        }
        Ok(RecordView::new(self, &bytes[..self.stride()]))
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    fn vertex() -> Arc<Schema> {
        Schema::structure(
            "vertex",
            LayoutRules::Packed,
            vec![
                FieldDef::new("position", FieldType::vec3f()),
                FieldDef::new("color", FieldType::vec4f()),
                FieldDef::new("normal", FieldType::vec3f()),
            ],
        )
        .unwrap()
    }

    #[test]
    fn test_field_type_display() {
        assert_eq!(FieldType::vec3f().to_string(), "vec3<f32>");
        assert_eq!(FieldType::mat4f().to_string(), "mat4x4<f32>");
        assert_eq!(FieldType::scalar(ScalarType::U8).to_string(), "u8");
    }

    #[test]
    fn test_empty_struct_is_rejected() {
        let err = Schema::structure("empty", LayoutRules::Packed, Vec::new()).unwrap_err();
        assert_eq!(err, LayoutError::EmptySchema("empty".into()));
    }

    #[test]
    fn test_duplicate_field_is_rejected() {
        let err = Schema::structure(
            "dup",
            LayoutRules::Packed,
            vec![
                FieldDef::new("a", FieldType::vec3f()),
                FieldDef::new("a", FieldType::vec4f()),
            ],
        )
        .unwrap_err();
        assert!(matches!(err, LayoutError::DuplicateField { .. }));
    }

    #[test]
    fn test_struct_round_trip() {
        let schema = vertex();
        let record = Value::Struct(vec![
            [1.0f32, 2.0, 3.0].into(),
            [0.1f32, 0.2, 0.3, 1.0].into(),
            [0.0f32, 1.0, 0.0].into(),
        ]);
        let mut bytes = vec![0xAA; schema.stride()];
        schema.encode(&record, &mut bytes).unwrap();
        assert_eq!(schema.decode(&bytes).unwrap(), record);
        assert_eq!(schema.field_index("color"), Some(1));
        assert_eq!(schema.field_index("uv"), None);
    }

    #[test]
    fn test_failed_encode_leaves_bytes_untouched() {
        let schema = vertex();
        let bad = Value::Struct(vec![[1.0f32, 2.0].into(), [0.0f32; 4].into(), [0.0f32; 3].into()]);
        let mut bytes = vec![0xAA; schema.stride()];
        let err = schema.encode(&bad, &mut bytes).unwrap_err();
        assert!(matches!(err, LayoutError::ValueMismatch { ref field, .. } if field == "position"));
        assert!(bytes.iter().all(|b| *b == 0xAA));
    }

    #[test]
    fn test_short_buffer() {
        let schema = vertex();
        let err = schema.decode(&[0u8; 4]).unwrap_err();
        assert_eq!(err, LayoutError::ShortBuffer { stride: 40, actual: 4 });
    }

    #[test]
    fn test_zeroed_matches_shape() {
        let schema = vertex();
        let zero = schema.zeroed();
        assert!(schema.check(&zero).is_ok());
        assert_eq!(zero.field(1).and_then(Value::to_f32_array::<4>), Some([0.0; 4]));
    }
}
