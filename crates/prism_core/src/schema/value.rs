//! Structured record values and their byte encoding.

use crate::error::{LayoutError, LayoutResult};

use super::{FieldDef, FieldLayout, FieldType, ScalarType, Schema};

/// One scalar of any supported type.
#[derive(Clone, Copy, Debug, PartialEq)]
pub enum Scalar {
    /// `u8`.
    U8(u8),
    /// `i8`.
    I8(i8),
    /// `u16`.
    U16(u16),
    /// `i16`.
    I16(i16),
    /// `u32`.
    U32(u32),
    /// `i32`.
    I32(i32),
    /// `f32`.
    F32(f32),
    /// `f64`.
    F64(f64),
}

impl Scalar {
    /// Type tag of this scalar.
    #[must_use]
    pub const fn ty(self) -> ScalarType {
        match self {
            Self::U8(_) => ScalarType::U8,
            Self::I8(_) => ScalarType::I8,
            Self::U16(_) => ScalarType::U16,
            Self::I16(_) => ScalarType::I16,
            Self::U32(_) => ScalarType::U32,
            Self::I32(_) => ScalarType::I32,
            Self::F32(_) => ScalarType::F32,
            Self::F64(_) => ScalarType::F64,
        }
    }

    /// The value if this is an `f32`.
    #[must_use]
    pub const fn as_f32(self) -> Option<f32> {
        match self {
            Self::F32(v) => Some(v),
            _ => None,
        }
    }

    fn write(self, out: &mut [u8], at: usize) {
        match self {
            Self::U8(v) => out[at] = v,
            Self::I8(v) => out[at..=at].copy_from_slice(&v.to_le_bytes()),
            Self::U16(v) => out[at..at + 2].copy_from_slice(&v.to_le_bytes()),
            Self::I16(v) => out[at..at + 2].copy_from_slice(&v.to_le_bytes()),
            Self::U32(v) => out[at..at + 4].copy_from_slice(&v.to_le_bytes()),
            Self::I32(v) => out[at..at + 4].copy_from_slice(&v.to_le_bytes()),
            Self::F32(v) => out[at..at + 4].copy_from_slice(&v.to_le_bytes()),
            Self::F64(v) => out[at..at + 8].copy_from_slice(&v.to_le_bytes()),
        }
    }

    fn read(ty: ScalarType, bytes: &[u8], at: usize) -> Self {
        match ty {
            ScalarType::U8 => Self::U8(bytes[at]),
            ScalarType::I8 => Self::I8(i8::from_le_bytes(le(bytes, at))),
            ScalarType::U16 => Self::U16(u16::from_le_bytes(le(bytes, at))),
            ScalarType::I16 => Self::I16(i16::from_le_bytes(le(bytes, at))),
            ScalarType::U32 => Self::U32(u32::from_le_bytes(le(bytes, at))),
            ScalarType::I32 => Self::I32(i32::from_le_bytes(le(bytes, at))),
            ScalarType::F32 => Self::F32(f32::from_le_bytes(le(bytes, at))),
            ScalarType::F64 => Self::F64(f64::from_le_bytes(le(bytes, at))),
        }
    }
}

#[inline]
fn le<const N: usize>(bytes: &[u8], at: usize) -> [u8; N] {
    let mut out = [0u8; N];
    out.copy_from_slice(&bytes[at..at + N]);
    out
}

/// A structured record or field value.
///
/// Equality is IEEE equality on float scalars: a record holding NaN is never
/// equal to itself, even though encode and decode keep its bits exactly.
#[derive(Clone, Debug, PartialEq)]
pub enum Value {
    /// Single scalar.
    Scalar(Scalar),
    /// Fixed-length vector.
    Vector(Vec<Scalar>),
    /// Matrix elements in column-major order.
    Matrix(Vec<Scalar>),
    /// Struct fields in schema order.
    Struct(Vec<Value>),
}

impl Value {
    /// Field `index` of a struct value.
    #[must_use]
    pub fn field(&self, index: usize) -> Option<&Value> {
        match self {
            Self::Struct(fields) => fields.get(index),
            _ => None,
        }
    }

    /// The scalar if this is a scalar `f32`.
    #[must_use]
    pub fn as_f32(&self) -> Option<f32> {
        match self {
            Self::Scalar(s) => s.as_f32(),
            _ => None,
        }
    }

    /// Elements as `[f32; N]` if this is an `f32` vector or matrix of `N` elements.
    #[must_use]
    pub fn to_f32_array<const N: usize>(&self) -> Option<[f32; N]> {
        let elements = match self {
            Self::Vector(e) | Self::Matrix(e) if e.len() == N => e,
            _ => return None,
        };
        let mut out = [0.0f32; N];
        for (slot, s) in out.iter_mut().zip(elements) {
            *slot = s.as_f32()?;
        }
        Some(out)
    }
}

macro_rules! impl_value_from {
    ($($t:ty => $variant:ident),* $(,)?) => {$(
        impl From<$t> for Scalar {
            fn from(v: $t) -> Self {
                Self::$variant(v)
            }
        }

        impl From<$t> for Value {
            fn from(v: $t) -> Self {
                Self::Scalar(Scalar::$variant(v))
            }
        }

        impl<const N: usize> From<[$t; N]> for Value {
            fn from(v: [$t; N]) -> Self {
                Self::Vector(v.into_iter().map(Scalar::$variant).collect())
            }
        }

        /// Column-major: `m[c][r]`.
        impl<const R: usize, const C: usize> From<[[$t; R]; C]> for Value {
            fn from(m: [[$t; R]; C]) -> Self {
                Self::Matrix(m.into_iter().flatten().map(Scalar::$variant).collect())
            }
        }
    )*};
}

impl_value_from! {
    u8 => U8,
    i8 => I8,
    u16 => U16,
    i16 => I16,
    u32 => U32,
    i32 => I32,
    f32 => F32,
    f64 => F64,
}

/// Byte offset of element `i` of a field.
fn element_offset(ty: FieldType, slot: &FieldLayout, i: usize) -> usize {
    let s = ty.element().size();
    match ty {
        FieldType::Matrix { rows, .. } => {
            let rows = usize::from(rows);
            slot.offset + (i / rows) * slot.column_stride + (i % rows) * s
        }
        _ => slot.offset + i * s,
    }
}

pub(super) fn check_field(field: &FieldDef, value: &Value) -> LayoutResult<()> {
    let element = field.ty.element();
    let ok = match (field.ty, value) {
        (FieldType::Scalar(t), Value::Scalar(s)) => s.ty() == t,
        (FieldType::Vector { .. }, Value::Vector(e)) | (FieldType::Matrix { .. }, Value::Matrix(e)) => {
            e.len() == field.ty.scalar_count() && e.iter().all(|s| s.ty() == element)
        }
        _ => false,
    };
    if ok {
        Ok(())
    } else {
        Err(LayoutError::ValueMismatch {
            field: field.name.clone(),
            expected: field.ty.to_string(),
        })
    }
}

/// Writes a value already accepted by [`check_field`].
pub(super) fn write_field(ty: &FieldType, slot: &FieldLayout, value: &Value, out: &mut [u8]) {
    match value {
        Value::Scalar(s) => s.write(out, slot.offset),
        Value::Vector(e) | Value::Matrix(e) => {
            for (i, s) in e.iter().enumerate() {
                s.write(out, element_offset(*ty, slot, i));
            }
        }
        Value::Struct(_) => {}
    }
}

pub(super) fn read_field(ty: &FieldType, slot: &FieldLayout, bytes: &[u8]) -> Value {
    let element = ty.element();
    let elements = || {
        (0..ty.scalar_count())
            .map(|i| Scalar::read(element, bytes, element_offset(*ty, slot, i)))
            .collect()
    };
    match ty {
        FieldType::Scalar(_) => Value::Scalar(Scalar::read(element, bytes, slot.offset)),
        FieldType::Vector { .. } => Value::Vector(elements()),
        FieldType::Matrix { .. } => Value::Matrix(elements()),
    }
}

/// Read-only field access over one encoded record.
#[derive(Clone, Copy, Debug)]
pub struct RecordView<'a> {
    schema: &'a Schema,
    bytes: &'a [u8],
}

impl<'a> RecordView<'a> {
    pub(super) fn new(schema: &'a Schema, bytes: &'a [u8]) -> Self {
        Self { schema, bytes }
    }

    /// Raw record bytes (`stride` long).
    #[must_use]
    pub const fn bytes(&self) -> &'a [u8] {
        self.bytes
    }

    /// First scalar of field `index`.
    #[must_use]
    pub fn scalar(&self, index: usize) -> Option<Scalar> {
        let ty = self.schema.fields().get(index)?.ty;
        let slot = self.schema.layout().fields().get(index)?;
        Some(Scalar::read(ty.element(), self.bytes, slot.offset))
    }

    /// Field `index` as `[f32; N]`; `None` unless it has exactly `N` `f32` elements.
    #[must_use]
    pub fn f32_array<const N: usize>(&self, index: usize) -> Option<[f32; N]> {
        let ty = self.schema.fields().get(index)?.ty;
        if ty.element() != ScalarType::F32 || ty.scalar_count() != N {
            return None;
        }
        let slot = self.schema.layout().fields().get(index)?;
        let mut out = [0.0f32; N];
        for (i, v) in out.iter_mut().enumerate() {
            *v = f32::from_le_bytes(le(self.bytes, element_offset(ty, slot, i)));
        }
        Some(out)
    }

    /// Decodes field `index` into a [`Value`].
    #[must_use]
    pub fn field(&self, index: usize) -> Option<Value> {
        let ty = self.schema.fields().get(index)?.ty;
        let slot = self.schema.layout().fields().get(index)?;
        Some(read_field(&ty, slot, self.bytes))
    }
}
