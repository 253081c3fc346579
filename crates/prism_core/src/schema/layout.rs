//! Byte layout computation.

use crate::error::{LayoutError, LayoutResult};

use super::{FieldDef, FieldType, LayoutRules, ScalarType};

/// Placement of one field inside a record.
#[derive(Clone, Copy, Debug, PartialEq, Eq, Hash)]
pub struct FieldLayout {
    /// Byte offset from the start of the record.
    pub offset: usize,
    /// Bytes occupied by the field (excluding trailing padding).
    pub size: usize,
    /// Required alignment of `offset`.
    pub align: usize,
    /// Distance between matrix columns; the vector size for non-matrices.
    pub column_stride: usize,
}

/// Fixed record layout: stride, alignment and one placement per field.
#[derive(Clone, Debug, PartialEq, Eq, Hash)]
pub struct Layout {
    stride: usize,
    alignment: usize,
    fields: Vec<FieldLayout>,
}

#[inline]
const fn round_up(value: usize, align: usize) -> usize {
    value.div_ceil(align) * align
}

impl Layout {
    /// Computes the layout of `fields` under `rules`.
    ///
    /// Fields are placed in declaration order at the next offset satisfying
    /// their alignment; the stride is padded to the largest field alignment.
    ///
    /// # Errors
    ///
    /// Returns [`LayoutError::UnsupportedType`] for shapes the rules cannot
    /// express and [`LayoutError::StrideOverflow`] if the stride exceeds `u32`.
    pub fn compute(schema: &str, rules: LayoutRules, fields: &[FieldDef]) -> LayoutResult<Self> {
        let mut placed = Vec::with_capacity(fields.len());
        let mut cursor = 0usize;
        let mut alignment = 1usize;

        for field in fields {
            let (size, align, column_stride) = field_shape(field, rules)?;
            let offset = cursor
                .checked_next_multiple_of(align)
                .ok_or_else(|| LayoutError::StrideOverflow(schema.to_owned()))?;
            cursor = offset
                .checked_add(size)
                .ok_or_else(|| LayoutError::StrideOverflow(schema.to_owned()))?;
            alignment = alignment.max(align);
            placed.push(FieldLayout {
                offset,
                size,
                align,
                column_stride,
            });
        }

        let stride = cursor
            .checked_next_multiple_of(alignment)
            .filter(|s| u32::try_from(*s).is_ok())
            .ok_or_else(|| LayoutError::StrideOverflow(schema.to_owned()))?;

        Ok(Self {
            stride,
            alignment,
            fields: placed,
        })
    }

    /// Bytes per record, padded to [`Layout::alignment`].
    #[inline]
    #[must_use]
    pub const fn stride(&self) -> usize {
        self.stride
    }

    /// Largest field alignment.
    #[inline]
    #[must_use]
    pub const fn alignment(&self) -> usize {
        self.alignment
    }

    /// Per-field placements in declaration order.
    #[must_use]
    pub fn fields(&self) -> &[FieldLayout] {
        &self.fields
    }

    /// Offsets only, in declaration order.
    #[must_use]
    pub fn field_offsets(&self) -> Vec<usize> {
        self.fields.iter().map(|f| f.offset).collect()
    }
}

/// `(size, align, column_stride)` of one field.
fn field_shape(field: &FieldDef, rules: LayoutRules) -> LayoutResult<(usize, usize, usize)> {
    let unsupported = || LayoutError::UnsupportedType {
        field: field.name.clone(),
        ty: field.ty.to_string(),
        rules: rules.name(),
    };

    let scalar = field.ty.element();
    if rules == LayoutRules::Gpu && scalar.size() != 4 {
        return Err(unsupported());
    }

    match (rules, field.ty) {
        (_, FieldType::Vector { len, .. }) if !(2..=4).contains(&len) => Err(unsupported()),
        (_, FieldType::Matrix { columns, rows, .. })
            if !(2..=4).contains(&columns) || !(2..=4).contains(&rows) =>
        {
            Err(unsupported())
        }

        (LayoutRules::Packed, ty) => {
            let s = scalar.size();
            let column = match ty {
                FieldType::Matrix { rows, .. } => usize::from(rows) * s,
                _ => ty.scalar_count() * s,
            };
            Ok((ty.scalar_count() * s, s, column))
        }

        (LayoutRules::Gpu, FieldType::Scalar(_)) => Ok((4, 4, 4)),
        (LayoutRules::Gpu, FieldType::Vector { len, .. }) => {
            let (size, align) = gpu_vector(len);
            Ok((size, align, size))
        }
        (LayoutRules::Gpu, FieldType::Matrix { scalar, columns, rows }) => {
            if scalar != ScalarType::F32 {
                return Err(unsupported());
            }
            let (size, align) = gpu_vector(rows);
            let column_stride = round_up(size, align);
            Ok((usize::from(columns) * column_stride, align, column_stride))
        }
    }
}

/// `(size, align)` of a 32-bit vector under WGSL rules.
const fn gpu_vector(len: u8) -> (usize, usize) {
    match len {
        2 => (8, 8),
        3 => (12, 16),
        _ => (16, 16),
    }
}
