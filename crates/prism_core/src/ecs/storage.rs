//! # Column Storage
//!
//! ```text
//! TypedColumn (stride 28, len 3, capacity 4):
//! | row 0 (28 B) | row 1 (28 B) | row 2 (28 B) | unused (28 B) |
//! ^ bytes() covers the first len * stride bytes
//! ```
//!
//! A [`TypedColumn`] is one flat byte buffer; rows are encoded records of its
//! schema. The live prefix is exposed directly so the GPU bridge can copy it
//! without per-row work. Every mutation draws a fresh [`ChangeToken`].

use std::sync::Arc;

use bytemuck::Pod;

use crate::error::{StoreError, StoreResult};
use crate::schema::{RecordView, Schema, Value};
use crate::token::ChangeToken;

use super::component::{ComponentValue, ObjectValue};

/// Upper bound on the byte size of one column's buffer.
pub const MAX_COLUMN_BYTES: usize = isize::MAX.unsigned_abs();

/// Largest capacity multiplier a column applies when full.
pub const MAX_GROWTH_FACTOR: usize = 16;

/// Growable fixed-stride record buffer for one typed component.
#[derive(Debug)]
pub struct TypedColumn {
    schema: Arc<Schema>,
    /// `capacity * stride` bytes; rows past `len` are unspecified.
    data: Vec<u8>,
    len: usize,
    capacity: usize,
    growth_factor: usize,
    token: ChangeToken,
}

impl TypedColumn {
    /// Creates an empty column that doubles on overflow.
    #[must_use]
    pub fn new(schema: Arc<Schema>) -> Self {
        Self::with_capacity(schema, 0, 2)
    }

    /// Creates an empty column with `capacity` pre-allocated rows.
    ///
    /// `growth_factor` is clamped to `2..=MAX_GROWTH_FACTOR`; `capacity` is
    /// clamped so the buffer stays within [`MAX_COLUMN_BYTES`].
    #[must_use]
    pub fn with_capacity(schema: Arc<Schema>, capacity: usize, growth_factor: usize) -> Self {
        let capacity = capacity.min(max_rows(schema.stride()));
        let data = vec![0u8; capacity * schema.stride()];
        Self {
            schema,
            data,
            len: 0,
            capacity,
            growth_factor: growth_factor.clamp(2, MAX_GROWTH_FACTOR),
            token: ChangeToken::next(),
        }
    }

    /// Schema shared by every row.
    #[must_use]
    pub fn schema(&self) -> &Arc<Schema> {
        &self.schema
    }

    /// Bytes per row.
    #[inline]
    #[must_use]
    pub fn stride(&self) -> usize {
        self.schema.stride()
    }

    /// Logical row count.
    #[inline]
    #[must_use]
    pub const fn len(&self) -> usize {
        self.len
    }

    /// Checks if the column has no rows.
    #[inline]
    #[must_use]
    pub const fn is_empty(&self) -> bool {
        self.len == 0
    }

    /// Allocated rows.
    #[inline]
    #[must_use]
    pub const fn capacity(&self) -> usize {
        self.capacity
    }

    /// Token of the current content.
    #[inline]
    #[must_use]
    pub const fn token(&self) -> ChangeToken {
        self.token
    }

    /// The live `len * stride` bytes.
    #[inline]
    #[must_use]
    pub fn bytes(&self) -> &[u8] {
        &self.data[..self.len * self.stride()]
    }

    /// Bytes of one row.
    ///
    /// # Errors
    ///
    /// Returns [`StoreError::RowOutOfBounds`] if `row >= len`.
    pub fn row_bytes(&self, row: usize) -> StoreResult<&[u8]> {
        self.check_row(row)?;
        let stride = self.stride();
        Ok(&self.data[row * stride..(row + 1) * stride])
    }

    /// Ensures room for `additional` more rows without further growth.
    ///
    /// # Errors
    ///
    /// Returns [`StoreError::CapacityOverflow`] if the rows would not fit in
    /// [`MAX_COLUMN_BYTES`] or cannot be allocated; the column is unchanged in
    /// that case.
    pub fn reserve(&mut self, additional: usize) -> StoreResult<()> {
        let needed = self
            .len
            .checked_add(additional)
            .filter(|rows| *rows <= max_rows(self.stride()))
            .ok_or_else(|| self.overflow(self.len.saturating_add(additional)))?;
        if needed > self.capacity {
            self.resize_to(needed)?;
        }
        Ok(())
    }

    /// Encodes `value` into a new last row and returns its index.
    ///
    /// Grows capacity to `max(capacity * growth_factor, 1)` when full, capped
    /// at [`MAX_COLUMN_BYTES`].
    ///
    /// # Errors
    ///
    /// Returns a layout error if `value` does not match the schema, or
    /// [`StoreError::CapacityOverflow`] if the column cannot grow; the column
    /// is unchanged in both cases.
    pub fn append(&mut self, value: &Value) -> StoreResult<usize> {
        self.schema.check(value)?;
        let row = self.push_slot()?;
        let stride = self.stride();
        self.schema
            .encode(value, &mut self.data[row * stride..(row + 1) * stride])?;
        Ok(row)
    }

    /// Overwrites row `row` in place.
    ///
    /// # Errors
    ///
    /// Returns [`StoreError::RowOutOfBounds`] or a layout error.
    pub fn set(&mut self, row: usize, value: &Value) -> StoreResult<()> {
        self.check_row(row)?;
        let stride = self.stride();
        self.schema
            .encode(value, &mut self.data[row * stride..(row + 1) * stride])?;
        self.token = ChangeToken::next();
        Ok(())
    }

    /// Decodes row `row`.
    ///
    /// Allocates for vectors and structs; hot paths should use
    /// [`TypedColumn::view`], [`TypedColumn::get_pod`] or [`TypedColumn::bytes`].
    ///
    /// # Errors
    ///
    /// Returns [`StoreError::RowOutOfBounds`] if `row >= len`.
    pub fn get(&self, row: usize) -> StoreResult<Value> {
        Ok(self.schema.decode(self.row_bytes(row)?)?)
    }

    /// Non-allocating field reader over row `row`.
    ///
    /// # Errors
    ///
    /// Returns [`StoreError::RowOutOfBounds`] if `row >= len`.
    pub fn view(&self, row: usize) -> StoreResult<RecordView<'_>> {
        let bytes = self.row_bytes(row)?;
        Ok(self.schema.view(bytes)?)
    }

    /// Reads row `row` as a plain-data type whose size equals the stride.
    ///
    /// # Errors
    ///
    /// Returns [`StoreError::PodSizeMismatch`] or [`StoreError::RowOutOfBounds`].
    pub fn get_pod<T: Pod>(&self, row: usize) -> StoreResult<T> {
        self.check_pod::<T>()?;
        Ok(bytemuck::pod_read_unaligned(self.row_bytes(row)?))
    }

    /// Overwrites row `row` with a plain-data value whose size equals the stride.
    ///
    /// # Errors
    ///
    /// Returns [`StoreError::PodSizeMismatch`] or [`StoreError::RowOutOfBounds`].
    pub fn set_pod<T: Pod>(&mut self, row: usize, value: &T) -> StoreResult<()> {
        self.check_pod::<T>()?;
        self.check_row(row)?;
        let stride = self.stride();
        self.data[row * stride..(row + 1) * stride].copy_from_slice(bytemuck::bytes_of(value));
        self.token = ChangeToken::next();
        Ok(())
    }

    /// Appends a plain-data value whose size equals the stride.
    ///
    /// # Errors
    ///
    /// Returns [`StoreError::PodSizeMismatch`] or [`StoreError::CapacityOverflow`].
    pub fn push_pod<T: Pod>(&mut self, value: &T) -> StoreResult<usize> {
        self.check_pod::<T>()?;
        let row = self.push_slot()?;
        let stride = self.stride();
        self.data[row * stride..(row + 1) * stride].copy_from_slice(bytemuck::bytes_of(value));
        Ok(row)
    }

    /// Moves the last row into `row` and shrinks by one.
    ///
    /// The caller must re-point whatever referenced the former last row.
    ///
    /// # Errors
    ///
    /// Returns [`StoreError::RowOutOfBounds`] if `row >= len`.
    pub fn swap_remove(&mut self, row: usize) -> StoreResult<()> {
        self.check_row(row)?;
        let stride = self.stride();
        let last = self.len - 1;
        if row != last {
            self.data
                .copy_within(last * stride..(last + 1) * stride, row * stride);
        }
        self.len = last;
        self.token = ChangeToken::next();
        Ok(())
    }

    /// Drops every row, keeping capacity.
    pub fn clear(&mut self) {
        self.len = 0;
        self.token = ChangeToken::next();
    }

    fn check_row(&self, row: usize) -> StoreResult<()> {
        if row < self.len {
            Ok(())
        } else {
            Err(StoreError::RowOutOfBounds { row, len: self.len })
        }
    }

    fn check_pod<T: Pod>(&self) -> StoreResult<()> {
        let size = std::mem::size_of::<T>();
        if size == self.stride() {
            Ok(())
        } else {
            Err(StoreError::PodSizeMismatch {
                size,
                stride: self.stride(),
            })
        }
    }

    fn overflow(&self, rows: usize) -> StoreError {
        StoreError::CapacityOverflow {
            schema: self.schema.name().to_owned(),
            rows,
            stride: self.stride(),
        }
    }

    /// Grows by the growth factor if no free row is left.
    pub(crate) fn grow_if_full(&mut self) -> StoreResult<()> {
        if self.len == self.capacity {
            let limit = max_rows(self.stride());
            let grown = self.capacity.saturating_mul(self.growth_factor).max(1).min(limit);
            if grown <= self.len {
                return Err(self.overflow(self.len.saturating_add(1)));
            }
            self.resize_to(grown)?;
        }
        Ok(())
    }

    /// Reserves the next row slot, growing if full.
    fn push_slot(&mut self) -> StoreResult<usize> {
        self.grow_if_full()?;
        let row = self.len;
        self.len += 1;
        self.token = ChangeToken::next();
        Ok(row)
    }

    /// `capacity` must not exceed `max_rows(stride)`.
    fn resize_to(&mut self, capacity: usize) -> StoreResult<()> {
        tracing::trace!(
            schema = self.schema.name(),
            from = self.capacity,
            to = capacity,
            "growing column"
        );
        let bytes = capacity * self.stride();
        self.data
            .try_reserve_exact(bytes.saturating_sub(self.data.len()))
            .map_err(|_| self.overflow(capacity))?;
        self.data.resize(bytes, 0);
        self.capacity = capacity;
        Ok(())
    }
}

/// Most rows of `stride` bytes that fit in [`MAX_COLUMN_BYTES`].
const fn max_rows(stride: usize) -> usize {
    if stride == 0 {
        usize::MAX
    } else {
        MAX_COLUMN_BYTES / stride
    }
}

/// Column of shared object values.
#[derive(Debug)]
pub struct ObjectColumn {
    values: Vec<ObjectValue>,
    token: ChangeToken,
}

impl Default for ObjectColumn {
    fn default() -> Self {
        Self::new()
    }
}

impl ObjectColumn {
    /// Creates an empty column.
    #[must_use]
    pub fn new() -> Self {
        Self {
            values: Vec::new(),
            token: ChangeToken::next(),
        }
    }

    /// Row count.
    #[inline]
    #[must_use]
    pub fn len(&self) -> usize {
        self.values.len()
    }

    /// Checks if the column has no rows.
    #[inline]
    #[must_use]
    pub fn is_empty(&self) -> bool {
        self.values.is_empty()
    }

    /// Token of the current row set. Object contents carry their own tokens.
    #[must_use]
    pub const fn token(&self) -> ChangeToken {
        self.token
    }

    /// Appends an object and returns its row.
    pub fn push(&mut self, value: ObjectValue) -> usize {
        self.values.push(value);
        self.token = ChangeToken::next();
        self.values.len() - 1
    }

    /// Replaces the object at `row`.
    ///
    /// # Errors
    ///
    /// Returns [`StoreError::RowOutOfBounds`] if `row >= len`.
    pub fn set(&mut self, row: usize, value: ObjectValue) -> StoreResult<()> {
        let len = self.values.len();
        let slot = self
            .values
            .get_mut(row)
            .ok_or(StoreError::RowOutOfBounds { row, len })?;
        *slot = value;
        self.token = ChangeToken::next();
        Ok(())
    }

    /// Object at `row`.
    #[must_use]
    pub fn get(&self, row: usize) -> Option<&ObjectValue> {
        self.values.get(row)
    }

    /// Every object in row order.
    pub fn iter(&self) -> std::slice::Iter<'_, ObjectValue> {
        self.values.iter()
    }

    /// Moves the last object into `row` and shrinks by one.
    ///
    /// # Errors
    ///
    /// Returns [`StoreError::RowOutOfBounds`] if `row >= len`.
    pub fn swap_remove(&mut self, row: usize) -> StoreResult<()> {
        if row >= self.values.len() {
            return Err(StoreError::RowOutOfBounds {
                row,
                len: self.values.len(),
            });
        }
        self.values.swap_remove(row);
        self.token = ChangeToken::next();
        Ok(())
    }
}

/// One component column of a table.
#[derive(Debug)]
pub enum Column {
    /// Flat records.
    Typed(TypedColumn),
    /// Shared objects.
    Object(ObjectColumn),
}

impl Column {
    /// Row count.
    #[must_use]
    pub fn len(&self) -> usize {
        match self {
            Self::Typed(c) => c.len(),
            Self::Object(c) => c.len(),
        }
    }

    /// Checks if the column has no rows.
    #[must_use]
    pub fn is_empty(&self) -> bool {
        self.len() == 0
    }

    /// The typed column, if this is one.
    #[must_use]
    pub const fn as_typed(&self) -> Option<&TypedColumn> {
        match self {
            Self::Typed(c) => Some(c),
            Self::Object(_) => None,
        }
    }

    /// The typed column, mutably.
    pub fn as_typed_mut(&mut self) -> Option<&mut TypedColumn> {
        match self {
            Self::Typed(c) => Some(c),
            Self::Object(_) => None,
        }
    }

    /// The object column, if this is one.
    #[must_use]
    pub const fn as_object(&self) -> Option<&ObjectColumn> {
        match self {
            Self::Object(c) => Some(c),
            Self::Typed(_) => None,
        }
    }

    /// Ensures room for one more row.
    pub(crate) fn reserve_row(&mut self) -> StoreResult<()> {
        match self {
            Self::Typed(c) => c.grow_if_full(),
            Self::Object(c) => {
                c.values.reserve(1);
                Ok(())
            }
        }
    }

    pub(crate) fn push(&mut self, value: &ComponentValue) -> StoreResult<usize> {
        match (self, value) {
            (Self::Typed(c), ComponentValue::Data(v)) => c.append(v),
            (Self::Object(c), ComponentValue::Object(o)) => Ok(c.push(Arc::clone(o))),
            (Self::Typed(c), ComponentValue::Object(_)) => {
                Err(StoreError::KindMismatch(c.schema().name().to_owned()))
            }
            (Self::Object(_), ComponentValue::Data(_)) => Err(StoreError::KindMismatch("object".into())),
        }
    }

    pub(crate) fn set(&mut self, row: usize, value: &ComponentValue) -> StoreResult<()> {
        match (self, value) {
            (Self::Typed(c), ComponentValue::Data(v)) => c.set(row, v),
            (Self::Object(c), ComponentValue::Object(o)) => c.set(row, Arc::clone(o)),
            (Self::Typed(c), ComponentValue::Object(_)) => {
                Err(StoreError::KindMismatch(c.schema().name().to_owned()))
            }
            (Self::Object(_), ComponentValue::Data(_)) => Err(StoreError::KindMismatch("object".into())),
        }
    }

    pub(crate) fn get(&self, row: usize) -> StoreResult<ComponentValue> {
        match self {
            Self::Typed(c) => c.get(row).map(ComponentValue::Data),
            Self::Object(c) => c
                .get(row)
                .map(|o| ComponentValue::Object(Arc::clone(o)))
                .ok_or(StoreError::RowOutOfBounds { row, len: c.len() }),
        }
    }

    pub(crate) fn swap_remove(&mut self, row: usize) -> StoreResult<()> {
        match self {
            Self::Typed(c) => c.swap_remove(row),
            Self::Object(c) => c.swap_remove(row),
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::schema::{FieldType, LayoutRules};

    fn vec3_column() -> TypedColumn {
        TypedColumn::new(Schema::value("vec3", LayoutRules::Packed, FieldType::vec3f()).unwrap())
    }

    #[test]
    fn test_append_grows_from_zero() {
        let mut column = vec3_column();
        assert_eq!(column.capacity(), 0);
        column.append(&[1.0f32, 2.0, 3.0].into()).unwrap();
        assert_eq!(column.capacity(), 1);
        column.append(&[4.0f32, 5.0, 6.0].into()).unwrap();
        column.append(&[7.0f32, 8.0, 9.0].into()).unwrap();
        assert_eq!(column.capacity(), 4);
        assert_eq!(column.len(), 3);
        assert_eq!(column.bytes().len(), 36);
    }

    #[test]
    fn test_reserve_keeps_rows() {
        let mut column = vec3_column();
        column.append(&[1.0f32, 2.0, 3.0].into()).unwrap();
        column.reserve(10).unwrap();
        assert!(column.capacity() >= 11);
        assert_eq!(column.len(), 1);
        assert_eq!(column.get(0).unwrap(), Value::from([1.0f32, 2.0, 3.0]));
    }

    #[test]
    fn test_growth_factor_is_respected() {
        let schema = Schema::value("vec3", LayoutRules::Packed, FieldType::vec3f()).unwrap();
        let mut column = TypedColumn::with_capacity(schema, 2, 4);
        for i in 0..3u8 {
            column.append(&[f32::from(i); 3].into()).unwrap();
        }
        assert_eq!(column.capacity(), 8);
    }

    #[test]
    fn test_oversized_growth_factor_is_capped() {
        let schema = Schema::value("vec3", LayoutRules::Packed, FieldType::vec3f()).unwrap();
        let mut column = TypedColumn::with_capacity(schema, 16, 1 << 62);
        for i in 0..17u8 {
            column.append(&[f32::from(i); 3].into()).unwrap();
        }
        assert_eq!(column.capacity(), 16 * MAX_GROWTH_FACTOR);
        assert_eq!(column.get(16).unwrap(), Value::from([16.0f32; 3]));
    }

    #[test]
    fn test_reserve_past_addressable_size_fails() {
        let mut column = vec3_column();
        column.append(&[1.0f32, 2.0, 3.0].into()).unwrap();
        let token = column.token();

        let err = column.reserve(usize::MAX).unwrap_err();
        assert!(matches!(err, StoreError::CapacityOverflow { stride: 12, .. }));
        assert_eq!(column.len(), 1);
        assert_eq!(column.token(), token);

        let err = column.reserve(MAX_COLUMN_BYTES / 12 + 1).unwrap_err();
        assert!(matches!(err, StoreError::CapacityOverflow { .. }));
        assert_eq!(column.get(0).unwrap(), Value::from([1.0f32, 2.0, 3.0]));
    }

    #[test]
    fn test_get_and_set_bounds() {
        let mut column = vec3_column();
        column.append(&[1.0f32, 2.0, 3.0].into()).unwrap();
        assert_eq!(
            column.get(1).unwrap_err(),
            StoreError::RowOutOfBounds { row: 1, len: 1 }
        );
        assert!(column.set(1, &[0.0f32; 3].into()).is_err());
        column.set(0, &[9.0f32, 8.0, 7.0].into()).unwrap();
        assert_eq!(column.get(0).unwrap(), Value::from([9.0f32, 8.0, 7.0]));
    }

    #[test]
    fn test_rejected_append_leaves_column_unchanged() {
        let mut column = vec3_column();
        let before = column.token();
        assert!(column.append(&[1.0f32, 2.0].into()).is_err());
        assert_eq!(column.len(), 0);
        assert_eq!(column.token(), before);
    }

    #[test]
    fn test_swap_remove_moves_last_row() {
        let mut column = vec3_column();
        for v in [[1.0f32; 3], [2.0; 3], [3.0; 3]] {
            column.append(&v.into()).unwrap();
        }
        column.swap_remove(0).unwrap();
        assert_eq!(column.len(), 2);
        assert_eq!(column.get(0).unwrap(), Value::from([3.0f32; 3]));
        assert_eq!(column.get(1).unwrap(), Value::from([2.0f32; 3]));
    }

    #[test]
    fn test_pod_access() {
        let mut column = vec3_column();
        column.push_pod(&[1.0f32, 2.0, 3.0]).unwrap();
        assert_eq!(column.get_pod::<[f32; 3]>(0).unwrap(), [1.0, 2.0, 3.0]);
        column.set_pod(0, &[4.0f32, 5.0, 6.0]).unwrap();
        assert_eq!(column.view(0).unwrap().f32_array::<3>(0), Some([4.0, 5.0, 6.0]));
        assert_eq!(
            column.get_pod::<[f32; 4]>(0).unwrap_err(),
            StoreError::PodSizeMismatch { size: 16, stride: 12 }
        );
    }

    #[test]
    fn test_every_mutation_takes_a_new_token() {
        let mut column = vec3_column();
        let t0 = column.token();
        column.append(&[0.0f32; 3].into()).unwrap();
        let t1 = column.token();
        column.set(0, &[1.0f32; 3].into()).unwrap();
        let t2 = column.token();
        assert_ne!(t0, t1);
        assert_ne!(t1, t2);
        let _ = column.get(0).unwrap();
        assert_eq!(column.token(), t2);
    }

    #[test]
    fn test_object_column_swap_remove() {
        let mut column = ObjectColumn::new();
        column.push(Arc::new(1u32));
        column.push(Arc::new(2u32));
        column.swap_remove(0).unwrap();
        let moved = column.get(0).and_then(|o| o.downcast_ref::<u32>().copied());
        assert_eq!(moved, Some(2));
        assert!(column.swap_remove(5).is_err());
    }
}
