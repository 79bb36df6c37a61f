//! Fixed-width vectors backed by a single allocator buffer.
//!
//! One allocation holds both regions: the validity bitmap first, padded to a
//! multiple of 8 bytes, then `capacity * WIDTH` bytes of little-endian data.
//! Non-nullable vectors have no validity region at all. Growth allocates a new
//! combined buffer of twice the capacity and copies both regions across.

use std::marker::PhantomData;

use smallvec::SmallVec;
use tracing::debug;

use crate::allocator::RootAllocator;
use crate::bitmap;
use crate::buffer::Buffer;
use crate::common::{Clear, HeapSize, Len};
use crate::error::{Error, Result};
use crate::types::{FixedWidth, LogicalType};
use crate::vector::{ValueVector, VectorConfig};

/// A column of 32-bit integers.
pub type IntVector = FixedWidthVector<i32>;
/// A column of 8-bit integers.
pub type TinyIntVector = FixedWidthVector<i8>;

/// A nullable column of fixed-width values.
#[derive(Debug)]
pub struct FixedWidthVector<T: FixedWidth> {
    name: String,
    allocator: RootAllocator,
    config: VectorConfig,
    /// The owning handle of the combined allocation; `None` for slices and empty vectors.
    allocation: Option<Buffer>,
    validity: Option<Buffer>,
    data: Option<Buffer>,
    /// Bit position of row 0 within `validity`; non-zero only for slices.
    validity_offset: usize,
    capacity: usize,
    value_count: usize,
    _marker: PhantomData<T>,
}

impl<T: FixedWidth> FixedWidthVector<T> {
    /// An empty, non-nullable vector with the default initial capacity.
    pub fn new(name: impl Into<String>, allocator: RootAllocator) -> Self {
        Self::with_config(name, allocator, VectorConfig::default())
    }

    pub fn with_config(name: impl Into<String>, allocator: RootAllocator, config: VectorConfig) -> Self {
        Self {
            name: name.into(),
            allocator,
            config,
            allocation: None,
            validity: None,
            data: None,
            validity_offset: 0,
            capacity: 0,
            value_count: 0,
            _marker: PhantomData,
        }
    }

    pub fn config(&self) -> VectorConfig {
        self.config
    }

    /// The value at `index`. Null rows read as whatever was last stored there.
    #[inline]
    pub fn get(&self, index: usize) -> Result<T> {
        self.check(index, 1)?;
        T::read(self.data_region()?, index * T::WIDTH)
    }

    /// Stores `value` at `index` and marks the row valid.
    #[inline]
    pub fn set(&mut self, index: usize, value: T) -> Result<()> {
        self.check(index, 1)?;
        let data = self.data.as_mut().ok_or_else(|| Error::out_of_bounds(index, 1, 0))?;
        T::write(data, index * T::WIDTH, value)?;
        if let Some(validity) = self.validity.as_mut() {
            bitmap::set_bit(validity, self.validity_offset + index)?;
        }
        self.value_count = self.value_count.max(index + 1);
        Ok(())
    }

    /// Marks the row at `index` null.
    pub fn set_null(&mut self, index: usize) -> Result<()> {
        if !self.config.nullable {
            return Err(Error::UnsupportedOperation("cannot store a null in a non-nullable vector"));
        }
        self.check(index, 1)?;
        if let Some(validity) = self.validity.as_mut() {
            bitmap::unset_bit(validity, self.validity_offset + index)?;
        }
        self.value_count = self.value_count.max(index + 1);
        Ok(())
    }

    /// As `set`, growing first if `index` is past the capacity.
    pub fn set_safe(&mut self, index: usize, value: T) -> Result<()> {
        self.ensure_capacity(index + 1)?;
        self.set(index, value)
    }

    pub fn set_null_safe(&mut self, index: usize) -> Result<()> {
        if !self.config.nullable {
            return Err(Error::UnsupportedOperation("cannot store a null in a non-nullable vector"));
        }
        self.ensure_capacity(index + 1)?;
        self.set_null(index)
    }

    #[inline(always)]
    fn check(&self, index: usize, length: usize) -> Result<()> {
        match index.checked_add(length) {
            Some(end) if end <= self.capacity => Ok(()),
            _ => Err(Error::out_of_bounds(index, length, self.capacity)),
        }
    }

    fn data_region(&self) -> Result<&Buffer> {
        self.data.as_ref().ok_or_else(|| Error::out_of_bounds(0, 1, 0))
    }

    /// Bytes reserved for the validity region of a combined allocation.
    fn validity_len(&self, capacity: usize) -> usize {
        if self.config.nullable { bitmap::bitmap_len(capacity).next_multiple_of(8) } else { 0 }
    }

    /// Allocates one combined buffer for `capacity` values and carves it into regions.
    fn allocate_regions(&self, capacity: usize) -> Result<(Buffer, Option<Buffer>, Buffer)> {
        let validity_len = self.validity_len(capacity);
        let data_len = capacity.saturating_mul(T::WIDTH);
        let allocation = self.allocator.allocate(validity_len.saturating_add(data_len))?;
        let validity = if self.config.nullable { Some(allocation.slice(0, validity_len)?) } else { None };
        let data = allocation.slice(validity_len, data_len)?;
        Ok((allocation, validity, data))
    }

    fn install(&mut self, (allocation, validity, data): (Buffer, Option<Buffer>, Buffer), capacity: usize) {
        self.allocation = Some(allocation);
        self.validity = validity;
        self.data = Some(data);
        self.validity_offset = 0;
        self.capacity = capacity;
    }

    /// Drops all buffers, returning owned memory to the allocator.
    fn release(&mut self) {
        if let Some(mut allocation) = self.allocation.take() {
            allocation.close();
        }
        self.validity = None;
        self.data = None;
        self.validity_offset = 0;
        self.capacity = 0;
    }

    fn ensure_capacity(&mut self, required: usize) -> Result<()> {
        while self.capacity < required {
            self.re_alloc()?;
        }
        Ok(())
    }
}

impl FixedWidthVector<i32> {
    /// Writes `values` to rows `[index, index + values.len())`, whole SIMD lanes at a time.
    ///
    /// Behaves exactly like calling `set` for each value in turn.
    /// An empty `values` writes nothing and leaves the vector untouched.
    pub fn set_simd(&mut self, index: usize, values: &[i32]) -> Result<()> {
        if values.is_empty() {
            return Ok(());
        }
        self.check(index, values.len())?;
        let data = self.data.as_mut().ok_or_else(|| Error::out_of_bounds(index, values.len(), 0))?;
        let bulk = data.write_i32_lanes(index * 4, values)?;
        if let Some(validity) = self.validity.as_mut() {
            bitmap::set_range(validity, self.validity_offset + index, bulk)?;
        }
        for (offset, &value) in values[bulk ..].iter().enumerate() {
            self.set(index + bulk + offset, value)?;
        }
        self.value_count = self.value_count.max(index + values.len());
        Ok(())
    }

    /// As `set_simd`, growing first if the rows extend past the capacity.
    pub fn set_simd_safe(&mut self, index: usize, values: &[i32]) -> Result<()> {
        if values.is_empty() {
            return Ok(());
        }
        self.ensure_capacity(index + values.len())?;
        self.set_simd(index, values)
    }

    /// Reads rows `[index, index + values.len())` into `values`, whole SIMD lanes at a time.
    ///
    /// Behaves exactly like calling `get` for each row in turn.
    pub fn get_simd(&self, index: usize, values: &mut [i32]) -> Result<()> {
        if values.is_empty() {
            return Ok(());
        }
        self.check(index, values.len())?;
        let bulk = self.data_region()?.read_i32_lanes(index * 4, values)?;
        for (offset, value) in values[bulk ..].iter_mut().enumerate() {
            *value = self.get(index + bulk + offset)?;
        }
        Ok(())
    }
}

impl<T: FixedWidth> ValueVector for FixedWidthVector<T> {
    type Value = T;

    fn name(&self) -> &str { &self.name }
    fn set_name(&mut self, name: &str) { self.name = name.to_string(); }
    fn logical_type(&self) -> LogicalType { T::LOGICAL_TYPE }
    fn allocator(&self) -> &RootAllocator { &self.allocator }

    fn allocate_new(&mut self) -> Result<()> {
        self.close();
        let capacity = self.config.initial_capacity;
        let regions = self.allocate_regions(capacity)?;
        self.install(regions, capacity);
        debug!(vector = %self.name, kind = T::LOGICAL_TYPE.name(), capacity, "allocated vector");
        Ok(())
    }

    fn allocate_new_safe(&mut self) -> bool {
        self.allocate_new().is_ok()
    }

    fn re_alloc(&mut self) -> Result<()> {
        if self.data.is_none() {
            let capacity = self.config.initial_capacity.max(1);
            let regions = self.allocate_regions(capacity)?;
            self.install(regions, capacity);
            debug!(vector = %self.name, capacity, "allocated vector on first growth");
            return Ok(());
        }
        let old_capacity = self.capacity;
        let capacity = old_capacity.saturating_mul(2).max(1);
        let (allocation, mut validity, mut data) = self.allocate_regions(capacity)?;
        if let Some(old) = self.data.as_ref() {
            data.set_bytes_from(0, old, 0, old.capacity())?;
        }
        if let (Some(new), Some(old)) = (validity.as_mut(), self.validity.as_ref()) {
            bitmap::copy_bits(new, 0, old, self.validity_offset, old_capacity)?;
        }
        self.release();
        self.install((allocation, validity, data), capacity);
        debug!(vector = %self.name, old_capacity, capacity, "grew vector");
        Ok(())
    }

    fn set_initial_capacity(&mut self, capacity: usize) {
        self.config.initial_capacity = capacity;
    }

    fn value_capacity(&self) -> usize { self.capacity }
    fn value_count(&self) -> usize { self.value_count }

    fn set_value_count(&mut self, value_count: usize) -> Result<()> {
        self.ensure_capacity(value_count)?;
        self.value_count = value_count;
        Ok(())
    }

    fn is_nullable(&self) -> bool { self.config.nullable }

    fn set_nullable(&mut self, nullable: bool) -> Result<()> {
        if self.data.is_some() {
            return Err(Error::UnsupportedOperation("nullability can only change before allocation"));
        }
        self.config.nullable = nullable;
        Ok(())
    }

    fn is_null(&self, index: usize) -> Result<bool> {
        if !self.config.nullable {
            return Ok(false);
        }
        self.check(index, 1)?;
        match self.validity.as_ref() {
            Some(validity) => Ok(!bitmap::get_bit(validity, self.validity_offset + index)?),
            None => Ok(false),
        }
    }

    fn null_count(&self) -> Result<usize> {
        match self.validity.as_ref() {
            Some(validity) => bitmap::null_count_at(validity, self.validity_offset, self.value_count),
            None => Ok(0),
        }
    }

    fn get_object(&self, index: usize) -> Result<Option<T>> {
        if self.is_null(index)? {
            return Ok(None);
        }
        self.get(index).map(Some)
    }

    fn set_object(&mut self, index: usize, value: Option<T>) -> Result<()> {
        match value {
            Some(value) => self.set(index, value),
            None => self.set_null(index),
        }
    }

    fn set_object_safe(&mut self, index: usize, value: Option<T>) -> Result<()> {
        match value {
            Some(value) => self.set_safe(index, value),
            None => self.set_null_safe(index),
        }
    }

    fn copy_from(&mut self, from_index: usize, this_index: usize, from: &Self) -> Result<()> {
        let value = from.get_object(from_index)?;
        self.set_object(this_index, value)
    }

    fn copy_from_safe(&mut self, from_index: usize, this_index: usize, from: &Self) -> Result<()> {
        let value = from.get_object(from_index)?;
        self.set_object_safe(this_index, value)
    }

    fn copy_subset(&self, from_index: usize, to_index: usize, target: &mut Self, target_index: usize) -> Result<()> {
        if from_index > to_index {
            return Err(Error::out_of_bounds(from_index, 0, to_index));
        }
        let length = to_index - from_index;
        self.check(from_index, length)?;
        target.check(target_index, length)?;
        if length > 0 {
            let nulls = match self.validity.as_ref() {
                Some(validity) => bitmap::null_count_at(validity, self.validity_offset + from_index, length)?,
                None => 0,
            };
            if nulls > 0 && !target.config.nullable {
                return Err(Error::UnsupportedOperation("cannot copy nulls into a non-nullable vector"));
            }
            let source = self.data_region()?;
            let data = target.data.as_mut().ok_or_else(|| Error::out_of_bounds(target_index, length, 0))?;
            data.set_bytes_from(target_index * T::WIDTH, source, from_index * T::WIDTH, length * T::WIDTH)?;
            if let Some(validity) = target.validity.as_mut() {
                let position = target.validity_offset + target_index;
                match self.validity.as_ref() {
                    Some(source) => bitmap::copy_bits(validity, position, source, self.validity_offset + from_index, length)?,
                    None => bitmap::set_range(validity, position, length)?,
                }
            }
        }
        target.value_count = target.value_count.max(target_index + length);
        Ok(())
    }

    fn transfer_to(&mut self, target: &mut Self) {
        target.close();
        target.allocation = self.allocation.take();
        target.validity = self.validity.take();
        target.data = self.data.take();
        target.validity_offset = self.validity_offset;
        target.capacity = self.capacity;
        target.value_count = self.value_count;
        target.config.nullable = self.config.nullable;
        self.release();
        self.value_count = 0;
        debug!(from = %self.name, to = %target.name, value_count = target.value_count, "transferred vector");
    }

    fn slice(&self, start: usize, end: usize) -> Result<Self> {
        if start > end {
            return Err(Error::out_of_bounds(start, 0, end));
        }
        let length = end - start;
        self.check(start, length)?;
        let mut slice = Self::with_config(format!("{}[{},{}]", self.name, start, end), self.allocator.clone(), self.config);
        if let Some(data) = self.data.as_ref() {
            slice.data = Some(data.slice(start * T::WIDTH, length * T::WIDTH)?);
            if let Some(validity) = self.validity.as_ref() {
                let bit = self.validity_offset + start;
                slice.validity = Some(validity.slice(bit / 8, bitmap::bitmap_len(bit % 8 + length))?);
                slice.validity_offset = bit % 8;
            }
            slice.capacity = length;
            slice.value_count = length;
        }
        Ok(slice)
    }

    fn get_new_vector(&self, name: &str) -> Self {
        Self::with_config(name, self.allocator.clone(), self.config)
    }

    fn buffer_size(&self) -> usize {
        self.buffer_size_for(self.value_count)
    }

    fn buffer_size_for(&self, value_count: usize) -> usize {
        let validity = if self.config.nullable { bitmap::bitmap_len(value_count) } else { 0 };
        validity + value_count * T::WIDTH
    }

    fn buffers(&mut self, clear: bool) -> SmallVec<[Buffer; 2]> {
        let mut buffers = SmallVec::new();
        if clear {
            // The owning handle is dropped without closing: the budget is returned
            // once the last of the returned buffers is dropped.
            self.allocation = None;
            buffers.extend(self.validity.take());
            buffers.extend(self.data.take());
            self.release();
            self.value_count = 0;
        } else {
            for buffer in [self.validity.as_ref(), self.data.as_ref()].into_iter().flatten() {
                if let Ok(view) = buffer.slice(0, buffer.capacity()) {
                    buffers.push(view);
                }
            }
        }
        buffers
    }

    fn validity_buffer(&self) -> Option<&Buffer> { self.validity.as_ref() }
    fn data_buffer(&self) -> Option<&Buffer> { self.data.as_ref() }
    fn offset_buffer(&self) -> Option<&Buffer> { None }

    fn close(&mut self) {
        if self.data.is_some() {
            debug!(vector = %self.name, capacity = self.capacity, "closed vector");
        }
        self.release();
        self.value_count = 0;
    }
}

impl<T: FixedWidth> Len for FixedWidthVector<T> {
    #[inline(always)] fn len(&self) -> usize { self.value_count }
}

impl<T: FixedWidth> Clear for FixedWidthVector<T> {
    fn clear(&mut self) { self.close() }
}

impl<T: FixedWidth> HeapSize for FixedWidthVector<T> {
    fn heap_size(&self) -> (usize, usize) {
        let held = match self.allocation.as_ref() {
            Some(allocation) => allocation.capacity(),
            None => self.validity.as_ref().map_or(0, Buffer::capacity) + self.data.as_ref().map_or(0, Buffer::capacity),
        };
        (self.buffer_size(), held)
    }
}
