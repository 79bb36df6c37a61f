//! Variable-width text vectors.
//!
//! Text is held on the heap as one optional string per slot. There is no
//! validity bitmap: a `None` slot is a null. The allocator is carried so that
//! vectors made by `get_new_vector` share it, but text is not charged to it.

use smallvec::SmallVec;
use tracing::debug;

use crate::allocator::RootAllocator;
use crate::buffer::Buffer;
use crate::common::{Clear, HeapSize, Len};
use crate::error::{Error, Result};
use crate::types::LogicalType;
use crate::vector::{ValueVector, VectorConfig};

/// A column of UTF-8 strings, nullable unless configured otherwise.
#[derive(Debug)]
pub struct VarCharVector {
    name: String,
    allocator: RootAllocator,
    config: VectorConfig,
    /// One entry per unit of capacity.
    slots: Vec<Option<String>>,
    allocated: bool,
    value_count: usize,
}

impl VarCharVector {
    pub fn new(name: impl Into<String>, allocator: RootAllocator) -> Self {
        Self::with_config(name, allocator, VectorConfig::default().with_nullable(true))
    }

    pub fn with_config(name: impl Into<String>, allocator: RootAllocator, config: VectorConfig) -> Self {
        Self {
            name: name.into(),
            allocator,
            config,
            slots: Vec::new(),
            allocated: false,
            value_count: 0,
        }
    }

    pub fn config(&self) -> VectorConfig {
        self.config
    }

    /// The string at `index`, or `None` if it is null or was never written.
    /// Reads row `index`. Unwritten rows of a non-nullable vector read as `""`.
    pub fn get(&self, index: usize) -> Result<Option<&str>> {
        let slot = self.slot(index)?;
        if self.is_null_slot(slot) {
            return Ok(None);
        }
        Ok(Some(slot.as_deref().unwrap_or_default()))
    }

    pub fn set(&mut self, index: usize, value: &str) -> Result<()> {
        self.store(index, Some(value.to_string()))
    }

    pub fn set_safe(&mut self, index: usize, value: &str) -> Result<()> {
        self.ensure_capacity(index + 1)?;
        self.set(index, value)
    }

    pub fn set_null(&mut self, index: usize) -> Result<()> {
        if !self.config.nullable {
            return Err(Error::UnsupportedOperation("cannot store a null in a non-nullable vector"));
        }
        self.store(index, None)
    }

    pub fn set_null_safe(&mut self, index: usize) -> Result<()> {
        if !self.config.nullable {
            return Err(Error::UnsupportedOperation("cannot store a null in a non-nullable vector"));
        }
        self.ensure_capacity(index + 1)?;
        self.set_null(index)
    }

    fn slot(&self, index: usize) -> Result<&Option<String>> {
        self.slots.get(index).ok_or_else(|| Error::out_of_bounds(index, 1, self.slots.len()))
    }

    fn store(&mut self, index: usize, value: Option<String>) -> Result<()> {
        let capacity = self.slots.len();
        let slot = self.slots.get_mut(index).ok_or_else(|| Error::out_of_bounds(index, 1, capacity))?;
        *slot = value;
        self.value_count = self.value_count.max(index + 1);
        Ok(())
    }

    fn ensure_capacity(&mut self, required: usize) -> Result<()> {
        while self.slots.len() < required {
            self.re_alloc()?;
        }
        Ok(())
    }

    fn is_null_slot(&self, slot: &Option<String>) -> bool {
        self.config.nullable && slot.is_none()
    }
}

impl ValueVector for VarCharVector {
    type Value = String;

    fn name(&self) -> &str { &self.name }
    fn set_name(&mut self, name: &str) { self.name = name.to_string(); }
    fn logical_type(&self) -> LogicalType { LogicalType::Utf8 }
    fn allocator(&self) -> &RootAllocator { &self.allocator }

    fn allocate_new(&mut self) -> Result<()> {
        self.close();
        self.slots = vec![None; self.config.initial_capacity];
        self.allocated = true;
        debug!(vector = %self.name, kind = "utf8", capacity = self.slots.len(), "allocated vector");
        Ok(())
    }

    fn allocate_new_safe(&mut self) -> bool {
        self.allocate_new().is_ok()
    }

    fn re_alloc(&mut self) -> Result<()> {
        let old_capacity = self.slots.len();
        let capacity = if self.allocated { old_capacity.saturating_mul(2).max(1) } else { self.config.initial_capacity.max(1) };
        self.slots.resize(capacity, None);
        self.allocated = true;
        debug!(vector = %self.name, old_capacity, capacity, "grew vector");
        Ok(())
    }

    fn set_initial_capacity(&mut self, capacity: usize) {
        self.config.initial_capacity = capacity;
    }

    fn value_capacity(&self) -> usize { self.slots.len() }
    fn value_count(&self) -> usize { self.value_count }

    fn set_value_count(&mut self, value_count: usize) -> Result<()> {
        self.ensure_capacity(value_count)?;
        self.value_count = value_count;
        Ok(())
    }

    fn is_nullable(&self) -> bool { self.config.nullable }

    fn set_nullable(&mut self, nullable: bool) -> Result<()> {
        if self.allocated {
            return Err(Error::UnsupportedOperation("nullability can only change before allocation"));
        }
        self.config.nullable = nullable;
        Ok(())
    }

    fn is_null(&self, index: usize) -> Result<bool> {
        if !self.config.nullable {
            return Ok(false);
        }
        Ok(self.slot(index)?.is_none())
    }

    fn null_count(&self) -> Result<usize> {
        let slots = self.slots.get(.. self.value_count).unwrap_or(&[]);
        Ok(slots.iter().filter(|slot| self.is_null_slot(slot)).count())
    }

    fn get_object(&self, index: usize) -> Result<Option<String>> {
        Ok(self.get(index)?.map(str::to_string))
    }

    fn set_object(&mut self, index: usize, value: Option<String>) -> Result<()> {
        match value {
            Some(value) => self.store(index, Some(value)),
            None => self.set_null(index),
        }
    }

    fn set_object_safe(&mut self, index: usize, value: Option<String>) -> Result<()> {
        self.ensure_capacity(index + 1)?;
        self.set_object(index, value)
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
        let source = self.slots.get(from_index .. to_index)
            .ok_or_else(|| Error::out_of_bounds(from_index, to_index.saturating_sub(from_index), self.slots.len()))?;
        let capacity = target.slots.len();
        let destination = target.slots.get_mut(target_index .. target_index + source.len())
            .ok_or_else(|| Error::out_of_bounds(target_index, source.len(), capacity))?;
        if !target.config.nullable && source.iter().any(|slot| self.is_null_slot(slot)) {
            return Err(Error::UnsupportedOperation("cannot copy nulls into a non-nullable vector"));
        }
        for (slot, value) in destination.iter_mut().zip(source) {
            *slot = if self.is_null_slot(value) { None } else { Some(value.clone().unwrap_or_default()) };
        }
        target.value_count = target.value_count.max(target_index + source.len());
        Ok(())
    }

    fn transfer_to(&mut self, target: &mut Self) {
        target.close();
        target.slots = std::mem::take(&mut self.slots);
        target.allocated = self.allocated;
        target.value_count = self.value_count;
        target.config.nullable = self.config.nullable;
        self.allocated = false;
        self.value_count = 0;
        debug!(from = %self.name, to = %target.name, value_count = target.value_count, "transferred vector");
    }

    /// Text slices copy their rows.
    fn slice(&self, start: usize, end: usize) -> Result<Self> {
        let rows = self.slots.get(start .. end)
            .ok_or_else(|| Error::out_of_bounds(start, end.saturating_sub(start), self.slots.len()))?;
        let mut slice = Self::with_config(format!("{}[{},{}]", self.name, start, end), self.allocator.clone(), self.config);
        slice.slots = rows.to_vec();
        slice.allocated = self.allocated;
        slice.value_count = rows.len();
        Ok(slice)
    }

    fn get_new_vector(&self, name: &str) -> Self {
        Self::with_config(name, self.allocator.clone(), self.config)
    }

    fn buffer_size(&self) -> usize {
        self.buffer_size_for(self.value_count)
    }

    /// Total bytes of text in the first `value_count` rows.
    fn buffer_size_for(&self, value_count: usize) -> usize {
        self.slots.iter().take(value_count).flatten().map(String::len).sum()
    }

    fn buffers(&mut self, clear: bool) -> SmallVec<[Buffer; 2]> {
        if clear {
            self.close();
        }
        SmallVec::new()
    }

    fn validity_buffer(&self) -> Option<&Buffer> { None }
    fn data_buffer(&self) -> Option<&Buffer> { None }
    fn offset_buffer(&self) -> Option<&Buffer> { None }

    fn close(&mut self) {
        if self.allocated {
            debug!(vector = %self.name, capacity = self.slots.len(), "closed vector");
        }
        self.slots = Vec::new();
        self.allocated = false;
        self.value_count = 0;
    }
}

impl Len for VarCharVector {
    #[inline(always)] fn len(&self) -> usize { self.value_count }
}

impl Clear for VarCharVector {
    fn clear(&mut self) { self.close() }
}

impl HeapSize for VarCharVector {
    fn heap_size(&self) -> (usize, usize) {
        self.slots.heap_size()
    }
}
