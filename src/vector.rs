//! The capability set every typed column implements.

use smallvec::SmallVec;

use crate::allocator::RootAllocator;
use crate::buffer::Buffer;
use crate::common::{Clear, HeapSize, Len};
use crate::error::Result;
use crate::types::LogicalType;

/// Values allocated by `allocate_new` when no other capacity is configured.
pub const DEFAULT_INITIAL_CAPACITY: usize = 4096;

/// Construction-time settings for a vector.
#[derive(Copy, Clone, Debug, PartialEq, Eq)]
#[cfg_attr(feature = "serde", derive(serde::Serialize, serde::Deserialize))]
pub struct VectorConfig {
    /// Number of values `allocate_new` makes room for.
    pub initial_capacity: usize,
    /// Whether the vector tracks nulls.
    pub nullable: bool,
}

impl Default for VectorConfig {
    fn default() -> Self {
        Self { initial_capacity: DEFAULT_INITIAL_CAPACITY, nullable: false }
    }
}

impl VectorConfig {
    pub fn with_initial_capacity(mut self, initial_capacity: usize) -> Self {
        self.initial_capacity = initial_capacity;
        self
    }
    pub fn with_nullable(mut self, nullable: bool) -> Self {
        self.nullable = nullable;
        self
    }
}

/// A growable, nullable column of values of one kind.
///
/// A vector starts out without memory. `allocate_new` makes room for the
/// configured initial capacity; the `_safe` writers grow by doubling when an
/// index lands past the capacity; `close` gives the memory back. Accessors
/// check indexes against the capacity, and writes raise the value count to
/// cover the written index.
///
/// Vectors are single-threaded: callers must not mutate one vector from two
/// places at once, nor read it while it grows or closes.
pub trait ValueVector: Len + Clear + HeapSize + Sized {
    /// The non-null element type.
    type Value;

    fn name(&self) -> &str;
    fn set_name(&mut self, name: &str);
    fn logical_type(&self) -> LogicalType;
    fn allocator(&self) -> &RootAllocator;

    /// Allocates room for the initial capacity, releasing any previous memory.
    fn allocate_new(&mut self) -> Result<()>;
    /// As `allocate_new`, reporting failure as `false`.
    fn allocate_new_safe(&mut self) -> bool;
    /// Doubles the capacity, preserving values and validity.
    fn re_alloc(&mut self) -> Result<()>;
    /// The capacity used by the next `allocate_new`.
    fn set_initial_capacity(&mut self, capacity: usize);

    fn value_capacity(&self) -> usize;
    fn value_count(&self) -> usize;
    /// Sets the number of populated rows, growing if needed.
    fn set_value_count(&mut self, value_count: usize) -> Result<()>;

    fn is_nullable(&self) -> bool;
    /// Changes nullability. Only allowed while no memory is held.
    fn set_nullable(&mut self, nullable: bool) -> Result<()>;
    /// Always `false` for a non-nullable vector.
    fn is_null(&self, index: usize) -> Result<bool>;
    /// The number of nulls in `[0, value_count)`.
    fn null_count(&self) -> Result<usize>;

    /// The value at `index`, or `None` if it is null.
    fn get_object(&self, index: usize) -> Result<Option<Self::Value>>;
    /// Writes a value, or a null for `None`.
    fn set_object(&mut self, index: usize, value: Option<Self::Value>) -> Result<()>;
    fn set_object_safe(&mut self, index: usize, value: Option<Self::Value>) -> Result<()>;

    /// Copies the value (or null) at `from_index` of `from` to `this_index`.
    fn copy_from(&mut self, from_index: usize, this_index: usize, from: &Self) -> Result<()>;
    fn copy_from_safe(&mut self, from_index: usize, this_index: usize, from: &Self) -> Result<()>;
    /// Copies rows `[from_index, to_index)` into `target` starting at `target_index`.
    ///
    /// The target is not grown, and its value count is never lowered.
    fn copy_subset(&self, from_index: usize, to_index: usize, target: &mut Self, target_index: usize) -> Result<()>;
    /// Moves all memory and contents into `target`, leaving `self` empty.
    fn transfer_to(&mut self, target: &mut Self);
    /// A vector over rows `[start, end)` that shares memory with `self` where the kind allows.
    fn slice(&self, start: usize, end: usize) -> Result<Self>;
    /// An empty vector of the same kind, configuration, and allocator.
    fn get_new_vector(&self, name: &str) -> Self;

    /// Bytes needed to hold the current value count.
    fn buffer_size(&self) -> usize;
    /// Bytes needed to hold `value_count` values.
    fn buffer_size_for(&self, value_count: usize) -> usize;
    /// The buffers backing this vector, validity first. With `clear`, the vector
    /// gives them up and becomes empty; their memory then lives as long as they do.
    fn buffers(&mut self, clear: bool) -> SmallVec<[Buffer; 2]>;
    fn validity_buffer(&self) -> Option<&Buffer>;
    fn data_buffer(&self) -> Option<&Buffer>;
    /// Offsets into a variable-width data region; none of the current kinds use one.
    fn offset_buffer(&self) -> Option<&Buffer>;

    /// Releases all memory. The vector may be allocated again afterwards.
    fn close(&mut self);

    /// Iterates over `[0, value_count)`.
    fn iter(&self) -> Iter<'_, Self> {
        Iter { vector: self, index: 0, end: self.value_count() }
    }
}

/// Values of a vector in row order, `None` for nulls.
pub struct Iter<'a, V> {
    vector: &'a V,
    index: usize,
    end: usize,
}

impl<'a, V: ValueVector> Iterator for Iter<'a, V> {
    type Item = Option<V::Value>;
    fn next(&mut self) -> Option<Self::Item> {
        if self.index >= self.end {
            return None;
        }
        let value = self.vector.get_object(self.index).ok()?;
        self.index += 1;
        Some(value)
    }
    fn size_hint(&self) -> (usize, Option<usize>) {
        let remaining = self.end - self.index;
        (remaining, Some(remaining))
    }
}

impl<'a, V: ValueVector> ExactSizeIterator for Iter<'a, V> { }

#[cfg(test)]
mod test {
    use super::{VectorConfig, DEFAULT_INITIAL_CAPACITY};

    #[test]
    fn config() {
        let config = VectorConfig::default();
        assert_eq!(config.initial_capacity, DEFAULT_INITIAL_CAPACITY);
        assert!(!config.nullable);
        let config = config.with_initial_capacity(8).with_nullable(true);
        assert_eq!(config, VectorConfig { initial_capacity: 8, nullable: true });
    }

    #[cfg(feature = "serde")]
    #[test]
    fn config_serde() {
        let json = serde_json::to_string(&VectorConfig::default()).unwrap();
        assert_eq!(json, r#"{"initial_capacity":4096,"nullable":false}"#);
        let back: VectorConfig = serde_json::from_str(&json).unwrap();
        assert_eq!(back, VectorConfig::default());
    }
}
