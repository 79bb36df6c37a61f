//! A closed union over the supported vector kinds.
//!
//! Operations combining two vectors, or a vector and a [`Value`], succeed only
//! when both sides are the same kind and report [`Error::TypeMismatch`] otherwise.

use crate::allocator::RootAllocator;
use crate::common::{Clear, HeapSize, Len};
use crate::error::{Error, Result};
use crate::primitive::{IntVector, TinyIntVector};
use crate::string::VarCharVector;
use crate::types::{LogicalType, Value};
use crate::vector::{ValueVector, VectorConfig};

/// A vector of any supported kind.
#[derive(Debug)]
pub enum FieldVector {
    Int(IntVector),
    TinyInt(TinyIntVector),
    Utf8(VarCharVector),
}

macro_rules! dispatch {
    ($vector:expr, $inner:ident => $body:expr) => {
        match $vector {
            FieldVector::Int($inner) => $body,
            FieldVector::TinyInt($inner) => $body,
            FieldVector::Utf8($inner) => $body,
        }
    };
}

impl FieldVector {
    /// An empty vector of `kind` with that kind's default configuration.
    pub fn new(name: impl Into<String>, kind: LogicalType, allocator: RootAllocator) -> Self {
        match kind {
            LogicalType::Int32 => FieldVector::Int(IntVector::new(name, allocator)),
            LogicalType::TinyInt => FieldVector::TinyInt(TinyIntVector::new(name, allocator)),
            LogicalType::Utf8 => FieldVector::Utf8(VarCharVector::new(name, allocator)),
        }
    }

    pub fn with_config(name: impl Into<String>, kind: LogicalType, allocator: RootAllocator, config: VectorConfig) -> Self {
        match kind {
            LogicalType::Int32 => FieldVector::Int(IntVector::with_config(name, allocator, config)),
            LogicalType::TinyInt => FieldVector::TinyInt(TinyIntVector::with_config(name, allocator, config)),
            LogicalType::Utf8 => FieldVector::Utf8(VarCharVector::with_config(name, allocator, config)),
        }
    }

    pub fn logical_type(&self) -> LogicalType { dispatch!(self, v => v.logical_type()) }
    pub fn name(&self) -> &str { dispatch!(self, v => v.name()) }
    pub fn value_count(&self) -> usize { dispatch!(self, v => v.value_count()) }
    pub fn value_capacity(&self) -> usize { dispatch!(self, v => v.value_capacity()) }
    pub fn is_nullable(&self) -> bool { dispatch!(self, v => v.is_nullable()) }
    pub fn is_null(&self, index: usize) -> Result<bool> { dispatch!(self, v => v.is_null(index)) }
    pub fn null_count(&self) -> Result<usize> { dispatch!(self, v => v.null_count()) }

    pub fn allocate_new(&mut self) -> Result<()> { dispatch!(self, v => v.allocate_new()) }
    pub fn re_alloc(&mut self) -> Result<()> { dispatch!(self, v => v.re_alloc()) }
    pub fn set_value_count(&mut self, value_count: usize) -> Result<()> { dispatch!(self, v => v.set_value_count(value_count)) }
    pub fn close(&mut self) { dispatch!(self, v => v.close()) }

    /// The value at `index`, or `None` if it is null.
    pub fn get_object(&self, index: usize) -> Result<Option<Value>> {
        match self {
            FieldVector::Int(v) => Ok(v.get_object(index)?.map(Value::Int)),
            FieldVector::TinyInt(v) => Ok(v.get_object(index)?.map(Value::TinyInt)),
            FieldVector::Utf8(v) => Ok(v.get_object(index)?.map(Value::Utf8)),
        }
    }

    /// Writes `value`, or a null for `None`. The value must match this vector's kind.
    pub fn set_object(&mut self, index: usize, value: Option<Value>) -> Result<()> {
        self.store("set_object", index, value, false)
    }

    /// As `set_object`, growing first if `index` is past the capacity.
    pub fn set_object_safe(&mut self, index: usize, value: Option<Value>) -> Result<()> {
        self.store("set_object_safe", index, value, true)
    }

    fn store(&mut self, operation: &'static str, index: usize, value: Option<Value>, safe: bool) -> Result<()> {
        match (self, value) {
            (FieldVector::Int(v), Some(Value::Int(x))) => write(v, index, Some(x), safe),
            (FieldVector::TinyInt(v), Some(Value::TinyInt(x))) => write(v, index, Some(x), safe),
            (FieldVector::Utf8(v), Some(Value::Utf8(x))) => write(v, index, Some(x), safe),
            (vector, None) => dispatch!(vector, v => write(v, index, None, safe)),
            (vector, Some(value)) => Err(Error::TypeMismatch {
                operation,
                expected: vector.logical_type(),
                found: value.logical_type(),
            }),
        }
    }

    pub fn copy_from(&mut self, from_index: usize, this_index: usize, from: &FieldVector) -> Result<()> {
        match (self, from) {
            (FieldVector::Int(a), FieldVector::Int(b)) => a.copy_from(from_index, this_index, b),
            (FieldVector::TinyInt(a), FieldVector::TinyInt(b)) => a.copy_from(from_index, this_index, b),
            (FieldVector::Utf8(a), FieldVector::Utf8(b)) => a.copy_from(from_index, this_index, b),
            (this, from) => Err(mismatch("copy_from", this, from)),
        }
    }

    pub fn copy_from_safe(&mut self, from_index: usize, this_index: usize, from: &FieldVector) -> Result<()> {
        match (self, from) {
            (FieldVector::Int(a), FieldVector::Int(b)) => a.copy_from_safe(from_index, this_index, b),
            (FieldVector::TinyInt(a), FieldVector::TinyInt(b)) => a.copy_from_safe(from_index, this_index, b),
            (FieldVector::Utf8(a), FieldVector::Utf8(b)) => a.copy_from_safe(from_index, this_index, b),
            (this, from) => Err(mismatch("copy_from_safe", this, from)),
        }
    }

    pub fn copy_subset(&self, from_index: usize, to_index: usize, target: &mut FieldVector, target_index: usize) -> Result<()> {
        match (self, target) {
            (FieldVector::Int(a), FieldVector::Int(b)) => a.copy_subset(from_index, to_index, b, target_index),
            (FieldVector::TinyInt(a), FieldVector::TinyInt(b)) => a.copy_subset(from_index, to_index, b, target_index),
            (FieldVector::Utf8(a), FieldVector::Utf8(b)) => a.copy_subset(from_index, to_index, b, target_index),
            (this, target) => Err(mismatch("copy_subset", target, this)),
        }
    }

    /// Moves all contents into `target`, which must be the same kind.
    pub fn transfer_to(&mut self, target: &mut FieldVector) -> Result<()> {
        match (self, target) {
            (FieldVector::Int(a), FieldVector::Int(b)) => a.transfer_to(b),
            (FieldVector::TinyInt(a), FieldVector::TinyInt(b)) => a.transfer_to(b),
            (FieldVector::Utf8(a), FieldVector::Utf8(b)) => a.transfer_to(b),
            (this, target) => return Err(mismatch("transfer_to", target, this)),
        }
        Ok(())
    }

    pub fn slice(&self, start: usize, end: usize) -> Result<FieldVector> {
        Ok(match self {
            FieldVector::Int(v) => FieldVector::Int(v.slice(start, end)?),
            FieldVector::TinyInt(v) => FieldVector::TinyInt(v.slice(start, end)?),
            FieldVector::Utf8(v) => FieldVector::Utf8(v.slice(start, end)?),
        })
    }

    pub fn get_new_vector(&self, name: &str) -> FieldVector {
        match self {
            FieldVector::Int(v) => FieldVector::Int(v.get_new_vector(name)),
            FieldVector::TinyInt(v) => FieldVector::TinyInt(v.get_new_vector(name)),
            FieldVector::Utf8(v) => FieldVector::Utf8(v.get_new_vector(name)),
        }
    }
}

fn write<V: ValueVector>(vector: &mut V, index: usize, value: Option<V::Value>, safe: bool) -> Result<()> {
    if safe { vector.set_object_safe(index, value) } else { vector.set_object(index, value) }
}

/// `expected` is the kind of the vector being written to.
fn mismatch(operation: &'static str, expected: &FieldVector, found: &FieldVector) -> Error {
    Error::TypeMismatch { operation, expected: expected.logical_type(), found: found.logical_type() }
}

impl From<IntVector> for FieldVector { fn from(v: IntVector) -> Self { FieldVector::Int(v) } }
impl From<TinyIntVector> for FieldVector { fn from(v: TinyIntVector) -> Self { FieldVector::TinyInt(v) } }
impl From<VarCharVector> for FieldVector { fn from(v: VarCharVector) -> Self { FieldVector::Utf8(v) } }

impl Len for FieldVector {
    fn len(&self) -> usize { dispatch!(self, v => v.len()) }
}
impl Clear for FieldVector {
    fn clear(&mut self) { dispatch!(self, v => v.clear()) }
}
impl HeapSize for FieldVector {
    fn heap_size(&self) -> (usize, usize) { dispatch!(self, v => v.heap_size()) }
}
