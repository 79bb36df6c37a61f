//! Columnar value vectors over allocator-budgeted memory.
//!
//! A [`RootAllocator`] hands out zeroed [`Buffer`]s against a byte budget.
//! Typed vectors lay their rows out contiguously in those buffers: a validity
//! bitmap marking non-null rows, followed by the fixed-width data itself.
//! Vectors grow by doubling, slice without copying, and move their memory to
//! other vectors wholesale. The 32-bit integer vector adds bulk reads and writes
//! that move whole SIMD lanes at a time.
//!
//! ```
//! use sword::{IntVector, RootAllocator, ValueVector};
//!
//! let allocator = RootAllocator::new(1 << 20);
//! let mut vector = IntVector::new("ints", allocator);
//! vector.allocate_new().unwrap();
//! vector.set_simd(0, &(0 .. 1000).collect::<Vec<_>>()).unwrap();
//! assert_eq!(vector.get(500), Ok(500));
//!
//! let slice = vector.slice(100, 200).unwrap();
//! assert_eq!(slice.get(0), Ok(100));
//! ```
//!
//! Buffers and vectors are single-threaded; only the allocator may be shared
//! between threads.

pub mod allocator;
pub mod bitmap;
pub mod buffer;
pub mod column_vector;
pub mod common;
pub mod error;
pub mod field;
pub mod primitive;
pub mod simd;
pub mod string;
pub mod types;
pub mod vector;

pub use allocator::RootAllocator;
pub use buffer::Buffer;
pub use column_vector::{ColumnVector, Field, RecordBatch, Schema};
pub use common::{Clear, HeapSize, Len};
pub use error::{Error, Result};
pub use field::FieldVector;
pub use primitive::{FixedWidthVector, IntVector, TinyIntVector};
pub use string::VarCharVector;
pub use types::{FixedWidth, LogicalType, Value};
pub use vector::{ValueVector, VectorConfig};
