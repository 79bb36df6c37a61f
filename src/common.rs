//! Common traits that are re-used throughout the crate.

/// A type with a length.
///
/// For vectors the length is the value count, the number of logically populated rows.
pub trait Len {
    /// The number of contained elements.
    fn len(&self) -> usize;
    /// Whether this contains no elements.
    fn is_empty(&self) -> bool {
        self.len() == 0
    }
}
impl<L: Len + ?Sized> Len for &L {
    #[inline(always)] fn len(&self) -> usize { L::len(*self) }
}
impl<L: Len + ?Sized> Len for &mut L {
    #[inline(always)] fn len(&self) -> usize { L::len(*self) }
}
impl<T> Len for Vec<T> {
    #[inline(always)] fn len(&self) -> usize { self.len() }
}
impl<T> Len for [T] {
    #[inline(always)] fn len(&self) -> usize { <[T]>::len(self) }
}

/// A type that can release its contents and return to an empty state.
///
/// Unlike `Vec::clear`, vectors give their buffers back to the allocator,
/// and must be allocated again before further use.
pub trait Clear {
    /// Clears `self`, releasing any held memory.
    fn clear(&mut self);
}
impl<T> Clear for Vec<T> {
    #[inline(always)] fn clear(&mut self) { self.clear() }
}

pub trait HeapSize {
    /// Active (len) and allocated (cap) memory sizes in bytes.
    /// This should not include the size of `self` itself.
    fn heap_size(&self) -> (usize, usize) { (0, 0) }
}

impl HeapSize for String {
    fn heap_size(&self) -> (usize, usize) {
        (self.len(), self.capacity())
    }
}
impl<T: HeapSize> HeapSize for Option<T> {
    fn heap_size(&self) -> (usize, usize) {
        self.as_ref().map(HeapSize::heap_size).unwrap_or((0, 0))
    }
}
impl<T: HeapSize> HeapSize for Vec<T> {
    fn heap_size(&self) -> (usize, usize) {
        let mut l = std::mem::size_of::<T>() * self.len();
        let mut c = std::mem::size_of::<T>() * self.capacity();
        for item in (self[..]).iter() {
            let (il, ic) = item.heap_size();
            l += il;
            c += ic;
        }
        (l, c)
    }
}

#[cfg(test)]
mod test {
    use super::{HeapSize, Len};

    #[test]
    fn heap_size_of_optional_strings() {
        let mut strings: Vec<Option<String>> = Vec::with_capacity(4);
        strings.push(Some("abc".to_string()));
        strings.push(None);
        let slot = std::mem::size_of::<Option<String>>();
        let (len, cap) = strings.heap_size();
        assert_eq!(len, 2 * slot + 3);
        assert!(cap >= 4 * slot + 3);
        assert_eq!(Len::len(&strings), 2);
    }
}
