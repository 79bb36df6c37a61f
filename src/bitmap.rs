//! Validity bitmap routines over a [`Buffer`].
//!
//! Bit `i` lives in byte `i / 8` at position `i % 8`. A set bit marks a valid
//! (non-null) row, a cleared bit marks a null one. Bits past the logical length
//! of a bitmap are never inspected.

use smallvec::{smallvec, SmallVec};

use crate::buffer::Buffer;
use crate::error::Result;

/// The number of bytes needed to hold `value_count` bits.
#[inline(always)]
pub fn bitmap_len(value_count: usize) -> usize {
    value_count.div_ceil(8)
}

#[inline]
pub fn get_bit(buffer: &Buffer, index: usize) -> Result<bool> {
    Ok(buffer.get_byte(index / 8)? >> (index % 8) & 1 == 1)
}

/// Marks row `index` valid.
#[inline]
pub fn set_bit(buffer: &mut Buffer, index: usize) -> Result<()> {
    let byte = buffer.get_byte(index / 8)?;
    buffer.set_byte(index / 8, byte | 1 << (index % 8))
}

/// Marks row `index` null.
#[inline]
pub fn unset_bit(buffer: &mut Buffer, index: usize) -> Result<()> {
    let byte = buffer.get_byte(index / 8)?;
    buffer.set_byte(index / 8, byte & !(1 << (index % 8)))
}

#[inline]
pub fn set_validity(buffer: &mut Buffer, index: usize, valid: bool) -> Result<()> {
    if valid { set_bit(buffer, index) } else { unset_bit(buffer, index) }
}

/// The number of cleared bits in `[0, value_count)`.
pub fn null_count(buffer: &Buffer, value_count: usize) -> Result<usize> {
    Ok(value_count - count_valid(buffer, 0, value_count)?)
}

/// The number of cleared bits in `[bit_offset, bit_offset + value_count)`.
pub fn null_count_at(buffer: &Buffer, bit_offset: usize, value_count: usize) -> Result<usize> {
    let head = ((8 - bit_offset % 8) % 8).min(value_count);
    let mut valid = 0;
    for index in bit_offset .. bit_offset + head {
        valid += get_bit(buffer, index)? as usize;
    }
    valid += count_valid(buffer, (bit_offset + head) / 8, value_count - head)?;
    Ok(value_count - valid)
}

/// Counts set bits among the first `value_count` bits starting at byte `byte_offset`.
fn count_valid(buffer: &Buffer, byte_offset: usize, value_count: usize) -> Result<usize> {
    let full = value_count / 8;
    let remainder = value_count % 8;
    let mut valid = 0;
    let mut index = 0;
    while index + 8 <= full {
        valid += u64::from_le_bytes(buffer.read_array(byte_offset + index)?).count_ones() as usize;
        index += 8;
    }
    while index < full {
        valid += buffer.get_byte(byte_offset + index)?.count_ones() as usize;
        index += 1;
    }
    if remainder != 0 {
        // Only the low `remainder` bits of the trailing byte belong to the range.
        let mask = (1u8 << remainder) - 1;
        valid += (buffer.get_byte(byte_offset + full)? & mask).count_ones() as usize;
    }
    Ok(valid)
}

/// Marks every row in `[bit_offset, bit_offset + length)` valid.
pub fn set_range(buffer: &mut Buffer, bit_offset: usize, length: usize) -> Result<()> {
    let end = bit_offset + length;
    let mut index = bit_offset;
    while index < end && index % 8 != 0 {
        set_bit(buffer, index)?;
        index += 1;
    }
    let bytes = (end - index) / 8;
    buffer.fill(index / 8, bytes, 0xFF)?;
    index += bytes * 8;
    while index < end {
        set_bit(buffer, index)?;
        index += 1;
    }
    Ok(())
}

/// Copies `length` bits from `src` at `src_offset` to `dst` at `dst_offset`.
///
/// The source bits are read out in full before any is written, so `dst` and
/// `src` may be overlapping views of one bitmap. Bits of `dst` outside the
/// range are left as they were.
pub fn copy_bits(dst: &mut Buffer, dst_offset: usize, src: &Buffer, src_offset: usize, length: usize) -> Result<()> {
    let mut staged: SmallVec<[u8; 64]> = smallvec![0u8; bitmap_len(length)];
    if src_offset % 8 == 0 {
        src.get_bytes(src_offset / 8, &mut staged)?;
    } else {
        for index in 0 .. length {
            if get_bit(src, src_offset + index)? {
                staged[index / 8] |= 1 << (index % 8);
            }
        }
    }
    let mut done = 0;
    if dst_offset % 8 == 0 {
        done = length / 8 * 8;
        dst.set_bytes(dst_offset / 8, &staged, 0, length / 8)?;
    }
    for index in done .. length {
        let valid = staged[index / 8] >> (index % 8) & 1 == 1;
        set_validity(dst, dst_offset + index, valid)?;
    }
    Ok(())
}

#[cfg(test)]
mod test {
    use super::*;
    use crate::allocator::RootAllocator;

    #[test]
    fn single_bits() {
        let allocator = RootAllocator::unbounded();
        let mut buffer = allocator.allocate(2).unwrap();
        set_bit(&mut buffer, 9).unwrap();
        assert_eq!(buffer.get_byte(1), Ok(0b10));
        assert!(get_bit(&buffer, 9).unwrap());
        assert!(!get_bit(&buffer, 8).unwrap());

        set_bit(&mut buffer, 15).unwrap();
        unset_bit(&mut buffer, 9).unwrap();
        assert_eq!(buffer.get_byte(1), Ok(0b1000_0000));
        assert!(set_bit(&mut buffer, 16).is_err());
    }

    #[test]
    fn null_count_every_remainder() {
        let allocator = RootAllocator::unbounded();
        for value_count in 0 .. 40 {
            let mut buffer = allocator.allocate(bitmap_len(value_count)).unwrap();
            assert_eq!(null_count(&buffer, value_count), Ok(value_count));
            let mut valid = 0;
            for index in (0 .. value_count).filter(|i| i % 3 != 1) {
                set_bit(&mut buffer, index).unwrap();
                valid += 1;
            }
            assert_eq!(null_count(&buffer, value_count), Ok(value_count - valid), "value_count={value_count}");
        }
    }

    #[test]
    fn trailing_bits_are_ignored() {
        let allocator = RootAllocator::unbounded();
        let mut buffer = allocator.allocate(2).unwrap();
        buffer.set_byte(0, 0xFF).unwrap();
        buffer.set_byte(1, 0b1111_0000).unwrap();
        for remainder in 0 .. 8 {
            // The set high bits of byte 1 lie outside the range.
            assert_eq!(null_count(&buffer, 8 + remainder), Ok(remainder.min(4)));
        }
        buffer.set_byte(1, 0b0000_0101).unwrap();
        assert_eq!(null_count(&buffer, 11), Ok(1));
        assert_eq!(null_count(&buffer, 9), Ok(0));
    }

    #[test]
    fn offset_null_counts() {
        let allocator = RootAllocator::unbounded();
        let mut buffer = allocator.allocate(4).unwrap();
        for index in (0 .. 32).filter(|i| i % 2 == 0) {
            set_bit(&mut buffer, index).unwrap();
        }
        assert_eq!(null_count_at(&buffer, 3, 0), Ok(0));
        assert_eq!(null_count_at(&buffer, 3, 1), Ok(1));
        assert_eq!(null_count_at(&buffer, 3, 10), Ok(5));
        assert_eq!(null_count_at(&buffer, 8, 13), Ok(6));
        assert_eq!(null_count_at(&buffer, 5, 27), Ok(14));
        assert!(null_count_at(&buffer, 5, 28).is_err());
    }

    #[test]
    fn ranges() {
        let allocator = RootAllocator::unbounded();
        let mut buffer = allocator.allocate(4).unwrap();
        set_range(&mut buffer, 3, 22).unwrap();
        for index in 0 .. 32 {
            assert_eq!(get_bit(&buffer, index).unwrap(), (3 .. 25).contains(&index), "bit {index}");
        }
        set_range(&mut buffer, 30, 0).unwrap();
        assert!(!get_bit(&buffer, 30).unwrap());
    }

    #[test]
    fn copies() {
        let allocator = RootAllocator::unbounded();
        let mut src = allocator.allocate(3).unwrap();
        for index in [0, 2, 3, 9, 17, 20] {
            set_bit(&mut src, index).unwrap();
        }

        let mut aligned = allocator.allocate(3).unwrap();
        copy_bits(&mut aligned, 8, &src, 0, 12).unwrap();
        for index in 0 .. 12 {
            assert_eq!(get_bit(&aligned, 8 + index), get_bit(&src, index));
        }

        let mut shifted = allocator.allocate(3).unwrap();
        shifted.fill(0, 3, 0xFF).unwrap();
        copy_bits(&mut shifted, 1, &src, 2, 19).unwrap();
        assert!(get_bit(&shifted, 0).unwrap());
        for index in 0 .. 19 {
            assert_eq!(get_bit(&shifted, 1 + index), get_bit(&src, 2 + index));
        }
        assert!(get_bit(&shifted, 20).unwrap());
    }

    #[test]
    fn overlapping_copies() {
        let allocator = RootAllocator::unbounded();
        let pattern = |index: usize| index % 3 == 0 || index == 7;
        for (src_offset, dst_offset) in [(0, 1), (0, 8), (3, 5), (9, 2), (8, 0)] {
            let mut whole = allocator.allocate(4).unwrap();
            for index in (0 .. 32).filter(|&i| pattern(i)) {
                set_bit(&mut whole, index).unwrap();
            }
            let src = whole.slice(0, 4).unwrap();
            let mut dst = whole.slice(0, 4).unwrap();
            copy_bits(&mut dst, dst_offset, &src, src_offset, 20).unwrap();
            for index in 0 .. 20 {
                assert_eq!(get_bit(&whole, dst_offset + index), Ok(pattern(src_offset + index)), "{src_offset}->{dst_offset} bit {index}");
            }
        }
    }
}
