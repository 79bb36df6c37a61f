use proptest::prelude::*;

use sword::{bitmap, Buffer, IntVector, RootAllocator, ValueVector, VectorConfig};

fn nullable(capacity: usize) -> VectorConfig {
    VectorConfig::default().with_initial_capacity(capacity).with_nullable(true)
}

proptest! {
    #![proptest_config(ProptestConfig::with_cases(256))]

    #[test]
    fn null_count_matches_cleared_bits(valid in proptest::collection::vec(any::<bool>(), 0 ..= 1000)) {
        let allocator = RootAllocator::unbounded();
        let n = valid.len();
        let mut buffer = allocator.allocate(bitmap::bitmap_len(n)).unwrap();
        for (index, _) in valid.iter().enumerate().filter(|(_, v)| **v) {
            bitmap::set_bit(&mut buffer, index).unwrap();
        }
        let set = valid.iter().filter(|v| **v).count();
        prop_assert_eq!(bitmap::null_count(&buffer, n).unwrap(), n - set, "n={}", n);
    }

    #[test]
    fn offset_null_count_matches_bits(
        valid in proptest::collection::vec(any::<bool>(), 1 ..= 300),
        offset in 0usize .. 64,
    ) {
        let allocator = RootAllocator::unbounded();
        let mut buffer = allocator.allocate(bitmap::bitmap_len(valid.len())).unwrap();
        buffer.fill(0, buffer.capacity(), 0).unwrap();
        for (index, _) in valid.iter().enumerate().filter(|(_, v)| **v) {
            bitmap::set_bit(&mut buffer, index).unwrap();
        }
        let offset = offset % valid.len();
        let expected = valid[offset ..].iter().filter(|v| !**v).count();
        prop_assert_eq!(bitmap::null_count_at(&buffer, offset, valid.len() - offset).unwrap(), expected);
    }

    #[test]
    fn allocator_stays_within_budget(ops in proptest::collection::vec((any::<bool>(), 0usize .. 400), 1 .. 100)) {
        let limit = 1000;
        let allocator = RootAllocator::new(limit);
        let mut live: Vec<Buffer> = Vec::new();
        let mut expected = 0u64;
        for (allocate, size) in ops {
            if allocate || live.is_empty() {
                match allocator.allocate(size) {
                    Ok(buffer) => {
                        expected += size as u64;
                        live.push(buffer);
                    }
                    Err(error) => {
                        prop_assert!(error.is_out_of_memory());
                        prop_assert!(expected + size as u64 > limit);
                    }
                }
            } else {
                let mut buffer = live.swap_remove(size % live.len());
                expected -= buffer.capacity() as u64;
                allocator.free(&mut buffer);
                allocator.free(&mut buffer);
            }
            prop_assert_eq!(allocator.allocated(), expected);
            prop_assert!(allocator.allocated() <= limit);
        }
        drop(live);
        prop_assert_eq!(allocator.allocated(), 0);
    }

    #[test]
    fn bulk_writes_match_scalar_writes(
        values in proptest::collection::vec(any::<i32>(), 0 .. 300),
        index in 0usize .. 20,
        nullable in any::<bool>(),
    ) {
        let allocator = RootAllocator::unbounded();
        let config = VectorConfig::default().with_initial_capacity(320).with_nullable(nullable);
        let mut bulk = IntVector::with_config("bulk", allocator.clone(), config);
        let mut scalar = IntVector::with_config("scalar", allocator.clone(), config);
        bulk.allocate_new().unwrap();
        scalar.allocate_new().unwrap();

        bulk.set_simd(index, &values).unwrap();
        for (offset, &value) in values.iter().enumerate() {
            scalar.set(index + offset, value).unwrap();
        }
        prop_assert_eq!(bulk.value_count(), scalar.value_count());
        prop_assert_eq!(bulk.null_count(), scalar.null_count());
        for row in 0 .. 320 {
            prop_assert_eq!(bulk.get_object(row), scalar.get_object(row));
        }

        let mut out = vec![0; values.len()];
        scalar.get_simd(index, &mut out).unwrap();
        prop_assert_eq!(out, values);
    }

    #[test]
    fn growth_preserves_values(k in 1usize .. 600, initial in 1usize .. 8) {
        let allocator = RootAllocator::unbounded();
        let mut vector = IntVector::with_config("ints", allocator, nullable(initial));
        vector.allocate_new().unwrap();
        for index in 0 .. k {
            if index % 7 == 3 {
                vector.set_null_safe(index).unwrap();
            } else {
                vector.set_safe(index, index as i32).unwrap();
            }
        }
        prop_assert_eq!(vector.value_count(), k);
        prop_assert!(vector.value_capacity() >= k);
        prop_assert_eq!(vector.null_count().unwrap(), (0 .. k).filter(|i| i % 7 == 3).count());
        for index in 0 .. k {
            let expected = if index % 7 == 3 { None } else { Some(index as i32) };
            prop_assert_eq!(vector.get_object(index).unwrap(), expected);
        }
    }

    #[test]
    fn slices_read_their_rows(start in 0usize .. 64, length in 0usize .. 64) {
        let allocator = RootAllocator::unbounded();
        let mut vector = IntVector::with_config("ints", allocator, nullable(128));
        vector.allocate_new().unwrap();
        for index in 0 .. 128 {
            if index % 5 == 0 { vector.set_null(index).unwrap() } else { vector.set(index, index as i32).unwrap() }
        }
        let slice = vector.slice(start, start + length).unwrap();
        prop_assert_eq!(slice.value_count(), length);
        prop_assert_eq!(slice.null_count().unwrap(), (start .. start + length).filter(|i| i % 5 == 0).count());
        for row in 0 .. length {
            prop_assert_eq!(slice.get_object(row).unwrap(), vector.get_object(start + row).unwrap());
        }
    }
}

#[test]
fn large_bulk_write_with_ragged_tail() {
    let count = 100_000 + 3;
    let values = (0 .. count as i32).map(|i| i.wrapping_mul(-1_640_531_535)).collect::<Vec<_>>();
    let allocator = RootAllocator::unbounded();
    let mut bulk = IntVector::with_config("bulk", allocator.clone(), nullable(count));
    let mut scalar = IntVector::with_config("scalar", allocator, nullable(count));
    bulk.allocate_new().unwrap();
    scalar.allocate_new().unwrap();
    bulk.set_simd(0, &values).unwrap();
    for (index, &value) in values.iter().enumerate() {
        scalar.set(index, value).unwrap();
    }
    assert_eq!(bulk.value_count(), count);
    assert_eq!(bulk.null_count(), Ok(0));
    assert!((0 .. count).all(|index| bulk.get(index) == scalar.get(index)));
}
