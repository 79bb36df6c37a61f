fn main() {

    use sword::{IntVector, RootAllocator, ValueVector, VectorConfig};

    let count = 1 << 22;
    let values = (0 .. count as i32).collect::<Vec<_>>();
    let allocator = RootAllocator::new(1 << 30);
    let config = VectorConfig::default().with_initial_capacity(count).with_nullable(true);
    println!("lane width: {}", sword::simd::lane_width());

    let mut scalar = IntVector::with_config("scalar", allocator.clone(), config);
    let mut bulk = IntVector::with_config("bulk", allocator.clone(), config);
    if !scalar.allocate_new_safe() || !bulk.allocate_new_safe() {
        println!("could not allocate {} values", count);
        return;
    }

    let timer = std::time::Instant::now();
    for (index, &value) in values.iter().enumerate() {
        if scalar.set(index, value).is_err() {
            println!("scalar set failed at {}", index);
            return;
        }
    }
    let time = timer.elapsed();
    println!("{:?}\tscalar set {} values", time, count);

    let timer = std::time::Instant::now();
    if let Err(error) = bulk.set_simd(0, &values) {
        println!("bulk set failed: {}", error);
        return;
    }
    let time = timer.elapsed();
    println!("{:?}\tbulk set {} values", time, count);

    let timer = std::time::Instant::now();
    let sum = (0 .. count).filter_map(|index| scalar.get(index).ok()).map(i64::from).sum::<i64>();
    let time = timer.elapsed();
    println!("{:?}\tscalar summed: {:?}", time, sum);

    let timer = std::time::Instant::now();
    let mut out = vec![0; count];
    let sum = bulk.get_simd(0, &mut out).map(|()| out.iter().copied().map(i64::from).sum::<i64>());
    let time = timer.elapsed();
    println!("{:?}\tbulk summed: {:?}", time, sum);

    let timer = std::time::Instant::now();
    let nulls = bulk.null_count();
    let time = timer.elapsed();
    println!("{:?}\tcounted nulls: {:?}", time, nulls);

    let timer = std::time::Instant::now();
    let slice = bulk.slice(count / 4, count / 2);
    let time = timer.elapsed();
    println!("{:?}\tsliced: {:?}", time, slice.map(|s| s.value_count()));

    println!("allocated: {} bytes", allocator.allocated());
    scalar.close();
    bulk.close();
    println!("after close: {} bytes", allocator.allocated());
}
