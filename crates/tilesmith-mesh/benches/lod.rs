use criterion::{Criterion, black_box, criterion_group, criterion_main};

use tilesmith_mesh::{HeightField, HoleMask, VERTEX_COUNT, vertex_grid_pos};

fn rolling() -> HeightField {
    let heights: [f32; VERTEX_COUNT] = std::array::from_fn(|i| {
        let (x, z) = vertex_grid_pos(i);
        (x * 0.7).sin() * 4.0 + (z * 0.4).cos() * 3.0
    });
    HeightField::from_heights(0.0, 0.0, heights)
}

fn bench_lod(c: &mut Criterion) {
    let solid = rolling();
    let mut holed = rolling();
    holed.set_holes(HoleMask::from_bits(0b1010_0101_0000_1111));
    let flat = HeightField::new(0.0, 0.0, 12.0);
    let mut group = c.benchmark_group("lod_indices");
    group.bench_function("solid", |b| b.iter(|| black_box(solid.generate_lod_indices(true))));
    group.bench_function("holes", |b| b.iter(|| black_box(holed.generate_lod_indices(true))));
    group.bench_function("flat", |b| b.iter(|| black_box(flat.generate_lod_indices(true))));
    group.finish();
}

criterion_group!(benches, bench_lod);
criterion_main!(benches);
