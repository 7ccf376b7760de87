use proptest::prelude::*;
use tilesmith_geom::{CHUNK_SIZE, Vec3};
use tilesmith_mesh::{
    EditMode, HeightField, HoleMask, LOD_INDEX_CAPS, LOD_LEVELS, NoTerrain, SculptBrush,
    SculptKernel, VERTEX_COUNT, lod,
};

fn heights() -> impl Strategy<Value = [f32; VERTEX_COUNT]> {
    prop::collection::vec(-500.0f32..500.0, VERTEX_COUNT).prop_map(|v| {
        let mut out = [0.0; VERTEX_COUNT];
        out.copy_from_slice(&v);
        out
    })
}

fn kernel() -> impl Strategy<Value = SculptKernel> {
    (0u32..7).prop_map(|id| SculptKernel::try_from(id).unwrap())
}

proptest! {
    // Index buffers never exceed their caps and holes only ever remove indices.
    #[test]
    fn lod_sizes_bounded_and_monotonic(bits in any::<u16>(), extra in 0usize..16) {
        let holes = HoleMask::from_bits(bits);
        let mut more = holes;
        more.set(extra % 4, extra / 4, true);
        for level in 0..LOD_LEVELS {
            let n = lod::indices_count(level, &holes);
            prop_assert!(n <= LOD_INDEX_CAPS[level]);
            prop_assert_eq!(n, lod::level_indices(level, &holes).len());
            prop_assert!(lod::indices_count(level, &more) <= n);
        }
    }

    #[test]
    fn hole_bits_round_trip(bits in any::<u16>()) {
        prop_assert_eq!(HoleMask::from_bits(bits).to_bits(), bits);
        prop_assert_eq!(HoleMask::from_bits(bits).count(), bits.count_ones() as usize);
    }

    // Cached bounds always match the stored heights.
    #[test]
    fn bounds_track_heights(h in heights(), row in 0usize..9, col in 0usize..9, v in -900.0f32..900.0) {
        let mut f = HeightField::from_heights(0.0, 0.0, h);
        f.set_height(row, col, v);
        let lo = f.heights().iter().copied().fold(f32::INFINITY, f32::min);
        let hi = f.heights().iter().copied().fold(f32::NEG_INFINITY, f32::max);
        prop_assert_eq!(f.min_height(), lo);
        prop_assert_eq!(f.max_height(), hi);
    }

    // Normals are unit length (up to quantization) and never point down.
    #[test]
    fn normals_are_unit_and_upward(h in heights()) {
        let mut f = HeightField::from_heights(0.0, 0.0, h);
        f.recompute_normals(&NoTerrain);
        for n in f.normals() {
            prop_assert!(n.y >= 0.0);
            prop_assert!((n.length() - 1.0).abs() < 0.02, "{:?}", n);
        }
    }

    // A positive brush never lowers anything and leaves far vertices alone.
    #[test]
    fn raising_brush_is_monotonic(k in kernel(), change in 0.1f32..50.0, radius in 1.0f32..30.0, inner in 0.0f32..1.0) {
        let mut f = HeightField::new(0.0, 0.0, 0.0);
        let cursor = Vec3::new(CHUNK_SIZE * 0.5, 0.0, CHUNK_SIZE * 0.5);
        let brush = SculptBrush { kernel: k, mode: EditMode::All, change, radius, inner_radius: inner };
        f.sculpt(cursor, &brush);
        for i in 0..VERTEX_COUNT {
            let h = f.heights()[i];
            prop_assert!(h >= 0.0);
            prop_assert!(h <= change + 1e-3);
            let p = f.vertex_position(i);
            let cheb = (p.x - cursor.x).abs().max((p.z - cursor.z).abs());
            if cheb >= radius {
                prop_assert_eq!(h, 0.0);
            }
        }
    }
}
