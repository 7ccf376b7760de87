use proptest::prelude::*;
use tilesmith_geom::{CHUNK_SIZE, Vec3};
use tilesmith_liquid::{LiquidBrush, LiquidKind, LiquidStack, LiquidTypeTable, SubchunkMask};
use tilesmith_mesh::HeightField;

fn brush(id: u16, radius: f32, add: bool, factor: f32) -> LiquidBrush {
    LiquidBrush {
        radius,
        liquid_id: id,
        add,
        angle: 0.0,
        orientation: 0.0,
        origin: None,
        override_height: false,
        override_liquid_id: false,
        opacity_factor: factor,
    }
}

fn strokes() -> impl Strategy<Value = Vec<(f32, f32, f32, f32, bool, u16)>> {
    prop::collection::vec(
        (
            0.0f32..CHUNK_SIZE,
            0.0f32..CHUNK_SIZE,
            -5.0f32..20.0,
            1.0f32..CHUNK_SIZE,
            prop::bool::weighted(0.8),
            1u16..5,
        ),
        1..12,
    )
}

proptest! {
    #[test]
    fn fatigue_tracks_ocean_depth(ops in strokes(), ground in -10.0f32..10.0, factor in 0.0f32..2.0) {
        let terrain = HeightField::new(0.0, 0.0, ground);
        let types = LiquidTypeTable::default();
        let mut stack = LiquidStack::new();
        for (x, z, y, r, add, id) in ops {
            stack.paint(&terrain, Vec3::new(x, y, z), &brush(id, r, add, factor), &types);
        }
        for layer in stack.layers() {
            prop_assert!(!layer.is_empty());
            if layer.is_fatigue() {
                prop_assert_eq!(layer.kind(), LiquidKind::Ocean);
                prop_assert_eq!(layer.fatigue_mask(), SubchunkMask::ALL);
                prop_assert_eq!(layer.fishable(), SubchunkMask::ALL);
            } else {
                prop_assert_eq!(layer.fatigue_mask(), SubchunkMask::NONE);
            }
            for v in layer.vertices() {
                prop_assert!((0.0..=1.0).contains(&v.depth));
            }
        }
    }

    #[test]
    fn four_quarter_turns_restore_the_stack(ops in strokes(), mirror_x in any::<bool>()) {
        let terrain = HeightField::new(0.0, 0.0, 0.0);
        let types = LiquidTypeTable::default();
        let mut stack = LiquidStack::new();
        for (x, z, y, r, add, id) in ops {
            stack.paint(&terrain, Vec3::new(x, y, z), &brush(id, r, add, 0.5), &types);
        }
        let before = stack.clone();
        for _ in 0..4 {
            stack.rotate_90();
        }
        prop_assert_eq!(&stack, &before);
        stack.mirror(mirror_x);
        stack.mirror(mirror_x);
        prop_assert_eq!(&stack, &before);
    }
}
