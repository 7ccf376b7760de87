use proptest::num::f32::NORMAL;
use proptest::prelude::*;
use proptest::strategy::Strategy;
use tilesmith_geom::{Aabb, Vec3, angled_height, shortest_dist_to_square};

fn approx_abs_rel(a: f32, b: f32, atol: f32, rtol: f32) -> bool {
    let diff = (a - b).abs();
    let scale = a.abs().max(b.abs());
    diff <= atol + rtol * scale
}

fn bounded_f32() -> impl Strategy<Value = f32> {
    NORMAL.prop_filter("bounded", |v| v.is_finite() && v.abs() <= 1e4)
}

fn arb_vec3() -> impl Strategy<Value = Vec3> {
    (bounded_f32(), bounded_f32(), bounded_f32()).prop_map(|(x, y, z)| Vec3::new(x, y, z))
}

proptest! {
    // a x b is orthogonal to both inputs
    #[test]
    fn cross_is_orthogonal(a in arb_vec3(), b in arb_vec3()) {
        let c = a.cross(b);
        let scale = a.length() * b.length() * c.length();
        prop_assert!(c.dot(a).abs() <= 1e-3 + 1e-4 * scale);
        prop_assert!(c.dot(b).abs() <= 1e-3 + 1e-4 * scale);
    }

    // normalized vectors have unit length unless the input was zero
    #[test]
    fn normalized_has_unit_length(a in arb_vec3()) {
        prop_assume!(a.length() > 1e-3);
        prop_assert!(approx_abs_rel(a.normalized().length(), 1.0, 1e-4, 1e-4));
    }

    // from_points contains every point and touches the extremes
    #[test]
    fn from_points_bounds_all(points in prop::collection::vec(arb_vec3(), 1..32)) {
        let bb = Aabb::from_points(points.iter().copied()).unwrap();
        for p in &points {
            prop_assert!(p.x >= bb.min.x && p.x <= bb.max.x);
            prop_assert!(p.y >= bb.min.y && p.y <= bb.max.y);
            prop_assert!(p.z >= bb.min.z && p.z <= bb.max.z);
        }
        prop_assert!(points.iter().any(|p| p.y == bb.min.y));
        prop_assert!(points.iter().any(|p| p.y == bb.max.y));
    }

    // distance to a square never exceeds distance to any of its corners
    #[test]
    fn square_distance_bounded_by_corners(
        x in bounded_f32(), z in bounded_f32(),
        sx in bounded_f32(), sz in bounded_f32(),
        size in 0.1f32..100.0,
    ) {
        let d = shortest_dist_to_square(x, z, sx, sz, size);
        prop_assert!(d >= 0.0);
        for (cx, cz) in [(sx, sz), (sx + size, sz), (sx, sz + size), (sx + size, sz + size)] {
            let dc = ((x - cx).powi(2) + (z - cz).powi(2)).sqrt();
            prop_assert!(d <= dc + 1e-2);
        }
    }

    // a plane passes through its own origin for any tilt
    #[test]
    fn angled_plane_contains_origin(o in arb_vec3(), angle in -1.2f32..1.2, orient in -6.3f32..6.3) {
        let h = angled_height(o, o, angle, orient);
        prop_assert!(approx_abs_rel(h, o.y, 1e-3, 1e-5));
    }
}
