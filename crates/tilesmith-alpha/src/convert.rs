//! Conversion between the two alpha-blend semantics.
//!
//! "Old" alpha stores, per layer, the fraction of whatever is still visible
//! below it (layers are composited bottom-up, so the top layer wins). "Big"
//! alpha stores each layer's absolute share out of 255, with the base layer
//! implicitly holding the remainder. Both conversions walk the layers from
//! the top down while tracking the visibility that is left.

use std::sync::LazyLock;

use crate::{ALPHA_TEXELS, Alphamap};

struct AlphaTables {
    /// `mul[a][b] = round(a * b / 255)`
    mul: Box<[[u8; 256]; 256]>,
    /// `div[v][r] = min(255, round(v * 255 / r))`, zero when `r == 0`
    div: Box<[[u8; 256]; 256]>,
}

static TABLES: LazyLock<AlphaTables> = LazyLock::new(|| {
    let mut mul = Box::new([[0u8; 256]; 256]);
    let mut div = Box::new([[0u8; 256]; 256]);
    for a in 0..256u32 {
        for b in 0..256u32 {
            mul[a as usize][b as usize] = ((a * b + 127) / 255) as u8;
            if b > 0 {
                div[a as usize][b as usize] = ((a * 255 + b / 2) / b).min(255) as u8;
            }
        }
    }
    AlphaTables { mul, div }
});

#[inline]
fn mul_255(a: u8, b: u8) -> u8 {
    TABLES.mul[a as usize][b as usize]
}

#[inline]
fn div_255(value: u8, remaining: u8) -> u8 {
    TABLES.div[value as usize][remaining as usize]
}

/// Rewrites `layers` (non-base layers, bottom first) from old to big alpha.
pub fn old_to_big(layers: &mut [Alphamap]) {
    for texel in 0..ALPHA_TEXELS {
        let mut remaining = 255u8;
        for layer in layers.iter_mut().rev() {
            let v = &mut layer.values_mut()[texel];
            let absolute = mul_255(*v, remaining);
            *v = absolute;
            remaining -= absolute;
        }
    }
}

/// Rewrites `layers` (non-base layers, bottom first) from big to old alpha.
pub fn big_to_old(layers: &mut [Alphamap]) {
    for texel in 0..ALPHA_TEXELS {
        let mut remaining = 255u8;
        for layer in layers.iter_mut().rev() {
            let v = &mut layer.values_mut()[texel];
            let absolute = *v;
            *v = div_255(absolute, remaining);
            remaining = remaining.saturating_sub(absolute);
        }
    }
}
