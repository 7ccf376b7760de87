//! Floating-point copy of a chunk's layer opacities.
//!
//! Each texel holds one value per layer, layer 0 included, summing to 255.
//! Edits run here and are quantized back into the byte alphamaps afterwards,
//! so successive strokes do not lose precision to rounding.

use tilesmith_alpha::{ALPHA_TEXELS, Alphamap};

use crate::MAX_LAYERS;

/// Allowed drift of a texel sum before it is rescaled.
pub const SUM_TOLERANCE: f32 = 0.001;
/// Smallest amount of opacity the other layers can meaningfully give or take.
pub const MIN_ROOM: f32 = 1.0 / 255.0;

#[derive(Clone, Debug, PartialEq)]
pub(crate) struct WorkingSet {
    layers: usize,
    texels: Vec<[f32; MAX_LAYERS]>,
}

impl WorkingSet {
    /// Expands `alphas` (layers 1.., bottom first) into full per-texel values.
    pub fn from_alphamaps<'a>(alphas: impl Iterator<Item = &'a Alphamap>) -> Self {
        let mut texels = vec![[0.0; MAX_LAYERS]; ALPHA_TEXELS];
        let mut layers = 1;
        for (slot, amap) in alphas.take(MAX_LAYERS - 1).enumerate() {
            layers = slot + 2;
            for (t, &v) in amap.values().iter().enumerate() {
                texels[t][slot + 1] = f32::from(v);
            }
        }
        for texel in &mut texels {
            let rest: f32 = texel[1..layers].iter().sum();
            texel[0] = (255.0 - rest).max(0.0);
        }
        let mut ws = Self { layers, texels };
        ws.normalize_all();
        ws
    }

    #[inline]
    pub fn layers(&self) -> usize {
        self.layers
    }

    #[inline]
    pub fn texel(&self, t: usize) -> &[f32] {
        &self.texels[t][..self.layers]
    }

    #[inline]
    pub fn texel_mut(&mut self, t: usize) -> &mut [f32] {
        let n = self.layers;
        &mut self.texels[t][..n]
    }

    /// Appends an empty layer on top.
    pub fn push_layer(&mut self) {
        debug_assert!(self.layers < MAX_LAYERS);
        self.layers += 1;
        for texel in &mut self.texels {
            texel[self.layers - 1] = 0.0;
        }
    }

    /// Drops layer `i` and rescales what is left.
    pub fn remove_layer(&mut self, i: usize) {
        let n = self.layers;
        for texel in &mut self.texels {
            texel.copy_within(i + 1..n, i);
            texel[n - 1] = 0.0;
        }
        self.layers -= 1;
        self.normalize_all();
    }

    /// Folds layer `from` into layer `into` and drops `from`.
    pub fn merge_layer(&mut self, into: usize, from: usize) {
        for texel in &mut self.texels {
            texel[into] += texel[from];
            texel[from] = 0.0;
        }
        self.remove_layer(from);
    }

    pub fn normalize_all(&mut self) {
        let n = self.layers;
        for texel in &mut self.texels {
            normalize(&mut texel[..n]);
        }
    }

    /// Writes layers 1.. back as bytes. Each texel is rounded and any excess
    /// over 255 is taken from its strongest non-base layer; layer 0 keeps the
    /// remainder implicitly.
    pub fn quantize_into(&self, alphas: &mut [&mut Alphamap]) {
        for t in 0..ALPHA_TEXELS {
            let texel = self.texel(t);
            let mut bytes = [0u8; MAX_LAYERS];
            let mut sum = 0u32;
            for j in 1..self.layers {
                bytes[j] = texel[j].round().clamp(0.0, 255.0) as u8;
                sum += u32::from(bytes[j]);
            }
            if sum > 255 {
                let overflow = (sum - 255) as u8;
                let strongest = (1..self.layers).max_by_key(|&j| bytes[j]).unwrap_or(1);
                bytes[strongest] -= overflow;
            }
            for (j, amap) in alphas.iter_mut().enumerate().take(self.layers - 1) {
                amap.values_mut()[t] = bytes[j + 1];
            }
        }
    }
}

/// Rescales `values` to sum to 255 when they drift past [`SUM_TOLERANCE`].
/// A texel with nothing left goes entirely to layer 0.
pub(crate) fn normalize(values: &mut [f32]) {
    for v in values.iter_mut() {
        *v = v.max(0.0);
    }
    let sum: f32 = values.iter().sum();
    if (sum - 255.0).abs() <= SUM_TOLERANCE {
        return;
    }
    if sum <= f32::EPSILON {
        values.fill(0.0);
        if let Some(base) = values.first_mut() {
            *base = 255.0;
        }
        return;
    }
    let scale = 255.0 / sum;
    for v in values.iter_mut() {
        *v *= scale;
    }
}

/// Moves `change` into layer `target` of one texel and takes the opposite
/// amount from the others in proportion to what they hold. When the others
/// have less than [`MIN_ROOM`] to share, a gain is spread evenly and a loss
/// is dropped. Returns the change actually applied.
pub(crate) fn shift_opacity(values: &mut [f32], target: usize, change: f32) -> f32 {
    let n = values.len();
    if n < 2 {
        return 0.0;
    }
    let current = values[target];
    let others: f32 = values.iter().sum::<f32>() - current;
    let change = (current + change).clamp(0.0, 255.0) - current;
    if change > 0.0 {
        if others < MIN_ROOM {
            return 0.0;
        }
        let taken = change.min(others);
        for (j, v) in values.iter_mut().enumerate() {
            if j != target {
                *v -= taken * (*v / others);
            }
        }
        values[target] += taken;
        normalize(values);
        taken
    } else if change < 0.0 {
        let given = -change;
        if others < MIN_ROOM {
            let share = given / (n - 1) as f32;
            for (j, v) in values.iter_mut().enumerate() {
                if j != target {
                    *v += share;
                }
            }
        } else {
            for (j, v) in values.iter_mut().enumerate() {
                if j != target {
                    *v += given * (*v / others);
                }
            }
        }
        values[target] -= given;
        normalize(values);
        change
    } else {
        0.0
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    fn sum(v: &[f32]) -> f32 {
        v.iter().sum()
    }

    #[test]
    fn base_holds_the_remainder() {
        let a = Alphamap::filled(100);
        let b = Alphamap::filled(50);
        let ws = WorkingSet::from_alphamaps([&a, &b].into_iter());
        assert_eq!(ws.layers(), 3);
        assert_eq!(ws.texel(0), &[105.0, 100.0, 50.0]);
    }

    #[test]
    fn gain_is_taken_proportionally() {
        let mut v = [155.0, 100.0, 0.0];
        let applied = shift_opacity(&mut v, 2, 51.0);
        assert_eq!(applied, 51.0);
        assert!((v[0] - 124.0).abs() < 1e-3);
        assert!((v[1] - 80.0).abs() < 1e-3);
        assert!((sum(&v) - 255.0).abs() < 1e-3);
    }

    #[test]
    fn loss_with_empty_others_spreads_evenly() {
        let mut v = [0.0, 255.0, 0.0];
        shift_opacity(&mut v, 1, -55.0);
        assert!((v[0] - 27.5).abs() < 1e-3);
        assert!((v[2] - 27.5).abs() < 1e-3);
        assert!((v[1] - 200.0).abs() < 1e-3);
    }

    #[test]
    fn gain_without_room_is_dropped() {
        let mut v = [0.0, 255.0];
        assert_eq!(shift_opacity(&mut v, 1, 10.0), 0.0);
        assert_eq!(v, [0.0, 255.0]);
    }

    #[test]
    fn quantize_keeps_bytes_under_255() {
        let mut ws = WorkingSet::from_alphamaps([&Alphamap::new(), &Alphamap::new()].into_iter());
        ws.texel_mut(0).copy_from_slice(&[0.0, 127.6, 127.4]);
        ws.texel_mut(1).copy_from_slice(&[0.0, 127.5, 127.5]);
        let mut a = Alphamap::new();
        let mut b = Alphamap::new();
        ws.quantize_into(&mut [&mut a, &mut b]);
        assert_eq!(u32::from(a.values()[0]) + u32::from(b.values()[0]), 255);
        assert_eq!(u32::from(a.values()[1]) + u32::from(b.values()[1]), 255);
    }

    #[test]
    fn remove_rescales() {
        let a = Alphamap::filled(255);
        let mut ws = WorkingSet::from_alphamaps([&a].into_iter());
        ws.remove_layer(1);
        assert_eq!(ws.layers(), 1);
        assert_eq!(ws.texel(0), &[255.0]);
    }
}
