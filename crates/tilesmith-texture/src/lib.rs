//! Texture-layer stack of a terrain chunk: up to four blended textures whose
//! per-texel opacities always add up to 255.
#![forbid(unsafe_code)]

mod brush;
mod flags;
mod working;

use serde::{Deserialize, Serialize};
use tilesmith_alpha::{ALPHA_SIZE, ALPHA_TEXELS, Alphamap};
use tilesmith_geom::{CHUNK_SIZE, TEXEL_SIZE, Vec3, shortest_dist_to_square};

pub use brush::Brush;
pub use flags::{LayerFlags, ROTATION_STEPS};
pub use working::{MIN_ROOM, SUM_TOLERANCE};

use working::{WorkingSet, shift_opacity};

pub const MAX_LAYERS: usize = 4;
/// Cells per edge of the low-detail dominant layer map.
pub const LOD_MAP_SIZE: usize = 8;

#[derive(
    Clone, Copy, Debug, Default, PartialEq, Eq, Hash, PartialOrd, Ord, Serialize, Deserialize,
)]
pub struct TextureId(pub u32);

#[derive(Clone, Debug, PartialEq)]
pub struct TextureLayer {
    pub texture: TextureId,
    pub flags: LayerFlags,
    pub effect_id: u32,
    /// `None` on the base layer.
    alpha: Option<Alphamap>,
}

impl TextureLayer {
    pub fn alpha(&self) -> Option<&Alphamap> {
        self.alpha.as_ref()
    }
}

#[derive(Clone, Debug, Default, PartialEq)]
pub struct TextureStack {
    layers: Vec<TextureLayer>,
    working: Option<WorkingSet>,
}

impl TextureStack {
    pub fn new() -> Self {
        Self::default()
    }

    /// Single base layer of `texture`.
    pub fn with_base(texture: TextureId) -> Self {
        let mut stack = Self::new();
        stack.add_layer(texture);
        stack
    }

    #[inline]
    pub fn len(&self) -> usize {
        self.layers.len()
    }

    #[inline]
    pub fn is_empty(&self) -> bool {
        self.layers.is_empty()
    }

    pub fn is_full(&self) -> bool {
        self.layers.len() >= MAX_LAYERS
    }

    pub fn layer(&self, i: usize) -> Option<&TextureLayer> {
        self.layers.get(i)
    }

    pub fn layers(&self) -> &[TextureLayer] {
        &self.layers
    }

    pub fn find(&self, texture: TextureId) -> Option<usize> {
        self.layers.iter().position(|l| l.texture == texture)
    }

    /// Opacity of layer `i` at texel `(x, z)`. The base layer reports the
    /// remainder of the others.
    pub fn opacity(&self, i: usize, x: usize, z: usize) -> Option<u8> {
        if i >= self.layers.len() || x >= ALPHA_SIZE || z >= ALPHA_SIZE {
            return None;
        }
        let t = Alphamap::idx(x, z);
        Some(self.texel_bytes(t)[i])
    }

    fn texel_bytes(&self, t: usize) -> [u8; MAX_LAYERS] {
        let mut out = [0u8; MAX_LAYERS];
        let mut rest = 0u32;
        for (j, layer) in self.layers.iter().enumerate().skip(1) {
            let v = layer.alpha.as_ref().map_or(0, |a| a.values()[t]);
            out[j] = v;
            rest += u32::from(v);
        }
        if !self.layers.is_empty() {
            out[0] = 255u32.saturating_sub(rest) as u8;
        }
        out
    }

    /// Appends a layer with an empty alphamap (or as the base on an empty
    /// stack). `None` when the stack already holds four layers.
    pub fn add_layer(&mut self, texture: TextureId) -> Option<usize> {
        if self.is_full() {
            return None;
        }
        let alpha = (!self.layers.is_empty()).then(Alphamap::new);
        self.layers.push(TextureLayer {
            texture,
            flags: LayerFlags {
                use_alpha: alpha.is_some(),
                ..LayerFlags::default()
            },
            effect_id: 0,
            alpha,
        });
        if let Some(ws) = self.working.as_mut() {
            ws.push_layer();
        }
        Some(self.layers.len() - 1)
    }

    /// Installs a decoded layer verbatim. Used by readers; skips
    /// normalization so the caller controls the data.
    pub fn push_decoded(
        &mut self,
        texture: TextureId,
        flags: LayerFlags,
        effect_id: u32,
        alpha: Option<Alphamap>,
    ) -> Option<usize> {
        if self.is_full() {
            return None;
        }
        let alpha = if self.layers.is_empty() {
            None
        } else {
            Some(alpha.unwrap_or_default())
        };
        self.layers.push(TextureLayer {
            texture,
            flags,
            effect_id,
            alpha,
        });
        self.working = None;
        Some(self.layers.len() - 1)
    }

    pub fn set_effect_id(&mut self, i: usize, effect_id: u32) -> bool {
        match self.layers.get_mut(i) {
            Some(l) if l.effect_id != effect_id => {
                l.effect_id = effect_id;
                true
            }
            _ => false,
        }
    }

    /// Drops the float copy kept between strokes.
    pub fn end_stroke(&mut self) {
        self.working = None;
    }

    fn working_set(&mut self) -> &mut WorkingSet {
        let layers = &self.layers;
        self.working.get_or_insert_with(|| {
            WorkingSet::from_alphamaps(layers.iter().skip(1).filter_map(|l| l.alpha.as_ref()))
        })
    }

    /// Quantizes the working set back into the byte alphamaps.
    fn store_working(&mut self) {
        let Some(ws) = self.working.as_ref() else {
            return;
        };
        let mut alphas: Vec<&mut Alphamap> = self
            .layers
            .iter_mut()
            .skip(1)
            .filter_map(|l| l.alpha.as_mut())
            .collect();
        ws.quantize_into(&mut alphas);
    }

    /// Runs `edit` on a fresh working set, then stores it and drops it.
    fn with_fresh_working(
        &mut self,
        edit: impl FnOnce(&mut WorkingSet, &mut Vec<TextureLayer>),
    ) {
        self.working = None;
        let mut ws = WorkingSet::from_alphamaps(
            self.layers.iter().skip(1).filter_map(|l| l.alpha.as_ref()),
        );
        edit(&mut ws, &mut self.layers);
        self.working = Some(ws);
        self.store_working();
        self.working = None;
    }

    /// Removes layer `i`, handing its opacity to the others. Removing the base
    /// promotes layer 1.
    pub fn erase_layer(&mut self, i: usize) -> bool {
        if i >= self.layers.len() {
            return false;
        }
        if self.layers.len() == 1 {
            self.layers.clear();
            self.working = None;
            return true;
        }
        self.with_fresh_working(|ws, layers| {
            ws.remove_layer(i);
            layers.remove(i);
            if let Some(base) = layers.first_mut() {
                base.alpha = None;
                base.flags.use_alpha = false;
                base.flags.compressed = false;
            }
        });
        true
    }

    pub fn clear(&mut self) {
        self.layers.clear();
        self.working = None;
    }

    /// Folds the higher of `a` and `b` into the lower one.
    pub fn merge(&mut self, a: usize, b: usize) -> bool {
        let (lo, hi) = (a.min(b), a.max(b));
        if lo == hi || hi >= self.layers.len() {
            return false;
        }
        self.with_fresh_working(|ws, layers| {
            ws.merge_layer(lo, hi);
            layers.remove(hi);
        });
        true
    }

    /// Swaps every use of `old` for `new`. If `new` is already present the two
    /// layers are merged instead of duplicating it.
    pub fn replace(&mut self, old: TextureId, new: TextureId) -> bool {
        match self.find(old) {
            Some(i) => self.switch_texture(i, new),
            None => false,
        }
    }

    /// Changes the texture of layer `i`, merging with an existing layer of
    /// `new` if there is one.
    pub fn switch_texture(&mut self, i: usize, new: TextureId) -> bool {
        let Some(layer) = self.layers.get(i) else {
            return false;
        };
        if layer.texture == new {
            return false;
        }
        if let Some(existing) = self.find(new) {
            self.merge(i, existing);
            let kept = i.min(existing);
            self.layers[kept].texture = new;
        } else {
            self.layers[i].texture = new;
        }
        true
    }

    /// Drops layers whose strongest texel is at most `threshold` (0..=255).
    /// The base layer only goes when another layer can take its place.
    pub fn remove_unused(&mut self, threshold: f32) -> bool {
        let mut changed = false;
        let mut i = self.layers.len();
        while i > 0 {
            i -= 1;
            if self.layers.len() < 2 {
                break;
            }
            let strongest = (0..ALPHA_TEXELS)
                .map(|t| self.texel_bytes(t)[i])
                .max()
                .unwrap_or(0);
            if f32::from(strongest) <= threshold {
                log::debug!(
                    "dropping unused texture layer {i} ({:?})",
                    self.layers[i].texture
                );
                self.erase_layer(i);
                changed = true;
            }
        }
        changed
    }

    /// Paints `texture` toward opacity `strength` (0..=255) under `brush`
    /// centred on `pos`. The chunk's corner sits at world `origin`.
    ///
    /// Adds the layer if needed, evicting fully transparent layers when the
    /// stack is full. Fully transparent non-base layers are pruned afterwards,
    /// whether or not any texel moved. Returns true if opacities or the layer
    /// list changed.
    pub fn paint(
        &mut self,
        origin: (f32, f32),
        pos: Vec3,
        brush: &Brush,
        strength: f32,
        pressure: f32,
        texture: TextureId,
    ) -> bool {
        let (ox, oz) = origin;
        if !brush.reaches(shortest_dist_to_square(pos.x, pos.z, ox, oz, CHUNK_SIZE)) {
            return false;
        }
        let before: Vec<TextureId> = self.layers.iter().map(|l| l.texture).collect();
        let target = match self.find(texture) {
            Some(i) => i,
            None => {
                if self.is_full() {
                    self.remove_unused(0.0);
                }
                match self.add_layer(texture) {
                    Some(i) => i,
                    None => {
                        log::debug!("texture stack full, cannot paint {texture:?}");
                        return false;
                    }
                }
            }
        };
        // A lone base layer is already fully opaque.
        let changed = self.layers.len() > 1
            && self.paint_texels(origin, pos, brush, strength, pressure, target);
        if changed {
            self.store_working();
        }
        self.prune_transparent();
        changed || self.layers.iter().map(|l| l.texture).ne(before)
    }

    /// Applies one stroke to the working set. True if any texel moved.
    fn paint_texels(
        &mut self,
        (ox, oz): (f32, f32),
        pos: Vec3,
        brush: &Brush,
        strength: f32,
        pressure: f32,
        target: usize,
    ) -> bool {
        let strength = strength.clamp(0.0, 255.0);
        let ws = self.working_set();
        let mut changed = false;
        for z in 0..ALPHA_SIZE {
            let tz = oz + (z as f32 + 0.5) * TEXEL_SIZE;
            for x in 0..ALPHA_SIZE {
                let tx = ox + (x as f32 + 0.5) * TEXEL_SIZE;
                let dist = ((tx - pos.x).powi(2) + (tz - pos.z).powi(2)).sqrt();
                let weight = brush.falloff(dist);
                if weight <= 0.0 {
                    continue;
                }
                let values = ws.texel_mut(Alphamap::idx(x, z));
                let change = (strength - values[target]) * pressure * weight;
                if change.abs() < SUM_TOLERANCE {
                    continue;
                }
                if shift_opacity(values, target, change) != 0.0 {
                    changed = true;
                }
            }
        }
        changed
    }

    fn prune_transparent(&mut self) {
        let mut i = self.layers.len();
        while i > 1 {
            i -= 1;
            if self.layers[i].alpha.as_ref().is_some_and(Alphamap::is_zero) {
                self.layers.remove(i);
                if let Some(ws) = self.working.as_mut() {
                    ws.remove_layer(i);
                }
            }
        }
    }

    /// Majority layer per 8x8 block of texels, where each texel votes for its
    /// most opaque layer. Ties go to the lower layer.
    pub fn lod_dominant_layer_map(&self) -> [[u8; LOD_MAP_SIZE]; LOD_MAP_SIZE] {
        let mut out = [[0u8; LOD_MAP_SIZE]; LOD_MAP_SIZE];
        if self.layers.len() < 2 {
            return out;
        }
        let block = ALPHA_SIZE / LOD_MAP_SIZE;
        for (bz, row) in out.iter_mut().enumerate() {
            for (bx, cell) in row.iter_mut().enumerate() {
                let mut votes = [0u32; MAX_LAYERS];
                for z in bz * block..(bz + 1) * block {
                    for x in bx * block..(bx + 1) * block {
                        let bytes = self.texel_bytes(Alphamap::idx(x, z));
                        votes[argmax(&bytes[..self.layers.len()])] += 1;
                    }
                }
                *cell = argmax(&votes[..self.layers.len()]) as u8;
            }
        }
        out
    }

    /// Sets a layer's animation direction (0..8) and speed (0..8). Speed zero
    /// turns animation off.
    pub fn set_animation(&mut self, i: usize, rotation: u8, speed: u8) -> bool {
        let Some(layer) = self.layers.get_mut(i) else {
            return false;
        };
        let flags = LayerFlags {
            rotation: rotation % ROTATION_STEPS,
            speed: speed.min(7),
            animated: speed > 0,
            ..layer.flags
        };
        let changed = flags != layer.flags;
        layer.flags = flags;
        changed
    }

    /// Turns every alphamap a quarter: texel `(x, z)` moves to `(63 - z, x)`.
    pub fn rotate_90(&mut self) {
        let last = ALPHA_SIZE - 1;
        self.remap(|x, z| (z, last - x), LayerFlags::rotated_90);
    }

    /// Mirrors every alphamap along x (`horizontal`) or z.
    pub fn mirror(&mut self, horizontal: bool) {
        let last = ALPHA_SIZE - 1;
        if horizontal {
            self.remap(|x, z| (last - x, z), |f| f.mirrored(true));
        } else {
            self.remap(|x, z| (x, last - z), |f| f.mirrored(false));
        }
    }

    fn remap(
        &mut self,
        source: impl Fn(usize, usize) -> (usize, usize),
        flags: impl Fn(LayerFlags) -> LayerFlags,
    ) {
        self.working = None;
        for layer in &mut self.layers {
            if let Some(a) = layer.alpha.as_mut() {
                *a = a.remap(&source);
            }
            if layer.flags.animated {
                layer.flags = flags(layer.flags);
            }
        }
    }
}

fn argmax<T: PartialOrd + Copy>(values: &[T]) -> usize {
    let mut best = 0;
    for (i, v) in values.iter().enumerate().skip(1) {
        if *v > values[best] {
            best = i;
        }
    }
    best
}
