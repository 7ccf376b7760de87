use tilesmith_geom::{UNIT_SIZE, Vec3, shortest_dist_to_square};
use tilesmith_mesh::HeightField;

use crate::{LiquidBrush, LiquidLayer, LiquidTypeTable, SUBCHUNKS};

/// All liquid layers of one chunk. Layers without coverage are pruned after
/// every edit.
#[derive(Clone, Debug, Default, PartialEq)]
pub struct LiquidStack {
    layers: Vec<LiquidLayer>,
}

impl LiquidStack {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn from_layers(layers: Vec<LiquidLayer>) -> Self {
        let mut stack = Self { layers };
        stack.cleanup();
        stack
    }

    pub fn layers(&self) -> &[LiquidLayer] {
        &self.layers
    }

    pub fn layer(&self, i: usize) -> Option<&LiquidLayer> {
        self.layers.get(i)
    }

    pub fn layer_mut(&mut self, i: usize) -> Option<&mut LiquidLayer> {
        self.layers.get_mut(i)
    }

    pub fn len(&self) -> usize {
        self.layers.len()
    }

    pub fn is_empty(&self) -> bool {
        self.layers.is_empty()
    }

    pub fn find(&self, liquid_id: u16) -> Option<usize> {
        self.layers.iter().position(|l| l.liquid_id() == liquid_id)
    }

    pub fn clear(&mut self) -> bool {
        let changed = !self.layers.is_empty();
        self.layers.clear();
        changed
    }

    /// Drops layers that cover nothing. Returns whether any went.
    pub fn cleanup(&mut self) -> bool {
        let before = self.layers.len();
        self.layers.retain(|l| !l.is_empty());
        before != self.layers.len()
    }

    /// Applies a liquid stroke.
    ///
    /// With `override_liquid_id` (and no height override) only the layer of
    /// `brush.liquid_id` gains coverage; it is created when missing, and cells
    /// it newly covers inherit the height of any other layer already there.
    /// Other layers lose coverage under the brush. Removal strokes act on every
    /// layer.
    pub fn paint(
        &mut self,
        terrain: &HeightField,
        pos: Vec3,
        brush: &LiquidBrush,
        types: &LiquidTypeTable,
    ) -> bool {
        let mut changed = false;
        if brush.add && brush.override_liquid_id && !brush.override_height {
            let i = match self.find(brush.liquid_id) {
                Some(i) => i,
                None => {
                    let kind = types.resolve(brush.liquid_id);
                    self.layers.push(LiquidLayer::new(brush.liquid_id, kind, pos.y));
                    changed = true;
                    self.layers.len() - 1
                }
            };
            if self.copy_height_to_layer(i, terrain, pos, brush.radius) {
                self.layers[i].autogen_depth(terrain, brush.opacity_factor);
                changed = true;
            }
        }

        let mut painted = false;
        for layer in &mut self.layers {
            if !brush.add || !brush.override_liquid_id || layer.liquid_id() == brush.liquid_id {
                changed |= layer.paint(terrain, pos, brush, brush.add);
                painted = true;
            } else {
                changed |= layer.paint(terrain, pos, brush, false);
            }
        }
        changed |= self.cleanup();

        if !painted && brush.add {
            let kind = types.resolve(brush.liquid_id);
            let mut layer = LiquidLayer::new(brush.liquid_id, kind, pos.y);
            if layer.paint(terrain, pos, brush, true) {
                self.layers.push(layer);
                changed = true;
            }
        }
        changed
    }

    /// Seeds uncovered cells of layer `target` under the brush with the
    /// heights of whichever other layer covers them. Returns whether any
    /// cell was seeded.
    fn copy_height_to_layer(
        &mut self,
        target: usize,
        terrain: &HeightField,
        pos: Vec3,
        radius: f32,
    ) -> bool {
        let (ox, oz) = terrain.origin();
        let mut copied = false;
        for z in 0..SUBCHUNKS {
            for x in 0..SUBCHUNKS {
                let sx = ox + x as f32 * UNIT_SIZE;
                let sz = oz + z as f32 * UNIT_SIZE;
                if shortest_dist_to_square(pos.x, pos.z, sx, sz, UNIT_SIZE) > radius
                    || self.layers[target].is_covered(x, z)
                {
                    continue;
                }
                let source = self
                    .layers
                    .iter()
                    .enumerate()
                    .find(|(i, l)| *i != target && l.is_covered(x, z))
                    .map(|(_, l)| l.clone());
                if let Some(source) = source {
                    self.layers[target].copy_subchunk_height(x, z, &source);
                    self.layers[target].set_covered(x, z, true);
                    copied = true;
                }
            }
        }
        copied
    }

    /// Copies subchunk `(x, z)` heights from layer `from` into layer `to`.
    pub fn copy_subchunk_height(&mut self, to: usize, from: usize, x: usize, z: usize) -> bool {
        if to == from || to >= self.layers.len() || from >= self.layers.len() {
            return false;
        }
        let source = self.layers[from].clone();
        self.layers[to].copy_subchunk_height(x, z, &source);
        self.layers[to].update_min_max();
        true
    }

    pub fn crop(&mut self, terrain: &HeightField) -> bool {
        let mut changed = false;
        for layer in &mut self.layers {
            changed |= layer.crop(terrain);
        }
        changed | self.cleanup()
    }

    pub fn autogen_depth(&mut self, terrain: &HeightField, factor: f32) {
        for layer in &mut self.layers {
            layer.autogen_depth(terrain, factor);
        }
    }

    pub fn set_fishable(&mut self, layer: usize, x: usize, z: usize, on: bool) -> bool {
        self.layers
            .get_mut(layer)
            .is_some_and(|l| l.set_fishable(x, z, on))
    }

    /// Lowest and highest surface over all layers.
    pub fn height_range(&self) -> Option<(f32, f32)> {
        self.layers.iter().fold(None, |acc, l| match acc {
            None => Some((l.min(), l.max())),
            Some((lo, hi)) => Some((lo.min(l.min()), hi.max(l.max()))),
        })
    }

    pub fn rotate_90(&mut self) {
        for layer in &mut self.layers {
            layer.rotate_90();
        }
    }

    pub fn mirror(&mut self, horizontal: bool) {
        for layer in &mut self.layers {
            layer.mirror(horizontal);
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::{LiquidKind, SubchunkMask};
    use tilesmith_geom::CHUNK_SIZE;

    fn brush(id: u16, radius: f32) -> LiquidBrush {
        LiquidBrush {
            radius,
            liquid_id: id,
            add: true,
            angle: 0.0,
            orientation: 0.0,
            origin: None,
            override_height: false,
            override_liquid_id: false,
            opacity_factor: 0.5,
        }
    }

    fn centre(h: f32) -> Vec3 {
        Vec3::new(CHUNK_SIZE * 0.5, h, CHUNK_SIZE * 0.5)
    }

    #[test]
    fn first_stroke_creates_layer() {
        let ground = HeightField::new(0.0, 0.0, 0.0);
        let mut s = LiquidStack::new();
        let types = LiquidTypeTable::default();
        assert!(s.paint(&ground, centre(2.0), &brush(2, CHUNK_SIZE), &types));
        assert_eq!(s.len(), 1);
        assert_eq!(s.layer(0).unwrap().kind(), LiquidKind::Ocean);
    }

    #[test]
    fn removal_prunes_empty_layers() {
        let ground = HeightField::new(0.0, 0.0, 0.0);
        let types = LiquidTypeTable::default();
        let mut s = LiquidStack::new();
        s.paint(&ground, centre(2.0), &brush(1, CHUNK_SIZE), &types);
        let mut erase = brush(1, CHUNK_SIZE);
        erase.add = false;
        assert!(s.paint(&ground, centre(2.0), &erase, &types));
        assert!(s.is_empty());
        assert!(!s.paint(&ground, centre(2.0), &erase, &types));
    }

    #[test]
    fn override_id_targets_one_layer_and_copies_height() {
        let ground = HeightField::new(0.0, 0.0, 0.0);
        let types = LiquidTypeTable::default();
        let mut s = LiquidStack::new();
        s.paint(&ground, centre(6.0), &brush(2, CHUNK_SIZE), &types);

        let mut magma = brush(3, 1.0);
        magma.override_liquid_id = true;
        assert!(s.paint(&ground, centre(1.0), &magma, &types));
        assert_eq!(s.len(), 2);
        let ocean = s.layer(s.find(2).unwrap()).unwrap();
        let lava = s.layer(s.find(3).unwrap()).unwrap();
        assert!(!ocean.is_covered(3, 3));
        assert!(ocean.is_covered(0, 0));
        assert!(lava.is_covered(3, 3));
        assert!(!lava.is_covered(0, 0));
        // Height came from the ocean underneath, not from the cursor.
        assert_eq!(lava.vertex(4, 4).unwrap().height, 6.0);
    }

    #[test]
    fn unknown_id_falls_back_to_river() {
        let ground = HeightField::new(0.0, 0.0, 0.0);
        let mut s = LiquidStack::new();
        s.paint(&ground, centre(1.0), &brush(77, CHUNK_SIZE), &LiquidTypeTable::default());
        assert_eq!(s.layer(0).unwrap().kind(), LiquidKind::River);
        assert_eq!(s.layer(0).unwrap().liquid_id(), 77);
    }

    #[test]
    fn crop_removes_buried_layer() {
        let ground = HeightField::new(0.0, 0.0, 0.0);
        let mut s = LiquidStack::new();
        s.paint(&ground, centre(1.0), &brush(1, CHUNK_SIZE), &LiquidTypeTable::default());
        assert!(!s.crop(&ground));
        assert!(s.crop(&HeightField::new(0.0, 0.0, 30.0)));
        assert!(s.is_empty());
    }

    #[test]
    fn fishable_and_range() {
        let ground = HeightField::new(0.0, 0.0, 0.0);
        let mut s = LiquidStack::new();
        assert_eq!(s.height_range(), None);
        s.paint(&ground, centre(1.0), &brush(1, CHUNK_SIZE), &LiquidTypeTable::default());
        assert_eq!(s.height_range(), Some((1.0, 1.0)));
        assert!(s.set_fishable(0, 2, 2, false));
        assert!(!s.layer(0).unwrap().fishable().get(2, 2));
        assert_ne!(s.layer(0).unwrap().fishable(), SubchunkMask::ALL);
        assert!(!s.set_fishable(3, 0, 0, true));
    }
}
