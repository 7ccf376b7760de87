use tilesmith_geom::Vec3;
use tilesmith_mesh::VERTEX_COUNT;

/// Highest editable channel value. Values above 1 brighten the texture.
pub const MAX_COLOR: f32 = 2.0;

/// Per-vertex tint, `(r, g, b)` in `[0, 2]`, neutral at 1.
#[derive(Clone, Debug, PartialEq)]
pub struct VertexColors {
    colors: [Vec3; VERTEX_COUNT],
}

impl VertexColors {
    pub const NEUTRAL: Vec3 = Vec3::new(1.0, 1.0, 1.0);

    pub fn new() -> Self {
        Self {
            colors: [Self::NEUTRAL; VERTEX_COUNT],
        }
    }

    pub fn from_colors(colors: [Vec3; VERTEX_COUNT]) -> Self {
        Self { colors }
    }

    pub fn colors(&self) -> &[Vec3; VERTEX_COUNT] {
        &self.colors
    }

    pub fn get(&self, i: usize) -> Option<Vec3> {
        self.colors.get(i).copied()
    }

    /// Moves vertex `i` toward `target` by `weight` in `[0, 1]`.
    pub fn blend(&mut self, i: usize, target: Vec3, weight: f32) -> bool {
        let Some(c) = self.colors.get_mut(i) else {
            return false;
        };
        let w = weight.clamp(0.0, 1.0);
        let next = *c + (target - *c) * w;
        let next = Vec3::new(
            next.x.clamp(0.0, MAX_COLOR),
            next.y.clamp(0.0, MAX_COLOR),
            next.z.clamp(0.0, MAX_COLOR),
        );
        let changed = next != *c;
        *c = next;
        changed
    }

    pub fn remap(&self, source: impl Fn(usize) -> usize) -> Self {
        let mut out = Self::new();
        for (i, c) in out.colors.iter_mut().enumerate() {
            *c = self.colors[source(i)];
        }
        out
    }
}

impl Default for VertexColors {
    fn default() -> Self {
        Self::new()
    }
}
