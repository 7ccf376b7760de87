/// Read access to terrain heights in world coordinates.
///
/// Brushes that look past a chunk's own border (blur, normals) receive one of
/// these from the caller instead of reaching into neighbouring chunks.
pub trait TerrainSampler {
    /// Terrain height at world `(x, z)`, `None` when nothing is loaded there.
    fn sample_height(&self, x: f32, z: f32) -> Option<f32>;
}

impl<T: TerrainSampler + ?Sized> TerrainSampler for &T {
    fn sample_height(&self, x: f32, z: f32) -> Option<f32> {
        (**self).sample_height(x, z)
    }
}

/// Asks `primary` first and falls back to `secondary`.
pub struct Fallback<A, B> {
    pub primary: A,
    pub secondary: B,
}

impl<A: TerrainSampler, B: TerrainSampler> TerrainSampler for Fallback<A, B> {
    fn sample_height(&self, x: f32, z: f32) -> Option<f32> {
        self.primary
            .sample_height(x, z)
            .or_else(|| self.secondary.sample_height(x, z))
    }
}

/// Samples nothing. Useful for chunks edited in isolation.
#[derive(Clone, Copy, Debug, Default)]
pub struct NoTerrain;

impl TerrainSampler for NoTerrain {
    fn sample_height(&self, _x: f32, _z: f32) -> Option<f32> {
        None
    }
}
