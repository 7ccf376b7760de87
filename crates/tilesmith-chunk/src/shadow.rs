use tilesmith_alpha::ALPHA_SIZE;

/// 64x64 baked shadow bits, one `u64` row per texel row with bit `x` set
/// for a shadowed texel.
#[derive(Clone, Debug, PartialEq, Eq, Hash)]
pub struct ShadowMap {
    rows: [u64; ALPHA_SIZE],
}

impl ShadowMap {
    pub fn new() -> Self {
        Self {
            rows: [0; ALPHA_SIZE],
        }
    }

    pub fn from_rows(rows: [u64; ALPHA_SIZE]) -> Self {
        Self { rows }
    }

    pub fn rows(&self) -> &[u64; ALPHA_SIZE] {
        &self.rows
    }

    pub fn get(&self, x: usize, z: usize) -> bool {
        x < ALPHA_SIZE && z < ALPHA_SIZE && self.rows[z] & (1 << x) != 0
    }

    pub fn set(&mut self, x: usize, z: usize, on: bool) -> bool {
        if x >= ALPHA_SIZE || z >= ALPHA_SIZE {
            return false;
        }
        let before = self.rows[z];
        if on {
            self.rows[z] |= 1 << x;
        } else {
            self.rows[z] &= !(1 << x);
        }
        before != self.rows[z]
    }

    pub fn is_empty(&self) -> bool {
        self.rows.iter().all(|&r| r == 0)
    }

    pub fn remap(&self, source: impl Fn(usize, usize) -> (usize, usize)) -> Self {
        let mut out = Self::new();
        for z in 0..ALPHA_SIZE {
            for x in 0..ALPHA_SIZE {
                let (sx, sz) = source(x, z);
                out.set(x, z, self.get(sx, sz));
            }
        }
        out
    }
}

impl Default for ShadowMap {
    fn default() -> Self {
        Self::new()
    }
}
