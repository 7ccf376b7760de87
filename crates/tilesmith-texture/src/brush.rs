use serde::{Deserialize, Serialize};

/// Round texture brush. Full weight inside `hardness * radius`, then a linear
/// fade to zero at `radius`.
#[derive(Clone, Copy, Debug, PartialEq, Serialize, Deserialize)]
pub struct Brush {
    pub radius: f32,
    pub hardness: f32,
}

impl Brush {
    pub fn new(radius: f32, hardness: f32) -> Self {
        Self {
            radius: radius.max(0.0),
            hardness: hardness.clamp(0.0, 1.0),
        }
    }

    /// Whether anything at `dist` from the centre gets painted.
    #[inline]
    pub fn reaches(&self, dist: f32) -> bool {
        dist < self.radius
    }

    pub fn falloff(&self, dist: f32) -> f32 {
        if !self.reaches(dist) {
            return 0.0;
        }
        let inner = self.radius * self.hardness;
        if dist <= inner {
            return 1.0;
        }
        1.0 - (dist - inner) / (self.radius - inner)
    }
}

impl Default for Brush {
    fn default() -> Self {
        Self::new(15.0, 0.5)
    }
}
