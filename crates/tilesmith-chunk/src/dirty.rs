use std::ops::{BitOr, BitOrAssign};

/// What a mutation touched, for whoever mirrors chunk state elsewhere
/// (GPU buffers, collision, minimap).
#[derive(Clone, Copy, Debug, Default, PartialEq, Eq, Hash)]
pub struct DirtySet {
    pub heights: bool,
    pub normals: bool,
    pub bounds: bool,
    pub holes: bool,
    pub lod: bool,
    pub alpha: bool,
    pub shadows: bool,
    pub vertex_colors: bool,
    pub liquid: bool,
    pub area: bool,
}

impl DirtySet {
    pub const NONE: DirtySet = DirtySet {
        heights: false,
        normals: false,
        bounds: false,
        holes: false,
        lod: false,
        alpha: false,
        shadows: false,
        vertex_colors: false,
        liquid: false,
        area: false,
    };

    pub const ALL: DirtySet = DirtySet {
        heights: true,
        normals: true,
        bounds: true,
        holes: true,
        lod: true,
        alpha: true,
        shadows: true,
        vertex_colors: true,
        liquid: true,
        area: true,
    };

    /// Height edit: the mesh, its normals, bounds and LOD all need a refresh.
    pub const TERRAIN: DirtySet = DirtySet {
        heights: true,
        normals: true,
        bounds: true,
        lod: true,
        ..DirtySet::NONE
    };

    pub fn is_empty(&self) -> bool {
        *self == Self::NONE
    }

    /// `self` when `changed`, nothing otherwise.
    pub fn when(self, changed: bool) -> Self {
        if changed { self } else { Self::NONE }
    }
}

impl BitOr for DirtySet {
    type Output = DirtySet;

    fn bitor(self, rhs: DirtySet) -> DirtySet {
        DirtySet {
            heights: self.heights | rhs.heights,
            normals: self.normals | rhs.normals,
            bounds: self.bounds | rhs.bounds,
            holes: self.holes | rhs.holes,
            lod: self.lod | rhs.lod,
            alpha: self.alpha | rhs.alpha,
            shadows: self.shadows | rhs.shadows,
            vertex_colors: self.vertex_colors | rhs.vertex_colors,
            liquid: self.liquid | rhs.liquid,
            area: self.area | rhs.area,
        }
    }
}

impl BitOrAssign for DirtySet {
    fn bitor_assign(&mut self, rhs: DirtySet) {
        *self = *self | rhs;
    }
}
