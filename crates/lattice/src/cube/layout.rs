use glam::{UVec3, Vec3};

use super::LatticeError;

/// Centre-to-centre distance between neighbouring cells. Cubes have unit edge
/// length, so anything above 1.0 leaves a visible gap between faces.
pub const CELL_SPACING: f32 = 1.1;
pub const CELL_EDGE: f32 = 1.0;
pub const MAX_CUBE_SIZE: u32 = 32;

pub type CellIndex = usize;

/// Validated lattice edge length `N`.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub struct CubeSize(u32);

impl CubeSize {
    pub fn new(edge: i32) -> Result<Self, LatticeError> {
        if edge <= 0 {
            return Err(LatticeError::InvalidCubeSize { size: edge });
        }
        let edge = edge as u32;
        if edge > MAX_CUBE_SIZE {
            return Err(LatticeError::CubeTooLarge {
                size: edge,
                max: MAX_CUBE_SIZE,
            });
        }
        Ok(Self(edge))
    }

    pub fn edge(self) -> u32 {
        self.0
    }

    pub fn cell_count(self) -> usize {
        let edge = self.0 as usize;
        edge * edge * edge
    }

    pub fn contains(self, index: CellIndex) -> bool {
        index < self.cell_count()
    }
}

/// Grid coordinates of `index`: x varies fastest, then y, then z.
pub fn cell_coords(index: CellIndex, size: CubeSize) -> UVec3 {
    let edge = size.edge() as usize;
    UVec3::new(
        (index % edge) as u32,
        ((index / edge) % edge) as u32,
        (index / (edge * edge)) as u32,
    )
}

pub fn cell_index(coords: UVec3, size: CubeSize) -> Option<CellIndex> {
    let edge = size.edge();
    if coords.x >= edge || coords.y >= edge || coords.z >= edge {
        return None;
    }
    let edge = edge as usize;
    Some(coords.x as usize + coords.y as usize * edge + coords.z as usize * edge * edge)
}

/// World-space centre of a cell, with the lattice centred on the origin.
pub fn cell_position(index: CellIndex, size: CubeSize) -> Vec3 {
    let offset = (size.edge() as f32 - 1.0) * 0.5;
    let coords = cell_coords(index, size).as_vec3();
    (coords - Vec3::splat(offset)) * CELL_SPACING
}

/// Cached cell positions for one lattice lifetime.
#[derive(Debug, Clone)]
pub struct LatticeLayout {
    size: CubeSize,
    positions: Vec<Vec3>,
}

impl LatticeLayout {
    pub fn new(size: CubeSize) -> Self {
        let positions = (0..size.cell_count())
            .map(|index| cell_position(index, size))
            .collect();
        Self { size, positions }
    }

    pub fn size(&self) -> CubeSize {
        self.size
    }

    pub fn cell_count(&self) -> usize {
        self.positions.len()
    }

    pub fn position(&self, index: CellIndex) -> Option<Vec3> {
        self.positions.get(index).copied()
    }

    pub fn positions(&self) -> &[Vec3] {
        &self.positions
    }

    /// Axis-aligned bounds enclosing every cube in the lattice.
    pub fn bounds(&self) -> (Vec3, Vec3) {
        let half_span = (self.size.edge() as f32 - 1.0) * 0.5 * CELL_SPACING + CELL_EDGE * 0.5;
        (Vec3::splat(-half_span), Vec3::splat(half_span))
    }

    pub fn bounding_radius(&self) -> f32 {
        let (_, max) = self.bounds();
        max.length()
    }
}
