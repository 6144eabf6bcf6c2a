mod camera;
mod host;
mod instances;
mod layout;
mod picking;
mod transform;

use thiserror::Error;

pub use camera::{
    Camera3D, DirectionalLight, Lighting, DEFAULT_FAR, DEFAULT_FOV_Y_DEGREES, DEFAULT_NEAR,
};
pub use host::{MountOutcome, RenderSurfaceHost, SurfaceState, DEFAULT_FRAME_MARGIN};
pub use instances::{InstanceBuffer, InstanceUpload, SyncReport};
pub use layout::{
    cell_coords, cell_index, cell_position, CellIndex, CubeSize, LatticeLayout, CELL_EDGE,
    CELL_SPACING, MAX_CUBE_SIZE,
};
pub use picking::{pick_instance, ray_aabb_hit_t, resolve, PickHit, Ray};
pub use transform::{ndc_to_screen, screen_to_ndc, world_to_screen, Viewport};

#[derive(Debug, Clone, Copy, PartialEq, Eq, Error)]
pub enum LatticeError {
    #[error("cube size must be at least 1, got {size}")]
    InvalidCubeSize { size: i32 },
    #[error("cube size {size} exceeds the supported maximum of {max}")]
    CubeTooLarge { size: u32, max: u32 },
}

#[derive(Debug, Clone, Copy, PartialEq, Eq, Error)]
pub enum SyncError {
    #[error("cell colour count mismatch: expected {expected}, got {actual}")]
    LengthMismatch { expected: usize, actual: usize },
    #[error("layout cell count mismatch: expected {expected}, got {actual}")]
    LayoutMismatch { expected: usize, actual: usize },
}

#[derive(Debug, Clone, Copy, PartialEq, Eq, Error)]
pub enum PickError {
    #[error("render surface unavailable: no lattice is mounted")]
    SurfaceUnavailable,
    #[error("lattice mounted but instances have not been synchronised yet")]
    NotSynced,
}

#[derive(Debug, Clone, Copy, PartialEq, Eq, Error)]
pub enum HostError {
    #[error("render surface unavailable: no lattice is mounted")]
    NotMounted,
    #[error(transparent)]
    Sync(#[from] SyncError),
}
