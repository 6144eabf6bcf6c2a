use glam::{Vec2, Vec3};
use tracing::{debug, info};

use crate::color::{CellColor, Palette};

use super::picking::resolve;
use super::{
    Camera3D, CellIndex, CubeSize, HostError, InstanceBuffer, InstanceUpload, LatticeError,
    LatticeLayout, Lighting, PickError, Viewport,
};

pub const DEFAULT_FRAME_MARGIN: f32 = 1.15;

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum SurfaceState {
    Unmounted,
    Mounted(CubeSize),
}

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum MountOutcome {
    Created,
    /// Same edge length as the current lattice; the existing buffers are kept.
    Reused,
    Replaced {
        previous: CubeSize,
    },
}

#[derive(Debug)]
struct MountedLattice {
    layout: LatticeLayout,
    instances: InstanceBuffer,
    synced_inputs: Option<SyncedInputs>,
}

#[derive(Debug, PartialEq)]
struct SyncedInputs {
    cell_colors: Vec<CellColor>,
    palette: Palette,
}

impl SyncedInputs {
    fn matches(&self, cell_colors: &[CellColor], palette: &Palette) -> bool {
        self.cell_colors == cell_colors && self.palette == *palette
    }
}

/// Owns the camera, lights and the mounted lattice's instance buffer.
///
/// The host decides *when* to resynchronise (value comparison against the
/// last synced inputs); [`InstanceBuffer::sync`] decides *how*.
#[derive(Debug)]
pub struct RenderSurfaceHost {
    camera: Camera3D,
    lighting: Lighting,
    viewport: Viewport,
    frame_margin: f32,
    lattice: Option<MountedLattice>,
    hovered_cell: Option<CellIndex>,
}

impl RenderSurfaceHost {
    pub fn new(viewport: Viewport) -> Self {
        Self {
            camera: Camera3D::default(),
            lighting: Lighting::default(),
            viewport,
            frame_margin: DEFAULT_FRAME_MARGIN,
            lattice: None,
            hovered_cell: None,
        }
    }

    pub fn with_lighting(mut self, lighting: Lighting) -> Self {
        self.lighting = lighting;
        self
    }

    pub fn with_frame_margin(mut self, frame_margin: f32) -> Self {
        if frame_margin.is_finite() && frame_margin >= 1.0 {
            self.frame_margin = frame_margin;
        }
        self
    }

    pub fn state(&self) -> SurfaceState {
        match &self.lattice {
            Some(lattice) => SurfaceState::Mounted(lattice.layout.size()),
            None => SurfaceState::Unmounted,
        }
    }

    /// Mounts a lattice of edge `edge`. Invalid sizes are rejected before any
    /// allocation and leave the current lattice in place.
    pub fn mount(&mut self, edge: i32) -> Result<MountOutcome, LatticeError> {
        let size = CubeSize::new(edge)?;
        let outcome = match &self.lattice {
            Some(current) if current.layout.size() == size => return Ok(MountOutcome::Reused),
            Some(current) => MountOutcome::Replaced {
                previous: current.layout.size(),
            },
            None => MountOutcome::Created,
        };

        let layout = LatticeLayout::new(size);
        let instances = InstanceBuffer::new(layout.cell_count());
        self.lattice = Some(MountedLattice {
            layout,
            instances,
            synced_inputs: None,
        });
        self.hovered_cell = None;
        info!(
            cube_size = size.edge(),
            cell_count = size.cell_count(),
            outcome = ?outcome,
            "lattice_mounted"
        );
        Ok(outcome)
    }

    pub fn unmount(&mut self) -> bool {
        let was_mounted = self.lattice.take().is_some();
        self.hovered_cell = None;
        if was_mounted {
            info!("lattice_unmounted");
        }
        was_mounted
    }

    /// Resynchronises the instance buffer if `cell_colors` or `palette` differ
    /// by value from the last successful sync. Returns whether a sync ran.
    pub fn update_inputs(
        &mut self,
        cell_colors: &[CellColor],
        palette: &Palette,
    ) -> Result<bool, HostError> {
        let lattice = self.lattice.as_mut().ok_or(HostError::NotMounted)?;
        if lattice
            .synced_inputs
            .as_ref()
            .is_some_and(|synced| synced.matches(cell_colors, palette))
        {
            return Ok(false);
        }

        let report = lattice
            .instances
            .sync(&lattice.layout, cell_colors, palette)?;
        match lattice.synced_inputs.as_mut() {
            Some(synced) => {
                synced.cell_colors.clear();
                synced.cell_colors.extend_from_slice(cell_colors);
                if synced.palette != *palette {
                    synced.palette = palette.clone();
                }
            }
            None => {
                lattice.synced_inputs = Some(SyncedInputs {
                    cell_colors: cell_colors.to_vec(),
                    palette: palette.clone(),
                });
            }
        }
        debug!(
            changed_slots = report.changed_slots,
            fallback_slots = report.fallback_slots,
            transforms_written = report.transforms_written,
            "instances_synced"
        );
        Ok(true)
    }

    /// Resolves the pointer to a cell without side effects.
    pub fn resolve_pointer(&self, pointer_px: Vec2) -> Result<Option<CellIndex>, PickError> {
        let lattice = self.lattice.as_ref().ok_or(PickError::SurfaceUnavailable)?;
        if !lattice.instances.transforms_written() {
            return Err(PickError::NotSynced);
        }
        Ok(resolve(
            pointer_px,
            self.viewport,
            &self.camera,
            &lattice.instances,
            lattice.layout.bounds(),
        ))
    }

    /// Resolves a click and, on a hit, calls `on_cell_click` exactly once.
    pub fn handle_pointer_click<F>(
        &self,
        pointer_px: Vec2,
        on_cell_click: F,
    ) -> Result<Option<CellIndex>, PickError>
    where
        F: FnOnce(CellIndex),
    {
        let resolved = self.resolve_pointer(pointer_px)?;
        if let Some(index) = resolved {
            debug!(cell = index, x = pointer_px.x, y = pointer_px.y, "cell_clicked");
            on_cell_click(index);
        }
        Ok(resolved)
    }

    /// Tracks the cell under the pointer for highlighting. Unavailable
    /// surfaces simply clear the hover.
    pub fn update_hover(&mut self, pointer_px: Option<Vec2>) -> Option<CellIndex> {
        self.hovered_cell = pointer_px
            .and_then(|pointer| self.resolve_pointer(pointer).ok())
            .flatten();
        self.hovered_cell
    }

    pub fn hovered_cell(&self) -> Option<CellIndex> {
        self.hovered_cell
    }

    pub fn take_instance_upload(&mut self) -> Option<InstanceUpload<'_>> {
        self.lattice.as_mut()?.instances.take_upload()
    }

    pub fn layout(&self) -> Option<&LatticeLayout> {
        self.lattice.as_ref().map(|lattice| &lattice.layout)
    }

    pub fn instances(&self) -> Option<&InstanceBuffer> {
        self.lattice.as_ref().map(|lattice| &lattice.instances)
    }

    pub fn camera(&self) -> &Camera3D {
        &self.camera
    }

    pub fn camera_mut(&mut self) -> &mut Camera3D {
        &mut self.camera
    }

    pub fn lighting(&self) -> &Lighting {
        &self.lighting
    }

    pub fn set_lighting(&mut self, lighting: Lighting) {
        self.lighting = lighting;
    }

    pub fn viewport(&self) -> Viewport {
        self.viewport
    }

    pub fn set_viewport(&mut self, viewport: Viewport) {
        self.viewport = viewport;
    }

    /// Points the camera at the lattice centre and backs off until the whole
    /// lattice is in view.
    pub fn frame_camera_to_lattice(&mut self) {
        let Some(layout) = self.layout() else {
            return;
        };
        let radius = layout.bounding_radius();
        self.camera.target = Vec3::ZERO;
        self.camera.frame_sphere(radius, self.frame_margin);
    }
}
