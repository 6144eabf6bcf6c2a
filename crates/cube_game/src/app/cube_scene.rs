use std::path::PathBuf;

use lattice::cube::{cell_coords, cell_index};
use lattice::{
    CellColor, CellIndex, CubeSize, InputSnapshot, LatticeConfig, Palette, RenderSurfaceHost,
    Scene, SceneCommand, MAX_CUBE_SIZE,
};
use tracing::{info, warn};

use super::save::{read_save, write_save, LatticeSave};

/// Owns the colour assignment array and palette and reacts to cell clicks by
/// cycling the clicked cell through the palette.
pub(crate) struct CubeScene {
    cube_size: i32,
    palette: Palette,
    cell_colors: Vec<CellColor>,
    save_path: Option<PathBuf>,
}

impl CubeScene {
    pub(crate) fn new(config: &LatticeConfig, save_path: Option<PathBuf>) -> Self {
        Self {
            cube_size: config.cube_size,
            palette: config.palette.clone(),
            cell_colors: Vec::new(),
            save_path,
        }
    }

    fn painted_count(&self) -> usize {
        self.cell_colors.iter().filter(|cell| cell.is_some()).count()
    }

    fn clear(&mut self) {
        self.cell_colors.iter_mut().for_each(|cell| *cell = None);
        info!(cube_size = self.cube_size, "cells_cleared");
    }

    fn mount_and_frame(host: &mut RenderSurfaceHost, edge: i32) -> bool {
        match host.mount(edge) {
            Ok(outcome) => {
                host.frame_camera_to_lattice();
                info!(cube_size = edge, outcome = ?outcome, "lattice_ready");
                true
            }
            Err(error) => {
                warn!(cube_size = edge, error = %error, "lattice_mount_failed");
                false
            }
        }
    }

    /// Remounts at `edge`, keeping the colour of every cell whose coordinates
    /// still fit inside the new lattice.
    fn resize(&mut self, host: &mut RenderSurfaceHost, edge: i32) {
        if edge == self.cube_size {
            return;
        }
        let (Ok(old_size), Ok(new_size)) = (CubeSize::new(self.cube_size), CubeSize::new(edge))
        else {
            info!(requested = edge, "cube_resize_ignored");
            return;
        };
        if !Self::mount_and_frame(host, edge) {
            return;
        }
        self.cell_colors = remap_cells(&self.cell_colors, old_size, new_size);
        self.cube_size = edge;
    }

    fn save(&self) {
        let Some(path) = self.save_path.as_ref() else {
            warn!("save_unavailable");
            return;
        };
        let save = LatticeSave::new(self.cube_size, self.palette.clone(), self.cell_colors.clone());
        match write_save(path, &save) {
            Ok(()) => info!(
                path = %path.display(),
                cube_size = self.cube_size,
                painted = self.painted_count(),
                "lattice_saved"
            ),
            Err(error) => warn!(error = %error, "lattice_save_failed"),
        }
    }

    fn load_from_disk(&mut self, host: &mut RenderSurfaceHost) {
        let Some(path) = self.save_path.clone() else {
            warn!("load_unavailable");
            return;
        };
        let save = match read_save(&path) {
            Ok(save) => save,
            Err(error) => {
                warn!(error = %error, "lattice_load_failed");
                return;
            }
        };
        if save.cube_size != self.cube_size && !Self::mount_and_frame(host, save.cube_size) {
            return;
        }
        info!(
            path = %path.display(),
            cube_size = save.cube_size,
            palette_len = save.palette.len(),
            "lattice_loaded"
        );
        self.cube_size = save.cube_size;
        self.palette = save.palette;
        self.cell_colors = save.cells;
    }
}

impl Scene for CubeScene {
    fn load(&mut self, host: &mut RenderSurfaceHost) {
        if !Self::mount_and_frame(host, self.cube_size) {
            return;
        }
        let cell_count = host.layout().map_or(0, |layout| layout.cell_count());
        self.cell_colors = vec![None; cell_count];
    }

    fn update(
        &mut self,
        _fixed_dt_seconds: f32,
        input: &InputSnapshot,
        host: &mut RenderSurfaceHost,
    ) -> SceneCommand {
        if input.reset_pressed() {
            self.clear();
        }
        if input.grow_pressed() && self.cube_size < MAX_CUBE_SIZE as i32 {
            self.resize(host, self.cube_size + 1);
        }
        if input.shrink_pressed() && self.cube_size > 1 {
            self.resize(host, self.cube_size - 1);
        }
        if input.save_pressed() {
            self.save();
        }
        if input.load_pressed() {
            self.load_from_disk(host);
        }
        SceneCommand::None
    }

    fn on_cell_click(&mut self, index: CellIndex) {
        let Some(cell) = self.cell_colors.get_mut(index) else {
            warn!(cell = index, "click_outside_lattice");
            return;
        };
        *cell = next_color(*cell, self.palette.len());
    }

    fn cell_colors(&self) -> &[CellColor] {
        &self.cell_colors
    }

    fn palette(&self) -> &Palette {
        &self.palette
    }

    fn unload(&mut self, host: &mut RenderSurfaceHost) {
        host.unmount();
        info!(painted = self.painted_count(), "scene_unloaded");
    }

    fn debug_title(&self, host: &RenderSurfaceHost) -> Option<String> {
        let hovered = match host.hovered_cell() {
            Some(index) => index.to_string(),
            None => "-".to_string(),
        };
        Some(format!(
            "Cube Lattice | N={} | painted {}/{} | hover {}",
            self.cube_size,
            self.painted_count(),
            self.cell_colors.len(),
            hovered
        ))
    }
}

/// unassigned -> 0 -> 1 -> ... -> last -> unassigned. Stale indices past the
/// palette end reset to unassigned.
fn next_color(current: CellColor, palette_len: usize) -> CellColor {
    let next = match current {
        None => 0,
        Some(index) => usize::from(index) + 1,
    };
    if next < palette_len {
        u16::try_from(next).ok()
    } else {
        None
    }
}

fn remap_cells(cells: &[CellColor], old_size: CubeSize, new_size: CubeSize) -> Vec<CellColor> {
    let mut remapped = vec![None; new_size.cell_count()];
    for (index, cell) in cells.iter().enumerate() {
        if cell.is_none() || !old_size.contains(index) {
            continue;
        }
        if let Some(target) = cell_index(cell_coords(index, old_size), new_size) {
            remapped[target] = *cell;
        }
    }
    remapped
}
