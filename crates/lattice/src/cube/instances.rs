use glam::{Mat4, Vec3};
use tracing::warn;

use crate::color::{CellColor, Palette, ResolvedColor, Rgb, NEUTRAL_COLOR};

use super::{CellIndex, LatticeLayout, SyncError, CELL_EDGE};

#[derive(Debug, Clone, Copy, Default, PartialEq, Eq)]
pub struct SyncReport {
    pub changed_slots: usize,
    pub fallback_slots: usize,
    pub transforms_written: bool,
}

/// Dirty streams handed to the renderer by [`InstanceBuffer::take_upload`].
#[derive(Debug, Clone, Copy)]
pub struct InstanceUpload<'a> {
    pub transforms: Option<&'a [Mat4]>,
    pub colors: Option<&'a [Rgb]>,
}

/// Per-instance transform and colour streams for one mounted lattice.
///
/// Slot `i` always holds cell `i`; the length is fixed at `N³` for the
/// lifetime of the buffer.
#[derive(Debug, Clone)]
pub struct InstanceBuffer {
    transforms: Vec<Mat4>,
    colors: Vec<Rgb>,
    transforms_written: bool,
    transforms_dirty: bool,
    colors_dirty: bool,
    upload_count: u64,
}

impl InstanceBuffer {
    pub fn new(slot_count: usize) -> Self {
        Self {
            transforms: vec![Mat4::IDENTITY; slot_count],
            colors: vec![NEUTRAL_COLOR; slot_count],
            transforms_written: false,
            transforms_dirty: false,
            colors_dirty: false,
            upload_count: 0,
        }
    }

    pub fn len(&self) -> usize {
        self.colors.len()
    }

    pub fn is_empty(&self) -> bool {
        self.colors.is_empty()
    }

    pub fn transforms(&self) -> &[Mat4] {
        &self.transforms
    }

    pub fn colors(&self) -> &[Rgb] {
        &self.colors
    }

    pub fn color(&self, index: CellIndex) -> Option<Rgb> {
        self.colors.get(index).copied()
    }

    pub fn transforms_written(&self) -> bool {
        self.transforms_written
    }

    pub fn is_dirty(&self) -> bool {
        self.transforms_dirty || self.colors_dirty
    }

    pub fn upload_count(&self) -> u64 {
        self.upload_count
    }

    /// World-space box of one instance, derived from its transform.
    pub fn instance_bounds(&self, index: CellIndex) -> Option<(Vec3, Vec3)> {
        let transform = self.transforms.get(index)?;
        let (scale, _, translation) = transform.to_scale_rotation_translation();
        let half = scale.abs() * (CELL_EDGE * 0.5);
        Some((translation - half, translation + half))
    }

    /// Writes transforms (first call only) and colours for every slot.
    ///
    /// Fails without touching any slot when `cell_colors` is not exactly one
    /// entry per slot. Palette indices out of range render in the neutral
    /// colour and are only reported in the returned [`SyncReport`].
    pub fn sync(
        &mut self,
        layout: &LatticeLayout,
        cell_colors: &[CellColor],
        palette: &Palette,
    ) -> Result<SyncReport, SyncError> {
        let expected = self.len();
        if cell_colors.len() != expected {
            return Err(SyncError::LengthMismatch {
                expected,
                actual: cell_colors.len(),
            });
        }
        if layout.cell_count() != expected {
            return Err(SyncError::LayoutMismatch {
                expected,
                actual: layout.cell_count(),
            });
        }

        let mut report = SyncReport::default();
        if !self.transforms_written {
            for (slot, position) in self.transforms.iter_mut().zip(layout.positions()) {
                *slot = Mat4::from_translation(*position);
            }
            self.transforms_written = true;
            self.transforms_dirty = true;
            // A fresh buffer has never been uploaded, so both streams go up together.
            self.colors_dirty = true;
            report.transforms_written = true;
        }

        let mut first_fallback: Option<(CellIndex, u16)> = None;
        for (index, (slot, cell)) in self.colors.iter_mut().zip(cell_colors).enumerate() {
            let resolved = palette.resolve(*cell);
            if let ResolvedColor::OutOfRange(palette_index) = resolved {
                report.fallback_slots += 1;
                first_fallback.get_or_insert((index, palette_index));
            }
            let color = resolved.display_color();
            if *slot != color {
                *slot = color;
                report.changed_slots += 1;
            }
        }

        if report.changed_slots > 0 {
            self.colors_dirty = true;
        }
        if let Some((cell, palette_index)) = first_fallback {
            warn!(
                fallback_slots = report.fallback_slots,
                first_cell = cell,
                first_palette_index = palette_index,
                palette_len = palette.len(),
                "palette_index_fallback"
            );
        }

        Ok(report)
    }

    /// Returns the dirty streams once and clears both dirty flags.
    pub fn take_upload(&mut self) -> Option<InstanceUpload<'_>> {
        if !self.is_dirty() {
            return None;
        }
        let transforms_dirty = std::mem::take(&mut self.transforms_dirty);
        let colors_dirty = std::mem::take(&mut self.colors_dirty);
        self.upload_count = self.upload_count.saturating_add(1);
        Some(InstanceUpload {
            transforms: transforms_dirty.then_some(self.transforms.as_slice()),
            colors: colors_dirty.then_some(self.colors.as_slice()),
        })
    }
}
