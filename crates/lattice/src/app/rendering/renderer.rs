use std::sync::Arc;

use glam::Mat4;
use pixels::{Error, Pixels, SurfaceTexture};
use winit::window::Window;

use crate::color::Rgb;
use crate::cube::{CellIndex, InstanceUpload, RenderSurfaceHost, Viewport};

use super::raster::{clear_frame, draw_lattice, LatticeView, CLEAR_COLOR};

/// Renderer-side copy of the instance streams. Only updated through
/// [`InstanceUpload`], so it mirrors exactly what has been uploaded.
#[derive(Debug, Default)]
pub(crate) struct InstanceMirror {
    transforms: Vec<Mat4>,
    colors: Vec<Rgb>,
}

impl InstanceMirror {
    pub(crate) fn apply(&mut self, upload: InstanceUpload<'_>) {
        if let Some(transforms) = upload.transforms {
            self.transforms.clear();
            self.transforms.extend_from_slice(transforms);
        }
        if let Some(colors) = upload.colors {
            self.colors.clear();
            self.colors.extend_from_slice(colors);
        }
    }

    pub(crate) fn len(&self) -> usize {
        self.transforms.len()
    }

    /// Both streams describe the same lattice of `expected` slots.
    pub(crate) fn is_current_for(&self, expected: usize) -> bool {
        self.transforms.len() == expected && self.colors.len() == expected
    }
}

pub struct Renderer {
    window: Arc<Window>,
    pixels: Pixels<'static>,
    viewport: Viewport,
    mirror: InstanceMirror,
    draw_order: Vec<(CellIndex, f32)>,
}

impl Renderer {
    pub fn new(window: Arc<Window>) -> Result<Self, Error> {
        let size = window.inner_size();
        let pixels = Self::build_pixels(Arc::clone(&window), size.width, size.height)?;
        Ok(Self {
            window,
            pixels,
            viewport: Viewport::new(size.width, size.height),
            mirror: InstanceMirror::default(),
            draw_order: Vec::new(),
        })
    }

    pub fn resize(&mut self, width: u32, height: u32) -> Result<(), Error> {
        if width == 0 || height == 0 {
            return Ok(());
        }
        self.pixels = Self::build_pixels(Arc::clone(&self.window), width, height)?;
        self.viewport = Viewport::new(width, height);
        Ok(())
    }

    fn build_pixels(
        window: Arc<Window>,
        width: u32,
        height: u32,
    ) -> Result<Pixels<'static>, Error> {
        let surface = SurfaceTexture::new(width, height, window);
        Pixels::new(width, height, surface)
    }

    pub fn viewport(&self) -> Viewport {
        self.viewport
    }

    /// Pulls dirty instance streams from the host. Returns whether anything
    /// was uploaded.
    pub fn upload_instances(&mut self, host: &mut RenderSurfaceHost) -> bool {
        match host.take_instance_upload() {
            Some(upload) => {
                self.mirror.apply(upload);
                true
            }
            None => false,
        }
    }

    pub fn render(&mut self, host: &RenderSurfaceHost) -> Result<(), Error> {
        if self.viewport.is_empty() {
            return Ok(());
        }
        let frame = self.pixels.frame_mut();
        clear_frame(frame, CLEAR_COLOR);

        let expected_slots = host.instances().map_or(0, |instances| instances.len());
        if expected_slots > 0 && self.mirror.is_current_for(expected_slots) {
            let view = LatticeView {
                camera: host.camera(),
                lighting: host.lighting(),
                transforms: &self.mirror.transforms,
                colors: &self.mirror.colors,
                hovered: host.hovered_cell(),
            };
            draw_lattice(frame, self.viewport, &view, &mut self.draw_order);
        }
        self.pixels.render()
    }

    /// RGBA8 contents of the last rendered frame.
    pub fn frame_rgba(&self) -> &[u8] {
        self.pixels.frame()
    }

    pub fn uploaded_slot_count(&self) -> usize {
        self.mirror.len()
    }
}
