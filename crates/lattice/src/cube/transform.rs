use glam::{Mat4, Vec2, Vec3};

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct Viewport {
    pub width: u32,
    pub height: u32,
}

impl Viewport {
    pub fn new(width: u32, height: u32) -> Self {
        Self { width, height }
    }

    pub fn is_empty(&self) -> bool {
        self.width == 0 || self.height == 0
    }

    pub fn aspect(&self) -> f32 {
        if self.is_empty() {
            1.0
        } else {
            self.width as f32 / self.height as f32
        }
    }
}

/// Screen pixels to normalised device coordinates. Screen Y grows downwards,
/// NDC Y grows upwards.
pub fn screen_to_ndc(screen_px: Vec2, viewport: Viewport) -> Option<Vec2> {
    if viewport.is_empty() {
        return None;
    }
    Some(Vec2::new(
        2.0 * screen_px.x / viewport.width as f32 - 1.0,
        1.0 - 2.0 * screen_px.y / viewport.height as f32,
    ))
}

pub fn ndc_to_screen(ndc: Vec2, viewport: Viewport) -> Vec2 {
    Vec2::new(
        (ndc.x + 1.0) * 0.5 * viewport.width as f32,
        (1.0 - ndc.y) * 0.5 * viewport.height as f32,
    )
}

/// Projects a world point to screen pixels plus its NDC depth, or `None` when
/// the point is behind the camera.
pub fn world_to_screen(world: Vec3, view_projection: Mat4, viewport: Viewport) -> Option<(Vec2, f32)> {
    let clip = view_projection * world.extend(1.0);
    if clip.w <= f32::EPSILON {
        return None;
    }
    let ndc = clip.truncate() / clip.w;
    Some((ndc_to_screen(Vec2::new(ndc.x, ndc.y), viewport), ndc.z))
}
