use glam::{Mat4, Vec2, Vec3};

use crate::color::Rgb;
use crate::cube::{world_to_screen, Camera3D, CellIndex, Lighting, Viewport};

pub(crate) const CLEAR_COLOR: [u8; 4] = [20, 22, 28, 255];
pub(crate) const HOVER_OUTLINE_COLOR: [u8; 4] = [255, 210, 70, 255];
const MAX_LINE_STEPS: usize = 8192;

pub(crate) struct CubeFace {
    pub(crate) normal: Vec3,
    corners: [Vec3; 4],
}

pub(crate) static CUBE_FACES: [CubeFace; 6] = [
    CubeFace {
        normal: Vec3::X,
        corners: [
            Vec3::new(0.5, -0.5, -0.5),
            Vec3::new(0.5, 0.5, -0.5),
            Vec3::new(0.5, 0.5, 0.5),
            Vec3::new(0.5, -0.5, 0.5),
        ],
    },
    CubeFace {
        normal: Vec3::NEG_X,
        corners: [
            Vec3::new(-0.5, -0.5, 0.5),
            Vec3::new(-0.5, 0.5, 0.5),
            Vec3::new(-0.5, 0.5, -0.5),
            Vec3::new(-0.5, -0.5, -0.5),
        ],
    },
    CubeFace {
        normal: Vec3::Y,
        corners: [
            Vec3::new(-0.5, 0.5, -0.5),
            Vec3::new(-0.5, 0.5, 0.5),
            Vec3::new(0.5, 0.5, 0.5),
            Vec3::new(0.5, 0.5, -0.5),
        ],
    },
    CubeFace {
        normal: Vec3::NEG_Y,
        corners: [
            Vec3::new(-0.5, -0.5, 0.5),
            Vec3::new(-0.5, -0.5, -0.5),
            Vec3::new(0.5, -0.5, -0.5),
            Vec3::new(0.5, -0.5, 0.5),
        ],
    },
    CubeFace {
        normal: Vec3::Z,
        corners: [
            Vec3::new(-0.5, -0.5, 0.5),
            Vec3::new(0.5, -0.5, 0.5),
            Vec3::new(0.5, 0.5, 0.5),
            Vec3::new(-0.5, 0.5, 0.5),
        ],
    },
    CubeFace {
        normal: Vec3::NEG_Z,
        corners: [
            Vec3::new(0.5, -0.5, -0.5),
            Vec3::new(-0.5, -0.5, -0.5),
            Vec3::new(-0.5, 0.5, -0.5),
            Vec3::new(0.5, 0.5, -0.5),
        ],
    },
];

/// Everything the rasteriser reads for one frame.
pub(crate) struct LatticeView<'a> {
    pub(crate) camera: &'a Camera3D,
    pub(crate) lighting: &'a Lighting,
    pub(crate) transforms: &'a [Mat4],
    pub(crate) colors: &'a [Rgb],
    pub(crate) hovered: Option<CellIndex>,
}

pub(crate) fn clear_frame(frame: &mut [u8], color: [u8; 4]) {
    for chunk in frame.chunks_exact_mut(4) {
        chunk.copy_from_slice(&color);
    }
}

/// Faces of a transformed unit cube that point towards `eye`.
pub(crate) fn visible_faces(
    transform: Mat4,
    eye: Vec3,
) -> impl Iterator<Item = &'static CubeFace> {
    CUBE_FACES.iter().filter(move |face| {
        let normal = transform.transform_vector3(face.normal);
        let face_center = transform.transform_point3(face.normal * 0.5);
        (eye - face_center).dot(normal) > 0.0
    })
}

/// Painter's-order software render of every instance. `draw_order` is scratch
/// space reused between frames. Returns the number of faces filled.
pub(crate) fn draw_lattice(
    frame: &mut [u8],
    viewport: Viewport,
    view: &LatticeView<'_>,
    draw_order: &mut Vec<(CellIndex, f32)>,
) -> usize {
    if viewport.is_empty() {
        return 0;
    }
    let eye = view.camera.eye();
    let view_projection = view.camera.view_projection(viewport.aspect());

    draw_order.clear();
    draw_order.extend(view.transforms.iter().enumerate().map(|(index, transform)| {
        let center = transform.w_axis.truncate();
        (index, (center - eye).length_squared())
    }));
    draw_order.sort_by(|a, b| b.1.total_cmp(&a.1).then(b.0.cmp(&a.0)));

    let mut faces_drawn = 0;
    for &(index, _) in draw_order.iter() {
        let Some(color) = view.colors.get(index) else {
            continue;
        };
        let transform = view.transforms[index];
        let is_hovered = view.hovered == Some(index);
        for face in visible_faces(transform, eye) {
            let Some(corners) = project_face(face, transform, view_projection, viewport) else {
                continue;
            };
            let shade = view
                .lighting
                .shade(transform.transform_vector3(face.normal));
            fill_convex_polygon(frame, viewport, &corners, color.scaled(shade).to_rgba());
            if is_hovered {
                draw_polygon_outline(frame, viewport, &corners, HOVER_OUTLINE_COLOR);
            }
            faces_drawn += 1;
        }
    }
    faces_drawn
}

fn project_face(
    face: &CubeFace,
    transform: Mat4,
    view_projection: Mat4,
    viewport: Viewport,
) -> Option<[Vec2; 4]> {
    let mut projected = [Vec2::ZERO; 4];
    for (slot, corner) in projected.iter_mut().zip(face.corners) {
        let (screen, _) =
            world_to_screen(transform.transform_point3(corner), view_projection, viewport)?;
        *slot = screen;
    }
    Some(projected)
}

/// Scanline fill sampling pixel centres. Points may lie off-screen.
pub(crate) fn fill_convex_polygon(
    frame: &mut [u8],
    viewport: Viewport,
    points: &[Vec2],
    color: [u8; 4],
) {
    if points.len() < 3 || viewport.is_empty() || points.iter().any(|p| !p.is_finite()) {
        return;
    }
    let width = viewport.width as i64;
    let height = viewport.height as i64;
    let (min_y, max_y) = points
        .iter()
        .fold((f32::MAX, f32::MIN), |(lo, hi), p| (lo.min(p.y), hi.max(p.y)));
    let row_start = ((min_y - 0.5).ceil() as i64).max(0);
    let row_end = ((max_y - 0.5).ceil() as i64).min(height);

    for row in row_start..row_end {
        let sample_y = row as f32 + 0.5;
        let mut span: Option<(f32, f32)> = None;
        for (i, a) in points.iter().enumerate() {
            let b = points[(i + 1) % points.len()];
            let crosses =
                (a.y <= sample_y && sample_y < b.y) || (b.y <= sample_y && sample_y < a.y);
            if !crosses {
                continue;
            }
            let x = a.x + (sample_y - a.y) * (b.x - a.x) / (b.y - a.y);
            span = Some(match span {
                Some((lo, hi)) => (lo.min(x), hi.max(x)),
                None => (x, x),
            });
        }
        let Some((lo, hi)) = span else {
            continue;
        };
        let col_start = ((lo - 0.5).ceil() as i64).max(0);
        let col_end = ((hi - 0.5).ceil() as i64).min(width);
        if col_start >= col_end {
            continue;
        }
        let row_offset = (row * width) as usize * 4;
        let span_bytes = row_offset + col_start as usize * 4..row_offset + col_end as usize * 4;
        let Some(row_pixels) = frame.get_mut(span_bytes) else {
            return;
        };
        for chunk in row_pixels.chunks_exact_mut(4) {
            chunk.copy_from_slice(&color);
        }
    }
}

fn draw_polygon_outline(frame: &mut [u8], viewport: Viewport, points: &[Vec2], color: [u8; 4]) {
    for (i, a) in points.iter().enumerate() {
        let b = points[(i + 1) % points.len()];
        draw_line_clipped(frame, viewport, *a, b, color);
    }
}

fn draw_line_clipped(frame: &mut [u8], viewport: Viewport, from: Vec2, to: Vec2, color: [u8; 4]) {
    let delta = to - from;
    let steps = (delta.x.abs().max(delta.y.abs()).ceil() as usize).clamp(1, MAX_LINE_STEPS);
    for step in 0..=steps {
        let point = from + delta * (step as f32 / steps as f32);
        write_pixel_rgba_clipped(
            frame,
            viewport,
            point.x.floor() as i32,
            point.y.floor() as i32,
            color,
        );
    }
}

fn write_pixel_rgba_clipped(frame: &mut [u8], viewport: Viewport, x: i32, y: i32, color: [u8; 4]) {
    if x < 0 || y < 0 || x >= viewport.width as i32 || y >= viewport.height as i32 {
        return;
    }
    let byte_offset = (y as usize * viewport.width as usize + x as usize) * 4;
    if let Some(pixel) = frame.get_mut(byte_offset..byte_offset + 4) {
        pixel.copy_from_slice(&color);
    }
}
