use glam::{Vec2, Vec3};

use super::transform::screen_to_ndc;
use super::{Camera3D, CellIndex, InstanceBuffer, Viewport};

#[derive(Debug, Clone, Copy, PartialEq)]
pub struct Ray {
    pub origin: Vec3,
    pub direction: Vec3,
}

impl Ray {
    /// Ray from the near plane through the pointer position.
    pub fn from_screen(screen_px: Vec2, viewport: Viewport, camera: &Camera3D) -> Option<Self> {
        let ndc = screen_to_ndc(screen_px, viewport)?;
        let inverse = camera.view_projection(viewport.aspect()).inverse();
        let near = inverse.project_point3(ndc.extend(0.0));
        let far = inverse.project_point3(ndc.extend(1.0));
        let direction = (far - near).normalize_or_zero();
        if direction == Vec3::ZERO || !near.is_finite() {
            return None;
        }
        Some(Self {
            origin: near,
            direction,
        })
    }
}

#[derive(Debug, Clone, Copy, PartialEq)]
pub struct PickHit {
    pub index: CellIndex,
    pub distance: f32,
}

/// Slab-method ray/AABB intersection. Returns the entry distance, or the exit
/// distance when the origin is inside the box.
pub fn ray_aabb_hit_t(origin: Vec3, direction: Vec3, min: Vec3, max: Vec3) -> Option<f32> {
    let mut t_near = f32::NEG_INFINITY;
    let mut t_far = f32::INFINITY;

    for axis in 0..3 {
        let o = origin[axis];
        let d = direction[axis];
        if d == 0.0 {
            if o < min[axis] || o > max[axis] {
                return None;
            }
            continue;
        }
        let inv = 1.0 / d;
        let mut t0 = (min[axis] - o) * inv;
        let mut t1 = (max[axis] - o) * inv;
        if t0 > t1 {
            std::mem::swap(&mut t0, &mut t1);
        }
        t_near = t_near.max(t0);
        t_far = t_far.min(t1);
        if t_near > t_far {
            return None;
        }
    }

    if t_far < 0.0 {
        return None;
    }
    Some(if t_near >= 0.0 { t_near } else { t_far })
}

/// Nearest instance hit by `ray`. The lattice bounds are tested first so a
/// miss costs one box test.
pub fn pick_instance(
    ray: &Ray,
    instances: &InstanceBuffer,
    lattice_bounds: (Vec3, Vec3),
) -> Option<PickHit> {
    ray_aabb_hit_t(ray.origin, ray.direction, lattice_bounds.0, lattice_bounds.1)?;

    nearest_hit((0..instances.len()).filter_map(|index| {
        let (min, max) = instances.instance_bounds(index)?;
        ray_aabb_hit_t(ray.origin, ray.direction, min, max).map(|distance| (index, distance))
    }))
}

/// Smallest distance wins; exact ties go to the lowest slot index.
fn nearest_hit(candidates: impl Iterator<Item = (CellIndex, f32)>) -> Option<PickHit> {
    candidates.fold(None, |best: Option<PickHit>, (index, distance)| match best {
        Some(hit)
            if hit.distance < distance || (hit.distance == distance && hit.index < index) =>
        {
            Some(hit)
        }
        _ => Some(PickHit { index, distance }),
    })
}

/// Resolves a pointer position to the cell whose instance is nearest along the
/// pointer ray. Reads instance transforms only.
pub fn resolve(
    screen_px: Vec2,
    viewport: Viewport,
    camera: &Camera3D,
    instances: &InstanceBuffer,
    lattice_bounds: (Vec3, Vec3),
) -> Option<CellIndex> {
    let ray = Ray::from_screen(screen_px, viewport, camera)?;
    pick_instance(&ray, instances, lattice_bounds).map(|hit| hit.index)
}

#[cfg(test)]
mod tests {
    use std::time::{Duration, Instant};

    use glam::UVec3;

    use super::*;
    use crate::color::Palette;
    use crate::cube::transform::world_to_screen;
    use crate::cube::{cell_coords, CubeSize, LatticeLayout};

    fn synced(edge: i32) -> (LatticeLayout, InstanceBuffer) {
        let layout = LatticeLayout::new(CubeSize::new(edge).expect("size"));
        let mut instances = InstanceBuffer::new(layout.cell_count());
        instances
            .sync(&layout, &vec![None; layout.cell_count()], &Palette::default())
            .expect("sync");
        (layout, instances)
    }

    fn screen_center_of(
        index: CellIndex,
        layout: &LatticeLayout,
        camera: &Camera3D,
        viewport: Viewport,
    ) -> Vec2 {
        let position = layout.position(index).expect("cell");
        let view_projection = camera.view_projection(viewport.aspect());
        let (screen, _) =
            world_to_screen(position, view_projection, viewport).expect("cell in front of camera");
        screen
    }

    fn unit_box() -> (Vec3, Vec3) {
        (Vec3::splat(-1.0), Vec3::splat(1.0))
    }

    type FaceFilter = fn(UVec3, u32) -> bool;

    /// One camera per face; from each, that face's layer of cells is unoccluded.
    fn face_cameras(distance: f32) -> [(Camera3D, FaceFilter); 6] {
        [
            (
                Camera3D::looking_at(Vec3::X * distance, Vec3::ZERO),
                |c: UVec3, n: u32| c.x == n - 1,
            ),
            (
                Camera3D::looking_at(Vec3::NEG_X * distance, Vec3::ZERO),
                |c: UVec3, _n: u32| c.x == 0,
            ),
            (
                Camera3D::looking_at(Vec3::Z * distance, Vec3::ZERO),
                |c: UVec3, n: u32| c.z == n - 1,
            ),
            (
                Camera3D::looking_at(Vec3::NEG_Z * distance, Vec3::ZERO),
                |c: UVec3, _n: u32| c.z == 0,
            ),
            (
                Camera3D::looking_at(Vec3::new(0.0, distance, 0.5), Vec3::ZERO),
                |c: UVec3, n: u32| c.y == n - 1,
            ),
            (
                Camera3D::looking_at(Vec3::new(0.0, -distance, 0.5), Vec3::ZERO),
                |c: UVec3, _n: u32| c.y == 0,
            ),
        ]
    }

    #[test]
    fn slab_hits_box_in_front() {
        let (min, max) = unit_box();
        let t = ray_aabb_hit_t(Vec3::new(0.0, 0.0, -5.0), Vec3::Z, min, max);
        assert_eq!(t, Some(4.0));
    }

    #[test]
    fn slab_misses_box_behind_origin() {
        let (min, max) = unit_box();
        let t = ray_aabb_hit_t(Vec3::new(0.0, 0.0, 5.0), Vec3::Z, min, max);
        assert_eq!(t, None);
    }

    #[test]
    fn slab_handles_axis_parallel_ray_outside_slab() {
        let (min, max) = unit_box();
        let t = ray_aabb_hit_t(Vec3::new(3.0, 0.0, -5.0), Vec3::Z, min, max);
        assert_eq!(t, None);
    }

    #[test]
    fn slab_from_inside_returns_exit_distance() {
        let (min, max) = unit_box();
        let t = ray_aabb_hit_t(Vec3::ZERO, Vec3::X, min, max);
        assert_eq!(t, Some(1.0));
    }

    #[test]
    fn ray_through_viewport_center_points_at_target() {
        let camera = Camera3D::looking_at(Vec3::new(0.0, 0.0, 10.0), Vec3::ZERO);
        let viewport = Viewport::new(800, 600);
        let ray = Ray::from_screen(Vec2::new(400.0, 300.0), viewport, &camera).expect("ray");
        assert!((ray.direction - Vec3::NEG_Z).length() < 1e-4);
        assert!(ray.origin.z < 10.0 && ray.origin.z > 9.0);
    }

    #[test]
    fn single_cell_resolves_to_zero_or_none() {
        let (layout, instances) = synced(1);
        let camera = Camera3D::looking_at(Vec3::new(2.0, 3.0, 4.0), Vec3::ZERO);
        let viewport = Viewport::new(640, 480);

        let center = screen_center_of(0, &layout, &camera, viewport);
        let bounds = layout.bounds();
        assert_eq!(resolve(center, viewport, &camera, &instances, bounds), Some(0));
        let corner = Vec2::new(2.0, 2.0);
        assert_eq!(resolve(corner, viewport, &camera, &instances, bounds), None);
    }

    #[test]
    fn surface_cell_centers_round_trip_for_every_face() {
        let viewport = Viewport::new(1024, 768);
        for edge in [1, 2, 3, 4, 8] {
            let (layout, instances) = synced(edge);
            let n = edge as u32;
            let mut covered = vec![false; layout.cell_count()];
            for (camera, on_face) in face_cameras(60.0) {
                for index in 0..layout.cell_count() {
                    if !on_face(cell_coords(index, layout.size()), n) {
                        continue;
                    }
                    let center = screen_center_of(index, &layout, &camera, viewport);
                    let resolved = resolve(center, viewport, &camera, &instances, layout.bounds());
                    assert_eq!(resolved, Some(index), "N={edge} cell {index}");
                    covered[index] = true;
                }
            }
            for (index, was_covered) in covered.iter().enumerate() {
                let coords = cell_coords(index, layout.size());
                let on_surface = [coords.x, coords.y, coords.z]
                    .iter()
                    .any(|c| *c == 0 || *c == n - 1);
                assert_eq!(*was_covered, on_surface, "N={edge} cell {index}");
            }
        }
    }

    #[test]
    fn occluded_cell_resolves_to_nearer_instance_on_same_ray() {
        let (layout, instances) = synced(3);
        let viewport = Viewport::new(800, 600);
        let camera = Camera3D::looking_at(Vec3::new(0.0, 0.0, 40.0), Vec3::ZERO);
        let center_cell = 13;
        let screen = screen_center_of(center_cell, &layout, &camera, viewport);

        let ray = Ray::from_screen(screen, viewport, &camera).expect("ray");
        let hit = pick_instance(&ray, &instances, layout.bounds()).expect("hit");

        assert_eq!(hit.index, 22);
        let (min, max) = instances.instance_bounds(center_cell).expect("bounds");
        let hidden_distance = ray_aabb_hit_t(ray.origin, ray.direction, min, max)
            .expect("ray passes through hidden cell");
        assert!(hit.distance < hidden_distance);
    }

    #[test]
    fn equal_distance_tie_goes_to_lowest_index() {
        let hit = nearest_hit([(5, 2.0), (3, 1.5), (9, 4.0), (1, 1.5)].into_iter()).expect("hit");
        assert_eq!(hit, PickHit { index: 1, distance: 1.5 });
    }

    #[test]
    fn ray_through_gap_between_columns_misses() {
        let (layout, instances) = synced(2);
        let ray = Ray {
            origin: Vec3::new(0.0, -0.55, -10.0),
            direction: Vec3::Z,
        };
        assert!(pick_instance(&ray, &instances, layout.bounds()).is_none());
    }

    #[test]
    fn miss_outside_lattice_bounds_is_none() {
        let (layout, instances) = synced(4);
        let ray = Ray {
            origin: Vec3::new(50.0, 50.0, -50.0),
            direction: Vec3::Z,
        };
        assert!(pick_instance(&ray, &instances, layout.bounds()).is_none());
    }

    #[test]
    fn resolve_does_not_mutate_instances() {
        let (layout, instances) = synced(2);
        let before = instances.clone();
        let camera = Camera3D::default();
        let viewport = Viewport::new(640, 480);
        let _ = resolve(Vec2::new(320.0, 240.0), viewport, &camera, &instances, layout.bounds());
        assert_eq!(instances.colors(), before.colors());
        assert_eq!(instances.transforms(), before.transforms());
        assert_eq!(instances.is_dirty(), before.is_dirty());
    }

    #[test]
    fn resolution_for_eight_cubed_stays_under_frame_budget() {
        let (layout, instances) = synced(8);
        let camera = Camera3D::looking_at(Vec3::new(12.0, 9.0, 15.0), Vec3::ZERO);
        let viewport = Viewport::new(1280, 720);
        let rounds = 64u32;

        let mut best = Duration::MAX;
        for round in 0..rounds {
            let pointer = Vec2::new(400.0 + round as f32 * 7.0, 200.0 + round as f32 * 4.0);
            let start = Instant::now();
            let _ = resolve(pointer, viewport, &camera, &instances, layout.bounds());
            best = best.min(start.elapsed());
        }
        assert!(best < Duration::from_millis(4), "best pick took {best:?}");
    }
}
