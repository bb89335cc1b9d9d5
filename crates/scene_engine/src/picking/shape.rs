//! World-space shapes for ray casting
//!
//! Scene primitives store their declared geometry; a [`WorldShape`] is built
//! on demand with the animated offset applied and thrown away after the test.

use crate::foundation::math::Vec3;
use crate::scene::{Primitive, TriangleMesh, AABB};
use super::primitives::{BoundingSphere, Cylinder, Ellipsoid, Ray, Triangle};

/// Minimum picking radius for strokes, in pixels
const MIN_STROKE_PIXELS: f32 = 2.0;

/// World-space shape (temporary, for ray tests only)
#[derive(Debug, Clone)]
pub enum WorldShape {
    /// Sphere
    Sphere(BoundingSphere),
    /// Axis-aligned ellipsoid
    Ellipsoid(Ellipsoid),
    /// Capped cylinder
    Cylinder(Cylinder),
    /// Axis-aligned box
    Box(AABB),
    /// Triangle soup with a precomputed bound
    Mesh {
        /// Triangles
        triangles: Vec<Triangle>,
        /// Bound used for early-out
        bound: BoundingSphere,
    },
    /// Several shapes hit-tested as one (line segments, arrows)
    Compound {
        /// Parts
        parts: Vec<WorldShape>,
        /// Bound used for early-out
        bound: BoundingSphere,
    },
}

fn mesh_shape(mesh: &TriangleMesh, offset: &Vec3) -> Option<WorldShape> {
    let points: Vec<Vec3> = mesh.positions.iter().map(|p| p + offset).collect();
    let bound = BoundingSphere::enclosing(&points)?;
    let triangles = mesh
        .indices
        .iter()
        .map(|[a, b, c]| Triangle::new(points[*a as usize], points[*b as usize], points[*c as usize]))
        .collect();
    Some(WorldShape::Mesh { triangles, bound })
}

fn strokes(segments: &[(Vec3, Vec3)], radius: f32) -> Option<WorldShape> {
    let parts: Vec<WorldShape> = segments
        .iter()
        .map(|(a, b)| WorldShape::Cylinder(Cylinder { start: *a, end: *b, radius }))
        .collect();
    let points: Vec<Vec3> = segments.iter().flat_map(|(a, b)| [*a, *b]).collect();
    let mut bound = BoundingSphere::enclosing(&points)?;
    bound.radius += radius;
    Some(WorldShape::Compound { parts, bound })
}

impl WorldShape {
    /// Build the ray-test shape for a primitive
    ///
    /// `pixel_world_size` converts stroke widths (lines, Bezier curves) from
    /// pixels to world units. Labels have no shape.
    pub fn from_primitive(
        primitive: &Primitive,
        offset: &Vec3,
        pixel_world_size: f32,
        cylinder_segments: u32,
    ) -> Option<Self> {
        let stroke_radius = |width: f32| width.max(MIN_STROKE_PIXELS) * 0.5 * pixel_world_size;
        match primitive {
            Primitive::Sphere { center, radius } => Some(Self::Sphere(BoundingSphere::new(center + offset, *radius))),
            Primitive::Ellipsoid { center, radii } => Some(Self::Ellipsoid(Ellipsoid { center: center + offset, radii: *radii })),
            Primitive::Cylinder { start, end, radius } => Some(Self::Cylinder(Cylinder {
                start: start + offset,
                end: end + offset,
                radius: *radius,
            })),
            Primitive::Cube { center, width } => {
                let half = Vec3::repeat(width * 0.5);
                Some(Self::Box(AABB::new(center + offset - half, center + offset + half)))
            }
            Primitive::Arrow { .. } => {
                mesh_shape(&TriangleMesh::from_primitive(primitive, 3, cylinder_segments)?, offset)
            }
            Primitive::Mesh(mesh) => mesh_shape(mesh, offset),
            Primitive::Lines { segments, width } => {
                let moved: Vec<(Vec3, Vec3)> = segments.iter().map(|(a, b)| (a + offset, b + offset)).collect();
                strokes(&moved, stroke_radius(*width))
            }
            Primitive::Bezier { control, width } => {
                let moved = control.map(|p| p + offset);
                strokes(&Primitive::bezier_segments(&moved), stroke_radius(*width))
            }
            Primitive::Label { .. } => None,
        }
    }

    /// Sphere enclosing the shape, for broad-phase rejection
    pub fn bounding_sphere(&self) -> BoundingSphere {
        match self {
            Self::Sphere(sphere) => *sphere,
            Self::Ellipsoid(e) => BoundingSphere::new(e.center, e.radii.max()),
            Self::Cylinder(c) => {
                BoundingSphere::new((c.start + c.end) * 0.5, (c.end - c.start).norm() * 0.5 + c.radius)
            }
            Self::Box(aabb) => BoundingSphere::new(aabb.center(), aabb.bounding_radius()),
            Self::Mesh { bound, .. } | Self::Compound { bound, .. } => *bound,
        }
    }

    /// Closest hit as (distance, outward normal)
    pub fn intersect_ray(&self, ray: &Ray) -> Option<(f32, Vec3)> {
        match self {
            Self::Sphere(sphere) => sphere.intersect_ray(ray),
            Self::Ellipsoid(e) => e.intersect_ray(ray),
            Self::Cylinder(c) => c.intersect_ray(ray),
            Self::Box(aabb) => {
                let t = aabb.intersect_ray(ray.origin, ray.direction)?;
                let local = (ray.point_at(t) - aabb.center()).component_div(&aabb.extents());
                let axis = local.abs().imax();
                let mut normal = Vec3::zeros();
                normal[axis] = local[axis].signum();
                Some((t, normal))
            }
            Self::Mesh { triangles, .. } => triangles
                .iter()
                .filter_map(|tri| tri.intersect_ray(ray).map(|(t, _, _)| (t, tri.normal())))
                .min_by(|a, b| a.0.total_cmp(&b.0)),
            Self::Compound { parts, .. } => parts
                .iter()
                .filter_map(|part| part.intersect_ray(ray))
                .min_by(|a, b| a.0.total_cmp(&b.0)),
        }
    }

    /// Bounding-sphere early-out followed by the exact test
    pub fn cast(&self, ray: &Ray) -> Option<(f32, Vec3)> {
        self.bounding_sphere().intersect_ray(ray)?;
        self.intersect_ray(ray)
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use approx::assert_relative_eq;

    fn down_z(x: f32, y: f32) -> Ray {
        Ray::new(Vec3::new(x, y, 10.0), Vec3::new(0.0, 0.0, -1.0))
    }

    #[test]
    fn test_offset_moves_sphere() {
        let prim = Primitive::Sphere { center: Vec3::zeros(), radius: 1.0 };
        let shape = WorldShape::from_primitive(&prim, &Vec3::new(5.0, 0.0, 0.0), 0.01, 8).unwrap();
        assert!(shape.cast(&down_z(0.0, 0.0)).is_none());
        assert!(shape.cast(&down_z(5.0, 0.0)).is_some());
    }

    #[test]
    fn test_cube_normal_faces_ray() {
        let prim = Primitive::Cube { center: Vec3::zeros(), width: 2.0 };
        let (t, n) = WorldShape::from_primitive(&prim, &Vec3::zeros(), 0.01, 8)
            .unwrap()
            .cast(&down_z(0.2, 0.3))
            .unwrap();
        assert_relative_eq!(t, 9.0);
        assert_relative_eq!(n, Vec3::z());
    }

    #[test]
    fn test_arrow_tip_is_hit() {
        let prim = Primitive::Arrow {
            start: Vec3::new(-1.0, 0.0, 0.0),
            end: Vec3::new(1.0, 0.0, 0.0),
            radius: 0.1,
            head_length: 0.5,
            head_width: 0.3,
        };
        let shape = WorldShape::from_primitive(&prim, &Vec3::zeros(), 0.01, 16).unwrap();
        assert!(shape.cast(&down_z(0.6, 0.0)).is_some());
        assert!(shape.cast(&down_z(0.6, 0.5)).is_none());
    }

    #[test]
    fn test_lines_use_pixel_width() {
        let prim = Primitive::Lines { segments: vec![(Vec3::new(-1.0, 0.0, 0.0), Vec3::new(1.0, 0.0, 0.0))], width: 10.0 };
        let shape = WorldShape::from_primitive(&prim, &Vec3::zeros(), 0.01, 8).unwrap();
        assert!(shape.cast(&down_z(0.0, 0.04)).is_some());
        assert!(shape.cast(&down_z(0.0, 0.06)).is_none());
    }

    #[test]
    fn test_labels_are_not_pickable() {
        let prim = Primitive::Label { position: Vec3::zeros(), text: "O".into() };
        assert!(WorldShape::from_primitive(&prim, &Vec3::zeros(), 0.01, 8).is_none());
    }
}
