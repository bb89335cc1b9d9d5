//! Triangle meshes and primitive tessellation
//!
//! Every primitive can be turned into a [`TriangleMesh`] with per-vertex
//! normals. The COLLADA export writes these meshes, the vector back end
//! projects them, and the ray caster uses them for shapes without a cheap
//! analytic intersection (cone heads, surfaces, hulls).

use crate::foundation::math::{constants, utils, Vec3};
use super::renderable_object::Primitive;

/// Indexed triangle mesh
#[derive(Debug, Clone, Default, PartialEq)]
pub struct TriangleMesh {
    /// Vertex positions
    pub positions: Vec<Vec3>,
    /// Per-vertex normals (same length as `positions`)
    pub normals: Vec<Vec3>,
    /// Counter-clockwise triangles (outward normals)
    pub indices: Vec<[u32; 3]>,
}

impl TriangleMesh {
    /// Create an empty mesh
    pub fn new() -> Self {
        Self::default()
    }

    /// Number of triangles
    pub fn triangle_count(&self) -> usize {
        self.indices.len()
    }

    /// Whether the mesh has no triangles
    pub fn is_empty(&self) -> bool {
        self.indices.is_empty()
    }

    /// Positions of triangle `i`
    pub fn triangle(&self, i: usize) -> [Vec3; 3] {
        let [a, b, c] = self.indices[i];
        [self.positions[a as usize], self.positions[b as usize], self.positions[c as usize]]
    }

    fn push_vertex(&mut self, position: Vec3, normal: Vec3) -> u32 {
        self.positions.push(position);
        self.normals.push(normal);
        (self.positions.len() - 1) as u32
    }

    /// Append another mesh
    pub fn append(&mut self, other: &Self) {
        let base = self.positions.len() as u32;
        self.positions.extend_from_slice(&other.positions);
        self.normals.extend_from_slice(&other.normals);
        self.indices
            .extend(other.indices.iter().map(|[a, b, c]| [a + base, b + base, c + base]));
    }

    /// Copy of this mesh moved by `offset`
    #[must_use]
    pub fn translated(&self, offset: &Vec3) -> Self {
        Self {
            positions: self.positions.iter().map(|p| p + offset).collect(),
            normals: self.normals.clone(),
            indices: self.indices.clone(),
        }
    }

    /// Build a mesh from a flat triangle list (three positions per triangle)
    ///
    /// Missing or mismatched normals are replaced by face normals. A trailing
    /// partial triangle is dropped.
    pub fn from_triangle_list(vertices: &[Vec3], normals: Option<&[Vec3]>) -> Self {
        let usable = vertices.len() - vertices.len() % 3;
        let normals = normals.filter(|n| n.len() >= usable);
        let mut mesh = Self::new();
        for (tri, chunk) in vertices[..usable].chunks_exact(3).enumerate() {
            let face = (chunk[1] - chunk[0]).cross(&(chunk[2] - chunk[0]));
            let face = if face.norm() > constants::EPSILON { face.normalize() } else { Vec3::z() };
            let mut idx = [0u32; 3];
            for (k, p) in chunk.iter().enumerate() {
                let n = normals.map_or(face, |n| n[tri * 3 + k]);
                idx[k] = mesh.push_vertex(*p, n);
            }
            mesh.indices.push(idx);
        }
        mesh
    }

    /// UV sphere
    pub fn sphere(center: Vec3, radius: f32, segments: u32) -> Self {
        Self::ellipsoid(center, Vec3::repeat(radius), segments)
    }

    /// UV ellipsoid with axis-aligned semi-axes
    pub fn ellipsoid(center: Vec3, radii: Vec3, segments: u32) -> Self {
        let lon = segments.max(3);
        let lat = (segments / 2).max(2);
        let mut mesh = Self::new();
        for i in 0..=lat {
            let theta = constants::PI * i as f32 / lat as f32;
            for j in 0..=lon {
                let phi = constants::TAU * j as f32 / lon as f32;
                let unit = Vec3::new(theta.sin() * phi.cos(), theta.cos(), theta.sin() * phi.sin());
                let position = center + unit.component_mul(&radii);
                let normal = unit.component_div(&radii);
                let normal = if normal.norm() > 0.0 { normal.normalize() } else { unit };
                mesh.push_vertex(position, normal);
            }
        }
        let row = lon + 1;
        for i in 0..lat {
            for j in 0..lon {
                let a = i * row + j;
                let b = a + row;
                if i != 0 {
                    mesh.indices.push([a, a + 1, b]);
                }
                if i != lat - 1 {
                    mesh.indices.push([a + 1, b + 1, b]);
                }
            }
        }
        mesh
    }

    /// Capped cylinder between two points
    pub fn cylinder(start: Vec3, end: Vec3, radius: f32, segments: u32) -> Self {
        Self::frustum(start, end, radius, radius, segments)
    }

    /// Cone with its base at `base` and tip at `apex`
    pub fn cone(base: Vec3, apex: Vec3, radius: f32, segments: u32) -> Self {
        Self::frustum(base, apex, radius, 0.0, segments)
    }

    /// Truncated cone between two points; either radius may be zero
    fn frustum(start: Vec3, end: Vec3, r0: f32, r1: f32, segments: u32) -> Self {
        let mut mesh = Self::new();
        let axis = end - start;
        let length = axis.norm();
        if length <= constants::EPSILON {
            return mesh;
        }
        let dir = axis / length;
        let (u, v) = utils::orthonormal_basis(&dir);
        let segments = segments.max(3);
        let slope = (r0 - r1) / length;

        let ring = |angle: f32| u * angle.cos() + v * angle.sin();
        for j in 0..=segments {
            let angle = constants::TAU * j as f32 / segments as f32;
            let radial = ring(angle);
            let normal = (radial + dir * slope).normalize();
            mesh.push_vertex(start + radial * r0, normal);
            mesh.push_vertex(end + radial * r1, normal);
        }
        for j in 0..segments {
            let a = 2 * j;
            mesh.indices.push([a, a + 2, a + 1]);
            mesh.indices.push([a + 1, a + 2, a + 3]);
        }

        for (center, r, normal) in [(start, r0, -dir), (end, r1, dir)] {
            if r <= 0.0 {
                continue;
            }
            let hub = mesh.push_vertex(center, normal);
            let first = mesh.positions.len() as u32;
            for j in 0..segments {
                let angle = constants::TAU * j as f32 / segments as f32;
                mesh.push_vertex(center + ring(angle) * r, normal);
            }
            for j in 0..segments {
                let a = first + j;
                let b = first + (j + 1) % segments;
                if normal.dot(&dir) > 0.0 {
                    mesh.indices.push([hub, a, b]);
                } else {
                    mesh.indices.push([hub, b, a]);
                }
            }
        }
        mesh
    }

    /// Axis-aligned cube
    pub fn cube(center: Vec3, width: f32) -> Self {
        let h = width * 0.5;
        let mut mesh = Self::new();
        let faces = [
            (Vec3::x(), Vec3::y(), Vec3::z()),
            (-Vec3::x(), Vec3::z(), Vec3::y()),
            (Vec3::y(), Vec3::z(), Vec3::x()),
            (-Vec3::y(), Vec3::x(), Vec3::z()),
            (Vec3::z(), Vec3::x(), Vec3::y()),
            (-Vec3::z(), Vec3::y(), Vec3::x()),
        ];
        for (normal, s, t) in faces {
            let base = mesh.positions.len() as u32;
            for (a, b) in [(-1.0, -1.0), (1.0, -1.0), (1.0, 1.0), (-1.0, 1.0)] {
                mesh.push_vertex(center + (normal + s * a + t * b) * h, normal);
            }
            // keep counter-clockwise winding when viewed from outside
            if s.cross(&t).dot(&normal) > 0.0 {
                mesh.indices.push([base, base + 1, base + 2]);
                mesh.indices.push([base, base + 2, base + 3]);
            } else {
                mesh.indices.push([base, base + 2, base + 1]);
                mesh.indices.push([base, base + 3, base + 2]);
            }
        }
        mesh
    }

    /// Arrow: cylinder shaft plus cone head
    pub fn arrow(start: Vec3, end: Vec3, radius: f32, head_length: f32, head_width: f32, segments: u32) -> Self {
        let axis = end - start;
        let length = axis.norm();
        if length <= constants::EPSILON {
            return Self::new();
        }
        let dir = axis / length;
        let head = head_length.clamp(0.0, length);
        let neck = end - dir * head;
        let mut mesh = Self::cylinder(start, neck, radius, segments);
        mesh.append(&Self::cone(neck, end, head_width, segments));
        mesh
    }

    /// Convex hull of a point cloud
    ///
    /// Enumerates supporting planes through every point triple, merges
    /// coplanar points into one polygon per plane, and fan-triangulates each
    /// polygon with an outward normal. Returns `None` when the points are
    /// coplanar (no volume) or fewer than four.
    pub fn convex_hull(points: &[Vec3]) -> Option<Self> {
        if points.len() < 4 {
            return None;
        }
        let scale = points
            .iter()
            .map(|p| p.amax())
            .fold(1.0_f32, f32::max);
        let eps = 1e-5 * scale;
        let centroid = points.iter().sum::<Vec3>() / points.len() as f32;

        let mut planes: Vec<(Vec3, f32)> = Vec::new();
        let n = points.len();
        for i in 0..n {
            for j in (i + 1)..n {
                for k in (j + 1)..n {
                    let normal = (points[j] - points[i]).cross(&(points[k] - points[i]));
                    if normal.norm() <= eps * eps {
                        continue;
                    }
                    let mut normal = normal.normalize();
                    let mut offset = normal.dot(&points[i]);
                    if normal.dot(&centroid) > offset {
                        normal = -normal;
                        offset = -offset;
                    }
                    let supporting = points.iter().all(|p| normal.dot(p) <= offset + eps);
                    let known = planes
                        .iter()
                        .any(|(m, d)| (m - normal).norm() < 1e-4 && (d - offset).abs() < eps * 10.0);
                    if supporting && !known {
                        planes.push((normal, offset));
                    }
                }
            }
        }
        if planes.len() < 4 {
            return None;
        }

        let mut mesh = Self::new();
        for (normal, offset) in planes {
            let mut face: Vec<Vec3> = points
                .iter()
                .filter(|p| (normal.dot(p) - offset).abs() <= eps)
                .copied()
                .collect();
            face.dedup_by(|a, b| (*a - *b).norm() <= eps);
            if face.len() < 3 {
                continue;
            }
            let center = face.iter().sum::<Vec3>() / face.len() as f32;
            let (u, v) = utils::orthonormal_basis(&normal);
            face.sort_by(|a, b| {
                let angle = |p: &Vec3| (p - center).dot(&v).atan2((p - center).dot(&u));
                angle(a).total_cmp(&angle(b))
            });
            let base = mesh.positions.len() as u32;
            for p in &face {
                mesh.push_vertex(*p, normal);
            }
            for t in 1..(face.len() as u32 - 1) {
                let tri = [base, base + t, base + t + 1];
                let [a, b, c] = tri.map(|i| mesh.positions[i as usize]);
                if (b - a).cross(&(c - a)).dot(&normal) >= 0.0 {
                    mesh.indices.push(tri);
                } else {
                    mesh.indices.push([tri[0], tri[2], tri[1]]);
                }
            }
        }
        Some(mesh)
    }

    /// Tessellate any solid primitive
    ///
    /// Lines, Bezier curves and labels have no surface and return `None`.
    pub fn from_primitive(primitive: &Primitive, sphere_segments: u32, cylinder_segments: u32) -> Option<Self> {
        match primitive {
            Primitive::Sphere { center, radius } => Some(Self::sphere(*center, *radius, sphere_segments)),
            Primitive::Ellipsoid { center, radii } => Some(Self::ellipsoid(*center, *radii, sphere_segments)),
            Primitive::Cylinder { start, end, radius } => {
                Some(Self::cylinder(*start, *end, *radius, cylinder_segments))
            }
            Primitive::Cube { center, width } => Some(Self::cube(*center, *width)),
            Primitive::Arrow { start, end, radius, head_length, head_width } => Some(Self::arrow(
                *start,
                *end,
                *radius,
                *head_length,
                *head_width,
                cylinder_segments,
            )),
            Primitive::Mesh(mesh) => Some(mesh.clone()),
            Primitive::Lines { .. } | Primitive::Bezier { .. } | Primitive::Label { .. } => None,
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use approx::assert_relative_eq;

    fn assert_outward(mesh: &TriangleMesh, center: Vec3) {
        for i in 0..mesh.triangle_count() {
            let [a, b, c] = mesh.triangle(i);
            let normal = (b - a).cross(&(c - a));
            let centroid = (a + b + c) / 3.0;
            assert!(
                normal.dot(&(centroid - center)) >= -1e-5,
                "triangle {i} faces inward"
            );
        }
    }

    #[test]
    fn test_sphere_vertices_on_surface() {
        let mesh = TriangleMesh::sphere(Vec3::new(1.0, 2.0, 3.0), 2.0, 12);
        assert!(!mesh.is_empty());
        for p in &mesh.positions {
            assert_relative_eq!((p - Vec3::new(1.0, 2.0, 3.0)).norm(), 2.0, epsilon = 1e-4);
        }
        assert_outward(&mesh, Vec3::new(1.0, 2.0, 3.0));
    }

    #[test]
    fn test_cube_has_twelve_outward_triangles() {
        let mesh = TriangleMesh::cube(Vec3::zeros(), 2.0);
        assert_eq!(mesh.triangle_count(), 12);
        assert_outward(&mesh, Vec3::zeros());
        for p in &mesh.positions {
            assert_relative_eq!(p.amax(), 1.0, epsilon = 1e-6);
        }
    }

    #[test]
    fn test_cylinder_is_closed_and_outward() {
        let mesh = TriangleMesh::cylinder(Vec3::zeros(), Vec3::new(0.0, 0.0, 2.0), 0.5, 8);
        // side (2 per segment) + two caps (1 per segment each)
        assert_eq!(mesh.triangle_count(), 8 * 2 + 8 * 2);
        assert_outward(&mesh, Vec3::new(0.0, 0.0, 1.0));
    }

    #[test]
    fn test_degenerate_cylinder_is_empty() {
        assert!(TriangleMesh::cylinder(Vec3::zeros(), Vec3::zeros(), 1.0, 8).is_empty());
    }

    #[test]
    fn test_convex_hull_of_cube_corners() {
        let mut points = Vec::new();
        for x in [-1.0, 1.0] {
            for y in [-1.0, 1.0] {
                for z in [-1.0, 1.0] {
                    points.push(Vec3::new(x, y, z));
                }
            }
        }
        // interior point must not appear on the hull
        points.push(Vec3::new(0.1, 0.0, -0.2));
        let hull = TriangleMesh::convex_hull(&points).expect("cube hull");
        assert_eq!(hull.triangle_count(), 12);
        assert!(hull.positions.iter().all(|p| p.amax() > 0.99));
        assert_outward(&hull, Vec3::zeros());
    }

    #[test]
    fn test_convex_hull_of_tetrahedron() {
        let points = [Vec3::zeros(), Vec3::x(), Vec3::y(), Vec3::z()];
        let hull = TriangleMesh::convex_hull(&points).expect("tetrahedron hull");
        assert_eq!(hull.triangle_count(), 4);
        assert_outward(&hull, Vec3::repeat(0.25));
    }

    #[test]
    fn test_coplanar_points_have_no_hull() {
        let points = [Vec3::zeros(), Vec3::x(), Vec3::y(), Vec3::new(1.0, 1.0, 0.0)];
        assert!(TriangleMesh::convex_hull(&points).is_none());
    }

    #[test]
    fn test_triangle_list_drops_partial_triangle() {
        let vertices = [Vec3::zeros(), Vec3::x(), Vec3::y(), Vec3::z()];
        let mesh = TriangleMesh::from_triangle_list(&vertices, None);
        assert_eq!(mesh.triangle_count(), 1);
        assert_relative_eq!(mesh.normals[0], Vec3::z());
    }
}
