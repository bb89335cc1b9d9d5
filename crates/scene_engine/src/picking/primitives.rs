//! Ray intersection primitives
//!
//! Rays, bounding spheres, triangles and the analytic shapes scene
//! primitives reduce to. Every `intersect_ray` returns the distance along the
//! ray and the outward surface normal at the hit.

use crate::foundation::collections::ObjectKey;
use crate::foundation::math::{constants::EPSILON, Vec3};

/// A ray for ray casting and picking
#[derive(Debug, Clone, Copy)]
pub struct Ray {
    /// The origin point of the ray in world space
    pub origin: Vec3,
    /// The direction of the ray (normalized)
    pub direction: Vec3,
}

impl Ray {
    /// Creates a new ray with the given origin and direction
    pub fn new(origin: Vec3, direction: Vec3) -> Self {
        Self {
            origin,
            direction: direction.normalize(),
        }
    }

    /// Get a point along the ray at distance t
    pub fn point_at(&self, t: f32) -> Vec3 {
        self.origin + self.direction * t
    }
}

/// Result of a ray cast against scene objects
#[derive(Debug, Clone, Copy)]
pub struct RayHit {
    /// The renderable that was hit
    pub key: ObjectKey,
    /// The distance from the ray origin to the hit point
    pub distance: f32,
    /// The point of intersection in world space
    pub point: Vec3,
    /// The surface normal at the intersection point
    pub normal: Vec3,
}

/// Smallest non-negative root of `a t² + b t + c = 0`
fn nearest_root(a: f32, b: f32, c: f32) -> Option<f32> {
    let discriminant = b * b - 4.0 * a * c;
    if discriminant < 0.0 || a.abs() < EPSILON {
        return None;
    }
    let sqrt_discriminant = discriminant.sqrt();
    let t1 = (-b - sqrt_discriminant) / (2.0 * a);
    let t2 = (-b + sqrt_discriminant) / (2.0 * a);
    if t1 >= 0.0 {
        Some(t1)
    } else if t2 >= 0.0 {
        Some(t2)
    } else {
        None
    }
}

/// A bounding sphere, also used as the exact shape of sphere primitives
#[derive(Debug, Clone, Copy)]
pub struct BoundingSphere {
    /// The center position of the sphere in world space
    pub center: Vec3,
    /// The radius of the sphere
    pub radius: f32,
}

impl BoundingSphere {
    /// Creates a new bounding sphere with the given center and radius
    pub fn new(center: Vec3, radius: f32) -> Self {
        Self { center, radius }
    }

    /// Smallest sphere around the box spanned by `points`
    pub fn enclosing(points: &[Vec3]) -> Option<Self> {
        let (first, rest) = points.split_first()?;
        let (min, max) = rest
            .iter()
            .fold((*first, *first), |(lo, hi), p| (lo.inf(p), hi.sup(p)));
        let center = (min + max) * 0.5;
        Some(Self::new(center, (max - center).norm()))
    }

    /// Test ray intersection with this sphere
    pub fn intersect_ray(&self, ray: &Ray) -> Option<(f32, Vec3)> {
        // Solve |origin + t*direction - center|^2 = radius^2
        let oc = ray.origin - self.center;
        let a = ray.direction.dot(&ray.direction);
        let b = 2.0 * oc.dot(&ray.direction);
        let c = oc.dot(&oc) - self.radius * self.radius;
        let t = nearest_root(a, b, c)?;
        let normal = (ray.point_at(t) - self.center).normalize();
        Some((t, normal))
    }
}

/// Axis-aligned ellipsoid
#[derive(Debug, Clone, Copy)]
pub struct Ellipsoid {
    /// Center
    pub center: Vec3,
    /// Semi-axis lengths
    pub radii: Vec3,
}

impl Ellipsoid {
    /// Ray test by scaling the problem onto the unit sphere
    pub fn intersect_ray(&self, ray: &Ray) -> Option<(f32, Vec3)> {
        if self.radii.min() <= 0.0 {
            return None;
        }
        let o = (ray.origin - self.center).component_div(&self.radii);
        let d = ray.direction.component_div(&self.radii);
        let t = nearest_root(d.dot(&d), 2.0 * o.dot(&d), o.dot(&o) - 1.0)?;
        let local = ray.point_at(t) - self.center;
        let normal = local.component_div(&self.radii.component_mul(&self.radii)).normalize();
        Some((t, normal))
    }
}

/// Capped cylinder between two points
#[derive(Debug, Clone, Copy)]
pub struct Cylinder {
    /// First cap center
    pub start: Vec3,
    /// Second cap center
    pub end: Vec3,
    /// Radius
    pub radius: f32,
}

impl Cylinder {
    /// Ray test against the side and both caps
    pub fn intersect_ray(&self, ray: &Ray) -> Option<(f32, Vec3)> {
        let axis = self.end - self.start;
        let length = axis.norm();
        if length < EPSILON || self.radius <= 0.0 {
            return None;
        }
        let axis = axis / length;
        let r2 = self.radius * self.radius;
        let m = ray.origin - self.start;
        let v = ray.direction;

        let v_perp = v - axis * v.dot(&axis);
        let m_perp = m - axis * m.dot(&axis);
        let mut best: Option<(f32, Vec3)> = None;
        let mut consider = |t: f32, normal: Vec3| {
            if t >= 0.0 && best.map_or(true, |(bt, _)| t < bt) {
                best = Some((t, normal));
            }
        };

        // Side: both roots, so a ray starting inside still finds the wall
        let a = v_perp.dot(&v_perp);
        if a > EPSILON {
            let b = 2.0 * m_perp.dot(&v_perp);
            let c = m_perp.dot(&m_perp) - r2;
            let discriminant = b * b - 4.0 * a * c;
            if discriminant >= 0.0 {
                let sq = discriminant.sqrt();
                for t in [(-b - sq) / (2.0 * a), (-b + sq) / (2.0 * a)] {
                    let h = (m + v * t).dot(&axis);
                    if (0.0..=length).contains(&h) {
                        consider(t, (m_perp + v_perp * t).normalize());
                    }
                }
            }
        }

        // Caps
        let denom = v.dot(&axis);
        if denom.abs() > EPSILON {
            for (center, normal) in [(self.start, -axis), (self.end, axis)] {
                let t = (center - ray.origin).dot(&axis) / denom;
                if (ray.point_at(t) - center).norm_squared() <= r2 {
                    consider(t, normal);
                }
            }
        }
        best
    }
}

/// A triangle for ray casting
#[derive(Debug, Clone, Copy)]
pub struct Triangle {
    /// First vertex
    pub v0: Vec3,
    /// Second vertex
    pub v1: Vec3,
    /// Third vertex
    pub v2: Vec3,
}

impl Triangle {
    /// Creates a new triangle
    pub fn new(v0: Vec3, v1: Vec3, v2: Vec3) -> Self {
        Self { v0, v1, v2 }
    }

    /// Calculates the normal of the triangle (right-hand rule)
    pub fn normal(&self) -> Vec3 {
        let edge1 = self.v1 - self.v0;
        let edge2 = self.v2 - self.v0;
        edge1.cross(&edge2).normalize()
    }

    /// Möller-Trumbore ray-triangle intersection algorithm
    /// Returns (t, u, v) barycentric coordinates if hit, None otherwise
    ///
    /// See: "Fast, Minimum Storage Ray/Triangle Intersection" by Möller & Trumbore
    pub fn intersect_ray(&self, ray: &Ray) -> Option<(f32, f32, f32)> {
        let edge1 = self.v1 - self.v0;
        let edge2 = self.v2 - self.v0;

        let h = ray.direction.cross(&edge2);
        let a = edge1.dot(&h);

        // Ray parallel to triangle?
        if a.abs() < EPSILON {
            return None;
        }

        let f = 1.0 / a;
        let s = ray.origin - self.v0;
        let u = f * s.dot(&h);
        if !(0.0..=1.0).contains(&u) {
            return None;
        }

        let q = s.cross(&edge1);
        let v = f * ray.direction.dot(&q);
        if v < 0.0 || u + v > 1.0 {
            return None;
        }

        let t = f * edge2.dot(&q);
        (t >= 0.0).then_some((t, u, v))
    }
}
