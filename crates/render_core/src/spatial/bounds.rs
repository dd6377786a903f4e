//! Bounding volumes and clip planes
//!
//! Pure value types used by culling and shadow fitting. Frustum plane
//! extraction follows the Gribb-Hartmann identities for a right-handed,
//! zero-to-one depth view-projection matrix.

use crate::foundation::math::{Mat4, Point3, Vec3, Vec4};

/// Axis-Aligned Bounding Box
#[derive(Debug, Clone, Copy, PartialEq)]
pub struct AABB {
    /// Minimum corner of the bounding box
    pub min: Vec3,
    /// Maximum corner of the bounding box
    pub max: Vec3,
}

impl AABB {
    /// Create a new AABB from min and max points
    pub fn new(min: Vec3, max: Vec3) -> Self {
        Self { min, max }
    }

    /// Create an AABB centered at a point with given half extents
    pub fn from_center_extents(center: Vec3, extents: Vec3) -> Self {
        Self {
            min: center - extents,
            max: center + extents,
        }
    }

    /// Smallest AABB enclosing every point, or `None` for an empty iterator
    pub fn from_points<I>(points: I) -> Option<Self>
    where
        I: IntoIterator<Item = Vec3>,
    {
        let mut points = points.into_iter();
        let first = points.next()?;
        let mut bounds = Self::new(first, first);
        for point in points {
            bounds.include_point(point);
        }
        Some(bounds)
    }

    /// Get the center of the AABB
    pub fn center(&self) -> Vec3 {
        (self.min + self.max) * 0.5
    }

    /// Get the extents (half-size) of the AABB
    pub fn extents(&self) -> Vec3 {
        (self.max - self.min) * 0.5
    }

    /// Full edge lengths of the AABB
    pub fn size(&self) -> Vec3 {
        self.max - self.min
    }

    /// The eight corners, ordered by bit pattern `(x, y, z)` of min/max choice
    pub fn corners(&self) -> [Vec3; 8] {
        let (lo, hi) = (self.min, self.max);
        [
            Vec3::new(lo.x, lo.y, lo.z),
            Vec3::new(hi.x, lo.y, lo.z),
            Vec3::new(lo.x, hi.y, lo.z),
            Vec3::new(hi.x, hi.y, lo.z),
            Vec3::new(lo.x, lo.y, hi.z),
            Vec3::new(hi.x, lo.y, hi.z),
            Vec3::new(lo.x, hi.y, hi.z),
            Vec3::new(hi.x, hi.y, hi.z),
        ]
    }

    /// Grow the box so it contains `point`
    pub fn include_point(&mut self, point: Vec3) {
        self.min = self.min.inf(&point);
        self.max = self.max.sup(&point);
    }

    /// Smallest box containing both boxes
    pub fn merge(&self, other: &Self) -> Self {
        Self {
            min: self.min.inf(&other.min),
            max: self.max.sup(&other.max),
        }
    }

    /// Box transformed by `matrix`
    ///
    /// All eight corners are transformed (with perspective divide) and the
    /// component-wise min/max of the results is returned. For rotations this
    /// encloses the rotated box rather than fitting it tightly.
    pub fn transform(&self, matrix: &Mat4) -> Self {
        let corners = self.corners();
        let mut bounds = {
            let first = matrix.transform_point(&Point3::from(corners[0])).coords;
            Self::new(first, first)
        };
        for corner in &corners[1..] {
            bounds.include_point(matrix.transform_point(&Point3::from(*corner)).coords);
        }
        bounds
    }

    /// Check if this AABB contains a point
    pub fn contains_point(&self, point: Vec3) -> bool {
        point.x >= self.min.x && point.x <= self.max.x &&
        point.y >= self.min.y && point.y <= self.max.y &&
        point.z >= self.min.z && point.z <= self.max.z
    }

    /// Check if this AABB intersects another AABB
    pub fn intersects(&self, other: &Self) -> bool {
        self.min.x <= other.max.x && self.max.x >= other.min.x &&
        self.min.y <= other.max.y && self.max.y >= other.min.y &&
        self.min.z <= other.max.z && self.max.z >= other.min.z
    }
}

/// Plane defined by a unit normal and a signed distance from the origin
///
/// Points with `normal · p + distance >= 0` are on the positive (inside) side.
#[derive(Debug, Clone, Copy, PartialEq)]
pub struct Plane {
    /// Normal vector (unit length unless the plane is degenerate)
    pub normal: Vec3,
    /// Signed distance term
    pub distance: f32,
}

impl Plane {
    /// Create a new plane from normal and distance, normalizing both
    pub fn new(normal: Vec3, distance: f32) -> Self {
        Self::from_coefficients(Vec4::new(normal.x, normal.y, normal.z, distance))
    }

    /// Create a plane from `(a, b, c, d)` coefficients of `ax + by + cz + d = 0`
    ///
    /// Coefficients are divided by the length of `(a, b, c)`. A zero-length
    /// normal is kept as-is so the plane degrades to a constant test on `d`.
    pub fn from_coefficients(coefficients: Vec4) -> Self {
        let normal = coefficients.xyz();
        let length = normal.norm();
        if length > 0.0 {
            Self {
                normal: normal / length,
                distance: coefficients.w / length,
            }
        } else {
            Self {
                normal,
                distance: coefficients.w,
            }
        }
    }

    /// Calculate signed distance from plane to point
    pub fn distance_to_point(&self, point: Vec3) -> f32 {
        self.normal.dot(&point) + self.distance
    }

    /// Corner of `aabb` furthest along the plane normal
    pub fn positive_vertex(&self, aabb: &AABB) -> Vec3 {
        Vec3::new(
            if self.normal.x >= 0.0 { aabb.max.x } else { aabb.min.x },
            if self.normal.y >= 0.0 { aabb.max.y } else { aabb.min.y },
            if self.normal.z >= 0.0 { aabb.max.z } else { aabb.min.z },
        )
    }
}

/// Index of each plane inside [`Frustum::planes`]
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum FrustumPlane {
    /// Left clip plane
    Left = 0,
    /// Right clip plane
    Right = 1,
    /// Top clip plane
    Top = 2,
    /// Bottom clip plane
    Bottom = 3,
    /// Near clip plane
    Near = 4,
    /// Far clip plane
    Far = 5,
}

/// Frustum for visibility culling
#[derive(Debug, Clone, PartialEq)]
pub struct Frustum {
    /// Six planes defining the frustum (left, right, top, bottom, near, far)
    pub planes: [Plane; 6],
}

impl Frustum {
    /// Create a frustum from six planes
    pub fn new(planes: [Plane; 6]) -> Self {
        Self { planes }
    }

    /// Extract frustum planes from a view-projection matrix
    ///
    /// With `rN` the N-th row of the matrix:
    /// left = r4 + r1, right = r4 − r1, top = r4 − r2, bottom = r4 + r2,
    /// near = r3, far = r4 − r3. Every plane is normalized.
    pub fn from_view_projection(view_projection: &Mat4) -> Self {
        let row = |i: usize| -> Vec4 { view_projection.row(i).transpose() };
        let (r1, r2, r3, r4) = (row(0), row(1), row(2), row(3));

        Self {
            planes: [
                Plane::from_coefficients(r4 + r1),
                Plane::from_coefficients(r4 - r1),
                Plane::from_coefficients(r4 - r2),
                Plane::from_coefficients(r4 + r2),
                Plane::from_coefficients(r3),
                Plane::from_coefficients(r4 - r3),
            ],
        }
    }

    /// Access one plane by name
    pub fn plane(&self, which: FrustumPlane) -> &Plane {
        &self.planes[which as usize]
    }

    /// True when the box lies entirely on the negative side of any plane
    ///
    /// A box exactly touching a plane is not outside.
    pub fn is_outside(&self, aabb: &AABB) -> bool {
        self.planes
            .iter()
            .any(|plane| plane.distance_to_point(plane.positive_vertex(aabb)) < 0.0)
    }

    /// Check if an AABB is inside or intersects the frustum
    pub fn intersects_aabb(&self, aabb: &AABB) -> bool {
        !self.is_outside(aabb)
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::foundation::math::{Mat4Ext, Quat, constants::HALF_PI};
    use approx::assert_relative_eq;

    fn unit_box() -> AABB {
        AABB::new(Vec3::new(-1.0, -1.0, -1.0), Vec3::new(1.0, 1.0, 1.0))
    }

    #[test]
    fn test_aabb_contains_point() {
        let aabb = unit_box();

        assert!(aabb.contains_point(Vec3::zeros()));
        assert!(aabb.contains_point(Vec3::new(0.5, 0.5, 0.5)));
        assert!(!aabb.contains_point(Vec3::new(2.0, 0.0, 0.0)));
    }

    #[test]
    fn test_aabb_intersects() {
        let aabb1 = AABB::new(Vec3::new(0.0, 0.0, 0.0), Vec3::new(2.0, 2.0, 2.0));
        let aabb2 = AABB::new(Vec3::new(1.0, 1.0, 1.0), Vec3::new(3.0, 3.0, 3.0));
        let aabb3 = AABB::new(Vec3::new(5.0, 5.0, 5.0), Vec3::new(7.0, 7.0, 7.0));

        assert!(aabb1.intersects(&aabb2));
        assert!(!aabb1.intersects(&aabb3));
    }

    #[test]
    fn test_transform_rotated_box_is_conservative() {
        let rotation = Quat::from_axis_angle(&Vec3::z_axis(), HALF_PI * 0.5);
        let rotated = unit_box().transform(&rotation.to_homogeneous());

        let half_diagonal = 2.0_f32.sqrt();
        assert_relative_eq!(rotated.max.x, half_diagonal, epsilon = 1e-5);
        assert_relative_eq!(rotated.min.y, -half_diagonal, epsilon = 1e-5);
        assert_relative_eq!(rotated.max.z, 1.0, epsilon = 1e-5);
    }

    #[test]
    fn test_transform_translates_box() {
        let moved = unit_box().transform(&Mat4::new_translation(&Vec3::new(10.0, 0.0, -3.0)));

        assert_relative_eq!(moved.min, Vec3::new(9.0, -1.0, -4.0), epsilon = 1e-6);
        assert_relative_eq!(moved.max, Vec3::new(11.0, 1.0, -2.0), epsilon = 1e-6);
    }

    #[test]
    fn test_from_points_encloses_all_points() {
        let bounds = AABB::from_points([
            Vec3::new(1.0, -2.0, 0.5),
            Vec3::new(-3.0, 4.0, 0.0),
            Vec3::new(0.0, 0.0, 7.0),
        ])
        .unwrap();

        assert_eq!(bounds.min, Vec3::new(-3.0, -2.0, 0.0));
        assert_eq!(bounds.max, Vec3::new(1.0, 4.0, 7.0));
        assert!(AABB::from_points(std::iter::empty()).is_none());
    }

    #[test]
    fn test_plane_is_normalized() {
        let plane = Plane::from_coefficients(Vec4::new(0.0, 3.0, 4.0, 10.0));

        assert_relative_eq!(plane.normal.norm(), 1.0, epsilon = 1e-6);
        assert_relative_eq!(plane.distance, 2.0, epsilon = 1e-6);
    }

    #[test]
    fn test_frustum_planes_from_perspective() {
        let proj = Mat4::perspective_rh_zo(HALF_PI, 1.0, 1.0, 100.0);
        let frustum = Frustum::from_view_projection(&proj);

        let near = frustum.plane(FrustumPlane::Near);
        let far = frustum.plane(FrustumPlane::Far);

        // Near plane sits at z = -1 facing -Z, far plane at z = -100 facing +Z
        assert_relative_eq!(near.normal, Vec3::new(0.0, 0.0, -1.0), epsilon = 1e-5);
        assert_relative_eq!(near.distance_to_point(Vec3::new(0.0, 0.0, -1.0)), 0.0, epsilon = 1e-5);
        assert_relative_eq!(far.normal, Vec3::new(0.0, 0.0, 1.0), epsilon = 1e-5);
        assert_relative_eq!(far.distance_to_point(Vec3::new(0.0, 0.0, -100.0)), 0.0, epsilon = 1e-3);

        for plane in &frustum.planes {
            assert_relative_eq!(plane.normal.norm(), 1.0, epsilon = 1e-5);
            assert!(plane.distance_to_point(Vec3::new(0.0, 0.0, -10.0)) > 0.0);
        }
    }

    #[test]
    fn test_box_touching_plane_is_not_outside() {
        // Orthographic volume: x in [-1, 1], y in [-1, 1], depth 0..10
        let proj = Mat4::orthographic_rh_zo(-1.0, 1.0, -1.0, 1.0, 0.0, 10.0);
        let frustum = Frustum::from_view_projection(&proj);

        // Box to the right of the volume whose left face lies exactly on x = 1
        let touching = AABB::new(Vec3::new(1.0, -0.5, -5.0), Vec3::new(3.0, 0.5, -4.0));
        assert!(!frustum.is_outside(&touching));

        // Box centred on the right plane straddles it
        let straddling = AABB::from_center_extents(Vec3::new(1.0, 0.0, -5.0), Vec3::new(0.5, 0.5, 0.5));
        assert!(!frustum.is_outside(&straddling));
    }

    #[test]
    fn test_box_behind_single_plane_is_outside() {
        let proj = Mat4::orthographic_rh_zo(-1.0, 1.0, -1.0, 1.0, 0.0, 10.0);
        let frustum = Frustum::from_view_projection(&proj);

        let left = AABB::new(Vec3::new(-4.0, -0.5, -5.0), Vec3::new(-2.0, 0.5, -4.0));
        let above = AABB::new(Vec3::new(-0.5, 2.0, -5.0), Vec3::new(0.5, 3.0, -4.0));
        let behind_camera = AABB::new(Vec3::new(-0.5, -0.5, 1.0), Vec3::new(0.5, 0.5, 2.0));
        let beyond_far = AABB::new(Vec3::new(-0.5, -0.5, -30.0), Vec3::new(0.5, 0.5, -20.0));

        assert!(frustum.is_outside(&left));
        assert!(frustum.is_outside(&above));
        assert!(frustum.is_outside(&behind_camera));
        assert!(frustum.is_outside(&beyond_far));
    }
}
