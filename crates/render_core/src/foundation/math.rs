//! Math utilities and types
//!
//! Provides the fundamental math types used by the frame core. All matrices are
//! column-vector (`M * v`) and all projections are right-handed with a
//! zero-to-one clip depth range, so frustum planes extracted from a combined
//! view-projection matrix use `row3` for the near plane.

pub use nalgebra::{
    Vector2, Vector3, Vector4,
    Matrix3, Matrix4,
    Quaternion,
    Unit,
};

/// 2D vector type
pub type Vec2 = Vector2<f32>;

/// 3D vector type
pub type Vec3 = Vector3<f32>;

/// 4D vector type
pub type Vec4 = Vector4<f32>;

/// 3x3 matrix type
pub type Mat3 = Matrix3<f32>;

/// 4x4 matrix type
pub type Mat4 = Matrix4<f32>;

/// 3D point type
pub type Point3 = nalgebra::Point3<f32>;

/// Quaternion type for rotations
pub type Quat = Unit<Quaternion<f32>>;

/// Local transform: position, rotation and scale
#[derive(Debug, Clone, Copy, PartialEq)]
pub struct Transform {
    /// Position relative to the parent
    pub position: Vec3,

    /// Rotation relative to the parent
    pub rotation: Quat,

    /// Scale factors
    pub scale: Vec3,
}

impl Default for Transform {
    fn default() -> Self {
        Self {
            position: Vec3::zeros(),
            rotation: Quat::identity(),
            scale: Vec3::new(1.0, 1.0, 1.0),
        }
    }
}

impl Transform {
    /// Create a new identity transform
    pub fn identity() -> Self {
        Self::default()
    }

    /// Create a transform from position, rotation and scale
    pub fn new(position: Vec3, rotation: Quat, scale: Vec3) -> Self {
        Self { position, rotation, scale }
    }

    /// Create a transform with only position
    pub fn from_position(position: Vec3) -> Self {
        Self {
            position,
            ..Default::default()
        }
    }

    /// Create a transform with position and rotation
    pub fn from_position_rotation(position: Vec3, rotation: Quat) -> Self {
        Self {
            position,
            rotation,
            ..Default::default()
        }
    }

    /// Convert to a transformation matrix (T * R * S)
    pub fn to_matrix(&self) -> Mat4 {
        Mat4::new_translation(&self.position)
            * self.rotation.to_homogeneous()
            * Mat4::new_nonuniform_scaling(&self.scale)
    }
}

/// Math constants
pub mod constants {
    /// Pi constant
    pub const PI: f32 = std::f32::consts::PI;

    /// Pi / 2
    pub const HALF_PI: f32 = PI * 0.5;

    /// Degrees to radians conversion factor
    pub const DEG_TO_RAD: f32 = PI / 180.0;

    /// Radians to degrees conversion factor
    pub const RAD_TO_DEG: f32 = 180.0 / PI;
}

/// Math utility functions
pub mod utils {
    use super::{constants, Mat4, Vec3, Vec4};

    /// Convert degrees to radians
    pub fn deg_to_rad(degrees: f32) -> f32 {
        degrees * constants::DEG_TO_RAD
    }

    /// Convert radians to degrees
    pub fn rad_to_deg(radians: f32) -> f32 {
        radians * constants::RAD_TO_DEG
    }

    /// Linear interpolation
    pub fn lerp(a: f32, b: f32, t: f32) -> f32 {
        a + (b - a) * t
    }

    /// Component-wise linear interpolation between two vectors
    pub fn lerp_vec3(a: Vec3, b: Vec3, t: f32) -> Vec3 {
        a + (b - a) * t
    }

    /// Transform a point by a homogeneous matrix, dividing by `w`
    ///
    /// Returns `None` when the transformed `w` is zero (point at infinity).
    pub fn project_point(matrix: &Mat4, point: Vec3) -> Option<Vec3> {
        let clip = matrix * Vec4::new(point.x, point.y, point.z, 1.0);
        if clip.w == 0.0 {
            return None;
        }
        Some(clip.xyz() / clip.w)
    }

    /// Round `value` down to the nearest multiple of `step`
    ///
    /// A non-positive or non-finite step leaves the value unchanged.
    pub fn floor_to_multiple(value: f32, step: f32) -> f32 {
        if step > 0.0 && step.is_finite() {
            (value / step).floor() * step
        } else {
            value
        }
    }
}

/// Extension trait for Mat4 with projection and view constructors
pub trait Mat4Ext {
    /// Right-handed perspective projection with a `[0, 1]` depth range
    fn perspective_rh_zo(fov_y: f32, aspect: f32, near: f32, far: f32) -> Mat4;

    /// Right-handed orthographic projection with a `[0, 1]` depth range
    ///
    /// `near` and `far` are distances along the view direction (−Z).
    fn orthographic_rh_zo(left: f32, right: f32, bottom: f32, top: f32, near: f32, far: f32) -> Mat4;

    /// Right-handed view matrix looking from `eye` along `direction`
    fn look_to_rh(eye: Vec3, direction: Vec3, up: Vec3) -> Mat4;

    /// Right-handed view matrix looking from `eye` at `target`
    ///
    /// Named apart from nalgebra's inherent `look_at_rh`, which takes points.
    fn look_at_rh_vec(eye: Vec3, target: Vec3, up: Vec3) -> Mat4;
}

impl Mat4Ext for Mat4 {
    fn perspective_rh_zo(fov_y: f32, aspect: f32, near: f32, far: f32) -> Mat4 {
        // P = [w  0  0   0  ]
        //     [0  h  0   0  ]
        //     [0  0  r   r*n]
        //     [0  0 -1   0  ]   with h = 1/tan(fov/2), w = h/aspect, r = f/(n-f)
        let h = 1.0 / (fov_y * 0.5).tan();
        let w = h / aspect;
        let r = far / (near - far);

        Mat4::new(
            w,   0.0,  0.0, 0.0,
            0.0, h,    0.0, 0.0,
            0.0, 0.0,  r,   r * near,
            0.0, 0.0, -1.0, 0.0,
        )
    }

    fn orthographic_rh_zo(left: f32, right: f32, bottom: f32, top: f32, near: f32, far: f32) -> Mat4 {
        let rcp_width = 1.0 / (right - left);
        let rcp_height = 1.0 / (top - bottom);
        let r = 1.0 / (near - far);

        Mat4::new(
            2.0 * rcp_width, 0.0,              0.0, -(left + right) * rcp_width,
            0.0,             2.0 * rcp_height, 0.0, -(top + bottom) * rcp_height,
            0.0,             0.0,              r,   r * near,
            0.0,             0.0,              0.0, 1.0,
        )
    }

    fn look_to_rh(eye: Vec3, direction: Vec3, up: Vec3) -> Mat4 {
        let forward = direction.normalize();
        let right = forward.cross(&up).normalize();
        let camera_up = right.cross(&forward);

        Mat4::new(
            right.x,     right.y,     right.z,     -right.dot(&eye),
            camera_up.x, camera_up.y, camera_up.z, -camera_up.dot(&eye),
            -forward.x,  -forward.y,  -forward.z,  forward.dot(&eye),
            0.0,         0.0,         0.0,         1.0,
        )
    }

    fn look_at_rh_vec(eye: Vec3, target: Vec3, up: Vec3) -> Mat4 {
        Self::look_to_rh(eye, target - eye, up)
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use approx::assert_relative_eq;

    #[test]
    fn test_perspective_maps_near_and_far_to_unit_depth() {
        let proj = Mat4::perspective_rh_zo(constants::HALF_PI, 1.0, 0.5, 50.0);

        let near = utils::project_point(&proj, Vec3::new(0.0, 0.0, -0.5)).unwrap();
        let far = utils::project_point(&proj, Vec3::new(0.0, 0.0, -50.0)).unwrap();

        assert_relative_eq!(near.z, 0.0, epsilon = 1e-6);
        assert_relative_eq!(far.z, 1.0, epsilon = 1e-5);
    }

    #[test]
    fn test_orthographic_maps_box_to_clip_volume() {
        let ortho = Mat4::orthographic_rh_zo(-2.0, 4.0, -1.0, 3.0, 1.0, 11.0);

        let min = utils::project_point(&ortho, Vec3::new(-2.0, -1.0, -1.0)).unwrap();
        let max = utils::project_point(&ortho, Vec3::new(4.0, 3.0, -11.0)).unwrap();

        assert_relative_eq!(min, Vec3::new(-1.0, -1.0, 0.0), epsilon = 1e-6);
        assert_relative_eq!(max, Vec3::new(1.0, 1.0, 1.0), epsilon = 1e-6);
    }

    #[test]
    fn test_look_to_puts_target_on_negative_z() {
        let view = Mat4::look_to_rh(Vec3::new(0.0, 0.0, 5.0), Vec3::new(0.0, 0.0, -1.0), Vec3::y());
        let origin = utils::project_point(&view, Vec3::zeros()).unwrap();

        assert_relative_eq!(origin, Vec3::new(0.0, 0.0, -5.0), epsilon = 1e-6);
    }

    #[test]
    fn test_look_at_vec_matches_look_to_toward_target() {
        let eye = Vec3::new(3.0, 2.0, 4.0);
        let target = Vec3::new(-1.0, 0.5, 0.0);

        let at = Mat4::look_at_rh_vec(eye, target, Vec3::y());
        let to = Mat4::look_to_rh(eye, target - eye, Vec3::y());

        assert_relative_eq!(at, to, epsilon = 1e-6);
        let projected = utils::project_point(&at, target).unwrap();
        assert_relative_eq!(projected.xy(), nalgebra::Vector2::zeros(), epsilon = 1e-5);
        assert!(projected.z < 0.0);
    }

    #[test]
    fn test_transform_matrix_applies_scale_then_rotation_then_translation() {
        let transform = Transform::new(
            Vec3::new(1.0, 0.0, 0.0),
            Quat::from_axis_angle(&Vec3::y_axis(), constants::HALF_PI),
            Vec3::new(2.0, 2.0, 2.0),
        );

        let moved = utils::project_point(&transform.to_matrix(), Vec3::new(1.0, 0.0, 0.0)).unwrap();

        // (1,0,0) scaled to (2,0,0), rotated 90° about Y to (0,0,-2), then shifted by +X
        assert_relative_eq!(moved, Vec3::new(1.0, 0.0, -2.0), epsilon = 1e-5);
    }

    #[test]
    fn test_floor_to_multiple() {
        assert_relative_eq!(utils::floor_to_multiple(5.3, 0.5), 5.0);
        assert_relative_eq!(utils::floor_to_multiple(-5.3, 0.5), -5.5);
        assert_relative_eq!(utils::floor_to_multiple(7.0, 0.0), 7.0);
    }
}
