//! # 3D Camera
//!
//! Perspective camera used by the frame core for culling, geometry passes and
//! shadow fitting.
//!
//! ## Design Principles
//! - **Library-agnostic**: No graphics API types in camera math
//! - **Single convention**: Right-handed, Y-up, looking down local −Z
//! - **Zero-to-one depth**: Projections map the near plane to depth 0 and
//!   the far plane to depth 1, matching the frustum plane extraction in
//!   [`crate::spatial::Frustum`]

use crate::foundation::math::{Mat4, Mat4Ext, Quat, Vec3, utils};

/// 3D perspective camera
///
/// Represents a camera in 3D space with a position, an orientation and
/// perspective projection parameters.
///
/// # Coordinate System
/// Uses a right-handed Y-up coordinate system in view space:
/// - X+ = Right
/// - Y+ = Up
/// - Z− = Forward (the direction the camera looks)
///
/// # Performance Notes
/// Matrices are computed on demand rather than cached; callers that need
/// them several times per frame compute them once and pass them along.
#[derive(Debug, Clone, PartialEq)]
pub struct Camera {
    /// Camera position in world space
    pub position: Vec3,

    /// Camera orientation; the identity looks down world −Z
    pub rotation: Quat,

    /// Vertical field of view in radians
    pub fov: f32,

    /// Aspect ratio (width / height) for projection calculations
    pub aspect: f32,

    /// Distance to near clipping plane
    pub near: f32,

    /// Distance to far clipping plane
    pub far: f32,
}

impl Camera {
    /// Create a new perspective camera looking down world −Z
    ///
    /// # Arguments
    /// * `position` - Camera position in world space
    /// * `fov_degrees` - Vertical field of view in degrees (converted to radians internally)
    /// * `aspect` - Aspect ratio (width / height) of the viewport
    /// * `near` - Distance to near clipping plane (must be > 0)
    /// * `far` - Distance to far clipping plane (must be > near)
    ///
    /// # Example
    /// ```rust
    /// use render_core::foundation::math::Vec3;
    /// use render_core::render::Camera;
    ///
    /// let camera = Camera::perspective(
    ///     Vec3::new(0.0, 2.0, 5.0),  // Position 5 units back, 2 up
    ///     75.0,                       // 75-degree field of view
    ///     16.0 / 9.0,                 // Widescreen aspect ratio
    ///     0.1,                        // Near plane at 10cm
    ///     100.0,                      // Far plane at 100 meters
    /// );
    /// assert!(camera.forward().z < 0.0);
    /// ```
    pub fn perspective(position: Vec3, fov_degrees: f32, aspect: f32, near: f32, far: f32) -> Self {
        Self {
            position,
            rotation: Quat::identity(),
            fov: utils::deg_to_rad(fov_degrees),
            aspect,
            near,
            far,
        }
    }

    /// Update camera position in world space
    pub fn set_position(&mut self, position: Vec3) {
        self.position = position;
        log::trace!("Camera position updated to: {:?}", position);
    }

    /// Update camera orientation
    pub fn set_rotation(&mut self, rotation: Quat) {
        self.rotation = rotation;
        log::trace!("Camera rotation updated to: {:?}", rotation);
    }

    /// Orient the camera so it looks at `target`
    ///
    /// The up vector does not need to be perpendicular to the view direction;
    /// it only selects the roll. A target at the camera position or an up
    /// vector parallel to the view direction leaves the orientation unchanged.
    pub fn look_at(&mut self, target: Vec3, up: Vec3) {
        let direction = target - self.position;
        if direction.norm_squared() <= f32::EPSILON || direction.cross(&up).norm_squared() <= f32::EPSILON {
            log::warn!("Camera look_at ignored: degenerate direction {:?} with up {:?}", direction, up);
            return;
        }
        // face_towards maps local +Z onto the given direction
        self.rotation = Quat::face_towards(&-direction, &up);
        log::trace!("Camera look_at updated - target: {:?}, up: {:?}", target, up);
    }

    /// Vertical field of view in degrees
    pub fn fov_degrees(&self) -> f32 {
        utils::rad_to_deg(self.fov)
    }

    /// Set the vertical field of view in degrees
    pub fn set_fov_degrees(&mut self, fov_degrees: f32) {
        self.fov = utils::deg_to_rad(fov_degrees);
    }

    /// Update camera aspect ratio for viewport changes
    ///
    /// Only logs aspect ratio changes when the difference is significant
    /// (> 0.01) to reduce log noise during resize events.
    pub fn set_aspect_ratio(&mut self, aspect: f32) {
        if (self.aspect - aspect).abs() > 0.01 {
            log::info!("Camera aspect ratio changed: {:.3} -> {:.3}", self.aspect, aspect);
        }
        self.aspect = aspect;
    }

    /// Set both clipping plane distances
    pub fn set_clip_planes(&mut self, near: f32, far: f32) {
        self.near = near;
        self.far = far;
    }

    /// World-space view direction
    pub fn forward(&self) -> Vec3 {
        self.rotation * Vec3::new(0.0, 0.0, -1.0)
    }

    /// World-space up direction
    pub fn up(&self) -> Vec3 {
        self.rotation * Vec3::y()
    }

    /// World-space right direction
    pub fn right(&self) -> Vec3 {
        self.rotation * Vec3::x()
    }

    /// Generate view matrix for world-to-camera space transformation
    pub fn view_matrix(&self) -> Mat4 {
        Mat4::look_to_rh(self.position, self.forward(), self.up())
    }

    /// Generate perspective projection matrix over `[near, far]`
    pub fn projection_matrix(&self) -> Mat4 {
        self.projection_with_range(self.near, self.far)
    }

    /// Perspective projection with this camera's FOV and aspect but custom clip distances
    ///
    /// Used by shadow fitting, which only covers part of the view distance.
    pub fn projection_with_range(&self, near: f32, far: f32) -> Mat4 {
        Mat4::perspective_rh_zo(self.fov, self.aspect, near, far)
    }

    /// Generate combined view-projection matrix (`P × V`)
    ///
    /// For rendering individual objects, multiply this result by the model
    /// matrix: `Final = ViewProjection × Model × Vertex`.
    pub fn view_projection_matrix(&self) -> Mat4 {
        self.projection_matrix() * self.view_matrix()
    }
}

impl Default for Camera {
    /// Camera at `(0, 3, 10)` looking down −Z with a 45° FOV, 16:9 aspect and a
    /// `[0.1, 1000]` depth range
    fn default() -> Self {
        Self {
            position: Vec3::new(0.0, 3.0, 10.0),
            rotation: Quat::identity(),
            fov: std::f32::consts::FRAC_PI_4,
            aspect: 16.0 / 9.0,
            near: 0.1,
            far: 1000.0,
        }
    }
}
