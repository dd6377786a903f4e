//! Directional shadow frustum fitting
//!
//! Fits an orthographic light projection around the part of the camera
//! frustum that receives shadows, `[near, range]` along the view direction.
//!
//! ## Light Space
//!
//! The light looks down its own −Z, like the camera, so the light direction
//! is the negated +Z column of its world matrix. Light-space depth is the
//! negated view-space Z, which makes every bound along Z a positive distance
//! in front of the light.
//!
//! ## Padding
//!
//! The light-space box grows by one world unit on each side along X and Y.
//! Along Z both the near and far bound are pushed one unit further away
//! from the light, so the box shifts rather than grows in depth.

use crate::core::config::{clamp_shadow_range, ShadowConfig};
use crate::foundation::math::{utils, Mat4, Mat4Ext, Vec3};
use crate::render::{Camera, RenderError, RenderResult};
use crate::spatial::AABB;

/// Lateral padding around the fitted light-space box, in world units
pub const SHADOW_PADDING: f32 = 1.0;

/// Depth shift applied to both light-space Z bounds, in world units
pub const SHADOW_DEPTH_SHIFT: f32 = 1.0;

/// Result of fitting a directional light to a camera
#[derive(Debug, Clone, PartialEq)]
pub struct ShadowFrustum {
    /// World → light view transform
    pub light_view: Mat4,
    /// Orthographic projection over [`snapped_bounds`](Self::snapped_bounds)
    pub projection: Mat4,
    /// `projection × light_view`
    pub shadow_matrix: Mat4,
    /// World-space corners of the fitted camera frustum slice
    pub frustum_corners: [Vec3; 8],
    /// World-space box around [`frustum_corners`](Self::frustum_corners)
    pub world_bounds: AABB,
    /// Light-space box around the world box corners, before padding
    pub light_bounds: AABB,
    /// [`light_bounds`](Self::light_bounds) after padding
    pub padded_bounds: AABB,
    /// [`padded_bounds`](Self::padded_bounds) after texel snapping on X and Y
    pub snapped_bounds: AABB,
    /// Clamped shadow distance used for the fit
    pub range: f32,
}

/// Fits light-space projections for directional shadows
#[derive(Debug, Clone, PartialEq)]
pub struct ShadowFrustumFitter {
    resolution: u32,
    range: f32,
    near: f32,
}

impl ShadowFrustumFitter {
    /// Create a fitter from shadow settings
    pub fn new(config: &ShadowConfig) -> Self {
        Self {
            resolution: config.resolution.max(1),
            range: config.clamped_range(),
            near: config.near,
        }
    }

    /// Shadow map resolution in texels along each side
    pub fn resolution(&self) -> u32 {
        self.resolution
    }

    /// Clamped shadow distance
    pub fn range(&self) -> f32 {
        self.range
    }

    /// Set the shadow distance, clamping into the supported range
    pub fn set_range(&mut self, range: f32) {
        self.range = clamp_shadow_range(range);
    }

    /// Fit the light described by `light_world` to `camera`
    ///
    /// `light_world` is the light's world matrix; only its orientation and
    /// position are used.
    pub fn fit(&self, light_world: &Mat4, camera: &Camera) -> RenderResult<ShadowFrustum> {
        // 1-2: world-space corners of the camera frustum over [near, range]
        let view_projection = camera.projection_with_range(self.near, self.range) * camera.view_matrix();
        let frustum_corners = frustum_corners(&view_projection)?;

        // 3
        let world_bounds = bounds_of(&frustum_corners)?;

        // 4
        let light_view = light_view_matrix(light_world);

        // 5: light-space box of the world box, depth as positive distance
        let light_corners = world_bounds.corners().map(|corner| {
            let p = light_view.transform_point(&corner.into());
            Vec3::new(p.x, p.y, -p.z)
        });
        let light_bounds = bounds_of(&light_corners)?;

        // 6
        let padded_bounds = AABB::new(
            Vec3::new(
                light_bounds.min.x - SHADOW_PADDING,
                light_bounds.min.y - SHADOW_PADDING,
                light_bounds.min.z + SHADOW_DEPTH_SHIFT,
            ),
            Vec3::new(
                light_bounds.max.x + SHADOW_PADDING,
                light_bounds.max.y + SHADOW_PADDING,
                light_bounds.max.z + SHADOW_DEPTH_SHIFT,
            ),
        );

        // 7
        let snapped_bounds = self.snap_to_texels(&padded_bounds);

        // 8
        let projection = Mat4::orthographic_rh_zo(
            snapped_bounds.min.x,
            snapped_bounds.max.x,
            snapped_bounds.min.y,
            snapped_bounds.max.y,
            snapped_bounds.min.z,
            snapped_bounds.max.z,
        );
        let shadow_matrix = projection * light_view;

        log::trace!(
            "Shadow fit over {:.1} units: light bounds {:?} .. {:?}",
            self.range,
            snapped_bounds.min,
            snapped_bounds.max
        );

        Ok(ShadowFrustum {
            light_view,
            projection,
            shadow_matrix,
            frustum_corners,
            world_bounds,
            light_bounds,
            padded_bounds,
            snapped_bounds,
            range: self.range,
        })
    }

    /// Round X/Y bounds down to whole shadow-map texels
    fn snap_to_texels(&self, bounds: &AABB) -> AABB {
        let texel = bounds.size() / self.resolution as f32;
        AABB::new(
            Vec3::new(
                utils::floor_to_multiple(bounds.min.x, texel.x),
                utils::floor_to_multiple(bounds.min.y, texel.y),
                bounds.min.z,
            ),
            Vec3::new(
                utils::floor_to_multiple(bounds.max.x, texel.x),
                utils::floor_to_multiple(bounds.max.y, texel.y),
                bounds.max.z,
            ),
        )
    }
}

impl Default for ShadowFrustumFitter {
    fn default() -> Self {
        Self::new(&ShadowConfig::default())
    }
}

/// Direction a light with world matrix `light_world` shines along
pub fn light_direction(light_world: &Mat4) -> Vec3 {
    let forward = light_world.fixed_view::<3, 1>(0, 2).into_owned();
    -forward.normalize()
}

/// View matrix of a directional light
///
/// The up axis blends from world +Z towards world −Y as the light turns
/// towards the X axis. When that blend ends up parallel to the light
/// direction, world +X is used instead.
pub fn light_view_matrix(light_world: &Mat4) -> Mat4 {
    let look = light_direction(light_world);
    let eye = light_world.fixed_view::<3, 1>(0, 3).into_owned();

    let t = look.dot(&Vec3::x()).abs();
    let mut up = utils::lerp_vec3(Vec3::z(), -Vec3::y(), t).normalize();
    if up.cross(&look).norm_squared() <= 1e-6 {
        up = Vec3::x();
    }

    Mat4::look_to_rh(eye, look, up)
}

/// World-space corners of the frustum described by `view_projection`
///
/// Corners are ordered near plane first, counter-clockwise from bottom-left.
pub fn frustum_corners(view_projection: &Mat4) -> RenderResult<[Vec3; 8]> {
    let inverse = view_projection.try_inverse().ok_or_else(|| {
        RenderError::DegenerateProjection("camera view-projection is not invertible".to_string())
    })?;

    let mut corners = [Vec3::zeros(); 8];
    for (i, corner) in corners.iter_mut().enumerate() {
        let x = if matches!(i % 4, 1 | 2) { 1.0 } else { -1.0 };
        let y = if i % 4 >= 2 { 1.0 } else { -1.0 };
        let z = if i >= 4 { 1.0 } else { 0.0 };
        *corner = utils::project_point(&inverse, Vec3::new(x, y, z))
            .filter(|p| p.iter().all(|c| c.is_finite()))
            .ok_or_else(|| RenderError::DegenerateProjection("frustum corner at infinity".to_string()))?;
    }
    Ok(corners)
}

fn bounds_of(points: &[Vec3; 8]) -> RenderResult<AABB> {
    AABB::from_points(points.iter().copied())
        .filter(|bounds| bounds.min.iter().chain(bounds.max.iter()).all(|c| c.is_finite()))
        .ok_or_else(|| RenderError::DegenerateProjection("non-finite shadow bounds".to_string()))
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::foundation::math::{Quat, Transform};
    use approx::assert_relative_eq;

    fn sun(direction: Vec3) -> Mat4 {
        // Light looks down its local -Z; none of the test directions lie along X
        let rotation = Quat::face_towards(&-direction, &Vec3::x());
        Transform::from_position_rotation(Vec3::new(0.0, 50.0, 0.0), rotation).to_matrix()
    }

    fn camera() -> Camera {
        let mut camera = Camera::perspective(Vec3::new(0.0, 2.0, 10.0), 60.0, 16.0 / 9.0, 0.1, 500.0);
        camera.look_at(Vec3::zeros(), Vec3::y());
        camera
    }

    #[test]
    fn test_light_direction_is_negated_forward_column() {
        let direction = Vec3::new(0.3, -1.0, 0.2).normalize();

        assert_relative_eq!(light_direction(&sun(direction)), direction, epsilon = 1e-5);
    }

    #[test]
    fn test_light_bounds_contain_transformed_corners() {
        let fitter = ShadowFrustumFitter::new(&ShadowConfig::new(1024, 40.0));
        let fit = fitter.fit(&sun(Vec3::new(0.2, -1.0, -0.4).normalize()), &camera()).unwrap();

        for corner in fit.world_bounds.corners() {
            let p = fit.light_view.transform_point(&corner.into());
            let light = Vec3::new(p.x, p.y, -p.z);
            for axis in 0..3 {
                assert!(light[axis] >= fit.light_bounds.min[axis] - 1e-3);
                assert!(light[axis] <= fit.light_bounds.max[axis] + 1e-3);
            }
        }
    }

    #[test]
    fn test_padding_grows_lateral_extent_and_shifts_depth() {
        let fitter = ShadowFrustumFitter::default();
        let fit = fitter.fit(&sun(Vec3::new(0.0, -1.0, -0.5).normalize()), &camera()).unwrap();

        let unpadded = fit.light_bounds.size();
        let padded = fit.padded_bounds.size();
        assert!(padded.x >= unpadded.x + 2.0 - 1e-3);
        assert!(padded.y >= unpadded.y + 2.0 - 1e-3);
        assert_relative_eq!(padded.z, unpadded.z, epsilon = 1e-3);
        assert_relative_eq!(fit.padded_bounds.min.z, fit.light_bounds.min.z + 1.0, epsilon = 1e-3);
    }

    #[test]
    fn test_snapped_bounds_are_texel_multiples() {
        let fitter = ShadowFrustumFitter::new(&ShadowConfig::new(512, 64.0));
        let fit = fitter.fit(&sun(Vec3::new(0.5, -1.0, 0.1).normalize()), &camera()).unwrap();

        let texel = fit.padded_bounds.size().x / 512.0;
        let steps = fit.snapped_bounds.min.x / texel;
        assert_relative_eq!(steps, steps.round(), epsilon = 1e-2);
        assert!(fit.snapped_bounds.min.x <= fit.padded_bounds.min.x);
        assert!(fit.snapped_bounds.max.x <= fit.padded_bounds.max.x);
    }

    #[test]
    fn test_range_is_clamped() {
        let mut fitter = ShadowFrustumFitter::new(&ShadowConfig::new(2048, 2.0));
        assert_relative_eq!(fitter.range(), 16.0);

        fitter.set_range(5000.0);
        assert_relative_eq!(fitter.range(), 1000.0);
    }

    #[test]
    fn test_vertical_light_has_usable_basis() {
        let fitter = ShadowFrustumFitter::default();
        let fit = fitter.fit(&sun(-Vec3::y()), &camera()).unwrap();

        assert!(fit.shadow_matrix.iter().all(|v| v.is_finite()));
    }

    #[test]
    fn test_light_along_z_falls_back_to_x_up() {
        let light = sun(-Vec3::z());
        let view = light_view_matrix(&light);

        assert!(view.iter().all(|v| v.is_finite()));
        // World +X maps onto light-space up
        let up = view.transform_vector(&Vec3::x());
        assert_relative_eq!(up.y, 1.0, epsilon = 1e-5);
    }

    #[test]
    fn test_degenerate_camera_is_an_error() {
        let mut camera = camera();
        camera.aspect = 0.0;

        let result = ShadowFrustumFitter::default().fit(&sun(-Vec3::y()), &camera);

        assert!(matches!(result, Err(RenderError::DegenerateProjection(_))));
    }

    #[test]
    fn test_shadow_matrix_maps_frustum_center_into_clip_volume() {
        let fitter = ShadowFrustumFitter::default();
        let fit = fitter.fit(&sun(Vec3::new(0.1, -1.0, -0.3).normalize()), &camera()).unwrap();

        let center = fit.world_bounds.center();
        let clip = utils::project_point(&fit.shadow_matrix, center).unwrap();

        assert!(clip.x.abs() <= 1.0 && clip.y.abs() <= 1.0);
    }
}
