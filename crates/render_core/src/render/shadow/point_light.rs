//! Point-light cube shadow matrices

use crate::foundation::math::{Mat4, Mat4Ext, Vec3};

/// Field of view of every cube face
pub const CUBE_FACE_FOV: f32 = std::f32::consts::FRAC_PI_2;

/// Look direction and up vector of each cube face, in +X, −X, +Y, −Y, +Z, −Z order
pub fn cube_faces() -> [(Vec3, Vec3); 6] {
    [
        (Vec3::x(), -Vec3::y()),
        (-Vec3::x(), -Vec3::y()),
        (Vec3::y(), Vec3::z()),
        (-Vec3::y(), -Vec3::z()),
        (Vec3::z(), -Vec3::y()),
        (-Vec3::z(), -Vec3::y()),
    ]
}

/// View and view-projection matrices for the six faces of a point-light cube map
///
/// Returns `(view, projection × view)` pairs in [`cube_faces`] order. Every
/// face uses a square 90° projection over `[near, far]`.
pub fn point_light_cube_matrices(position: Vec3, near: f32, far: f32) -> [(Mat4, Mat4); 6] {
    let projection = Mat4::perspective_rh_zo(CUBE_FACE_FOV, 1.0, near, far);
    cube_faces().map(|(direction, up)| {
        let view = Mat4::look_to_rh(position, direction, up);
        (view, projection * view)
    })
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::foundation::math::utils;
    use approx::assert_relative_eq;

    #[test]
    fn test_each_face_centers_its_axis() {
        let light = Vec3::new(2.0, 5.0, -1.0);
        let faces = point_light_cube_matrices(light, 0.1, 25.0);

        for ((direction, _), (_, view_projection)) in cube_faces().iter().zip(faces.iter()) {
            let ndc = utils::project_point(view_projection, light + direction * 10.0).unwrap();
            assert_relative_eq!(ndc.x, 0.0, epsilon = 1e-5);
            assert_relative_eq!(ndc.y, 0.0, epsilon = 1e-5);
            assert!(ndc.z > 0.0 && ndc.z < 1.0);
        }
    }

    #[test]
    fn test_faces_cover_ninety_degrees() {
        let faces = point_light_cube_matrices(Vec3::zeros(), 0.1, 25.0);
        let (_, view_projection) = faces[0];

        // 45° off the +X axis lands on the face edge
        let ndc = utils::project_point(&view_projection, Vec3::new(5.0, 0.0, 5.0)).unwrap();
        assert_relative_eq!(ndc.x.abs(), 1.0, epsilon = 1e-5);
    }

    #[test]
    fn test_far_plane_is_caller_supplied() {
        let faces = point_light_cube_matrices(Vec3::zeros(), 0.5, 40.0);
        let (_, view_projection) = faces[5];

        let far = utils::project_point(&view_projection, Vec3::new(0.0, 0.0, -40.0)).unwrap();
        assert_relative_eq!(far.z, 1.0, epsilon = 1e-4);
    }
}
