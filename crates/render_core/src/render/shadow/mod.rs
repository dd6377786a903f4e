//! # Shadows
//!
//! Light-space fitting for directional lights, cube-face matrices for point
//! lights and the pass that renders a directional shadow map.
//!
//! The fitted shadow matrix reaches lighting shaders through the global
//! uniform table under [`SHADOW_MATRIX_UNIFORM`]; binding the shadow map
//! texture to lit materials is up to the application, using
//! [`DirectionalShadowPass::shadow_map`].

mod directional;
mod fitter;
mod point_light;

pub use directional::{DirectionalShadowPass, SHADOW_MATRIX_UNIFORM};
pub use fitter::{
    frustum_corners, light_direction, light_view_matrix, ShadowFrustum, ShadowFrustumFitter, SHADOW_DEPTH_SHIFT,
    SHADOW_PADDING,
};
pub use point_light::{cube_faces, point_light_cube_matrices, CUBE_FACE_FOV};
