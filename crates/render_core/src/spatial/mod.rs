//! Spatial primitives
//!
//! Bounding volumes, clip planes and the frustum culler built on them.

pub mod bounds;
pub mod culling;

pub use bounds::{AABB, Plane, Frustum, FrustumPlane};
pub use culling::{FrustumCuller, CullingStats};
