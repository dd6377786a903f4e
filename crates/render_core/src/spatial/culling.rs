//! Frustum culling
//!
//! [`FrustumCuller`] combines a view frustum with object bounds to decide
//! which draws can be skipped, and counts what it decided so callers can log
//! per-frame culling efficiency.

use crate::foundation::math::Mat4;
use super::bounds::{AABB, Frustum};

/// Per-frame culling counters
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq)]
pub struct CullingStats {
    /// Bounds that passed the frustum test
    pub visible: u32,
    /// Bounds rejected by at least one plane
    pub culled: u32,
}

impl CullingStats {
    /// Total number of tests performed
    pub fn tested(&self) -> u32 {
        self.visible + self.culled
    }
}

/// Visibility tester for a single view
#[derive(Debug, Clone)]
pub struct FrustumCuller {
    frustum: Frustum,
    stats: CullingStats,
}

impl FrustumCuller {
    /// Build a culler for the given view-projection matrix
    pub fn new(view_projection: &Mat4) -> Self {
        Self::from_frustum(Frustum::from_view_projection(view_projection))
    }

    /// Build a culler from an already extracted frustum
    pub fn from_frustum(frustum: Frustum) -> Self {
        Self {
            frustum,
            stats: CullingStats::default(),
        }
    }

    /// Frustum being tested against
    pub fn frustum(&self) -> &Frustum {
        &self.frustum
    }

    /// Replace the frustum (for example after the camera moved) and reset counters
    pub fn update(&mut self, view_projection: &Mat4) {
        self.frustum = Frustum::from_view_projection(view_projection);
        self.stats = CullingStats::default();
    }

    /// Test world-space bounds, recording the outcome
    pub fn is_visible(&mut self, world_bounds: &AABB) -> bool {
        let visible = !self.frustum.is_outside(world_bounds);
        if visible {
            self.stats.visible += 1;
        } else {
            self.stats.culled += 1;
        }
        visible
    }

    /// Test object-space bounds placed in the world by `world_matrix`
    pub fn is_visible_transformed(&mut self, local_bounds: &AABB, world_matrix: &Mat4) -> bool {
        self.is_visible(&local_bounds.transform(world_matrix))
    }

    /// Counters since construction or the last [`update`](Self::update)
    pub fn stats(&self) -> CullingStats {
        self.stats
    }
}
