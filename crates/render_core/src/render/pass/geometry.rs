//! Forward geometry pass
//!
//! Draws every submitted [`DrawItem`] into the frame target. Camera
//! matrices are published as global uniforms during setup; the model matrix
//! is published per draw right before the material is resolved. Items whose
//! world-space bounds fall outside the camera frustum are skipped.

use crate::foundation::math::Mat4;
use crate::render::gpu::UniformValue;
use crate::render::material::{PropertyId, ShaderStateCache};
use crate::render::resources::RenderTarget;
use crate::render::{Camera, RenderResult};
use crate::spatial::{CullingStats, FrustumCuller};
use super::{DrawItem, FrameContext, RenderPass, RenderQueue};

/// Global uniform carrying the model matrix of the current draw
pub const MODEL_UNIFORM: &str = "u_Model";
/// Global uniform carrying the camera view-projection matrix
pub const VIEW_PROJECTION_UNIFORM: &str = "u_ViewProjection";
/// Global uniform carrying the camera world position
pub const CAMERA_POSITION_UNIFORM: &str = "u_CameraPosition";

/// Draws the frame's items with camera-frustum culling
#[derive(Debug)]
pub struct GeometryPass {
    name: String,
    key: i32,
    culling_enabled: bool,
    culler: FrustumCuller,
    model: PropertyId,
    view_projection: PropertyId,
    camera_position: PropertyId,
    draws_issued: usize,
}

impl GeometryPass {
    /// Opaque geometry pass using the standard uniform names
    pub fn new(shaders: &mut ShaderStateCache) -> Self {
        Self {
            name: "geometry".to_string(),
            key: RenderQueue::OPAQUE,
            culling_enabled: true,
            culler: FrustumCuller::new(&Mat4::identity()),
            model: shaders.property_id(MODEL_UNIFORM),
            view_projection: shaders.property_id(VIEW_PROJECTION_UNIFORM),
            camera_position: shaders.property_id(CAMERA_POSITION_UNIFORM),
            draws_issued: 0,
        }
    }

    /// Set the pass name used in logs and reports
    pub fn with_name(mut self, name: impl Into<String>) -> Self {
        self.name = name.into();
        self
    }

    /// Set the ordering key
    pub fn with_ordering_key(mut self, key: i32) -> Self {
        self.key = key;
        self
    }

    /// Enable or disable frustum culling
    pub fn with_culling(mut self, enabled: bool) -> Self {
        self.culling_enabled = enabled;
        self
    }

    /// Culling counters for the current frame
    pub fn culling_stats(&self) -> CullingStats {
        self.culler.stats()
    }

    /// Draw calls issued by the last execute
    pub fn draws_issued(&self) -> usize {
        self.draws_issued
    }

    fn draw_item(&mut self, ctx: &mut FrameContext<'_>, item: &DrawItem) -> bool {
        let world = match ctx.transforms.world_matrix(item.node) {
            Ok(world) => world,
            Err(e) => {
                log::warn!("Skipping mesh '{}': {}", item.mesh.label(), e);
                return false;
            }
        };

        if self.culling_enabled && !self.culler.is_visible_transformed(item.mesh.bounding_box(), &world) {
            return false;
        }

        ctx.shaders.set_global_uniform(self.model, UniformValue::Mat4(world));
        if ctx.shaders.resolve_for_draw(ctx.backend, item.material).is_none() {
            return false;
        }
        item.mesh.draw(ctx.backend);
        true
    }
}

impl RenderPass for GeometryPass {
    fn name(&self) -> &str {
        &self.name
    }

    fn ordering_key(&self) -> i32 {
        self.key
    }

    fn frame_setup(&mut self, ctx: &mut FrameContext<'_>, camera: &Camera) -> RenderResult<()> {
        let view_projection = camera.view_projection_matrix();
        self.culler.update(&view_projection);
        self.draws_issued = 0;

        ctx.shaders
            .set_global_uniform(self.view_projection, UniformValue::Mat4(view_projection));
        ctx.shaders
            .set_global_uniform(self.camera_position, UniformValue::Vec3(camera.position));
        Ok(())
    }

    fn execute(&mut self, ctx: &mut FrameContext<'_>, target: &RenderTarget) -> RenderResult<()> {
        target.bind(ctx.backend);

        // Grouping by material keeps program switches down
        let draws = ctx.draws;
        let mut order: Vec<&DrawItem> = draws.iter().collect();
        order.sort_by_key(|item| item.material);

        for item in order {
            if self.draw_item(ctx, item) {
                self.draws_issued += 1;
            }
        }
        Ok(())
    }

    fn frame_cleanup(&mut self, _ctx: &mut FrameContext<'_>) {
        let stats = self.culler.stats();
        log::trace!(
            "Pass '{}': {} draws, {} culled of {} tested",
            self.name,
            self.draws_issued,
            stats.culled,
            stats.tested()
        );
    }
}
