//! Directional shadow map pass
//!
//! Runs in the [`RenderQueue::SHADOWS`] band. During setup it fits the light
//! to the frame camera; during execute it draws every shadow caster into its
//! own depth target and then publishes the shadow matrix as the global
//! uniform [`SHADOW_MATRIX_UNIFORM`] for the lighting passes that follow.

use std::rc::Rc;

use crate::core::config::ShadowConfig;
use crate::foundation::collections::{MaterialId, NodeId};
use crate::foundation::math::Mat4;
use crate::render::gpu::{GpuBackend, TextureHandle, UniformValue};
use crate::render::material::{PropertyId, ShaderProgram, ShaderStateCache};
use crate::render::pass::{
    DrawItem, FrameContext, RenderPass, RenderQueue, MODEL_UNIFORM, VIEW_PROJECTION_UNIFORM,
};
use crate::render::resources::{ReleaseQueue, RenderTarget, RenderTargetDesc};
use crate::render::{Camera, RenderError, RenderResult};
use crate::spatial::FrustumCuller;
use super::fitter::{ShadowFrustum, ShadowFrustumFitter};

/// Global uniform carrying the world → shadow clip transform
pub const SHADOW_MATRIX_UNIFORM: &str = "u_ShadowMatrix";

/// Renders a depth map for one directional light
#[derive(Debug)]
pub struct DirectionalShadowPass {
    name: String,
    key: i32,
    light: NodeId,
    fitter: ShadowFrustumFitter,
    target: Option<RenderTarget>,
    depth_material: MaterialId,
    culler: FrustumCuller,
    model: PropertyId,
    view_projection: PropertyId,
    shadow_matrix: PropertyId,
    frustum: Option<ShadowFrustum>,
    casters_drawn: usize,
}

impl DirectionalShadowPass {
    /// Create the pass and its depth target
    ///
    /// `light` is the transform node whose −Z axis the light shines along.
    /// `depth_program` must declare `u_Model` and `u_ViewProjection`.
    pub fn new(
        backend: &mut dyn GpuBackend,
        shaders: &mut ShaderStateCache,
        config: &ShadowConfig,
        light: NodeId,
        depth_program: &Rc<ShaderProgram>,
        release_queue: &ReleaseQueue,
    ) -> RenderResult<Self> {
        let desc = RenderTargetDesc::depth_only("shadow map", config.resolution, config.resolution);
        let target = RenderTarget::new(backend, desc, release_queue)?;
        let depth_material = shaders.create_material("shadow depth", depth_program);

        log::info!(
            "Created directional shadow pass ({}x{}, range {:.1})",
            config.resolution,
            config.resolution,
            config.clamped_range()
        );

        Ok(Self {
            name: "directional shadows".to_string(),
            key: RenderQueue::SHADOWS,
            light,
            fitter: ShadowFrustumFitter::new(config),
            target: Some(target),
            depth_material,
            culler: FrustumCuller::new(&Mat4::identity()),
            model: shaders.property_id(MODEL_UNIFORM),
            view_projection: shaders.property_id(VIEW_PROJECTION_UNIFORM),
            shadow_matrix: shaders.property_id(SHADOW_MATRIX_UNIFORM),
            frustum: None,
            casters_drawn: 0,
        })
    }

    /// Light node this pass follows
    pub fn light(&self) -> NodeId {
        self.light
    }

    /// Follow a different light node
    pub fn set_light(&mut self, light: NodeId) {
        self.light = light;
    }

    /// Fitter, for adjusting the shadow range
    pub fn fitter_mut(&mut self) -> &mut ShadowFrustumFitter {
        &mut self.fitter
    }

    /// Fit computed by the last setup
    pub fn frustum(&self) -> Option<&ShadowFrustum> {
        self.frustum.as_ref()
    }

    /// Depth texture to sample the shadow map from
    pub fn shadow_map(&self) -> Option<TextureHandle> {
        self.target
            .as_ref()
            .and_then(RenderTarget::depth_attachment)
            .map(|texture| texture.handle())
    }

    /// Material used for depth-only drawing
    pub fn depth_material(&self) -> MaterialId {
        self.depth_material
    }

    /// Casters drawn by the last execute
    pub fn casters_drawn(&self) -> usize {
        self.casters_drawn
    }

    fn draw_caster(&mut self, ctx: &mut FrameContext<'_>, item: &DrawItem) -> bool {
        let world = match ctx.transforms.world_matrix(item.node) {
            Ok(world) => world,
            Err(e) => {
                log::warn!("Skipping shadow caster '{}': {}", item.mesh.label(), e);
                return false;
            }
        };
        if !self.culler.is_visible_transformed(item.mesh.bounding_box(), &world) {
            return false;
        }

        ctx.shaders.set_global_uniform(self.model, UniformValue::Mat4(world));
        if ctx.shaders.resolve_for_draw(ctx.backend, self.depth_material).is_none() {
            return false;
        }
        item.mesh.draw(ctx.backend);
        true
    }
}

impl RenderPass for DirectionalShadowPass {
    fn name(&self) -> &str {
        &self.name
    }

    fn ordering_key(&self) -> i32 {
        self.key
    }

    fn frame_setup(&mut self, ctx: &mut FrameContext<'_>, camera: &Camera) -> RenderResult<()> {
        self.frustum = None;
        self.casters_drawn = 0;

        let light_world = ctx
            .transforms
            .world_matrix(self.light)
            .map_err(|e| RenderError::RenderingFailed(format!("shadow light: {}", e)))?;
        let frustum = self.fitter.fit(&light_world, camera)?;

        self.culler.update(&frustum.shadow_matrix);
        // Local value overrides the camera matrix published by geometry passes
        ctx.shaders.set_uniform(
            self.depth_material,
            self.view_projection,
            UniformValue::Mat4(frustum.shadow_matrix),
            false,
        );
        self.frustum = Some(frustum);
        Ok(())
    }

    fn execute(&mut self, ctx: &mut FrameContext<'_>, _target: &RenderTarget) -> RenderResult<()> {
        let Some(shadow_matrix) = self.frustum.as_ref().map(|f| f.shadow_matrix) else {
            return Err(RenderError::RenderingFailed("shadow pass executed without a fit".to_string()));
        };
        let Some(target) = self.target.as_ref() else {
            return Err(RenderError::RenderingFailed("shadow pass has been disposed".to_string()));
        };
        target.bind(ctx.backend);

        let draws = ctx.draws;
        for item in draws.iter().filter(|item| item.casts_shadows) {
            if self.draw_caster(ctx, item) {
                self.casters_drawn += 1;
            }
        }

        ctx.shaders
            .set_global_uniform(self.shadow_matrix, UniformValue::Mat4(shadow_matrix));
        Ok(())
    }

    fn frame_cleanup(&mut self, _ctx: &mut FrameContext<'_>) {
        log::trace!("Pass '{}': {} casters drawn", self.name, self.casters_drawn);
    }

    fn dispose(&mut self, backend: &mut dyn GpuBackend) {
        if let Some(target) = self.target.take() {
            target.release(backend);
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::foundation::math::{Quat, Transform, Vec3};
    use crate::render::gpu::{GpuCall, HeadlessBackend, ProgramSource};
    use crate::render::resources::Mesh;
    use crate::scene::TransformGraph;

    const DEPTH_VERTEX: &str = "uniform mat4 u_Model; uniform mat4 u_ViewProjection; void main() {}";
    const DEPTH_FRAGMENT: &str = "void main() {}";

    struct Scene {
        backend: HeadlessBackend,
        shaders: ShaderStateCache,
        transforms: TransformGraph,
        draws: Vec<DrawItem>,
        pass: DirectionalShadowPass,
    }

    impl Scene {
        fn new() -> Self {
            let queue = ReleaseQueue::new();
            let mut backend = HeadlessBackend::new();
            let mut shaders = ShaderStateCache::new(32, queue.clone());
            let mut transforms = TransformGraph::new();

            let depth = shaders
                .create_program(&mut backend, &ProgramSource::new("depth", DEPTH_VERTEX, DEPTH_FRAGMENT))
                .unwrap();
            let sun_rotation = Quat::face_towards(&Vec3::new(0.0, 1.0, 0.3), &Vec3::x());
            let sun = transforms.create_node(Transform::from_position_rotation(Vec3::new(0.0, 30.0, 0.0), sun_rotation));
            let pass = DirectionalShadowPass::new(
                &mut backend,
                &mut shaders,
                &ShadowConfig::new(256, 32.0),
                sun,
                &depth,
                &queue,
            )
            .unwrap();

            let material = shaders.create_material("lit", &depth);
            let cube = Rc::new(Mesh::cuboid(&mut backend, "cube", Vec3::new(1.0, 1.0, 1.0), &queue).unwrap());
            let caster = transforms.create_node(Transform::from_position(Vec3::new(0.0, 0.0, 0.0)));
            let receiver = transforms.create_node(Transform::from_position(Vec3::new(2.0, -1.0, 0.0)));
            let draws = vec![
                DrawItem::new(Rc::clone(&cube), caster, material),
                DrawItem::new(cube, receiver, material).with_shadows(false),
            ];

            Self { backend, shaders, transforms, draws, pass }
        }

        fn frame(&mut self) -> RenderResult<()> {
            let mut ctx = FrameContext {
                backend: &mut self.backend,
                shaders: &mut self.shaders,
                transforms: &mut self.transforms,
                draws: &self.draws,
                frame_index: 0,
            };
            let mut camera = Camera::default();
            camera.look_at(Vec3::zeros(), Vec3::y());
            let target = RenderTarget::default_framebuffer(1280, 720);

            self.pass.frame_setup(&mut ctx, &camera)?;
            self.pass.execute(&mut ctx, &target)?;
            self.pass.frame_cleanup(&mut ctx);
            Ok(())
        }
    }

    #[test]
    fn test_only_casters_are_drawn_into_shadow_target() {
        let mut scene = Scene::new();

        scene.frame().unwrap();

        assert_eq!(scene.pass.casters_drawn(), 1);
        assert_eq!(scene.backend.draw_count(), 1);
        let bound_shadow_target = scene
            .backend
            .calls()
            .iter()
            .any(|call| matches!(call, GpuCall::BindFramebuffer { width: 256, height: 256, .. }));
        assert!(bound_shadow_target);
    }

    #[test]
    fn test_shadow_matrix_published_as_global() {
        let mut scene = Scene::new();

        scene.frame().unwrap();

        let property = scene.shaders.property_id(SHADOW_MATRIX_UNIFORM);
        let expected = scene.pass.frustum().unwrap().shadow_matrix;
        assert_eq!(scene.shaders.global_uniform(property), Some(UniformValue::Mat4(expected)));
    }

    #[test]
    fn test_depth_material_uses_shadow_matrix_locally() {
        let mut scene = Scene::new();

        scene.frame().unwrap();

        let view_projection = scene.shaders.property_id(VIEW_PROJECTION_UNIFORM);
        let expected = scene.pass.frustum().unwrap().shadow_matrix;
        assert_eq!(
            scene.shaders.get_uniform(scene.pass.depth_material(), view_projection),
            Some(UniformValue::Mat4(expected))
        );
    }

    #[test]
    fn test_missing_light_fails_setup() {
        let mut scene = Scene::new();
        let light = scene.pass.light();
        scene.transforms.remove_node(light).unwrap();

        assert!(matches!(scene.frame(), Err(RenderError::RenderingFailed(_))));
    }

    #[test]
    fn test_dispose_releases_target() {
        let mut scene = Scene::new();
        let framebuffers = scene.backend.live_framebuffers();

        scene.pass.dispose(&mut scene.backend);

        assert_eq!(scene.backend.live_framebuffers(), framebuffers - 1);
        assert!(scene.pass.shadow_map().is_none());
        assert!(matches!(scene.frame(), Err(RenderError::RenderingFailed(_))));
    }
}
