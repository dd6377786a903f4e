//! # Renderer Context
//!
//! Owns the state that lives as long as a rendering context: the GPU
//! backend, the shader state cache (materials, globals and property ids),
//! the transform graph, the pass scheduler and the pending-release queue.
//!
//! ## Frame Flow
//!
//! ```text
//! render_frame(camera, target, draws)
//!   ├── scheduler.run_frame   setup → execute → cleanup for every pass
//!   └── end_frame             drain resources dropped without release
//! ```

use std::cell::RefCell;
use std::rc::Rc;

use crate::core::config::RendererConfig;
use crate::foundation::collections::PassHandle;
use crate::render::gpu::{GpuBackend, ProgramSource};
use crate::render::material::{PropertyId, ShaderProgram, ShaderStateCache};
use crate::render::pass::{DrawItem, FrameContext, FrameReport, RenderPass, RenderQueueScheduler};
use crate::render::resources::{ReleaseQueue, RenderTarget, RenderTargetDesc};
use crate::render::{Camera, RenderError, RenderResult};
use crate::scene::TransformGraph;

/// Rendering context owning every process-wide table
pub struct Renderer<B: GpuBackend> {
    backend: B,
    config: RendererConfig,
    shaders: ShaderStateCache,
    transforms: TransformGraph,
    scheduler: RenderQueueScheduler,
    release_queue: ReleaseQueue,
    frame_index: u64,
}

impl<B: GpuBackend> Renderer<B> {
    /// Create a renderer around `backend`
    ///
    /// Fails with [`RenderError::InitializationFailed`] when the configuration
    /// does not validate.
    pub fn new(backend: B, config: RendererConfig) -> RenderResult<Self> {
        config
            .validate()
            .map_err(|e| RenderError::InitializationFailed(format!("invalid renderer config: {}", e)))?;

        let release_queue = ReleaseQueue::new();
        log::info!(
            "Renderer initialized ({} texture units, culling {})",
            config.max_texture_units,
            if config.culling_enabled { "on" } else { "off" }
        );

        Ok(Self {
            backend,
            shaders: ShaderStateCache::new(config.max_texture_units, release_queue.clone()),
            transforms: TransformGraph::new(),
            scheduler: RenderQueueScheduler::new(),
            release_queue,
            config,
            frame_index: 0,
        })
    }

    /// Active configuration
    pub fn config(&self) -> &RendererConfig {
        &self.config
    }

    /// GPU backend
    pub fn backend(&self) -> &B {
        &self.backend
    }

    /// Mutable GPU backend, for creating resources
    pub fn backend_mut(&mut self) -> &mut B {
        &mut self.backend
    }

    /// Shader state cache
    pub fn shaders(&self) -> &ShaderStateCache {
        &self.shaders
    }

    /// Mutable shader state cache
    pub fn shaders_mut(&mut self) -> &mut ShaderStateCache {
        &mut self.shaders
    }

    /// Backend and shader cache together, for calls that need both
    pub fn backend_and_shaders(&mut self) -> (&mut B, &mut ShaderStateCache) {
        (&mut self.backend, &mut self.shaders)
    }

    /// Transform graph
    pub fn transforms(&self) -> &TransformGraph {
        &self.transforms
    }

    /// Mutable transform graph
    pub fn transforms_mut(&mut self) -> &mut TransformGraph {
        &mut self.transforms
    }

    /// Pass scheduler
    pub fn scheduler(&self) -> &RenderQueueScheduler {
        &self.scheduler
    }

    /// Queue that resources dropped without release are deferred to
    pub fn release_queue(&self) -> &ReleaseQueue {
        &self.release_queue
    }

    /// Frames rendered so far
    pub fn frame_index(&self) -> u64 {
        self.frame_index
    }

    /// Interned id for a uniform name
    pub fn property_id(&mut self, name: &str) -> PropertyId {
        self.shaders.property_id(name)
    }

    /// Compile a program into the shader cache
    pub fn create_program(&mut self, source: &ProgramSource) -> RenderResult<Rc<ShaderProgram>> {
        self.shaders.create_program(&mut self.backend, source)
    }

    /// Recompile a program and move its materials over
    pub fn reload_program(&mut self, old: &Rc<ShaderProgram>, source: &ProgramSource) -> RenderResult<Rc<ShaderProgram>> {
        self.shaders.reload_program(&mut self.backend, old, source)
    }

    /// Create an offscreen render target
    pub fn create_target(&mut self, desc: RenderTargetDesc) -> RenderResult<RenderTarget> {
        RenderTarget::new(&mut self.backend, desc, &self.release_queue)
    }

    /// Register a pass owned by the caller
    pub fn register_pass<P: RenderPass + 'static>(&mut self, pass: &Rc<RefCell<P>>) -> PassHandle {
        self.scheduler.register(pass)
    }

    /// Remove a pass without disposing it
    pub fn unregister_pass(&mut self, handle: PassHandle) -> bool {
        self.scheduler.unregister(handle)
    }

    /// Dispose a pass and remove it; a second call is a no-op
    pub fn dispose_pass(&mut self, handle: PassHandle) -> bool {
        self.scheduler.dispose(handle, &mut self.backend)
    }

    /// Run one frame over `draws` and drain deferred releases
    pub fn render_frame(&mut self, camera: &Camera, target: &RenderTarget, draws: &[DrawItem]) -> FrameReport {
        let mut ctx = FrameContext {
            backend: &mut self.backend,
            shaders: &mut self.shaders,
            transforms: &mut self.transforms,
            draws,
            frame_index: self.frame_index,
        };
        let report = self.scheduler.run_frame(&mut ctx, camera, target);

        self.end_frame();
        report
    }

    /// Delete resources whose owners were dropped without release
    ///
    /// Called by [`render_frame`](Self::render_frame); call it directly when
    /// driving passes by hand.
    pub fn end_frame(&mut self) -> usize {
        let released = self.release_queue.drain(&mut self.backend);
        if released > 0 {
            log::debug!("Frame {}: released {} deferred resources", self.frame_index, released);
        }
        self.frame_index += 1;
        released
    }
}

impl<B: GpuBackend> Drop for Renderer<B> {
    fn drop(&mut self) {
        // Materials hold programs; drop them while the backend is still alive
        self.shaders.clear();
        let released = self.release_queue.drain(&mut self.backend);
        log::debug!("Renderer dropped, {} deferred resources released", released);
    }
}
