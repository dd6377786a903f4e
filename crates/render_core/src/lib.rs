//! # Render Core
//!
//! Frame-execution core of a real-time renderer: it decides what draws in
//! what order, which GPU state changes are actually necessary, where objects
//! are in space and how directional shadow volumes are fit to the view.
//!
//! ## Features
//!
//! - **Pass Scheduling**: Ordered setup/execute/cleanup of render passes with failure isolation
//! - **Shader State Cache**: Local/global uniform resolution with redundant-push elimination
//! - **Transform Graph**: Hierarchical transforms with dirty flags and static baking
//! - **Frustum Culling**: AABB/plane tests against the camera frustum
//! - **Shadow Fitting**: Texel-snapped light-space projections for directional lights
//! - **Headless Backend**: Call-recording GPU backend for tests and tools
//!
//! ## Quick Start
//!
//! ```rust
//! use std::cell::RefCell;
//! use std::rc::Rc;
//! use render_core::prelude::*;
//!
//! let mut renderer = Renderer::new(HeadlessBackend::new(), RendererConfig::default())?;
//! let geometry = Rc::new(RefCell::new(GeometryPass::new(renderer.shaders_mut())));
//! renderer.register_pass(&geometry);
//!
//! let target = RenderTarget::default_framebuffer(1280, 720);
//! let report = renderer.render_frame(&Camera::default(), &target, &[]);
//! assert_eq!(report.executed, vec!["geometry"]);
//! # Ok::<(), render_core::render::RenderError>(())
//! ```

#![warn(missing_docs)]
#![warn(clippy::all, clippy::pedantic, clippy::nursery)]
#![allow(clippy::module_name_repetitions, clippy::similar_names, clippy::too_many_arguments)]

// Core engine modules
pub mod core;
pub mod config;
pub mod foundation;

// Frame core
pub mod spatial;
pub mod scene;
pub mod render;
pub mod editor;

mod renderer;

pub use renderer::Renderer;

/// Common imports for frame core users
pub mod prelude {
    pub use crate::{
        Renderer,
        core::config::{ApplicationConfig, Config, EngineConfig, RendererConfig, ShadowConfig},
        editor::{Editable, FieldValue},
        foundation::math::{Mat4, Quat, Transform, Vec3, Vec4},
        render::{
            Camera, DirectionalShadowPass, FrameContext, FrameReport, GeometryPass, Mesh, RenderError,
            RenderPass, RenderQueue, RenderResult, RenderTarget, ShaderStateCache,
            gpu::{GpuBackend, HeadlessBackend, ProgramSource, UniformValue},
            material::{MaterialId, PropertyId},
            pass::DrawItem,
            resources::RenderTargetDesc,
        },
        scene::{NodeId, TransformGraph},
        spatial::{AABB, Frustum, FrustumCuller},
    };
}
