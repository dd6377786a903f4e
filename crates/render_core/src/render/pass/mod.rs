//! # Render Passes
//!
//! A frame is a sequence of [`RenderPass`]es ordered by an integer key.
//! Lower keys run first; passes with equal keys keep their registration
//! order. The [`RenderQueue`] constants name the conventional bands.
//!
//! ## Frame Lifecycle
//!
//! 1. `frame_setup` on every pass, in key order
//! 2. `execute` on every pass, in key order
//! 3. `frame_cleanup` on every pass, in key order
//!
//! A pass that fails in `frame_setup` or `execute` is logged and the frame
//! carries on with the remaining passes.

mod geometry;
mod scheduler;

pub use geometry::{GeometryPass, CAMERA_POSITION_UNIFORM, MODEL_UNIFORM, VIEW_PROJECTION_UNIFORM};
pub use scheduler::{FrameReport, RenderQueueScheduler};
pub use crate::foundation::collections::PassHandle;

use std::rc::Rc;

use crate::foundation::collections::{MaterialId, NodeId};
use crate::render::gpu::GpuBackend;
use crate::render::material::ShaderStateCache;
use crate::render::resources::{Mesh, RenderTarget};
use crate::render::{Camera, RenderResult};
use crate::scene::TransformGraph;

/// Conventional ordering keys
///
/// Keys between the constants are valid and commonly used to slot a pass in
/// just before or after a band, e.g. `RenderQueue::OPAQUE - 1`.
#[derive(Debug, Clone, Copy)]
pub struct RenderQueue;

impl RenderQueue {
    /// Shadow map rendering
    pub const SHADOWS: i32 = 1000;
    /// Opaque geometry
    pub const OPAQUE: i32 = 2000;
    /// First key after transparent geometry has been drawn
    pub const AFTER_TRANSPARENTS: i32 = 3000;
    /// First key after post-processing has run
    pub const AFTER_POST_PROCESSING: i32 = 4000;
}

/// Band an ordering key falls in
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub enum PassPhase {
    /// Keys below [`RenderQueue::AFTER_TRANSPARENTS`], shadows included
    Opaque,
    /// Keys in `[AFTER_TRANSPARENTS, AFTER_POST_PROCESSING)`
    Transparent,
    /// Keys from [`RenderQueue::AFTER_POST_PROCESSING`] up
    PostProcessing,
}

impl PassPhase {
    /// Classify an ordering key
    pub fn from_key(key: i32) -> Self {
        if key < RenderQueue::AFTER_TRANSPARENTS {
            Self::Opaque
        } else if key < RenderQueue::AFTER_POST_PROCESSING {
            Self::Transparent
        } else {
            Self::PostProcessing
        }
    }
}

/// Where a registered pass is in the current frame
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum PassState {
    /// Registered but not yet touched this frame
    NotRun,
    /// `frame_setup` has run
    SetupDone,
    /// `execute` has run
    Executed,
    /// `frame_cleanup` has run
    CleanedUp,
}

/// One mesh instance to draw this frame
#[derive(Debug, Clone)]
pub struct DrawItem {
    /// Geometry
    pub mesh: Rc<Mesh>,
    /// Transform node providing the model matrix
    pub node: NodeId,
    /// Material to draw with
    pub material: MaterialId,
    /// Whether shadow passes draw this item
    pub casts_shadows: bool,
}

impl DrawItem {
    /// Draw item that casts shadows
    pub fn new(mesh: Rc<Mesh>, node: NodeId, material: MaterialId) -> Self {
        Self {
            mesh,
            node,
            material,
            casts_shadows: true,
        }
    }

    /// Set whether shadow passes draw this item
    pub fn with_shadows(mut self, casts_shadows: bool) -> Self {
        self.casts_shadows = casts_shadows;
        self
    }
}

/// Shared frame state handed to every pass
pub struct FrameContext<'a> {
    /// GPU seam
    pub backend: &'a mut dyn GpuBackend,
    /// Materials, globals and push deduplication
    pub shaders: &'a mut ShaderStateCache,
    /// Scene hierarchy
    pub transforms: &'a mut TransformGraph,
    /// Everything submitted for drawing this frame
    pub draws: &'a [DrawItem],
    /// Monotonic frame counter
    pub frame_index: u64,
}

/// A unit of frame work run by the [`RenderQueueScheduler`]
///
/// Passes are owned by the application as `Rc<RefCell<P>>`; the scheduler
/// only holds weak references, so dropping the owner unregisters the pass.
pub trait RenderPass {
    /// Name used in logs and frame reports
    fn name(&self) -> &str;

    /// Ordering key, lower runs first
    fn ordering_key(&self) -> i32;

    /// Per-frame preparation, run for every pass before any `execute`
    fn frame_setup(&mut self, ctx: &mut FrameContext<'_>, camera: &Camera) -> RenderResult<()>;

    /// Record this pass's GPU work into `target`
    fn execute(&mut self, ctx: &mut FrameContext<'_>, target: &RenderTarget) -> RenderResult<()>;

    /// Per-frame teardown, run for every pass after all executes
    fn frame_cleanup(&mut self, _ctx: &mut FrameContext<'_>) {}

    /// Release GPU resources owned by the pass
    fn dispose(&mut self, _backend: &mut dyn GpuBackend) {}
}
