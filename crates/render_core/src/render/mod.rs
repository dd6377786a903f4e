//! # Rendering System
//!
//! Frame-execution layer of the core: the GPU seam, resource wrappers, the
//! material system, the pass scheduler and shadow fitting.
//!
//! ## Architecture
//!
//! - **GPU seam**: [`gpu::GpuBackend`] is the only place graphics API calls happen
//! - **Resources**: owned wrappers around backend handles with deferred release
//! - **Materials**: [`material::ShaderStateCache`] resolves and deduplicates uniform state
//! - **Passes**: [`pass::RenderQueueScheduler`] orders and runs [`pass::RenderPass`]es
//! - **Shadows**: [`shadow::ShadowFrustumFitter`] fits light-space projections
//!
//! ## Error Policy
//!
//! GPU-adjacent failures (missing uniform locations, exhausted texture
//! units, incomplete framebuffers, released programs) are logged and the
//! affected operation becomes a no-op. [`RenderError`] is reserved for
//! failures the caller must act on, such as resource creation.

pub mod gpu;
pub mod resources;
pub mod material;
pub mod pass;
pub mod shadow;

mod camera;

#[cfg(test)]
mod tests;

pub use camera::Camera;
pub use gpu::{GpuBackend, HeadlessBackend};
pub use material::{Material, MaterialId, PropertyId, ShaderProgram, ShaderStateCache};
pub use pass::{FrameContext, FrameReport, GeometryPass, RenderPass, RenderQueue, RenderQueueScheduler};
pub use resources::{Mesh, ReleaseQueue, RenderTarget};
pub use shadow::{DirectionalShadowPass, ShadowFrustum, ShadowFrustumFitter};

use thiserror::Error;

/// High-level rendering error types
///
/// Represents errors that can occur during rendering operations, abstracted
/// from specific graphics API error types so passes and resources can be
/// written against any [`GpuBackend`].
#[derive(Error, Debug, Clone, PartialEq)]
pub enum RenderError {
    /// Renderer initialization failed during setup
    ///
    /// Occurs when the renderer context cannot be built, typically because of
    /// an invalid configuration.
    #[error("Renderer initialization failed: {0}")]
    InitializationFailed(String),

    /// A rendering operation failed during execution
    ///
    /// Returned by passes from `frame_setup` or `execute`. The scheduler logs
    /// it and carries on with the remaining passes.
    #[error("Rendering failed: {0}")]
    RenderingFailed(String),

    /// Resource creation or management failed
    ///
    /// Occurs when GPU resources (buffers, textures, programs, framebuffers)
    /// cannot be created, typically because of invalid data.
    #[error("Resource creation failed: {0}")]
    ResourceCreationFailed(String),

    /// A projection or view-projection matrix could not be inverted
    #[error("Degenerate projection: {0}")]
    DegenerateProjection(String),

    /// Backend-specific error occurred
    ///
    /// Wraps backend-specific errors in a generic form for consistent error
    /// handling across different graphics backends.
    #[error("Backend error: {0}")]
    BackendError(String),
}

/// Result type for rendering operations
pub type RenderResult<T> = Result<T, RenderError>;
