//! GPU resource ownership
//!
//! Every wrapper in this module owns exactly one backend handle (or a small
//! set of them) and has an explicit `release(backend)` method. A wrapper
//! dropped without being released cannot reach the backend from `Drop`, so it
//! logs a warning and pushes its handles onto the shared [`ReleaseQueue`],
//! which the renderer drains once per frame.

mod release_queue;
mod texture;
mod target;
mod mesh;

pub use release_queue::{ReleaseQueue, PendingRelease};
pub use texture::GpuTexture;
pub use target::{RenderTarget, RenderTargetDesc};
pub use mesh::Mesh;
