//! Deferred release list
//!
//! Handles whose owner was dropped without an explicit release wait here
//! until the next [`ReleaseQueue::drain`], which runs on the rendering thread
//! with access to the backend.

use std::cell::RefCell;
use std::rc::Rc;

use crate::render::gpu::{BufferHandle, FramebufferHandle, GpuBackend, ProgramHandle, TextureHandle};

/// A backend handle waiting to be deleted
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum PendingRelease {
    /// Linked program
    Program(ProgramHandle),
    /// Texture
    Texture(TextureHandle),
    /// Vertex or index buffer
    Buffer(BufferHandle),
    /// Framebuffer
    Framebuffer(FramebufferHandle),
}

/// Shared list of handles to delete at the end of the frame
///
/// Cloning the queue shares the same list. The queue is `!Send`, which keeps
/// it and every resource holding it on the rendering thread.
#[derive(Debug, Clone, Default)]
pub struct ReleaseQueue {
    pending: Rc<RefCell<Vec<PendingRelease>>>,
}

impl ReleaseQueue {
    /// Create an empty queue
    pub fn new() -> Self {
        Self::default()
    }

    /// Schedule a handle for deletion
    pub fn push(&self, release: PendingRelease) {
        self.pending.borrow_mut().push(release);
    }

    /// Number of handles waiting
    pub fn len(&self) -> usize {
        self.pending.borrow().len()
    }

    /// True when nothing is waiting
    pub fn is_empty(&self) -> bool {
        self.pending.borrow().is_empty()
    }

    /// Delete every waiting handle through `backend`, returning how many were released
    pub fn drain(&self, backend: &mut dyn GpuBackend) -> usize {
        let pending = std::mem::take(&mut *self.pending.borrow_mut());
        for release in &pending {
            match *release {
                PendingRelease::Program(handle) => backend.delete_program(handle),
                PendingRelease::Texture(handle) => backend.delete_texture(handle),
                PendingRelease::Buffer(handle) => backend.delete_buffer(handle),
                PendingRelease::Framebuffer(handle) => backend.delete_framebuffer(handle),
            }
        }
        if !pending.is_empty() {
            log::debug!("Released {} deferred GPU handles", pending.len());
        }
        pending.len()
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::render::gpu::{GpuCall, HeadlessBackend};

    #[test]
    fn test_clones_share_one_list() {
        let queue = ReleaseQueue::new();
        let clone = queue.clone();

        clone.push(PendingRelease::Texture(TextureHandle(7)));

        assert_eq!(queue.len(), 1);
    }

    #[test]
    fn test_drain_deletes_through_backend() {
        let queue = ReleaseQueue::new();
        let mut backend = HeadlessBackend::new();
        queue.push(PendingRelease::Program(ProgramHandle(1)));
        queue.push(PendingRelease::Framebuffer(FramebufferHandle(2)));

        assert_eq!(queue.drain(&mut backend), 2);
        assert!(queue.is_empty());
        assert_eq!(
            backend.calls(),
            &[
                GpuCall::DeleteProgram(ProgramHandle(1)),
                GpuCall::DeleteFramebuffer(FramebufferHandle(2)),
            ]
        );
        assert_eq!(queue.drain(&mut backend), 0);
    }
}
