//! Owned GPU texture

use crate::render::gpu::{GpuBackend, TextureDesc, TextureHandle};
use crate::render::RenderResult;
use super::{PendingRelease, ReleaseQueue};

/// A texture allocated through the backend and owned by this value
#[derive(Debug)]
pub struct GpuTexture {
    handle: TextureHandle,
    desc: TextureDesc,
    released: bool,
    release_queue: ReleaseQueue,
}

impl GpuTexture {
    /// Allocate a texture
    pub fn new(backend: &mut dyn GpuBackend, desc: TextureDesc, release_queue: &ReleaseQueue) -> RenderResult<Self> {
        let handle = backend.create_texture(&desc)?;
        log::debug!("Created texture '{}' {}x{} {:?}", desc.label, desc.width, desc.height, desc.format);

        Ok(Self {
            handle,
            desc,
            released: false,
            release_queue: release_queue.clone(),
        })
    }

    /// Backend handle
    pub fn handle(&self) -> TextureHandle {
        self.handle
    }

    /// Creation parameters
    pub fn desc(&self) -> &TextureDesc {
        &self.desc
    }

    /// Delete the texture now
    pub fn release(mut self, backend: &mut dyn GpuBackend) {
        backend.delete_texture(self.handle);
        self.released = true;
    }
}

impl Drop for GpuTexture {
    fn drop(&mut self) {
        if !self.released {
            log::warn!("Texture '{}' dropped without release, deferring deletion", self.desc.label);
            self.release_queue.push(PendingRelease::Texture(self.handle));
        }
    }
}
