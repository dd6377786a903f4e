//! Render targets
//!
//! A [`RenderTarget`] is a framebuffer plus the textures attached to it, or
//! the backend's default framebuffer. An incomplete framebuffer is reported
//! once at creation and rendering into it continues; the backend decides what
//! happens to draws issued against it.

use crate::render::gpu::{FramebufferHandle, FramebufferStatus, GpuBackend, TextureDesc, TextureFormat};
use crate::render::RenderResult;
use super::{GpuTexture, PendingRelease, ReleaseQueue};

/// Parameters for [`RenderTarget::new`]
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct RenderTargetDesc {
    /// Name used in log messages and attachment labels
    pub label: String,
    /// Width in pixels
    pub width: u32,
    /// Height in pixels
    pub height: u32,
    /// One color attachment per entry
    pub color_formats: Vec<TextureFormat>,
    /// Whether to attach a depth texture
    pub depth: bool,
}

impl RenderTargetDesc {
    /// Single RGBA8 color attachment with depth
    pub fn new(label: impl Into<String>, width: u32, height: u32) -> Self {
        Self {
            label: label.into(),
            width,
            height,
            color_formats: vec![TextureFormat::Rgba8],
            depth: true,
        }
    }

    /// Depth attachment only, as used by shadow maps
    pub fn depth_only(label: impl Into<String>, width: u32, height: u32) -> Self {
        Self {
            label: label.into(),
            width,
            height,
            color_formats: Vec::new(),
            depth: true,
        }
    }

    /// Replace the color attachment formats
    pub fn with_color_formats(mut self, formats: Vec<TextureFormat>) -> Self {
        self.color_formats = formats;
        self
    }

    /// Enable or disable the depth attachment
    pub fn with_depth(mut self, depth: bool) -> Self {
        self.depth = depth;
        self
    }
}

/// Framebuffer and owned attachments
#[derive(Debug)]
pub struct RenderTarget {
    label: String,
    width: u32,
    height: u32,
    color_attachments: Vec<GpuTexture>,
    depth_attachment: Option<GpuTexture>,
    framebuffer: FramebufferHandle,
    complete: bool,
    owned: bool,
    release_queue: ReleaseQueue,
}

impl RenderTarget {
    /// Create a framebuffer with freshly allocated attachments
    pub fn new(backend: &mut dyn GpuBackend, desc: RenderTargetDesc, release_queue: &ReleaseQueue) -> RenderResult<Self> {
        let mut color_attachments = Vec::with_capacity(desc.color_formats.len());
        for (index, format) in desc.color_formats.iter().enumerate() {
            let texture_desc = TextureDesc::new(format!("{}.color{}", desc.label, index), desc.width, desc.height, *format);
            color_attachments.push(GpuTexture::new(backend, texture_desc, release_queue)?);
        }

        let depth_attachment = if desc.depth {
            let texture_desc = TextureDesc::new(format!("{}.depth", desc.label), desc.width, desc.height, TextureFormat::Depth32F);
            Some(GpuTexture::new(backend, texture_desc, release_queue)?)
        } else {
            None
        };

        let color_handles: Vec<_> = color_attachments.iter().map(GpuTexture::handle).collect();
        let framebuffer = backend.create_framebuffer(&color_handles, depth_attachment.as_ref().map(GpuTexture::handle))?;

        let complete = match backend.framebuffer_status(framebuffer) {
            FramebufferStatus::Complete => true,
            FramebufferStatus::Incomplete(reason) => {
                log::error!("Render target '{}' is incomplete: {}", desc.label, reason);
                false
            }
        };

        Ok(Self {
            label: desc.label,
            width: desc.width,
            height: desc.height,
            color_attachments,
            depth_attachment,
            framebuffer,
            complete,
            owned: true,
            release_queue: release_queue.clone(),
        })
    }

    /// The backend's default framebuffer (handle 0), not owned by this value
    pub fn default_framebuffer(width: u32, height: u32) -> Self {
        Self {
            label: "default".to_string(),
            width,
            height,
            color_attachments: Vec::new(),
            depth_attachment: None,
            framebuffer: FramebufferHandle(0),
            complete: true,
            owned: false,
            release_queue: ReleaseQueue::new(),
        }
    }

    /// Name of the target
    pub fn label(&self) -> &str {
        &self.label
    }

    /// Width in pixels
    pub fn width(&self) -> u32 {
        self.width
    }

    /// Height in pixels
    pub fn height(&self) -> u32 {
        self.height
    }

    /// Width divided by height
    pub fn aspect_ratio(&self) -> f32 {
        if self.height == 0 {
            1.0
        } else {
            self.width as f32 / self.height as f32
        }
    }

    /// Framebuffer handle
    pub fn framebuffer(&self) -> FramebufferHandle {
        self.framebuffer
    }

    /// Color attachments in attachment order
    pub fn color_attachments(&self) -> &[GpuTexture] {
        &self.color_attachments
    }

    /// Depth attachment, if any
    pub fn depth_attachment(&self) -> Option<&GpuTexture> {
        self.depth_attachment.as_ref()
    }

    /// Whether the backend reported the framebuffer complete
    pub fn is_complete(&self) -> bool {
        self.complete
    }

    /// Make this target current with a full-size viewport
    pub fn bind(&self, backend: &mut dyn GpuBackend) {
        backend.bind_framebuffer(self.framebuffer, self.width, self.height);
    }

    /// Delete the framebuffer and its attachments now
    pub fn release(mut self, backend: &mut dyn GpuBackend) {
        if self.owned {
            backend.delete_framebuffer(self.framebuffer);
            self.owned = false;
        }
        for texture in std::mem::take(&mut self.color_attachments) {
            texture.release(backend);
        }
        if let Some(depth) = self.depth_attachment.take() {
            depth.release(backend);
        }
    }
}

impl Drop for RenderTarget {
    fn drop(&mut self) {
        if self.owned {
            log::warn!("Render target '{}' dropped without release, deferring deletion", self.label);
            self.release_queue.push(PendingRelease::Framebuffer(self.framebuffer));
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::render::gpu::HeadlessBackend;

    #[test]
    fn test_creates_attachments_and_reports_complete() {
        let mut backend = HeadlessBackend::new();
        let queue = ReleaseQueue::new();

        let target = RenderTarget::new(&mut backend, RenderTargetDesc::new("scene", 320, 240), &queue).unwrap();

        assert!(target.is_complete());
        assert_eq!(target.color_attachments().len(), 1);
        assert!(target.depth_attachment().is_some());
        assert_eq!(backend.live_textures(), 2);
        assert_eq!(backend.live_framebuffers(), 1);

        target.release(&mut backend);
        assert_eq!(backend.live_textures(), 0);
        assert_eq!(backend.live_framebuffers(), 0);
        assert!(queue.is_empty());
    }

    #[test]
    fn test_incomplete_target_is_still_usable() {
        let mut backend = HeadlessBackend::new();
        let queue = ReleaseQueue::new();
        let desc = RenderTargetDesc::new("empty", 16, 16).with_color_formats(Vec::new()).with_depth(false);

        let target = RenderTarget::new(&mut backend, desc, &queue).unwrap();

        assert!(!target.is_complete());
        target.bind(&mut backend);
        target.release(&mut backend);
    }

    #[test]
    fn test_drop_queues_framebuffer_and_attachments() {
        let mut backend = HeadlessBackend::new();
        let queue = ReleaseQueue::new();

        drop(RenderTarget::new(&mut backend, RenderTargetDesc::depth_only("shadow", 64, 64), &queue).unwrap());

        assert_eq!(queue.len(), 2);
        queue.drain(&mut backend);
        assert_eq!(backend.live_framebuffers(), 0);
        assert_eq!(backend.live_textures(), 0);
    }

    #[test]
    fn test_default_framebuffer_is_not_owned() {
        let mut backend = HeadlessBackend::new();
        let target = RenderTarget::default_framebuffer(800, 600);

        assert_eq!(target.framebuffer(), FramebufferHandle(0));
        approx::assert_relative_eq!(target.aspect_ratio(), 800.0 / 600.0);
        target.release(&mut backend);
        assert!(backend.calls().is_empty());
    }
}
