//! Recording backend
//!
//! [`HeadlessBackend`] implements [`GpuBackend`] without a GPU. It hands out
//! sequential handles, reflects `uniform <type> <name>;` declarations from
//! program source, checks framebuffer completeness and records every call
//! so tests and tools can inspect exactly what the frame core issued.

use std::collections::{HashMap, HashSet};

use super::{
    ActiveUniform, BufferHandle, BufferKind, FramebufferHandle, FramebufferStatus, GpuBackend,
    ProgramHandle, ProgramSource, TextureDesc, TextureHandle, UniformLocation, UniformType,
    UniformValue,
};
use crate::render::{RenderError, RenderResult};

/// One recorded backend call
#[derive(Debug, Clone, PartialEq)]
pub enum GpuCall {
    /// Program compiled and linked
    CreateProgram(ProgramHandle),
    /// Program made current
    UseProgram(ProgramHandle),
    /// Uniform set on the current program
    PushUniform {
        /// Program current at the time of the push
        program: Option<ProgramHandle>,
        /// Target location
        location: UniformLocation,
        /// Pushed value
        value: UniformValue,
    },
    /// Texture allocated
    CreateTexture(TextureHandle),
    /// Texture bound to a unit
    BindTexture {
        /// Texture unit
        unit: u32,
        /// Bound texture
        texture: TextureHandle,
    },
    /// Buffer uploaded
    CreateBuffer(BufferHandle),
    /// Framebuffer created
    CreateFramebuffer(FramebufferHandle),
    /// Framebuffer bound for rendering
    BindFramebuffer {
        /// Bound framebuffer
        framebuffer: FramebufferHandle,
        /// Viewport width
        width: u32,
        /// Viewport height
        height: u32,
    },
    /// Indexed draw issued
    DrawIndexed {
        /// Program current at the time of the draw
        program: Option<ProgramHandle>,
        /// Vertex buffer
        vertices: BufferHandle,
        /// Index buffer
        indices: BufferHandle,
        /// Number of indices
        index_count: u32,
    },
    /// Program deleted
    DeleteProgram(ProgramHandle),
    /// Texture deleted
    DeleteTexture(TextureHandle),
    /// Buffer deleted
    DeleteBuffer(BufferHandle),
    /// Framebuffer deleted
    DeleteFramebuffer(FramebufferHandle),
}

#[derive(Debug, Clone)]
struct HeadlessProgram {
    label: String,
    uniforms: Vec<ActiveUniform>,
}

#[derive(Debug, Clone)]
struct HeadlessFramebuffer {
    colors: Vec<TextureHandle>,
    depth: Option<TextureHandle>,
}

/// [`GpuBackend`] that records calls instead of talking to a GPU
#[derive(Debug, Default)]
pub struct HeadlessBackend {
    calls: Vec<GpuCall>,
    next_handle: u32,
    programs: HashMap<ProgramHandle, HeadlessProgram>,
    textures: HashMap<TextureHandle, TextureDesc>,
    buffers: HashSet<BufferHandle>,
    framebuffers: HashMap<FramebufferHandle, HeadlessFramebuffer>,
    current_program: Option<ProgramHandle>,
}

impl HeadlessBackend {
    /// Create a backend with no resources and an empty call log
    pub fn new() -> Self {
        Self::default()
    }

    /// Every call recorded so far
    pub fn calls(&self) -> &[GpuCall] {
        &self.calls
    }

    /// Drain the call log
    pub fn take_calls(&mut self) -> Vec<GpuCall> {
        std::mem::take(&mut self.calls)
    }

    /// Forget recorded calls, keeping resources alive
    pub fn clear_calls(&mut self) {
        self.calls.clear();
    }

    /// Number of recorded draws
    pub fn draw_count(&self) -> usize {
        self.calls.iter().filter(|call| matches!(call, GpuCall::DrawIndexed { .. })).count()
    }

    /// Number of recorded uniform pushes
    pub fn push_count(&self) -> usize {
        self.calls.iter().filter(|call| matches!(call, GpuCall::PushUniform { .. })).count()
    }

    /// Values pushed to `location` while `program` was current, oldest first
    pub fn pushes_to(&self, program: ProgramHandle, location: UniformLocation) -> Vec<UniformValue> {
        self.calls
            .iter()
            .filter_map(|call| match call {
                GpuCall::PushUniform { program: Some(p), location: l, value } if *p == program && *l == location => {
                    Some(*value)
                }
                _ => None,
            })
            .collect()
    }

    /// Currently bound program
    pub fn current_program(&self) -> Option<ProgramHandle> {
        self.current_program
    }

    /// Label a program was created with
    pub fn program_label(&self, program: ProgramHandle) -> Option<&str> {
        self.programs.get(&program).map(|p| p.label.as_str())
    }

    /// Number of programs not yet deleted
    pub fn live_programs(&self) -> usize {
        self.programs.len()
    }

    /// Number of textures not yet deleted
    pub fn live_textures(&self) -> usize {
        self.textures.len()
    }

    /// Number of buffers not yet deleted
    pub fn live_buffers(&self) -> usize {
        self.buffers.len()
    }

    /// Number of framebuffers not yet deleted
    pub fn live_framebuffers(&self) -> usize {
        self.framebuffers.len()
    }

    fn allocate(&mut self) -> u32 {
        self.next_handle += 1;
        self.next_handle
    }
}

/// Collect `uniform <type> <name>;` declarations, first declaration wins
fn reflect_uniforms(sources: &[&str]) -> Vec<ActiveUniform> {
    let mut uniforms: Vec<ActiveUniform> = Vec::new();

    for source in sources {
        for statement in source.split(';') {
            let mut tokens = statement
                .split_whitespace()
                .skip_while(|token| *token != "uniform")
                .skip(1)
                .filter(|token| !matches!(*token, "lowp" | "mediump" | "highp"));

            let (Some(keyword), Some(name)) = (tokens.next(), tokens.next()) else {
                continue;
            };

            let Some(ty) = UniformType::from_glsl(keyword) else {
                log::debug!("Skipping uniform '{}' of unsupported type '{}'", name, keyword);
                continue;
            };

            if !uniforms.iter().any(|u| u.name == name) {
                uniforms.push(ActiveUniform { name: name.to_string(), ty });
            }
        }
    }

    uniforms
}

impl GpuBackend for HeadlessBackend {
    fn create_program(&mut self, source: &ProgramSource) -> RenderResult<ProgramHandle> {
        if source.vertex.trim().is_empty() || source.fragment.trim().is_empty() {
            return Err(RenderError::ResourceCreationFailed(format!(
                "program '{}' is missing a stage",
                source.label
            )));
        }

        let handle = ProgramHandle(self.allocate());
        let uniforms = reflect_uniforms(&[&source.vertex, &source.fragment]);
        log::debug!(
            "Linked program '{}' as {:?} with {} active uniforms",
            source.label,
            handle,
            uniforms.len()
        );

        self.programs.insert(handle, HeadlessProgram { label: source.label.clone(), uniforms });
        self.calls.push(GpuCall::CreateProgram(handle));
        Ok(handle)
    }

    fn active_uniforms(&self, program: ProgramHandle) -> Vec<ActiveUniform> {
        self.programs
            .get(&program)
            .map(|p| p.uniforms.clone())
            .unwrap_or_default()
    }

    fn uniform_location(&self, program: ProgramHandle, name: &str) -> Option<UniformLocation> {
        let program = self.programs.get(&program)?;
        let index = program.uniforms.iter().position(|u| u.name == name)?;
        i32::try_from(index).ok().map(UniformLocation)
    }

    fn use_program(&mut self, program: ProgramHandle) {
        self.current_program = Some(program);
        self.calls.push(GpuCall::UseProgram(program));
    }

    fn push_uniform(&mut self, location: UniformLocation, value: &UniformValue) {
        self.calls.push(GpuCall::PushUniform {
            program: self.current_program,
            location,
            value: *value,
        });
    }

    fn create_texture(&mut self, desc: &TextureDesc) -> RenderResult<TextureHandle> {
        if desc.width == 0 || desc.height == 0 {
            return Err(RenderError::ResourceCreationFailed(format!(
                "texture '{}' has zero size {}x{}",
                desc.label, desc.width, desc.height
            )));
        }

        let handle = TextureHandle(self.allocate());
        self.textures.insert(handle, desc.clone());
        self.calls.push(GpuCall::CreateTexture(handle));
        Ok(handle)
    }

    fn bind_texture(&mut self, unit: u32, texture: TextureHandle) {
        self.calls.push(GpuCall::BindTexture { unit, texture });
    }

    fn create_buffer(&mut self, kind: BufferKind, data: &[u8]) -> RenderResult<BufferHandle> {
        if data.is_empty() {
            return Err(RenderError::ResourceCreationFailed(format!("empty {:?} buffer", kind)));
        }

        let handle = BufferHandle(self.allocate());
        self.buffers.insert(handle);
        self.calls.push(GpuCall::CreateBuffer(handle));
        Ok(handle)
    }

    fn create_framebuffer(
        &mut self,
        colors: &[TextureHandle],
        depth: Option<TextureHandle>,
    ) -> RenderResult<FramebufferHandle> {
        let handle = FramebufferHandle(self.allocate());
        self.framebuffers.insert(handle, HeadlessFramebuffer { colors: colors.to_vec(), depth });
        self.calls.push(GpuCall::CreateFramebuffer(handle));
        Ok(handle)
    }

    fn framebuffer_status(&self, framebuffer: FramebufferHandle) -> FramebufferStatus {
        let Some(fb) = self.framebuffers.get(&framebuffer) else {
            return FramebufferStatus::Incomplete(format!("{:?} does not exist", framebuffer));
        };
        if fb.colors.is_empty() && fb.depth.is_none() {
            return FramebufferStatus::Incomplete("no attachments".to_string());
        }

        let mut size = None;
        for &texture in fb.colors.iter().chain(fb.depth.iter()) {
            let Some(desc) = self.textures.get(&texture) else {
                return FramebufferStatus::Incomplete(format!("attachment {:?} does not exist", texture));
            };
            let is_depth_slot = Some(texture) == fb.depth;
            if desc.format.is_depth() != is_depth_slot {
                return FramebufferStatus::Incomplete(format!(
                    "attachment '{}' has format {:?} in the wrong slot",
                    desc.label, desc.format
                ));
            }
            match size {
                None => size = Some((desc.width, desc.height)),
                Some(expected) if expected != (desc.width, desc.height) => {
                    return FramebufferStatus::Incomplete("attachment sizes differ".to_string());
                }
                Some(_) => {}
            }
        }

        FramebufferStatus::Complete
    }

    fn bind_framebuffer(&mut self, framebuffer: FramebufferHandle, width: u32, height: u32) {
        self.calls.push(GpuCall::BindFramebuffer { framebuffer, width, height });
    }

    fn draw_indexed(&mut self, vertices: BufferHandle, indices: BufferHandle, index_count: u32) {
        self.calls.push(GpuCall::DrawIndexed {
            program: self.current_program,
            vertices,
            indices,
            index_count,
        });
    }

    fn delete_program(&mut self, program: ProgramHandle) {
        if self.programs.remove(&program).is_none() {
            log::warn!("Deleting unknown program {:?}", program);
        }
        if self.current_program == Some(program) {
            self.current_program = None;
        }
        self.calls.push(GpuCall::DeleteProgram(program));
    }

    fn delete_texture(&mut self, texture: TextureHandle) {
        if self.textures.remove(&texture).is_none() {
            log::warn!("Deleting unknown texture {:?}", texture);
        }
        self.calls.push(GpuCall::DeleteTexture(texture));
    }

    fn delete_buffer(&mut self, buffer: BufferHandle) {
        if !self.buffers.remove(&buffer) {
            log::warn!("Deleting unknown buffer {:?}", buffer);
        }
        self.calls.push(GpuCall::DeleteBuffer(buffer));
    }

    fn delete_framebuffer(&mut self, framebuffer: FramebufferHandle) {
        if self.framebuffers.remove(&framebuffer).is_none() {
            log::warn!("Deleting unknown framebuffer {:?}", framebuffer);
        }
        self.calls.push(GpuCall::DeleteFramebuffer(framebuffer));
    }
}
