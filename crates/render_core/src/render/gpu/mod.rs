//! GPU seam
//!
//! Everything the frame core needs from a graphics API goes through the
//! [`GpuBackend`] trait. Handles are plain integers owned by the backend;
//! wrapper types in [`crate::render::resources`] and
//! [`crate::render::material`] decide when they are deleted.
//!
//! Uniform values are compared bit-for-bit when deciding whether a push can
//! be skipped, so `-0.0` and `0.0` count as different values while two NaNs
//! with the same payload count as equal.

mod headless;

pub use headless::{HeadlessBackend, GpuCall};

use crate::foundation::math::{Mat4, Vec2, Vec3, Vec4};
use super::RenderResult;

/// Handle to a linked GPU program
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, PartialOrd, Ord)]
pub struct ProgramHandle(pub u32);

/// Handle to a GPU texture
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, PartialOrd, Ord)]
pub struct TextureHandle(pub u32);

/// Handle to a GPU framebuffer
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, PartialOrd, Ord)]
pub struct FramebufferHandle(pub u32);

/// Handle to a GPU vertex or index buffer
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, PartialOrd, Ord)]
pub struct BufferHandle(pub u32);

/// Location of a uniform inside one program
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, PartialOrd, Ord)]
pub struct UniformLocation(pub i32);

/// Source text of a program, one string per stage
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct ProgramSource {
    /// Name used in log messages
    pub label: String,
    /// Vertex stage source
    pub vertex: String,
    /// Fragment stage source
    pub fragment: String,
}

impl ProgramSource {
    /// Create program source from a label and both stages
    pub fn new(label: impl Into<String>, vertex: impl Into<String>, fragment: impl Into<String>) -> Self {
        Self {
            label: label.into(),
            vertex: vertex.into(),
            fragment: fragment.into(),
        }
    }
}

/// Texel formats the frame core allocates
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum TextureFormat {
    /// 8-bit RGBA color
    Rgba8,
    /// 16-bit float RGBA color
    Rgba16F,
    /// 32-bit float depth
    Depth32F,
}

impl TextureFormat {
    /// Whether the format can be used as a depth attachment
    pub fn is_depth(self) -> bool {
        matches!(self, Self::Depth32F)
    }
}

/// Texture creation parameters
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct TextureDesc {
    /// Width in texels
    pub width: u32,
    /// Height in texels
    pub height: u32,
    /// Texel format
    pub format: TextureFormat,
    /// Name used in log messages
    pub label: String,
}

impl TextureDesc {
    /// Describe a texture of the given size and format
    pub fn new(label: impl Into<String>, width: u32, height: u32, format: TextureFormat) -> Self {
        Self {
            width,
            height,
            format,
            label: label.into(),
        }
    }
}

/// Kind of GPU buffer
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum BufferKind {
    /// Vertex attributes
    Vertex,
    /// 32-bit indices
    Index,
}

/// Completeness of a framebuffer
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum FramebufferStatus {
    /// Ready to render into
    Complete,
    /// Not renderable; the string describes why
    Incomplete(String),
}

/// Type of an active uniform as reported by program reflection
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub enum UniformType {
    /// `float`
    Float,
    /// `int`
    Int,
    /// `vec2`
    Vec2,
    /// `vec3`
    Vec3,
    /// `vec4`
    Vec4,
    /// `mat4`
    Mat4,
    /// `sampler2D`, pushed as the integer texture unit
    Sampler2D,
}

impl UniformType {
    /// Map a GLSL type keyword to a uniform type
    pub fn from_glsl(keyword: &str) -> Option<Self> {
        match keyword {
            "float" => Some(Self::Float),
            "int" => Some(Self::Int),
            "vec2" => Some(Self::Vec2),
            "vec3" => Some(Self::Vec3),
            "vec4" => Some(Self::Vec4),
            "mat4" => Some(Self::Mat4),
            "sampler2D" => Some(Self::Sampler2D),
            _ => None,
        }
    }

    /// Whether values of this type are texture units
    pub fn is_sampler(self) -> bool {
        matches!(self, Self::Sampler2D)
    }
}

/// Uniform declared by a linked program
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct ActiveUniform {
    /// Declared name
    pub name: String,
    /// Declared type
    pub ty: UniformType,
}

/// Value pushed to a uniform location
#[derive(Debug, Clone, Copy, PartialEq)]
pub enum UniformValue {
    /// Scalar float
    Float(f32),
    /// Scalar integer (also texture units)
    Int(i32),
    /// 2-component vector
    Vec2(Vec2),
    /// 3-component vector
    Vec3(Vec3),
    /// 4-component vector
    Vec4(Vec4),
    /// 4x4 matrix, column-major
    Mat4(Mat4),
}

impl UniformValue {
    /// Zero (or identity, for matrices) value of a uniform type
    pub fn default_for(ty: UniformType) -> Self {
        match ty {
            UniformType::Float => Self::Float(0.0),
            UniformType::Int | UniformType::Sampler2D => Self::Int(0),
            UniformType::Vec2 => Self::Vec2(Vec2::zeros()),
            UniformType::Vec3 => Self::Vec3(Vec3::zeros()),
            UniformType::Vec4 => Self::Vec4(Vec4::zeros()),
            UniformType::Mat4 => Self::Mat4(Mat4::identity()),
        }
    }

    /// Type of the payload
    ///
    /// Integers report [`UniformType::Int`]; whether an integer is a sampler
    /// unit is decided by the program's declaration.
    pub fn uniform_type(&self) -> UniformType {
        match self {
            Self::Float(_) => UniformType::Float,
            Self::Int(_) => UniformType::Int,
            Self::Vec2(_) => UniformType::Vec2,
            Self::Vec3(_) => UniformType::Vec3,
            Self::Vec4(_) => UniformType::Vec4,
            Self::Mat4(_) => UniformType::Mat4,
        }
    }

    /// Whether this value can be pushed to a uniform declared as `ty`
    pub fn matches(&self, ty: UniformType) -> bool {
        match ty {
            UniformType::Sampler2D => matches!(self, Self::Int(_)),
            other => self.uniform_type() == other,
        }
    }

    /// Raw bytes of the payload
    pub fn as_bytes(&self) -> &[u8] {
        match self {
            Self::Float(v) => bytemuck::bytes_of(v),
            Self::Int(v) => bytemuck::bytes_of(v),
            Self::Vec2(v) => bytemuck::cast_slice(v.as_slice()),
            Self::Vec3(v) => bytemuck::cast_slice(v.as_slice()),
            Self::Vec4(v) => bytemuck::cast_slice(v.as_slice()),
            Self::Mat4(v) => bytemuck::cast_slice(v.as_slice()),
        }
    }

    /// Bit-for-bit equality, including the type tag
    pub fn bit_eq(&self, other: &Self) -> bool {
        self.uniform_type() == other.uniform_type() && self.as_bytes() == other.as_bytes()
    }
}

/// Rust types that map onto a [`UniformValue`] variant
pub trait UniformData: Sized {
    /// Uniform type this Rust type is stored as
    const TYPE: UniformType;

    /// Wrap the value
    fn into_value(self) -> UniformValue;

    /// Unwrap a value of the matching variant
    fn from_value(value: &UniformValue) -> Option<Self>;
}

macro_rules! impl_uniform_data {
    ($ty:ty, $variant:ident) => {
        impl UniformData for $ty {
            const TYPE: UniformType = UniformType::$variant;

            fn into_value(self) -> UniformValue {
                UniformValue::$variant(self)
            }

            fn from_value(value: &UniformValue) -> Option<Self> {
                match value {
                    UniformValue::$variant(v) => Some(*v),
                    _ => None,
                }
            }
        }
    };
}

impl_uniform_data!(f32, Float);
impl_uniform_data!(i32, Int);
impl_uniform_data!(Vec2, Vec2);
impl_uniform_data!(Vec3, Vec3);
impl_uniform_data!(Vec4, Vec4);
impl_uniform_data!(Mat4, Mat4);

/// Narrow graphics API used by the frame core
///
/// Calls are issued from the rendering thread only. Methods that create
/// resources return errors; state-setting calls are fire-and-forget, as they
/// are on real graphics APIs.
pub trait GpuBackend {
    /// Compile and link a program
    fn create_program(&mut self, source: &ProgramSource) -> RenderResult<ProgramHandle>;

    /// Uniforms the linked program declares
    fn active_uniforms(&self, program: ProgramHandle) -> Vec<ActiveUniform>;

    /// Location of a uniform by name, `None` if the program does not use it
    fn uniform_location(&self, program: ProgramHandle, name: &str) -> Option<UniformLocation>;

    /// Make `program` current
    fn use_program(&mut self, program: ProgramHandle);

    /// Set a uniform of the current program
    fn push_uniform(&mut self, location: UniformLocation, value: &UniformValue);

    /// Allocate a texture
    fn create_texture(&mut self, desc: &TextureDesc) -> RenderResult<TextureHandle>;

    /// Bind `texture` to texture unit `unit`
    fn bind_texture(&mut self, unit: u32, texture: TextureHandle);

    /// Upload a vertex or index buffer
    fn create_buffer(&mut self, kind: BufferKind, data: &[u8]) -> RenderResult<BufferHandle>;

    /// Create a framebuffer from color attachments and an optional depth attachment
    fn create_framebuffer(
        &mut self,
        colors: &[TextureHandle],
        depth: Option<TextureHandle>,
    ) -> RenderResult<FramebufferHandle>;

    /// Completeness of a framebuffer
    fn framebuffer_status(&self, framebuffer: FramebufferHandle) -> FramebufferStatus;

    /// Render into `framebuffer` with the given viewport size
    fn bind_framebuffer(&mut self, framebuffer: FramebufferHandle, width: u32, height: u32);

    /// Issue an indexed draw with the current program
    fn draw_indexed(&mut self, vertices: BufferHandle, indices: BufferHandle, index_count: u32);

    /// Delete a program
    fn delete_program(&mut self, program: ProgramHandle);

    /// Delete a texture
    fn delete_texture(&mut self, texture: TextureHandle);

    /// Delete a buffer
    fn delete_buffer(&mut self, buffer: BufferHandle);

    /// Delete a framebuffer
    fn delete_framebuffer(&mut self, framebuffer: FramebufferHandle);
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_bit_equality_distinguishes_signed_zero() {
        assert!(!UniformValue::Float(0.0).bit_eq(&UniformValue::Float(-0.0)));
        assert!(UniformValue::Float(f32::NAN).bit_eq(&UniformValue::Float(f32::NAN)));
        assert!(UniformValue::Vec3(Vec3::new(1.0, 2.0, 3.0)).bit_eq(&UniformValue::Vec3(Vec3::new(1.0, 2.0, 3.0))));
    }

    #[test]
    fn test_bit_equality_checks_type_tag() {
        // 0.0f32 and 0i32 share a bit pattern
        assert!(!UniformValue::Float(0.0).bit_eq(&UniformValue::Int(0)));
    }

    #[test]
    fn test_defaults_are_zero_or_identity() {
        assert_eq!(UniformValue::default_for(UniformType::Float), UniformValue::Float(0.0));
        assert_eq!(UniformValue::default_for(UniformType::Sampler2D), UniformValue::Int(0));
        assert_eq!(UniformValue::default_for(UniformType::Mat4), UniformValue::Mat4(Mat4::identity()));
    }

    #[test]
    fn test_uniform_data_roundtrip_by_type() {
        let value = Vec4::new(0.25, 0.5, 0.75, 1.0).into_value();

        assert_eq!(<Vec4 as UniformData>::from_value(&value), Some(Vec4::new(0.25, 0.5, 0.75, 1.0)));
        assert_eq!(<f32 as UniformData>::from_value(&value), None);
        assert_eq!(<Mat4 as UniformData>::TYPE, UniformType::Mat4);
    }

    #[test]
    fn test_sampler_accepts_integer_units() {
        assert!(UniformValue::Int(3).matches(UniformType::Sampler2D));
        assert!(!UniformValue::Float(3.0).matches(UniformType::Sampler2D));
        assert!(UniformValue::Vec2(Vec2::zeros()).matches(UniformType::Vec2));
    }
}
