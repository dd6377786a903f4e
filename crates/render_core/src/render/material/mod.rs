//! Material system for the frame core
//!
//! Materials are plain data: a shared [`ShaderProgram`], local uniform values
//! and texture-unit bindings. All GPU traffic for them goes through the
//! [`ShaderStateCache`], which resolves each material against the global
//! uniform table at draw time and skips redundant pushes.
//!
//! # Architecture
//!
//! - [`PropertyRegistry`]: uniform name ↔ [`PropertyId`] interning
//! - [`ShaderProgram`]: GPU program with cached locations and defaults
//! - [`Material`]: local values and texture units for one draw state
//! - [`ShaderStateCache`]: material registry, globals and push deduplication

mod property_registry;
mod shader_program;
mod shader_material;
mod state_cache;

pub use property_registry::{PropertyId, PropertyRegistry};
pub use shader_program::{ProgramUniform, ShaderProgram};
pub use shader_material::{Material, TextureBinding, UniformEntry};
pub use state_cache::{ShaderStateCache, StateCacheStats};
pub use crate::foundation::collections::MaterialId;
