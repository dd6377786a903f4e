//! Material: a program plus local uniform values and texture bindings
//!
//! Texture units are handed out from a fixed-capacity free stack. The first
//! binding of a property takes the next free unit (unit 0 first), later
//! bindings of the same property reuse it, and clearing a binding returns
//! its unit to the stack. When every unit is taken the binding is dropped
//! and an error is logged; nothing panics.

use std::collections::HashMap;
use std::rc::Rc;

use crate::foundation::math::{Mat4, Vec2, Vec3, Vec4};
use crate::render::gpu::{TextureHandle, UniformData, UniformValue};
use super::property_registry::PropertyId;
use super::shader_program::ShaderProgram;

/// Local uniform value stored on a material
#[derive(Debug, Clone, Copy, PartialEq)]
pub struct UniformEntry {
    /// Stored value
    pub value: UniformValue,
    /// Whether the value is a fallback that yields to a same-named global
    pub is_default: bool,
}

/// Texture bound to a unit by one property
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct TextureBinding {
    /// Texture unit owned by the property
    pub unit: u32,
    /// Bound texture
    pub texture: TextureHandle,
}

/// Per-draw state: program, local uniforms and texture units
#[derive(Debug)]
pub struct Material {
    label: String,
    program: Rc<ShaderProgram>,
    uniforms: HashMap<PropertyId, UniformEntry>,
    textures: HashMap<PropertyId, TextureBinding>,
    free_units: Vec<u32>,
    capacity: usize,
    use_global_uniforms: bool,
}

impl Material {
    /// Create a material drawing with `program` and `texture_units` units
    pub fn new(label: impl Into<String>, program: Rc<ShaderProgram>, texture_units: usize) -> Self {
        let capacity = u32::try_from(texture_units).unwrap_or(u32::MAX);
        Self {
            label: label.into(),
            program,
            uniforms: HashMap::new(),
            textures: HashMap::new(),
            // Popped from the back, so unit 0 is handed out first
            free_units: (0..capacity).rev().collect(),
            capacity: texture_units,
            use_global_uniforms: true,
        }
    }

    /// Name used in log messages
    pub fn label(&self) -> &str {
        &self.label
    }

    /// Program this material draws with
    pub fn program(&self) -> &Rc<ShaderProgram> {
        &self.program
    }

    /// Switch to another program, keeping local values and texture units
    pub fn set_program(&mut self, program: Rc<ShaderProgram>) {
        log::debug!(
            "Material '{}' switched program '{}' -> '{}'",
            self.label,
            self.program.label(),
            program.label()
        );
        self.program = program;
    }

    /// Whether global uniforms apply to this material
    pub fn uses_global_uniforms(&self) -> bool {
        self.use_global_uniforms
    }

    /// Opt in or out of the global uniform table
    pub fn set_use_global_uniforms(&mut self, enabled: bool) {
        self.use_global_uniforms = enabled;
    }

    /// Store a local uniform value
    ///
    /// Returns `false` and logs an error when the program declares the
    /// property with a different type.
    pub fn set_uniform(&mut self, property: PropertyId, value: UniformValue, is_default: bool) -> bool {
        if let Some(declared) = self.program.declared_type(property) {
            if !value.matches(declared) {
                log::error!(
                    "Material '{}': {:?} is declared {:?} in program '{}', refusing {:?}",
                    self.label,
                    property,
                    declared,
                    self.program.label(),
                    value.uniform_type()
                );
                return false;
            }
        }
        self.uniforms.insert(property, UniformEntry { value, is_default });
        true
    }

    /// Local entry for `property`
    pub fn uniform(&self, property: PropertyId) -> Option<&UniformEntry> {
        self.uniforms.get(&property)
    }

    /// Local entries in arbitrary order
    pub fn uniforms(&self) -> impl Iterator<Item = (PropertyId, &UniformEntry)> + '_ {
        self.uniforms.iter().map(|(property, entry)| (*property, entry))
    }

    /// Drop a local entry, returning its value
    pub fn remove_uniform(&mut self, property: PropertyId) -> Option<UniformValue> {
        self.uniforms.remove(&property).map(|entry| entry.value)
    }

    /// Store a typed local value
    pub fn set<T: UniformData>(&mut self, property: PropertyId, value: T) -> bool {
        self.set_uniform(property, value.into_value(), false)
    }

    /// Read a typed local value
    pub fn get<T: UniformData>(&self, property: PropertyId) -> Option<T> {
        self.uniform(property).and_then(|entry| T::from_value(&entry.value))
    }

    /// Set a `float` uniform
    pub fn set_float(&mut self, property: PropertyId, value: f32) -> bool {
        self.set(property, value)
    }

    /// Set an `int` uniform
    pub fn set_int(&mut self, property: PropertyId, value: i32) -> bool {
        self.set(property, value)
    }

    /// Set a `vec2` uniform
    pub fn set_vector2(&mut self, property: PropertyId, value: Vec2) -> bool {
        self.set(property, value)
    }

    /// Set a `vec3` uniform
    pub fn set_vector3(&mut self, property: PropertyId, value: Vec3) -> bool {
        self.set(property, value)
    }

    /// Set a `vec4` uniform
    pub fn set_vector4(&mut self, property: PropertyId, value: Vec4) -> bool {
        self.set(property, value)
    }

    /// Set a `mat4` uniform
    pub fn set_mat4(&mut self, property: PropertyId, value: Mat4) -> bool {
        self.set(property, value)
    }

    /// Bind a texture to `property`, returning the unit it occupies
    ///
    /// Binding `None` is a misuse and is logged; use
    /// [`clear_texture`](Self::clear_texture) to unbind.
    pub fn set_texture(&mut self, property: PropertyId, texture: Option<TextureHandle>) -> Option<u32> {
        let Some(texture) = texture else {
            log::error!("Material '{}': no texture given for {:?}, binding unchanged", self.label, property);
            return None;
        };

        if let Some(binding) = self.textures.get_mut(&property) {
            binding.texture = texture;
            return Some(binding.unit);
        }

        let Some(unit) = self.free_units.pop() else {
            log::error!(
                "Material '{}': all {} texture units in use, dropping binding for {:?}",
                self.label,
                self.capacity,
                property
            );
            return None;
        };

        self.textures.insert(property, TextureBinding { unit, texture });
        log::trace!("Material '{}': {:?} -> texture unit {}", self.label, property, unit);
        Some(unit)
    }

    /// Unbind `property`, freeing its unit
    pub fn clear_texture(&mut self, property: PropertyId) -> bool {
        match self.textures.remove(&property) {
            Some(binding) => {
                self.free_units.push(binding.unit);
                true
            }
            None => false,
        }
    }

    /// Binding for `property`
    pub fn texture(&self, property: PropertyId) -> Option<TextureBinding> {
        self.textures.get(&property).copied()
    }

    /// Number of units currently in use
    pub fn bound_texture_count(&self) -> usize {
        self.textures.len()
    }

    /// Total number of units
    pub fn texture_capacity(&self) -> usize {
        self.capacity
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::render::gpu::{GpuBackend, HeadlessBackend, ProgramSource};
    use crate::render::material::PropertyRegistry;
    use crate::render::resources::ReleaseQueue;

    struct Fixture {
        backend: HeadlessBackend,
        registry: PropertyRegistry,
        program: Rc<ShaderProgram>,
    }

    impl Fixture {
        fn new() -> Self {
            let mut backend = HeadlessBackend::new();
            let mut registry = PropertyRegistry::new();
            let source = ProgramSource::new(
                "lit",
                "uniform mat4 u_Model; void main() {}",
                "uniform float u_Roughness; uniform sampler2D u_Albedo; void main() {}",
            );
            let program = ShaderProgram::new(&mut backend, &source, &mut registry, &ReleaseQueue::new()).unwrap();
            Self { backend, registry, program }
        }

        fn texture(&mut self, n: u32) -> TextureHandle {
            let desc = crate::render::gpu::TextureDesc::new(
                format!("t{n}"),
                1,
                1,
                crate::render::gpu::TextureFormat::Rgba8,
            );
            self.backend.create_texture(&desc).unwrap()
        }
    }

    impl Drop for Fixture {
        fn drop(&mut self) {
            self.program.release(&mut self.backend);
        }
    }

    #[test]
    fn test_set_float_then_get() {
        let mut fx = Fixture::new();
        let roughness = fx.registry.id("u_Roughness");
        let mut material = Material::new("metal", Rc::clone(&fx.program), 4);

        assert!(material.set_float(roughness, 0.35));

        assert_eq!(material.get::<f32>(roughness), Some(0.35));
        assert_eq!(material.get::<i32>(roughness), None);
    }

    #[test]
    fn test_declared_type_mismatch_is_refused() {
        let mut fx = Fixture::new();
        let roughness = fx.registry.id("u_Roughness");
        let mut material = Material::new("metal", Rc::clone(&fx.program), 4);

        assert!(!material.set_vector3(roughness, Vec3::zeros()));
        assert!(material.uniform(roughness).is_none());
    }

    #[test]
    fn test_undeclared_properties_are_stored() {
        let mut fx = Fixture::new();
        let extra = fx.registry.id("u_NotInProgram");
        let mut material = Material::new("metal", Rc::clone(&fx.program), 4);

        assert!(material.set_int(extra, 7));
        assert_eq!(material.remove_uniform(extra), Some(UniformValue::Int(7)));
        assert!(material.uniform(extra).is_none());
    }

    #[test]
    fn test_texture_units_allocated_from_zero_and_reused() {
        let mut fx = Fixture::new();
        let albedo = fx.registry.id("u_Albedo");
        let normal = fx.registry.id("u_Normal");
        let first = fx.texture(1);
        let second = fx.texture(2);
        let mut material = Material::new("metal", Rc::clone(&fx.program), 4);

        assert_eq!(material.set_texture(albedo, Some(first)), Some(0));
        assert_eq!(material.set_texture(normal, Some(first)), Some(1));
        assert_eq!(material.set_texture(albedo, Some(second)), Some(0));
        assert_eq!(material.texture(albedo), Some(TextureBinding { unit: 0, texture: second }));

        assert!(material.clear_texture(albedo));
        assert!(!material.clear_texture(albedo));
        let third = fx.registry.id("u_Third");
        assert_eq!(material.set_texture(third, Some(first)), Some(0));
    }

    #[test]
    fn test_texture_unit_exhaustion_drops_binding() {
        let mut fx = Fixture::new();
        let texture = fx.texture(1);
        let mut material = Material::new("crowded", Rc::clone(&fx.program), 32);

        for i in 0..32 {
            let property = fx.registry.id(&format!("u_Tex{i}"));
            assert_eq!(material.set_texture(property, Some(texture)), Some(i));
        }

        let overflow = fx.registry.id("u_Tex32");
        assert_eq!(material.set_texture(overflow, Some(texture)), None);
        assert!(material.texture(overflow).is_none());
        assert_eq!(material.bound_texture_count(), 32);
    }

    #[test]
    fn test_none_texture_is_a_logged_no_op() {
        let mut fx = Fixture::new();
        let albedo = fx.registry.id("u_Albedo");
        let mut material = Material::new("metal", Rc::clone(&fx.program), 4);

        assert_eq!(material.set_texture(albedo, None), None);
        assert_eq!(material.bound_texture_count(), 0);
    }
}
