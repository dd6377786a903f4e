//! # Shader State Cache
//!
//! Owns every live material, the global uniform table and the property
//! registry, and is the only code path that talks to the backend about
//! programs, uniforms and texture units.
//!
//! ## Deduplication
//!
//! Each actual program switch starts a new *bind epoch*. A uniform push is
//! remembered per `(program, location)` together with the epoch it happened
//! in, and the next push of a bit-identical value in the same epoch is
//! skipped. Texture binds are remembered per unit and skipped when the same
//! texture is already bound there.
//!
//! ## Resolution order
//!
//! For each uniform the program declares, the value pushed is the first of:
//!
//! 1. the material's local, non-default value;
//! 2. the global value (unless the material opted out of globals);
//! 3. the material's local default value;
//! 4. the program's zero/identity default.
//!
//! Samplers push the texture unit the material bound for that property.

use std::collections::HashMap;
use std::rc::Rc;

use crate::foundation::collections::{MaterialId, SlotMap};
use crate::render::gpu::{
    GpuBackend, ProgramHandle, ProgramSource, TextureHandle, UniformLocation, UniformType, UniformValue,
};
use crate::render::resources::ReleaseQueue;
use crate::render::RenderResult;
use super::property_registry::{PropertyId, PropertyRegistry};
use super::shader_material::Material;
use super::shader_program::ShaderProgram;

/// Counters describing how much GPU traffic the cache issued or avoided
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq)]
pub struct StateCacheStats {
    /// Uniform values sent to the backend
    pub pushes: u64,
    /// Uniform pushes skipped because the value was already current
    pub skipped_pushes: u64,
    /// Texture binds sent to the backend
    pub texture_binds: u64,
    /// Texture binds skipped because the unit already held the texture
    pub skipped_texture_binds: u64,
    /// Actual program switches
    pub program_switches: u64,
}

#[derive(Debug, Clone, Copy)]
struct PushMemo {
    value: UniformValue,
    epoch: u64,
}

/// Per-draw state resolution with GPU-call deduplication
#[derive(Debug)]
pub struct ShaderStateCache {
    properties: PropertyRegistry,
    materials: SlotMap<MaterialId, Material>,
    globals: HashMap<PropertyId, UniformValue>,
    push_memo: HashMap<(ProgramHandle, UniformLocation), PushMemo>,
    bound_textures: HashMap<u32, TextureHandle>,
    current_program: Option<ProgramHandle>,
    epoch: u64,
    texture_units: usize,
    release_queue: ReleaseQueue,
    stats: StateCacheStats,
}

impl ShaderStateCache {
    /// Create a cache whose materials get `texture_units` units each
    pub fn new(texture_units: usize, release_queue: ReleaseQueue) -> Self {
        Self {
            properties: PropertyRegistry::new(),
            materials: SlotMap::with_key(),
            globals: HashMap::new(),
            push_memo: HashMap::new(),
            bound_textures: HashMap::new(),
            current_program: None,
            epoch: 0,
            texture_units,
            release_queue,
            stats: StateCacheStats::default(),
        }
    }

    // === Properties ===

    /// Interned id for a uniform name
    pub fn property_id(&mut self, name: &str) -> PropertyId {
        self.properties.id(name)
    }

    /// Property registry, for name lookups
    pub fn properties(&self) -> &PropertyRegistry {
        &self.properties
    }

    // === Programs ===

    /// Compile a program whose uniforms are interned in this cache's registry
    pub fn create_program(&mut self, backend: &mut dyn GpuBackend, source: &ProgramSource) -> RenderResult<Rc<ShaderProgram>> {
        let program = ShaderProgram::new(backend, source, &mut self.properties, &self.release_queue)?;
        log::info!(
            "Created program '{}' with {} uniforms",
            program.label(),
            program.uniforms().len()
        );
        Ok(program)
    }

    /// Point every material using `old` at `new`, returning how many moved
    ///
    /// Locations are cached per program, so the rebound materials resolve
    /// fresh locations against `new` on their next draw.
    pub fn rebind_program(&mut self, old: &Rc<ShaderProgram>, new: &Rc<ShaderProgram>) -> usize {
        let mut rebound = 0;
        for (_, material) in self.materials.iter_mut() {
            if Rc::ptr_eq(material.program(), old) {
                material.set_program(Rc::clone(new));
                rebound += 1;
            }
        }
        if self.current_program == Some(old.handle()) {
            self.current_program = None;
        }
        let retired = old.handle();
        self.push_memo.retain(|(program, _), _| *program != retired);
        rebound
    }

    /// Recompile `old` from new source, move its materials over and release it
    pub fn reload_program(
        &mut self,
        backend: &mut dyn GpuBackend,
        old: &Rc<ShaderProgram>,
        source: &ProgramSource,
    ) -> RenderResult<Rc<ShaderProgram>> {
        let new = self.create_program(backend, source)?;
        let rebound = self.rebind_program(old, &new);
        old.release(backend);
        log::info!("Reloaded program '{}', {} materials rebound", new.label(), rebound);
        Ok(new)
    }

    // === Materials ===

    /// Register a new material drawing with `program`
    pub fn create_material(&mut self, label: impl Into<String>, program: &Rc<ShaderProgram>) -> MaterialId {
        let material = Material::new(label, Rc::clone(program), self.texture_units);
        let id = self.materials.insert(material);
        log::debug!("Created material {:?} using program '{}'", id, program.label());
        id
    }

    /// Deregister a material; returns `false` if it was already gone
    pub fn destroy_material(&mut self, material: MaterialId) -> bool {
        self.materials.remove(material).is_some()
    }

    /// Drop every material, global and remembered GPU state
    ///
    /// Programs only referenced by materials are dropped here and land on the
    /// release queue. Returns how many materials were removed.
    pub fn clear(&mut self) -> usize {
        let removed = self.materials.len();
        self.materials.clear();
        self.globals.clear();
        self.invalidate_gpu_state();
        log::debug!("Shader state cache cleared ({} materials)", removed);
        removed
    }

    /// Material by id
    pub fn material(&self, material: MaterialId) -> Option<&Material> {
        self.materials.get(material)
    }

    /// Mutable material by id
    pub fn material_mut(&mut self, material: MaterialId) -> Option<&mut Material> {
        self.materials.get_mut(material)
    }

    /// Number of live materials
    pub fn material_count(&self) -> usize {
        self.materials.len()
    }

    /// Store a local uniform on a material
    pub fn set_uniform(&mut self, material: MaterialId, property: PropertyId, value: UniformValue, is_default: bool) -> bool {
        match self.materials.get_mut(material) {
            Some(entry) => entry.set_uniform(property, value, is_default),
            None => {
                log::error!("set_uniform on unknown material {:?}", material);
                false
            }
        }
    }

    /// Local value stored on a material
    pub fn get_uniform(&self, material: MaterialId, property: PropertyId) -> Option<UniformValue> {
        self.materials.get(material)?.uniform(property).map(|entry| entry.value)
    }

    /// Drop a local value from a material
    pub fn remove_uniform(&mut self, material: MaterialId, property: PropertyId) -> Option<UniformValue> {
        self.materials.get_mut(material)?.remove_uniform(property)
    }

    /// Bind a texture on a material, returning its unit
    pub fn bind_texture(&mut self, material: MaterialId, property: PropertyId, texture: Option<TextureHandle>) -> Option<u32> {
        match self.materials.get_mut(material) {
            Some(entry) => entry.set_texture(property, texture),
            None => {
                log::error!("bind_texture on unknown material {:?}", material);
                None
            }
        }
    }

    /// Unbind a texture from a material
    pub fn clear_texture(&mut self, material: MaterialId, property: PropertyId) -> bool {
        self.materials
            .get_mut(material)
            .is_some_and(|entry| entry.clear_texture(property))
    }

    // === Globals ===

    /// Set a value shared by every material that uses globals
    pub fn set_global_uniform(&mut self, property: PropertyId, value: UniformValue) {
        self.globals.insert(property, value);
    }

    /// Current global value
    pub fn global_uniform(&self, property: PropertyId) -> Option<UniformValue> {
        self.globals.get(&property).copied()
    }

    /// Remove a global value
    pub fn remove_global_uniform(&mut self, property: PropertyId) -> Option<UniformValue> {
        self.globals.remove(&property)
    }

    // === Draw-time resolution ===

    /// Bind the material's program, push its uniforms and bind its textures
    ///
    /// Returns the program handle to draw with, or `None` (after logging)
    /// when the material is unknown or its program has been released.
    pub fn resolve_for_draw(&mut self, backend: &mut dyn GpuBackend, material: MaterialId) -> Option<ProgramHandle> {
        let Some(entry) = self.materials.get(material) else {
            log::error!("Cannot draw unknown material {:?}", material);
            return None;
        };
        let program = Rc::clone(entry.program());
        if program.is_released() {
            log::error!(
                "Material '{}' uses released program '{}', skipping draw",
                entry.label(),
                program.label()
            );
            return None;
        }

        // Plan first so the material borrow ends before the backend is touched
        let mut textures = Vec::new();
        let mut pushes = Vec::with_capacity(program.uniforms().len());
        for uniform in program.uniforms() {
            let value = if uniform.ty.is_sampler() {
                match entry.texture(uniform.property) {
                    Some(binding) => {
                        textures.push((binding.unit, binding.texture));
                        UniformValue::Int(binding.unit as i32)
                    }
                    // Unbound samplers read unit 0, whatever is bound there
                    None => program.default_value(uniform.property, uniform.ty),
                }
            } else {
                self.resolve_value(entry, &program, uniform.property, uniform.ty)
            };
            pushes.push((uniform.property, value));
        }
        for (property, _) in entry.uniforms() {
            if program.declared_type(property).is_none() {
                // Records the undeclared property once
                program.location(&*backend, property);
            }
        }

        self.bind_program(backend, program.handle());
        for (unit, texture) in textures {
            self.bind_texture_unit(backend, unit, texture);
        }
        for (property, value) in pushes {
            if let Some(location) = program.location(&*backend, property) {
                self.push(backend, program.handle(), location, value);
            }
        }

        Some(program.handle())
    }

    fn resolve_value(&self, material: &Material, program: &ShaderProgram, property: PropertyId, ty: UniformType) -> UniformValue {
        let local = material.uniform(property).filter(|entry| entry.value.matches(ty));

        if let Some(entry) = local.filter(|entry| !entry.is_default) {
            return entry.value;
        }
        if material.uses_global_uniforms() {
            match self.globals.get(&property) {
                Some(global) if global.matches(ty) => return *global,
                Some(global) => log::trace!(
                    "Global {:?} has type {:?}, program '{}' expects {:?}",
                    property,
                    global.uniform_type(),
                    program.label(),
                    ty
                ),
                None => {}
            }
        }
        if let Some(entry) = local {
            return entry.value;
        }
        program.default_value(property, ty)
    }

    fn bind_program(&mut self, backend: &mut dyn GpuBackend, program: ProgramHandle) {
        if self.current_program == Some(program) {
            return;
        }
        backend.use_program(program);
        self.current_program = Some(program);
        self.epoch += 1;
        self.stats.program_switches += 1;
        log::trace!("Program switch to {:?} (epoch {})", program, self.epoch);
    }

    fn bind_texture_unit(&mut self, backend: &mut dyn GpuBackend, unit: u32, texture: TextureHandle) {
        if self.bound_textures.get(&unit) == Some(&texture) {
            self.stats.skipped_texture_binds += 1;
            return;
        }
        backend.bind_texture(unit, texture);
        self.bound_textures.insert(unit, texture);
        self.stats.texture_binds += 1;
    }

    fn push(&mut self, backend: &mut dyn GpuBackend, program: ProgramHandle, location: UniformLocation, value: UniformValue) {
        let key = (program, location);
        if let Some(memo) = self.push_memo.get(&key) {
            if memo.epoch == self.epoch && memo.value.bit_eq(&value) {
                self.stats.skipped_pushes += 1;
                return;
            }
        }
        backend.push_uniform(location, &value);
        self.push_memo.insert(key, PushMemo { value, epoch: self.epoch });
        self.stats.pushes += 1;
    }

    /// Forget what the GPU is believed to hold
    ///
    /// Call after anything outside the cache changed programs, uniforms or
    /// texture bindings; the next draw re-sends everything.
    pub fn invalidate_gpu_state(&mut self) {
        self.current_program = None;
        self.bound_textures.clear();
        self.push_memo.clear();
        self.epoch += 1;
    }

    /// Program the cache last made current
    pub fn current_program(&self) -> Option<ProgramHandle> {
        self.current_program
    }

    /// Traffic counters since creation or the last reset
    pub fn stats(&self) -> StateCacheStats {
        self.stats
    }

    /// Zero the traffic counters
    pub fn reset_stats(&mut self) {
        self.stats = StateCacheStats::default();
    }
}
