//! Linked GPU program shared by materials
//!
//! A [`ShaderProgram`] owns one backend program handle and is shared through
//! `Rc` by every material that renders with it. It also holds the two
//! per-program caches the state cache relies on:
//!
//! - uniform locations, resolved lazily on first use and remembered, with a
//!   "not found" sentinel so a missing uniform is reported exactly once;
//! - type-appropriate default values, computed once per uniform.

use std::cell::{Cell, RefCell};
use std::collections::{HashMap, HashSet};
use std::rc::Rc;

use crate::render::gpu::{GpuBackend, ProgramHandle, ProgramSource, UniformLocation, UniformType, UniformValue};
use crate::render::resources::{PendingRelease, ReleaseQueue};
use crate::render::RenderResult;
use super::property_registry::{PropertyId, PropertyRegistry};

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
enum LocationSlot {
    Unresolved,
    Found(UniformLocation),
    NotFound,
}

/// Uniform declared by a program, with its interned property id
#[derive(Debug)]
pub struct ProgramUniform {
    /// Interned name
    pub property: PropertyId,
    /// Declared name
    pub name: String,
    /// Declared type
    pub ty: UniformType,
    location: Cell<LocationSlot>,
}

/// Linked program plus its location and default-value caches
#[derive(Debug)]
pub struct ShaderProgram {
    handle: ProgramHandle,
    label: String,
    uniforms: Vec<ProgramUniform>,
    defaults: RefCell<HashMap<PropertyId, UniformValue>>,
    reported_undeclared: RefCell<HashSet<PropertyId>>,
    released: Cell<bool>,
    release_queue: ReleaseQueue,
}

impl ShaderProgram {
    /// Compile `source` and intern every active uniform name in `properties`
    pub fn new(
        backend: &mut dyn GpuBackend,
        source: &ProgramSource,
        properties: &mut PropertyRegistry,
        release_queue: &ReleaseQueue,
    ) -> RenderResult<Rc<Self>> {
        let handle = backend.create_program(source)?;
        let uniforms = backend
            .active_uniforms(handle)
            .into_iter()
            .map(|uniform| ProgramUniform {
                property: properties.id(&uniform.name),
                name: uniform.name,
                ty: uniform.ty,
                location: Cell::new(LocationSlot::Unresolved),
            })
            .collect();

        Ok(Rc::new(Self {
            handle,
            label: source.label.clone(),
            uniforms,
            defaults: RefCell::new(HashMap::new()),
            reported_undeclared: RefCell::new(HashSet::new()),
            released: Cell::new(false),
            release_queue: release_queue.clone(),
        }))
    }

    /// Backend handle
    pub fn handle(&self) -> ProgramHandle {
        self.handle
    }

    /// Name used in log messages
    pub fn label(&self) -> &str {
        &self.label
    }

    /// Uniforms the program declares, in reflection order
    pub fn uniforms(&self) -> &[ProgramUniform] {
        &self.uniforms
    }

    /// Declared type of `property`, if the program uses it
    pub fn declared_type(&self, property: PropertyId) -> Option<UniformType> {
        self.find(property).map(|uniform| uniform.ty)
    }

    /// Location of a declared uniform, resolved once and cached
    ///
    /// Returns `None` both for undeclared properties and for declared
    /// uniforms the backend has no location for; either case is logged the
    /// first time only.
    pub fn location(&self, backend: &dyn GpuBackend, property: PropertyId) -> Option<UniformLocation> {
        let Some(uniform) = self.find(property) else {
            if self.reported_undeclared.borrow_mut().insert(property) {
                log::debug!("Program '{}' does not declare property {:?}; value ignored", self.label, property);
            }
            return None;
        };

        match uniform.location.get() {
            LocationSlot::Found(location) => Some(location),
            LocationSlot::NotFound => None,
            LocationSlot::Unresolved => {
                let resolved = backend.uniform_location(self.handle, &uniform.name);
                match resolved {
                    Some(location) => uniform.location.set(LocationSlot::Found(location)),
                    None => {
                        log::warn!("Uniform '{}' has no location in program '{}'", uniform.name, self.label);
                        uniform.location.set(LocationSlot::NotFound);
                    }
                }
                resolved
            }
        }
    }

    /// Zero/identity value for a declared uniform, computed once
    pub fn default_value(&self, property: PropertyId, ty: UniformType) -> UniformValue {
        *self
            .defaults
            .borrow_mut()
            .entry(property)
            .or_insert_with(|| UniformValue::default_for(ty))
    }

    /// Whether the GPU program has been deleted
    pub fn is_released(&self) -> bool {
        self.released.get()
    }

    /// Delete the GPU program now
    ///
    /// Materials still holding this program stop drawing and log an error
    /// instead. Releasing twice does nothing.
    pub fn release(&self, backend: &mut dyn GpuBackend) {
        if self.released.replace(true) {
            log::debug!("Program '{}' already released", self.label);
            return;
        }
        backend.delete_program(self.handle);
        log::debug!("Released program '{}' ({:?})", self.label, self.handle);
    }

    fn find(&self, property: PropertyId) -> Option<&ProgramUniform> {
        self.uniforms.iter().find(|uniform| uniform.property == property)
    }
}

impl Drop for ShaderProgram {
    fn drop(&mut self) {
        if !self.released.get() {
            log::warn!("Program '{}' dropped without release, deferring deletion", self.label);
            self.release_queue.push(PendingRelease::Program(self.handle));
        }
    }
}
