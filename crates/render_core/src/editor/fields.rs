//! Editable field tables
//!
//! Each editable type declares a static slice of [`EditableField`]s. An
//! entry names the field, its value kind and a getter/setter pair; setters
//! go through the type's own methods.

use thiserror::Error;

use crate::core::config::ShadowConfig;
use crate::foundation::math::Vec3;
use crate::render::Camera;

/// Kind of value a field holds
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum FieldKind {
    /// `f32`
    Float,
    /// `u32`
    UInt,
    /// `bool`
    Bool,
    /// `Vec3`
    Vec3,
}

/// Value read from or written to a field
#[derive(Debug, Clone, Copy, PartialEq)]
pub enum FieldValue {
    /// `f32` value
    Float(f32),
    /// `u32` value
    UInt(u32),
    /// `bool` value
    Bool(bool),
    /// `Vec3` value
    Vec3(Vec3),
}

impl FieldValue {
    /// Kind of this value
    pub fn kind(&self) -> FieldKind {
        match self {
            Self::Float(_) => FieldKind::Float,
            Self::UInt(_) => FieldKind::UInt,
            Self::Bool(_) => FieldKind::Bool,
            Self::Vec3(_) => FieldKind::Vec3,
        }
    }
}

/// Field access errors
#[derive(Error, Debug, Clone, PartialEq)]
pub enum FieldError {
    /// No field with this name
    #[error("Unknown field '{0}'")]
    UnknownField(String),

    /// Field cannot be written
    #[error("Field '{0}' is read-only")]
    ReadOnly(String),

    /// Value kind does not match the field
    #[error("Field '{field}' expects {expected:?}, got {actual:?}")]
    KindMismatch {
        /// Field name
        field: String,
        /// Kind the field holds
        expected: FieldKind,
        /// Kind that was supplied
        actual: FieldKind,
    },
}

/// One statically declared field of `T`
pub struct EditableField<T: 'static> {
    /// Field name shown to tools
    pub name: &'static str,
    /// Kind of value the field holds
    pub kind: FieldKind,
    /// Whether tools may write the field
    pub read_only: bool,
    /// Read the current value
    pub get: fn(&T) -> FieldValue,
    /// Write a value of the declared kind through the type's setter
    pub set: fn(&mut T, FieldValue),
}

impl<T> std::fmt::Debug for EditableField<T> {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("EditableField")
            .field("name", &self.name)
            .field("kind", &self.kind)
            .field("read_only", &self.read_only)
            .finish()
    }
}

/// Types exposing a static field table to tools
pub trait Editable: Sized + 'static {
    /// All editable fields, in display order
    fn fields() -> &'static [EditableField<Self>];

    /// Field entry by name
    fn field(name: &str) -> Option<&'static EditableField<Self>> {
        Self::fields().iter().find(|field| field.name == name)
    }

    /// Read a field by name
    fn get_field(&self, name: &str) -> Result<FieldValue, FieldError> {
        let field = Self::field(name).ok_or_else(|| FieldError::UnknownField(name.to_string()))?;
        Ok((field.get)(self))
    }

    /// Write a field by name
    fn set_field(&mut self, name: &str, value: FieldValue) -> Result<(), FieldError> {
        let field = Self::field(name).ok_or_else(|| FieldError::UnknownField(name.to_string()))?;
        if field.read_only {
            return Err(FieldError::ReadOnly(name.to_string()));
        }
        if value.kind() != field.kind {
            return Err(FieldError::KindMismatch {
                field: name.to_string(),
                expected: field.kind,
                actual: value.kind(),
            });
        }
        (field.set)(self, value);
        log::debug!("Field '{}' set to {:?}", name, value);
        Ok(())
    }
}

fn read_only<T>(_: &mut T, _: FieldValue) {}

static CAMERA_FIELDS: [EditableField<Camera>; 6] = [
    EditableField {
        name: "position",
        kind: FieldKind::Vec3,
        read_only: false,
        get: |camera| FieldValue::Vec3(camera.position),
        set: |camera, value| {
            if let FieldValue::Vec3(position) = value {
                camera.set_position(position);
            }
        },
    },
    EditableField {
        name: "fov_degrees",
        kind: FieldKind::Float,
        read_only: false,
        get: |camera| FieldValue::Float(camera.fov_degrees()),
        set: |camera, value| {
            if let FieldValue::Float(fov) = value {
                camera.set_fov_degrees(fov);
            }
        },
    },
    EditableField {
        name: "aspect",
        kind: FieldKind::Float,
        read_only: false,
        get: |camera| FieldValue::Float(camera.aspect),
        set: |camera, value| {
            if let FieldValue::Float(aspect) = value {
                camera.set_aspect_ratio(aspect);
            }
        },
    },
    EditableField {
        name: "near",
        kind: FieldKind::Float,
        read_only: false,
        get: |camera| FieldValue::Float(camera.near),
        set: |camera, value| {
            if let FieldValue::Float(near) = value {
                camera.set_clip_planes(near, camera.far);
            }
        },
    },
    EditableField {
        name: "far",
        kind: FieldKind::Float,
        read_only: false,
        get: |camera| FieldValue::Float(camera.far),
        set: |camera, value| {
            if let FieldValue::Float(far) = value {
                camera.set_clip_planes(camera.near, far);
            }
        },
    },
    EditableField {
        name: "forward",
        kind: FieldKind::Vec3,
        read_only: true,
        get: |camera| FieldValue::Vec3(camera.forward()),
        set: read_only::<Camera>,
    },
];

impl Editable for Camera {
    fn fields() -> &'static [EditableField<Self>] {
        &CAMERA_FIELDS
    }
}

static SHADOW_FIELDS: [EditableField<ShadowConfig>; 4] = [
    EditableField {
        name: "resolution",
        kind: FieldKind::UInt,
        read_only: false,
        get: |shadow| FieldValue::UInt(shadow.resolution),
        set: |shadow, value| {
            if let FieldValue::UInt(resolution) = value {
                shadow.set_resolution(resolution);
            }
        },
    },
    EditableField {
        name: "range",
        kind: FieldKind::Float,
        read_only: false,
        get: |shadow| FieldValue::Float(shadow.range),
        set: |shadow, value| {
            if let FieldValue::Float(range) = value {
                shadow.set_range(range);
            }
        },
    },
    EditableField {
        name: "near",
        kind: FieldKind::Float,
        read_only: false,
        get: |shadow| FieldValue::Float(shadow.near),
        set: |shadow, value| {
            if let FieldValue::Float(near) = value {
                shadow.near = near;
            }
        },
    },
    EditableField {
        name: "effective_range",
        kind: FieldKind::Float,
        read_only: true,
        get: |shadow| FieldValue::Float(shadow.clamped_range()),
        set: read_only::<ShadowConfig>,
    },
];

impl Editable for ShadowConfig {
    fn fields() -> &'static [EditableField<Self>] {
        &SHADOW_FIELDS
    }
}
