//! # Editor Support
//!
//! Statically declared field tables that let tools inspect and edit engine
//! objects by name. Writing a field through its table entry calls the same
//! setter application code would, so validation and logging stay in one
//! place.

pub mod fields;

pub use fields::{Editable, EditableField, FieldError, FieldKind, FieldValue};
