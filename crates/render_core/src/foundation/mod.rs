//! Foundation module - Core utilities and types
//!
//! This module provides fundamental utilities used throughout the frame core:
//! - Math types and projection helpers
//! - Handle types for engine-owned objects
//! - Logging utilities

pub mod math;
pub mod collections;
pub mod logging;
