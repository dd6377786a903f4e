//! # Core Module
//!
//! Shared abstractions used throughout the frame core.
//!
//! ## Organization
//!
//! - **Config**: Unified configuration for every subsystem

pub mod config;

// Re-export foundation modules for convenience
pub use crate::foundation;

// Re-export commonly used config types
pub use config::{
    ApplicationConfig,
    EngineConfig,
    RendererConfig,
    ShadowConfig,
    Config,
    ConfigError,
    ConfigFormat,
};
