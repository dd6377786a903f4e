//! # Unified Configuration System
//!
//! All settings the frame core reads live here, grouped per subsystem and
//! wrapped by [`ApplicationConfig`], which is what applications load from disk.
//!
//! ## Configuration Categories
//!
//! - **Engine Config**: logging and debug behaviour
//! - **Renderer Config**: texture-unit capacity, culling, shadows
//! - **Shadow Config**: shadow map resolution and fitted range

use serde::{Serialize, Deserialize};

pub use crate::config::{Config, ConfigError, ConfigFormat};

/// Smallest shadow range (world units) the fitter accepts
pub const MIN_SHADOW_RANGE: f32 = 16.0;

/// Largest shadow range (world units) the fitter accepts
pub const MAX_SHADOW_RANGE: f32 = 1000.0;

/// Default number of texture units a material can bind at once
pub const DEFAULT_TEXTURE_UNITS: usize = 32;

/// # Shadow Configuration
///
/// Directional shadow fitting parameters.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(default)]
pub struct ShadowConfig {
    /// Shadow map edge length in texels, used for texel snapping
    pub resolution: u32,
    /// Distance from the camera covered by the shadow map
    pub range: f32,
    /// Near plane of the camera sub-frustum that is fitted
    pub near: f32,
}

impl ShadowConfig {
    /// Create a shadow configuration with the given resolution and range
    pub fn new(resolution: u32, range: f32) -> Self {
        Self {
            resolution,
            range,
            ..Default::default()
        }
    }

    /// Shadow range clamped to `[MIN_SHADOW_RANGE, MAX_SHADOW_RANGE]`
    pub fn clamped_range(&self) -> f32 {
        clamp_shadow_range(self.range)
    }

    /// Set the shadow range, clamping it to the accepted interval
    pub fn set_range(&mut self, range: f32) {
        self.range = clamp_shadow_range(range);
    }

    /// Set the shadow map resolution (at least one texel)
    pub fn set_resolution(&mut self, resolution: u32) {
        self.resolution = resolution.max(1);
    }

    /// Validate the configuration
    pub fn validate(&self) -> Result<(), ConfigError> {
        if self.resolution == 0 {
            return Err(ConfigError::Invalid("shadow resolution must be at least 1".to_string()));
        }
        if !(self.near > 0.0 && self.near < MIN_SHADOW_RANGE) {
            return Err(ConfigError::Invalid(format!(
                "shadow near plane {} must lie in (0, {MIN_SHADOW_RANGE})",
                self.near
            )));
        }
        if !self.range.is_finite() {
            return Err(ConfigError::Invalid("shadow range must be finite".to_string()));
        }
        Ok(())
    }
}

impl Default for ShadowConfig {
    fn default() -> Self {
        Self {
            resolution: 2048,
            range: 100.0,
            near: 0.1,
        }
    }
}

/// Clamp a shadow range to the interval the fitter supports
pub fn clamp_shadow_range(range: f32) -> f32 {
    if range.is_nan() {
        return MIN_SHADOW_RANGE;
    }
    range.clamp(MIN_SHADOW_RANGE, MAX_SHADOW_RANGE)
}

/// # Renderer Configuration
///
/// Settings for the frame core itself.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(default)]
pub struct RendererConfig {
    /// Texture units available to each material
    pub max_texture_units: usize,
    /// Whether the built-in geometry pass skips draws outside the camera frustum
    pub culling_enabled: bool,
    /// Directional shadow settings
    pub shadow: ShadowConfig,
}

impl RendererConfig {
    /// Set the texture unit capacity
    pub fn with_max_texture_units(mut self, units: usize) -> Self {
        self.max_texture_units = units;
        self
    }

    /// Enable or disable frustum culling in the geometry pass
    pub fn with_culling(mut self, enabled: bool) -> Self {
        self.culling_enabled = enabled;
        self
    }

    /// Set custom shadow configuration
    pub fn with_shadow(mut self, shadow: ShadowConfig) -> Self {
        self.shadow = shadow;
        self
    }

    /// Validate the configuration
    pub fn validate(&self) -> Result<(), ConfigError> {
        if self.max_texture_units == 0 {
            return Err(ConfigError::Invalid("max_texture_units must be at least 1".to_string()));
        }
        self.shadow.validate()
    }
}

impl Default for RendererConfig {
    fn default() -> Self {
        Self {
            max_texture_units: DEFAULT_TEXTURE_UNITS,
            culling_enabled: true,
            shadow: ShadowConfig::default(),
        }
    }
}

/// # Engine Configuration
///
/// Core behaviour shared by every binary built on the frame core.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(default)]
pub struct EngineConfig {
    /// Log filter passed to `env_logger` (for example `"info"`)
    pub log_level: String,
    /// Whether to enable debug features
    pub debug_mode: bool,
}

impl EngineConfig {
    /// Create a new engine configuration
    pub fn new() -> Self {
        Self {
            log_level: "info".to_string(),
            debug_mode: cfg!(debug_assertions),
        }
    }

    /// Set log level
    pub fn with_log_level(mut self, level: impl Into<String>) -> Self {
        self.log_level = level.into();
        self
    }
}

impl Default for EngineConfig {
    fn default() -> Self {
        Self::new()
    }
}

/// # Complete Application Configuration
///
/// Top-level configuration that encompasses all subsystems.
#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
#[serde(default)]
pub struct ApplicationConfig {
    /// Engine core configuration
    pub engine: EngineConfig,
    /// Frame core configuration
    pub renderer: RendererConfig,
}

impl ApplicationConfig {
    /// Validate the entire configuration
    pub fn validate(&self) -> Result<(), ConfigError> {
        self.renderer.validate()
    }
}

impl Config for ApplicationConfig {}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_shadow_range_is_clamped() {
        let mut shadow = ShadowConfig::default();

        shadow.set_range(2.0);
        assert_eq!(shadow.range, MIN_SHADOW_RANGE);

        shadow.set_range(5000.0);
        assert_eq!(shadow.range, MAX_SHADOW_RANGE);

        shadow.range = f32::NAN;
        assert_eq!(shadow.clamped_range(), MIN_SHADOW_RANGE);
    }

    #[test]
    fn test_default_config_validates() {
        assert!(ApplicationConfig::default().validate().is_ok());
    }

    #[test]
    fn test_zero_texture_units_rejected() {
        let config = RendererConfig::default().with_max_texture_units(0);
        assert!(matches!(config.validate(), Err(ConfigError::Invalid(_))));
    }

    #[test]
    fn test_toml_partial_file_uses_defaults() {
        let text = r#"
            [renderer]
            max_texture_units = 16

            [renderer.shadow]
            resolution = 1024
        "#;

        let config = ApplicationConfig::from_str_in(text, ConfigFormat::Toml).unwrap();

        assert_eq!(config.renderer.max_texture_units, 16);
        assert_eq!(config.renderer.shadow.resolution, 1024);
        assert_eq!(config.renderer.shadow.range, ShadowConfig::default().range);
        assert_eq!(config.engine, EngineConfig::default());
    }

    #[test]
    fn test_ron_roundtrip() {
        let mut config = ApplicationConfig::default();
        config.renderer.culling_enabled = false;
        config.engine.log_level = "debug".to_string();

        let text = config.to_string_in(ConfigFormat::Ron).unwrap();
        let parsed = ApplicationConfig::from_str_in(&text, ConfigFormat::Ron).unwrap();

        assert_eq!(parsed, config);
    }

    #[test]
    fn test_unknown_extension_rejected() {
        let result = ConfigFormat::from_path(std::path::Path::new("settings.json"));
        assert!(matches!(result, Err(ConfigError::UnsupportedFormat(_))));
    }
}
