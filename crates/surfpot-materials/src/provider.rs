//! Preset provider trait.
//!
//! All preset sources implement [`PresetProvider`], which yields validated
//! material and device records ready for the bulk-state calculator.

use surfpot_core::types::{ConfigError, DeviceGeometry, MaterialParameters};
use thiserror::Error;

/// Errors from preset lookup and conversion.
#[derive(Debug, Error)]
pub enum MaterialError {
    #[error("Preset not found: {name} (available: {available})")]
    NotFound { name: String, available: String },

    #[error("Preset {name} is not a valid parameter set: {source}")]
    Invalid {
        name: String,
        #[source]
        source: ConfigError,
    },
}

/// Provides a complete material + device description.
pub trait PresetProvider: Send + Sync {
    /// Human-readable name of this preset.
    fn name(&self) -> &str;

    /// Validated material parameters (SI units).
    fn material(&self) -> Result<MaterialParameters, MaterialError>;

    /// Validated device geometry (SI units).
    fn geometry(&self) -> Result<DeviceGeometry, MaterialError>;

    /// Gate bias actually applied to the stack (V).
    fn effective_bias(&self) -> f64;
}
