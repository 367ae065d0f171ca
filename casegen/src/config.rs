//! Configuration types controlling what the engine generates.

use thiserror::Error;

#[cfg(feature = "serde")]
use serde::{Deserialize, Serialize};

/// Configuration validation errors
#[derive(Debug, Clone, Copy, PartialEq, Error)]
pub enum ConfigError {
    /// Sampling fraction outside (0, 1]
    #[error("invalid sampling fraction: {0} (must be in (0, 1])")]
    InvalidFraction(f64),
}

/// Seeded sampling of a value sequence.
///
/// The fraction is validated on construction and on deserialization.
#[derive(Debug, Clone, Copy, PartialEq)]
#[cfg_attr(feature = "serde", derive(Serialize, Deserialize))]
#[cfg_attr(feature = "serde", serde(try_from = "SamplingFields"))]
pub struct SamplingConfig {
    fraction: f64,
    seed: u64,
}

#[cfg(feature = "serde")]
#[derive(Deserialize)]
struct SamplingFields {
    fraction: f64,
    seed: u64,
}

#[cfg(feature = "serde")]
impl TryFrom<SamplingFields> for SamplingConfig {
    type Error = ConfigError;

    fn try_from(fields: SamplingFields) -> Result<Self, ConfigError> {
        Self::new(fields.fraction, fields.seed)
    }
}

impl SamplingConfig {
    /// Create a sampling configuration with validation
    pub fn new(fraction: f64, seed: u64) -> Result<Self, ConfigError> {
        let config = Self { fraction, seed };
        config.validate()?;
        Ok(config)
    }

    pub fn validate(&self) -> Result<(), ConfigError> {
        if self.fraction > 0.0 && self.fraction <= 1.0 {
            Ok(())
        } else {
            Err(ConfigError::InvalidFraction(self.fraction))
        }
    }

    /// Fraction of elements kept
    pub fn fraction(&self) -> f64 {
        self.fraction
    }

    /// Seed of the keep/drop decisions
    pub fn seed(&self) -> u64 {
        self.seed
    }

    /// A fraction of 1.0 keeps everything
    pub fn is_identity(&self) -> bool {
        self.fraction >= 1.0
    }
}

/// Default maximum length of synthesized arrays
pub const DEFAULT_MAX_ARRAY_LENGTH: usize = 1;

/// Configuration for one generation session
#[derive(Debug, Clone, PartialEq)]
#[cfg_attr(feature = "serde", derive(Serialize, Deserialize))]
#[cfg_attr(feature = "serde", serde(default))]
pub struct GenerationConfig {
    /// Longest array synthesized from a component type
    pub max_array_length: usize,
    /// Whether unregistered structured types may be built from their
    /// constructors with recursively resolved arguments
    pub structural_fallback: bool,
    /// Whether known concrete subtypes are tried for structured types
    pub use_subtypes: bool,
    /// Whether literals from code are folded into default values
    pub use_literals: bool,
    /// Whether literals from specifications are folded into default values
    pub use_spec_literals: bool,
    /// Sampling applied to sequences of strategies without their own
    pub sampling: Option<SamplingConfig>,
}

impl Default for GenerationConfig {
    fn default() -> Self {
        Self {
            max_array_length: DEFAULT_MAX_ARRAY_LENGTH,
            structural_fallback: true,
            use_subtypes: true,
            use_literals: true,
            use_spec_literals: true,
            sampling: None,
        }
    }
}

impl GenerationConfig {
    /// Validate the configuration
    pub fn validate(&self) -> Result<(), ConfigError> {
        if let Some(sampling) = &self.sampling {
            sampling.validate()?;
        }
        Ok(())
    }

    pub fn with_max_array_length(mut self, max_array_length: usize) -> Self {
        self.max_array_length = max_array_length;
        self
    }

    pub fn with_structural_fallback(mut self, enabled: bool) -> Self {
        self.structural_fallback = enabled;
        self
    }

    pub fn with_subtypes(mut self, enabled: bool) -> Self {
        self.use_subtypes = enabled;
        self
    }

    pub fn with_literals(mut self, enabled: bool) -> Self {
        self.use_literals = enabled;
        self
    }

    pub fn with_spec_literals(mut self, enabled: bool) -> Self {
        self.use_spec_literals = enabled;
        self
    }

    /// Sample every strategy without its own sampling setting
    pub fn with_sampling(mut self, fraction: f64, seed: u64) -> Result<Self, ConfigError> {
        self.sampling = Some(SamplingConfig::new(fraction, seed)?);
        Ok(self)
    }
}
