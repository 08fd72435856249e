//! Configuration validation
//!
//! Provides the validation trait implemented by configuration objects.

use super::error::ConfigResult;

/// Trait for validatable configuration objects
///
/// # Example
/// ```rust,ignore
/// use codegraph_absint::config::Validatable;
///
/// fn run<C: Validatable>(config: &C) -> Result<(), ConfigError> {
///     config.validate()?;  // Works with any Validatable config
///     // ... run analysis
/// }
/// ```
pub trait Validatable {
    /// Validate the configuration
    ///
    /// Returns `Ok(())` if valid, `Err(ConfigError)` with details if invalid.
    fn validate(&self) -> ConfigResult<()>;

    /// Get the configuration name for error messages
    fn config_name(&self) -> &'static str {
        "Config"
    }
}

/// Extension trait for validating collections of configs
pub trait ValidatableCollection {
    /// Validate all configs in collection
    fn validate_all(&self) -> ConfigResult<()>;
}

impl<T: Validatable> ValidatableCollection for Vec<T> {
    fn validate_all(&self) -> ConfigResult<()> {
        for config in self {
            config.validate()?;
        }
        Ok(())
    }
}

impl<T: Validatable> ValidatableCollection for Option<T> {
    fn validate_all(&self) -> ConfigResult<()> {
        if let Some(config) = self {
            config.validate()?;
        }
        Ok(())
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::config::{AnalysisConfig, Preset};

    #[test]
    fn test_presets_validate() {
        for preset in [Preset::Fast, Preset::Balanced, Preset::Thorough, Preset::Custom] {
            assert!(AnalysisConfig::preset(preset).validate().is_ok());
        }
    }

    #[test]
    fn test_validate_all_stops_at_first_error() {
        let configs = vec![
            AnalysisConfig::default(),
            AnalysisConfig::default().max_scc_iterations(0),
        ];
        assert!(configs.validate_all().is_err());

        let none: Option<AnalysisConfig> = None;
        assert!(none.validate_all().is_ok());
    }
}
