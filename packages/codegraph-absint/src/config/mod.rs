//! Configuration System
//!
//! Three levels of control:
//! - Level 1: Preset - Simple one-liner
//! - Level 2: Builder overrides - Partial adjustment
//! - Level 3: YAML - Complete control, versioned schema
//!
//! # Examples
//!
//! ```rust,ignore
//! use codegraph_absint::config::{AnalysisConfig, Preset};
//!
//! // Level 1: Simple preset
//! let config = AnalysisConfig::preset(Preset::Fast);
//!
//! // Level 2: Override specific fields
//! let config = AnalysisConfig::preset(Preset::Balanced)
//!     .widening_threshold(4)
//!     .pointer_context_depth(2);
//!
//! // Level 3: Complete control via YAML
//! let config = AnalysisConfig::from_yaml("absint.yaml")?;
//! ```

pub mod analysis_config;
pub mod error;
pub mod io;
pub mod preset;
pub mod validation;

// Re-exports
pub use analysis_config::{AnalysisConfig, SUPPORTED_VERSIONS};
pub use error::{ConfigError, ConfigResult};
pub use io::{AnalysisConfigOverrides, ConfigExportV1};
pub use preset::Preset;
pub use validation::{Validatable, ValidatableCollection};
