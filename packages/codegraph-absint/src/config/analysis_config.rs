//! Analysis configuration
//!
//! One flat config object: preset defaults, builder overrides, validation and
//! versioned YAML import/export.

use std::path::Path;

use serde::{Deserialize, Serialize};

use super::error::{ConfigError, ConfigResult};
use super::io::{AnalysisConfigOverrides, ConfigExportV1};
use super::preset::Preset;
use super::validation::Validatable;
use crate::features::lattice::DomainSet;

/// Supported YAML schema versions
pub const SUPPORTED_VERSIONS: &[u32] = &[1];

/// Engine configuration
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct AnalysisConfig {
    /// Loop-header visits joined before widening kicks in
    pub widening_threshold: usize,

    /// Rounds an SCC may take before its summaries are forced to Top
    pub max_scc_iterations: usize,

    /// Abstract domains tracked per variable
    pub enabled_domains: DomainSet,

    /// Call-string length for pointer contexts (0 = context-insensitive)
    pub pointer_context_depth: usize,

    /// Safety cap on block transfers per function solve
    pub max_block_visits: usize,

    /// Run independent SCCs of one level on rayon workers
    pub parallel: bool,

    /// Emit UnreachableBranch diagnostics
    pub report_unreachable_branches: bool,

    /// Preset the values started from
    #[serde(skip)]
    preset: Preset,
}

impl Default for AnalysisConfig {
    fn default() -> Self {
        Self::preset(Preset::Balanced)
    }
}

impl AnalysisConfig {
    /// Get preset configuration
    pub fn preset(preset: Preset) -> Self {
        match preset {
            Preset::Fast => Self {
                widening_threshold: 1,
                max_scc_iterations: 100,
                enabled_domains: DomainSet::all(),
                pointer_context_depth: 0,
                max_block_visits: 10_000,
                parallel: true,
                report_unreachable_branches: false,
                preset,
            },
            Preset::Balanced | Preset::Custom => Self {
                widening_threshold: 2,
                max_scc_iterations: 1000,
                enabled_domains: DomainSet::all(),
                pointer_context_depth: 1,
                max_block_visits: 100_000,
                parallel: true,
                report_unreachable_branches: true,
                preset,
            },
            Preset::Thorough => Self {
                widening_threshold: 4,
                max_scc_iterations: 5000,
                enabled_domains: DomainSet::all(),
                pointer_context_depth: 2,
                max_block_visits: 1_000_000,
                parallel: true,
                report_unreachable_branches: true,
                preset,
            },
        }
    }

    pub fn preset_name(&self) -> Preset {
        self.preset
    }

    /// Builder: Set widening_threshold
    pub fn widening_threshold(mut self, v: usize) -> Self {
        self.widening_threshold = v;
        self
    }

    /// Builder: Set max_scc_iterations
    pub fn max_scc_iterations(mut self, v: usize) -> Self {
        self.max_scc_iterations = v;
        self
    }

    /// Builder: Set enabled_domains
    pub fn enabled_domains(mut self, v: DomainSet) -> Self {
        self.enabled_domains = v;
        self
    }

    /// Builder: Set pointer_context_depth
    pub fn pointer_context_depth(mut self, v: usize) -> Self {
        self.pointer_context_depth = v;
        self
    }

    /// Builder: Set max_block_visits
    pub fn max_block_visits(mut self, v: usize) -> Self {
        self.max_block_visits = v;
        self
    }

    /// Builder: Set parallel
    pub fn parallel(mut self, v: bool) -> Self {
        self.parallel = v;
        self
    }

    /// Builder: Set report_unreachable_branches
    pub fn report_unreachable_branches(mut self, v: bool) -> Self {
        self.report_unreachable_branches = v;
        self
    }

    /// Load configuration from a YAML file
    pub fn from_yaml(path: impl AsRef<Path>) -> ConfigResult<Self> {
        let content = std::fs::read_to_string(path)?;
        Self::from_yaml_str(&content)
    }

    /// Load configuration from YAML text
    pub fn from_yaml_str(content: &str) -> ConfigResult<Self> {
        let export: ConfigExportV1 = serde_yaml::from_str(content)?;

        // Version check
        let version = export.version.ok_or(ConfigError::MissingVersion)?;
        if !SUPPORTED_VERSIONS.contains(&version) {
            return Err(ConfigError::UnsupportedVersion {
                found: version,
                supported: SUPPORTED_VERSIONS.to_vec(),
            });
        }

        let preset = Preset::from_str(&export.preset)
            .map_err(|_| ConfigError::UnknownPreset(export.preset.clone()))?;

        let mut config = Self::preset(preset);
        if let Some(overrides) = export.overrides {
            config.apply_overrides(overrides);
        }

        config.validate()?;
        Ok(config)
    }

    /// Export as YAML (schema v1); only fields that differ from the preset
    /// are written as overrides
    pub fn to_yaml(&self) -> ConfigResult<String> {
        let base = Self::preset(self.preset);
        let overrides = AnalysisConfigOverrides::diff(&base, self);
        let export = ConfigExportV1 {
            version: Some(1),
            preset: self.preset.as_str().to_string(),
            overrides: (!overrides.is_empty()).then_some(overrides),
        };
        Ok(serde_yaml::to_string(&export)?)
    }

    fn apply_overrides(&mut self, o: AnalysisConfigOverrides) {
        if let Some(v) = o.widening_threshold {
            self.widening_threshold = v;
        }
        if let Some(v) = o.max_scc_iterations {
            self.max_scc_iterations = v;
        }
        if let Some(v) = o.enabled_domains {
            self.enabled_domains = v;
        }
        if let Some(v) = o.pointer_context_depth {
            self.pointer_context_depth = v;
        }
        if let Some(v) = o.max_block_visits {
            self.max_block_visits = v;
        }
        if let Some(v) = o.parallel {
            self.parallel = v;
        }
        if let Some(v) = o.report_unreachable_branches {
            self.report_unreachable_branches = v;
        }
    }
}

impl Validatable for AnalysisConfig {
    fn validate(&self) -> ConfigResult<()> {
        if self.widening_threshold > 64 {
            return Err(ConfigError::range_with_hint(
                "widening_threshold",
                self.widening_threshold,
                0,
                64,
                "Large thresholds delay loop convergence without improving precision",
            ));
        }

        if self.max_scc_iterations == 0 || self.max_scc_iterations > 1_000_000 {
            return Err(ConfigError::range_with_hint(
                "max_scc_iterations",
                self.max_scc_iterations,
                1,
                1_000_000,
                "At least one round is needed to compute a summary",
            ));
        }

        if self.pointer_context_depth > 4 {
            return Err(ConfigError::range_with_hint(
                "pointer_context_depth",
                self.pointer_context_depth,
                0,
                4,
                "Call strings longer than 4 multiply heap objects without bound in practice",
            ));
        }

        if self.max_block_visits == 0 || self.max_block_visits > 100_000_000 {
            return Err(ConfigError::range_with_hint(
                "max_block_visits",
                self.max_block_visits,
                1,
                100_000_000,
                "The cap must allow the entry block to be visited",
            ));
        }

        if self.enabled_domains.is_empty() {
            return Err(ConfigError::Validation(
                "enabled_domains must name at least one of: sign, nullability, range".to_string(),
            ));
        }

        Ok(())
    }

    fn config_name(&self) -> &'static str {
        "AnalysisConfig"
    }
}
