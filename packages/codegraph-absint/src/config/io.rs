//! Configuration I/O (YAML schema types)
//!
//! Loading and export live in `analysis_config.rs`; this module only defines
//! the on-disk shape.

use serde::{Deserialize, Serialize};

use super::analysis_config::AnalysisConfig;
use crate::features::lattice::DomainSet;

/// YAML Schema v1
#[derive(Debug, Clone, Serialize, Deserialize)]
#[serde(deny_unknown_fields)]
pub struct ConfigExportV1 {
    /// Schema version (always 1 for v1)
    pub version: Option<u32>,

    /// Base preset
    pub preset: String,

    /// Fine-grained overrides
    #[serde(skip_serializing_if = "Option::is_none")]
    pub overrides: Option<AnalysisConfigOverrides>,
}

/// Per-field overrides on top of a preset
#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize, Deserialize)]
#[serde(deny_unknown_fields)]
pub struct AnalysisConfigOverrides {
    #[serde(skip_serializing_if = "Option::is_none")]
    pub widening_threshold: Option<usize>,

    #[serde(skip_serializing_if = "Option::is_none")]
    pub max_scc_iterations: Option<usize>,

    #[serde(skip_serializing_if = "Option::is_none")]
    pub enabled_domains: Option<DomainSet>,

    #[serde(skip_serializing_if = "Option::is_none")]
    pub pointer_context_depth: Option<usize>,

    #[serde(skip_serializing_if = "Option::is_none")]
    pub max_block_visits: Option<usize>,

    #[serde(skip_serializing_if = "Option::is_none")]
    pub parallel: Option<bool>,

    #[serde(skip_serializing_if = "Option::is_none")]
    pub report_unreachable_branches: Option<bool>,
}

impl AnalysisConfigOverrides {
    /// Fields of `config` that differ from `base`
    pub fn diff(base: &AnalysisConfig, config: &AnalysisConfig) -> Self {
        fn changed<T: PartialEq + Clone>(base: &T, value: &T) -> Option<T> {
            (base != value).then(|| value.clone())
        }

        Self {
            widening_threshold: changed(&base.widening_threshold, &config.widening_threshold),
            max_scc_iterations: changed(&base.max_scc_iterations, &config.max_scc_iterations),
            enabled_domains: changed(&base.enabled_domains, &config.enabled_domains),
            pointer_context_depth: changed(
                &base.pointer_context_depth,
                &config.pointer_context_depth,
            ),
            max_block_visits: changed(&base.max_block_visits, &config.max_block_visits),
            parallel: changed(&base.parallel, &config.parallel),
            report_unreachable_branches: changed(
                &base.report_unreachable_branches,
                &config.report_unreachable_branches,
            ),
        }
    }

    pub fn is_empty(&self) -> bool {
        *self == Self::default()
    }
}
