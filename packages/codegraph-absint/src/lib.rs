/*
 * Codegraph AbsInt - Interprocedural Abstract Interpretation Engine
 *
 * Feature-First Hexagonal Architecture:
 * - shared/      : Syntax tree, function arena, cancellation
 * - features/    : Vertical slices (lattice → cfg → dataflow → call graph
 *                  → dispatch → points-to → heap → interprocedural)
 * - config/      : Presets, builder overrides, YAML
 * - pipeline/    : The `analyze` entry point
 *
 * Performance:
 * - Rayon work-stealing across independent call-graph SCCs
 * - FxHashMap for points-to and summary tables
 */

// Crate-level lint configuration
#![allow(clippy::too_many_arguments)] // Transfer helpers thread state explicitly
#![allow(clippy::type_complexity)] // Nested maps of summaries are necessary
#![allow(clippy::new_without_default)] // Default impl not always needed
#![allow(clippy::upper_case_acronyms)] // CFG, SCC naming
#![allow(clippy::module_inception)] // Module naming intentional

// ═══════════════════════════════════════════════════════════════════════════
// Module Exports - Feature-First Architecture
// ═══════════════════════════════════════════════════════════════════════════

/// Shared models and utilities
pub mod shared;

/// Feature modules (vertical slices)
pub mod features;

/// Pipeline orchestration
pub mod pipeline;

/// Configuration system (presets, overrides, YAML)
pub mod config;

/// Error types
pub mod errors;

// ═══════════════════════════════════════════════════════════════════════════
// Public API
// ═══════════════════════════════════════════════════════════════════════════

pub use config::{AnalysisConfig, ConfigError, Preset};
pub use errors::{AnalysisError, Result};
pub use features::interprocedural::{
    AnalysisReport, AnalysisStats, Certainty, Diagnostic, DiagnosticKind, FunctionSummary,
    Severity,
};
pub use features::lattice::{AbstractValue, Bound, DomainSet, Lattice, Nullability, Range, Sign};
pub use pipeline::{analyze, analyze_with_cancellation};
pub use shared::models::{Program, SyntaxBuilder};
pub use shared::CancellationToken;
