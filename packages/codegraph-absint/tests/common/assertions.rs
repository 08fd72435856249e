//! Custom assertions over analysis reports

use codegraph_absint::shared::models::NodeId;
use codegraph_absint::{AbstractValue, AnalysisReport, DiagnosticKind, Lattice};

/// Assert that every function was lowered and analyzed
pub fn assert_no_errors(report: &AnalysisReport) {
    assert!(
        report.errors.is_empty(),
        "Expected no errors, got: {:?}",
        report.errors
    );
}

/// Assert that a diagnostic of `kind` was reported at `location`
pub fn assert_diagnostic_at(report: &AnalysisReport, kind: DiagnosticKind, location: NodeId) {
    assert!(
        report
            .diagnostics
            .iter()
            .any(|d| d.kind == kind && d.location == location),
        "Expected {} at node {location}, got: {:#?}",
        kind.as_str(),
        report.diagnostics
    );
}

/// Assert that no diagnostic of `kind` was reported anywhere
pub fn assert_no_diagnostic(report: &AnalysisReport, kind: DiagnosticKind) {
    let found: Vec<_> = report.diagnostics_of(kind).collect();
    assert!(
        found.is_empty(),
        "Expected no {}, got: {:#?}",
        kind.as_str(),
        found
    );
}

/// Assert that no function had to fall back to Top summaries
pub fn assert_not_degraded(report: &AnalysisReport) {
    let degraded: Vec<&str> = report
        .per_function
        .values()
        .filter(|s| s.degraded)
        .map(|s| s.function.as_str())
        .collect();
    assert!(degraded.is_empty(), "Degraded functions: {degraded:?}");
}

/// Value of `var` where `function` exits; variables missing from the exit
/// state are unconstrained
pub fn exit_value(report: &AnalysisReport, function: &str, var: &str) -> AbstractValue {
    let summary = report
        .summary(function)
        .unwrap_or_else(|| panic!("no summary for {function}"));
    summary
        .exit_state
        .get(var)
        .copied()
        .unwrap_or_else(AbstractValue::top)
}
