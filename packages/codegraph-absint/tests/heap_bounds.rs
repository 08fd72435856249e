//! Container tracking: lengths, element summaries and index checks

mod common;

use codegraph_absint::shared::models::MODULE_FUNCTION;
use codegraph_absint::{
    analyze, AnalysisConfig, Certainty, DiagnosticKind, Nullability, Range, SyntaxBuilder,
};
use common::*;
use pretty_assertions::assert_eq;

#[test]
fn test_constant_index_past_end_is_definite() {
    let fixture = list_index(3);
    let report = analyze(&fixture.program, &AnalysisConfig::default()).unwrap();

    assert_diagnostic_at(
        &report,
        DiagnosticKind::OutOfBounds(Certainty::Definite),
        fixture.node,
    );
}

#[test]
fn test_in_range_indices_are_clean() {
    for index in [0, 2, -1, -3] {
        let fixture = list_index(index);
        let report = analyze(&fixture.program, &AnalysisConfig::default()).unwrap();
        assert_no_diagnostic(&report, DiagnosticKind::OutOfBounds(Certainty::Definite));
        assert_no_diagnostic(&report, DiagnosticKind::OutOfBounds(Certainty::Possible));
        assert_eq!(exit_value(&report, MODULE_FUNCTION, "y").range, Range::finite(1, 3));
    }
}

#[test]
fn test_loop_index_may_overrun() {
    let b = SyntaxBuilder::new();
    let access = b.subscript(b.name("xs"), b.name("i"));
    let location = access.id;
    let program = b.program(vec![
        b.assign("xs", b.list(vec![b.int(1), b.int(2), b.int(3)])),
        b.for_(
            "i",
            b.call_name("range", vec![b.int(5)]),
            vec![b.assign("y", access)],
        ),
    ]);

    let report = analyze(&program, &AnalysisConfig::default()).unwrap();

    assert_diagnostic_at(
        &report,
        DiagnosticKind::OutOfBounds(Certainty::Possible),
        location,
    );
}

#[test]
fn test_append_grows_tracked_length() {
    let b = SyntaxBuilder::new();
    let past_end = b.subscript(b.name("xs"), b.int(3));
    let location = past_end.id;
    let program = b.program(vec![
        b.assign("xs", b.list(vec![b.int(1), b.int(2)])),
        b.expr_stmt(b.method_call(b.name("xs"), "append", vec![b.int(3)])),
        b.assign("n", b.call_name("len", vec![b.name("xs")])),
        b.assign("last", b.subscript(b.name("xs"), b.int(2))),
        b.assign("bad", past_end),
    ]);

    let report = analyze(&program, &AnalysisConfig::default()).unwrap();

    assert_eq!(exit_value(&report, MODULE_FUNCTION, "n").range, Range::constant(3));
    let found: Vec<_> = report
        .diagnostics_of(DiagnosticKind::OutOfBounds(Certainty::Definite))
        .map(|d| d.location)
        .collect();
    assert_eq!(found, vec![location]);
}

#[test]
fn test_element_summary_covers_stored_values() {
    let b = SyntaxBuilder::new();
    let program = b.program(vec![
        b.assign("xs", b.list(vec![b.int(1)])),
        b.assign_subscript(b.name("xs"), b.int(0), b.none()),
        b.assign("v", b.subscript(b.name("xs"), b.int(0))),
    ]);

    let report = analyze(&program, &AnalysisConfig::default()).unwrap();

    let v = exit_value(&report, MODULE_FUNCTION, "v");
    assert!(v.contains_int(1));
    assert!(v.contains_none());
    assert_eq!(v.nullability, Nullability::Nullable);
}

#[test]
fn test_for_loop_binds_collection_elements() {
    let b = SyntaxBuilder::new();
    let program = b.program(vec![
        b.assign("xs", b.list(vec![b.int(4), b.int(7)])),
        b.assign("last", b.int(0)),
        b.for_(
            "x",
            b.name("xs"),
            vec![b.assign("last", b.name("x"))],
        ),
    ]);

    let report = analyze(&program, &AnalysisConfig::default()).unwrap();

    assert_eq!(exit_value(&report, MODULE_FUNCTION, "last").range, Range::finite(0, 7));
}
