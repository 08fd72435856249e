//! Property-based tests for the analysis configuration
//!
//! Tests invariants that should hold for ALL possible inputs:
//! - Validity: values inside the documented ranges always validate
//! - Roundtrip: from_yaml(to_yaml(x)) == x, through a real file
//! - Order independence: builder setters are last-write-wins

use codegraph_absint::config::*;
use codegraph_absint::features::lattice::{Domain, DomainSet};
use proptest::prelude::*;
use quickcheck::TestResult;
use quickcheck_macros::quickcheck;
use std::io::Write;

// ============================================================================
// QuickCheck Tests (simpler, faster)
// ============================================================================

#[quickcheck]
fn qc_range_invariants(widening: usize, scc: usize, depth: usize, visits: usize) -> TestResult {
    // Only test values in valid range
    if widening > 64
        || scc == 0
        || scc > 1_000_000
        || depth > 4
        || visits == 0
        || visits > 100_000_000
    {
        return TestResult::discard();
    }

    let config = AnalysisConfig::preset(Preset::Fast)
        .widening_threshold(widening)
        .max_scc_iterations(scc)
        .pointer_context_depth(depth)
        .max_block_visits(visits);

    // Invariant: Valid config should always validate
    TestResult::from_bool(config.validate().is_ok())
}

#[quickcheck]
fn qc_out_of_range_depth_is_rejected(depth: usize) -> TestResult {
    if depth <= 4 {
        return TestResult::discard();
    }
    let result = AnalysisConfig::default().pointer_context_depth(depth).validate();
    TestResult::from_bool(matches!(
        result,
        Err(ConfigError::Range { ref field, .. }) if field == "pointer_context_depth"
    ))
}

#[quickcheck]
fn qc_preset_roundtrip_through_file(preset_idx: u8) -> bool {
    let preset = match preset_idx % 4 {
        0 => Preset::Fast,
        1 => Preset::Balanced,
        2 => Preset::Thorough,
        _ => Preset::Custom,
    };

    let config = AnalysisConfig::preset(preset);
    let yaml = config.to_yaml().unwrap();

    let mut file = tempfile::NamedTempFile::new().unwrap();
    file.write_all(yaml.as_bytes()).unwrap();
    let recovered = AnalysisConfig::from_yaml(file.path()).unwrap();

    // Invariant: YAML roundtrip preserves every field
    recovered == config
}

#[quickcheck]
fn qc_builder_order_independence(first: bool, second: bool) -> bool {
    // Last write wins regardless of which setters ran before
    let mut config = AnalysisConfig::preset(Preset::Balanced);
    if first {
        config = config.widening_threshold(7);
    }
    if second {
        config = config.widening_threshold(3);
    }
    let expected = match (first, second) {
        (_, true) => 3,
        (true, false) => 7,
        (false, false) => 2,
    };
    config.widening_threshold == expected
}

// ============================================================================
// Proptest (overrides through YAML)
// ============================================================================

fn domains() -> impl Strategy<Value = DomainSet> {
    prop::sample::subsequence(vec![Domain::Sign, Domain::Nullability, Domain::Range], 1..=3)
        .prop_map(|ds| ds.into_iter().collect())
}

proptest! {
    #![proptest_config(ProptestConfig::with_cases(64))]

    #[test]
    fn overrides_survive_yaml(
        widening in 0usize..=64,
        depth in 0usize..=4,
        parallel in any::<bool>(),
        report in any::<bool>(),
        enabled in domains(),
    ) {
        let config = AnalysisConfig::preset(Preset::Thorough)
            .widening_threshold(widening)
            .pointer_context_depth(depth)
            .parallel(parallel)
            .report_unreachable_branches(report)
            .enabled_domains(enabled);

        let yaml = config.to_yaml().unwrap();
        let loaded = AnalysisConfig::from_yaml_str(&yaml).unwrap();

        prop_assert_eq!(loaded, config);
    }
}

#[test]
fn test_yaml_file_with_overrides() {
    let mut file = tempfile::NamedTempFile::new().unwrap();
    writeln!(
        file,
        "version: 1\npreset: fast\noverrides:\n  max_scc_iterations: 42\n  enabled_domains: [range, sign]"
    )
    .unwrap();

    let config = AnalysisConfig::from_yaml(file.path()).unwrap();

    assert_eq!(config.max_scc_iterations, 42);
    assert_eq!(config.widening_threshold, 1);
    assert!(config.enabled_domains.contains(Domain::Range));
    assert!(!config.enabled_domains.contains(Domain::Nullability));
}

#[test]
fn test_invalid_override_is_rejected_on_load() {
    let yaml = "version: 1\npreset: balanced\noverrides:\n  max_block_visits: 0\n";
    assert!(matches!(
        AnalysisConfig::from_yaml_str(yaml),
        Err(ConfigError::Range { .. })
    ));
}

#[test]
fn test_missing_file_is_io_error() {
    let dir = tempfile::tempdir().unwrap();
    let missing = dir.path().join("absint.yaml");
    assert!(matches!(AnalysisConfig::from_yaml(&missing), Err(ConfigError::Io(_))));
}
