//! Performance benchmarks for the analysis engine
//!
//! Measures the phases that dominate a run:
//! - Loop-heavy intraprocedural fixpoints (widening)
//! - Wide call graphs (bottom-up summaries, parallel levels)
//! - Recursive SCC iteration

use codegraph_absint::shared::models::{CompOp, Program, SyntaxBuilder};
use codegraph_absint::{analyze, AnalysisConfig, Preset};
use criterion::{black_box, criterion_group, criterion_main, BenchmarkId, Criterion, Throughput};

// ============================================================================
// Program generators
// ============================================================================

/// `depth` nested counting loops
fn nested_loops(depth: usize) -> Program {
    let b = SyntaxBuilder::new();
    let mut body = vec![b.assign("acc", b.add(b.name("acc"), b.int(1)))];
    for level in (0..depth).rev() {
        let counter = format!("i{level}");
        body.push(b.assign(&counter, b.add(b.name(&counter), b.int(1))));
        body = vec![
            b.assign(&counter, b.int(0)),
            b.while_(b.lt(b.name(&counter), b.int(100)), body),
        ];
    }
    let mut program = vec![b.assign("acc", b.int(0))];
    program.extend(body);
    b.program(program)
}

/// `width` leaf functions called through `layers` layers of wrappers
fn call_tree(width: usize, layers: usize) -> Program {
    let b = SyntaxBuilder::new();
    let mut body = Vec::new();
    for i in 0..width {
        body.push(b.function(
            &format!("f0_{i}"),
            &["x"],
            vec![b.if_(
                b.is_none(b.name("x")),
                vec![b.ret(b.int(0))],
                vec![b.ret(b.add(b.name("x"), b.int(1)))],
            )],
        ));
        for layer in 1..layers {
            let callee = format!("f{}_{i}", layer - 1);
            body.push(b.function(
                &format!("f{layer}_{i}"),
                &["x"],
                vec![b.ret(b.call_name(&callee, vec![b.name("x")]))],
            ));
        }
    }
    for i in 0..width {
        let top = format!("f{}_{i}", layers - 1);
        body.push(b.assign(&format!("r{i}"), b.call_name(&top, vec![b.int(i as i64)])));
    }
    b.program(body)
}

/// Mutually recursive pair `even`/`odd`
fn mutual_recursion() -> Program {
    let b = SyntaxBuilder::new();
    let step = |name: &str, other: &str, base: i64| {
        b.function(
            name,
            &["n"],
            vec![
                b.if_(
                    b.compare(CompOp::LtE, b.name("n"), b.int(0)),
                    vec![b.ret(b.int(base))],
                    vec![],
                ),
                b.ret(b.call_name(other, vec![b.sub(b.name("n"), b.int(1))])),
            ],
        )
    };
    let even = step("even", "odd", 1);
    let odd = step("odd", "even", 0);
    b.program(vec![even, odd, b.assign("r", b.call_name("even", vec![b.int(10)]))])
}

// ============================================================================
// Benchmarks
// ============================================================================

fn bench_loop_widening(c: &mut Criterion) {
    let mut group = c.benchmark_group("loop_widening");

    for depth in [1, 3, 6] {
        let program = nested_loops(depth);
        group.bench_with_input(BenchmarkId::from_parameter(depth), &program, |b, program| {
            b.iter(|| black_box(analyze(program, &AnalysisConfig::default())))
        });
    }

    group.finish();
}

fn bench_call_tree(c: &mut Criterion) {
    let mut group = c.benchmark_group("call_tree");

    for width in [8, 64] {
        let program = call_tree(width, 4);
        group.throughput(Throughput::Elements((width * 4) as u64));
        for parallel in [false, true] {
            let config = AnalysisConfig::default().parallel(parallel);
            let id = format!("{width}_{}", if parallel { "parallel" } else { "sequential" });
            group.bench_with_input(BenchmarkId::from_parameter(id), &program, |b, program| {
                b.iter(|| black_box(analyze(program, &config)))
            });
        }
    }

    group.finish();
}

fn bench_recursive_scc(c: &mut Criterion) {
    let program = mutual_recursion();
    let mut group = c.benchmark_group("recursive_scc");

    for preset in [Preset::Fast, Preset::Balanced, Preset::Thorough] {
        let config = AnalysisConfig::preset(preset);
        group.bench_with_input(
            BenchmarkId::from_parameter(format!("{:?}", preset)),
            &program,
            |b, program| b.iter(|| black_box(analyze(program, &config))),
        );
    }

    group.finish();
}

criterion_group!(benches, bench_loop_widening, bench_call_tree, bench_recursive_scc);
criterion_main!(benches);
