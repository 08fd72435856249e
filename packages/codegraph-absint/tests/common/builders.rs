//! Program fixtures
//!
//! Each fixture builds a small program with [`SyntaxBuilder`] and returns
//! the node ids the tests assert on.

use codegraph_absint::shared::models::{CompOp, NodeId, Program, SyntaxBuilder};

/// A program plus the node a test wants to look at
pub struct Fixture {
    pub program: Program,
    pub node: NodeId,
}

/// `i = 0; while i < bound: i = i + step`
pub fn counter_loop(bound: i64, step: i64) -> Program {
    let b = SyntaxBuilder::new();
    b.program(vec![
        b.assign("i", b.int(0)),
        b.while_(
            b.lt(b.name("i"), b.int(bound)),
            vec![b.assign("i", b.add(b.name("i"), b.int(step)))],
        ),
    ])
}

/// Two counters, the inner one reset on every outer iteration
pub fn nested_counter_loops(outer: i64, inner: i64) -> Program {
    let b = SyntaxBuilder::new();
    b.program(vec![
        b.assign("i", b.int(0)),
        b.assign("total", b.int(0)),
        b.while_(
            b.lt(b.name("i"), b.int(outer)),
            vec![
                b.assign("j", b.int(0)),
                b.while_(
                    b.lt(b.name("j"), b.int(inner)),
                    vec![
                        b.assign("total", b.add(b.name("total"), b.int(1))),
                        b.assign("j", b.add(b.name("j"), b.int(1))),
                    ],
                ),
                b.assign("i", b.add(b.name("i"), b.int(1))),
            ],
        ),
    ])
}

/// ```text
/// def fact(n):
///     if n <= 1:
///         return 1
///     return n * fact(n - 1)
/// r = fact(5)
/// ```
pub fn factorial() -> Program {
    let b = SyntaxBuilder::new();
    let base_case = b.compare(CompOp::LtE, b.name("n"), b.int(1));
    b.program(vec![
        b.function(
            "fact",
            &["n"],
            vec![
                b.if_(base_case, vec![b.ret(b.int(1))], vec![]),
                b.ret(b.mul(
                    b.name("n"),
                    b.call_name("fact", vec![b.sub(b.name("n"), b.int(1))]),
                )),
            ],
        ),
        b.assign("r", b.call_name("fact", vec![b.int(5)])),
    ])
}

/// ```text
/// class Node: pass
/// def find(k):
///     if k > 0:
///         return Node()
///     return None
/// n = find(key)
/// n.val            # node
/// ```
pub fn nullable_lookup(guarded: bool) -> Fixture {
    let b = SyntaxBuilder::new();
    let positive = b.compare(CompOp::Gt, b.name("k"), b.int(0));
    let access = b.attr(b.name("n"), "val");
    let node = access.id;
    let use_stmt = b.assign("v", access);
    let use_stmt = if guarded {
        b.if_(b.is_not_none(b.name("n")), vec![use_stmt], vec![])
    } else {
        use_stmt
    };
    let program = b.program(vec![
        b.class("Node", &[], vec![b.pass()]),
        b.function(
            "find",
            &["k"],
            vec![
                b.if_(positive, vec![b.ret(b.call_name("Node", vec![]))], vec![]),
                b.ret(b.none()),
            ],
        ),
        b.assign("n", b.call_name("find", vec![b.name("key")])),
        use_stmt,
    ]);
    Fixture { program, node }
}

/// `xs = [1, 2, 3]; y = xs[index]` with the subscript as the fixture node
pub fn list_index(index: i64) -> Fixture {
    let b = SyntaxBuilder::new();
    let access = b.subscript(b.name("xs"), b.int(index));
    let node = access.id;
    let program = b.program(vec![
        b.assign("xs", b.list(vec![b.int(1), b.int(2), b.int(3)])),
        b.assign("y", access),
    ]);
    Fixture { program, node }
}
