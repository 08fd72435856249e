//! Builtin functions and methods with known abstract semantics
//!
//! Calls to these never invalidate their arguments. Everything else the
//! program does not define is an unknown call.

use crate::features::lattice::{AbstractValue, Bound, Lattice, Range};

/// Methods that read their receiver without changing it
pub const KNOWN_PURE_METHODS: &[&str] = &[
    "get", "copy", "keys", "values", "items", "index", "count", "startswith", "endswith",
    "lower", "upper", "strip", "split", "join", "format",
];

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum Builtin {
    Len,
    Range,
    Print,
    Abs,
    Min,
    Max,
    Int,
    Bool,
    Str,
    Isinstance,
}

impl Builtin {
    pub fn lookup(name: &str) -> Option<Self> {
        Some(match name {
            "len" => Builtin::Len,
            "range" => Builtin::Range,
            "print" => Builtin::Print,
            "abs" => Builtin::Abs,
            "min" => Builtin::Min,
            "max" => Builtin::Max,
            "int" => Builtin::Int,
            "bool" => Builtin::Bool,
            "str" => Builtin::Str,
            "isinstance" => Builtin::Isinstance,
            _ => return None,
        })
    }

    /// Result of the call; `length` is the tracked length of the first
    /// argument (used by `len`)
    pub fn call(self, args: &[AbstractValue], length: Option<AbstractValue>) -> AbstractValue {
        match self {
            Builtin::Len => {
                length.unwrap_or_else(|| AbstractValue::int_in(Range::at_least(0)))
            }
            // The range object itself; its elements come from `range_element`
            Builtin::Range | Builtin::Str => AbstractValue::not_null(),
            Builtin::Print => AbstractValue::none(),
            Builtin::Abs => match args.first() {
                Some(v) if v.is_numeric() => abs(v),
                _ => AbstractValue::top(),
            },
            Builtin::Min | Builtin::Max => fold_extremum(self == Builtin::Max, args),
            Builtin::Int => AbstractValue::any_int(),
            Builtin::Bool | Builtin::Isinstance => AbstractValue::boolean(),
        }
    }

    /// Values `for x in range(args)` binds
    pub fn range_element(args: &[AbstractValue]) -> AbstractValue {
        let numeric = |v: Option<&AbstractValue>| v.filter(|v| v.is_numeric()).copied();
        match args {
            [stop] => match numeric(Some(stop)) {
                Some(stop) => AbstractValue::int_in(Range::new(
                    Bound::Finite(0),
                    stop.range.hi.saturating_sub_one(),
                )),
                None => AbstractValue::int_in(Range::at_least(0)),
            },
            // Only increasing ranges are bounded; a negative step walks down
            [start, stop] => match (numeric(Some(start)), numeric(Some(stop))) {
                (Some(start), Some(stop)) => AbstractValue::int_in(Range::new(
                    start.range.lo,
                    stop.range.hi.saturating_sub_one(),
                )),
                (Some(start), None) => {
                    AbstractValue::int_in(Range::new(start.range.lo, Bound::PosInf))
                }
                _ => AbstractValue::any_int(),
            },
            _ => AbstractValue::any_int(),
        }
    }
}

pub fn is_known_pure(method: &str) -> bool {
    KNOWN_PURE_METHODS.contains(&method)
}

fn abs(value: &AbstractValue) -> AbstractValue {
    let r = value.range;
    let range = if r.lo >= Bound::Finite(0) {
        r
    } else if r.hi <= Bound::Finite(0) {
        r.negate()
    } else {
        Range::new(Bound::Finite(0), r.lo.neg().max(r.hi))
    };
    AbstractValue::int_in(range)
}

fn fold_extremum(max: bool, args: &[AbstractValue]) -> AbstractValue {
    if args.is_empty() || args.iter().any(|a| !a.is_numeric()) {
        return AbstractValue::top();
    }
    let mut acc = args[0].range;
    for arg in &args[1..] {
        let r = arg.range;
        acc = if max {
            Range::new(acc.lo.max(r.lo), acc.hi.max(r.hi))
        } else {
            Range::new(acc.lo.min(r.lo), acc.hi.min(r.hi))
        };
    }
    AbstractValue::int_in(acc)
}
