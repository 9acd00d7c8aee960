// SPDX: CC0-1.0

use crate::Number;
use core::f64::consts;

/// The free variable of a plotted formula.
pub const X: &str = "x";
pub const VAR_NAMES: &[&str] = &[X];

pub const TRUE: Number = 1.0;
pub const FALSE: Number = Number::NAN;

pub const fn from_bool(b: bool) -> Number {
    if b {
        TRUE
    } else {
        FALSE
    }
}

/// Finite non-zero values are true; zero, NaN and the infinities are false.
pub fn to_bool(n: Number) -> bool {
    n.is_finite() && n != 0.0
}

pub static CONSTANTS: &[(&str, Number)] = &[
    ("e", consts::E),
    ("pi", consts::PI),
    ("NaN", Number::NAN),
    ("inf", Number::INFINITY),
    ("True", TRUE),
    ("False", FALSE),
];

pub fn constant(name: &str) -> Option<Number> {
    CONSTANTS
        .iter()
        .find(|(key, _)| *key == name)
        .map(|(_, val)| *val)
}

#[derive(Clone, Copy, Debug, PartialEq, Eq, Hash)]
pub enum Intrinsic {
    Sqrt,
    Sqr,
    Ln,
    Log10,
    Log2,
    Exp,
    Exp10,
    Exp2,
    Sin,
    Cos,
    Tan,
    Asin,
    Acos,
    Atan,
    Atan2,
    Abs,
    Max,
    Min,
    Round,
    Floor,
    Ceil,
    Trunc,
    Clamp,
    Clip,
    InRange,
}

pub static INTRINSICS: &[Intrinsic] = &[
    Intrinsic::Sqrt,
    Intrinsic::Sqr,
    Intrinsic::Ln,
    Intrinsic::Log10,
    Intrinsic::Log2,
    Intrinsic::Exp,
    Intrinsic::Exp10,
    Intrinsic::Exp2,
    Intrinsic::Sin,
    Intrinsic::Cos,
    Intrinsic::Tan,
    Intrinsic::Asin,
    Intrinsic::Acos,
    Intrinsic::Atan,
    Intrinsic::Atan2,
    Intrinsic::Abs,
    Intrinsic::Max,
    Intrinsic::Min,
    Intrinsic::Round,
    Intrinsic::Floor,
    Intrinsic::Ceil,
    Intrinsic::Trunc,
    Intrinsic::Clamp,
    Intrinsic::Clip,
    Intrinsic::InRange,
];

impl Intrinsic {
    pub fn lookup(name: &str) -> Option<Self> {
        INTRINSICS.iter().copied().find(|fun| fun.name() == name)
    }

    pub const fn name(&self) -> &'static str {
        match self {
            Self::Sqrt => "sqrt",
            Self::Sqr => "sqr",
            Self::Ln => "ln",
            Self::Log10 => "log10",
            Self::Log2 => "log2",
            Self::Exp => "exp",
            Self::Exp10 => "exp10",
            Self::Exp2 => "exp2",
            Self::Sin => "sin",
            Self::Cos => "cos",
            Self::Tan => "tan",
            Self::Asin => "asin",
            Self::Acos => "acos",
            Self::Atan => "atan",
            Self::Atan2 => "atan2",
            Self::Abs => "abs",
            Self::Max => "max",
            Self::Min => "min",
            Self::Round => "round",
            Self::Floor => "floor",
            Self::Ceil => "ceil",
            Self::Trunc => "trunc",
            Self::Clamp => "clamp",
            Self::Clip => "clip",
            Self::InRange => "in_range",
        }
    }

    /// Parameter names, used for help text.
    pub const fn params(&self) -> &'static [&'static str] {
        match self {
            Self::Atan2 => &["y", "x"],
            Self::Max | Self::Min => &["a", "b"],
            Self::Clamp | Self::Clip | Self::InRange => &["x", "min", "max"],
            _ => &["n"],
        }
    }

    pub const fn arity(&self) -> usize {
        self.params().len()
    }

    /// Help text for the function, e.g. `sqrt(n)` or `clamp(x,min,max)`.
    pub fn usage(&self) -> String {
        format!("{}({})", self.name(), self.params().join(","))
    }

    /// Applies the function. Out-of-domain arguments produce NaN or an
    /// infinity, never a panic.
    pub fn call(&self, args: &[Number]) -> Number {
        debug_assert_eq!(args.len(), self.arity(), "arity of {}", self.name());
        match (self, args) {
            (Self::Sqrt, [x]) => x.sqrt(),
            (Self::Sqr, [x]) => x * x,
            (Self::Ln, [x]) => x.ln(),
            (Self::Log10, [x]) => x.log10(),
            (Self::Log2, [x]) => x.log2(),
            (Self::Exp, [x]) => x.exp(),
            (Self::Exp10, [x]) => Number::powf(10.0, *x),
            (Self::Exp2, [x]) => x.exp2(),
            (Self::Sin, [x]) => x.sin(),
            (Self::Cos, [x]) => x.cos(),
            (Self::Tan, [x]) => x.tan(),
            (Self::Asin, [x]) => x.asin(),
            (Self::Acos, [x]) => x.acos(),
            (Self::Atan, [x]) => x.atan(),
            (Self::Atan2, [y, x]) => y.atan2(*x),
            (Self::Abs, [x]) => x.abs(),
            (Self::Max, [a, b]) => max(*a, *b),
            (Self::Min, [a, b]) => min(*a, *b),
            (Self::Round, [x]) => x.round_ties_even(),
            (Self::Floor, [x]) => x.floor(),
            (Self::Ceil, [x]) => x.ceil(),
            (Self::Trunc, [x]) => x.trunc(),
            (Self::Clamp, [x, lo, hi]) => clamp(*x, *lo, *hi),
            (Self::Clip, [x, lo, hi]) => clip(*x, *lo, *hi),
            (Self::InRange, [x, lo, hi]) => from_bool(*x >= *lo && *x <= *hi),
            _ => Number::NAN,
        }
    }
}

// propagate NaN, unlike f64::max
fn max(a: Number, b: Number) -> Number {
    if a.is_nan() || b.is_nan() {
        Number::NAN
    } else {
        a.max(b)
    }
}

fn min(a: Number, b: Number) -> Number {
    if a.is_nan() || b.is_nan() {
        Number::NAN
    } else {
        a.min(b)
    }
}

fn clamp(x: Number, lo: Number, hi: Number) -> Number {
    if x < lo {
        lo
    } else if x > hi {
        hi
    } else {
        x
    }
}

fn clip(x: Number, lo: Number, hi: Number) -> Number {
    if x >= lo && x <= hi {
        x
    } else {
        Number::NAN
    }
}

/// The candidate whose name most resembles `name`, if any is close enough to
/// be worth suggesting.
pub fn most_similar<'a, I>(name: &str, candidates: I) -> Option<&'a str>
where
    I: IntoIterator<Item = &'a str>,
{
    let name = name.to_ascii_lowercase();
    candidates
        .into_iter()
        .map(|cand| {
            (
                strsim::normalized_damerau_levenshtein(&name, &cand.to_ascii_lowercase()),
                cand,
            )
        })
        .reduce(|(acc_sim, acc), (elem_sim, elem)| {
            if elem_sim > acc_sim {
                (elem_sim, elem)
            } else {
                (acc_sim, acc)
            }
        })
        .filter(|(sim, _)| *sim > 0.3)
        .map(|(_, cand)| cand)
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn every_intrinsic_is_found_by_name() {
        for fun in INTRINSICS {
            assert_eq!(Intrinsic::lookup(fun.name()), Some(*fun));
        }
        assert_eq!(Intrinsic::lookup("Sin"), None);
        assert_eq!(INTRINSICS.len(), 25);
    }

    #[test]
    fn arities_match_usage() {
        for fun in INTRINSICS {
            let usage = fun.usage();
            let commas = usage.matches(',').count();
            assert_eq!(commas + 1, fun.arity(), "{usage}");
        }
    }

    #[test]
    fn domain_errors_are_not_finite() {
        assert!(Intrinsic::Sqrt.call(&[-1.0]).is_nan());
        assert_eq!(Intrinsic::Ln.call(&[0.0]), Number::NEG_INFINITY);
        assert!(Intrinsic::Asin.call(&[2.0]).is_nan());
    }

    #[test]
    fn range_functions() {
        assert_eq!(Intrinsic::Clamp.call(&[5.0, 0.0, 2.0]), 2.0);
        assert_eq!(Intrinsic::Clamp.call(&[-1.0, 0.0, 2.0]), 0.0);
        assert_eq!(Intrinsic::Clip.call(&[1.5, 0.0, 2.0]), 1.5);
        assert!(Intrinsic::Clip.call(&[3.0, 0.0, 2.0]).is_nan());
        assert_eq!(Intrinsic::InRange.call(&[1.0, 0.0, 2.0]), TRUE);
        assert!(Intrinsic::InRange.call(&[3.0, 0.0, 2.0]).is_nan());
    }

    #[test]
    fn rounding_and_extrema() {
        assert_eq!(Intrinsic::Round.call(&[2.5]), 2.0);
        assert_eq!(Intrinsic::Round.call(&[3.5]), 4.0);
        assert_eq!(Intrinsic::Exp10.call(&[2.0]), 100.0);
        assert_eq!(Intrinsic::Max.call(&[1.0, 2.0]), 2.0);
        assert!(Intrinsic::Min.call(&[Number::NAN, 2.0]).is_nan());
        assert!(Intrinsic::Max.call(&[2.0, Number::NAN]).is_nan());
    }

    #[test]
    fn truthiness() {
        assert!(to_bool(1.0));
        assert!(to_bool(-0.5));
        assert!(!to_bool(0.0));
        assert!(!to_bool(FALSE));
        assert!(!to_bool(Number::INFINITY));
        assert!(!to_bool(Number::NEG_INFINITY));
        assert_eq!(constant("True"), Some(1.0));
        assert!(constant("False").is_some_and(Number::is_nan));
        assert_eq!(constant("tau"), None);
    }

    #[test]
    fn similar_names() {
        let names = INTRINSICS.iter().map(Intrinsic::name);
        assert_eq!(most_similar("sqtr", names), Some("sqrt"));
        assert_eq!(most_similar("zzzzzzzz", ["sin", "cos"]), None);
    }
}
