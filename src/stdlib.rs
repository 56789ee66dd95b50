// SPDX: CC0-1.0

use crate::{
    eval::{Fun, Ident, Idents, Var},
    Number,
};
use core::f64::consts; // assumes Number = f64
use std::{collections::HashMap, sync::OnceLock};

pub const X: &str = "x";
pub const Y: &str = "y";

const GOLDEN_RATIO: Number = 1.618_033_988_749_895;
const SQRT_3: Number = 1.732_050_807_568_877_2;

const FUNS: &[Fun] = &[
    // trig
    Fun::new("sin", Number::sin),
    Fun::new("cos", Number::cos),
    Fun::new("tan", Number::tan),
    Fun::new("asin", Number::asin),
    Fun::new("acos", Number::acos),
    Fun::new("atan", Number::atan),
    Fun::new("arcsin", Number::asin),
    Fun::new("arccos", Number::acos),
    Fun::new("arctan", Number::atan),
    // hyperbolic
    Fun::new("sinh", Number::sinh),
    Fun::new("cosh", Number::cosh),
    Fun::new("tanh", Number::tanh),
    // roots, logs & powers
    Fun::new("sqrt", Number::sqrt),
    Fun::new("cbrt", Number::cbrt),
    Fun::new("log", Number::log10),
    Fun::new("ln", Number::ln),
    Fun::new("log2", Number::log2),
    Fun::new("exp", Number::exp),
    // rounding
    Fun::new("abs", Number::abs),
    Fun::new("floor", Number::floor),
    Fun::new("ceil", Number::ceil),
    Fun::new("ceiling", Number::ceil),
    Fun::new("round", Number::round),
    // angles
    Fun::new("deg", Number::to_degrees),
    Fun::new("rad", Number::to_radians),
];

const CONSTS: &[(&str, Number)] = &[
    ("pi", consts::PI),
    ("tau", consts::TAU),
    ("e", consts::E),
    ("phi", GOLDEN_RATIO),
    ("sqrttwo", consts::SQRT_2),
    ("sqrtthree", SQRT_3),
    ("inf", Number::INFINITY),
    ("infinity", Number::INFINITY),
    ("nan", Number::NAN),
];

fn build(vars: &[Var]) -> Idents {
    let mut ret = HashMap::new();
    for fun in FUNS {
        ret.insert(fun.name.into(), Ident::Fun(*fun));
    }
    for (name, val) in CONSTS {
        ret.insert((*name).into(), Ident::Const(*val));
    }
    for var in vars {
        ret.insert(var.name().into(), Ident::Var(*var));
    }
    ret
}

/// Identifiers available to single-variable expressions.
pub fn standard_idents() -> &'static Idents {
    static IDENTS: OnceLock<Idents> = OnceLock::new();
    IDENTS.get_or_init(|| build(&[Var::X]))
}

/// Identifiers available to two-variable expressions.
pub fn standard_idents_xy() -> &'static Idents {
    static IDENTS: OnceLock<Idents> = OnceLock::new();
    IDENTS.get_or_init(|| build(&[Var::X, Var::Y]))
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn y_is_only_bound_in_two_variable_mode() {
        assert!(standard_idents().get(&Y.into()).is_none());
        assert!(matches!(
            standard_idents_xy().get(&Y.into()),
            Some(Ident::Var(Var::Y))
        ));
    }

    #[test]
    fn no_name_is_shadowed() {
        assert_eq!(
            standard_idents_xy().len(),
            FUNS.len() + CONSTS.len() + 2,
            "function, constant and variable names must be distinct"
        );
    }
}
