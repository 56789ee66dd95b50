// SPDX: CC0-1.0

use crate::{
    lex::{Lexer, SubStr},
    parse::{self, ParseErr},
    stdlib, Number,
};
use core::fmt;
use std::{collections::HashMap, sync::Arc};

/// Divisors closer to zero than this are rejected instead of producing a huge
/// quotient.
pub const DIV_EPSILON: Number = 1e-10;

#[derive(Clone, Copy, Debug, PartialEq, Eq, Hash)]
pub enum OperatorTyp {
    Add,
    Sub,
    Mul,
    Div,
    Pow,
}

impl OperatorTyp {
    pub const fn symbol(&self) -> char {
        match self {
            Self::Add => '+',
            Self::Sub => '-',
            Self::Mul => '*',
            Self::Div => '/',
            Self::Pow => '^',
        }
    }

    fn apply(&self, lhs: Number, rhs: Number, loc: &SubStr) -> Result<Number, EvalErr> {
        Ok(match self {
            Self::Add => lhs + rhs,
            Self::Sub => lhs - rhs,
            Self::Mul => lhs * rhs,
            Self::Div => {
                if rhs.abs() < DIV_EPSILON {
                    return Err(EvalErr {
                        typ: EvalErrTyp::DivisionByZero,
                        loc: loc.clone(),
                    });
                }
                lhs / rhs
            }
            // negative base with fractional exponent is NaN, not an error
            Self::Pow => lhs.powf(rhs),
        })
    }
}

#[derive(Clone, Copy, Debug, PartialEq, Eq, Hash)]
pub enum Var {
    X,
    Y,
}

impl Var {
    pub const fn name(&self) -> &'static str {
        match self {
            Self::X => stdlib::X,
            Self::Y => stdlib::Y,
        }
    }
}

#[derive(Clone, Copy, Debug)]
pub struct Fun {
    pub name: &'static str,
    pub fun: fn(Number) -> Number,
}

impl Fun {
    pub const fn new(name: &'static str, fun: fn(Number) -> Number) -> Self {
        Self { name, fun }
    }
}

#[derive(Clone, Copy, Debug)]
pub enum Ident {
    Var(Var),
    Const(Number),
    Fun(Fun),
}

impl Ident {
    pub const fn kind(&self) -> &'static str {
        match self {
            Self::Var(_) => "variable",
            Self::Const(_) => "constant",
            Self::Fun(_) => "function",
        }
    }
}

#[derive(Clone, Debug, Eq)]
pub enum IdentKey {
    Arc(SubStr),
    Static(&'static str),
}

impl PartialEq for IdentKey {
    fn eq(&self, other: &Self) -> bool {
        self.get() == other.get()
    }
}

impl core::hash::Hash for IdentKey {
    fn hash<H: core::hash::Hasher>(&self, state: &mut H) {
        self.get().hash(state)
    }
}

impl IdentKey {
    pub fn get(&self) -> &str {
        match self {
            Self::Arc(s) => s.get(),
            Self::Static(s) => s,
        }
    }
}

impl fmt::Display for IdentKey {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.get())
    }
}

impl From<SubStr> for IdentKey {
    fn from(s: SubStr) -> Self {
        Self::Arc(s)
    }
}

impl From<&'static str> for IdentKey {
    fn from(s: &'static str) -> Self {
        Self::Static(s)
    }
}

pub type Idents = HashMap<IdentKey, Ident>;

#[derive(Clone, Debug)]
pub enum ExprTyp {
    Val(Number),
    Var(Var),
    Neg(Box<Expr>),
    Binary {
        op: OperatorTyp,
        lhs: Box<Expr>,
        rhs: Box<Expr>,
    },
    Call {
        fun: Fun,
        arg: Box<Expr>,
    },
}

#[derive(Clone, Debug)]
pub struct Expr {
    pub typ: ExprTyp,
    pub loc: SubStr,
}

impl Expr {
    pub fn binary(op: OperatorTyp, lhs: Expr, rhs: Expr) -> Self {
        let loc = lhs.loc.merge(&rhs.loc);
        Self {
            typ: ExprTyp::Binary {
                op,
                lhs: Box::new(lhs),
                rhs: Box::new(rhs),
            },
            loc,
        }
    }

    pub fn eval(&self, vars: Bindings) -> Result<Number, EvalErr> {
        match &self.typ {
            ExprTyp::Val(val) => Ok(*val),
            ExprTyp::Var(Var::X) => Ok(vars.x),
            ExprTyp::Var(Var::Y) => Ok(vars.y),
            ExprTyp::Neg(inner) => Ok(-inner.eval(vars)?),
            ExprTyp::Binary { op, lhs, rhs } => {
                let lhs = lhs.eval(vars)?;
                let rhs = rhs.eval(vars)?;
                op.apply(lhs, rhs, &self.loc)
            }
            ExprTyp::Call { fun, arg } => Ok((fun.fun)(arg.eval(vars)?)),
        }
    }
}

impl fmt::Display for Expr {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match &self.typ {
            ExprTyp::Val(val) => write!(f, "{val}"),
            ExprTyp::Var(var) => f.write_str(var.name()),
            ExprTyp::Neg(inner) => write!(f, "(-{inner})"),
            ExprTyp::Binary { op, lhs, rhs } => write!(f, "({lhs} {} {rhs})", op.symbol()),
            ExprTyp::Call { fun, arg } => write!(f, "{}({arg})", fun.name),
        }
    }
}

/// Values bound to the variables for one evaluation.
pub type Bindings = crate::Point<Number>;

#[derive(Clone, Copy, Debug, PartialEq, Eq, Hash)]
pub enum EvalErrTyp {
    DivisionByZero,
}

#[derive(Clone, Debug, PartialEq, Eq)]
pub struct EvalErr {
    pub typ: EvalErrTyp,
    pub loc: SubStr,
}

impl fmt::Display for EvalErr {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self.typ {
            EvalErrTyp::DivisionByZero => write!(f, "division by zero in '{}'", self.loc.get()),
        }
    }
}

impl std::error::Error for EvalErr {}

#[derive(Clone, Copy, Debug, PartialEq, Eq, Hash)]
pub enum Mode {
    /// `x` only.
    X,
    /// `x` and `y`.
    XY,
}

/// A compiled formula. Immutable once built, so it may be evaluated from any
/// number of threads at once.
#[derive(Clone, Debug)]
pub struct Expression {
    src: Arc<String>,
    root: Expr,
    mode: Mode,
}

impl Expression {
    pub fn compile(text: &str) -> Result<Self, ParseErr> {
        Self::compile_with(text, Mode::X)
    }

    pub fn compile_xy(text: &str) -> Result<Self, ParseErr> {
        Self::compile_with(text, Mode::XY)
    }

    pub fn compile_with(text: &str, mode: Mode) -> Result<Self, ParseErr> {
        let src = Arc::new(String::from(text.trim()));
        let idents = match mode {
            Mode::X => stdlib::standard_idents(),
            Mode::XY => stdlib::standard_idents_xy(),
        };
        let root = parse::parse(Lexer::new(&src), idents)?;
        Ok(Self { src, root, mode })
    }

    pub fn text(&self) -> &str {
        &self.src
    }

    pub fn src(&self) -> Arc<String> {
        Arc::clone(&self.src)
    }

    pub const fn root(&self) -> &Expr {
        &self.root
    }

    pub const fn mode(&self) -> Mode {
        self.mode
    }

    #[inline]
    pub fn eval(&self, x: Number) -> Result<Number, EvalErr> {
        self.root.eval(Bindings { x, y: Number::NAN })
    }

    #[inline]
    pub fn eval_xy(&self, x: Number, y: Number) -> Result<Number, EvalErr> {
        self.root.eval(Bindings { x, y })
    }

    /// Evaluate at `x`, folding evaluation errors into NaN for callers that
    /// only care whether the sample is usable.
    #[inline]
    pub fn sample(&self, x: Number) -> Number {
        self.eval(x).unwrap_or(Number::NAN)
    }
}

impl fmt::Display for Expression {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(&self.src)
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    fn eval(src: &str, x: Number) -> Number {
        Expression::compile(src)
            .unwrap_or_else(|err| panic!("{src}: {}", err.typ))
            .eval(x)
            .unwrap_or_else(|err| panic!("{src}: {err}"))
    }

    fn close(a: Number, b: Number) -> bool {
        (a - b).abs() <= 1e-9 * b.abs().max(1.0)
    }

    #[test]
    fn arithmetic() {
        assert!(close(eval("x^2", 3.0), 9.0));
        assert!(close(eval("1 + 2 * 3 - 4 / 2", 0.0), 5.0));
        assert!(close(eval("(1 + 2) * 3", 0.0), 9.0));
        assert!(close(eval("8 / 4 / 2", 0.0), 1.0));
        assert!(close(eval("10 - 4 - 3", 0.0), 3.0));
    }

    #[test]
    fn power_is_right_associative() {
        assert!(close(eval("2^3^2", 0.0), 512.0));
        assert!(close(eval("2^-1", 0.0), 0.5));
    }

    #[test]
    fn unary_minus_binds_looser_than_power() {
        assert!(close(eval("-x^2", 3.0), -9.0));
        assert!(close(eval("--x", 3.0), 3.0));
        assert!(close(eval("+x", 3.0), 3.0));
    }

    #[test]
    fn implicit_multiplication() {
        assert!(close(eval("2x+1", 5.0), 11.0));
        assert!(close(eval("2(3+4)", 0.0), 14.0));
        assert!(close(eval("3x^2", 2.0), 12.0));
        assert!(close(eval("(x+1)(x-1)", 3.0), 8.0));
        let x: Number = 0.7;
        let expected = 2.0 * x * (x + 1.0) * x.sin();
        assert!(close(eval("2x(x+1)sin(x)", x), expected));
    }

    #[test]
    fn functions_and_constants() {
        assert!(close(eval("sin(x)+cos(x)", 0.0), 1.0));
        assert!(close(eval("sqrt(16)", 0.0), 4.0));
        assert!(close(eval("cbrt(-27)", 0.0), -3.0));
        assert!(close(eval("log(1000)", 0.0), 3.0));
        assert!(close(eval("ln(e)", 0.0), 1.0));
        assert!(close(eval("log2(8)", 0.0), 3.0));
        assert!(close(eval("abs(-2.5)", 0.0), 2.5));
        assert!(close(eval("floor(1.7) + ceil(1.2) + round(2.5)", 0.0), 6.0));
        assert!(close(eval("deg(pi)", 0.0), 180.0));
        assert!(close(eval("rad(180)", 0.0), core::f64::consts::PI));
        assert!(close(eval("2pi", 0.0), core::f64::consts::TAU));
    }

    #[test]
    fn identifier_splitting() {
        assert!(close(eval("xsin(x)", 2.0), 2.0 * 2.0_f64.sin()));
        assert!(close(eval("pix", 2.0), 2.0 * core::f64::consts::PI));
    }

    #[test]
    fn division_by_zero_is_an_error() {
        let expr = Expression::compile("1/(x-x)").expect("compiles");
        let err = expr.eval(5.0).expect_err("divides by zero");
        assert_eq!(err.typ, EvalErrTyp::DivisionByZero);
        assert!(expr.sample(5.0).is_nan());
    }

    #[test]
    fn non_finite_results_are_values() {
        assert!(eval("sqrt(x)", -1.0).is_nan());
        assert!(eval("(-8)^(1/3)", 0.0).is_nan());
        assert!(eval("inf", 0.0).is_infinite());
        assert!(eval("ln(x)", 0.0).is_infinite());
    }

    #[test]
    fn two_variables() {
        let expr = Expression::compile_xy("x^2 + 2y").expect("compiles");
        assert!(close(expr.eval_xy(3.0, 4.0).expect("evaluates"), 17.0));
        assert!(Expression::compile("x + y").is_err());
    }

    #[test]
    fn display_is_fully_parenthesized() {
        let expr = Expression::compile("2x+1").expect("compiles");
        assert_eq!(expr.root().to_string(), "((2 * x) + 1)");
        assert_eq!(expr.to_string(), "2x+1");
    }
}
