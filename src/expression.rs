//! Rate and condition expressions.
//!
//! Two small ASTs: [`Expr`] produces numbers (reaction rates), [`Condition`]
//! produces booleans (firing conditions). Both are evaluated by a plain
//! recursive walk against a live [`Context`]; nothing is cached, so a rate
//! that reads molecule counts changes as soon as the counts do.

use crate::context::Context;
use std::ops::{Add, Div, Mul, Neg, Not, Sub};
use std::sync::Arc;

/// Single-argument numeric operations.
#[derive(Clone, Copy, Debug, PartialEq, Eq)]
pub enum UnaryOp {
    Neg,
    Abs,
    Sign,
    Exp,
    Ln,
    Log2,
    Log10,
    Sqrt,
    Cbrt,
    Sin,
    Cos,
    Tan,
    Asin,
    Acos,
    Atan,
    Sinh,
    Cosh,
    Tanh,
}

impl UnaryOp {
    /// Looks up a function by the name a front end would use for it.
    pub fn from_name(name: &str) -> Option<Self> {
        let op = match name {
            "abs" => Self::Abs,
            "sgn" | "sign" => Self::Sign,
            "exp" => Self::Exp,
            "ln" => Self::Ln,
            "log2" => Self::Log2,
            "log10" => Self::Log10,
            "sqrt" => Self::Sqrt,
            "cbrt" => Self::Cbrt,
            "sin" => Self::Sin,
            "cos" => Self::Cos,
            "tan" => Self::Tan,
            "asin" => Self::Asin,
            "acos" => Self::Acos,
            "atan" => Self::Atan,
            "sinh" => Self::Sinh,
            "cosh" => Self::Cosh,
            "tanh" => Self::Tanh,
            _ => return None,
        };
        Some(op)
    }

    #[inline]
    pub fn apply(self, value: f64) -> f64 {
        match self {
            Self::Neg => -value,
            Self::Abs => value.abs(),
            // 0 maps to 0, unlike f64::signum
            Self::Sign => {
                if value > 0.0 {
                    1.0
                } else if value < 0.0 {
                    -1.0
                } else {
                    0.0
                }
            }
            Self::Exp => value.exp(),
            Self::Ln => value.ln(),
            Self::Log2 => value.log2(),
            Self::Log10 => value.log10(),
            Self::Sqrt => value.sqrt(),
            Self::Cbrt => value.cbrt(),
            Self::Sin => value.sin(),
            Self::Cos => value.cos(),
            Self::Tan => value.tan(),
            Self::Asin => value.asin(),
            Self::Acos => value.acos(),
            Self::Atan => value.atan(),
            Self::Sinh => value.sinh(),
            Self::Cosh => value.cosh(),
            Self::Tanh => value.tanh(),
        }
    }
}

/// Two-argument numeric operations.
#[derive(Clone, Copy, Debug, PartialEq, Eq)]
pub enum BinaryOp {
    Add,
    Sub,
    Mul,
    Div,
    Pow,
    /// `log(base, value)`
    Log,
}

impl BinaryOp {
    #[inline]
    pub fn apply(self, lhs: f64, rhs: f64) -> f64 {
        match self {
            Self::Add => lhs + rhs,
            Self::Sub => lhs - rhs,
            Self::Mul => lhs * rhs,
            Self::Div => lhs / rhs,
            Self::Pow => lhs.powf(rhs),
            Self::Log => rhs.ln() / lhs.ln(),
        }
    }
}

/// Numeric comparisons producing a [`Condition`].
#[derive(Clone, Copy, Debug, PartialEq, Eq)]
pub enum CompareOp {
    Lt,
    Le,
    Gt,
    Ge,
    Eq,
    Ne,
}

impl CompareOp {
    #[inline]
    pub fn apply(self, lhs: f64, rhs: f64) -> bool {
        let equal = (lhs - rhs).abs() < f64::EPSILON;
        match self {
            Self::Lt => lhs < rhs,
            Self::Le => lhs < rhs || equal,
            Self::Gt => lhs > rhs,
            Self::Ge => lhs > rhs || equal,
            Self::Eq => equal,
            Self::Ne => !equal,
        }
    }
}

/// Numeric expression used for reaction rates.
#[derive(Clone, Debug)]
pub enum Expr {
    Constant(f64),
    /// Current count of a molecule inside the agent.
    Molecule(String),
    /// Environment concentration at the agent's coordinates; 0 if unknown.
    Environment(String),
    /// Simulation parameter; falls back to `default`, then to 0.
    Parameter { name: String, default: Option<f64> },
    Unary(UnaryOp, Box<Expr>),
    Binary(BinaryOp, Box<Expr>, Box<Expr>),
    /// `value^exponent / (value^exponent + half^exponent)`
    Hill {
        value: Box<Expr>,
        half: Box<Expr>,
        exponent: Box<Expr>,
    },
    /// Named function shared through the network.
    Function(String, Arc<Expr>),
}

impl Expr {
    pub fn constant(value: f64) -> Self {
        Self::Constant(value)
    }

    pub fn molecule(name: impl Into<String>) -> Self {
        Self::Molecule(name.into())
    }

    pub fn environment(name: impl Into<String>) -> Self {
        Self::Environment(name.into())
    }

    pub fn parameter(name: impl Into<String>) -> Self {
        Self::Parameter {
            name: name.into(),
            default: None,
        }
    }

    pub fn parameter_or(name: impl Into<String>, default: f64) -> Self {
        Self::Parameter {
            name: name.into(),
            default: Some(default),
        }
    }

    pub fn unary(op: UnaryOp, arg: impl Into<Expr>) -> Self {
        Self::Unary(op, Box::new(arg.into()))
    }

    pub fn binary(op: BinaryOp, lhs: impl Into<Expr>, rhs: impl Into<Expr>) -> Self {
        Self::Binary(op, Box::new(lhs.into()), Box::new(rhs.into()))
    }

    pub fn hill(value: impl Into<Expr>, half: impl Into<Expr>, exponent: impl Into<Expr>) -> Self {
        Self::Hill {
            value: Box::new(value.into()),
            half: Box::new(half.into()),
            exponent: Box::new(exponent.into()),
        }
    }

    pub fn pow(self, exponent: impl Into<Expr>) -> Self {
        Self::binary(BinaryOp::Pow, self, exponent)
    }

    pub fn lt(self, rhs: impl Into<Expr>) -> Condition {
        Condition::compare(CompareOp::Lt, self, rhs)
    }

    pub fn le(self, rhs: impl Into<Expr>) -> Condition {
        Condition::compare(CompareOp::Le, self, rhs)
    }

    pub fn gt(self, rhs: impl Into<Expr>) -> Condition {
        Condition::compare(CompareOp::Gt, self, rhs)
    }

    pub fn ge(self, rhs: impl Into<Expr>) -> Condition {
        Condition::compare(CompareOp::Ge, self, rhs)
    }

    pub fn equals(self, rhs: impl Into<Expr>) -> Condition {
        Condition::compare(CompareOp::Eq, self, rhs)
    }

    pub fn not_equals(self, rhs: impl Into<Expr>) -> Condition {
        Condition::compare(CompareOp::Ne, self, rhs)
    }

    pub fn eval(&self, ctx: &Context<'_>) -> f64 {
        match self {
            Self::Constant(value) => *value,
            Self::Molecule(name) => ctx.molecule_count(name) as f64,
            Self::Environment(name) => ctx.concentration(name),
            Self::Parameter { name, default } => ctx
                .parameter(name)
                .unwrap_or_else(|| default.unwrap_or(0.0)),
            Self::Unary(op, arg) => op.apply(arg.eval(ctx)),
            Self::Binary(op, lhs, rhs) => op.apply(lhs.eval(ctx), rhs.eval(ctx)),
            Self::Hill {
                value,
                half,
                exponent,
            } => {
                let n = exponent.eval(ctx);
                let power = value.eval(ctx).powf(n);
                let denom = power + half.eval(ctx).powf(n);
                if denom == 0.0 { 0.0 } else { power / denom }
            }
            Self::Function(_, body) => body.eval(ctx),
        }
    }

    /// Names of all molecules whose counts this expression reads.
    pub fn molecule_refs(&self) -> Vec<&str> {
        let mut refs = Vec::new();
        self.collect_molecules(&mut refs);
        refs
    }

    /// Whether the value depends on the environment or on parameters.
    pub fn reads_external(&self) -> bool {
        match self {
            Self::Constant(_) | Self::Molecule(_) => false,
            Self::Environment(_) | Self::Parameter { .. } => true,
            Self::Unary(_, arg) => arg.reads_external(),
            Self::Binary(_, lhs, rhs) => lhs.reads_external() || rhs.reads_external(),
            Self::Hill {
                value,
                half,
                exponent,
            } => value.reads_external() || half.reads_external() || exponent.reads_external(),
            Self::Function(_, body) => body.reads_external(),
        }
    }

    fn collect_molecules<'e>(&'e self, refs: &mut Vec<&'e str>) {
        match self {
            Self::Constant(_) | Self::Environment(_) | Self::Parameter { .. } => {}
            Self::Molecule(name) => push_unique(refs, name),
            Self::Unary(_, arg) => arg.collect_molecules(refs),
            Self::Binary(_, lhs, rhs) => {
                lhs.collect_molecules(refs);
                rhs.collect_molecules(refs);
            }
            Self::Hill {
                value,
                half,
                exponent,
            } => {
                value.collect_molecules(refs);
                half.collect_molecules(refs);
                exponent.collect_molecules(refs);
            }
            Self::Function(_, body) => body.collect_molecules(refs),
        }
    }
}

impl From<f64> for Expr {
    fn from(value: f64) -> Self {
        Self::Constant(value)
    }
}

impl<R: Into<Expr>> Add<R> for Expr {
    type Output = Expr;

    fn add(self, rhs: R) -> Expr {
        Expr::binary(BinaryOp::Add, self, rhs)
    }
}

impl<R: Into<Expr>> Sub<R> for Expr {
    type Output = Expr;

    fn sub(self, rhs: R) -> Expr {
        Expr::binary(BinaryOp::Sub, self, rhs)
    }
}

impl<R: Into<Expr>> Mul<R> for Expr {
    type Output = Expr;

    fn mul(self, rhs: R) -> Expr {
        Expr::binary(BinaryOp::Mul, self, rhs)
    }
}

impl<R: Into<Expr>> Div<R> for Expr {
    type Output = Expr;

    fn div(self, rhs: R) -> Expr {
        Expr::binary(BinaryOp::Div, self, rhs)
    }
}

impl Neg for Expr {
    type Output = Expr;

    fn neg(self) -> Expr {
        Expr::unary(UnaryOp::Neg, self)
    }
}

/// Boolean expression used to gate reactions.
#[derive(Clone, Debug)]
pub enum Condition {
    Literal(bool),
    Compare(CompareOp, Box<Expr>, Box<Expr>),
    And(Box<Condition>, Box<Condition>),
    Or(Box<Condition>, Box<Condition>),
    Not(Box<Condition>),
    /// `count(name) > 0`
    Present(String),
    /// Named condition shared through the network.
    Function(String, Arc<Condition>),
}

impl Condition {
    pub fn compare(op: CompareOp, lhs: impl Into<Expr>, rhs: impl Into<Expr>) -> Self {
        Self::Compare(op, Box::new(lhs.into()), Box::new(rhs.into()))
    }

    pub fn present(name: impl Into<String>) -> Self {
        Self::Present(name.into())
    }

    pub fn and(self, rhs: Condition) -> Self {
        Self::And(Box::new(self), Box::new(rhs))
    }

    pub fn or(self, rhs: Condition) -> Self {
        Self::Or(Box::new(self), Box::new(rhs))
    }

    pub fn eval(&self, ctx: &Context<'_>) -> bool {
        match self {
            Self::Literal(value) => *value,
            Self::Compare(op, lhs, rhs) => op.apply(lhs.eval(ctx), rhs.eval(ctx)),
            Self::And(lhs, rhs) => lhs.eval(ctx) && rhs.eval(ctx),
            Self::Or(lhs, rhs) => lhs.eval(ctx) || rhs.eval(ctx),
            Self::Not(inner) => !inner.eval(ctx),
            Self::Present(name) => ctx.molecule_count(name) > 0,
            Self::Function(_, body) => body.eval(ctx),
        }
    }

    pub fn molecule_refs(&self) -> Vec<&str> {
        let mut refs = Vec::new();
        self.collect_molecules(&mut refs);
        refs
    }

    pub fn reads_external(&self) -> bool {
        match self {
            Self::Literal(_) | Self::Present(_) => false,
            Self::Compare(_, lhs, rhs) => lhs.reads_external() || rhs.reads_external(),
            Self::And(lhs, rhs) | Self::Or(lhs, rhs) => {
                lhs.reads_external() || rhs.reads_external()
            }
            Self::Not(inner) => inner.reads_external(),
            Self::Function(_, body) => body.reads_external(),
        }
    }

    fn collect_molecules<'e>(&'e self, refs: &mut Vec<&'e str>) {
        match self {
            Self::Literal(_) => {}
            Self::Compare(_, lhs, rhs) => {
                lhs.collect_molecules(refs);
                rhs.collect_molecules(refs);
            }
            Self::And(lhs, rhs) | Self::Or(lhs, rhs) => {
                lhs.collect_molecules(refs);
                rhs.collect_molecules(refs);
            }
            Self::Not(inner) => inner.collect_molecules(refs),
            Self::Present(name) => push_unique(refs, name),
            Self::Function(_, body) => body.collect_molecules(refs),
        }
    }
}

impl From<bool> for Condition {
    fn from(value: bool) -> Self {
        Self::Literal(value)
    }
}

impl Not for Condition {
    type Output = Condition;

    fn not(self) -> Condition {
        Condition::Not(Box::new(self))
    }
}

fn push_unique<'e>(refs: &mut Vec<&'e str>, name: &'e str) {
    if !refs.contains(&name) {
        refs.push(name);
    }
}
