// SPDX: CC0-1.0

use crate::{
    lex::SymbolId,
    stdlib::{self, Intrinsic},
    Number,
};
use core::fmt;
use std::sync::Arc;

/// Binding strength of an operator, weakest first.
#[derive(Clone, Copy, Debug, PartialEq, Eq, PartialOrd, Ord, Hash)]
pub enum Precedence {
    Where,
    Ternary,
    Or,
    And,
    Comparison,
    AddSub,
    MulDiv,
    Power,
    Unary,
    Atom,
}

impl Precedence {
    pub const fn next(self) -> Self {
        match self {
            Self::Where => Self::Ternary,
            Self::Ternary => Self::Or,
            Self::Or => Self::And,
            Self::And => Self::Comparison,
            Self::Comparison => Self::AddSub,
            Self::AddSub => Self::MulDiv,
            Self::MulDiv => Self::Power,
            Self::Power => Self::Unary,
            Self::Unary | Self::Atom => Self::Atom,
        }
    }
}

#[derive(Clone, Copy, Debug, PartialEq, Eq, Hash)]
pub enum Associativity {
    Left,
    Right,
}

#[derive(Clone, Copy, Debug, PartialEq, Eq, Hash)]
pub enum UnaryOp {
    Neg,
    Not,
}

impl UnaryOp {
    pub const fn from_symbol(sym: SymbolId) -> Option<Self> {
        match sym {
            SymbolId::Minus => Some(Self::Neg),
            SymbolId::Not => Some(Self::Not),
            _ => None,
        }
    }

    pub const fn symbol(&self) -> &'static str {
        match self {
            Self::Neg => "-",
            Self::Not => "!",
        }
    }

    pub fn apply(&self, x: Number) -> Number {
        match self {
            Self::Neg => -x,
            Self::Not => stdlib::from_bool(!stdlib::to_bool(x)),
        }
    }
}

#[derive(Clone, Copy, Debug, PartialEq, Eq, Hash)]
pub enum BinaryOp {
    Add,
    Sub,
    Mul,
    Div,
    Rem,
    Pow,
    Eq,
    Ne,
    Lt,
    Le,
    Gt,
    Ge,
    And,
    Or,
}

impl BinaryOp {
    pub const fn from_symbol(sym: SymbolId) -> Option<Self> {
        let op = match sym {
            SymbolId::Plus => Self::Add,
            SymbolId::Minus => Self::Sub,
            SymbolId::Star => Self::Mul,
            SymbolId::Slash => Self::Div,
            SymbolId::Percent => Self::Rem,
            SymbolId::Caret => Self::Pow,
            SymbolId::Assign | SymbolId::Equal => Self::Eq,
            SymbolId::NotEqual => Self::Ne,
            SymbolId::Less => Self::Lt,
            SymbolId::LessEqual => Self::Le,
            SymbolId::Greater => Self::Gt,
            SymbolId::GreaterEqual => Self::Ge,
            SymbolId::And => Self::And,
            SymbolId::Or => Self::Or,
            _ => return None,
        };
        Some(op)
    }

    pub const fn symbol(&self) -> &'static str {
        match self {
            Self::Add => "+",
            Self::Sub => "-",
            Self::Mul => "*",
            Self::Div => "/",
            Self::Rem => "%",
            Self::Pow => "^",
            Self::Eq => "==",
            Self::Ne => "!=",
            Self::Lt => "<",
            Self::Le => "<=",
            Self::Gt => ">",
            Self::Ge => ">=",
            Self::And => "&&",
            Self::Or => "||",
        }
    }

    pub const fn precedence(&self) -> Precedence {
        match self {
            Self::Or => Precedence::Or,
            Self::And => Precedence::And,
            Self::Eq | Self::Ne | Self::Lt | Self::Le | Self::Gt | Self::Ge => {
                Precedence::Comparison
            }
            Self::Add | Self::Sub => Precedence::AddSub,
            Self::Mul | Self::Div | Self::Rem => Precedence::MulDiv,
            Self::Pow => Precedence::Power,
        }
    }

    pub const fn associativity(&self) -> Associativity {
        match self {
            Self::Pow => Associativity::Right,
            _ => Associativity::Left,
        }
    }

    pub fn apply(&self, a: Number, b: Number) -> Number {
        use stdlib::{from_bool, to_bool};
        match self {
            Self::Add => a + b,
            Self::Sub => a - b,
            Self::Mul => a * b,
            Self::Div => a / b,
            Self::Rem => a % b,
            Self::Pow => a.powf(b),
            Self::Eq => from_bool(a == b),
            Self::Ne => from_bool(a != b),
            Self::Lt => from_bool(a < b),
            Self::Le => from_bool(a <= b),
            Self::Gt => from_bool(a > b),
            Self::Ge => from_bool(a >= b),
            Self::And => from_bool(to_bool(a) && to_bool(b)),
            Self::Or => from_bool(to_bool(a) || to_bool(b)),
        }
    }
}

/// A function written by the user as `name(params) = body`.
///
/// Variables in the body index into the parameter list.
#[derive(Debug)]
pub struct UserFunction {
    pub name: String,
    pub params: Vec<String>,
    pub body: Arc<Expr>,
}

impl UserFunction {
    pub fn arity(&self) -> usize {
        self.params.len()
    }
}

impl fmt::Display for UserFunction {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(
            f,
            "{}({}) = {}",
            self.name,
            self.params.join(", "),
            self.body.display_with(&self.params[..])
        )
    }
}

#[derive(Clone, Debug)]
pub enum Callee {
    Intrinsic(Intrinsic),
    User(Arc<UserFunction>),
}

impl Callee {
    pub fn name(&self) -> &str {
        match self {
            Self::Intrinsic(fun) => fun.name(),
            Self::User(fun) => &fun.name,
        }
    }

    pub fn arity(&self) -> usize {
        match self {
            Self::Intrinsic(fun) => fun.arity(),
            Self::User(fun) => fun.arity(),
        }
    }

    fn is_equivalent(&self, other: &Self) -> bool {
        match (self, other) {
            (Self::Intrinsic(a), Self::Intrinsic(b)) => a == b,
            (Self::User(a), Self::User(b)) => {
                Arc::ptr_eq(a, b)
                    || (a.name == b.name
                        && a.arity() == b.arity()
                        && a.body.is_equivalent(&b.body))
            }
            _ => false,
        }
    }
}

#[derive(Clone, Debug)]
pub enum Expr {
    Const(Number),
    /// Index into the parameter values passed to [`Expr::eval`].
    Var(usize),
    Unary(UnaryOp, Arc<Expr>),
    Binary(BinaryOp, Arc<Expr>, Arc<Expr>),
    Call(Callee, Vec<Arc<Expr>>),
    /// `cond ? then : else`
    Ternary(Arc<Expr>, Arc<Expr>, Arc<Expr>),
    /// `inner, where cond`: NaN wherever `cond` is false.
    DomainLimit(Arc<Expr>, Arc<Expr>),
}

impl Expr {
    pub fn constant(val: Number) -> Arc<Self> {
        Arc::new(Self::Const(val))
    }

    pub fn var(idx: usize) -> Arc<Self> {
        Arc::new(Self::Var(idx))
    }

    pub fn unary(op: UnaryOp, operand: Arc<Self>) -> Arc<Self> {
        Arc::new(Self::Unary(op, operand))
    }

    pub fn binary(op: BinaryOp, left: Arc<Self>, right: Arc<Self>) -> Arc<Self> {
        Arc::new(Self::Binary(op, left, right))
    }

    pub fn call(callee: Callee, args: Vec<Arc<Self>>) -> Arc<Self> {
        debug_assert_eq!(callee.arity(), args.len());
        Arc::new(Self::Call(callee, args))
    }

    pub fn ternary(cond: Arc<Self>, then: Arc<Self>, other: Arc<Self>) -> Arc<Self> {
        Arc::new(Self::Ternary(cond, then, other))
    }

    pub fn domain_limit(inner: Arc<Self>, cond: Arc<Self>) -> Arc<Self> {
        Arc::new(Self::DomainLimit(inner, cond))
    }

    pub fn eval(&self, args: &[Number]) -> Number {
        match self {
            Self::Const(val) => *val,
            Self::Var(idx) => args.get(*idx).copied().unwrap_or(Number::NAN),
            Self::Unary(op, operand) => op.apply(operand.eval(args)),
            Self::Binary(op, left, right) => op.apply(left.eval(args), right.eval(args)),
            Self::Call(callee, call_args) => with_arg_values(call_args, args, |vals| match callee {
                Callee::Intrinsic(fun) => fun.call(vals),
                Callee::User(fun) => fun.body.eval(vals),
            }),
            Self::Ternary(cond, then, other) => {
                if stdlib::to_bool(cond.eval(args)) {
                    then.eval(args)
                } else {
                    other.eval(args)
                }
            }
            Self::DomainLimit(inner, cond) => {
                if stdlib::to_bool(cond.eval(args)) {
                    inner.eval(args)
                } else {
                    Number::NAN
                }
            }
        }
    }

    fn all_children(&self, mut pred: impl FnMut(&Arc<Expr>) -> bool) -> bool {
        match self {
            Self::Const(_) | Self::Var(_) => true,
            Self::Unary(_, operand) => pred(operand),
            Self::Binary(_, a, b) | Self::DomainLimit(a, b) => pred(a) && pred(b),
            Self::Call(_, args) => args.iter().all(|arg| pred(arg)),
            Self::Ternary(a, b, c) => pred(a) && pred(b) && pred(c),
        }
    }

    /// True if no variable is reachable, i.e. the value does not depend on
    /// the arguments to [`Expr::eval`].
    pub fn is_constant(&self) -> bool {
        match self {
            Self::Const(_) => true,
            Self::Var(_) => false,
            _ => self.all_children(|child| child.is_constant()),
        }
    }

    /// Folds constant subtrees. Unchanged subtrees are shared with `self`, and
    /// `self` itself is returned when nothing changed.
    pub fn simplify(self: &Arc<Self>) -> Arc<Self> {
        fn keep_or(orig: &Arc<Expr>, changed: bool, build: impl FnOnce() -> Expr) -> Arc<Expr> {
            if changed {
                Arc::new(build())
            } else {
                Arc::clone(orig)
            }
        }

        let simplified = match &**self {
            Self::Const(_) | Self::Var(_) => return Arc::clone(self),
            Self::Unary(op, operand) => {
                let new = operand.simplify();
                keep_or(self, !Arc::ptr_eq(operand, &new), || Self::Unary(*op, new))
            }
            Self::Binary(op, left, right) => {
                let (l, r) = (left.simplify(), right.simplify());
                let changed = !Arc::ptr_eq(left, &l) || !Arc::ptr_eq(right, &r);
                keep_or(self, changed, || Self::Binary(*op, l, r))
            }
            Self::Call(callee, args) => {
                let new: Vec<Arc<Self>> = args.iter().map(Self::simplify).collect();
                let changed = args.iter().zip(&new).any(|(a, b)| !Arc::ptr_eq(a, b));
                keep_or(self, changed, || Self::Call(callee.clone(), new))
            }
            Self::Ternary(cond, then, other) => {
                let (c, t, o) = (cond.simplify(), then.simplify(), other.simplify());
                let changed =
                    !Arc::ptr_eq(cond, &c) || !Arc::ptr_eq(then, &t) || !Arc::ptr_eq(other, &o);
                keep_or(self, changed, || Self::Ternary(c, t, o))
            }
            Self::DomainLimit(inner, cond) => {
                let (i, c) = (inner.simplify(), cond.simplify());
                let changed = !Arc::ptr_eq(inner, &i) || !Arc::ptr_eq(cond, &c);
                keep_or(self, changed, || Self::DomainLimit(i, c))
            }
        };

        // children are already folded, so a constant subtree shows up as
        // constant children
        if simplified.all_children(|child| matches!(**child, Self::Const(_))) {
            // NaN payloads are not kept
            let val = simplified.eval(&[]);
            Self::constant(if val.is_nan() { Number::NAN } else { val })
        } else {
            simplified
        }
    }

    /// Structural equality: same shape, same operators and functions, and
    /// bit-identical constants.
    pub fn is_equivalent(&self, other: &Expr) -> bool {
        if core::ptr::eq(self, other) {
            return true;
        }
        match (self, other) {
            (Self::Const(a), Self::Const(b)) => a.to_bits() == b.to_bits(),
            (Self::Var(a), Self::Var(b)) => a == b,
            (Self::Unary(op_a, a), Self::Unary(op_b, b)) => op_a == op_b && a.is_equivalent(b),
            (Self::Binary(op_a, la, ra), Self::Binary(op_b, lb, rb)) => {
                op_a == op_b && la.is_equivalent(lb) && ra.is_equivalent(rb)
            }
            (Self::Call(fa, args_a), Self::Call(fb, args_b)) => {
                fa.is_equivalent(fb)
                    && args_a.len() == args_b.len()
                    && args_a.iter().zip(args_b).all(|(a, b)| a.is_equivalent(b))
            }
            (Self::Ternary(ca, ta, oa), Self::Ternary(cb, tb, ob)) => {
                ca.is_equivalent(cb) && ta.is_equivalent(tb) && oa.is_equivalent(ob)
            }
            (Self::DomainLimit(ia, ca), Self::DomainLimit(ib, cb)) => {
                ia.is_equivalent(ib) && ca.is_equivalent(cb)
            }
            _ => false,
        }
    }

    pub fn precedence(&self) -> Precedence {
        match self {
            Self::Const(val) if val.is_sign_negative() && !val.is_nan() => Precedence::Unary,
            Self::Const(_) | Self::Var(_) | Self::Call(..) => Precedence::Atom,
            Self::Unary(..) => Precedence::Unary,
            Self::Binary(op, ..) => op.precedence(),
            Self::Ternary(..) => Precedence::Ternary,
            Self::DomainLimit(..) => Precedence::Where,
        }
    }

    /// Formats the tree as source text, naming variables after `names`.
    pub fn display_with<'a, S: AsRef<str>>(&'a self, names: &'a [S]) -> DisplayExpr<'a, S> {
        DisplayExpr { expr: self, names }
    }
}

fn with_arg_values<R>(
    call_args: &[Arc<Expr>],
    args: &[Number],
    f: impl FnOnce(&[Number]) -> R,
) -> R {
    const INLINE: usize = 4;
    if call_args.len() <= INLINE {
        let mut buf = [0.0; INLINE];
        for (slot, arg) in buf.iter_mut().zip(call_args) {
            *slot = arg.eval(args);
        }
        f(&buf[..call_args.len()])
    } else {
        let vals: Vec<Number> = call_args.iter().map(|arg| arg.eval(args)).collect();
        f(&vals)
    }
}

pub struct DisplayExpr<'a, S> {
    expr: &'a Expr,
    names: &'a [S],
}

impl<S: AsRef<str>> DisplayExpr<'_, S> {
    fn write(&self, f: &mut fmt::Formatter<'_>, expr: &Expr, min: Precedence) -> fmt::Result {
        let parens = expr.precedence() < min;
        if parens {
            f.write_str("(")?;
        }
        match expr {
            Expr::Const(val) => write!(f, "{val:?}")?,
            Expr::Var(idx) => match self.names.get(*idx) {
                Some(name) => f.write_str(name.as_ref())?,
                None => write!(f, "${idx}")?,
            },
            Expr::Unary(op, operand) => {
                f.write_str(op.symbol())?;
                self.write(f, operand, Precedence::Unary)?;
            }
            Expr::Binary(op, left, right) => {
                let prec = op.precedence();
                let (lmin, rmin) = match op.associativity() {
                    Associativity::Left => (prec, prec.next()),
                    Associativity::Right => (prec.next(), prec),
                };
                self.write(f, left, lmin)?;
                write!(f, " {} ", op.symbol())?;
                self.write(f, right, rmin)?;
            }
            Expr::Call(callee, args) => {
                write!(f, "{}(", callee.name())?;
                for (i, arg) in args.iter().enumerate() {
                    if i > 0 {
                        f.write_str(", ")?;
                    }
                    self.write(f, arg, Precedence::Ternary)?;
                }
                f.write_str(")")?;
            }
            Expr::Ternary(cond, then, other) => {
                self.write(f, cond, Precedence::Or)?;
                f.write_str(" ? ")?;
                self.write(f, then, Precedence::Or)?;
                f.write_str(" : ")?;
                self.write(f, other, Precedence::Ternary)?;
            }
            Expr::DomainLimit(inner, cond) => {
                self.write(f, inner, Precedence::Ternary)?;
                f.write_str(", where ")?;
                self.write(f, cond, Precedence::Ternary)?;
            }
        }
        if parens {
            f.write_str(")")?;
        }
        Ok(())
    }
}

impl<S: AsRef<str>> fmt::Display for DisplayExpr<'_, S> {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        self.write(f, self.expr, Precedence::Where)
    }
}

impl fmt::Display for Expr {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "{}", self.display_with(stdlib::VAR_NAMES))
    }
}
