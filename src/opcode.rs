//! Elementary operation codes recorded on the tape.
//!
//! Each opcode is evaluated by [`eval_unary`] / [`eval_binary`] at order
//! zero. Higher-order forward and reverse rules live in
//! [`taylor_ops`](crate::taylor_ops).

use num_traits::{Float, One, Zero};

use crate::base::Base;
use crate::error::Result;

/// Single-argument elementary operations.
#[derive(Clone, Copy, Debug, PartialEq, Eq, Hash)]
pub enum UnaryOp {
    Neg,
    Exp,
    Ln,
    Sqrt,
    Sin,
    Cos,
    /// Derivative is `sign(x)`, re-evaluated at every replay.
    Abs,
}

/// Two-argument elementary operations.
#[derive(Clone, Copy, Debug, PartialEq, Eq, Hash)]
pub enum BinaryOp {
    Add,
    Sub,
    Mul,
    Div,
}

impl UnaryOp {
    pub fn name(self) -> &'static str {
        match self {
            UnaryOp::Neg => "neg",
            UnaryOp::Exp => "exp",
            UnaryOp::Ln => "ln",
            UnaryOp::Sqrt => "sqrt",
            UnaryOp::Sin => "sin",
            UnaryOp::Cos => "cos",
            UnaryOp::Abs => "abs",
        }
    }
}

impl BinaryOp {
    pub fn name(self) -> &'static str {
        match self {
            BinaryOp::Add => "add",
            BinaryOp::Sub => "sub",
            BinaryOp::Mul => "mul",
            BinaryOp::Div => "div",
        }
    }
}

/// Elementwise sign with `sign(0) = 0`.
#[inline]
pub(crate) fn sign<T: Float>(x: T) -> T {
    if x > T::zero() {
        T::one()
    } else if x < T::zero() {
        -T::one()
    } else {
        T::zero()
    }
}

/// Evaluate a unary opcode at order zero.
#[inline]
pub fn eval_unary<B: Base>(op: UnaryOp, a: &B) -> B {
    match op {
        UnaryOp::Neg => a.negate(),
        UnaryOp::Exp => a.map(|x| x.exp()),
        UnaryOp::Ln => a.map(|x| x.ln()),
        UnaryOp::Sqrt => a.map(|x| x.sqrt()),
        UnaryOp::Sin => a.map(|x| x.sin()),
        UnaryOp::Cos => a.map(|x| x.cos()),
        UnaryOp::Abs => a.map(|x| x.abs()),
    }
}

/// Evaluate a binary opcode at order zero.
#[inline]
pub fn eval_binary<B: Base>(op: BinaryOp, a: &B, b: &B) -> Result<B> {
    match op {
        BinaryOp::Add => a.try_add(b),
        BinaryOp::Sub => a.try_sub(b),
        BinaryOp::Mul => a.try_mul(b),
        BinaryOp::Div => a.try_div(b),
    }
}

/// `j / k` as an element value.
#[inline]
pub(crate) fn ratio<B: Base>(j: usize, k: usize) -> B::Elem {
    let j = <B::Elem as num_traits::NumCast>::from(j).unwrap_or_else(B::Elem::zero);
    let k = <B::Elem as num_traits::NumCast>::from(k).unwrap_or_else(B::Elem::one);
    j / k
}
