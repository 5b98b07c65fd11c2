//! The recording wrapper.
//!
//! [`AD<B>`] pairs a value with a [`Slot`]. Arithmetic always evaluates the
//! value immediately; when an operand is a variable of the tape being
//! recorded on this thread, the operation is also appended to that tape.

use std::fmt::{self, Display};

use crate::base::Base;
use crate::error::Result;
use crate::opcode::{eval_binary, eval_unary, BinaryOp, UnaryOp};
use crate::tape::thread_local::{active_tape_id, with_active_tape};
use crate::value::CmpOp;

/// Where an [`AD`] value lives.
#[derive(Clone, Copy, Debug, PartialEq, Eq, Hash)]
pub enum Slot {
    /// A parameter: a plain value with nothing on any tape.
    Inline,
    /// Variable `index` of the recording with id `tape`.
    TapeRef { tape: u32, index: u32 },
}

/// A value that records the operations applied to it.
///
/// An `AD` referring to a tape other than the active one behaves as a
/// parameter.
#[derive(Clone, Debug)]
pub struct AD<B: Base> {
    pub(crate) value: B,
    pub(crate) slot: Slot,
}

impl<B: Base> AD<B> {
    /// A parameter (not tracked on any tape).
    #[inline]
    pub fn parameter(value: B) -> Self {
        AD {
            value,
            slot: Slot::Inline,
        }
    }

    /// Same as [`AD::parameter`].
    #[inline]
    pub fn new(value: B) -> Self {
        Self::parameter(value)
    }

    #[inline]
    pub(crate) fn from_slot(value: B, slot: Slot) -> Self {
        AD { value, slot }
    }

    /// The order-zero value.
    #[inline]
    pub fn value(&self) -> &B {
        &self.value
    }

    #[inline]
    pub fn into_value(self) -> B {
        self.value
    }

    #[inline]
    pub fn slot(&self) -> Slot {
        self.slot
    }

    /// Whether this is a variable of the tape being recorded on this thread.
    pub fn is_variable(&self) -> bool {
        active_tape_id::<B>().is_some_and(|t| self.index_on(t).is_some())
    }

    /// Variable index on tape `tape`, if this value lives there.
    #[inline]
    pub(crate) fn index_on(&self, tape: u32) -> Option<u32> {
        match self.slot {
            Slot::TapeRef { tape: t, index } if t == tape => Some(index),
            _ => None,
        }
    }

    pub(crate) fn unary(&self, op: UnaryOp) -> Self {
        let value = eval_unary(op, &self.value);
        let slot = with_active_tape::<B, _>(|t| {
            self.index_on(t.id).map(|arg| Slot::TapeRef {
                tape: t.id,
                index: t.push_unary(op, arg, value.clone()),
            })
        })
        .flatten()
        .unwrap_or(Slot::Inline);
        AD { value, slot }
    }

    pub(crate) fn binary(&self, op: BinaryOp, other: &Self) -> Result<Self> {
        let value = eval_binary(op, &self.value, &other.value)?;
        let slot = with_active_tape::<B, _>(|t| {
            let (a, b) = (self.index_on(t.id), other.index_on(t.id));
            if a.is_none() && b.is_none() {
                return Slot::Inline;
            }
            let a = match a {
                Some(a) => a,
                None => t.push_const(self.value.clone()),
            };
            let b = match b {
                Some(b) => b,
                None => t.push_const(other.value.clone()),
            };
            Slot::TapeRef {
                tape: t.id,
                index: t.push_binary(op, a, b, value.clone()),
            }
        })
        .unwrap_or(Slot::Inline);
        Ok(AD { value, slot })
    }

    pub fn try_add(&self, other: &Self) -> Result<Self> {
        self.binary(BinaryOp::Add, other)
    }

    pub fn try_sub(&self, other: &Self) -> Result<Self> {
        self.binary(BinaryOp::Sub, other)
    }

    pub fn try_mul(&self, other: &Self) -> Result<Self> {
        self.binary(BinaryOp::Mul, other)
    }

    pub fn try_div(&self, other: &Self) -> Result<Self> {
        self.binary(BinaryOp::Div, other)
    }

    pub fn exp(&self) -> Self {
        self.unary(UnaryOp::Exp)
    }

    pub fn ln(&self) -> Self {
        self.unary(UnaryOp::Ln)
    }

    pub fn sqrt(&self) -> Self {
        self.unary(UnaryOp::Sqrt)
    }

    pub fn sin(&self) -> Self {
        self.unary(UnaryOp::Sin)
    }

    pub fn cos(&self) -> Self {
        self.unary(UnaryOp::Cos)
    }

    pub fn abs(&self) -> Self {
        self.unary(UnaryOp::Abs)
    }

    /// Compare the order-zero values elementwise. Nothing is recorded.
    pub fn compare(&self, op: CmpOp, other: &Self) -> Result<bool> {
        self.value.compare(op, &other.value)
    }

    /// The larger of `self` and `other`.
    ///
    /// The choice is made once, on the recorded values: a tape replayed at a
    /// point where the other operand is larger keeps returning the recorded
    /// operand and its derivative. Re-record when the branch may change.
    /// For arrays, `self` is chosen only if it is `>=` in every element.
    pub fn max(&self, other: &Self) -> Result<Self> {
        Ok(if self.compare(CmpOp::Ge, other)? {
            self.clone()
        } else {
            other.clone()
        })
    }

    /// The smaller of `self` and `other`. Frozen at recording time like
    /// [`AD::max`].
    pub fn min(&self, other: &Self) -> Result<Self> {
        Ok(if self.compare(CmpOp::Le, other)? {
            self.clone()
        } else {
            other.clone()
        })
    }

    /// `self` limited to `[lo, hi]`. Frozen at recording time like
    /// [`AD::max`].
    pub fn clip(&self, lo: &Self, hi: &Self) -> Result<Self> {
        self.max(lo)?.min(hi)
    }
}

impl<B: Base> From<B> for AD<B> {
    fn from(value: B) -> Self {
        AD::parameter(value)
    }
}

impl<B: Base + Default> Default for AD<B> {
    fn default() -> Self {
        AD::parameter(B::default())
    }
}

impl<B: Base + Display> Display for AD<B> {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "{}", self.value)
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::value::Value;

    #[test]
    fn parameters_are_not_recorded() {
        let a = AD::parameter(2.0_f64);
        let b = AD::parameter(3.0_f64);
        let c = a.try_mul(&b).unwrap().exp();
        assert_eq!(c.slot(), Slot::Inline);
        assert_eq!(*c.value(), 6.0_f64.exp());
    }

    #[test]
    fn max_picks_by_value() {
        let a = AD::parameter(Value::array(vec![1.0_f64, 5.0]));
        let b = AD::parameter(Value::scalar(0.0));
        assert_eq!(a.max(&b).unwrap().value(), a.value());
        assert_eq!(a.min(&b).unwrap().value(), b.value());
        let c = AD::parameter(Value::scalar(3.0));
        // Not >= in every element, so `c` wins.
        assert_eq!(a.max(&c).unwrap().value(), c.value());
    }

    #[test]
    fn shape_errors_surface() {
        let a = AD::parameter(Value::array(vec![1.0_f64, 2.0]));
        let b = AD::parameter(Value::array(vec![1.0_f64, 2.0, 3.0]));
        assert!(a.try_add(&b).is_err());
    }
}
