//! Tagged scalar-or-array numeric value.
//!
//! [`Value<F>`] is either a single scalar or a fixed-length array. Binary
//! operations broadcast a scalar against an array; two arrays must have the
//! same length.

use std::fmt::{self, Display};
use std::ops::Neg;

use crate::error::{Error, Result};
use crate::float::Float;

/// A scalar or a fixed-length array of `F`.
///
/// Equality is structural: `Scalar(2.0)` and `Array(vec![2.0])` are different
/// values. Use [`Value::compare`] for elementwise, broadcasting comparisons.
#[derive(Clone, Debug, PartialEq)]
#[cfg_attr(feature = "serde", derive(serde::Serialize, serde::Deserialize))]
pub enum Value<F: Float> {
    Scalar(F),
    Array(Vec<F>),
}

/// Elementwise comparison operator.
#[derive(Clone, Copy, Debug, PartialEq, Eq, Hash)]
pub enum CmpOp {
    Eq,
    Ne,
    Lt,
    Le,
    Gt,
    Ge,
}

impl CmpOp {
    /// Apply the comparison to a pair of elements.
    #[inline]
    pub fn holds<F: PartialOrd>(self, a: F, b: F) -> bool {
        match self {
            CmpOp::Eq => a == b,
            CmpOp::Ne => a != b,
            CmpOp::Lt => a < b,
            CmpOp::Le => a <= b,
            CmpOp::Gt => a > b,
            CmpOp::Ge => a >= b,
        }
    }
}

impl<F: Float> Value<F> {
    #[inline]
    pub fn scalar(value: F) -> Self {
        Value::Scalar(value)
    }

    #[inline]
    pub fn array(values: Vec<F>) -> Self {
        Value::Array(values)
    }

    /// Array of `len` copies of `value`.
    pub fn filled(value: F, len: usize) -> Self {
        Value::Array(vec![value; len])
    }

    #[inline]
    pub fn is_scalar(&self) -> bool {
        matches!(self, Value::Scalar(_))
    }

    /// Number of elements. A scalar has length 1.
    #[inline]
    pub fn len(&self) -> usize {
        match self {
            Value::Scalar(_) => 1,
            Value::Array(v) => v.len(),
        }
    }

    /// True only for a zero-length array.
    #[inline]
    pub fn is_empty(&self) -> bool {
        matches!(self, Value::Array(v) if v.is_empty())
    }

    /// Element `i`. A scalar only has element 0.
    pub fn element_at(&self, i: usize) -> Result<F> {
        match self {
            Value::Scalar(s) if i == 0 => Ok(*s),
            Value::Array(v) if i < v.len() => Ok(v[i]),
            _ => Err(Error::IndexOutOfRange {
                index: i,
                len: self.len(),
            }),
        }
    }

    /// The elements as a vector (a scalar yields one element).
    pub fn to_vec(&self) -> Vec<F> {
        match self {
            Value::Scalar(s) => vec![*s],
            Value::Array(v) => v.clone(),
        }
    }

    /// Borrow the array elements, or `None` for a scalar.
    pub fn as_array(&self) -> Option<&[F]> {
        match self {
            Value::Scalar(_) => None,
            Value::Array(v) => Some(v),
        }
    }

    /// Apply `f` to every element, keeping the shape.
    pub fn map(&self, f: impl Fn(F) -> F) -> Self {
        match self {
            Value::Scalar(s) => Value::Scalar(f(*s)),
            Value::Array(v) => Value::Array(v.iter().map(|&x| f(x)).collect()),
        }
    }

    /// Combine two values elementwise with scalar broadcasting.
    pub fn zip_with(
        &self,
        other: &Self,
        context: &'static str,
        f: impl Fn(F, F) -> F,
    ) -> Result<Self> {
        match (self, other) {
            (Value::Scalar(a), Value::Scalar(b)) => Ok(Value::Scalar(f(*a, *b))),
            (Value::Scalar(a), Value::Array(b)) => {
                Ok(Value::Array(b.iter().map(|&y| f(*a, y)).collect()))
            }
            (Value::Array(a), Value::Scalar(b)) => {
                Ok(Value::Array(a.iter().map(|&x| f(x, *b)).collect()))
            }
            (Value::Array(a), Value::Array(b)) => {
                if a.len() != b.len() {
                    return Err(Error::shape(context, a.len(), b.len()));
                }
                Ok(Value::Array(
                    a.iter().zip(b.iter()).map(|(&x, &y)| f(x, y)).collect(),
                ))
            }
        }
    }

    pub fn try_add(&self, other: &Self) -> Result<Self> {
        self.zip_with(other, "add", |a, b| a + b)
    }

    pub fn try_sub(&self, other: &Self) -> Result<Self> {
        self.zip_with(other, "sub", |a, b| a - b)
    }

    pub fn try_mul(&self, other: &Self) -> Result<Self> {
        self.zip_with(other, "mul", |a, b| a * b)
    }

    pub fn try_div(&self, other: &Self) -> Result<Self> {
        self.zip_with(other, "div", |a, b| a / b)
    }

    /// Multiply every element by `s`.
    pub fn scale(&self, s: F) -> Self {
        self.map(|x| x * s)
    }

    /// Sum of all elements (the value itself for a scalar).
    pub fn sum(&self) -> F {
        match self {
            Value::Scalar(s) => *s,
            Value::Array(v) => v.iter().fold(F::zero(), |acc, &x| acc + x),
        }
    }

    /// Elements broadcast to `len`: a scalar is repeated, an array must
    /// already have that length.
    pub fn broadcast_to(&self, len: usize) -> Result<Vec<F>> {
        match self {
            Value::Scalar(s) => Ok(vec![*s; len]),
            Value::Array(v) if v.len() == len => Ok(v.clone()),
            Value::Array(v) => Err(Error::shape("broadcast", len, v.len())),
        }
    }

    /// Elementwise comparison with broadcasting. True when `op` holds for
    /// every element pair (vacuously true for empty arrays).
    pub fn compare(&self, op: CmpOp, other: &Self) -> Result<bool> {
        match (self, other) {
            (Value::Scalar(a), Value::Scalar(b)) => Ok(op.holds(*a, *b)),
            (Value::Scalar(a), Value::Array(b)) => Ok(b.iter().all(|&y| op.holds(*a, y))),
            (Value::Array(a), Value::Scalar(b)) => Ok(a.iter().all(|&x| op.holds(x, *b))),
            (Value::Array(a), Value::Array(b)) => {
                if a.len() != b.len() {
                    return Err(Error::shape("compare", a.len(), b.len()));
                }
                Ok(a.iter().zip(b.iter()).all(|(&x, &y)| op.holds(x, y)))
            }
        }
    }

    pub fn elem_eq(&self, other: &Self) -> Result<bool> {
        self.compare(CmpOp::Eq, other)
    }

    pub fn elem_ne(&self, other: &Self) -> Result<bool> {
        self.compare(CmpOp::Ne, other)
    }

    pub fn elem_lt(&self, other: &Self) -> Result<bool> {
        self.compare(CmpOp::Lt, other)
    }

    pub fn elem_le(&self, other: &Self) -> Result<bool> {
        self.compare(CmpOp::Le, other)
    }

    pub fn elem_gt(&self, other: &Self) -> Result<bool> {
        self.compare(CmpOp::Gt, other)
    }

    pub fn elem_ge(&self, other: &Self) -> Result<bool> {
        self.compare(CmpOp::Ge, other)
    }
}

impl<F: Float> Neg for Value<F> {
    type Output = Self;
    fn neg(self) -> Self {
        self.map(|x| -x)
    }
}

impl<F: Float> From<F> for Value<F> {
    fn from(value: F) -> Self {
        Value::Scalar(value)
    }
}

impl<F: Float> From<Vec<F>> for Value<F> {
    fn from(values: Vec<F>) -> Self {
        Value::Array(values)
    }
}

impl<F: Float> Default for Value<F> {
    fn default() -> Self {
        Value::Scalar(F::zero())
    }
}

impl<F: Float> Display for Value<F> {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            Value::Scalar(s) => write!(f, "{}", s),
            Value::Array(v) => {
                write!(f, "[")?;
                for (i, x) in v.iter().enumerate() {
                    if i > 0 {
                        write!(f, ", ")?;
                    }
                    write!(f, "{}", x)?;
                }
                write!(f, "]")
            }
        }
    }
}
