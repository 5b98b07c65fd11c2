//! `std::ops` implementations for [`AD<B>`].
//!
//! Each operator delegates to the matching `try_*` method and records to
//! the active tape the same way.
//!
//! # Panics
//!
//! The binary operators panic when the operand shapes do not broadcast
//! (two arrays of different lengths). Use [`AD::try_add`] and friends to get
//! the error as a value instead.

use std::ops::{Add, AddAssign, Div, DivAssign, Mul, MulAssign, Neg, Sub, SubAssign};

use crate::ad::AD;
use crate::base::Base;
use crate::error::Result;
use crate::opcode::UnaryOp;
use crate::value::Value;

#[inline]
#[track_caller]
fn unwrap_op<B: Base>(result: Result<AD<B>>) -> AD<B> {
    result.unwrap_or_else(|e| panic!("{}", e))
}

macro_rules! ad_binary_op {
    ($trait:ident, $method:ident, $try:ident, $assign_trait:ident, $assign:ident) => {
        impl<B: Base> $trait<&AD<B>> for &AD<B> {
            type Output = AD<B>;
            #[inline]
            #[track_caller]
            fn $method(self, rhs: &AD<B>) -> AD<B> {
                unwrap_op(self.$try(rhs))
            }
        }

        impl<B: Base> $trait for AD<B> {
            type Output = AD<B>;
            #[inline]
            #[track_caller]
            fn $method(self, rhs: AD<B>) -> AD<B> {
                unwrap_op(self.$try(&rhs))
            }
        }

        impl<B: Base> $trait<&AD<B>> for AD<B> {
            type Output = AD<B>;
            #[inline]
            #[track_caller]
            fn $method(self, rhs: &AD<B>) -> AD<B> {
                unwrap_op(self.$try(rhs))
            }
        }

        impl<B: Base> $trait<AD<B>> for &AD<B> {
            type Output = AD<B>;
            #[inline]
            #[track_caller]
            fn $method(self, rhs: AD<B>) -> AD<B> {
                unwrap_op(self.$try(&rhs))
            }
        }

        // AD<B> op B: the plain value is a parameter.
        impl<B: Base> $trait<B> for AD<B> {
            type Output = AD<B>;
            #[inline]
            #[track_caller]
            fn $method(self, rhs: B) -> AD<B> {
                unwrap_op(self.$try(&AD::parameter(rhs)))
            }
        }

        impl<B: Base> $trait<B> for &AD<B> {
            type Output = AD<B>;
            #[inline]
            #[track_caller]
            fn $method(self, rhs: B) -> AD<B> {
                unwrap_op(self.$try(&AD::parameter(rhs)))
            }
        }

        impl<B: Base> $assign_trait for AD<B> {
            #[inline]
            #[track_caller]
            fn $assign(&mut self, rhs: AD<B>) {
                *self = unwrap_op(self.$try(&rhs));
            }
        }

        impl<B: Base> $assign_trait<&AD<B>> for AD<B> {
            #[inline]
            #[track_caller]
            fn $assign(&mut self, rhs: &AD<B>) {
                *self = unwrap_op(self.$try(rhs));
            }
        }
    };
}

ad_binary_op!(Add, add, try_add, AddAssign, add_assign);
ad_binary_op!(Sub, sub, try_sub, SubAssign, sub_assign);
ad_binary_op!(Mul, mul, try_mul, MulAssign, mul_assign);
ad_binary_op!(Div, div, try_div, DivAssign, div_assign);

impl<B: Base> Neg for AD<B> {
    type Output = AD<B>;
    #[inline]
    fn neg(self) -> AD<B> {
        self.unary(UnaryOp::Neg)
    }
}

impl<B: Base> Neg for &AD<B> {
    type Output = AD<B>;
    #[inline]
    fn neg(self) -> AD<B> {
        self.unary(UnaryOp::Neg)
    }
}

// ──────────────────────────────────────────────
//  Plain values on the left, element scalars on the right
// ──────────────────────────────────────────────

macro_rules! lhs_value_ops {
    ($lhs:ty, $base:ty, $wrap:expr) => {
        impl Add<AD<$base>> for $lhs {
            type Output = AD<$base>;
            #[inline]
            #[track_caller]
            fn add(self, rhs: AD<$base>) -> AD<$base> {
                unwrap_op(AD::parameter($wrap(self)).try_add(&rhs))
            }
        }

        impl Sub<AD<$base>> for $lhs {
            type Output = AD<$base>;
            #[inline]
            #[track_caller]
            fn sub(self, rhs: AD<$base>) -> AD<$base> {
                unwrap_op(AD::parameter($wrap(self)).try_sub(&rhs))
            }
        }

        impl Mul<AD<$base>> for $lhs {
            type Output = AD<$base>;
            #[inline]
            #[track_caller]
            fn mul(self, rhs: AD<$base>) -> AD<$base> {
                unwrap_op(AD::parameter($wrap(self)).try_mul(&rhs))
            }
        }

        impl Div<AD<$base>> for $lhs {
            type Output = AD<$base>;
            #[inline]
            #[track_caller]
            fn div(self, rhs: AD<$base>) -> AD<$base> {
                unwrap_op(AD::parameter($wrap(self)).try_div(&rhs))
            }
        }

        impl Add<&AD<$base>> for $lhs {
            type Output = AD<$base>;
            #[inline]
            #[track_caller]
            fn add(self, rhs: &AD<$base>) -> AD<$base> {
                unwrap_op(AD::parameter($wrap(self)).try_add(rhs))
            }
        }

        impl Sub<&AD<$base>> for $lhs {
            type Output = AD<$base>;
            #[inline]
            #[track_caller]
            fn sub(self, rhs: &AD<$base>) -> AD<$base> {
                unwrap_op(AD::parameter($wrap(self)).try_sub(rhs))
            }
        }

        impl Mul<&AD<$base>> for $lhs {
            type Output = AD<$base>;
            #[inline]
            #[track_caller]
            fn mul(self, rhs: &AD<$base>) -> AD<$base> {
                unwrap_op(AD::parameter($wrap(self)).try_mul(rhs))
            }
        }

        impl Div<&AD<$base>> for $lhs {
            type Output = AD<$base>;
            #[inline]
            #[track_caller]
            fn div(self, rhs: &AD<$base>) -> AD<$base> {
                unwrap_op(AD::parameter($wrap(self)).try_div(rhs))
            }
        }
    };
}

lhs_value_ops!(f32, f32, std::convert::identity);
lhs_value_ops!(f64, f64, std::convert::identity);
lhs_value_ops!(Value<f32>, Value<f32>, std::convert::identity);
lhs_value_ops!(Value<f64>, Value<f64>, std::convert::identity);
lhs_value_ops!(f32, Value<f32>, Value::Scalar);
lhs_value_ops!(f64, Value<f64>, Value::Scalar);

macro_rules! rhs_elem_ops {
    ($f:ty) => {
        impl Add<$f> for AD<Value<$f>> {
            type Output = AD<Value<$f>>;
            #[inline]
            #[track_caller]
            fn add(self, rhs: $f) -> AD<Value<$f>> {
                unwrap_op(self.try_add(&AD::parameter(Value::Scalar(rhs))))
            }
        }

        impl Sub<$f> for AD<Value<$f>> {
            type Output = AD<Value<$f>>;
            #[inline]
            #[track_caller]
            fn sub(self, rhs: $f) -> AD<Value<$f>> {
                unwrap_op(self.try_sub(&AD::parameter(Value::Scalar(rhs))))
            }
        }

        impl Mul<$f> for AD<Value<$f>> {
            type Output = AD<Value<$f>>;
            #[inline]
            #[track_caller]
            fn mul(self, rhs: $f) -> AD<Value<$f>> {
                unwrap_op(self.try_mul(&AD::parameter(Value::Scalar(rhs))))
            }
        }

        impl Div<$f> for AD<Value<$f>> {
            type Output = AD<Value<$f>>;
            #[inline]
            #[track_caller]
            fn div(self, rhs: $f) -> AD<Value<$f>> {
                unwrap_op(self.try_div(&AD::parameter(Value::Scalar(rhs))))
            }
        }
    };
}

rhs_elem_ops!(f32);
rhs_elem_ops!(f64);
