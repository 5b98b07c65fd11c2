//! Numeric base types the tape can be recorded over.
//!
//! [`Base`] is implemented for the primitive floats and for the tagged
//! [`Value`] type. Besides pure evaluation it selects the per-type
//! thread-local recording slot and atomic registry, the same way the
//! primitive float types pick their own thread-local tape.

use std::cell::RefCell;
use std::fmt::Debug;
use std::sync::LazyLock;
use std::thread::LocalKey;

use crate::atomic::AtomicRegistry;
use crate::error::{Error, Result};
use crate::float::Float;
use crate::tape::Tape;
use crate::value::{CmpOp, Value};

/// A value type the tape can record and replay.
///
/// All methods are pure; recording is the business of [`AD`](crate::AD).
pub trait Base: Clone + Debug + PartialEq + Send + Sync + 'static {
    /// Element type of scalars and arrays of this base.
    type Elem: Float;

    /// A scalar-shaped value.
    fn from_elem(e: Self::Elem) -> Self;

    /// Whether the value is scalar-shaped.
    fn is_scalar(&self) -> bool;

    /// Number of elements (1 for a scalar).
    fn len(&self) -> usize;

    /// The elements in order.
    fn to_elements(&self) -> Vec<Self::Elem>;

    /// Build an array-shaped value. Bases without arrays accept exactly one
    /// element.
    fn from_elements(elems: Vec<Self::Elem>) -> Result<Self>;

    fn try_add(&self, other: &Self) -> Result<Self>;
    fn try_sub(&self, other: &Self) -> Result<Self>;
    fn try_mul(&self, other: &Self) -> Result<Self>;
    fn try_div(&self, other: &Self) -> Result<Self>;

    /// Apply `f` elementwise, keeping the shape.
    fn map(&self, f: impl Fn(Self::Elem) -> Self::Elem) -> Self;

    /// Elementwise comparison; true when `op` holds for every element.
    fn compare(&self, op: CmpOp, other: &Self) -> Result<bool>;

    /// Sum of the elements.
    fn sum_elements(&self) -> Self::Elem;

    /// Expand `self` to the shape of `shape`: a scalar is repeated to fill an
    /// array shape, anything else must already match.
    fn broadcast_like(&self, shape: &Self) -> Result<Self>;

    /// Collapse `self` onto the shape of `shape`: an array contribution to a
    /// scalar-shaped quantity is summed. Used when accumulating adjoints.
    fn reduce_like(&self, shape: &Self) -> Self;

    /// Bytes owned by this value, inline and on the heap.
    fn footprint(&self) -> usize;

    /// Thread-local slot holding the tape currently being recorded.
    fn active_tape() -> &'static LocalKey<RefCell<Option<Tape<Self>>>>;

    /// Process-wide atomic registry for this base.
    fn atomic_registry() -> &'static AtomicRegistry<Self>;

    #[inline]
    fn zero() -> Self {
        Self::from_elem(<Self::Elem as num_traits::Zero>::zero())
    }

    #[inline]
    fn one() -> Self {
        Self::from_elem(<Self::Elem as num_traits::One>::one())
    }

    /// Scalar-shaped value from an `f64` literal.
    fn constant(v: f64) -> Self {
        let e = <Self::Elem as num_traits::FromPrimitive>::from_f64(v)
            .unwrap_or_else(<Self::Elem as num_traits::Float>::nan);
        Self::from_elem(e)
    }

    /// Multiply every element by `s`.
    fn scale(&self, s: Self::Elem) -> Self {
        self.map(|x| x * s)
    }

    fn negate(&self) -> Self {
        self.map(|x| -x)
    }

    /// True when every element is exactly zero.
    fn is_all_zero(&self) -> bool {
        let zero = <Self::Elem as num_traits::Zero>::zero();
        self.to_elements().iter().all(|&x| x == zero)
    }
}

macro_rules! impl_float_base {
    ($f:ty, $tape:ident, $registry:ident) => {
        thread_local! {
            static $tape: RefCell<Option<Tape<$f>>> = const { RefCell::new(None) };
        }

        static $registry: LazyLock<AtomicRegistry<$f>> =
            LazyLock::new(AtomicRegistry::with_builtins);

        impl Base for $f {
            type Elem = $f;

            #[inline]
            fn from_elem(e: $f) -> Self {
                e
            }

            #[inline]
            fn is_scalar(&self) -> bool {
                true
            }

            #[inline]
            fn len(&self) -> usize {
                1
            }

            fn to_elements(&self) -> Vec<$f> {
                vec![*self]
            }

            fn from_elements(elems: Vec<$f>) -> Result<Self> {
                match elems.as_slice() {
                    [x] => Ok(*x),
                    _ => Err(Error::shape("scalar base", 1, elems.len())),
                }
            }

            #[inline]
            fn try_add(&self, other: &Self) -> Result<Self> {
                Ok(self + other)
            }

            #[inline]
            fn try_sub(&self, other: &Self) -> Result<Self> {
                Ok(self - other)
            }

            #[inline]
            fn try_mul(&self, other: &Self) -> Result<Self> {
                Ok(self * other)
            }

            #[inline]
            fn try_div(&self, other: &Self) -> Result<Self> {
                Ok(self / other)
            }

            #[inline]
            fn map(&self, f: impl Fn($f) -> $f) -> Self {
                f(*self)
            }

            fn compare(&self, op: CmpOp, other: &Self) -> Result<bool> {
                Ok(op.holds(*self, *other))
            }

            #[inline]
            fn sum_elements(&self) -> $f {
                *self
            }

            fn broadcast_like(&self, _shape: &Self) -> Result<Self> {
                Ok(*self)
            }

            fn reduce_like(&self, _shape: &Self) -> Self {
                *self
            }

            fn footprint(&self) -> usize {
                std::mem::size_of::<$f>()
            }

            fn active_tape() -> &'static LocalKey<RefCell<Option<Tape<Self>>>> {
                &$tape
            }

            fn atomic_registry() -> &'static AtomicRegistry<Self> {
                &$registry
            }
        }
    };
}

impl_float_base!(f32, TAPE_F32, REGISTRY_F32);
impl_float_base!(f64, TAPE_F64, REGISTRY_F64);

macro_rules! impl_value_base {
    ($f:ty, $tape:ident, $registry:ident) => {
        thread_local! {
            static $tape: RefCell<Option<Tape<Value<$f>>>> = const { RefCell::new(None) };
        }

        static $registry: LazyLock<AtomicRegistry<Value<$f>>> =
            LazyLock::new(AtomicRegistry::with_builtins);

        impl Base for Value<$f> {
            type Elem = $f;

            #[inline]
            fn from_elem(e: $f) -> Self {
                Value::Scalar(e)
            }

            #[inline]
            fn is_scalar(&self) -> bool {
                Value::is_scalar(self)
            }

            #[inline]
            fn len(&self) -> usize {
                Value::len(self)
            }

            fn to_elements(&self) -> Vec<$f> {
                self.to_vec()
            }

            fn from_elements(elems: Vec<$f>) -> Result<Self> {
                Ok(Value::Array(elems))
            }

            fn try_add(&self, other: &Self) -> Result<Self> {
                Value::try_add(self, other)
            }

            fn try_sub(&self, other: &Self) -> Result<Self> {
                Value::try_sub(self, other)
            }

            fn try_mul(&self, other: &Self) -> Result<Self> {
                Value::try_mul(self, other)
            }

            fn try_div(&self, other: &Self) -> Result<Self> {
                Value::try_div(self, other)
            }

            fn map(&self, f: impl Fn($f) -> $f) -> Self {
                Value::map(self, f)
            }

            fn compare(&self, op: CmpOp, other: &Self) -> Result<bool> {
                Value::compare(self, op, other)
            }

            fn sum_elements(&self) -> $f {
                self.sum()
            }

            fn broadcast_like(&self, shape: &Self) -> Result<Self> {
                match shape {
                    Value::Scalar(_) if self.is_scalar() => Ok(self.clone()),
                    Value::Scalar(_) => Err(Error::shape("broadcast", 1, Value::len(self))),
                    Value::Array(s) => Ok(Value::Array(self.broadcast_to(s.len())?)),
                }
            }

            fn reduce_like(&self, shape: &Self) -> Self {
                match (self, shape) {
                    (Value::Array(_), Value::Scalar(_)) => Value::Scalar(self.sum()),
                    _ => self.clone(),
                }
            }

            fn footprint(&self) -> usize {
                let heap = match self {
                    Value::Scalar(_) => 0,
                    Value::Array(v) => v.capacity() * std::mem::size_of::<$f>(),
                };
                std::mem::size_of::<Self>() + heap
            }

            fn is_all_zero(&self) -> bool {
                match self {
                    Value::Scalar(s) => *s == 0.0,
                    Value::Array(v) => v.iter().all(|&x| x == 0.0),
                }
            }

            fn active_tape() -> &'static LocalKey<RefCell<Option<Tape<Self>>>> {
                &$tape
            }

            fn atomic_registry() -> &'static AtomicRegistry<Self> {
                &$registry
            }
        }
    };
}

impl_value_base!(f32, TAPE_VALUE_F32, REGISTRY_VALUE_F32);
impl_value_base!(f64, TAPE_VALUE_F64, REGISTRY_VALUE_F64);
