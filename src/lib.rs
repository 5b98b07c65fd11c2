//! Tape-based algorithmic differentiation.
//!
//! Record numeric code once on [`AD`] values, freeze the recording into a
//! [`TapeFunction`], then replay it forward (Taylor coefficients of any
//! order along any number of directions) or backward (adjoints through the
//! cached coefficients).
//!
//! Values are either primitive floats or the tagged [`Value`] scalar/array
//! type. Vector operations such as [`sum`] and [`concat`] are [`AtomicOp`]s,
//! and user code can register more.

pub mod ad;
pub mod api;
pub mod atomic;
pub mod base;
pub mod error;
pub mod float;
pub mod function;
pub mod opcode;
pub mod session;
pub mod tape;
pub(crate) mod taylor_ops;
mod traits;
pub mod value;

pub use ad::{Slot, AD};
pub use api::{gradient, record, record_multi};
pub use atomic::{
    call_atomic, concat, lookup_atomic, make, make_atomic, pack, register_atomic, reverse, sum,
    unpack, unpack_atomic, AtomicId, AtomicOp, AtomicRegistry,
};
pub use base::Base;
pub use error::{Error, Result};
pub use float::Float;
pub use function::{JacobianPattern, TapeFunction};
pub use session::{begin_recording, begin_recording_with_capacity, Session};
pub use tape::{is_recording, Tape};
pub use value::{CmpOp, Value};

/// Recording wrapper over `f64`.
pub type AD64 = AD<f64>;
/// Recording wrapper over `f32`.
pub type AD32 = AD<f32>;
/// Recording wrapper over `Value<f64>`.
pub type ADValue64 = AD<Value<f64>>;
