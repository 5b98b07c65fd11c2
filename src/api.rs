//! Closure-based recording.
//!
//! These wrap [`begin_recording`] / [`Session::freeze`](crate::Session::freeze)
//! for the common case where the function to differentiate is a closure.
//! The session is released on every exit path, including an early `?`
//! inside the closure.

use crate::ad::AD;
use crate::base::Base;
use crate::error::Result;
use crate::function::TapeFunction;
use crate::session::begin_recording;

/// Record `f` at `x` and freeze it.
///
/// Returns the tape function together with the value of `f(x)`.
///
/// ```
/// let (mut tf, y) = adtape::record(
///     |x: &[adtape::AD<f64>]| Ok(&x[0] * &x[1] + x[0].sin()),
///     &[2.0, 3.0],
/// )
/// .unwrap();
/// assert!((y - (6.0 + 2.0_f64.sin())).abs() < 1e-12);
/// let g = tf.gradient(&[2.0, 3.0]).unwrap();
/// assert!((g[0] - (3.0 + 2.0_f64.cos())).abs() < 1e-12);
/// assert!((g[1] - 2.0).abs() < 1e-12);
/// ```
pub fn record<B: Base>(
    f: impl FnOnce(&[AD<B>]) -> Result<AD<B>>,
    x: &[B],
) -> Result<(TapeFunction<B>, B)> {
    let mut inputs: Vec<AD<B>> = x.iter().cloned().map(AD::parameter).collect();
    let session = begin_recording(&mut inputs)?;
    let output = f(&inputs)?;
    let value = output.value().clone();
    let tf = session.freeze(std::slice::from_ref(&output))?;
    Ok((tf, value))
}

/// Record a vector-valued `f` at `x` and freeze it.
pub fn record_multi<B: Base>(
    f: impl FnOnce(&[AD<B>]) -> Result<Vec<AD<B>>>,
    x: &[B],
) -> Result<(TapeFunction<B>, Vec<B>)> {
    let mut inputs: Vec<AD<B>> = x.iter().cloned().map(AD::parameter).collect();
    let session = begin_recording(&mut inputs)?;
    let outputs = f(&inputs)?;
    let values = outputs.iter().map(|y| y.value().clone()).collect();
    let tf = session.freeze(&outputs)?;
    Ok((tf, values))
}

/// Value and gradient of a scalar function at `x`, recording it once.
pub fn gradient<B: Base>(
    f: impl FnOnce(&[AD<B>]) -> Result<AD<B>>,
    x: &[B],
) -> Result<(B, Vec<B>)> {
    let (mut tf, value) = record(f, x)?;
    let grad = tf.gradient(x)?;
    Ok((value, grad))
}
