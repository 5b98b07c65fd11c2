//! Error types for adtape.

use thiserror::Error;

/// Errors raised while recording or evaluating a tape.
///
/// All variants are programming errors in how a tape was built or driven;
/// none of them is transient, so nothing in the crate retries.
#[derive(Debug, Error)]
pub enum Error {
    /// Operand shapes or argument counts do not agree.
    #[error("shape mismatch in {context}: expected {expected}, got {actual}")]
    ShapeMismatch {
        context: &'static str,
        expected: usize,
        actual: usize,
    },

    /// Element index past the end of an array value.
    #[error("index {index} is out of range for length {len}")]
    IndexOutOfRange { index: usize, len: usize },

    /// Recording or evaluation protocol violated.
    #[error("invalid state: {0}")]
    State(String),

    /// An atomic operation does not implement the requested order.
    #[error("atomic `{atomic}` does not support order {order}")]
    UnsupportedOrder { atomic: String, order: usize },

    /// An elementary operation failed during a sweep, typically because the
    /// replay point has array lengths the recording did not.
    #[error("`{op}` failed at operation {index}: {source}")]
    Op {
        index: usize,
        op: &'static str,
        #[source]
        source: Box<Error>,
    },

    /// An atomic operation failed during a sweep.
    #[error("atomic `{atomic}` failed at operation {index}: {source}")]
    Atomic {
        index: usize,
        atomic: String,
        #[source]
        source: Box<Error>,
    },
}

/// Result alias used throughout the crate.
pub type Result<T> = std::result::Result<T, Error>;

impl Error {
    pub(crate) fn shape(context: &'static str, expected: usize, actual: usize) -> Self {
        Error::ShapeMismatch {
            context,
            expected,
            actual,
        }
    }

    /// Attach the tape position and opcode name of a failing entry.
    pub(crate) fn at_op(index: usize, op: &'static str) -> impl FnOnce(Error) -> Error {
        move |source| Error::Op {
            index,
            op,
            source: Box::new(source),
        }
    }

    pub(crate) fn state(msg: impl Into<String>) -> Self {
        Error::State(msg.into())
    }
}
