use std::cell::Cell;

use crate::base::Base;
use crate::error::{Error, Result};

use super::Tape;

thread_local! {
    /// Id of the tape being recorded on this thread, whatever its base type.
    static ACTIVE_SESSION: Cell<Option<u32>> = const { Cell::new(None) };
}

/// Whether a recording session is open on the current thread.
pub fn is_recording() -> bool {
    ACTIVE_SESSION.with(|cell| cell.get().is_some())
}

/// Make `tape` the active tape of this thread.
///
/// Fails if any session is already open on this thread.
pub(crate) fn install<B: Base>(tape: Tape<B>) -> Result<()> {
    ACTIVE_SESSION.with(|session| {
        if let Some(id) = session.get() {
            return Err(Error::state(format!(
                "cannot begin recording: tape {} is already being recorded on this thread",
                id
            )));
        }
        session.set(Some(tape.id));
        B::active_tape().with(|cell| *cell.borrow_mut() = Some(tape));
        Ok(())
    })
}

/// Remove and return the active tape, closing the session.
pub(crate) fn take<B: Base>() -> Option<Tape<B>> {
    let tape = B::active_tape().with(|cell| cell.borrow_mut().take());
    if tape.is_some() {
        ACTIVE_SESSION.with(|session| session.set(None));
    }
    tape
}

/// Id of the active tape for base `B`, if any.
#[inline]
pub(crate) fn active_tape_id<B: Base>() -> Option<u32> {
    B::active_tape().with(|cell| cell.borrow().as_ref().map(|t| t.id))
}

/// Run `f` on the active tape for base `B`. Returns `None` when nothing is
/// being recorded.
#[inline]
pub(crate) fn with_active_tape<B: Base, R>(f: impl FnOnce(&mut Tape<B>) -> R) -> Option<R> {
    B::active_tape().with(|cell| cell.borrow_mut().as_mut().map(f))
}
