//! Recording sessions.
//!
//! A [`Session`] owns the thread's recording slot for base `B` from
//! [`begin_recording`] until it is frozen or dropped.

use std::marker::PhantomData;

use log::debug;

use crate::ad::{Slot, AD};
use crate::base::Base;
use crate::error::{Error, Result};
use crate::function::TapeFunction;
use crate::tape::thread_local::{self, with_active_tape};
use crate::tape::Tape;

/// Guard for an open recording.
///
/// Dropping it without calling [`Session::freeze`] discards the recording
/// and releases the thread's slot.
#[must_use = "dropping a Session discards the recording"]
pub struct Session<B: Base> {
    tape_id: u32,
    open: bool,
    // Tied to the recording thread.
    _marker: PhantomData<*const B>,
}

/// Mark `vars` as the independent variables of a new recording.
///
/// Each element becomes a variable of the new tape, in order. Fails with
/// [`Error::State`] if a recording is already open on this thread.
pub fn begin_recording<B: Base>(vars: &mut [AD<B>]) -> Result<Session<B>> {
    begin_recording_with_capacity(vars, 0)
}

/// Like [`begin_recording`], reserving room for about `est_ops` entries.
pub fn begin_recording_with_capacity<B: Base>(
    vars: &mut [AD<B>],
    est_ops: usize,
) -> Result<Session<B>> {
    let mut tape = Tape::with_capacity(est_ops.max(vars.len()));
    let indices: Vec<u32> = vars.iter().map(|v| tape.new_input(v.value.clone())).collect();
    let tape_id = tape.id;

    thread_local::install(tape)?;

    for (v, index) in vars.iter_mut().zip(indices) {
        v.slot = Slot::TapeRef {
            tape: tape_id,
            index,
        };
    }
    debug!("began recording tape {} with {} inputs", tape_id, vars.len());

    Ok(Session {
        tape_id,
        open: true,
        _marker: PhantomData,
    })
}

impl<B: Base> Session<B> {
    /// Id of the tape being recorded.
    pub fn tape_id(&self) -> u32 {
        self.tape_id
    }

    /// Number of entries recorded so far, inputs included.
    pub fn num_ops(&self) -> usize {
        with_active_tape::<B, _>(|t| t.num_ops()).unwrap_or(0)
    }

    /// Mark `outputs` as the dependent variables and stop recording.
    ///
    /// Parameter outputs are embedded as constants. Entries that no output
    /// depends on are removed; inputs are always kept.
    pub fn freeze(mut self, outputs: &[AD<B>]) -> Result<TapeFunction<B>> {
        self.open = false;
        let mut tape = thread_local::take::<B>()
            .filter(|t| t.id == self.tape_id)
            .ok_or_else(|| {
                Error::state(format!("tape {} is no longer being recorded", self.tape_id))
            })?;

        let mut dependents = Vec::with_capacity(outputs.len());
        for (i, y) in outputs.iter().enumerate() {
            let index = match y.slot {
                Slot::TapeRef { tape: id, index } if id == tape.id => index,
                Slot::TapeRef { tape: id, .. } => {
                    return Err(Error::state(format!(
                        "output {} is a variable of tape {}, not of tape {}",
                        i, id, tape.id
                    )));
                }
                Slot::Inline => tape.push_const(y.value.clone()),
            };
            dependents.push(index);
        }

        let recorded = tape.num_ops();
        let removed = tape.prune(&mut dependents);
        debug!(
            "froze tape {}: {} inputs, {} outputs, {} of {} entries kept",
            tape.id,
            tape.num_inputs(),
            dependents.len(),
            recorded - removed,
            recorded
        );
        Ok(TapeFunction::new(tape, dependents))
    }

    /// Discard the recording.
    pub fn abort(self) {
        drop(self);
    }
}

impl<B: Base> Drop for Session<B> {
    fn drop(&mut self) {
        if self.open && thread_local::active_tape_id::<B>() == Some(self.tape_id) {
            let _ = thread_local::take::<B>();
            debug!("aborted recording of tape {}", self.tape_id);
        }
    }
}
