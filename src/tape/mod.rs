//! Recording tape.
//!
//! A [`Tape`] is the append-only operation log built while a
//! [`Session`](crate::Session) is open. Every entry produces exactly one
//! variable slot, so a variable's index is the index of the entry that
//! produced it. Inputs always occupy the first `num_inputs` slots.
//!
//! An atomic call with `m` results occupies `m` consecutive slots: the first
//! holds [`Op::Atomic`], the rest hold [`Op::AtomicResult`] back-references.

use std::sync::atomic::{AtomicU32, Ordering};

use crate::atomic::AtomicEntry;
use crate::base::Base;
use crate::opcode::{BinaryOp, UnaryOp};

mod optimize;
pub(crate) mod thread_local;

pub use self::thread_local::is_recording;

static NEXT_TAPE_ID: AtomicU32 = AtomicU32::new(1);

/// One recorded entry.
#[derive(Clone, Debug, PartialEq)]
pub(crate) enum Op {
    /// Independent variable.
    Input,
    /// Embedded parameter; its value lives in the tape's value table.
    Const,
    Unary {
        op: UnaryOp,
        arg: u32,
    },
    Binary {
        op: BinaryOp,
        args: [u32; 2],
    },
    /// Atomic call; `local` indexes the tape's atomic table.
    Atomic {
        local: u32,
        args: Vec<u32>,
        num_results: u32,
    },
    /// Secondary result of the atomic call at index `call`.
    AtomicResult {
        call: u32,
    },
}

impl Op {
    /// Variable indices read by this entry.
    pub(crate) fn args(&self) -> &[u32] {
        match self {
            Op::Unary { arg, .. } => std::slice::from_ref(arg),
            Op::Binary { args, .. } => &args[..],
            Op::Atomic { args, .. } => args.as_slice(),
            Op::Input | Op::Const | Op::AtomicResult { .. } => &[],
        }
    }

    fn footprint(&self) -> usize {
        let heap = match self {
            Op::Atomic { args, .. } => args.capacity() * std::mem::size_of::<u32>(),
            _ => 0,
        };
        std::mem::size_of::<Op>() + heap
    }
}

/// The operation log of one recording.
///
/// Only reachable through a recording [`Session`](crate::Session); once
/// frozen it is owned, immutable, by a [`TapeFunction`](crate::TapeFunction).
#[derive(Clone)]
pub struct Tape<B: Base> {
    pub(crate) id: u32,
    pub(crate) ops: Vec<Op>,
    /// Order-zero value of every slot at recording time.
    pub(crate) values: Vec<B>,
    pub(crate) num_inputs: u32,
    /// Atomics referenced by this tape, resolved from the registry.
    pub(crate) atomics: Vec<AtomicEntry<B>>,
}

impl<B: Base> Tape<B> {
    /// Create an empty tape with a fresh id and pre-allocated capacity.
    pub(crate) fn with_capacity(est_ops: usize) -> Self {
        Tape {
            id: NEXT_TAPE_ID.fetch_add(1, Ordering::Relaxed),
            ops: Vec::with_capacity(est_ops),
            values: Vec::with_capacity(est_ops),
            num_inputs: 0,
            atomics: Vec::new(),
        }
    }

    #[inline]
    fn push(&mut self, op: Op, value: B) -> u32 {
        let idx = self.ops.len() as u32;
        self.ops.push(op);
        self.values.push(value);
        idx
    }

    /// Register a new input variable. Returns its index.
    ///
    /// Inputs must be registered before any other entry.
    #[inline]
    pub(crate) fn new_input(&mut self, value: B) -> u32 {
        debug_assert_eq!(self.ops.len() as u32, self.num_inputs);
        self.num_inputs += 1;
        self.push(Op::Input, value)
    }

    /// Embed a parameter. Returns its index.
    #[inline]
    pub(crate) fn push_const(&mut self, value: B) -> u32 {
        self.push(Op::Const, value)
    }

    #[inline]
    pub(crate) fn push_unary(&mut self, op: UnaryOp, arg: u32, value: B) -> u32 {
        self.push(Op::Unary { op, arg }, value)
    }

    #[inline]
    pub(crate) fn push_binary(&mut self, op: BinaryOp, arg0: u32, arg1: u32, value: B) -> u32 {
        self.push(
            Op::Binary {
                op,
                args: [arg0, arg1],
            },
            value,
        )
    }

    /// Record an atomic call whose order-zero results are `results`.
    /// Returns the index of the first result.
    pub(crate) fn push_atomic(
        &mut self,
        entry: &AtomicEntry<B>,
        args: Vec<u32>,
        results: Vec<B>,
    ) -> u32 {
        let local = match self.atomics.iter().position(|e| e.id == entry.id) {
            Some(pos) => pos,
            None => {
                self.atomics.push(entry.clone());
                self.atomics.len() - 1
            }
        } as u32;

        let first = self.ops.len() as u32;
        let num_results = results.len() as u32;
        let mut results = results.into_iter();
        if let Some(value) = results.next() {
            self.push(
                Op::Atomic {
                    local,
                    args,
                    num_results,
                },
                value,
            );
        }
        for value in results {
            self.push(Op::AtomicResult { call: first }, value);
        }
        first
    }

    /// Number of entries (inputs, constants, and operations).
    #[inline]
    pub fn num_ops(&self) -> usize {
        self.ops.len()
    }

    /// Number of independent variables.
    #[inline]
    pub fn num_inputs(&self) -> usize {
        self.num_inputs as usize
    }

    /// Bytes held by the operation log and its value table.
    pub(crate) fn footprint(&self) -> usize {
        let ops: usize = self.ops.iter().map(Op::footprint).sum();
        let values: usize = self.values.iter().map(B::footprint).sum();
        let atomics = self.atomics.len() * std::mem::size_of::<AtomicEntry<B>>();
        std::mem::size_of::<Self>() + ops + values + atomics
    }
}
