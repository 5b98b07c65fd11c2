//! Frozen tapes and their evaluator.
//!
//! A [`TapeFunction`] replays its tape forward to propagate Taylor
//! coefficients (any order, any number of directions) and backward to
//! propagate adjoint weights through the cached coefficients.

use crate::base::Base;
use crate::tape::Tape;

mod forward;
mod jacobian;
#[cfg(feature = "parallel")]
mod parallel;
mod reverse;
mod sparsity;

pub use self::sparsity::JacobianPattern;

/// Taylor coefficients of every tape variable.
///
/// Order zero is shared by all directions; order `k > 0` has one
/// coefficient per direction. Per variable the layout is
/// `[x0, x1_d0 .. x1_d(r-1), x2_d0 ..]`.
#[derive(Clone, Debug)]
struct TaylorCache<B: Base> {
    data: Vec<B>,
    num_var: usize,
    /// Orders with storage allocated.
    cap_order: usize,
    /// Orders currently valid, `0..num_order`.
    num_order: usize,
    num_direction: usize,
}

impl<B: Base> TaylorCache<B> {
    fn new(num_var: usize) -> Self {
        TaylorCache {
            data: vec![B::zero(); num_var],
            num_var,
            cap_order: 1,
            num_order: 0,
            num_direction: 1,
        }
    }

    #[inline]
    fn stride(&self) -> usize {
        1 + (self.cap_order - 1) * self.num_direction
    }

    #[inline]
    fn index(&self, var: usize, k: usize, d: usize) -> usize {
        let base = var * self.stride();
        if k == 0 {
            base
        } else {
            base + 1 + (k - 1) * self.num_direction + d
        }
    }

    #[inline]
    fn get(&self, var: usize, k: usize, d: usize) -> &B {
        &self.data[self.index(var, k, d)]
    }

    #[inline]
    fn set(&mut self, var: usize, k: usize, d: usize, value: B) {
        let i = self.index(var, k, d);
        self.data[i] = value;
    }

    /// Orders `0..=q` of `var` along direction `d`.
    fn series(&self, var: usize, q: usize, d: usize) -> Vec<B> {
        (0..=q).map(|k| self.get(var, k, d).clone()).collect()
    }

    /// Make room for `orders` orders along `r` directions.
    ///
    /// Changing the direction count keeps only order zero.
    fn reserve(&mut self, orders: usize, r: usize) {
        if orders <= self.cap_order && r == self.num_direction {
            return;
        }
        let keep = if r == self.num_direction { self.num_order } else { self.num_order.min(1) };
        let mut next = TaylorCache {
            data: Vec::new(),
            num_var: self.num_var,
            cap_order: orders.max(self.cap_order),
            num_order: keep,
            num_direction: r,
        };
        next.data = vec![B::zero(); next.num_var * next.stride()];
        for var in 0..self.num_var {
            for k in 0..keep {
                let dirs = if k == 0 { 1 } else { r };
                for d in 0..dirs {
                    next.set(var, k, d, self.get(var, k, d).clone());
                }
            }
        }
        *self = next;
    }

    fn footprint(&self) -> usize {
        std::mem::size_of::<Self>() + self.data.iter().map(B::footprint).sum::<usize>()
    }
}

/// A frozen recording, ready for evaluation.
///
/// Built by [`Session::freeze`](crate::Session::freeze). Evaluation mutates
/// a private coefficient cache, so `forward` and `reverse` take `&mut self`;
/// clone the function to evaluate it from several threads.
#[derive(Clone)]
pub struct TapeFunction<B: Base> {
    tape: Tape<B>,
    dependents: Vec<u32>,
    cache: TaylorCache<B>,
}

impl<B: Base> TapeFunction<B> {
    pub(crate) fn new(tape: Tape<B>, dependents: Vec<u32>) -> Self {
        let cache = TaylorCache::new(tape.num_ops());
        TapeFunction {
            tape,
            dependents,
            cache,
        }
    }

    /// Number of independent variables.
    #[inline]
    pub fn num_inputs(&self) -> usize {
        self.tape.num_inputs()
    }

    /// Number of dependent variables.
    #[inline]
    pub fn num_outputs(&self) -> usize {
        self.dependents.len()
    }

    /// Number of tape entries, inputs and constants included.
    #[inline]
    pub fn num_ops(&self) -> usize {
        self.tape.num_ops()
    }

    /// Number of Taylor orders currently cached (0 before the first
    /// `forward(0, ..)`).
    #[inline]
    pub fn num_order(&self) -> usize {
        self.cache.num_order
    }

    /// Number of directions of the cached orders above zero.
    #[inline]
    pub fn num_direction(&self) -> usize {
        self.cache.num_direction
    }

    /// Output values at the recording point.
    pub fn outputs_at_zero(&self) -> Vec<B> {
        self.dependents
            .iter()
            .map(|&i| self.tape.values[i as usize].clone())
            .collect()
    }

    /// Bytes held by the tape and the coefficient cache.
    pub fn memory(&self) -> usize {
        std::mem::size_of::<Self>()
            + self.tape.footprint()
            + self.dependents.capacity() * std::mem::size_of::<u32>()
            + self.cache.footprint()
    }
}
