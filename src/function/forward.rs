use log::trace;

use crate::atomic::{at, AtomicEntry};
use crate::base::Base;
use crate::error::{Error, Result};
use crate::tape::{Op, Tape};
use crate::taylor_ops::{forward_binary, forward_unary};

use super::{TapeFunction, TaylorCache};

impl<B: Base> TapeFunction<B> {
    /// Propagate order `q` Taylor coefficients along `r` directions.
    ///
    /// `seeds[d][j]` is order `q` of input `j` along direction `d`. Returns
    /// order `q` of every output along every direction.
    ///
    /// `q = 0` sets the evaluation point and requires `r = 1`; it invalidates
    /// every higher order. `q > 0` requires orders `0..q` to be cached, and
    /// for `q > 1` the same `r` that produced them.
    pub fn forward(&mut self, q: usize, r: usize, seeds: &[Vec<B>]) -> Result<Vec<Vec<B>>> {
        let n = self.num_inputs();
        if r == 0 {
            return Err(Error::state("forward needs at least one direction"));
        }
        if seeds.len() != r {
            return Err(Error::shape("forward directions", r, seeds.len()));
        }
        if let Some(seed) = seeds.iter().find(|s| s.len() != n) {
            return Err(Error::shape("forward seed", n, seed.len()));
        }
        if q == 0 && r != 1 {
            return Err(Error::state(format!("forward(0) takes a single direction, got {}", r)));
        }
        if q > self.cache.num_order {
            return Err(Error::state(format!(
                "forward({}) needs orders 0..{} cached, only {} available",
                q, q, self.cache.num_order
            )));
        }
        if q > 1 && r != self.cache.num_direction {
            return Err(Error::state(format!(
                "forward({}) with {} directions, but orders below were computed with {}",
                q, r, self.cache.num_direction
            )));
        }

        let r_cache = if q == 0 { self.cache.num_direction } else { r };
        self.cache.reserve(q + 1, r_cache);
        self.cache.num_order = q;

        trace!("forward sweep: order {}, {} directions, {} entries", q, r, self.tape.num_ops());
        for (d, seed) in seeds.iter().enumerate() {
            sweep(&self.tape, &mut self.cache, q, d, seed)?;
        }
        self.cache.num_order = q + 1;

        Ok((0..r)
            .map(|d| {
                self.dependents
                    .iter()
                    .map(|&y| self.cache.get(y as usize, q, d).clone())
                    .collect()
            })
            .collect())
    }

    /// Set the evaluation point and return the outputs there.
    pub fn forward_zero(&mut self, x: &[B]) -> Result<Vec<B>> {
        let mut out = self.forward(0, 1, &[x.to_vec()])?;
        Ok(out.pop().unwrap_or_default())
    }

    /// Directional derivative of the outputs along `dx` at the current point.
    pub fn forward_one(&mut self, dx: &[B]) -> Result<Vec<B>> {
        let mut out = self.forward(1, 1, &[dx.to_vec()])?;
        Ok(out.pop().unwrap_or_default())
    }
}

/// Order `q` of every variable along direction `d`.
fn sweep<B: Base>(
    tape: &Tape<B>,
    cache: &mut TaylorCache<B>,
    q: usize,
    d: usize,
    seed: &[B],
) -> Result<()> {
    for (i, op) in tape.ops.iter().enumerate() {
        match op {
            Op::Input => cache.set(i, q, d, seed[i].clone()),
            Op::Const => {
                let c = if q == 0 { tape.values[i].clone() } else { B::zero() };
                cache.set(i, q, d, c);
            }
            Op::Unary { op, arg } => {
                let a = cache.series(*arg as usize, q, d);
                let mut z = cache.series(i, q, d);
                forward_unary(*op, &a, &mut z).map_err(Error::at_op(i, op.name()))?;
                cache.set(i, q, d, z.swap_remove(q));
            }
            Op::Binary { op, args: [a, b] } => {
                let a = cache.series(*a as usize, q, d);
                let b = cache.series(*b as usize, q, d);
                let mut z = cache.series(i, q, d);
                forward_binary(*op, &a, &b, &mut z).map_err(Error::at_op(i, op.name()))?;
                cache.set(i, q, d, z.swap_remove(q));
            }
            Op::Atomic {
                local,
                args,
                num_results,
            } => {
                let entry = &tape.atomics[*local as usize];
                let m = *num_results as usize;
                let var_in: Vec<bool> = args
                    .iter()
                    .map(|&a| !matches!(tape.ops[a as usize], Op::Const))
                    .collect();
                let mut var_out = vec![true; m];
                let tx: Vec<B> = args
                    .iter()
                    .flat_map(|&a| cache.series(a as usize, q, d))
                    .collect();
                let mut ty: Vec<B> = (0..m).flat_map(|r| cache.series(i + r, q, d)).collect();
                call_forward(entry, i, q, &var_in, &mut var_out, &tx, &mut ty)?;
                for r in 0..m {
                    cache.set(i + r, q, d, ty[at(r, q, q)].clone());
                }
            }
            // Filled in by the call that owns it.
            Op::AtomicResult { .. } => {}
        }
    }
    Ok(())
}

#[allow(clippy::too_many_arguments)]
fn call_forward<B: Base>(
    entry: &AtomicEntry<B>,
    index: usize,
    q: usize,
    var_in: &[bool],
    var_out: &mut [bool],
    tx: &[B],
    ty: &mut [B],
) -> Result<()> {
    match entry.op.forward(q, q, var_in, var_out, tx, ty) {
        Ok(true) => Ok(()),
        Ok(false) => Err(Error::UnsupportedOrder {
            atomic: entry.name.to_string(),
            order: q,
        }),
        Err(source) => Err(Error::Atomic {
            index,
            atomic: entry.name.to_string(),
            source: Box::new(source),
        }),
    }
}
