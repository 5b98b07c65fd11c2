use log::trace;

use crate::atomic::AtomicEntry;
use crate::base::Base;
use crate::error::{Error, Result};
use crate::tape::Op;
use crate::taylor_ops::{reverse_binary, reverse_unary};

use super::TapeFunction;

impl<B: Base> TapeFunction<B> {
    /// Propagate adjoint weights through the first `q` cached orders.
    ///
    /// `weights[i][k]` weights order `k` of output `i`. Returns
    /// `px[j][k] = ∂/∂x_j^(k) Σ_i Σ_k w_i^(k) y_i^(k)`, shaped like input `j`.
    ///
    /// Requires `1 <= q <= num_order()`; for `q > 1` the cached orders must
    /// have a single direction.
    pub fn reverse(&mut self, q: usize, weights: &[Vec<B>]) -> Result<Vec<Vec<B>>> {
        let (n, m) = (self.num_inputs(), self.num_outputs());
        if q == 0 {
            return Err(Error::state("reverse needs at least one order"));
        }
        if q > self.cache.num_order {
            return Err(Error::state(format!(
                "reverse({}) needs {} cached orders, only {} available; call forward first",
                q, q, self.cache.num_order
            )));
        }
        if q > 1 && self.cache.num_direction != 1 {
            return Err(Error::state(format!(
                "reverse({}) needs a single cached direction, found {}",
                q, self.cache.num_direction
            )));
        }
        if weights.len() != m {
            return Err(Error::shape("reverse weights", m, weights.len()));
        }
        if let Some(w) = weights.iter().find(|w| w.len() != q) {
            return Err(Error::shape("reverse weight orders", q, w.len()));
        }

        trace!("reverse sweep: {} orders, {} entries", q, self.tape.num_ops());

        let nv = self.tape.num_ops();
        let mut partial = vec![B::zero(); nv * q];
        for (&y, w) in self.dependents.iter().zip(weights) {
            self.accumulate(&mut partial, y as usize, w.clone())?;
        }

        let top = q - 1;
        for i in (0..nv).rev() {
            match &self.tape.ops[i] {
                Op::Input | Op::Const | Op::AtomicResult { .. } => {}
                Op::Unary { op, arg } => {
                    let mut pz = partial[i * q..(i + 1) * q].to_vec();
                    if pz.iter().all(B::is_all_zero) {
                        continue;
                    }
                    let arg = *arg as usize;
                    let a = self.cache.series(arg, top, 0);
                    let z = self.cache.series(i, top, 0);
                    let mut pa = vec![B::zero(); q];
                    reverse_unary(*op, &a, &z, &mut pz, &mut pa)
                        .map_err(Error::at_op(i, op.name()))?;
                    self.accumulate(&mut partial, arg, pa)?;
                }
                Op::Binary { op, args: [a, b] } => {
                    let mut pz = partial[i * q..(i + 1) * q].to_vec();
                    if pz.iter().all(B::is_all_zero) {
                        continue;
                    }
                    let (a, b) = (*a as usize, *b as usize);
                    let ta = self.cache.series(a, top, 0);
                    let tb = self.cache.series(b, top, 0);
                    let z = self.cache.series(i, top, 0);
                    let mut pa = vec![B::zero(); q];
                    let mut pb = vec![B::zero(); q];
                    reverse_binary(*op, &ta, &tb, &z, &mut pz, &mut pa, &mut pb)
                        .map_err(Error::at_op(i, op.name()))?;
                    self.accumulate(&mut partial, a, pa)?;
                    self.accumulate(&mut partial, b, pb)?;
                }
                Op::Atomic {
                    local,
                    args,
                    num_results,
                } => {
                    let m_out = *num_results as usize;
                    let py = partial[i * q..(i + m_out) * q].to_vec();
                    if py.iter().all(B::is_all_zero) {
                        continue;
                    }
                    let entry = &self.tape.atomics[*local as usize];
                    let tx: Vec<B> = args
                        .iter()
                        .flat_map(|&a| self.cache.series(a as usize, top, 0))
                        .collect();
                    let ty: Vec<B> = (0..m_out)
                        .flat_map(|r| self.cache.series(i + r, top, 0))
                        .collect();
                    let mut px = vec![B::zero(); args.len() * q];
                    call_reverse(entry, i, top, &tx, &ty, &mut px, &py)?;
                    for (j, chunk) in args.iter().zip(px.chunks(q)) {
                        self.accumulate(&mut partial, *j as usize, chunk.to_vec())?;
                    }
                }
            }
        }

        (0..n)
            .map(|j| {
                let x0 = self.cache.get(j, 0, 0);
                partial[j * q..(j + 1) * q]
                    .iter()
                    .map(|p| p.reduce_like(x0).broadcast_like(x0))
                    .collect()
            })
            .collect()
    }

    /// Add `contrib` to the partials of `var`, collapsing each term onto the
    /// shape of the variable.
    fn accumulate(&self, partial: &mut [B], var: usize, contrib: Vec<B>) -> Result<()> {
        if matches!(self.tape.ops[var], Op::Const) {
            return Ok(());
        }
        let q = contrib.len();
        let shape = self.cache.get(var, 0, 0);
        for (k, c) in contrib.into_iter().enumerate() {
            let p = &mut partial[var * q + k];
            *p = p.try_add(&c.reduce_like(shape))?;
        }
        Ok(())
    }
}

fn call_reverse<B: Base>(
    entry: &AtomicEntry<B>,
    index: usize,
    q: usize,
    tx: &[B],
    ty: &[B],
    px: &mut [B],
    py: &[B],
) -> Result<()> {
    match entry.op.reverse(q, tx, ty, px, py) {
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
