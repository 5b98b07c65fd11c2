use crate::base::Base;
use crate::error::{Error, Result};

use super::{at, AtomicOp};

/// Array whose elements are the scalar arguments, in order.
#[derive(Clone, Copy, Debug, Default)]
pub struct Pack;

impl<B: Base> AtomicOp<B> for Pack {
    fn forward(
        &self,
        p: usize,
        q: usize,
        var_in: &[bool],
        var_out: &mut [bool],
        tx: &[B],
        ty: &mut [B],
    ) -> Result<bool> {
        let n = var_in.len();
        if p == 0 {
            var_out[0] = var_in.iter().any(|&v| v);
        }
        for k in p..=q {
            let mut elems = Vec::with_capacity(n);
            for j in 0..n {
                let x = &tx[at(j, k, q)];
                if !x.is_scalar() {
                    return Err(Error::shape("pack argument", 1, x.len()));
                }
                elems.push(x.sum_elements());
            }
            ty[k] = B::from_elements(elems)?;
        }
        Ok(true)
    }

    fn reverse(&self, q: usize, tx: &[B], _ty: &[B], px: &mut [B], py: &[B]) -> Result<bool> {
        let n = tx.len() / (q + 1);
        for k in 0..=q {
            let w = super::expand(&py[k], n, "pack adjoint")?;
            for (j, wj) in w.into_iter().enumerate() {
                px[at(j, k, q)] = B::from_elem(wj);
            }
        }
        Ok(true)
    }
}

/// The `len` elements of one argument as separate scalar results.
#[derive(Clone, Copy, Debug)]
pub struct Unpack {
    len: usize,
}

impl Unpack {
    pub fn new(len: usize) -> Self {
        Unpack { len }
    }

    pub fn len(&self) -> usize {
        self.len
    }

    pub fn is_empty(&self) -> bool {
        self.len == 0
    }
}

impl<B: Base> AtomicOp<B> for Unpack {
    fn num_results(&self, _num_args: usize) -> usize {
        self.len
    }

    fn forward(
        &self,
        p: usize,
        q: usize,
        var_in: &[bool],
        var_out: &mut [bool],
        tx: &[B],
        ty: &mut [B],
    ) -> Result<bool> {
        if var_in.len() != 1 {
            return Err(Error::shape("unpack arguments", 1, var_in.len()));
        }
        if tx[0].len() != self.len {
            return Err(Error::shape("unpack argument", self.len, tx[0].len()));
        }
        if p == 0 {
            var_out.fill(var_in[0]);
        }
        for k in p..=q {
            let elems = super::expand(&tx[k], self.len, "unpack argument")?;
            for (i, e) in elems.into_iter().enumerate() {
                ty[at(i, k, q)] = B::from_elem(e);
            }
        }
        Ok(true)
    }

    fn reverse(&self, q: usize, tx: &[B], _ty: &[B], px: &mut [B], py: &[B]) -> Result<bool> {
        for k in 0..=q {
            let mut elems = Vec::with_capacity(self.len);
            for i in 0..self.len {
                let w = &py[at(i, k, q)];
                if !w.is_scalar() {
                    return Err(Error::shape("unpack adjoint", 1, w.len()));
                }
                elems.push(w.sum_elements());
            }
            px[k] = super::shaped_like(elems, &tx[0])?;
        }
        Ok(true)
    }
}
