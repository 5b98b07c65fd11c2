use crate::base::Base;
use crate::error::{Error, Result};

use super::AtomicOp;

/// Elements of one argument in reverse order. A scalar is left unchanged.
#[derive(Clone, Copy, Debug, Default)]
pub struct Flip;

fn flipped<B: Base>(v: &B) -> Result<B> {
    if v.is_scalar() {
        return Ok(v.clone());
    }
    let mut elems = v.to_elements();
    elems.reverse();
    B::from_elements(elems)
}

impl<B: Base> AtomicOp<B> for Flip {
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
            return Err(Error::shape("reverse arguments", 1, var_in.len()));
        }
        if p == 0 {
            var_out[0] = var_in[0];
        }
        for k in p..=q {
            ty[k] = flipped(&tx[k])?;
        }
        Ok(true)
    }

    fn reverse(&self, q: usize, _tx: &[B], _ty: &[B], px: &mut [B], py: &[B]) -> Result<bool> {
        for k in 0..=q {
            px[k] = flipped(&py[k])?;
        }
        Ok(true)
    }
}
