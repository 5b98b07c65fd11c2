use crate::base::Base;
use crate::error::{Error, Result};

use super::{at, AtomicOp};

/// Sum of the elements of one argument.
///
/// A scalar coefficient of an array-valued argument stands for that scalar
/// in every element, so it contributes `len(x[0])` times.
#[derive(Clone, Copy, Debug, Default)]
pub struct Sum;

impl<B: Base> AtomicOp<B> for Sum {
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
            return Err(Error::shape("sum arguments", 1, var_in.len()));
        }
        if p == 0 {
            var_out[0] = var_in[0];
        }
        let x0 = &tx[0];
        for k in p..=q {
            let xk = tx[k].broadcast_like(x0)?;
            ty[k] = B::from_elem(xk.sum_elements());
        }
        Ok(true)
    }

    fn reverse(&self, q: usize, tx: &[B], _ty: &[B], px: &mut [B], py: &[B]) -> Result<bool> {
        let x0 = &tx[at(0, 0, q)];
        for k in 0..=q {
            if !py[k].is_scalar() {
                return Err(Error::shape("sum adjoint", 1, py[k].len()));
            }
            px[k] = py[k].broadcast_like(x0)?;
        }
        Ok(true)
    }
}
