use crate::base::Base;
use crate::error::{Error, Result};

use super::{at, expand, shaped_like, AtomicOp};

/// Elements of the first argument followed by those of the second.
///
/// Each coefficient is broadcast to the order-zero shape of its own
/// argument before joining, and the result is always an array, even for two
/// scalar arguments.
#[derive(Clone, Copy, Debug, Default)]
pub struct Concat;

impl<B: Base> AtomicOp<B> for Concat {
    fn forward(
        &self,
        p: usize,
        q: usize,
        var_in: &[bool],
        var_out: &mut [bool],
        tx: &[B],
        ty: &mut [B],
    ) -> Result<bool> {
        if var_in.len() != 2 {
            return Err(Error::shape("concat arguments", 2, var_in.len()));
        }
        if p == 0 {
            var_out[0] = var_in[0] || var_in[1];
        }
        let (x0, y0) = (&tx[at(0, 0, q)], &tx[at(1, 0, q)]);
        for k in p..=q {
            let mut elems = expand(&tx[at(0, k, q)], x0.len(), "concat argument")?;
            elems.extend(expand(&tx[at(1, k, q)], y0.len(), "concat argument")?);
            ty[k] = B::from_elements(elems)?;
        }
        Ok(true)
    }

    fn reverse(&self, q: usize, tx: &[B], _ty: &[B], px: &mut [B], py: &[B]) -> Result<bool> {
        let (x0, y0) = (&tx[at(0, 0, q)], &tx[at(1, 0, q)]);
        let split = x0.len();
        for k in 0..=q {
            let mut head = expand(&py[k], split + y0.len(), "concat adjoint")?;
            let tail = head.split_off(split);
            px[at(0, k, q)] = shaped_like(head, x0)?;
            px[at(1, k, q)] = shaped_like(tail, y0)?;
        }
        Ok(true)
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::value::Value;

    #[test]
    fn scalars_still_materialise_an_array() {
        let tx = vec![Value::scalar(2.0_f64), Value::scalar(2.0)];
        let mut ty = vec![Value::scalar(0.0)];
        Concat.forward(0, 0, &[true, false], &mut [false], &tx, &mut ty).unwrap();
        assert_eq!(ty[0], Value::array(vec![2.0, 2.0]));
    }

    #[test]
    fn adjoint_split_sums_scalar_share() {
        // x scalar, y of length 2, one order.
        let tx = vec![Value::scalar(1.0_f64), Value::array(vec![2.0, 3.0])];
        let ty = vec![Value::array(vec![1.0, 2.0, 3.0])];
        let mut px = vec![Value::scalar(0.0); 2];
        let py = [Value::array(vec![4.0, 5.0, 6.0])];
        Concat.reverse(0, &tx, &ty, &mut px, &py).unwrap();
        assert_eq!(px[0], Value::scalar(4.0));
        assert_eq!(px[1], Value::array(vec![5.0, 6.0]));
    }
}
