use crate::base::Base;
use crate::error::{Error, Result};

use super::AtomicOp;

/// Array of `len` copies of one scalar argument.
#[derive(Clone, Copy, Debug)]
pub struct Make {
    len: usize,
}

impl Make {
    pub fn new(len: usize) -> Self {
        Make { len }
    }

    pub fn len(&self) -> usize {
        self.len
    }

    pub fn is_empty(&self) -> bool {
        self.len == 0
    }
}

impl<B: Base> AtomicOp<B> for Make {
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
            return Err(Error::shape("make arguments", 1, var_in.len()));
        }
        if p == 0 {
            var_out[0] = var_in[0];
        }
        for k in p..=q {
            if !tx[k].is_scalar() {
                return Err(Error::shape("make argument", 1, tx[k].len()));
            }
            ty[k] = B::from_elements(vec![tx[k].sum_elements(); self.len])?;
        }
        Ok(true)
    }

    fn reverse(&self, q: usize, _tx: &[B], _ty: &[B], px: &mut [B], py: &[B]) -> Result<bool> {
        let n = crate::opcode::ratio::<B>(self.len, 1);
        for k in 0..=q {
            px[k] = if py[k].is_scalar() {
                py[k].scale(n)
            } else if py[k].len() == self.len {
                B::from_elem(py[k].sum_elements())
            } else {
                return Err(Error::shape("make adjoint", self.len, py[k].len()));
            };
        }
        Ok(true)
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::value::Value;

    #[test]
    fn rejects_array_argument() {
        let tx = vec![Value::array(vec![1.0_f64, 2.0])];
        let mut ty = vec![Value::scalar(0.0)];
        let err = Make::new(3)
            .forward(0, 0, &[true], &mut [false], &tx, &mut ty)
            .unwrap_err();
        assert!(matches!(err, Error::ShapeMismatch { expected: 1, actual: 2, .. }));
    }

    #[test]
    fn rejects_wrong_adjoint_length() {
        let tx = vec![Value::scalar(1.0_f64)];
        let ty = vec![Value::filled(1.0, 5)];
        let mut px = vec![Value::scalar(0.0)];
        let py = [Value::filled(1.0, 3)];
        let err = Make::new(5).reverse(0, &tx, &ty, &mut px, &py).unwrap_err();
        assert!(matches!(err, Error::ShapeMismatch { expected: 5, actual: 3, .. }));
    }
}
