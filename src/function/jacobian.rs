use crate::base::Base;
use crate::error::{Error, Result};

use super::TapeFunction;

impl<B: Base> TapeFunction<B> {
    /// Jacobian `J[i][j] = ∂y_i/∂x_j` at `x`.
    ///
    /// Uses one forward sweep per input when there are no more inputs than
    /// outputs, one reverse sweep per output otherwise. For array-valued
    /// entries the forward variant differentiates along the all-ones
    /// direction of `x_j` and the reverse variant differentiates the element
    /// sum of `y_i`; the two agree whenever inputs and outputs are scalars.
    pub fn jacobian(&mut self, x: &[B]) -> Result<Vec<Vec<B>>> {
        if self.num_inputs() <= self.num_outputs() {
            self.jacobian_forward(x)
        } else {
            self.jacobian_reverse(x)
        }
    }

    /// Jacobian by forward sweeps, one per input.
    pub fn jacobian_forward(&mut self, x: &[B]) -> Result<Vec<Vec<B>>> {
        let (n, m) = (self.num_inputs(), self.num_outputs());
        self.forward_zero(x)?;
        let mut jac = vec![Vec::with_capacity(n); m];
        let mut seed = vec![B::zero(); n];
        for j in 0..n {
            seed[j] = B::one();
            let column = self.forward_one(&seed)?;
            seed[j] = B::zero();
            for (row, dy) in jac.iter_mut().zip(column) {
                row.push(dy);
            }
        }
        Ok(jac)
    }

    /// Jacobian by first-order reverse sweeps, one per output.
    pub fn jacobian_reverse(&mut self, x: &[B]) -> Result<Vec<Vec<B>>> {
        let m = self.num_outputs();
        self.forward_zero(x)?;
        let mut jac = Vec::with_capacity(m);
        let mut weights = vec![vec![B::zero()]; m];
        for i in 0..m {
            weights[i][0] = B::one();
            let px = self.reverse(1, &weights)?;
            weights[i][0] = B::zero();
            jac.push(px.into_iter().map(|mut p| p.swap_remove(0)).collect());
        }
        Ok(jac)
    }

    /// Gradient of a single-output function at `x`.
    pub fn gradient(&mut self, x: &[B]) -> Result<Vec<B>> {
        if self.num_outputs() != 1 {
            return Err(Error::shape("gradient outputs", 1, self.num_outputs()));
        }
        self.forward_zero(x)?;
        let px = self.reverse(1, &[vec![B::one()]])?;
        Ok(px.into_iter().map(|mut p| p.swap_remove(0)).collect())
    }

    /// Hessian-vector product `∇²y · v` of a single-output function at `x`.
    ///
    /// One forward sweep of order one along `v`, then a second-order reverse
    /// sweep weighting only the first-order output coefficient.
    pub fn hessian_vector(&mut self, x: &[B], v: &[B]) -> Result<Vec<B>> {
        if self.num_outputs() != 1 {
            return Err(Error::shape("hessian outputs", 1, self.num_outputs()));
        }
        self.forward_zero(x)?;
        self.forward_one(v)?;
        let px = self.reverse(2, &[vec![B::zero(), B::one()]])?;
        Ok(px.into_iter().map(|mut p| p.swap_remove(0)).collect())
    }
}
