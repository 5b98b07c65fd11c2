use rayon::prelude::*;

use crate::base::Base;
use crate::error::Result;

use super::TapeFunction;

impl<B: Base> TapeFunction<B> {
    /// Jacobians at many points, evaluated in parallel.
    ///
    /// Each worker evaluates its own clone of `self`, so the cache of `self`
    /// is left untouched. Results are in the order of `points`.
    pub fn jacobian_batch(&self, points: &[Vec<B>]) -> Result<Vec<Vec<Vec<B>>>> {
        points
            .par_iter()
            .map_init(|| self.clone(), |f, x| f.jacobian(x))
            .collect()
    }

    /// Outputs at many points, evaluated in parallel.
    pub fn forward_zero_batch(&self, points: &[Vec<B>]) -> Result<Vec<Vec<B>>> {
        points
            .par_iter()
            .map_init(|| self.clone(), |f, x| f.forward_zero(x))
            .collect()
    }
}
