use std::fmt::{Debug, Display};

use num_traits::{Float as NumFloat, FromPrimitive};

/// Marker trait for element floating-point types (`f32`, `f64`).
///
/// Bundles the numeric and utility traits needed throughout adtape.
/// Only primitive float types implement this; tape values are built on top.
pub trait Float:
    NumFloat + FromPrimitive + Copy + Send + Sync + Default + Debug + Display + 'static
{
}

impl Float for f32 {}
impl Float for f64 {}
