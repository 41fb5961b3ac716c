use crate::error::Result;
use num_traits::{Float, FromPrimitive};
use std::fmt::Debug;

/// A trait for types that can be used as scalars by the vector/matrix layer
/// and the steppers. Must support basic arithmetic, debug printing, and
/// conversion from f64.
pub trait Scalar: Float + FromPrimitive + Debug + 'static {}

impl<T: Float + FromPrimitive + Debug + 'static> Scalar for T {}

/// Right-hand side of `dx/dt = f(t, x)`.
pub trait SlopeField<T: Scalar> {
    /// Length of the state vector this field accepts.
    fn dimension(&self) -> usize;

    /// Writes the instantaneous rate of change at `(t, x)` into `out`.
    fn slope(&self, t: T, x: &[T], out: &mut [T]) -> Result<()>;
}

/// A fixed-step explicit integrator.
pub trait Steppable<T: Scalar> {
    /// Advances `state` by one step of size `dt` and moves `t` forward.
    fn step(
        &mut self,
        field: &impl SlopeField<T>,
        t: &mut T,
        state: &mut [T],
        dt: T,
    ) -> Result<()>;
}
