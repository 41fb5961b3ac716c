use crate::error::{ensure_len, Result};
use crate::linalg::Matrix;
use crate::traits::{Scalar, SlopeField, Steppable};

/// Runs `step` `steps` times from `initial` and stores each resulting state
/// as one row. Row `k` is the state after `k + 1` steps; the initial state is
/// not recorded.
pub fn record_trajectory<T, F>(initial: &[T], steps: usize, mut step: F) -> Result<Matrix<T>>
where
    T: Scalar,
    F: FnMut(&mut [T]) -> Result<()>,
{
    let mut results = Matrix::zeros(steps, initial.len())?;
    let mut state = initial.to_vec();
    for k in 0..steps {
        step(&mut state)?;
        results.place_vector(&state, k)?;
        log::trace!("step {k}: {state:?}");
    }
    log::debug!(
        "recorded {} steps of a {}-component state",
        steps,
        initial.len()
    );
    Ok(results)
}

/// [`record_trajectory`] driven by a [`Steppable`] over a [`SlopeField`],
/// starting at `t = 0`.
pub fn integrate_trajectory<T: Scalar>(
    stepper: &mut impl Steppable<T>,
    field: &impl SlopeField<T>,
    initial: &[T],
    dt: T,
    steps: usize,
) -> Result<Matrix<T>> {
    ensure_len("integrate_trajectory", field.dimension(), initial.len())?;
    let mut t = T::zero();
    record_trajectory(initial, steps, |state| stepper.step(field, &mut t, state, dt))
}
